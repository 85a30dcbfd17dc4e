use smol_str::SmolStr;

use crate::containers::{hash_table, DArray, HashTable};

/// Index into [`Document`]'s node arena. Index 0 is the reserved null node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub const NULL: Self = Self(0);
}

/// Index into [`Document`]'s resource arena. Index 0 is the reserved null
/// resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceIndex(pub(crate) usize);

impl ResourceIndex {
    pub const NULL: Self = Self(0);
}

/// A parsed scalar, stored once in the resource arena and referenced by
/// direct nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// One node of the parsed tree. Children are referenced by index, never by
/// pointer, so the backing arena can grow without invalidating anything.
#[derive(Debug, Clone)]
pub enum DependencyNode {
    Direct(ResourceIndex),
    Array(DArray<NodeIndex>),
    Object(HashTable<SmolStr, NodeIndex>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
}

/// A parsed JSON document: a node arena plus a scalar resource arena.
/// Immutable once the parser hands it out; navigation goes through the
/// borrowing [`Value`], [`Array`] and [`Object`] views.
#[derive(Debug)]
pub struct Document {
    nodes: DArray<DependencyNode>,
    resources: DArray<Resource>,
}

impl Document {
    /// Both arenas start with the shared null in slot 0; lookups that miss
    /// resolve there instead of failing.
    pub(crate) fn with_reserved_null() -> Self {
        let mut nodes = DArray::with_capacity(8);
        nodes.push_back(DependencyNode::Direct(ResourceIndex::NULL));
        let mut resources = DArray::with_capacity(8);
        resources.push_back(Resource::Null);
        Self { nodes, resources }
    }

    /// The root value: the first node parsed after the reserved null, or the
    /// null value itself when the input held no tokens.
    pub fn root(&self) -> Value<'_> {
        let index = if self.nodes.len() > 1 {
            NodeIndex(1)
        } else {
            NodeIndex::NULL
        };
        Value {
            document: self,
            index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub(crate) fn push_node(&mut self, node: DependencyNode) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        self.nodes.push_back(node);
        index
    }

    pub(crate) fn push_resource(&mut self, resource: Resource) -> ResourceIndex {
        let index = ResourceIndex(self.resources.len());
        self.resources.push_back(resource);
        index
    }

    pub(crate) fn array_items_mut(&mut self, index: NodeIndex) -> &mut DArray<NodeIndex> {
        match &mut self.nodes[index.0] {
            DependencyNode::Array(items) => items,
            _ => unreachable!("array_items_mut on a non-array node"),
        }
    }

    pub(crate) fn object_entries_mut(
        &mut self,
        index: NodeIndex,
    ) -> &mut HashTable<SmolStr, NodeIndex> {
        match &mut self.nodes[index.0] {
            DependencyNode::Object(entries) => entries,
            _ => unreachable!("object_entries_mut on a non-object node"),
        }
    }

    fn node(&self, index: NodeIndex) -> &DependencyNode {
        &self.nodes[index.0]
    }

    fn resource(&self, index: ResourceIndex) -> &Resource {
        &self.resources[index.0]
    }
}

/// Read-only view of one node. Cheap to copy; never outlives its document.
///
/// The typed accessors (`int64`, `string`, ...) panic when called on a value
/// of another kind; check `kind()` or the `is_*` predicates first when the
/// shape is not known.
#[derive(Debug, Clone, Copy)]
pub struct Value<'a> {
    document: &'a Document,
    index: NodeIndex,
}

impl<'a> Value<'a> {
    pub fn kind(self) -> ValueKind {
        match self.document.node(self.index) {
            DependencyNode::Direct(resource) => match self.document.resource(*resource) {
                Resource::Null => ValueKind::Null,
                Resource::Boolean(_) => ValueKind::Boolean,
                Resource::Integer(_) => ValueKind::Integer,
                Resource::Float(_) => ValueKind::Float,
                Resource::String(_) => ValueKind::String,
            },
            DependencyNode::Array(_) => ValueKind::Array,
            DependencyNode::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_null(self) -> bool {
        self.kind() == ValueKind::Null
    }

    pub fn is_array(self) -> bool {
        self.kind() == ValueKind::Array
    }

    pub fn is_object(self) -> bool {
        self.kind() == ValueKind::Object
    }

    pub fn int64(self) -> i64 {
        match self.scalar() {
            Some(Resource::Integer(value)) => *value,
            _ => panic!("int64() called on a {:?} value", self.kind()),
        }
    }

    pub fn float64(self) -> f64 {
        match self.scalar() {
            Some(Resource::Float(value)) => *value,
            _ => panic!("float64() called on a {:?} value", self.kind()),
        }
    }

    pub fn boolean(self) -> bool {
        match self.scalar() {
            Some(Resource::Boolean(value)) => *value,
            _ => panic!("boolean() called on a {:?} value", self.kind()),
        }
    }

    pub fn string(self) -> &'a str {
        match self.scalar() {
            Some(Resource::String(value)) => value.as_str(),
            _ => panic!("string() called on a {:?} value", self.kind()),
        }
    }

    pub fn array(self) -> Array<'a> {
        match self.document.node(self.index) {
            DependencyNode::Array(_) => Array {
                document: self.document,
                index: self.index,
            },
            _ => panic!("array() called on a {:?} value", self.kind()),
        }
    }

    pub fn object(self) -> Object<'a> {
        match self.document.node(self.index) {
            DependencyNode::Object(_) => Object {
                document: self.document,
                index: self.index,
            },
            _ => panic!("object() called on a {:?} value", self.kind()),
        }
    }

    /// Array element access. Out-of-range indices panic.
    pub fn at(self, index: usize) -> Value<'a> {
        self.array().at(index)
    }

    /// Object member access; a missing key yields the null value, so chains
    /// like `value.member("a").member("b")` stay checkable with `is_null`.
    pub fn member(self, key: &str) -> Value<'a> {
        self.object().member(key)
    }

    fn scalar(self) -> Option<&'a Resource> {
        match self.document.node(self.index) {
            DependencyNode::Direct(resource) => Some(self.document.resource(*resource)),
            _ => None,
        }
    }
}

/// Borrowing view of an array node, in element order.
#[derive(Debug, Clone, Copy)]
pub struct Array<'a> {
    document: &'a Document,
    index: NodeIndex,
}

impl<'a> Array<'a> {
    pub fn len(self) -> usize {
        self.items().len()
    }

    pub fn is_empty(self) -> bool {
        self.items().is_empty()
    }

    pub fn at(self, index: usize) -> Value<'a> {
        Value {
            document: self.document,
            index: self.items()[index],
        }
    }

    pub fn iter(self) -> ArrayIter<'a> {
        ArrayIter {
            document: self.document,
            items: self.items().iter(),
        }
    }

    fn items(self) -> &'a DArray<NodeIndex> {
        match self.document.node(self.index) {
            DependencyNode::Array(items) => items,
            _ => unreachable!("Array view over a non-array node"),
        }
    }
}

impl<'a> IntoIterator for Array<'a> {
    type Item = Value<'a>;
    type IntoIter = ArrayIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct ArrayIter<'a> {
    document: &'a Document,
    items: std::slice::Iter<'a, NodeIndex>,
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = Value<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = *self.items.next()?;
        Some(Value {
            document: self.document,
            index,
        })
    }
}

/// Borrowing view of an object node. Iteration order is the hash table's
/// slot order, not insertion order.
#[derive(Debug, Clone, Copy)]
pub struct Object<'a> {
    document: &'a Document,
    index: NodeIndex,
}

impl<'a> Object<'a> {
    pub fn len(self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(self) -> bool {
        self.entries().is_empty()
    }

    pub fn contains_key(self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    /// The value recorded under `key`, or the null value when absent.
    pub fn member(self, key: &str) -> Value<'a> {
        let index = self
            .entries()
            .get(key)
            .copied()
            .unwrap_or(NodeIndex::NULL);
        Value {
            document: self.document,
            index,
        }
    }

    pub fn iter(self) -> ObjectIter<'a> {
        ObjectIter {
            document: self.document,
            entries: self.entries().iter(),
        }
    }

    fn entries(self) -> &'a HashTable<SmolStr, NodeIndex> {
        match self.document.node(self.index) {
            DependencyNode::Object(entries) => entries,
            _ => unreachable!("Object view over a non-object node"),
        }
    }
}

impl<'a> IntoIterator for Object<'a> {
    type Item = (&'a str, Value<'a>);
    type IntoIter = ObjectIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct ObjectIter<'a> {
    document: &'a Document,
    entries: hash_table::Iter<'a, SmolStr, NodeIndex>,
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = (&'a str, Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, index) = self.entries.next()?;
        Some((
            key.as_str(),
            Value {
                document: self.document,
                index: *index,
            },
        ))
    }
}
