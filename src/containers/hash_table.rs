use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::mem;

const START_CAPACITY: usize = 16;
const GROWTH_RATE: usize = 2;

// Load factor 3/4: resize runs before the insert that would cross it.
fn over_load_factor(len: usize, capacity: usize) -> bool {
    (len + 1) * 4 > capacity * 3
}

#[derive(Clone)]
enum Slot<K, V> {
    Empty,
    Tombstone,
    Occupied { hash: u64, key: K, value: V },
}

/// Open-addressing hash table: linear probing, cached hashes, tombstone
/// deletion. A tombstone keeps probe chains connected; deletion collapses
/// straight to `Empty` when the next slot is already `Empty` (the chain
/// cannot continue through it).
///
/// Iteration follows slot order bounded by the lowest and highest slot ever
/// occupied, not insertion order.
pub struct HashTable<K, V, S = RandomState> {
    slots: Box<[Slot<K, V>]>,
    len: usize,
    // Ever-occupied slot bounds; first == usize::MAX means none yet.
    first: usize,
    last: usize,
    hasher: S,
}

impl<K, V> HashTable<K, V, RandomState> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        if capacity > 0 {
            let slots = (capacity * 4 / 3 + 1).max(START_CAPACITY);
            table.slots = new_slots(slots);
        }
        table
    }
}

impl<K, V, S> HashTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            slots: Box::new([]),
            len: 0,
            first: usize::MAX,
            last: 0,
            hasher,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.len = 0;
        self.first = usize::MAX;
        self.last = 0;
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let (index, end) = self.scan_bounds();
        Iter {
            slots: &self.slots,
            index,
            end,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    fn scan_bounds(&self) -> (usize, usize) {
        if self.first == usize::MAX {
            (0, 0)
        } else {
            (self.first, self.last + 1)
        }
    }

    fn note_occupied(&mut self, index: usize) {
        self.first = self.first.min(index);
        self.last = self.last.max(index);
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Insert-or-update. Returns the previous value when the key was present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.grow_if_needed();

        let capacity = self.slots.len();
        let hash = self.hasher.hash_one(&key);
        let mut index = hash as usize % capacity;
        let mut reusable: Option<usize> = None;

        for _ in 0..capacity {
            match &mut self.slots[index] {
                Slot::Empty => {
                    let target = reusable.unwrap_or(index);
                    self.occupy(target, hash, key, value);
                    return None;
                }
                Slot::Tombstone => {
                    if reusable.is_none() {
                        reusable = Some(index);
                    }
                }
                Slot::Occupied {
                    hash: slot_hash,
                    key: slot_key,
                    value: slot_value,
                } => {
                    if *slot_hash == hash && *slot_key == key {
                        return Some(mem::replace(slot_value, value));
                    }
                }
            }
            index = (index + 1) % capacity;
        }

        if let Some(target) = reusable {
            self.occupy(target, hash, key, value);
            return None;
        }
        // Unreachable: the load-factor resize always leaves empty slots.
        panic!("HashTable probe exhausted a full table");
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_slot(key)?;
        match &self.slots[index] {
            Slot::Occupied { value, .. } => Some(value),
            _ => unreachable!("find_slot returned a non-occupied slot"),
        }
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_slot(key)?;
        match &mut self.slots[index] {
            Slot::Occupied { value, .. } => Some(value),
            _ => unreachable!("find_slot returned a non-occupied slot"),
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot(key).is_some()
    }

    /// Removes a key, preserving probe-chain connectivity for every other key.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_slot(key)?;
        Some(self.retire_slot(index))
    }

    fn find_slot<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.slots.is_empty() {
            return None;
        }
        let capacity = self.slots.len();
        let hash = self.hasher.hash_one(key);
        let mut index = hash as usize % capacity;
        for _ in 0..capacity {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied {
                    hash: slot_hash,
                    key: slot_key,
                    ..
                } => {
                    if *slot_hash == hash && slot_key.borrow() == key {
                        return Some(index);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
        None
    }

    /// Clears an occupied slot. The slot becomes `Empty` when the next slot
    /// is `Empty` (no probe chain continues through it), otherwise a
    /// `Tombstone`.
    fn retire_slot(&mut self, index: usize) -> V {
        let next = (index + 1) % self.slots.len();
        let replacement = if matches!(self.slots[next], Slot::Empty) {
            Slot::Empty
        } else {
            Slot::Tombstone
        };
        let slot = mem::replace(&mut self.slots[index], replacement);
        self.len -= 1;
        match slot {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!("retire_slot on a non-occupied slot"),
        }
    }

    fn occupy(&mut self, index: usize, hash: u64, key: K, value: V) {
        self.slots[index] = Slot::Occupied { hash, key, value };
        self.len += 1;
        self.note_occupied(index);
    }

    fn grow_if_needed(&mut self) {
        if self.slots.is_empty() {
            self.slots = new_slots(START_CAPACITY);
            return;
        }
        if over_load_factor(self.len, self.slots.len()) {
            self.resize(self.slots.len() * GROWTH_RATE);
        }
    }

    /// Rehashes every occupied slot into a fresh slot array using the cached
    /// hashes; tombstones do not survive a resize.
    fn resize(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity > self.len);
        let old = mem::replace(&mut self.slots, new_slots(new_capacity));
        self.first = usize::MAX;
        self.last = 0;
        for slot in old.into_vec() {
            if let Slot::Occupied { hash, key, value } = slot {
                self.place_rehashed(hash, key, value);
            }
        }
    }

    fn place_rehashed(&mut self, hash: u64, key: K, value: V) {
        let capacity = self.slots.len();
        let mut index = hash as usize % capacity;
        loop {
            if matches!(self.slots[index], Slot::Empty) {
                self.slots[index] = Slot::Occupied { hash, key, value };
                self.note_occupied(index);
                return;
            }
            index = (index + 1) % capacity;
        }
    }
}

fn new_slots<K, V>(capacity: usize) -> Box<[Slot<K, V>]> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots.into_boxed_slice()
}

impl<K, V, S: Default> Default for HashTable<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for HashTable<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            len: self.len,
            first: self.first,
            last: self.last,
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V, S> fmt::Debug for HashTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> PartialEq for HashTable<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K, V, S> Eq for HashTable<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Extend<(K, V)> for HashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::with_hasher(S::default());
        table.extend(iter);
        table
    }
}

pub struct Iter<'a, K, V> {
    slots: &'a [Slot<K, V>],
    index: usize,
    end: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.end {
            let slot = &self.slots[self.index];
            self.index += 1;
            if let Slot::Occupied { key, value, .. } = slot {
                return Some((key, value));
            }
        }
        None
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
