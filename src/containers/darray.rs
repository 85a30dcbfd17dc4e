use std::alloc::{self, handle_alloc_error, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

const START_CAPACITY: usize = 2;

/// Growable contiguous sequence with manual buffer management.
///
/// Elements `[0, size)` are live, `[size, capacity)` are uninitialized.
/// Capacity grows by 1.5x and never shrinks. `erase_at` preserves element
/// order, `erase_swap` fills the hole with the last element in O(1).
pub struct DArray<T> {
    buffer: NonNull<T>,
    size: usize,
    capacity: usize,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for DArray<T> {}
unsafe impl<T: Sync> Sync for DArray<T> {}

impl<T> DArray<T> {
    pub const fn new() -> Self {
        Self {
            buffer: NonNull::dangling(),
            size: 0,
            capacity: 0,
            _marker: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        if capacity > 0 {
            array.reallocate(capacity);
        }
        array
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        // A dangling pointer is valid for a zero-length slice.
        unsafe { std::slice::from_raw_parts(self.buffer.as_ptr(), self.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.buffer.as_ptr(), self.size) }
    }

    /// Grows capacity to at least `capacity`. Never shrinks; requesting less
    /// than the current length is a contract violation.
    pub fn reserve(&mut self, capacity: usize) {
        assert!(
            capacity >= self.size,
            "DArray::reserve below the current length"
        );
        if capacity > self.capacity {
            self.reallocate(capacity);
        }
    }

    /// Grow-only resize; new slots are default-constructed.
    pub fn resize(&mut self, new_size: usize)
    where
        T: Default,
    {
        assert!(new_size >= self.size, "DArray::resize cannot shrink");
        self.reserve(new_size);
        while self.size < new_size {
            unsafe { ptr::write(self.buffer.as_ptr().add(self.size), T::default()) };
            self.size += 1;
        }
    }

    pub fn push_back(&mut self, value: T) {
        if self.size == self.capacity {
            self.grow();
        }
        unsafe { ptr::write(self.buffer.as_ptr().add(self.size), value) };
        self.size += 1;
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }
        self.size -= 1;
        Some(unsafe { ptr::read(self.buffer.as_ptr().add(self.size)) })
    }

    /// Inserts at `index`, shifting the tail right by one.
    pub fn insert(&mut self, index: usize, value: T) {
        assert!(index <= self.size, "DArray::insert out of bounds");
        if self.size == self.capacity {
            self.grow();
        }
        unsafe {
            let slot = self.buffer.as_ptr().add(index);
            ptr::copy(slot, slot.add(1), self.size - index);
            ptr::write(slot, value);
        }
        self.size += 1;
    }

    /// Removes at `index`, shifting the tail left by one. Order preserving.
    pub fn erase_at(&mut self, index: usize) -> T {
        assert!(index < self.size, "DArray::erase_at out of bounds");
        self.size -= 1;
        unsafe {
            let slot = self.buffer.as_ptr().add(index);
            let value = ptr::read(slot);
            ptr::copy(slot.add(1), slot, self.size - index);
            value
        }
    }

    /// Removes at `index` by moving the last element into its place. O(1),
    /// does not preserve order.
    pub fn erase_swap(&mut self, index: usize) -> T {
        assert!(index < self.size, "DArray::erase_swap out of bounds");
        self.size -= 1;
        unsafe {
            let slot = self.buffer.as_ptr().add(index);
            let value = ptr::read(slot);
            if index != self.size {
                ptr::copy_nonoverlapping(self.buffer.as_ptr().add(self.size), slot, 1);
            }
            value
        }
    }

    pub fn clear(&mut self) {
        let live: *mut [T] = self.as_mut_slice();
        // Size is reset first: if an element Drop panics, the rest leak
        // instead of being dropped twice.
        self.size = 0;
        unsafe { ptr::drop_in_place(live) };
    }

    fn grow(&mut self) {
        let new_capacity = if self.capacity == 0 {
            START_CAPACITY
        } else {
            self.capacity + self.capacity / 2
        };
        self.reallocate(new_capacity);
    }

    fn reallocate(&mut self, new_capacity: usize) {
        assert!(new_capacity >= self.size);
        assert!(
            mem::size_of::<T>() != 0,
            "DArray does not support zero-sized element types"
        );
        let new_layout = match Layout::array::<T>(new_capacity) {
            Ok(layout) => layout,
            Err(_) => panic!("DArray capacity overflow"),
        };
        let new_buffer = if self.capacity == 0 {
            unsafe { alloc::alloc(new_layout) }
        } else {
            let old_layout = match Layout::array::<T>(self.capacity) {
                Ok(layout) => layout,
                Err(_) => panic!("DArray capacity overflow"),
            };
            unsafe {
                alloc::realloc(
                    self.buffer.as_ptr().cast::<u8>(),
                    old_layout,
                    new_layout.size(),
                )
            }
        };
        let Some(new_buffer) = NonNull::new(new_buffer.cast::<T>()) else {
            handle_alloc_error(new_layout);
        };
        self.buffer = new_buffer;
        self.capacity = new_capacity;
    }
}

impl<T> Drop for DArray<T> {
    fn drop(&mut self) {
        self.clear();
        if self.capacity > 0 {
            // Capacity is only ever set by reallocate, so the layout recomputes.
            let layout = Layout::array::<T>(self.capacity).unwrap();
            unsafe { alloc::dealloc(self.buffer.as_ptr().cast::<u8>(), layout) };
        }
    }
}

impl<T> Deref for DArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Default for DArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for DArray<T> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity(self.capacity);
        for value in self.as_slice() {
            copy.push_back(value.clone());
        }
        copy
    }
}

impl<T: fmt::Debug> fmt::Debug for DArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl<T: PartialEq> PartialEq for DArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DArray<T> {}

impl<T> Extend<T> for DArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for DArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, T> IntoIterator for &'a DArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T> IntoIterator for &'a mut DArray<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn push_and_read_back_preserves_sequence() {
        let mut array = DArray::new();
        for i in 0..100 {
            array.push_back(i);
        }
        assert_eq!(array.len(), 100);
        for (i, value) in array.iter().enumerate() {
            assert_eq!(*value, i);
        }
    }

    #[test]
    fn growth_is_one_and_a_half() {
        let mut array = DArray::new();
        assert_eq!(array.capacity(), 0);
        array.push_back(0u32);
        assert_eq!(array.capacity(), 2);
        array.push_back(1);
        array.push_back(2);
        assert_eq!(array.capacity(), 3);
        array.push_back(3);
        assert_eq!(array.capacity(), 4);
        array.push_back(4);
        assert_eq!(array.capacity(), 6);
    }

    #[test]
    fn insert_shifts_tail_right() {
        let mut array: DArray<i32> = [1, 2, 4, 5].into_iter().collect();
        array.insert(2, 3);
        assert_eq!(array.as_slice(), &[1, 2, 3, 4, 5]);
        array.insert(0, 0);
        assert_eq!(array.as_slice(), &[0, 1, 2, 3, 4, 5]);
        array.insert(6, 6);
        assert_eq!(array.as_slice(), &[0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn erase_at_preserves_relative_order() {
        let mut array: DArray<i32> = (0..8).collect();
        assert_eq!(array.erase_at(3), 3);
        assert_eq!(array.as_slice(), &[0, 1, 2, 4, 5, 6, 7]);
        assert_eq!(array.erase_at(0), 0);
        assert_eq!(array.as_slice(), &[1, 2, 4, 5, 6, 7]);
        assert_eq!(array.erase_at(5), 7);
        assert_eq!(array.as_slice(), &[1, 2, 4, 5, 6]);
    }

    #[test]
    fn erase_swap_preserves_element_set() {
        let mut array: DArray<i32> = (0..8).collect();
        assert_eq!(array.erase_swap(2), 2);
        assert_eq!(array.erase_swap(0), 0);
        let mut remaining: Vec<i32> = array.iter().copied().collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![1, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn erase_swap_of_last_element() {
        let mut array: DArray<i32> = (0..3).collect();
        assert_eq!(array.erase_swap(2), 2);
        assert_eq!(array.as_slice(), &[0, 1]);
    }

    #[test]
    fn clone_is_deep() {
        let mut original: DArray<String> = ["a", "b"].into_iter().map(String::from).collect();
        let copy = original.clone();
        original.push_back("c".to_string());
        original[0].push('!');
        assert_eq!(copy.as_slice(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn resize_fills_with_defaults() {
        let mut array: DArray<u8> = [7].into_iter().collect();
        array.resize(4);
        assert_eq!(array.as_slice(), &[7, 0, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "cannot shrink")]
    fn resize_cannot_shrink() {
        let mut array: DArray<u8> = (0..4).collect();
        array.resize(2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn indexing_past_len_panics() {
        let array: DArray<u8> = (0..4).collect();
        let _ = array[4];
    }

    #[test]
    fn drop_runs_element_destructors() {
        let tracker = Rc::new(());
        {
            let mut array = DArray::new();
            for _ in 0..10 {
                array.push_back(Rc::clone(&tracker));
            }
            array.erase_swap(5);
            array.erase_at(0);
            assert_eq!(Rc::strong_count(&tracker), 9);
        }
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn reserve_only_grows() {
        let mut array: DArray<u8> = (0..4).collect();
        array.reserve(16);
        assert_eq!(array.capacity(), 16);
        array.reserve(8);
        assert_eq!(array.capacity(), 16);
        assert_eq!(array.len(), 4);
    }
}
