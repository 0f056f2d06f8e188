/*
Min-priority queue ordered by an explicit key function rather than by the items' own ordering.

Backed by the d-ary heap from orx_priority_queue. Items with equal keys come out in no particular order.
*/

use orx_priority_queue::*;

pub type Key = f64;

pub struct KeyedQueue<T: Clone, F> {
    heap: BinaryHeap<T, Key>,
    key: F,
}

impl<T, F> KeyedQueue<T, F>
where
    T: Clone,
    F: Fn(&T) -> Key,
{
    pub fn new(key: F) -> Self {
        Self {
            heap: BinaryHeap::default(),
            key,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, item: T) {
        let key = (self.key)(&item);
        self.heap.push(item, key);
    }

    /// Key of the item `pop` would return next.
    pub fn peek_key(&self) -> Option<Key> {
        self.heap.peek().map(|n| n.1)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|(item, _)| item)
    }
}
