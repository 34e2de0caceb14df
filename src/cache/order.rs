//! Order List Module
//!
//! Arena-backed doubly linked list holding cache entries in recency order.
//!
//! Entries are addressed by [`Handle`]s (slot index + generation) so the key
//! index can point into the list without aliasing references:
//! - Front = Most recently touched
//! - Back = Least recently touched / next in stack order
//!
//! Freed slots go onto a free list and are reused by later inserts.

use crate::cache::CacheEntry;

// == Handle ==
/// Stable reference to a node in the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node {
    entry: CacheEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    node: Option<Node>,
}

// == Order List ==
#[derive(Debug, Default)]
pub struct OrderList {
    slots: Vec<Slot>,
    /// Vacant slots ready for reuse
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl OrderList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Inserts an entry at the front (most recent).
    pub fn push_front(&mut self, entry: CacheEntry) -> Handle {
        let handle = self.allocate(entry);
        self.link_front(handle.index);
        handle
    }

    /// Inserts an entry at the back.
    pub fn push_back(&mut self, entry: CacheEntry) -> Handle {
        let handle = self.allocate(entry);
        self.link_back(handle.index);
        handle
    }

    // == Lookup ==
    pub fn get(&self, handle: Handle) -> Option<&CacheEntry> {
        self.node(handle).map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut CacheEntry> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_mut().map(|node| &mut node.entry)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.node(handle).is_some()
    }

    pub fn front(&self) -> Option<Handle> {
        self.head.map(|index| self.handle_at(index))
    }

    pub fn back(&self) -> Option<Handle> {
        self.tail.map(|index| self.handle_at(index))
    }

    /// Returns the node after `handle`, towards the back.
    pub fn next(&self, handle: Handle) -> Option<Handle> {
        self.node(handle)
            .and_then(|node| node.next)
            .map(|index| self.handle_at(index))
    }

    // == Reorder ==
    /// Moves a node to the front. Returns false if the handle is stale.
    pub fn move_to_front(&mut self, handle: Handle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        if self.head != Some(handle.index) {
            self.unlink(handle.index);
            self.link_front(handle.index);
        }
        true
    }

    /// Moves a node to the back. Returns false if the handle is stale.
    pub fn move_to_back(&mut self, handle: Handle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        if self.tail != Some(handle.index) {
            self.unlink(handle.index);
            self.link_back(handle.index);
        }
        true
    }

    // == Remove ==
    /// Unlinks a node and returns its entry, releasing the slot for reuse.
    pub fn remove(&mut self, handle: Handle) -> Option<CacheEntry> {
        if !self.contains(handle) {
            return None;
        }
        self.unlink(handle.index);
        let slot = &mut self.slots[handle.index];
        let node = slot.node.take()?;
        slot.generation += 1;
        self.free.push(handle.index);
        self.len -= 1;
        Some(node.entry)
    }

    /// Drops every node. Slots are kept for reuse.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation += 1;
                self.free.push(index);
            }
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // == Iteration ==
    /// Iterates entries front to back.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &CacheEntry)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let index = cursor?;
            let node = self.slots[index].node.as_ref()?;
            cursor = node.next;
            Some((self.handle_at(index), &node.entry))
        })
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated, live or pooled.
    #[cfg(test)]
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    // == Internals ==
    fn node(&self, handle: Handle) -> Option<&Node> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn handle_at(&self, index: usize) -> Handle {
        Handle {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn allocate(&mut self, entry: CacheEntry) -> Handle {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };
        self.len += 1;
        self.handle_at(index)
    }

    fn links(&mut self, index: usize) -> &mut Node {
        self.slots[index]
            .node
            .as_mut()
            .expect("linked slot must be occupied")
    }

    fn link_front(&mut self, index: usize) {
        let old_head = self.head;
        {
            let node = self.links(index);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head) => self.links(head).prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
    }

    fn link_back(&mut self, index: usize) {
        let old_tail = self.tail;
        {
            let node = self.links(index);
            node.next = None;
            node.prev = old_tail;
        }
        match old_tail {
            Some(tail) => self.links(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
    }

    /// Detaches a node from its neighbours; the slot stays occupied.
    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let node = self.links(index);
            let pair = (node.prev, node.next);
            node.prev = None;
            node.next = None;
            pair
        };
        match prev {
            Some(prev) => self.links(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links(next).prev = prev,
            None => self.tail = prev,
        }
    }
}
