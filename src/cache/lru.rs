//! LRU List Module
//!
//! Arena-backed doubly linked list used for recency ordering.

// == Slot ==
/// Stable handle to a node in an [`LruList`].
///
/// A slot stays valid until the node it names is removed; other insertions
/// and removals never move it.
pub type Slot = usize;

#[derive(Debug)]
struct Node<T> {
    item: T,
    prev: Option<Slot>,
    next: Option<Slot>,
}

// == LRU List ==
/// Recency list with O(1) push, promote, and removal by slot.
///
/// Nodes live in a vector of slots linked by index:
/// - Front (head) = Most recently used
/// - Back (tail) = Least recently used
///
/// Freed slots are recycled for later pushes.
#[derive(Debug)]
pub struct LruList<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl<T> LruList<T> {
    // == Constructor ==
    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts an item as most recently used and returns its slot.
    pub fn push_front(&mut self, item: T) -> Slot {
        let node = Node {
            item,
            prev: None,
            next: self.head,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };

        match self.head {
            Some(old_head) => self.node_mut(old_head).prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.len += 1;
        slot
    }

    // == Move To Front ==
    /// Marks the item at `slot` as most recently used.
    ///
    /// Unknown slots are ignored.
    pub fn move_to_front(&mut self, slot: Slot) {
        if self.head == Some(slot) || !self.contains(slot) {
            return;
        }
        self.unlink(slot);
        let old_head = self.head;
        {
            let node = self.node_mut(slot);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    // == Remove ==
    /// Removes the item at `slot` and returns it.
    pub fn remove(&mut self, slot: Slot) -> Option<T> {
        if !self.contains(slot) {
            return None;
        }
        self.unlink(slot);
        let node = self.nodes[slot].take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(node.item)
    }

    // == Back ==
    /// Returns the least recently used item without removing it.
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|slot| self.get(slot))
    }

    /// Returns the item stored at `slot`.
    pub fn get(&self, slot: Slot) -> Option<&T> {
        self.nodes.get(slot)?.as_ref().map(|node| &node.item)
    }

    /// Swaps a new item into `slot`, keeping its position. Returns the old item.
    pub fn replace(&mut self, slot: Slot, item: T) -> Option<T> {
        let node = self.nodes.get_mut(slot)?.as_mut()?;
        Some(std::mem::replace(&mut node.item, item))
    }

    // == Length ==
    /// Returns the number of items in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Drops every item and releases the arena.
    pub fn clear(&mut self) {
        self.nodes = Vec::new();
        self.free = Vec::new();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn contains(&self, slot: Slot) -> bool {
        matches!(self.nodes.get(slot), Some(Some(_)))
    }

    fn unlink(&mut self, slot: Slot) {
        let (prev, next) = {
            let node = self.node_mut(slot);
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    // Callers only pass slots reached through live links.
    fn node_mut(&mut self, slot: Slot) -> &mut Node<T> {
        self.nodes[slot]
            .as_mut()
            .expect("linked slot must hold a node")
    }
}

/// Front-to-back iterator over an [`LruList`].
pub struct Iter<'a, T> {
    list: &'a LruList<T>,
    cursor: Option<Slot>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.list.nodes.get(slot)?.as_ref()?;
        self.cursor = node.next;
        Some(&node.item)
    }
}
