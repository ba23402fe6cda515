use codeatlas_core::NodeKey;
use std::collections::VecDeque;

pub const DEFAULT_LRU_MAX_LENGTH: usize = 50;

#[derive(Debug, Clone)]
pub struct WorkingSet {
    queue: VecDeque<NodeKey>,
    cap: usize,
}

impl Default for WorkingSet {
    fn default() -> Self {
        Self::new(DEFAULT_LRU_MAX_LENGTH)
    }
}

impl WorkingSet {
    pub fn new(cap: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.queue.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeKey> {
        self.queue.iter()
    }

    // Moves each key to the front in input order, so the last key ends up first.
    pub fn touch<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a NodeKey>,
    {
        for key in keys {
            if let Some(idx) = self.queue.iter().position(|k| k == key) {
                self.queue.remove(idx);
            }
            self.queue.push_front(key.clone());
        }
    }

    pub fn forget<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a NodeKey>,
    {
        for key in keys {
            self.queue.retain(|k| k != key);
        }
    }

    // Pops the entry sitting right past the cap, if the queue overflows.
    pub fn pop_overflow(&mut self) -> Option<NodeKey> {
        if self.queue.len() > self.cap {
            self.queue.remove(self.cap)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
