use std::collections::VecDeque;

/// LIFO stack with a few calculator style reordering operations.
///
/// The front of the deque is the top of the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack<T> {
    items: VecDeque<T>,
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Stack {
            items: VecDeque::new(),
        }
    }
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.items.push_front(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Top of the stack.
    pub fn first(&self) -> Option<&T> {
        self.items.front()
    }

    /// Item directly under the top.
    pub fn second(&self) -> Option<&T> {
        self.items.get(1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Exchange the top two items. No-op with fewer than two items.
    pub fn swap(&mut self) {
        if self.items.len() >= 2 {
            self.items.swap(0, 1);
        }
    }

    pub fn reverse(&mut self) {
        self.items.make_contiguous().reverse();
    }

    /// Move the bottom item to the top.
    pub fn rotate(&mut self) {
        if !self.items.is_empty() {
            self.items.rotate_right(1);
        }
    }

    /// Iterate from the top down.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
