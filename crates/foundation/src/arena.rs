/// Append-only arena addressed by insertion index.
///
/// Items are never removed, so an index handed out by `alloc` stays valid for
/// the lifetime of the arena.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn alloc(&mut self, v: T) -> usize {
        self.items.push(v);
        self.items.len() - 1
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.items.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::Arena;

    #[test]
    fn alloc_returns_insertion_index() {
        let mut arena = Arena::new();
        assert_eq!(arena.alloc("a"), 0);
        assert_eq!(arena.alloc("b"), 1);
        assert_eq!(arena.get(1), Some(&"b"));
        assert_eq!(arena.get(2), None);
        let order: Vec<_> = arena.iter().map(|(i, v)| (i, *v)).collect();
        assert_eq!(order, vec![(0, "a"), (1, "b")]);
    }
}
