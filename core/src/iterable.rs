//! Cursor-navigable result collection.

/// A finite, restartable sequence with a cursor.
///
/// Navigation methods return `None` at either boundary instead of wrapping
/// or failing. The cursor starts on the first item.
#[derive(Debug, Clone, PartialEq)]
pub struct IterableResult<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T> IterableResult<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
        }
    }

    /// Move the cursor to the first item and return it.
    pub fn reset(&mut self) -> Option<&T> {
        self.cursor = 0;
        self.current()
    }

    /// Move the cursor to the final item and return it.
    pub fn last(&mut self) -> Option<&T> {
        self.cursor = self.items.len().saturating_sub(1);
        self.current()
    }

    /// The item under the cursor, without moving it.
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.cursor)
    }

    /// Advance one item. Returns `None` and leaves the cursor alone when
    /// already on (or past) the last item.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.items.len() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    /// Step back one item. Returns `None` at the first item.
    pub fn prev(&mut self) -> Option<&T> {
        if self.cursor == 0 || self.items.is_empty() {
            return None;
        }
        self.cursor = (self.cursor - 1).min(self.items.len() - 1);
        self.current()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item; the cursor does not move.
    pub fn add(&mut self, item: T) -> &mut Self {
        self.items.push(item);
        self
    }

    /// Call `callback(item, index)` for every item from index 0.
    ///
    /// Side effect: the cursor is left one past the last item, so `current()`
    /// returns `None` afterwards and `prev()` returns the last item. Call
    /// `reset()` to traverse again.
    pub fn each<F>(&mut self, mut callback: F)
    where
        F: FnMut(&T, usize),
    {
        for (index, item) in self.items.iter().enumerate() {
            callback(item, index);
        }
        self.cursor = self.items.len();
    }

    /// Borrowing iterator that ignores the cursor.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for IterableResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for IterableResult<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items, cursor: 0 }
    }
}

impl<T> FromIterator<T> for IterableResult<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a, T> IntoIterator for &'a IterableResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for IterableResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> IterableResult<&'static str> {
        IterableResult::from(vec!["a", "b", "c"])
    }

    #[test]
    fn next_stops_at_the_end_without_wrapping() {
        let mut items = three();
        assert_eq!(items.reset(), Some(&"a"));
        assert_eq!(items.next(), Some(&"b"));
        assert_eq!(items.next(), Some(&"c"));
        assert_eq!(items.next(), None);
        assert_eq!(items.current(), Some(&"c"));
        assert_eq!(items.count(), 3);
    }

    #[test]
    fn prev_at_start_returns_none() {
        let mut items = three();
        assert_eq!(items.prev(), None);
        assert_eq!(items.current(), Some(&"a"));
        assert_eq!(items.last(), Some(&"c"));
        assert_eq!(items.prev(), Some(&"b"));
        assert_eq!(items.count(), 3);
    }

    #[test]
    fn each_visits_in_order_and_parks_the_cursor() {
        let mut items = three();
        items.next();

        let mut seen = Vec::new();
        items.each(|item, index| seen.push((*item, index)));

        assert_eq!(seen, vec![("a", 0), ("b", 1), ("c", 2)]);
        assert_eq!(items.current(), None);
        assert_eq!(items.next(), None);
        assert_eq!(items.prev(), Some(&"c"));
        assert_eq!(items.reset(), Some(&"a"));
    }

    #[test]
    fn add_appends_and_chains() {
        let mut items = IterableResult::new();
        assert!(items.is_empty());
        assert_eq!(items.current(), None);
        assert_eq!(items.last(), None);

        items.add(1).add(2);
        assert_eq!(items.count(), 2);
        assert_eq!(items.reset(), Some(&1));
        assert_eq!(items.iter().sum::<i32>(), 3);
    }
}
