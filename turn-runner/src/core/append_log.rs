//! Append-only sequence with an explicit cursor to the most recent item.

/// Append-only list whose only mutable element is the last one pushed.
///
/// `amend_last` goes through the cursor, never through positional indexing, so an
/// empty log turns every amendment into an observable no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendLog<T> {
    items: Vec<T>,
    cursor: Option<usize>,
}

impl<T> Default for AppendLog<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
        }
    }
}

impl<T> AppendLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and move the cursor to it.
    pub fn push(&mut self, item: T) -> &T {
        self.items.push(item);
        let index = self.items.len() - 1;
        self.cursor = Some(index);
        &self.items[index]
    }

    /// Apply `amend` to the most recent item.
    ///
    /// Returns `None` without calling `amend` when nothing has been pushed yet.
    pub fn amend_last<F: FnOnce(&mut T)>(&mut self, amend: F) -> Option<&T> {
        let index = self.cursor?;
        let item = self.items.get_mut(index)?;
        amend(&mut *item);
        Some(&*item)
    }

    pub fn last(&self) -> Option<&T> {
        self.cursor.and_then(|index| self.items.get(index))
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

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}
