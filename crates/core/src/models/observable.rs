use std::ops::Deref;

/// Structural change reported by [`ObservableList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange<T> {
    /// An element was appended at `index`.
    Added {
        /// Position of the new element.
        index: usize,
    },
    /// The element at `index` was replaced; `previous` is the old value.
    Replaced {
        /// Position of the element.
        index: usize,
        /// Value before the change.
        previous: T,
    },
    /// The element at `index` was removed.
    Removed {
        /// Former position of the element.
        index: usize,
        /// The removed element.
        item: T,
    },
    /// Every element was removed.
    Cleared {
        /// Elements in their former order.
        items: Vec<T>,
    },
}

/// Ordered sequence that only changes through a closed set of operations.
///
/// Each operation hands back a [`ListChange`] which the owner routes to its
/// change hook (persist, then emit to the network).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableList<T> {
    items: Vec<T>,
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> ObservableList<T> {
    /// Wrap an existing sequence without reporting any change.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Append `item` at the end.
    #[must_use]
    pub fn push(&mut self, item: T) -> ListChange<T> {
        self.items.push(item);
        ListChange::Added {
            index: self.items.len() - 1,
        }
    }

    /// Replace the element at `index`, returning `None` when out of range.
    #[must_use]
    pub fn replace(&mut self, index: usize, item: T) -> Option<ListChange<T>> {
        let slot = self.items.get_mut(index)?;
        let previous = std::mem::replace(slot, item);
        Some(ListChange::Replaced { index, previous })
    }

    /// Remove the element at `index`, returning `None` when out of range.
    #[must_use]
    pub fn remove(&mut self, index: usize) -> Option<ListChange<T>> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        Some(ListChange::Removed { index, item })
    }

    /// Remove every element.
    #[must_use]
    pub fn clear(&mut self) -> ListChange<T> {
        ListChange::Cleared {
            items: std::mem::take(&mut self.items),
        }
    }

    /// Mutable access to one element for in-place edits that do not change
    /// the structure of the list.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Swap the whole content without reporting a change.
    pub(crate) fn reset(&mut self, items: Vec<T>) {
        self.items = items;
    }
}

impl<T> Deref for ObservableList<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_report_changes() {
        let mut list = ObservableList::new(vec![1, 2]);

        assert_eq!(list.push(3), ListChange::Added { index: 2 });
        assert_eq!(
            list.replace(0, 10),
            Some(ListChange::Replaced {
                index: 0,
                previous: 1
            })
        );
        assert_eq!(
            list.remove(1),
            Some(ListChange::Removed { index: 1, item: 2 })
        );
        assert_eq!(&*list, &[10, 3]);
        assert_eq!(list.clear(), ListChange::Cleared { items: vec![10, 3] });
        assert!(list.is_empty());
    }

    #[test]
    fn out_of_range_operations_do_nothing() {
        let mut list = ObservableList::new(vec!["a"]);
        assert!(list.replace(3, "b").is_none());
        assert!(list.remove(1).is_none());
        assert_eq!(&*list, &["a"]);
    }
}
