//! Ordered child accumulator used while a parent group is open.

/// Ordered child entries of one in-flight aggregate, keyed by child id.
///
/// A `None` key means the LEFT JOIN found no child for this row; no entry is
/// created for it.
#[derive(Debug, Clone)]
pub struct Children<K, C> {
    keys: Vec<K>,
    items: Vec<C>,
}

impl<K, C> Default for Children<K, C> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<K: PartialEq, C> Children<K, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child unless `key` equals the last appended key, and return
    /// the entry the row belongs to.
    ///
    /// Suited to the collection the rows are ordered by: repeats of the same
    /// child are consecutive (its grandchildren fanning out).
    pub fn upsert_last(&mut self, key: Option<K>, make: impl FnOnce() -> C) -> Option<&mut C> {
        let key = key?;
        if self.keys.last() != Some(&key) {
            self.keys.push(key);
            self.items.push(make());
        }
        self.items.last_mut()
    }

    /// Append a child unless `key` was already seen in this group.
    ///
    /// Suited to a sibling collection joined alongside another one, whose
    /// entries repeat once per row of the other collection.
    pub fn insert_unique(&mut self, key: Option<K>, make: impl FnOnce() -> C) -> Option<&mut C> {
        let key = key?;
        match self.keys.iter().position(|k| *k == key) {
            Some(index) => self.items.get_mut(index),
            None => {
                self.keys.push(key);
                self.items.push(make());
                self.items.last_mut()
            }
        }
    }

    /// Consume the accumulator, yielding children in arrival order.
    pub fn into_vec(self) -> Vec<C> {
        self.items
    }
}
