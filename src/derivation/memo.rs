use std::sync::Arc;

/// Single-entry cache keyed by cheap-to-compare inputs.
///
/// On a key hit the previous `Arc` is handed back, so callers can observe
/// reuse with `Arc::ptr_eq`.
#[derive(Debug)]
pub struct MemoCell<K, V> {
    slot: Option<(K, Arc<V>)>,
    computations: u64,
}

impl<K: PartialEq, V> MemoCell<K, V> {
    pub fn new() -> Self {
        Self {
            slot: None,
            computations: 0,
        }
    }

    /// Returns the cached value for `key`, computing it on a miss.
    /// The boolean is true when a computation ran.
    pub fn get_or_compute<F>(&mut self, key: K, compute: F) -> (Arc<V>, bool)
    where
        F: FnOnce() -> V,
    {
        if let Some((cached_key, value)) = &self.slot
            && *cached_key == key
        {
            return (Arc::clone(value), false);
        }

        let value = Arc::new(compute());
        self.computations += 1;
        self.slot = Some((key, Arc::clone(&value)));
        (value, true)
    }

    pub fn computations(&self) -> u64 {
        self.computations
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

impl<K: PartialEq, V> Default for MemoCell<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
