// Whole-value snapshot sharing between the sampling path and the decision path.

use parking_lot::RwLock;
use std::sync::Arc;

/// Holds the latest immutable snapshot of `T`.
///
/// Writers replace the whole value, readers get an `Arc` to a complete
/// snapshot and never observe a partially written one.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    inner: RwLock<Arc<T>>,
}

impl<T> SnapshotCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(Arc::new(value)),
        }
    }

    /// Latest snapshot
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.inner.read())
    }

    /// Replace the snapshot
    pub fn store(&self, value: T) {
        *self.inner.write() = Arc::new(value);
    }
}

impl<T: Copy> SnapshotCell<T> {
    pub fn get(&self) -> T {
        **self.inner.read()
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
