use std::{collections::HashMap, fmt, sync::Arc};

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}

/// Owns the bytes behind every live handle. A handle is valid from `insert` until its one `release`.
#[derive(Default)]
pub struct HandleRegistry {
    live: HashMap<ObjectHandle, Arc<[u8]>>,
    released: u64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: ObjectHandle, data: Arc<[u8]>) {
        debug!(%handle, bytes = data.len(), "handle created");
        if self.live.insert(handle, data).is_some() {
            warn!(%handle, "handle id reused while still live");
        }
    }

    /// Returns false when the handle was never issued or is already released.
    pub fn release(&mut self, handle: ObjectHandle) -> bool {
        match self.live.remove(&handle) {
            Some(_) => {
                self.released += 1;
                debug!(%handle, "handle released");
                true
            }
            None => {
                warn!(%handle, "release of unknown or already released handle");
                false
            }
        }
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<Arc<[u8]>> {
        self.live.get(&handle).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn released_count(&self) -> u64 {
        self.released
    }
}
