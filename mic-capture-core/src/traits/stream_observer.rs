use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Consumer of the live capture stream.
///
/// All methods are called from the capture worker thread, never the owning
/// thread. `on_chunk` calls for one session are strictly ordered (each call
/// returns before the next begins) and delivered in capture order;
/// `on_complete` is always the last callback of a `start()` cycle.
pub trait StreamObserver: Send + Sync {
    /// One chunk of signed 16-bit PCM samples. `len` samples starting at
    /// `offset` are valid; `len` may be less than the chunk size on a short
    /// read.
    fn on_chunk(&self, samples: &[i16], offset: usize, len: usize);

    /// The worker has stopped delivering chunks for this cycle.
    fn on_complete(&self);
}

/// Shared, replaceable observer slot.
///
/// The session holds only a weak reference: the observer's lifetime belongs
/// to the caller. The worker upgrades the reference at most once per
/// delivery, so a replacement or a cleared slot takes effect on the next
/// chunk and a dropped observer is silently skipped.
#[derive(Clone, Default)]
pub struct ObserverSlot {
    inner: Arc<Mutex<Option<Weak<dyn StreamObserver>>>>,
}

impl ObserverSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, observer: Option<Weak<dyn StreamObserver>>) {
        *self.inner.lock() = observer;
    }

    pub fn get(&self) -> Option<Arc<dyn StreamObserver>> {
        self.inner.lock().as_ref().and_then(Weak::upgrade)
    }
}
