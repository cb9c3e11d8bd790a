use std::sync::Arc;

use crate::models::state::{CaptureState, StateCell};
use crate::traits::capture_device::{CaptureDevice, DeviceRead};
use crate::traits::stream_observer::ObserverSlot;

/// Read/deliver loop, run once per `start()` cycle on a dedicated thread.
///
/// The worker never owns the device and never mutates session state: it only
/// observes the state cell, re-checking it on every iteration, so a
/// `pause()`/`stop()`/`cancel()` from the owning thread terminates the loop
/// after at most one blocking read. `on_complete` fires exactly once, after
/// the last chunk of the cycle.
pub(crate) fn capture_loop<D: CaptureDevice>(
    device: Arc<D>,
    state: Arc<StateCell>,
    observer: ObserverSlot,
    chunk_size: usize,
) {
    let mut samples = vec![0i16; chunk_size];

    while state.load() == CaptureState::Recording {
        match device.read(&mut samples) {
            DeviceRead::Samples(count) => {
                // Re-read the slot each delivery so a replacement takes
                // effect on the next chunk.
                if let Some(observer) = observer.get() {
                    observer.on_chunk(&samples, 0, count);
                }
            }
            // Transient platform condition (or a released handle after
            // cancel); skip delivery and re-check the state.
            DeviceRead::Invalid => {}
        }
    }

    if let Some(observer) = observer.get() {
        observer.on_complete();
    }
    log::debug!("capture worker exited");
}
