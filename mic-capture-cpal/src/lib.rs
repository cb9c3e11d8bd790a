//! # mic-capture-cpal
//!
//! Cross-platform microphone backend for `mic-capture-core`, built on cpal.
//!
//! Bridges cpal's push-style input callback to the core's pull-style
//! blocking [`CaptureDevice::read`] through a condvar-guarded
//! [`SampleBuffer`]. The cpal `Stream` is not `Send` on every host, so it
//! lives on a dedicated thread driven by a small play/pause/close command
//! channel.
//!
//! [`CaptureDevice::read`]: mic_capture_core::CaptureDevice::read
//! [`SampleBuffer`]: mic_capture_core::SampleBuffer

mod backend;
mod device;

pub use backend::CpalBackend;
pub use device::CpalDevice;
