//! # mic-capture-core
//!
//! Platform-agnostic microphone capture core.
//!
//! Owns the recording lifecycle state machine and streams fixed-size chunks
//! of signed 16-bit PCM to a registered [`StreamObserver`]. Platform
//! backends implement the [`CaptureBackend`]/[`CaptureDevice`] trait pair
//! and plug into the generic [`CaptureSession`].
//!
//! ## Architecture
//!
//! ```text
//! mic-capture-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, StreamObserver
//! ├── models/       ← CaptureConfig, CaptureError, CaptureState
//! ├── processing/   ← SampleBuffer (push→pull bridging for backends)
//! └── session/      ← CaptureSession + capture worker loop
//! ```
//!
//! Data flow: caller → `CaptureSession` (state transition + device
//! ownership) → capture worker (blocking chunk reads) → `StreamObserver`
//! (chunk delivery) → caller-owned downstream consumer.

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{CaptureConfig, ChannelLayout, SampleEncoding, SourceKind};
pub use models::error::CaptureError;
pub use models::state::CaptureState;
pub use processing::sample_buffer::SampleBuffer;
pub use session::recorder::CaptureSession;
pub use traits::capture_device::{CaptureBackend, CaptureDevice, DeviceRead};
pub use traits::stream_observer::{ObserverSlot, StreamObserver};
