use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;

/// Outcome of a single blocking device read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRead {
    /// `count` samples were written to the front of the buffer. May be less
    /// than the buffer length on a short read.
    Samples(usize),

    /// The platform could not service the read: the stream is stopped, the
    /// handle was released, or the driver reported a transient condition.
    /// Not fatal; the worker skips delivery for this iteration.
    Invalid,
}

/// An opened audio input handle.
///
/// Exclusively owned by the capture session, which alone opens and releases
/// it; the worker only reads from it. All methods take `&self` because the
/// worker holds a shared reference while the session drives the lifecycle
/// from the owning thread.
pub trait CaptureDevice: Send + Sync {
    /// Samples per read chunk, as reported by the platform for the opened
    /// configuration. Strictly positive and fixed for the lifetime of the
    /// handle.
    fn chunk_size(&self) -> usize;

    /// Begin (or resume) recording on the device.
    fn start(&self) -> Result<(), CaptureError>;

    /// Stop recording. The handle stays open and can be restarted; a read
    /// blocked on the device must return promptly once stopped.
    fn stop(&self);

    /// Release the underlying platform resource. Subsequent reads return
    /// [`DeviceRead::Invalid`]; calling `close` again is a no-op.
    fn close(&self);

    /// Blocking read of up to `buf.len()` samples into the front of `buf`.
    fn read(&self, buf: &mut [i16]) -> DeviceRead;
}

/// Factory for platform capture devices.
///
/// Implemented by:
/// - `mic-capture-cpal` (cross-platform, cpal)
/// - scripted mock backends in tests
pub trait CaptureBackend: Send {
    type Device: CaptureDevice + 'static;

    /// Open an input device for `config`.
    fn open(&self, config: &CaptureConfig) -> Result<Self::Device, CaptureError>;
}
