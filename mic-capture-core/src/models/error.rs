use thiserror::Error;

/// Errors that can occur while opening or driving a capture device.
///
/// Lifecycle operations on the session never return these: open failures are
/// absorbed into the observable state (`NotReady`) plus a log record, and
/// read failures are skipped iterations. Backends surface them from
/// `CaptureBackend::open` and `CaptureDevice::start`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no input device available")]
    DeviceNotAvailable,

    #[error("device open failed: {0}")]
    OpenFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("stream error: {0}")]
    StreamError(String),
}
