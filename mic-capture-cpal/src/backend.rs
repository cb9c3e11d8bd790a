use mic_capture_core::models::config::CaptureConfig;
use mic_capture_core::models::error::CaptureError;
use mic_capture_core::traits::capture_device::CaptureBackend;

use crate::device::CpalDevice;

/// Opens capture devices on the host's default audio input.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for CpalBackend {
    type Device = CpalDevice;

    fn open(&self, config: &CaptureConfig) -> Result<CpalDevice, CaptureError> {
        CpalDevice::open(config)
    }
}
