use serde::{Deserialize, Serialize};

/// Audio input source kind.
///
/// Only the default microphone input is supported by this core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Microphone,
}

/// Channel layout of the capture stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    #[default]
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channel_count(&self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Sample encoding of delivered chunks.
///
/// Only signed 16-bit linear PCM is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    #[default]
    PcmI16,
}

impl SampleEncoding {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::PcmI16 => 2,
        }
    }
}

/// Configuration for a capture session, immutable once a device is open.
///
/// The chunk size is never part of the configuration: it is queried from the
/// platform as the minimum buffer size for this `(rate, channels, encoding)`
/// triple when the device is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: SourceKind,

    /// Sample rate in Hz (default: 44100).
    pub sample_rate_hz: u32,

    pub channels: ChannelLayout,

    pub encoding: SampleEncoding,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz == 0 {
            return Err("sample rate must be positive".into());
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Microphone,
            sample_rate_hz: 44_100,
            channels: ChannelLayout::Mono,
            encoding: SampleEncoding::PcmI16,
        }
    }
}
