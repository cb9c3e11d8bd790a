use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};
use parking_lot::{Condvar, Mutex};

use mic_capture_core::models::config::CaptureConfig;
use mic_capture_core::models::error::CaptureError;
use mic_capture_core::processing::sample_buffer::SampleBuffer;
use mic_capture_core::traits::capture_device::{CaptureDevice, DeviceRead};

/// Chunk duration used when the host cannot report a minimum buffer size.
const FALLBACK_CHUNK_MS: u32 = 20;

/// Sample buffer capacity between the cpal callback and `read`, in chunks.
const BUFFER_DEPTH_CHUNKS: usize = 8;

enum StreamCommand {
    Play,
    Pause,
    Close,
}

/// State shared between the input callback, the stream thread, and readers.
///
/// `recording` and `open` are only mutated while holding the `samples` lock
/// so a blocked `read` cannot miss the wakeup that follows.
struct Shared {
    samples: Mutex<SampleBuffer>,
    available: Condvar,
    recording: AtomicBool,
    open: AtomicBool,
}

impl Shared {
    /// Stop accumulation and discard anything buffered, so a resumed cycle
    /// starts from live audio rather than pause-time residue.
    fn stop_and_discard(&self) {
        {
            let mut samples = self.samples.lock();
            samples.clear();
            self.recording.store(false, Ordering::Release);
        }
        // Wake a blocked read so it can return.
        self.available.notify_all();
    }

    fn blocking_read(&self, buf: &mut [i16]) -> DeviceRead {
        let mut samples = self.samples.lock();
        loop {
            if !self.open.load(Ordering::Acquire) {
                return DeviceRead::Invalid;
            }
            if samples.len() >= buf.len() {
                break;
            }
            if !self.recording.load(Ordering::Acquire) {
                // Stream stopped: drain anything a racing callback slipped
                // in after the stop, otherwise report the read as
                // unserviceable.
                if samples.is_empty() {
                    return DeviceRead::Invalid;
                }
                break;
            }
            self.available.wait(&mut samples);
        }
        DeviceRead::Samples(samples.read_into(buf))
    }
}

/// A microphone input handle backed by a cpal stream.
///
/// The stream itself is owned by a dedicated `cpal-input` thread (cpal
/// streams are not `Send` on every host); `start`/`stop`/`close` forward
/// commands to it over a channel. The input callback converts the device's
/// native sample format to signed 16-bit PCM and appends to a shared
/// [`SampleBuffer`]; `read` blocks on a condvar until a full chunk is
/// buffered, the stream stops, or the handle is closed.
pub struct CpalDevice {
    shared: Arc<Shared>,
    commands: mpsc::Sender<StreamCommand>,
    stream_thread: Mutex<Option<thread::JoinHandle<()>>>,
    chunk_size: usize,
}

impl CpalDevice {
    pub(crate) fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotAvailable)?;

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::OpenFailed(format!("no default input config: {e}")))?;
        let sample_format = supported.sample_format();

        let channels = config.channels.channel_count();

        // Smallest buffer the host guarantees not to overrun for this
        // configuration; fall back to a fixed chunk duration when the host
        // does not report one.
        let min_frames = match supported.buffer_size() {
            SupportedBufferSize::Range { min, .. } if *min > 0 => *min,
            _ => config.sample_rate_hz * FALLBACK_CHUNK_MS / 1000,
        };
        let chunk_size = (min_frames.max(1) as usize) * channels as usize;

        let stream_config = StreamConfig {
            channels,
            sample_rate: SampleRate(config.sample_rate_hz),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(Shared {
            samples: Mutex::new(SampleBuffer::new(chunk_size * BUFFER_DEPTH_CHUNKS)),
            available: Condvar::new(),
            recording: AtomicBool::new(false),
            open: AtomicBool::new(true),
        });

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), CaptureError>>(1);

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("cpal-input".into())
            .spawn(move || {
                stream_thread(
                    device,
                    stream_config,
                    sample_format,
                    thread_shared,
                    command_rx,
                    ready_tx,
                )
            })
            .map_err(|e| CaptureError::OpenFailed(format!("failed to spawn stream thread: {e}")))?;

        // Report the device open only once the stream has actually built.
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(CaptureError::OpenFailed(
                    "stream thread exited before reporting readiness".into(),
                ));
            }
        }

        log::info!(
            "cpal input open: {} Hz, {} channel(s), {:?} native format, chunk of {} samples",
            config.sample_rate_hz,
            channels,
            sample_format,
            chunk_size
        );

        Ok(Self {
            shared,
            commands: command_tx,
            stream_thread: Mutex::new(Some(handle)),
            chunk_size,
        })
    }
}

impl CaptureDevice for CpalDevice {
    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn start(&self) -> Result<(), CaptureError> {
        {
            let _samples = self.shared.samples.lock();
            self.shared.recording.store(true, Ordering::Release);
        }
        self.commands
            .send(StreamCommand::Play)
            .map_err(|_| CaptureError::StreamError("stream thread is gone".into()))
    }

    fn stop(&self) {
        self.shared.stop_and_discard();
        let _ = self.commands.send(StreamCommand::Pause);
    }

    fn close(&self) {
        {
            let _samples = self.shared.samples.lock();
            self.shared.open.store(false, Ordering::Release);
            self.shared.recording.store(false, Ordering::Release);
        }
        let _ = self.commands.send(StreamCommand::Close);
        self.shared.available.notify_all();
        if let Some(handle) = self.stream_thread.lock().take() {
            let _ = handle.join();
        }
    }

    fn read(&self, buf: &mut [i16]) -> DeviceRead {
        self.shared.blocking_read(buf)
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns the cpal stream for the lifetime of the handle.
fn stream_thread(
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    shared: Arc<Shared>,
    commands: mpsc::Receiver<StreamCommand>,
    ready: mpsc::SyncSender<Result<(), CaptureError>>,
) {
    let stream = match build_stream(&device, &config, sample_format, Arc::clone(&shared)) {
        Ok(stream) => stream,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Play => {
                if let Err(err) = stream.play() {
                    log::error!("failed to start input stream: {err}");
                }
            }
            StreamCommand::Pause => {
                if let Err(err) = stream.pause() {
                    log::warn!("failed to pause input stream: {err}");
                }
            }
            StreamCommand::Close => break,
        }
    }

    drop(stream);
    {
        let _samples = shared.samples.lock();
        shared.open.store(false, Ordering::Release);
    }
    shared.available.notify_all();
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    shared: Arc<Shared>,
) -> Result<cpal::Stream, CaptureError> {
    let err_fn = |err| log::error!("input stream error: {err}");

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                push_samples(&shared, data);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => {
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| u16_to_i16(s)));
                    push_samples(&shared, &scratch);
                },
                err_fn,
                None,
            )
        }
        SampleFormat::F32 => {
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| f32_to_i16(s)));
                    push_samples(&shared, &scratch);
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(CaptureError::OpenFailed(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    };

    stream.map_err(|e| CaptureError::OpenFailed(format!("failed to build input stream: {e}")))
}

/// Append converted samples and wake a blocked read.
///
/// Drops data while the device is not recording so a paused stream cannot
/// accumulate stale audio.
fn push_samples(shared: &Shared, samples: &[i16]) {
    if !shared.recording.load(Ordering::Acquire) {
        return;
    }
    shared.samples.lock().write(samples);
    shared.available.notify_one();
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn u16_to_i16(sample: u16) -> i16 {
    (i32::from(sample) - 32_768) as i16
}
