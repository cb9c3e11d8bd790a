use std::sync::{Arc, Weak};
use std::thread;

use crate::models::config::CaptureConfig;
use crate::models::state::{CaptureState, StateCell};
use crate::traits::capture_device::{CaptureBackend, CaptureDevice};
use crate::traits::stream_observer::{ObserverSlot, StreamObserver};

use super::worker;

/// Microphone capture session.
///
/// Owns the device handle and the recording state machine, and spawns one
/// capture worker per `start()` cycle. Every lifecycle operation is callable
/// in every state: calls with no defined effect are no-ops, and failures are
/// absorbed into the observable state rather than returned, so a consumer
/// can never crash-on-record. Callers react to [`CaptureSession::state`].
///
/// `pause()`, `stop()`, and `cancel()` are cooperative: the worker observes
/// the new state at its next loop check, so cancellation latency is bounded
/// by one blocking-read duration. All three join the outgoing worker before
/// returning, which makes the observer's `on_complete` ordering
/// deterministic for the caller.
pub struct CaptureSession<B: CaptureBackend> {
    backend: B,
    config: CaptureConfig,
    device: Option<Arc<B::Device>>,
    chunk_size: usize,
    state: Arc<StateCell>,
    observer: ObserverSlot,
    worker: Option<thread::JoinHandle<()>>,
}

impl<B: CaptureBackend> CaptureSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: CaptureConfig::default(),
            device: None,
            chunk_size: 0,
            state: Arc::new(StateCell::new(CaptureState::NotReady)),
            observer: ObserverSlot::new(),
            worker: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        self.state.load()
    }

    /// Configuration the session currently holds (applied on device open).
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Samples per delivered chunk: the platform-reported minimum buffer
    /// size for the open configuration. Zero while no device is open.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Delivered chunk size in bytes.
    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size * self.config.encoding.bytes_per_sample()
    }

    /// Register (or clear) the stream observer.
    ///
    /// The worker reads the slot once per delivery, so a replacement takes
    /// effect on the next chunk without affecting an in-flight one.
    pub fn set_observer(&self, observer: Option<Weak<dyn StreamObserver>>) {
        self.observer.set(observer);
    }

    /// Open the input device for `config` and compute the chunk size.
    /// Transitions: `NotReady` → `Ready`.
    ///
    /// A no-op if a device is already open. On open failure the session
    /// stays `NotReady`; callers observe this via [`CaptureSession::state`]
    /// before relying on `start()`.
    pub fn prepare(&mut self, config: CaptureConfig) {
        if self.device.is_some() {
            log::debug!("prepare ignored: device already open");
            return;
        }
        if let Err(reason) = config.validate() {
            log::error!("invalid capture config: {reason}");
            return;
        }

        match self.backend.open(&config) {
            Ok(device) => {
                let chunk_size = device.chunk_size();
                if chunk_size == 0 {
                    log::error!("capture device reported a zero minimum buffer size");
                    device.close();
                    return;
                }
                log::info!(
                    "capture device open: {} Hz, {} channel(s), chunk of {} samples",
                    config.sample_rate_hz,
                    config.channels.channel_count(),
                    chunk_size
                );
                self.chunk_size = chunk_size;
                self.device = Some(Arc::new(device));
                self.config = config;
                self.state.store(CaptureState::Ready);
            }
            Err(err) => {
                log::error!("failed to open capture device: {err}");
            }
        }
    }

    /// Begin recording and spawn the capture worker.
    /// Transitions: any state except `Recording` → `Recording`.
    ///
    /// On a session with no open device this auto-prepares with the default
    /// configuration first. A no-op while already recording.
    pub fn start(&mut self) {
        if self.state.load() == CaptureState::Recording {
            return;
        }

        self.ensure_ready();
        let Some(device) = self.device.clone() else {
            log::warn!("start ignored: no capture device");
            return;
        };

        if let Err(err) = device.start() {
            log::error!("failed to start recording: {err}");
            return;
        }

        self.state.store(CaptureState::Recording);
        self.spawn_worker(device);
    }

    /// Stop chunk delivery without releasing the device.
    /// Transitions: `Recording` → `Paused`; otherwise a no-op.
    ///
    /// The outgoing worker delivers its `on_complete` before this returns;
    /// a subsequent `start()` resumes delivery without reopening the device.
    pub fn pause(&mut self) {
        if self.state.load() != CaptureState::Recording {
            return;
        }

        self.state.store(CaptureState::Paused);
        if let Some(device) = &self.device {
            device.stop();
        }
        self.join_worker();
        log::debug!("capture paused");
    }

    /// Stop recording and release the device.
    /// Transitions: `Recording`/`Paused` → `NotReady`; a no-op in
    /// `NotReady` and `Ready`.
    pub fn stop(&mut self) {
        match self.state.load() {
            CaptureState::NotReady | CaptureState::Ready => return,
            CaptureState::Recording | CaptureState::Paused => {}
        }

        self.state.store(CaptureState::NotReady);
        if let Some(device) = self.device.take() {
            device.stop();
            device.close();
        }
        self.join_worker();
        self.chunk_size = 0;
        log::debug!("capture stopped");
    }

    /// Release the device, if any, and return to `NotReady` from any state.
    ///
    /// The underlying resource is released before this returns even if a
    /// worker is mid-read; the worker's remaining reads against the released
    /// handle are benign no-ops.
    pub fn cancel(&mut self) {
        self.state.store(CaptureState::NotReady);
        if let Some(device) = self.device.take() {
            device.stop();
            device.close();
        }
        self.join_worker();
        self.chunk_size = 0;
        log::debug!("capture cancelled");
    }

    /// Explicit ensure-ready step for `start()`: a fresh or fully stopped
    /// session gets a device opened with the default configuration.
    fn ensure_ready(&mut self) {
        if self.device.is_none() {
            self.prepare(CaptureConfig::default());
        }
    }

    fn spawn_worker(&mut self, device: Arc<B::Device>) {
        let state = Arc::clone(&self.state);
        let observer = self.observer.clone();
        let chunk_size = self.chunk_size;

        let spawned = thread::Builder::new()
            .name("capture-worker".into())
            .spawn(move || worker::capture_loop(device, state, observer, chunk_size));

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(err) => {
                log::error!("failed to spawn capture worker: {err}");
                if let Some(device) = &self.device {
                    device.stop();
                }
                self.state.store(CaptureState::Ready);
            }
        }
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("capture worker panicked");
            }
        }
    }
}

impl<B: CaptureBackend> Drop for CaptureSession<B> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ChannelLayout;
    use crate::models::error::CaptureError;
    use crate::traits::capture_device::DeviceRead;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    const CHUNK: usize = 64;

    /// Scripted device: each read fills the whole buffer with the delivery
    /// sequence number, so observers can verify order and gaps.
    struct MockDevice {
        chunk_size: usize,
        open: AtomicBool,
        recording: AtomicBool,
        reads: AtomicUsize,
        delivered: AtomicUsize,
        invalid_every: usize,
        short_read: Option<usize>,
    }

    impl MockDevice {
        fn new(chunk_size: usize, invalid_every: usize, short_read: Option<usize>) -> Self {
            Self {
                chunk_size,
                open: AtomicBool::new(true),
                recording: AtomicBool::new(false),
                reads: AtomicUsize::new(0),
                delivered: AtomicUsize::new(0),
                invalid_every,
                short_read,
            }
        }
    }

    impl CaptureDevice for MockDevice {
        fn chunk_size(&self) -> usize {
            self.chunk_size
        }

        fn start(&self) -> Result<(), CaptureError> {
            self.recording.store(true, Ordering::Release);
            Ok(())
        }

        fn stop(&self) {
            self.recording.store(false, Ordering::Release);
        }

        fn close(&self) {
            self.open.store(false, Ordering::Release);
            self.recording.store(false, Ordering::Release);
        }

        fn read(&self, buf: &mut [i16]) -> DeviceRead {
            thread::sleep(Duration::from_millis(1));
            if !self.open.load(Ordering::Acquire) || !self.recording.load(Ordering::Acquire) {
                return DeviceRead::Invalid;
            }
            let read_index = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if self.invalid_every != 0 && read_index % self.invalid_every == 0 {
                return DeviceRead::Invalid;
            }
            let sequence = self.delivered.fetch_add(1, Ordering::SeqCst) as i16;
            buf.fill(sequence);
            let count = self.short_read.unwrap_or(buf.len()).min(buf.len());
            DeviceRead::Samples(count)
        }
    }

    #[derive(Default)]
    struct MockBackend {
        opens: Arc<AtomicUsize>,
        fail_open: bool,
        chunk_size: Option<usize>,
        invalid_every: usize,
        short_read: Option<usize>,
    }

    impl MockBackend {
        fn counting(opens: Arc<AtomicUsize>) -> Self {
            Self {
                opens,
                ..Self::default()
            }
        }
    }

    impl CaptureBackend for MockBackend {
        type Device = MockDevice;

        fn open(&self, _config: &CaptureConfig) -> Result<MockDevice, CaptureError> {
            if self.fail_open {
                return Err(CaptureError::DeviceNotAvailable);
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(MockDevice::new(
                self.chunk_size.unwrap_or(CHUNK),
                self.invalid_every,
                self.short_read,
            ))
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Chunk { first: i16, len: usize },
        Complete,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl StreamObserver for Recorder {
        fn on_chunk(&self, samples: &[i16], offset: usize, len: usize) {
            self.events.lock().push(Event::Chunk {
                first: samples[offset],
                len,
            });
        }

        fn on_complete(&self) {
            self.events.lock().push(Event::Complete);
        }
    }

    impl Recorder {
        fn chunk_count(&self) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|e| matches!(e, Event::Chunk { .. }))
                .count()
        }

        fn complete_count(&self) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|e| matches!(e, Event::Complete))
                .count()
        }
    }

    fn observe(session: &CaptureSession<MockBackend>) -> Arc<Recorder> {
        let observer = Arc::new(Recorder::default());
        session.set_observer(Some(Arc::downgrade(&observer) as Weak<dyn StreamObserver>));
        observer
    }

    fn wait_for_chunks(observer: &Recorder, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while observer.chunk_count() < count {
            assert!(Instant::now() < deadline, "timed out waiting for chunks");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn prepare_reports_platform_chunk_size() {
        let mut session = CaptureSession::new(MockBackend::default());
        session.prepare(CaptureConfig::default());

        assert_eq!(session.state(), CaptureState::Ready);
        assert_eq!(session.chunk_size(), CHUNK);
        assert_eq!(session.chunk_size_bytes(), CHUNK * 2);
    }

    #[test]
    fn start_auto_prepares_from_fresh_session() {
        let opens = Arc::new(AtomicUsize::new(0));
        let mut session = CaptureSession::new(MockBackend::counting(Arc::clone(&opens)));

        assert_eq!(session.state(), CaptureState::NotReady);
        session.start();
        assert_eq!(session.state(), CaptureState::Recording);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(session.config(), &CaptureConfig::default());

        session.stop();
        assert_eq!(session.state(), CaptureState::NotReady);
    }

    #[test]
    fn start_is_idempotent_while_recording() {
        let opens = Arc::new(AtomicUsize::new(0));
        let mut session = CaptureSession::new(MockBackend::counting(Arc::clone(&opens)));
        let observer = observe(&session);

        session.start();
        session.start();
        wait_for_chunks(&observer, 1);
        session.stop();

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(observer.complete_count(), 1);
    }

    #[test]
    fn stop_is_a_noop_before_recording() {
        let mut session = CaptureSession::new(MockBackend::default());

        session.stop();
        assert_eq!(session.state(), CaptureState::NotReady);

        session.prepare(CaptureConfig::default());
        session.stop();
        assert_eq!(session.state(), CaptureState::Ready);
        assert_eq!(session.chunk_size(), CHUNK);
    }

    #[test]
    fn open_failure_leaves_session_not_ready() {
        let mut session = CaptureSession::new(MockBackend {
            fail_open: true,
            ..MockBackend::default()
        });

        session.prepare(CaptureConfig::default());
        assert_eq!(session.state(), CaptureState::NotReady);

        session.start();
        assert_eq!(session.state(), CaptureState::NotReady);
        assert_eq!(session.chunk_size(), 0);
    }

    #[test]
    fn zero_chunk_device_is_rejected() {
        let mut session = CaptureSession::new(MockBackend {
            chunk_size: Some(0),
            ..MockBackend::default()
        });

        session.prepare(CaptureConfig::default());
        assert_eq!(session.state(), CaptureState::NotReady);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut session = CaptureSession::new(MockBackend::default());
        session.prepare(CaptureConfig {
            sample_rate_hz: 0,
            ..CaptureConfig::default()
        });
        assert_eq!(session.state(), CaptureState::NotReady);
    }

    #[test]
    fn chunks_arrive_in_capture_order_then_complete() {
        let mut session = CaptureSession::new(MockBackend::default());
        let observer = observe(&session);

        session.prepare(CaptureConfig::default());
        session.start();
        wait_for_chunks(&observer, 3);
        session.stop();

        assert_eq!(session.state(), CaptureState::NotReady);

        let events = observer.events.lock().clone();
        assert!(events.len() >= 4);
        assert_eq!(*events.last().unwrap(), Event::Complete);
        assert_eq!(observer.complete_count(), 1);

        let mut expected = 0i16;
        for event in events.iter() {
            if let Event::Chunk { first, len } = event {
                assert_eq!(*first, expected, "chunks out of order or duplicated");
                assert!(*len <= CHUNK);
                expected += 1;
            }
        }
    }

    #[test]
    fn pause_keeps_device_open_and_start_resumes() {
        let opens = Arc::new(AtomicUsize::new(0));
        let mut session = CaptureSession::new(MockBackend::counting(Arc::clone(&opens)));
        let observer = observe(&session);

        session.start();
        wait_for_chunks(&observer, 1);
        session.pause();

        assert_eq!(session.state(), CaptureState::Paused);
        assert_eq!(observer.complete_count(), 1);
        assert_eq!(session.chunk_size(), CHUNK);

        session.start();
        assert_eq!(session.state(), CaptureState::Recording);
        wait_for_chunks(&observer, observer.chunk_count() + 1);
        session.stop();

        // Same device across the pause; one completion per start cycle.
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(observer.complete_count(), 2);
    }

    #[test]
    fn pause_outside_recording_is_a_noop() {
        let mut session = CaptureSession::new(MockBackend::default());
        session.pause();
        assert_eq!(session.state(), CaptureState::NotReady);

        session.prepare(CaptureConfig::default());
        session.pause();
        assert_eq!(session.state(), CaptureState::Ready);
    }

    #[test]
    fn cancel_releases_device_and_allows_restart() {
        let opens = Arc::new(AtomicUsize::new(0));
        let mut session = CaptureSession::new(MockBackend::counting(Arc::clone(&opens)));
        let observer = observe(&session);

        session.start();
        wait_for_chunks(&observer, 1);
        session.cancel();
        assert_eq!(session.state(), CaptureState::NotReady);

        session.start();
        assert_eq!(session.state(), CaptureState::Recording);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        session.stop();
    }

    #[test]
    fn transient_read_failures_are_skipped() {
        let mut session = CaptureSession::new(MockBackend {
            invalid_every: 2,
            ..MockBackend::default()
        });
        let observer = observe(&session);

        session.start();
        wait_for_chunks(&observer, 3);
        session.stop();

        assert_eq!(observer.complete_count(), 1);
        assert_eq!(*observer.events.lock().last().unwrap(), Event::Complete);
    }

    #[test]
    fn short_reads_deliver_actual_sample_count() {
        let mut session = CaptureSession::new(MockBackend {
            short_read: Some(CHUNK / 2),
            ..MockBackend::default()
        });
        let observer = observe(&session);

        session.start();
        wait_for_chunks(&observer, 2);
        session.stop();

        // The delivered length is what the device actually read, not the
        // buffer length.
        let events = observer.events.lock().clone();
        for event in events.iter() {
            if let Event::Chunk { len, .. } = event {
                assert_eq!(*len, CHUNK / 2);
            }
        }
        assert!(observer.chunk_count() >= 2);
        assert_eq!(observer.complete_count(), 1);
    }

    #[test]
    fn observer_replacement_takes_effect_on_next_chunk() {
        let mut session = CaptureSession::new(MockBackend::default());
        let first = observe(&session);

        session.start();
        wait_for_chunks(&first, 1);

        let second = Arc::new(Recorder::default());
        session.set_observer(Some(Arc::downgrade(&second) as Weak<dyn StreamObserver>));
        wait_for_chunks(&second, 1);
        session.stop();

        // The completion of the cycle goes to the active observer.
        assert_eq!(second.complete_count(), 1);
        assert_eq!(first.complete_count(), 0);
        assert!(first.chunk_count() >= 1);
    }

    #[test]
    fn dropped_observer_is_tolerated() {
        let mut session = CaptureSession::new(MockBackend::default());
        let observer = observe(&session);

        session.start();
        wait_for_chunks(&observer, 1);
        drop(observer);
        thread::sleep(Duration::from_millis(10));
        session.stop();
        assert_eq!(session.state(), CaptureState::NotReady);
    }

    #[test]
    fn double_stop_is_idempotent() {
        let mut session = CaptureSession::new(MockBackend::default());
        let observer = observe(&session);

        session.start();
        wait_for_chunks(&observer, 1);
        session.stop();
        session.stop();

        assert_eq!(observer.complete_count(), 1);
        assert_eq!(session.state(), CaptureState::NotReady);
    }

    #[test]
    fn recording_scenario_delivers_chunks_then_single_complete() {
        // configure {44100 Hz, mono, 16-bit} → start → record → stop
        let mut session = CaptureSession::new(MockBackend::default());
        let observer = observe(&session);

        session.prepare(CaptureConfig {
            sample_rate_hz: 44_100,
            channels: ChannelLayout::Mono,
            ..CaptureConfig::default()
        });
        session.start();
        thread::sleep(Duration::from_millis(500));
        session.stop();

        assert!(observer.chunk_count() >= 1);
        assert_eq!(observer.complete_count(), 1);
        assert_eq!(*observer.events.lock().last().unwrap(), Event::Complete);
        assert_eq!(session.state(), CaptureState::NotReady);
    }
}
