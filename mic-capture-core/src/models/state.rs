use std::sync::atomic::{AtomicU8, Ordering};

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// not_ready → ready → recording ⇄ paused
///     ↑                   │          │
///     └─── stop/cancel ───┴──────────┘
/// ```
/// `stop()` and `cancel()` collapse directly back to `NotReady`; there is no
/// externally visible intermediate "stopped" value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    NotReady = 0,
    Ready = 1,
    Recording = 2,
    Paused = 3,
}

impl CaptureState {
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Ready,
            2 => Self::Recording,
            3 => Self::Paused,
            _ => Self::NotReady,
        }
    }
}

/// Lock-free state cell shared between the owning thread and the worker.
///
/// Single writer (the session, on the owning thread), single reader (the
/// worker); release/acquire ordering is enough for the worker to observe a
/// transition at its next loop check.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: CaptureState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> CaptureState {
        CaptureState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: CaptureState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
