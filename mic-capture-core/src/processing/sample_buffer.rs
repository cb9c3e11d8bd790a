/// Fixed-capacity circular buffer of signed 16-bit PCM samples.
///
/// Bridges a platform's push-style callback delivery to the worker's
/// pull-style blocking reads: wrap in `parking_lot::Mutex` (plus a `Condvar`
/// for blocking) for cross-thread use.
///
/// Overflow drops the oldest samples so a stalled reader cannot wedge the
/// capture callback.
#[derive(Debug)]
pub struct SampleBuffer {
    buffer: Vec<i16>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Append samples, dropping the oldest on overflow.
    ///
    /// If `samples` is larger than the capacity, only the tail is kept.
    pub fn write(&mut self, samples: &[i16]) {
        if samples.is_empty() || self.capacity == 0 {
            return;
        }

        let samples = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += samples.len();
    }

    /// Move up to `dst.len()` samples into the front of `dst`, returning how
    /// many were copied.
    pub fn read_into(&mut self, dst: &mut [i16]) -> usize {
        let count = dst.len().min(self.available);
        for slot in dst.iter_mut().take(count) {
            *slot = self.buffer[self.read_index];
            self.read_index = (self.read_index + 1) % self.capacity;
        }
        self.available -= count;
        count
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn clear(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
