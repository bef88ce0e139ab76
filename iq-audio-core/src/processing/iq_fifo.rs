use std::time::{Duration, Instant};

use num_complex::Complex64;
use parking_lot::{Condvar, Mutex};

use crate::models::error::AudioError;
use crate::processing::ring_buffer::RingBuffer;
use crate::traits::sample_queue::SampleQueue;

/// Default capacity: one second at 192 kHz.
pub const DEFAULT_FIFO_CAPACITY: usize = 192_000;

/// Upper bound on how long `read` waits for a full period.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A read may wait at most this fraction of a device period.
const PERIOD_WAIT_DIVISOR: u32 = 4;

struct FifoState {
    ring: RingBuffer<Complex64>,
    closed: bool,
}

/// Blocking-read I/Q queue between the capture and render callbacks.
///
/// Read contract: `read` waits up to the read timeout for the full request,
/// then delivers what is queued and zero-fills the remainder. Once closed,
/// writes are ignored and reads zero-fill immediately.
pub struct IqFifo {
    state: Mutex<FifoState>,
    data_ready: Condvar,
    read_timeout: Duration,
}

impl IqFifo {
    /// Queue sized for a session with the given period.
    ///
    /// Holds at least four periods, and reads wait no longer than a quarter
    /// period (capped at [`DEFAULT_READ_TIMEOUT`]) so an underrun leaves the
    /// render callback most of its budget.
    pub fn for_period(frames_per_buffer: usize, period: Duration) -> Self {
        Self::with_capacity(
            DEFAULT_FIFO_CAPACITY.max(frames_per_buffer * 4),
            (period / PERIOD_WAIT_DIVISOR).min(DEFAULT_READ_TIMEOUT),
        )
    }

    pub fn with_capacity(capacity: usize, read_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(FifoState {
                ring: RingBuffer::new(capacity),
                closed: false,
            }),
            data_ready: Condvar::new(),
            read_timeout,
        }
    }

}

impl SampleQueue for IqFifo {
    fn write(&self, samples: &[Complex64]) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.ring.write(samples);
        drop(state);
        self.data_ready.notify_one();
    }

    fn read(&self, samples: &mut [Complex64]) -> usize {
        let deadline = Instant::now() + self.read_timeout;
        let mut state = self.state.lock();

        while !state.closed && state.ring.count() < samples.len() {
            if self.data_ready.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        let delivered = if state.closed {
            0
        } else {
            state.ring.read_into(samples)
        };
        drop(state);

        samples[delivered..].fill(Complex64::default());
        delivered
    }

    fn len(&self) -> usize {
        self.state.lock().ring.count()
    }

    fn close(&self) -> Result<(), AudioError> {
        {
            let mut state = self.state.lock();
            state.closed = true;
            state.ring.reset();
        }
        self.data_ready.notify_all();
        Ok(())
    }
}
