use num_complex::Complex64;

use crate::models::error::AudioError;

/// FIFO of complex samples between the capture and render callbacks.
///
/// Safe for one writer and one reader on different threads.
pub trait SampleQueue: Send + Sync {
    /// Append samples. Never blocks.
    fn write(&self, samples: &[Complex64]);

    /// Fill `samples` from the queue.
    ///
    /// Waits a bounded time for enough data, then zero-fills whatever is
    /// still missing. Returns the number of queued samples delivered.
    fn read(&self, samples: &mut [Complex64]) -> usize;

    /// Number of unread samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard queued data and wake any waiting reader.
    fn close(&self) -> Result<(), AudioError>;
}
