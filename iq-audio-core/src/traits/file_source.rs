use std::path::Path;

use num_complex::Complex64;

use crate::models::error::AudioError;

/// A recorded I/Q stream played back in place of live capture.
pub trait IqFileSource: Send {
    /// Sample rate declared by the file.
    fn sample_rate(&self) -> u32;

    /// Fill `buffer` with the next samples.
    ///
    /// End-of-data behaviour belongs to the implementation (looping or
    /// zero-fill); the buffer is always fully written.
    fn read(&mut self, buffer: &mut [Complex64]);

    /// Release the underlying file.
    fn dispose(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Opens file sources by path.
pub trait FileSourceOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn IqFileSource>, AudioError>;
}
