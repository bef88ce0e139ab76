use serde::{Deserialize, Serialize};

use super::audio_models::DeviceIndex;

/// Parameters recorded by `open_device` / `open_file`.
///
/// Read-only to the audio path between opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionParameters {
    /// Capture device, or None when the session plays from a file.
    pub input_device: Option<DeviceIndex>,

    /// Render device.
    pub output_device: DeviceIndex,

    /// Device sample rate in Hz (0 = unset).
    pub sample_rate: u32,

    /// Device period length in milliseconds.
    pub buffer_size_ms: u32,
}

impl SessionParameters {
    /// Frames per device period: `buffer_size_ms * sample_rate / 1000`.
    pub fn frames_per_buffer(&self) -> usize {
        (self.buffer_size_ms as u64 * self.sample_rate as u64 / 1000) as usize
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate is not set".into());
        }
        if self.buffer_size_ms == 0 {
            return Err("buffer size must be positive".into());
        }
        if self.frames_per_buffer() == 0 {
            return Err(format!(
                "{} ms at {} Hz is less than one frame",
                self.buffer_size_ms, self.sample_rate
            ));
        }
        Ok(())
    }
}
