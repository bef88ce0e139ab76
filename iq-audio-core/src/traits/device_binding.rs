use crate::models::audio_models::DeviceIndex;
use crate::models::error::AudioError;

/// Callback invoked once per device period with the interleaved stereo
/// `[L0, R0, L1, R1, ...]` f32 buffer for that period.
///
/// Render bindings expect the callback to fill the buffer with output;
/// capture bindings hand it the freshly recorded input.
pub type FillCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Interface for platform-specific audio device backends.
///
/// One instance serves one direction (capture or render). Implemented by
/// `CpalDeviceBinding` in `iq-audio-cpal`.
pub trait DeviceBinding: Send + Sync {
    /// Open `device` as a 2-channel f32 stream and start invoking `callback`
    /// on the device's audio thread, once per period of
    /// `frames_per_buffer` frames.
    fn open(
        &self,
        device: DeviceIndex,
        sample_rate: u32,
        frames_per_buffer: usize,
        callback: FillCallback,
    ) -> Result<Box<dyn DeviceHandle>, AudioError>;
}

/// An open device stream.
pub trait DeviceHandle: Send {
    /// Stop the stream and drop its callback.
    ///
    /// Blocks until any in-flight callback has returned. Safe to call when
    /// no callback is running.
    fn release(self: Box<Self>) -> Result<(), AudioError>;
}
