//! # iq-audio-core
//!
//! Platform-agnostic control core for a software-defined-radio audio pipeline.
//!
//! Bridges a real-time audio device's fixed-size interleaved-stereo buffer
//! callbacks with the application's complex (I/Q) sample domain. Platform
//! backends implement the `DeviceBinding` trait and plug into the generic
//! `SessionController`.
//!
//! ## Architecture
//!
//! ```text
//! iq-audio-core (this crate)
//! ├── traits/       ← DeviceBinding, SampleQueue, IqFileSource, IqConsumer
//! ├── models/       ← AudioError, SessionMode, SessionParameters, SessionStatus
//! ├── processing/   ← gain curve, I/Q conversion, RingBuffer, IqFifo
//! ├── session/      ← SessionController (mode state machine + fill callbacks)
//! └── storage/      ← WaveFileSource (recorded I/Q playback)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    AudioDevice, DeviceDirection, DeviceIndex, SessionDiagnostics, SessionStatus,
};
pub use models::config::SessionParameters;
pub use models::error::AudioError;
pub use models::state::SessionMode;
pub use num_complex::Complex64;
pub use processing::gain::{effective_gain, GainControl};
pub use processing::iq_fifo::IqFifo;
pub use processing::ring_buffer::RingBuffer;
pub use session::controller::SessionController;
pub use storage::wave_source::{WaveFileOpener, WaveFileSource};
pub use traits::device_binding::{DeviceBinding, DeviceHandle, FillCallback};
pub use traits::file_source::{FileSourceOpener, IqFileSource};
pub use traits::iq_consumer::IqConsumer;
pub use traits::sample_queue::SampleQueue;
