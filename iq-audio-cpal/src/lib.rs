//! # iq-audio-cpal
//!
//! cpal device backend for `iq-audio-core` sessions.
//!
//! Provides:
//! - `CpalDeviceBinding`: capture and render bindings over cpal streams
//! - `DeviceEnumerator`: input/output device listing by index
//!
//! ## Usage
//! ```ignore
//! use iq_audio_core::SessionController;
//! use iq_audio_cpal::CpalDeviceBinding;
//!
//! let mut session = SessionController::new(CpalDeviceBinding::capture(), CpalDeviceBinding::render());
//! session.open_device(0, 0, 48000, 20);
//! session.play()?;
//! ```

pub mod cpal_binding;
pub mod device_enumerator;

pub use cpal_binding::CpalDeviceBinding;
pub use device_enumerator::DeviceEnumerator;

/// Session controller wired to cpal capture and render bindings.
pub type CpalSession = iq_audio_core::SessionController<CpalDeviceBinding, CpalDeviceBinding>;
