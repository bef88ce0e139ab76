use serde::{Deserialize, Serialize};

use super::config::SessionParameters;
use super::state::SessionMode;

/// Position of a device in the host's input or output device list.
pub type DeviceIndex = usize;

/// Direction of an audio device binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceDirection {
    Capture,
    Render,
}

/// An audio device available for capture or playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub index: DeviceIndex,
    pub name: String,
    pub direction: DeviceDirection,
    pub is_default: bool,
}

/// Counters updated by the audio callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    pub render_periods: u64,
    pub capture_periods: u64,
    pub dropped_capture_periods: u64,
    /// Samples the queue zero-filled because capture fell behind.
    pub underrun_samples: u64,
    /// Render periods skipped because no consumer was registered.
    pub idle_render_periods: u64,
}

/// Snapshot of the session for UI polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub mode: SessionMode,
    pub sample_rate: u32,
    pub parameters: SessionParameters,
    pub gain: f64,
    pub swap_iq: bool,
    pub diagnostics: SessionDiagnostics,
}
