use std::sync::atomic::{AtomicU64, Ordering};

/// Gain setting that maps to unity.
pub const UNITY_GAIN_SETTING: f64 = 10.0;

/// Map an application-facing gain setting to a linear factor.
///
/// `g = (setting / 10) ^ 10`: a steep power curve so a 0–20 control
/// behaves roughly logarithmically, with 10 mapping exactly to 1.0.
/// Out-of-range settings are not clamped.
pub fn effective_gain(setting: f64) -> f64 {
    (setting / UNITY_GAIN_SETTING).powi(10)
}

/// Gain setting shared between the controlling thread and the render callback.
///
/// Stored as `f64` bits in an atomic word; a reader may see the previous value
/// for one period, never a torn one.
#[derive(Debug)]
pub struct GainControl {
    bits: AtomicU64,
}

impl GainControl {
    pub fn new(setting: f64) -> Self {
        Self {
            bits: AtomicU64::new(setting.to_bits()),
        }
    }

    pub fn setting(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set_setting(&self, setting: f64) {
        self.bits.store(setting.to_bits(), Ordering::Relaxed);
    }

    /// Linear factor for the current setting.
    pub fn factor(&self) -> f64 {
        effective_gain(self.setting())
    }
}

impl Default for GainControl {
    fn default() -> Self {
        Self::new(UNITY_GAIN_SETTING)
    }
}
