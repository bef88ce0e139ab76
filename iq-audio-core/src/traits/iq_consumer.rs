use num_complex::Complex64;

/// Application hook invoked once per render period.
///
/// Called from the render device's audio thread. `iq` holds the samples
/// produced for this period; `audio` has the same length and must be fully
/// written with mono amplitude values. Neither buffer may be retained past
/// the call.
pub trait IqConsumer: Send + Sync {
    fn buffer_needed(&self, iq: &[Complex64], audio: &mut [f64]);
}

impl<F> IqConsumer for F
where
    F: Fn(&[Complex64], &mut [f64]) + Send + Sync,
{
    fn buffer_needed(&self, iq: &[Complex64], audio: &mut [f64]) {
        self(iq, audio)
    }
}
