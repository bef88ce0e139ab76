//! Per-period fill callbacks registered with the device bindings.
//!
//! Each filler owns its scratch buffers, so they live exactly as long as the
//! binding keeps the callback and are never touched by the controlling thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use num_complex::Complex64;
use parking_lot::{Mutex, RwLock};

use crate::models::audio_models::SessionDiagnostics;
use crate::processing::gain::GainControl;
use crate::processing::iq_convert;
use crate::traits::file_source::IqFileSource;
use crate::traits::iq_consumer::IqConsumer;
use crate::traits::sample_queue::SampleQueue;

pub(crate) type SharedFileSource = Arc<Mutex<Box<dyn IqFileSource>>>;

#[derive(Debug, Default)]
pub(crate) struct DiagnosticCounters {
    render_periods: AtomicU64,
    capture_periods: AtomicU64,
    dropped_capture_periods: AtomicU64,
    underrun_samples: AtomicU64,
    idle_render_periods: AtomicU64,
}

impl DiagnosticCounters {
    pub(crate) fn snapshot(&self) -> SessionDiagnostics {
        SessionDiagnostics {
            render_periods: self.render_periods.load(Ordering::Relaxed),
            capture_periods: self.capture_periods.load(Ordering::Relaxed),
            dropped_capture_periods: self.dropped_capture_periods.load(Ordering::Relaxed),
            underrun_samples: self.underrun_samples.load(Ordering::Relaxed),
            idle_render_periods: self.idle_render_periods.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.render_periods.store(0, Ordering::Relaxed);
        self.capture_periods.store(0, Ordering::Relaxed);
        self.dropped_capture_periods.store(0, Ordering::Relaxed);
        self.underrun_samples.store(0, Ordering::Relaxed);
        self.idle_render_periods.store(0, Ordering::Relaxed);
    }
}

/// State read by the audio threads and written by the controlling thread.
#[derive(Default)]
pub(crate) struct SharedAudioState {
    pub(crate) gain: GainControl,
    pub(crate) swap_iq: AtomicBool,
    pub(crate) consumer: RwLock<Option<Arc<dyn IqConsumer>>>,
    pub(crate) diagnostics: DiagnosticCounters,
}

/// Where the render path pulls its I/Q samples from.
pub(crate) enum RenderSource {
    Queue(Arc<dyn SampleQueue>),
    File(SharedFileSource),
}

/// Render path: I/Q source → consumer → gain → interleaved output.
pub(crate) struct RenderFiller {
    shared: Arc<SharedAudioState>,
    source: RenderSource,
    iq: Vec<Complex64>,
    audio: Vec<f64>,
}

impl RenderFiller {
    pub(crate) fn new(shared: Arc<SharedAudioState>, source: RenderSource) -> Self {
        Self {
            shared,
            source,
            iq: Vec::new(),
            audio: Vec::new(),
        }
    }

    pub(crate) fn fill(&mut self, buffer: &mut [f32]) {
        let Some(consumer) = self.shared.consumer.read().clone() else {
            self.shared.diagnostics.idle_render_periods.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let frames = buffer.len() / 2;
        if self.iq.len() != frames {
            self.iq = vec![Complex64::default(); frames];
            self.audio = vec![0.0; frames];
        }

        match &self.source {
            RenderSource::File(file) => file.lock().read(&mut self.iq),
            RenderSource::Queue(queue) => {
                let delivered = queue.read(&mut self.iq);
                if delivered < frames {
                    self.shared
                        .diagnostics
                        .underrun_samples
                        .fetch_add((frames - delivered) as u64, Ordering::Relaxed);
                }
            }
        }

        if self.shared.swap_iq.load(Ordering::Relaxed) {
            iq_convert::swap_iq(&mut self.iq);
        }

        consumer.buffer_needed(&self.iq, &mut self.audio);

        iq_convert::mono_to_interleaved(&self.audio, self.shared.gain.factor(), buffer);
        self.shared.diagnostics.render_periods.fetch_add(1, Ordering::Relaxed);
    }
}

/// Capture path: interleaved input → I/Q → queue, with backlog drop.
pub(crate) struct CaptureFiller {
    shared: Arc<SharedAudioState>,
    queue: Arc<dyn SampleQueue>,
    iq: Vec<Complex64>,
}

impl CaptureFiller {
    pub(crate) fn new(shared: Arc<SharedAudioState>, queue: Arc<dyn SampleQueue>) -> Self {
        Self {
            shared,
            queue,
            iq: Vec::new(),
        }
    }

    pub(crate) fn fill(&mut self, buffer: &mut [f32]) {
        let frames = buffer.len() / 2;
        self.shared.diagnostics.capture_periods.fetch_add(1, Ordering::Relaxed);

        // Two periods of backlog already queued: drop this one to bound latency.
        if self.queue.len() >= frames * 2 {
            self.shared
                .diagnostics
                .dropped_capture_periods
                .fetch_add(1, Ordering::Relaxed);
            return;
        }

        if self.iq.len() != frames {
            self.iq = vec![Complex64::default(); frames];
        }
        iq_convert::interleaved_to_iq(buffer, &mut self.iq);
        self.queue.write(&self.iq);
    }
}
