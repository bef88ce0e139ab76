use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{DeviceIndex, SessionDiagnostics, SessionStatus};
use crate::models::config::SessionParameters;
use crate::models::error::AudioError;
use crate::models::state::SessionMode;
use crate::processing::iq_fifo::IqFifo;
use crate::session::callbacks::{CaptureFiller, RenderFiller, RenderSource, SharedAudioState, SharedFileSource};
use crate::storage::wave_source::WaveFileOpener;
use crate::traits::device_binding::{DeviceBinding, DeviceHandle};
use crate::traits::file_source::FileSourceOpener;
use crate::traits::iq_consumer::IqConsumer;
use crate::traits::sample_queue::SampleQueue;

/// Resources held by the session, tagged by mode.
enum ActiveSession {
    /// Not playing. A file source may already be bound by `open_file`.
    Closed { file: Option<SharedFileSource> },
    LiveDuplex {
        capture: Box<dyn DeviceHandle>,
        render: Box<dyn DeviceHandle>,
        queue: Arc<dyn SampleQueue>,
    },
    FilePlayback {
        render: Box<dyn DeviceHandle>,
        file: SharedFileSource,
    },
}

impl ActiveSession {
    fn mode(&self) -> SessionMode {
        match self {
            Self::Closed { .. } => SessionMode::Closed,
            Self::LiveDuplex { .. } => SessionMode::LiveDuplex,
            Self::FilePlayback { .. } => SessionMode::FilePlayback,
        }
    }
}

/// Control core of the SDR audio pipeline.
///
/// Owns the session parameters and mode, registers the capture and render
/// fill callbacks with the device bindings and hands each render period's
/// I/Q samples to the registered [`IqConsumer`].
///
/// ```text
/// [Capture binding] → CaptureFiller → [IqFifo] ─┐
///                                                ├→ RenderFiller → consumer → gain → [Render binding]
///                               [File source] ───┘
/// ```
///
/// Lifecycle methods take `&mut self` and belong to the controlling thread.
/// Gain, swap and consumer registration may change at any time; the audio
/// threads pick them up on their next period.
pub struct SessionController<C: DeviceBinding, R: DeviceBinding, F: FileSourceOpener = WaveFileOpener> {
    capture: C,
    render: R,
    files: F,
    params: SessionParameters,
    session: ActiveSession,
    shared: Arc<SharedAudioState>,
}

impl<C: DeviceBinding, R: DeviceBinding> SessionController<C, R, WaveFileOpener> {
    pub fn new(capture: C, render: R) -> Self {
        Self::with_file_opener(capture, render, WaveFileOpener)
    }
}

impl<C: DeviceBinding, R: DeviceBinding, F: FileSourceOpener> SessionController<C, R, F> {
    pub fn with_file_opener(capture: C, render: R, files: F) -> Self {
        Self {
            capture,
            render,
            files,
            params: SessionParameters::default(),
            session: ActiveSession::Closed { file: None },
            shared: Arc::new(SharedAudioState::default()),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.session.mode()
    }

    pub fn is_playing(&self) -> bool {
        self.mode().is_playing()
    }

    /// Current sample rate in Hz; 0 when unset.
    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    pub fn parameters(&self) -> SessionParameters {
        self.params
    }

    /// Gain setting in application units (10 = unity).
    pub fn gain(&self) -> f64 {
        self.shared.gain.setting()
    }

    pub fn set_gain(&self, setting: f64) {
        self.shared.gain.set_setting(setting);
    }

    pub fn swap_iq(&self) -> bool {
        self.shared.swap_iq.load(Ordering::Relaxed)
    }

    pub fn set_swap_iq(&self, swap: bool) {
        self.shared.swap_iq.store(swap, Ordering::Relaxed);
    }

    /// Register the application hook invoked once per render period.
    pub fn set_consumer(&self, consumer: Arc<dyn IqConsumer>) {
        *self.shared.consumer.write() = Some(consumer);
    }

    /// Unregister the application hook; render periods become no-ops.
    pub fn clear_consumer(&self) {
        *self.shared.consumer.write() = None;
    }

    pub fn has_consumer(&self) -> bool {
        self.shared.consumer.read().is_some()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.shared.diagnostics.snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            mode: self.mode(),
            sample_rate: self.sample_rate(),
            parameters: self.params,
            gain: self.gain(),
            swap_iq: self.swap_iq(),
            diagnostics: self.diagnostics(),
        }
    }

    /// Record live-device parameters. Any active session is stopped first.
    pub fn open_device(
        &mut self,
        input_device: DeviceIndex,
        output_device: DeviceIndex,
        sample_rate: u32,
        buffer_size_ms: u32,
    ) {
        self.stop_logged();

        self.params = SessionParameters {
            input_device: Some(input_device),
            output_device,
            sample_rate,
            buffer_size_ms,
        };
        log::info!(
            "device session configured: input {} → output {}, {} Hz, {} ms periods",
            input_device,
            output_device,
            sample_rate,
            buffer_size_ms
        );
    }

    /// Bind a recorded I/Q file for playback and adopt its sample rate.
    ///
    /// Failures are logged and leave the session closed with
    /// `sample_rate() == 0`; callers detect them by polling.
    pub fn open_file(&mut self, path: impl AsRef<Path>, output_device: DeviceIndex, buffer_size_ms: u32) {
        let path = path.as_ref();
        self.stop_logged();

        self.params.input_device = None;
        self.params.output_device = output_device;
        self.params.buffer_size_ms = buffer_size_ms;

        match self.files.open(path) {
            Ok(source) => {
                self.params.sample_rate = source.sample_rate();
                self.session = ActiveSession::Closed {
                    file: Some(Arc::new(Mutex::new(source))),
                };
                log::info!(
                    "file session configured: {} → output {}, {} Hz",
                    path.display(),
                    output_device,
                    self.params.sample_rate
                );
            }
            Err(e) => {
                log::warn!("failed to open I/Q file {}: {}", path.display(), e);
                self.stop_logged();
            }
        }
    }

    /// Start the configured session.
    ///
    /// Returns `Ok(false)` without side effects if already playing. On a
    /// device error the session is stopped before the error is returned.
    pub fn play(&mut self) -> Result<bool, AudioError> {
        if self.is_playing() {
            return Ok(false);
        }

        match self.start_session() {
            Ok(session) => {
                self.session = session;
                log::info!("session playing: {:?} at {} Hz", self.mode(), self.params.sample_rate);
                Ok(true)
            }
            Err(e) => {
                log::error!("failed to start session: {}", e);
                self.stop_logged();
                Err(e)
            }
        }
    }

    /// Release every session resource and return to `Closed`.
    ///
    /// Each release is attempted even if an earlier one fails; the first
    /// failure is returned after all of them ran. Idempotent.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        let session = std::mem::replace(&mut self.session, ActiveSession::Closed { file: None });
        let previous = session.mode();
        let mut first_error = None;

        match session {
            ActiveSession::Closed { file } => {
                if let Some(file) = file {
                    record_release(&mut first_error, "file source", file.lock().dispose());
                }
            }
            ActiveSession::LiveDuplex { capture, render, queue } => {
                record_release(&mut first_error, "render device", render.release());
                record_release(&mut first_error, "capture device", capture.release());
                record_release(&mut first_error, "sample queue", queue.close());
            }
            ActiveSession::FilePlayback { render, file } => {
                record_release(&mut first_error, "render device", render.release());
                record_release(&mut first_error, "file source", file.lock().dispose());
            }
        }

        self.params.sample_rate = 0;
        if previous.is_playing() {
            log::info!("session stopped (was {:?})", previous);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // --- Internal helpers ---

    fn stop_logged(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("stop completed with error: {}", e);
        }
    }

    fn start_session(&mut self) -> Result<ActiveSession, AudioError> {
        self.params.validate().map_err(AudioError::InvalidParameters)?;

        let frames = self.params.frames_per_buffer();
        self.shared.diagnostics.reset();

        let bound_file = match &self.session {
            ActiveSession::Closed { file } => file.clone(),
            _ => None,
        };

        if let Some(file) = bound_file {
            let render = self.open_render(RenderSource::File(Arc::clone(&file)), frames)?;
            return Ok(ActiveSession::FilePlayback { render, file });
        }

        let input_device = self
            .params
            .input_device
            .ok_or_else(|| AudioError::InvalidParameters("no input device configured".into()))?;

        let queue: Arc<dyn SampleQueue> = Arc::new(IqFifo::for_period(
            frames,
            Duration::from_millis(u64::from(self.params.buffer_size_ms)),
        ));

        let mut capture_filler = CaptureFiller::new(Arc::clone(&self.shared), Arc::clone(&queue));
        let capture = self.capture.open(
            input_device,
            self.params.sample_rate,
            frames,
            Box::new(move |buffer: &mut [f32]| capture_filler.fill(buffer)),
        )?;

        let render = match self.open_render(RenderSource::Queue(Arc::clone(&queue)), frames) {
            Ok(render) => render,
            Err(e) => {
                let mut ignored = None;
                record_release(&mut ignored, "capture device", capture.release());
                record_release(&mut ignored, "sample queue", queue.close());
                return Err(e);
            }
        };

        Ok(ActiveSession::LiveDuplex { capture, render, queue })
    }

    fn open_render(&self, source: RenderSource, frames: usize) -> Result<Box<dyn DeviceHandle>, AudioError> {
        let mut render_filler = RenderFiller::new(Arc::clone(&self.shared), source);
        self.render.open(
            self.params.output_device,
            self.params.sample_rate,
            frames,
            Box::new(move |buffer: &mut [f32]| render_filler.fill(buffer)),
        )
    }
}

impl<C: DeviceBinding, R: DeviceBinding, F: FileSourceOpener> Drop for SessionController<C, R, F> {
    fn drop(&mut self) {
        self.stop_logged();
    }
}

fn record_release(first_error: &mut Option<AudioError>, what: &str, result: Result<(), AudioError>) {
    if let Err(e) = result {
        log::error!("failed to release {}: {}", what, e);
        first_error.get_or_insert(e);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    use num_complex::Complex64;
    use parking_lot::Mutex;

    use super::*;
    use crate::processing::gain::effective_gain;
    use crate::traits::device_binding::FillCallback;
    use crate::traits::file_source::IqFileSource;

    #[derive(Debug, Clone, PartialEq)]
    struct OpenRequest {
        device: DeviceIndex,
        sample_rate: u32,
        frames: usize,
    }

    #[derive(Default)]
    struct MockState {
        next_id: usize,
        callbacks: Vec<(usize, FillCallback)>,
        opened: Vec<OpenRequest>,
        released: usize,
        fail_open: Option<AudioError>,
        fail_release: Option<AudioError>,
    }

    /// Device binding whose periods are driven by the test.
    #[derive(Clone, Default)]
    struct MockBinding {
        state: Arc<Mutex<MockState>>,
    }

    impl MockBinding {
        fn failing_open(error: AudioError) -> Self {
            let binding = Self::default();
            binding.state.lock().fail_open = Some(error);
            binding
        }

        fn fail_release(&self, error: AudioError) {
            self.state.lock().fail_release = Some(error);
        }

        /// Run one period on the most recently opened live callback.
        fn fire(&self, buffer: &mut [f32]) -> bool {
            let mut state = self.state.lock();
            match state.callbacks.last_mut() {
                Some((_, callback)) => {
                    callback(buffer);
                    true
                }
                None => false,
            }
        }

        fn active(&self) -> usize {
            self.state.lock().callbacks.len()
        }

        fn opened(&self) -> Vec<OpenRequest> {
            self.state.lock().opened.clone()
        }

        fn released(&self) -> usize {
            self.state.lock().released
        }
    }

    impl DeviceBinding for MockBinding {
        fn open(
            &self,
            device: DeviceIndex,
            sample_rate: u32,
            frames_per_buffer: usize,
            callback: FillCallback,
        ) -> Result<Box<dyn DeviceHandle>, AudioError> {
            let mut state = self.state.lock();
            if let Some(e) = state.fail_open.clone() {
                return Err(e);
            }
            let id = state.next_id;
            state.next_id += 1;
            state.callbacks.push((id, callback));
            state.opened.push(OpenRequest {
                device,
                sample_rate,
                frames: frames_per_buffer,
            });
            Ok(Box::new(MockHandle {
                id,
                state: Arc::clone(&self.state),
            }))
        }
    }

    struct MockHandle {
        id: usize,
        state: Arc<Mutex<MockState>>,
    }

    impl DeviceHandle for MockHandle {
        fn release(self: Box<Self>) -> Result<(), AudioError> {
            let mut state = self.state.lock();
            state.callbacks.retain(|(id, _)| *id != self.id);
            state.released += 1;
            match state.fail_release.clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    struct MemorySource {
        sample_rate: u32,
        value: Complex64,
        disposed: Arc<Mutex<usize>>,
    }

    impl IqFileSource for MemorySource {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn read(&mut self, buffer: &mut [Complex64]) {
            buffer.fill(self.value);
        }

        fn dispose(&mut self) -> Result<(), AudioError> {
            *self.disposed.lock() += 1;
            Ok(())
        }
    }

    /// Opens a constant-valued source for any path except "missing.wav".
    #[derive(Default)]
    struct MemoryOpener {
        disposed: Arc<Mutex<usize>>,
    }

    impl FileSourceOpener for MemoryOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn IqFileSource>, AudioError> {
            if path == Path::new("missing.wav") {
                return Err(AudioError::FileFailed("not found".into()));
            }
            Ok(Box::new(MemorySource {
                sample_rate: 250_000,
                value: Complex64::new(0.5, -0.5),
                disposed: Arc::clone(&self.disposed),
            }))
        }
    }

    type TestController = SessionController<MockBinding, MockBinding, MemoryOpener>;

    fn controller() -> (TestController, MockBinding, MockBinding) {
        let capture = MockBinding::default();
        let render = MockBinding::default();
        let session = SessionController::with_file_opener(capture.clone(), render.clone(), MemoryOpener::default());
        (session, capture, render)
    }

    fn constant_consumer(amplitude: f64) -> Arc<dyn IqConsumer> {
        Arc::new(move |_: &[Complex64], audio: &mut [f64]| audio.fill(amplitude))
    }

    fn recording_consumer(seen: Arc<Mutex<Vec<Complex64>>>) -> Arc<dyn IqConsumer> {
        Arc::new(move |iq: &[Complex64], audio: &mut [f64]| {
            seen.lock().extend_from_slice(iq);
            audio.fill(0.0);
        })
    }

    #[test]
    fn defaults() {
        let (session, _, _) = controller();
        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 0);
        assert_eq!(session.gain(), 10.0);
        assert!(!session.swap_iq());
        assert!(!session.has_consumer());
    }

    #[test]
    fn stop_on_closed_session_is_noop() {
        let (mut session, capture, render) = controller();
        assert!(session.stop().is_ok());
        assert!(session.stop().is_ok());
        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(capture.released() + render.released(), 0);
    }

    #[test]
    fn open_device_records_parameters_without_opening() {
        let (mut session, capture, render) = controller();
        session.open_device(1, 2, 48000, 20);

        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 48000);
        assert_eq!(session.parameters().input_device, Some(1));
        assert_eq!(session.parameters().output_device, 2);
        assert_eq!(capture.active() + render.active(), 0);
    }

    #[test]
    fn play_starts_live_duplex() {
        let (mut session, capture, render) = controller();
        session.open_device(1, 2, 48000, 20);

        assert_eq!(session.play(), Ok(true));

        assert_eq!(session.mode(), SessionMode::LiveDuplex);
        assert_eq!(session.sample_rate(), 48000);
        let expected = |device| OpenRequest {
            device,
            sample_rate: 48000,
            frames: 960,
        };
        assert_eq!(capture.opened(), vec![expected(1)]);
        assert_eq!(render.opened(), vec![expected(2)]);
    }

    #[test]
    fn stop_releases_everything_and_resets_rate() {
        let (mut session, capture, render) = controller();
        session.open_device(1, 2, 48000, 20);
        session.play().unwrap();

        session.stop().unwrap();

        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 0);
        assert_eq!(capture.active(), 0);
        assert_eq!(render.active(), 0);
        assert_eq!(capture.released(), 1);
        assert_eq!(render.released(), 1);

        session.stop().unwrap();
        assert_eq!(capture.released() + render.released(), 2);
    }

    #[test]
    fn second_play_returns_false_without_new_bindings() {
        let (mut session, capture, render) = controller();
        session.open_device(0, 0, 48000, 10);
        session.play().unwrap();

        assert_eq!(session.play(), Ok(false));
        assert_eq!(capture.opened().len(), 1);
        assert_eq!(render.opened().len(), 1);
        assert_eq!(session.mode(), SessionMode::LiveDuplex);
    }

    #[test]
    fn play_without_parameters_fails_closed() {
        let (mut session, capture, render) = controller();

        let err = session.play().unwrap_err();

        assert!(matches!(err, AudioError::InvalidParameters(_)));
        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(capture.opened().len() + render.opened().len(), 0);
    }

    #[test]
    fn render_open_failure_tears_down_capture() {
        let capture = MockBinding::default();
        let render = MockBinding::failing_open(AudioError::DeviceNotAvailable);
        let mut session =
            SessionController::with_file_opener(capture.clone(), render.clone(), MemoryOpener::default());
        session.open_device(1, 2, 48000, 20);

        assert_eq!(session.play(), Err(AudioError::DeviceNotAvailable));

        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 0);
        assert_eq!(capture.active(), 0);
        assert_eq!(capture.released(), 1);
    }

    #[test]
    fn capture_open_failure_is_returned() {
        let capture = MockBinding::failing_open(AudioError::DeviceFailed("busy".into()));
        let render = MockBinding::default();
        let mut session =
            SessionController::with_file_opener(capture.clone(), render.clone(), MemoryOpener::default());
        session.open_device(1, 2, 48000, 20);

        assert_eq!(session.play(), Err(AudioError::DeviceFailed("busy".into())));
        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(render.opened().len(), 0);
    }

    #[test]
    fn open_file_adopts_file_rate() {
        let (mut session, _, _) = controller();
        session.open_file("capture.wav", 3, 50);

        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 250_000);
        assert_eq!(session.parameters().input_device, None);
        assert_eq!(session.parameters().output_device, 3);
    }

    #[test]
    fn open_file_failure_is_swallowed() {
        let (mut session, _, _) = controller();
        session.open_device(1, 2, 48000, 20);

        session.open_file("missing.wav", 3, 50);

        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 0);
        assert!(matches!(session.play(), Err(AudioError::InvalidParameters(_))));
    }

    #[test]
    fn file_playback_renders_without_capture() {
        let (mut session, capture, render) = controller();
        let seen = Arc::new(Mutex::new(Vec::new()));
        session.set_consumer(recording_consumer(Arc::clone(&seen)));
        session.open_file("capture.wav", 3, 2);

        assert_eq!(session.play(), Ok(true));
        assert_eq!(session.mode(), SessionMode::FilePlayback);
        assert!(capture.opened().is_empty());
        assert_eq!(
            render.opened(),
            vec![OpenRequest {
                device: 3,
                sample_rate: 250_000,
                frames: 500,
            }]
        );

        assert!(render.fire(&mut [0.0f32; 8]));
        assert_eq!(*seen.lock(), vec![Complex64::new(0.5, -0.5); 4]);
    }

    #[test]
    fn stop_disposes_bound_file() {
        let opener = MemoryOpener::default();
        let disposed = Arc::clone(&opener.disposed);
        let mut session = SessionController::with_file_opener(MockBinding::default(), MockBinding::default(), opener);

        session.open_file("capture.wav", 0, 10);
        session.play().unwrap();
        session.stop().unwrap();
        assert_eq!(*disposed.lock(), 1);

        // Re-opening replaces (and disposes) a bound-but-idle file.
        session.open_file("capture.wav", 0, 10);
        session.open_file("capture.wav", 0, 10);
        assert_eq!(*disposed.lock(), 2);
    }

    #[test]
    fn render_output_tracks_gain_setting() {
        let (mut session, _, render) = controller();
        session.set_consumer(constant_consumer(0.25));
        session.open_file("capture.wav", 0, 10);
        session.play().unwrap();

        for setting in [0.0, 2.5, 10.0, 15.0, 20.0] {
            session.set_gain(setting);
            let mut buffer = [-1.0f32; 32];
            render.fire(&mut buffer);

            let expected = (0.25 * effective_gain(setting)) as f32;
            assert!(buffer.iter().all(|&s| s == expected), "gain setting {}", setting);
        }
    }

    #[test]
    fn render_without_consumer_is_noop() {
        let (mut session, _, render) = controller();
        session.open_file("capture.wav", 0, 10);
        session.play().unwrap();

        let mut buffer = [0.5f32; 8];
        render.fire(&mut buffer);

        assert!(buffer.iter().all(|&s| s == 0.5));
        assert_eq!(session.diagnostics().idle_render_periods, 1);
        assert_eq!(session.diagnostics().render_periods, 0);
    }

    #[test]
    fn consumer_can_be_cleared_while_playing() {
        let (mut session, _, render) = controller();
        session.set_consumer(constant_consumer(1.0));
        session.open_file("capture.wav", 0, 10);
        session.play().unwrap();

        session.clear_consumer();
        let mut buffer = [0.0f32; 4];
        render.fire(&mut buffer);

        assert!(!session.has_consumer());
        assert_eq!(buffer, [0.0; 4]);
    }

    #[test]
    fn live_capture_flows_to_consumer() {
        let (mut session, capture, render) = controller();
        let seen = Arc::new(Mutex::new(Vec::new()));
        session.set_consumer(recording_consumer(Arc::clone(&seen)));
        session.open_device(0, 0, 48000, 10);
        session.play().unwrap();

        capture.fire(&mut [1.0f32, 2.0, -1.0, -2.0]);
        render.fire(&mut [0.0f32; 4]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!((seen[0].re - 0.01).abs() < 1e-9);
        assert!((seen[0].im - 0.02).abs() < 1e-9);
        assert!((seen[1].re + 0.01).abs() < 1e-9);
        assert!((seen[1].im + 0.02).abs() < 1e-9);
    }

    #[test]
    fn live_underrun_returns_well_within_the_period() {
        let (mut session, _, render) = controller();
        session.set_consumer(constant_consumer(0.5));
        session.open_device(0, 0, 48000, 50);
        session.play().unwrap();

        let started = Instant::now();
        assert!(render.fire(&mut [0.0f32; 4800]));
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_millis(25), "render period took {:?}", elapsed);
        assert_eq!(session.diagnostics().underrun_samples, 2400);
    }

    #[test]
    fn stop_waits_for_in_flight_render_before_releasing_capture() {
        let (mut session, capture, render) = controller();
        let (entered_tx, entered_rx) = mpsc::channel();
        let capture_open_during_render = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        {
            let capture = capture.clone();
            let capture_open_during_render = Arc::clone(&capture_open_during_render);
            let finished = Arc::clone(&finished);
            session.set_consumer(Arc::new(move |_: &[Complex64], audio: &mut [f64]| {
                let _ = entered_tx.send(());
                thread::sleep(Duration::from_millis(30));
                capture_open_during_render.store(capture.active() == 1, Ordering::SeqCst);
                audio.fill(0.0);
                finished.store(true, Ordering::SeqCst);
            }));
        }
        session.open_device(0, 0, 48000, 10);
        session.play().unwrap();

        let period = {
            let render = render.clone();
            thread::spawn(move || render.fire(&mut [0.0f32; 960]))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        session.stop().unwrap();

        assert!(finished.load(Ordering::SeqCst));
        assert!(capture_open_during_render.load(Ordering::SeqCst));
        assert_eq!(capture.active() + render.active(), 0);
        assert!(period.join().unwrap());
    }

    #[test]
    fn live_capture_drops_periods_under_backlog() {
        let (mut session, capture, _) = controller();
        session.open_device(0, 0, 48000, 10);
        session.play().unwrap();

        for _ in 0..4 {
            capture.fire(&mut [0.1f32; 8]);
        }

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.capture_periods, 4);
        assert_eq!(diagnostics.dropped_capture_periods, 2);
    }

    #[test]
    fn swap_is_applied_at_consumer_boundary() {
        let (mut session, _, render) = controller();
        let seen = Arc::new(Mutex::new(Vec::new()));
        session.set_consumer(recording_consumer(Arc::clone(&seen)));
        session.set_swap_iq(true);
        session.open_file("capture.wav", 0, 10);
        session.play().unwrap();

        render.fire(&mut [0.0f32; 2]);

        assert_eq!(*seen.lock(), vec![Complex64::new(-0.5, 0.5)]);
    }

    #[test]
    fn release_failure_does_not_skip_other_releases() {
        let (mut session, capture, render) = controller();
        session.open_device(1, 2, 48000, 20);
        session.play().unwrap();
        render.fail_release(AudioError::DeviceFailed("stuck".into()));

        assert_eq!(session.stop(), Err(AudioError::DeviceFailed("stuck".into())));

        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 0);
        assert_eq!(capture.released(), 1);
        assert_eq!(capture.active(), 0);
        assert!(session.stop().is_ok());
    }

    #[test]
    fn open_device_stops_running_session() {
        let (mut session, capture, render) = controller();
        session.open_device(1, 2, 48000, 20);
        session.play().unwrap();

        session.open_device(3, 4, 96000, 10);

        assert_eq!(session.mode(), SessionMode::Closed);
        assert_eq!(session.sample_rate(), 96000);
        assert_eq!(capture.active() + render.active(), 0);
    }

    #[test]
    fn status_serializes_for_polling() {
        let (mut session, _, _) = controller();
        session.open_device(1, 2, 48000, 20);
        session.set_gain(12.0);

        let status = session.status();
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["mode"], "closed");
        assert_eq!(json["sample_rate"], 48000);
        assert_eq!(json["gain"], 12.0);
        assert_eq!(json["parameters"]["input_device"], 1);
    }

    #[test]
    fn drop_releases_devices() {
        let (mut session, capture, render) = controller();
        session.open_device(1, 2, 48000, 20);
        session.play().unwrap();

        drop(session);

        assert_eq!(capture.active() + render.active(), 0);
    }
}
