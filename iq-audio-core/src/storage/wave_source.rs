use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use num_complex::Complex64;

use crate::models::error::AudioError;
use crate::traits::file_source::{FileSourceOpener, IqFileSource};

/// Recorded I/Q stream stored as a stereo WAV file.
///
/// Left channel is I, right channel is Q. Integer samples are normalised to
/// `[-1, 1)`; 32-bit float samples are taken as-is. Channels beyond the
/// second are ignored. Playback loops back to the first frame at the end of
/// the data.
pub struct WaveFileSource {
    path: PathBuf,
    reader: Option<WavReader<BufReader<File>>>,
    sample_rate: u32,
    channels: u16,
    sample_format: SampleFormat,
    int_scale: f64,
    total_frames: u32,
    position: u32,
}

impl WaveFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path)
            .map_err(|e| AudioError::FileFailed(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();

        if spec.channels < 2 {
            return Err(AudioError::FileFailed(format!(
                "{}: I/Q files need two channels, found {}",
                path.display(),
                spec.channels
            )));
        }
        if spec.sample_rate == 0 {
            return Err(AudioError::FileFailed(format!("{}: sample rate is zero", path.display())));
        }
        if spec.sample_format == SampleFormat::Float && spec.bits_per_sample != 32 {
            return Err(AudioError::FileFailed(format!(
                "{}: unsupported float width {}",
                path.display(),
                spec.bits_per_sample
            )));
        }

        let total_frames = reader.duration();
        log::info!(
            "opened I/Q file {} ({} Hz, {}-bit {:?}, {} frames)",
            path.display(),
            spec.sample_rate,
            spec.bits_per_sample,
            spec.sample_format,
            total_frames
        );

        Ok(Self {
            path,
            reader: Some(reader),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_format: spec.sample_format,
            int_scale: (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f64,
            total_frames,
            position: 0,
        })
    }

    /// Number of frames (I/Q samples) in the file.
    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Decode up to the end of the data into `out`, rewinding first if the
    /// previous read reached it. Returns the number of frames written.
    fn read_run(&mut self, out: &mut [Complex64]) -> Result<usize, hound::Error> {
        let Some(reader) = self.reader.as_mut() else {
            out.fill(Complex64::default());
            return Ok(out.len());
        };

        if self.position >= self.total_frames {
            reader.seek(0).map_err(hound::Error::IoError)?;
            self.position = 0;
        }

        let frames = out.len().min((self.total_frames - self.position) as usize);
        let out = &mut out[..frames];
        let channels = usize::from(self.channels);
        match self.sample_format {
            SampleFormat::Float => decode_frames(reader.samples::<f32>().map(|r| r.map(f64::from)), channels, out)?,
            SampleFormat::Int => {
                let scale = self.int_scale;
                decode_frames(reader.samples::<i32>().map(|r| r.map(|v| f64::from(v) / scale)), channels, out)?
            }
        }
        self.position += frames as u32;
        Ok(frames)
    }
}

/// Fill `out` with frames from one interleaved sample iterator.
fn decode_frames<I>(mut samples: I, channels: usize, out: &mut [Complex64]) -> Result<(), hound::Error>
where
    I: Iterator<Item = Result<f64, hound::Error>>,
{
    let mut next = || {
        samples
            .next()
            .unwrap_or(Err(hound::Error::FormatError("unexpected end of data")))
    };
    for frame in out.iter_mut() {
        let i = next()?;
        let q = next()?;
        for _ in 2..channels {
            next()?;
        }
        *frame = Complex64::new(i, q);
    }
    Ok(())
}

impl IqFileSource for WaveFileSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, buffer: &mut [Complex64]) {
        if self.total_frames == 0 || self.reader.is_none() {
            buffer.fill(Complex64::default());
            return;
        }

        let mut filled = 0;
        while filled < buffer.len() {
            match self.read_run(&mut buffer[filled..]) {
                Ok(frames) => filled += frames,
                Err(e) => {
                    log::warn!("I/Q file {} read failed: {}; dropping reader", self.path.display(), e);
                    self.reader = None;
                    buffer[filled..].fill(Complex64::default());
                    return;
                }
            }
        }
    }

    fn dispose(&mut self) -> Result<(), AudioError> {
        if self.reader.take().is_some() {
            log::debug!("closed I/Q file {}", self.path.display());
        }
        Ok(())
    }
}

/// Opens [`WaveFileSource`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveFileOpener;

impl FileSourceOpener for WaveFileOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn IqFileSource>, AudioError> {
        Ok(Box::new(WaveFileSource::open(path)?))
    }
}
