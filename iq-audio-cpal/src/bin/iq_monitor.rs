//! `iq-monitor`: drive an SDR audio session from the command line.
//!
//! Plays the AM envelope of the I/Q stream, either live from a capture device
//! or from a recorded stereo WAV file, then prints the session status.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use iq_audio_core::{AudioError, Complex64, DeviceIndex, IqConsumer, SessionController};
use iq_audio_cpal::{CpalDeviceBinding, CpalSession, DeviceEnumerator};

#[derive(Debug, Parser)]
#[command(name = "iq-monitor", about = "Monitor an I/Q stream through the sound card")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List capture and render devices.
    Devices,
    /// Capture I/Q from an input device and play the envelope.
    Live {
        #[arg(long, default_value_t = 0)]
        input: DeviceIndex,
        #[arg(long, default_value_t = 48000)]
        rate: u32,
        #[command(flatten)]
        playback: PlaybackArgs,
    },
    /// Play the envelope of a recorded I/Q WAV file.
    File {
        path: PathBuf,
        #[command(flatten)]
        playback: PlaybackArgs,
    },
}

#[derive(Debug, Args)]
struct PlaybackArgs {
    #[arg(long, default_value_t = 0)]
    output: DeviceIndex,
    #[arg(long = "buffer-ms", default_value_t = 100)]
    buffer_ms: u32,
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Gain setting, 10 = unity.
    #[arg(long, default_value_t = 10.0)]
    gain: f64,
    #[arg(long)]
    swap: bool,
}

/// Envelope detector: amplitude of each I/Q sample.
struct AmEnvelope;

impl IqConsumer for AmEnvelope {
    fn buffer_needed(&self, iq: &[Complex64], audio: &mut [f64]) {
        for (out, sample) in audio.iter_mut().zip(iq) {
            *out = sample.norm();
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("iq-monitor: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), AudioError> {
    match command {
        Command::Devices => list_devices(),
        Command::Live { input, rate, playback } => {
            let mut session = new_session(&playback);
            session.open_device(input, playback.output, rate, playback.buffer_ms);
            monitor(session, playback.seconds)
        }
        Command::File { path, playback } => {
            let mut session = new_session(&playback);
            session.open_file(&path, playback.output, playback.buffer_ms);
            if session.sample_rate() == 0 {
                return Err(AudioError::FileFailed(format!("could not open {}", path.display())));
            }
            monitor(session, playback.seconds)
        }
    }
}

fn list_devices() -> Result<(), AudioError> {
    let enumerator = DeviceEnumerator::new();
    for (label, devices) in [
        ("capture", enumerator.list_capture_devices()?),
        ("render", enumerator.list_render_devices()?),
    ] {
        println!("{} devices:", label);
        for device in devices {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("  [{}] {}{}", device.index, device.name, marker);
        }
    }
    Ok(())
}

fn new_session(playback: &PlaybackArgs) -> CpalSession {
    let session = SessionController::new(CpalDeviceBinding::capture(), CpalDeviceBinding::render());
    session.set_gain(playback.gain);
    session.set_swap_iq(playback.swap);
    session.set_consumer(Arc::new(AmEnvelope));
    session
}

fn monitor(mut session: CpalSession, seconds: u64) -> Result<(), AudioError> {
    session.play()?;
    thread::sleep(Duration::from_secs(seconds));

    match serde_json::to_string_pretty(&session.status()) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("failed to serialize status: {}", e),
    }
    session.stop()
}
