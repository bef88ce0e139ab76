//! cpal-backed device binding.
//!
//! Opens a 2-channel f32 stream at the session's rate and period size and
//! drives the session's fill callback from cpal's audio thread.

use std::sync::mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};

use iq_audio_core::models::audio_models::{DeviceDirection, DeviceIndex};
use iq_audio_core::models::error::AudioError;
use iq_audio_core::traits::device_binding::{DeviceBinding, DeviceHandle, FillCallback};

use crate::device_enumerator::DeviceEnumerator;

const CHANNELS: u16 = 2;

/// Device binding for one direction (capture or render).
///
/// `cpal::Stream` is not `Send`, so every opened stream lives on a dedicated
/// owner thread that builds it, starts it, and drops it when released.
#[derive(Debug, Clone, Copy)]
pub struct CpalDeviceBinding {
    direction: DeviceDirection,
}

impl CpalDeviceBinding {
    pub fn capture() -> Self {
        Self {
            direction: DeviceDirection::Capture,
        }
    }

    pub fn render() -> Self {
        Self {
            direction: DeviceDirection::Render,
        }
    }
}

impl DeviceBinding for CpalDeviceBinding {
    fn open(
        &self,
        device: DeviceIndex,
        sample_rate: u32,
        frames_per_buffer: usize,
        callback: FillCallback,
    ) -> Result<Box<dyn DeviceHandle>, AudioError> {
        let direction = self.direction;
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread_name = match direction {
            DeviceDirection::Capture => "iq-audio-capture",
            DeviceDirection::Render => "iq-audio-render",
        };

        let handle = thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || {
                let stream = match build_stream(direction, device, sample_rate, frames_per_buffer, callback) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::StreamFailed(format!("failed to start stream: {}", e))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Park until released (or the handle is dropped).
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| AudioError::DeviceFailed(format!("failed to spawn {} thread: {}", thread_name, e)))?;

        let started = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(AudioError::StreamFailed(format!("{} thread exited before start", thread_name))));

        if let Err(e) = started {
            let _ = handle.join();
            return Err(e);
        }

        log::info!(
            "{:?} device {} open: {} Hz, {} frames per period",
            direction,
            device,
            sample_rate,
            frames_per_buffer
        );

        Ok(Box::new(CpalStreamHandle {
            direction,
            stop_tx,
            thread: Some(handle),
        }))
    }
}

/// Open stream owned by its parked thread.
struct CpalStreamHandle {
    direction: DeviceDirection,
    stop_tx: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl DeviceHandle for CpalStreamHandle {
    fn release(mut self: Box<Self>) -> Result<(), AudioError> {
        let _ = self.stop_tx.send(());
        // Dropping the stream on the owner thread waits for the in-flight callback.
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| AudioError::StreamFailed(format!("{:?} stream thread panicked", self.direction)))?;
        }
        log::debug!("{:?} stream released", self.direction);
        Ok(())
    }
}

impl Drop for CpalStreamHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn build_stream(
    direction: DeviceDirection,
    index: DeviceIndex,
    sample_rate: u32,
    frames_per_buffer: usize,
    mut callback: FillCallback,
) -> Result<cpal::Stream, AudioError> {
    let device = DeviceEnumerator::new().device(direction, index)?;
    let config = StreamConfig {
        channels: CHANNELS,
        sample_rate: SampleRate(sample_rate),
        buffer_size: BufferSize::Fixed(frames_per_buffer as u32),
    };
    let on_error = move |err: cpal::StreamError| {
        log::error!("{:?} stream error: {}", direction, err);
    };

    let stream = match direction {
        DeviceDirection::Render => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Silence unless the session writes this period.
                data.fill(0.0);
                callback(data);
            },
            on_error,
            None,
        ),
        DeviceDirection::Capture => {
            let mut scratch = Vec::with_capacity(frames_per_buffer * CHANNELS as usize);
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend_from_slice(data);
                    callback(scratch.as_mut_slice());
                },
                on_error,
                None,
            )
        }
    };

    stream.map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => AudioError::DeviceNotAvailable,
        other => AudioError::DeviceFailed(format!("failed to build {:?} stream: {}", direction, other)),
    })
}
