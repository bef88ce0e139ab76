//! Audio device enumeration via the default cpal host.
//!
//! Devices are addressed by their position in the host's input or output
//! device list, which is the `DeviceIndex` the session controller records.

use cpal::traits::{DeviceTrait, HostTrait};

use iq_audio_core::models::audio_models::{AudioDevice, DeviceDirection, DeviceIndex};
use iq_audio_core::models::error::AudioError;

/// Audio device enumerator backed by `cpal::default_host()`.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List capture (input) devices.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        self.list_devices(DeviceDirection::Capture)
    }

    /// List render (output) devices.
    pub fn list_render_devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        self.list_devices(DeviceDirection::Render)
    }

    /// Look up a device by direction and list position.
    pub fn device(&self, direction: DeviceDirection, index: DeviceIndex) -> Result<cpal::Device, AudioError> {
        self.devices(direction)?
            .nth(index)
            .ok_or(AudioError::DeviceNotAvailable)
    }

    fn devices(&self, direction: DeviceDirection) -> Result<Box<dyn Iterator<Item = cpal::Device>>, AudioError> {
        let to_error = |e: cpal::DevicesError| AudioError::DeviceFailed(format!("failed to enumerate devices: {}", e));
        let devices: Box<dyn Iterator<Item = cpal::Device>> = match direction {
            DeviceDirection::Capture => Box::new(self.host.input_devices().map_err(to_error)?),
            DeviceDirection::Render => Box::new(self.host.output_devices().map_err(to_error)?),
        };
        Ok(devices)
    }

    fn default_device_name(&self, direction: DeviceDirection) -> Option<String> {
        let device = match direction {
            DeviceDirection::Capture => self.host.default_input_device(),
            DeviceDirection::Render => self.host.default_output_device(),
        };
        device.and_then(|d| d.name().ok())
    }

    fn list_devices(&self, direction: DeviceDirection) -> Result<Vec<AudioDevice>, AudioError> {
        let default_name = self.default_device_name(direction);
        let devices: Vec<AudioDevice> = self
            .devices(direction)?
            .enumerate()
            .map(|(index, device)| {
                let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                AudioDevice {
                    index,
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    direction,
                }
            })
            .collect();

        log::debug!("found {} {:?} devices", devices.len(), direction);
        Ok(devices)
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
