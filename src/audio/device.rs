//! Audio device enumeration and selection

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{BufferSize, SampleFormat, SupportedBufferSize, SupportedStreamConfigRange};

use crate::config::DeviceSelector;
use crate::error::AudioError;

/// Which side of the duplex stream a device serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Wrapper around cpal device
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
    pub direction: Direction,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device, direction: Direction) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self {
            inner: device,
            name,
            direction,
        }
    }

    pub fn inner(&self) -> &cpal::Device {
        &self.inner
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }

    fn supported_configs(&self) -> Result<Vec<SupportedStreamConfigRange>, AudioError> {
        let configs: Result<Vec<SupportedStreamConfigRange>, _> = match self.direction {
            Direction::Input => self.inner.supported_input_configs().map(|it| it.collect()),
            Direction::Output => self.inner.supported_output_configs().map(|it| it.collect()),
        };
        configs.map_err(|e| AudioError::DeviceNotFound(format!("{}: {}", self.name, e)))
    }

    /// Fail early, with a readable message, when the device cannot run
    /// `channels` x `sample_rate` in `format`.
    pub fn check_support(
        &self,
        channels: u16,
        sample_rate: u32,
        format: SampleFormat,
    ) -> Result<(), AudioError> {
        let rate = cpal::SampleRate(sample_rate);
        let supported = self.supported_configs()?.iter().any(|range| {
            range.channels() == channels
                && range.sample_format() == format
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        });

        if supported {
            Ok(())
        } else {
            Err(AudioError::UnsupportedFormat(format!(
                "{} device '{}' cannot do {} channels at {} Hz as {:?}",
                self.direction, self.name, channels, sample_rate, format
            )))
        }
    }

    /// `Fixed(frames)` when the device advertises a range containing it,
    /// otherwise the host default.
    pub fn buffer_size_for(&self, frames: u32) -> BufferSize {
        let default = match self.direction {
            Direction::Input => self.inner.default_input_config(),
            Direction::Output => self.inner.default_output_config(),
        };
        match default.map(|c| c.buffer_size().clone()) {
            Ok(SupportedBufferSize::Range { min, max }) if (min..=max).contains(&frames) => {
                BufferSize::Fixed(frames)
            }
            _ => BufferSize::Default,
        }
    }
}

/// Device description for listings
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    /// Position within its direction's list; what an index selector refers to
    pub index: usize,
    pub name: String,
    pub direction: Direction,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

impl fmt::Display for AudioDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_marker = if self.is_default { " [DEFAULT]" } else { "" };
        write!(
            f,
            "{:>3} {}{} (channels {:?}, rates {:?})",
            self.index, self.name, default_marker, self.channels, self.sample_rates
        )
    }
}

/// List all available input and output devices
pub fn list_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
    let default_output_name = host.default_output_device().and_then(|d| d.name().ok());

    if let Ok(input_devices) = host.input_devices() {
        for (index, device) in input_devices.enumerate() {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let is_default = default_input_name.as_ref() == Some(&name);
            let (sample_rates, channels) = get_device_capabilities(&device, Direction::Input);
            devices.push(AudioDeviceInfo {
                index,
                name,
                direction: Direction::Input,
                is_default,
                sample_rates,
                channels,
            });
        }
    }

    if let Ok(output_devices) = host.output_devices() {
        for (index, device) in output_devices.enumerate() {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let is_default = default_output_name.as_ref() == Some(&name);
            let (sample_rates, channels) = get_device_capabilities(&device, Direction::Output);
            devices.push(AudioDeviceInfo {
                index,
                name,
                direction: Direction::Output,
                is_default,
                sample_rates,
                channels,
            });
        }
    }

    devices
}

/// Get device capabilities
fn get_device_capabilities(device: &cpal::Device, direction: Direction) -> (Vec<u32>, Vec<u16>) {
    let configs: Vec<SupportedStreamConfigRange> = match direction {
        Direction::Input => device.supported_input_configs().map(|it| it.collect()),
        Direction::Output => device.supported_output_configs().map(|it| it.collect()),
    }
    .unwrap_or_default();

    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();
    for config in &configs {
        // Common sample rates
        for rate_val in [8000u32, 16000, 22050, 44100, 48000, 88200, 96000, 192000] {
            let rate = cpal::SampleRate(rate_val);
            if rate >= config.min_sample_rate()
                && rate <= config.max_sample_rate()
                && !sample_rates.contains(&rate_val)
            {
                sample_rates.push(rate_val);
            }
        }
        if !channels.contains(&config.channels()) {
            channels.push(config.channels());
        }
    }

    sample_rates.sort_unstable();
    channels.sort_unstable();
    (sample_rates, channels)
}

/// Resolve a selector to a device. `None` and `Default` pick the host
/// default for `direction`.
pub fn select_device(
    selector: Option<&DeviceSelector>,
    direction: Direction,
) -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();

    let selector = match selector {
        None | Some(DeviceSelector::Default) => {
            let device = match direction {
                Direction::Input => host.default_input_device(),
                Direction::Output => host.default_output_device(),
            };
            return device
                .map(|d| AudioDevice::from_cpal(d, direction))
                .ok_or_else(|| AudioError::DeviceNotFound(format!("no default {} device", direction)));
        }
        Some(selector) => selector,
    };

    let devices = match direction {
        Direction::Input => host.input_devices(),
        Direction::Output => host.output_devices(),
    }
    .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for (index, device) in devices.enumerate() {
        let name = device.name().unwrap_or_default();
        if selector.matches(index, &name) {
            return Ok(AudioDevice::from_cpal(device, direction));
        }
    }

    Err(AudioError::DeviceNotFound(format!("{} device '{}'", direction, selector)))
}
