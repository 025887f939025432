//! Run/stop lifecycle
//!
//! [`Intercom::start`] performs every startup step that can fail (device
//! lookup, format check, socket bind) before any audio runs, then hands the
//! bridge to the audio thread. The returned [`Session`] owns the stream and
//! the counters until [`Session::stop`].

use std::fmt;
use std::sync::Arc;

use crate::audio::{select_device, AudioDevice, Direction, DuplexStream};
use crate::bridge::Bridge;
use crate::codec::WireSample;
use crate::config::{DeviceSelector, IntercomConfig, SampleEncoding};
use crate::error::{AudioError, Result};
use crate::network::{MeteredTransport, Transport, UdpTransport};
use crate::telemetry::Counters;

pub struct Intercom {
    config: IntercomConfig,
}

impl Intercom {
    /// Fails with `ConfigError` for a configuration that can never run
    pub fn new(config: IntercomConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IntercomConfig {
        &self.config
    }

    /// Open devices and sockets and start streaming
    pub fn start(&self) -> Result<Session> {
        match self.config.encoding {
            SampleEncoding::Int16 => self.start_typed::<i16>(),
            SampleEncoding::Int32 => self.start_typed::<i32>(),
            SampleEncoding::Float32 => self.start_typed::<f32>(),
        }
    }

    fn start_typed<T: WireSample>(&self) -> Result<Session> {
        let config = &self.config;

        let input = self.open_device(config.input_device.as_ref(), Direction::Input, T::FORMAT)?;
        let output = self.open_device(config.output_device.as_ref(), Direction::Output, T::FORMAT)?;

        let udp = UdpTransport::open(
            config.listening_port,
            &config.destination_address,
            config.destination_port,
        )?;

        let shape = config.chunk_shape();
        let (bridge, counters) = if config.telemetry.enabled {
            let counters = Arc::new(Counters::new());
            let transport: Box<dyn Transport> =
                Box::new(MeteredTransport::new(udp, counters.clone()));
            let bridge = Bridge::<T>::new(shape, transport).with_counters(counters.clone());
            (bridge, Some(counters))
        } else {
            let transport: Box<dyn Transport> = Box::new(udp);
            (Bridge::<T>::new(shape, transport), None)
        };

        let devices = DeviceNames {
            input: input.name.clone(),
            output: output.name.clone(),
        };
        let stream = DuplexStream::start(input, output, config.sample_rate, bridge)?;
        tracing::info!(
            "Streaming {} byte chunks every {:.1} ms",
            config.payload_len(),
            config.chunk_period().as_secs_f64() * 1000.0
        );

        Ok(Session {
            stream,
            counters,
            devices,
        })
    }

    fn open_device(
        &self,
        selector: Option<&DeviceSelector>,
        direction: Direction,
        format: cpal::SampleFormat,
    ) -> std::result::Result<AudioDevice, AudioError> {
        let device = select_device(selector, direction)?;
        device.check_support(self.config.channels, self.config.sample_rate, format)?;
        tracing::info!("Using {} device: {}", direction, device.name);
        Ok(device)
    }
}

/// Names of the devices a session runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNames {
    pub input: String,
    pub output: String,
}

impl fmt::Display for DeviceNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Using device:\n")?;
        writeln!(f, "  input:  {}", self.input)?;
        write!(f, "  output: {}", self.output)
    }
}

/// A running intercom
pub struct Session {
    stream: DuplexStream,
    counters: Option<Arc<Counters>>,
    devices: DeviceNames,
}

impl Session {
    pub fn devices(&self) -> &DeviceNames {
        &self.devices
    }

    /// Traffic counters, present when telemetry is enabled
    pub fn counters(&self) -> Option<Arc<Counters>> {
        self.counters.clone()
    }

    /// Next pending stream error or bridge fault, if any
    pub fn check_errors(&self) -> Option<AudioError> {
        self.stream.check_errors()
    }

    pub fn capture_overflows(&self) -> u64 {
        self.stream.capture_overflows()
    }

    pub fn capture_underruns(&self) -> u64 {
        self.stream.capture_underruns()
    }

    /// Stop both streams and close both sockets
    pub fn stop(mut self) {
        self.stream.stop();
        tracing::info!("Intercom stopped");
    }
}
