//! Run configuration
//!
//! Everything here is fixed before the audio stream starts. Values come from
//! the built-in defaults, an optional TOML file and finally the command line;
//! the binary does the merging, this module only knows how to load, describe
//! and validate the result.

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::ChunkShape;
use crate::constants::*;
use crate::error::ConfigError;

/// Audio device selection, as typed by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectorRepr", into = "String")]
pub enum DeviceSelector {
    /// System default device
    Default,
    /// Position in the host's device list for the relevant direction
    Index(usize),
    /// Case-insensitive substring of the device name
    Name(String),
}

impl DeviceSelector {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("default") {
            return DeviceSelector::Default;
        }
        match s.parse::<usize>() {
            Ok(index) => DeviceSelector::Index(index),
            Err(_) => DeviceSelector::Name(s.to_string()),
        }
    }

    /// Whether a device called `name` at `index` is the one selected.
    /// `Default` never matches by name; callers resolve it through the host.
    pub fn matches(&self, index: usize, name: &str) -> bool {
        match self {
            DeviceSelector::Default => false,
            DeviceSelector::Index(i) => *i == index,
            DeviceSelector::Name(pattern) => name.to_lowercase().contains(&pattern.to_lowercase()),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Default => write!(f, "default"),
            DeviceSelector::Index(i) => write!(f, "{}", i),
            DeviceSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<DeviceSelector> for String {
    fn from(selector: DeviceSelector) -> Self {
        selector.to_string()
    }
}

/// TOML accepts both `input_device = 3` and `input_device = "USB"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    Index(usize),
    Text(String),
}

impl From<SelectorRepr> for DeviceSelector {
    fn from(repr: SelectorRepr) -> Self {
        match repr {
            SelectorRepr::Index(i) => DeviceSelector::Index(i),
            SelectorRepr::Text(s) => DeviceSelector::parse(&s),
        }
    }
}

/// Sample encoding on the device and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// 16-bit signed integer
    #[default]
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit IEEE float
    Float32,
}

impl SampleEncoding {
    /// Bytes per sample
    pub fn width(self) -> usize {
        match self {
            SampleEncoding::Int16 => 2,
            SampleEncoding::Int32 | SampleEncoding::Float32 => 4,
        }
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleEncoding::Int16 => "int16",
            SampleEncoding::Int32 => "int32",
            SampleEncoding::Float32 => "float32",
        };
        f.write_str(name)
    }
}

/// Periodic statistics report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_TELEMETRY_INTERVAL_MS,
        }
    }
}

impl TelemetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntercomConfig {
    pub input_device: Option<DeviceSelector>,
    pub output_device: Option<DeviceSelector>,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames_per_chunk: u32,
    pub encoding: SampleEncoding,
    pub listening_port: u16,
    pub destination_address: String,
    pub destination_port: u16,
    pub telemetry: TelemetryConfig,
}

impl Default for IntercomConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            frames_per_chunk: DEFAULT_FRAMES_PER_CHUNK,
            encoding: SampleEncoding::default(),
            listening_port: DEFAULT_LISTENING_PORT,
            destination_address: DEFAULT_DESTINATION_ADDRESS.to_string(),
            destination_port: DEFAULT_DESTINATION_PORT,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl IntercomConfig {
    /// Load from `path`, or from the per-user config file when it exists,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => {
                    tracing::debug!("Loading config from {}", path.display());
                    Self::from_file(&path)
                }
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<platform config dir>/lan-intercom/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lan-intercom")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn chunk_shape(&self) -> ChunkShape {
        ChunkShape::new(self.frames_per_chunk as usize, self.channels as usize)
    }

    /// Size of every datagram this configuration produces
    pub fn payload_len(&self) -> usize {
        self.chunk_shape().payload_len(self.encoding.width())
    }

    /// Hardware time budget of one bridge invocation
    pub fn chunk_period(&self) -> Duration {
        Duration::from_secs_f64(self.frames_per_chunk as f64 / self.sample_rate as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 {
            return Err(ConfigError::InvalidValue {
                field: "channels",
                reason: "must be at least 1".into(),
            });
        }
        if self.frames_per_chunk == 0 {
            return Err(ConfigError::InvalidValue {
                field: "frames_per_chunk",
                reason: "must be at least 1".into(),
            });
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sample_rate",
                reason: "must be positive".into(),
            });
        }
        if self.destination_address.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "destination_address",
                reason: "must not be empty".into(),
            });
        }
        if self.telemetry.enabled && self.telemetry.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.interval_ms",
                reason: "must be positive".into(),
            });
        }

        let payload = self.payload_len();
        if payload > MAX_PAYLOAD_BYTES {
            return Err(ConfigError::PayloadTooLarge {
                payload,
                limit: MAX_PAYLOAD_BYTES,
            });
        }
        Ok(())
    }
}

impl fmt::Display for IntercomConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_default = |s: &Option<DeviceSelector>| {
            s.as_ref().map_or_else(|| "default".to_string(), |s| s.to_string())
        };
        write!(
            f,
            "input={} output={} channels={} rate={}Hz chunk={} frames encoding={} \
             listen=0.0.0.0:{} peer={}:{} payload={} bytes",
            or_default(&self.input_device),
            or_default(&self.output_device),
            self.channels,
            self.sample_rate,
            self.frames_per_chunk,
            self.encoding,
            self.listening_port,
            self.destination_address,
            self.destination_port,
            self.payload_len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IntercomConfig::default();
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.frames_per_chunk, 1024);
        assert_eq!(config.encoding, SampleEncoding::Int16);
        assert_eq!(config.listening_port, 4444);
        assert_eq!(config.destination_address, "localhost");
        assert_eq!(config.destination_port, 4444);
        assert_eq!(config.payload_len(), 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let config = IntercomConfig {
            frames_per_chunk: 8192,
            ..Default::default()
        };
        // 8192 * 2 * 2 = 32768 is exactly at the limit
        assert!(config.validate().is_ok());

        let config = IntercomConfig {
            frames_per_chunk: 8192,
            encoding: SampleEncoding::Int32,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::PayloadTooLarge { payload, limit }) => {
                assert_eq!(payload, 65536);
                assert_eq!(limit, MAX_PAYLOAD_BYTES);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = IntercomConfig {
            channels: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "channels", .. })
        ));

        let config = IntercomConfig {
            frames_per_chunk: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!(DeviceSelector::parse("3"), DeviceSelector::Index(3));
        assert_eq!(DeviceSelector::parse("Default"), DeviceSelector::Default);
        assert_eq!(
            DeviceSelector::parse(" USB Audio "),
            DeviceSelector::Name("USB Audio".into())
        );

        let usb = DeviceSelector::parse("usb");
        assert!(usb.matches(5, "Generic USB Audio Device"));
        assert!(!usb.matches(5, "HDA Intel PCH"));
        assert!(DeviceSelector::Index(2).matches(2, "anything"));
        assert!(!DeviceSelector::Default.matches(0, "default"));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config: IntercomConfig = toml::from_str(
            r#"
            input_device = 2
            output_device = "speakers"
            channels = 1
            encoding = "float32"
            destination_address = "192.168.1.20"

            [telemetry]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.input_device, Some(DeviceSelector::Index(2)));
        assert_eq!(config.output_device, Some(DeviceSelector::Name("speakers".into())));
        assert_eq!(config.channels, 1);
        assert_eq!(config.encoding, SampleEncoding::Float32);
        assert_eq!(config.destination_address, "192.168.1.20");
        assert!(!config.telemetry.enabled);
        assert_eq!(config.telemetry.interval_ms, DEFAULT_TELEMETRY_INTERVAL_MS);
        // untouched fields keep their defaults
        assert_eq!(config.frames_per_chunk, 1024);
        assert_eq!(config.listening_port, 4444);
    }

    #[test]
    fn test_chunk_period() {
        let config = IntercomConfig {
            frames_per_chunk: 441,
            sample_rate: 44100,
            ..Default::default()
        };
        assert_eq!(config.chunk_period(), Duration::from_millis(10));
    }
}
