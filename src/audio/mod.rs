//! Audio subsystem module

pub mod buffer;
pub mod device;
pub mod stream;

pub use buffer::{QueueStats, SampleQueue};
pub use device::{list_devices, select_device, AudioDevice, AudioDeviceInfo, Direction};
pub use stream::{DuplexStream, PlaybackPump};
