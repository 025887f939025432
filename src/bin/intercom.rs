//! Intercom binary
//!
//! Streams the local input device to a peer and plays what the peer sends.
//!
//! ```bash
//! # Two hosts, default ports
//! intercom -a 192.168.1.20
//!
//! # Same host, two instances
//! intercom -l 4444 -p 4445
//! intercom -l 4445 -p 4444
//!
//! # List audio devices
//! intercom --list-devices
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::{oneshot, watch};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lan_intercom::audio::{list_devices, Direction};
use lan_intercom::config::{DeviceSelector, IntercomConfig, SampleEncoding};
use lan_intercom::intercom::{Intercom, Session};
use lan_intercom::telemetry::{self, SystemCpu, Telemetry};

/// Full-duplex audio intercom over UDP
#[derive(Parser, Debug)]
#[command(name = "intercom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input device (index, name substring, or 'default')
    #[arg(short = 'i', long, value_name = "DEVICE")]
    input_device: Option<DeviceSelector>,

    /// Output device (index, name substring, or 'default')
    #[arg(short = 'o', long, value_name = "DEVICE")]
    output_device: Option<DeviceSelector>,

    /// Number of channels
    #[arg(short = 'c', long = "number-of-channels", value_name = "N")]
    channels: Option<u16>,

    /// Sampling rate in frames per second
    #[arg(short = 's', long = "frames-per-second", value_name = "HZ")]
    sample_rate: Option<u32>,

    /// Frames per chunk (one datagram per chunk)
    #[arg(short = 'f', long, value_name = "FRAMES")]
    frames_per_chunk: Option<u32>,

    /// Local UDP port
    #[arg(short = 'l', long, value_name = "PORT")]
    listening_port: Option<u16>,

    /// Peer host name or address
    #[arg(short = 'a', long, value_name = "HOST")]
    destination_address: Option<String>,

    /// Peer UDP port
    #[arg(short = 'p', long, value_name = "PORT")]
    destination_port: Option<u16>,

    /// Sample encoding on the wire
    #[arg(short = 'e', long, value_enum)]
    encoding: Option<SampleEncoding>,

    /// Config file path
    #[arg(long, env = "INTERCOM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Do not print the per-second traffic report
    #[arg(long)]
    no_telemetry: bool,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Command-line flags override the config file
    fn apply(self, config: &mut IntercomConfig) {
        if let Some(device) = self.input_device {
            config.input_device = Some(device);
        }
        if let Some(device) = self.output_device {
            config.output_device = Some(device);
        }
        if let Some(channels) = self.channels {
            config.channels = channels;
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(frames) = self.frames_per_chunk {
            config.frames_per_chunk = frames;
        }
        if let Some(port) = self.listening_port {
            config.listening_port = port;
        }
        if let Some(address) = self.destination_address {
            config.destination_address = address;
        }
        if let Some(port) = self.destination_port {
            config.destination_port = port;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if self.no_telemetry {
            config.telemetry.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the telemetry table
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .init();

    if cli.list_devices {
        print_devices();
        return Ok(());
    }

    let mut config =
        IntercomConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    let intercom = Intercom::new(config).context("Invalid configuration")?;
    let config = intercom.config().clone();

    println!("\nInterCom parameters:\n\n{}\n", config);

    let session = intercom.start().context("Failed to start intercom")?;
    println!("{}\n", session.devices());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = match session.counters() {
        Some(counters) => {
            let stats = Telemetry::new(counters, SystemCpu::new());
            Some(tokio::spawn(telemetry::monitor(
                stats,
                config.telemetry.interval(),
                shutdown_rx,
            )))
        }
        None => None,
    };

    println!("InterCom running ... press enter-key to quit");
    let outcome = wait_for_quit(&session).await;

    let _ = shutdown_tx.send(true);
    let telemetry = match monitor {
        Some(handle) => handle.await.ok(),
        None => None,
    };

    let overflows = session.capture_overflows();
    let underruns = session.capture_underruns();
    session.stop();

    if let Some(telemetry) = telemetry {
        println!("\n{}", telemetry.summary());
        println!("capture overruns {} samples, capture underruns {} chunks", overflows, underruns);
    }

    outcome
}

/// Block until the user quits or the stream faults
async fn wait_for_quit(session: &Session) -> Result<()> {
    let (enter_tx, enter_rx) = oneshot::channel::<()>();
    std::thread::Builder::new()
        .name("intercom-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            // EOF on stdin (no terminal) leaves Ctrl-C as the only way out
            if let Ok(n) = std::io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    let _ = enter_tx.send(());
                }
            }
        })
        .context("Failed to spawn stdin reader")?;

    let mut enter = Box::pin(async move {
        // sender dropped on EOF: never resolve
        if enter_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    });
    let mut interrupt = Box::pin(tokio::signal::ctrl_c());
    let mut poll = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            _ = &mut enter => {
                tracing::info!("Quit requested");
                return Ok(());
            }
            result = &mut interrupt => {
                result.context("Failed to listen for Ctrl-C")?;
                println!();
                tracing::info!("Interrupted");
                return Ok(());
            }
            _ = poll.tick() => {
                while let Some(err) = session.check_errors() {
                    if err.is_fatal() {
                        bail!("Audio stream failed: {}", err);
                    }
                    tracing::warn!("Audio stream error: {}", err);
                }
            }
        }
    }
}

fn print_devices() {
    let devices = list_devices();
    for direction in [Direction::Input, Direction::Output] {
        println!("\n=== {} devices ===", direction);
        for device in devices.iter().filter(|d| d.direction == direction) {
            println!("{}", device);
        }
    }
    println!();
}
