//! Duplex audio stream driving the bridge
//!
//! cpal exposes capture and playback as separate streams. The input
//! callback only queues captured samples. The output callback owns the
//! [`Bridge`] through a [`PlaybackPump`]: whenever the device asks for more
//! samples than are left from the last chunk, the pump pulls one chunk of
//! capture and runs one bridge invocation. The bridge therefore always sees
//! whole chunks, whatever buffer sizes the host picks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::audio::buffer::{QueueStats, SampleQueue, SharedSampleQueue};
use crate::audio::device::AudioDevice;
use crate::bridge::Bridge;
use crate::codec::WireSample;
use crate::constants::CAPTURE_QUEUE_CHUNKS;
use crate::error::AudioError;
use crate::network::Transport;

/// Output-side driver: slices fixed-size bridge chunks into whatever
/// buffer lengths the playback callback receives.
pub struct PlaybackPump<T, X = Box<dyn Transport>> {
    bridge: Bridge<T, X>,
    capture_queue: SharedSampleQueue<T>,
    /// Capture chunk handed to the bridge (reused)
    capture: Vec<T>,
    /// Last chunk produced by the bridge (reused)
    playback: Vec<T>,
    /// Samples of `playback` already written to the device
    cursor: usize,
    faulted: bool,
    faults: Sender<AudioError>,
}

impl<T: WireSample, X: Transport> PlaybackPump<T, X> {
    pub fn new(bridge: Bridge<T, X>, capture_queue: SharedSampleQueue<T>, faults: Sender<AudioError>) -> Self {
        let samples = bridge.shape().samples();
        Self {
            bridge,
            capture_queue,
            capture: vec![T::SILENCE; samples],
            playback: vec![T::SILENCE; samples],
            cursor: samples,
            faulted: false,
            faults,
        }
    }

    /// Fill one device buffer. Never blocks.
    pub fn fill(&mut self, out: &mut [T]) {
        if self.faulted || self.playback.is_empty() {
            out.fill(T::SILENCE);
            return;
        }

        let mut written = 0;
        while written < out.len() {
            if self.cursor == self.playback.len() && !self.next_chunk() {
                out[written..].fill(T::SILENCE);
                return;
            }
            let n = (out.len() - written).min(self.playback.len() - self.cursor);
            out[written..written + n].copy_from_slice(&self.playback[self.cursor..self.cursor + n]);
            written += n;
            self.cursor += n;
        }
    }

    /// One bridge invocation. Returns false once the bridge has faulted.
    fn next_chunk(&mut self) -> bool {
        self.capture_queue.pop_into(&mut self.capture);
        match self.bridge.process(&self.capture, &mut self.playback) {
            Ok(_) => {
                self.cursor = 0;
                true
            }
            Err(fault) => {
                self.faulted = true;
                tracing::error!("Bridge invariant violated, muting output: {}", fault);
                let _ = self.faults.try_send(AudioError::Fault(fault));
                false
            }
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn bridge(&self) -> &Bridge<T, X> {
        &self.bridge
    }
}

/// Owns the cpal input and output streams on a dedicated thread
pub struct DuplexStream {
    /// Whether the streams should keep running
    running: Arc<AtomicBool>,
    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,
    /// Channel for stream errors and bridge faults
    error_rx: Receiver<AudioError>,
    capture_stats: Arc<QueueStats>,
}

impl DuplexStream {
    /// Build both streams, start them, and return once audio is flowing.
    ///
    /// Any failure to open or start a stream is returned here; nothing runs
    /// in that case.
    pub fn start<T: WireSample>(
        input: AudioDevice,
        output: AudioDevice,
        sample_rate: u32,
        bridge: Bridge<T>,
    ) -> Result<Self, AudioError> {
        let shape = bridge.shape();
        let frames = shape.frames as u32;
        let buffer_size = match (input.buffer_size_for(frames), output.buffer_size_for(frames)) {
            (BufferSize::Fixed(n), BufferSize::Fixed(_)) => BufferSize::Fixed(n),
            _ => {
                tracing::warn!(
                    "Device does not accept {} frame buffers, using host default; chunks are re-sliced",
                    frames
                );
                BufferSize::Default
            }
        };
        let config = StreamConfig {
            channels: shape.channels as u16,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size,
        };

        let capture_queue: SharedSampleQueue<T> =
            Arc::new(SampleQueue::new(shape.samples() * CAPTURE_QUEUE_CHUNKS));
        let capture_stats = capture_queue.stats();

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        let running = Arc::new(AtomicBool::new(true));
        let running_for_loop = running.clone();

        let handle = thread::Builder::new()
            .name("intercom-audio".to_string())
            .spawn(move || {
                let pump = PlaybackPump::new(bridge, capture_queue.clone(), error_tx.clone());
                let streams = build_streams(&input, &output, &config, capture_queue, pump, error_tx);

                let (input_stream, output_stream) = match streams {
                    Ok(streams) => streams,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = output_stream.play().and_then(|_| input_stream.play()) {
                    let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep thread alive while running
                while running_for_loop.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }

                // Streams are dropped here, stopping capture and playback.
                // The bridge and its sockets go with the output stream.
                drop(input_stream);
                drop(output_stream);
                tracing::debug!("Audio streams closed");
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                running,
                thread_handle: Some(handle),
                error_rx,
                capture_stats,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::ThreadExited)
            }
        }
    }

    /// Stop both streams and wait for the audio thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if the streams are running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Check for errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.try_recv().ok()
    }

    /// Captured samples dropped because playback fell behind
    pub fn capture_overflows(&self) -> u64 {
        self.capture_stats.overflow_count()
    }

    /// Chunks sent with silence padding because capture fell behind
    pub fn capture_underruns(&self) -> u64 {
        self.capture_stats.underrun_count()
    }
}

impl Drop for DuplexStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_streams<T: WireSample>(
    input: &AudioDevice,
    output: &AudioDevice,
    config: &StreamConfig,
    capture_queue: SharedSampleQueue<T>,
    mut pump: PlaybackPump<T>,
    error_tx: Sender<AudioError>,
) -> Result<(cpal::Stream, cpal::Stream), AudioError> {
    let input_errors = error_tx.clone();
    let input_stream = input
        .inner()
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                capture_queue.push_slice(data);
            },
            move |err| {
                let _ = input_errors.try_send(stream_error(err));
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("input '{}': {}", input.name, e)))?;

    let output_stream = output
        .inner()
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                pump.fill(data);
            },
            move |err| {
                let _ = error_tx.try_send(stream_error(err));
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("output '{}': {}", output.name, e)))?;

    Ok((input_stream, output_stream))
}

fn stream_error(err: cpal::StreamError) -> AudioError {
    match err {
        cpal::StreamError::DeviceNotAvailable => {
            AudioError::DeviceNotFound("audio device is no longer available".to_string())
        }
        other => AudioError::StreamError(other.to_string()),
    }
}
