//! # Audio Capture Module
//!
//! Live capture from the default input device using CPAL (Cross-Platform
//! Audio Library).
//!
//! The CPAL stream is owned by a dedicated capture thread. The stream callback
//! only accumulates samples into fixed-length blocks and hands them over a
//! channel; the capture thread runs the analysis for each block, so no
//! FFT work ever happens on the audio callback.
//!
//! ## Audio Configuration
//! - Sample Rate: 48 kHz
//! - Format: 16-bit signed integer, 32-bit float converted to 16-bit as fallback
//! - Channels: Mono (1 channel)
//! - Block Size: one window step (12000 samples, 250 ms)

use std::thread::{self, JoinHandle};

use anyhow::{Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use log::{debug, warn};

use crate::config::CaptureFormat;
use crate::engine::{BlockSink, CaptureSource};

/// Captures from the default input device.
#[derive(Debug, Default)]
pub struct CpalCapture {
    worker: Option<CaptureWorker>,
}

/// Capture thread management.
#[derive(Debug)]
struct CaptureWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureSource for CpalCapture {
    fn start(&mut self, format: &CaptureFormat, sink: BlockSink) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let format = *format;
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        let thread_handle = thread::Builder::new()
            .name("tuner-capture".to_string())
            .spawn(move || {
                let (block_tx, block_rx) = crossbeam_channel::unbounded::<Vec<i16>>();
                let stream = match open_input_stream(&format, block_tx) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                loop {
                    crossbeam_channel::select! {
                        recv(block_rx) -> msg => match msg {
                            Ok(block) => sink.push_samples(&block),
                            Err(_) => {
                                warn!("Audio block channel closed");
                                break;
                            }
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }

                debug!("Stopping capture stream");
                if let Err(e) = stream.pause() {
                    warn!("Error pausing stream: {}", e);
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker {
                    shutdown_tx,
                    thread_handle: Some(thread_handle),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread_handle.join();
                Err(anyhow!("Capture thread exited before opening the stream"))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            let _ = worker.shutdown_tx.send(());
            if let Some(handle) = worker.thread_handle.take() {
                if handle.join().is_err() {
                    warn!("Capture thread panicked");
                }
            }
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opens and starts an input stream on the default device.
fn open_input_stream(format: &CaptureFormat, sender: Sender<Vec<i16>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    debug!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, format).ok_or_else(|| {
        anyhow!(
            "No mono i16 or f32 input format at {} Hz found",
            format.sample_rate
        )
    })?;

    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(format.sample_rate))
        .into();
    debug!("Selected {} input at {} Hz", sample_format, format.sample_rate);

    let err_fn = |err: cpal::StreamError| warn!("An error occurred on the audio stream: {}", err);
    let mut blocks = BlockAccumulator::new(format.block_len, sender);

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                blocks.extend(data.iter().copied());
            },
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                blocks.extend(data.iter().map(|s| s.to_sample::<i16>()));
            },
            err_fn,
            None,
        )?,
        other => bail!("Unsupported sample format: {}", other),
    };

    stream.play()?;
    Ok(stream)
}

/// Picks a configuration with the requested channel count that covers the
/// requested sample rate, preferring 16-bit integer samples over 32-bit float.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    format: &CaptureFormat,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            c.channels() == format.channels
                && c.min_sample_rate().0 <= format.sample_rate
                && c.max_sample_rate().0 >= format.sample_rate
                && matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::F32)
        })
        .min_by_key(|c| c.sample_format() != SampleFormat::I16)
}

/// Collects callback-sized chunks into blocks of a fixed length.
struct BlockAccumulator {
    pending: Vec<i16>,
    block_len: usize,
    sender: Sender<Vec<i16>>,
}

impl BlockAccumulator {
    fn new(block_len: usize, sender: Sender<Vec<i16>>) -> Self {
        Self {
            pending: Vec::with_capacity(block_len * 2),
            block_len,
            sender,
        }
    }

    fn extend(&mut self, samples: impl IntoIterator<Item = i16>) {
        self.pending.extend(samples);

        while self.pending.len() >= self.block_len {
            let block: Vec<i16> = self.pending.drain(..self.block_len).collect();
            // The receiver only goes away while capture is shutting down.
            let _ = self.sender.try_send(block);
        }
    }
}
