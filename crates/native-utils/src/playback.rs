//! PCM playback through a persistent output stream fed from a ring buffer.
//!
//! `cpal::Stream` is not `Send`, so a [`PcmPlayer`] must be created, used and
//! dropped on the same thread.

use crate::audio;
use anyhow::{Context, anyhow};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Seconds of audio the ring buffer can hold.
const BUFFER_SECONDS: usize = 2;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Upper bound on waiting for the output callback to acknowledge a flush.
const FLUSH_TIMEOUT: Duration = Duration::from_millis(250);
/// Lets the device drain its own buffer after the ring buffer empties.
const DRAIN_TAIL: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    Finished,
    Interrupted,
}

pub struct PcmPlayer {
    _stream: cpal::Stream,
    producer: HeapProd<f32>,
    flush: Arc<AtomicBool>,
    device_rate: u32,
}

impl PcmPlayer {
    /// Opens the named output device, or the default one.
    pub fn open(device_name: Option<&str>) -> anyhow::Result<Self> {
        let output = crate::device::get_or_default_output(device_name)?;
        tracing::info!("Using output device: {:?}", output.name().unwrap_or_default());

        let supported = output
            .default_output_config()
            .context("Failed to get default output config")?;
        let config: StreamConfig = supported.config();
        let device_rate = config.sample_rate.0;
        tracing::info!("Output stream config: {:?}", &config);

        let (producer, consumer) =
            audio::shared_buffer(device_rate as usize * BUFFER_SECONDS).split();
        let flush = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_output::<f32>(&output, &config, consumer, flush.clone()),
            SampleFormat::I16 => build_output::<i16>(&output, &config, consumer, flush.clone()),
            SampleFormat::U16 => build_output::<u16>(&output, &config, consumer, flush.clone()),
            other => return Err(anyhow!("Unsupported output sample format {other:?}")),
        }
        .context("Failed to build output stream")?;
        stream.play().context("Failed to start output stream")?;

        Ok(Self {
            _stream: stream,
            producer,
            flush,
            device_rate,
        })
    }

    /// Plays mono samples and blocks until they have been heard.
    ///
    /// `cancelled` is polled while feeding and draining; once it returns true
    /// the buffered audio is discarded and `Interrupted` is returned.
    pub fn play<F>(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        cancelled: F,
    ) -> anyhow::Result<PlaybackEnd>
    where
        F: Fn() -> bool,
    {
        let samples = audio::resample(samples, sample_rate, self.device_rate)?;
        let mut remaining = samples.as_slice();

        while !remaining.is_empty() {
            if cancelled() {
                self.flush();
                return Ok(PlaybackEnd::Interrupted);
            }
            let pushed = self.producer.push_slice(remaining);
            remaining = &remaining[pushed..];
            if !remaining.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }

        while !self.producer.is_empty() {
            if cancelled() {
                self.flush();
                return Ok(PlaybackEnd::Interrupted);
            }
            thread::sleep(POLL_INTERVAL);
        }
        thread::sleep(DRAIN_TAIL);
        Ok(PlaybackEnd::Finished)
    }

    /// Discards everything queued for the device.
    pub fn flush(&self) {
        self.flush.store(true, Ordering::Release);
        let started = Instant::now();
        while self.flush.load(Ordering::Acquire) && started.elapsed() < FLUSH_TIMEOUT {
            thread::sleep(Duration::from_millis(2));
        }
    }
}

fn build_output<T>(
    output: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<f32>,
    flush: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;

    output.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if flush.swap(false, Ordering::AcqRel) {
                consumer.clear();
            }
            for frame in data.chunks_mut(channels.max(1)) {
                let sample = consumer.try_pop().unwrap_or(0.0);
                for out in frame.iter_mut() {
                    *out = T::from_sample(sample);
                }
            }
        },
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )
}
