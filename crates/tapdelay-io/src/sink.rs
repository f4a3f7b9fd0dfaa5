//! cpal playback sink.
//!
//! The engine pushes whole segments; cpal pulls device buffers from a
//! callback. [`CpalSink`] bridges the two with a bounded queue of `f32`
//! segments, so `write` blocks while one segment is queued and another is
//! playing. The callback raises an underrun flag when the queue runs dry
//! mid-stream; the next `write` reports it.

use crate::device::{device_name, find_output_device};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tapdelay_core::{AudioSink, Sample, SinkError, WriteStatus};

/// Segments waiting behind the one the callback is playing.
const QUEUE_DEPTH: usize = 1;

/// Poll interval while draining or waiting for queue space.
const DRAIN_POLL: Duration = Duration::from_millis(5);

/// Extra time granted to drain beyond the queued audio's duration.
const DRAIN_SLACK: Duration = Duration::from_millis(500);

/// State shared with the audio callback.
#[derive(Debug, Default)]
struct Shared {
    underrun: AtomicBool,
    armed: AtomicBool,
    queued_samples: AtomicUsize,
    error: OnceLock<String>,
}

impl Shared {
    fn device_error(&self) -> Option<SinkError> {
        self.error.get().map(|msg| SinkError::Device(msg.clone()))
    }
}

/// Queue `buf` for the callback, waiting while the queue is full.
///
/// Gives up once the stream reports an error: a dead device never frees the
/// slot, but its callback half stays alive inside the stream.
fn enqueue(
    tx: &Sender<Vec<f32>>,
    shared: &Shared,
    buf: Vec<f32>,
) -> std::result::Result<(), SinkError> {
    let len = buf.len();
    shared.queued_samples.fetch_add(len, Ordering::AcqRel);

    let mut pending = buf;
    loop {
        match tx.send_timeout(pending, DRAIN_POLL) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => {
                if let Some(err) = shared.device_error() {
                    shared.queued_samples.fetch_sub(len, Ordering::AcqRel);
                    return Err(err);
                }
                pending = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                shared.queued_samples.fetch_sub(len, Ordering::AcqRel);
                return Err(shared
                    .device_error()
                    .unwrap_or_else(|| SinkError::Device("output stream stopped".to_string())));
            }
        }
    }
}

/// Callback half of the queue.
struct Feeder {
    rx: Receiver<Vec<f32>>,
    recycle: Sender<Vec<f32>>,
    current: Vec<f32>,
    pos: usize,
    shared: Arc<Shared>,
}

impl Feeder {
    fn fill(&mut self, data: &mut [f32]) {
        let mut filled = 0;
        while filled < data.len() {
            if self.pos == self.current.len() {
                match self.rx.try_recv() {
                    Ok(next) => {
                        let done = std::mem::replace(&mut self.current, next);
                        self.pos = 0;
                        // Dropped if the writer already holds enough spares.
                        let _ = self.recycle.try_send(done);
                        continue;
                    }
                    Err(_) => {
                        data[filled..].fill(0.0);
                        if self.shared.armed.load(Ordering::Acquire) {
                            self.shared.underrun.store(true, Ordering::Release);
                        }
                        return;
                    }
                }
            }

            let n = (self.current.len() - self.pos).min(data.len() - filled);
            data[filled..filled + n].copy_from_slice(&self.current[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
            self.shared.queued_samples.fetch_sub(n, Ordering::AcqRel);
        }
    }
}

/// Playback sink on a cpal output stream.
///
/// Samples are converted to `f32` only here, at the device boundary.
pub struct CpalSink<S> {
    stream: Option<cpal::Stream>,
    tx: Option<Sender<Vec<f32>>>,
    spares: Receiver<Vec<f32>>,
    shared: Arc<Shared>,
    period_frames: usize,
    channels: usize,
    sample_rate: u32,
    _sample: PhantomData<fn(S)>,
}

impl<S: Sample> CpalSink<S> {
    /// Open `device_id` (see [`find_output_device`]) and start its stream.
    ///
    /// Asks the device for `period_frames` buffers, falling back to its
    /// default buffer size if that is refused. The engine's segment length
    /// stays `period_frames` either way.
    pub fn open(
        device_id: &str,
        channels: u16,
        sample_rate: u32,
        period_frames: usize,
    ) -> Result<Self> {
        if period_frames == 0 || channels == 0 {
            return Err(Error::Stream(
                "period and channel count must be non-zero".to_string(),
            ));
        }
        let device = find_output_device(device_id)?;
        let name = device_name(&device).unwrap_or_else(|_| device_id.to_string());

        let fixed = u32::try_from(period_frames)
            .map_err(|_| Error::Stream(format!("period of {period_frames} frames is too large")))?;
        let (stream, tx, spares, shared) =
            match build(&device, channels, sample_rate, cpal::BufferSize::Fixed(fixed)) {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::warn!(
                        device = %name,
                        period_frames,
                        error = %e,
                        "fixed buffer size refused, using device default"
                    );
                    build(&device, channels, sample_rate, cpal::BufferSize::Default)?
                }
            };

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            device = %name,
            channels,
            sample_rate,
            period_frames,
            bits = S::BITS,
            "output stream started"
        );

        Ok(Self {
            stream: Some(stream),
            tx: Some(tx),
            spares,
            shared,
            period_frames,
            channels: usize::from(channels),
            sample_rate,
            _sample: PhantomData,
        })
    }

    /// Sample rate the stream was opened at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

type StreamParts = (
    cpal::Stream,
    Sender<Vec<f32>>,
    Receiver<Vec<f32>>,
    Arc<Shared>,
);

fn build(
    device: &cpal::Device,
    channels: u16,
    sample_rate: u32,
    buffer_size: cpal::BufferSize,
) -> Result<StreamParts> {
    let config = cpal::StreamConfig {
        channels,
        sample_rate,
        buffer_size,
    };
    let (tx, rx) = bounded(QUEUE_DEPTH);
    let (recycle, spares) = bounded(QUEUE_DEPTH + 1);
    let shared = Arc::new(Shared::default());

    let mut feeder = Feeder {
        rx,
        recycle,
        current: Vec::new(),
        pos: 0,
        shared: Arc::clone(&shared),
    };
    let err_shared = Arc::clone(&shared);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| feeder.fill(data),
            move |err| {
                tracing::error!(error = %err, "output stream error");
                let _ = err_shared.error.set(err.to_string());
            },
            None,
        )
        .map_err(|e| Error::Stream(e.to_string()))?;

    Ok((stream, tx, spares, shared))
}

impl<S: Sample> AudioSink<S> for CpalSink<S> {
    fn period_frames(&self) -> usize {
        self.period_frames
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn write(&mut self, frames: &[S]) -> std::result::Result<WriteStatus, SinkError> {
        if let Some(err) = self.shared.device_error() {
            return Err(err);
        }
        let tx = self.tx.as_ref().ok_or(SinkError::Closed)?;

        if self.shared.underrun.load(Ordering::Acquire) {
            return Ok(WriteStatus::Underrun);
        }

        let mut buf = self.spares.try_recv().unwrap_or_default();
        buf.clear();
        buf.extend(frames.iter().map(|s| s.to_f32()));

        enqueue(tx, &self.shared, buf)?;
        self.shared.armed.store(true, Ordering::Release);
        Ok(WriteStatus::Written)
    }

    fn prepare(&mut self) -> std::result::Result<(), SinkError> {
        if self.tx.is_none() {
            return Err(SinkError::Closed);
        }
        self.shared.armed.store(false, Ordering::Release);
        self.shared.underrun.store(false, Ordering::Release);
        tracing::debug!("output stream re-armed after underrun");
        Ok(())
    }

    fn drain(&mut self) -> std::result::Result<(), SinkError> {
        if self.tx.is_none() {
            return Err(SinkError::Closed);
        }
        let queued = self.shared.queued_samples.load(Ordering::Acquire);
        let frames = queued / self.channels.max(1);
        let budget =
            Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1))) * 2
                + DRAIN_SLACK;
        let deadline = Instant::now() + budget;

        while self.shared.queued_samples.load(Ordering::Acquire) > 0 {
            if let Some(err) = self.shared.device_error() {
                return Err(err);
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    remaining = self.shared.queued_samples.load(Ordering::Acquire),
                    "drain timed out, discarding queued audio"
                );
                break;
            }
            std::thread::sleep(DRAIN_POLL);
        }
        // The queue is empty on purpose now.
        self.shared.armed.store(false, Ordering::Release);
        Ok(())
    }

    fn close(&mut self) {
        self.tx = None;
        if self.stream.take().is_some() {
            tracing::info!("output stream closed");
        }
    }
}
