//! Real-time playback cycle.
//!
//! [`PlaybackEngine`] owns the ring history, the staging buffer, the source
//! cursor and the sink for one session and drives them through
//! [`PlaybackState`]:
//!
//! ```text
//! Preload ──> Running ──> Stopping ──> Stopped
//!                │  ^
//!                └──┘ one cycle per segment
//! ```
//!
//! Each running cycle spawns two scoped workers. The play worker writes the
//! `play` staging segment to the sink while the load worker reads the next
//! history segment and runs the [`DelayKernel`] into the `load` segment.
//! Both are joined before the history advances and the staging roles rotate,
//! so neither worker ever sees the other's segment.

use crate::error::{Error, Result, SinkError};
use crate::history::RingHistory;
use crate::kernel::DelayKernel;
use crate::param::ParameterStore;
use crate::sample::{I24, Sample};
use crate::sink::{AudioSink, WriteStatus};
use crate::source::{AudioSource, SourceReader};
use crate::staging::StagingBuffer;
use crate::stop::StopSignal;
use std::sync::Arc;
use std::thread;

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Filling history and staging ahead of the first write.
    Preload,
    /// Steady-state cycles.
    Running,
    /// Draining and closing the sink.
    Stopping,
    /// Terminal.
    Stopped,
}

/// Counters collected over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Segments loaded and processed during preload.
    pub preloaded: u64,
    /// Steady-state cycles completed.
    pub cycles: u64,
    /// Segments handed to the sink.
    pub segments_played: u64,
    /// Underruns recovered with `prepare()`.
    pub underruns: u64,
}

/// One playback session over a source and a sink of sample type `S`.
pub struct PlaybackEngine<S, R, K> {
    history: RingHistory<S>,
    staging: StagingBuffer<S>,
    reader: SourceReader<R>,
    sink: K,
    params: Arc<ParameterStore>,
    stop: StopSignal,
    state: PlaybackState,
    /// Processed segments waiting in staging, oldest at the `play` role.
    ready: usize,
    source_done: bool,
    stats: PlaybackStats,
}

impl<S, R, K> PlaybackEngine<S, R, K>
where
    S: Sample,
    R: AudioSource,
    K: AudioSink<S>,
{
    /// Allocate buffers for a session.
    ///
    /// The segment size is the sink's period; the history capacity is the
    /// one `params` validates against.
    pub fn new(
        source: R,
        sink: K,
        params: Arc<ParameterStore>,
        stop: StopSignal,
        staging_segments: usize,
    ) -> Result<Self> {
        let period = sink.period_frames();
        let channels = sink.channels();
        let history = RingHistory::new(params.history_frames(), period, channels)?;
        let staging = StagingBuffer::new(staging_segments, period, channels)?;

        tracing::info!(
            bits = S::BITS,
            channels,
            period_frames = period,
            history_frames = history.capacity(),
            staging_segments,
            "playback session ready"
        );

        Ok(Self {
            history,
            staging,
            reader: SourceReader::new(source),
            sink,
            params,
            stop,
            state: PlaybackState::Preload,
            ready: 0,
            source_done: false,
            stats: PlaybackStats::default(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    /// The sink, e.g. to inspect a capture after the session.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Release the source and sink.
    pub fn into_parts(self) -> (R, K) {
        (self.reader.into_inner(), self.sink)
    }

    /// Run the session to completion.
    ///
    /// Ends when the source is exhausted and every processed segment has
    /// been played, or when the stop signal is raised. The sink is drained
    /// and closed in both cases; a fatal sink error closes it without
    /// draining and is returned. The stop signal is raised on exit so other
    /// loops sharing it wind down too.
    pub fn run(&mut self) -> Result<PlaybackStats> {
        let result = self.run_until_stopped();
        if let Err(e) = &result {
            tracing::error!(error = %e, "playback failed");
            self.sink.close();
            self.transition(PlaybackState::Stopped);
        }
        self.stop.request();
        result
    }

    fn run_until_stopped(&mut self) -> Result<PlaybackStats> {
        if self.state == PlaybackState::Stopped {
            return Err(SinkError::Closed.into());
        }
        self.preload();
        self.transition(if self.ready == 0 {
            PlaybackState::Stopping
        } else {
            PlaybackState::Running
        });

        while self.state == PlaybackState::Running {
            if self.stop.is_requested() {
                tracing::info!("stop requested, ending playback");
                self.transition(PlaybackState::Stopping);
                break;
            }
            self.cycle()?;
        }

        let drained = self.sink.drain();
        self.sink.close();
        self.transition(PlaybackState::Stopped);
        drained?;
        Ok(self.stats)
    }

    /// Fill `N - 1` staging segments so `play` holds audio before the first
    /// write.
    fn preload(&mut self) {
        let target = self.staging.segment_count() - 1;
        while self.ready < target {
            let kernel = DelayKernel::new(self.params.snapshot());
            if !self.history.load_next_segment(&mut self.reader) {
                self.source_done = true;
                break;
            }
            kernel.process_segment(&self.history, self.staging.load_mut());
            self.history.advance();
            self.staging.rotate();
            self.ready += 1;
            self.stats.preloaded += 1;
        }
        // A short source leaves gaps; line `play` up with the oldest segment.
        for _ in self.ready..target {
            self.staging.rotate();
        }
    }

    fn cycle(&mut self) -> Result<()> {
        let kernel = DelayKernel::new(self.params.snapshot());
        let play_pending = self.ready > 0;
        let load_pending = !self.source_done;

        let (play, load) = self.staging.roles();
        let sink = &mut self.sink;
        let history = &mut self.history;
        let reader = &mut self.reader;

        let (written, loaded) = thread::scope(|s| -> Result<_> {
            let player = if play_pending {
                let handle = thread::Builder::new()
                    .name("tapdelay-play".into())
                    .spawn_scoped(s, move || sink.write(play))
                    .map_err(|e| Error::Worker(e.to_string()))?;
                Some(handle)
            } else {
                None
            };
            let loader = if load_pending {
                let handle = thread::Builder::new()
                    .name("tapdelay-load".into())
                    .spawn_scoped(s, move || {
                        if !history.load_next_segment(reader) {
                            return false;
                        }
                        kernel.process_segment(history, load);
                        true
                    })
                    .map_err(|e| Error::Worker(e.to_string()))?;
                Some(handle)
            } else {
                None
            };

            let written = player
                .map(|h| h.join())
                .transpose()
                .map_err(|_| Error::Worker("play worker panicked".into()))?;
            let loaded = loader
                .map(|h| h.join())
                .transpose()
                .map_err(|_| Error::Worker("load worker panicked".into()))?;
            Ok((written, loaded))
        })?;

        if let Some(status) = written {
            match status? {
                WriteStatus::Written => {}
                WriteStatus::Underrun => {
                    self.stats.underruns += 1;
                    tracing::warn!(cycle = self.stats.cycles, "underrun, preparing device");
                    self.sink.prepare()?;
                }
            }
            self.ready -= 1;
            self.stats.segments_played += 1;
        }

        match loaded {
            Some(true) => {
                self.history.advance();
                self.ready += 1;
            }
            Some(false) => {
                tracing::info!(position = self.reader.position(), "source exhausted");
                self.source_done = true;
            }
            None => {}
        }

        self.staging.rotate();
        self.stats.cycles += 1;

        if self.source_done && self.ready == 0 {
            self.transition(PlaybackState::Stopping);
        }
        Ok(())
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "playback state");
            self.state = next;
        }
    }
}

/// A playback session for whichever sample format the stream uses.
///
/// Picked once at session start; everything below it is monomorphized.
pub enum FormatSession<R, A, B> {
    /// 16-bit session.
    I16(PlaybackEngine<i16, R, A>),
    /// 24-bit session.
    I24(PlaybackEngine<I24, R, B>),
}

impl<R, A, B> FormatSession<R, A, B>
where
    R: AudioSource,
    A: AudioSink<i16>,
    B: AudioSink<I24>,
{
    /// Run the session to completion.
    pub fn run(&mut self) -> Result<PlaybackStats> {
        match self {
            Self::I16(engine) => engine.run(),
            Self::I24(engine) => engine.run(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlaybackState {
        match self {
            Self::I16(engine) => engine.state(),
            Self::I24(engine) => engine.state(),
        }
    }
}
