//! Playback device abstraction.
//!
//! The engine pushes one segment at a time into an [`AudioSink`]. Opening a
//! device is backend specific (see `tapdelay-io`); once open, the sink
//! reports the period size that fixes the segment length for the session.

use crate::error::SinkError;
use crate::sample::Sample;

/// Outcome of a successful [`AudioSink::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// The segment was queued for playback.
    Written,
    /// The device ran dry before this write. The caller must call
    /// [`AudioSink::prepare`] once before the next write.
    Underrun,
}

/// Push-style playback device for interleaved samples of type `S`.
pub trait AudioSink<S: Sample>: Send {
    /// Period size negotiated at open time, in frames.
    fn period_frames(&self) -> usize;

    /// Interleaved channel count.
    fn channels(&self) -> usize;

    /// Queue one segment of interleaved frames, blocking until the device
    /// has room for it.
    fn write(&mut self, frames: &[S]) -> Result<WriteStatus, SinkError>;

    /// Reset the device after an underrun.
    fn prepare(&mut self) -> Result<(), SinkError>;

    /// Block until all queued frames have been played.
    fn drain(&mut self) -> Result<(), SinkError>;

    /// Release the device. Further writes fail with [`SinkError::Closed`].
    fn close(&mut self);
}

impl<S: Sample, T: AudioSink<S> + ?Sized> AudioSink<S> for Box<T> {
    fn period_frames(&self) -> usize {
        (**self).period_frames()
    }

    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn write(&mut self, frames: &[S]) -> Result<WriteStatus, SinkError> {
        (**self).write(frames)
    }

    fn prepare(&mut self) -> Result<(), SinkError> {
        (**self).prepare()
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        (**self).drain()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Sink that collects everything written to it.
///
/// Useful for rendering a live session into memory and for driving the
/// engine in tests.
#[derive(Debug, Clone)]
pub struct CaptureSink<S> {
    period_frames: usize,
    channels: usize,
    captured: Vec<S>,
    closed: bool,
}

impl<S: Sample> CaptureSink<S> {
    /// Capture into memory with the given geometry.
    pub fn new(period_frames: usize, channels: usize) -> Self {
        Self {
            period_frames,
            channels,
            captured: Vec::new(),
            closed: false,
        }
    }

    /// Everything written so far.
    pub fn captured(&self) -> &[S] {
        &self.captured
    }

    /// Whether [`close`](AudioSink::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take the captured samples.
    pub fn into_samples(self) -> Vec<S> {
        self.captured
    }
}

impl<S: Sample> AudioSink<S> for CaptureSink<S> {
    fn period_frames(&self) -> usize {
        self.period_frames
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn write(&mut self, frames: &[S]) -> Result<WriteStatus, SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.captured.extend_from_slice(frames);
        Ok(WriteStatus::Written)
    }

    fn prepare(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_sink_refuses_writes_after_close() {
        let mut sink = CaptureSink::<i16>::new(2, 1);
        assert!(matches!(sink.write(&[1, 2]), Ok(WriteStatus::Written)));
        sink.close();
        assert!(matches!(sink.write(&[3, 4]), Err(SinkError::Closed)));
        assert_eq!(sink.captured(), &[1, 2]);
    }

    #[test]
    fn boxed_sink_delegates() {
        let mut sink: Box<dyn AudioSink<i16>> = Box::new(CaptureSink::new(4, 2));
        assert_eq!(sink.period_frames(), 4);
        assert_eq!(sink.channels(), 2);
        assert!(sink.write(&[0; 8]).is_ok());
    }
}
