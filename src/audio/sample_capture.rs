// src/audio/sample_capture.rs
//! A pass-through source that feeds what is being played into the spectrum
//! estimator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::Source;

use super::spectrum::SampleProducer;

/// Samples collected before each hand-off to the producer.
const STAGE_LEN: usize = 512;

/// Wraps a source and forwards its first channel to a [`SampleProducer`]
/// while passing every sample through untouched.
///
/// The producer sits behind a mutex only so successive tracks can share it.
/// The audio thread never waits for it: a chunk that meets a held lock is
/// dropped.
pub struct SampleCapture<S> {
    source: S,
    producer: Arc<Mutex<SampleProducer>>,
    staged: [f32; STAGE_LEN],
    staged_len: usize,
    /// Channel of the next sample within its interleaved frame
    frame_pos: u16,
    channels: u16,
    forwarded_rate: u32,
}

impl<S> SampleCapture<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, producer: Arc<Mutex<SampleProducer>>) -> Self {
        let channels = source.channels().max(1);
        Self {
            source,
            producer,
            staged: [0.0; STAGE_LEN],
            staged_len: 0,
            frame_pos: 0,
            channels,
            forwarded_rate: 0,
        }
    }
}

impl<S> SampleCapture<S> {
    fn flush(&mut self, sample_rate: u32) {
        if self.staged_len == 0 {
            return;
        }
        if let Ok(mut producer) = self.producer.try_lock() {
            if sample_rate != self.forwarded_rate {
                producer.configure(sample_rate as f32);
                self.forwarded_rate = sample_rate;
            }
            producer.push(&self.staged[..self.staged_len]);
        }
        self.staged_len = 0;
    }
}

impl<S> Iterator for SampleCapture<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame_pos == 0 {
            // Channel count may only change on a frame boundary.
            self.channels = self.source.channels().max(1);
        }

        let Some(sample) = self.source.next() else {
            let rate = self.source.sample_rate();
            self.flush(rate);
            return None;
        };

        if self.frame_pos == 0 {
            self.staged[self.staged_len] = sample;
            self.staged_len += 1;
            if self.staged_len == STAGE_LEN {
                let rate = self.source.sample_rate();
                self.flush(rate);
            }
        }
        self.frame_pos = (self.frame_pos + 1) % self.channels;

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

impl<S> Source for SampleCapture<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.source.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.source.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.source.total_duration()
    }
}

impl<S> Drop for SampleCapture<S> {
    fn drop(&mut self) {
        let rate = self.forwarded_rate;
        self.flush(rate);
    }
}
