//! In-memory multi-channel sample streams

use crate::{GlitchError, Result};
use std::collections::BTreeMap;

/// Channel identifier (0 = left / first column, 1 = right, ...)
pub type ChannelId = usize;

/// One channel of floating-point samples
///
/// Immutable once constructed; analyzers only ever borrow the samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Channel {
    samples: Vec<f64>,
}

impl Channel {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    /// Widen 32-bit float samples (render buffers, raw dumps)
    pub fn from_f32(samples: &[f32]) -> Self {
        Self {
            samples: samples.iter().map(|&s| s as f64).collect(),
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First `len` samples, or all of them if the channel is shorter
    pub fn prefix(&self, len: usize) -> &[f64] {
        &self.samples[..len.min(self.samples.len())]
    }
}

impl From<Vec<f64>> for Channel {
    fn from(samples: Vec<f64>) -> Self {
        Self::new(samples)
    }
}

/// One or more channels plus timing metadata
///
/// All channels have equal length unless the stream was built with
/// [`SampleStream::ragged`], in which case analyses see the shared prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStream {
    channels: BTreeMap<ChannelId, Channel>,
    sample_rate: f64,
    frame_size: Option<usize>,
    ragged: bool,
}

impl SampleStream {
    /// Build a stream whose channels must all have the same length
    pub fn new<I, C>(sample_rate: f64, channels: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ChannelId, C)>,
        C: Into<Channel>,
    {
        let stream = Self::build(sample_rate, channels, false)?;

        let mut lengths = stream.channels.values().map(Channel::len);
        if let Some(first) = lengths.next() {
            if let Some(other) = lengths.find(|&len| len != first) {
                return Err(GlitchError::invalid(format!(
                    "channel lengths differ ({} vs {}); build the stream as ragged to analyze the shared prefix",
                    first, other
                )));
            }
        }

        Ok(stream)
    }

    /// Build a stream explicitly marked ragged; analyses use `min(len)`
    pub fn ragged<I, C>(sample_rate: f64, channels: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ChannelId, C)>,
        C: Into<Channel>,
    {
        Self::build(sample_rate, channels, true)
    }

    /// Channels numbered 0.. in order
    pub fn from_channels(sample_rate: f64, channels: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(sample_rate, channels.into_iter().enumerate())
    }

    /// De-interleave `[L0, R0, L1, R1, ...]`; a trailing partial frame is dropped
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: f64) -> Result<Self> {
        if num_channels == 0 {
            return Err(GlitchError::invalid("interleaved stream needs at least one channel"));
        }

        let num_frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample as f64);
            }
        }

        Self::from_channels(sample_rate, channels)
    }

    fn build<I, C>(sample_rate: f64, channels: I, ragged: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (ChannelId, C)>,
        C: Into<Channel>,
    {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(GlitchError::invalid(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let mut map = BTreeMap::new();
        for (id, channel) in channels {
            if map.insert(id, channel.into()).is_some() {
                return Err(GlitchError::invalid(format!("duplicate channel id {}", id)));
            }
        }

        if map.is_empty() {
            return Err(GlitchError::invalid("stream has no channels"));
        }

        Ok(Self {
            channels: map,
            sample_rate,
            frame_size: None,
            ragged,
        })
    }

    /// Attach the processing buffer size the stream was rendered with
    pub fn with_frame_size(mut self, frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            return Err(GlitchError::invalid("frame size must be positive"));
        }
        self.frame_size = Some(frame_size);
        Ok(self)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> Option<usize> {
        self.frame_size
    }

    pub fn is_ragged(&self) -> bool {
        self.ragged
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.keys().copied().collect()
    }

    pub fn channel(&self, id: ChannelId) -> Result<&Channel> {
        self.channels.get(&id).ok_or(GlitchError::ChannelNotFound(id))
    }

    /// Length every analysis operates on (min length across channels)
    pub fn shared_len(&self) -> usize {
        self.channels.values().map(Channel::len).min().unwrap_or(0)
    }

    /// Channels in id order, each cut to [`Self::shared_len`]
    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, &[f64])> {
        let len = self.shared_len();
        self.channels.iter().map(move |(&id, ch)| (id, ch.prefix(len)))
    }

    pub fn duration_seconds(&self) -> f64 {
        self.shared_len() as f64 / self.sample_rate
    }

    /// Time of a sample index in seconds
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate
    }

    /// Copy of the stream with every channel cut to `len` samples
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            channels: self
                .channels
                .iter()
                .map(|(&id, ch)| (id, Channel::new(ch.prefix(len).to_vec())))
                .collect(),
            sample_rate: self.sample_rate,
            frame_size: self.frame_size,
            ragged: self.ragged,
        }
    }
}
