use crate::acquire::error::ScopeError;

/// One production step's worth of samples for every channel, tagged with the
/// step sequence assigned by the runner.
#[derive(Clone, Debug)]
pub struct SampleBlock {
    /// Monotonic production-step counter, not wall-clock time.
    pub seq: u64,
    /// channels x samples; lengths must match across channels.
    pub channels: Vec<Vec<f32>>,
}

impl SampleBlock {
    pub fn new(seq: u64, channels: Vec<Vec<f32>>) -> Self {
        Self { seq, channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        let Some(first) = self.channels.first() else {
            return Ok(());
        };
        for (channel, samples) in self.channels.iter().enumerate() {
            if samples.len() != first.len() {
                return Err(ScopeError::RaggedBlock {
                    channel,
                    expected: first.len(),
                    actual: samples.len(),
                });
            }
        }
        Ok(())
    }
}

/// Samples per channel a source produces in one step at the given rate.
///
/// Steps are sized so the production schedule wakes about 50 times per
/// second, with a floor of 10 samples per step.
pub fn samples_per_step(sample_rate_hz: f64) -> usize {
    ((sample_rate_hz / 50.0).ceil() as usize).max(10)
}

/// A producer of multi-channel sample blocks.
///
/// Channel count and sample rate are fixed at construction and queryable
/// before the production schedule starts. `next_block` is called from the
/// runner's thread once per step and must keep per-step latency bounded so
/// the schedule stays responsive to stop requests.
pub trait DataSource: Send + std::fmt::Debug {
    fn channel_count(&self) -> usize;

    fn sample_rate_hz(&self) -> f64;

    fn channel_labels(&self) -> Vec<String> {
        (0..self.channel_count()).map(|ch| format!("CH{ch}")).collect()
    }

    /// Samples per channel produced by one step.
    fn block_len(&self) -> usize {
        samples_per_step(self.sample_rate_hz())
    }

    /// Produce the next block (channels x block_len). Internal phase or
    /// sequence state advances monotonically across calls; there is no reset
    /// between steps.
    fn next_block(&mut self) -> Result<Vec<Vec<f32>>, ScopeError>;
}

/// Deterministic source for tests and offline playback: every channel ramps
/// by one per sample, offset by 1000 per channel index.
#[derive(Debug)]
pub struct RampSource {
    sample_rate_hz: f64,
    channels: usize,
    block_len: usize,
    next_index: u64,
}

impl RampSource {
    pub fn new(sample_rate_hz: f64, channels: usize, block_len: usize) -> Self {
        Self {
            sample_rate_hz,
            channels,
            block_len,
            next_index: 0,
        }
    }
}

impl DataSource for RampSource {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    fn block_len(&self) -> usize {
        self.block_len
    }

    fn next_block(&mut self) -> Result<Vec<Vec<f32>>, ScopeError> {
        let channels = (0..self.channels)
            .map(|ch| {
                (0..self.block_len)
                    .map(|n| (self.next_index + n as u64) as f32 + ch as f32 * 1000.0)
                    .collect()
            })
            .collect();
        self.next_index += self.block_len as u64;
        Ok(channels)
    }
}
