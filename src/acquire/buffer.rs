use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::acquire::error::ScopeError;
use crate::acquire::source::SampleBlock;

/// Immutable point-in-time copy of buffer contents, safe to read while
/// production continues elsewhere.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub sample_rate_hz: f64,
    pub channel_labels: Vec<String>,
    /// channels x samples, oldest to newest.
    pub channels: Vec<Vec<f32>>,
    /// Absolute index of the oldest retained sample in the production
    /// sequence; keeps the time axis correct after ring eviction.
    pub first_index: u64,
    /// Sequence of the newest absorbed block, if any.
    pub last_seq: Option<u64>,
}

impl Snapshot {
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

    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate_hz
    }

    /// Implicit time axis: seconds since acquisition start, one entry per
    /// retained sample.
    pub fn time_axis(&self) -> Vec<f64> {
        let dt = 1.0 / self.sample_rate_hz;
        (0..self.len())
            .map(|i| (self.first_index + i as u64) as f64 * dt)
            .collect()
    }

    /// Row-major view for tabular serialization: one row per sample index,
    /// time first, then one column per channel, oldest to newest.
    pub fn rows(&self) -> impl Iterator<Item = (f64, Vec<f32>)> + '_ {
        let dt = 1.0 / self.sample_rate_hz;
        (0..self.len()).map(move |i| {
            let t = (self.first_index + i as u64) as f64 * dt;
            let row = self.channels.iter().map(|ch| ch[i]).collect();
            (t, row)
        })
    }
}

struct Shared {
    /// channel -> ring of the most recent samples.
    rings: Vec<VecDeque<f32>>,
    /// Total samples ever appended per channel (identical across channels).
    appended: u64,
    last_seq: Option<u64>,
}

/// Fixed-capacity rolling store of sample blocks, one ring per channel.
///
/// Appends and snapshot reads race from different threads; the whole
/// multi-channel append (validate, append, evict) runs under one lock, so a
/// reader never observes channel A updated but channel B not. Oldest samples
/// are evicted once a ring reaches capacity; that is steady-state behavior,
/// not an error.
pub struct SampleBuffer {
    shared: Mutex<Shared>,
    channel_count: usize,
    capacity: usize,
    sample_rate_hz: f64,
    channel_labels: Vec<String>,
}

impl SampleBuffer {
    /// Capacity is samples per channel, fixed for the buffer's lifetime.
    pub fn new(
        channel_count: usize,
        capacity: usize,
        sample_rate_hz: f64,
        channel_labels: Vec<String>,
    ) -> Result<Self, ScopeError> {
        if sample_rate_hz <= 0.0 {
            return Err(ScopeError::invalid_config(
                "samplerate",
                "must be greater than zero",
            ));
        }
        if channel_count == 0 {
            return Err(ScopeError::invalid_config(
                "channels",
                "must be greater than zero",
            ));
        }
        if capacity == 0 {
            return Err(ScopeError::invalid_config(
                "capacity",
                "must be greater than zero",
            ));
        }
        if channel_labels.len() != channel_count {
            return Err(ScopeError::ChannelMismatch {
                expected: channel_count,
                actual: channel_labels.len(),
            });
        }
        let rings = (0..channel_count)
            .map(|_| VecDeque::with_capacity(capacity))
            .collect();
        Ok(Self {
            shared: Mutex::new(Shared {
                rings,
                appended: 0,
                last_seq: None,
            }),
            channel_count,
            capacity,
            sample_rate_hz,
            channel_labels,
        })
    }

    /// Size the ring from a history depth in seconds at the given rate.
    pub fn with_history_seconds(
        channel_count: usize,
        sample_rate_hz: f64,
        history_seconds: f64,
        channel_labels: Vec<String>,
    ) -> Result<Self, ScopeError> {
        if history_seconds <= 0.0 {
            return Err(ScopeError::invalid_config(
                "history_seconds",
                "must be greater than zero",
            ));
        }
        let capacity = (sample_rate_hz * history_seconds).ceil() as usize;
        Self::new(channel_count, capacity.max(1), sample_rate_hz, channel_labels)
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn channel_labels(&self) -> &[String] {
        &self.channel_labels
    }

    /// Samples currently retained per channel.
    pub fn len(&self) -> usize {
        let shared = self.lock();
        shared.rings.first().map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one block per channel as a single atomic unit of update.
    ///
    /// Validation runs before any mutation: a channel-count mismatch or a
    /// ragged block leaves the buffer exactly as it was.
    pub fn add_samples(&self, block: &SampleBlock) -> Result<(), ScopeError> {
        block.validate()?;
        if block.channel_count() != self.channel_count {
            return Err(ScopeError::ChannelMismatch {
                expected: self.channel_count,
                actual: block.channel_count(),
            });
        }

        let mut shared = self.lock();
        let filled = shared.appended + block.len() as u64;
        if shared.appended <= self.capacity as u64 && filled > self.capacity as u64 {
            log::debug!(
                "capture buffer full ({} samples/channel), evicting oldest",
                self.capacity
            );
        }
        for (ring, samples) in shared.rings.iter_mut().zip(&block.channels) {
            for &sample in samples {
                if ring.len() == self.capacity {
                    ring.pop_front();
                }
                ring.push_back(sample);
            }
        }
        shared.appended = filled;
        shared.last_seq = Some(block.seq);
        Ok(())
    }

    /// Independent copy of current contents. May be a block stale relative
    /// to an in-flight append, but never torn across channels.
    pub fn snapshot(&self) -> Snapshot {
        let shared = self.lock();
        let retained = shared.rings.first().map(VecDeque::len).unwrap_or(0);
        Snapshot {
            sample_rate_hz: self.sample_rate_hz,
            channel_labels: self.channel_labels.clone(),
            channels: shared
                .rings
                .iter()
                .map(|ring| ring.iter().copied().collect())
                .collect(),
            first_index: shared.appended - retained as u64,
            last_seq: shared.last_seq,
        }
    }

    /// Row-major view of current contents, oldest to newest.
    pub fn export_rows(&self) -> Vec<(f64, Vec<f32>)> {
        self.snapshot().rows().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // Poisoning only marks a panicked peer; the rings themselves stay
        // structurally valid.
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}
