use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::acquire::config::{ConfigOption, ConfigSchema, SourceConfig};
use crate::acquire::error::ScopeError;
use crate::acquire::factory::SourceRegistration;
use crate::acquire::source::DataSource;

/// Stochastic test source: independent standard-normal samples per channel.
pub struct WhiteNoiseSource {
    sample_rate_hz: f64,
    channels: usize,
    rng: StdRng,
}

pub(crate) fn registration() -> SourceRegistration {
    SourceRegistration {
        name: "white",
        summary: "White noise data source for testing",
        schema: ConfigSchema::new(vec![
            ConfigOption::float("samplerate", "Sample rate in Hz", 500.0),
            ConfigOption::int("channels", "Channel count", 2),
        ]),
        build: |config| Ok(Box::new(WhiteNoiseSource::from_config(config)?)),
    }
}

impl WhiteNoiseSource {
    pub fn new(sample_rate_hz: f64, channels: usize) -> Result<Self, ScopeError> {
        Self::with_rng(sample_rate_hz, channels, StdRng::from_entropy())
    }

    /// Seeded variant for deterministic playback in tests.
    pub fn with_seed(sample_rate_hz: f64, channels: usize, seed: u64) -> Result<Self, ScopeError> {
        Self::with_rng(sample_rate_hz, channels, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, ScopeError> {
        Self::new(
            config.require_f64("samplerate")?,
            config.require_usize("channels")?,
        )
    }

    fn with_rng(sample_rate_hz: f64, channels: usize, rng: StdRng) -> Result<Self, ScopeError> {
        if sample_rate_hz <= 0.0 {
            return Err(ScopeError::invalid_config(
                "samplerate",
                "must be greater than zero",
            ));
        }
        if channels == 0 {
            return Err(ScopeError::invalid_config(
                "channels",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            sample_rate_hz,
            channels,
            rng,
        })
    }
}

impl DataSource for WhiteNoiseSource {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    fn next_block(&mut self) -> Result<Vec<Vec<f32>>, ScopeError> {
        let len = self.block_len();
        let channels = (0..self.channels)
            .map(|_| (0..len).map(|_| self.rng.sample(StandardNormal)).collect())
            .collect();
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_the_schema() {
        let reg = registration();
        let resolved = reg.schema.resolve(&SourceConfig::new()).unwrap();
        let source = (reg.build)(&resolved).unwrap();
        assert_eq!(source.sample_rate_hz(), 500.0);
        assert_eq!(source.channel_count(), 2);
    }

    #[test]
    fn block_shape_matches_the_contract() {
        let mut source = WhiteNoiseSource::with_seed(500.0, 3, 7).unwrap();
        let block = source.next_block().unwrap();
        assert_eq!(block.len(), 3);
        for channel in &block {
            assert_eq!(channel.len(), source.block_len());
        }
    }

    #[test]
    fn seeded_sources_replay_identically() {
        let mut a = WhiteNoiseSource::with_seed(500.0, 2, 42).unwrap();
        let mut b = WhiteNoiseSource::with_seed(500.0, 2, 42).unwrap();
        assert_eq!(a.next_block().unwrap(), b.next_block().unwrap());
    }

    #[test]
    fn non_positive_options_are_rejected() {
        assert!(WhiteNoiseSource::new(0.0, 2).is_err());
        assert!(WhiteNoiseSource::new(500.0, 0).is_err());
    }
}
