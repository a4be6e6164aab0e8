use std::f64::consts::PI;

use crate::acquire::config::{ConfigOption, ConfigSchema, SourceConfig};
use crate::acquire::error::ScopeError;
use crate::acquire::factory::SourceRegistration;
use crate::acquire::source::DataSource;

/// Deterministic test source: one cosine per channel, phase-offset evenly
/// around the circle.
pub struct SinusoidSource {
    sample_rate_hz: f64,
    frequency_hz: f64,
    phase_by_channel: Vec<f64>,
    /// Global sample index; advances across blocks so consecutive steps are
    /// phase-continuous.
    next_index: u64,
}

pub(crate) fn registration() -> SourceRegistration {
    SourceRegistration {
        name: "sin",
        summary: "Sinusoid data source for testing",
        schema: ConfigSchema::new(vec![
            ConfigOption::float("samplerate", "Sample rate in Hz", 250.0),
            ConfigOption::float("frequency", "Sinusoid frequency in Hz", 0.5),
            ConfigOption::int("channels", "Channel count", 8),
        ]),
        build: |config| Ok(Box::new(SinusoidSource::from_config(config)?)),
    }
}

impl SinusoidSource {
    pub fn new(sample_rate_hz: f64, frequency_hz: f64, channels: usize) -> Result<Self, ScopeError> {
        if sample_rate_hz <= 0.0 {
            return Err(ScopeError::invalid_config(
                "samplerate",
                "must be greater than zero",
            ));
        }
        if frequency_hz <= 0.0 {
            return Err(ScopeError::invalid_config(
                "frequency",
                "must be greater than zero",
            ));
        }
        if channels == 0 {
            return Err(ScopeError::invalid_config(
                "channels",
                "must be greater than zero",
            ));
        }
        let phase_by_channel = (0..channels)
            .map(|ch| ch as f64 * 2.0 * PI / channels as f64)
            .collect();
        Ok(Self {
            sample_rate_hz,
            frequency_hz,
            phase_by_channel,
            next_index: 0,
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, ScopeError> {
        Self::new(
            config.require_f64("samplerate")?,
            config.require_f64("frequency")?,
            config.require_usize("channels")?,
        )
    }
}

impl DataSource for SinusoidSource {
    fn channel_count(&self) -> usize {
        self.phase_by_channel.len()
    }

    fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    fn channel_labels(&self) -> Vec<String> {
        self.phase_by_channel
            .iter()
            .map(|phase| format!("cos(2*Pi*f*t + {})", phase.to_degrees().round() as i64))
            .collect()
    }

    fn next_block(&mut self) -> Result<Vec<Vec<f32>>, ScopeError> {
        let len = self.block_len();
        let dt = 1.0 / self.sample_rate_hz;
        let omega = 2.0 * PI * self.frequency_hz;
        let mut channels = vec![Vec::with_capacity(len); self.channel_count()];
        for n in 0..len {
            let t = (self.next_index + n as u64) as f64 * dt;
            for (ch, phase) in self.phase_by_channel.iter().enumerate() {
                channels[ch].push((omega * t + phase).cos() as f32);
            }
        }
        self.next_index += len as u64;
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
        assert_eq!(source.sample_rate_hz(), 250.0);
        assert_eq!(source.channel_count(), 8);
    }

    #[test]
    fn blocks_are_phase_continuous() {
        let mut source = SinusoidSource::new(250.0, 5.0, 2).unwrap();
        let len = source.block_len();
        let first = source.next_block().unwrap();
        let second = source.next_block().unwrap();

        let dt = 1.0 / 250.0;
        let omega = 2.0 * PI * 5.0;
        for (k, value) in first[0].iter().chain(second[0].iter()).enumerate() {
            let expected = (omega * k as f64 * dt).cos() as f32;
            assert!((value - expected).abs() < 1e-6, "sample {k}");
        }
        assert_eq!(first[0].len(), len);
        assert_eq!(second[1].len(), len);
    }

    #[test]
    fn channels_are_offset_around_the_circle() {
        let labels = SinusoidSource::new(250.0, 0.5, 8).unwrap().channel_labels();
        assert_eq!(labels[0], "cos(2*Pi*f*t + 0)");
        assert_eq!(labels[1], "cos(2*Pi*f*t + 45)");
        assert_eq!(labels[7], "cos(2*Pi*f*t + 315)");
    }

    #[test]
    fn non_positive_options_are_rejected() {
        assert!(SinusoidSource::new(-1.0, 0.5, 8).is_err());
        assert!(SinusoidSource::new(250.0, 0.0, 8).is_err());
        assert!(SinusoidSource::new(250.0, 0.5, 0).is_err());
    }
}
