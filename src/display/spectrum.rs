use std::f32::consts::PI;

use rustfft::{num_complex::Complex32, FftPlanner};

use crate::acquire::buffer::Snapshot;

/// Floor applied to the dB conversion so silent bins stay plottable.
const DB_FLOOR: f32 = -180.0;

/// One-sided magnitude spectrum per channel, in dBFS.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    /// channel -> bins, same order as the snapshot's channels.
    pub magnitudes_dbfs: Vec<Vec<f32>>,
    pub channel_labels: Vec<String>,
}

/// Computes Hann-windowed dBFS spectra over the newest `fft_size` samples of
/// a snapshot. Purely a function of the snapshot; acquisition is unaffected.
pub struct SpectrumBuilder {
    fft_size: usize,
    reference: f32,
}

impl SpectrumBuilder {
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size: fft_size.max(2),
            reference: 1.0,
        }
    }

    /// Full-scale reference for the dBFS conversion (1.0 for float capture,
    /// 32768.0 for int16-scaled data).
    pub fn with_reference(mut self, reference: f32) -> Self {
        self.reference = reference;
        self
    }

    pub fn compute(&self, snapshot: &Snapshot) -> FrequencySpectrum {
        let n = self.fft_size;
        let window: Vec<f32> = (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos())
            .collect();
        let window_sum: f32 = window.iter().sum();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);

        let frequencies_hz = (0..n / 2)
            .map(|k| k as f64 * snapshot.sample_rate_hz / n as f64)
            .collect();

        let magnitudes_dbfs = snapshot
            .channels
            .iter()
            .map(|channel| {
                // Newest fft_size samples; zero-pad when the capture is
                // still shorter than the transform.
                let start = channel.len().saturating_sub(n);
                let mut buffer: Vec<Complex32> = channel[start..]
                    .iter()
                    .zip(&window)
                    .map(|(v, w)| Complex32::new(v * w, 0.0))
                    .collect();
                buffer.resize(n, Complex32::ZERO);
                fft.process(&mut buffer);
                buffer
                    .iter()
                    .take(n / 2)
                    .map(|c| {
                        // One-sided spectrum: scale by 2 over the window sum.
                        let magnitude = c.norm() * 2.0 / window_sum;
                        (20.0 * (magnitude / self.reference).log10()).max(DB_FLOOR)
                    })
                    .collect()
            })
            .collect();

        FrequencySpectrum {
            sample_rate_hz: snapshot.sample_rate_hz,
            frequencies_hz,
            magnitudes_dbfs,
            channel_labels: snapshot.channel_labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_snapshot(rate: f64, freq: f64, len: usize) -> Snapshot {
        let dt = 1.0 / rate;
        let samples: Vec<f32> = (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 * dt).cos() as f32)
            .collect();
        Snapshot {
            sample_rate_hz: rate,
            channel_labels: vec!["tone".to_string()],
            channels: vec![samples],
            first_index: 0,
            last_seq: Some(0),
        }
    }

    #[test]
    fn peak_lands_on_the_generated_bin() {
        // 32 Hz tone at 256 Hz over a 256-point FFT: bin 32 exactly.
        let snapshot = tone_snapshot(256.0, 32.0, 256);
        let spectrum = SpectrumBuilder::new(256).compute(&snapshot);

        let bins = &spectrum.magnitudes_dbfs[0];
        let peak = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 32);
        // Unit-amplitude bin-centered tone comes out near 0 dBFS after
        // coherent-gain normalization.
        assert!(bins[32] > -1.0 && bins[32] < 0.5);
        assert!((spectrum.frequencies_hz[32] - 32.0).abs() < 1e-9);

        // Doubling the full-scale reference drops every bin by ~6 dB.
        let referenced = SpectrumBuilder::new(256)
            .with_reference(2.0)
            .compute(&snapshot);
        let delta = bins[32] - referenced.magnitudes_dbfs[0][32];
        assert!((delta - 6.02).abs() < 0.1);
    }

    #[test]
    fn bins_cover_half_the_transform() {
        let snapshot = tone_snapshot(250.0, 10.0, 128);
        let spectrum = SpectrumBuilder::new(64).compute(&snapshot);
        assert_eq!(spectrum.frequencies_hz.len(), 32);
        assert_eq!(spectrum.magnitudes_dbfs[0].len(), 32);
    }

    #[test]
    fn silent_bins_hit_the_floor() {
        let snapshot = Snapshot {
            sample_rate_hz: 100.0,
            channel_labels: vec!["quiet".to_string()],
            channels: vec![vec![0.0; 64]],
            first_index: 0,
            last_seq: None,
        };
        let spectrum = SpectrumBuilder::new(64).compute(&snapshot);
        assert!(spectrum.magnitudes_dbfs[0].iter().all(|&db| db == DB_FLOOR));
    }
}
