pub mod plot;
pub mod spectrum;

pub use plot::{render_spectrum_png, render_waveform_png, PlotStyle};
pub use spectrum::{FrequencySpectrum, SpectrumBuilder};
