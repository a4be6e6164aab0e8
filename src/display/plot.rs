use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::acquire::buffer::Snapshot;
use crate::acquire::error::ScopeError;
use crate::display::spectrum::FrequencySpectrum;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}

/// Render a snapshot's time-domain trace to PNG bytes, one series per
/// channel over the implicit time axis.
pub fn render_waveform_png(snapshot: &Snapshot, style: PlotStyle) -> Result<Vec<u8>, ScopeError> {
    if snapshot.is_empty() {
        return Err(ScopeError::Plot("snapshot has no samples".into()));
    }
    let times: Vec<f32> = snapshot.time_axis().iter().map(|&t| t as f32).collect();
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;

        let y_min = snapshot
            .channels
            .iter()
            .flat_map(|c| c.iter().copied())
            .fold(0.0f32, |acc, v| acc.min(v));
        let y_max = snapshot
            .channels
            .iter()
            .flat_map(|c| c.iter().copied())
            .fold(0.0f32, |acc, v| acc.max(v));
        let y_bounds = if (y_max - y_min).abs() < f32::EPSILON {
            (-1.0, 1.0)
        } else {
            (y_min, y_max)
        };

        let (t_first, t_last) = (times[0], times[times.len() - 1]);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Time (s)", ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(t_first..t_last.max(t_first + f32::EPSILON), y_bounds.0..y_bounds.1)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;

        for (idx, channel) in snapshot.channels.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let series = times.iter().copied().zip(channel.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(
                    snapshot
                        .channel_labels
                        .get(idx)
                        .cloned()
                        .unwrap_or_else(|| format!("CH{idx}")),
                )
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

/// Render a dBFS spectrum to PNG bytes.
pub fn render_spectrum_png(
    spectrum: &FrequencySpectrum,
    style: PlotStyle,
) -> Result<Vec<u8>, ScopeError> {
    if spectrum.magnitudes_dbfs.is_empty() || spectrum.frequencies_hz.is_empty() {
        return Err(ScopeError::Plot("spectrum has no magnitudes".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;

        let f_last = spectrum.frequencies_hz.last().copied().unwrap_or(0.0) as f32;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                "Magnitude (dBFS)",
                ("sans-serif", 20).into_font().color(&WHITE),
            )
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(0f32..f_last.max(f32::EPSILON), -180f32..1f32)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;

        for (idx, bins) in spectrum.magnitudes_dbfs.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let series = spectrum
                .frequencies_hz
                .iter()
                .map(|&f| f as f32)
                .zip(bins.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(
                    spectrum
                        .channel_labels
                        .get(idx)
                        .cloned()
                        .unwrap_or_else(|| format!("CH{idx}")),
                )
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScopeError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| ScopeError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
