//! PNG rendering of windows, one subplot per channel

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use std::io::Cursor;

use super::DisplaySink;
use crate::config::DisplayConfig;
use crate::lsl::info::Window;

const PALETTE: [RGBColor; 6] = [RED, GREEN, BLUE, CYAN, MAGENTA, YELLOW];

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("Nothing to plot")]
    Empty,

    #[error("Render failed: {0}")]
    Render(String),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>> for PlotError {
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PlotError::Render(format!("{value:?}"))
    }
}

impl From<image::ImageError> for PlotError {
    fn from(value: image::ImageError) -> Self {
        PlotError::Render(value.to_string())
    }
}

/// Rewrites a PNG file on every update
pub struct PlotDisplay {
    config: DisplayConfig,
    frames: u64,
}

impl PlotDisplay {
    pub fn new(config: DisplayConfig) -> Self {
        Self { config, frames: 0 }
    }
}

impl DisplaySink for PlotDisplay {
    fn update(&mut self, window: &Window, channels: &[String]) {
        let png = match render_window_png(window, channels, self.config.width, self.config.height) {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!("Plot skipped: {}", e);
                return;
            }
        };

        match std::fs::write(&self.config.output, png) {
            Ok(()) => {
                self.frames += 1;
                tracing::trace!(frame = self.frames, "Plot updated");
            }
            Err(e) => tracing::warn!("Failed to write {}: {}", self.config.output.display(), e),
        }
    }
}

/// Render one window as stacked per-channel line plots
pub fn render_window_png(
    window: &Window,
    channels: &[String],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, PlotError> {
    let (t0, t1) = match (window.first_timestamp(), window.last_timestamp()) {
        (Some(t0), Some(t1)) if !channels.is_empty() => (t0, t1),
        _ => return Err(PlotError::Empty),
    };
    // A single sample still needs a non-empty x range
    let t1 = if t1 > t0 { t1 } else { t0 + 1e-3 };

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let areas = root.split_evenly((channels.len(), 1));
        let last = areas.len() - 1;

        for (idx, (area, row)) in areas.iter().zip(&window.data).enumerate() {
            let (y_min, y_max) = row
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            let (y_min, y_max) = if (y_max - y_min).abs() < f64::EPSILON {
                (y_min - 1.0, y_max + 1.0)
            } else {
                (y_min, y_max)
            };
            let color = PALETTE[idx % PALETTE.len()];

            let mut chart = ChartBuilder::on(area)
                .margin(5)
                .caption(format!("EEG {}", channels[idx]), ("sans-serif", 14))
                .set_label_area_size(LabelAreaPosition::Left, 45)
                .set_label_area_size(LabelAreaPosition::Bottom, if idx == last { 35 } else { 0 })
                .build_cartesian_2d(t0..t1, y_min..y_max)?;

            let mut mesh = chart.configure_mesh();
            mesh.light_line_style(&BLACK.mix(0.05));
            if idx == last {
                mesh.x_desc("Timestamp (LSL time)");
            }
            mesh.draw()?;

            let series = window.timestamps.iter().copied().zip(row.iter().copied());
            chart.draw_series(LineSeries::new(series, &color))?;
        }

        root.present()?;
    }

    encode_png(buffer, width, height)
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, PlotError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer)
        .ok_or_else(|| PlotError::Render("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
