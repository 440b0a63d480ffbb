use crate::frame::{FUZZER_COL, TIME_COL};
use crate::partition::partition_by_fuzzer;
use anyhow::Context;
use covtrend_pdf_backend::PdfBackend;
use plotters::prelude::*;
use polars::frame::DataFrame;
use std::path::Path;
use thiserror::Error;

/// Plot size in points, matching the fixed figure size of the original tool
pub const PLOT_WIDTH: u32 = 640;
pub const PLOT_HEIGHT: u32 = 480;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No coverage samples to plot")]
    EmptyTrend,
}

/// One aggregated point of a fuzzer's coverage trend
struct TrendPoint {
    time: i64,
    mean: f64,
    ci_low: f64,
    ci_high: f64,
}

/// Render the coverage trend to a vector PDF at `path`
///
/// Draws one line per fuzzer through the mean coverage, a vertical error bar
/// per point spanning the confidence interval, and a legend keyed by fuzzer
/// label. Overwrites any existing file at `path`. An empty trend is an
/// error, there is nothing meaningful to draw.
pub fn render_coverage_plot(trend: DataFrame, path: &Path) -> anyhow::Result<()> {
    let series = partition_by_fuzzer(trend)
        .context("Partition trend by fuzzer")?
        .into_iter()
        .map(|(fuzzer, frame)| Ok((fuzzer, trend_points(&frame)?)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if series.iter().all(|(_, points)| points.is_empty()) {
        return Err(RenderError::EmptyTrend.into());
    }

    let (x_range, y_range) = axis_ranges(&series);

    let backend = PdfBackend::new(path, (PLOT_WIDTH, PLOT_HEIGHT));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("time")
        .y_desc("edge coverage")
        .draw()?;

    for (index, (fuzzer, points)) in series.iter().enumerate() {
        let color = Palette99::pick(index).to_rgba();

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|point| (point.time, point.mean)),
                color,
            ))?
            .label(fuzzer.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));

        chart.draw_series(points.iter().map(|point| {
            ErrorBar::new_vertical(
                point.time,
                point.ci_low,
                point.mean,
                point.ci_high,
                color.filled(),
                4,
            )
        }))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    log::info!("Wrote coverage plot to {}", path.display());
    Ok(())
}

fn trend_points(frame: &DataFrame) -> anyhow::Result<Vec<TrendPoint>> {
    let times = frame.column(TIME_COL)?.i64()?;
    let means = frame.column("mean")?.f64()?;
    let lows = frame.column("ci_low")?.f64()?;
    let highs = frame.column("ci_high")?.f64()?;

    let mut points = Vec::with_capacity(frame.height());
    for row_idx in 0..frame.height() {
        points.push(TrendPoint {
            time: times.get(row_idx).context("Missing time")?,
            mean: means.get(row_idx).context("Missing mean")?,
            ci_low: lows.get(row_idx).context("Missing ci_low")?,
            ci_high: highs.get(row_idx).context("Missing ci_high")?,
        });
    }
    Ok(points)
}

/// Axis ranges covering every point and interval, padded so single-point
/// series still produce a non-degenerate chart
fn axis_ranges(series: &[(String, Vec<TrendPoint>)]) -> (std::ops::Range<i64>, std::ops::Range<f64>) {
    let points = series.iter().flat_map(|(_, points)| points.iter());

    let mut x_min = i64::MAX;
    let mut x_max = i64::MIN;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for point in points {
        x_min = x_min.min(point.time);
        x_max = x_max.max(point.time);
        y_min = y_min.min(point.ci_low);
        y_max = y_max.max(point.ci_high);
    }

    if x_min >= x_max {
        x_max = x_min + 1;
    }
    let y_pad = ((y_max - y_min) * 0.05).max(1.0);
    (x_min..x_max, (y_min - y_pad)..(y_max + y_pad))
}
