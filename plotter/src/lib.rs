use anyhow::Context;
use std::path::Path;

pub mod analyze;
pub mod frame;
pub mod partition;
pub mod render;

/// Render the coverage plot for a directory of serverlog files
///
/// Scans `log_dir` for files whose name contains the serverlog marker,
/// aggregates their samples into a per-fuzzer coverage trend and writes the
/// plot to `output`, overwriting any existing file at that path.
pub fn plot_log_directory(
    log_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let log_dir = log_dir.as_ref();

    let samples = frame::collect_samples(log_dir).context("Collect coverage samples")?;
    log::info!(
        "Collected {} samples from {}",
        samples.len(),
        log_dir.display()
    );

    let samples = frame::samples_frame(&samples).context("Build sample frame")?;
    log::debug!("Sample frame head: {}", samples.head(Some(5)));

    let trend = analyze::coverage_trend(samples).context("Aggregate coverage trend")?;

    render::render_coverage_plot(trend, output.as_ref()).context("Render coverage plot")
}
