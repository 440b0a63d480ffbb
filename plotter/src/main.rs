use covtrend_plotter::plot_log_directory;

/// Fixed output path for the rendered plot, relative to the working directory
const PLOT_OUTPUT_FILE: &str = "plot.pdf";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Anything other than exactly one directory argument exits quietly.
    let mut args = std::env::args().skip(1);
    let (Some(log_dir), None) = (args.next(), args.next()) else {
        log::debug!("Expected exactly one log directory argument, doing nothing");
        return Ok(());
    };

    plot_log_directory(&log_dir, PLOT_OUTPUT_FILE)
}
