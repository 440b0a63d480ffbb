use covtrend_log_model::{load_server_log, scan_server_logs, CoverageSample};
use itertools::Itertools;
use polars::prelude::*;
use std::path::Path;

/// Relative time column, seconds since the start of each run
pub const TIME_COL: &str = "time";
/// Cumulative edge coverage column
pub const COVERAGE_COL: &str = "edge_coverage";
/// Fuzzer label column
pub const FUZZER_COL: &str = "fuzzer";

/// Collect the samples from every serverlog file in a directory
///
/// Samples are ordered by file enumeration order, then line order within
/// each file. Any unreadable or malformed file fails the whole collection.
pub fn collect_samples(dir: impl AsRef<Path>) -> anyhow::Result<Vec<CoverageSample>> {
    let mut samples = Vec::new();
    for log in scan_server_logs(dir)? {
        log::debug!("Loading serverlog {}", log.path.display());
        let loaded = load_server_log(&log)?;
        log::debug!("Loaded {} samples for fuzzer {:?}", loaded.len(), log.fuzzer);
        samples.extend(loaded);
    }
    Ok(samples)
}

/// Build the sample [`DataFrame`] with one row per sample
pub fn samples_frame(samples: &[CoverageSample]) -> anyhow::Result<DataFrame> {
    let (times, coverage, fuzzers): (Vec<i64>, Vec<i64>, Vec<String>) = samples
        .iter()
        .map(|sample| (sample.time, sample.covered_num, sample.fuzzer.clone()))
        .multiunzip();

    let frame = df!(
        TIME_COL => times,
        COVERAGE_COL => coverage,
        FUZZER_COL => fuzzers,
    )?;
    Ok(frame)
}
