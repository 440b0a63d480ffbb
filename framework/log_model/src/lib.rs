use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Substring that marks a file as a coverage server log
pub const SERVER_LOG_MARKER: &str = "serverlog";

/// One coverage report line from a serverlog file
///
/// The coverage server appends one of these as a JSON object per line. Only
/// `timestamp` and `covered_num` are required; the remaining fields are
/// written by newer servers and unknown fields (such as the module coverage
/// map) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageRecord {
    /// Unix timestamp in seconds at which the report was taken
    pub timestamp: i64,
    /// Cumulative number of covered edges at [CoverageRecord::timestamp]
    pub covered_num: i64,
    /// Total number of instrumented edges, if the server reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_coverage: Option<i64>,
    /// Number of executions observed so far, if the server reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_num: Option<u64>,
}

/// A coverage sample with its timestamp rebased against the start of the run
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSample {
    /// Seconds since the first record in the source file
    ///
    /// May be negative when the source log is not timestamp-ordered.
    pub time: i64,
    /// Cumulative number of covered edges
    pub covered_num: i64,
    /// Label of the fuzzer that produced the sample
    pub fuzzer: String,
}

/// A serverlog file found in a log directory, paired with its fuzzer label
#[derive(Debug, Clone, PartialEq)]
pub struct ServerLog {
    pub fuzzer: String,
    pub path: PathBuf,
}

/// Derive the fuzzer label from a serverlog file name
///
/// The label is the prefix before the first occurrence of
/// [SERVER_LOG_MARKER]. Returns [None] when the marker is absent. The label
/// is not validated; an empty prefix yields an empty label.
pub fn fuzzer_label(file_name: &str) -> Option<&str> {
    file_name
        .find(SERVER_LOG_MARKER)
        .map(|index| &file_name[..index])
}

/// Find the serverlog files in a log directory
///
/// Only direct entries of `dir` are considered. The order of the returned
/// logs is the filesystem enumeration order and is not otherwise guaranteed.
pub fn scan_server_logs(dir: impl AsRef<Path>) -> anyhow::Result<Vec<ServerLog>> {
    let dir = dir.as_ref();

    let mut logs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Scan log directory {}", dir.display()))?;
        let file_name = entry.file_name().to_string_lossy();
        if let Some(label) = fuzzer_label(&file_name) {
            logs.push(ServerLog {
                fuzzer: label.to_string(),
                path: entry.path().to_path_buf(),
            });
        }
    }
    Ok(logs)
}

/// Load coverage records from a reader
///
/// The input must contain one JSON object per line. Any line that fails to
/// parse, or that is missing a required field, fails the whole load.
pub fn load_coverage_records<R: Read>(reader: R) -> anyhow::Result<Vec<CoverageRecord>> {
    let reader = std::io::BufReader::new(reader);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let record: CoverageRecord = serde_json::from_str(&line)?;
        records.push(record);
    }
    Ok(records)
}

/// Rebase records against the timestamp of the first record
///
/// The first record is always the baseline, so the first sample's `time` is
/// always 0. Later samples keep their source order and may go negative when
/// the log is unordered.
pub fn relative_samples(records: &[CoverageRecord], fuzzer: &str) -> Vec<CoverageSample> {
    let Some(start_time) = records.first().map(|record| record.timestamp) else {
        return Vec::new();
    };

    records
        .iter()
        .map(|record| CoverageSample {
            time: record.timestamp - start_time,
            covered_num: record.covered_num,
            fuzzer: fuzzer.to_string(),
        })
        .collect()
}

/// Load one serverlog file and rebase its samples
///
/// The file handle is closed when this returns.
pub fn load_server_log(log: &ServerLog) -> anyhow::Result<Vec<CoverageSample>> {
    let file = std::fs::File::open(&log.path)
        .with_context(|| format!("Open serverlog {}", log.path.display()))?;
    let records = load_coverage_records(file)
        .with_context(|| format!("Parse serverlog {}", log.path.display()))?;
    Ok(relative_samples(&records, &log.fuzzer))
}
