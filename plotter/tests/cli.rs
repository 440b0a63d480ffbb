use std::io::Write;
use std::path::Path;
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_covtrend-plotter");

fn write_log(dir: &Path, name: &str, lines: &[&str]) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

#[test]
fn no_arguments_exits_quietly_without_output() {
    let work_dir = tempfile::tempdir().unwrap();

    let output = Command::new(BIN)
        .env_remove("RUST_LOG")
        .current_dir(work_dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
    assert!(!work_dir.path().join("plot.pdf").exists());
}

#[test]
fn extra_arguments_exit_quietly_without_output() {
    let work_dir = tempfile::tempdir().unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    write_log(
        log_dir.path(),
        "alpha_serverlog.json",
        &[r#"{"timestamp":100,"covered_num":5}"#],
    );

    let output = Command::new(BIN)
        .env_remove("RUST_LOG")
        .arg(log_dir.path())
        .arg("--verbose")
        .current_dir(work_dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
    assert!(!work_dir.path().join("plot.pdf").exists());
}

#[test]
fn plots_a_directory_of_serverlogs() {
    let work_dir = tempfile::tempdir().unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    write_log(
        log_dir.path(),
        "alpha_serverlog.json",
        &[
            r#"{"timestamp":100,"covered_num":5}"#,
            r#"{"timestamp":110,"covered_num":9}"#,
        ],
    );
    write_log(
        log_dir.path(),
        "beta_serverlog.json",
        &[
            r#"{"timestamp":200,"covered_num":3}"#,
            r#"{"timestamp":215,"covered_num":8}"#,
        ],
    );

    let output = Command::new(BIN)
        .arg(log_dir.path())
        .current_dir(work_dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let plot = work_dir.path().join("plot.pdf");
    let bytes = std::fs::read(&plot).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn missing_directory_fails_with_a_diagnostic() {
    let work_dir = tempfile::tempdir().unwrap();

    let output = Command::new(BIN)
        .arg(work_dir.path().join("does-not-exist"))
        .current_dir(work_dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
    assert!(!work_dir.path().join("plot.pdf").exists());
}

#[test]
fn malformed_log_fails_the_whole_run() {
    let work_dir = tempfile::tempdir().unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    write_log(
        log_dir.path(),
        "alpha_serverlog.json",
        &[r#"{"timestamp":100,"covered_num":5}"#, "not json"],
    );

    let output = Command::new(BIN)
        .arg(log_dir.path())
        .current_dir(work_dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(!work_dir.path().join("plot.pdf").exists());
}

#[test]
fn empty_directory_is_an_error() {
    let work_dir = tempfile::tempdir().unwrap();
    let log_dir = tempfile::tempdir().unwrap();

    let output = Command::new(BIN)
        .arg(log_dir.path())
        .current_dir(work_dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(!work_dir.path().join("plot.pdf").exists());
}
