use crate::frame::{COVERAGE_COL, FUZZER_COL, TIME_COL};
use anyhow::Context;
use polars::prelude::*;

/// Aggregate samples into a per-fuzzer coverage trend
///
/// Groups the sample frame by `(fuzzer, time)` and computes the mean
/// coverage together with a 68% confidence interval, approximated as one
/// standard error around the mean. Groups with a single sample get a
/// zero-width interval.
///
/// The output frame has columns `fuzzer`, `time`, `mean`, `ci_low` and
/// `ci_high`, sorted by `(fuzzer, time)`.
pub fn coverage_trend(samples: DataFrame) -> anyhow::Result<DataFrame> {
    let grouped = samples
        .lazy()
        .group_by([col(FUZZER_COL), col(TIME_COL)])
        .agg([
            col(COVERAGE_COL).mean().alias("mean"),
            col(COVERAGE_COL).std(1).alias("std"),
            col(COVERAGE_COL).count().alias("n"),
        ])
        .collect()
        .context("Aggregate coverage groups")?;

    let means = grouped.column("mean")?.f64()?;
    let stds = grouped.column("std")?.f64()?;
    let counts = grouped.column("n")?.u32()?;

    let mut ci_low = Vec::with_capacity(grouped.height());
    let mut ci_high = Vec::with_capacity(grouped.height());
    for row_idx in 0..grouped.height() {
        let mean = means.get(row_idx).context("Missing mean")?;
        // std over a single sample is null, which collapses the interval
        let std = stds.get(row_idx).unwrap_or(0.0);
        let n = counts.get(row_idx).context("Missing count")? as f64;
        let se = std / n.sqrt();
        ci_low.push(mean - se);
        ci_high.push(mean + se);
    }

    let mut trend = grouped.select([FUZZER_COL, TIME_COL, "mean"])?;
    trend.with_column(Column::new("ci_low".into(), ci_low))?;
    trend.with_column(Column::new("ci_high".into(), ci_high))?;

    let trend = trend
        .sort([FUZZER_COL, TIME_COL], SortMultipleOptions::default())
        .context("Sort coverage trend")?;

    Ok(trend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn column_values(frame: &DataFrame, name: &str) -> Vec<f64> {
        frame
            .column(name)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn repeated_runs_pool_into_one_interval() {
        // Two runs of the same fuzzer sampled at the same relative times
        let samples = df![
            TIME_COL     => [0i64, 10, 0, 10],
            COVERAGE_COL => [4i64, 8, 6, 12],
            FUZZER_COL   => ["a", "a", "a", "a"],
        ]
        .unwrap();

        let trend = coverage_trend(samples).unwrap();
        assert_eq!(trend.height(), 2);

        let means = column_values(&trend, "mean");
        assert_eq!(means, vec![5.0, 10.0]);

        // std of [4, 6] is sqrt(2), n = 2, so the standard error is 1
        let lows = column_values(&trend, "ci_low");
        let highs = column_values(&trend, "ci_high");
        assert!((lows[0] - 4.0).abs() < 1e-9);
        assert!((highs[0] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn single_sample_groups_get_a_zero_width_interval() {
        let samples = df![
            TIME_COL     => [0i64],
            COVERAGE_COL => [7i64],
            FUZZER_COL   => ["solo"],
        ]
        .unwrap();

        let trend = coverage_trend(samples).unwrap();
        assert_eq!(trend.height(), 1);

        let means = column_values(&trend, "mean");
        let lows = column_values(&trend, "ci_low");
        let highs = column_values(&trend, "ci_high");
        assert_eq!(means[0], 7.0);
        assert_eq!(lows[0], 7.0);
        assert_eq!(highs[0], 7.0);
    }

    #[test]
    fn fuzzers_are_kept_separate_and_sorted() {
        let samples = df![
            TIME_COL     => [10i64, 0, 0],
            COVERAGE_COL => [9i64, 5, 3],
            FUZZER_COL   => ["b", "b", "a"],
        ]
        .unwrap();

        let trend = coverage_trend(samples).unwrap();

        let fuzzers: Vec<String> = trend
            .column(FUZZER_COL)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect();
        assert_eq!(fuzzers, vec!["a", "b", "b"]);

        let times: Vec<i64> = trend
            .column(TIME_COL)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(times, vec![0, 0, 10]);
    }

    #[test]
    fn empty_samples_produce_an_empty_trend() {
        let samples = df![
            TIME_COL     => Vec::<i64>::new(),
            COVERAGE_COL => Vec::<i64>::new(),
            FUZZER_COL   => Vec::<String>::new(),
        ]
        .unwrap();

        let trend = coverage_trend(samples).unwrap();
        assert_eq!(trend.height(), 0);
    }
}
