use crate::frame::FUZZER_COL;
use polars::prelude::{col, lit, AnyValue, DataFrame, IntoLazy, UniqueKeepStrategy};
use std::collections::BTreeMap;

/// Split a frame into per-fuzzer sub-frames
///
/// Returns one sub-frame per unique fuzzer label, keyed by label in sorted
/// order so series rendering is deterministic.
pub fn partition_by_fuzzer(frame: DataFrame) -> anyhow::Result<BTreeMap<String, DataFrame>> {
    let selectors = frame
        .clone()
        .lazy()
        .select([col(FUZZER_COL)])
        .unique(Some(vec![FUZZER_COL.to_string()]), UniqueKeepStrategy::Any)
        .collect()?;

    let mut partitioned = BTreeMap::new();

    let n_rows = selectors.height();
    for row_idx in 0..n_rows {
        let label = match selectors.column(FUZZER_COL)?.get(row_idx) {
            Ok(AnyValue::String(s)) => s.to_string(),
            Ok(AnyValue::StringOwned(s)) => s.into_string(),
            Ok(v) => {
                log::warn!("Found non String fuzzer label: {v:?}");
                continue;
            }
            Err(e) => {
                log::error!("In fuzzer column: {e}");
                continue;
            }
        };
        log::debug!("Partition for fuzzer {:?}", label);

        let filtered = frame
            .clone()
            .lazy()
            .filter(col(FUZZER_COL).eq(lit(label.clone())))
            .collect()?;

        partitioned.insert(label, filtered);
    }

    Ok(partitioned)
}
