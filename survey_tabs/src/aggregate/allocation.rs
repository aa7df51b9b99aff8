use log::debug;

use super::Input;
use crate::config::*;

/// Inclusive ranges of the allocation buckets, in percent of the wallet.
pub const BUCKETS: [(u32, u32); 10] = [
    (0, 10),
    (11, 20),
    (21, 30),
    (31, 40),
    (41, 50),
    (51, 60),
    (61, 70),
    (71, 80),
    (81, 90),
    (91, 100),
];

pub fn bucket_labels() -> Vec<String> {
    BUCKETS
        .iter()
        .map(|(lo, hi)| format!("{}–{}", lo, hi))
        .collect()
}

/// Counts the allocations of every brand (columns) falling in each bucket (rows).
/// There are no percentages.
pub(super) fn tabulate(input: &Input) -> Result<AggregationResult, TabulationError> {
    let columns = input.labelled_columns()?;
    let count_matrix: Vec<Vec<u64>> = BUCKETS
        .iter()
        .map(|(lo, hi)| {
            let range = (*lo as f64)..=(*hi as f64);
            columns
                .iter()
                .map(|(idx, _)| {
                    input
                        .table
                        .column(*idx)
                        .filter_map(|v| v.as_number())
                        .filter(|n| range.contains(n))
                        .count() as u64
                })
                .collect()
        })
        .collect();
    let col_totals: Vec<u64> = columns
        .iter()
        .map(|(idx, _)| {
            input
                .table
                .column(*idx)
                .filter(|v| v.as_number().is_some())
                .count() as u64
        })
        .collect();
    debug!(
        "allocation: {}: {} columns, {} allocations",
        input.question_id,
        columns.len(),
        col_totals.iter().sum::<u64>()
    );

    let mut res = AggregationResult::zero_filled(
        input.question_id,
        Aggregator::AllocationBucket,
        &format!("{}: Share of Wallet Distribution", input.question_id),
        bucket_labels(),
        columns.into_iter().map(|(_, label)| label).collect(),
    );
    res.row_totals = count_matrix.iter().map(|r| r.iter().sum()).collect();
    res.count_matrix = count_matrix;
    res.details = ResultDetails::Allocation { col_totals };
    Ok(res)
}
