use log::debug;

use super::{column_totals, percent, Input};
use crate::config::*;

/// Scale options (rows) by sub-questions (columns). Each percentage is relative to the
/// answers given in its own column.
pub(super) fn tabulate(input: &Input) -> Result<AggregationResult, TabulationError> {
    let question = input.coded_question()?;
    let subs = input.data_columns();
    if subs.is_empty() {
        return Err(input.ambiguous());
    }
    let columns = input.labelled_columns()?;

    let count_matrix: Vec<Vec<u64>> = question
        .options
        .iter()
        .map(|o| {
            columns
                .iter()
                .map(|(idx, _)| {
                    input
                        .table
                        .column(*idx)
                        .filter(|v| v.matches_code(&o.code))
                        .count() as u64
                })
                .collect()
        })
        .collect();
    let col_totals: Vec<u64> = columns
        .iter()
        .map(|(idx, _)| input.table.count_present(*idx))
        .collect();
    let percent_matrix: Vec<Vec<f64>> = count_matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(col_totals.iter())
                .map(|(c, total)| percent(*c, *total))
                .collect()
        })
        .collect();
    let row_totals: Vec<u64> = count_matrix.iter().map(|r| r.iter().sum()).collect();
    let coded_total: u64 = column_totals(&count_matrix, columns.len()).iter().sum();
    debug!(
        "matrix: {}: {} options x {} columns, {} coded answers",
        question.id,
        question.options.len(),
        columns.len(),
        coded_total
    );

    Ok(AggregationResult {
        question_id: question.id.clone(),
        aggregator: Aggregator::Matrix,
        question_text: input.schema.display_text(&question.id),
        row_labels: question.options.iter().map(|o| o.label.clone()).collect(),
        col_labels: columns.into_iter().map(|(_, label)| label).collect(),
        row_overall_pct: row_totals.iter().map(|t| percent(*t, coded_total)).collect(),
        row_totals,
        count_matrix,
        percent_matrix,
        details: ResultDetails::Matrix { col_totals },
        issue: None,
    })
}
