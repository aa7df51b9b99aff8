use log::debug;

use super::{percent, round_to, Input};
use crate::config::*;
use crate::layout::*;

pub const RESPONDENTS_COLUMN: &str = "% of respondents";
pub const RESPONSES_COLUMN: &str = "% of responses";

/// One row per selectable item, counting the rows where its indicator is 1.
///
/// Two percentages per item: over the respondents who answered at least one indicator,
/// and over the total number of selections.
pub(super) fn tabulate(input: &Input) -> Result<AggregationResult, TabulationError> {
    if input.group.subs.is_empty() {
        return Err(input.ambiguous());
    }
    // Items from the answer key when it describes them, otherwise the raw sub-columns.
    let keyed: Vec<(String, Option<usize>)> = match input.question {
        Some(q) => membership_items(&input.group, q, input.convention)
            .into_iter()
            .map(|item| (item.label, item.column.map(|s| s.index)))
            .collect(),
        None => Vec::new(),
    };
    let items: Vec<(String, Option<usize>)> = if keyed.iter().any(|(_, c)| c.is_some()) {
        keyed
    } else {
        input
            .labelled_columns()?
            .into_iter()
            .map(|(idx, label)| (label, Some(idx)))
            .collect()
    };

    let indicators: Vec<usize> = items.iter().filter_map(|(_, c)| *c).collect();
    let counts: Vec<u64> = items
        .iter()
        .map(|(_, col)| match col {
            Some(idx) => input
                .table
                .column(*idx)
                .filter(|v| v.as_number() == Some(1.0))
                .count() as u64,
            None => 0,
        })
        .collect();
    let total_respondents = input
        .table
        .rows()
        .iter()
        .filter(|row| {
            indicators
                .iter()
                .any(|idx| row.get(*idx).map(|v| !v.is_missing()).unwrap_or(false))
        })
        .count() as u64;
    let total_responses: u64 = counts.iter().sum();
    debug!(
        "multi_select: {}: {} items, {} respondents, {} responses",
        input.question_id,
        items.len(),
        total_respondents,
        total_responses
    );

    let percent_matrix: Vec<Vec<f64>> = counts
        .iter()
        .map(|c| {
            vec![
                round_to(percent(*c, total_respondents), 2),
                round_to(percent(*c, total_responses), 2),
            ]
        })
        .collect();
    Ok(AggregationResult {
        question_id: input.question_id.to_string(),
        aggregator: Aggregator::MultiSelect,
        question_text: input.schema.display_text(input.question_id),
        row_labels: items.into_iter().map(|(label, _)| label).collect(),
        col_labels: vec![
            RESPONDENTS_COLUMN.to_string(),
            RESPONSES_COLUMN.to_string(),
        ],
        count_matrix: counts.iter().map(|c| vec![*c, *c]).collect(),
        row_overall_pct: percent_matrix.iter().map(|r| r[0]).collect(),
        percent_matrix,
        row_totals: counts,
        details: ResultDetails::MultiSelect {
            total_respondents,
            total_responses,
        },
        issue: None,
    })
}
