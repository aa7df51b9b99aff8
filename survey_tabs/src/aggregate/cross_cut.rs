use log::{debug, warn};

use super::{percent, Input};
use crate::config::*;
use crate::layout::*;

/// Options of the base question (rows) by options of the cut question (columns).
///
/// Each percentage is relative to the respondents of its cut option. Both questions may
/// be answered in a bare column or in option-labelled sub-columns.
pub(super) fn tabulate(input: &Input) -> Result<AggregationResult, TabulationError> {
    let cut_id = input
        .options
        .cut_question
        .as_deref()
        .map(|s| s.trim())
        .unwrap_or("");
    let unknown_cut = || TabulationError::UnknownQuestion {
        question: cut_id.to_string(),
    };
    if cut_id.is_empty() {
        warn!("cross_cut: {}: no cut question given", input.question_id);
        return Err(unknown_cut());
    }
    let base_question = input.coded_question()?;
    let base_axis = question_axis(&input.group, base_question, input.convention)?;

    let cut_question = input.schema.get(cut_id).ok_or_else(unknown_cut)?;
    let cut_group = input.table.group(cut_id);
    if cut_group.is_empty() {
        return Err(unknown_cut());
    }
    let cut_axis = question_axis(&cut_group, cut_question, input.convention)?;

    let rows = input.table.rows();
    let cut_totals: Vec<u64> = cut_axis
        .iter()
        .map(|(_, m)| rows.iter().filter(|r| m.applies(r)).count() as u64)
        .collect();
    let count_matrix: Vec<Vec<u64>> = base_axis
        .iter()
        .map(|(_, base)| {
            cut_axis
                .iter()
                .map(|(_, cut)| {
                    rows.iter()
                        .filter(|r| base.applies(r) && cut.applies(r))
                        .count() as u64
                })
                .collect()
        })
        .collect();
    let percent_matrix: Vec<Vec<f64>> = count_matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(cut_totals.iter())
                .map(|(c, total)| percent(*c, *total))
                .collect()
        })
        .collect();
    let row_totals: Vec<u64> = count_matrix.iter().map(|r| r.iter().sum()).collect();
    // A respondent may tick several cut options: the overall share is taken over the
    // cells of the grid, not over the respondents.
    let grand_total: u64 = cut_totals.iter().sum();
    let total_respondents = rows
        .iter()
        .filter(|r| cut_axis.iter().any(|(_, m)| m.applies(r)))
        .count() as u64;
    debug!(
        "cross_cut: {} x {}: {} x {} cells, {} respondents",
        base_question.id,
        cut_question.id,
        base_axis.len(),
        cut_axis.len(),
        total_respondents
    );

    Ok(AggregationResult {
        question_id: base_question.id.clone(),
        aggregator: Aggregator::CrossCut,
        question_text: format!("Cross cut {} x {}", base_question.id, cut_question.id),
        row_labels: base_axis.into_iter().map(|(label, _)| label).collect(),
        col_labels: cut_axis.into_iter().map(|(label, _)| label).collect(),
        row_overall_pct: row_totals
            .iter()
            .map(|t| percent(*t, grand_total))
            .collect(),
        row_totals,
        count_matrix,
        percent_matrix,
        details: ResultDetails::CrossCut {
            cut_question: cut_question.id.clone(),
            total_respondents,
            cut_totals,
        },
        issue: None,
    })
}
