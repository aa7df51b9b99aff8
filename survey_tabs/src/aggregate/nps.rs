use log::debug;

use super::{percent, round_to, Input};
use crate::config::*;

const MAX_SCORE: u32 = 10;

pub fn score_labels() -> Vec<String> {
    (0..=MAX_SCORE).map(|s| s.to_string()).collect()
}

/// Scores 0 to 10 (rows) by brand or sub-question (columns), with the net-promoter
/// breakdown of every column.
///
/// Legacy exports store the score `s` as the code `s + 1`; modern ones store it as is.
pub(super) fn tabulate(input: &Input) -> Result<AggregationResult, TabulationError> {
    let columns = input.labelled_columns()?;
    let offset = match input.convention {
        Convention::Legacy => 1.0,
        Convention::Modern => 0.0,
    };

    let count_matrix: Vec<Vec<u64>> = (0..=MAX_SCORE)
        .map(|score| {
            let raw = score as f64 + offset;
            columns
                .iter()
                .map(|(idx, _)| {
                    input
                        .table
                        .column(*idx)
                        .filter(|v| v.as_number() == Some(raw))
                        .count() as u64
                })
                .collect()
        })
        .collect();

    let breakdowns: Vec<NpsBreakdown> = columns
        .iter()
        .enumerate()
        .map(|(j, (_, label))| {
            let scores: Vec<u64> = count_matrix.iter().map(|row| row[j]).collect();
            breakdown(label, &scores)
        })
        .collect();
    let percent_matrix: Vec<Vec<f64>> = count_matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(breakdowns.iter())
                .map(|(c, b)| percent(*c, b.total))
                .collect()
        })
        .collect();
    let row_totals: Vec<u64> = count_matrix.iter().map(|r| r.iter().sum()).collect();
    let grand_total: u64 = breakdowns.iter().map(|b| b.total).sum();
    for b in breakdowns.iter() {
        debug!(
            "nps: {}: {:?}: nps {} avg {} over {}",
            input.question_id, b.label, b.nps_score, b.average_score, b.total
        );
    }

    Ok(AggregationResult {
        question_id: input.question_id.to_string(),
        aggregator: Aggregator::Nps,
        question_text: input.text_or(format!("NPS Summary for {}", input.question_id)),
        row_labels: score_labels(),
        col_labels: columns.into_iter().map(|(_, label)| label).collect(),
        row_overall_pct: row_totals.iter().map(|t| percent(*t, grand_total)).collect(),
        row_totals,
        count_matrix,
        percent_matrix,
        details: ResultDetails::Nps { breakdowns },
        issue: None,
    })
}

/// The derived scores of one column, from the number of answers for each score 0 to 10.
pub fn breakdown(label: &str, score_counts: &[u64]) -> NpsBreakdown {
    let count = |range: std::ops::RangeInclusive<usize>| -> u64 {
        score_counts
            .iter()
            .enumerate()
            .filter(|(score, _)| range.contains(score))
            .map(|(_, c)| *c)
            .sum()
    };
    let promoters = count(9..=10);
    let neutrals = count(7..=8);
    let detractors = count(0..=6);
    let total = promoters + neutrals + detractors;
    let weighted: u64 = score_counts
        .iter()
        .enumerate()
        .take(MAX_SCORE as usize + 1)
        .map(|(score, c)| score as u64 * c)
        .sum();
    let (nps_score, average_score) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            round_to(
                (promoters as f64 - detractors as f64) * 100.0 / total as f64,
                1,
            ),
            round_to(weighted as f64 / total as f64, 2),
        )
    };
    NpsBreakdown {
        label: label.to_string(),
        promoters,
        neutrals,
        detractors,
        total,
        nps_score,
        average_score,
    }
}
