use log::debug;

use super::{column_totals, percent, Input};
use crate::config::*;

/// Ranked items (rows) by rank position (columns).
///
/// The number of rank columns is the largest rank found in the data, optionally lowered
/// by `max_rank`. It never goes past what was observed.
pub(super) fn tabulate(input: &Input) -> Result<AggregationResult, TabulationError> {
    if input.data_columns().is_empty() {
        return Err(input.ambiguous());
    }
    let columns = input.labelled_columns()?;
    // A rank never exceeds the number of ranked items. Larger values are stray cells.
    let is_rank = |n: f64| n >= 1.0 && n <= columns.len() as f64;

    let observed_max_rank = columns
        .iter()
        .flat_map(|(idx, _)| input.table.column(*idx).filter_map(|v| v.as_number()))
        .filter(|n| is_rank(*n))
        .fold(0.0f64, f64::max)
        .floor() as u32;
    let max_rank = match input.options.max_rank {
        Some(cap) => cap.min(observed_max_rank),
        None => observed_max_rank,
    };

    let count_matrix: Vec<Vec<u64>> = columns
        .iter()
        .map(|(idx, _)| {
            (1..=max_rank)
                .map(|rank| {
                    input
                        .table
                        .column(*idx)
                        .filter(|v| v.as_number() == Some(rank as f64))
                        .count() as u64
                })
                .collect()
        })
        .collect();
    let row_totals: Vec<u64> = count_matrix.iter().map(|r| r.iter().sum()).collect();
    let percent_matrix: Vec<Vec<f64>> = count_matrix
        .iter()
        .zip(row_totals.iter())
        .map(|(row, total)| row.iter().map(|c| percent(*c, *total)).collect())
        .collect();
    let total_respondents = input
        .table
        .rows()
        .iter()
        .filter(|row| {
            columns.iter().any(|(idx, _)| {
                row.get(*idx)
                    .and_then(|v| v.as_number())
                    .map(is_rank)
                    .unwrap_or(false)
            })
        })
        .count() as u64;
    debug!(
        "ranked: {}: observed max rank {}, showing {}, {} respondents",
        input.question_id, observed_max_rank, max_rank, total_respondents
    );

    Ok(AggregationResult {
        question_id: input.question_id.to_string(),
        aggregator: Aggregator::Ranked,
        question_text: input.text_or(format!("Ranked Summary for {}", input.question_id)),
        row_labels: columns.into_iter().map(|(_, label)| label).collect(),
        col_labels: rank_labels(max_rank),
        details: ResultDetails::Ranked {
            max_rank,
            observed_max_rank,
            total_respondents,
            col_totals: column_totals(&count_matrix, max_rank as usize),
        },
        row_overall_pct: row_totals
            .iter()
            .map(|t| percent(*t, total_respondents))
            .collect(),
        row_totals,
        count_matrix,
        percent_matrix,
        issue: None,
    })
}

/// `Rank 1` to `Rank n`.
pub fn rank_labels(max_rank: u32) -> Vec<String> {
    (1..=max_rank).map(|r| format!("Rank {}", r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::builder::TableBuilder;
    use crate::schema::*;
    use crate::table::*;

    fn table() -> ResponseTable {
        let mut b = TableBuilder::new().columns(&["Q9_1", "Q9_2", "Q9_3"]);
        b.add_row_numbers(&[Some(1.0), Some(2.0), Some(3.0)]);
        b.add_row_numbers(&[Some(2.0), Some(1.0), Some(3.0)]);
        b.add_row_numbers(&[Some(1.0), Some(3.0), None]);
        b.add_row_numbers(&[None, None, None]);
        b.build()
    }

    fn options(max_rank: Option<u32>) -> AggregateOptions {
        AggregateOptions {
            max_rank,
            ..AggregateOptions::default()
        }
    }

    #[test]
    fn observed_ranks() {
        let res = aggregate(
            &table(),
            &Schema::new(),
            Convention::Modern,
            "Q9",
            Aggregator::Ranked,
            &options(None),
        );
        assert_eq!(res.issue, None);
        assert_eq!(res.question_text, "Ranked Summary for Q9");
        assert_eq!(res.col_labels, vec!["Rank 1", "Rank 2", "Rank 3"]);
        assert_eq!(
            res.count_matrix,
            vec![vec![2, 1, 0], vec![1, 1, 1], vec![0, 0, 2]]
        );
        assert_eq!(res.row_totals, vec![3, 3, 2]);
        assert_eq!(res.percent_matrix[2], vec![0.0, 0.0, 100.0]);
        assert_eq!(res.row_overall_pct, vec![100.0, 100.0, 200.0 / 3.0]);
        assert_eq!(
            res.details,
            ResultDetails::Ranked {
                max_rank: 3,
                observed_max_rank: 3,
                total_respondents: 3,
                col_totals: vec![3, 2, 3]
            }
        );
    }

    #[test]
    fn cap_is_clamped_to_observed() {
        let res = aggregate(
            &table(),
            &Schema::new(),
            Convention::Modern,
            "Q9",
            Aggregator::Ranked,
            &options(Some(10)),
        );
        assert_eq!(res.col_labels.len(), 3);

        let res = aggregate(
            &table(),
            &Schema::new(),
            Convention::Modern,
            "Q9",
            Aggregator::Ranked,
            &options(Some(2)),
        );
        assert_eq!(res.col_labels, rank_labels(2));
        assert_eq!(res.count_matrix[2], vec![0, 0]);
        assert_eq!(res.row_totals, vec![3, 2, 0]);
        match res.details {
            ResultDetails::Ranked {
                max_rank,
                observed_max_rank,
                ..
            } => assert_eq!((max_rank, observed_max_rank), (2, 3)),
            _ => panic!("unexpected details {:?}", res.details),
        }
    }

    #[test]
    fn stray_values_are_not_ranks() {
        let mut b = TableBuilder::new().columns(&["Q9_1", "Q9_2"]);
        b.add_row_numbers(&[Some(1.0), Some(2.0)]);
        b.add_row_numbers(&[Some(1e9), Some(1.0)]);
        b.add_row_numbers(&[Some(7.0), None]);
        let res = aggregate(
            &b.build(),
            &Schema::new(),
            Convention::Modern,
            "Q9",
            Aggregator::Ranked,
            &options(None),
        );
        assert_eq!(res.col_labels, rank_labels(2));
        assert_eq!(res.count_matrix, vec![vec![1, 0], vec![1, 1]]);
        match res.details {
            ResultDetails::Ranked {
                observed_max_rank,
                total_respondents,
                ..
            } => assert_eq!((observed_max_rank, total_respondents), (2, 2)),
            _ => panic!("unexpected details {:?}", res.details),
        }
    }

    #[test]
    fn no_ranks_at_all() {
        let t = TableBuilder::new().columns(&["Q9_1", "Q9_2"]).build();
        let res = aggregate(
            &t,
            &Schema::new(),
            Convention::Modern,
            "Q9",
            Aggregator::Ranked,
            &options(Some(5)),
        );
        assert_eq!(res.issue, None);
        assert!(res.col_labels.is_empty());
        assert_eq!(res.count_matrix, vec![Vec::<u64>::new(), Vec::new()]);
    }
}
