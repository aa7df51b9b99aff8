// ********* Presentation order ***********

use log::{debug, warn};
use std::cmp::Ordering;

use crate::config::*;

/// Reorders the rows of a result. Values are never changed.
///
/// The row labels, both matrices and the per-row totals are permuted together. The sort is
/// stable: rows that compare equal keep their answer-key order. A directive naming a column
/// that the result does not have leaves the result as it is.
pub fn sort_result(result: AggregationResult, directive: &SortDirective) -> AggregationResult {
    if directive.order == SortOrder::None || result.num_rows() < 2 {
        return result;
    }
    let metric = match sort_metric(&result, directive.column.as_deref()) {
        Some(m) => m,
        None => {
            warn!(
                "sort_result: {}: no column {:?} among {:?}, order unchanged",
                result.question_id, directive.column, result.col_labels
            );
            return result;
        }
    };

    let mut order: Vec<usize> = (0..result.num_rows()).collect();
    order.sort_by(|a, b| {
        let (x, y) = match directive.order {
            SortOrder::Desc => (metric[*b], metric[*a]),
            _ => (metric[*a], metric[*b]),
        };
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    });
    debug!("sort_result: {}: order {:?}", result.question_id, order);

    AggregationResult {
        row_labels: permute(&result.row_labels, &order),
        count_matrix: permute(&result.count_matrix, &order),
        percent_matrix: permute(&result.percent_matrix, &order),
        row_totals: permute(&result.row_totals, &order),
        row_overall_pct: permute(&result.row_overall_pct, &order),
        ..result
    }
}

// One value per row: the percentage in the named column, or the overall metric of the row.
fn sort_metric(result: &AggregationResult, column: Option<&str>) -> Option<Vec<f64>> {
    match column.map(|c| c.trim()) {
        Some(c) if !c.is_empty() && c != OVERALL_COLUMN => {
            let j = result.col_labels.iter().position(|l| l.trim() == c)?;
            Some(
                result
                    .percent_matrix
                    .iter()
                    .map(|row| row.get(j).cloned().unwrap_or(0.0))
                    .collect(),
            )
        }
        _ if result.row_overall_pct.len() == result.num_rows() => {
            Some(result.row_overall_pct.clone())
        }
        _ => Some(
            result
                .count_matrix
                .iter()
                .map(|row| row.iter().sum::<u64>() as f64)
                .collect(),
        ),
    }
}

// Per-row vectors may be empty: they are then left alone.
fn permute<T: Clone>(xs: &[T], order: &[usize]) -> Vec<T> {
    if xs.len() != order.len() {
        return xs.to_vec();
    }
    order.iter().map(|idx| xs[*idx].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> AggregationResult {
        let mut res = AggregationResult::zero_filled(
            "Q4",
            Aggregator::Matrix,
            "Q4",
            vec!["Poor".to_string(), "Fair".to_string(), "Good".to_string()],
            vec!["Price".to_string(), "Quality".to_string()],
        );
        res.count_matrix = vec![vec![2, 0], vec![1, 1], vec![1, 2]];
        res.percent_matrix = vec![vec![50.0, 0.0], vec![25.0, 33.0], vec![25.0, 67.0]];
        res.row_totals = vec![2, 2, 3];
        res
    }

    #[test]
    fn overall_order() {
        let asc = sort_result(result(), &SortDirective::asc());
        assert_eq!(asc.row_labels, vec!["Poor", "Fair", "Good"]);
        let desc = sort_result(result(), &SortDirective::desc());
        // Ties keep their original order.
        assert_eq!(desc.row_labels, vec!["Good", "Poor", "Fair"]);
        assert_eq!(desc.count_matrix, vec![vec![1, 2], vec![2, 0], vec![1, 1]]);
        assert_eq!(desc.row_totals, vec![3, 2, 2]);
        assert_eq!(desc.percent_matrix[0], vec![25.0, 67.0]);
        assert_eq!(
            sort_result(desc.clone(), &SortDirective::desc()),
            desc
        );
    }

    #[test]
    fn by_column() {
        let res = sort_result(result(), &SortDirective::desc().by_column("Price"));
        assert_eq!(res.row_labels, vec!["Poor", "Fair", "Good"]);
        let res = sort_result(result(), &SortDirective::asc().by_column("Quality"));
        assert_eq!(res.row_labels, vec!["Poor", "Fair", "Good"]);
        let res = sort_result(result(), &SortDirective::desc().by_column("Quality"));
        assert_eq!(res.row_labels, vec!["Good", "Fair", "Poor"]);
        // Each label keeps its own counts.
        for (label, row) in res.row_labels.iter().zip(res.count_matrix.iter()) {
            let original = result();
            let idx = original.row_labels.iter().position(|l| l == label).unwrap();
            assert_eq!(&original.count_matrix[idx], row);
        }
    }

    #[test]
    fn unchanged() {
        assert_eq!(sort_result(result(), &SortDirective::NONE), result());
        assert_eq!(
            sort_result(result(), &SortDirective::desc().by_column("Nope")),
            result()
        );
        let overall = sort_result(result(), &SortDirective::desc().by_column(OVERALL_COLUMN));
        assert_eq!(overall, sort_result(result(), &SortDirective::desc()));
    }
}
