use log::debug;

use super::{percent, round_to, Input};
use crate::config::*;
use crate::layout::*;

/// The only column of a single-choice result.
pub const COUNT_COLUMN: &str = "Responses";

/// One row per answer option. Values outside of the options and missing cells are not
/// part of the total.
pub(super) fn tabulate(input: &Input) -> Result<AggregationResult, TabulationError> {
    let question = input.coded_question()?;
    let idx = match detect_layout(&input.group)? {
        Layout::Bare(idx) => idx,
        Layout::Grouped => return Err(input.ambiguous()),
    };

    let counts: Vec<u64> = question
        .options
        .iter()
        .map(|o| {
            input
                .table
                .column(idx)
                .filter(|v| v.matches_code(&o.code))
                .count() as u64
        })
        .collect();
    let total: u64 = counts.iter().sum();
    let pcts: Vec<f64> = counts.iter().map(|c| round_to(percent(*c, total), 2)).collect();
    debug!(
        "single_choice: {}: total {} out of {} rows",
        question.id,
        total,
        input.table.num_rows()
    );

    Ok(AggregationResult {
        question_id: question.id.clone(),
        aggregator: Aggregator::SingleChoice,
        question_text: input.schema.display_text(&question.id),
        row_labels: question.options.iter().map(|o| o.label.clone()).collect(),
        col_labels: vec![COUNT_COLUMN.to_string()],
        count_matrix: counts.iter().map(|c| vec![*c]).collect(),
        percent_matrix: pcts.iter().map(|p| vec![*p]).collect(),
        row_totals: counts,
        row_overall_pct: pcts,
        details: ResultDetails::SingleChoice { total },
        issue: None,
    })
}

#[cfg(test)]
mod tests {
    use crate::aggregate::aggregate;
    use crate::builder::TableBuilder;
    use crate::config::*;
    use crate::schema::*;
    use crate::table::*;

    fn yes_no() -> Schema {
        let mut schema = Schema::new();
        schema.add_option("Q1", Code::Int(1), "Yes");
        schema.add_option("Q1", Code::Int(2), "No");
        schema.set_text("Q1", "Would you recommend us?");
        schema
    }

    #[test]
    fn counts_in_domain_values() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut b = TableBuilder::new().columns(&["Q1"]);
        b.fill_column(
            "Q1",
            &[Some(1.0), Some(1.0), Some(2.0), Some(1.0), Some(2.0), Some(6.0), None, Some(1.0), Some(2.0), Some(1.0)],
        );
        let res = aggregate(
            &b.build(),
            &yes_no(),
            Convention::Legacy,
            "Q1",
            Aggregator::SingleChoice,
            &AggregateOptions::default(),
        );
        assert_eq!(res.issue, None);
        assert_eq!(res.question_text, "Q1: Would you recommend us?");
        assert_eq!(res.row_labels, vec!["Yes", "No"]);
        assert_eq!(res.count_matrix, vec![vec![5], vec![3]]);
        assert_eq!(res.percent_matrix, vec![vec![62.5], vec![37.5]]);
        assert_eq!(res.details, ResultDetails::SingleChoice { total: 8 });
        let pct_sum: f64 = res.percent_matrix.iter().map(|r| r[0]).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn text_codes_and_rounding() {
        let mut b = TableBuilder::new().columns(&["Q1"]);
        b.add_row(&["1".into()]);
        b.add_row(&["2".into()]);
        b.add_row(&[2.into()]);
        let res = aggregate(
            &b.build(),
            &yes_no(),
            Convention::Modern,
            "Q1",
            Aggregator::SingleChoice,
            &AggregateOptions::default(),
        );
        assert_eq!(res.count_matrix, vec![vec![1], vec![2]]);
        assert_eq!(res.percent_matrix, vec![vec![33.33], vec![66.67]]);
    }

    #[test]
    fn empty_table() {
        let t = TableBuilder::new().columns(&["Q1"]).build();
        let res = aggregate(
            &t,
            &yes_no(),
            Convention::Legacy,
            "Q1",
            Aggregator::SingleChoice,
            &AggregateOptions::default(),
        );
        assert_eq!(res.issue, None);
        assert_eq!(res.count_matrix, vec![vec![0], vec![0]]);
        assert_eq!(res.percent_matrix, vec![vec![0.0], vec![0.0]]);
    }
}
