// ********* Tabulation engine ***********

mod allocation;
mod cross_cut;
mod matrix;
mod multi_select;
mod nps;
mod ranked;
mod single_choice;

use log::{debug, warn};

use crate::config::*;
use crate::layout::*;
use crate::schema::*;
use crate::table::*;

pub use crate::aggregate::allocation::{bucket_labels, BUCKETS};
pub use crate::aggregate::multi_select::{RESPONDENTS_COLUMN, RESPONSES_COLUMN};
pub use crate::aggregate::single_choice::COUNT_COLUMN;

/// Tabulates one question of the (already filtered) response table.
///
/// This never fails: when the question cannot be found or its columns do not have the
/// expected layout, the result is zero-filled and carries the problem in `issue`.
pub fn aggregate(
    table: &ResponseTable,
    schema: &Schema,
    convention: Convention,
    question_id: &str,
    aggregator: Aggregator,
    options: &AggregateOptions,
) -> AggregationResult {
    let input = Input::new(table, schema, convention, question_id, options);
    debug!(
        "aggregate: {} as {} over {} rows ({} columns)",
        input.question_id,
        aggregator.as_str(),
        table.num_rows(),
        input.group.subs.len() + input.group.bare.map(|_| 1).unwrap_or(0)
    );
    let res = if input.group.is_empty() {
        Err(TabulationError::UnknownQuestion {
            question: input.question_id.to_string(),
        })
    } else {
        match aggregator {
            Aggregator::SingleChoice => single_choice::tabulate(&input),
            Aggregator::MultiSelect => multi_select::tabulate(&input),
            Aggregator::Matrix => matrix::tabulate(&input),
            Aggregator::Ranked => ranked::tabulate(&input),
            Aggregator::Nps => nps::tabulate(&input),
            Aggregator::CrossCut => cross_cut::tabulate(&input),
            Aggregator::AllocationBucket => allocation::tabulate(&input),
        }
    };
    match res {
        Ok(r) => r,
        Err(e) => {
            warn!("aggregate: {}: {}", input.question_id, e);
            degraded(&input, aggregator).with_issue(e)
        }
    }
}

// The zero-filled result of a question that could not be tabulated. The rows are the
// ones the aggregator would have produced when they are known without the table.
fn degraded(input: &Input, aggregator: Aggregator) -> AggregationResult {
    let row_labels: Vec<String> = match aggregator {
        Aggregator::Nps => nps::score_labels(),
        Aggregator::AllocationBucket => bucket_labels(),
        _ => input
            .question
            .map(|q| q.options.iter().map(|o| o.label.clone()).collect())
            .unwrap_or_default(),
    };
    AggregationResult::zero_filled(
        input.question_id,
        aggregator,
        &input.schema.display_text(input.question_id),
        row_labels,
        Vec::new(),
    )
}

/// Everything an aggregator reads.
struct Input<'a> {
    table: &'a ResponseTable,
    schema: &'a Schema,
    convention: Convention,
    question_id: &'a str,
    question: Option<&'a QuestionSchema>,
    group: ColumnGroup,
    options: &'a AggregateOptions,
}

impl<'a> Input<'a> {
    fn new(
        table: &'a ResponseTable,
        schema: &'a Schema,
        convention: Convention,
        question_id: &'a str,
        options: &'a AggregateOptions,
    ) -> Input<'a> {
        let question_id = question_id.trim();
        Input {
            table,
            schema,
            convention,
            question_id,
            question: schema.get(question_id),
            group: table.group(question_id),
            options,
        }
    }

    /// The answer key entry. Coded aggregations cannot run without one.
    fn coded_question(&self) -> Result<&'a QuestionSchema, TabulationError> {
        match self.question {
            Some(q) if !q.options.is_empty() => Ok(q),
            _ => Err(TabulationError::UnknownQuestion {
                question: self.question_id.to_string(),
            }),
        }
    }

    fn ambiguous(&self) -> TabulationError {
        TabulationError::AmbiguousLayout {
            question: self.question_id.to_string(),
        }
    }

    /// The sub-columns holding one answer each: numeric sub-indices in modern exports
    /// (which also carry helper columns such as `Q6_NPS_GROUP`), any suffix in legacy ones.
    fn data_columns(&self) -> Vec<&SubColumn> {
        self.group
            .subs
            .iter()
            .filter(|s| self.convention == Convention::Legacy || s.name.sub_index().is_some())
            .collect()
    }

    /// The data columns with their display labels. A question answered in one bare
    /// column yields that column, labelled by the identifier.
    fn labelled_columns(&self) -> Result<Vec<(usize, String)>, TabulationError> {
        let subs = self.data_columns();
        if !subs.is_empty() {
            let labels = sub_column_labels(self.schema, self.question_id, &subs);
            return Ok(subs.iter().map(|s| s.index).zip(labels).collect());
        }
        match self.group.bare {
            Some(idx) => Ok(vec![(idx, self.question_id.to_string())]),
            None => Err(self.ambiguous()),
        }
    }

    /// The text of the question, or the fallback when the answer key has none.
    fn text_or(&self, fallback: String) -> String {
        match self.question.and_then(|q| q.text.as_ref()) {
            Some(t) if !t.is_empty() => self.schema.display_text(self.question_id),
            _ => fallback,
        }
    }
}

/// `count / total` as a percentage, 0 when there is nothing to divide by.
pub fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Rounds half away from zero at the given number of decimals.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

fn column_totals(count_matrix: &[Vec<u64>], num_cols: usize) -> Vec<u64> {
    (0..num_cols)
        .map(|j| count_matrix.iter().map(|row| row[j]).sum())
        .collect()
}
