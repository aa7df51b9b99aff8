mod aggregate;
pub mod builder;
mod classify;
mod config;
mod filter;
mod layout;
pub mod manual;
mod schema;
mod sort;
mod table;

use log::{debug, info, warn};

pub use crate::aggregate::{
    aggregate, bucket_labels, percent, round_to, BUCKETS, COUNT_COLUMN, RESPONDENTS_COLUMN,
    RESPONSES_COLUMN,
};
pub use crate::classify::*;
pub use crate::config::*;
pub use crate::filter::*;
pub use crate::layout::*;
pub use crate::schema::*;
pub use crate::sort::*;
pub use crate::table::*;

/// One question to tabulate in a batch.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionRequest {
    pub question_id: String,
    pub aggregator: Aggregator,
    pub options: AggregateOptions,
}

impl QuestionRequest {
    pub fn new(question_id: &str, aggregator: Aggregator) -> QuestionRequest {
        QuestionRequest {
            question_id: question_id.trim().to_string(),
            aggregator,
            options: AggregateOptions::default(),
        }
    }
}

/// The sorted result of one requested question.
#[derive(PartialEq, Debug, Clone)]
pub struct QuestionOutcome {
    pub request: QuestionRequest,
    pub result: AggregationResult,
}

impl QuestionOutcome {
    /// The problem met while tabulating this question, if any.
    pub fn error(&self) -> Option<&TabulationError> {
        self.result.issue.as_ref()
    }
}

/// Filters the table once, then tabulates and sorts every requested question.
///
/// A question that cannot be tabulated does not stop the batch: its outcome carries a
/// zero-filled result and the error. Outcomes are ordered by question number (`Q2` before
/// `Q10`), requests for the same question keep their relative order.
///
/// Arguments:
/// * `table` the responses, as loaded. It is not modified.
/// * `schema` the parsed answer key
/// * `filters` the global filters, applied to every question
/// * `requests` the questions and how to tabulate them
pub fn run_batch(
    table: &ResponseTable,
    schema: &Schema,
    convention: Convention,
    filters: &FilterSpec,
    requests: &[QuestionRequest],
) -> Vec<QuestionOutcome> {
    info!(
        "run_batch: {} questions over {} rows, {} filters, {} convention",
        requests.len(),
        table.num_rows(),
        filters.clauses.len(),
        convention.as_str()
    );
    let (filtered, filter_issues) =
        resolve_filters_with_issues(table, schema, filters, convention);
    for issue in filter_issues.iter() {
        warn!("run_batch: filter: {}", issue);
    }

    let mut outcomes: Vec<QuestionOutcome> = requests
        .iter()
        .map(|req| {
            let res = aggregate(
                &filtered,
                schema,
                convention,
                &req.question_id,
                req.aggregator,
                &req.options,
            );
            let res = sort_result(res, &req.options.sort);
            debug!(
                "run_batch: {} {}: {} rows, degraded: {}",
                req.question_id,
                req.aggregator.as_str(),
                res.num_rows(),
                res.is_degraded()
            );
            QuestionOutcome {
                request: req.clone(),
                result: res,
            }
        })
        .collect();
    outcomes.sort_by_key(|o| question_number(&o.request.question_id).unwrap_or(u64::MAX));
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TableBuilder;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_option("Q1", Code::Int(1), "Yes");
        schema.add_option("Q1", Code::Int(2), "No");
        schema.add_option("Q2", Code::Int(1), "North");
        schema.add_option("Q2", Code::Int(2), "South");
        schema.add_option("Q10", Code::Int(1), "Tea");
        schema.add_option("Q10", Code::Int(2), "Coffee");
        schema
    }

    fn table() -> ResponseTable {
        let mut b = TableBuilder::new().columns(&["Q1", "Q2", "Q10"]);
        b.add_row_numbers(&[Some(1.0), Some(1.0), Some(1.0)]);
        b.add_row_numbers(&[Some(2.0), Some(1.0), Some(2.0)]);
        b.add_row_numbers(&[Some(1.0), Some(2.0), Some(2.0)]);
        b.add_row_numbers(&[Some(1.0), Some(1.0), Some(2.0)]);
        b.build()
    }

    #[test]
    fn batch_survives_bad_questions() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut by_region = QuestionRequest::new("Q1", Aggregator::CrossCut);
        by_region.options.cut_question = Some("Q2".to_string());
        let mut sorted = QuestionRequest::new("Q10", Aggregator::SingleChoice);
        sorted.options.sort = SortDirective::desc();
        let requests = vec![
            sorted,
            QuestionRequest::new("Q42", Aggregator::SingleChoice),
            by_region,
            QuestionRequest::new("Q2", Aggregator::SingleChoice),
        ];
        let outcomes = run_batch(
            &table(),
            &schema(),
            Convention::Legacy,
            &FilterSpec::default(),
            &requests,
        );
        let ids: Vec<&str> = outcomes
            .iter()
            .map(|o| o.request.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["Q1", "Q2", "Q10", "Q42"]);
        assert_eq!(outcomes[0].error(), None);
        assert_eq!(outcomes[0].result.count_matrix, vec![vec![2, 1], vec![1, 0]]);
        assert_eq!(outcomes[2].result.row_labels, vec!["Coffee", "Tea"]);
        assert_eq!(
            outcomes[3].error(),
            Some(&TabulationError::UnknownQuestion {
                question: "Q42".to_string()
            })
        );
    }

    #[test]
    fn filters_apply_to_every_question() {
        let table = table();
        let filters = FilterSpec::new(vec![FilterClause::new("Q2", "North")]);
        let requests = vec![
            QuestionRequest::new("Q1", Aggregator::SingleChoice),
            QuestionRequest::new("Q10", Aggregator::SingleChoice),
        ];
        let outcomes = run_batch(&table, &schema(), Convention::Legacy, &filters, &requests);
        assert_eq!(outcomes[0].result.row_totals, vec![2, 1]);
        assert_eq!(outcomes[1].result.row_totals, vec![1, 2]);
        // The base table is reused as is.
        assert_eq!(table.num_rows(), 4);

        let filters = FilterSpec::new(vec![FilterClause::new("Q2", "Nonexistent")]);
        let outcomes = run_batch(&table, &schema(), Convention::Legacy, &filters, &requests);
        assert_eq!(outcomes[0].result.row_totals, vec![0, 0]);
        assert_eq!(outcomes[0].error(), None);
    }
}
