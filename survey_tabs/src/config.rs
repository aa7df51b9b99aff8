// ********* Conventions and selectors ***********

use std::error::Error;
use std::fmt::Display;

/// The two supported spreadsheet layouts.
///
/// - `Legacy` exports carry one answer-key block per question, separated by blank rows,
///   and name grouped response columns `Q7: Option label` or `Q9 | Brand`.
/// - `Modern` exports forward-fill the question identifier in the answer key, use
///   numeric sub-indices (`Q7_1`, `Q7_2`) and ship a variable-information sheet.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Convention {
    Legacy,
    Modern,
}

impl Convention {
    pub fn from_name(name: &str) -> Option<Convention> {
        match name.trim().to_lowercase().as_str() {
            "legacy" => Some(Convention::Legacy),
            "modern" => Some(Convention::Modern),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Convention::Legacy => "legacy",
            Convention::Modern => "modern",
        }
    }
}

/// The semantic types the classifier can recommend for a question.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum TypeTag {
    SingleChoice,
    MultiSelect,
    Matrix,
    Ranked,
    Nps,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::SingleChoice => "single_choice",
            TypeTag::MultiSelect => "multi_select",
            TypeTag::Matrix => "matrix",
            TypeTag::Ranked => "ranked",
            TypeTag::Nps => "nps",
        }
    }
}

/// The closed set of tabulations the engine knows how to run.
///
/// The five [TypeTag] variants map one to one; `CrossCut` and `AllocationBucket`
/// are only ever chosen by the caller.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Aggregator {
    SingleChoice,
    MultiSelect,
    Matrix,
    Ranked,
    Nps,
    CrossCut,
    AllocationBucket,
}

impl Aggregator {
    pub fn from_name(name: &str) -> Option<Aggregator> {
        match name.trim() {
            "single_choice" => Some(Aggregator::SingleChoice),
            "multi_select" => Some(Aggregator::MultiSelect),
            "matrix" => Some(Aggregator::Matrix),
            "ranked" => Some(Aggregator::Ranked),
            "nps" => Some(Aggregator::Nps),
            "cross_cut" => Some(Aggregator::CrossCut),
            // "share of wallet" is the name used on the reporting side.
            "allocation" | "allocation_bucket" | "share_of_wallet" => {
                Some(Aggregator::AllocationBucket)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregator::SingleChoice => "single_choice",
            Aggregator::MultiSelect => "multi_select",
            Aggregator::Matrix => "matrix",
            Aggregator::Ranked => "ranked",
            Aggregator::Nps => "nps",
            Aggregator::CrossCut => "cross_cut",
            Aggregator::AllocationBucket => "allocation",
        }
    }
}

impl From<TypeTag> for Aggregator {
    fn from(tag: TypeTag) -> Aggregator {
        match tag {
            TypeTag::SingleChoice => Aggregator::SingleChoice,
            TypeTag::MultiSelect => Aggregator::MultiSelect,
            TypeTag::Matrix => Aggregator::Matrix,
            TypeTag::Ranked => Aggregator::Ranked,
            TypeTag::Nps => Aggregator::Nps,
        }
    }
}

// ********* Filters **********

/// The label that disables a filter clause.
pub const ALL_LABEL: &str = "__all__";

/// One (question, option label) restriction.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilterClause {
    pub question: String,
    pub label: String,
}

impl FilterClause {
    pub fn new(question: &str, label: &str) -> FilterClause {
        FilterClause {
            question: question.to_string(),
            label: label.to_string(),
        }
    }

    /// True when the clause does not restrict anything.
    pub fn is_passthrough(&self) -> bool {
        let label = self.label.trim();
        self.question.trim().is_empty() || label.is_empty() || label == ALL_LABEL
    }
}

/// Conjunctive list of filter clauses, applied in order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FilterSpec {
    pub clauses: Vec<FilterClause>,
}

impl FilterSpec {
    pub fn new(clauses: Vec<FilterClause>) -> FilterSpec {
        FilterSpec { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.iter().all(|c| c.is_passthrough())
    }
}

// ********* Sorting **********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum SortOrder {
    #[default]
    None,
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_name(name: &str) -> Option<SortOrder> {
        match name.trim().to_lowercase().as_str() {
            "" | "none" => Some(SortOrder::None),
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::None => "none",
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// The column name that designates the overall metric of a row.
pub const OVERALL_COLUMN: &str = "Overall";

/// Presentation ordering of the rows of a result.
///
/// When `column` names one of the result's column labels, rows are ordered by that
/// column's percentage. Otherwise (or with [OVERALL_COLUMN]) the overall metric is used.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SortDirective {
    pub order: SortOrder,
    pub column: Option<String>,
}

impl SortDirective {
    pub const NONE: SortDirective = SortDirective {
        order: SortOrder::None,
        column: None,
    };

    pub fn asc() -> SortDirective {
        SortDirective {
            order: SortOrder::Asc,
            column: None,
        }
    }

    pub fn desc() -> SortDirective {
        SortDirective {
            order: SortOrder::Desc,
            column: None,
        }
    }

    pub fn by_column(self, column: &str) -> SortDirective {
        SortDirective {
            order: self.order,
            column: Some(column.to_string()),
        }
    }
}

/// Per-call options of an aggregation.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AggregateOptions {
    /// The secondary question used as the column axis of a cross-cut.
    pub cut_question: Option<String>,
    /// Upper bound on the number of rank columns. Never extends past the observed ranks.
    pub max_rank: Option<u32>,
    /// Applied by the sort adapter after aggregation, never by the aggregators.
    pub sort: SortDirective,
}

// ******** Output data structures *********

/// Net-promoter breakdown for one brand or sub-question.
#[derive(PartialEq, Debug, Clone)]
pub struct NpsBreakdown {
    pub label: String,
    pub promoters: u64,
    pub neutrals: u64,
    pub detractors: u64,
    pub total: u64,
    /// In [-100, 100], rounded to 1 decimal.
    pub nps_score: f64,
    /// Rounded to 2 decimals.
    pub average_score: f64,
}

/// The type-specific scalars that come along a result.
#[derive(PartialEq, Debug, Clone)]
pub enum ResultDetails {
    Empty,
    SingleChoice {
        total: u64,
    },
    MultiSelect {
        total_respondents: u64,
        total_responses: u64,
    },
    Matrix {
        col_totals: Vec<u64>,
    },
    Ranked {
        max_rank: u32,
        observed_max_rank: u32,
        total_respondents: u64,
        col_totals: Vec<u64>,
    },
    Nps {
        breakdowns: Vec<NpsBreakdown>,
    },
    CrossCut {
        cut_question: String,
        total_respondents: u64,
        cut_totals: Vec<u64>,
    },
    Allocation {
        col_totals: Vec<u64>,
    },
}

/// The unifying output of every aggregator.
///
/// Invariants:
/// - `count_matrix` and `percent_matrix` have `row_labels.len()` rows of `col_labels.len()` cells.
/// - `row_totals` and `row_overall_pct` are either empty or one entry per row.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregationResult {
    pub question_id: String,
    pub aggregator: Aggregator,
    pub question_text: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub count_matrix: Vec<Vec<u64>>,
    pub percent_matrix: Vec<Vec<f64>>,
    pub row_totals: Vec<u64>,
    pub row_overall_pct: Vec<f64>,
    pub details: ResultDetails,
    /// Set when the question could not be tabulated normally. The matrices are then zero-filled.
    pub issue: Option<TabulationError>,
}

impl AggregationResult {
    /// A result of the given shape where every count and percentage is zero.
    pub fn zero_filled(
        question_id: &str,
        aggregator: Aggregator,
        question_text: &str,
        row_labels: Vec<String>,
        col_labels: Vec<String>,
    ) -> AggregationResult {
        let num_cols = col_labels.len();
        let num_rows = row_labels.len();
        AggregationResult {
            question_id: question_id.to_string(),
            aggregator,
            question_text: question_text.to_string(),
            row_labels,
            col_labels,
            count_matrix: vec![vec![0; num_cols]; num_rows],
            percent_matrix: vec![vec![0.0; num_cols]; num_rows],
            row_totals: Vec::new(),
            row_overall_pct: Vec::new(),
            details: ResultDetails::Empty,
            issue: None,
        }
    }

    pub fn with_issue(self, issue: TabulationError) -> AggregationResult {
        AggregationResult {
            issue: Some(issue),
            ..self
        }
    }

    pub fn num_rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn is_degraded(&self) -> bool {
        self.issue.is_some()
    }
}

/// Data-quality problems. None of them is fatal: they degrade a result or a filter
/// and are reported next to the successful results.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationError {
    /// The answer key sheet is absent or empty.
    SchemaMissing,
    /// No option of the question carries the requested label.
    UnresolvableFilter { question: String, label: String },
    /// The question is absent from the response table or from the schema.
    UnknownQuestion { question: String },
    /// Neither a bare column nor a group of sub-columns matches the question.
    AmbiguousLayout { question: String },
}

impl Error for TabulationError {}

impl Display for TabulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabulationError::SchemaMissing => write!(f, "the answer key sheet is missing or empty"),
            TabulationError::UnresolvableFilter { question, label } => write!(
                f,
                "filter on {}: no option labelled {:?}",
                question, label
            ),
            TabulationError::UnknownQuestion { question } => {
                write!(f, "question {} not found in the responses or the answer key", question)
            }
            TabulationError::AmbiguousLayout { question } => write!(
                f,
                "question {}: no bare column and no sub-columns in the responses",
                question
            ),
        }
    }
}
