use crate::survey::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

/// The row of the response header, 1-based, when the request does not say.
pub const DEFAULT_HEADER_ROW: usize = 3;
pub const DEFAULT_ANSWER_KEY_SHEET: &str = "Answer key";
pub const DEFAULT_VARIABLE_INFO_SHEET: &str = "Variable information";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "reportName")]
    pub report_name: String,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "responseSheet")]
    pub response_sheet: Option<String>,
    pub convention: Option<String>,
    #[serde(rename = "headerRowIndex")]
    _header_row_index: Option<JSValue>,
    #[serde(rename = "skipLabelRow")]
    pub skip_label_row: Option<bool>,
    #[serde(rename = "answerKeySheet")]
    pub answer_key_sheet: Option<String>,
    #[serde(rename = "variableInfoSheet")]
    pub variable_info_sheet: Option<String>,
}

impl WorkbookSource {
    pub fn new(file_path: &str) -> WorkbookSource {
        WorkbookSource {
            file_path: file_path.to_string(),
            response_sheet: None,
            convention: None,
            _header_row_index: None,
            skip_label_row: None,
            answer_key_sheet: None,
            variable_info_sheet: None,
        }
    }

    /// The 0-based row of the response header.
    pub fn header_row_index(&self) -> SurveyResult<usize> {
        if self._header_row_index.is_none() {
            return Ok(DEFAULT_HEADER_ROW - 1);
        }
        let x = read_js_int(&self._header_row_index)?;
        if x == 0 {
            return InvalidValueSnafu {
                field: "headerRowIndex",
                value: "0",
            }
            .fail();
        }
        Ok(x - 1)
    }

    /// The number of data rows dropped after the header: modern exports repeat the
    /// question texts in the first row.
    pub fn skipped_rows(&self, convention: Convention) -> usize {
        match self.skip_label_row {
            Some(true) => 1,
            Some(false) => 0,
            None if convention == Convention::Modern => 1,
            None => 0,
        }
    }

    pub fn convention(&self) -> SurveyResult<Option<Convention>> {
        match &self.convention {
            None => Ok(None),
            Some(s) => Convention::from_name(s).map(Some).context(InvalidValueSnafu {
                field: "convention",
                value: s.clone(),
            }),
        }
    }

    pub fn answer_key_sheet(&self) -> String {
        self.answer_key_sheet
            .clone()
            .unwrap_or_else(|| DEFAULT_ANSWER_KEY_SHEET.to_string())
    }

    pub fn variable_info_sheet(&self) -> String {
        self.variable_info_sheet
            .clone()
            .unwrap_or_else(|| DEFAULT_VARIABLE_INFO_SHEET.to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FilterEntry {
    pub question: String,
    pub value: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "cutQuestion")]
    pub cut_question: Option<String>,
    #[serde(rename = "maxRank")]
    pub max_rank: Option<u32>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
    #[serde(rename = "sortColumn")]
    pub sort_column: Option<String>,
}

impl QuestionEntry {
    pub fn to_request(&self) -> SurveyResult<QuestionRequest> {
        let aggregator = Aggregator::from_name(&self.kind).context(InvalidValueSnafu {
            field: "type",
            value: self.kind.clone(),
        })?;
        let order = match &self.sort_order {
            None => SortOrder::None,
            Some(s) => SortOrder::from_name(s).context(InvalidValueSnafu {
                field: "sortOrder",
                value: s.clone(),
            })?,
        };
        if aggregator == Aggregator::CrossCut && self.cut_question.is_none() {
            whatever!("question {}: a cross cut needs a cutQuestion", self.id);
        }
        let mut req = QuestionRequest::new(&self.id, aggregator);
        req.options = AggregateOptions {
            cut_question: self.cut_question.clone(),
            max_rank: self.max_rank,
            sort: SortDirective {
                order,
                column: self.sort_column.clone(),
            },
        };
        Ok(req)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyRequest {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "workbookSource")]
    pub workbook_source: WorkbookSource,
    #[serde(default)]
    pub filters: Vec<FilterEntry>,
    #[serde(default)]
    pub questions: Vec<QuestionEntry>,
}

impl SurveyRequest {
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new(
            self.filters
                .iter()
                .map(|f| FilterClause::new(&f.question, &f.value))
                .collect(),
        )
    }

    pub fn question_requests(&self) -> SurveyResult<Vec<QuestionRequest>> {
        self.questions.iter().map(|q| q.to_request()).collect()
    }
}

pub fn parse_request(contents: &str) -> SurveyResult<SurveyRequest> {
    let req: SurveyRequest = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    // Fail early on unknown types and orders.
    req.workbook_source.convention()?;
    req.workbook_source.header_row_index()?;
    req.question_requests()?;
    Ok(req)
}

pub fn read_request(path: &str) -> SurveyResult<SurveyRequest> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_request(&contents)
}

pub fn read_summary(path: &str) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!(
        "read_summary: {} results",
        js["results"].as_array().map(|a| a.len()).unwrap_or(0)
    );
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> SurveyResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize).context(InvalidValueSnafu {
            field: "headerRowIndex",
            value: n.to_string(),
        }),
        Some(JSValue::String(s)) => s.trim().parse::<usize>().ok().context(InvalidValueSnafu {
            field: "headerRowIndex",
            value: s.clone(),
        }),
        other => None.context(InvalidValueSnafu {
            field: "headerRowIndex",
            value: format!("{:?}", other),
        }),
    }
}
