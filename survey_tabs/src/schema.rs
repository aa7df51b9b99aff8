// ********* Answer-key schema ***********

use log::{debug, info, warn};
use std::collections::HashMap;

use crate::config::*;
use crate::table::*;

/// One coded answer of a question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnswerOption {
    pub code: Code,
    pub label: String,
}

/// Descriptor of one sub-column of a grouped question (modern convention only).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SubQuestion {
    pub suffix: String,
    pub label: String,
}

/// Everything the answer key says about one question identifier.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionSchema {
    pub id: String,
    pub text: Option<String>,
    /// In key-sheet order. Codes are unique.
    pub options: Vec<AnswerOption>,
    pub sub_questions: Vec<SubQuestion>,
}

impl QuestionSchema {
    fn new(id: &str) -> QuestionSchema {
        QuestionSchema {
            id: id.to_string(),
            text: None,
            options: Vec::new(),
            sub_questions: Vec::new(),
        }
    }

    /// Adds an option, unless the code is already taken. Returns whether it was added.
    fn add_option(&mut self, code: Code, label: String) -> bool {
        if self.options.iter().any(|o| o.code == code) {
            debug!(
                "add_option: {}: duplicate code {} ({:?}) skipped",
                self.id, code, label
            );
            return false;
        }
        self.options.push(AnswerOption { code, label });
        true
    }

    fn add_sub_question(&mut self, suffix: &str, label: String) {
        if !self.sub_questions.iter().any(|s| s.suffix == suffix) {
            self.sub_questions.push(SubQuestion {
                suffix: suffix.to_string(),
                label,
            });
        }
    }

    /// Exact (trimmed, case-sensitive) label lookup.
    pub fn option_by_label(&self, label: &str) -> Option<&AnswerOption> {
        let label = label.trim();
        self.options.iter().find(|o| o.label.trim() == label)
    }

    pub fn sub_question_label(&self, suffix: &str) -> Option<&str> {
        self.sub_questions
            .iter()
            .find(|s| s.suffix == suffix)
            .map(|s| s.label.as_str())
    }

    /// Questions without any option are free text and never classified.
    pub fn is_coded(&self) -> bool {
        !self.options.is_empty() || !self.sub_questions.is_empty()
    }

    /// `Q1: question text`, or the bare identifier when there is no text.
    pub fn display_text(&self) -> String {
        match &self.text {
            Some(t) if !t.is_empty() => format!("{}: {}", self.id, t),
            _ => self.id.clone(),
        }
    }
}

/// The normalized answer key: question identifier → options, in key-sheet order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Schema {
    questions: Vec<QuestionSchema>,
    index: HashMap<String, usize>,
    column_texts: HashMap<String, String>,
    issue: Option<TabulationError>,
}

impl Schema {
    pub fn new() -> Schema {
        Schema::default()
    }

    fn missing() -> Schema {
        Schema {
            issue: Some(TabulationError::SchemaMissing),
            ..Schema::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Set when the schema had to be degraded (no answer key).
    pub fn issue(&self) -> Option<&TabulationError> {
        self.issue.as_ref()
    }

    pub fn get(&self, id: &str) -> Option<&QuestionSchema> {
        self.index.get(id.trim()).map(|idx| &self.questions[*idx])
    }

    fn entry(&mut self, id: &str) -> &mut QuestionSchema {
        let id = id.trim();
        let idx = match self.index.get(id) {
            Some(idx) => *idx,
            None => {
                self.questions.push(QuestionSchema::new(id));
                self.index.insert(id.to_string(), self.questions.len() - 1);
                self.questions.len() - 1
            }
        };
        &mut self.questions[idx]
    }

    pub fn questions(&self) -> &[QuestionSchema] {
        &self.questions
    }

    /// The identifiers in key-sheet order.
    pub fn question_ids(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    /// The identifiers in numeric order (`Q2` before `Q10`), for question pickers.
    pub fn list_questions(&self) -> Vec<String> {
        let mut ids = self.question_ids();
        ids.sort_by_key(|id| (question_number(id).unwrap_or(u64::MAX), id.clone()));
        ids
    }

    pub fn display_text(&self, id: &str) -> String {
        self.get(id)
            .map(|q| q.display_text())
            .unwrap_or_else(|| id.trim().to_string())
    }

    /// The full text of a response column, from the variable-information sheet.
    pub fn column_text(&self, column: &str) -> Option<&str> {
        self.column_texts.get(column.trim()).map(|s| s.as_str())
    }

    pub fn add_option(&mut self, id: &str, code: Code, label: &str) -> bool {
        self.entry(id).add_option(code, label.trim().to_string())
    }

    pub fn set_text(&mut self, id: &str, text: &str) {
        self.entry(id).text = Some(text.trim().to_string());
    }
}

/// Parses the answer key sheet of a workbook.
///
/// A missing or empty sheet is not an error: the resulting schema is empty and every
/// question is treated as text-only.
pub fn parse_schema(key_sheet: Option<&Sheet>, convention: Convention) -> Schema {
    let sheet = match key_sheet {
        Some(s) if !s.is_empty() => s,
        _ => {
            warn!("parse_schema: {}", TabulationError::SchemaMissing);
            return Schema::missing();
        }
    };
    let schema = match convention {
        Convention::Legacy => parse_legacy(sheet),
        Convention::Modern => parse_modern(sheet),
    };
    info!(
        "parse_schema: {} convention: {} questions from sheet {:?}",
        convention.as_str(),
        schema.questions.len(),
        sheet.name
    );
    schema
}

/// Same as [parse_schema], then reads the question texts from the variable-information sheet.
pub fn parse_schema_with_metadata(
    key_sheet: Option<&Sheet>,
    variable_info: Option<&Sheet>,
    convention: Convention,
) -> Schema {
    let mut schema = parse_schema(key_sheet, convention);
    if let Some(meta) = variable_info {
        attach_variable_info(&mut schema, meta);
    }
    schema
}

// States of the legacy key-sheet scan.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum ScanState {
    Searching,
    Capturing(usize),
}

// Legacy layout: a row whose first cell is a question identifier opens a block, a row
// with a blank first cell closes it. Every row in between with a label in the second
// cell is an option. Single pass, no lookahead.
fn parse_legacy(sheet: &Sheet) -> Schema {
    let mut schema = Schema::new();
    let mut state = ScanState::Searching;
    for (lineno, row) in sheet.rows.iter().enumerate() {
        let first = row.first().and_then(|v| v.as_label());
        let second = row.get(1).and_then(|v| v.as_label());
        let opening = first.as_deref().filter(|s| is_question_id(s));

        state = match (state, opening, &first) {
            (_, Some(id), _) => {
                let q = schema.entry(id);
                // The opening row carries the question text, in the second or third cell.
                if q.text.is_none() {
                    q.text = second
                        .clone()
                        .or_else(|| row.get(2).and_then(|v| v.as_label()));
                }
                ScanState::Capturing(schema.index[id.trim()])
            }
            (ScanState::Capturing(_), None, None) => ScanState::Searching,
            (ScanState::Capturing(qidx), None, Some(first_s)) => {
                match (&second, Code::parse(first_s)) {
                    (Some(label), Some(code)) => {
                        schema.questions[qidx].add_option(code, label.clone());
                    }
                    _ => {
                        debug!(
                            "parse_legacy: line {}: ignoring row without label {:?}",
                            lineno, row
                        );
                    }
                }
                ScanState::Capturing(qidx)
            }
            (ScanState::Searching, None, _) => ScanState::Searching,
        };
    }
    schema
}

// Modern layout: the identifier column is forward-filled, codes are in the second column
// and labels in the third. Identifiers may name a sub-column (`Q7_2`): its rows then
// describe that sub-column, and coded rows still belong to the base question.
fn parse_modern(sheet: &Sheet) -> Schema {
    let mut schema = Schema::new();
    let mut current: Option<ColumnName> = None;
    for (lineno, row) in sheet.rows.iter().enumerate() {
        let raw_ident = row.first().and_then(|v| v.as_label());
        let opening = raw_ident.is_some();
        if let Some(ident) = raw_ident {
            current = ColumnName::parse(&ident);
            if current.is_none() {
                debug!("parse_modern: line {}: skipping block {:?}", lineno, ident);
            }
        }
        let name = match &current {
            Some(n) => n.clone(),
            None => continue,
        };
        let second = row.get(1).and_then(|v| v.as_label());
        let third = row.get(2).and_then(|v| v.as_label());
        let q = schema.entry(&name.base);

        match (opening, &name.suffix, second, third) {
            // Sub-column descriptor: the label sits in either of the two columns.
            (true, Some(suffix), s, t) if s.is_some() != t.is_some() => {
                if let Some(label) = t.or(s) {
                    q.add_sub_question(suffix, label);
                }
            }
            (true, None, None, Some(text)) => {
                if q.text.is_none() {
                    q.text = Some(text);
                }
            }
            (true, None, Some(text), None) if matches!(Code::parse(&text), Some(Code::Text(_))) => {
                if q.text.is_none() {
                    q.text = Some(text);
                }
            }
            (_, _, Some(code_s), Some(label)) => {
                if let Some(code) = Code::parse(&code_s) {
                    q.add_option(code, label);
                }
            }
            _ => {
                debug!("parse_modern: line {}: ignoring row {:?}", lineno, row);
            }
        }
    }
    schema
}

/// Reads the variable-information sheet: column name in the first cell, its full text in
/// the third (or second) cell.
///
/// The display text of a question is the text of its bare column if there is one, otherwise
/// the longest common prefix of the texts of its sub-columns.
pub fn attach_variable_info(schema: &mut Schema, sheet: &Sheet) {
    for row in sheet.rows.iter() {
        let column = match row.first().and_then(|v| v.as_label()) {
            Some(c) => c,
            None => continue,
        };
        let text = row
            .get(2)
            .and_then(|v| v.as_label())
            .or_else(|| row.get(1).and_then(|v| v.as_label()));
        if let Some(text) = text {
            schema.column_texts.insert(column, text);
        }
    }

    for idx in 0..schema.questions.len() {
        let id = schema.questions[idx].id.clone();
        if let Some(exact) = schema.column_texts.get(&id) {
            schema.questions[idx].text = Some(exact.clone());
            continue;
        }
        let mut sub_texts: Vec<(&String, &String)> = schema
            .column_texts
            .iter()
            .filter(|(col, _)| {
                matches!(ColumnName::parse(col), Some(n) if n.base == id && !n.is_bare())
            })
            .collect();
        if sub_texts.is_empty() {
            continue;
        }
        // The map has no order: sort by column name to keep the prefix deterministic.
        sub_texts.sort();
        let texts: Vec<&str> = sub_texts.iter().map(|(_, t)| t.as_str()).collect();
        let prefix = common_text_prefix(&texts);
        if !prefix.is_empty() {
            schema.questions[idx].text = Some(prefix);
        }
    }
}

/// Characters trimmed around derived texts.
pub const TEXT_TRIM: &[char] = &[' ', ':', '-', '–'];

/// Longest common prefix of the texts, trimmed of trailing separators.
pub fn common_text_prefix(texts: &[&str]) -> String {
    let first = match texts.first() {
        Some(f) => *f,
        None => return String::new(),
    };
    let mut len = first.len();
    for other in texts.iter().skip(1) {
        len = first
            .char_indices()
            .zip(other.chars())
            .find(|((_, a), b)| a != b)
            .map(|((idx, _), _)| idx)
            .unwrap_or_else(|| len.min(other.len()))
            .min(len);
    }
    first[..len].trim_matches(TEXT_TRIM).to_string()
}

/// The part of a text that follows the common prefix of its group.
pub fn strip_text_prefix(text: &str, prefix: &str) -> String {
    text.strip_prefix(prefix)
        .unwrap_or(text)
        .trim_matches(TEXT_TRIM)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Value> {
        cells.iter().map(|s| Value::text(s)).collect()
    }

    fn legacy_key() -> Sheet {
        Sheet::from_rows(
            "Answer key",
            vec![
                row(&["Q1", "Do you drink tea?"]),
                row(&["1", "Yes"]),
                row(&["2", "No"]),
                row(&[]),
                row(&["Q2"]),
                row(&["1", "Morning"]),
                row(&["2", "Evening"]),
                row(&["2", "Evening again"]),
                row(&["note", ""]),
                row(&[]),
                row(&["Q3", "Any comment?"]),
                row(&[]),
                row(&["Q4", "Which brands?"]),
                row(&["1", "Brand A"]),
            ],
        )
    }

    #[test]
    fn legacy_blocks() {
        let schema = parse_schema(Some(&legacy_key()), Convention::Legacy);
        assert_eq!(schema.question_ids(), vec!["Q1", "Q2", "Q3", "Q4"]);
        let q1 = schema.get("Q1").unwrap();
        assert_eq!(q1.text.as_deref(), Some("Do you drink tea?"));
        assert_eq!(
            q1.options,
            vec![
                AnswerOption {
                    code: Code::Int(1),
                    label: "Yes".to_string()
                },
                AnswerOption {
                    code: Code::Int(2),
                    label: "No".to_string()
                },
            ]
        );
        let q2 = schema.get("Q2").unwrap();
        assert_eq!(q2.text, None);
        assert_eq!(q2.options.len(), 2);
        assert_eq!(q2.options[1].label, "Evening");
        // Text question: no options, not coded.
        assert!(!schema.get("Q3").unwrap().is_coded());
        assert_eq!(schema.get("Q4").unwrap().options.len(), 1);
        assert_eq!(schema.display_text("Q1"), "Q1: Do you drink tea?");
        assert_eq!(schema.display_text("Q2"), "Q2");
    }

    #[test]
    fn legacy_block_ends_at_next_identifier() {
        let sheet = Sheet::from_rows(
            "Answer key",
            vec![
                row(&["Q5", "Age"]),
                row(&["1", "18-34"]),
                row(&["Q6", "Region"]),
                row(&["1", "North"]),
            ],
        );
        let schema = parse_schema(Some(&sheet), Convention::Legacy);
        assert_eq!(schema.get("Q5").unwrap().options.len(), 1);
        assert_eq!(schema.get("Q6").unwrap().options[0].label, "North");
    }

    #[test]
    fn missing_key_sheet() {
        let schema = parse_schema(None, Convention::Legacy);
        assert!(schema.is_empty());
        assert_eq!(schema.issue(), Some(&TabulationError::SchemaMissing));
        let empty = Sheet::from_rows("Answer key", vec![row(&["", ""])]);
        assert!(parse_schema(Some(&empty), Convention::Modern).is_empty());
    }

    #[test]
    fn modern_forward_fill() {
        let sheet = Sheet::from_rows(
            "Answer key",
            vec![
                row(&["Q1", "", "How satisfied are you?"]),
                row(&["", "1", "Very"]),
                row(&["", "2", "Somewhat"]),
                row(&["Q7_1", "", "Tea"]),
                row(&["Q7_2", "Coffee", ""]),
                row(&["Q8_1", "", "Price"]),
                row(&["", "1", "Poor"]),
                row(&["", "2", "Good"]),
                row(&["Q8_2", "", "Quality"]),
                row(&["", "1", "Poor"]),
                row(&["", "2", "Good"]),
            ],
        );
        let schema = parse_schema(Some(&sheet), Convention::Modern);
        let q1 = schema.get("Q1").unwrap();
        assert_eq!(q1.text.as_deref(), Some("How satisfied are you?"));
        assert_eq!(q1.options.len(), 2);
        let q7 = schema.get("Q7").unwrap();
        assert!(q7.options.is_empty());
        assert_eq!(q7.sub_question_label("1"), Some("Tea"));
        assert_eq!(q7.sub_question_label("2"), Some("Coffee"));
        assert!(q7.is_coded());
        let q8 = schema.get("Q8").unwrap();
        assert_eq!(q8.options.len(), 2);
        assert_eq!(q8.sub_questions.len(), 2);
    }

    #[test]
    fn variable_info_texts() {
        let key = Sheet::from_rows(
            "Answer key",
            vec![
                row(&["Q3", "", "Overall"]),
                row(&["", "1", "Yes"]),
                row(&["Q4_1", "", "A"]),
                row(&["Q4_2", "", "B"]),
            ],
        );
        let meta = Sheet::from_rows(
            "Variable information",
            vec![
                row(&["Variable", "Position", "Label"]),
                row(&["Q3", "3", "Would you recommend us?"]),
                row(&["Q4_1", "4", "How important is each? - Price"]),
                row(&["Q4_2", "5", "How important is each? - Quality"]),
            ],
        );
        let schema = parse_schema_with_metadata(Some(&key), Some(&meta), Convention::Modern);
        assert_eq!(
            schema.get("Q3").unwrap().text.as_deref(),
            Some("Would you recommend us?")
        );
        assert_eq!(
            schema.get("Q4").unwrap().text.as_deref(),
            Some("How important is each?")
        );
        assert_eq!(
            schema.column_text("Q4_2"),
            Some("How important is each? - Quality")
        );
    }

    #[test]
    fn text_prefixes() {
        assert_eq!(
            common_text_prefix(&["Rate: speed", "Rate: price"]),
            "Rate"
        );
        assert_eq!(common_text_prefix(&["Same", "Same"]), "Same");
        assert_eq!(common_text_prefix(&["abc", "xyz"]), "");
        assert_eq!(common_text_prefix(&[]), "");
        assert_eq!(strip_text_prefix("Rate: speed", "Rate"), "speed");
    }

    #[test]
    fn questions_listed_numerically() {
        let mut schema = Schema::new();
        schema.add_option("Q10", Code::Int(1), "a");
        schema.add_option("Q2", Code::Int(1), "a");
        schema.set_text("Q1", "first");
        assert_eq!(schema.question_ids(), vec!["Q10", "Q2", "Q1"]);
        assert_eq!(schema.list_questions(), vec!["Q1", "Q2", "Q10"]);
    }
}
