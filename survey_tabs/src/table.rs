// ********* Cells, sheets and response tables ***********

use log::debug;
use std::fmt::Display;

/// The content of one spreadsheet cell, after loading.
///
/// Blank or whitespace-only text is always represented as `Empty`.
#[derive(PartialEq, Debug, Clone)]
pub enum Value {
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_VALUE: Value = Value::Empty;

impl Value {
    pub fn text(s: &str) -> Value {
        if s.trim().is_empty() {
            Value::Empty
        } else {
            Value::Text(s.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Number(n) => n.is_nan(),
            Value::Text(s) => s.trim().is_empty(),
        }
    }

    /// Numeric reading of the cell. Text that parses as a number counts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// The cell as a trimmed string, None when missing.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Value::Empty => None,
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) => Some(format_number(*n)),
            Value::Text(s) if s.trim().is_empty() => None,
            Value::Text(s) => Some(s.trim().to_string()),
        }
    }

    /// Compares the cell against an answer code, coercing the cell to the code's representation.
    pub fn matches_code(&self, code: &Code) -> bool {
        match code {
            Code::Int(i) => self.as_number() == Some(*i as f64),
            Code::Text(t) => match self {
                Value::Text(s) => s.trim() == t,
                _ => false,
            },
        }
    }

    /// True for a populated membership cell: present and not a numeric zero.
    pub fn is_selected(&self) -> bool {
        match self.as_number() {
            Some(n) => n != 0.0,
            None => !self.is_missing(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(x: Option<T>) -> Value {
        x.map(|v| v.into()).unwrap_or(Value::Empty)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// The raw stored value of an answer option.
///
/// Integral numbers, whether stored as numbers or as text, normalize to `Int`, so that
/// `1`, `1.0` and `"1"` are the same code.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum Code {
    Int(i64),
    Text(String),
}

impl Code {
    pub fn from_value(v: &Value) -> Option<Code> {
        match v {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(Code::Int(*n as i64)),
            Value::Number(n) if n.is_finite() => Some(Code::Text(format_number(*n))),
            Value::Number(_) | Value::Empty => None,
            Value::Text(s) => Code::parse(s),
        }
    }

    pub fn parse(s: &str) -> Option<Code> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        match s.parse::<f64>() {
            Ok(n) if n.is_finite() && n.fract() == 0.0 => Some(Code::Int(n as i64)),
            _ => Some(Code::Text(s.to_string())),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Code::Int(i) => Some(*i),
            Code::Text(_) => None,
        }
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Code::Int(i) => write!(f, "{}", i),
            Code::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A raw grid of cells, as found in a worksheet. Rows may have different lengths.
#[derive(PartialEq, Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Value>>,
}

impl Sheet {
    pub fn from_rows(name: &str, rows: Vec<Vec<Value>>) -> Sheet {
        Sheet {
            name: name.to_string(),
            rows,
        }
    }

    /// The cell at the given position, `Empty` outside of the grid.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_VALUE)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|v| v.is_missing()))
    }
}

/// An immutable bundle of named sheets.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Workbook {
        Workbook { sheets }
    }

    /// Case-insensitive lookup, ignoring surrounding whitespace.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        let needle = name.trim().to_lowercase();
        self.sheets
            .iter()
            .find(|s| s.name.trim().to_lowercase() == needle)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }
}

/// True for strings of the form `Q<integer>`.
pub fn is_question_id(s: &str) -> bool {
    let s = s.trim();
    match s.strip_prefix('Q') {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Numeric part of a question identifier, used to order questions as `Q2 < Q10`.
pub fn question_number(s: &str) -> Option<u64> {
    s.trim().strip_prefix('Q').and_then(|d| d.parse::<u64>().ok())
}

/// The separators found between a base identifier and a suffix in column names.
pub const SEPARATORS: [char; 4] = [':', '|', '_', '.'];

/// A response column name, decomposed into its question identifier and optional suffix.
///
/// `Q3` is bare, `Q7: Coffee`, `Q9 | Brand A` and `Q12_3` are sub-columns.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnName {
    pub base: String,
    pub separator: Option<char>,
    pub suffix: Option<String>,
}

impl ColumnName {
    pub fn parse(name: &str) -> Option<ColumnName> {
        let s = name.trim();
        let digits_end = s
            .strip_prefix('Q')?
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(idx, _)| idx + 1)
            .unwrap_or(s.len());
        if digits_end <= 1 {
            return None;
        }
        let base = s[..digits_end].to_string();
        let rest = s[digits_end..].trim_start();
        let mut chars = rest.chars();
        match chars.next() {
            None => Some(ColumnName {
                base,
                separator: None,
                suffix: None,
            }),
            Some(c) if SEPARATORS.contains(&c) => {
                let suffix = chars.as_str().trim();
                if suffix.is_empty() {
                    Some(ColumnName {
                        base,
                        separator: None,
                        suffix: None,
                    })
                } else {
                    Some(ColumnName {
                        base,
                        separator: Some(c),
                        suffix: Some(suffix.to_string()),
                    })
                }
            }
            Some(_) => None,
        }
    }

    pub fn is_bare(&self) -> bool {
        self.suffix.is_none()
    }

    /// The suffix, when it is a plain non-negative integer.
    pub fn sub_index(&self) -> Option<u32> {
        self.suffix.as_ref().and_then(|s| s.parse::<u32>().ok())
    }
}

/// A response column that belongs to a grouped question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SubColumn {
    pub index: usize,
    pub header: String,
    pub name: ColumnName,
}

impl SubColumn {
    pub fn suffix(&self) -> &str {
        self.name.suffix.as_deref().unwrap_or("")
    }
}

/// All the response columns of one question identifier.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnGroup {
    pub base: String,
    pub bare: Option<usize>,
    pub subs: Vec<SubColumn>,
}

impl ColumnGroup {
    pub fn is_empty(&self) -> bool {
        self.bare.is_none() && self.subs.is_empty()
    }
}

/// Respondent rows by named columns. One row is one respondent.
///
/// Every row has exactly one cell per column. The table is never mutated once built:
/// narrowing produces a new table.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ResponseTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResponseTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> ResponseTable {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Value::Empty);
                r
            })
            .collect();
        ResponseTable { columns, rows }
    }

    /// Reads a table out of a raw sheet.
    ///
    /// `header_row` is the 0-based row holding the column names. `skip_rows` data rows
    /// right after the header are dropped (label rows of modern exports). Rows without
    /// any populated cell are not respondents and are dropped too.
    pub fn from_sheet(sheet: &Sheet, header_row: usize, skip_rows: usize) -> ResponseTable {
        let header: &[Value] = sheet.rows.get(header_row).map(|r| r.as_slice()).unwrap_or(&[]);
        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(idx, v)| {
                v.as_label()
                    .unwrap_or_else(|| format!("Unnamed: {}", idx))
            })
            .collect();
        let rows: Vec<Vec<Value>> = sheet
            .rows
            .iter()
            .skip(header_row + 1 + skip_rows)
            .filter(|r| r.iter().any(|v| !v.is_missing()))
            .cloned()
            .collect();
        debug!(
            "from_sheet: sheet {:?}: {} columns, {} rows",
            sheet.name,
            columns.len(),
            rows.len()
        );
        ResponseTable::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c.trim() == name)
    }

    /// The values of one column, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| r.get(idx).unwrap_or(&EMPTY_VALUE))
    }

    pub fn value(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_VALUE)
    }

    /// Number of populated cells in a column.
    pub fn count_present(&self, idx: usize) -> u64 {
        self.column(idx).filter(|v| !v.is_missing()).count() as u64
    }

    /// Collects the columns of the given question identifier.
    pub fn group(&self, base: &str) -> ColumnGroup {
        let base = base.trim();
        let mut bare: Option<usize> = None;
        let mut subs: Vec<SubColumn> = Vec::new();
        for (index, header) in self.columns.iter().enumerate() {
            match ColumnName::parse(header) {
                Some(name) if name.base == base => {
                    if name.is_bare() {
                        if bare.is_none() {
                            bare = Some(index);
                        }
                    } else {
                        subs.push(SubColumn {
                            index,
                            header: header.clone(),
                            name,
                        });
                    }
                }
                _ => {}
            }
        }
        ColumnGroup {
            base: base.to_string(),
            bare,
            subs,
        }
    }

    /// The question identifiers present in the header, in column order, without duplicates.
    pub fn question_bases(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        for header in self.columns.iter() {
            if let Some(name) = ColumnName::parse(header) {
                if !res.contains(&name.base) {
                    res.push(name.base);
                }
            }
        }
        res
    }

    /// A new table with the rows for which the predicate holds.
    pub fn retain_rows<F>(&self, pred: F) -> ResponseTable
    where
        F: Fn(&[Value]) -> bool,
    {
        ResponseTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }

    /// The same columns, no rows.
    pub fn empty_like(&self) -> ResponseTable {
        ResponseTable {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }
}
