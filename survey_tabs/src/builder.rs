pub use crate::config::*;
pub use crate::table::*;

/// A builder for response tables.
///
/// Useful when the responses do not come from a spreadsheet, and in tests.
///
/// ```
/// pub use survey_tabs::builder::TableBuilder;
/// pub use survey_tabs::Value;
///
/// let mut builder = TableBuilder::new().columns(&["Q1", "Q2: Tea", "Q2: Coffee"]);
///
/// builder.add_row(&[1.into(), 1.into(), Value::Empty]);
/// builder.add_row_numbers(&[Some(2.0), None, Some(1.0)]);
///
/// let table = builder.build();
/// assert_eq!(table.num_rows(), 2);
/// assert_eq!(table.group("Q2").subs.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    pub(crate) _columns: Vec<String>,
    pub(crate) _rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder::default()
    }

    /// Sets the column names. Rows added before are discarded.
    pub fn columns(self, names: &[&str]) -> TableBuilder {
        TableBuilder {
            _columns: names.iter().map(|s| s.to_string()).collect(),
            _rows: Vec::new(),
        }
    }

    /// Adds one respondent. Missing trailing cells are empty, extra cells are dropped.
    pub fn add_row(&mut self, cells: &[Value]) {
        self._rows.push(cells.to_vec());
    }

    /// Adds one respondent whose answers are all numeric or missing.
    ///
    /// This is the simplest use case for coded survey exports.
    pub fn add_row_numbers(&mut self, cells: &[Option<f64>]) {
        self._rows.push(cells.iter().map(|c| (*c).into()).collect());
    }

    /// Adds a whole column of answers, one per respondent, growing the table as needed.
    ///
    /// The column must have been declared with [TableBuilder::columns].
    pub fn fill_column(&mut self, name: &str, values: &[Option<f64>]) {
        let idx = match self._columns.iter().position(|c| c == name) {
            Some(idx) => idx,
            None => return,
        };
        let width = self._columns.len();
        while self._rows.len() < values.len() {
            self._rows.push(vec![Value::Empty; width]);
        }
        for (row, v) in self._rows.iter_mut().zip(values.iter()) {
            row.resize(width, Value::Empty);
            row[idx] = (*v).into();
        }
    }

    pub fn build(self) -> ResponseTable {
        ResponseTable::new(self._columns, self._rows)
    }
}
