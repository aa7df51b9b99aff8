use std::path::Path;

use calamine::DataType;
use survey_tabs::Value;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Converts a spreadsheet cell. Errors and booleans carry no answer code.
pub fn cell_to_value(cell: &DataType) -> Value {
    match cell {
        DataType::String(s) => Value::text(s),
        DataType::Float(f) => Value::Number(*f),
        DataType::Int(i) => Value::Number(*i as f64),
        DataType::DateTime(f) => Value::Number(*f),
        DataType::Empty => Value::Empty,
        _ => Value::Empty,
    }
}
