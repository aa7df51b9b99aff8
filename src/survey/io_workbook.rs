use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::survey::io_common::cell_to_value;
use crate::survey::*;

/// Loads every worksheet of an Excel workbook.
pub fn read_workbook(path: &str) -> SurveyResult<Workbook> {
    debug!("read_workbook: path: {:?}", path);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningWorkbookSnafu { path })?;
    let sheets: Vec<Sheet> = workbook
        .worksheets()
        .iter()
        .map(|(name, wrange)| range_to_sheet(name, wrange))
        .collect();
    info!(
        "read_workbook: {:?}: sheets {:?}",
        path,
        sheets.iter().map(|s| s.name.as_str()).collect::<Vec<&str>>()
    );
    Ok(Workbook::new(sheets))
}

/// The cells of a range, placed at their position in the worksheet: a range that does not
/// start at A1 gets leading empty rows and columns.
pub fn range_to_sheet(name: &str, wrange: &Range<DataType>) -> Sheet {
    let (row0, col0) = wrange.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Value>> = vec![Vec::new(); row0 as usize];
    for row in wrange.rows() {
        let mut cells: Vec<Value> = vec![Value::Empty; col0 as usize];
        cells.extend(row.iter().map(cell_to_value));
        rows.push(cells);
    }
    Sheet::from_rows(name, rows)
}

/// Modern exports ship a variable-information sheet, legacy ones do not.
pub fn detect_convention(workbook: &Workbook, variable_info_sheet: &str) -> Convention {
    if workbook.sheet(variable_info_sheet).is_some() {
        Convention::Modern
    } else {
        Convention::Legacy
    }
}

/// The sheet holding the responses: the one named, or else the only sheet that is not a
/// reserved (answer key, metadata) sheet.
pub fn response_sheet<'a>(
    workbook: &'a Workbook,
    name: Option<&str>,
    reserved: &[&str],
) -> SurveyResult<&'a Sheet> {
    if let Some(name) = name {
        return workbook.sheet(name).context(MissingSheetSnafu {
            name,
            available: workbook.sheet_names().join(", "),
        });
    }
    let reserved: Vec<String> = reserved.iter().map(|s| s.trim().to_lowercase()).collect();
    let candidates: Vec<&Sheet> = workbook
        .sheets
        .iter()
        .filter(|s| !reserved.contains(&s.name.trim().to_lowercase()))
        .collect();
    match candidates.as_slice() {
        [sheet] => Ok(*sheet),
        [] => MissingSheetSnafu {
            name: "(responses)",
            available: workbook.sheet_names().join(", "),
        }
        .fail(),
        _ => AmbiguousSheetSnafu {
            candidates: candidates
                .iter()
                .map(|s| s.name.clone())
                .collect::<Vec<String>>()
                .join(", "),
        }
        .fail(),
    }
}
