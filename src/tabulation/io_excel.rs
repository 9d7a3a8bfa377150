// Primitives for reading spreadsheet files (xlsx, xls, ods).

use std::io::Cursor;

use calamine::{open_workbook_auto, DataType, Range, Reader, Xlsx};

use crate::tabulation::io_common::{raw_value, Grid};
use crate::tabulation::*;

/// The cells of a range. Rows and columns before the start of the range are
/// not materialized.
pub fn range_to_grid(range: &Range<DataType>) -> Grid {
    range
        .rows()
        .map(|row| row.iter().map(raw_value).collect())
        .collect()
}

/// Reads a single sheet: the named one, or the first one.
pub fn read_sheet(path: &str, worksheet_name: Option<&str>) -> TabResult<(String, Grid)> {
    debug!(
        "read_sheet: path: {:?} worksheet: {:?}",
        &path, &worksheet_name
    );
    let mut workbook = open_workbook_auto(path).context(OpeningSpreadsheetSnafu { path })?;

    if let Some(name) = worksheet_name {
        let wrange = workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningSpreadsheetSnafu { path })?;
        return Ok((name.to_string(), range_to_grid(&wrange)));
    }

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .cloned()
        .context(EmptySpreadsheetSnafu { path })?;
    if sheet_names.len() > 1 {
        warn!(
            "read_sheet: {} worksheets in {:?}, reading the first one ({:?})",
            sheet_names.len(),
            path,
            first
        );
    }
    let wrange = workbook
        .worksheet_range(&first)
        .context(MissingWorksheetSnafu {
            name: first.as_str(),
            path,
        })?
        .context(OpeningSpreadsheetSnafu { path })?;
    Ok((first, range_to_grid(&wrange)))
}

/// Reads all the sheets, in workbook order.
pub fn read_workbook(path: &str) -> TabResult<Vec<(String, Grid)>> {
    let mut workbook = open_workbook_auto(path).context(OpeningSpreadsheetSnafu { path })?;
    let sheets: Vec<(String, Grid)> = workbook
        .worksheets()
        .iter()
        .map(|(name, wrange)| (name.clone(), range_to_grid(wrange)))
        .collect();
    ensure!(!sheets.is_empty(), EmptySpreadsheetSnafu { path });
    info!("read_workbook: {:?}: {} worksheets", path, sheets.len());
    Ok(sheets)
}

/// Reads all the sheets of an xlsx document held in memory.
pub fn read_workbook_bytes(bytes: &[u8]) -> TabResult<Vec<(String, Grid)>> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).context(ReadingWorkbookSnafu {})?;
    let sheets: Vec<(String, Grid)> = workbook
        .worksheets()
        .iter()
        .map(|(name, wrange)| (name.clone(), range_to_grid(wrange)))
        .collect();
    Ok(sheets)
}
