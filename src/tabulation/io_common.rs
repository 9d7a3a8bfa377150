use std::path::Path;

use calamine::DataType;
use log::debug;
use olympiad_ranking::columns::canonicalize;
use olympiad_ranking::{CanonicalField, MissingFieldError, RawTable, RawValue};

/// Rows of cells, as read from a sheet, before the header is located.
pub type Grid = Vec<Vec<RawValue>>;

/// The number of rows at the top of a sheet in which the header is searched.
///
/// Generated sheets have banner rows and a title row above their header.
pub const HEADER_SEARCH_ROWS: usize = 10;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

pub fn raw_value(cell: &DataType) -> RawValue {
    match cell {
        DataType::String(s) if s.trim().is_empty() => RawValue::Blank,
        DataType::String(s) => RawValue::Text(s.clone()),
        DataType::Float(f) => RawValue::Number(*f),
        DataType::Int(i) => RawValue::Number(*i as f64),
        DataType::DateTime(f) => RawValue::Time(*f),
        DataType::Bool(b) => RawValue::Text(b.to_string()),
        DataType::Empty => RawValue::Blank,
        // Cell errors (#N/A, #DIV/0!, ...)
        _ => RawValue::Blank,
    }
}

pub fn is_blank_row(row: &[RawValue]) -> bool {
    row.iter().all(|v| v.is_blank())
}

pub fn is_empty_grid(grid: &Grid) -> bool {
    grid.iter().all(|r| is_blank_row(r))
}

/// Finds the header row and returns the table below it.
///
/// The header is the first row, among the first [HEADER_SEARCH_ROWS], whose labels
/// map to all the `required` fields. Fully blank rows below it are dropped.
pub fn locate_header(
    grid: &Grid,
    required: &[CanonicalField],
) -> Result<RawTable, MissingFieldError> {
    let labels = |row: &Vec<RawValue>| -> Vec<String> { row.iter().map(|v| v.display()).collect() };

    for (idx, row) in grid.iter().take(HEADER_SEARCH_ROWS).enumerate() {
        let headers = labels(row);
        if canonicalize(&headers).require(required).is_ok() {
            debug!("locate_header: header found at row {}: {:?}", idx, headers);
            let rows: Vec<Vec<RawValue>> = grid
                .iter()
                .skip(idx + 1)
                .filter(|r| !is_blank_row(r))
                .cloned()
                .collect();
            return Ok(RawTable { headers, rows });
        }
    }

    let first = grid.first().map(labels).unwrap_or_default();
    Err(canonicalize(&first)
        .require(required)
        .err()
        .unwrap_or(MissingFieldError {
            missing: required.to_vec(),
            received: first,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use olympiad_ranking::columns::RANKED_SHEET_FIELDS;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn cells() {
        assert_eq!(raw_value(&DataType::Int(3)), RawValue::Number(3.0));
        assert_eq!(raw_value(&DataType::String(" ".to_string())), RawValue::Blank);
        assert_eq!(raw_value(&DataType::DateTime(0.25)), RawValue::Time(0.25));
        assert_eq!(raw_value(&DataType::Empty), RawValue::Blank);
    }

    #[test]
    fn header_below_title() {
        let grid: Grid = vec![
            vec![text("CENTRO"), RawValue::Blank],
            vec![
                text("Ano"),
                text("Nome"),
                text("Escola"),
                text("Pontuação"),
                text("Tempo"),
            ],
            vec![
                text("1° ANO"),
                text("ANA"),
                text("CENTRO"),
                RawValue::Number(4.0),
                text("00:01:00"),
            ],
            vec![RawValue::Blank, RawValue::Blank],
        ];
        let t = locate_header(&grid, RANKED_SHEET_FIELDS).unwrap();
        assert_eq!(t.headers[1], "Nome");
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn no_header() {
        let grid: Grid = vec![vec![text("Nome"), text("Tempo")]];
        let err = locate_header(&grid, RANKED_SHEET_FIELDS).unwrap_err();
        assert_eq!(err.missing, vec![CanonicalField::Grade, CanonicalField::Score]);
        assert_eq!(err.received, vec!["Nome", "Tempo"]);

        let err = locate_header(&vec![], RANKED_SHEET_FIELDS).unwrap_err();
        assert_eq!(err.missing.len(), RANKED_SHEET_FIELDS.len());
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/tmp/x/respostas.xlsx"), "respostas.xlsx");
    }
}
