// Primitives for reading and writing CSV files.

use std::io::Read;

use crate::tabulation::io_common::Grid;
use crate::tabulation::*;

fn cell(s: &str) -> RawValue {
    if s.trim().is_empty() {
        RawValue::Blank
    } else {
        RawValue::Text(s.to_string())
    }
}

// The header is read as a plain line: it is located later, like in spreadsheets.
fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// Reads all the lines of a CSV file, header included. Every cell is text.
pub fn read_csv_grid(path: &str) -> TabResult<Grid> {
    let rdr = reader_builder()
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_records(rdr)
}

fn read_records<R: Read>(rdr: csv::Reader<R>) -> TabResult<Grid> {
    let mut res: Grid = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        // The index starts at 1 to respect most conventions in the excel world
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let row: Vec<RawValue> = line.iter().map(cell).collect();
        debug!("read_records: lineno: {:?} row: {:?}", lineno, &row);
        res.push(row);
    }
    Ok(res)
}

/// Serializes a table to CSV (UTF-8, comma separated, header first).
pub fn write_csv(header: &[String], rows: &[Vec<String>]) -> TabResult<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);
    wtr.write_record(header).context(CsvWriteSnafu {})?;
    for row in rows.iter() {
        wtr.write_record(row).context(CsvWriteSnafu {})?;
    }
    wtr.into_inner()
        .map_err(|e| e.into_error())
        .context(CsvFlushSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_lines() {
        let data = "Nome,Pontuação,Tempo\nana,45,00:15:00\nbia,,\n";
        let grid = read_records(reader_builder().from_reader(data.as_bytes())).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0][1], RawValue::Text("Pontuação".to_string()));
        assert_eq!(grid[1][2], RawValue::Text("00:15:00".to_string()));
        assert_eq!(grid[2][1], RawValue::Blank);
    }

    #[test]
    fn write_lines() {
        let header = vec!["Escola".to_string(), "1° ANO".to_string()];
        let rows = vec![vec!["CENTRO, NORTE".to_string(), "2".to_string()]];
        let bytes = write_csv(&header, &rows).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Escola,1° ANO\n\"CENTRO, NORTE\",2\n"
        );
    }
}
