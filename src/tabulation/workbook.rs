//! Layout of the generated workbooks.
//!
//! A ranked workbook has a general sheet with all the rows, followed by one
//! sheet per school in order of first appearance in the ranked table. Every
//! sheet has a styled header, an autofilter over the data and frozen panes
//! below the header. The per-school sheets carry a merged title row with the
//! name of the school above their header.

use std::collections::HashSet;

use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, Image, ObjectMovement, Workbook, Worksheet,
};

use crate::tabulation::banner::BannerLayout;
use crate::tabulation::*;

pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_MIME_TYPE: &str = "text/csv";

pub const GENERAL_SHEET_NAME: &str = "GERAL";
pub const UNKNOWN_SCHOOL_SHEET_NAME: &str = "ESCOLA_DESCONHECIDA";
pub const MAX_SHEET_NAME_CHARS: usize = 31;
pub const MAX_SUFFIX_ATTEMPTS: u32 = 999;
// Not allowed in sheet names.
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

pub const MAX_COLUMN_WIDTH: usize = 60;
const COLUMN_PADDING: usize = 2;

/// The columns of the ranked sheets.
pub const REPORT_COLUMNS: [&str; 7] = [
    "Ano",
    "Nome",
    "Escola",
    "Pontuação",
    "Tempo",
    "Deficiência/Transtorno",
    "ETAPA",
];

/// A finished output document.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WorkbookArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Makes a candidate acceptable as a sheet name. Uniqueness is not checked here.
pub fn sanitize_sheet_name(candidate: &str) -> String {
    let truncated: String = candidate.trim().chars().take(MAX_SHEET_NAME_CHARS).collect();
    let replaced: String = truncated
        .chars()
        .map(|c| {
            if FORBIDDEN_SHEET_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = replaced.trim_matches(|c: char| c.is_whitespace() || c == '\'');
    if cleaned.is_empty() {
        UNKNOWN_SCHOOL_SHEET_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// The sheet names already used in a workbook.
///
/// Names are compared case-insensitively, as spreadsheet programs do.
#[derive(Debug, Clone)]
pub struct SheetNames {
    used: HashSet<String>,
}

impl Default for SheetNames {
    fn default() -> Self {
        // Reserved by the spreadsheet programs.
        let used: HashSet<String> = ["history".to_string()].into_iter().collect();
        SheetNames { used }
    }
}

impl SheetNames {
    /// Returns a unique sheet name for the candidate, and marks it as used.
    ///
    /// On collision, `_1`, `_2`, ... is appended, shortening the base name to
    /// stay within the length limit.
    pub fn claim(&mut self, candidate: &str) -> TabResult<String> {
        let base = sanitize_sheet_name(candidate);
        if self.used.insert(base.to_lowercase()) {
            return Ok(base);
        }
        for n in 1..=MAX_SUFFIX_ATTEMPTS {
            let suffix = format!("_{}", n);
            let stem: String = base
                .chars()
                .take(MAX_SHEET_NAME_CHARS - suffix.chars().count())
                .collect();
            let name = format!("{}{}", stem, suffix);
            if self.used.insert(name.to_lowercase()) {
                debug!("claim: {:?} -> {:?}", candidate, name);
                return Ok(name);
            }
        }
        SheetNamingSnafu {
            candidate,
            attempts: MAX_SUFFIX_ATTEMPTS,
        }
        .fail()
    }
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0x6AA84F))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

fn title_format() -> Format {
    Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xD9EAD3))
        .set_border(FormatBorder::Thin)
}

/// The cells of a record, in the order of [REPORT_COLUMNS].
pub fn record_cells(r: &NormalizedRecord) -> Vec<RawValue> {
    vec![
        RawValue::Text(r.grade.clone()),
        RawValue::Text(r.name.clone()),
        RawValue::Text(r.school.clone()),
        RawValue::Number(r.score as f64),
        RawValue::Text(r.duration_label.clone()),
        RawValue::Text(r.disability.clone()),
        RawValue::Text(r.stage.clone()),
    ]
}

pub fn report_header() -> Vec<String> {
    REPORT_COLUMNS.iter().map(|s| s.to_string()).collect()
}

pub fn report_rows(table: &RankedTable) -> Vec<Vec<RawValue>> {
    table.records().iter().map(record_cells).collect()
}

/// The width of each column, in characters: the longest of the header and the
/// data, padded, and bounded.
pub fn column_widths(header: &[String], rows: &[Vec<RawValue>]) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .map(|(col, label)| {
            let longest_data = rows
                .iter()
                .filter_map(|r| r.get(col))
                .map(|v| v.display().chars().count())
                .max()
                .unwrap_or(0);
            (label.chars().count().max(longest_data) + COLUMN_PADDING).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// The state of one workbook being built: used sheet names, formats and banner.
pub struct WorkbookContext<'a> {
    workbook: Workbook,
    names: SheetNames,
    header_format: Format,
    title_format: Format,
    banner: Option<&'a BannerLayout>,
}

impl<'a> WorkbookContext<'a> {
    pub fn new(banner: Option<&'a BannerLayout>) -> WorkbookContext<'a> {
        WorkbookContext {
            workbook: Workbook::new(),
            names: SheetNames::default(),
            header_format: header_format(),
            title_format: title_format(),
            banner,
        }
    }

    /// Adds a sheet with a table. Returns the name given to the sheet.
    ///
    /// The layout from the top: the banner rows (if any), the merged title
    /// row (if any), the header, the data.
    pub fn add_sheet(
        &mut self,
        candidate: &str,
        title: Option<&str>,
        header: &[String],
        rows: &[Vec<RawValue>],
    ) -> TabResult<String> {
        let name = self.names.claim(candidate)?;
        let mut ws = Worksheet::new();
        ws.set_name(&name).context(WorkbookSnafu {})?;

        let last_col = (header.len().max(1) - 1) as u16;
        let mut row: u32 = 0;

        if let Some(banner) = self.banner {
            place_banner(&mut ws, banner, last_col)?;
            row = banner.rows;
        }

        if let Some(title) = title {
            if last_col > 0 {
                ws.merge_range(row, 0, row, last_col, title, &self.title_format)
                    .context(WorkbookSnafu {})?;
            } else {
                ws.write_string_with_format(row, 0, title, &self.title_format)
                    .context(WorkbookSnafu {})?;
            }
            row += 1;
        }

        let header_row = row;
        for (col, label) in header.iter().enumerate() {
            ws.write_string_with_format(header_row, col as u16, label, &self.header_format)
                .context(WorkbookSnafu {})?;
        }
        for (idx, cells) in rows.iter().enumerate() {
            let r = header_row + 1 + idx as u32;
            for (col, v) in cells.iter().enumerate() {
                let c = col as u16;
                match v {
                    RawValue::Number(f) => {
                        ws.write_number(r, c, *f).context(WorkbookSnafu {})?;
                    }
                    RawValue::Blank => {}
                    v => {
                        ws.write_string(r, c, v.display()).context(WorkbookSnafu {})?;
                    }
                }
            }
        }

        let last_row = header_row + rows.len() as u32;
        ws.autofilter(header_row, 0, last_row, last_col)
            .context(WorkbookSnafu {})?;
        ws.set_freeze_panes(header_row + 1, 0)
            .context(WorkbookSnafu {})?;

        match self.banner {
            Some(banner) => {
                for col in 0..=last_col {
                    ws.set_column_width_pixels(col, banner.column_width_px)
                        .context(WorkbookSnafu {})?;
                }
            }
            None => {
                for (col, width) in column_widths(header, rows).iter().enumerate() {
                    ws.set_column_width(col as u16, *width as f64)
                        .context(WorkbookSnafu {})?;
                }
            }
        }

        debug!(
            "add_sheet: {:?}: header at row {}, {} rows",
            name,
            header_row,
            rows.len()
        );
        self.workbook.push_worksheet(ws);
        Ok(name)
    }

    /// The general sheet, with all the rows of the table.
    pub fn add_general_sheet(&mut self, table: &RankedTable) -> TabResult<String> {
        self.add_sheet(
            GENERAL_SHEET_NAME,
            None,
            &report_header(),
            &report_rows(table),
        )
    }

    /// A sheet for one school, with the school as title.
    pub fn add_school_sheet(&mut self, school: &str, table: &RankedTable) -> TabResult<String> {
        let title = if school.trim().is_empty() {
            UNKNOWN_SCHOOL_SHEET_NAME
        } else {
            school
        };
        self.add_sheet(school, Some(title), &report_header(), &report_rows(table))
    }

    pub fn finish(mut self, file_name: &str) -> TabResult<WorkbookArtifact> {
        let bytes = self.workbook.save_to_buffer().context(WorkbookSnafu {})?;
        info!("finish: {}: {} bytes", file_name, bytes.len());
        Ok(WorkbookArtifact {
            file_name: file_name.to_string(),
            mime_type: XLSX_MIME_TYPE.to_string(),
            bytes,
        })
    }
}

fn place_banner(ws: &mut Worksheet, banner: &BannerLayout, last_col: u16) -> TabResult<()> {
    for (row, height) in banner.row_heights_px().iter().enumerate() {
        ws.set_row_height_pixels(row as u32, *height)
            .context(WorkbookSnafu {})?;
    }
    let last_row = banner.rows - 1;
    if last_row > 0 || last_col > 0 {
        ws.merge_range(0, 0, last_row, last_col, "", &Format::new())
            .context(WorkbookSnafu {})?;
    }
    let placement = banner.placement(last_col + 1);
    let image = Image::new_from_buffer(&banner.image.bytes)
        .context(WorkbookSnafu {})?
        .set_scale_width(placement.scale)
        .set_scale_height(placement.scale)
        .set_object_movement(ObjectMovement::MoveAndSizeWithCells);
    ws.insert_image_with_offset(0, 0, &image, placement.x_offset, placement.y_offset)
        .context(WorkbookSnafu {})?;
    Ok(())
}

/// A ranked workbook: the general sheet, then one sheet per school.
pub fn ranked_workbook(
    table: &RankedTable,
    file_name: &str,
    banner: Option<&BannerLayout>,
) -> TabResult<WorkbookArtifact> {
    let mut ctx = WorkbookContext::new(banner);
    ctx.add_general_sheet(table)?;
    for (school, part) in group_by_school(table) {
        ctx.add_school_sheet(&school, &part)?;
    }
    ctx.finish(file_name)
}
