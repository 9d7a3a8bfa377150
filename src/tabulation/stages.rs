//! Tools working on already generated workbooks: the leaderboard of every
//! school, the merge of two qualifier stages, and the flattening of all the
//! sheets into one table with its count table.

use std::collections::{BTreeMap, HashMap};

use olympiad_ranking::columns::RANKED_SHEET_FIELDS;
use olympiad_ranking::fields::grade_order;

use crate::tabulation::io_common::{is_blank_row, is_empty_grid, locate_header, Grid};
use crate::tabulation::io_csv::write_csv;
use crate::tabulation::workbook::{
    report_header, report_rows, WorkbookArtifact, WorkbookContext, CSV_MIME_TYPE,
    GENERAL_SHEET_NAME,
};
use crate::tabulation::*;

pub const LEADERBOARD_FILE_NAME: &str = "melhores_alunos_classificados.xlsx";
pub const STAGE_MERGE_FILE_NAME: &str = "classificacao_organizada_todas_escolas.xlsx";
pub const COMBINED_XLSX_FILE_NAME: &str = "dados_combinados.xlsx";
pub const COMBINED_CSV_FILE_NAME: &str = "dados_combinados.csv";
pub const COUNT_TABLE_XLSX_FILE_NAME: &str = "tabela_dinamica.xlsx";
pub const COUNT_TABLE_CSV_FILE_NAME: &str = "tabela_dinamica.csv";

pub const COMBINED_SHEET_NAME: &str = "Dados Combinados";
pub const COUNT_TABLE_SHEET_NAME: &str = "Tabela Dinâmica";

/// The columns of the combined table, read by position.
pub const COMBINED_COLUMNS: [&str; 7] = [
    "Ano",
    "Nome",
    "Escola",
    "Pontuação",
    "Tempo",
    "Se for aluno com deficiência/transtorno:",
    "Etapa de Classificação",
];
/// The title row and the header row of a school sheet, skipped when no header
/// can be found on the sheet.
pub const COMBINED_SKIP_ROWS: usize = 2;

const COMBINED_GRADE_COL: usize = 0;
const COMBINED_NAME_COL: usize = 1;
const COMBINED_SCHOOL_COL: usize = 2;

/// Reads a generated sheet back into a ranked table.
///
/// The school defaults to the name of the sheet. The stage is taken from the
/// sheet unless one is given.
pub fn read_ranked_sheet(name: &str, grid: &Grid, stage: Option<&str>) -> TabResult<RankedTable> {
    let table = locate_header(grid, RANKED_SHEET_FIELDS).context(SchemaSnafu { sheet: name })?;
    let mut builder = Builder::new(&table.headers, RANKED_SHEET_FIELDS)
        .context(SchemaSnafu { sheet: name })?
        .default_school(name);
    if let Some(s) = stage {
        builder = builder.stage(s);
    }
    builder.add_rows(&table.rows);
    Ok(builder.rank())
}

#[derive(Debug, Clone)]
pub struct LeaderboardOutcome {
    /// For each sheet, the retained entries.
    pub sheets: Vec<(String, RankedTable)>,
    /// The number of retained entries per grade, over all the sheets.
    pub grade_counts: Vec<(String, usize)>,
    pub artifact: WorkbookArtifact,
}

/// Keeps the best `top_n` entries per grade of every sheet.
pub fn leaderboard(
    sheets: &[(String, Grid)],
    top_n: usize,
    banner: Option<&BannerLayout>,
) -> TabResult<LeaderboardOutcome> {
    let mut ctx = WorkbookContext::new(banner);
    let mut res: Vec<(String, RankedTable)> = Vec::new();
    for (name, grid) in sheets.iter() {
        if is_empty_grid(grid) {
            warn!("leaderboard: skipping empty sheet {:?}", name);
            continue;
        }
        let ranked = read_ranked_sheet(name, grid, None)?;
        let top = top_n_per_grade(&ranked, top_n);
        debug!(
            "leaderboard: {:?}: kept {} of {} entries",
            name,
            top.len(),
            ranked.len()
        );
        let sheet_name = ctx.add_sheet(
            name,
            Some(name.as_str()),
            &report_header(),
            &report_rows(&top),
        )?;
        res.push((sheet_name, top));
    }
    let grade_counts = grade_counts(res.iter().map(|(_, t)| t));
    info!("leaderboard: grade counts: {:?}", grade_counts);
    Ok(LeaderboardOutcome {
        sheets: res,
        grade_counts,
        artifact: ctx.finish(LEADERBOARD_FILE_NAME)?,
    })
}

#[derive(Debug, Clone)]
pub struct StageMergeOutcome {
    pub sheets: Vec<(String, RankedTable)>,
    /// The sheets of the first file that are missing from the second one.
    pub skipped: Vec<String>,
    pub artifact: WorkbookArtifact,
}

/// Merges the sheets of the two qualifier stages, school by school.
///
/// The entries of both stages are tagged with their stage, concatenated (first
/// stage first) and ranked again. If `top_n` is given, only the best entries
/// of each grade are kept.
pub fn merge_stages(
    first: &[(String, Grid)],
    second: &[(String, Grid)],
    stages: (&str, &str),
    top_n: Option<usize>,
    banner: Option<&BannerLayout>,
) -> TabResult<StageMergeOutcome> {
    let second_by_name: HashMap<&str, &Grid> =
        second.iter().map(|(n, g)| (n.as_str(), g)).collect();
    let mut ctx = WorkbookContext::new(banner);
    let mut res: Vec<(String, RankedTable)> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    for (name, grid) in first.iter() {
        let other = match second_by_name.get(name.as_str()) {
            Some(g) => *g,
            None => {
                warn!(
                    "merge_stages: sheet {:?} not found in both files, skipping it",
                    name
                );
                skipped.push(name.clone());
                continue;
            }
        };
        if is_empty_grid(grid) && is_empty_grid(other) {
            warn!("merge_stages: skipping empty sheet {:?}", name);
            continue;
        }
        let mut parts: Vec<RankedTable> = Vec::new();
        for (g, stage) in [(grid, stages.0), (other, stages.1)] {
            if !is_empty_grid(g) {
                parts.push(read_ranked_sheet(name, g, Some(stage))?);
            }
        }
        let merged = merge_ranked(parts);
        let kept = match top_n {
            Some(n) => top_n_per_grade(&merged, n),
            None => merged,
        };
        let sheet_name = ctx.add_sheet(
            name,
            Some(name.as_str()),
            &report_header(),
            &report_rows(&kept),
        )?;
        res.push((sheet_name, kept));
    }
    info!(
        "merge_stages: {} sheets merged, {} skipped",
        res.len(),
        skipped.len()
    );
    Ok(StageMergeOutcome {
        sheets: res,
        skipped,
        artifact: ctx.finish(STAGE_MERGE_FILE_NAME)?,
    })
}

fn upper(v: &RawValue) -> RawValue {
    match v {
        RawValue::Text(s) => RawValue::Text(s.to_uppercase()),
        v => v.clone(),
    }
}

/// The data rows of a sheet: the rows below its header, or below the first
/// [COMBINED_SKIP_ROWS] rows when the header cannot be found.
fn data_rows(name: &str, grid: &Grid) -> Vec<Vec<RawValue>> {
    match locate_header(grid, RANKED_SHEET_FIELDS) {
        Ok(table) => table.rows,
        Err(e) => {
            warn!(
                "combine_sheets: sheet {:?}: {}, skipping its first {} rows",
                name, e, COMBINED_SKIP_ROWS
            );
            grid.iter()
                .skip(COMBINED_SKIP_ROWS)
                .filter(|r| !is_blank_row(r))
                .cloned()
                .collect()
        }
    }
}

/// Concatenates the data rows of the school sheets into the [COMBINED_COLUMNS].
///
/// The general sheet repeats the rows of the school sheets and is left out.
/// Cells are read by position and text is uppercased.
pub fn combine_sheets(sheets: &[(String, Grid)]) -> Vec<Vec<RawValue>> {
    let width = COMBINED_COLUMNS.len();
    let mut res: Vec<Vec<RawValue>> = Vec::new();
    for (name, grid) in sheets.iter() {
        if name.eq_ignore_ascii_case(GENERAL_SHEET_NAME) {
            debug!("combine_sheets: skipping the general sheet {:?}", name);
            continue;
        }
        let rows = data_rows(name, grid);
        for row in rows.iter() {
            if row.len() > width {
                warn!(
                    "combine_sheets: sheet {:?}: dropping {} extra cells",
                    name,
                    row.len() - width
                );
            }
            let cells: Vec<RawValue> = (0..width)
                .map(|col| row.get(col).map(upper).unwrap_or(RawValue::Blank))
                .collect();
            res.push(cells);
        }
        debug!("combine_sheets: {:?}: {} rows", name, rows.len());
    }
    res
}

/// The number of students per school and per grade.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CountTable {
    /// Sorted alphabetically.
    pub schools: Vec<String>,
    /// Sorted by grade.
    pub grades: Vec<String>,
    /// One row per school, one column per grade.
    pub counts: Vec<Vec<usize>>,
}

/// Counts the non-blank names per school and grade of a combined table.
///
/// Rows without a school or a grade are not counted.
pub fn count_table(rows: &[Vec<RawValue>]) -> CountTable {
    let label = |row: &Vec<RawValue>, col: usize| -> String {
        row.get(col).map(|v| v.display()).unwrap_or_default().trim().to_string()
    };
    let mut cells: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut schools: Vec<String> = Vec::new();
    let mut grades: Vec<String> = Vec::new();
    for row in rows.iter() {
        let school = label(row, COMBINED_SCHOOL_COL);
        let grade = label(row, COMBINED_GRADE_COL);
        if school.is_empty() || grade.is_empty() {
            continue;
        }
        if !schools.contains(&school) {
            schools.push(school.clone());
        }
        if !grades.contains(&grade) {
            grades.push(grade.clone());
        }
        let has_name = row
            .get(COMBINED_NAME_COL)
            .map(|v| !v.is_blank())
            .unwrap_or(false);
        let e = cells.entry((school, grade)).or_insert(0);
        if has_name {
            *e += 1;
        }
    }
    schools.sort();
    grades.sort_by(|a, b| grade_order(a).cmp(&grade_order(b)).then_with(|| a.cmp(b)));
    let counts: Vec<Vec<usize>> = schools
        .iter()
        .map(|s| {
            grades
                .iter()
                .map(|g| cells.get(&(s.clone(), g.clone())).cloned().unwrap_or(0))
                .collect()
        })
        .collect();
    CountTable {
        schools,
        grades,
        counts,
    }
}

impl CountTable {
    pub fn header(&self) -> Vec<String> {
        let mut h = vec!["Escola".to_string()];
        h.extend(self.grades.iter().cloned());
        h
    }

    pub fn rows(&self) -> Vec<Vec<RawValue>> {
        self.schools
            .iter()
            .zip(self.counts.iter())
            .map(|(s, counts)| {
                let mut row = vec![RawValue::Text(s.clone())];
                row.extend(counts.iter().map(|c| RawValue::Number(*c as f64)));
                row
            })
            .collect()
    }
}

fn display_rows(rows: &[Vec<RawValue>]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|v| v.display()).collect())
        .collect()
}

fn csv_artifact(
    file_name: &str,
    header: &[String],
    rows: &[Vec<RawValue>],
) -> TabResult<WorkbookArtifact> {
    Ok(WorkbookArtifact {
        file_name: file_name.to_string(),
        mime_type: CSV_MIME_TYPE.to_string(),
        bytes: write_csv(header, &display_rows(rows))?,
    })
}

#[derive(Debug, Clone)]
pub struct CombineOutcome {
    pub rows: Vec<Vec<RawValue>>,
    pub counts: CountTable,
    pub artifacts: Vec<WorkbookArtifact>,
}

/// Combines all the sheets of a workbook, and counts the students per school and grade.
pub fn combine(sheets: &[(String, Grid)]) -> TabResult<CombineOutcome> {
    let rows = combine_sheets(sheets);
    if rows.is_empty() {
        warn!("combine: no rows found in any sheet");
    }
    let header: Vec<String> = COMBINED_COLUMNS.iter().map(|s| s.to_string()).collect();
    let counts = count_table(&rows);

    let mut combined_ctx = WorkbookContext::new(None);
    combined_ctx.add_sheet(COMBINED_SHEET_NAME, None, &header, &rows)?;
    let mut counts_ctx = WorkbookContext::new(None);
    counts_ctx.add_sheet(
        COUNT_TABLE_SHEET_NAME,
        None,
        &counts.header(),
        &counts.rows(),
    )?;

    let artifacts = vec![
        combined_ctx.finish(COMBINED_XLSX_FILE_NAME)?,
        csv_artifact(COMBINED_CSV_FILE_NAME, &header, &rows)?,
        counts_ctx.finish(COUNT_TABLE_XLSX_FILE_NAME)?,
        csv_artifact(COUNT_TABLE_CSV_FILE_NAME, &counts.header(), &counts.rows())?,
    ];
    Ok(CombineOutcome {
        rows,
        counts,
        artifacts,
    })
}
