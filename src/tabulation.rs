use log::{debug, info, warn};

use olympiad_ranking::builder::Builder;
use olympiad_ranking::columns::SURVEY_FIELDS;
use olympiad_ranking::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tabulation::banner::{BannerLayout, BannerOptions};
use crate::tabulation::config_reader::*;
use crate::tabulation::io_common::{locate_header, simplify_file_name, Grid};
use crate::tabulation::workbook::{ranked_workbook, WorkbookArtifact, REPORT_COLUMNS};

pub mod banner;
pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod stages;
pub mod workbook;

#[derive(Debug, Snafu)]
pub enum TabulationError {
    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningSpreadsheet {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("Error reading an in-memory workbook"))]
    ReadingWorkbook { source: calamine::XlsxError },
    #[snafu(display("Worksheet {name:?} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("No worksheet found in {path}"))]
    EmptySpreadsheet { path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of a CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing CSV data"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error flushing CSV data"))]
    CsvFlush { source: std::io::Error },
    #[snafu(display("Worksheet {sheet:?}: {source}"))]
    Schema {
        source: MissingFieldError,
        sheet: String,
    },
    #[snafu(display("No free sheet name for {candidate:?} after {attempts} attempts"))]
    SheetNaming { candidate: String, attempts: u32 },
    #[snafu(display("Error building the workbook"))]
    Workbook { source: rust_xlsxwriter::XlsxError },
    #[snafu(display("Error decoding the banner image"))]
    Banner { source: image::ImageError },
    #[snafu(display("Unsupported banner format {format} (PNG or JPEG expected)"))]
    UnsupportedBanner { format: String },
    #[snafu(display("Error reading file {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabulationError>;

pub const DEFAULT_STAGE: &str = "1° CLASSIFICATÓRIA";
pub const DEFAULT_SECOND_STAGE: &str = "2° CLASSIFICATÓRIA";
pub const DEFAULT_TOP_N: usize = 3;

pub const OLYMPIC_FILE_NAME: &str = "classificatoria_olimpiada.xlsx";
pub const PARALYMPIC_FILE_NAME: &str = "classificatoria_paralimpiada.xlsx";
pub const JOINT_FILE_NAME: &str = "classificatoria_juncao.xlsx";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Mode {
    /// Survey export -> the three ranked workbooks.
    Tabulate,
    /// Ranked workbook -> the best entries per grade of every sheet.
    Leaderboard,
    /// Two ranked workbooks (first and second qualifier) -> one merged workbook.
    MergeStages,
    /// Ranked workbook -> one flat table and the school x grade count table.
    Combine,
}

impl Mode {
    pub fn parse(s: &str) -> TabResult<Mode> {
        match s {
            "tabulate" => Ok(Mode::Tabulate),
            "leaderboard" => Ok(Mode::Leaderboard),
            "merge_stages" => Ok(Mode::MergeStages),
            "combine" => Ok(Mode::Combine),
            x => whatever!(
                "unknown mode {:?}: expected one of tabulate, leaderboard, merge_stages, combine",
                x
            ),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Tabulate => "tabulate",
            Mode::Leaderboard => "leaderboard",
            Mode::MergeStages => "merge_stages",
            Mode::Combine => "combine",
        }
    }
}

/// Where a table is read from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct InputFile {
    pub path: String,
    pub worksheet_name: Option<String>,
}

/// All the options of one invocation, after merging the job file and the flags.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    pub input: InputFile,
    pub second_input: Option<InputFile>,
    pub stage: String,
    pub second_stage: String,
    pub banner: Option<(String, BannerOptions)>,
    pub top_n: Option<usize>,
    pub out_dir: String,
    pub summary: Option<String>,
    pub reference: Option<String>,
}

pub fn options_from_args(args: &Args) -> TabResult<RunOptions> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => TabulationConfig::default(),
    };
    debug!("options_from_args: config: {:?}", config);

    let mode_s = args
        .mode
        .clone()
        .or_else(|| config.mode.clone())
        .unwrap_or_else(|| "tabulate".to_string());
    let mode = Mode::parse(&mode_s)?;

    let input_path = match args.input.clone().or_else(|| {
        config.input.as_ref().map(|i| i.file_path.clone())
    }) {
        Some(p) => p,
        None => whatever!("no input file: use --input or provide one in the configuration"),
    };
    let input = InputFile {
        path: input_path,
        worksheet_name: args.excel_worksheet_name.clone().or_else(|| {
            config
                .input
                .as_ref()
                .and_then(|i| i.excel_worksheet_name.clone())
        }),
    };
    let second_input = args
        .second_input
        .clone()
        .map(|path| InputFile {
            path,
            worksheet_name: None,
        })
        .or_else(|| {
            config.second_input.as_ref().map(|i| InputFile {
                path: i.file_path.clone(),
                worksheet_name: i.excel_worksheet_name.clone(),
            })
        });

    let banner_path = args
        .banner
        .clone()
        .or_else(|| config.banner.as_ref().map(|b| b.file_path.clone()));
    let banner = banner_path.map(|p| {
        let defaults = BannerOptions::default();
        let from_config = config.banner.clone();
        let opts = BannerOptions {
            height_px: args
                .banner_height
                .or_else(|| from_config.as_ref().and_then(|b| b.height_px))
                .unwrap_or(defaults.height_px),
            rows: args
                .banner_rows
                .or_else(|| from_config.as_ref().and_then(|b| b.rows))
                .unwrap_or(defaults.rows),
        };
        (p, opts)
    });

    let output_settings = config.output_settings.clone().unwrap_or_default();

    Ok(RunOptions {
        mode,
        input,
        second_input,
        stage: args
            .stage
            .clone()
            .or_else(|| config.stage.clone())
            .unwrap_or_else(|| DEFAULT_STAGE.to_string()),
        second_stage: args
            .second_stage
            .clone()
            .or_else(|| config.second_stage.clone())
            .unwrap_or_else(|| DEFAULT_SECOND_STAGE.to_string()),
        banner,
        top_n: args.top_n.or(config.top_n),
        out_dir: args
            .out_dir
            .clone()
            .or(output_settings.output_directory)
            .unwrap_or_else(|| ".".to_string()),
        summary: args.summary.clone().or(output_settings.summary_path),
        reference: args.reference.clone(),
    })
}

/// Reads one table (the first sheet, or the named one) from a spreadsheet or a CSV file.
pub fn read_input(input: &InputFile) -> TabResult<(String, Grid)> {
    let p = Path::new(&input.path);
    let extension = p
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    info!("Attempting to read input file {:?}", input.path);
    match extension.as_str() {
        "csv" => {
            let grid = io_csv::read_csv_grid(&input.path)?;
            Ok((simplify_file_name(&input.path), grid))
        }
        _ => io_excel::read_sheet(&input.path, input.worksheet_name.as_deref()),
    }
}

/// The tables produced from a survey export.
#[derive(Debug, Clone)]
pub struct TabulationOutcome {
    pub ranked: RankedTable,
    pub split: CategorySplit,
    pub artifacts: Vec<WorkbookArtifact>,
}

/// The main pipeline: survey table -> ranked, categorized workbooks.
///
/// All three workbooks are built in memory; nothing is returned if any of them fails.
pub fn tabulate(
    sheet_name: &str,
    grid: &Grid,
    stage: &str,
    banner: Option<&BannerLayout>,
) -> TabResult<TabulationOutcome> {
    let table = locate_header(grid, SURVEY_FIELDS).context(SchemaSnafu { sheet: sheet_name })?;
    let mut builder = Builder::new(&table.headers, SURVEY_FIELDS)
        .context(SchemaSnafu { sheet: sheet_name })?
        .stage(stage);
    builder.add_rows(&table.rows);
    let ranked = builder.rank();
    let split = categorize(&ranked);
    info!(
        "tabulate: {} entries, {} in the general track, {} in the adapted track",
        ranked.len(),
        split.general.len(),
        split.adapted.len()
    );

    let artifacts = vec![
        ranked_workbook(&split.general, OLYMPIC_FILE_NAME, banner)?,
        ranked_workbook(&split.adapted, PARALYMPIC_FILE_NAME, banner)?,
        ranked_workbook(&ranked, JOINT_FILE_NAME, banner)?,
    ];
    Ok(TabulationOutcome {
        ranked,
        split,
        artifacts,
    })
}

pub fn record_to_json(r: &NormalizedRecord) -> JSValue {
    let values: [JSValue; 7] = [
        json!(r.grade),
        json!(r.name),
        json!(r.school),
        json!(r.score),
        json!(r.duration_label),
        json!(r.disability),
        json!(r.stage),
    ];
    let mut row: JSMap<String, JSValue> = JSMap::new();
    for (label, value) in REPORT_COLUMNS.iter().zip(values) {
        row.insert(label.to_string(), value);
    }
    JSValue::Object(row)
}

pub fn table_to_json(t: &RankedTable) -> JSValue {
    let rows: Vec<JSValue> = t.records().iter().map(record_to_json).collect();
    json!({"count": t.len(), "rows": rows})
}

fn grade_counts_to_json(counts: &[(String, usize)]) -> Vec<JSValue> {
    counts
        .iter()
        .map(|(grade, count)| json!({"grade": grade, "count": count}))
        .collect()
}

fn artifact_names(artifacts: &[WorkbookArtifact]) -> Vec<JSValue> {
    artifacts
        .iter()
        .map(|a| json!({"fileName": a.file_name, "mimeType": a.mime_type}))
        .collect()
}

fn load_banner_layout(options: &RunOptions) -> TabResult<Option<BannerLayout>> {
    match &options.banner {
        None => Ok(None),
        Some((path, opts)) => {
            let bytes = fs::read(path).context(ReadingFileSnafu { path })?;
            let image = banner::load_banner(bytes)?;
            Ok(Some(BannerLayout::new(image, opts)?))
        }
    }
}

fn second_input(options: &RunOptions) -> TabResult<&InputFile> {
    match &options.second_input {
        Some(x) => Ok(x),
        None => whatever!("mode {} requires a second input file", options.mode.name()),
    }
}

/// Builds all the outputs of the requested mode, and the summary of the run.
pub fn build_outputs(options: &RunOptions) -> TabResult<(JSValue, Vec<WorkbookArtifact>)> {
    let banner = load_banner_layout(options)?;
    let input_name = simplify_file_name(&options.input.path);

    match options.mode {
        Mode::Tabulate => {
            let (sheet_name, grid) = read_input(&options.input)?;
            let outcome = tabulate(&sheet_name, &grid, &options.stage, banner.as_ref())?;
            let js = json!({
                "mode": options.mode.name(),
                "input": input_name,
                "stage": options.stage,
                "results": {
                    "general": table_to_json(&outcome.split.general),
                    "adapted": table_to_json(&outcome.split.adapted),
                    "all": {"count": outcome.ranked.len()},
                },
                "outputs": artifact_names(&outcome.artifacts),
            });
            Ok((js, outcome.artifacts))
        }
        Mode::Leaderboard => {
            let sheets = io_excel::read_workbook(&options.input.path)?;
            let top_n = options.top_n.unwrap_or(DEFAULT_TOP_N);
            let outcome = stages::leaderboard(&sheets, top_n, banner.as_ref())?;
            let per_sheet: Vec<JSValue> = outcome
                .sheets
                .iter()
                .map(|(name, t)| json!({"sheet": name, "count": t.len()}))
                .collect();
            let artifacts = vec![outcome.artifact];
            let js = json!({
                "mode": options.mode.name(),
                "input": input_name,
                "topN": top_n,
                "sheets": per_sheet,
                "gradeCounts": grade_counts_to_json(&outcome.grade_counts),
                "outputs": artifact_names(&artifacts),
            });
            Ok((js, artifacts))
        }
        Mode::MergeStages => {
            let second = second_input(options)?;
            let first_sheets = io_excel::read_workbook(&options.input.path)?;
            let second_sheets = io_excel::read_workbook(&second.path)?;
            let outcome = stages::merge_stages(
                &first_sheets,
                &second_sheets,
                (&options.stage, &options.second_stage),
                options.top_n,
                banner.as_ref(),
            )?;
            let per_sheet: Vec<JSValue> = outcome
                .sheets
                .iter()
                .map(|(name, t)| json!({"sheet": name, "count": t.len()}))
                .collect();
            let artifacts = vec![outcome.artifact];
            let js = json!({
                "mode": options.mode.name(),
                "input": input_name,
                "secondInput": simplify_file_name(&second.path),
                "stages": [options.stage, options.second_stage],
                "topN": options.top_n,
                "sheets": per_sheet,
                "skipped": outcome.skipped,
                "outputs": artifact_names(&artifacts),
            });
            Ok((js, artifacts))
        }
        Mode::Combine => {
            let sheets = io_excel::read_workbook(&options.input.path)?;
            let outcome = stages::combine(&sheets)?;
            let js = json!({
                "mode": options.mode.name(),
                "input": input_name,
                "rows": outcome.rows.len(),
                "counts": {
                    "schools": outcome.counts.schools,
                    "grades": outcome.counts.grades,
                    "values": outcome.counts.counts,
                },
                "outputs": artifact_names(&outcome.artifacts),
            });
            Ok((js, outcome.artifacts))
        }
    }
}

fn write_artifacts(out_dir: &str, artifacts: &[WorkbookArtifact]) -> TabResult<()> {
    fs::create_dir_all(out_dir).context(WritingOutputSnafu { path: out_dir })?;
    for a in artifacts.iter() {
        let p: PathBuf = [out_dir, a.file_name.as_str()].iter().collect();
        let path = p.as_path().display().to_string();
        info!("Writing {} ({} bytes)", path, a.bytes.len());
        fs::write(&p, &a.bytes).context(WritingOutputSnafu { path })?;
    }
    Ok(())
}

/// Compares the summary with a reference summary, and prints the differences.
pub fn check_reference(summary: &JSValue, reference_path: &str) -> TabResult<()> {
    let pretty_js_summary = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_summary {
        warn!("Found differences with the reference summary");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_summary.as_ref(),
            "\n",
        );
        whatever!("Difference detected between the summary and the reference summary")
    }
    Ok(())
}

pub fn run(options: &RunOptions) -> TabResult<()> {
    info!("run: mode: {:?} input: {:?}", options.mode, options.input);
    let (summary, artifacts) = build_outputs(options)?;

    // Everything was built in memory, only now is anything written.
    write_artifacts(&options.out_dir, &artifacts)?;

    let pretty_js_summary = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    match options.summary.as_deref() {
        Some("stdout") => {
            println!("{}", pretty_js_summary);
        }
        Some(path) => {
            fs::write(path, &pretty_js_summary).context(WritingOutputSnafu { path })?;
        }
        None => {
            debug!("run: summary: {}", pretty_js_summary);
        }
    }

    if let Some(reference_path) = &options.reference {
        check_reference(&summary, reference_path)?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn modes() {
        assert_eq!(Mode::parse("tabulate").unwrap(), Mode::Tabulate);
        assert_eq!(Mode::parse("merge_stages").unwrap(), Mode::MergeStages);
        assert!(Mode::parse("tally").is_err());
    }

    #[test]
    fn tabulate_survey() {
        let outcome = tabulate("Respostas", &survey_grid(), DEFAULT_STAGE, None).unwrap();
        let names: Vec<&str> = outcome
            .ranked
            .records()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["BRUNO REIS", "ANA LIMA", "CARLA DIAS", "DAVI MELO"]
        );
        assert_eq!(outcome.split.general.len(), 2);
        assert_eq!(outcome.split.adapted.len(), 2);
        assert_eq!(outcome.ranked.records()[2].school, "ESCOLA NOVA");
        let files: Vec<&str> = outcome
            .artifacts
            .iter()
            .map(|a| a.file_name.as_str())
            .collect();
        assert_eq!(
            files,
            vec![OLYMPIC_FILE_NAME, PARALYMPIC_FILE_NAME, JOINT_FILE_NAME]
        );
        assert!(outcome.artifacts.iter().all(|a| !a.bytes.is_empty()));
    }

    #[test]
    fn tabulate_missing_columns() {
        let grid = vec![vec![text("Nome"), text("Escola")], vec![text("x"), text("y")]];
        let res = tabulate("Respostas", &grid, DEFAULT_STAGE, None);
        match res {
            Err(TabulationError::Schema { source, sheet }) => {
                assert_eq!(sheet, "Respostas");
                assert!(source.missing.contains(&CanonicalField::Grade));
            }
            x => panic!("unexpected result, ok: {:?}", x.is_ok()),
        }
    }

    #[test]
    fn summary_rows() {
        let outcome = tabulate("Respostas", &survey_grid(), "2° CLASSIFICATÓRIA", None).unwrap();
        let js = table_to_json(&outcome.split.general);
        assert_eq!(js["count"], json!(2));
        assert_eq!(js["rows"][0]["Nome"], json!("ANA LIMA"));
        assert_eq!(js["rows"][0]["Pontuação"], json!(45));
        assert_eq!(js["rows"][1]["ETAPA"], json!("2° CLASSIFICATÓRIA"));
    }
}
