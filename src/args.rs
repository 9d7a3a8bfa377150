use clap::Parser;

/// Ranks the answers of an olympiad registration form, and builds the per-school workbooks.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A job file in JSON format with the options of the run. The flags below
    /// override the values of the job file. Relative paths in the job file are resolved against its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (default tabulate) One of tabulate, leaderboard, merge_stages or combine.
    #[clap(short, long, value_parser)]
    pub mode: Option<String>,

    /// (file path) The input table: a survey export (xlsx, xls, ods or csv) in tabulate mode,
    /// a generated workbook in the other modes.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// When using a spreadsheet, the name of the worksheet to read. The first worksheet is used otherwise.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) In merge_stages mode, the workbook of the second qualifier stage.
    #[clap(long, value_parser)]
    pub second_input: Option<String>,

    /// (file path, optional) A PNG or JPEG image placed at the top of every generated sheet.
    #[clap(long, value_parser)]
    pub banner: Option<String>,

    /// (default 120) The height of the banner, in pixels.
    #[clap(long, value_parser)]
    pub banner_height: Option<u32>,

    /// (default 4) The number of rows reserved for the banner.
    #[clap(long, value_parser)]
    pub banner_rows: Option<u32>,

    /// (default "1° CLASSIFICATÓRIA") The stage label written in every ranked row.
    #[clap(long, value_parser)]
    pub stage: Option<String>,

    /// (default "2° CLASSIFICATÓRIA") In merge_stages mode, the label of the second stage.
    #[clap(long, value_parser)]
    pub second_stage: Option<String>,

    /// The number of entries kept per grade. Defaults to 3 in leaderboard mode. In merge_stages
    /// mode, all the entries are kept unless this is given.
    #[clap(long, value_parser)]
    pub top_n: Option<usize>,

    /// (default current directory) Where the generated files are written.
    #[clap(short, long, value_parser)]
    pub out_dir: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the run will be written in JSON format
    /// to the given location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, the summary of the run is checked
    /// against it and the differences are printed.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
