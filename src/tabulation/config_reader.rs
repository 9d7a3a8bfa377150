use crate::tabulation::*;

use serde::{Deserialize, Serialize};

/// A table to read.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct InputSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BannerSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "heightPx")]
    pub height_px: Option<u32>,
    pub rows: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "summaryPath")]
    pub summary_path: Option<String>,
}

/// A job file: the options of one invocation, in JSON.
///
/// The command line flags take precedence over the values of this file.
/// Relative paths are resolved against the directory of the file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabulationConfig {
    pub mode: Option<String>,
    pub input: Option<InputSource>,
    #[serde(rename = "secondInput")]
    pub second_input: Option<InputSource>,
    pub stage: Option<String>,
    #[serde(rename = "secondStage")]
    pub second_stage: Option<String>,
    pub banner: Option<BannerSource>,
    #[serde(rename = "topN")]
    pub top_n: Option<usize>,
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
}

fn resolve(root: &Path, p: &str) -> String {
    let path = Path::new(p);
    if path.is_absolute() {
        p.to_string()
    } else {
        root.join(path).display().to_string()
    }
}

impl TabulationConfig {
    pub fn resolve_paths(self, root: &Path) -> TabulationConfig {
        let resolve_input = |i: InputSource| InputSource {
            file_path: resolve(root, &i.file_path),
            ..i
        };
        TabulationConfig {
            input: self.input.map(resolve_input),
            second_input: self.second_input.map(resolve_input),
            banner: self.banner.map(|b| BannerSource {
                file_path: resolve(root, &b.file_path),
                ..b
            }),
            output_settings: self.output_settings.map(|o| OutputSettings {
                output_directory: o.output_directory.map(|d| resolve(root, &d)),
                summary_path: o.summary_path.map(|d| resolve(root, &d)),
            }),
            ..self
        }
    }
}

pub fn parse_config(contents: &str) -> TabResult<TabulationConfig> {
    serde_json::from_str(contents).context(ParsingJsonSnafu {})
}

pub fn read_config(path: &str) -> TabResult<TabulationConfig> {
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    let config = parse_config(&contents)?;
    let root = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
    let config = config.resolve_paths(root);
    info!("config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> TabResult<JSValue> {
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_summary: {:?}", js);
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_file() {
        let config = parse_config(
            r#"{
                "mode": "merge_stages",
                "input": {"filePath": "etapa1.xlsx"},
                "secondInput": {"filePath": "/data/etapa2.xlsx", "excelWorksheetName": "CENTRO"},
                "banner": {"filePath": "logo.png", "rows": 3},
                "topN": 10,
                "outputSettings": {"outputDirectory": "saida"}
            }"#,
        )
        .unwrap()
        .resolve_paths(Path::new("/jobs"));
        assert_eq!(config.mode.as_deref(), Some("merge_stages"));
        assert_eq!(config.input.unwrap().file_path, "/jobs/etapa1.xlsx");
        let second = config.second_input.unwrap();
        assert_eq!(second.file_path, "/data/etapa2.xlsx");
        assert_eq!(second.excel_worksheet_name.as_deref(), Some("CENTRO"));
        let banner = config.banner.unwrap();
        assert_eq!(banner.file_path, "/jobs/logo.png");
        assert_eq!(banner.height_px, None);
        assert_eq!(banner.rows, Some(3));
        assert_eq!(config.top_n, Some(10));
        assert_eq!(
            config.output_settings.unwrap().output_directory.as_deref(),
            Some("/jobs/saida")
        );
        assert_eq!(config.stage, None);
    }

    #[test]
    fn empty_job_file() {
        assert_eq!(parse_config("{}").unwrap(), TabulationConfig::default());
        assert!(parse_config("{\"topN\": \"three\"}").is_err());
    }
}
