pub use crate::config::*;

use log::debug;

use crate::columns::canonicalize_required;
use crate::ColumnMapping;

/// A builder for adding the rows of an uploaded table.
///
/// The header is checked once when the builder is created; every row is then
/// normalized as it is added.
///
/// ```
/// use olympiad_ranking::builder::Builder;
/// use olympiad_ranking::columns::RANKED_SHEET_FIELDS;
/// use olympiad_ranking::RawValue;
/// # use olympiad_ranking::MissingFieldError;
///
/// let headers: Vec<String> = ["Ano", "Nome", "Escola", "Pontuação", "Tempo"]
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// let mut builder = Builder::new(&headers, RANKED_SHEET_FIELDS)?.stage("2° CLASSIFICATÓRIA");
///
/// builder.add_row(&[
///     RawValue::Text("1º ano".to_string()),
///     RawValue::Text("Clara".to_string()),
///     RawValue::Text("EMEF Centro".to_string()),
///     RawValue::Number(42.0),
///     RawValue::Text("00:09:30".to_string()),
/// ]);
///
/// let ranked = builder.rank();
/// assert_eq!(ranked.records()[0].school, "CENTRO");
/// assert_eq!(ranked.records()[0].score, 42);
///
/// # Ok::<(), MissingFieldError>(())
/// ```
pub struct Builder {
    pub(crate) _mapping: ColumnMapping,
    pub(crate) _stage: Option<String>,
    pub(crate) _default_school: Option<String>,
    pub(crate) _records: Vec<NormalizedRecord>,
}

impl Builder {
    /// Creates a builder for a table with the given header.
    ///
    /// Fails if one of the `required` fields cannot be found in the header.
    pub fn new(headers: &[String], required: &[CanonicalField]) -> Result<Builder, MissingFieldError> {
        let mapping = canonicalize_required(headers, required)?;
        debug!("Builder::new: passthrough columns: {:?}", mapping.passthrough());
        Ok(Builder {
            _mapping: mapping,
            _stage: None,
            _default_school: None,
            _records: Vec::new(),
        })
    }

    /// Assigns this stage to all the rows, instead of reading it from the table.
    pub fn stage(self, label: &str) -> Builder {
        Builder {
            _stage: Some(label.to_string()),
            ..self
        }
    }

    /// The school of the rows when the table does not have a school column.
    ///
    /// This is the case of the per-school sheets, which are named after their school.
    pub fn default_school(self, school: &str) -> Builder {
        Builder {
            _default_school: Some(school.to_string()),
            ..self
        }
    }

    /// Adds a row. Cells are in the order of the header; missing cells are blank.
    pub fn add_row(&mut self, row: &[RawValue]) {
        let record = crate::normalize_record(
            &self._mapping,
            row,
            self._stage.as_deref(),
            self._default_school.as_deref(),
        );
        self._records.push(record);
    }

    pub fn add_rows(&mut self, rows: &[Vec<RawValue>]) {
        for row in rows.iter() {
            self.add_row(row);
        }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self._records
    }

    /// Ranks all the rows added so far.
    pub fn rank(self) -> RankedTable {
        crate::rank_records(self._records)
    }
}
