// ********* Input data structures ***********

use std::cmp::Ordering;
use std::error::Error;
use std::fmt::Display;

/// A single cell, as read from a spreadsheet or a CSV file.
///
/// In most cases, it is enough to use the higher-level builder API.
#[derive(PartialEq, Debug, Clone)]
pub enum RawValue {
    Text(String),
    Number(f64),
    /// A cell formatted as a time or a date in the spreadsheet.
    /// The value is a fraction of a day, as stored by the spreadsheet software.
    Time(f64),
    Blank,
}

impl RawValue {
    /// The value as it should be shown in a report.
    pub fn display(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Number(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            RawValue::Number(f) => f.to_string(),
            RawValue::Time(day_fraction) => format_clock(day_fraction * 86400.0),
            RawValue::Blank => "".to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Blank => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Formats a number of seconds as HH:MM:SS (rounded to the second).
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// A table as uploaded: the header labels, and the rows in their original order.
///
/// Rows may be shorter than the header, the missing cells are blank.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

/// The internal schema that all the recognized input columns resolve to.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum CanonicalField {
    Name,
    SchoolSelected,
    SchoolFreeText,
    Grade,
    Score,
    Duration,
    DisabilityCategory,
    /// Only present in generated reports, never required.
    Stage,
}

impl Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CanonicalField::Name => "name",
            CanonicalField::SchoolSelected => "school (selected)",
            CanonicalField::SchoolFreeText => "school (free text)",
            CanonicalField::Grade => "grade",
            CanonicalField::Score => "score",
            CanonicalField::Duration => "duration",
            CanonicalField::DisabilityCategory => "disability/condition",
            CanonicalField::Stage => "stage",
        };
        write!(f, "{}", s)
    }
}

// ******** Normalized data structures *********

/// Sort key derived from the grade label.
///
/// The variants are declared in sort order: every recognized grade comes
/// before the unrecognized ones.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum GradeOrder {
    Ranked(u32),
    Unranked,
}

/// Total duration of an attempt, in seconds.
///
/// Unparsable durations compare after all the parsable ones.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum DurationSeconds {
    Seconds(f64),
    Unparsable,
}

impl DurationSeconds {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            DurationSeconds::Seconds(s) => Some(*s),
            DurationSeconds::Unparsable => None,
        }
    }
}

impl Eq for DurationSeconds {}

impl PartialOrd for DurationSeconds {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DurationSeconds {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DurationSeconds::Seconds(a), DurationSeconds::Seconds(b)) => a.total_cmp(b),
            (DurationSeconds::Seconds(_), DurationSeconds::Unparsable) => Ordering::Less,
            (DurationSeconds::Unparsable, DurationSeconds::Seconds(_)) => Ordering::Greater,
            (DurationSeconds::Unparsable, DurationSeconds::Unparsable) => Ordering::Equal,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct NormalizedRecord {
    pub name: String,
    pub school: String,
    /// The grade label, as entered.
    pub grade: String,
    pub grade_order: GradeOrder,
    pub score: u32,
    /// The duration, as entered.
    pub duration_label: String,
    pub duration: DurationSeconds,
    /// The disability or condition, as entered.
    pub disability: String,
    pub stage: String,
}

/// Records in ranking order.
///
/// It can only be built through the ranking functions, which guarantees the order.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RankedTable {
    pub(crate) records: Vec<NormalizedRecord>,
}

impl RankedTable {
    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.records
    }
}

/// The partition of a ranked table between the general track and the adapted track.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct CategorySplit {
    /// Entries without a declared disability or condition.
    pub general: RankedTable,
    /// Everything else.
    pub adapted: RankedTable,
}

// ******** Errors *********

/// Some required columns could not be found in the header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MissingFieldError {
    pub missing: Vec<CanonicalField>,
    pub received: Vec<String>,
}

impl Error for MissingFieldError {}

impl Display for MissingFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let missing: Vec<String> = self.missing.iter().map(|c| c.to_string()).collect();
        write!(
            f,
            "missing required columns: [{}]; received columns: {:?}",
            missing.join(", "),
            self.received
        )
    }
}
