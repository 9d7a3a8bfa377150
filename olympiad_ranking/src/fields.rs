//! Per-field cleanup functions.
//!
//! All the functions are pure and never fail: values that cannot be understood
//! degrade to a default (an empty name, a score of zero, an unparsable duration,
//! an unranked grade).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::*;

// The institution type abbreviation, with or without periods: "EMEF", "E.M.E.F.", "e. m. e. f."
static INSTITUTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bE\s*\.?\s*M\s*\.?\s*E\s*\.?\s*F\s*\.?\s*\b").expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static STANDARD_GRADE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*[ºª°o]?\s*ano").expect("valid regex"));

// Adult education track
static EJAI_GRADE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*ejai\s*(\d+)\s*[ºª°o]?\s*etapa").expect("valid regex"));

/// The EJAI stages are placed after all the standard grades.
pub const EJAI_GRADE_OFFSET: u32 = 100;

// Answers meaning "no disability or condition", already folded.
static NO_DISABILITY: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "nao possui deficiencia/transtorno",
        "nao possui deficiencia / transtorno",
        "nao possui deficiencia ou transtorno",
        "nao possui deficiencia",
        "nao possui transtorno",
        "nao possui",
        "nao se aplica",
        "sem deficiencia",
        "sem deficiencia/transtorno",
        "nenhuma",
        "nenhum",
        "nao",
    ]
    .into_iter()
    .collect()
});

// Choices meaning "my school is not in the list", already folded.
static SCHOOL_NOT_LISTED: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "escola nao esta na lista",
        "a escola nao esta na lista",
        "minha escola nao esta na lista",
        "escola nao listada",
        "nao esta na lista",
        "nao listada",
        "outra escola",
    ]
    .into_iter()
    .collect()
});

/// Removes the accents, lowercases, trims and collapses the whitespace.
///
/// This is the form used for all the comparisons with fixed vocabularies.
pub fn fold_text(s: &str) -> String {
    let stripped: String = s
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    WHITESPACE.replace_all(stripped.trim(), " ").to_string()
}

/// The text content of a cell, with numbers rendered as text.
fn cell_text(value: &RawValue) -> String {
    match value {
        RawValue::Text(s) => s.clone(),
        RawValue::Blank => "".to_string(),
        v => v.display(),
    }
}

pub fn normalize_name(value: &RawValue) -> String {
    match value {
        RawValue::Text(s) => s.to_uppercase(),
        _ => "".to_string(),
    }
}

/// Canonical form of an institution name: "E.M.E.F. João  XXIII" -> "JOÃO XXIII".
pub fn normalize_school(name: &str) -> String {
    let without_prefix = INSTITUTION_PREFIX.replace_all(name, "");
    let collapsed = WHITESPACE.replace_all(&without_prefix, " ");
    collapsed.trim().to_uppercase()
}

/// Picks the free-text school when the selected one is the "not listed" choice.
pub fn resolve_school(selected: &RawValue, free_text: &RawValue) -> String {
    let selected_s = cell_text(selected);
    if is_school_not_listed(&selected_s) {
        cell_text(free_text)
    } else {
        selected_s
    }
}

pub fn is_school_not_listed(selected: &str) -> bool {
    SCHOOL_NOT_LISTED.contains(fold_text(selected).as_str())
}

/// True if the answer declares no disability or condition.
///
/// Answers outside the known vocabulary (including blank answers) are
/// considered as declaring a condition.
pub fn is_no_disability(answer: &str) -> bool {
    NO_DISABILITY.contains(fold_text(answer).as_str())
}

/// Parses a score. Text is stripped of everything that is not a digit.
///
/// Anything that cannot be parsed is worth zero.
pub fn parse_score(value: &RawValue) -> u32 {
    match value {
        RawValue::Text(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().unwrap_or(0)
        }
        RawValue::Number(f) if f.is_finite() && *f > 0.0 => {
            if *f >= u32::MAX as f64 {
                0
            } else {
                f.trunc() as u32
            }
        }
        _ => 0,
    }
}

/// Parses a duration into a number of seconds.
///
/// Accepted: "H:M:S", "M:S", a plain number of seconds (text or number), or
/// a time cell from a spreadsheet.
pub fn parse_duration(value: &RawValue) -> DurationSeconds {
    match value {
        RawValue::Number(f) if f.is_finite() && *f >= 0.0 => DurationSeconds::Seconds(*f),
        RawValue::Time(day_fraction) if day_fraction.is_finite() && *day_fraction >= 0.0 => {
            DurationSeconds::Seconds(day_fraction * 86400.0)
        }
        RawValue::Text(s) => parse_duration_text(s),
        _ => DurationSeconds::Unparsable,
    }
}

fn parse_duration_text(s: &str) -> DurationSeconds {
    let parts: Vec<&str> = s.trim().split(':').map(|p| p.trim()).collect();
    if parts.is_empty() || parts.len() > 3 {
        return DurationSeconds::Unparsable;
    }
    let mut total = 0.0;
    for part in parts.iter() {
        // Only plain decimal numbers, to reject "inf", "nan", "-3", "1e3".
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return DurationSeconds::Unparsable;
        }
        match part.parse::<f64>() {
            Ok(x) => total = total * 60.0 + x,
            Err(_) => return DurationSeconds::Unparsable,
        }
    }
    DurationSeconds::Seconds(total)
}

/// Sort key of a grade label: "3º ano" -> 3, "EJAI 2ª etapa" -> 102, anything else is unranked.
pub fn grade_order(label: &str) -> GradeOrder {
    let s = label.to_lowercase();
    if let Some(n) = STANDARD_GRADE
        .captures(&s)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        return GradeOrder::Ranked(n);
    }
    if let Some(n) = EJAI_GRADE
        .captures(&s)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        return GradeOrder::Ranked(EJAI_GRADE_OFFSET.saturating_add(n));
    }
    GradeOrder::Unranked
}

pub fn grade_label(value: &RawValue) -> String {
    cell_text(value)
}

pub fn duration_label(value: &RawValue) -> String {
    cell_text(value)
}

pub fn disability_label(value: &RawValue) -> String {
    cell_text(value)
}
