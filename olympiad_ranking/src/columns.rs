//! Mapping of the header of an uploaded table to the canonical fields.
//!
//! The matching is driven by an ordered list of rules. For each column, the
//! first rule that matches the normalized label claims the column. All the
//! exact rules come before the containment rules, and inside each group the
//! declaration order is the tie break.

use log::{debug, warn};

use crate::config::*;
use crate::fields::fold_text;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum LabelMatcher {
    /// The normalized label is exactly this text.
    Exact(&'static str),
    /// The normalized label contains this text.
    Contains(&'static str),
}

impl LabelMatcher {
    pub fn matches(&self, normalized_label: &str) -> bool {
        match self {
            LabelMatcher::Exact(s) => normalized_label == *s,
            LabelMatcher::Contains(s) => normalized_label.contains(s),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ColumnRule {
    pub matcher: LabelMatcher,
    pub field: CanonicalField,
}

const fn exact(label: &'static str, field: CanonicalField) -> ColumnRule {
    ColumnRule {
        matcher: LabelMatcher::Exact(label),
        field,
    }
}

const fn contains(fragment: &'static str, field: CanonicalField) -> ColumnRule {
    ColumnRule {
        matcher: LabelMatcher::Contains(fragment),
        field,
    }
}

use crate::config::CanonicalField::{
    DisabilityCategory, Duration, Grade, Name, SchoolFreeText, SchoolSelected, Score, Stage,
};

/// The matching rules, in evaluation order. The labels are in normalized form (see [normalize_label]).
pub const COLUMN_RULES: &[ColumnRule] = &[
    // Form questions, as asked in the registration forms.
    exact("nome do aluno", Name),
    exact("nome do estudante", Name),
    exact("nome completo", Name),
    exact("selecione o nome da sua escola", SchoolSelected),
    exact("qual e o nome da sua escola", SchoolSelected),
    exact(
        "caso a escola nao esteja na lista acima, escreva o nome aqui",
        SchoolFreeText,
    ),
    exact(
        "escreva o nome da escola caso ela no esteja listada",
        SchoolFreeText,
    ),
    exact(
        "escreva o nome da escola caso ela nao esteja listada",
        SchoolFreeText,
    ),
    exact("ano escolar do aluno", Grade),
    exact("total de pontuacao", Score),
    exact("quanto tempo de realizacao", Duration),
    exact("se for aluno com deficiencia/transtorno", DisabilityCategory),
    // Column names of the generated reports.
    exact("nome", Name),
    exact("escola", SchoolSelected),
    exact("ano", Grade),
    exact("ano escolar", Grade),
    exact("pontuacao", Score),
    exact("tempo", Duration),
    exact("deficiencia/transtorno", DisabilityCategory),
    exact("etapa", Stage),
    exact("etapa de classificacao", Stage),
    // Fallback on fragments. "ano escolar" contains "escola", the free text school must
    // come before the selected school, and everything that mentions the student ("aluno")
    // before the name.
    contains("ano escolar", Grade),
    contains("serie", Grade),
    contains("nao esteja", SchoolFreeText),
    contains("no esteja", SchoolFreeText),
    contains("nao estiver", SchoolFreeText),
    contains("escreva o nome", SchoolFreeText),
    contains("escola", SchoolSelected),
    contains("instituicao", SchoolSelected),
    contains("deficiencia", DisabilityCategory),
    contains("transtorno", DisabilityCategory),
    contains("etapa", Stage),
    contains("pontuacao", Score),
    contains("pontos", Score),
    contains("nota", Score),
    contains("tempo", Duration),
    contains("duracao", Duration),
    contains("nome", Name),
    contains("aluno", Name),
    contains("estudante", Name),
    contains("ano", Grade),
];

/// The columns required in a survey export.
pub const SURVEY_FIELDS: &[CanonicalField] = &[
    Name,
    SchoolSelected,
    SchoolFreeText,
    Grade,
    Score,
    Duration,
    DisabilityCategory,
];

/// The columns required when reading back a generated report.
pub const RANKED_SHEET_FIELDS: &[CanonicalField] = &[Name, Grade, Score, Duration];

/// Normalizes a header label: no accents, lowercase, collapsed whitespace,
/// no trailing punctuation.
pub fn normalize_label(label: &str) -> String {
    fold_text(label)
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

/// Finds the canonical field for a single label, if any.
pub fn match_label(label: &str) -> Option<CanonicalField> {
    let normalized = normalize_label(label);
    if normalized.is_empty() {
        return None;
    }
    COLUMN_RULES
        .iter()
        .find(|rule| rule.matcher.matches(&normalized))
        .map(|rule| rule.field)
}

/// The outcome of the canonicalization of a header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnMapping {
    headers: Vec<String>,
    // For each column, the field it resolves to.
    assignments: Vec<Option<CanonicalField>>,
}

impl ColumnMapping {
    /// The index of the column holding a field.
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.assignments.iter().position(|a| *a == Some(field))
    }

    pub fn field_at(&self, col: usize) -> Option<CanonicalField> {
        self.assignments.get(col).cloned().flatten()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The labels that did not resolve to any field.
    pub fn passthrough(&self) -> Vec<&str> {
        self.headers
            .iter()
            .zip(self.assignments.iter())
            .filter_map(|(h, a)| match a {
                None => Some(h.as_str()),
                Some(_) => None,
            })
            .collect()
    }

    /// Checks that all the given fields have a column.
    pub fn require(&self, fields: &[CanonicalField]) -> Result<(), MissingFieldError> {
        let missing: Vec<CanonicalField> = fields
            .iter()
            .filter(|f| self.column(**f).is_none())
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingFieldError {
                missing,
                received: self.headers.clone(),
            })
        }
    }
}

/// Maps the labels of a header to the canonical fields.
///
/// A field is claimed by the leftmost column that matches it. The other
/// columns are kept as they are and ignored later.
pub fn canonicalize(headers: &[String]) -> ColumnMapping {
    let mut assignments: Vec<Option<CanonicalField>> = Vec::new();
    for label in headers.iter() {
        let assignment = match match_label(label) {
            Some(field) if assignments.contains(&Some(field)) => {
                warn!(
                    "canonicalize: column {:?} also matches {}, keeping the first column",
                    label, field
                );
                None
            }
            x => x,
        };
        debug!("canonicalize: {:?} -> {:?}", label, assignment);
        assignments.push(assignment);
    }
    ColumnMapping {
        headers: headers.to_vec(),
        assignments,
    }
}

/// Canonicalizes a header and checks that the required fields are present.
pub fn canonicalize_required(
    headers: &[String],
    required: &[CanonicalField],
) -> Result<ColumnMapping, MissingFieldError> {
    let mapping = canonicalize(headers);
    mapping.require(required)?;
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    fn survey_header() -> Vec<String> {
        labels(&[
            "Carimbo de data/hora",
            "Nome do aluno?",
            "Selecione o nome da sua escola",
            "Caso a escola não esteja na lista acima, escreva o nome aqui:",
            "Ano escolar do aluno:",
            "Total de pontuação ?",
            "Quanto tempo de realização?",
            "Se for aluno com deficiência/transtorno:",
        ])
    }

    #[test]
    fn form_questions() {
        let m = canonicalize_required(&survey_header(), SURVEY_FIELDS).unwrap();
        assert_eq!(m.column(Name), Some(1));
        assert_eq!(m.column(SchoolSelected), Some(2));
        assert_eq!(m.column(SchoolFreeText), Some(3));
        assert_eq!(m.column(Grade), Some(4));
        assert_eq!(m.column(Score), Some(5));
        assert_eq!(m.column(Duration), Some(6));
        assert_eq!(m.column(DisabilityCategory), Some(7));
        assert_eq!(m.passthrough(), vec!["Carimbo de data/hora"]);
    }

    #[test]
    fn variant_spellings() {
        let header = labels(&[
            "NOME DO ALUNO",
            "Qual é o nome da sua escola?",
            "Escreva o nome da escola caso ela no esteja listada",
            "ano escolar do(a) aluno(a)",
            "Pontuação total",
            "Tempo de prova",
            "Aluno com deficiencia ou transtorno?",
        ]);
        let m = canonicalize_required(&header, SURVEY_FIELDS).unwrap();
        assert_eq!(m.column(Name), Some(0));
        assert_eq!(m.column(SchoolSelected), Some(1));
        assert_eq!(m.column(SchoolFreeText), Some(2));
        assert_eq!(m.column(Grade), Some(3));
        assert_eq!(m.column(Score), Some(4));
        assert_eq!(m.column(Duration), Some(5));
        assert_eq!(m.column(DisabilityCategory), Some(6));
    }

    #[test]
    fn report_columns() {
        let header = labels(&[
            "Ano",
            "Nome",
            "Escola",
            "Pontuação",
            "Tempo",
            "Deficiência/Transtorno",
            "ETAPA",
        ]);
        let m = canonicalize_required(&header, RANKED_SHEET_FIELDS).unwrap();
        assert_eq!(m.column(Grade), Some(0));
        assert_eq!(m.column(SchoolSelected), Some(2));
        assert_eq!(m.column(Stage), Some(6));
        assert_eq!(m.column(SchoolFreeText), None);
    }

    #[test]
    fn leftmost_column_wins() {
        let header = labels(&["Nome", "Nome do responsável"]);
        let m = canonicalize(&header);
        assert_eq!(m.column(Name), Some(0));
        assert_eq!(m.field_at(1), None);
    }

    #[test]
    fn exact_rules_take_precedence() {
        // Contains "escola" but is the free text question.
        assert_eq!(
            match_label("Caso a escola não esteja na lista acima, escreva o nome aqui:"),
            Some(SchoolFreeText)
        );
        assert_eq!(match_label("Escola"), Some(SchoolSelected));
        assert_eq!(match_label("Se for aluno com deficiência/transtorno:"), Some(DisabilityCategory));
        assert_eq!(match_label("Endereço de e-mail"), None);
        assert_eq!(match_label(""), None);
    }

    #[test]
    fn missing_fields_are_reported() {
        let header = labels(&["Nome", "Escola", "Pontuação"]);
        let err = canonicalize_required(&header, SURVEY_FIELDS).unwrap_err();
        assert_eq!(
            err.missing,
            vec![SchoolFreeText, Grade, Duration, DisabilityCategory]
        );
        assert_eq!(err.received, header);
        let msg = err.to_string();
        assert!(msg.contains("grade"));
        assert!(msg.contains("Pontuação"));
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_label("Total de pontuação ?"), "total de pontuacao");
        assert_eq!(normalize_label("  Ano   escolar do aluno:"), "ano escolar do aluno");
    }
}
