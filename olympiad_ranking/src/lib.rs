/*!
Ranking of the entries of a scholastic olympiad.

The entries come from a free-form survey export: every row is one attempt by
one student, and the columns are named in whatever way the form author chose.
This crate turns such a table into a ranked table:

1. the header is mapped to the canonical fields ([columns]),
2. every row is normalized ([fields]): names in uppercase, canonical school
   names, scores as integers, durations in seconds, a sort key for the grade,
3. the records are ranked by grade, then score (higher first), then duration
   (shorter first),
4. the ranked table can be split between the general track and the adapted
   track (students with a declared disability or condition).

See the [builder] module for the main entry point, and the [manual] for a
description of the inputs and outputs.
*/
pub mod builder;
pub mod columns;
mod config;
pub mod fields;
pub mod manual;

use log::{debug, info};

use std::cmp::Ordering;
use std::collections::HashMap;

pub use crate::columns::ColumnMapping;
pub use crate::config::*;

fn cell(row: &[RawValue], col: Option<usize>) -> &RawValue {
    col.and_then(|c| row.get(c)).unwrap_or(&RawValue::Blank)
}

/// Normalizes one row of an uploaded table.
///
/// Arguments:
/// * `mapping` the canonical mapping of the header of the table
/// * `row` the cells, in the order of the header
/// * `stage` the stage to assign. If not provided, the stage column is used when present.
/// * `default_school` the school to use when the table has no school column
pub fn normalize_record(
    mapping: &ColumnMapping,
    row: &[RawValue],
    stage: Option<&str>,
    default_school: Option<&str>,
) -> NormalizedRecord {
    let get = |field: CanonicalField| cell(row, mapping.column(field));

    let school_raw = if mapping.column(CanonicalField::SchoolSelected).is_some() {
        fields::resolve_school(
            get(CanonicalField::SchoolSelected),
            get(CanonicalField::SchoolFreeText),
        )
    } else {
        default_school.unwrap_or("").to_string()
    };

    let grade = fields::grade_label(get(CanonicalField::Grade));
    let stage = match stage {
        Some(s) => s.to_string(),
        None => get(CanonicalField::Stage).display(),
    };

    NormalizedRecord {
        name: fields::normalize_name(get(CanonicalField::Name)),
        school: fields::normalize_school(&school_raw),
        grade_order: fields::grade_order(&grade),
        grade,
        score: fields::parse_score(get(CanonicalField::Score)),
        duration_label: fields::duration_label(get(CanonicalField::Duration)),
        duration: fields::parse_duration(get(CanonicalField::Duration)),
        disability: fields::disability_label(get(CanonicalField::DisabilityCategory)),
        stage,
    }
}

/// The ranking order: grade first, then the highest score, then the shortest duration.
pub fn compare_records(a: &NormalizedRecord, b: &NormalizedRecord) -> Ordering {
    a.grade_order
        .cmp(&b.grade_order)
        .then_with(|| b.score.cmp(&a.score))
        .then_with(|| a.duration.cmp(&b.duration))
}

/// Ranks the records.
///
/// The sort is stable: records that tie on all the keys keep their input order,
/// which is usually the submission order.
pub fn rank_records(mut records: Vec<NormalizedRecord>) -> RankedTable {
    info!("rank_records: ranking {} records", records.len());
    records.sort_by(compare_records);
    RankedTable { records }
}

/// Concatenates tables (in the given order) and ranks the result again.
pub fn merge_ranked(tables: Vec<RankedTable>) -> RankedTable {
    let mut all: Vec<NormalizedRecord> = Vec::new();
    for t in tables {
        all.extend(t.records);
    }
    rank_records(all)
}

/// Splits the table between the general track and the adapted track.
///
/// The order of the ranked table is kept in both parts.
pub fn categorize(table: &RankedTable) -> CategorySplit {
    let (general, adapted): (Vec<NormalizedRecord>, Vec<NormalizedRecord>) = table
        .records
        .iter()
        .cloned()
        .partition(|r| fields::is_no_disability(&r.disability));
    debug!(
        "categorize: {} general, {} adapted",
        general.len(),
        adapted.len()
    );
    CategorySplit {
        general: RankedTable { records: general },
        adapted: RankedTable { records: adapted },
    }
}

/// Keeps the `n` best records of every grade.
pub fn top_n_per_grade(table: &RankedTable, n: usize) -> RankedTable {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut records: Vec<NormalizedRecord> = Vec::new();
    for r in table.records.iter() {
        let count = seen.entry(r.grade.as_str()).or_insert(0);
        if *count < n {
            *count += 1;
            records.push(r.clone());
        }
    }
    debug!(
        "top_n_per_grade: kept {} of {} records (n = {})",
        records.len(),
        table.records.len(),
        n
    );
    RankedTable { records }
}

/// The schools, in the order in which they first appear in the table.
pub fn schools_in_order(table: &RankedTable) -> Vec<String> {
    let mut res: Vec<String> = Vec::new();
    for r in table.records.iter() {
        if !res.contains(&r.school) {
            res.push(r.school.clone());
        }
    }
    res
}

/// Splits the table by school. Each part keeps the ranking order.
pub fn group_by_school(table: &RankedTable) -> Vec<(String, RankedTable)> {
    schools_in_order(table)
        .into_iter()
        .map(|school| {
            let records: Vec<NormalizedRecord> = table
                .records
                .iter()
                .filter(|r| r.school == school)
                .cloned()
                .collect();
            (school, RankedTable { records })
        })
        .collect()
}

/// The number of records per grade label, in grade order.
pub fn grade_counts<'a, I>(tables: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a RankedTable>,
{
    let mut counts: HashMap<String, (GradeOrder, usize)> = HashMap::new();
    for t in tables {
        for r in t.records.iter() {
            let e = counts.entry(r.grade.clone()).or_insert((r.grade_order, 0));
            e.1 += 1;
        }
    }
    let mut res: Vec<(String, GradeOrder, usize)> = counts
        .into_iter()
        .map(|(label, (order, count))| (label, order, count))
        .collect();
    res.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    res.into_iter().map(|(l, _, c)| (l, c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::columns::SURVEY_FIELDS;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn record(grade: &str, score: u32, duration: &str) -> NormalizedRecord {
        NormalizedRecord {
            name: format!("{}-{}-{}", grade, score, duration),
            school: "CENTRO".to_string(),
            grade: grade.to_string(),
            grade_order: fields::grade_order(grade),
            score,
            duration_label: duration.to_string(),
            duration: fields::parse_duration(&text(duration)),
            disability: "Não possui deficiência/transtorno".to_string(),
            stage: "1° CLASSIFICATÓRIA".to_string(),
        }
    }

    fn assert_ranked(t: &RankedTable) {
        for pair in t.records().windows(2) {
            assert_ne!(
                compare_records(&pair[0], &pair[1]),
                Ordering::Greater,
                "{:?} ranked before {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn grade_then_duration() {
        let t = rank_records(vec![
            record("1° ANO", 45, "00:15:00"),
            record("1° ANO", 45, "00:11:00"),
            record("2° ANO", 50, "00:10:00"),
        ]);
        let order: Vec<(&str, &str)> = t
            .records()
            .iter()
            .map(|r| (r.grade.as_str(), r.duration_label.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("1° ANO", "00:11:00"),
                ("1° ANO", "00:15:00"),
                ("2° ANO", "00:10:00")
            ]
        );
        assert_ranked(&t);
    }

    #[test]
    fn score_descending_and_unparsable_last() {
        let t = rank_records(vec![
            record("3º ano", 10, "00:01:00"),
            record("3º ano", 30, "sem tempo"),
            record("3º ano", 30, "00:20:00"),
            record("Outro", 99, "00:00:10"),
            record("EJAI 1ª etapa", 99, "00:00:10"),
        ]);
        let order: Vec<(u32, &str)> = t
            .records()
            .iter()
            .map(|r| (r.score, r.duration_label.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (30, "00:20:00"),
                (30, "sem tempo"),
                (10, "00:01:00"),
                (99, "00:00:10"),
                (99, "00:00:10"),
            ]
        );
        assert_eq!(t.records()[3].grade, "EJAI 1ª etapa");
        assert_eq!(t.records()[4].grade, "Outro");
        assert_ranked(&t);
    }

    #[test]
    fn ties_keep_input_order() {
        init_logger();
        let mut a = record("1° ANO", 20, "00:05:00");
        a.name = "FIRST".to_string();
        let mut b = record("1° ANO", 20, "00:05:00");
        b.name = "SECOND".to_string();
        let t = rank_records(vec![a, b]);
        assert_eq!(t.records()[0].name, "FIRST");
        assert_eq!(t.records()[1].name, "SECOND");
    }

    #[test]
    fn empty_input() {
        init_logger();
        let t = rank_records(vec![]);
        assert!(t.is_empty());
        let split = categorize(&t);
        assert!(split.general.is_empty());
        assert!(split.adapted.is_empty());
    }

    #[test]
    fn categories_partition_the_table() {
        let mut records = Vec::new();
        for (idx, d) in [
            "Não possui deficiência/transtorno",
            "Deficiência física",
            "",
            "NÃO POSSUI DEFICIÊNCIA/TRANSTORNO",
            "TEA",
        ]
        .iter()
        .enumerate()
        {
            let mut r = record("1° ANO", idx as u32, "00:10:00");
            r.disability = d.to_string();
            records.push(r);
        }
        let t = rank_records(records);
        let split = categorize(&t);
        assert_eq!(split.general.len() + split.adapted.len(), t.len());
        assert_eq!(split.general.len(), 2);
        for r in split.general.records() {
            assert!(!split.adapted.records().contains(r));
        }
        // Blank and unknown answers go to the adapted track.
        let adapted: Vec<&str> = split
            .adapted
            .records()
            .iter()
            .map(|r| r.disability.as_str())
            .collect();
        assert_eq!(adapted, vec!["TEA", "", "Deficiência física"]);
        assert_ranked(&split.general);
        assert_ranked(&split.adapted);
    }

    #[test]
    fn top_n_by_grade() {
        let t = rank_records(vec![
            record("1° ANO", 10, "00:10:00"),
            record("1° ANO", 30, "00:10:00"),
            record("1° ANO", 20, "00:10:00"),
            record("2° ANO", 5, "00:10:00"),
        ]);
        let top = top_n_per_grade(&t, 2);
        let scores: Vec<u32> = top.records().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![30, 20, 5]);
        assert!(top_n_per_grade(&t, 0).is_empty());
    }

    #[test]
    fn counts_in_grade_order() {
        let t = rank_records(vec![
            record("2° ANO", 10, "00:10:00"),
            record("1° ANO", 30, "00:10:00"),
            record("2° ANO", 20, "00:10:00"),
        ]);
        assert_eq!(
            grade_counts([&t]),
            vec![("1° ANO".to_string(), 1), ("2° ANO".to_string(), 2)]
        );
    }

    #[test]
    fn not_listed_school_resolves_to_free_text() {
        let headers: Vec<String> = [
            "Nome do aluno?",
            "Selecione o nome da sua escola",
            "Caso a escola não esteja na lista acima, escreva o nome aqui:",
            "Ano escolar do aluno:",
            "Total de pontuação ?",
            "Quanto tempo de realização?",
            "Se for aluno com deficiência/transtorno:",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut builder = Builder::new(&headers, SURVEY_FIELDS)
            .unwrap()
            .stage("1° CLASSIFICATÓRIA");
        builder.add_row(&[
            text("Ana"),
            text("Escola não está na lista"),
            text("Escola Nova"),
            text("1° ANO"),
            RawValue::Number(40.0),
            text("00:12:00"),
            text("Não possui deficiência/transtorno"),
        ]);
        builder.add_row(&[
            text("Bia"),
            text("E.M.E.F. João XXIII"),
            RawValue::Blank,
            text("1° ANO"),
            text("45"),
            text("00:12:00"),
            text("Deficiência visual"),
        ]);
        let t = builder.rank();
        assert_eq!(schools_in_order(&t), vec!["JOÃO XXIII", "ESCOLA NOVA"]);
        let groups = group_by_school(&t);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].0, "ESCOLA NOVA");
        assert_eq!(groups[1].1.records()[0].name, "ANA");
        assert!(t.records().iter().all(|r| r.stage == "1° CLASSIFICATÓRIA"));
    }
}
