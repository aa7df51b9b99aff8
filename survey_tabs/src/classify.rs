// ********* Question-type classification ***********

use log::{debug, info};
use std::collections::BTreeSet;

use crate::config::*;
use crate::schema::*;
use crate::table::*;

/// Marker found in the sub-column names of net-promoter questions in modern exports.
pub const NPS_MARKER: &str = "NPS";

/// Marker found in the text of net-promoter questions ("How likely are you to recommend").
pub const RECOMMEND_MARKER: &str = "recommend";

/// The candidate types of every coded question, in schema order.
///
/// This is a recommendation: a question may carry several tags or none, and the
/// caller's choice of aggregator is authoritative.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Classification {
    entries: Vec<(String, BTreeSet<TypeTag>)>,
}

impl Classification {
    pub fn get(&self, question_id: &str) -> Option<&BTreeSet<TypeTag>> {
        self.entries
            .iter()
            .find(|(id, _)| id == question_id.trim())
            .map(|(_, tags)| tags)
    }

    pub fn has(&self, question_id: &str, tag: TypeTag) -> bool {
        self.get(question_id)
            .map(|tags| tags.contains(&tag))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, BTreeSet<TypeTag>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Labels each coded question of the schema with its candidate types.
///
/// Questions without options are free text and are left out. Ranked questions are
/// never detected here: the caller asks for them explicitly.
pub fn classify_questions(
    table: &ResponseTable,
    schema: &Schema,
    convention: Convention,
) -> Classification {
    let mut entries: Vec<(String, BTreeSet<TypeTag>)> = Vec::new();
    for q in schema.questions().iter().filter(|q| q.is_coded()) {
        let group = table.group(&q.id);
        let mut tags: BTreeSet<TypeTag> = BTreeSet::new();
        if looks_single_choice(table, q, &group) {
            tags.insert(TypeTag::SingleChoice);
        }
        let subs = grouped_columns(&group, convention);
        if looks_multi_select(table, &subs) {
            tags.insert(TypeTag::MultiSelect);
        }
        if looks_matrix(table, &subs) {
            tags.insert(TypeTag::Matrix);
        }
        if looks_nps(q, &group, convention) {
            tags.insert(TypeTag::Nps);
        }
        debug!("classify_questions: {}: {:?}", q.id, tags);
        entries.push((q.id.clone(), tags));
    }
    info!(
        "classify_questions: {} coded questions classified",
        entries.len()
    );
    Classification { entries }
}

// The sub-columns that count as a group under the convention: option-labelled suffixes
// for legacy exports, numeric sub-indices for modern ones.
fn grouped_columns(group: &ColumnGroup, convention: Convention) -> Vec<&SubColumn> {
    group
        .subs
        .iter()
        .filter(|s| match convention {
            Convention::Legacy => s.name.sub_index().is_none(),
            Convention::Modern => s.name.sub_index().is_some(),
        })
        .collect()
}

fn looks_single_choice(table: &ResponseTable, q: &QuestionSchema, group: &ColumnGroup) -> bool {
    match group.bare {
        Some(idx) => table
            .column(idx)
            .any(|v| q.options.iter().any(|o| v.matches_code(&o.code))),
        None => false,
    }
}

// Observed numeric values of the columns. None as soon as one populated cell is not numeric.
fn observed_numbers(table: &ResponseTable, subs: &[&SubColumn]) -> Option<Vec<f64>> {
    let mut res: Vec<f64> = Vec::new();
    for sub in subs.iter() {
        for v in table.column(sub.index).filter(|v| !v.is_missing()) {
            res.push(v.as_number()?);
        }
    }
    Some(res)
}

fn looks_multi_select(table: &ResponseTable, subs: &[&SubColumn]) -> bool {
    if subs.len() < 2 {
        return false;
    }
    match observed_numbers(table, subs) {
        Some(values) => !values.is_empty() && values.iter().all(|x| *x == 0.0 || *x == 1.0),
        None => false,
    }
}

fn looks_matrix(table: &ResponseTable, subs: &[&SubColumn]) -> bool {
    if subs.len() < 2 {
        return false;
    }
    let values = match observed_numbers(table, subs) {
        Some(v) => v,
        None => return false,
    };
    if !values.iter().all(|x| (0.0..=10.0).contains(x)) {
        return false;
    }
    // More than two distinct values separates a scale from a binary indicator.
    let mut distinct: Vec<u64> = values.iter().map(|x| x.to_bits()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len() > 2
}

// Legacy keys list the scale either as the scores 0..=10 or shifted by one (1..=11),
// sometimes labelling only its ends. The top of the scale must be there.
fn looks_nps_scale(q: &QuestionSchema) -> bool {
    let codes: Option<Vec<i64>> = q.options.iter().map(|o| o.code.as_int()).collect();
    match codes {
        Some(codes) if !codes.is_empty() => {
            let min = codes.iter().min().cloned().unwrap_or(0);
            let max = codes.iter().max().cloned().unwrap_or(0);
            (min >= 0 && max == 10) || (min >= 1 && max == 11)
        }
        _ => false,
    }
}

fn looks_nps(q: &QuestionSchema, group: &ColumnGroup, convention: Convention) -> bool {
    match convention {
        Convention::Legacy => {
            let marked = q
                .text
                .as_ref()
                .map(|t| t.to_lowercase().contains(RECOMMEND_MARKER))
                .unwrap_or(false);
            !group.subs.is_empty() && (marked || looks_nps_scale(q))
        }
        Convention::Modern => group
            .subs
            .iter()
            .any(|s| s.header.to_uppercase().contains(NPS_MARKER)),
    }
}
