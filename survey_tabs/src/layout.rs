// Where the answers of a question live in the response table, and how an option is
// recognised on a respondent row. Shared by the filter resolver and the aggregators so
// that both conventions go through one resolution strategy.

use crate::config::*;
use crate::schema::*;
use crate::table::*;

/// Column layout of a question in the response table.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Layout {
    /// One column named exactly by the identifier; cells hold codes.
    Bare(usize),
    /// Several sub-columns sharing the identifier.
    Grouped,
}

/// Picks the layout actually present. A bare column wins over sub-columns.
pub fn detect_layout(group: &ColumnGroup) -> Result<Layout, TabulationError> {
    match (group.bare, group.subs.is_empty()) {
        (Some(idx), _) => Ok(Layout::Bare(idx)),
        (None, false) => Ok(Layout::Grouped),
        (None, true) => Err(TabulationError::AmbiguousLayout {
            question: group.base.clone(),
        }),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum LabelMatch {
    /// The column suffix equals the label.
    Exact,
    /// The suffix equals the label, or failing that, the column name contains it.
    Containment,
}

/// The sub-column named after an option label.
pub fn labelled_column<'a>(
    group: &'a ColumnGroup,
    label: &str,
    mode: LabelMatch,
) -> Option<&'a SubColumn> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    group.subs.iter().find(|s| s.suffix() == label).or_else(|| {
        if mode == LabelMatch::Containment {
            group.subs.iter().find(|s| s.header.contains(label))
        } else {
            None
        }
    })
}

/// One selectable item of a grouped question and its indicator column.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MemberItem<'a> {
    pub label: String,
    pub column: Option<&'a SubColumn>,
}

/// The selectable items of a grouped question.
///
/// Modern exports describe their sub-columns in the answer key: those descriptors are the
/// items and the column is found by its suffix. Otherwise the items are the coded options,
/// found by sub-index (modern) or by label (legacy).
pub fn membership_items<'a>(
    group: &'a ColumnGroup,
    question: &QuestionSchema,
    convention: Convention,
) -> Vec<MemberItem<'a>> {
    match convention {
        Convention::Modern if !question.sub_questions.is_empty() => question
            .sub_questions
            .iter()
            .map(|sq| MemberItem {
                label: sq.label.clone(),
                column: group.subs.iter().find(|s| s.suffix() == sq.suffix),
            })
            .collect(),
        Convention::Modern => question
            .options
            .iter()
            .map(|o| MemberItem {
                label: o.label.clone(),
                column: group
                    .subs
                    .iter()
                    .find(|s| s.suffix() == o.code.to_string())
                    .or_else(|| labelled_column(group, &o.label, LabelMatch::Exact)),
            })
            .collect(),
        Convention::Legacy => question
            .options
            .iter()
            .map(|o| MemberItem {
                label: o.label.clone(),
                column: labelled_column(group, &o.label, LabelMatch::Containment),
            })
            .collect(),
    }
}

/// How one row axis item of a cross-cut or a filter is recognised on a respondent row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Membership {
    /// The bare column holds this code.
    Code(usize, Code),
    /// The indicator sub-column is populated and not zero.
    Indicator(usize),
    /// Some sub-column holds this code.
    AnyCode(Vec<usize>, Code),
    /// Nothing in the table can express this item.
    Never,
}

impl Membership {
    pub fn applies(&self, row: &[Value]) -> bool {
        let has_code = |idx: &usize, code: &Code| {
            row.get(*idx)
                .map(|v| v.matches_code(code))
                .unwrap_or(false)
        };
        match self {
            Membership::Code(idx, code) => has_code(idx, code),
            Membership::Indicator(idx) => row.get(*idx).map(|v| v.is_selected()).unwrap_or(false),
            Membership::AnyCode(idxs, code) => idxs.iter().any(|i| has_code(i, code)),
            Membership::Never => false,
        }
    }

    /// True when the row carries any answer in the columns this membership looks at.
    pub fn answered(&self, row: &[Value]) -> bool {
        let present = |idx: &usize| row.get(*idx).map(|v| !v.is_missing()).unwrap_or(false);
        match self {
            Membership::Code(idx, _) | Membership::Indicator(idx) => present(idx),
            Membership::AnyCode(idxs, _) => idxs.iter().any(present),
            Membership::Never => false,
        }
    }
}

/// The labelled axis of a question used as a cross-cut dimension: one membership per item.
pub fn question_axis(
    group: &ColumnGroup,
    question: &QuestionSchema,
    convention: Convention,
) -> Result<Vec<(String, Membership)>, TabulationError> {
    match detect_layout(group)? {
        Layout::Bare(idx) => Ok(question
            .options
            .iter()
            .map(|o| (o.label.clone(), Membership::Code(idx, o.code.clone())))
            .collect()),
        Layout::Grouped => Ok(membership_items(group, question, convention)
            .into_iter()
            .map(|item| {
                let m = match item.column {
                    Some(sub) => Membership::Indicator(sub.index),
                    None => Membership::Never,
                };
                (item.label, m)
            })
            .collect()),
    }
}

/// Display labels of sub-columns: the answer-key descriptor, else the column text without
/// the prefix shared by its siblings, else the raw suffix.
pub fn sub_column_labels(schema: &Schema, question_id: &str, subs: &[&SubColumn]) -> Vec<String> {
    let question = schema.get(question_id);
    let texts: Vec<Option<&str>> = subs.iter().map(|s| schema.column_text(&s.header)).collect();
    let present: Vec<&str> = texts.iter().flatten().cloned().collect();
    let prefix = if present.len() >= 2 {
        common_text_prefix(&present)
    } else {
        String::new()
    };
    subs.iter()
        .zip(texts.iter())
        .map(|(sub, text)| {
            question
                .and_then(|q| q.sub_question_label(sub.suffix()))
                .map(|s| s.to_string())
                .or_else(|| {
                    text.map(|t| strip_text_prefix(t, &prefix))
                        .filter(|t| !t.is_empty())
                })
                .unwrap_or_else(|| sub.suffix().to_string())
        })
        .collect()
}
