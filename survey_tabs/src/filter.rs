// ********* Global filters ***********

use log::{debug, info, warn};

use crate::config::*;
use crate::layout::*;
use crate::schema::*;
use crate::table::*;

/// Restricts the table to the respondents matching every clause of the filter.
///
/// The input table is left untouched. A clause that cannot be resolved (unknown question,
/// no option with that label, question absent from the table) yields an empty table:
/// an unresolvable filter never lets all the rows through.
pub fn resolve_filters(
    table: &ResponseTable,
    schema: &Schema,
    spec: &FilterSpec,
    convention: Convention,
) -> ResponseTable {
    resolve_filters_with_issues(table, schema, spec, convention).0
}

/// Same as [resolve_filters], also returning the problems met on the way.
pub fn resolve_filters_with_issues(
    table: &ResponseTable,
    schema: &Schema,
    spec: &FilterSpec,
    convention: Convention,
) -> (ResponseTable, Vec<TabulationError>) {
    let mut current: Option<ResponseTable> = None;
    for clause in spec.clauses.iter().filter(|c| !c.is_passthrough()) {
        let base = current.as_ref().unwrap_or(table);
        match clause_membership(base, schema, clause, convention) {
            Ok(membership) => {
                let narrowed = base.retain_rows(|row| membership.applies(row));
                debug!(
                    "resolve_filters: {} = {:?}: {} -> {} rows",
                    clause.question,
                    clause.label,
                    base.num_rows(),
                    narrowed.num_rows()
                );
                current = Some(narrowed);
            }
            Err(e) => {
                warn!("resolve_filters: {}", e);
                return (table.empty_like(), vec![e]);
            }
        }
    }
    let res = current.unwrap_or_else(|| table.clone());
    info!(
        "resolve_filters: {} of {} rows kept",
        res.num_rows(),
        table.num_rows()
    );
    (res, Vec::new())
}

// How the clause is checked on a row.
//
// A bare column is compared against the option code. For grouped sub-columns, the
// sub-column of the option (found the way cross-cuts find it) is an indicator; otherwise
// any sub-column holding the code matches.
fn clause_membership(
    table: &ResponseTable,
    schema: &Schema,
    clause: &FilterClause,
    convention: Convention,
) -> Result<Membership, TabulationError> {
    let unresolvable = || TabulationError::UnresolvableFilter {
        question: clause.question.trim().to_string(),
        label: clause.label.trim().to_string(),
    };
    let question = schema.get(&clause.question).ok_or_else(unresolvable)?;
    let group = table.group(&question.id);
    let option = question.option_by_label(&clause.label);

    match detect_layout(&group)? {
        Layout::Bare(idx) => {
            let option = option.ok_or_else(unresolvable)?;
            Ok(Membership::Code(idx, option.code.clone()))
        }
        Layout::Grouped => {
            let label = clause.label.trim();
            if let Some(option) = option {
                // Modern sub-indices are sub-questions holding codes, not option indicators.
                let column = match convention {
                    Convention::Legacy => membership_items(&group, question, convention)
                        .into_iter()
                        .find(|item| item.label == option.label)
                        .and_then(|item| item.column),
                    Convention::Modern => labelled_column(&group, label, LabelMatch::Exact),
                };
                return Ok(match column {
                    Some(sub) => Membership::Indicator(sub.index),
                    None => Membership::AnyCode(
                        group.subs.iter().map(|s| s.index).collect(),
                        option.code.clone(),
                    ),
                });
            }
            // Sub-column descriptors of modern exports are not coded options.
            membership_items(&group, question, convention)
                .into_iter()
                .find(|item| item.label.trim() == label)
                .and_then(|item| item.column)
                .map(|sub| Membership::Indicator(sub.index))
                .ok_or_else(unresolvable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TableBuilder;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_option("Q1", Code::Int(1), "Yes");
        schema.add_option("Q1", Code::Int(2), "No");
        schema.add_option("Q2", Code::Int(1), "North");
        schema.add_option("Q2", Code::Int(2), "South");
        schema.add_option("Q3", Code::Int(1), "Tea");
        schema.add_option("Q3", Code::Int(2), "Coffee");
        schema.add_option("Q9", Code::Int(1), "Orphan");
        schema
    }

    fn table() -> ResponseTable {
        let mut b = TableBuilder::new().columns(&["Q1", "Q2", "Q3: Tea", "Q3: Coffee"]);
        b.fill_column(
            "Q1",
            &[Some(1.0), Some(1.0), Some(2.0), Some(1.0), Some(2.0), Some(6.0), None, Some(1.0), Some(2.0), Some(1.0)],
        );
        b.fill_column(
            "Q2",
            &[Some(1.0), Some(2.0), Some(1.0), Some(1.0), None, Some(2.0), Some(1.0), Some(1.0), Some(2.0), Some(2.0)],
        );
        b.fill_column("Q3: Tea", &[Some(1.0), Some(0.0), Some(1.0)]);
        b.fill_column("Q3: Coffee", &[Some(0.0), Some(1.0), Some(1.0)]);
        b.build()
    }

    #[test]
    fn unresolvable_filter_fails_closed() {
        let t = table();
        let spec = FilterSpec::new(vec![FilterClause::new("Q2", "Nonexistent")]);
        let (res, issues) = resolve_filters_with_issues(&t, &schema(), &spec, Convention::Legacy);
        assert_eq!(res.num_rows(), 0);
        assert_eq!(
            issues,
            vec![TabulationError::UnresolvableFilter {
                question: "Q2".to_string(),
                label: "Nonexistent".to_string()
            }]
        );
        // Unknown question and question absent from the table also fail closed.
        let spec = FilterSpec::new(vec![FilterClause::new("Q42", "Yes")]);
        assert_eq!(resolve_filters(&t, &schema(), &spec, Convention::Legacy).num_rows(), 0);
        let spec = FilterSpec::new(vec![FilterClause::new("Q9", "Orphan")]);
        assert_eq!(resolve_filters(&t, &schema(), &spec, Convention::Legacy).num_rows(), 0);
        assert_eq!(t.num_rows(), 10);
    }

    #[test]
    fn passthrough_clauses() {
        let t = table();
        let spec = FilterSpec::new(vec![
            FilterClause::new("Q1", ALL_LABEL),
            FilterClause::new("Q2", ""),
            FilterClause::new("", "Yes"),
        ]);
        assert!(spec.is_empty());
        assert_eq!(resolve_filters(&t, &schema(), &spec, Convention::Legacy), t);
    }

    #[test]
    fn clauses_narrow_sequentially() {
        let t = table();
        let yes = FilterSpec::new(vec![FilterClause::new("Q1", " Yes ")]);
        assert_eq!(resolve_filters(&t, &schema(), &yes, Convention::Legacy).num_rows(), 5);

        let both = FilterSpec::new(vec![
            FilterClause::new("Q1", "Yes"),
            FilterClause::new("Q2", "South"),
        ]);
        let res = resolve_filters(&t, &schema(), &both, Convention::Legacy);
        assert_eq!(res.num_rows(), 2);
        // Deterministic.
        assert_eq!(res, resolve_filters(&t, &schema(), &both, Convention::Legacy));
    }

    #[test]
    fn grouped_filters() {
        let t = table();
        let tea = FilterSpec::new(vec![FilterClause::new("Q3", "Tea")]);
        assert_eq!(resolve_filters(&t, &schema(), &tea, Convention::Legacy).num_rows(), 2);
        let coffee = FilterSpec::new(vec![FilterClause::new("Q3", "Coffee")]);
        assert_eq!(resolve_filters(&t, &schema(), &coffee, Convention::Legacy).num_rows(), 2);
    }

    #[test]
    fn grouped_filters_match_labels_inside_names() {
        let mut b = TableBuilder::new().columns(&["Q3: Tea drinkers", "Q3: Coffee drinkers"]);
        b.add_row_numbers(&[Some(1.0), Some(0.0)]);
        b.add_row_numbers(&[Some(0.0), Some(1.0)]);
        b.add_row_numbers(&[Some(0.0), Some(1.0)]);
        let t = b.build();
        let tea = FilterSpec::new(vec![FilterClause::new("Q3", "Tea")]);
        let res = resolve_filters(&t, &schema(), &tea, Convention::Legacy);
        assert_eq!(res.num_rows(), 1);
        assert_eq!(res.rows()[0][0], Value::Number(1.0));
        let coffee = FilterSpec::new(vec![FilterClause::new("Q3", "Coffee")]);
        assert_eq!(resolve_filters(&t, &schema(), &coffee, Convention::Legacy).num_rows(), 2);
    }

    #[test]
    fn modern_grouped_by_code() {
        let mut schema = Schema::new();
        schema.add_option("Q5", Code::Int(1), "Agree");
        schema.add_option("Q5", Code::Int(2), "Disagree");
        let mut b = TableBuilder::new().columns(&["Q5_1", "Q5_2"]);
        b.add_row_numbers(&[Some(2.0), Some(2.0)]);
        b.add_row_numbers(&[Some(1.0), Some(2.0)]);
        b.add_row_numbers(&[None, Some(2.0)]);
        let t = b.build();
        let spec = FilterSpec::new(vec![FilterClause::new("Q5", "Agree")]);
        let res = resolve_filters(&t, &schema, &spec, Convention::Modern);
        // No sub-column is named after the option: any sub-column holding code 1 matches.
        assert_eq!(res.num_rows(), 1);
        let spec = FilterSpec::new(vec![FilterClause::new("Q5", "Disagree")]);
        assert_eq!(resolve_filters(&t, &schema, &spec, Convention::Modern).num_rows(), 3);
    }
}
