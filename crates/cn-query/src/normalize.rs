//! # Tree Normalization
//!
//! Post-parse pass producing the canonical form of a [`FilterTree`]:
//! defaults merged, invertible comparisons rewritten to their complement,
//! every subtree sorted. Two semantically equivalent query strings compare
//! equal after this pass, which is what makes URL-equivalence testing a
//! plain `==`.

use serde_json::Value;

use crate::grammar::Grammar;
use crate::{ColumnFilter, ColumnOp, FilterTree, ListControl, ListParam};

pub(crate) fn normalize(grammar: &Grammar, mut tree: FilterTree) -> FilterTree {
    // NOT LT == GTE and friends; operators without a complement keep the flag.
    for filter in &mut tree.row_filters {
        if filter.invert {
            if let Some(complement) = filter.operator.complement() {
                filter.operator = complement;
                filter.invert = false;
            }
        }
    }

    merge_list_defaults(grammar, &mut tree);

    // Default result shape: every property included.
    if tree.column_filters.is_empty() {
        tree.column_filters.push(ColumnFilter {
            operator: ColumnOp::Include,
            properties: all_properties(grammar),
        });
    }

    // Canonical order per subtree: property name first, operator name second.
    tree.row_filters.sort_by(|a, b| {
        a.property
            .cmp(&b.property)
            .then_with(|| a.operator.name().cmp(b.operator.name()))
    });
    tree.column_filters
        .sort_by(|a, b| a.operator.name().cmp(b.operator.name()));
    tree.list_controls
        .sort_by(|a, b| a.parameter.canonical().cmp(b.parameter.canonical()));

    tree
}

/// Dedupe-by-parameter merge: an explicit list control always wins over
/// the resource default of the same parameter.
fn merge_list_defaults(grammar: &Grammar, tree: &mut FilterTree) {
    let defaults = grammar.defaults();
    let present =
        |tree: &FilterTree, p: ListParam| tree.list_controls.iter().any(|c| c.parameter == p);

    if !present(tree, ListParam::Limit) {
        tree.list_controls.push(ListControl {
            parameter: ListParam::Limit,
            value: Value::from(defaults.default_limit),
        });
    }
    if !present(tree, ListParam::OrderBy) {
        tree.list_controls.push(ListControl {
            parameter: ListParam::OrderBy,
            value: Value::Array(
                defaults
                    .order_by
                    .iter()
                    .map(|p| Value::String(p.clone()))
                    .collect(),
            ),
        });
    }
    if !present(tree, ListParam::Descending) {
        tree.list_controls.push(ListControl {
            parameter: ListParam::Descending,
            value: Value::Bool(false),
        });
    }
}

/// All flattened property paths, ascending — the sorted iteration order of
/// the underlying schema is recovered from the grammar's longest-first rules.
fn all_properties(grammar: &Grammar) -> Vec<String> {
    let mut names: Vec<String> = grammar
        .properties
        .iter()
        .map(|rule| rule.name.clone())
        .collect();
    names.sort();
    names
}
