//! # Query-String Parser
//!
//! Matches `name=value` pairs against a compiled [`Grammar`] and produces
//! the raw (pre-normalization) [`FilterTree`].
//!
//! Parameter names are resolved by literal prefix scanning over the
//! grammar's property rules (longest name first), followed by suffix
//! parsing of the modifier chain:
//! ```text
//! <property>[CaseSensitive]?[_NOT|Not]?[<OPERATOR>]?[_I]?
//! ```
//! Values are percent-decoded (`+` decodes to space) before commas are
//! interpreted as element separators, so `%2C` separates exactly like a
//! literal comma.

use serde_json::Value;

use crate::error::ParseError;
use crate::grammar::{Grammar, PropertyRule};
use crate::schema::PrimitiveKind;
use crate::{ColumnFilter, ColumnOp, FilterTree, ListControl, ListParam, Operator, RowFilter};

/// Operator tokens in scan order: canonical before alias, longer tokens
/// before the tokens they are a prefix of (`_GTE` before `_GT`,
/// `GreaterOrEqual` before `Greater`).
const OPERATOR_TOKENS: [(&str, Operator); 16] = [
    ("_OVERLAPS", Operator::Overlaps),
    ("_CONTAINS", Operator::Contains),
    ("_GTE", Operator::Gte),
    ("_LTE", Operator::Lte),
    ("_GT", Operator::Gt),
    ("_LT", Operator::Lt),
    ("_IN", Operator::In),
    ("_LIKE", Operator::Like),
    ("GreaterOrEqual", Operator::Gte),
    ("LessOrEqual", Operator::Lte),
    ("Overlaps", Operator::Overlaps),
    ("Contains", Operator::Contains),
    ("Greater", Operator::Gt),
    ("Less", Operator::Lt),
    ("Like", Operator::Like),
    ("In", Operator::In),
];

/// Parse without normalization. [`Grammar::parse`] is the public entry
/// point; it runs this and then the normalization pass.
pub(crate) fn parse_raw(grammar: &Grammar, query: &str) -> Result<FilterTree, ParseError> {
    let mut tree = FilterTree::default();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode_component(raw_name)?;
        let value = decode_component(raw_value)?;
        dispatch(grammar, &name, &value, &mut tree)?;
    }
    Ok(tree)
}

fn dispatch(
    grammar: &Grammar,
    name: &str,
    value: &str,
    tree: &mut FilterTree,
) -> Result<(), ParseError> {
    // Canonical tokens are reserved; they win over everything.
    for rule in &grammar.list_controls {
        if name == rule.parameter.canonical() {
            return apply_list_control(grammar, rule.parameter, value, tree);
        }
    }
    for rule in &grammar.column_rules {
        if name == rule.operator.canonical_token() {
            return apply_column_filter(grammar, rule.operator, value, tree);
        }
    }

    // Property prefix scan, longest name first.
    for rule in &grammar.properties {
        if let Some(suffix) = name.strip_prefix(rule.name.as_str()) {
            if let Some(parts) = parse_suffix(suffix) {
                let filter = build_row_filter(rule, parts, value)?;
                tree.row_filters.push(filter);
                return Ok(());
            }
        }
    }

    // Legacy bare aliases, unless shadowed by a real property.
    for rule in &grammar.list_controls {
        if rule.alias_enabled && name == rule.parameter.alias() {
            return apply_list_control(grammar, rule.parameter, value, tree);
        }
    }
    for rule in &grammar.column_rules {
        if rule.alias_enabled && name == rule.operator.alias() {
            return apply_column_filter(grammar, rule.operator, value, tree);
        }
    }

    Err(ParseError::UnknownParameter(name.to_string()))
}

// =============================================================================
// Parameter-name suffix parsing
// =============================================================================

struct Suffix {
    case_sensitive: bool,
    invert: bool,
    operator: Option<Operator>,
}

/// Parse the modifier chain after a property name. Returns `None` when the
/// remainder is not a valid chain, which makes the caller try the next
/// (shorter) property rule.
fn parse_suffix(suffix: &str) -> Option<Suffix> {
    let mut rest = suffix;
    let mut case_sensitive = false;
    let mut invert = false;
    let mut operator = None;

    if let Some(r) = rest.strip_prefix("CaseSensitive") {
        case_sensitive = true;
        rest = r;
    }
    if let Some(r) = rest.strip_prefix("_NOT") {
        invert = true;
        rest = r;
    } else if let Some(r) = rest.strip_prefix("Not") {
        invert = true;
        rest = r;
    }
    for (token, op) in OPERATOR_TOKENS {
        if let Some(r) = rest.strip_prefix(token) {
            operator = Some(op);
            rest = r;
            break;
        }
    }
    if let Some(r) = rest.strip_prefix("_I") {
        // A trailing _I forces case-insensitive, also after CaseSensitive.
        case_sensitive = false;
        rest = r;
    }

    if rest.is_empty() {
        Some(Suffix {
            case_sensitive,
            invert,
            operator,
        })
    } else {
        None
    }
}

// =============================================================================
// Row filters
// =============================================================================

fn build_row_filter(
    rule: &PropertyRule,
    parts: Suffix,
    value: &str,
) -> Result<RowFilter, ParseError> {
    // Absent operator means equality, normalized to the inclusion test.
    let operator = parts.operator.unwrap_or(Operator::In);
    let multi = rule.descriptor.multi_valued || operator.is_multi_valued();

    let elements = split_elements(value);
    let coerced = if multi {
        let mut items = Vec::with_capacity(elements.len());
        for element in &elements {
            items.push(coerce_and_validate(rule, element)?);
        }
        Value::Array(items)
    } else {
        if elements.len() != 1 {
            return Err(ParseError::SingleValueExpected {
                property: rule.name.clone(),
                count: elements.len(),
            });
        }
        coerce_and_validate(rule, &elements[0])?
    };

    Ok(RowFilter {
        property: rule.name.clone(),
        operator,
        invert: parts.invert,
        case_sensitive: parts.case_sensitive,
        value: coerced,
    })
}

fn coerce_and_validate(rule: &PropertyRule, raw: &str) -> Result<Value, ParseError> {
    let descriptor = &rule.descriptor;
    let value = match descriptor.kind {
        PrimitiveKind::Boolean => Value::Bool(raw != "false"),
        PrimitiveKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| ParseError::InvalidValue {
                property: rule.name.clone(),
                expected: "integer",
                value: raw.to_string(),
            })?,
        PrimitiveKind::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| ParseError::InvalidValue {
                property: rule.name.clone(),
                expected: "number",
                value: raw.to_string(),
            })?,
        PrimitiveKind::String => Value::String(raw.to_string()),
    };

    check_constraints(rule, &value, raw)?;
    Ok(value)
}

fn check_constraints(rule: &PropertyRule, value: &Value, raw: &str) -> Result<(), ParseError> {
    let descriptor = &rule.descriptor;
    let fail = |constraint: &'static str, expected: String| ParseError::Constraint {
        property: rule.name.clone(),
        constraint,
        expected,
        actual: raw.to_string(),
    };

    if let Value::String(s) = value {
        let length = s.chars().count() as u64;
        if let Some(min) = descriptor.min_length {
            if length < min {
                return Err(fail("minLength", format!("length >= {}", min)));
            }
        }
        if let Some(max) = descriptor.max_length {
            if length > max {
                return Err(fail("maxLength", format!("length <= {}", max)));
            }
        }
        if let Some(pattern) = &rule.pattern {
            if !pattern.is_match(s) {
                return Err(fail("pattern", format!("match of /{}/", pattern.as_str())));
            }
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = descriptor.minimum {
            if n < min {
                return Err(fail("minimum", format!(">= {}", min)));
            }
        }
        if let Some(max) = descriptor.maximum {
            if n > max {
                return Err(fail("maximum", format!("<= {}", max)));
            }
        }
        if let Some(min) = descriptor.exclusive_minimum {
            if n <= min {
                return Err(fail("exclusiveMinimum", format!("> {}", min)));
            }
        }
        if let Some(max) = descriptor.exclusive_maximum {
            if n >= max {
                return Err(fail("exclusiveMaximum", format!("< {}", max)));
            }
        }
        if let Some(step) = descriptor.multiple_of {
            if ((n / step).round() * step - n).abs() > 1e-9 {
                return Err(fail("multipleOf", format!("multiple of {}", step)));
            }
        }
    }

    if let Some(allowed) = &descriptor.enum_values {
        if !allowed.contains(value) {
            let listed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            return Err(fail("enum", format!("one of {}", listed.join(", "))));
        }
    }

    Ok(())
}

// =============================================================================
// List controls and column filters
// =============================================================================

fn apply_list_control(
    grammar: &Grammar,
    parameter: ListParam,
    raw: &str,
    tree: &mut FilterTree,
) -> Result<(), ParseError> {
    let value = match parameter {
        ListParam::Limit => {
            let n = parse_unsigned(parameter, raw)?;
            let max = grammar.defaults().max_limit;
            if n > max {
                return Err(ParseError::Constraint {
                    property: parameter.canonical().to_string(),
                    constraint: "maximum",
                    expected: format!("<= {}", max),
                    actual: raw.to_string(),
                });
            }
            Value::from(n)
        }
        ListParam::Offset => Value::from(parse_unsigned(parameter, raw)?),
        ListParam::KeyOffset | ListParam::Expansion => Value::String(raw.to_string()),
        ListParam::IncludeCount | ListParam::Descending => Value::Bool(raw != "false"),
        ListParam::OrderBy => {
            let elements = split_elements(raw);
            for element in &elements {
                if !grammar.is_orderable(element) {
                    return Err(ParseError::UnknownProperty {
                        parameter: parameter.canonical().to_string(),
                        property: element.clone(),
                    });
                }
            }
            Value::Array(elements.into_iter().map(Value::String).collect())
        }
    };

    tree.list_controls.push(ListControl { parameter, value });
    Ok(())
}

fn apply_column_filter(
    grammar: &Grammar,
    operator: ColumnOp,
    raw: &str,
    tree: &mut FilterTree,
) -> Result<(), ParseError> {
    let properties = split_elements(raw);
    for property in &properties {
        if grammar.property(property).is_none() {
            return Err(ParseError::UnknownProperty {
                parameter: operator.canonical_token().to_string(),
                property: property.clone(),
            });
        }
    }
    tree.column_filters.push(ColumnFilter { operator, properties });
    Ok(())
}

fn parse_unsigned(parameter: ListParam, raw: &str) -> Result<u64, ParseError> {
    raw.parse::<u64>().map_err(|_| ParseError::InvalidValue {
        property: parameter.canonical().to_string(),
        expected: "non-negative integer",
        value: raw.to_string(),
    })
}

// =============================================================================
// Decoding helpers
// =============================================================================

fn decode_component(raw: &str) -> Result<String, ParseError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ParseError::BadEncoding(raw.to_string()))
}

/// Split a decoded value into array elements, tolerating a wrapping pair
/// of parentheses.
fn split_elements(value: &str) -> Vec<String> {
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(value);
    inner.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{flat_query_grammar, ConfigDefaults, ResourceDefaults};
    use crate::schema::{FlattenedSchema, PropertyDescriptor};
    use serde_json::json;

    fn person_schema() -> FlattenedSchema {
        let mut schema = FlattenedSchema::new();
        schema.insert("key", PropertyDescriptor::scalar(PrimitiveKind::String));
        let mut first_name = PropertyDescriptor::scalar(PrimitiveKind::String);
        first_name.max_length = Some(50);
        schema.insert("firstName", first_name);
        schema.insert("lastName", PropertyDescriptor::scalar(PrimitiveKind::String));
        let mut age = PropertyDescriptor::scalar(PrimitiveKind::Integer);
        age.minimum = Some(0.0);
        age.maximum = Some(150.0);
        schema.insert("age", age);
        let mut height = PropertyDescriptor::scalar(PrimitiveKind::Number);
        height.multiple_of = Some(0.25);
        schema.insert("height", height);
        schema.insert("active", PropertyDescriptor::scalar(PrimitiveKind::Boolean));
        schema.insert("tags", PropertyDescriptor::array_of(PrimitiveKind::String));
        let mut status = PropertyDescriptor::scalar(PrimitiveKind::String);
        status.enum_values = Some(vec![json!("open"), json!("closed")]);
        schema.insert("status", status);
        let mut zip = PropertyDescriptor::scalar(PrimitiveKind::String);
        zip.pattern = Some("^[0-9]{4}$".into());
        schema.insert("zip", zip);
        // Shadows the legacy `limit` alias.
        schema.insert("limit", PropertyDescriptor::scalar(PrimitiveKind::Integer));
        // A property that is itself a longer variant of `value` + operator.
        schema.insert("value", PropertyDescriptor::scalar(PrimitiveKind::Integer));
        schema.insert("valueIn", PropertyDescriptor::scalar(PrimitiveKind::String));
        schema
    }

    fn person_grammar() -> Grammar {
        flat_query_grammar(
            &person_schema(),
            &ConfigDefaults::default(),
            &ResourceDefaults::default(),
        )
        .unwrap()
    }

    fn single_row(tree: &FilterTree, property: &str) -> RowFilter {
        tree.row_filters
            .iter()
            .find(|f| f.property == property)
            .cloned()
            .unwrap_or_else(|| panic!("no row filter for '{}'", property))
    }

    #[test]
    fn test_gte_integer_coercion() {
        let tree = person_grammar().parse("age_GTE=30").unwrap();
        let filter = single_row(&tree, "age");
        assert_eq!(filter.operator, Operator::Gte);
        assert!(!filter.invert);
        assert!(!filter.case_sensitive);
        assert_eq!(filter.value, json!(30));
    }

    #[test]
    fn test_multi_valued_operator_wraps_single_valued_property() {
        let tree = person_grammar().parse("key_IN=1,2,3").unwrap();
        let filter = single_row(&tree, "key");
        assert_eq!(filter.operator, Operator::In);
        assert_eq!(filter.value, json!(["1", "2", "3"]));
    }

    #[test]
    fn test_bare_equality_normalizes_to_in() {
        let tree = person_grammar().parse("firstName=John").unwrap();
        let filter = single_row(&tree, "firstName");
        assert_eq!(filter.operator, Operator::In);
        assert_eq!(filter.value, json!(["John"]));
    }

    #[test]
    fn test_empty_query_yields_configured_defaults() {
        let grammar = person_grammar();
        let tree = grammar.parse("").unwrap();

        assert!(tree.row_filters.is_empty());

        let expected_columns: Vec<String> =
            person_schema().property_names().map(str::to_string).collect();
        assert_eq!(tree.column_filters.len(), 1);
        assert_eq!(tree.column_filters[0].operator, ColumnOp::Include);
        assert_eq!(tree.column_filters[0].properties, expected_columns);

        let params: Vec<ListParam> =
            tree.list_controls.iter().map(|c| c.parameter).collect();
        assert_eq!(
            params,
            vec![ListParam::Descending, ListParam::Limit, ListParam::OrderBy]
        );
        assert_eq!(tree.list_controls[0].value, json!(false));
        assert_eq!(tree.list_controls[1].value, json!(30));
        assert_eq!(tree.list_controls[2].value, json!(["$$meta.created", "key"]));
    }

    #[test]
    fn test_parameter_order_does_not_change_the_tree() {
        let grammar = person_grammar();
        let a = grammar.parse("age_GTE=30&firstName=John&_LIMIT=10").unwrap();
        let b = grammar.parse("_LIMIT=10&firstName=John&age_GTE=30").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_explicit_default_equals_omitted_default() {
        let grammar = person_grammar();
        assert_eq!(grammar.parse("_LIMIT=30").unwrap(), grammar.parse("").unwrap());
    }

    #[test]
    fn test_not_lt_normalizes_to_gte() {
        let grammar = person_grammar();
        for query in ["age_NOT_LT=18", "ageNotLess=18"] {
            let filter = single_row(&grammar.parse(query).unwrap(), "age");
            assert_eq!(filter.operator, Operator::Gte, "query: {}", query);
            assert!(!filter.invert, "query: {}", query);
            assert_eq!(filter.value, json!(18));
        }
    }

    #[test]
    fn test_not_gte_normalizes_to_lt() {
        let filter = single_row(&person_grammar().parse("age_NOT_GTE=65").unwrap(), "age");
        assert_eq!(filter.operator, Operator::Lt);
        assert!(!filter.invert);
    }

    #[test]
    fn test_not_like_keeps_negation_flag() {
        let filter = single_row(
            &person_grammar().parse("firstName_NOT_LIKE=Jo%25").unwrap(),
            "firstName",
        );
        assert_eq!(filter.operator, Operator::Like);
        assert!(filter.invert);
        assert_eq!(filter.value, json!("Jo%"));
    }

    #[test]
    fn test_case_sensitive_suffix() {
        let grammar = person_grammar();
        let sensitive = single_row(
            &grammar.parse("firstNameCaseSensitive=John").unwrap(),
            "firstName",
        );
        assert!(sensitive.case_sensitive);

        // _I wins over CaseSensitive.
        let forced = single_row(
            &grammar.parse("firstNameCaseSensitive_I=John").unwrap(),
            "firstName",
        );
        assert!(!forced.case_sensitive);
    }

    #[test]
    fn test_longer_property_is_not_shadowed_by_operator_suffix() {
        // `valueIn` is a real property; it must not parse as `value` + `In`.
        let tree = person_grammar().parse("valueIn=abc").unwrap();
        let filter = single_row(&tree, "valueIn");
        assert_eq!(filter.operator, Operator::In);
        assert_eq!(filter.value, json!(["abc"]));
        // The shorter property still works on its own.
        let filter = single_row(&person_grammar().parse("valueIn=5&value=5").unwrap(), "value");
        assert_eq!(filter.value, json!([5]));
    }

    #[test]
    fn test_legacy_alias_shadowed_by_property() {
        let grammar = person_grammar();

        // `limit` is a real property here, so the bare alias is a row filter...
        let tree = grammar.parse("limit=5").unwrap();
        assert_eq!(single_row(&tree, "limit").value, json!([5]));

        // ...while the canonical token still reaches the list controls.
        let tree = grammar.parse("_LIMIT=5").unwrap();
        let limit = tree
            .list_controls
            .iter()
            .find(|c| c.parameter == ListParam::Limit)
            .unwrap();
        assert_eq!(limit.value, json!(5));

        // `offset` is not shadowed, so its alias works.
        let tree = grammar.parse("offset=40").unwrap();
        let offset = tree
            .list_controls
            .iter()
            .find(|c| c.parameter == ListParam::Offset)
            .unwrap();
        assert_eq!(offset.value, json!(40));
    }

    #[test]
    fn test_limit_above_max_is_rejected() {
        let err = person_grammar().parse("_LIMIT=1000").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Constraint { constraint: "maximum", .. }
        ));
    }

    #[test]
    fn test_max_length_constraint() {
        let long_name = "x".repeat(51);
        let err = person_grammar()
            .parse(&format!("firstName={}", long_name))
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::Constraint { constraint: "maxLength", .. }
        ));
    }

    #[test]
    fn test_enum_constraint() {
        let err = person_grammar().parse("status=weird").unwrap_err();
        assert!(matches!(err, ParseError::Constraint { constraint: "enum", .. }));
    }

    #[test]
    fn test_pattern_constraint() {
        let err = person_grammar().parse("zip=12a4").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Constraint { constraint: "pattern", .. }
        ));
        assert!(person_grammar().parse("zip=1204").is_ok());
    }

    #[test]
    fn test_multiple_of_constraint() {
        let grammar = person_grammar();
        assert!(grammar.parse("height_GTE=1.75").is_ok());
        let err = grammar.parse("height_GTE=1.8").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Constraint { constraint: "multipleOf", .. }
        ));
    }

    #[test]
    fn test_minimum_constraint_on_row_value() {
        let err = person_grammar().parse("age_GTE=-1").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Constraint { constraint: "minimum", .. }
        ));
    }

    #[test]
    fn test_boolean_coercion() {
        let grammar = person_grammar();
        let falsy = single_row(&grammar.parse("active=false").unwrap(), "active");
        assert_eq!(falsy.value, json!([false]));
        let truthy = single_row(&grammar.parse("active=1").unwrap(), "active");
        assert_eq!(truthy.value, json!([true]));
    }

    #[test]
    fn test_invalid_integer_is_structured_failure() {
        let err = person_grammar().parse("age=abc").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidValue { expected: "integer", .. }
        ));
    }

    #[test]
    fn test_single_valued_slot_rejects_multiple_elements() {
        let err = person_grammar().parse("age_GTE=1,2").unwrap_err();
        assert!(matches!(
            err,
            ParseError::SingleValueExpected { count: 2, .. }
        ));
    }

    #[test]
    fn test_plus_and_percent_decoding() {
        let grammar = person_grammar();
        let plus = single_row(&grammar.parse("firstName=John+Doe").unwrap(), "firstName");
        let pct = single_row(&grammar.parse("firstName=John%20Doe").unwrap(), "firstName");
        assert_eq!(plus.value, json!(["John Doe"]));
        assert_eq!(plus, pct);
    }

    #[test]
    fn test_percent_encoded_comma_separates_elements() {
        let tree = person_grammar().parse("key_IN=1%2C2").unwrap();
        assert_eq!(single_row(&tree, "key").value, json!(["1", "2"]));
    }

    #[test]
    fn test_parenthesis_wrapped_arrays() {
        let grammar = person_grammar();
        assert_eq!(
            grammar.parse("key_IN=(1,2,3)").unwrap(),
            grammar.parse("key_IN=1,2,3").unwrap()
        );
    }

    #[test]
    fn test_multi_valued_property_always_wraps() {
        let tree = person_grammar().parse("tags_CONTAINS=red,blue").unwrap();
        let filter = single_row(&tree, "tags");
        assert_eq!(filter.operator, Operator::Contains);
        assert_eq!(filter.value, json!(["red", "blue"]));

        // Even with a single-valued operator, the array-typed property wraps.
        let tree = person_grammar().parse("tags_LIKE=urgent").unwrap();
        assert_eq!(single_row(&tree, "tags").value, json!(["urgent"]));
    }

    #[test]
    fn test_unknown_parameter() {
        let err = person_grammar().parse("frobnicate=1").unwrap_err();
        assert_eq!(err, ParseError::UnknownParameter("frobnicate".into()));
    }

    #[test]
    fn test_order_by_validates_properties() {
        let grammar = person_grammar();
        assert!(grammar.parse("_ORDERBY=firstName,age").is_ok());
        assert!(grammar.parse("_ORDERBY=$$meta.created,key").is_ok());
        let err = grammar.parse("_ORDERBY=bogus").unwrap_err();
        assert!(matches!(err, ParseError::UnknownProperty { .. }));
    }

    #[test]
    fn test_include_count_and_descending() {
        let tree = person_grammar()
            .parse("_INCLUDECOUNT=true&descending=true")
            .unwrap();
        let count = tree
            .list_controls
            .iter()
            .find(|c| c.parameter == ListParam::IncludeCount)
            .unwrap();
        let descending = tree
            .list_controls
            .iter()
            .find(|c| c.parameter == ListParam::Descending)
            .unwrap();
        assert_eq!(count.value, json!(true));
        assert_eq!(descending.value, json!(true));
    }

    #[test]
    fn test_omit_column_filter() {
        let tree = person_grammar().parse("omit=firstName,age").unwrap();
        assert_eq!(tree.column_filters.len(), 1);
        assert_eq!(tree.column_filters[0].operator, ColumnOp::Omit);
        assert_eq!(
            tree.column_filters[0].properties,
            vec!["firstName".to_string(), "age".to_string()]
        );

        let err = person_grammar().parse("omit=bogus").unwrap_err();
        assert!(matches!(err, ParseError::UnknownProperty { .. }));
    }

    #[test]
    fn test_row_filters_sort_by_property_then_operator() {
        let tree = person_grammar()
            .parse("lastName=Doe&age_LT=65&age_GTE=18")
            .unwrap();
        let keys: Vec<(String, &str)> = tree
            .row_filters
            .iter()
            .map(|f| (f.property.clone(), f.operator.name()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("age".to_string(), "GTE"),
                ("age".to_string(), "LT"),
                ("lastName".to_string(), "IN"),
            ]
        );
    }
}
