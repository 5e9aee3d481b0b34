//! # Grammar Compiler
//!
//! Compiles a [`FlattenedSchema`] plus resource defaults into a [`Grammar`]:
//! the rule set recognizing every valid query parameter of one resource.
//!
//! Property rules are ordered longest-name-first (then descending
//! lexicographically) because parameter names are matched by literal prefix
//! scanning: a short property name must never shadow a longer one it is a
//! prefix of.

use regex::Regex;
use serde_json::Value;

use crate::error::ParseError;
use crate::schema::{FlattenedSchema, PropertyDescriptor};
use crate::{normalize, parser, ColumnOp, FilterTree, ListParam};

/// Built-in default ordering: stable creation order with the key as
/// tie-breaker.
pub const DEFAULT_ORDER_BY: [&str; 2] = ["$$meta.created", "key"];

/// Framework-wide paging defaults, overridable per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigDefaults {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            default_limit: 30,
            max_limit: 500,
        }
    }
}

/// Per-resource overrides of the framework defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDefaults {
    pub default_limit: Option<u64>,
    pub max_limit: Option<u64>,
    pub order_by: Option<Vec<String>>,
}

/// Defaults as merged into one grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarDefaults {
    pub default_limit: u64,
    pub max_limit: u64,
    pub order_by: Vec<String>,
}

/// One recognized row-filter property.
#[derive(Debug)]
pub struct PropertyRule {
    pub name: String,
    pub descriptor: PropertyDescriptor,
    /// Compiled `pattern` constraint, if the descriptor declares one.
    pub(crate) pattern: Option<Regex>,
}

/// One recognized list-control parameter.
#[derive(Debug, Clone, Copy)]
pub struct ListControlRule {
    pub parameter: ListParam,
    /// Legacy bare alias is only accepted while no resource property of the
    /// exact same name exists.
    pub alias_enabled: bool,
}

/// One recognized column-filter parameter.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub operator: ColumnOp,
    pub alias_enabled: bool,
}

/// The compiled rule set for one resource's query strings.
pub struct Grammar {
    pub(crate) properties: Vec<PropertyRule>,
    pub(crate) list_controls: Vec<ListControlRule>,
    pub(crate) column_rules: Vec<ColumnRule>,
    pub(crate) defaults: GrammarDefaults,
}

impl Grammar {
    /// Parse a query string into a normalized, canonically sorted tree.
    pub fn parse(&self, query: &str) -> Result<FilterTree, ParseError> {
        let tree = parser::parse_raw(self, query)?;
        Ok(normalize::normalize(self, tree))
    }

    /// Look up a property rule by exact name.
    pub fn property(&self, name: &str) -> Option<&PropertyRule> {
        self.properties.iter().find(|rule| rule.name == name)
    }

    /// `true` when `name` is a resource property or a `$$meta.*` path.
    pub(crate) fn is_orderable(&self, name: &str) -> bool {
        self.property(name).is_some() || name.starts_with("$$meta.")
    }

    pub fn defaults(&self) -> &GrammarDefaults {
        &self.defaults
    }

    /// Flat dump of the rule set, one line per rule. Two grammars accepting
    /// the same language produce the same dump.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for rule in &self.properties {
            lines.push(format!(
                "row {} : {:?}{}",
                rule.name,
                rule.descriptor.kind,
                if rule.descriptor.multi_valued { "[]" } else { "" }
            ));
        }
        for rule in &self.column_rules {
            lines.push(format!(
                "column {}{}",
                rule.operator.canonical_token(),
                if rule.alias_enabled {
                    format!(" ({})", rule.operator.alias())
                } else {
                    String::new()
                }
            ));
        }
        for rule in &self.list_controls {
            lines.push(format!(
                "list {}{}",
                rule.parameter.canonical(),
                if rule.alias_enabled {
                    format!(" ({})", rule.parameter.alias())
                } else {
                    String::new()
                }
            ));
        }
        lines.push(format!(
            "defaults limit={} max={} orderBy={}",
            self.defaults.default_limit,
            self.defaults.max_limit,
            self.defaults.order_by.join(",")
        ));
        lines
    }
}

/// Compile the grammar for an already-flattened schema.
pub fn flat_query_grammar(
    schema: &FlattenedSchema,
    config: &ConfigDefaults,
    resource: &ResourceDefaults,
) -> Result<Grammar, ParseError> {
    let mut properties = Vec::with_capacity(schema.len());
    for (name, descriptor) in schema.iter() {
        let pattern = match &descriptor.pattern {
            Some(source) => Some(Regex::new(source).map_err(|e| {
                ParseError::Schema(format!("bad pattern for '{}': {}", name, e))
            })?),
            None => None,
        };
        properties.push(PropertyRule {
            name: name.to_string(),
            descriptor: descriptor.clone(),
            pattern,
        });
    }

    // Longest-name-first, then descending lexicographically: the parser's
    // prefix scan takes the first full match.
    properties.sort_by(|a, b| {
        b.name
            .len()
            .cmp(&a.name.len())
            .then_with(|| b.name.cmp(&a.name))
    });

    let list_controls = ListParam::ALL
        .iter()
        .map(|&parameter| ListControlRule {
            parameter,
            alias_enabled: !schema.contains(parameter.alias()),
        })
        .collect();

    let column_rules = [ColumnOp::Include, ColumnOp::Omit]
        .iter()
        .map(|&operator| ColumnRule {
            operator,
            alias_enabled: !schema.contains(operator.alias()),
        })
        .collect();

    let defaults = GrammarDefaults {
        default_limit: resource.default_limit.unwrap_or(config.default_limit),
        max_limit: resource.max_limit.unwrap_or(config.max_limit),
        order_by: resource
            .order_by
            .clone()
            .unwrap_or_else(|| DEFAULT_ORDER_BY.iter().map(|s| s.to_string()).collect()),
    };

    Ok(Grammar {
        properties,
        list_controls,
        column_rules,
        defaults,
    })
}

/// Compile the grammar for a nested JSON Schema, flattening it first.
pub fn non_flat_query_grammar(
    json_schema: &Value,
    config: &ConfigDefaults,
    resource: &ResourceDefaults,
) -> Result<Grammar, ParseError> {
    let flattened = FlattenedSchema::from_json_schema(json_schema)?;
    flat_query_grammar(&flattened, config, resource)
}
