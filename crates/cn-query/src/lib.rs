//! # cn-query — The "Grammar" of CANON
//!
//! Turns a resource's flattened JSON Schema into a formal grammar for its
//! URL query strings, and parses those query strings into a structured
//! [`FilterTree`]: row filters (per-record predicates), column filters
//! (result-shape controls) and list-control parameters (paging, ordering).
//!
//! Syntax of a row filter parameter:
//! ```text
//! <property>[CaseSensitive]?[_NOT|Not]?[_GTE|GreaterOrEqual|...]?[_I]? = <value>
//! ```
//!
//! Two semantically equivalent query strings (different parameter order,
//! different default omissions) parse to *identical* trees: defaults are
//! merged in, `NOT`-able comparisons are rewritten to their complement,
//! and every subtree is canonically sorted.

pub mod error;
pub mod grammar;
pub mod normalize;
pub mod parser;
pub mod schema;

pub use error::ParseError;
pub use grammar::{flat_query_grammar, non_flat_query_grammar, ConfigDefaults, Grammar, ResourceDefaults};
pub use schema::{FlattenedSchema, PrimitiveKind, PropertyDescriptor};

use serde::{Deserialize, Serialize};

/// Row-filter comparison operators.
///
/// `In`, `Overlaps` and `Contains` are inherently multi-valued: their value
/// is always an array, regardless of how many elements the raw input had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    In,
    Overlaps,
    Contains,
    Gte,
    Lte,
    Gt,
    Lt,
    Like,
}

impl Operator {
    /// Operator name as it appears in canonical trees and sort keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Overlaps => "OVERLAPS",
            Self::Contains => "CONTAINS",
            Self::Gte => "GTE",
            Self::Lte => "LTE",
            Self::Gt => "GT",
            Self::Lt => "LT",
            Self::Like => "LIKE",
        }
    }

    /// Canonical underscore token accepted in parameter names.
    pub fn canonical_token(&self) -> &'static str {
        match self {
            Self::In => "_IN",
            Self::Overlaps => "_OVERLAPS",
            Self::Contains => "_CONTAINS",
            Self::Gte => "_GTE",
            Self::Lte => "_LTE",
            Self::Gt => "_GT",
            Self::Lt => "_LT",
            Self::Like => "_LIKE",
        }
    }

    /// Human-readable alias accepted in parameter names.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::In => "In",
            Self::Overlaps => "Overlaps",
            Self::Contains => "Contains",
            Self::Gte => "GreaterOrEqual",
            Self::Lte => "LessOrEqual",
            Self::Gt => "Greater",
            Self::Lt => "Less",
            Self::Like => "Like",
        }
    }

    /// `true` for operators whose value is always an array.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Self::In | Self::Overlaps | Self::Contains)
    }

    /// The algebraic complement used to eliminate negation:
    /// `NOT LT` ≡ `GTE`, `NOT GT` ≡ `LTE`, and vice versa.
    /// Operators without an exact complement return `None` and keep their
    /// negation flag through normalization.
    pub fn complement(&self) -> Option<Operator> {
        match self {
            Self::Lt => Some(Self::Gte),
            Self::Gt => Some(Self::Lte),
            Self::Gte => Some(Self::Lt),
            Self::Lte => Some(Self::Gt),
            _ => None,
        }
    }
}

/// A per-record predicate parsed from one query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub property: String,
    pub operator: Operator,
    /// Negation flag; only set for operators without an algebraic complement.
    pub invert: bool,
    /// Comparisons default to case-insensitive.
    pub case_sensitive: bool,
    /// Coerced value: an array iff the property or the operator is
    /// multi-valued.
    pub value: serde_json::Value,
}

/// Column-filter kinds (result-shape controls).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOp {
    Include,
    Omit,
}

impl ColumnOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Include => "INCLUDE",
            Self::Omit => "OMIT",
        }
    }

    pub fn canonical_token(&self) -> &'static str {
        match self {
            Self::Include => "_INCLUDE",
            Self::Omit => "_OMIT",
        }
    }

    pub fn alias(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Omit => "omit",
        }
    }
}

/// A property-selection control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub operator: ColumnOp,
    pub properties: Vec<String>,
}

/// The fixed list-control vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListParam {
    Limit,
    Offset,
    KeyOffset,
    Expansion,
    IncludeCount,
    OrderBy,
    Descending,
}

impl ListParam {
    pub const ALL: [ListParam; 7] = [
        Self::Limit,
        Self::Offset,
        Self::KeyOffset,
        Self::Expansion,
        Self::IncludeCount,
        Self::OrderBy,
        Self::Descending,
    ];

    /// Canonical underscore-prefixed parameter name.
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::Limit => "_LIMIT",
            Self::Offset => "_OFFSET",
            Self::KeyOffset => "_KEYOFFSET",
            Self::Expansion => "_EXPANSION",
            Self::IncludeCount => "_INCLUDECOUNT",
            Self::OrderBy => "_ORDERBY",
            Self::Descending => "_DESCENDING",
        }
    }

    /// Legacy bare alias, only accepted when no resource property of the
    /// exact same name exists.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Offset => "offset",
            Self::KeyOffset => "keyOffset",
            Self::Expansion => "expand",
            Self::IncludeCount => "includeCount",
            Self::OrderBy => "orderBy",
            Self::Descending => "descending",
        }
    }
}

/// A pagination/ordering/metadata directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListControl {
    pub parameter: ListParam,
    pub value: serde_json::Value,
}

/// Parse result: three canonically ordered subtrees. A pure value object —
/// created fresh per parse call, immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterTree {
    pub row_filters: Vec<RowFilter>,
    pub column_filters: Vec<ColumnFilter>,
    pub list_controls: Vec<ListControl>,
}
