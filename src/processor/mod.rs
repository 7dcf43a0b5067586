use std::hash::Hash;
use std::hash::Hasher;
use thiserror::Error;

pub mod column;
pub mod dataset;
pub mod table;

use column::ColumnType;

/// Errors raised while turning a tabular source into a dataset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Missing header line")]
    MissingHeader,

    #[error("Malformed row {}: {}", .0.row, .0.reason)]
    Malformed(ParseError),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Column '{column}' must be of type {expected}")]
    ColumnType { column: String, expected: ColumnType },
}

/// Errors raised when a statistic is undefined for its input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("empty subgroup: {0}")]
    EmptySubgroup(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' is not {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("Predicate & column-type combination not supported on '{0}'")]
    UnsupportedPredicate(String),

    #[error("Invalid bins: {0}")]
    InvalidBins(String),
}

impl ComputationError {
    pub(crate) fn empty(what: impl Into<String>) -> Self {
        ComputationError::EmptySubgroup(what.into())
    }
}

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

/// First malformed row.
///
/// `row` is the 1-based line number in the source, header included.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub row: usize,
    pub reason: String,
}

/// Value helper for predicates (owned for simplicity)
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer column
    Int(i64),
    /// Float column
    Float(f64),
    /// String column
    Str(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Filter predicate
///
/// String columns accept `Equals`, `OneOf` and `NoneOf` with string values.
/// Numeric columns accept every variant with numeric values, compared as `f64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterPredicate {
    Equals(Value),
    GreaterThan(Value),
    LessThan(Value),
    AtLeast(Value),
    AtMost(Value),
    /// Inclusive on both ends
    Between(Value, Value),
    OneOf(Vec<Value>),
    NoneOf(Vec<Value>),
}

/// Conjunction of per-column predicates. The empty condition matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    clauses: Vec<(String, FilterPredicate)>,
}

impl Condition {
    /// Matches every record
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(column: &str, predicate: FilterPredicate) -> Self {
        Self::all().and(column, predicate)
    }

    /// Shorthand for `column == value` on a string column
    pub fn equals(column: &str, value: &str) -> Self {
        Self::new(column, FilterPredicate::Equals(Value::from(value)))
    }

    /// Add a clause
    pub fn and(mut self, column: &str, predicate: FilterPredicate) -> Self {
        self.clauses.push((column.to_string(), predicate));
        self
    }

    pub fn clauses(&self) -> &[(String, FilterPredicate)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Result of a numeric aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateResult {
    Int(i64),
    Float(f64),
}
