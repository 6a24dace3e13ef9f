use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::schema::ColumnType;

/// Tokens that load as null regardless of column type.
pub const NULL_TOKENS: &[&str] = &["na", "n/a", "nan", "null", "none"];

/// A typed, non-null cell. Nulls are represented as `Option::None`.
///
/// Integers and floats compare numerically with each other, so a column that
/// was inferred as `Integer` on one side and `Float` on the other still
/// matches row for row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    String(String),
}

pub type Cell = Option<Value>;

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// The column type this value parses as.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Date(_) => ColumnType::Date,
            Value::DateTime(_) => ColumnType::DateTime,
            Value::String(_) => ColumnType::String,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Date(_) => 2,
            Value::DateTime(_) => 3,
            Value::String(_) => 4,
        }
    }

    /// Equality used when comparing a source cell against its target
    /// counterpart. `tolerance` applies to numeric pairs only.
    ///
    /// The two sides infer column types independently, so one stray field
    /// can leave a column typed `String` on one side only. A string cell is
    /// therefore re-read under its counterpart's type before comparing.
    pub fn matches(&self, other: &Value, tolerance: f64) -> bool {
        if self.rank() != other.rank() {
            return match (self, other) {
                (Value::String(raw), typed) | (typed, Value::String(raw)) => {
                    parse_as(raw.trim(), typed.column_type())
                        .is_some_and(|parsed| parsed.matches(typed, tolerance))
                }
                _ => self.as_display() == other.as_display(),
            };
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(left), Some(right)) if tolerance > 0.0 => (left - right).abs() <= tolerance,
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Boolean(b) => b.hash(state),
            // An integer only equals a float holding it exactly, so equal
            // numerics share their f64 bit pattern.
            Value::Integer(_) | Value::Float(_) => {
                self.as_f64().unwrap_or_default().to_bits().hash(state)
            }
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::String(s) => s.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Integer(a), Value::Float(b)) => cmp_integer_float(*a, *b),
            (Value::Float(a), Value::Integer(b)) => cmp_integer_float(*b, *a).reverse(),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Orders an integer against a float without rounding the integer through
/// `f64`, consistent with `f64::total_cmp`: `-0.0` sits just below zero and
/// NaNs sort to the ends by sign.
fn cmp_integer_float(integer: i64, float: f64) -> Ordering {
    // 2^63, the first float past i64::MAX.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= BOUND {
        return Ordering::Less;
    }
    if float < -BOUND {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    match integer.cmp(&(whole as i64)) {
        Ordering::Equal if float > whole => Ordering::Less,
        Ordering::Equal if float < whole => Ordering::Greater,
        Ordering::Equal if float == 0.0 && float.is_sign_negative() => Ordering::Greater,
        other => other,
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Orders nullable cells with nulls first; used as the key of every
/// key-ordered map in the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComparableValue(pub Option<Value>);

impl ComparableValue {
    pub fn from_cell(cell: &Cell) -> Self {
        ComparableValue(cell.clone())
    }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => write!(f, "{value}"),
            None => Ok(()),
        }
    }
}

pub fn format_cell(cell: &Cell) -> String {
    cell.as_ref().map(Value::as_display).unwrap_or_default()
}

pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || NULL_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parses a raw field according to the column type inferred for it.
///
/// Inference guarantees every non-null field of a column parses as the
/// column's type; a field that still fails falls back to a string cell
/// rather than aborting the load.
pub fn parse_typed_value(value: &str, ty: ColumnType) -> Cell {
    if is_null_token(value) {
        return None;
    }
    Some(parse_as(value.trim(), ty).unwrap_or_else(|| Value::String(value.to_string())))
}

/// Parses a trimmed, non-null field as `ty`. `String` never parses here so
/// callers can tell a typed value from a fallback.
pub fn parse_as(trimmed: &str, ty: ColumnType) -> Option<Value> {
    match ty {
        ColumnType::String => None,
        ColumnType::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Float => trimmed.parse::<f64>().ok().map(Value::Float),
        ColumnType::Boolean => parse_boolean(trimmed).map(Value::Boolean),
        ColumnType::Date => parse_naive_date(trimmed).map(Value::Date),
        ColumnType::DateTime => parse_naive_datetime(trimmed).map(Value::DateTime),
    }
}
