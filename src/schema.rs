//! Column types and type inference for loaded tables.
//!
//! Every field of a column is offered to a [`TypeCandidate`] which drops the
//! types the field cannot be; the narrowest surviving type wins. Null tokens
//! are skipped, so a column of nulls stays `String`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{is_null_token, parse_boolean, parse_naive_date, parse_naive_datetime};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "String",
            ColumnType::Integer => "Integer",
            ColumnType::Float => "Float",
            ColumnType::Boolean => "Boolean",
            ColumnType::Date => "Date",
            ColumnType::DateTime => "DateTime",
        }
    }

    /// Integer and floating point columns feed the statistical detectors.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
    possible_boolean: bool,
    possible_date: bool,
    possible_datetime: bool,
    observed: usize,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            possible_boolean: true,
            possible_date: true,
            possible_datetime: true,
            observed: 0,
        }
    }

    fn observe(&mut self, raw: &str) {
        if is_null_token(raw) {
            return;
        }
        let value = raw.trim();
        self.observed += 1;
        if self.possible_boolean && parse_boolean(value).is_none() {
            self.possible_boolean = false;
        }
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.parse::<f64>().is_err() {
            self.possible_float = false;
        }
        if self.possible_date && parse_naive_date(value).is_none() {
            self.possible_date = false;
        }
        if self.possible_datetime && parse_naive_datetime(value).is_none() {
            self.possible_datetime = false;
        }
    }

    fn decide(&self) -> ColumnType {
        if self.observed == 0 {
            ColumnType::String
        } else if self.possible_boolean {
            ColumnType::Boolean
        } else if self.possible_integer {
            ColumnType::Integer
        } else if self.possible_float {
            ColumnType::Float
        } else if self.possible_date {
            ColumnType::Date
        } else if self.possible_datetime {
            ColumnType::DateTime
        } else {
            ColumnType::String
        }
    }
}

/// Infers the narrowest type that every non-null field parses as.
pub fn infer_column_type<'a, I>(fields: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::new();
    for field in fields {
        candidate.observe(field);
    }
    candidate.decide()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_column_ignores_null_tokens() {
        assert_eq!(
            infer_column_type(["1", "", "NA", "42"]),
            ColumnType::Integer
        );
    }

    #[test]
    fn mixed_integer_and_decimal_is_float() {
        assert_eq!(infer_column_type(["1", "2.5", "-3"]), ColumnType::Float);
    }

    #[test]
    fn dates_and_datetimes_are_detected() {
        assert_eq!(
            infer_column_type(["2024-01-01", "2024-02-29"]),
            ColumnType::Date
        );
        assert_eq!(
            infer_column_type(["2024-01-01 10:00:00", "2024-01-02T11:30:00"]),
            ColumnType::DateTime
        );
    }

    #[test]
    fn all_null_column_is_string() {
        assert_eq!(infer_column_type(["", "null"]), ColumnType::String);
    }

    #[test]
    fn boolean_words_win_over_strings() {
        assert_eq!(infer_column_type(["yes", "No", "t"]), ColumnType::Boolean);
        assert_eq!(infer_column_type(["yes", "maybe"]), ColumnType::String);
    }
}
