//! Typed record shapes.
//!
//! Every list page works on records of a single type. A record type names its
//! columns through an associated [`Field`] enum, so a page configured against a
//! field that does not exist fails to compile instead of silently matching nothing.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use crate::column::Columns;
use crate::domain::{AdmError, ConfigError};
use crate::source::RawRow;

/// A single field value as the engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Single-level nested object, e.g. the exam center an applicant is assigned to.
    Nested(Vec<(&'static str, Value)>),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Case-insensitive substring test on the string form. `needle` must already be lowercase.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        needle.is_empty() || self.to_string().to_lowercase().contains(needle)
    }

    /// Raw comparison used for sorting.
    ///
    /// Numbers compare numerically across `Int`/`Float`, text by code point and
    /// `false < true`. Missing values are greater than any present value.
    pub fn raw_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Missing, _) => Ordering::Greater,
            (_, Missing) => Ordering::Less,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Text(a), Text(b)) => a.cmp(b),
            (Nested(a), Nested(b)) => a
                .iter()
                .map(|(_, v)| v)
                .zip(b.iter().map(|(_, v)| v))
                .map(|(x, y)| x.raw_cmp(y))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Nested(_) => 3,
            Value::Missing => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Nested(members) => {
                let mut first = true;
                for (_, value) in members.iter().filter(|(_, v)| !v.is_missing()) {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// Static shape of a field, known without looking at any record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Primitive,
    Nested,
}

pub trait Field: Copy + Eq + Hash + fmt::Debug + 'static {
    /// All fields of the record shape, in display order.
    fn all() -> &'static [Self];

    fn name(self) -> &'static str;

    fn kind(self) -> FieldKind {
        FieldKind::Primitive
    }
}

pub trait Record: Clone {
    type Field: Field;

    fn value(&self, field: Self::Field) -> Value;
}

/// A record kind that can back a list page: it knows how to build itself from a
/// loaded row and which columns its page shows.
pub trait ListRecord: Record {
    /// Human readable name of the list, e.g. "Applicants".
    const TITLE: &'static str;

    fn from_row(row: &RawRow<'_>) -> Result<Self, AdmError>;

    fn columns() -> Result<Columns<Self>, ConfigError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form_of_values() {
        assert_eq!(Value::Missing.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Float(25.0).to_string(), "25");
        assert_eq!(Value::Float(81.5).to_string(), "81.5");
        let nested = Value::Nested(vec![
            ("name", Value::from("North Hall")),
            ("code", Value::from("NH-01")),
        ]);
        assert_eq!(nested.to_string(), "North Hall, NH-01");
    }

    #[test]
    fn contains_is_case_insensitive() {
        let v = Value::from("Ann Smith");
        assert!(v.contains_lowercase("smi"));
        assert!(v.contains_lowercase(""));
        assert!(!v.contains_lowercase("bob"));
        assert!(Value::Missing.contains_lowercase(""));
        assert!(!Value::Missing.contains_lowercase("a"));
    }

    #[test]
    fn raw_cmp_orders_numbers_across_kinds() {
        assert_eq!(Value::Int(2).raw_cmp(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Float(3.0).raw_cmp(&Value::Int(3)), Ordering::Equal);
        assert_eq!(Value::Float(f64::NAN).raw_cmp(&Value::Float(f64::NAN)), Ordering::Equal);
    }

    #[test]
    fn raw_cmp_puts_missing_last() {
        assert_eq!(Value::Missing.raw_cmp(&Value::Int(1)), Ordering::Greater);
        assert_eq!(Value::from("a").raw_cmp(&Value::Missing), Ordering::Less);
        assert_eq!(Value::Missing.raw_cmp(&Value::Missing), Ordering::Equal);
    }

    #[test]
    fn raw_cmp_booleans_and_text() {
        assert_eq!(Value::Bool(false).raw_cmp(&Value::Bool(true)), Ordering::Less);
        assert_eq!(Value::from("Ann").raw_cmp(&Value::from("Bob")), Ordering::Less);
        assert_eq!(Value::Bool(true).raw_cmp(&Value::from("a")), Ordering::Less);
    }

    #[test]
    fn optional_values_become_missing() {
        assert_eq!(Value::from(None::<i64>), Value::Missing);
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
    }
}
