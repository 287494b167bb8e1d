use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::error::{CensusError, Result};

// ---------------------------------------------------------------------------
// FieldValue – a single cell of a county record
// ---------------------------------------------------------------------------

/// A dynamically-typed field value as found in the JSON payload.
/// Years are collected into a `BTreeSet`, so `FieldValue` must be `Ord`.
///
/// Numbers compare by value, so `Integer(2020)` and `Float(2020.0)` are the
/// same year. Text never equals a number: `String("2020")` is a different year.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Canonical form of a number: integral floats that fit in an `i64` collapse
/// onto the integer, so `-0.0`, `0.0` and `0` are one value.
#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    fn of(v: &FieldValue) -> Option<Number> {
        match *v {
            FieldValue::Integer(i) => Some(Number::Int(i)),
            FieldValue::Float(f) => {
                // -2^63 <= f < 2^63
                if f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 {
                    Some(Number::Int(f as i64))
                } else {
                    Some(Number::Real(f))
                }
            }
            _ => None,
        }
    }

    fn cmp(self, other: Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (Number::Real(a), Number::Real(b)) => a.total_cmp(&b),
            // a non-integral or out-of-range float never equals an i64; the
            // only f64 tie is i64::MAX against 2^63, which is larger
            (Number::Int(a), Number::Real(b)) => (a as f64).total_cmp(&b).then(Ordering::Less),
            (Number::Real(a), Number::Int(b)) => a.total_cmp(&(b as f64)).then(Ordering::Greater),
        }
    }
}

// -- Manual Eq/Ord/Hash so we can put FieldValue in BTreeSet --

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use FieldValue::*;
        fn rank(v: &FieldValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                String(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Integer(_) | Float(_), Integer(_) | Float(_)) => match (Number::of(self), Number::of(other)) {
                (Some(a), Some(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            FieldValue::Null => 0u8.hash(state),
            FieldValue::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            FieldValue::Integer(_) | FieldValue::Float(_) => match Number::of(self) {
                Some(Number::Int(i)) => {
                    2u8.hash(state);
                    i.hash(state);
                }
                Some(Number::Real(f)) => {
                    3u8.hash(state);
                    f.to_bits().hash(state);
                }
                None => {}
            },
            FieldValue::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{s:?}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    /// Numeric view used for population arithmetic. Booleans are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<&FieldValue> for FieldValue {
    fn from(v: &FieldValue) -> Self {
        v.clone()
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

// ---------------------------------------------------------------------------
// Record – one county/year observation
// ---------------------------------------------------------------------------

/// A flat mapping of field name → value. No fixed schema: the year and
/// population fields are looked up by name at query time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for literal records.
    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: String, value: FieldValue) {
        self.fields.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Like [`Record::get`] but a missing key is a [`CensusError::MissingKey`].
    pub fn require(&self, key: &str) -> Result<&FieldValue> {
        self.fields
            .get(key)
            .ok_or_else(|| CensusError::MissingKey(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one element of the loaded sequence
// ---------------------------------------------------------------------------

/// The payload is only loosely trusted: an element that is not a JSON object
/// is kept as a scalar so that queries can report the wrong data shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Record(Record),
    Scalar(FieldValue),
}

impl Row {
    /// The record behind this row, or a type mismatch for scalar rows.
    pub fn as_record(&self) -> Result<&Record> {
        match self {
            Row::Record(r) => Ok(r),
            Row::Scalar(v) => Err(CensusError::TypeMismatch(format!(
                "expected a record, found {} {v}",
                v.kind()
            ))),
        }
    }
}

impl From<Record> for Row {
    fn from(r: Record) -> Self {
        Row::Record(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn text_never_equals_a_number() {
        assert_ne!(FieldValue::from(2020), FieldValue::from("2020"));
        assert_ne!(FieldValue::from(2020.0), FieldValue::from("2020"));
        assert_eq!(FieldValue::from("2020"), FieldValue::String("2020".into()));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(FieldValue::from(2020), FieldValue::from(2020.0));
        assert_eq!(FieldValue::from(0), FieldValue::from(-0.0));
        assert_eq!(FieldValue::from(-0.0), FieldValue::from(0.0));
        assert_ne!(FieldValue::from(2020), FieldValue::from(2020.5));
        assert!(FieldValue::from(2020) < FieldValue::from(2020.5));
        assert!(FieldValue::from(2021) > FieldValue::from(2020.5));
        assert!(FieldValue::from(i64::MAX) < FieldValue::from(9_223_372_036_854_775_808.0));
    }

    #[test]
    fn nan_is_equal_to_itself() {
        let nan = FieldValue::from(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_ne!(nan, FieldValue::from(0));
    }

    #[test]
    fn equal_numbers_hash_alike() {
        use std::collections::HashSet;
        let set: HashSet<FieldValue> = [
            FieldValue::from(2020),
            FieldValue::from(2020.0),
            FieldValue::from(0.0),
            FieldValue::from(-0.0),
            FieldValue::from("2020"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn values_collapse_in_a_set() {
        let set: BTreeSet<FieldValue> = ["2019", "2020", "2019"]
            .into_iter()
            .map(FieldValue::from)
            .chain([FieldValue::from(2020), FieldValue::from(2020.0)])
            .collect();
        assert_eq!(set.len(), 3);
        // numbers rank before strings
        assert_eq!(set.iter().next(), Some(&FieldValue::Integer(2020)));
    }

    #[test]
    fn booleans_are_not_numeric() {
        assert_eq!(FieldValue::from(true).as_f64(), None);
        assert_eq!(FieldValue::from(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::from(3.0).as_i64(), None);
    }

    #[test]
    fn require_reports_missing_key() {
        let rec = Record::new().with("Year", "2020");
        assert!(rec.require("Year").is_ok());
        match rec.require("Population") {
            Err(CensusError::MissingKey(k)) => assert_eq!(k, "Population"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scalar_row_is_type_mismatch() {
        let row = Row::Scalar(FieldValue::from("test"));
        assert!(matches!(row.as_record(), Err(CensusError::TypeMismatch(_))));
    }

    #[test]
    fn record_serializes_flat() {
        let rec = Record::new()
            .with("Year", "2020")
            .with("Population", 51765)
            .with("Note", FieldValue::Null);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Year": "2020", "Population": 51765, "Note": null})
        );
    }
}
