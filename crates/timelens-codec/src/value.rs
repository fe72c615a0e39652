//! The wire value model

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::error::{CodecError, Result};

/// A value as seen by the inspection panel.
///
/// `Number` only ever holds finite values; use [`InspectValue::number`] to
/// build numbers so that NaN and the infinities land in their own variants.
#[derive(Debug, Clone, PartialEq)]
pub enum InspectValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    NaN,
    Infinity,
    NegativeInfinity,
    String(String),
    Array(Vec<InspectValue>),
    Object(BTreeMap<String, InspectValue>),
    Date(DateTime<Utc>),
    RegExp { source: String, flags: String },
    /// Entries in insertion order; keys may be any value
    Map(Vec<(InspectValue, InspectValue)>),
    Set(Vec<InspectValue>),
    Error { name: String, message: String },
    /// Functions never round-trip; only their name survives
    Function { name: String },
    BigInt(String),
}

impl InspectValue {
    /// Build a number, routing non-finite values to their variants
    pub fn number(n: f64) -> Self {
        if n.is_nan() {
            InspectValue::NaN
        } else if n == f64::INFINITY {
            InspectValue::Infinity
        } else if n == f64::NEG_INFINITY {
            InspectValue::NegativeInfinity
        } else {
            InspectValue::Number(n)
        }
    }

    /// Build an object from key/value pairs
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, InspectValue)>,
        K: Into<String>,
    {
        InspectValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short type name used in envelopes and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            InspectValue::Undefined => "undefined",
            InspectValue::Null => "null",
            InspectValue::Bool(_) => "boolean",
            InspectValue::Number(_)
            | InspectValue::NaN
            | InspectValue::Infinity
            | InspectValue::NegativeInfinity => "number",
            InspectValue::String(_) => "string",
            InspectValue::Array(_) => "array",
            InspectValue::Object(_) => "object",
            InspectValue::Date(_) => "date",
            InspectValue::RegExp { .. } => "regexp",
            InspectValue::Map(_) => "map",
            InspectValue::Set(_) => "set",
            InspectValue::Error { .. } => "error",
            InspectValue::Function { .. } => "function",
            InspectValue::BigInt(_) => "bigint",
        }
    }

    /// Convert into a plain store value.
    ///
    /// `undefined` becomes null, dates become RFC 3339 strings, sets become
    /// arrays and maps with string keys become objects. Bigints that fit in
    /// 64 bits become integers. Anything else has no state representation
    /// and is rejected.
    pub fn into_state(self) -> Result<Value> {
        Ok(match self {
            InspectValue::Undefined | InspectValue::Null => Value::Null,
            InspectValue::Bool(b) => Value::Bool(b),
            InspectValue::Number(n) => json_number(n),
            InspectValue::String(s) => Value::String(s),
            InspectValue::Date(date) => {
                Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            InspectValue::Array(items) | InspectValue::Set(items) => Value::Array(
                items
                    .into_iter()
                    .map(InspectValue::into_state)
                    .collect::<Result<_>>()?,
            ),
            InspectValue::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| Ok((k, v.into_state()?)))
                    .collect::<Result<Map<_, _>>>()?,
            ),
            InspectValue::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let InspectValue::String(key) = key else {
                        return Err(CodecError::Unrepresentable("map with non-string keys"));
                    };
                    map.insert(key, value.into_state()?);
                }
                Value::Object(map)
            }
            InspectValue::BigInt(digits) => match digits.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => digits
                    .parse::<u64>()
                    .map(Value::from)
                    .map_err(|_| CodecError::Unrepresentable("bigint beyond 64 bits"))?,
            },
            InspectValue::NaN | InspectValue::Infinity | InspectValue::NegativeInfinity => {
                return Err(CodecError::Unrepresentable("non-finite number"))
            }
            other => return Err(CodecError::Unrepresentable(other.type_name())),
        })
    }
}

/// Largest integer a float holds exactly along with all its neighbours
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Integral values inside the safe integer range are written as integers
pub(crate) fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<&Value> for InspectValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => InspectValue::Null,
            Value::Bool(b) => InspectValue::Bool(*b),
            Value::Number(n) => from_json_number(n),
            Value::String(s) => InspectValue::String(s.clone()),
            Value::Array(items) => InspectValue::Array(items.iter().map(InspectValue::from).collect()),
            Value::Object(fields) => InspectValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), InspectValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Integers a float cannot hold exactly become bigints
fn from_json_number(n: &Number) -> InspectValue {
    let unsafe_integer = match (n.as_i64(), n.as_u64()) {
        (Some(i), _) => i.unsigned_abs() > MAX_SAFE_INTEGER,
        (None, Some(u)) => u > MAX_SAFE_INTEGER,
        (None, None) => false,
    };
    if unsafe_integer {
        return InspectValue::BigInt(n.to_string());
    }
    n.as_f64().map(InspectValue::number).unwrap_or(InspectValue::NaN)
}

impl From<Value> for InspectValue {
    fn from(value: Value) -> Self {
        InspectValue::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_routes_non_finite() {
        assert_eq!(InspectValue::number(f64::NAN), InspectValue::NaN);
        assert_eq!(InspectValue::number(f64::INFINITY), InspectValue::Infinity);
        assert_eq!(InspectValue::number(f64::NEG_INFINITY), InspectValue::NegativeInfinity);
        assert_eq!(InspectValue::number(1.5), InspectValue::Number(1.5));
    }

    #[test]
    fn test_from_json_and_back() {
        let state = json!({"count": 2, "items": ["a", null, true], "ratio": 0.5});
        let inspected = InspectValue::from(&state);
        assert_eq!(inspected.into_state().unwrap(), state);
    }

    #[test]
    fn test_into_state_flattens_collections() {
        let value = InspectValue::object([
            ("tags", InspectValue::Set(vec![InspectValue::String("x".into())])),
            (
                "lookup",
                InspectValue::Map(vec![(
                    InspectValue::String("k".into()),
                    InspectValue::Number(1.0),
                )]),
            ),
            ("gone", InspectValue::Undefined),
        ]);
        assert_eq!(
            value.into_state().unwrap(),
            json!({"tags": ["x"], "lookup": {"k": 1}, "gone": null})
        );
    }

    #[test]
    fn test_into_state_rejects_functions_and_nan() {
        let func = InspectValue::Function { name: "f".into() };
        assert!(matches!(func.into_state(), Err(CodecError::Unrepresentable("function"))));
        assert!(InspectValue::Array(vec![InspectValue::NaN]).into_state().is_err());

        let keyed = InspectValue::Map(vec![(InspectValue::Number(1.0), InspectValue::Null)]);
        assert!(keyed.into_state().is_err());
    }

    #[test]
    fn test_unsafe_integers_become_bigints() {
        let state = json!({"id": 9_007_199_254_740_993u64, "max": u64::MAX, "small": 42});
        let InspectValue::Object(fields) = InspectValue::from(&state) else {
            panic!("expected object");
        };
        assert_eq!(fields["id"], InspectValue::BigInt("9007199254740993".into()));
        assert_eq!(fields["max"], InspectValue::BigInt(u64::MAX.to_string()));
        assert_eq!(fields["small"], InspectValue::Number(42.0));
        assert_eq!(InspectValue::Object(fields).into_state().unwrap(), state);
    }

    #[test]
    fn test_oversized_bigint_is_unrepresentable() {
        let big = InspectValue::BigInt("123456789012345678901234567890".into());
        assert!(matches!(big.into_state(), Err(CodecError::Unrepresentable(_))));
    }

    #[test]
    fn test_json_number_integral() {
        assert_eq!(json_number(3.0), json!(3));
        assert_eq!(json_number(-0.25), json!(-0.25));
    }
}
