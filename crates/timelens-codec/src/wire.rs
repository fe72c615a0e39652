//! Stringify/parse with custom-type revival
//!
//! Encoding rules:
//! - `undefined`, `NaN`, `Infinity` and `-Infinity` become sentinel strings.
//! - Dates and regular expressions become `[native <Type> <repr>]` strings.
//! - Maps, sets, errors, functions and bigints become
//!   `{"_custom": {"type": .., "display": .., "value": ..}}` envelopes.
//!
//! - Integers outside the exactly representable float range travel as
//!   `bigint` envelopes.
//!
//! A plain string that happens to equal a sentinel is indistinguishable from
//! the value it stands for; consumers share that limitation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::value::{json_number, InspectValue};

pub const UNDEFINED: &str = "__vue_devtool_undefined__";
pub const INFINITY: &str = "__vue_devtool_infinity__";
pub const NEGATIVE_INFINITY: &str = "__vue_devtool_negative_infinity__";
pub const NAN: &str = "__vue_devtool_nan__";

const CUSTOM_KEY: &str = "_custom";
const NATIVE_PREFIX: &str = "[native ";

/// Encode a value to JSON text
pub fn stringify(value: &InspectValue) -> String {
    encode(value).to_string()
}

/// Encode a plain store value to JSON text
pub fn stringify_json(value: &Value) -> String {
    stringify(&InspectValue::from(value))
}

/// Parse JSON text. With `revive` set, sentinels and envelopes are turned
/// back into their typed values; otherwise the raw JSON shape is returned.
pub fn parse(text: &str, revive_values: bool) -> Result<InspectValue> {
    let raw: Value = serde_json::from_str(text)?;
    let parsed = InspectValue::from(&raw);
    if revive_values {
        revive(parsed)
    } else {
        Ok(parsed)
    }
}

/// Revive sentinels and envelopes in an already-parsed value, bottom-up
pub fn revive(value: InspectValue) -> Result<InspectValue> {
    match value {
        InspectValue::String(s) => Ok(revive_string(s)),
        InspectValue::Array(items) => Ok(InspectValue::Array(
            items.into_iter().map(revive).collect::<Result<_>>()?,
        )),
        InspectValue::Object(fields) => {
            let mut fields = fields
                .into_iter()
                .map(|(k, v)| Ok((k, revive(v)?)))
                .collect::<Result<std::collections::BTreeMap<_, _>>>()?;
            let envelope_kind = match (fields.len(), fields.get(CUSTOM_KEY)) {
                (1, Some(InspectValue::Object(envelope))) => match envelope.get("type") {
                    Some(InspectValue::String(kind)) => Some(kind.clone()),
                    _ => None,
                },
                _ => None,
            };
            if let Some(kind) = envelope_kind {
                if let Some(InspectValue::Object(envelope)) = fields.remove(CUSTOM_KEY) {
                    return revive_envelope(&kind, envelope);
                }
            }
            Ok(InspectValue::Object(fields))
        }
        other => Ok(other),
    }
}

/// Sentinels and well-formed native strings revive; anything else, including
/// a malformed `[native ..]` string, stays a plain string
fn revive_string(s: String) -> InspectValue {
    match s.as_str() {
        UNDEFINED => return InspectValue::Undefined,
        INFINITY => return InspectValue::Infinity,
        NEGATIVE_INFINITY => return InspectValue::NegativeInfinity,
        NAN => return InspectValue::NaN,
        _ => {}
    }
    let native = match parse_native(&s) {
        Some(("Date", repr)) => DateTime::parse_from_rfc3339(repr)
            .ok()
            .map(|date| InspectValue::Date(date.with_timezone(&Utc))),
        Some(("RegExp", repr)) => split_regexp(repr).map(|(source, flags)| InspectValue::RegExp {
            source: source.to_string(),
            flags: flags.to_string(),
        }),
        _ => None,
    };
    native.unwrap_or(InspectValue::String(s))
}

/// `[native Type repr]` -> `(Type, repr)`
fn parse_native(s: &str) -> Option<(&str, &str)> {
    let inner = s.strip_prefix(NATIVE_PREFIX)?.strip_suffix(']')?;
    inner.split_once(' ')
}

/// `/source/flags` -> `(source, flags)`
fn split_regexp(repr: &str) -> Option<(&str, &str)> {
    let body = repr.strip_prefix('/')?;
    let end = body.rfind('/')?;
    Some((&body[..end], &body[end + 1..]))
}

fn revive_envelope(
    kind: &str,
    mut envelope: std::collections::BTreeMap<String, InspectValue>,
) -> Result<InspectValue> {
    let value = envelope.remove("value").unwrap_or(InspectValue::Undefined);
    match kind {
        "map" => {
            let InspectValue::Array(entries) = value else {
                return Err(CodecError::invalid_envelope(kind, "value is not an entry list"));
            };
            let entries = entries
                .into_iter()
                .map(|entry| match entry {
                    InspectValue::Array(pair) if pair.len() == 2 => {
                        let mut pair = pair.into_iter();
                        match (pair.next(), pair.next()) {
                            (Some(k), Some(v)) => Ok((k, v)),
                            _ => Err(CodecError::invalid_envelope("map", "short entry")),
                        }
                    }
                    _ => Err(CodecError::invalid_envelope("map", "entry is not a pair")),
                })
                .collect::<Result<_>>()?;
            Ok(InspectValue::Map(entries))
        }
        "set" => match value {
            InspectValue::Array(items) => Ok(InspectValue::Set(items)),
            _ => Err(CodecError::invalid_envelope(kind, "value is not a list")),
        },
        "error" => match value {
            InspectValue::Object(mut fields) => {
                let mut take = |key: &str| match fields.remove(key) {
                    Some(InspectValue::String(s)) => s,
                    _ => String::new(),
                };
                Ok(InspectValue::Error {
                    name: take("name"),
                    message: take("message"),
                })
            }
            _ => Err(CodecError::invalid_envelope(kind, "value is not an object")),
        },
        "function" => match value {
            InspectValue::String(name) => Ok(InspectValue::Function { name }),
            _ => Ok(InspectValue::Function {
                name: String::new(),
            }),
        },
        "bigint" => match value {
            InspectValue::String(digits) => Ok(InspectValue::BigInt(digits)),
            _ => Err(CodecError::invalid_envelope(kind, "value is not a string")),
        },
        other => {
            // Unknown envelopes are passed through untouched
            debug!(kind = other, "leaving unknown custom envelope as-is");
            envelope.insert("type".to_string(), InspectValue::String(other.to_string()));
            envelope.insert("value".to_string(), value);
            Ok(InspectValue::object([(CUSTOM_KEY, InspectValue::Object(envelope))]))
        }
    }
}

fn encode(value: &InspectValue) -> Value {
    match value {
        InspectValue::Undefined => Value::String(UNDEFINED.to_string()),
        InspectValue::Null => Value::Null,
        InspectValue::Bool(b) => Value::Bool(*b),
        InspectValue::Number(n) => json_number(*n),
        InspectValue::NaN => Value::String(NAN.to_string()),
        InspectValue::Infinity => Value::String(INFINITY.to_string()),
        InspectValue::NegativeInfinity => Value::String(NEGATIVE_INFINITY.to_string()),
        InspectValue::String(s) => Value::String(s.clone()),
        InspectValue::Array(items) => Value::Array(items.iter().map(encode).collect()),
        InspectValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), encode(v)))
                .collect::<Map<_, _>>(),
        ),
        InspectValue::Date(date) => Value::String(format!(
            "{}Date {}]",
            NATIVE_PREFIX,
            date.to_rfc3339_opts(SecondsFormat::Millis, true)
        )),
        InspectValue::RegExp { source, flags } => {
            Value::String(format!("{}RegExp /{}/{}]", NATIVE_PREFIX, source, flags))
        }
        InspectValue::Map(entries) => custom(
            "map",
            "Map".to_string(),
            Value::Array(
                entries
                    .iter()
                    .map(|(k, v)| Value::Array(vec![encode(k), encode(v)]))
                    .collect(),
            ),
        ),
        InspectValue::Set(items) => custom(
            "set",
            format!("Set[{}]", items.len()),
            Value::Array(items.iter().map(encode).collect()),
        ),
        InspectValue::Error { name, message } => custom(
            "error",
            format!("{}: {}", name, message),
            json!({ "name": name, "message": message }),
        ),
        InspectValue::Function { name } => custom(
            "function",
            format!("ƒ {}()", name),
            Value::String(name.clone()),
        ),
        InspectValue::BigInt(digits) => custom(
            "bigint",
            format!("BigInt {}", digits),
            Value::String(digits.clone()),
        ),
    }
}

fn custom(kind: &str, display: String, value: Value) -> Value {
    let mut envelope = Map::new();
    envelope.insert("type".to_string(), Value::String(kind.to_string()));
    envelope.insert("display".to_string(), Value::String(display));
    envelope.insert("value".to_string(), value);
    envelope.insert("readOnly".to_string(), Value::Bool(matches!(kind, "map" | "set")));

    let mut wrapper = Map::new();
    wrapper.insert(CUSTOM_KEY.to_string(), Value::Object(envelope));
    Value::Object(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_exact() {
        assert_eq!(stringify(&InspectValue::Undefined), format!("\"{}\"", UNDEFINED));
        assert_eq!(stringify(&InspectValue::NaN), format!("\"{}\"", NAN));
        assert_eq!(stringify(&InspectValue::Infinity), format!("\"{}\"", INFINITY));
        assert_eq!(
            stringify(&InspectValue::NegativeInfinity),
            format!("\"{}\"", NEGATIVE_INFINITY)
        );
    }

    #[test]
    fn test_parse_without_revive_keeps_raw_shape() {
        let text = stringify(&InspectValue::Set(vec![InspectValue::Bool(true)]));
        let raw = parse(&text, false).unwrap();
        assert!(matches!(raw, InspectValue::Object(ref f) if f.contains_key(CUSTOM_KEY)));
        assert_eq!(revive(raw).unwrap(), InspectValue::Set(vec![InspectValue::Bool(true)]));
    }

    #[test]
    fn test_date_and_regexp_strings() {
        let date = DateTime::parse_from_rfc3339("2024-03-01T10:20:30.123Z")
            .unwrap()
            .with_timezone(&Utc);
        let text = stringify(&InspectValue::Date(date));
        assert_eq!(text, "\"[native Date 2024-03-01T10:20:30.123Z]\"");
        assert_eq!(parse(&text, true).unwrap(), InspectValue::Date(date));

        let re = InspectValue::RegExp {
            source: "a/b+".into(),
            flags: "gi".into(),
        };
        assert_eq!(parse(&stringify(&re), true).unwrap(), re);
    }

    #[test]
    fn test_function_revives_to_stand_in() {
        let func = InspectValue::Function {
            name: "increment".into(),
        };
        let revived = parse(&stringify(&func), true).unwrap();
        assert_eq!(revived, func);
    }

    #[test]
    fn test_unknown_envelope_passes_through() {
        let text = r#"{"_custom":{"type":"component","value":"Foo"}}"#;
        let revived = parse(text, true).unwrap();
        let InspectValue::Object(fields) = revived else {
            panic!("expected object");
        };
        assert!(fields.contains_key(CUSTOM_KEY));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(parse("{nope", true), Err(CodecError::Malformed(_))));
        let bad_map = r#"{"_custom":{"type":"map","value":[1]}}"#;
        assert!(matches!(
            parse(bad_map, true),
            Err(CodecError::InvalidEnvelope { .. })
        ));
    }

    #[test]
    fn test_malformed_native_strings_stay_strings() {
        for text in [
            r#""[native Date garbage]""#,
            r#""[native RegExp no-slashes]""#,
        ] {
            let revived = parse(text, true).unwrap();
            assert!(matches!(revived, InspectValue::String(ref s) if s.starts_with("[native ")));
        }
        let state = parse(r#"{"note": "[native Date someday]"}"#, true)
            .unwrap()
            .into_state()
            .unwrap();
        assert_eq!(state, serde_json::json!({"note": "[native Date someday]"}));
    }

    #[test]
    fn test_large_integers_survive_state_round_trip() {
        let state = serde_json::json!({"id": 9_007_199_254_740_993u64, "low": -9_007_199_254_740_993i64});
        let text = stringify_json(&state);
        assert!(text.contains("bigint"));
        let back = parse(&text, true).unwrap().into_state().unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_stringify_json_state() {
        let state = serde_json::json!({"count": 1});
        assert_eq!(stringify_json(&state), r#"{"count":1}"#);
    }
}
