//! Property-based tests for codec round trips
//!
//! For any value built from the supported type set, reviving the parsed
//! output of `stringify` yields a value equal to the input.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};
use timelens_codec::{parse, revive, stringify, stringify_json, InspectValue};

fn arb_leaf() -> impl Strategy<Value = InspectValue> {
    prop_oneof![
        Just(InspectValue::Undefined),
        Just(InspectValue::Null),
        Just(InspectValue::NaN),
        Just(InspectValue::Infinity),
        Just(InspectValue::NegativeInfinity),
        any::<bool>().prop_map(InspectValue::Bool),
        (-1_000_000i64..1_000_000i64).prop_map(|n| InspectValue::number(n as f64)),
        (-4_000_000i64..4_000_000i64).prop_map(|n| InspectValue::number(n as f64 / 4.0)),
        "[a-zA-Z0-9 _]{0,12}".prop_map(InspectValue::String),
        (0i64..4_000_000_000_000i64).prop_map(|ms| {
            InspectValue::Date(Utc.timestamp_millis_opt(ms).single().unwrap())
        }),
        ("[a-z]{1,5}", "[gim]{0,3}").prop_map(|(source, flags)| InspectValue::RegExp {
            source,
            flags
        }),
        ("[A-Z][a-z]{0,8}", "[a-z ]{0,16}")
            .prop_map(|(name, message)| InspectValue::Error { name, message }),
        "[0-9]{1,30}".prop_map(InspectValue::BigInt),
    ]
}

fn arb_value() -> impl Strategy<Value = InspectValue> {
    arb_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(InspectValue::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner.clone(), 0..6)
                .prop_map(InspectValue::Object),
            prop::collection::vec((inner.clone(), inner.clone()), 0..4)
                .prop_map(InspectValue::Map),
            prop::collection::vec(inner, 0..4).prop_map(InspectValue::Set),
        ]
    })
}

proptest! {
    #[test]
    fn prop_round_trip(value in arb_value()) {
        let text = stringify(&value);
        let revived = revive(parse(&text, false).unwrap()).unwrap();
        prop_assert_eq!(revived, value);
    }

    #[test]
    fn prop_parse_with_revive_matches_two_step(value in arb_value()) {
        let text = stringify(&value);
        let one_step = parse(&text, true).unwrap();
        let two_step = revive(parse(&text, false).unwrap()).unwrap();
        prop_assert_eq!(one_step, two_step);
    }

    #[test]
    fn prop_signed_integers_survive_state_round_trip(n in any::<i64>()) {
        let state = json!({"n": n, "items": [n]});
        let back = parse(&stringify_json(&state), true).unwrap().into_state().unwrap();
        prop_assert_eq!(back, state);
    }

    #[test]
    fn prop_unsigned_integers_survive_state_round_trip(n in any::<u64>()) {
        let state = Value::from(n);
        let back = parse(&stringify_json(&state), true).unwrap().into_state().unwrap();
        prop_assert_eq!(back, state);
    }
}

#[test]
fn test_function_round_trips_to_consistent_stand_in() {
    let value = InspectValue::object([(
        "handler",
        InspectValue::Function {
            name: "onClick".to_string(),
        },
    )]);
    let first = parse(&stringify(&value), true).unwrap();
    let second = parse(&stringify(&first), true).unwrap();
    assert_eq!(first, second);
}
