//! Remote-control input cases.

use super::{exchange_case, payload_object, CONFORMANCE, INPUT, KEY_PRESS_LATENCY, READ_LATENCY};
use crate::error::Result;
use crate::registry::{ExchangeSpec, Precheck, TestCase};
use dab_protocol::operations;
use serde_json::{json, Map, Value};

/// Key codes every remote is expected to carry, with the case variant
/// label for each. A device may legitimately omit some (no volume keys on
/// a panel-less box), so each press is gated on `input/key/list`.
const KEY_PRESSES: [(&str, &str); 6] = [
    ("KEY_HOME", "Home"),
    ("KEY_BACK", "Back"),
    ("KEY_ENTER", "Enter"),
    ("KEY_VOLUME_UP", "VolumeUp"),
    ("KEY_VOLUME_DOWN", "VolumeDown"),
    ("KEY_MUTE", "Mute"),
];

const LONG_PRESS_MS: u64 = 3000;

pub(super) fn cases() -> Result<Vec<TestCase>> {
    let mut cases = vec![exchange_case(
        operations::KEY_LIST,
        "Conformance",
        &[CONFORMANCE, INPUT],
        ExchangeSpec {
            payload: Map::new(),
            latency: Some(READ_LATENCY),
            check: Some(has_key_codes),
        },
    )];
    for (code, variant) in KEY_PRESSES {
        cases.push(TestCase {
            precheck: Precheck::KeySupported(code),
            ..exchange_case(
                operations::KEY_PRESS,
                variant,
                &[CONFORMANCE, INPUT],
                ExchangeSpec {
                    payload: payload_object(json!({"keyCode": code}))?,
                    latency: Some(KEY_PRESS_LATENCY),
                    check: None,
                },
            )
        });
    }
    cases.push(TestCase {
        precheck: Precheck::KeySupported("KEY_VOLUME_UP"),
        ..exchange_case(
            operations::LONG_KEY_PRESS,
            "VolumeUp",
            &[CONFORMANCE, INPUT],
            ExchangeSpec {
                payload: payload_object(json!({
                    "keyCode": "KEY_VOLUME_UP",
                    "durationMs": LONG_PRESS_MS,
                }))?,
                latency: None,
                check: None,
            },
        )
    });
    Ok(cases)
}

fn has_key_codes(body: &Value) -> std::result::Result<(), String> {
    match body.get("keyCodes").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => Ok(()),
        _ => Err("expected a non-empty \"keyCodes\" list".to_owned()),
    }
}
