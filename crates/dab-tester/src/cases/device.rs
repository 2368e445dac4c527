//! Device identity and health cases.

use super::{exchange_case, CONFORMANCE, DEVICE, READ_LATENCY};
use crate::error::Result;
use crate::registry::{ExchangeSpec, TestCase};
use dab_protocol::operations;
use serde_json::{Map, Value};

pub(super) fn cases() -> Result<Vec<TestCase>> {
    Ok(vec![
        exchange_case(
            operations::OPERATIONS_LIST,
            "Conformance",
            &[CONFORMANCE, DEVICE],
            ExchangeSpec {
                payload: Map::new(),
                latency: Some(READ_LATENCY),
                check: Some(has_operations),
            },
        ),
        exchange_case(
            operations::VERSION,
            "Conformance",
            &[CONFORMANCE, DEVICE],
            ExchangeSpec {
                payload: Map::new(),
                latency: Some(READ_LATENCY),
                check: Some(has_versions),
            },
        ),
        exchange_case(
            operations::DEVICE_INFO,
            "Conformance",
            &[CONFORMANCE, DEVICE],
            ExchangeSpec {
                payload: Map::new(),
                latency: Some(READ_LATENCY),
                check: None,
            },
        ),
        exchange_case(
            operations::HEALTH_CHECK,
            "Conformance",
            &[CONFORMANCE, DEVICE],
            ExchangeSpec {
                payload: Map::new(),
                latency: Some(READ_LATENCY),
                check: Some(is_healthy),
            },
        ),
    ])
}

fn has_operations(body: &Value) -> std::result::Result<(), String> {
    match body.get("operations").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => Ok(()),
        _ => Err("expected a non-empty \"operations\" list".to_owned()),
    }
}

fn has_versions(body: &Value) -> std::result::Result<(), String> {
    match body.get("versions").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => Ok(()),
        _ => Err("expected a non-empty \"versions\" list".to_owned()),
    }
}

fn is_healthy(body: &Value) -> std::result::Result<(), String> {
    match body.get("healthy").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        Some(false) => Err("device reports unhealthy".to_owned()),
        None => Err("response carries no \"healthy\" flag".to_owned()),
    }
}
