//! Content discovery cases, mandatory from 2.2.

use super::{exchange_case, payload_object, CONFORMANCE, CONTENT};
use crate::error::Result;
use crate::registry::{ExchangeSpec, TestCase};
use dab_protocol::{operations, DabVersion, VersionSet};
use serde_json::{json, Map, Value};

const SEARCH_TEXT: &str = "Inception";

pub(super) fn cases() -> Result<Vec<TestCase>> {
    Ok(vec![
        TestCase {
            versions: VersionSet::since(DabVersion::V2_2),
            ..exchange_case(
                operations::CONTENT_SEARCH,
                "Conformance",
                &[CONFORMANCE, CONTENT],
                ExchangeSpec {
                    payload: payload_object(json!({"searchText": SEARCH_TEXT}))?,
                    latency: None,
                    check: Some(has_entries),
                },
            )
        },
        TestCase {
            versions: VersionSet::since(DabVersion::V2_2),
            ..exchange_case(
                operations::CONTENT_RECOMMENDATIONS,
                "Conformance",
                &[CONFORMANCE, CONTENT],
                ExchangeSpec {
                    payload: Map::new(),
                    latency: None,
                    check: None,
                },
            )
        },
    ])
}

fn has_entries(body: &Value) -> std::result::Result<(), String> {
    if body.get("entries").and_then(Value::as_array).is_some() {
        Ok(())
    } else {
        Err("response carries no \"entries\" list".to_owned())
    }
}
