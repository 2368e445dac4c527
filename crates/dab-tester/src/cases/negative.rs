//! Negative cases: malformed or impossible requests a conforming device
//! must reject with a client-error status instead of accepting.

use super::{exchange_case, payload_object, NEGATIVE};
use crate::config::AppConfig;
use crate::error::Result;
use crate::registry::{ExchangeSpec, TestCase};
use dab_protocol::operations;
use serde_json::{json, Map};

pub(super) fn cases(config: &AppConfig) -> Result<Vec<TestCase>> {
    let youtube = config.app_id("youtube");
    Ok(vec![
        TestCase {
            negative: true,
            ..exchange_case(
                operations::APP_LAUNCH,
                "UnknownApp",
                &[NEGATIVE],
                ExchangeSpec {
                    payload: payload_object(json!({"appId": "no_such_app"}))?,
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            negative: true,
            ..exchange_case(
                operations::APP_LAUNCH_WITH_CONTENT,
                "MissingContentId",
                &[NEGATIVE],
                ExchangeSpec {
                    payload: payload_object(json!({"appId": youtube}))?,
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            negative: true,
            ..exchange_case(
                operations::APP_GET_STATE,
                "MissingAppId",
                &[NEGATIVE],
                ExchangeSpec {
                    payload: Map::new(),
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            negative: true,
            ..exchange_case(
                operations::SETTINGS_SET,
                "UnknownSetting",
                &[NEGATIVE],
                ExchangeSpec {
                    payload: payload_object(json!({"obviouslyUnsupportedSetting": true}))?,
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            negative: true,
            ..exchange_case(
                operations::KEY_PRESS,
                "UnknownKey",
                &[NEGATIVE],
                ExchangeSpec {
                    payload: payload_object(json!({"keyCode": "KEY_DOES_NOT_EXIST"}))?,
                    latency: None,
                    check: None,
                },
            )
        },
    ])
}
