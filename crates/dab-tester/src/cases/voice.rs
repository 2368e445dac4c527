//! Voice assistant cases, optional at every version. Payloads follow the
//! configured assistant name so one catalog serves Google and vendor
//! assistants alike.

use super::{exchange_case, payload_object, READ_LATENCY, SET_LATENCY, VOICE};
use crate::config::AppConfig;
use crate::error::Result;
use crate::registry::{ExchangeSpec, Precheck, TestCase};
use dab_protocol::operations;
use serde_json::{json, Map, Value};

const SPOKEN_REQUEST: &str = "play lady gaga music";
const AUDIO_CLIP: &str = "voice/ladygaga.wav";

pub(super) fn cases(config: &AppConfig) -> Result<Vec<TestCase>> {
    let assistant = config.voice_system.clone();
    Ok(vec![
        TestCase {
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::VOICE_LIST,
                "Conformance",
                &[VOICE],
                ExchangeSpec {
                    payload: Map::new(),
                    latency: Some(READ_LATENCY),
                    check: Some(has_voice_systems),
                },
            )
        },
        TestCase {
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::VOICE_SET,
                "Conformance",
                &[VOICE],
                ExchangeSpec {
                    payload: payload_object(json!({
                        "voiceSystem": {"name": assistant, "enabled": true},
                    }))?,
                    latency: Some(SET_LATENCY),
                    check: None,
                },
            )
        },
        TestCase {
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::VOICE_SEND_TEXT,
                "Conformance",
                &[VOICE],
                ExchangeSpec {
                    payload: payload_object(json!({
                        "requestText": SPOKEN_REQUEST,
                        "voiceSystem": assistant,
                    }))?,
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::VOICE_SEND_AUDIO,
                "Conformance",
                &[VOICE],
                ExchangeSpec {
                    payload: payload_object(json!({
                        "fileLocation": config.artifact_url(AUDIO_CLIP),
                        "voiceSystem": assistant,
                    }))?,
                    latency: None,
                    check: None,
                },
            )
        },
    ])
}

fn has_voice_systems(body: &Value) -> std::result::Result<(), String> {
    if body.get("voiceSystems").and_then(Value::as_array).is_some() {
        Ok(())
    } else {
        Err("response carries no \"voiceSystems\" list".to_owned())
    }
}
