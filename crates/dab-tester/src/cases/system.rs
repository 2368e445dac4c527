//! System settings, screen capture, and the restart recovery case.

use super::{
    exchange_case, payload_object, script_case, CONFORMANCE, READ_LATENCY, SET_LATENCY, SYSTEM,
};
use crate::config::AppConfig;
use crate::error::Result;
use crate::registry::{CaseContext, ExchangeSpec, Precheck, ScriptFuture, ScriptHalt, TestCase};
use dab_protocol::operations;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// How long a device gets to come back up before the post-restart health
/// probe.
const REBOOT_SETTLE: Duration = Duration::from_secs(60);

pub(super) fn cases(config: &AppConfig) -> Result<Vec<TestCase>> {
    let mut cases = vec![
        exchange_case(
            operations::SETTINGS_LIST,
            "Conformance",
            &[CONFORMANCE, SYSTEM],
            ExchangeSpec {
                payload: Map::new(),
                latency: Some(READ_LATENCY),
                check: None,
            },
        ),
        exchange_case(
            operations::SETTINGS_GET,
            "Conformance",
            &[CONFORMANCE, SYSTEM],
            ExchangeSpec {
                payload: Map::new(),
                latency: Some(READ_LATENCY),
                check: None,
            },
        ),
    ];
    for (setting, variant, value) in setting_mutations() {
        cases.push(TestCase {
            precheck: Precheck::SettingSupported(setting),
            ..exchange_case(
                operations::SETTINGS_SET,
                variant,
                &[CONFORMANCE, SYSTEM],
                ExchangeSpec {
                    payload: Map::from_iter([(setting.to_owned(), value)]),
                    latency: Some(SET_LATENCY),
                    check: None,
                },
            )
        });
    }
    cases.push(exchange_case(
        operations::OUTPUT_IMAGE,
        "Conformance",
        &[CONFORMANCE, SYSTEM],
        ExchangeSpec {
            payload: payload_object(json!({"outputLocation": config.artifact_url("output")}))?,
            latency: None,
            check: Some(has_output_image),
        },
    ));
    Ok(cases)
}

/// Setting member, case variant label, and the value written by the
/// mutation case. Each runs only when `system/settings/list` marks the
/// member supported.
fn setting_mutations() -> [(&'static str, &'static str, Value); 7] {
    [
        ("language", "Language", json!("en-US")),
        ("audioVolume", "AudioVolume", json!(20)),
        ("mute", "Mute", json!(false)),
        ("memc", "Memc", json!(true)),
        ("cec", "Cec", json!(true)),
        ("lowLatencyMode", "LowLatencyMode", json!(true)),
        (
            "outputResolution",
            "OutputResolution",
            json!({"width": 1920, "height": 1080, "frequency": 60}),
        ),
    ]
}

/// Built last into the catalog so the reboot cannot disturb other cases.
pub(super) fn restart_case() -> TestCase {
    TestCase {
        precheck: Precheck::HealthCheck,
        ..script_case(
            operations::SYSTEM_RESTART,
            "Recovery",
            &[CONFORMANCE, SYSTEM],
            restart,
        )
    }
}

fn restart<'a, 'b>(ctx: &'a mut CaseContext<'b>) -> ScriptFuture<'a> {
    Box::pin(async move {
        ctx.request_ok(operations::SYSTEM_RESTART, Map::new()).await?;
        ctx.log("restart acknowledged");
        ctx.settle(REBOOT_SETTLE).await;
        let health = ctx.request_ok(operations::HEALTH_CHECK, Map::new()).await?;
        match health.body.get("healthy").and_then(Value::as_bool) {
            Some(true) => {
                ctx.log("device healthy after restart");
                Ok(())
            }
            _ => Err(ScriptHalt::Check(
                "device did not report healthy after restart".to_owned(),
            )),
        }
    })
}

fn has_output_image(body: &Value) -> std::result::Result<(), String> {
    if body.get("outputImage").and_then(Value::as_str).is_some() {
        Ok(())
    } else {
        Err("response carries no \"outputImage\" location".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mutation_is_gated_on_support() {
        let config = AppConfig::default();
        for case in cases(&config).unwrap() {
            if case.operation == operations::SETTINGS_SET {
                assert!(matches!(case.precheck, Precheck::SettingSupported(_)), "{}", case.id);
            }
        }
    }

    #[test]
    fn output_image_requires_a_location() {
        assert!(has_output_image(&json!({"outputImage": "https://x/y.png"})).is_ok());
        assert!(has_output_image(&json!({})).is_err());
    }
}
