//! Application lifecycle cases: listing, launch/exit state transitions,
//! and the install family added at 2.1.

use super::{
    exchange_case, payload_object, script_case, APPLICATIONS, CONFORMANCE, LIFECYCLE_LATENCY,
    READ_LATENCY,
};
use crate::config::AppConfig;
use crate::error::Result;
use crate::registry::{CaseContext, ExchangeSpec, Precheck, ScriptFuture, ScriptHalt, TestCase};
use dab_protocol::envelope::ResponseEnvelope;
use dab_protocol::{operations, DabVersion, VersionSet};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// A public video id kept short so launch-with-content settles quickly on
/// real devices.
const LIVE_CONTENT_ID: &str = "2ZggAa6LuiM";

const INSTALL_TIMEOUT_MS: u64 = 60_000;

pub(super) fn cases(config: &AppConfig) -> Result<Vec<TestCase>> {
    let youtube = config.app_id("youtube");
    let sample = config.app_id("sample_app");
    let sample_artifact = config.artifact_url(&format!("apps/{sample}.bin"));
    Ok(vec![
        exchange_case(
            operations::APPLICATIONS_LIST,
            "Conformance",
            &[CONFORMANCE, APPLICATIONS],
            ExchangeSpec {
                payload: Map::new(),
                latency: Some(READ_LATENCY),
                check: None,
            },
        ),
        script_case(
            operations::APP_LAUNCH,
            "Lifecycle",
            &[CONFORMANCE, APPLICATIONS],
            lifecycle,
        ),
        exchange_case(
            operations::APP_LAUNCH_WITH_CONTENT,
            "Conformance",
            &[CONFORMANCE, APPLICATIONS],
            ExchangeSpec {
                payload: payload_object(json!({
                    "appId": youtube,
                    "contentId": LIVE_CONTENT_ID,
                }))?,
                latency: Some(LIFECYCLE_LATENCY),
                check: None,
            },
        ),
        exchange_case(
            operations::APP_GET_STATE,
            "Conformance",
            &[CONFORMANCE, APPLICATIONS],
            ExchangeSpec {
                payload: payload_object(json!({"appId": youtube}))?,
                latency: Some(READ_LATENCY),
                check: Some(has_state),
            },
        ),
        TestCase {
            versions: VersionSet::since(DabVersion::V2_1),
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::APP_INSTALL,
                "Conformance",
                &[CONFORMANCE, APPLICATIONS],
                ExchangeSpec {
                    payload: payload_object(json!({
                        "appId": sample,
                        "url": sample_artifact,
                        "format": "bin",
                        "timeout": INSTALL_TIMEOUT_MS,
                    }))?,
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            versions: VersionSet::since(DabVersion::V2_1),
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::APP_INSTALL_FROM_APPSTORE,
                "Conformance",
                &[CONFORMANCE, APPLICATIONS],
                ExchangeSpec {
                    payload: payload_object(json!({"appId": sample}))?,
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            versions: VersionSet::since(DabVersion::V2_1),
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::APP_CLEAR_DATA,
                "Conformance",
                &[CONFORMANCE, APPLICATIONS],
                ExchangeSpec {
                    payload: payload_object(json!({"appId": sample}))?,
                    latency: None,
                    check: None,
                },
            )
        },
        TestCase {
            versions: VersionSet::since(DabVersion::V2_1),
            precheck: Precheck::OperationAdvertised,
            ..exchange_case(
                operations::APP_UNINSTALL,
                "Conformance",
                &[CONFORMANCE, APPLICATIONS],
                ExchangeSpec {
                    payload: payload_object(json!({"appId": sample, "force": true}))?,
                    latency: None,
                    check: None,
                },
            )
        },
    ])
}

/// Launches an application, verifies it reaches the foreground, exits it,
/// and verifies it leaves the foreground again.
fn lifecycle<'a, 'b>(ctx: &'a mut CaseContext<'b>) -> ScriptFuture<'a> {
    Box::pin(async move {
        let app = ctx.config().app_id("youtube");
        let payload = app_payload(&app);
        ctx.request_ok_within(operations::APP_LAUNCH, payload.clone(), LIFECYCLE_LATENCY)
            .await?;
        ctx.log(format!("launched {app}"));
        ctx.settle(Duration::from_secs(5)).await;
        let state = ctx.request_ok(operations::APP_GET_STATE, payload.clone()).await?;
        expect_state(&state, &["FOREGROUND"])?;
        ctx.request_ok_within(operations::APP_EXIT, payload.clone(), LIFECYCLE_LATENCY)
            .await?;
        ctx.log(format!("exited {app}"));
        ctx.settle(Duration::from_secs(3)).await;
        let state = ctx.request_ok(operations::APP_GET_STATE, payload).await?;
        expect_state(&state, &["STOPPED", "BACKGROUND"])?;
        Ok(())
    })
}

pub(super) fn app_payload(app_id: &str) -> Map<String, Value> {
    Map::from_iter([("appId".to_owned(), Value::String(app_id.to_owned()))])
}

fn expect_state(
    envelope: &ResponseEnvelope,
    allowed: &[&str],
) -> std::result::Result<(), ScriptHalt> {
    match envelope.body.get("state").and_then(Value::as_str) {
        Some(state) if allowed.contains(&state) => Ok(()),
        Some(state) => Err(ScriptHalt::Check(format!(
            "application state {state}, expected one of {allowed:?}"
        ))),
        None => Err(ScriptHalt::Check(
            "response carries no \"state\" field".to_owned(),
        )),
    }
}

fn has_state(body: &Value) -> std::result::Result<(), String> {
    if body.get("state").and_then(Value::as_str).is_some() {
        Ok(())
    } else {
        Err("response carries no \"state\" field".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dab_protocol::DabStatus;

    fn envelope(body: Value) -> ResponseEnvelope {
        ResponseEnvelope {
            request_id: "01H00000000000000000000000".to_owned(),
            status: DabStatus::Ok,
            body,
        }
    }

    #[test]
    fn state_expectations() {
        assert!(expect_state(&envelope(json!({"state": "FOREGROUND"})), &["FOREGROUND"]).is_ok());
        assert!(matches!(
            expect_state(&envelope(json!({"state": "BACKGROUND"})), &["FOREGROUND"]),
            Err(ScriptHalt::Check(_))
        ));
        assert!(matches!(
            expect_state(&envelope(json!({})), &["FOREGROUND"]),
            Err(ScriptHalt::Check(_))
        ));
    }

    #[test]
    fn install_cases_start_at_2_1() {
        let config = AppConfig::default();
        let cases = cases(&config).unwrap();
        let install = cases
            .iter()
            .find(|case| case.operation == operations::APP_INSTALL)
            .unwrap();
        assert!(!install.versions.contains(DabVersion::V2_0));
        assert!(install.versions.contains(DabVersion::V2_1));
    }
}
