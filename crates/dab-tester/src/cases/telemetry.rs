//! Telemetry stream cases, optional at every version.
//!
//! Each case starts a metrics stream, watches the broker for the published
//! messages, and stops the stream again regardless of what the watch saw.

use super::applications::app_payload;
use super::{script_case, TELEMETRY};
use crate::error::Result;
use crate::registry::{CaseContext, Precheck, ScriptFuture, ScriptHalt, TestCase};
use dab_protocol::{operations, topic};
use serde_json::{json, Map};
use std::time::Duration;

const METRICS_PERIOD_MS: u64 = 1000;
const EXPECTED_MESSAGES: usize = 5;
const OBSERVE_WINDOW: Duration = Duration::from_secs(30);

pub(super) fn cases() -> Result<Vec<TestCase>> {
    Ok(vec![
        TestCase {
            precheck: Precheck::OperationAdvertised,
            ..script_case(
                operations::DEVICE_TELEMETRY_START,
                "Stream",
                &[TELEMETRY],
                device_stream,
            )
        },
        TestCase {
            precheck: Precheck::OperationAdvertised,
            ..script_case(
                operations::APP_TELEMETRY_START,
                "Stream",
                &[TELEMETRY],
                app_stream,
            )
        },
    ])
}

fn device_stream<'a, 'b>(ctx: &'a mut CaseContext<'b>) -> ScriptFuture<'a> {
    Box::pin(async move {
        let start = Map::from_iter([("duration".to_owned(), json!(METRICS_PERIOD_MS))]);
        ctx.request_ok(operations::DEVICE_TELEMETRY_START, start).await?;
        let metrics = topic::telemetry_topic(ctx.device_id());
        ctx.log(format!("watching {metrics}"));
        let seen = ctx.observe(&metrics, EXPECTED_MESSAGES, OBSERVE_WINDOW).await?;
        let stop = ctx.request(operations::DEVICE_TELEMETRY_STOP, Map::new()).await;
        judge_stream(ctx, seen, stop.status().is_some_and(dab_protocol::DabStatus::is_success))
    })
}

fn app_stream<'a, 'b>(ctx: &'a mut CaseContext<'b>) -> ScriptFuture<'a> {
    Box::pin(async move {
        let app = ctx.config().app_id("youtube");
        let mut start = app_payload(&app);
        start.insert("duration".to_owned(), json!(METRICS_PERIOD_MS));
        ctx.request_ok(operations::APP_TELEMETRY_START, start).await?;
        let metrics = topic::app_telemetry_topic(ctx.device_id(), &app);
        ctx.log(format!("watching {metrics}"));
        let seen = ctx.observe(&metrics, EXPECTED_MESSAGES, OBSERVE_WINDOW).await?;
        let stop = ctx.request(operations::APP_TELEMETRY_STOP, app_payload(&app)).await;
        judge_stream(ctx, seen, stop.status().is_some_and(dab_protocol::DabStatus::is_success))
    })
}

/// The stop exchange is always issued; the stream verdict is judged only
/// afterwards so a failing watch never leaves the device streaming.
fn judge_stream(
    ctx: &mut CaseContext<'_>,
    seen: bool,
    stop_ok: bool,
) -> std::result::Result<(), ScriptHalt> {
    if !seen {
        return Err(ScriptHalt::Check(format!(
            "fewer than {EXPECTED_MESSAGES} metrics messages within {}s",
            OBSERVE_WINDOW.as_secs()
        )));
    }
    ctx.log(format!("received {EXPECTED_MESSAGES} metrics messages"));
    if !stop_ok {
        return Err(ScriptHalt::Exchange);
    }
    Ok(())
}
