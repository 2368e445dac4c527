//! The shipped case catalog.
//!
//! Each submodule contributes the cases for one operation family. The
//! restart case is appended last so a rebooting device cannot poison the
//! rest of the batch.

mod applications;
mod content;
mod device;
mod input;
mod negative;
mod system;
mod telemetry;
mod voice;

use crate::config::AppConfig;
use crate::error::{DabError, Result};
use crate::registry::{case_id, CaseBody, ExchangeSpec, Precheck, ScriptFn, TestCase};
use dab_protocol::VersionSet;
use serde_json::{Map, Value};
use std::time::Duration;

pub(crate) const CONFORMANCE: &str = "conformance";
pub(crate) const DEVICE: &str = "device";
pub(crate) const APPLICATIONS: &str = "applications";
pub(crate) const SYSTEM: &str = "system";
pub(crate) const INPUT: &str = "input";
pub(crate) const TELEMETRY: &str = "telemetry";
pub(crate) const VOICE: &str = "voice";
pub(crate) const CONTENT: &str = "content";
pub(crate) const NEGATIVE: &str = "negative";

/// Latency bounds lifted from the reference timings: simple reads answer
/// fast, setting mutations and key presses a little slower, application
/// lifecycle transitions slowest.
pub(crate) const READ_LATENCY: Duration = Duration::from_millis(500);
pub(crate) const SET_LATENCY: Duration = Duration::from_millis(3000);
pub(crate) const LIFECYCLE_LATENCY: Duration = Duration::from_millis(10_000);
pub(crate) const KEY_PRESS_LATENCY: Duration = Duration::from_millis(1000);

pub(crate) fn catalog(config: &AppConfig) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();
    cases.extend(device::cases()?);
    cases.extend(applications::cases(config)?);
    cases.extend(system::cases(config)?);
    cases.extend(input::cases()?);
    cases.extend(telemetry::cases()?);
    cases.extend(voice::cases(config)?);
    cases.extend(content::cases()?);
    cases.extend(negative::cases(config)?);
    cases.push(system::restart_case());
    Ok(cases)
}

/// Narrows a `json!` literal to the object the wire format requires.
pub(crate) fn payload_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DabError::Config(format!(
            "request payload must be a JSON object, got {other}"
        ))),
    }
}

/// Positive single-exchange case applicable at every version. Callers
/// override versions, precheck, or the negative flag with struct update
/// syntax.
pub(crate) fn exchange_case(
    operation: &'static str,
    variant: &str,
    suites: &'static [&'static str],
    spec: ExchangeSpec,
) -> TestCase {
    TestCase {
        id: case_id(operation, variant),
        operation,
        suites,
        versions: VersionSet::ALL,
        negative: false,
        precheck: Precheck::None,
        body: CaseBody::Exchange(spec),
    }
}

pub(crate) fn script_case(
    operation: &'static str,
    variant: &str,
    suites: &'static [&'static str],
    body: ScriptFn,
) -> TestCase {
    TestCase {
        id: case_id(operation, variant),
        operation,
        suites,
        versions: VersionSet::ALL,
        negative: false,
        precheck: Precheck::None,
        body: CaseBody::Script(body),
    }
}
