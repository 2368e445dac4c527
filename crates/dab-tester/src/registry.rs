//! Test case model and the immutable registry built from the shipped
//! catalog.
//!
//! A case body is either a single declarative exchange (payload template,
//! latency bound, response check) or a script driving several exchanges
//! through a [`CaseContext`]. Both record every exchange for the report.

use crate::cases;
use crate::config::AppConfig;
use crate::correlator::{Correlator, Exchange, ExchangeOutcome};
use crate::error::{DabError, Result};
use dab_protocol::envelope::ResponseEnvelope;
use dab_protocol::{DabVersion, VersionSet};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// One immutable entry in the catalog.
pub struct TestCase {
    /// Derived from the operation plus a variant label, e.g.
    /// `systemSettingsGetConformance`.
    pub id: String,
    pub operation: &'static str,
    pub suites: &'static [&'static str],
    pub versions: VersionSet,
    pub negative: bool,
    pub precheck: Precheck,
    pub body: CaseBody,
}

/// Gate evaluated before the body runs. A failed precheck skips the case.
#[derive(Debug, Clone, Copy)]
pub enum Precheck {
    None,
    /// One `health-check/get` exchange must answer healthy.
    HealthCheck,
    /// The case's operation must appear in the advertised set.
    OperationAdvertised,
    /// The named setting must be supported per `system/settings/list`.
    SettingSupported(&'static str),
    /// The key code must appear in `input/key/list`.
    KeySupported(&'static str),
}

pub enum CaseBody {
    Exchange(ExchangeSpec),
    Script(ScriptFn),
}

pub struct ExchangeSpec {
    pub payload: Map<String, Value>,
    pub latency: Option<Duration>,
    pub check: Option<ResponseCheck>,
}

/// Judges the body of a 200 response.
pub type ResponseCheck = fn(&Value) -> std::result::Result<(), String>;

pub type ScriptFuture<'a> = Pin<Box<dyn Future<Output = ScriptResult> + Send + 'a>>;
pub type ScriptFn = for<'a, 'b> fn(&'a mut CaseContext<'b>) -> ScriptFuture<'a>;
pub type ScriptResult = std::result::Result<(), ScriptHalt>;

/// Why a scripted body stopped early.
pub enum ScriptHalt {
    /// A semantic check failed; the case is FAILED with this message.
    Check(String),
    /// The last exchange did not come back 200; the classifier judges it.
    Exchange,
    /// The case cannot proceed; SKIPPED with this message.
    Skip(String),
}

/// Execution surface handed to scripted bodies. Records the exchange trail
/// and the case's log lines.
pub struct CaseContext<'a> {
    correlator: &'a Correlator,
    config: &'a AppConfig,
    version: DabVersion,
    exchanges: Vec<Exchange>,
    logs: Vec<String>,
}

impl<'a> CaseContext<'a> {
    pub(crate) fn new(correlator: &'a Correlator, config: &'a AppConfig, version: DabVersion) -> Self {
        Self {
            correlator,
            config,
            version,
            exchanges: Vec::new(),
            logs: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        self.config
    }

    #[must_use]
    pub fn version(&self) -> DabVersion {
        self.version
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        self.correlator.device_id()
    }

    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!("{line}");
        self.logs.push(line);
    }

    /// Issues one exchange and records it.
    pub async fn request(&mut self, operation: &str, payload: Map<String, Value>) -> ExchangeOutcome {
        let exchange = self.correlator.request(operation, &payload).await;
        let outcome = exchange.outcome.clone();
        self.exchanges.push(exchange);
        outcome
    }

    /// Issues one exchange and halts the script unless the device answered
    /// 200; the classifier then judges the recorded exchange.
    pub async fn request_ok(
        &mut self,
        operation: &str,
        payload: Map<String, Value>,
    ) -> std::result::Result<ResponseEnvelope, ScriptHalt> {
        match self.request(operation, payload).await {
            ExchangeOutcome::Response(envelope) if envelope.status.is_success() => Ok(envelope),
            _ => Err(ScriptHalt::Exchange),
        }
    }

    /// [`request_ok`](Self::request_ok) plus a latency bound on this single
    /// exchange.
    pub async fn request_ok_within(
        &mut self,
        operation: &str,
        payload: Map<String, Value>,
        bound: Duration,
    ) -> std::result::Result<ResponseEnvelope, ScriptHalt> {
        let envelope = self.request_ok(operation, payload).await?;
        let elapsed_ms = self.exchanges.last().map_or(0, |exchange| exchange.elapsed_ms);
        if u128::from(elapsed_ms) > bound.as_millis() {
            return Err(ScriptHalt::Check(format!(
                "{operation} took {elapsed_ms}ms, bound {}ms",
                bound.as_millis()
            )));
        }
        Ok(envelope)
    }

    /// Waits for the device to settle, returning early on cancellation.
    pub async fn settle(&mut self, duration: Duration) {
        self.log(format!("waiting {}s for the device", duration.as_secs()));
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = self.correlator.cancel_handle().cancelled() => {}
        }
    }

    /// Watches a stream topic for `count` messages within `window`.
    pub async fn observe(
        &mut self,
        topic: &str,
        count: usize,
        window: Duration,
    ) -> std::result::Result<bool, ScriptHalt> {
        match self.correlator.observe(topic, count, window).await {
            Ok(seen) => Ok(seen),
            Err(error) => Err(ScriptHalt::Skip(format!(
                "stream subscription failed: {error}"
            ))),
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<Exchange>, Vec<String>) {
        (self.exchanges, self.logs)
    }
}

/// Which cases a batch covers.
#[derive(Debug, Clone)]
pub enum Scope {
    All,
    Suite(String),
    Cases(Vec<String>),
}

impl Scope {
    /// Label recorded as the report's `suite_name`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_owned(),
            Self::Suite(name) => name.clone(),
            Self::Cases(ids) if ids.len() == 1 => ids[0].clone(),
            Self::Cases(_) => "selected".to_owned(),
        }
    }
}

/// The immutable case catalog.
pub struct Registry {
    cases: Vec<TestCase>,
}

impl Registry {
    /// Builds the shipped catalog against the given configuration.
    pub fn standard(config: &AppConfig) -> Result<Self> {
        Self::from_cases(cases::catalog(config)?)
    }

    pub(crate) fn from_cases(cases: Vec<TestCase>) -> Result<Self> {
        let mut seen = HashSet::new();
        for case in &cases {
            if !seen.insert(case.id.as_str()) {
                return Err(DabError::Config(format!("duplicate test id {}", case.id)));
            }
        }
        Ok(Self { cases })
    }

    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    #[must_use]
    pub fn case(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|case| case.id == id)
    }

    /// Suite names in catalog order, deduplicated.
    #[must_use]
    pub fn suite_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for case in &self.cases {
            for suite in case.suites {
                if !names.contains(suite) {
                    names.push(*suite);
                }
            }
        }
        names
    }

    /// Resolves a scope to cases in registry order, deduplicated. Unknown
    /// suite or case names fail before any device traffic.
    pub fn select(&self, scope: &Scope) -> Result<Vec<&TestCase>> {
        match scope {
            Scope::All => Ok(self.cases.iter().collect()),
            Scope::Suite(name) => {
                let selected: Vec<&TestCase> = self
                    .cases
                    .iter()
                    .filter(|case| case.suites.contains(&name.as_str()))
                    .collect();
                if selected.is_empty() {
                    return Err(DabError::UnknownSuite(name.clone()));
                }
                Ok(selected)
            }
            Scope::Cases(ids) => {
                let mut requested: HashSet<&str> = HashSet::new();
                for id in ids {
                    if self.case(id).is_none() {
                        return Err(DabError::UnknownCase(id.clone()));
                    }
                    requested.insert(id.as_str());
                }
                Ok(self
                    .cases
                    .iter()
                    .filter(|case| requested.contains(case.id.as_str()))
                    .collect())
            }
        }
    }
}

/// `system/settings/get` + `Conformance` becomes
/// `systemSettingsGetConformance`.
pub(crate) fn case_id(operation: &str, variant: &str) -> String {
    let mut id = String::new();
    for part in operation.split(['/', '-']) {
        if id.is_empty() {
            id.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                id.extend(first.to_uppercase());
                id.push_str(chars.as_str());
            }
        }
    }
    id.push_str(variant);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(id: &str, suites: &'static [&'static str]) -> TestCase {
        TestCase {
            id: id.to_owned(),
            operation: "device/info",
            suites,
            versions: VersionSet::ALL,
            negative: false,
            precheck: Precheck::None,
            body: CaseBody::Exchange(ExchangeSpec {
                payload: Map::new(),
                latency: None,
                check: None,
            }),
        }
    }

    #[test]
    fn case_id_derivation() {
        assert_eq!(
            case_id("system/settings/get", "Conformance"),
            "systemSettingsGetConformance"
        );
        assert_eq!(
            case_id("health-check/get", "Conformance"),
            "healthCheckGetConformance"
        );
        assert_eq!(
            case_id("input/long-key-press", "VolumeUp"),
            "inputLongKeyPressVolumeUp"
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = Registry::from_cases(vec![stub("a", &["x"]), stub("a", &["y"])]);
        assert!(matches!(result, Err(DabError::Config(_))));
    }

    #[test]
    fn select_all_preserves_order() {
        let registry =
            Registry::from_cases(vec![stub("a", &["x"]), stub("b", &["y"]), stub("c", &["x"])])
                .unwrap();
        let ids: Vec<&str> = registry
            .select(&Scope::All)
            .unwrap()
            .iter()
            .map(|case| case.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn select_by_suite() {
        let registry =
            Registry::from_cases(vec![stub("a", &["x"]), stub("b", &["y"]), stub("c", &["x"])])
                .unwrap();
        let ids: Vec<&str> = registry
            .select(&Scope::Suite("x".to_owned()))
            .unwrap()
            .iter()
            .map(|case| case.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(matches!(
            registry.select(&Scope::Suite("nope".to_owned())),
            Err(DabError::UnknownSuite(_))
        ));
    }

    #[test]
    fn select_cases_dedupes_in_registry_order() {
        let registry =
            Registry::from_cases(vec![stub("a", &["x"]), stub("b", &["y"]), stub("c", &["x"])])
                .unwrap();
        let scope = Scope::Cases(vec![
            "c".to_owned(),
            "a".to_owned(),
            "c".to_owned(),
        ]);
        let ids: Vec<&str> = registry
            .select(&scope)
            .unwrap()
            .iter()
            .map(|case| case.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(matches!(
            registry.select(&Scope::Cases(vec!["zzz".to_owned()])),
            Err(DabError::UnknownCase(_))
        ));
    }

    #[test]
    fn suite_names_deduplicate() {
        let registry =
            Registry::from_cases(vec![stub("a", &["x", "y"]), stub("b", &["y", "z"])]).unwrap();
        assert_eq!(registry.suite_names(), vec!["x", "y", "z"]);
    }

    #[test]
    fn scope_labels() {
        assert_eq!(Scope::All.label(), "all");
        assert_eq!(Scope::Suite("voice".to_owned()).label(), "voice");
        assert_eq!(Scope::Cases(vec!["a".to_owned()]).label(), "a");
        assert_eq!(
            Scope::Cases(vec!["a".to_owned(), "b".to_owned()]).label(),
            "selected"
        );
    }
}
