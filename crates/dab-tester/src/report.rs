//! Batch report assembly: frozen per-case results, the summary block, and
//! JSON / plain-text rendering.

use crate::classify::{Classification, Verdict};
use crate::correlator::Exchange;
use crate::error::Result;
use crate::validate::{any_failed, Finding, Severity};
use chrono::{SecondsFormat, Utc};
use dab_protocol::{DabVersion, DeviceInfo};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One case outcome, frozen once appended to the report.
///
/// `request`, `status`, `response` and `latency_ms` reflect the last
/// exchange; the full trail stays available under `exchanges` for scripted
/// cases that issued several.
#[derive(Serialize)]
pub struct TestRun {
    pub test_id: String,
    pub operation: String,
    pub verdict: Verdict,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub latency_ms: u64,
    pub request: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    pub timestamp: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exchanges: Vec<Exchange>,
}

impl TestRun {
    pub(crate) fn assemble(
        test_id: &str,
        operation: &str,
        classification: Classification,
        exchanges: Vec<Exchange>,
        logs: Vec<String>,
        timestamp: String,
        duration_ms: u64,
    ) -> Self {
        let last = exchanges.last();
        let status = last.and_then(|exchange| exchange.outcome.status()).map(u16::from);
        let latency_ms = last.map_or(0, |exchange| exchange.elapsed_ms);
        let request = last.map_or_else(String::new, |exchange| exchange.request.clone());
        let response = last
            .and_then(|exchange| exchange.outcome.response())
            .map(|envelope| envelope.body.clone());
        Self {
            test_id: test_id.to_owned(),
            operation: operation.to_owned(),
            verdict: classification.verdict,
            message: classification.message,
            status,
            latency_ms,
            request,
            response,
            timestamp,
            duration_ms,
            logs,
            exchanges,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResultSummary {
    pub tests_executed: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub tests_optional_failed: usize,
    pub tests_skipped: usize,
    /// A batch passes overall only when nothing failed and nothing was
    /// skipped; a skip means the verdict is unknown, not clean.
    pub overall_passed: bool,
}

impl ResultSummary {
    fn tally(runs: &[TestRun]) -> Self {
        let mut summary = Self {
            tests_executed: runs.len(),
            tests_passed: 0,
            tests_failed: 0,
            tests_optional_failed: 0,
            tests_skipped: 0,
            overall_passed: false,
        };
        for run in runs {
            match run.verdict {
                Verdict::Pass => summary.tests_passed += 1,
                Verdict::Failed => summary.tests_failed += 1,
                Verdict::OptionalFailed => summary.tests_optional_failed += 1,
                Verdict::Skipped => summary.tests_skipped += 1,
            }
        }
        summary.overall_passed = summary.tests_failed == 0 && summary.tests_skipped == 0;
        summary
    }
}

#[derive(Serialize)]
pub struct BatchReport {
    pub test_version: String,
    pub timestamp: String,
    pub suite_name: String,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker: Option<String>,
    pub dab_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    pub result_summary: ResultSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    pub test_result_list: Vec<TestRun>,
}

impl BatchReport {
    /// `true` when the process should exit non-zero: at least one FAILED
    /// verdict or one FAILED validator finding.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.result_summary.tests_failed > 0 || any_failed(&self.findings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the JSON document, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut document = self.to_json()?;
        document.push('\n');
        std::fs::write(path, document)?;
        Ok(())
    }

    /// Operator-facing summary printed after a batch.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "device {}", self.device_id);
        if let Some(broker) = &self.broker {
            let _ = write!(out, " | broker {broker}");
        }
        let _ = writeln!(
            out,
            " | dab {} | suite {} | started {}",
            self.dab_version, self.suite_name, self.timestamp
        );
        for run in &self.test_result_list {
            let marker = match run.verdict {
                Verdict::Pass => "[PASS]",
                Verdict::Failed => "[FAIL]",
                Verdict::OptionalFailed => "[OPT ]",
                Verdict::Skipped => "[SKIP]",
            };
            let _ = writeln!(
                out,
                "{marker} {} ({}) {}",
                run.test_id, run.operation, run.message
            );
        }
        if !self.findings.is_empty() {
            let _ = writeln!(out, "findings:");
            for finding in &self.findings {
                let marker = match finding.severity {
                    Severity::Failed => "[FAIL]",
                    Severity::Gap => "[GAP ]",
                };
                let _ = writeln!(out, "  {marker} {}: {}", finding.topic, finding.message);
            }
        }
        let summary = &self.result_summary;
        let _ = writeln!(
            out,
            "{} executed: {} passed, {} failed, {} optional failed, {} skipped",
            summary.tests_executed,
            summary.tests_passed,
            summary.tests_failed,
            summary.tests_optional_failed,
            summary.tests_skipped
        );
        let clean = summary.overall_passed && !any_failed(&self.findings);
        let _ = writeln!(out, "overall: {}", if clean { "PASS" } else { "NOT PASSED" });
        out
    }
}

/// Accumulates TestRuns while a batch executes, then freezes the report.
pub struct ReportBuilder {
    suite_name: String,
    device_id: String,
    broker: Option<String>,
    dab_version: DabVersion,
    timestamp: String,
    device_info: Option<DeviceInfo>,
    findings: Vec<Finding>,
    runs: Vec<TestRun>,
}

impl ReportBuilder {
    pub(crate) fn new(suite_name: String, device_id: &str, dab_version: DabVersion) -> Self {
        Self {
            suite_name,
            device_id: device_id.to_owned(),
            broker: None,
            dab_version,
            timestamp: now_rfc3339(),
            device_info: None,
            findings: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub(crate) fn set_broker(&mut self, broker: &str) {
        self.broker = Some(broker.to_owned());
    }

    pub(crate) fn set_device_info(&mut self, info: DeviceInfo) {
        self.device_info = Some(info);
    }

    pub(crate) fn push(&mut self, run: TestRun) {
        self.runs.push(run);
    }

    pub(crate) fn add_findings(&mut self, findings: Vec<Finding>) {
        self.findings.extend(findings);
    }

    pub(crate) fn finish(self) -> BatchReport {
        BatchReport {
            test_version: env!("CARGO_PKG_VERSION").to_owned(),
            timestamp: self.timestamp,
            suite_name: self.suite_name,
            device_id: self.device_id,
            broker: self.broker,
            dab_version: self.dab_version.as_str().to_owned(),
            device_info: self.device_info,
            result_summary: ResultSummary::tally(&self.runs),
            findings: self.findings,
            test_result_list: self.runs,
        }
    }
}
