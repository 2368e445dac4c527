//! Batch orchestration: scope resolution, precheck gates, case execution,
//! and report assembly.
//!
//! A case failure never aborts a batch. Every error inside a case body is
//! converted to a verdict at the case boundary; only a connect failure at
//! batch start propagates as an error.

use crate::classify::{classify, CheckOutcome, Classification, Expectation, Verdict};
use crate::config::AppConfig;
use crate::correlator::{Correlator, Exchange};
use crate::device::DeviceProfile;
use crate::error::Result;
use crate::registry::{CaseBody, CaseContext, ExchangeSpec, Precheck, Registry, Scope, ScriptFn, ScriptHalt, TestCase};
use crate::report::{now_rfc3339, BatchReport, ReportBuilder, TestRun};
use crate::validate::{check_operations, check_settings};
use dab_protocol::{operations, DabStatus, DabVersion};
use serde_json::{Map, Value};

enum Gate {
    Clear,
    Blocked(String),
}

pub struct Runner {
    correlator: Correlator,
    registry: Registry,
    config: AppConfig,
}

impl Runner {
    pub fn new(correlator: Correlator, registry: Registry, config: AppConfig) -> Self {
        Self {
            correlator,
            registry,
            config,
        }
    }

    #[must_use]
    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Closes the underlying session.
    pub async fn shutdown(self) {
        self.correlator.disconnect().await;
    }

    /// Executes every case the scope selects and returns the frozen report.
    pub async fn run(
        &self,
        scope: &Scope,
        forced_version: Option<DabVersion>,
    ) -> Result<BatchReport> {
        let selected = self.registry.select(scope)?;
        let mut profile = DeviceProfile::new(forced_version);
        let version = profile.effective_version(&self.correlator).await;
        tracing::info!(%version, cases = selected.len(), "batch started");
        let mut builder = ReportBuilder::new(scope.label(), self.correlator.device_id(), version);
        if let Some(broker) = self.correlator.broker() {
            builder.set_broker(broker);
        }
        if let Some(info) = profile.device_info(&self.correlator).await {
            builder.set_device_info(info.clone());
        }
        for case in selected {
            let run = if self.correlator.cancel_handle().is_cancelled() {
                interrupted_run(case)
            } else {
                self.run_case(&mut profile, case, version).await
            };
            tracing::info!(id = %run.test_id, verdict = %run.verdict, "{}", run.message);
            builder.push(run);
        }
        if validation_applies(scope) {
            self.validate(&mut profile, version, &mut builder).await;
        }
        Ok(builder.finish())
    }

    async fn run_case(
        &self,
        profile: &mut DeviceProfile,
        case: &TestCase,
        version: DabVersion,
    ) -> TestRun {
        let timestamp = now_rfc3339();
        let started = tokio::time::Instant::now();
        let (classification, exchanges, logs) = self.execute(profile, case, version).await;
        for exchange in &exchanges {
            if exchange
                .outcome
                .status()
                .is_some_and(DabStatus::is_not_implemented)
            {
                profile.note_not_implemented(&exchange.operation);
            }
        }
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        TestRun::assemble(
            &case.id,
            case.operation,
            classification,
            exchanges,
            logs,
            timestamp,
            duration_ms,
        )
    }

    async fn execute(
        &self,
        profile: &mut DeviceProfile,
        case: &TestCase,
        version: DabVersion,
    ) -> (Classification, Vec<Exchange>, Vec<String>) {
        if !case.versions.contains(version) {
            let classification = Classification {
                verdict: Verdict::OptionalFailed,
                message: format!("not applicable at version {version}"),
            };
            return (classification, Vec::new(), Vec::new());
        }
        if let Gate::Blocked(reason) = self.precheck(profile, case).await {
            let classification = Classification {
                verdict: Verdict::Skipped,
                message: format!("precheck failed: {reason}"),
            };
            return (classification, Vec::new(), Vec::new());
        }
        match &case.body {
            CaseBody::Exchange(spec) => self.run_exchange(case, spec).await,
            CaseBody::Script(script) => self.run_script(case, *script, version).await,
        }
    }

    async fn precheck(&self, profile: &mut DeviceProfile, case: &TestCase) -> Gate {
        match case.precheck {
            Precheck::None => Gate::Clear,
            Precheck::HealthCheck => {
                let exchange = self
                    .correlator
                    .request(operations::HEALTH_CHECK, &Map::new())
                    .await;
                match exchange.outcome.response() {
                    Some(envelope) if envelope.status.is_success() => {
                        match envelope.body.get("healthy").and_then(Value::as_bool) {
                            Some(true) => Gate::Clear,
                            _ => Gate::Blocked("device reports unhealthy".to_owned()),
                        }
                    }
                    _ => Gate::Blocked("health check did not answer".to_owned()),
                }
            }
            Precheck::OperationAdvertised => {
                match profile.advertised(&self.correlator).await {
                    Some(advertised) if advertised.iter().any(|op| op == case.operation) => {
                        Gate::Clear
                    }
                    Some(_) => Gate::Blocked(format!("{} not advertised", case.operation)),
                    None => Gate::Blocked("operations/list unavailable".to_owned()),
                }
            }
            Precheck::SettingSupported(setting) => {
                match profile.settings(&self.correlator).await {
                    Some(settings) if settings.is_supported(setting) => Gate::Clear,
                    Some(_) => Gate::Blocked(format!("setting {setting} not supported")),
                    None => Gate::Blocked("system/settings/list unavailable".to_owned()),
                }
            }
            Precheck::KeySupported(code) => match profile.key_list(&self.correlator).await {
                Some(keys) if keys.supports(code) => Gate::Clear,
                Some(_) => Gate::Blocked(format!("key {code} not in input/key/list")),
                None => Gate::Blocked("input/key/list unavailable".to_owned()),
            },
        }
    }

    async fn run_exchange(
        &self,
        case: &TestCase,
        spec: &ExchangeSpec,
    ) -> (Classification, Vec<Exchange>, Vec<String>) {
        let exchange = self.correlator.request(case.operation, &spec.payload).await;
        let check = match (spec.check, exchange.outcome.response()) {
            (Some(check), Some(envelope)) if envelope.status.is_success() => {
                match check(&envelope.body) {
                    Ok(()) => CheckOutcome::Passed,
                    Err(reason) => CheckOutcome::Failed(reason),
                }
            }
            _ => CheckOutcome::NotEvaluated,
        };
        let expectation = Expectation {
            negative: case.negative,
            latency: spec.latency,
            check,
        };
        let classification = classify(&exchange, &expectation);
        (classification, vec![exchange], Vec::new())
    }

    async fn run_script(
        &self,
        case: &TestCase,
        script: ScriptFn,
        version: DabVersion,
    ) -> (Classification, Vec<Exchange>, Vec<String>) {
        let mut ctx = CaseContext::new(&self.correlator, &self.config, version);
        let result = script(&mut ctx).await;
        let (exchanges, logs) = ctx.into_parts();
        let classification = match result {
            Ok(()) => Classification {
                verdict: Verdict::Pass,
                message: format!(
                    "completed in {}ms",
                    exchanges.iter().map(|exchange| exchange.elapsed_ms).sum::<u64>()
                ),
            },
            Err(ScriptHalt::Check(message)) => Classification {
                verdict: Verdict::Failed,
                message,
            },
            Err(ScriptHalt::Skip(message)) => Classification {
                verdict: Verdict::Skipped,
                message,
            },
            Err(ScriptHalt::Exchange) => match exchanges.last() {
                Some(last) => classify(last, &Expectation::bare(case.negative)),
                None => Classification {
                    verdict: Verdict::Failed,
                    message: "script halted without an exchange".to_owned(),
                },
            },
        };
        (classification, exchanges, logs)
    }

    /// Advertised-set validation, run after the cases for full and
    /// conformance scopes.
    async fn validate(
        &self,
        profile: &mut DeviceProfile,
        version: DabVersion,
        builder: &mut ReportBuilder,
    ) {
        let Some(advertised) = profile.advertised(&self.correlator).await else {
            tracing::warn!("operations/list unavailable; advertised-set validation skipped");
            return;
        };
        let advertised = advertised.to_vec();
        let mut findings = check_operations(&advertised, version);
        let set_answered_501 = profile.was_not_implemented(operations::SETTINGS_SET);
        if let Some(settings) = profile.settings(&self.correlator).await {
            findings.extend(check_settings(settings, &advertised, set_answered_501));
        }
        for finding in &findings {
            tracing::warn!(topic = %finding.topic, "{}", finding.message);
        }
        builder.add_findings(findings);
    }
}

fn interrupted_run(case: &TestCase) -> TestRun {
    TestRun::assemble(
        &case.id,
        case.operation,
        Classification {
            verdict: Verdict::Skipped,
            message: "operator interrupt".to_owned(),
        },
        Vec::new(),
        Vec::new(),
        now_rfc3339(),
        0,
    )
}

fn validation_applies(scope: &Scope) -> bool {
    match scope {
        Scope::All => true,
        Scope::Suite(name) => name.as_str() == crate::cases::CONFORMANCE,
        Scope::Cases(_) => false,
    }
}
