use anyhow::{Context, Result};
use clap::Args;
use dab_protocol::DabVersion;
use dab_tester::cancel::CancelHandle;
use dab_tester::validate::{any_failed, check_operations, check_settings};
use dab_tester::{Correlator, DeviceProfile, SessionOptions, Severity};
use std::time::Duration;

use super::parsers::{parse_broker, parse_dab_version};

#[derive(Args)]
pub struct CheckCommand {
    /// MQTT broker, as host or host:port
    #[arg(long, short = 'b', default_value = "localhost", value_parser = parse_broker)]
    pub broker: (String, u16),

    /// Device id segment of the request topics
    #[arg(long, short = 'I', default_value = "localhost")]
    pub device: String,

    /// Validate against this version instead of detecting one
    #[arg(long, value_parser = parse_dab_version)]
    pub dab_version: Option<DabVersion>,

    /// Per-request response timeout in seconds
    #[arg(long, short = 't', default_value = "90")]
    pub timeout: u64,
}

/// Validates the advertised operation set without driving any cases.
pub async fn execute(cmd: CheckCommand, verbose: bool, debug: bool) -> Result<i32> {
    crate::init_basic_tracing(verbose, debug);

    let (host, port) = cmd.broker.clone();
    let options = SessionOptions::new(&host, &cmd.device)
        .with_port(port)
        .with_timeout(Duration::from_secs(cmd.timeout));
    let correlator = Correlator::connect(options, CancelHandle::default())
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;

    let mut profile = DeviceProfile::new(cmd.dab_version);
    let version = profile.effective_version(&correlator).await;
    println!("device {} speaks DAB {version}", cmd.device);

    let Some(advertised) = profile.advertised(&correlator).await else {
        correlator.disconnect().await;
        anyhow::bail!("operations/list did not answer");
    };
    let advertised = advertised.to_vec();
    println!("{} operations advertised", advertised.len());

    let mut findings = check_operations(&advertised, version);
    if let Some(settings) = profile.settings(&correlator).await {
        findings.extend(check_settings(settings, &advertised, false));
    }
    correlator.disconnect().await;

    if findings.is_empty() {
        println!("✓ advertised set is complete for DAB {version}");
        return Ok(0);
    }
    for finding in &findings {
        let marker = match finding.severity {
            Severity::Failed => "FAIL",
            Severity::Gap => "gap ",
        };
        println!("[{marker}] {}: {}", finding.topic, finding.message);
    }
    Ok(i32::from(any_failed(&findings)))
}
