use anyhow::{Context, Result};
use clap::Args;
use dab_protocol::DabVersion;
use dab_tester::cancel::CancelHandle;
use dab_tester::{AppConfig, Correlator, Registry, Runner, Scope, SessionOptions};
use dialoguer::Input;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info};

use super::parsers::{parse_broker, parse_dab_version};

#[derive(Args)]
pub struct RunCommand {
    /// MQTT broker, as host or host:port
    #[arg(long, short = 'b', default_value = "localhost", value_parser = parse_broker)]
    pub broker: (String, u16),

    /// Device id segment of the request topics (dab/<device-id>/...)
    #[arg(long, short = 'I', default_value = "localhost")]
    pub device: String,

    /// Run a single suite (conformance, applications, negative, ...)
    #[arg(long, short, conflicts_with = "case")]
    pub suite: Option<String>,

    /// Run specific cases by id (repeatable)
    #[arg(long, short = 'c')]
    pub case: Vec<String>,

    /// Pin the DAB version instead of detecting it
    #[arg(long, value_parser = parse_dab_version)]
    pub dab_version: Option<DabVersion>,

    /// Per-request response timeout in seconds
    #[arg(long, short = 't', default_value = "90")]
    pub timeout: u64,

    /// Where to write the JSON report
    #[arg(long, short, default_value = "test_result/report.json")]
    pub output: PathBuf,

    /// Tester configuration file
    #[arg(long, default_value = "dabtest.toml")]
    pub config: PathBuf,

    /// Skip prompts and use defaults/fail if required args missing
    #[arg(long)]
    pub non_interactive: bool,
}

pub async fn execute(cmd: RunCommand, verbose: bool, debug: bool) -> Result<i32> {
    crate::init_basic_tracing(verbose, debug);

    let config = load_or_provision_config(&cmd.config, cmd.non_interactive)?;
    let registry = Registry::standard(&config)?;
    let scope = match (&cmd.suite, cmd.case.is_empty()) {
        (Some(suite), _) => Scope::Suite(suite.clone()),
        (None, false) => Scope::Cases(cmd.case.clone()),
        (None, true) => Scope::All,
    };

    let cancel = CancelHandle::default();
    let interrupter = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing the current case");
            interrupter.cancel();
        }
    });

    let (host, port) = cmd.broker.clone();
    debug!("connecting to {host}:{port}");
    let options = SessionOptions::new(&host, &cmd.device)
        .with_port(port)
        .with_timeout(Duration::from_secs(cmd.timeout));
    let correlator = Correlator::connect(options, cancel)
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;

    let runner = Runner::new(correlator, registry, config);
    let report = runner.run(&scope, cmd.dab_version).await?;
    runner.shutdown().await;

    print!("{}", report.render_text());
    report
        .save(&cmd.output)
        .with_context(|| format!("failed to write {}", cmd.output.display()))?;
    println!("report written to {}", cmd.output.display());

    Ok(i32::from(report.has_failures()))
}

fn load_or_provision_config(path: &Path, non_interactive: bool) -> Result<AppConfig> {
    if let Some(config) =
        AppConfig::load(path).with_context(|| format!("failed to load {}", path.display()))?
    {
        debug!("configuration loaded from {}", path.display());
        return Ok(config);
    }
    if non_interactive {
        debug!("no configuration at {}, writing defaults", path.display());
        let config = AppConfig::default();
        config
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        return Ok(config);
    }

    // First run: ask for the values that vary per test bench.
    println!("no configuration found at {}, creating one", path.display());
    let mut config = AppConfig::default();
    let sample: String = Input::new()
        .with_prompt("application id of the installable sample app")
        .default(config.app_id("sample_app"))
        .interact_text()
        .context("failed to read sample app id")?;
    config.apps.insert("sample_app".to_owned(), sample);
    let store: String = Input::new()
        .with_prompt("artifact store base URL")
        .default(config.store_url.clone())
        .interact_text()
        .context("failed to read store URL")?;
    config.store_url = store;
    config
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("✓ wrote {}", path.display());
    Ok(config)
}
