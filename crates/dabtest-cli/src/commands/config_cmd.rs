use anyhow::{Context, Result};
use clap::Args;
use dab_tester::AppConfig;
use dialoguer::Input;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigCommand {
    /// Path of the configuration file
    #[arg(long, default_value = "dabtest.toml")]
    pub config: PathBuf,

    /// Write defaults without prompting
    #[arg(long)]
    pub non_interactive: bool,

    /// Recreate the file even when one exists
    #[arg(long)]
    pub force: bool,
}

/// Prints the configuration when one exists; provisions it otherwise.
pub fn execute(cmd: ConfigCommand, verbose: bool, debug: bool) -> Result<i32> {
    crate::init_basic_tracing(verbose, debug);

    if !cmd.force {
        if let Some(config) = AppConfig::load(&cmd.config)
            .with_context(|| format!("failed to load {}", cmd.config.display()))?
        {
            print!("{}", toml::to_string_pretty(&config)?);
            return Ok(0);
        }
    }
    let mut config = AppConfig::default();
    if !cmd.non_interactive {
        for name in ["youtube", "netflix", "amazon", "sample_app"] {
            let id: String = Input::new()
                .with_prompt(format!("application id for {name}"))
                .default(config.app_id(name))
                .interact_text()
                .context("failed to read application id")?;
            config.apps.insert(name.to_owned(), id);
        }
        let assistant: String = Input::new()
            .with_prompt("voice system name")
            .default(config.voice_system.clone())
            .interact_text()
            .context("failed to read voice system")?;
        config.voice_system = assistant;
        let store: String = Input::new()
            .with_prompt("artifact store base URL")
            .default(config.store_url.clone())
            .interact_text()
            .context("failed to read store URL")?;
        config.store_url = store;
    }
    config
        .save(&cmd.config)
        .with_context(|| format!("failed to write {}", cmd.config.display()))?;
    println!("✓ wrote {}", cmd.config.display());
    Ok(0)
}
