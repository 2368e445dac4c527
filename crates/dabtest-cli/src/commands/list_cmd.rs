use anyhow::Result;
use clap::Args;
use dab_tester::{AppConfig, Registry, Scope};

#[derive(Args)]
pub struct ListCommand {
    /// Restrict the listing to one suite
    #[arg(long, short)]
    pub suite: Option<String>,
}

pub fn execute(cmd: ListCommand, verbose: bool, debug: bool) -> Result<i32> {
    crate::init_basic_tracing(verbose, debug);

    let config = AppConfig::default();
    let registry = Registry::standard(&config)?;
    let all_suites = cmd.suite.is_none();
    let scope = cmd.suite.map_or(Scope::All, Scope::Suite);
    let cases = registry.select(&scope)?;
    for case in &cases {
        let marker = if case.negative { " [negative]" } else { "" };
        println!(
            "{:<44} {:<36} {:<14} {}{marker}",
            case.id,
            case.operation,
            case.versions.to_string(),
            case.suites.join(","),
        );
    }
    println!("{} cases", cases.len());
    if all_suites {
        println!("suites: {}", registry.suite_names().join(", "));
    }
    Ok(0)
}
