//! Runtime configuration: which installed applications the catalog drives
//! and where test artifacts live.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Base URL for voice clips and screenshot uploads when the operator has
/// not pointed the tester at their own store.
pub const DEFAULT_STORE_URL: &str = "https://storage.googleapis.com/ytlr-cert.appspot.com";

/// Immutable value handed to case bodies; never engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logical name (`youtube`, `sample_app`, ...) to installed app id.
    pub apps: BTreeMap<String, String>,
    /// Voice assistant targeted by the voice cases.
    pub voice_system: String,
    /// Artifact store for voice clips and screenshot uploads.
    pub store_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            apps: default_apps(),
            voice_system: "GoogleAssistant".to_owned(),
            store_url: DEFAULT_STORE_URL.to_owned(),
        }
    }
}

fn default_apps() -> BTreeMap<String, String> {
    [
        ("youtube", "YouTube"),
        ("netflix", "Netflix"),
        ("amazon", "PrimeVideo"),
        ("sample_app", "Sample_App"),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_owned(), id.to_owned()))
    .collect()
}

impl AppConfig {
    /// Loads the configuration file, `Ok(None)` when it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        let config = toml::from_str(&text)?;
        Ok(Some(config))
    }

    /// Writes the configuration, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Installed app id for a logical name, falling back to the stock
    /// defaults when the operator's file dropped an entry.
    #[must_use]
    pub fn app_id(&self, name: &str) -> String {
        if let Some(id) = self.apps.get(name) {
            return id.clone();
        }
        match name {
            "youtube" => "YouTube",
            "netflix" => "Netflix",
            "amazon" => "PrimeVideo",
            "sample_app" => "Sample_App",
            other => other,
        }
        .to_owned()
    }

    /// URL of an artifact under the configured store.
    #[must_use]
    pub fn artifact_url(&self, relative: &str) -> String {
        format!("{}/{}", self.store_url.trim_end_matches('/'), relative)
    }
}
