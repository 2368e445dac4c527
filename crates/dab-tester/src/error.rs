use thiserror::Error;

pub type Result<T> = std::result::Result<T, DabError>;

/// Engine errors. Exchange-level trouble (timeouts, malformed payloads,
/// a dropped connection mid-request) never surfaces here; those become
/// exchange outcomes so the classifier can turn them into verdicts.
#[derive(Debug, Error)]
pub enum DabError {
    /// The MQTT session could not be established or a publish was refused.
    /// The only error that aborts a running batch.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown suite: {0}")]
    UnknownSuite(String),

    #[error("unknown test case: {0}")]
    UnknownCase(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
