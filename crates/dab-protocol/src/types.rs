//! Serde types for the well-known response payloads.
//!
//! These deserialize straight from a response envelope body, so unknown
//! members (including the envelope's own `requestId` and `status`) are
//! tolerated everywhere. Fields a device may omit default to empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a `version` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionPayload {
    #[serde(default)]
    pub versions: Vec<String>,
}

/// Body of an `operations/list` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationsPayload {
    #[serde(default)]
    pub operations: Vec<String>,
}

/// Body of a `device/info` response. Captured once per batch for the
/// report header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chipset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl DeviceInfo {
    /// One-line `manufacturer model (firmware)` summary for log output.
    #[must_use]
    pub fn summary(&self) -> String {
        let manufacturer = self.manufacturer.as_deref().unwrap_or("unknown");
        let model = self.model.as_deref().unwrap_or("unknown");
        match self.firmware_version.as_deref() {
            Some(firmware) => format!("{manufacturer} {model} ({firmware})"),
            None => format!("{manufacturer} {model}"),
        }
    }
}

/// Body of a `system/settings/list` response: a map of setting name to
/// support marker.
///
/// A setting counts as supported when its marker is `true` or a non-empty
/// array of accepted values. Everything else, including the envelope
/// members themselves, is unsupported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsList {
    #[serde(flatten)]
    settings: Map<String, Value>,
}

impl SettingsList {
    #[must_use]
    pub fn is_supported(&self, name: &str) -> bool {
        self.settings.get(name).is_some_and(marker_is_supported)
    }

    /// Names of all settings the device reports as supported.
    #[must_use]
    pub fn supported(&self) -> Vec<&str> {
        self.settings
            .iter()
            .filter(|(_, marker)| marker_is_supported(marker))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn marker_is_supported(marker: &Value) -> bool {
    match marker {
        Value::Bool(flag) => *flag,
        Value::Array(accepted) => !accepted.is_empty(),
        _ => false,
    }
}

/// Body of an `input/key/list` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyListPayload {
    #[serde(default, rename = "keyCodes")]
    pub key_codes: Vec<String>,
}

impl KeyListPayload {
    #[must_use]
    pub fn supports(&self, key_code: &str) -> bool {
        self.key_codes.iter().any(|code| code == key_code)
    }
}

/// Body of a `health-check/get` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthPayload {
    #[serde(default)]
    pub healthy: bool,
}

/// Body of an `applications/get-state` response. Known states are
/// `FOREGROUND`, `BACKGROUND` and `STOPPED`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppStatePayload {
    #[serde(default)]
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_info_tolerates_missing_fields() {
        let info: DeviceInfo =
            serde_json::from_value(json!({"requestId": "x", "status": 200, "model": "TV-9"}))
                .unwrap();
        assert_eq!(info.model.as_deref(), Some("TV-9"));
        assert!(info.manufacturer.is_none());
        assert_eq!(info.summary(), "unknown TV-9");
    }

    #[test]
    fn device_info_serializes_camel_case() {
        let info = DeviceInfo {
            serial_number: Some("SN-1".to_owned()),
            ..DeviceInfo::default()
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value, json!({"serialNumber": "SN-1"}));
    }

    #[test]
    fn settings_support_markers() {
        let list: SettingsList = serde_json::from_value(json!({
            "requestId": "x",
            "status": 200,
            "language": ["en-US", "fr-FR"],
            "outputResolution": [],
            "memc": true,
            "cec": false,
            "label": "living room",
        }))
        .unwrap();
        assert!(list.is_supported("language"));
        assert!(list.is_supported("memc"));
        assert!(!list.is_supported("outputResolution"));
        assert!(!list.is_supported("cec"));
        assert!(!list.is_supported("label"));
        assert!(!list.is_supported("absent"));
        let mut supported = list.supported();
        supported.sort_unstable();
        assert_eq!(supported, vec!["language", "memc"]);
    }

    #[test]
    fn key_list_lookup() {
        let keys: KeyListPayload =
            serde_json::from_value(json!({"keyCodes": ["KEY_HOME", "KEY_BACK"]})).unwrap();
        assert!(keys.supports("KEY_HOME"));
        assert!(!keys.supports("KEY_POWER"));
    }

    #[test]
    fn health_defaults_to_unhealthy() {
        let health: HealthPayload = serde_json::from_value(json!({"status": 200})).unwrap();
        assert!(!health.healthy);
    }

    #[test]
    fn app_state_parses() {
        let state: AppStatePayload =
            serde_json::from_value(json!({"state": "FOREGROUND"})).unwrap();
        assert_eq!(state.state, "FOREGROUND");
    }
}
