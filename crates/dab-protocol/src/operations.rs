//! Operation catalogs: which request topics a conforming device must
//! advertise at each protocol version.
//!
//! The mandatory set is cumulative. A device reporting `2.1` owes everything
//! in the `2.0` set plus the `2.1` additions. Telemetry and voice operations
//! are optional at every version.

use crate::version::DabVersion;

pub const OPERATIONS_LIST: &str = "operations/list";
pub const VERSION: &str = "version";
pub const DEVICE_INFO: &str = "device/info";
pub const HEALTH_CHECK: &str = "health-check/get";
pub const APPLICATIONS_LIST: &str = "applications/list";
pub const APP_LAUNCH: &str = "applications/launch";
pub const APP_LAUNCH_WITH_CONTENT: &str = "applications/launch-with-content";
pub const APP_GET_STATE: &str = "applications/get-state";
pub const APP_EXIT: &str = "applications/exit";
pub const APP_INSTALL: &str = "applications/install";
pub const APP_UNINSTALL: &str = "applications/uninstall";
pub const APP_CLEAR_DATA: &str = "applications/clear-data";
pub const APP_INSTALL_FROM_APPSTORE: &str = "applications/install-from-appstore";
pub const SYSTEM_RESTART: &str = "system/restart";
pub const SETTINGS_LIST: &str = "system/settings/list";
pub const SETTINGS_GET: &str = "system/settings/get";
pub const SETTINGS_SET: &str = "system/settings/set";
pub const KEY_LIST: &str = "input/key/list";
pub const KEY_PRESS: &str = "input/key-press";
pub const LONG_KEY_PRESS: &str = "input/long-key-press";
pub const OUTPUT_IMAGE: &str = "output/image";
pub const CONTENT_SEARCH: &str = "content/search";
pub const CONTENT_RECOMMENDATIONS: &str = "content/recommendations";
pub const DEVICE_TELEMETRY_START: &str = "device-telemetry/start";
pub const DEVICE_TELEMETRY_STOP: &str = "device-telemetry/stop";
pub const APP_TELEMETRY_START: &str = "app-telemetry/start";
pub const APP_TELEMETRY_STOP: &str = "app-telemetry/stop";
pub const VOICE_LIST: &str = "voice/list";
pub const VOICE_SET: &str = "voice/set";
pub const VOICE_SEND_TEXT: &str = "voice/send-text";
pub const VOICE_SEND_AUDIO: &str = "voice/send-audio";

/// Operations every device must advertise, regardless of version.
pub const MANDATORY_V2_0: &[&str] = &[
    OPERATIONS_LIST,
    VERSION,
    DEVICE_INFO,
    HEALTH_CHECK,
    APPLICATIONS_LIST,
    APP_LAUNCH,
    APP_LAUNCH_WITH_CONTENT,
    APP_GET_STATE,
    APP_EXIT,
    SYSTEM_RESTART,
    SETTINGS_LIST,
    SETTINGS_GET,
    SETTINGS_SET,
    KEY_LIST,
    KEY_PRESS,
    LONG_KEY_PRESS,
    OUTPUT_IMAGE,
];

/// Operations added to the mandatory set at version 2.1.
pub const MANDATORY_ADDED_V2_1: &[&str] = &[
    APP_INSTALL,
    APP_UNINSTALL,
    APP_CLEAR_DATA,
    APP_INSTALL_FROM_APPSTORE,
];

/// Operations added to the mandatory set at version 2.2.
pub const MANDATORY_ADDED_V2_2: &[&str] = &[CONTENT_SEARCH, CONTENT_RECOMMENDATIONS];

/// Operations a device may advertise without owing them at any version.
pub const OPTIONAL: &[&str] = &[
    DEVICE_TELEMETRY_START,
    DEVICE_TELEMETRY_STOP,
    APP_TELEMETRY_START,
    APP_TELEMETRY_STOP,
    VOICE_LIST,
    VOICE_SET,
    VOICE_SEND_TEXT,
    VOICE_SEND_AUDIO,
];

/// Returns the full mandatory catalog for `version`, in catalog order.
#[must_use]
pub fn mandatory_for(version: DabVersion) -> Vec<&'static str> {
    let mut operations = MANDATORY_V2_0.to_vec();
    if version >= DabVersion::V2_1 {
        operations.extend_from_slice(MANDATORY_ADDED_V2_1);
    }
    if version >= DabVersion::V2_2 {
        operations.extend_from_slice(MANDATORY_ADDED_V2_2);
    }
    operations
}

/// Returns true when `operation` is optional at every version.
#[must_use]
pub fn is_optional(operation: &str) -> bool {
    OPTIONAL.contains(&operation)
}

/// Returns true when `operation` appears in any catalog.
#[must_use]
pub fn is_known(operation: &str) -> bool {
    MANDATORY_V2_0.contains(&operation)
        || MANDATORY_ADDED_V2_1.contains(&operation)
        || MANDATORY_ADDED_V2_2.contains(&operation)
        || OPTIONAL.contains(&operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandatory_sets_are_cumulative() {
        let base = mandatory_for(DabVersion::V2_0);
        let mid = mandatory_for(DabVersion::V2_1);
        let top = mandatory_for(DabVersion::V2_2);
        assert_eq!(base.len(), 17);
        assert_eq!(mid.len(), 21);
        assert_eq!(top.len(), 23);
        assert!(mid.iter().all(|op| top.contains(op)));
        assert!(base.iter().all(|op| mid.contains(op)));
    }

    #[test]
    fn install_is_mandatory_only_from_2_1() {
        assert!(!mandatory_for(DabVersion::V2_0).contains(&APP_INSTALL));
        assert!(mandatory_for(DabVersion::V2_1).contains(&APP_INSTALL));
    }

    #[test]
    fn content_search_is_mandatory_only_from_2_2() {
        assert!(!mandatory_for(DabVersion::V2_1).contains(&CONTENT_SEARCH));
        assert!(mandatory_for(DabVersion::V2_2).contains(&CONTENT_SEARCH));
    }

    #[test]
    fn telemetry_is_always_optional() {
        assert!(is_optional(DEVICE_TELEMETRY_START));
        assert!(!mandatory_for(DabVersion::V2_2).contains(&DEVICE_TELEMETRY_START));
    }

    #[test]
    fn catalog_membership() {
        assert!(is_known(SETTINGS_SET));
        assert!(is_known(VOICE_SEND_AUDIO));
        assert!(!is_known("made/up"));
    }
}
