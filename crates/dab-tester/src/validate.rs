//! Conformance validation of the device's advertised operation set.

use dab_protocol::operations;
use dab_protocol::types::SettingsList;
use dab_protocol::DabVersion;
use serde::Serialize;

/// Weight of a finding. `Failed` findings fail the batch; `Gap` findings
/// are reported but never change the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Failed,
    Gap,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub topic: String,
    pub message: String,
}

/// One FAILED finding per mandatory operation (at `version`) absent from
/// the advertised set. Optional and unknown topics never produce findings.
#[must_use]
pub fn check_operations(advertised: &[String], version: DabVersion) -> Vec<Finding> {
    let mut findings = Vec::new();
    for operation in operations::mandatory_for(version) {
        if !advertised.iter().any(|topic| topic == operation) {
            findings.push(Finding {
                severity: Severity::Failed,
                topic: operation.to_owned(),
                message: format!("mandatory operation not advertised at version {version}"),
            });
        }
    }
    findings
}

/// Cross-checks the settings support map against the advertised set. A
/// device that reports supported settings must advertise
/// `system/settings/set`; the finding escalates from a gap to FAILED only
/// when the operation answered 501 during the same batch.
#[must_use]
pub fn check_settings(
    settings: &SettingsList,
    advertised: &[String],
    set_answered_501: bool,
) -> Vec<Finding> {
    let supported = settings.supported();
    if supported.is_empty() {
        return Vec::new();
    }
    let advertises_set = advertised
        .iter()
        .any(|topic| topic == operations::SETTINGS_SET);
    if advertises_set && !set_answered_501 {
        return Vec::new();
    }
    let (severity, reason) = if set_answered_501 {
        (Severity::Failed, "answered 501 this run")
    } else {
        (Severity::Gap, "is not advertised")
    };
    vec![Finding {
        severity,
        topic: operations::SETTINGS_SET.to_owned(),
        message: format!(
            "{} settings reported as supported but {} {reason}",
            supported.len(),
            operations::SETTINGS_SET
        ),
    }]
}

/// `true` when any finding carries FAILED weight.
#[must_use]
pub fn any_failed(findings: &[Finding]) -> bool {
    findings
        .iter()
        .any(|finding| finding.severity == Severity::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advertised_mandatory(version: DabVersion) -> Vec<String> {
        operations::mandatory_for(version)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn complete_set_yields_no_findings() {
        let advertised = advertised_mandatory(DabVersion::V2_0);
        assert!(check_operations(&advertised, DabVersion::V2_0).is_empty());
    }

    #[test]
    fn one_missing_operation_yields_one_finding() {
        let advertised: Vec<String> = advertised_mandatory(DabVersion::V2_0)
            .into_iter()
            .filter(|topic| topic != operations::APP_EXIT)
            .collect();
        let findings = check_operations(&advertised, DabVersion::V2_0);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].topic, operations::APP_EXIT);
        assert_eq!(findings[0].severity, Severity::Failed);
        assert!(any_failed(&findings));
    }

    #[test]
    fn optional_and_unknown_topics_are_ignored() {
        let mut advertised = advertised_mandatory(DabVersion::V2_0);
        advertised.push(operations::DEVICE_TELEMETRY_START.to_owned());
        advertised.push("vendor/private-op".to_owned());
        assert!(check_operations(&advertised, DabVersion::V2_0).is_empty());
    }

    #[test]
    fn higher_version_owes_more() {
        let advertised = advertised_mandatory(DabVersion::V2_0);
        let findings = check_operations(&advertised, DabVersion::V2_1);
        let topics: Vec<&str> = findings.iter().map(|f| f.topic.as_str()).collect();
        assert_eq!(
            topics,
            vec![
                operations::APP_INSTALL,
                operations::APP_UNINSTALL,
                operations::APP_CLEAR_DATA,
                operations::APP_INSTALL_FROM_APPSTORE,
            ]
        );
    }

    #[test]
    fn settings_gap_is_nonfatal_until_501_observed() {
        let settings: SettingsList =
            serde_json::from_value(serde_json::json!({"language": ["en-US"], "memc": true}))
                .unwrap();
        let advertised = vec![operations::SETTINGS_LIST.to_owned()];

        let findings = check_settings(&settings, &advertised, false);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Gap);
        assert!(!any_failed(&findings));

        let findings = check_settings(&settings, &advertised, true);
        assert_eq!(findings[0].severity, Severity::Failed);
    }

    #[test]
    fn settings_check_is_quiet_when_set_is_advertised() {
        let settings: SettingsList =
            serde_json::from_value(serde_json::json!({"language": ["en-US"]})).unwrap();
        let advertised = vec![operations::SETTINGS_SET.to_owned()];
        assert!(check_settings(&settings, &advertised, false).is_empty());
    }

    #[test]
    fn no_supported_settings_means_nothing_to_check() {
        let settings: SettingsList =
            serde_json::from_value(serde_json::json!({"cec": false, "hdr": []})).unwrap();
        assert!(check_settings(&settings, &[], false).is_empty());
    }
}
