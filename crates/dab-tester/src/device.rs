//! Per-batch device knowledge, resolved lazily and at most once.

use crate::correlator::Correlator;
use dab_protocol::operations;
use dab_protocol::types::{
    DeviceInfo, KeyListPayload, OperationsPayload, SettingsList, VersionPayload,
};
use dab_protocol::DabVersion;
use serde_json::Map;
use std::collections::HashSet;

/// Everything the engine learns about the device under test during one
/// batch. Each piece is fetched on first use; a failed fetch is remembered
/// so the device is never asked twice.
pub struct DeviceProfile {
    forced_version: Option<DabVersion>,
    version: Option<DabVersion>,
    advertised_queried: bool,
    advertised: Option<Vec<String>>,
    settings_queried: bool,
    settings: Option<SettingsList>,
    keys_queried: bool,
    keys: Option<KeyListPayload>,
    info_queried: bool,
    info: Option<DeviceInfo>,
    not_implemented: HashSet<String>,
}

impl DeviceProfile {
    #[must_use]
    pub fn new(forced_version: Option<DabVersion>) -> Self {
        Self {
            forced_version,
            version: None,
            advertised_queried: false,
            advertised: None,
            settings_queried: false,
            settings: None,
            keys_queried: false,
            keys: None,
            info_queried: false,
            info: None,
            not_implemented: HashSet::new(),
        }
    }

    /// The batch-wide protocol version: the operator's override, or one
    /// detection exchange on the first call. When detection fails the
    /// engine proceeds at 2.0.
    pub async fn effective_version(&mut self, correlator: &Correlator) -> DabVersion {
        if let Some(version) = self.forced_version {
            return version;
        }
        if let Some(version) = self.version {
            return version;
        }
        let exchange = correlator.request(operations::VERSION, &Map::new()).await;
        let detected = exchange
            .outcome
            .response()
            .filter(|envelope| envelope.status.is_success())
            .and_then(|envelope| envelope.payload::<VersionPayload>().ok())
            .and_then(|payload| DabVersion::pick_highest(&payload.versions));
        let version = match detected {
            Some(version) => {
                tracing::info!(%version, "protocol version detected");
                version
            }
            None => {
                tracing::warn!(
                    fallback = %DabVersion::DEFAULT,
                    "version detection failed, proceeding at the default version"
                );
                DabVersion::DEFAULT
            }
        };
        self.version = Some(version);
        version
    }

    /// Topics the device claims via `operations/list`, queried once per
    /// batch. `None` when the query failed.
    pub async fn advertised(&mut self, correlator: &Correlator) -> Option<&[String]> {
        if !self.advertised_queried {
            self.advertised_queried = true;
            let exchange = correlator
                .request(operations::OPERATIONS_LIST, &Map::new())
                .await;
            self.advertised = exchange
                .outcome
                .response()
                .filter(|envelope| envelope.status.is_success())
                .and_then(|envelope| envelope.payload::<OperationsPayload>().ok())
                .map(|payload| payload.operations);
            if self.advertised.is_none() {
                tracing::warn!("operations/list query failed, advertised set unavailable");
            }
        }
        self.advertised.as_deref()
    }

    /// The device's settings support map, queried once per batch.
    pub async fn settings(&mut self, correlator: &Correlator) -> Option<&SettingsList> {
        if !self.settings_queried {
            self.settings_queried = true;
            let exchange = correlator
                .request(operations::SETTINGS_LIST, &Map::new())
                .await;
            self.settings = exchange
                .outcome
                .response()
                .filter(|envelope| envelope.status.is_success())
                .and_then(|envelope| envelope.payload::<SettingsList>().ok());
            if self.settings.is_none() {
                tracing::warn!("system/settings/list query failed");
            }
        }
        self.settings.as_ref()
    }

    /// Key codes the device accepts, queried once per batch.
    pub async fn key_list(&mut self, correlator: &Correlator) -> Option<&KeyListPayload> {
        if !self.keys_queried {
            self.keys_queried = true;
            let exchange = correlator.request(operations::KEY_LIST, &Map::new()).await;
            self.keys = exchange
                .outcome
                .response()
                .filter(|envelope| envelope.status.is_success())
                .and_then(|envelope| envelope.payload::<KeyListPayload>().ok());
            if self.keys.is_none() {
                tracing::warn!("input/key/list query failed");
            }
        }
        self.keys.as_ref()
    }

    /// Device identity for the report header, queried once per batch.
    pub async fn device_info(&mut self, correlator: &Correlator) -> Option<&DeviceInfo> {
        if !self.info_queried {
            self.info_queried = true;
            let exchange = correlator
                .request(operations::DEVICE_INFO, &Map::new())
                .await;
            self.info = exchange
                .outcome
                .response()
                .filter(|envelope| envelope.status.is_success())
                .and_then(|envelope| envelope.payload::<DeviceInfo>().ok());
            match &self.info {
                Some(info) => tracing::info!(device = %info.summary(), "device identified"),
                None => tracing::warn!("device/info query failed"),
            }
        }
        self.info.as_ref()
    }

    /// Records a 501 observed for `operation` during this batch.
    pub fn note_not_implemented(&mut self, operation: &str) {
        self.not_implemented.insert(operation.to_owned());
    }

    #[must_use]
    pub fn was_not_implemented(&self, operation: &str) -> bool {
        self.not_implemented.contains(operation)
    }
}
