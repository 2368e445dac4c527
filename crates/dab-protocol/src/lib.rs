//! Protocol vocabulary for the DAB device-control protocol.
//!
//! DAB devices are driven over an MQTT broker: a request is published to
//! `dab/<deviceId>/<operation>` and the device answers on the paired response
//! topic with a JSON body carrying a `status` code and the echoed request
//! identifier. This crate holds the transport-independent pieces of that
//! contract: [`DabStatus`] codes, [`DabVersion`] ordering and detection,
//! the topic grammar, request/response [`envelope`] handling, and the
//! per-version [`operations`] catalogs a conforming device must advertise.
//!
//! The crate carries no async code or broker dependency; the tester engine
//! and any tooling around it share these types.

#![warn(clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod envelope;
pub mod operations;
pub mod status;
pub mod topic;
pub mod types;
pub mod version;

pub use envelope::{parse_response, request_body, EnvelopeParse, ResponseEnvelope};
pub use status::DabStatus;
pub use topic::{
    app_telemetry_topic, request_topic, response_filter, response_topic, response_topic_for,
    telemetry_topic,
};
pub use types::{AppStatePayload, DeviceInfo, HealthPayload, KeyListPayload, OperationsPayload, SettingsList, VersionPayload};
pub use version::{DabVersion, UnknownVersion, VersionSet};
