//! Topic grammar for DAB requests, responses, and telemetry streams.
//!
//! Requests go to `dab/<deviceId>/<operation>`; the device answers on the
//! request topic prefixed with `dab/_response/`. Telemetry metrics are a
//! plain stream, not part of the request/response pairing.

/// Root namespace of every DAB topic.
pub const NAMESPACE: &str = "dab";

/// Prefix under which devices publish responses.
pub const RESPONSE_PREFIX: &str = "dab/_response";

/// Request topic for one operation on one device.
#[must_use]
pub fn request_topic(device_id: &str, operation: &str) -> String {
    format!("{NAMESPACE}/{device_id}/{operation}")
}

/// Response topic paired with [`request_topic`].
#[must_use]
pub fn response_topic(device_id: &str, operation: &str) -> String {
    format!("{RESPONSE_PREFIX}/{}", request_topic(device_id, operation))
}

/// Response topic paired with an already-built request topic.
#[must_use]
pub fn response_topic_for(request_topic: &str) -> String {
    format!("{RESPONSE_PREFIX}/{request_topic}")
}

/// Subscription filter covering every response for one device.
#[must_use]
pub fn response_filter(device_id: &str) -> String {
    format!("{RESPONSE_PREFIX}/{NAMESPACE}/{device_id}/#")
}

/// Stream topic carrying device telemetry metrics.
#[must_use]
pub fn telemetry_topic(device_id: &str) -> String {
    format!("{NAMESPACE}/{device_id}/device-telemetry/metrics")
}

/// Stream topic carrying telemetry metrics for one application. The app id
/// is lowercased on the wire.
#[must_use]
pub fn app_telemetry_topic(device_id: &str, app_id: &str) -> String {
    format!(
        "{NAMESPACE}/{device_id}/app-telemetry/metrics/{}",
        app_id.to_lowercase()
    )
}

/// `true` when `topic` is under the response prefix.
#[must_use]
pub fn is_response_topic(topic: &str) -> bool {
    topic
        .strip_prefix(RESPONSE_PREFIX)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_response_topics() {
        assert_eq!(request_topic("tv-1", "device/info"), "dab/tv-1/device/info");
        assert_eq!(
            response_topic("tv-1", "device/info"),
            "dab/_response/dab/tv-1/device/info"
        );
        assert_eq!(
            response_topic_for("dab/tv-1/device/info"),
            "dab/_response/dab/tv-1/device/info"
        );
    }

    #[test]
    fn response_filter_covers_device() {
        assert_eq!(response_filter("tv-1"), "dab/_response/dab/tv-1/#");
    }

    #[test]
    fn telemetry_topic_shape() {
        assert_eq!(telemetry_topic("tv-1"), "dab/tv-1/device-telemetry/metrics");
        assert_eq!(
            app_telemetry_topic("tv-1", "YouTube"),
            "dab/tv-1/app-telemetry/metrics/youtube"
        );
    }

    #[test]
    fn response_topic_detection() {
        assert!(is_response_topic("dab/_response/dab/tv-1/version"));
        assert!(!is_response_topic("dab/tv-1/version"));
        assert!(!is_response_topic("dab/_responses/dab/tv-1/version"));
    }
}
