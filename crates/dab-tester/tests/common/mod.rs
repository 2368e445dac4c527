//! Shared fixtures: an in-process broker plus a scriptable device that
//! answers DAB requests the way conforming hardware would.

#![allow(dead_code)]

use dab_protocol::topic::{app_telemetry_topic, response_topic_for, telemetry_topic};
use dab_protocol::{operations, DabVersion};
use dab_tester::cancel::CancelHandle;
use dab_tester::correlator::Correlator;
use dab_tester::transport::memory::{MemoryBroker, MemoryEvents, MemoryTransport};
use dab_tester::transport::{TransportEvents, TransportHandle};
use dab_tester::{AppConfig, Registry, Runner};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEVICE_ID: &str = "tv-under-test";

/// How a scripted operation answers, overriding the stock behavior.
#[derive(Clone)]
pub enum Respond {
    Status(u16),
    Body(u16, Value),
    Delayed(Duration, u16),
    /// Valid JSON that is not a response envelope.
    BareJson(Value),
    /// Bytes that do not parse at all.
    Garbage,
    /// Never answers.
    Silent,
    /// Answers with somebody else's correlation id.
    WrongId,
}

pub type Script = HashMap<&'static str, Respond>;

pub struct DeviceSpec {
    pub versions: Vec<String>,
    pub operations: Vec<String>,
    pub script: Script,
}

impl Default for DeviceSpec {
    fn default() -> Self {
        let mut advertised: Vec<String> = operations::mandatory_for(DabVersion::V2_2)
            .into_iter()
            .map(str::to_owned)
            .collect();
        advertised.extend(operations::OPTIONAL.iter().map(|op| (*op).to_owned()));
        Self {
            versions: vec!["2.0".to_owned(), "2.1".to_owned(), "2.2".to_owned()],
            operations: advertised,
            script: Script::new(),
        }
    }
}

impl DeviceSpec {
    pub fn with_script(mut self, operation: &'static str, respond: Respond) -> Self {
        self.script.insert(operation, respond);
        self
    }

    pub fn without_operation(mut self, operation: &str) -> Self {
        self.operations.retain(|op| op != operation);
        self
    }

    pub fn with_versions(mut self, versions: &[&str]) -> Self {
        self.versions = versions.iter().map(|v| (*v).to_owned()).collect();
        self
    }
}

#[derive(Clone)]
pub struct SeenRequest {
    pub operation: String,
    pub body: Value,
}

pub struct FakeDevice {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    task: JoinHandle<()>,
}

impl FakeDevice {
    pub fn spawn(broker: &MemoryBroker, spec: DeviceSpec) -> Self {
        let (transport, events) = broker.client();
        transport
            .subscribe(&format!("dab/{DEVICE_ID}/#"))
            .expect("device subscription");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(device_loop(transport, events, spec, Arc::clone(&seen)));
        Self { seen, task }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|request| request.operation == operation)
            .count()
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn session(broker: &MemoryBroker, timeout: Duration) -> Correlator {
    session_with_cancel(broker, timeout, CancelHandle::default()).await
}

pub async fn session_with_cancel(
    broker: &MemoryBroker,
    timeout: Duration,
    cancel: CancelHandle,
) -> Correlator {
    let (transport, events) = broker.client();
    Correlator::over_transport(
        TransportHandle::Memory(transport),
        TransportEvents::Memory(events),
        DEVICE_ID,
        timeout,
        cancel,
    )
    .await
    .expect("in-memory session")
}

pub async fn runner(broker: &MemoryBroker) -> Runner {
    runner_with_cancel(broker, CancelHandle::default()).await
}

pub async fn runner_with_cancel(broker: &MemoryBroker, cancel: CancelHandle) -> Runner {
    let config = AppConfig::default();
    let registry = Registry::standard(&config).expect("catalog builds");
    let correlator = session_with_cancel(broker, Duration::from_secs(90), cancel).await;
    Runner::new(correlator, registry, config)
}

const KNOWN_APPS: [&str; 4] = ["YouTube", "Netflix", "PrimeVideo", "Sample_App"];
const KEY_CODES: [&str; 8] = [
    "KEY_POWER",
    "KEY_HOME",
    "KEY_BACK",
    "KEY_ENTER",
    "KEY_VOLUME_UP",
    "KEY_VOLUME_DOWN",
    "KEY_MUTE",
    "KEY_EXIT",
];

struct DeviceState {
    launched: HashSet<String>,
    device_stream: Arc<AtomicBool>,
    app_stream: Arc<AtomicBool>,
}

async fn device_loop(
    transport: MemoryTransport,
    mut events: MemoryEvents,
    spec: DeviceSpec,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
) {
    let prefix = format!("dab/{DEVICE_ID}/");
    let mut state = DeviceState {
        launched: HashSet::new(),
        device_stream: Arc::new(AtomicBool::new(false)),
        app_stream: Arc::new(AtomicBool::new(false)),
    };
    while let Some(message) = events.next().await {
        let Some(operation) = message.topic.strip_prefix(&prefix) else {
            continue;
        };
        // Metrics the device itself published come back over its own
        // wildcard subscription.
        if operation.starts_with("device-telemetry/metrics")
            || operation.starts_with("app-telemetry/metrics")
        {
            continue;
        }
        let operation = operation.to_owned();
        let Ok(request) = serde_json::from_slice::<Value>(&message.payload) else {
            continue;
        };
        let request_id = request
            .get("requestId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        seen.lock().push(SeenRequest {
            operation: operation.clone(),
            body: request.clone(),
        });

        let reply_topic = response_topic_for(&message.topic);
        match spec.script.get(operation.as_str()).cloned() {
            Some(Respond::Silent) => {}
            Some(Respond::Garbage) => {
                let _ = transport.publish(&reply_topic, b"\xff\xfe not json".to_vec());
            }
            Some(Respond::BareJson(value)) => {
                let _ = transport.publish(&reply_topic, value.to_string().into_bytes());
            }
            Some(Respond::WrongId) => {
                let body = envelope("01ARZ3NDEKTSV4RRFFQ69G5FAV", 200, json!({}));
                let _ = transport.publish(&reply_topic, body.into_bytes());
            }
            Some(Respond::Status(code)) => {
                let body = envelope(&request_id, code, json!({}));
                let _ = transport.publish(&reply_topic, body.into_bytes());
            }
            Some(Respond::Body(code, payload)) => {
                let body = envelope(&request_id, code, payload);
                let _ = transport.publish(&reply_topic, body.into_bytes());
            }
            Some(Respond::Delayed(delay, code)) => {
                // Reply off the main loop so other requests keep flowing.
                let transport = transport.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let body = envelope(&request_id, code, json!({}));
                    let _ = transport.publish(&reply_topic, body.into_bytes());
                });
            }
            None => {
                let (code, payload) = answer(&spec, &mut state, &transport, &operation, &request);
                let body = envelope(&request_id, code, payload);
                let _ = transport.publish(&reply_topic, body.into_bytes());
            }
        }
    }
}

fn envelope(request_id: &str, status: u16, body: Value) -> String {
    let mut map = match body {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert("requestId".to_owned(), Value::String(request_id.to_owned()));
    map.insert("status".to_owned(), json!(status));
    Value::Object(map).to_string()
}

fn answer(
    spec: &DeviceSpec,
    state: &mut DeviceState,
    transport: &MemoryTransport,
    operation: &str,
    request: &Value,
) -> (u16, Value) {
    let app_id = request.get("appId").and_then(Value::as_str);
    match operation {
        "operations/list" => (200, json!({"operations": spec.operations})),
        "version" => (200, json!({"versions": spec.versions})),
        "device/info" => (
            200,
            json!({
                "manufacturer": "Acme",
                "model": "X-1000",
                "serialNumber": "SN-0042",
                "chipset": "bcm72180",
                "firmwareVersion": "9.1.0",
                "firmwareBuild": "2214",
                "deviceId": DEVICE_ID,
            }),
        ),
        "health-check/get" => (200, json!({"healthy": true})),
        "applications/list" => (
            200,
            json!({"applications": [
                {"appId": "YouTube"},
                {"appId": "Netflix"},
                {"appId": "PrimeVideo"},
                {"appId": "Sample_App"},
            ]}),
        ),
        "applications/launch" | "applications/launch-with-content" => {
            let Some(app) = app_id else {
                return (400, json!({"error": "appId required"}));
            };
            if operation == "applications/launch-with-content" && request.get("contentId").is_none()
            {
                return (400, json!({"error": "contentId required"}));
            }
            if !KNOWN_APPS.contains(&app) {
                return (404, json!({"error": "unknown application"}));
            }
            state.launched.insert(app.to_owned());
            (200, json!({}))
        }
        "applications/get-state" => {
            let Some(app) = app_id else {
                return (400, json!({"error": "appId required"}));
            };
            let name = if state.launched.contains(app) {
                "FOREGROUND"
            } else {
                "STOPPED"
            };
            (200, json!({"state": name}))
        }
        "applications/exit" => {
            let Some(app) = app_id else {
                return (400, json!({"error": "appId required"}));
            };
            state.launched.remove(app);
            (200, json!({"state": "STOPPED"}))
        }
        "applications/install" | "applications/install-from-appstore" => {
            (200, json!({"state": "INSTALLED"}))
        }
        "applications/uninstall" => (200, json!({"state": "UNINSTALLED"})),
        "applications/clear-data" => (200, json!({"state": "CLEARED"})),
        "system/restart" => (200, json!({})),
        "system/settings/list" => (200, supported_settings()),
        "system/settings/get" => (
            200,
            json!({
                "language": "en-US",
                "audioVolume": 50,
                "mute": false,
                "memc": false,
                "cec": true,
                "lowLatencyMode": false,
                "outputResolution": {"width": 1920, "height": 1080, "frequency": 60},
            }),
        ),
        "system/settings/set" => {
            let known = supported_settings();
            let members: Vec<&String> = request
                .as_object()
                .map(|map| {
                    map.keys()
                        .filter(|key| key.as_str() != "requestId")
                        .collect()
                })
                .unwrap_or_default();
            if !members.is_empty() && members.iter().all(|key| known.get(key.as_str()).is_some()) {
                (200, json!({}))
            } else {
                (400, json!({"error": "unsupported setting"}))
            }
        }
        "input/key/list" => (200, json!({"keyCodes": KEY_CODES})),
        "input/key-press" | "input/long-key-press" => {
            match request.get("keyCode").and_then(Value::as_str) {
                Some(code) if KEY_CODES.contains(&code) => (200, json!({})),
                _ => (400, json!({"error": "unknown key code"})),
            }
        }
        "output/image" => match request.get("outputLocation").and_then(Value::as_str) {
            Some(location) => (
                200,
                json!({"outputImage": format!("{location}/dab_screenshot.jpg")}),
            ),
            None => (400, json!({"error": "outputLocation required"})),
        },
        "content/search" => (
            200,
            json!({"entries": [{"title": "Inception", "contentId": "tt1375666"}]}),
        ),
        "content/recommendations" => (200, json!({"entries": []})),
        "voice/list" => (
            200,
            json!({"voiceSystems": [{"name": "GoogleAssistant", "enabled": true}]}),
        ),
        "voice/set" | "voice/send-text" | "voice/send-audio" => (200, json!({})),
        "device-telemetry/start" => {
            state.device_stream.store(true, Ordering::SeqCst);
            spawn_emitter(
                transport.clone(),
                telemetry_topic(DEVICE_ID),
                Arc::clone(&state.device_stream),
            );
            let duration = request.get("duration").cloned().unwrap_or_else(|| json!(1000));
            (200, json!({"duration": duration}))
        }
        "device-telemetry/stop" => {
            state.device_stream.store(false, Ordering::SeqCst);
            (200, json!({}))
        }
        "app-telemetry/start" => {
            let Some(app) = app_id else {
                return (400, json!({"error": "appId required"}));
            };
            state.app_stream.store(true, Ordering::SeqCst);
            spawn_emitter(
                transport.clone(),
                app_telemetry_topic(DEVICE_ID, app),
                Arc::clone(&state.app_stream),
            );
            (200, json!({}))
        }
        "app-telemetry/stop" => {
            state.app_stream.store(false, Ordering::SeqCst);
            (200, json!({}))
        }
        _ => (501, json!({"error": "not implemented"})),
    }
}

fn supported_settings() -> Value {
    json!({
        "language": ["en-US", "fr-FR"],
        "audioVolume": true,
        "mute": true,
        "memc": true,
        "cec": true,
        "lowLatencyMode": true,
        "outputResolution": [
            {"width": 1920, "height": 1080, "frequency": 60},
            {"width": 3840, "height": 2160, "frequency": 60},
        ],
    })
}

fn spawn_emitter(transport: MemoryTransport, topic: String, live: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let mut sample = 0u64;
        while live.load(Ordering::SeqCst) {
            let body = json!({"timestamp": sample, "memoryUsedKb": 480_000 + sample}).to_string();
            let _ = transport.publish(&topic, body.into_bytes());
            sample += 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });
}
