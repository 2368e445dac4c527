//! Transport correlator: pairs every outbound request with its response.
//!
//! Each request gets a fresh ulid correlation id and a pending slot keyed by
//! that id. A background pump drains the broker event stream and resolves
//! slots as envelopes come back; the requester side awaits its slot under a
//! timeout. Responses are matched by id alone, never by arrival order, so
//! late or duplicate messages cannot resolve the wrong request.

use crate::cancel::CancelHandle;
use crate::error::Result;
use crate::transport::{mqtt, InboundMessage, TransportEvents, TransportHandle};
use bytes::Bytes;
use dab_protocol::envelope::{parse_response, request_body, EnvelopeParse, ResponseEnvelope};
use dab_protocol::topic::{is_response_topic, request_topic, response_filter, response_topic};
use dab_protocol::DabStatus;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Per-exchange response deadline when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// How a connected session is established.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub broker_host: String,
    pub broker_port: u16,
    pub device_id: String,
    pub timeout: Duration,
}

impl SessionOptions {
    pub fn new(broker_host: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            broker_host: broker_host.into(),
            broker_port: 1883,
            device_id: device_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.broker_port = port;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One request/response round trip as recorded in the report.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub operation: String,
    pub topic: String,
    /// Outbound body, correlation id included.
    pub request: String,
    pub outcome: ExchangeOutcome,
    pub elapsed_ms: u64,
}

/// What came back for a request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeOutcome {
    Response(ResponseEnvelope),
    /// No response before the deadline.
    Timeout,
    /// The device answered on the right topic with a payload that is not a
    /// response envelope.
    Malformed { raw: String },
    /// Publish failed or the connection went away mid-request.
    Transport { error: String },
    /// Cancelled by the operator.
    Interrupted,
}

impl ExchangeOutcome {
    #[must_use]
    pub fn response(&self) -> Option<&ResponseEnvelope> {
        match self {
            Self::Response(envelope) => Some(envelope),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<DabStatus> {
        self.response().map(|envelope| envelope.status)
    }
}

enum SlotResolution {
    Response(ResponseEnvelope),
    Malformed { raw: String },
    ConnectionLost,
}

struct PendingSlot {
    response_topic: String,
    tx: oneshot::Sender<SlotResolution>,
}

type SlotMap = Arc<Mutex<HashMap<String, PendingSlot>>>;

struct ObserverEntry {
    topic: String,
    tx: mpsc::UnboundedSender<Bytes>,
}

type ObserverMap = Arc<Mutex<HashMap<u64, ObserverEntry>>>;

/// A connected session against one device under test.
pub struct Correlator {
    transport: TransportHandle,
    device_id: String,
    broker: Option<String>,
    timeout: Duration,
    pending: SlotMap,
    observers: ObserverMap,
    observer_seq: AtomicU64,
    connected: Arc<AtomicBool>,
    cancel: CancelHandle,
    pump: JoinHandle<()>,
}

impl Correlator {
    /// Connects to the broker and subscribes to the device's response tree.
    pub async fn connect(options: SessionOptions, cancel: CancelHandle) -> Result<Self> {
        let client_id = format!("dabtest-{}", Ulid::new());
        let broker = format!("{}:{}", options.broker_host, options.broker_port);
        let (transport, events) =
            mqtt::connect(&options.broker_host, options.broker_port, &client_id).await?;
        Self::start(
            TransportHandle::Mqtt(transport),
            TransportEvents::Mqtt(events),
            options.device_id,
            Some(broker),
            options.timeout,
            cancel,
        )
        .await
    }

    /// Builds a session over an already-connected transport pair. Past the
    /// handshake, behavior is identical to [`connect`](Self::connect).
    pub async fn over_transport(
        transport: TransportHandle,
        events: TransportEvents,
        device_id: impl Into<String>,
        timeout: Duration,
        cancel: CancelHandle,
    ) -> Result<Self> {
        Self::start(transport, events, device_id.into(), None, timeout, cancel).await
    }

    async fn start(
        transport: TransportHandle,
        events: TransportEvents,
        device_id: String,
        broker: Option<String>,
        timeout: Duration,
        cancel: CancelHandle,
    ) -> Result<Self> {
        transport.subscribe(&response_filter(&device_id)).await?;
        let pending: SlotMap = Arc::new(Mutex::new(HashMap::new()));
        let observers: ObserverMap = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));
        let pump = tokio::spawn(pump_task(
            events,
            Arc::clone(&pending),
            Arc::clone(&observers),
            Arc::clone(&connected),
        ));
        Ok(Self {
            transport,
            device_id,
            broker,
            timeout,
            pending,
            observers,
            observer_seq: AtomicU64::new(0),
            connected,
            cancel,
            pump,
        })
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// `host:port` of the broker, absent for sessions built over a prepared
    /// transport pair.
    #[must_use]
    pub fn broker(&self) -> Option<&str> {
        self.broker.as_deref()
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Issues one request with the session's default timeout.
    ///
    /// Never fails: timeouts, malformed payloads, a lost connection and
    /// cancellation all come back inside the [`Exchange`] so the caller can
    /// classify them.
    pub async fn request(&self, operation: &str, payload: &Map<String, Value>) -> Exchange {
        self.request_with_timeout(operation, payload, self.timeout)
            .await
    }

    pub async fn request_with_timeout(
        &self,
        operation: &str,
        payload: &Map<String, Value>,
        timeout: Duration,
    ) -> Exchange {
        let request_id = Ulid::new().to_string();
        let topic = request_topic(&self.device_id, operation);
        let reply_to = response_topic(&self.device_id, operation);
        let body = request_body(&request_id, payload);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            request_id.clone(),
            PendingSlot {
                response_topic: reply_to.clone(),
                tx,
            },
        );

        let started = tokio::time::Instant::now();
        let outcome = if !self.is_connected() {
            self.pending.lock().remove(&request_id);
            ExchangeOutcome::Transport {
                error: "connection lost".to_owned(),
            }
        } else if let Err(error) = self
            .transport
            .publish(&topic, body.clone().into_bytes(), Some(&reply_to))
            .await
        {
            self.pending.lock().remove(&request_id);
            ExchangeOutcome::Transport {
                error: error.to_string(),
            }
        } else {
            self.await_slot(&request_id, rx, timeout).await
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(%topic, elapsed_ms, "exchange finished");

        Exchange {
            operation: operation.to_owned(),
            topic,
            request: body,
            outcome,
            elapsed_ms,
        }
    }

    async fn await_slot(
        &self,
        request_id: &str,
        rx: oneshot::Receiver<SlotResolution>,
        timeout: Duration,
    ) -> ExchangeOutcome {
        tokio::select! {
            resolved = tokio::time::timeout(timeout, rx) => match resolved {
                Ok(Ok(SlotResolution::Response(envelope))) => ExchangeOutcome::Response(envelope),
                Ok(Ok(SlotResolution::Malformed { raw })) => ExchangeOutcome::Malformed { raw },
                Ok(Ok(SlotResolution::ConnectionLost)) | Ok(Err(_)) => ExchangeOutcome::Transport {
                    error: "connection lost".to_owned(),
                },
                Err(_) => {
                    self.pending.lock().remove(request_id);
                    ExchangeOutcome::Timeout
                }
            },
            () = self.cancel.cancelled() => {
                self.pending.lock().remove(request_id);
                ExchangeOutcome::Interrupted
            }
        }
    }

    /// Subscribes to a stream topic and reports whether `count` messages
    /// arrive within `window`. Fails only when the subscription itself is
    /// refused.
    pub async fn observe(&self, topic: &str, count: usize, window: Duration) -> Result<bool> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let key = self.observer_seq.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().insert(
            key,
            ObserverEntry {
                topic: topic.to_owned(),
                tx,
            },
        );
        if let Err(error) = self.transport.subscribe(topic).await {
            self.observers.lock().remove(&key);
            return Err(error);
        }

        let deadline = tokio::time::Instant::now() + window;
        let mut seen = 0usize;
        let outcome = loop {
            if seen >= count {
                break true;
            }
            tokio::select! {
                received = tokio::time::timeout_at(deadline, rx.recv()) => match received {
                    Ok(Some(_payload)) => {
                        seen += 1;
                        tracing::trace!(%topic, seen, "stream message observed");
                    }
                    Ok(None) | Err(_) => break false,
                },
                () = self.cancel.cancelled() => break false,
            }
        };

        self.observers.lock().remove(&key);
        let _ = self.transport.unsubscribe(topic).await;
        tracing::debug!(%topic, seen, count, "observation finished");
        Ok(outcome)
    }

    /// Tears the session down. Anything still pending resolves as a
    /// transport error.
    pub async fn disconnect(self) {
        let _ = self.transport.disconnect().await;
        self.pump.abort();
        self.connected.store(false, Ordering::SeqCst);
        let drained: Vec<PendingSlot> = self
            .pending
            .lock()
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        for slot in drained {
            let _ = slot.tx.send(SlotResolution::ConnectionLost);
        }
    }
}

async fn pump_task(
    mut events: TransportEvents,
    pending: SlotMap,
    observers: ObserverMap,
    connected: Arc<AtomicBool>,
) {
    tracing::debug!("event pump started");
    while let Some(message) = events.next().await {
        dispatch(&message, &pending, &observers);
    }
    connected.store(false, Ordering::SeqCst);

    // Resolve every waiter so no request hangs on a dead connection.
    let drained: Vec<PendingSlot> = pending.lock().drain().map(|(_, slot)| slot).collect();
    for slot in drained {
        let _ = slot.tx.send(SlotResolution::ConnectionLost);
    }
    observers.lock().clear();
    tracing::debug!("event pump stopped");
}

fn dispatch(message: &InboundMessage, pending: &SlotMap, observers: &ObserverMap) {
    {
        let observers = observers.lock();
        for entry in observers.values() {
            if entry.topic == message.topic {
                let _ = entry.tx.send(message.payload.clone());
            }
        }
    }

    if !is_response_topic(&message.topic) {
        return;
    }

    match parse_response(&message.payload) {
        EnvelopeParse::Response(envelope) => {
            if let Some(slot) = pending.lock().remove(&envelope.request_id) {
                let _ = slot.tx.send(SlotResolution::Response(envelope));
            } else {
                tracing::trace!(topic = %message.topic, request_id = %envelope.request_id,
                    "response with no pending request discarded");
            }
        }
        EnvelopeParse::Unrecognized(value) => {
            resolve_malformed(pending, &message.topic, value.to_string());
        }
        EnvelopeParse::Invalid => {
            let raw = String::from_utf8_lossy(&message.payload).into_owned();
            resolve_malformed(pending, &message.topic, raw);
        }
    }
}

/// A payload that is not a response envelope cannot be matched by id; it
/// resolves the slot pending on its topic so that request does not sit out
/// the full timeout.
fn resolve_malformed(pending: &SlotMap, topic: &str, raw: String) {
    let slot = {
        let mut pending = pending.lock();
        let key = pending
            .iter()
            .find(|(_, slot)| slot.response_topic == topic)
            .map(|(key, _)| key.clone());
        key.and_then(|key| pending.remove(&key))
    };
    match slot {
        Some(slot) => {
            tracing::warn!(%topic, payload = %raw, "malformed response payload");
            let _ = slot.tx.send(SlotResolution::Malformed { raw });
        }
        None => {
            tracing::debug!(%topic, "unparseable message with no pending request discarded");
        }
    }
}
