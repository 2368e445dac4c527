//! In-process broker used by the integration tests.
//!
//! Routes with real MQTT filter semantics (`+` and `#` wildcards) so the
//! correlator's subscriptions behave exactly as they do against a broker.

use super::InboundMessage;
use crate::error::Result;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct BrokerState {
    next_id: usize,
    clients: Vec<ClientSlot>,
}

struct ClientSlot {
    id: usize,
    subscriptions: Vec<String>,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

/// Shared broker; every [`client`](MemoryBroker::client) pair talks through it.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new client session.
    #[must_use]
    pub fn client(&self) -> (MemoryTransport, MemoryEvents) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.clients.push(ClientSlot {
                id,
                subscriptions: Vec::new(),
                sender,
            });
            id
        };
        (
            MemoryTransport {
                state: Arc::clone(&self.state),
                id,
            },
            MemoryEvents { receiver },
        )
    }
}

#[derive(Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<BrokerState>>,
    id: usize,
}

impl MemoryTransport {
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let payload = Bytes::from(payload);
        let state = self.state.lock();
        for client in &state.clients {
            if client
                .subscriptions
                .iter()
                .any(|filter| topic_matches(filter, topic))
            {
                let _ = client.sender.send(InboundMessage {
                    topic: topic.to_owned(),
                    payload: payload.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn subscribe(&self, filter: &str) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(client) = state.clients.iter_mut().find(|client| client.id == self.id) {
            if !client.subscriptions.iter().any(|existing| existing == filter) {
                client.subscriptions.push(filter.to_owned());
            }
        }
        Ok(())
    }

    pub fn unsubscribe(&self, filter: &str) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(client) = state.clients.iter_mut().find(|client| client.id == self.id) {
            client.subscriptions.retain(|existing| existing != filter);
        }
        Ok(())
    }

    /// Drops the session; the paired [`MemoryEvents`] stream ends.
    pub fn disconnect(&self) -> Result<()> {
        self.state.lock().clients.retain(|client| client.id != self.id);
        Ok(())
    }
}

pub struct MemoryEvents {
    receiver: mpsc::UnboundedReceiver<InboundMessage>,
}

impl MemoryEvents {
    pub async fn next(&mut self) -> Option<InboundMessage> {
        self.receiver.recv().await
    }
}

/// MQTT topic filter matching: `+` matches one level, a trailing `#` matches
/// the remaining levels including the parent itself.
fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_parts = filter.split('/');
    let mut topic_parts = topic.split('/');
    loop {
        match (filter_parts.next(), topic_parts.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matching() {
        assert!(topic_matches("dab/tv-1/version", "dab/tv-1/version"));
        assert!(topic_matches("dab/+/version", "dab/tv-1/version"));
        assert!(topic_matches("dab/tv-1/#", "dab/tv-1/system/settings/get"));
        assert!(topic_matches("dab/tv-1/#", "dab/tv-1"));
        assert!(!topic_matches("dab/tv-1/version", "dab/tv-1/device/info"));
        assert!(!topic_matches("dab/+", "dab/tv-1/version"));
    }

    #[tokio::test]
    async fn routes_to_matching_subscribers() {
        let broker = MemoryBroker::new();
        let (publisher, _events) = broker.client();
        let (subscriber, mut events) = broker.client();
        subscriber.subscribe("dab/_response/dab/tv-1/#").unwrap();

        publisher
            .publish("dab/_response/dab/tv-1/version", b"{}".to_vec())
            .unwrap();
        publisher
            .publish("dab/_response/dab/tv-2/version", b"{}".to_vec())
            .unwrap();
        publisher
            .publish("dab/_response/dab/tv-1/device/info", b"{}".to_vec())
            .unwrap();

        let first = events.next().await.unwrap();
        assert_eq!(first.topic, "dab/_response/dab/tv-1/version");
        let second = events.next().await.unwrap();
        assert_eq!(second.topic, "dab/_response/dab/tv-1/device/info");
    }

    #[tokio::test]
    async fn disconnect_ends_the_stream() {
        let broker = MemoryBroker::new();
        let (transport, mut events) = broker.client();
        transport.subscribe("dab/#").unwrap();
        transport.disconnect().unwrap();
        assert!(events.next().await.is_none());
    }
}
