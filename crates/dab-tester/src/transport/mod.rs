//! Transport seam between the correlator and the broker.
//!
//! The engine talks to one of two backends through the same pair of types:
//! a real MQTT v5 session ([`mqtt`]) or an in-process broker ([`memory`])
//! used by the integration tests. Both split into a command half
//! ([`TransportHandle`]) and an event stream ([`TransportEvents`]) consumed
//! by the background pump.

pub mod memory;
pub mod mqtt;

use crate::error::Result;
use bytes::Bytes;

/// One message delivered by the broker.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Bytes,
}

/// Command half of a connected session.
pub enum TransportHandle {
    Mqtt(mqtt::MqttTransport),
    Memory(memory::MemoryTransport),
}

impl TransportHandle {
    /// Publishes `payload` to `topic`. For MQTT the paired response topic
    /// rides in the v5 `ResponseTopic` property.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        response_topic: Option<&str>,
    ) -> Result<()> {
        match self {
            Self::Mqtt(transport) => transport.publish(topic, payload, response_topic).await,
            Self::Memory(transport) => transport.publish(topic, payload),
        }
    }

    pub async fn subscribe(&self, filter: &str) -> Result<()> {
        match self {
            Self::Mqtt(transport) => transport.subscribe(filter).await,
            Self::Memory(transport) => transport.subscribe(filter),
        }
    }

    pub async fn unsubscribe(&self, filter: &str) -> Result<()> {
        match self {
            Self::Mqtt(transport) => transport.unsubscribe(filter).await,
            Self::Memory(transport) => transport.unsubscribe(filter),
        }
    }

    /// Best-effort session teardown.
    pub async fn disconnect(&self) -> Result<()> {
        match self {
            Self::Mqtt(transport) => transport.disconnect().await,
            Self::Memory(transport) => transport.disconnect(),
        }
    }
}

/// Event half of a connected session.
pub enum TransportEvents {
    Mqtt(mqtt::MqttEvents),
    Memory(memory::MemoryEvents),
}

impl TransportEvents {
    /// Next inbound message, or `None` once the connection is gone.
    pub async fn next(&mut self) -> Option<InboundMessage> {
        match self {
            Self::Mqtt(events) => events.next().await,
            Self::Memory(events) => events.next().await,
        }
    }
}
