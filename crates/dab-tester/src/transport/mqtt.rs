//! MQTT v5 backend built on `rumqttc`.

use super::InboundMessage;
use crate::error::{DabError, Result};
use rumqttc::v5::mqttbytes::v5::{ConnectReturnCode, Packet, PublishProperties};
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, Event, EventLoop, MqttOptions};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const EVENT_CAPACITY: usize = 64;

pub struct MqttTransport {
    client: AsyncClient,
}

pub struct MqttEvents {
    eventloop: EventLoop,
    closed: bool,
}

/// Connects to `host:port` and waits for the broker's ConnAck. A refused or
/// silent broker fails the connect instead of the first request.
pub async fn connect(host: &str, port: u16, client_id: &str) -> Result<(MqttTransport, MqttEvents)> {
    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(KEEP_ALIVE);
    let (client, mut eventloop) = AsyncClient::new(options, EVENT_CAPACITY);

    let deadline = tokio::time::Instant::now() + CONNECT_TIMEOUT;
    loop {
        let event = tokio::time::timeout_at(deadline, eventloop.poll())
            .await
            .map_err(|_| {
                DabError::Connection(format!(
                    "no ConnAck from {host}:{port} within {}s",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|error| DabError::Connection(error.to_string()))?;
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    tracing::debug!(host, port, client_id, "mqtt session established");
                    break;
                }
                return Err(DabError::Connection(format!(
                    "broker refused connection: {:?}",
                    ack.code
                )));
            }
            other => tracing::trace!("event before ConnAck: {other:?}"),
        }
    }

    Ok((
        MqttTransport { client },
        MqttEvents {
            eventloop,
            closed: false,
        },
    ))
}

impl MqttTransport {
    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        response_topic: Option<&str>,
    ) -> Result<()> {
        let result = match response_topic {
            Some(response) => {
                let properties = PublishProperties {
                    response_topic: Some(response.to_owned()),
                    ..PublishProperties::default()
                };
                self.client
                    .publish_with_properties(topic, QoS::AtMostOnce, false, payload, properties)
                    .await
            }
            None => {
                self.client
                    .publish(topic, QoS::AtMostOnce, false, payload)
                    .await
            }
        };
        result.map_err(|error| DabError::Connection(error.to_string()))
    }

    pub async fn subscribe(&self, filter: &str) -> Result<()> {
        self.client
            .subscribe(filter, QoS::AtMostOnce)
            .await
            .map_err(|error| DabError::Connection(error.to_string()))
    }

    pub async fn unsubscribe(&self, filter: &str) -> Result<()> {
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|error| DabError::Connection(error.to_string()))
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|error| DabError::Connection(error.to_string()))
    }
}

impl MqttEvents {
    /// Polls the event loop until the next application message. The first
    /// connection error ends the stream; the pump drains pending requests
    /// rather than riding out a reconnect with stale subscriptions.
    pub async fn next(&mut self) -> Option<InboundMessage> {
        if self.closed {
            return None;
        }
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Ok(topic) = String::from_utf8(publish.topic.to_vec()) else {
                        tracing::warn!("dropping publish with non-utf8 topic");
                        continue;
                    };
                    return Some(InboundMessage {
                        topic,
                        payload: publish.payload,
                    });
                }
                Ok(Event::Incoming(Packet::Disconnect(_))) => {
                    tracing::warn!("broker closed the session");
                    self.closed = true;
                    return None;
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!("mqtt connection lost: {error}");
                    self.closed = true;
                    return None;
                }
            }
        }
    }
}
