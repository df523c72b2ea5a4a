use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::BrokerConfig;
use crate::dispatch::Dispatcher;
use crate::error::AgentError;
use crate::topic::AgentIdentity;

/// Outbound broker seam.
///
/// The pipeline publishes confirmations, command side-effects and
/// notifications through this trait so tests can capture traffic
/// without a live broker.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_json(&self, topic: &str, payload: &Value) -> Result<(), AgentError>;

    /// Plain-text publish, used for the retained ONLINE/OFFLINE status.
    async fn publish_text(&self, topic: &str, payload: &str, retain: bool)
        -> Result<(), AgentError>;
}

/// Publisher over the live MQTT connection.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish_json(&self, topic: &str, payload: &Value) -> Result<(), AgentError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| AgentError::upstream("broker", e))?;
        self.client
            .publish(topic, QoS::AtLeastOnce, false, bytes)
            .await
            .map_err(|e| AgentError::upstream("broker", e))?;
        debug!(topic, "Published");
        Ok(())
    }

    async fn publish_text(
        &self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<(), AgentError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .await
            .map_err(|e| AgentError::upstream("broker", e))?;
        debug!(topic, "Published");
        Ok(())
    }
}

/// Build the MQTT connection: credentials, keep-alive and the retained
/// OFFLINE last-will on the agent's status topic.
pub fn connect(config: &BrokerConfig, identity: &AgentIdentity) -> (AsyncClient, EventLoop) {
    let mut options = MqttOptions::new(&config.name, &config.host, config.port);
    options.set_credentials(&config.username, &config.password);
    options.set_keep_alive(Duration::from_secs(60));
    options.set_last_will(LastWill::new(
        identity.status_topic(),
        "OFFLINE",
        QoS::AtLeastOnce,
        true,
    ));

    info!(host = %config.host, port = config.port, "Connecting to broker");
    AsyncClient::new(options, 64)
}

/// The broker receive loop.
///
/// Messages are delivered strictly one at a time: the full pipeline for
/// an event runs to completion before the next message is dequeued. On
/// (re)connect the agent announces itself with a retained ONLINE status
/// and renews the location-wide wildcard subscription.
pub async fn run(
    mut event_loop: EventLoop,
    client: AsyncClient,
    dispatcher: Arc<Dispatcher>,
    identity: AgentIdentity,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Broker connection established");
                if let Err(e) = client
                    .publish(
                        identity.status_topic(),
                        QoS::AtLeastOnce,
                        true,
                        "ONLINE".as_bytes().to_vec(),
                    )
                    .await
                {
                    error!(error = %e, "Failed to publish ONLINE status");
                }
                if let Err(e) = client.subscribe(identity.subscription(), QoS::AtMostOnce).await {
                    error!(error = %e, "Failed to subscribe");
                } else {
                    info!(subscription = %identity.subscription(), "Subscribed");
                }
            }
            Ok(Event::Incoming(Packet::Publish(message))) => {
                dispatcher.dispatch(&message.topic, &message.payload).await;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Broker connection error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
