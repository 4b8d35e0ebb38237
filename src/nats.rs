//! NATS transport for coordination notifications
//!
//! The coordinator itself only writes to in-process channels; this module
//! optionally bridges those channels to NATS. Outbound notifications are
//! forwarded onto the `coordination.*` subject hierarchy, and remote domain
//! callbacks published on `coordination.domain.callback` are bridged back
//! into the coordinator's command channel.

use async_nats::{Client, ConnectOptions, Subscriber};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::{CoordinationError, CoordinationResult};
use crate::events::{CallbackResult, CoordinationCommand, CoordinationEvent};
use crate::subjects::{subject_for, subjects};

/// Configuration for the NATS connection
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "domain-coordination".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// NATS wrapper providing coordination-specific operations
#[derive(Clone)]
pub struct CoordinationBus {
    client: Client,
}

impl CoordinationBus {
    /// Connect with the given configuration
    pub async fn connect(config: BusConfig) -> CoordinationResult<Self> {
        let options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout);

        let client = async_nats::connect_with_options(config.servers.join(","), options)
            .await
            .map_err(|e| CoordinationError::Bus(e.to_string()))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Publish one coordination notification on its subject
    pub async fn publish(&self, event: &CoordinationEvent) -> CoordinationResult<()> {
        let subject = subject_for(event);
        let payload = serde_json::to_vec(event)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| CoordinationError::Bus(e.to_string()))?;

        debug!(%subject, notification = event.name(), "published notification");
        Ok(())
    }

    /// Subscribe to a subject
    pub async fn subscribe(&self, subject: &str) -> CoordinationResult<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| CoordinationError::Bus(e.to_string()))?;

        info!(%subject, "subscribed");
        Ok(subscriber)
    }

    /// Forward every notification from `events` to NATS until the channel
    /// closes
    pub fn spawn_forwarder(
        &self,
        mut events: mpsc::UnboundedReceiver<CoordinationEvent>,
    ) -> JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Err(e) = bus.publish(&event).await {
                    error!(notification = event.name(), %e, "failed to publish notification");
                }
            }
        })
    }

    /// Bridge remote callbacks into the coordinator command channel
    ///
    /// Subscribes to `coordination.domain.callback` and forwards every
    /// deserializable [`CallbackResult`] as a command; malformed payloads
    /// are logged and dropped.
    pub async fn spawn_callback_bridge(
        &self,
        commands: mpsc::UnboundedSender<CoordinationCommand>,
    ) -> CoordinationResult<JoinHandle<()>> {
        let subject = subjects::domain_callback();
        let mut subscriber = self.subscribe(&subject).await?;

        Ok(tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<CallbackResult>(&msg.payload) {
                    Ok(callback) => {
                        if commands
                            .send(CoordinationCommand::Callback(callback))
                            .is_err()
                        {
                            // Coordinator gone; stop bridging.
                            break;
                        }
                    }
                    Err(e) => {
                        error!(%subject, %e, "failed to deserialize callback");
                    }
                }
            }
        }))
    }

    /// The underlying NATS client for advanced operations
    pub fn inner(&self) -> &Client {
        &self.client
    }
}
