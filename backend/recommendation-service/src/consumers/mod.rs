//! Kafka consumption of behavior events.
//!
//! One [`BehaviorConsumer`] pumps a topic into one [`EventSink`]. Sinks
//! that must see every event independently (affinity tracking, session
//! boosts) run as separate consumers under separate group ids. Handling is
//! spawned per message with a semaphore bounding in-flight work; offsets
//! auto-commit, so delivery is at-least-once and sinks must tolerate
//! replays.

use anyhow::Result;
use async_trait::async_trait;
use event_schema::EventRecord;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// A consumer-side handler for behavior events.
///
/// Sinks swallow their own failures; nothing a sink does can stall or kill
/// the consumer loop.
#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: EventRecord);
}

#[derive(Debug, Clone)]
pub struct BehaviorConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    pub max_in_flight: usize,
}

impl Default for BehaviorConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "folio-affinity-consumer-v1".to_string(),
            topic: event_schema::BEHAVIOR_EVENTS_TOPIC.to_string(),
            max_in_flight: 16,
        }
    }
}

/// Kafka consumer pump feeding one sink.
pub struct BehaviorConsumer<S> {
    consumer: StreamConsumer,
    sink: Arc<S>,
    semaphore: Arc<Semaphore>,
}

impl<S: EventSink + 'static> BehaviorConsumer<S> {
    pub fn new(config: BehaviorConsumerConfig, sink: Arc<S>) -> Result<Self> {
        info!(
            group_id = %config.group_id,
            topic = %config.topic,
            sink = sink.name(),
            "initializing behavior consumer"
        );

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &config.group_id)
            .set("bootstrap.servers", &config.brokers)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| {
                error!(error = %e, "failed to create Kafka consumer");
                anyhow::Error::from(e)
            })?;

        consumer.subscribe(&[&config.topic]).map_err(|e| {
            error!(topic = %config.topic, error = %e, "failed to subscribe to topic");
            anyhow::Error::from(e)
        })?;

        Ok(Self {
            consumer,
            sink,
            semaphore: Arc::new(Semaphore::new(config.max_in_flight)),
        })
    }

    /// Long-running consume loop; run it on its own task.
    pub async fn run(&self) -> Result<()> {
        info!(sink = self.sink.name(), "behavior consumer loop started");
        loop {
            match self.consumer.recv().await {
                Ok(message) => {
                    let Some(payload) = message.payload() else {
                        warn!(
                            topic = message.topic(),
                            offset = message.offset(),
                            "behavior event has no payload"
                        );
                        continue;
                    };
                    let Some(event) = decode_event(payload) else {
                        continue;
                    };

                    let permit = self.semaphore.clone().acquire_owned().await?;
                    let sink = Arc::clone(&self.sink);
                    tokio::spawn(async move {
                        sink.handle(event).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Kafka consumer error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

/// Decode one event payload, dropping malformed ones with a log line.
fn decode_event(payload: &[u8]) -> Option<EventRecord> {
    match serde_json::from_slice(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "dropping malformed behavior event");
            None
        }
    }
}
