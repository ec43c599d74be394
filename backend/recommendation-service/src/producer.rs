//! Behavior event publishing.
//!
//! The edge calls [`BehaviorEventProducer::track_event`] and moves on;
//! delivery is best effort and failures only surface in logs. Consumers
//! downstream do all the heavy lifting.

use anyhow::Result;
use event_schema::EventRecord;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BehaviorProducerConfig {
    pub brokers: String,
    pub topic: String,
}

impl Default for BehaviorProducerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: event_schema::BEHAVIOR_EVENTS_TOPIC.to_string(),
        }
    }
}

pub struct BehaviorEventProducer {
    producer: FutureProducer,
    topic: String,
}

impl BehaviorEventProducer {
    pub fn new(config: &BehaviorProducerConfig) -> Result<Self> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", "recommendation-service")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retries", "3")
            .set("linger.ms", "5")
            .create::<FutureProducer>()?;

        info!(brokers = %config.brokers, topic = %config.topic, "behavior event producer ready");
        Ok(Self {
            producer,
            topic: config.topic.clone(),
        })
    }

    /// Publish one event, keyed by user so a user's events stay ordered
    /// within a partition. Assigns an event id when the edge did not.
    pub async fn track_event(&self, mut event: EventRecord) {
        if event.event_id.is_none() {
            event.event_id = Some(Uuid::new_v4().to_string());
        }

        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize behavior event");
                return;
            }
        };

        let partition_key = event
            .user_id
            .map(|user_id| user_id.to_string())
            .unwrap_or_default();
        let record = FutureRecord::to(&self.topic)
            .key(&partition_key)
            .payload(&payload);

        match self.producer.send(record, Duration::from_secs(5)).await {
            Ok(_) => {
                debug!(event_type = ?event.event_type, "published behavior event");
            }
            Err((err, _)) => {
                warn!(error = ?err, event_type = ?event.event_type, "failed to publish behavior event");
            }
        }
    }
}
