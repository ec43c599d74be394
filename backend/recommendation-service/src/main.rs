use anyhow::Context;
use recommendation_service::clients::{HttpReviewClient, KeyValueStore, RedisStore, ReviewLookup};
use recommendation_service::consumers::{BehaviorConsumer, BehaviorConsumerConfig};
use recommendation_service::services::boost::{SessionBoostBucket, SessionBoostSink};
use recommendation_service::services::tracking::{AffinityCache, AffinityTrackingSink};
use recommendation_service::Config;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    info!(
        brokers = %config.kafka.brokers,
        topic = %config.kafka.behavior_topic,
        "starting recommendation event consumers"
    );

    let store: Arc<dyn KeyValueStore> =
        Arc::new(RedisStore::new(&config.redis.url, config.engine.call_timeout)?);
    let reviews: Arc<dyn ReviewLookup> = Arc::new(HttpReviewClient::new(
        &config.reviews.base_url,
        config.engine.call_timeout,
    ));

    let affinity_sink = Arc::new(AffinityTrackingSink::new(
        AffinityCache::new(store.clone()).with_ttl(config.engine.affinity_ttl_seconds),
        reviews.clone(),
    ));
    let boost_sink = Arc::new(SessionBoostSink::new(
        SessionBoostBucket::new(store).with_limits(
            config.engine.session_ttl_seconds,
            config.engine.session_max_entries,
        ),
        reviews,
    ));

    let affinity_consumer = BehaviorConsumer::new(
        consumer_config(&config, config.kafka.affinity_group_id.clone()),
        affinity_sink,
    )?;
    let boost_consumer = BehaviorConsumer::new(
        consumer_config(&config, config.kafka.session_group_id.clone()),
        boost_sink,
    )?;

    tokio::select! {
        outcome = affinity_consumer.run() => {
            outcome.context("affinity consumer exited")?;
        }
        outcome = boost_consumer.run() => {
            outcome.context("session boost consumer exited")?;
        }
    }

    Ok(())
}

fn consumer_config(config: &Config, group_id: String) -> BehaviorConsumerConfig {
    BehaviorConsumerConfig {
        brokers: config.kafka.brokers.clone(),
        group_id,
        topic: config.kafka.behavior_topic.clone(),
        max_in_flight: config.kafka.max_in_flight,
    }
}
