//! Environment-driven configuration.
//!
//! Every knob has a local-development default, so `cargo run` against a
//! docker-compose stack needs no env file at all. Malformed numeric values
//! fall back to their defaults instead of failing startup.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub book_index: String,
    pub review_index: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub behavior_topic: String,
    pub affinity_group_id: String,
    pub session_group_id: String,
    pub max_in_flight: usize,
}

#[derive(Debug, Clone)]
pub struct ReviewApiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub call_timeout: Duration,
    pub affinity_blend_weight: f64,
    pub similar_reader_ratio: f64,
    pub book_seed_limit: usize,
    pub affinity_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub session_max_entries: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j: Neo4jConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub reviews: ReviewApiConfig,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            neo4j: Neo4jConfig {
                uri: env::var("NEO4J_URI").unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
                user: env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string()),
                password: env::var("NEO4J_PASSWORD").unwrap_or_else(|_| "password".to_string()),
            },
            elasticsearch: ElasticsearchConfig {
                url: env::var("ELASTICSEARCH_URL")
                    .unwrap_or_else(|_| "http://localhost:9200".to_string()),
                book_index: env::var("ELASTICSEARCH_BOOK_INDEX")
                    .unwrap_or_else(|_| "books".to_string()),
                review_index: env::var("ELASTICSEARCH_REVIEW_INDEX")
                    .unwrap_or_else(|_| "reviews".to_string()),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            kafka: KafkaConfig {
                brokers: env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
                behavior_topic: env::var("KAFKA_BEHAVIOR_TOPIC")
                    .unwrap_or_else(|_| event_schema::BEHAVIOR_EVENTS_TOPIC.to_string()),
                affinity_group_id: env::var("KAFKA_AFFINITY_GROUP_ID")
                    .unwrap_or_else(|_| "folio-affinity-consumer-v1".to_string()),
                session_group_id: env::var("KAFKA_SESSION_GROUP_ID")
                    .unwrap_or_else(|_| "folio-session-boost-consumer-v1".to_string()),
                max_in_flight: parsed_env("KAFKA_MAX_IN_FLIGHT", 16),
            },
            reviews: ReviewApiConfig {
                base_url: env::var("REVIEW_API_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            },
            engine: EngineConfig {
                call_timeout: Duration::from_millis(parsed_env("STORE_CALL_TIMEOUT_MS", 800)),
                affinity_blend_weight: parsed_env("AFFINITY_BLEND_WEIGHT", 0.1),
                similar_reader_ratio: parsed_env("SIMILAR_READER_RATIO", 0.5),
                book_seed_limit: parsed_env("BOOK_SEED_LIMIT", 5),
                affinity_ttl_seconds: parsed_env("AFFINITY_TTL_SECONDS", 30 * 24 * 3600),
                session_ttl_seconds: parsed_env("SESSION_TTL_SECONDS", 7200),
                session_max_entries: parsed_env("SESSION_MAX_ENTRIES", 50),
            },
        }
    }
}

fn parsed_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
