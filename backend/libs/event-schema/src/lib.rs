//! Behavioral event schema shared by the Folio event producers and consumers
//!
//! Defines the wire format for reader-behavior events flowing through Kafka so
//! that the tracking consumers and the ingestion producer agree on one shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic carrying all reader-behavior events
pub const BEHAVIOR_EVENTS_TOPIC: &str = "behavior.events";

/// Target type value for book-scoped events
pub const TARGET_BOOK: &str = "book";
/// Target type value for review-scoped events
pub const TARGET_REVIEW: &str = "review";

/// A single reader-behavior event.
///
/// Producers are heterogeneous (mobile clients, web, internal services), so
/// every field except `occurred_at` is optional and consumers validate what
/// they need. `metadata` carries event-specific payload and may override
/// `target_type`/`target_id` for events emitted by generic instrumentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event ID, filled by the producer when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// User who triggered the event
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Event kind, e.g. "click" or "review_create"
    #[serde(default)]
    pub event_type: Option<String>,
    /// Target entity type, e.g. "book" or "review"
    #[serde(default)]
    pub target_type: Option<String>,
    /// Target entity id, stringly typed on the wire
    #[serde(default)]
    pub target_id: Option<String>,
    /// Event-specific payload (dwell_ms, scroll_depth_pct, target overrides)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Event timestamp
    pub occurred_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(user_id: i64, event_type: &str, target_type: &str, target_id: i64) -> Self {
        Self {
            event_id: None,
            user_id: Some(user_id),
            event_type: Some(event_type.to_string()),
            target_type: Some(target_type.to_string()),
            target_id: Some(target_id.to_string()),
            metadata: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Parsed event kind, `None` for unknown or missing types
    pub fn kind(&self) -> Option<EventKind> {
        self.event_type.as_deref().and_then(EventKind::parse)
    }

    /// Resolved `(target_type, target_id)` after applying metadata overrides.
    ///
    /// Metadata `target_type`/`target_id` entries take precedence over the
    /// top-level fields. Returns `None` when either component is missing or
    /// the id is not numeric.
    pub fn resolved_target(&self) -> Option<(String, i64)> {
        let target_type = self
            .metadata_value("target_type")
            .and_then(value_as_string)
            .or_else(|| self.target_type.clone())?;

        let target_id = self
            .metadata_value("target_id")
            .and_then(value_as_i64)
            .or_else(|| self.target_id.as_deref().and_then(|s| s.trim().parse().ok()))?;

        Some((target_type, target_id))
    }

    /// Numeric metadata field, accepting both JSON numbers and numeric
    /// strings. Anything else reads as `None`.
    pub fn metadata_number(&self, key: &str) -> Option<f64> {
        self.metadata_value(key).and_then(value_as_f64)
    }

    fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.as_object()?.get(key)
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Recognized behavior event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Impression,
    Click,
    Bookmark,
    Like,
    Follow,
    ReviewCreate,
    ReviewUpdate,
    Dwell,
    Scroll,
    WishlistAdd,
}

impl EventKind {
    /// Lenient parse: case-insensitive, accepts both `-` and `_` separators.
    /// Unknown kinds parse to `None` so consumers can skip them.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "impression" => Some(EventKind::Impression),
            "click" => Some(EventKind::Click),
            "bookmark" => Some(EventKind::Bookmark),
            "like" => Some(EventKind::Like),
            "follow" => Some(EventKind::Follow),
            "review_create" => Some(EventKind::ReviewCreate),
            "review_update" => Some(EventKind::ReviewUpdate),
            "dwell" => Some(EventKind::Dwell),
            "scroll" => Some(EventKind::Scroll),
            "wishlist_add" => Some(EventKind::WishlistAdd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Impression => "impression",
            EventKind::Click => "click",
            EventKind::Bookmark => "bookmark",
            EventKind::Like => "like",
            EventKind::Follow => "follow",
            EventKind::ReviewCreate => "review_create",
            EventKind::ReviewUpdate => "review_update",
            EventKind::Dwell => "dwell",
            EventKind::Scroll => "scroll",
            EventKind::WishlistAdd => "wishlist_add",
        }
    }
}
