//! Structured event records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::observability::context::{CorrelationId, TraceIdentity};

/// Severity of an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// A single emitted event. Constructed by the emitter and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EventRecord {
    level: Level,
    event_type: String,
    message: String,
    attributes: Map<String, Value>,
    timestamp: DateTime<Utc>,
    correlation_id: Option<CorrelationId>,
    trace: Option<TraceIdentity>,
}

impl EventRecord {
    pub(crate) fn new(
        level: Level,
        event_type: String,
        message: String,
        attributes: Map<String, Value>,
        correlation_id: Option<CorrelationId>,
        trace: Option<TraceIdentity>,
    ) -> Self {
        Self {
            level,
            event_type,
            message,
            attributes,
            timestamp: Utc::now(),
            correlation_id,
            trace,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// ISO-8601 timestamp with millisecond precision.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn trace(&self) -> Option<&TraceIdentity> {
        self.trace.as_ref()
    }

    /// The full structured record as a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Attributes converted from an arbitrary JSON value.
///
/// Objects are used as-is, `null` means no attributes, anything else lands under `value`.
pub fn into_attributes(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Caller attributes that reuse a reserved key replace the emitter's value.
        let shadowed = |key: &str| self.attributes.contains_key(key);

        let mut map = serializer.serialize_map(None)?;
        if !shadowed("event") {
            map.serialize_entry("event", &self.event_type)?;
        }
        if !shadowed("message") {
            map.serialize_entry("message", &self.message)?;
        }
        if !shadowed("timestamp") {
            map.serialize_entry("timestamp", &self.timestamp_iso())?;
        }
        if !shadowed("level") {
            map.serialize_entry("level", self.level.as_str())?;
        }
        if let Some(id) = &self.correlation_id {
            if !shadowed("requestId") {
                map.serialize_entry("requestId", id)?;
            }
        }
        if let Some(trace) = &self.trace {
            if !shadowed("trace_id") {
                map.serialize_entry("trace_id", &trace.trace_id)?;
            }
            if !shadowed("span_id") {
                map.serialize_entry("span_id", &trace.span_id)?;
            }
            if !shadowed("trace_flags") {
                map.serialize_entry("trace_flags", &trace.trace_flags)?;
            }
        }
        for (key, value) in &self.attributes {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
