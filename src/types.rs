//! Core record types and the outbound wire envelope
//!
//! The JSON shape of `EventRecord` is shared by the durable store and by
//! the `payload` of every message delivered to viewers, so field names
//! here are a compatibility contract with existing dashboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical severity of a security event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// All severities, in declaration order
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable unit of monitored activity
///
/// Fields are only readable after construction; a record that has been
/// appended is shared by value and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    occurred_at: DateTime<Utc>,

    /// Short text identifying what happened (wire name: `event`)
    #[serde(rename = "event")]
    description: String,

    /// Entity the event concerns (wire name: `employee`)
    #[serde(rename = "employee")]
    subject: String,

    severity: Severity,
}

impl EventRecord {
    /// Create a record stamped with the current time
    pub fn new(
        description: impl Into<String>,
        subject: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self::at(Utc::now(), description, subject, severity)
    }

    /// Create a record with an explicit timestamp
    pub fn at(
        occurred_at: DateTime<Utc>,
        description: impl Into<String>,
        subject: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            occurred_at,
            description: description.into(),
            subject: subject.into(),
            severity,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Encode as a store document
    pub fn to_document(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Decode from a store document
    pub fn from_document(doc: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(doc)
    }
}

/// Message delivered to each subscriber, one per event
///
/// Serializes as `{"type": "log", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WireMessage {
    Log(EventRecord),
}

impl WireMessage {
    /// Encode to the JSON text frame sent to viewers
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<EventRecord> for WireMessage {
    fn from(record: EventRecord) -> Self {
        WireMessage::Log(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_record() -> EventRecord {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        EventRecord::at(ts, "USB mounted", "Employee 3", Severity::High)
    }

    #[test]
    fn test_record_creation() {
        let record = EventRecord::new("Login attempt", "Employee 1", Severity::Low);
        assert_eq!(record.description(), "Login attempt");
        assert_eq!(record.subject(), "Employee 1");
        assert_eq!(record.severity(), Severity::Low);
        assert!(record.occurred_at() <= Utc::now());
    }

    #[test]
    fn test_wire_message_shape() {
        let json = WireMessage::from(fixed_record()).encode().unwrap();
        assert_eq!(
            json,
            r#"{"type":"log","payload":{"occurred_at":"2024-03-01T12:30:00Z","event":"USB mounted","employee":"Employee 3","severity":"high"}}"#
        );
    }

    #[test]
    fn test_wire_message_parses_back() {
        let json = WireMessage::from(fixed_record()).encode().unwrap();
        let parsed: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, WireMessage::Log(fixed_record()));
    }

    #[test]
    fn test_document_uses_wire_field_names() {
        let doc = fixed_record().to_document().unwrap();
        assert_eq!(doc["event"], "USB mounted");
        assert_eq!(doc["employee"], "Employee 3");
        assert_eq!(doc["severity"], "high");
        assert!(doc.get("description").is_none());
    }

    #[test]
    fn test_severity_rejects_unknown() {
        let result: std::result::Result<Severity, _> = serde_json::from_str("\"critical\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_severity_display() {
        let names: Vec<String> = Severity::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["low", "medium", "high"]);
    }
}
