//! Alert and Report records as they live in the store.
//!
//! Records travel as plain JSON field maps (camelCase names, as written by
//! the rider-facing clients). Reads are lenient: a missing or mistyped field
//! decodes to a placeholder instead of failing, so one malformed record
//! never hides the rest of a collection from a dashboard.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Placeholder for missing identifying fields on read.
pub const UNKNOWN: &str = "Unknown";

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// The two logical collections of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Append-only fall alerts.
    Alerts,
    /// Rider reports; append plus status update.
    Reports,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Alerts => "alerts",
            Collection::Reports => "reports",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alerts" => Ok(Collection::Alerts),
            "reports" => Ok(Collection::Reports),
            other => Err(CoreError::Validation(format!(
                "Unknown collection '{other}'. Must be one of: alerts, reports"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// A persisted safety event. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub location: String,
    /// ISO-8601 / RFC 3339.
    pub timestamp: String,
    #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
    pub source_video_url: Option<String>,
}

impl Alert {
    pub fn new(
        alert_type: impl Into<String>,
        location: impl Into<String>,
        at: Timestamp,
        source_video_url: Option<String>,
    ) -> Self {
        Self {
            alert_type: alert_type.into(),
            location: location.into(),
            timestamp: at.to_rfc3339(),
            source_video_url,
        }
    }

    /// Check the persistence invariants: non-empty type, parseable timestamp.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.alert_type.trim().is_empty() {
            return Err(CoreError::Validation("Alert type must not be empty".into()));
        }
        parse_timestamp(&self.timestamp)?;
        Ok(())
    }

    /// Lenient decode from a stored field map.
    pub fn from_record(value: &Value) -> Self {
        Self {
            alert_type: text_or(value, "type", UNKNOWN),
            location: text_or(value, "location", UNKNOWN),
            timestamp: text_or(value, "timestamp", ""),
            source_video_url: optional_text(value, "videoUrl"),
        }
    }

    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Resolution status of a rider report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
}

/// Result of applying a status update to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The stored status changed.
    Changed,
    /// The report already had the requested status.
    Unchanged,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
        }
    }

    /// Validate `self -> to`. Status only moves forward; re-applying the
    /// current status is accepted as a no-op.
    pub fn transition(self, to: ReportStatus) -> Result<StatusChange, CoreError> {
        match (self, to) {
            (ReportStatus::Pending, ReportStatus::Resolved) => Ok(StatusChange::Changed),
            (from, to) if from == to => Ok(StatusChange::Unchanged),
            (from, to) => Err(CoreError::Conflict(format!(
                "Invalid report status transition: {} -> {}",
                from.as_str(),
                to.as_str()
            ))),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            other => Err(CoreError::Validation(format!(
                "Invalid report status '{other}'. Must be one of: pending, resolved"
            ))),
        }
    }
}

/// A rider-submitted issue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub train_number: String,
    pub cabin: String,
    pub problem: String,
    pub location: String,
    pub description: String,
    pub timestamp: String,
    pub status: ReportStatus,
}

impl Report {
    /// Lenient decode from a stored field map. An unrecognized status reads
    /// as pending.
    pub fn from_record(value: &Value) -> Self {
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(ReportStatus::Pending);

        Self {
            train_number: text_or(value, "trainNumber", UNKNOWN),
            cabin: text_or(value, "cabin", UNKNOWN),
            problem: text_or(value, "problem", UNKNOWN),
            location: text_or(value, "location", UNKNOWN),
            description: text_or(value, "description", ""),
            timestamp: text_or(value, "timestamp", ""),
            status,
        }
    }

    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

/// Rider form fields, consumed verbatim by the report writer.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[validate(length(min = 1))]
    pub train_number: String,
    #[validate(length(min = 1))]
    pub cabin: String,
    #[validate(length(min = 1))]
    pub problem: String,
    #[validate(length(min = 1))]
    pub location: String,
    #[validate(length(min = 1))]
    pub description: String,
}

impl NewReport {
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let blank = [
            ("trainNumber", &self.train_number),
            ("cabin", &self.cabin),
            ("problem", &self.problem),
            ("location", &self.location),
            ("description", &self.description),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty());
        match blank {
            Some((field, _)) => Err(CoreError::Validation(format!(
                "Field '{field}' must not be blank"
            ))),
            None => Ok(()),
        }
    }

    /// Build the stored report: submission time and `pending` status.
    pub fn into_report(self, submitted_at: Timestamp) -> Report {
        Report {
            train_number: self.train_number,
            cabin: self.cabin,
            problem: self.problem,
            location: self.location,
            description: self.description,
            timestamp: submitted_at.to_rfc3339(),
            status: ReportStatus::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an ISO-8601 / RFC 3339 timestamp.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, CoreError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| CoreError::Validation(format!("Invalid timestamp '{raw}': {e}")))
}

fn optional_text(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or(value: &Value, field: &str, default: &str) -> String {
    optional_text(value, field).unwrap_or_else(|| default.to_string())
}
