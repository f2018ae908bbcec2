//! Structured audit lines for admin mutations.
//!
//! Events go to the `audit` tracing target so the subscriber can route
//! them separately.
//!
//! ```ignore
//! AuditEvent::new(Some(actor), "event.delete", Some(format!("event:{}", id)), AuditOutcome::Success)
//!     .with_ip(extract_ip_from_headers(&headers))
//!     .log();
//! ```

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Admin identity that passed the gate
    pub actor: Option<String>,
    /// Dotted action name, e.g. `event.import`
    pub action: String,
    /// Affected entity, e.g. `location:3`
    pub resource: Option<String>,
    pub outcome: AuditOutcome,
    pub ip_address: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        actor: Option<String>,
        action: impl Into<String>,
        resource: Option<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            actor,
            action: action.into(),
            resource,
            outcome,
            ip_address: None,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Emit on the `audit` target.
    pub fn log(self) {
        tracing::info!(
            target: "audit",
            actor = self.actor,
            action = %self.action,
            resource = self.resource,
            outcome = ?self.outcome,
            ip = self.ip_address,
            details = ?self.details,
            "{}",
            serde_json::to_string(&self).unwrap_or_else(|_| self.action.clone())
        );
    }
}

/// Client IP from `X-Forwarded-For` (first hop) or `X-Real-IP`.
pub fn extract_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(extract_ip_from_headers(&headers).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_extract_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(extract_ip_from_headers(&headers).as_deref(), Some("10.0.0.9"));
        assert_eq!(extract_ip_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_audit_event_serializes_outcome_lowercase() {
        let event = AuditEvent::new(
            Some("orga".into()),
            "tag.delete",
            Some("tag:4".into()),
            AuditOutcome::Success,
        )
        .with_details(serde_json::json!({"name": "demo"}));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["resource"], "tag:4");
        assert_eq!(json["details"]["name"], "demo");
    }
}
