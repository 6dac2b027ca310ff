//! Chat channel frames
//!
//! One envelope in each direction. Every outbound frame carries the
//! session handle; every inbound frame carries the `success` flag and
//! either a plan payload or an error string.

use serde::{Deserialize, Serialize};

use crate::plan::PlanRecord;

/// Outbound frame: a goal (or follow-up message) scoped to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub text: String,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            text: text.into(),
        }
    }
}

/// Inbound frame: the backend's reply to a chat request, or an
/// unsolicited status push on the same channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachReply {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PlanRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CoachReply {
    /// The human-readable failure text for an unsuccessful reply.
    /// Falls back to `message` when the backend omitted `error`.
    pub fn failure_text(&self) -> &str {
        match self.error.as_deref() {
            Some(err) if !err.is_empty() => err,
            _ => &self.message,
        }
    }
}

/// Body of a goal submitted over the plain-HTTP `/goal` surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSubmission {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_chat_request() {
        let req = ChatRequest::new("sess-1", "save for a house deposit");
        let json = serde_json::to_string(&req).expect("serialize");
        assert_eq!(
            json,
            r#"{"session_id":"sess-1","text":"save for a house deposit"}"#
        );
    }

    #[test]
    fn deserializes_successful_reply() {
        let json = r#"{
          "success": true,
          "message": "Plan generated",
          "data": {
            "goal": "save for a house deposit",
            "steps": ["open a savings account", "automate transfers"],
            "timeline": "24 months",
            "estimated_cost": "$40,000",
            "risks": ["rate changes"],
            "recommendations": ["review quarterly"]
          }
        }"#;

        let reply: CoachReply = serde_json::from_str(json).expect("parse reply");
        assert!(reply.success);
        assert_eq!(reply.message, "Plan generated");
        let plan = reply.data.expect("plan present");
        assert_eq!(plan.goal, "save for a house deposit");
        assert_eq!(plan.steps.len(), 2);
        assert!(reply.error.is_none());
    }

    #[test]
    fn deserializes_error_reply_without_message() {
        let json = r#"{"success":false,"error":"Invalid JSON format"}"#;
        let reply: CoachReply = serde_json::from_str(json).expect("parse reply");
        assert!(!reply.success);
        assert_eq!(reply.message, "");
        assert_eq!(reply.failure_text(), "Invalid JSON format");
    }

    #[test]
    fn failure_text_falls_back_to_message() {
        let json = r#"{"success":false,"message":"backend unavailable"}"#;
        let reply: CoachReply = serde_json::from_str(json).expect("parse reply");
        assert_eq!(reply.failure_text(), "backend unavailable");
    }

    #[test]
    fn roundtrip_reply_with_plan() {
        let reply = CoachReply {
            success: true,
            message: "ok".to_string(),
            data: Some(PlanRecord {
                goal: "retire at 60".to_string(),
                steps: vec!["max out pension contributions".to_string()],
                timeline: "20 years".to_string(),
                estimated_cost: "$1.2M".to_string(),
                risks: vec![],
                recommendations: vec![],
            }),
            error: None,
        };

        let json = serde_json::to_string(&reply).expect("serialize");
        assert!(!json.contains("\"error\""));
        let reparsed: CoachReply = serde_json::from_str(&json).expect("reparse");
        assert_eq!(reparsed.data.unwrap().goal, "retire at 60");
    }
}
