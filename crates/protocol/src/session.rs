//! Session Proxy HTTP bodies
//!
//! The backend issues session handles; the client obtains one at
//! start-up and attaches it to every chat request. These types are
//! tolerant of extra backend fields (conversation history, profile)
//! which the client never reads.

use serde::{Deserialize, Serialize};

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

/// One entry of the session list. The backend attaches more fields
/// (conversation history, preferences); only these are meaningful to
/// the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<String>,
}

/// Body of `GET /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsList {
    pub sessions: Vec<SessionSummary>,
}

/// Body of `DELETE /sessions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDeleted {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_created() {
        let json = r#"{"session_id":"0c9d6a1e-4f3b-4a2d-9c1e-8b7a6f5d4e3c"}"#;
        let created: SessionCreated = serde_json::from_str(json).expect("parse");
        assert_eq!(created.session_id, "0c9d6a1e-4f3b-4a2d-9c1e-8b7a6f5d4e3c");
    }

    #[test]
    fn session_list_ignores_backend_extras() {
        let json = r#"{
          "sessions": [
            {
              "id": "sess-1",
              "created_at": "2025-05-02T10:00:00",
              "last_active": "2025-05-02T10:05:00",
              "conversation_history": [{"role":"user","content":"hi"}],
              "user_profile": null
            },
            {"id": "sess-2"}
          ]
        }"#;

        let list: SessionsList = serde_json::from_str(json).expect("parse list");
        assert_eq!(list.sessions.len(), 2);
        assert_eq!(list.sessions[0].id, "sess-1");
        assert_eq!(
            list.sessions[0].created_at.as_deref(),
            Some("2025-05-02T10:00:00")
        );
        assert!(list.sessions[1].last_active.is_none());
    }

    #[test]
    fn roundtrip_session_deleted() {
        let msg = SessionDeleted {
            message: "Session deleted successfully".to_string(),
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        let reparsed: SessionDeleted = serde_json::from_str(&json).expect("reparse");
        assert_eq!(reparsed.message, "Session deleted successfully");
    }
}
