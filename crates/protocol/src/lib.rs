//! Fincoach Protocol
//!
//! Shared wire types for the financial-coaching client stack.
//! Chat frames are serialized as JSON over WebSocket text frames;
//! session types are the JSON bodies of the Session Proxy HTTP surface.

use uuid::Uuid;

pub mod chat;
pub mod plan;
pub mod session;

pub use chat::{ChatRequest, CoachReply, GoalSubmission};
pub use plan::PlanRecord;
pub use session::{SessionCreated, SessionDeleted, SessionSummary, SessionsList};

/// Wire schema version. Bumped when the envelope shape changes incompatibly.
pub const PROTOCOL_VERSION: &str = "1";

/// Generate a new unique ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    #[test]
    fn new_id_is_unique_per_call() {
        assert_ne!(super::new_id(), super::new_id());
    }
}
