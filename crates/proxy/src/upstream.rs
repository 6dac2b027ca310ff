//! Upstream HTTP client for the coaching backend.

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use fincoach_protocol::GoalSubmission;

/// Thin wrapper over one `reqwest::Client` pointed at the backend base
/// URL. Bodies are passed through as raw JSON; the proxy never
/// interprets them.
#[derive(Debug, Clone)]
pub struct Upstream {
    http: reqwest::Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn create_session(&self) -> Result<Value, reqwest::Error> {
        self.http
            .post(self.url("/sessions"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn list_sessions(&self) -> Result<Value, reqwest::Error> {
        self.http
            .get(self.url("/sessions"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<Value, reqwest::Error> {
        self.http
            .delete(self.url(&format!("/sessions/{session_id}")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn submit_goal(&self, goal: &GoalSubmission) -> Result<Value, reqwest::Error> {
        self.http
            .post(self.url("/submit-goal/"))
            .json(goal)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let upstream = Upstream::new("http://127.0.0.1:8000/");
        assert_eq!(upstream.url("/sessions"), "http://127.0.0.1:8000/sessions");
    }
}
