//! Client-side job status polling.
//!
//! The server never pushes progress; between stage requests the client
//! polls `GET /api/jobs/:id` on a fixed interval with a bounded attempt
//! budget. Exhausting the budget is a caller-local timeout: the job record
//! on the server is not touched by it.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::time::sleep;

/// One snapshot of a job's coarse progress.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: String,
    /// 0 = extraction, 1 = refinement, 2 = generation/completed.
    pub stage: u8,
    pub current_item: u32,
    pub total_items: u32,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobProgress {
    /// Whether the current stage has finished (the `*_completed` statuses
    /// and the terminal `completed`).
    pub fn stage_settled(&self) -> bool {
        self.status == "completed" || self.status.ends_with("_completed")
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Gave up waiting after {attempts} polls")]
    Timeout { attempts: u32 },

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Status request failed: {0}")]
    Http(String),
}

/// Polls a job's status until it advances past a stage.
pub struct JobPoller {
    client: reqwest::Client,
    base_url: String,
    interval: Duration,
    max_attempts: u32,
}

impl JobPoller {
    /// Default cadence: every second, for up to two minutes.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            interval: Duration::from_secs(1),
            max_attempts: 120,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Fetch the current progress snapshot.
    pub async fn fetch(&self, job_id: &str) -> Result<JobProgress, PollError> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PollError::Http(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PollError::NotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(PollError::Http(format!(
                "Unexpected status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PollError::Http(e.to_string()))
    }

    /// Poll until the job has moved past `past_stage` (or that stage has
    /// settled), the job reports an error, or the attempt budget is spent.
    pub async fn wait_past_stage(
        &self,
        job_id: &str,
        past_stage: u8,
    ) -> Result<JobProgress, PollError> {
        for attempt in 1..=self.max_attempts {
            let progress = self.fetch(job_id).await?;

            if progress.status == "error" {
                let message = progress
                    .error_message
                    .unwrap_or_else(|| "no error message recorded".to_string());
                return Err(PollError::JobFailed(message));
            }
            if progress.stage > past_stage || progress.stage_settled() {
                return Ok(progress);
            }

            if attempt < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        Err(PollError::Timeout {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    /// Scripted `(status code, body)` responses, replayed in order; the
    /// last entry repeats once the script is exhausted.
    type Script = Arc<Mutex<(Vec<(u16, Value)>, usize)>>;

    async fn scripted_status(State(script): State<Script>) -> (StatusCode, Json<Value>) {
        let mut guard = script.lock().unwrap();
        let index = guard.1.min(guard.0.len() - 1);
        let (code, body) = guard.0[index].clone();
        guard.1 += 1;
        (StatusCode::from_u16(code).unwrap(), Json(body))
    }

    /// Serve the script from an ephemeral local port; returns the base URL.
    async fn spawn_status_server(responses: Vec<(u16, Value)>) -> String {
        let script: Script = Arc::new(Mutex::new((responses, 0)));
        let app = Router::new()
            .route("/api/jobs/:job_id", get(scripted_status))
            .with_state(script);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn snapshot(stage: u8, status: &str) -> Value {
        json!({
            "jobId": "job-1",
            "stage": stage,
            "currentItem": 1,
            "totalItems": 1,
            "status": status,
        })
    }

    fn fast_poller(base_url: &str) -> JobPoller {
        JobPoller::new(base_url).with_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn waiting_ends_once_the_job_passes_the_stage() {
        let base_url = spawn_status_server(vec![
            (200, snapshot(0, "extracting")),
            (200, snapshot(0, "extracting")),
            (200, snapshot(1, "refining")),
        ])
        .await;

        let progress = fast_poller(&base_url)
            .wait_past_stage("job-1", 0)
            .await
            .unwrap();
        assert_eq!(progress.stage, 1);
        assert_eq!(progress.status, "refining");
    }

    #[tokio::test]
    async fn a_settled_stage_ends_the_wait_without_advancing() {
        let base_url = spawn_status_server(vec![
            (200, snapshot(0, "extracting")),
            (200, snapshot(0, "extracting_completed")),
        ])
        .await;

        let progress = fast_poller(&base_url)
            .wait_past_stage("job-1", 0)
            .await
            .unwrap();
        assert_eq!(progress.status, "extracting_completed");
    }

    #[tokio::test]
    async fn a_failed_job_aborts_the_wait_with_its_message() {
        let base_url = spawn_status_server(vec![
            (200, snapshot(0, "extracting")),
            (
                200,
                json!({
                    "jobId": "job-1",
                    "stage": 0,
                    "currentItem": 0,
                    "totalItems": 1,
                    "status": "error",
                    "errorMessage": "model exploded",
                }),
            ),
        ])
        .await;

        let error = fast_poller(&base_url)
            .wait_past_stage("job-1", 0)
            .await
            .unwrap_err();
        match error {
            PollError::JobFailed(message) => assert!(message.contains("model exploded")),
            other => panic!("expected JobFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn spending_the_attempt_budget_is_a_timeout() {
        let base_url = spawn_status_server(vec![(200, snapshot(0, "extracting"))]).await;

        let error = fast_poller(&base_url)
            .with_max_attempts(3)
            .wait_past_stage("job-1", 0)
            .await
            .unwrap_err();
        match error {
            PollError::Timeout { attempts } => assert_eq!(attempts, 3),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn an_unknown_job_is_reported_as_not_found() {
        let base_url = spawn_status_server(vec![(
            404,
            json!({"error": "not_found", "message": "Job not found"}),
        )])
        .await;

        let error = fast_poller(&base_url)
            .wait_past_stage("missing", 0)
            .await
            .unwrap_err();
        assert!(matches!(error, PollError::NotFound(_)));
    }

    fn progress(stage: u8, status: &str) -> JobProgress {
        JobProgress {
            job_id: "j".into(),
            stage,
            current_item: 0,
            total_items: 1,
            status: status.into(),
            error_message: None,
        }
    }

    #[test]
    fn settled_statuses_are_detected() {
        assert!(progress(0, "extracting_completed").stage_settled());
        assert!(progress(1, "refining_completed").stage_settled());
        assert!(progress(2, "completed").stage_settled());
        assert!(!progress(0, "extracting").stage_settled());
        assert!(!progress(2, "generating").stage_settled());
    }

    #[test]
    fn progress_parses_server_response() {
        let progress: JobProgress = serde_json::from_str(
            r#"{"jobId":"abc","stage":1,"currentItem":2,"totalItems":2,"status":"refining"}"#,
        )
        .unwrap();
        assert_eq!(progress.stage, 1);
        assert_eq!(progress.status, "refining");
        assert!(progress.error_message.is_none());
    }
}
