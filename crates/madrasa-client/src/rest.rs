//! REST implementation of the backend seam.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use madrasa_core::backend::TestBackend;
use madrasa_core::error::BackendError;
use madrasa_core::model::{LeaderboardEntry, Submission, Test, TestResult};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The platform REST API as a `TestBackend`.
pub struct RestBackend {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

/// Map a non-2xx response into a `BackendError`, preferring the server's
/// structured `{"error": ...}` message over the raw body.
async fn error_for_status(
    response: reqwest::Response,
    not_found_subject: Option<&str>,
) -> BackendError {
    let status = response.status().as_u16();
    if status == 404 {
        if let Some(subject) = not_found_subject {
            return BackendError::NotFound(subject.to_string());
        }
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    BackendError::Api { status, message }
}

fn parse_error(e: reqwest::Error) -> BackendError {
    BackendError::Api {
        status: 0,
        message: format!("failed to parse response: {e}"),
    }
}

#[async_trait]
impl TestBackend for RestBackend {
    #[instrument(skip(self))]
    async fn fetch_test(&self, test_id: &str) -> Result<Test, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/tests/{test_id}", self.base_url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, Some(test_id)).await);
        }
        response.json().await.map_err(parse_error)
    }

    #[instrument(skip(self, submission), fields(user_id = %submission.user_id))]
    async fn submit(
        &self,
        test_id: &str,
        submission: &Submission,
    ) -> Result<TestResult, BackendError> {
        let response = self
            .client
            .post(format!("{}/api/tests/{test_id}/submit", self.base_url))
            .json(submission)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, Some(test_id)).await);
        }
        response.json().await.map_err(parse_error)
    }

    #[instrument(skip(self))]
    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/leaderboard", self.base_url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, None).await);
        }
        response.json().await.map_err(parse_error)
    }
}

#[cfg(test)]
mod tests {
    use madrasa_core::model::AnswerMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_json() -> serde_json::Value {
        serde_json::json!({
            "id": "t-1",
            "title": "Tajweed Basics",
            "description": "Rules of recitation",
            "time_limit_minutes": 5,
            "passing_score": 70.0,
            "questions": [
                {
                    "id": "q-1",
                    "text": "What is ikhfa?",
                    "options": [
                        {"id": "o-1", "text": "Hiding", "is_correct": true},
                        {"id": "o-2", "text": "Merging"}
                    ],
                    "explanation": "Covered in lesson 2"
                }
            ]
        })
    }

    #[tokio::test]
    async fn fetch_test_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tests/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(test_json()))
            .mount(&server)
            .await;

        let backend = RestBackend::new(&server.uri());
        let test = backend.fetch_test("t-1").await.unwrap();
        assert_eq!(test.title, "Tajweed Basics");
        assert_eq!(test.time_limit_secs(), 300);
        assert_eq!(test.questions.len(), 1);
        assert!(test.questions[0].options[0].is_correct);
    }

    #[tokio::test]
    async fn missing_test_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tests/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "test not found"
            })))
            .mount(&server)
            .await;

        let backend = RestBackend::new(&server.uri());
        let err = backend.fetch_test("nope").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(ref id) if id == "nope"));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn submit_posts_answers_and_parses_result() {
        let server = MockServer::start().await;
        let result_json = serde_json::json!({
            "score": 1,
            "total_questions": 1,
            "percentage": 100.0,
            "points_earned": 1,
            "is_retake": false,
            "message": "Well done",
            "correct_answers": [
                {"question_index": 0, "selected_option": 0, "correct_option": 0, "is_correct": true}
            ]
        });

        Mock::given(method("POST"))
            .and(path("/api/tests/t-1/submit"))
            .and(body_partial_json(serde_json::json!({
                "user_id": "guest_ahmed_hassan_abc123",
                "user_name": "Ahmed Hassan",
                "answers": {"0": 0}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&result_json))
            .mount(&server)
            .await;

        let mut answers = AnswerMap::new();
        answers.set(0, 0);
        let submission = Submission {
            user_id: "guest_ahmed_hassan_abc123".into(),
            user_name: "Ahmed Hassan".into(),
            answers,
        };

        let backend = RestBackend::new(&server.uri());
        let result = backend.submit("t-1", &submission).await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.display_percentage(), "100.0%");
        assert!(result.correct_answers[0].is_correct);
    }

    #[tokio::test]
    async fn server_failure_on_submit_is_recoverable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tests/t-1/submit"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let backend = RestBackend::new(&server.uri());
        let submission = Submission {
            user_id: "student@example.com".into(),
            user_name: "Student".into(),
            answers: AnswerMap::new(),
        };
        let err = backend.submit("t-1", &submission).await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 500, .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn structured_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tests/t-1/submit"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "error": "max attempts reached"
            })))
            .mount(&server)
            .await;

        let backend = RestBackend::new(&server.uri());
        let submission = Submission {
            user_id: "student@example.com".into(),
            user_name: "Student".into(),
            answers: AnswerMap::new(),
        };
        let err = backend.submit("t-1", &submission).await.unwrap_err();
        assert!(err.to_string().contains("max attempts reached"));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn leaderboard_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/leaderboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"rank": 1, "user_name": "Fatima", "points": 42, "tests_taken": 5},
                {"rank": 2, "user_name": "Ahmed", "points": 30}
            ])))
            .mount(&server)
            .await;

        let backend = RestBackend::new(&server.uri());
        let entries = backend.leaderboard().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_name, "Fatima");
        assert_eq!(entries[1].tests_taken, 0);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) is not listening
        let backend = RestBackend::new("http://127.0.0.1:9");
        let err = backend.leaderboard().await.unwrap_err();
        assert!(matches!(err, BackendError::Network(_)));
        assert!(err.is_recoverable());
    }
}
