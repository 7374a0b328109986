//! Mock backend for testing the session flow without a live server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use madrasa_core::backend::TestBackend;
use madrasa_core::error::BackendError;
use madrasa_core::model::{LeaderboardEntry, Submission, Test, TestResult};

/// A scriptable `TestBackend`.
///
/// Serves a fixed test and result, records every submission, and can be told
/// to fail the next N submissions to exercise retry handling.
pub struct MockBackend {
    test: Option<Test>,
    result: TestResult,
    leaderboard: Vec<LeaderboardEntry>,
    fail_submits: AtomicU32,
    fetch_calls: AtomicU32,
    submit_calls: AtomicU32,
    last_submission: Mutex<Option<Submission>>,
}

impl MockBackend {
    pub fn new(test: Test) -> Self {
        let result = TestResult {
            score: 0,
            total_questions: test.questions.len() as u32,
            percentage: 0.0,
            points_earned: 0,
            is_retake: false,
            message: String::new(),
            correct_answers: vec![],
        };
        Self {
            test: Some(test),
            result,
            leaderboard: vec![],
            fail_submits: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            last_submission: Mutex::new(None),
        }
    }

    /// A backend whose every fetch reports the test as missing.
    pub fn not_found() -> Self {
        Self {
            test: None,
            result: TestResult {
                score: 0,
                total_questions: 0,
                percentage: 0.0,
                points_earned: 0,
                is_retake: false,
                message: String::new(),
                correct_answers: vec![],
            },
            leaderboard: vec![],
            fail_submits: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            last_submission: Mutex::new(None),
        }
    }

    /// Use this scored result for successful submissions.
    pub fn with_result(mut self, result: TestResult) -> Self {
        self.result = result;
        self
    }

    pub fn with_leaderboard(mut self, entries: Vec<LeaderboardEntry>) -> Self {
        self.leaderboard = entries;
        self
    }

    /// Fail the next `n` submissions with a network error.
    pub fn fail_next_submits(self, n: u32) -> Self {
        self.fail_submits.store(n, Ordering::Relaxed);
        self
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::Relaxed)
    }

    /// Submissions that reached the server (failed ones are counted too).
    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::Relaxed)
    }

    /// The last submission accepted by the server.
    pub fn last_submission(&self) -> Option<Submission> {
        self.last_submission.lock().unwrap().clone()
    }
}

#[async_trait]
impl TestBackend for MockBackend {
    async fn fetch_test(&self, test_id: &str) -> Result<Test, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        match &self.test {
            Some(test) => Ok(test.clone()),
            None => Err(BackendError::NotFound(test_id.to_string())),
        }
    }

    async fn submit(
        &self,
        _test_id: &str,
        submission: &Submission,
    ) -> Result<TestResult, BackendError> {
        self.submit_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_submits.load(Ordering::Relaxed) > 0 {
            self.fail_submits.fetch_sub(1, Ordering::Relaxed);
            // The failed attempt never reaches the scoring path
            return Err(BackendError::Network("connection reset by peer".into()));
        }
        *self.last_submission.lock().unwrap() = Some(submission.clone());
        Ok(self.result.clone())
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, BackendError> {
        Ok(self.leaderboard.clone())
    }
}

#[cfg(test)]
mod tests {
    use madrasa_core::model::AnswerMap;

    use super::*;

    fn minimal_test() -> Test {
        Test {
            id: "t-1".into(),
            title: "Test".into(),
            description: String::new(),
            time_limit_minutes: 1,
            passing_score: 60.0,
            max_attempts: None,
            questions: vec![],
        }
    }

    #[tokio::test]
    async fn records_submissions() {
        let backend = MockBackend::new(minimal_test());
        let submission = Submission {
            user_id: "u".into(),
            user_name: "User".into(),
            answers: AnswerMap::new(),
        };
        backend.submit("t-1", &submission).await.unwrap();
        assert_eq!(backend.submit_calls(), 1);
        assert_eq!(backend.last_submission().unwrap().user_id, "u");
    }

    #[tokio::test]
    async fn fails_then_recovers() {
        let backend = MockBackend::new(minimal_test()).fail_next_submits(1);
        let submission = Submission {
            user_id: "u".into(),
            user_name: "User".into(),
            answers: AnswerMap::new(),
        };
        assert!(backend.submit("t-1", &submission).await.is_err());
        assert!(backend.last_submission().is_none());
        assert!(backend.submit("t-1", &submission).await.is_ok());
        assert_eq!(backend.submit_calls(), 2);
    }

    #[tokio::test]
    async fn not_found_backend() {
        let backend = MockBackend::not_found();
        let err = backend.fetch_test("ghost").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(ref id) if id == "ghost"));
        assert_eq!(backend.fetch_calls(), 1);
    }
}
