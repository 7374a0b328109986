//! The backend seam the session controller talks through.
//!
//! Implemented over HTTP by `madrasa-client`; tests substitute a scriptable
//! mock. All scoring and retake detection happens behind this trait.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::model::{LeaderboardEntry, Submission, Test, TestResult};

/// The platform backend, reduced to the three calls the flow needs.
#[async_trait]
pub trait TestBackend: Send + Sync {
    /// Fetch a test definition with its questions and options.
    async fn fetch_test(&self, test_id: &str) -> Result<Test, BackendError>;

    /// Submit one attempt for server-side scoring.
    async fn submit(
        &self,
        test_id: &str,
        submission: &Submission,
    ) -> Result<TestResult, BackendError>;

    /// Fetch the ranked leaderboard.
    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, BackendError>;
}
