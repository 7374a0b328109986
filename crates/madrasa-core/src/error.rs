//! Error types for the test-taking flow.
//!
//! `BackendError` is defined here rather than in the REST integration crate
//! so the session state machine can classify failures (terminal load error vs
//! retryable submission error) without string matching.

use thiserror::Error;

/// Errors from the backend seam (test fetch, submission, leaderboard).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested test does not exist.
    #[error("test not found: {0}")]
    NotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),
}

impl BackendError {
    /// Returns `true` if retrying the same request may succeed.
    ///
    /// A missing test or a client-side rejection is permanent; timeouts,
    /// network failures, and server-side errors are worth a retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BackendError::NotFound(_) => false,
            BackendError::Api { status, .. } => *status >= 500 || *status == 0,
            BackendError::Timeout(_) | BackendError::Network(_) => true,
        }
    }
}

/// Errors from the session state machine itself.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Display name failed validation.
    #[error("display name must be at least {min} characters")]
    NameTooShort { min: usize },

    /// Submission attempted without a display name.
    #[error("a display name is required to submit")]
    NameRequired,

    /// `confirm_name` called when no name entry is pending.
    #[error("no name entry is pending")]
    NotAwaitingName,

    /// An in-progress operation was invoked outside the in-progress phase.
    #[error("the session is not in progress")]
    NotInProgress,

    /// Submission already dispatched or completed; fire-once guard.
    #[error("this attempt was already submitted")]
    AlreadySubmitted,

    /// Question index outside the test's question list.
    #[error("question {index} is out of range (test has {total} questions)")]
    QuestionOutOfRange { index: usize, total: usize },

    /// Option index outside the question's option list.
    #[error("option {index} is out of range for question {question}")]
    OptionOutOfRange { question: usize, index: usize },

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SessionError {
    /// Returns `true` if the session remains usable and the operation may be
    /// retried (a failed submission keeps the collected answers).
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::Backend(e) => e.is_recoverable(),
            SessionError::NameTooShort { .. } | SessionError::NameRequired => true,
            _ => false,
        }
    }
}
