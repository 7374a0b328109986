//! The test-session state machine.
//!
//! Drives one attempt of one test from load to result: fetch the definition,
//! run the countdown, collect answers, submit for server-side scoring. A
//! retake is a brand-new session; nothing is shared across attempts.
//!
//! Phases: `NameEntry` (guests only) → `InProgress` → `Submitting` →
//! `Completed`. A load failure surfaces before a session exists, so there is
//! no error phase; the caller renders the failure and navigates away.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::backend::TestBackend;
use crate::error::{BackendError, SessionError};
use crate::identity::{validate_display_name, AuthContext};
use crate::model::{AnswerMap, Submission, Test, TestResult};

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a guest to confirm a display name.
    NameEntry,
    /// Countdown running, answers being collected.
    InProgress,
    /// Submission dispatched, waiting for the scored result.
    Submitting,
    /// Result received; terminal.
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::NameEntry => write!(f, "name entry"),
            Phase::InProgress => write!(f, "in progress"),
            Phase::Submitting => write!(f, "submitting"),
            Phase::Completed => write!(f, "completed"),
        }
    }
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still in progress; seconds remaining.
    Running(u64),
    /// The countdown just hit zero. The driver must submit exactly once.
    Expired,
    /// The timer is not running (wrong phase, or expiry already signaled).
    Stopped,
}

/// Progress callbacks for whatever is rendering the session.
pub trait SessionObserver: Send + Sync {
    fn on_phase_change(&self, _phase: Phase) {}
    fn on_tick(&self, _remaining_secs: u64) {}
    fn on_submit_failed(&self, _error: &BackendError) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// One attempt of one test.
pub struct TestSession {
    backend: Arc<dyn TestBackend>,
    auth: AuthContext,
    test: Test,
    display_name: Option<String>,
    answers: AnswerMap,
    remaining_secs: u64,
    phase: Phase,
    result: Option<TestResult>,
    observer: Arc<dyn SessionObserver>,
}

impl TestSession {
    /// Fetch the test and open a fresh session.
    ///
    /// On success the countdown is initialized to the full time limit and
    /// the answer map is empty. Signed-in callers skip name entry; guests
    /// must [`confirm_name`](Self::confirm_name) before answering. A fetch
    /// failure is terminal: there is no session to retry into.
    pub async fn start(
        backend: Arc<dyn TestBackend>,
        test_id: &str,
        auth: AuthContext,
    ) -> Result<Self, BackendError> {
        let test = backend.fetch_test(test_id).await?;
        tracing::info!(
            test_id = %test.id,
            questions = test.questions.len(),
            limit_secs = test.time_limit_secs(),
            "test loaded"
        );

        let remaining_secs = test.time_limit_secs();
        let (phase, display_name) = match &auth.account {
            Some(account) => (Phase::InProgress, Some(account.display_name.clone())),
            None => (Phase::NameEntry, None),
        };

        Ok(Self {
            backend,
            auth,
            test,
            display_name,
            answers: AnswerMap::new(),
            remaining_secs,
            phase,
            result: None,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Attach an observer for tick and phase-change callbacks.
    pub fn attach_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observer = observer;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// The scored result, once completed.
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    /// Confirm a guest display name and start the attempt.
    pub fn confirm_name(&mut self, name: &str) -> Result<(), SessionError> {
        if self.phase != Phase::NameEntry {
            return Err(SessionError::NotAwaitingName);
        }
        let name = validate_display_name(name)?;
        self.display_name = Some(name.to_string());
        self.set_phase(Phase::InProgress);
        Ok(())
    }

    /// Record the selected option for a question.
    ///
    /// Idempotent overwrite: re-answering replaces the previous selection.
    /// Correctness is never checked here; scoring is server-authoritative.
    pub fn set_answer(&mut self, question: usize, option: usize) -> Result<(), SessionError> {
        if self.phase != Phase::InProgress {
            return Err(SessionError::NotInProgress);
        }
        let total = self.test.questions.len();
        let Some(q) = self.test.questions.get(question) else {
            return Err(SessionError::QuestionOutOfRange {
                index: question,
                total,
            });
        };
        if option >= q.options.len() {
            return Err(SessionError::OptionOutOfRange {
                question,
                index: option,
            });
        }
        self.answers.set(question, option);
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// Returns [`TickOutcome::Expired`] exactly once, on the tick that
    /// reaches zero; the driver must then submit. Ticks outside
    /// `InProgress`, or after expiry has been signaled, are no-ops; the
    /// timer never fires a second auto-submit.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::InProgress || self.remaining_secs == 0 {
            return TickOutcome::Stopped;
        }
        self.remaining_secs -= 1;
        self.observer.on_tick(self.remaining_secs);
        if self.remaining_secs == 0 {
            tracing::info!(test_id = %self.test.id, "time limit reached");
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining_secs)
        }
    }

    /// Submit the collected answers for scoring.
    ///
    /// Fire-once: a manual submit racing the timeout submit results in one
    /// wire submission; the loser gets [`SessionError::AlreadySubmitted`].
    /// Partial answer maps are valid. On a backend failure the session drops
    /// back to `InProgress` with the answers intact so the user can retry;
    /// no result is fabricated client-side.
    pub async fn submit(&mut self) -> Result<&TestResult, SessionError> {
        match self.phase {
            Phase::InProgress => {}
            Phase::NameEntry => return Err(SessionError::NotInProgress),
            Phase::Submitting | Phase::Completed => return Err(SessionError::AlreadySubmitted),
        }
        let display_name = match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(SessionError::NameRequired),
        };

        self.set_phase(Phase::Submitting);
        let submission = Submission {
            user_id: self.auth.user_id_for(&display_name),
            user_name: display_name,
            answers: self.answers.clone(),
        };
        tracing::info!(
            test_id = %self.test.id,
            user_id = %submission.user_id,
            answered = submission.answers.len(),
            "submitting attempt"
        );

        match self.backend.submit(&self.test.id, &submission).await {
            Ok(result) => {
                self.set_phase(Phase::Completed);
                Ok(&*self.result.insert(result))
            }
            Err(e) => {
                tracing::warn!(test_id = %self.test.id, "submission failed: {e}");
                self.observer.on_submit_failed(&e);
                // Answers are kept; the user may retry.
                self.set_phase(Phase::InProgress);
                Err(SessionError::Backend(e))
            }
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!(from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
        self.observer.on_phase_change(phase);
    }
}

/// Drive the countdown with a one-second interval until expiry, then submit
/// exactly once.
///
/// The interval is dropped the moment the session leaves `InProgress`, so no
/// stray tick can fire after the auto-submission is dispatched. Returns the
/// submission error if the forced submit fails; the session is then back in
/// `InProgress` (with zero seconds left) awaiting a manual retry.
pub async fn run_countdown(session: &mut TestSession) -> Result<(), SessionError> {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval resolves immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        match session.tick() {
            TickOutcome::Running(_) => {}
            TickOutcome::Expired => {
                session.submit().await?;
                return Ok(());
            }
            TickOutcome::Stopped => return Ok(()),
        }
    }
}
