//! Core data model types for the test-taking flow.
//!
//! These mirror the JSON shapes the platform backend serves. A `Test` is
//! fetched read-only at session start; the `AnswerMap` is built up as the
//! user answers; a `Submission` is sent once per attempt and scored
//! server-side into a `TestResult`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A test definition as served by the backend. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Test {
    /// Unique identifier for this test.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Description shown before the test starts.
    #[serde(default)]
    pub description: String,
    /// Time limit for one attempt, in minutes.
    pub time_limit_minutes: u64,
    /// Passing score as a percentage (0–100).
    #[serde(default = "default_passing_score")]
    pub passing_score: f64,
    /// Maximum attempts per user (None = unlimited).
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// The questions, in display order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Test {
    /// The countdown a fresh attempt starts from.
    pub fn time_limit_secs(&self) -> u64 {
        self.time_limit_minutes * 60
    }
}

fn default_passing_score() -> f64 {
    60.0
}

/// A single question with its answer options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier for this question.
    pub id: String,
    /// The question text.
    pub text: String,
    /// Answer options, in display order.
    pub options: Vec<ChoiceOption>,
    /// Explanation shown with the result review.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Point value of this question.
    #[serde(default = "default_points")]
    pub points: u32,
}

fn default_points() -> u32 {
    1
}

/// One selectable answer option.
///
/// `is_correct` is server-authoritative metadata used only when rendering the
/// post-submission review; it is never an input to any client-side scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Unique identifier for this option.
    pub id: String,
    /// The option text.
    pub text: String,
    /// Whether this option is the correct one (display-only).
    #[serde(default)]
    pub is_correct: bool,
}

/// Answers collected during one attempt: question index → selected option
/// index.
///
/// Single-choice only: setting an already-answered question overwrites the
/// previous selection. There is no removal operation, so the map never holds
/// more entries than the test has questions and unanswered questions are
/// simply absent. Serializes as a JSON object keyed by the question index,
/// matching the backend's expected `answers` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<usize, usize>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the selected option for a question, overwriting any previous
    /// selection (last write wins).
    pub fn set(&mut self, question: usize, option: usize) {
        self.0.insert(question, option);
    }

    /// The selected option for a question, if answered.
    pub fn get(&self, question: usize) -> Option<usize> {
        self.0.get(&question).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(&q, &o)| (q, o))
    }
}

/// One attempt as sent to the backend for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Stable caller identifier (see [`crate::identity`]).
    pub user_id: String,
    /// Display name shown on the leaderboard.
    pub user_name: String,
    /// The collected answers; partial maps are valid.
    pub answers: AnswerMap,
}

/// A scored attempt as returned by the backend.
///
/// All scoring is server-side; the client only formats these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Count of correctly answered questions.
    pub score: u32,
    /// Total questions in the test.
    pub total_questions: u32,
    /// Score as a percentage (0–100).
    pub percentage: f64,
    /// Points credited for this attempt (zero on a retake, per server policy).
    #[serde(default)]
    pub points_earned: u32,
    /// Whether the server matched this attempt to an earlier one by the same
    /// user id.
    #[serde(default)]
    pub is_retake: bool,
    /// Server-supplied message for the result screen.
    #[serde(default)]
    pub message: String,
    /// Per-question correctness detail for the review screen.
    #[serde(default)]
    pub correct_answers: Vec<AnswerReview>,
}

impl TestResult {
    /// The percentage formatted for display, one decimal place.
    pub fn display_percentage(&self) -> String {
        format!("{:.1}%", self.percentage)
    }
}

/// Review detail for one question, returned with the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerReview {
    /// Index of the question within the test.
    pub question_index: usize,
    /// The option the user selected, if the question was answered.
    #[serde(default)]
    pub selected_option: Option<usize>,
    /// The correct option index.
    pub correct_option: usize,
    /// Whether the user's selection was correct.
    pub is_correct: bool,
    /// Explanation for the review screen.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// One row of the platform leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Rank position (1-based). Zero means the server left ordering implicit.
    #[serde(default)]
    pub rank: u32,
    /// Display name.
    pub user_name: String,
    /// Accumulated points.
    pub points: u32,
    /// Tests taken by this user.
    #[serde(default)]
    pub tests_taken: u32,
    /// When this entry last changed.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
