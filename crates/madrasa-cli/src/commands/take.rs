//! The `madrasa take` command: one full test attempt in the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use madrasa_client::{load_config_from, RestBackend};
use madrasa_core::backend::TestBackend;
use madrasa_core::identity::{obtain_device_id, AuthContext, FileDeviceStore};
use madrasa_core::model::{Test, TestResult};
use madrasa_core::session::{Phase, SessionObserver, TestSession, TickOutcome};

/// Prints the countdown once a minute, and every second over the last ten.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_tick(&self, remaining_secs: u64) {
        if remaining_secs > 0 && (remaining_secs % 60 == 0 || remaining_secs <= 10) {
            eprintln!("  [{}] remaining", format_remaining(remaining_secs));
        }
    }
}

fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// What the user typed at the answer prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    /// `<question> <option>`, 1-based on both sides.
    Answer { question: usize, option: usize },
    Submit,
}

fn parse_input(line: &str) -> Option<Input> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case("submit") {
        return Some(Input::Submit);
    }
    let mut parts = trimmed.split_whitespace();
    let question: usize = parts.next()?.parse().ok()?;
    let option: usize = parts.next()?.parse().ok()?;
    if parts.next().is_some() || question == 0 || option == 0 {
        return None;
    }
    Some(Input::Answer {
        question: question - 1,
        option: option - 1,
    })
}

pub async fn execute(test_id: String, name: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let backend: Arc<dyn TestBackend> = Arc::new(RestBackend::with_timeout(
        &config.base_url,
        config.request_timeout_secs,
    ));

    let store = FileDeviceStore::new(config.device_id_path());
    let device_id = obtain_device_id(&store);
    let auth = match config.account() {
        Some(account) => AuthContext::signed_in(account, device_id),
        None => AuthContext::guest(device_id),
    };

    let mut session = TestSession::start(backend, &test_id, auth)
        .await
        .map_err(|e| anyhow::anyhow!("could not load test '{test_id}': {e}"))?;
    session.attach_observer(Arc::new(ConsoleObserver));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if session.phase() == Phase::NameEntry {
        match name {
            Some(n) => session.confirm_name(&n)?,
            None => loop {
                eprintln!("Enter your display name:");
                let Some(line) = lines.next_line().await? else {
                    anyhow::bail!("no display name entered");
                };
                match session.confirm_name(&line) {
                    Ok(()) => break,
                    Err(e) => eprintln!("{e}"),
                }
            },
        }
    }

    print_test(&session);

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval resolves immediately.
    interval.tick().await;

    let result = loop {
        tokio::select! {
            _ = interval.tick() => {
                match session.tick() {
                    TickOutcome::Running(_) | TickOutcome::Stopped => {}
                    TickOutcome::Expired => {
                        eprintln!("\nTime is up. Submitting your answers.");
                        match session.submit().await {
                            Ok(result) => break result.clone(),
                            Err(e) => eprintln!(
                                "Submission failed: {e}. Your answers are kept; type 'submit' to retry."
                            ),
                        }
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    anyhow::bail!("input closed before the attempt was submitted");
                };
                match parse_input(&line) {
                    Some(Input::Submit) => {
                        match session.submit().await {
                            Ok(result) => break result.clone(),
                            Err(e) => eprintln!(
                                "Submission failed: {e}. Your answers are kept; type 'submit' to retry."
                            ),
                        }
                    }
                    Some(Input::Answer { question, option }) => {
                        match session.set_answer(question, option) {
                            Ok(()) => eprintln!(
                                "Answered question {} with option {} ({} of {} answered)",
                                question + 1,
                                option + 1,
                                session.answers().len(),
                                session.test().questions.len(),
                            ),
                            Err(e) => eprintln!("{e}"),
                        }
                    }
                    None => eprintln!("Type '<question> <option>' to answer, or 'submit' to finish."),
                }
            }
        }
    };

    print_result(session.test(), &result);
    Ok(())
}

fn print_test(session: &TestSession) {
    let test = session.test();
    println!("=== {} ===", test.title);
    if !test.description.is_empty() {
        println!("{}", test.description);
    }
    println!(
        "Time limit: {} | Passing score: {:.0}% | Questions: {}",
        format_remaining(session.remaining_secs()),
        test.passing_score,
        test.questions.len()
    );
    println!();
    for (qi, question) in test.questions.iter().enumerate() {
        println!("{}. {}", qi + 1, question.text);
        for (oi, option) in question.options.iter().enumerate() {
            println!("   {}) {}", oi + 1, option.text);
        }
    }
    println!();
    println!("Answer with '<question> <option>', e.g. '1 2'. Type 'submit' when done.");
}

fn print_result(test: &Test, result: &TestResult) {
    use comfy_table::{Cell, Table};

    println!();
    println!("=== Result: {} ===", test.title);
    println!(
        "Score: {}/{} ({})",
        result.score,
        result.total_questions,
        result.display_percentage()
    );
    let passed = result.percentage >= test.passing_score;
    println!("{}", if passed { "Passed" } else { "Not passed" });
    if result.is_retake {
        println!("Retake detected: points are only awarded for the first attempt.");
    }
    println!("Points earned: {}", result.points_earned);
    if !result.message.is_empty() {
        println!("{}", result.message);
    }

    if result.correct_answers.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Result"]);
    for review in &result.correct_answers {
        let question = test.questions.get(review.question_index);
        let question_text = question.map(|q| q.text.as_str()).unwrap_or("?");
        let option_text = |index: Option<usize>| -> String {
            match (question, index) {
                (Some(q), Some(i)) => q
                    .options
                    .get(i)
                    .map(|o| o.text.clone())
                    .unwrap_or_else(|| "?".into()),
                _ => "(unanswered)".into(),
            }
        };
        table.add_row(vec![
            Cell::new(review.question_index + 1),
            Cell::new(question_text),
            Cell::new(option_text(review.selected_option)),
            Cell::new(option_text(Some(review.correct_option))),
            Cell::new(if review.is_correct { "correct" } else { "wrong" }),
        ]);
    }
    println!("{table}");

    for review in &result.correct_answers {
        if review.is_correct {
            continue;
        }
        if let Some(explanation) = &review.explanation {
            println!("  Q{}: {}", review.question_index + 1, explanation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_answer_input() {
        assert_eq!(
            parse_input("1 2"),
            Some(Input::Answer {
                question: 0,
                option: 1
            })
        );
        assert_eq!(
            parse_input("  3   1 "),
            Some(Input::Answer {
                question: 2,
                option: 0
            })
        );
    }

    #[test]
    fn parse_submit_input() {
        assert_eq!(parse_input("submit"), Some(Input::Submit));
        assert_eq!(parse_input("SUBMIT"), Some(Input::Submit));
    }

    #[test]
    fn reject_malformed_input() {
        assert_eq!(parse_input(""), None);
        assert_eq!(parse_input("0 1"), None);
        assert_eq!(parse_input("1 0"), None);
        assert_eq!(parse_input("1"), None);
        assert_eq!(parse_input("1 2 3"), None);
        assert_eq!(parse_input("one two"), None);
    }

    #[test]
    fn remaining_time_formatting() {
        assert_eq!(format_remaining(600), "10:00");
        assert_eq!(format_remaining(61), "1:01");
        assert_eq!(format_remaining(9), "0:09");
    }
}
