//! The `ielts practice` command.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::sync::mpsc;

use ielts_core::clock::Clock;
use ielts_core::driver::{drive_session, SessionObserver, SessionOutcome};
use ielts_core::error::SessionError;
use ielts_core::model::{AnswerValue, Question, RecordingStatus};
use ielts_core::result::{ExamResult, ResultAvailability, Submission};
use ielts_core::scoring::ItemOutcome;
use ielts_core::session::{SessionCommand, SessionController, SessionEvent};
use ielts_core::traits::JsonDirSink;

const USAGE: &str = "\
Commands:
  answer <id> <text>     record a text answer
  choose <id> <a,b,...>  record one or more choices
  record <id> <secs>     mark a speaking response as recorded
  next | prev            move between questions
  submit                 finish and score now
  quit                   leave without saving";

pub async fn execute(
    questions_path: PathBuf,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    tick_ms: u64,
) -> Result<()> {
    let config = ielts_core::config::load_config_from(config_path.as_deref())?;

    let set = ielts_core::parser::parse_question_set(&questions_path)?;
    for w in ielts_core::parser::validate_question_set(&set) {
        tracing::warn!(question_id = ?w.question_id, "{}", w.message);
    }

    let session = SessionController::with_config(set.questions.clone(), &config)
        .with_context(|| format!("cannot start a session from {}", questions_path.display()))?;

    let output = output.unwrap_or_else(|| PathBuf::from(&config.results_dir));
    let sink = JsonDirSink::new(output);

    println!(
        "{} [{}]: {} question(s), {} on the clock",
        set.name,
        set.skill,
        set.questions.len(),
        format_clock(u64::from(session.remaining_seconds()))
    );
    print_question(0, set.questions.len(), session.current_question());
    println!("{USAGE}\n");

    let (tx, rx) = mpsc::channel(16);
    spawn_stdin_reader(tx);

    let observer = ConsoleObserver {
        questions: set.questions,
    };
    let clock = Clock::new(Duration::from_millis(tick_ms.max(1)));
    let outcome = drive_session(session, &clock, rx, &observer, &sink).await?;

    match outcome {
        SessionOutcome::Submitted(result) => {
            print_summary(&result);
            let path = sink.path_for(&result);
            if path.exists() {
                println!("Result saved to {}", path.display());
            } else {
                println!("Result could not be saved to {}", path.display());
            }
        }
        SessionOutcome::Abandoned => {
            println!("Session abandoned. Nothing was saved.");
        }
    }

    Ok(())
}

/// Read commands from stdin on a plain thread. Closing stdin drops the
/// sender, which the driver treats as leaving the session.
fn spawn_stdin_reader(tx: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("{message}"),
            }
        }
    });
}

/// Parse one input line. Blank lines yield `Ok(None)`.
fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(v, r)| (v, r.trim()))
        .unwrap_or((line, ""));

    let command = match verb.to_lowercase().as_str() {
        "answer" | "a" => {
            let (id, text) = split_id(rest, "answer <id> <text>")?;
            SessionCommand::RecordAnswer {
                question_id: id.to_string(),
                value: AnswerValue::Text(text.to_string()),
            }
        }
        "choose" | "c" => {
            let (id, list) = split_id(rest, "choose <id> <a,b,...>")?;
            let choices: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            SessionCommand::RecordAnswer {
                question_id: id.to_string(),
                value: AnswerValue::Choices(choices),
            }
        }
        "record" | "r" => {
            let (id, secs) = split_id(rest, "record <id> <secs>")?;
            let duration_secs = secs
                .parse()
                .map_err(|_| format!("not a number of seconds: {secs}"))?;
            SessionCommand::RecordAnswer {
                question_id: id.to_string(),
                value: AnswerValue::Recording(RecordingStatus {
                    recorded: true,
                    duration_secs,
                }),
            }
        }
        "next" | "n" => SessionCommand::Next,
        "prev" | "previous" | "p" => SessionCommand::Previous,
        "submit" => SessionCommand::Submit,
        "quit" | "exit" | "q" => SessionCommand::Abandon,
        "help" | "?" => return Err(USAGE.to_string()),
        other => return Err(format!("unknown command `{other}` (type `help`)")),
    };
    Ok(Some(command))
}

fn split_id<'a>(rest: &'a str, usage: &str) -> Result<(&'a str, &'a str), String> {
    match rest.split_once(char::is_whitespace) {
        Some((id, value)) if !value.trim().is_empty() => Ok((id, value.trim())),
        _ => Err(format!("usage: {usage}")),
    }
}

/// Prints timer events to stderr and each newly shown question to stdout.
struct ConsoleObserver {
    questions: Vec<Question>,
}

impl SessionObserver for ConsoleObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Tick {
                phase,
                remaining_secs,
            } => {
                if *remaining_secs > 0 && (*remaining_secs % 300 == 0 || *remaining_secs <= 5) {
                    eprintln!(
                        "  {} left ({phase})",
                        format_clock(u64::from(*remaining_secs))
                    );
                }
            }
            SessionEvent::TimeWarning {
                phase,
                remaining_secs,
                ..
            } => {
                eprintln!(
                    "! Only {} left in {phase}",
                    format_clock(u64::from(*remaining_secs))
                );
            }
            SessionEvent::PhaseChanged {
                to, remaining_secs, ..
            } => {
                eprintln!(
                    "== {to}: {} on the clock",
                    format_clock(u64::from(*remaining_secs))
                );
            }
            SessionEvent::TimerRearmed { total_secs, .. } => {
                eprintln!("  timer reset to {}", format_clock(u64::from(*total_secs)));
            }
            SessionEvent::Navigated { index, .. } => {
                if let Some(question) = self.questions.get(*index) {
                    print_question(*index, self.questions.len(), question);
                }
            }
            SessionEvent::Submitted(_) => {}
        }
    }

    fn on_rejected(&self, command: &SessionCommand, error: &SessionError) {
        eprintln!("Rejected {command:?}: {error}");
    }
}

fn print_question(index: usize, count: usize, question: &Question) {
    println!("\n[{}/{}] {}", index + 1, count, question.headline());
    for item in question.sub_questions() {
        match &item.options {
            Some(options) => println!("  {}: {} ({})", item.id, item.text, options.join(", ")),
            None => println!("  {}: {}", item.id, item.text),
        }
    }
    if question.sub_questions().is_empty() {
        println!("  answer with id `{}`", question.id);
    }
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn outcome_label(outcome: ItemOutcome) -> &'static str {
    match outcome {
        ItemOutcome::Correct => "correct",
        ItemOutcome::Incorrect => "incorrect",
        ItemOutcome::Unanswered => "unanswered",
        ItemOutcome::PendingReview => "pending review",
    }
}

fn print_summary(result: &ExamResult) {
    let mut table = Table::new();
    table.set_header(vec!["Skill", "Score", "Band", "Answered", "Elapsed", "Ended by"]);

    let score = match (result.score, result.percent()) {
        (Some(score), Some(percent)) => {
            format!("{score}/{} ({percent:.0}%)", result.total_possible)
        }
        (Some(score), None) => format!("{score}/{}", result.total_possible),
        (None, _) => "pending review".to_string(),
    };
    let band = result
        .band
        .map(|b| format!("{b:.1}"))
        .unwrap_or_else(|| "-".to_string());
    let ended_by = match result.submission {
        Submission::Manual => "submit",
        Submission::TimeExpired => "time expired",
    };

    table.add_row(vec![
        Cell::new(result.skill_type),
        Cell::new(score),
        Cell::new(band),
        Cell::new(format!("{}/{}", result.answered, result.total_possible)),
        Cell::new(format_clock(result.elapsed_secs)),
        Cell::new(ended_by),
    ]);
    println!("\n{table}");

    if !result.items.is_empty() {
        let mut items = Table::new();
        items.set_header(vec!["Item", "Outcome"]);
        for item in &result.items {
            items.add_row(vec![Cell::new(&item.id), Cell::new(outcome_label(item.outcome))]);
        }
        println!("{items}");
    }

    if let ResultAvailability::Delayed { hours } = result.result_availability {
        println!("Submitted for review. Feedback is expected within {hours}h.");
    }
}
