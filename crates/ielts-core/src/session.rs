//! Practice session state machine.
//!
//! A [`SessionController`] owns one practice run: the question list, the
//! answers, the current phase and its countdown. Ticks and navigation
//! commands mutate it and return [`SessionEvent`]s describing what happened,
//! so presentation layers never get called from inside the engine.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::band::BandEstimator;
use crate::clock::ClockHandle;
use crate::config::{EngineConfig, DEFAULT_REVIEW_TURNAROUND_HOURS};
use crate::error::SessionError;
use crate::model::{AnswerMap, AnswerValue, Question, SkillType};
use crate::result::{ExamResult, ResultAvailability, Submission};
use crate::scoring;
use crate::timing::{ExpiryAction, PhaseBudget, TimingPolicy};

/// Timing regime of a session. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    Answering,
    TransferTime,
    /// The countdown ran out and the session was submitted automatically.
    Expired,
    /// The learner submitted.
    Completed,
}

impl SessionPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, SessionPhase::Expired | SessionPhase::Completed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Answering => write!(f, "answering"),
            SessionPhase::TransferTime => write!(f, "transfer time"),
            SessionPhase::Expired => write!(f, "expired"),
            SessionPhase::Completed => write!(f, "completed"),
        }
    }
}

/// Everything a state transition can report.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Tick {
        phase: SessionPhase,
        remaining_secs: u32,
    },
    /// One-shot low-time warning for the current phase instance.
    TimeWarning {
        phase: SessionPhase,
        remaining_secs: u32,
        total_secs: u32,
    },
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
        remaining_secs: u32,
    },
    TimerRearmed {
        question_id: String,
        total_secs: u32,
    },
    Navigated {
        index: usize,
        question_id: String,
    },
    Submitted(Arc<ExamResult>),
}

/// Commands an answer-capture or navigation layer sends to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    RecordAnswer {
        question_id: String,
        value: AnswerValue,
    },
    Next,
    Previous,
    Submit,
    /// The learner left the practice screen.
    Abandon,
}

/// Snapshot of a running session.
///
/// `remaining_seconds` is only meaningful while the phase is `Answering` or
/// `TransferTime`.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub phase: SessionPhase,
    pub remaining_seconds: u32,
    pub answers: AnswerMap,
}

/// Tunables a controller is created with.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub timing: TimingPolicy,
    pub bands: BandEstimator,
    /// Turnaround advertised for skills that wait for external review.
    pub review_turnaround_hours: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timing: TimingPolicy::default(),
            bands: BandEstimator::default(),
            review_turnaround_hours: DEFAULT_REVIEW_TURNAROUND_HOURS,
        }
    }
}

/// The session state machine.
pub struct SessionController {
    id: Uuid,
    skill: SkillType,
    state: SessionState,
    budget: PhaseBudget,
    elapsed_secs: u64,
    settings: SessionSettings,
    result: Option<Arc<ExamResult>>,
    clock: Option<ClockHandle>,
    abandoned: bool,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .field("skill", &self.skill)
            .field("current_index", &self.state.current_index)
            .field("phase", &self.state.phase)
            .field("remaining_seconds", &self.state.remaining_seconds)
            .field("answers", &self.state.answers.len())
            .field("clock_attached", &self.clock.is_some())
            .field("abandoned", &self.abandoned)
            .finish()
    }
}

impl SessionController {
    /// Start a session with the default timing table and band calibration.
    pub fn start(questions: Vec<Question>) -> Result<Self, SessionError> {
        Self::with_settings(questions, SessionSettings::default())
    }

    /// Start a session with timing and band calibration from `config`.
    pub fn with_config(questions: Vec<Question>, config: &EngineConfig) -> anyhow::Result<Self> {
        let settings = config.session_settings()?;
        Ok(Self::with_settings(questions, settings)?)
    }

    pub fn with_settings(
        questions: Vec<Question>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let Some(first) = questions.first() else {
            return Err(SessionError::EmptyQuestionSet);
        };
        let skill = first.skill_type();
        if let Some(odd) = questions.iter().find(|q| q.skill_type() != skill) {
            return Err(SessionError::MixedSkillTypes {
                expected: skill,
                found: odd.skill_type(),
                question_id: odd.id.clone(),
            });
        }

        let budget = settings.timing.initial_budget(first);
        let id = Uuid::new_v4();
        tracing::info!(
            session_id = %id,
            %skill,
            questions = questions.len(),
            budget_secs = budget.total_secs,
            "practice session started"
        );

        Ok(Self {
            id,
            skill,
            state: SessionState {
                questions,
                current_index: 0,
                phase: SessionPhase::Answering,
                remaining_seconds: budget.total_secs,
                answers: AnswerMap::new(),
            },
            budget,
            elapsed_secs: 0,
            settings,
            result: None,
            clock: None,
            abandoned: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn skill_type(&self) -> SkillType {
        self.skill
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds
    }

    /// The armed countdown for the current phase instance.
    pub fn budget(&self) -> PhaseBudget {
        self.budget
    }

    pub fn current_question(&self) -> &Question {
        &self.state.questions[self.state.current_index]
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.state.answers
    }

    /// `true` once the session was submitted, expired or abandoned.
    pub fn is_finished(&self) -> bool {
        self.abandoned || self.state.phase.is_finished()
    }

    /// The result, once the session has been submitted.
    pub fn result(&self) -> Option<&Arc<ExamResult>> {
        self.result.as_ref()
    }

    pub fn has_clock(&self) -> bool {
        self.clock.is_some()
    }

    /// Take ownership of an armed clock. It is cancelled when the session
    /// finishes or the controller is dropped.
    pub fn attach_clock(&mut self, handle: ClockHandle) -> Result<(), SessionError> {
        self.ensure_active("attach_clock")?;
        self.clock = Some(handle);
        Ok(())
    }

    /// Insert or replace the answer for a question or sub-question id.
    pub fn record_answer(
        &mut self,
        question_id: impl Into<String>,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        self.ensure_active("record_answer")?;
        let question_id = question_id.into();
        tracing::debug!(session_id = %self.id, %question_id, "answer recorded");
        self.state.answers.record(question_id, value);
        Ok(())
    }

    /// Move forward. On the last question this submits the session.
    pub fn next(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active("next")?;
        let index = self.state.current_index;
        if index + 1 >= self.state.questions.len() {
            return Ok(self.submit_with_events());
        }
        Ok(self.move_to(index + 1))
    }

    /// Move back. A no-op on the first question.
    pub fn previous(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active("previous")?;
        match self.state.current_index {
            0 => Ok(Vec::new()),
            index => Ok(self.move_to(index - 1)),
        }
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active("tick")?;

        let phase = self.state.phase;
        let remaining = self.state.remaining_seconds.saturating_sub(1);
        self.state.remaining_seconds = remaining;
        self.elapsed_secs += 1;

        let mut events = vec![SessionEvent::Tick {
            phase,
            remaining_secs: remaining,
        }];

        if let Some(threshold) = self.budget.warn_at_secs {
            if remaining <= threshold {
                self.budget.warn_at_secs = None;
                tracing::info!(session_id = %self.id, %phase, remaining, "low time warning");
                events.push(SessionEvent::TimeWarning {
                    phase,
                    remaining_secs: remaining,
                    total_secs: self.budget.total_secs,
                });
            }
        }

        if remaining > 0 {
            return Ok(events);
        }

        match self.settings.timing.on_expiry(self.skill, phase) {
            ExpiryAction::EnterTransfer(secs) => {
                self.arm(SessionPhase::TransferTime, secs);
                tracing::info!(session_id = %self.id, secs, "transfer time started");
                events.push(SessionEvent::PhaseChanged {
                    from: phase,
                    to: SessionPhase::TransferTime,
                    remaining_secs: secs,
                });
            }
            ExpiryAction::Expire => {
                self.state.phase = SessionPhase::Expired;
                tracing::info!(session_id = %self.id, %phase, "time expired");
                events.push(SessionEvent::PhaseChanged {
                    from: phase,
                    to: SessionPhase::Expired,
                    remaining_secs: 0,
                });
                let result = self.finish(Submission::TimeExpired);
                events.push(SessionEvent::Submitted(result));
            }
        }

        Ok(events)
    }

    /// Score the session and freeze it. Idempotent: later calls return the
    /// same result without scoring again.
    pub fn submit(&mut self) -> Arc<ExamResult> {
        if let Some(result) = &self.result {
            tracing::debug!(session_id = %self.id, "already submitted");
            return Arc::clone(result);
        }
        self.state.phase = SessionPhase::Completed;
        self.finish(Submission::Manual)
    }

    /// Apply a navigation or answer command.
    pub fn apply(&mut self, command: SessionCommand) -> Result<Vec<SessionEvent>, SessionError> {
        match command {
            SessionCommand::RecordAnswer { question_id, value } => {
                self.record_answer(question_id, value)?;
                Ok(Vec::new())
            }
            SessionCommand::Next => self.next(),
            SessionCommand::Previous => self.previous(),
            SessionCommand::Submit => {
                if self.abandoned {
                    self.ensure_active("submit")?;
                }
                Ok(self.submit_with_events())
            }
            SessionCommand::Abandon => {
                self.ensure_active("abandon")?;
                tracing::info!(session_id = %self.id, "practice session abandoned");
                self.abandoned = true;
                self.release_clock();
                Ok(Vec::new())
            }
        }
    }

    /// Tear down a session the learner walked away from.
    pub fn abandon(mut self) {
        tracing::info!(
            session_id = %self.id,
            submitted = self.result.is_some(),
            "practice session abandoned"
        );
        self.release_clock();
    }

    fn ensure_active(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.is_finished() {
            tracing::error!(
                session_id = %self.id,
                operation,
                phase = %self.state.phase,
                abandoned = self.abandoned,
                "operation on a finished session"
            );
            return Err(SessionError::SessionAlreadyFinished);
        }
        Ok(())
    }

    /// Manual submit as seen by an event consumer: the move to `Completed`
    /// (unless the session had already finished) followed by the result.
    fn submit_with_events(&mut self) -> Vec<SessionEvent> {
        let from = self.state.phase;
        let result = self.submit();
        let mut events = Vec::with_capacity(2);
        if !from.is_finished() {
            events.push(SessionEvent::PhaseChanged {
                from,
                to: SessionPhase::Completed,
                remaining_secs: self.state.remaining_seconds,
            });
        }
        events.push(SessionEvent::Submitted(result));
        events
    }

    fn arm(&mut self, phase: SessionPhase, total_secs: u32) {
        self.budget = self.settings.timing.budget(phase, total_secs);
        self.state.phase = phase;
        self.state.remaining_seconds = total_secs;
    }

    fn move_to(&mut self, index: usize) -> Vec<SessionEvent> {
        let from = self.state.current_index;
        self.state.current_index = index;

        let question_id = self.state.questions[index].id.clone();
        let mut events = vec![SessionEvent::Navigated {
            index,
            question_id: question_id.clone(),
        }];

        let rearm = self
            .settings
            .timing
            .rearm_on_navigate(&self.state.questions[from], &self.state.questions[index]);
        if let Some(total_secs) = rearm {
            self.arm(self.state.phase, total_secs);
            tracing::debug!(session_id = %self.id, %question_id, total_secs, "timer re-armed");
            events.push(SessionEvent::TimerRearmed {
                question_id,
                total_secs,
            });
        }
        events
    }

    fn finish(&mut self, submission: Submission) -> Arc<ExamResult> {
        let raw = scoring::evaluate(self.skill, &self.state.questions, &self.state.answers);
        let band = if raw.pending_review {
            None
        } else {
            raw.score
                .and_then(|score| self.settings.bands.estimate(score, raw.total_possible))
        };
        let result_availability = if raw.pending_review {
            ResultAvailability::Delayed {
                hours: self.settings.review_turnaround_hours,
            }
        } else {
            ResultAvailability::Immediate
        };

        let result = Arc::new(ExamResult {
            session_id: self.id,
            skill_type: self.skill,
            score: raw.score,
            total_possible: raw.total_possible,
            band,
            pending_review: raw.pending_review,
            result_availability,
            submission,
            answered: raw.answered() as u32,
            items: raw.items,
            elapsed_secs: self.elapsed_secs,
            submitted_at: Utc::now(),
        });

        tracing::info!(
            session_id = %self.id,
            score = ?result.score,
            total = result.total_possible,
            band = ?result.band,
            ?submission,
            "session submitted"
        );

        self.release_clock();
        self.result = Some(Arc::clone(&result));
        result
    }

    fn release_clock(&mut self) {
        if let Some(handle) = self.clock.take() {
            handle.cancel();
            tracing::debug!(session_id = %self.id, "clock released");
        }
    }
}
