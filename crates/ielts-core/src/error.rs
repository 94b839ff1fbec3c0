//! Engine error types.
//!
//! Session errors are input-contract violations or misuse of a finished
//! session. None of them are transient, so callers never retry.

use thiserror::Error;

use crate::model::SkillType;

/// Errors raised by [`crate::session::SessionController`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// `start` was called with no questions. The caller redirects the learner.
    #[error("cannot start a session with an empty question set")]
    EmptyQuestionSet,

    /// A mutating operation reached a session that is already `Completed` or `Expired`.
    #[error("session already finished")]
    SessionAlreadyFinished,

    /// The question set contains more than one skill type.
    #[error("question {question_id} is {found}, but this session is {expected}")]
    MixedSkillTypes {
        expected: SkillType,
        found: SkillType,
        question_id: String,
    },
}

impl SessionError {
    /// Returns `true` if the error means the collaborator kept driving a finished session.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SessionError::SessionAlreadyFinished)
    }
}

/// Errors found while validating engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A band step has a ratio outside `[0, 1]`.
    #[error("band step ratio {0} is outside [0, 1]")]
    RatioOutOfRange(f64),

    /// A band is outside the valid range or not on a half-band step.
    #[error("band {0} is not a half step in [0, 9]")]
    InvalidBand(f32),

    /// The step table would make the band decrease as the ratio increases.
    #[error("band table is not monotonic at ratio {ratio}")]
    NotMonotonic { ratio: f64 },

    /// A warning percentage is above 100.
    #[error("{name} must be at most 100, got {value}")]
    PercentOutOfRange { name: &'static str, value: u32 },
}
