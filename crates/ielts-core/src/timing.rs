//! Per-skill timing table.
//!
//! Maps a skill type and sub-task to a time budget, and decides what happens
//! when a budget runs out or the learner moves between questions. Adding a
//! skill or changing a budget is a table edit, not a control-flow change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Question, QuestionBody, SkillType};
use crate::session::SessionPhase;

/// When the countdown is re-armed on navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RearmRule {
    /// One budget for the whole session.
    Never,
    /// Re-arm when the target question belongs to a different sub-task.
    OnTaskChange,
    /// Re-arm on every question change.
    EveryQuestion,
}

fn default_rearm() -> RearmRule {
    RearmRule::Never
}

/// Timing rules for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTiming {
    /// Answering budget in seconds. For per-question skills this is the
    /// fallback when neither the question nor its sub-task supplies one.
    pub answering_secs: u32,
    /// Secondary phase entered when the answering budget runs out.
    #[serde(default)]
    pub transfer_secs: Option<u32>,
    #[serde(default = "default_rearm")]
    pub rearm: RearmRule,
    /// Budgets keyed by sub-task ("task1", "task2", "part1", ...).
    #[serde(default)]
    pub sub_task_secs: BTreeMap<String, u32>,
}

impl SkillTiming {
    fn session(answering_secs: u32) -> Self {
        Self {
            answering_secs,
            transfer_secs: None,
            rearm: RearmRule::Never,
            sub_task_secs: BTreeMap::new(),
        }
    }
}

/// The complete timing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingPolicy {
    pub reading: SkillTiming,
    pub listening: SkillTiming,
    pub writing: SkillTiming,
    pub speaking: SkillTiming,
    /// Warning threshold for answering phases, as a percentage of the armed budget.
    pub answering_warning_percent: u32,
    /// Warning threshold for transfer time.
    pub transfer_warning_percent: u32,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            reading: SkillTiming::session(3600),
            listening: SkillTiming {
                transfer_secs: Some(600),
                ..SkillTiming::session(1800)
            },
            writing: SkillTiming {
                rearm: RearmRule::OnTaskChange,
                sub_task_secs: BTreeMap::from([("task1".into(), 1200), ("task2".into(), 2400)]),
                ..SkillTiming::session(1200)
            },
            speaking: SkillTiming {
                rearm: RearmRule::EveryQuestion,
                sub_task_secs: BTreeMap::from([
                    ("part1".into(), 60),
                    ("part2".into(), 120),
                    ("part3".into(), 90),
                ]),
                ..SkillTiming::session(120)
            },
            answering_warning_percent: 10,
            transfer_warning_percent: 20,
        }
    }
}

/// An armed countdown: its total and the remaining time at which the
/// one-shot warning fires, if it can fire at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseBudget {
    pub total_secs: u32,
    pub warn_at_secs: Option<u32>,
}

/// What happens when the remaining time reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAction {
    /// Enter transfer time with a fresh budget.
    EnterTransfer(u32),
    /// End the session.
    Expire,
}

impl TimingPolicy {
    pub fn for_skill(&self, skill: SkillType) -> &SkillTiming {
        match skill {
            SkillType::Reading => &self.reading,
            SkillType::Listening => &self.listening,
            SkillType::Writing => &self.writing,
            SkillType::Speaking => &self.speaking,
        }
    }

    /// Budget in seconds for the phase that starts on `question`.
    pub fn duration_for(&self, question: &Question) -> u32 {
        let timing = self.for_skill(question.skill_type());
        let by_sub_task = question
            .sub_task()
            .and_then(|task| timing.sub_task_secs.get(&task.to_string()).copied());

        match timing.rearm {
            RearmRule::EveryQuestion => response_time(question)
                .or(question.time_limit)
                .or(by_sub_task)
                .unwrap_or(timing.answering_secs),
            RearmRule::Never | RearmRule::OnTaskChange => {
                by_sub_task.unwrap_or(timing.answering_secs)
            }
        }
    }

    /// Budget armed when a session starts on `first`.
    pub fn initial_budget(&self, first: &Question) -> PhaseBudget {
        self.budget(SessionPhase::Answering, self.duration_for(first))
    }

    /// New budget in seconds when moving from `from` to `to`, or `None` if
    /// the running countdown carries over.
    pub fn rearm_on_navigate(&self, from: &Question, to: &Question) -> Option<u32> {
        match self.for_skill(to.skill_type()).rearm {
            RearmRule::Never => None,
            RearmRule::OnTaskChange if from.sub_task() == to.sub_task() => None,
            RearmRule::OnTaskChange | RearmRule::EveryQuestion => Some(self.duration_for(to)),
        }
    }

    /// Transition taken when the countdown for `phase` reaches zero.
    pub fn on_expiry(&self, skill: SkillType, phase: SessionPhase) -> ExpiryAction {
        match (phase, self.for_skill(skill).transfer_secs) {
            (SessionPhase::Answering, Some(secs)) => ExpiryAction::EnterTransfer(secs),
            _ => ExpiryAction::Expire,
        }
    }

    /// Remaining seconds at which the warning for `phase` fires.
    pub fn warning_threshold(&self, phase: SessionPhase, total_secs: u32) -> u32 {
        let percent = match phase {
            SessionPhase::TransferTime => self.transfer_warning_percent,
            _ => self.answering_warning_percent,
        };
        (u64::from(total_secs) * u64::from(percent) / 100) as u32
    }

    /// Arm `total_secs` for `phase`. A threshold of zero, or a budget that
    /// already starts at or below its threshold, never warns.
    pub fn budget(&self, phase: SessionPhase, total_secs: u32) -> PhaseBudget {
        let threshold = self.warning_threshold(phase, total_secs);
        let warn_at_secs = (threshold > 0 && total_secs > threshold).then_some(threshold);
        PhaseBudget {
            total_secs,
            warn_at_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("answering_warning_percent", self.answering_warning_percent),
            ("transfer_warning_percent", self.transfer_warning_percent),
        ] {
            if value > 100 {
                return Err(ConfigError::PercentOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

fn response_time(question: &Question) -> Option<u32> {
    match &question.body {
        QuestionBody::Speaking(prompt) => prompt.response_time,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Difficulty, PassageSet, SpeakingPart, SpeakingPrompt, WritingTask, WritingTaskType,
    };

    fn question(id: &str, body: QuestionBody) -> Question {
        Question {
            id: id.into(),
            difficulty: Difficulty::Medium,
            points: 1,
            time_limit: None,
            body,
        }
    }

    fn writing(id: &str, task: WritingTaskType) -> Question {
        question(
            id,
            QuestionBody::Writing(WritingTask {
                task,
                prompt: "Describe the chart".into(),
                word_limit: 150,
            }),
        )
    }

    fn speaking(id: &str, part: SpeakingPart, response_time: Option<u32>) -> Question {
        question(
            id,
            QuestionBody::Speaking(SpeakingPrompt {
                part,
                prompt: "Talk about your hometown".into(),
                preparation_time: None,
                response_time,
            }),
        )
    }

    fn passage(id: &str, listening: bool) -> Question {
        let set = PassageSet {
            title: "Section".into(),
            items: vec![],
        };
        let body = if listening {
            QuestionBody::Listening(set)
        } else {
            QuestionBody::Reading(set)
        };
        question(id, body)
    }

    #[test]
    fn session_level_budgets() {
        let policy = TimingPolicy::default();
        assert_eq!(policy.initial_budget(&passage("r", false)).total_secs, 3600);
        assert_eq!(policy.initial_budget(&passage("l", true)).total_secs, 1800);
        assert_eq!(
            policy.rearm_on_navigate(&passage("r1", false), &passage("r2", false)),
            None
        );
    }

    #[test]
    fn writing_rearms_only_on_task_change() {
        let policy = TimingPolicy::default();
        let t1 = writing("w1", WritingTaskType::Task1);
        let t1b = writing("w1b", WritingTaskType::Task1);
        let t2 = writing("w2", WritingTaskType::Task2);

        assert_eq!(policy.initial_budget(&t1).total_secs, 1200);
        assert_eq!(policy.initial_budget(&t2).total_secs, 2400);
        assert_eq!(policy.rearm_on_navigate(&t1, &t2), Some(2400));
        assert_eq!(policy.rearm_on_navigate(&t2, &t1), Some(1200));
        assert_eq!(policy.rearm_on_navigate(&t1, &t1b), None);
    }

    #[test]
    fn speaking_prefers_response_time_then_part_default() {
        let policy = TimingPolicy::default();
        let a = speaking("a", SpeakingPart::Part1, Some(120));
        let b = speaking("b", SpeakingPart::Part1, Some(90));
        let c = speaking("c", SpeakingPart::Part3, None);

        assert_eq!(policy.initial_budget(&a).total_secs, 120);
        assert_eq!(policy.rearm_on_navigate(&a, &b), Some(90));
        assert_eq!(policy.rearm_on_navigate(&b, &c), Some(90));

        let mut limited = speaking("d", SpeakingPart::Part2, None);
        limited.time_limit = Some(45);
        assert_eq!(policy.duration_for(&limited), 45);
    }

    #[test]
    fn expiry_enters_transfer_only_from_listening_answering() {
        let policy = TimingPolicy::default();
        assert_eq!(
            policy.on_expiry(SkillType::Listening, SessionPhase::Answering),
            ExpiryAction::EnterTransfer(600)
        );
        assert_eq!(
            policy.on_expiry(SkillType::Listening, SessionPhase::TransferTime),
            ExpiryAction::Expire
        );
        assert_eq!(
            policy.on_expiry(SkillType::Reading, SessionPhase::Answering),
            ExpiryAction::Expire
        );
    }

    #[test]
    fn warning_thresholds_per_phase() {
        let policy = TimingPolicy::default();
        assert_eq!(
            policy.budget(SessionPhase::Answering, 3600).warn_at_secs,
            Some(360)
        );
        assert_eq!(
            policy.budget(SessionPhase::TransferTime, 600).warn_at_secs,
            Some(120)
        );
        // 10% of 5s rounds down to zero: no warning for this phase instance.
        assert_eq!(policy.budget(SessionPhase::Answering, 5).warn_at_secs, None);
    }

    #[test]
    fn partial_toml_override_keeps_other_skills() {
        let policy: TimingPolicy = toml::from_str(
            r#"
answering_warning_percent = 15

[reading]
answering_secs = 1200
"#,
        )
        .unwrap();
        assert_eq!(policy.reading.answering_secs, 1200);
        assert_eq!(policy.listening.transfer_secs, Some(600));
        assert_eq!(policy.answering_warning_percent, 15);
        assert_eq!(policy.transfer_warning_percent, 20);
    }

    #[test]
    fn validate_rejects_percent_above_hundred() {
        let policy = TimingPolicy {
            transfer_warning_percent: 150,
            ..TimingPolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::PercentOutOfRange { value: 150, .. })
        ));
    }
}
