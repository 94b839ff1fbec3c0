//! Raw scoring of a finished question set.
//!
//! Reading and listening are marked by exact comparison against the accepted
//! answer forms. Writing and speaking are only counted here; their score
//! comes from an external evaluation.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerMap, AnswerValue, CorrectAnswer, Question, SkillType};

/// How a single item was marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemOutcome {
    Correct,
    Incorrect,
    Unanswered,
    /// Answered, awaiting external evaluation.
    PendingReview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemScore {
    /// Sub-question id (reading, listening) or question id (writing, speaking).
    pub id: String,
    pub outcome: ItemOutcome,
}

/// Result of marking a question set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    pub skill_type: SkillType,
    /// Correct count; `None` while pending review.
    pub score: Option<u32>,
    pub total_possible: u32,
    pub pending_review: bool,
    pub items: Vec<ItemScore>,
}

impl RawScore {
    /// Items that received any answer.
    pub fn answered(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.outcome != ItemOutcome::Unanswered)
            .count()
    }
}

/// Mark `questions` against `answers` for a session of `skill`.
pub fn evaluate(skill: SkillType, questions: &[Question], answers: &AnswerMap) -> RawScore {
    if skill.is_auto_gradable() {
        evaluate_structured(skill, questions, answers)
    } else {
        evaluate_pending(skill, questions, answers)
    }
}

fn evaluate_structured(skill: SkillType, questions: &[Question], answers: &AnswerMap) -> RawScore {
    let items: Vec<ItemScore> = questions
        .iter()
        .flat_map(|q| q.sub_questions())
        .map(|sub| {
            let outcome = match answers.get(&sub.id) {
                None => ItemOutcome::Unanswered,
                Some(answer) if is_correct(&sub.correct_answer, answer) => ItemOutcome::Correct,
                Some(_) => ItemOutcome::Incorrect,
            };
            ItemScore {
                id: sub.id.clone(),
                outcome,
            }
        })
        .collect();

    let correct = items
        .iter()
        .filter(|i| i.outcome == ItemOutcome::Correct)
        .count() as u32;

    RawScore {
        skill_type: skill,
        score: Some(correct),
        total_possible: items.len() as u32,
        pending_review: false,
        items,
    }
}

fn evaluate_pending(skill: SkillType, questions: &[Question], answers: &AnswerMap) -> RawScore {
    let items = questions
        .iter()
        .map(|q| ItemScore {
            id: q.id.clone(),
            outcome: match answers.get(&q.id) {
                Some(answer) if has_content(answer) => ItemOutcome::PendingReview,
                _ => ItemOutcome::Unanswered,
            },
        })
        .collect();

    RawScore {
        skill_type: skill,
        score: None,
        total_possible: questions.len() as u32,
        pending_review: true,
        items,
    }
}

/// Whether `answer` is an accepted form of `correct`.
///
/// A text answer must equal one accepted form exactly. A choice list is
/// correct when it is non-empty and every chosen value is accepted.
/// Recordings never match a structured item.
pub fn is_correct(correct: &CorrectAnswer, answer: &AnswerValue) -> bool {
    match answer {
        AnswerValue::Text(text) => correct.accepts(text),
        AnswerValue::Choices(chosen) => {
            !chosen.is_empty() && chosen.iter().all(|c| correct.accepts(c))
        }
        AnswerValue::Recording(_) => false,
    }
}

fn has_content(answer: &AnswerValue) -> bool {
    match answer {
        AnswerValue::Text(text) => !text.trim().is_empty(),
        AnswerValue::Choices(chosen) => !chosen.is_empty(),
        AnswerValue::Recording(status) => status.recorded,
    }
}
