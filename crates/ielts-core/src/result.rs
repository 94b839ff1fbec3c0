//! Exam result produced once per finished session, with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::SkillType;
use crate::scoring::ItemScore;

/// When the learner can see the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultAvailability {
    Immediate,
    /// External review turnaround.
    Delayed { hours: u32 },
}

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Submission {
    Manual,
    TimeExpired,
}

/// The immutable outcome of a practice run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub session_id: Uuid,
    pub skill_type: SkillType,
    /// Correct count; `None` until an external evaluation supplies one.
    pub score: Option<u32>,
    pub total_possible: u32,
    /// Estimated band for auto-gradable skills.
    pub band: Option<f32>,
    pub pending_review: bool,
    pub result_availability: ResultAvailability,
    pub submission: Submission,
    /// Items that received an answer.
    pub answered: u32,
    /// Per-item marking.
    pub items: Vec<ItemScore>,
    /// Seconds of countdown consumed across all phases.
    pub elapsed_secs: u64,
    pub submitted_at: DateTime<Utc>,
}

impl ExamResult {
    /// Save the result as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a result from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let result: ExamResult =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(result)
    }

    /// `score / total_possible` as a percentage, when known.
    pub fn percent(&self) -> Option<f64> {
        match self.score {
            Some(score) if self.total_possible > 0 => {
                Some(f64::from(score) * 100.0 / f64::from(self.total_possible))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ItemOutcome;

    fn sample() -> ExamResult {
        ExamResult {
            session_id: Uuid::new_v4(),
            skill_type: SkillType::Reading,
            score: Some(6),
            total_possible: 10,
            band: Some(6.0),
            pending_review: false,
            result_availability: ResultAvailability::Immediate,
            submission: Submission::Manual,
            answered: 8,
            items: vec![ItemScore {
                id: "s1".into(),
                outcome: ItemOutcome::Correct,
            }],
            elapsed_secs: 1250,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("result.json");
        let result = sample();
        result.save_json(&path).unwrap();

        let loaded = ExamResult::load_json(&path).unwrap();
        assert_eq!(loaded, result);
    }

    #[test]
    fn delayed_availability_shape() {
        let json = serde_json::to_value(ResultAvailability::Delayed { hours: 48 }).unwrap();
        assert_eq!(json["kind"], "delayed");
        assert_eq!(json["hours"], 48);
    }

    #[test]
    fn percent_needs_score() {
        let mut result = sample();
        assert_eq!(result.percent(), Some(60.0));
        result.score = None;
        assert_eq!(result.percent(), None);
    }
}
