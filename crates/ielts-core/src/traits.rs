//! Collaborator seams for finished sessions.
//!
//! The engine hands every submitted [`ExamResult`] to a [`ResultSink`]. It
//! does not retry and does not guarantee delivery; that belongs to the sink.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::result::ExamResult;

// ---------------------------------------------------------------------------
// Result persistence
// ---------------------------------------------------------------------------

/// Receives the immutable result of a finished session.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Human-readable sink name (e.g. "json-dir").
    fn name(&self) -> &str;

    /// Store or forward a result.
    async fn persist(&self, result: &ExamResult) -> anyhow::Result<()>;
}

/// Writes each result to `<dir>/result-<session_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the result for `result` is written to.
    pub fn path_for(&self, result: &ExamResult) -> PathBuf {
        self.dir.join(format!("result-{}.json", result.session_id))
    }
}

#[async_trait]
impl ResultSink for JsonDirSink {
    fn name(&self) -> &str {
        "json-dir"
    }

    async fn persist(&self, result: &ExamResult) -> anyhow::Result<()> {
        let path = self.path_for(result);
        let result = result.clone();
        tokio::task::spawn_blocking(move || result.save_json(&path)).await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SkillType;
    use crate::result::{ResultAvailability, Submission};
    use chrono::Utc;
    use uuid::Uuid;

    fn result() -> ExamResult {
        ExamResult {
            session_id: Uuid::new_v4(),
            skill_type: SkillType::Speaking,
            score: None,
            total_possible: 3,
            band: None,
            pending_review: true,
            result_availability: ResultAvailability::Delayed { hours: 48 },
            submission: Submission::Manual,
            answered: 2,
            items: vec![],
            elapsed_secs: 250,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn json_dir_sink_writes_one_file_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonDirSink::new(dir.path());
        let result = result();

        sink.persist(&result).await.unwrap();

        let path = sink.path_for(&result);
        assert!(path.ends_with(format!("result-{}.json", result.session_id)));
        let loaded = ExamResult::load_json(&path).unwrap();
        assert_eq!(loaded, result);
    }
}
