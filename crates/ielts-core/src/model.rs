//! Core data model types for ielts-core.
//!
//! These are the types the whole engine is built on: questions for the four
//! skill types, the opaque answers collected for them, and the answer map a
//! session accumulates.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four assessed skills. A session is restricted to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl SkillType {
    /// Reading and listening are scored locally by answer comparison;
    /// writing and speaking wait for an external evaluation.
    pub fn is_auto_gradable(self) -> bool {
        matches!(self, SkillType::Reading | SkillType::Listening)
    }
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillType::Reading => write!(f, "reading"),
            SkillType::Listening => write!(f, "listening"),
            SkillType::Writing => write!(f, "writing"),
            SkillType::Speaking => write!(f, "speaking"),
        }
    }
}

impl FromStr for SkillType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reading" => Ok(SkillType::Reading),
            "listening" => Ok(SkillType::Listening),
            "writing" => Ok(SkillType::Writing),
            "speaking" => Ok(SkillType::Speaking),
            other => Err(format!("unknown skill type: {other}")),
        }
    }
}

/// Authored difficulty of a question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A top-level question. Reading and listening questions group several
/// sub-questions under one passage or recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier for this question.
    pub id: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Points the question is worth in the authored test.
    #[serde(default)]
    pub points: u32,
    /// Optional per-question time limit in seconds.
    #[serde(default)]
    pub time_limit: Option<u32>,
    /// Skill-specific content.
    pub body: QuestionBody,
}

impl Question {
    /// The skill this question belongs to, derived from its body.
    pub fn skill_type(&self) -> SkillType {
        match &self.body {
            QuestionBody::Reading(_) => SkillType::Reading,
            QuestionBody::Listening(_) => SkillType::Listening,
            QuestionBody::Writing(_) => SkillType::Writing,
            QuestionBody::Speaking(_) => SkillType::Speaking,
        }
    }

    /// The writing task or speaking part this question belongs to, if any.
    pub fn sub_task(&self) -> Option<SubTask> {
        match &self.body {
            QuestionBody::Writing(w) => Some(SubTask::Writing(w.task)),
            QuestionBody::Speaking(s) => Some(SubTask::Speaking(s.part)),
            QuestionBody::Reading(_) | QuestionBody::Listening(_) => None,
        }
    }

    /// Sub-questions for reading and listening; empty for other skills.
    pub fn sub_questions(&self) -> &[SubQuestion] {
        match &self.body {
            QuestionBody::Reading(p) | QuestionBody::Listening(p) => &p.items,
            QuestionBody::Writing(_) | QuestionBody::Speaking(_) => &[],
        }
    }

    /// Human-readable prompt line for display.
    pub fn headline(&self) -> String {
        match &self.body {
            QuestionBody::Reading(p) | QuestionBody::Listening(p) => {
                format!("{} ({} items)", p.title, p.items.len())
            }
            QuestionBody::Writing(w) => format!("{}: {}", w.task, w.prompt),
            QuestionBody::Speaking(s) => format!("{}: {}", s.part, s.prompt),
        }
    }
}

/// Skill-specific question content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "skill", rename_all = "lowercase")]
pub enum QuestionBody {
    Reading(PassageSet),
    Listening(PassageSet),
    Writing(WritingTask),
    Speaking(SpeakingPrompt),
}

/// A reading passage or listening section with its ordered sub-questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageSet {
    #[serde(default)]
    pub title: String,
    pub items: Vec<SubQuestion>,
}

/// One auto-gradable item inside a passage set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    pub correct_answer: CorrectAnswer,
}

/// Item formats used in reading and listening papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalseNotGiven,
    YesNoNotGiven,
    Matching,
    GapFill,
    ShortAnswer,
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "multiple-choice" | "mcq" => Ok(QuestionKind::MultipleChoice),
            "true-false-not-given" | "tfng" => Ok(QuestionKind::TrueFalseNotGiven),
            "yes-no-not-given" | "ynng" => Ok(QuestionKind::YesNoNotGiven),
            "matching" => Ok(QuestionKind::Matching),
            "gap-fill" | "completion" => Ok(QuestionKind::GapFill),
            "short-answer" => Ok(QuestionKind::ShortAnswer),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// The accepted answer for a sub-question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    /// A single exact answer.
    One(String),
    /// Several equally acceptable forms (e.g. "colour" / "color").
    AnyOf(Vec<String>),
}

impl CorrectAnswer {
    /// Exact-match check against the accepted form(s).
    pub fn accepts(&self, candidate: &str) -> bool {
        match self {
            CorrectAnswer::One(expected) => expected == candidate,
            CorrectAnswer::AnyOf(forms) => forms.iter().any(|f| f == candidate),
        }
    }

    /// All accepted forms.
    pub fn forms(&self) -> Vec<&str> {
        match self {
            CorrectAnswer::One(expected) => vec![expected.as_str()],
            CorrectAnswer::AnyOf(forms) => forms.iter().map(String::as_str).collect(),
        }
    }
}

/// Writing task number. Task 2 is the longer essay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingTaskType {
    Task1,
    Task2,
}

impl fmt::Display for WritingTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WritingTaskType::Task1 => write!(f, "task1"),
            WritingTaskType::Task2 => write!(f, "task2"),
        }
    }
}

impl FromStr for WritingTaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '_', '-'], "").as_str() {
            "task1" | "1" => Ok(WritingTaskType::Task1),
            "task2" | "2" => Ok(WritingTaskType::Task2),
            other => Err(format!("unknown writing task: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingTask {
    pub task: WritingTaskType,
    pub prompt: String,
    /// Minimum word count the learner is asked to reach.
    pub word_limit: u32,
}

/// Speaking test part (1: interview, 2: long turn, 3: discussion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SpeakingPart {
    Part1,
    Part2,
    Part3,
}

impl TryFrom<u8> for SpeakingPart {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SpeakingPart::Part1),
            2 => Ok(SpeakingPart::Part2),
            3 => Ok(SpeakingPart::Part3),
            other => Err(format!("speaking part must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<SpeakingPart> for u8 {
    fn from(part: SpeakingPart) -> u8 {
        match part {
            SpeakingPart::Part1 => 1,
            SpeakingPart::Part2 => 2,
            SpeakingPart::Part3 => 3,
        }
    }
}

impl fmt::Display for SpeakingPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part{}", u8::from(*self))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakingPrompt {
    pub part: SpeakingPart,
    pub prompt: String,
    #[serde(default)]
    pub preparation_time: Option<u32>,
    /// Seconds the learner has to answer this prompt.
    #[serde(default)]
    pub response_time: Option<u32>,
}

/// A writing task or speaking part. Used as the key of the timing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubTask {
    Writing(WritingTaskType),
    Speaking(SpeakingPart),
}

impl fmt::Display for SubTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubTask::Writing(task) => write!(f, "{task}"),
            SubTask::Speaking(part) => write!(f, "{part}"),
        }
    }
}

/// An answer as emitted by an answer-capture view. The engine never
/// inspects its shape except when scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
    Recording(RecordingStatus),
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        AnswerValue::Text(s)
    }
}

/// Recording state reported by the speaking capture view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingStatus {
    pub recorded: bool,
    #[serde(default)]
    pub duration_secs: u32,
}

/// Answers keyed by question id (writing, speaking) or sub-question id
/// (reading, listening).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(HashMap<String, AnswerValue>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the answer for `id`, returning the previous one.
    pub fn record(&mut self, id: impl Into<String>, value: AnswerValue) -> Option<AnswerValue> {
        self.0.insert(id.into(), value)
    }

    pub fn get(&self, id: &str) -> Option<&AnswerValue> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A named, single-skill collection of questions loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub skill: SkillType,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_display_and_parse() {
        assert_eq!(SkillType::Listening.to_string(), "listening");
        assert_eq!("Reading".parse::<SkillType>().unwrap(), SkillType::Reading);
        assert!("maths".parse::<SkillType>().is_err());
        assert!(SkillType::Reading.is_auto_gradable());
        assert!(!SkillType::Speaking.is_auto_gradable());
    }

    #[test]
    fn correct_answer_accepts_any_form() {
        let any = CorrectAnswer::AnyOf(vec!["colour".into(), "color".into()]);
        assert!(any.accepts("color"));
        assert!(any.accepts("colour"));
        assert!(!any.accepts("Colour"));

        let one = CorrectAnswer::One("B".into());
        assert!(one.accepts("B"));
        assert!(!one.accepts("b"));
    }

    #[test]
    fn speaking_part_bounds() {
        assert_eq!(SpeakingPart::try_from(2).unwrap(), SpeakingPart::Part2);
        assert!(SpeakingPart::try_from(4).is_err());
        assert_eq!(SpeakingPart::Part3.to_string(), "part3");
    }

    #[test]
    fn sub_task_follows_body() {
        let q = Question {
            id: "w1".into(),
            difficulty: Difficulty::Medium,
            points: 1,
            time_limit: None,
            body: QuestionBody::Writing(WritingTask {
                task: WritingTaskType::Task2,
                prompt: "Discuss".into(),
                word_limit: 250,
            }),
        };
        assert_eq!(q.skill_type(), SkillType::Writing);
        assert_eq!(q.sub_task(), Some(SubTask::Writing(WritingTaskType::Task2)));
        assert!(q.sub_questions().is_empty());
    }

    #[test]
    fn answer_map_replaces_existing() {
        let mut answers = AnswerMap::new();
        assert!(answers.record("q1", "A".into()).is_none());
        let previous = answers.record("q1", "B".into());
        assert_eq!(previous, Some(AnswerValue::Text("A".into())));
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get("q1"), Some(&AnswerValue::Text("B".into())));
    }

    #[test]
    fn answer_value_json_shapes() {
        let text: AnswerValue = serde_json::from_str(r#""TRUE""#).unwrap();
        assert_eq!(text, AnswerValue::Text("TRUE".into()));
        let choices: AnswerValue = serde_json::from_str(r#"["A","C"]"#).unwrap();
        assert_eq!(choices, AnswerValue::Choices(vec!["A".into(), "C".into()]));
        let rec: AnswerValue =
            serde_json::from_str(r#"{"recorded":true,"duration_secs":95}"#).unwrap();
        assert!(matches!(rec, AnswerValue::Recording(RecordingStatus { recorded: true, .. })));
    }
}
