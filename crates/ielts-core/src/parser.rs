//! TOML question-set parser.
//!
//! Loads question sets from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    CorrectAnswer, Difficulty, PassageSet, Question, QuestionBody, QuestionKind, QuestionSet,
    SkillType, SpeakingPart, SpeakingPrompt, SubQuestion, WritingTask, WritingTaskType,
};

/// Intermediate TOML structure for parsing question set files.
#[derive(Debug, Deserialize)]
struct TomlQuestionFile {
    question_set: TomlQuestionSetHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestionSetHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    skill: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    points: Option<u32>,
    #[serde(default)]
    time_limit: Option<u32>,

    // reading / listening
    #[serde(default)]
    title: String,
    #[serde(default)]
    items: Vec<TomlItem>,

    // writing / speaking
    #[serde(default)]
    prompt: Option<String>,

    // writing
    #[serde(default)]
    task: Option<String>,
    #[serde(default = "default_word_limit")]
    word_limit: u32,

    // speaking
    #[serde(default)]
    part: Option<u8>,
    #[serde(default)]
    preparation_time: Option<u32>,
    #[serde(default)]
    response_time: Option<u32>,
}

fn default_word_limit() -> u32 {
    150
}

#[derive(Debug, Deserialize)]
struct TomlItem {
    id: String,
    text: String,
    kind: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    answer: CorrectAnswer,
}

/// Parse a single TOML file into a `QuestionSet`.
pub fn parse_question_set(path: &Path) -> Result<QuestionSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question set file: {}", path.display()))?;

    parse_question_set_str(&content, path)
}

/// Parse a TOML string into a `QuestionSet` (useful for testing).
pub fn parse_question_set_str(content: &str, source_path: &Path) -> Result<QuestionSet> {
    let parsed: TomlQuestionFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let skill: SkillType = parsed
        .question_set
        .skill
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let id = q.id.clone();
            convert_question(skill, q).with_context(|| format!("question `{id}`"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionSet {
        id: parsed.question_set.id,
        name: parsed.question_set.name,
        description: parsed.question_set.description,
        skill,
        questions,
    })
}

fn convert_question(skill: SkillType, q: TomlQuestion) -> Result<Question> {
    let difficulty = q
        .difficulty
        .map(|d| d.parse().map_err(|e: String| anyhow::anyhow!("{}", e)))
        .transpose()?
        .unwrap_or(Difficulty::Medium);

    let body = match skill {
        SkillType::Reading | SkillType::Listening => {
            let items = q
                .items
                .into_iter()
                .map(|item| {
                    let kind: QuestionKind =
                        item.kind.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
                    Ok(SubQuestion {
                        id: item.id,
                        text: item.text,
                        kind,
                        options: item.options,
                        correct_answer: item.answer,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let set = PassageSet {
                title: q.title,
                items,
            };
            if skill == SkillType::Reading {
                QuestionBody::Reading(set)
            } else {
                QuestionBody::Listening(set)
            }
        }
        SkillType::Writing => {
            let task: WritingTaskType = q
                .task
                .as_deref()
                .context("writing questions need a `task`")?
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{}", e))?;
            QuestionBody::Writing(WritingTask {
                task,
                prompt: q.prompt.unwrap_or_default(),
                word_limit: q.word_limit,
            })
        }
        SkillType::Speaking => {
            let part = q.part.context("speaking questions need a `part`")?;
            let part = SpeakingPart::try_from(part).map_err(|e| anyhow::anyhow!("{}", e))?;
            QuestionBody::Speaking(SpeakingPrompt {
                part,
                prompt: q.prompt.unwrap_or_default(),
                preparation_time: q.preparation_time,
                response_time: q.response_time,
            })
        }
    };

    let points = q.points.unwrap_or(match &body {
        QuestionBody::Reading(p) | QuestionBody::Listening(p) => p.items.len() as u32,
        QuestionBody::Writing(_) | QuestionBody::Speaking(_) => 1,
    });

    Ok(Question {
        id: q.id,
        difficulty,
        points,
        time_limit: q.time_limit,
        body,
    })
}

/// Recursively load all `.toml` question set files from a directory.
pub fn load_question_directory(dir: &Path) -> Result<Vec<QuestionSet>> {
    let mut sets = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            sets.extend(load_question_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_set(&path) {
                Ok(set) => sets.push(set),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    sets.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(sets)
}

/// A warning from question set validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question or sub-question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn new(question_id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(question_id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a question set for common authoring mistakes.
pub fn validate_question_set(set: &QuestionSet) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if set.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "question set has no questions".into(),
        });
    }

    // Question ids and sub-question ids share one answer namespace.
    let mut seen_ids = HashSet::new();
    for question in &set.questions {
        if !seen_ids.insert(question.id.as_str()) {
            warnings.push(ValidationWarning::new(
                &question.id,
                format!("duplicate ID: {}", question.id),
            ));
        }
        for item in question.sub_questions() {
            if !seen_ids.insert(item.id.as_str()) {
                warnings.push(ValidationWarning::new(
                    &item.id,
                    format!("duplicate ID: {}", item.id),
                ));
            }
        }
    }

    for question in &set.questions {
        match &question.body {
            QuestionBody::Reading(passage) | QuestionBody::Listening(passage) => {
                if passage.items.is_empty() {
                    warnings.push(ValidationWarning::new(&question.id, "passage has no items"));
                }
                for item in &passage.items {
                    validate_item(item, &mut warnings);
                }
            }
            QuestionBody::Writing(task) => {
                if task.prompt.trim().is_empty() {
                    warnings.push(ValidationWarning::new(&question.id, "prompt is empty"));
                }
            }
            QuestionBody::Speaking(prompt) => {
                if prompt.prompt.trim().is_empty() {
                    warnings.push(ValidationWarning::new(&question.id, "prompt is empty"));
                }
            }
        }
    }

    warnings
}

fn validate_item(item: &SubQuestion, warnings: &mut Vec<ValidationWarning>) {
    if item.correct_answer.forms().is_empty() {
        warnings.push(ValidationWarning::new(
            &item.id,
            "answer list is empty; the item can never be scored correct",
        ));
    }

    if item.kind != QuestionKind::MultipleChoice {
        return;
    }
    match &item.options {
        None => warnings.push(ValidationWarning::new(
            &item.id,
            "multiple-choice item has no options",
        )),
        Some(options) => {
            for form in item.correct_answer.forms() {
                if !options.iter().any(|o| o == form) {
                    warnings.push(ValidationWarning::new(
                        &item.id,
                        format!("answer `{form}` is not one of the options"),
                    ));
                }
            }
        }
    }
}
