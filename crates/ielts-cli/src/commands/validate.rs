//! The `ielts validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(questions_path: PathBuf) -> Result<()> {
    let sets = if questions_path.is_dir() {
        ielts_core::parser::load_question_directory(&questions_path)?
    } else {
        vec![ielts_core::parser::parse_question_set(&questions_path)?]
    };

    let mut total_warnings = 0;

    for set in &sets {
        let items: usize = set.questions.iter().map(|q| q.sub_questions().len()).sum();
        if items > 0 {
            println!(
                "Question set: {} [{}] ({} questions, {} items)",
                set.name,
                set.skill,
                set.questions.len(),
                items
            );
        } else {
            println!(
                "Question set: {} [{}] ({} questions)",
                set.name,
                set.skill,
                set.questions.len()
            );
        }

        let warnings = ielts_core::parser::validate_question_set(set);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All question sets valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
