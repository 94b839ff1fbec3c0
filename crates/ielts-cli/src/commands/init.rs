//! The `ielts init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("ielts.toml").exists() {
        println!("ielts.toml already exists, skipping.");
    } else {
        std::fs::write("ielts.toml", SAMPLE_CONFIG)?;
        println!("Created ielts.toml");
    }

    std::fs::create_dir_all("question-sets")?;
    let example_path = std::path::Path::new("question-sets/sample-reading.toml");
    if example_path.exists() {
        println!("question-sets/sample-reading.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, SAMPLE_READING_SET)?;
        println!("Created question-sets/sample-reading.toml");
    }

    println!("\nNext steps:");
    println!("  1. Adjust timings and band calibration in ielts.toml");
    println!("  2. Run: ielts validate --questions question-sets/sample-reading.toml");
    println!("  3. Run: ielts practice --questions question-sets/sample-reading.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# ielts configuration

review_turnaround_hours = 48
results_dir = "./ielts-results"

[timing]
answering_warning_percent = 10
transfer_warning_percent = 20

[timing.reading]
answering_secs = 3600

[timing.listening]
answering_secs = 1800
transfer_secs = 600

[timing.writing]
answering_secs = 1200
rearm = "on-task-change"
sub_task_secs = { task1 = 1200, task2 = 2400 }

[timing.speaking]
answering_secs = 120
rearm = "every-question"
sub_task_secs = { part1 = 60, part2 = 120, part3 = 90 }
"#;

const SAMPLE_READING_SET: &str = r#"[question_set]
id = "sample-reading"
name = "Sample Reading"
description = "A short passage to try the practice runner"
skill = "reading"

[[questions]]
id = "passage-1"
title = "The Return of the Night Train"
difficulty = "easy"

[[questions.items]]
id = "p1-q1"
text = "Night train routes across Europe declined after the 1990s."
kind = "tfng"
answer = "TRUE"

[[questions.items]]
id = "p1-q2"
text = "What is the main reason passengers give for choosing the night train?"
kind = "multiple-choice"
options = ["A", "B", "C", "D"]
answer = "B"

[[questions.items]]
id = "p1-q3"
text = "Operators share rolling stock to reduce ______."
kind = "gap-fill"
answer = ["costs", "cost"]
"#;
