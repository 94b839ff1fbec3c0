//! The `ielts bands` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use ielts_core::band::BandEstimator;

/// Item count of a full reading or listening paper, used for the raw-score column.
const FULL_PAPER_ITEMS: f64 = 40.0;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = ielts_core::config::load_config_from(config_path.as_deref())?;
    let estimator = BandEstimator::new(config.bands).context("invalid [bands] section")?;

    let mut table = Table::new();
    table.set_header(vec!["Min ratio", "Raw /40", "Band"]);

    for step in estimator.steps() {
        let raw = (step.min_ratio * FULL_PAPER_ITEMS - 1e-9).ceil().max(0.0) as u32;
        table.add_row(vec![
            Cell::new(format!("{:.1}%", step.min_ratio * 100.0)),
            Cell::new(format!("{raw}+")),
            Cell::new(format!("{:.1}", step.band)),
        ]);
    }
    table.add_row(vec![
        Cell::new("below"),
        Cell::new("-"),
        Cell::new(format!("{:.1}", estimator.floor())),
    ]);

    println!("{table}");
    println!(
        "Writing and speaking results are reviewed externally (turnaround: {}h).",
        config.review_turnaround_hours
    );

    Ok(())
}
