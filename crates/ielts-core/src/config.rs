//! Engine configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::band::{BandEstimator, BandTable};
use crate::session::SessionSettings;
use crate::timing::TimingPolicy;

pub const DEFAULT_REVIEW_TURNAROUND_HOURS: u32 = 48;

/// Top-level `ielts.toml` configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timing table overrides.
    #[serde(default)]
    pub timing: TimingPolicy,
    /// Band calibration.
    #[serde(default)]
    pub bands: BandTable,
    /// Turnaround advertised for writing and speaking results.
    #[serde(default = "default_turnaround")]
    pub review_turnaround_hours: u32,
    /// Where finished results are written.
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
}

fn default_turnaround() -> u32 {
    DEFAULT_REVIEW_TURNAROUND_HOURS
}

fn default_results_dir() -> String {
    "./ielts-results".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timing: TimingPolicy::default(),
            bands: BandTable::default(),
            review_turnaround_hours: default_turnaround(),
            results_dir: default_results_dir(),
        }
    }
}

impl EngineConfig {
    /// Validate and turn the configuration into controller settings.
    pub fn session_settings(&self) -> Result<SessionSettings> {
        self.timing.validate().context("invalid [timing] section")?;
        let bands = BandEstimator::new(self.bands.clone()).context("invalid [bands] section")?;
        Ok(SessionSettings {
            timing: self.timing.clone(),
            bands,
            review_turnaround_hours: self.review_turnaround_hours,
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// One left-to-right pass: substituted values are copied as-is and never
/// rescanned. An unterminated `${` is kept literally.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&std::env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Load config from an explicit path, or search the well-known paths.
///
/// Search order when `path` is `None`:
/// 1. `ielts.toml` in the current directory
/// 2. `~/.config/ielts/config.toml`
///
/// Environment variable override: `IELTS_REVIEW_TURNAROUND_HOURS`.
pub fn load_config_from(path: Option<&Path>) -> Result<EngineConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("ielts.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Ok(hours) = std::env::var("IELTS_REVIEW_TURNAROUND_HOURS") {
        config.review_turnaround_hours = hours
            .trim()
            .parse()
            .with_context(|| format!("invalid IELTS_REVIEW_TURNAROUND_HOURS: {hours}"))?;
    }

    Ok(config)
}

/// Parse a TOML string into an `EngineConfig`, resolving `${VAR}` references.
pub fn parse_config_str(content: &str) -> Result<EngineConfig> {
    let mut config: EngineConfig = toml::from_str(content)?;
    config.results_dir = resolve_env_vars(&config.results_dir);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("ielts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_IELTS_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_IELTS_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_IELTS_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_IELTS_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_rescan_values() {
        std::env::set_var("_IELTS_SELF_REF", "${_IELTS_SELF_REF}");
        assert_eq!(resolve_env_vars("${_IELTS_SELF_REF}"), "${_IELTS_SELF_REF}");
        assert_eq!(
            resolve_env_vars("a ${_IELTS_SELF_REF} b ${_IELTS_UNSET_VAR}c"),
            "a ${_IELTS_SELF_REF} b c"
        );
        std::env::remove_var("_IELTS_SELF_REF");
    }

    #[test]
    fn resolve_env_vars_keeps_unterminated_reference() {
        assert_eq!(resolve_env_vars("dir/${HOME"), "dir/${HOME");
        assert_eq!(resolve_env_vars("plain"), "plain");
    }

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.review_turnaround_hours, 48);
        assert_eq!(config.timing.reading.answering_secs, 3600);
        assert!(config.session_settings().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
review_turnaround_hours = 24
results_dir = "/tmp/results"

[timing]
answering_warning_percent = 5

[timing.listening]
answering_secs = 900
transfer_secs = 300

[bands]
floor = 0.0
steps = [
    { min_ratio = 0.9, band = 8.0 },
    { min_ratio = 0.5, band = 5.0 },
]
"#;
        let config = parse_config_str(toml_str).unwrap();
        assert_eq!(config.review_turnaround_hours, 24);
        assert_eq!(config.timing.listening.transfer_secs, Some(300));
        assert_eq!(config.timing.reading.answering_secs, 3600);
        assert_eq!(config.bands.steps.len(), 2);

        let settings = config.session_settings().unwrap();
        assert_eq!(settings.bands.band_for_ratio(0.95), 8.0);
        assert_eq!(settings.review_turnaround_hours, 24);
    }

    #[test]
    fn invalid_band_table_fails_settings() {
        let toml_str = r#"
[bands]
steps = [{ min_ratio = 1.5, band = 8.0 }]
"#;
        let config = parse_config_str(toml_str).unwrap();
        let err = config.session_settings().unwrap_err();
        assert!(format!("{err:#}").contains("invalid [bands] section"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/ielts.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
