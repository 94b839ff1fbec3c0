//! Raw score to estimated band conversion.
//!
//! The calibration is a step table loaded from configuration. The default
//! follows the published 40-item academic reading conversion, expressed as
//! ratios so it applies to sets of any length.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MIN_BAND: f32 = 0.0;
pub const MAX_BAND: f32 = 9.0;

/// Ratios at or above `min_ratio` earn at least `band`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStep {
    pub min_ratio: f64,
    pub band: f32,
}

/// Calibration table for [`BandEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    pub steps: Vec<BandStep>,
    /// Band for ratios below every step.
    #[serde(default)]
    pub floor: f32,
}

impl Default for BandTable {
    fn default() -> Self {
        let steps = [
            (0.975, 9.0),
            (0.925, 8.5),
            (0.875, 8.0),
            (0.825, 7.5),
            (0.75, 7.0),
            (0.675, 6.5),
            (0.575, 6.0),
            (0.475, 5.5),
            (0.375, 5.0),
            (0.325, 4.5),
            (0.25, 4.0),
            (0.2, 3.5),
            (0.15, 3.0),
            (0.1, 2.5),
            (0.05, 2.0),
        ]
        .into_iter()
        .map(|(min_ratio, band)| BandStep { min_ratio, band })
        .collect();

        Self { steps, floor: 1.0 }
    }
}

fn is_valid_band(band: f32) -> bool {
    (MIN_BAND..=MAX_BAND).contains(&band) && (band * 2.0).fract() == 0.0
}

impl BandTable {
    /// Check ranges and monotonicity. Steps may be listed in any order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_band(self.floor) {
            return Err(ConfigError::InvalidBand(self.floor));
        }
        for step in &self.steps {
            if !(0.0..=1.0).contains(&step.min_ratio) {
                return Err(ConfigError::RatioOutOfRange(step.min_ratio));
            }
            if !is_valid_band(step.band) {
                return Err(ConfigError::InvalidBand(step.band));
            }
        }

        let mut ascending = self.steps.clone();
        ascending.sort_by(|a, b| a.min_ratio.total_cmp(&b.min_ratio));

        if let Some(lowest) = ascending.first() {
            if lowest.band < self.floor {
                return Err(ConfigError::NotMonotonic {
                    ratio: lowest.min_ratio,
                });
            }
        }
        for pair in ascending.windows(2) {
            if pair[1].band < pair[0].band {
                return Err(ConfigError::NotMonotonic {
                    ratio: pair[1].min_ratio,
                });
            }
        }
        Ok(())
    }
}

/// Maps `score / total_possible` to an estimated band.
#[derive(Debug, Clone)]
pub struct BandEstimator {
    /// Sorted by `min_ratio`, highest first.
    steps: Vec<BandStep>,
    floor: f32,
}

impl Default for BandEstimator {
    fn default() -> Self {
        Self::from_valid(BandTable::default())
    }
}

impl BandEstimator {
    pub fn new(table: BandTable) -> Result<Self, ConfigError> {
        table.validate()?;
        Ok(Self::from_valid(table))
    }

    fn from_valid(table: BandTable) -> Self {
        let mut steps = table.steps;
        steps.sort_by(|a, b| b.min_ratio.total_cmp(&a.min_ratio));
        Self {
            steps,
            floor: table.floor,
        }
    }

    /// Estimated band, or `None` when there is nothing to grade.
    pub fn estimate(&self, score: u32, total_possible: u32) -> Option<f32> {
        if total_possible == 0 {
            return None;
        }
        let ratio = f64::from(score.min(total_possible)) / f64::from(total_possible);
        Some(self.band_for_ratio(ratio))
    }

    pub fn band_for_ratio(&self, ratio: f64) -> f32 {
        let ratio = ratio.clamp(0.0, 1.0);
        self.steps
            .iter()
            .find(|step| ratio >= step.min_ratio)
            .map(|step| step.band)
            .unwrap_or(self.floor)
            .clamp(MIN_BAND, MAX_BAND)
    }

    /// Steps from highest ratio to lowest, for display.
    pub fn steps(&self) -> &[BandStep] {
        &self.steps
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        assert!(BandTable::default().validate().is_ok());
    }

    #[test]
    fn known_points_on_default_table() {
        let estimator = BandEstimator::default();
        assert_eq!(estimator.estimate(40, 40), Some(9.0));
        assert_eq!(estimator.estimate(6, 10), Some(6.0));
        assert_eq!(estimator.estimate(30, 40), Some(7.0));
        assert_eq!(estimator.estimate(0, 10), Some(1.0));
        assert_eq!(estimator.estimate(0, 0), None);
    }

    #[test]
    fn band_never_decreases_as_score_rises() {
        let estimator = BandEstimator::default();
        for total in [1u32, 7, 10, 13, 40] {
            let mut previous = MIN_BAND;
            for score in 0..=total {
                let band = estimator.estimate(score, total).unwrap();
                assert!(
                    band >= previous,
                    "band fell from {previous} to {band} at {score}/{total}"
                );
                assert!((MIN_BAND..=MAX_BAND).contains(&band));
                previous = band;
            }
        }
    }

    #[test]
    fn out_of_range_ratio_is_clamped() {
        let estimator = BandEstimator::default();
        assert_eq!(estimator.band_for_ratio(1.7), 9.0);
        assert_eq!(estimator.band_for_ratio(-0.5), 1.0);
    }

    #[test]
    fn rejects_decreasing_table() {
        let table = BandTable {
            steps: vec![
                BandStep {
                    min_ratio: 0.5,
                    band: 6.0,
                },
                BandStep {
                    min_ratio: 0.8,
                    band: 5.0,
                },
            ],
            floor: 0.0,
        };
        assert_eq!(
            BandEstimator::new(table).unwrap_err(),
            ConfigError::NotMonotonic { ratio: 0.8 }
        );
    }

    #[test]
    fn rejects_off_scale_band() {
        let table = BandTable {
            steps: vec![BandStep {
                min_ratio: 0.5,
                band: 6.3,
            }],
            floor: 0.0,
        };
        assert_eq!(
            BandEstimator::new(table).unwrap_err(),
            ConfigError::InvalidBand(6.3)
        );
    }

    #[test]
    fn unsorted_table_is_accepted() {
        let table = BandTable {
            steps: vec![
                BandStep {
                    min_ratio: 0.5,
                    band: 5.0,
                },
                BandStep {
                    min_ratio: 0.9,
                    band: 8.0,
                },
            ],
            floor: 2.0,
        };
        let estimator = BandEstimator::new(table).unwrap();
        assert_eq!(estimator.band_for_ratio(0.95), 8.0);
        assert_eq!(estimator.band_for_ratio(0.6), 5.0);
        assert_eq!(estimator.band_for_ratio(0.1), 2.0);
    }
}
