//! Weights for the prioritizer's risk score.
//!
//! The score is a weighted sum of three signals, each normalized to
//! `[0.0, 1.0]`: recency (file touched in the working tree), density
//! (high/critical findings recorded last run) and size. Weights are plain
//! configuration; they are validated and normalized to sum to 1.0.

use serde::{Deserialize, Serialize};

/// Prioritizer weights configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Weight for working-tree recency (0.0-1.0)
    #[serde(default = "default_recency_weight")]
    pub recency: f64,

    /// Weight for historical high/critical finding density (0.0-1.0)
    #[serde(default = "default_density_weight")]
    pub density: f64,

    /// Weight for the file size proxy (0.0-1.0)
    #[serde(default = "default_size_weight")]
    pub size: f64,

    /// Severe findings at which the density signal saturates
    #[serde(default = "default_density_saturation")]
    pub density_saturation: usize,

    /// File size in bytes at which the size signal saturates
    #[serde(default = "default_size_saturation_bytes")]
    pub size_saturation_bytes: u64,
}

pub fn default_recency_weight() -> f64 {
    0.6
}

pub fn default_density_weight() -> f64 {
    0.25
}

pub fn default_size_weight() -> f64 {
    0.15
}

pub fn default_density_saturation() -> usize {
    5
}

pub fn default_size_saturation_bytes() -> u64 {
    64 * 1024
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            recency: default_recency_weight(),
            density: default_density_weight(),
            size: default_size_weight(),
            density_saturation: default_density_saturation(),
            size_saturation_bytes: default_size_saturation_bytes(),
        }
    }
}

impl PriorityWeights {
    // Pure function: Check if a weight is in valid range
    pub fn is_valid_weight(weight: f64) -> bool {
        (0.0..=1.0).contains(&weight)
    }

    // Pure function: Validate a single weight with name
    pub fn validate_weight(weight: f64, name: &str) -> Result<(), String> {
        if Self::is_valid_weight(weight) {
            Ok(())
        } else {
            Err(format!("{} weight must be between 0.0 and 1.0", name))
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        Self::validate_weight(self.recency, "Recency")?;
        Self::validate_weight(self.density, "Density")?;
        Self::validate_weight(self.size, "Size")?;

        if self.recency + self.density + self.size <= 0.0 {
            return Err("At least one priority weight must be positive".to_string());
        }
        if self.density_saturation == 0 {
            return Err("density_saturation must be at least 1".to_string());
        }
        if self.size_saturation_bytes == 0 {
            return Err("size_saturation_bytes must be at least 1".to_string());
        }
        Ok(())
    }

    /// Normalize weights to ensure they sum to 1.0
    pub fn normalize(&mut self) {
        let sum = self.recency + self.density + self.size;
        if sum > 0.0 && (sum - 1.0).abs() > 0.001 {
            self.recency /= sum;
            self.density /= sum;
            self.size /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid_and_normalized() {
        let weights = PriorityWeights::default();
        assert!(weights.validate().is_ok());
        let sum = weights.recency + weights.density + weights.size;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_weight_rejected() {
        let weights = PriorityWeights {
            size: 1.5,
            ..PriorityWeights::default()
        };
        assert_eq!(
            weights.validate().unwrap_err(),
            "Size weight must be between 0.0 and 1.0"
        );
    }

    #[test]
    fn test_normalize_rescales() {
        let mut weights = PriorityWeights {
            recency: 1.0,
            density: 0.5,
            size: 0.5,
            ..PriorityWeights::default()
        };
        weights.normalize();
        assert!((weights.recency - 0.5).abs() < 1e-9);
        assert!((weights.density - 0.25).abs() < 1e-9);
    }
}
