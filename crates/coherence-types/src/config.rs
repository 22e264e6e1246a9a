// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Detector Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{CoherenceError, CoherenceResult};

/// Configuration for the upward-crossing event detector.
///
/// An event is an upward crossing of the order parameter through
/// `r_event` that holds for `t_hold` seconds while both guards pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Order-parameter threshold the trace must cross from below.
    pub r_event: f64,

    /// Required hold duration in seconds (converted to steps via dt).
    pub t_hold: f64,

    /// Guard: coupling at the crossing index must be >= this.
    pub k_min: f64,

    /// Guard: anchor fraction at the crossing index must be >= this.
    pub anchors_min: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            r_event: 0.8,
            t_hold: 0.5,
            k_min: 0.0,
            anchors_min: 0.0,
        }
    }
}

impl EventConfig {
    pub fn validate(&self) -> CoherenceResult<()> {
        if !(0.0..=1.0).contains(&self.r_event) {
            return Err(CoherenceError::Config(format!(
                "r_event must be in [0, 1], got {}",
                self.r_event
            )));
        }
        if self.t_hold <= 0.0 {
            return Err(CoherenceError::Config(format!(
                "t_hold must be > 0, got {}",
                self.t_hold
            )));
        }
        if !(0.0..=1.0).contains(&self.anchors_min) {
            return Err(CoherenceError::Config(format!(
                "anchors_min must be in [0, 1], got {}",
                self.anchors_min
            )));
        }
        Ok(())
    }
}

/// Configuration for the multi-gate verdict detector.
///
/// Five independent gates over the recorded series; the verdict is
/// their conjunction. The sovereignty gate is supplied by the caller
/// and never computed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Samples used for the coherence-rising slope estimate.
    pub trend_window: usize,

    /// Minimum positive slope of R over the trend window.
    pub min_r_slope: f64,

    /// Floor the last R sample must reach.
    pub r_floor: f64,

    /// Samples used for the gap-narrowing slope estimate.
    pub gap_window: usize,

    /// Maximum (negative) slope of |gap| over the gap window.
    pub max_gap_slope: f64,

    /// Trailing samples of the anchor-fraction series to average.
    pub anchor_window: usize,

    /// Minimum mean anchor fraction over the anchor window.
    pub min_anchor_fraction: f64,

    /// R level that counts toward a "birth" interval.
    pub birth_threshold: f64,

    /// Minimum length (steps) of a qualifying birth interval.
    pub birth_min_len: usize,

    /// Minimum number of births for the clustering gate.
    pub min_births: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            trend_window: 400,
            min_r_slope: 1e-4,
            r_floor: 0.6,
            gap_window: 400,
            max_gap_slope: -1e-4,
            anchor_window: 200,
            min_anchor_fraction: 0.5,
            birth_threshold: 0.75,
            birth_min_len: 25,
            min_births: 2,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> CoherenceResult<()> {
        if self.trend_window < 2 {
            return Err(CoherenceError::Config(format!(
                "trend_window must be >= 2, got {}",
                self.trend_window
            )));
        }
        if self.gap_window < 2 {
            return Err(CoherenceError::Config(format!(
                "gap_window must be >= 2, got {}",
                self.gap_window
            )));
        }
        if self.anchor_window < 1 {
            return Err(CoherenceError::Config(
                "anchor_window must be >= 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.r_floor) {
            return Err(CoherenceError::Config(format!(
                "r_floor must be in [0, 1], got {}",
                self.r_floor
            )));
        }
        if !(0.0..=1.0).contains(&self.birth_threshold) {
            return Err(CoherenceError::Config(format!(
                "birth_threshold must be in [0, 1], got {}",
                self.birth_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_anchor_fraction) {
            return Err(CoherenceError::Config(format!(
                "min_anchor_fraction must be in [0, 1], got {}",
                self.min_anchor_fraction
            )));
        }
        if self.min_r_slope <= 0.0 {
            return Err(CoherenceError::Config(format!(
                "min_r_slope must be > 0, got {}",
                self.min_r_slope
            )));
        }
        if self.max_gap_slope >= 0.0 {
            return Err(CoherenceError::Config(format!(
                "max_gap_slope must be < 0, got {}",
                self.max_gap_slope
            )));
        }
        if self.birth_min_len < 1 {
            return Err(CoherenceError::Config(
                "birth_min_len must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> CoherenceResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoherenceError::Config(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_config_default_valid() {
        assert!(EventConfig::default().validate().is_ok());
    }

    #[test]
    fn test_event_config_bad_threshold() {
        let cfg = EventConfig {
            r_event: 1.5,
            ..EventConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_event_config_zero_hold_rejected() {
        let cfg = EventConfig {
            t_hold: 0.0,
            ..EventConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_gate_config_default_valid() {
        assert!(GateConfig::default().validate().is_ok());
    }

    #[test]
    fn test_gate_config_positive_gap_slope_rejected() {
        let cfg = GateConfig {
            max_gap_slope: 0.01,
            ..GateConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_gate_config_from_json() {
        let json = r#"{
            "trend_window": 100, "min_r_slope": 0.001, "r_floor": 0.5,
            "gap_window": 100, "max_gap_slope": -0.001,
            "anchor_window": 50, "min_anchor_fraction": 0.4,
            "birth_threshold": 0.7, "birth_min_len": 10, "min_births": 2
        }"#;
        let cfg = GateConfig::from_json(json).unwrap();
        assert_eq!(cfg.trend_window, 100);
        assert!((cfg.birth_threshold - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_gate_config_bad_json_rejected() {
        assert!(GateConfig::from_json("{not json").is_err());
    }
}
