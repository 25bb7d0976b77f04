//! JSON configuration for the pipeline.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use tictac_actuator::CalibrationTable;
use tictac_board::{Player, TrackerParams};
use tictac_vision::{ClassifierParams, LocatorParams};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Runtime options. Unknown keys are rejected; missing keys take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Actuator endpoint receiving `{"servo1", "servo2", "servo3"}`.
    pub endpoint: String,
    pub frame_interval_ms: u64,
    /// Minimum classifier confidence, shared by the classifier and tracker.
    pub confidence_threshold: f32,
    pub debounce_window: usize,
    pub debounce_min_agree: usize,
    pub send_timeout_ms: u64,
    /// Player the robot plays.
    pub robot_player: Player,
    /// Player who opens each game.
    pub first_player: Player,
    pub calibration: CalibrationTable,
    pub locator: LocatorParams,
    /// `min_confidence` here is replaced by `confidence_threshold`.
    pub classifier: ClassifierParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://esp32.local/move".to_string(),
            frame_interval_ms: 2000,
            confidence_threshold: 0.6,
            debounce_window: 3,
            debounce_min_agree: 2,
            send_timeout_ms: 1500,
            robot_player: Player::O,
            first_player: Player::X,
            calibration: CalibrationTable::default(),
            locator: LocatorParams::default(),
            classifier: ClassifierParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return invalid(format!("endpoint {:?} must be an http(s) URL", self.endpoint));
        }
        if self.frame_interval_ms == 0 {
            return invalid("frame_interval_ms must be positive".into());
        }
        if self.send_timeout_ms == 0 {
            return invalid("send_timeout_ms must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid(format!(
                "confidence_threshold {} is outside [0, 1]",
                self.confidence_threshold
            ));
        }
        if self.debounce_window == 0 {
            return invalid("debounce_window must be at least 1".into());
        }
        if self.debounce_min_agree == 0 || self.debounce_min_agree > self.debounce_window {
            return invalid(format!(
                "debounce_min_agree {} must be in 1..={}",
                self.debounce_min_agree, self.debounce_window
            ));
        }

        let loc = &self.locator;
        if loc.px_per_cell < 8 {
            return invalid(format!("locator.px_per_cell {} is below 8", loc.px_per_cell));
        }
        for (name, v) in [
            ("locator.min_board_frac", loc.min_board_frac),
            ("locator.min_aspect", loc.min_aspect),
            ("locator.ambiguity_ratio", loc.ambiguity_ratio),
        ] {
            if !(v > 0.0 && v <= 1.0) {
                return invalid(format!("{name} {v} is outside (0, 1]"));
            }
        }
        if !(0.0..=255.0).contains(&loc.min_line_contrast) {
            return invalid(format!(
                "locator.min_line_contrast {} is outside [0, 255]",
                loc.min_line_contrast
            ));
        }
        if !(loc.center_tie_px.is_finite() && loc.center_tie_px >= 0.0) {
            return invalid(format!(
                "locator.center_tie_px {} must be a non-negative distance",
                loc.center_tie_px
            ));
        }

        let clf = &self.classifier;
        if !(0.0..0.5).contains(&clf.inset_frac) {
            return invalid(format!("classifier.inset_frac {} is outside [0, 0.5)", clf.inset_frac));
        }
        if !(clf.stroke_half_width > 0.0 && clf.stroke_half_width < 0.5) {
            return invalid(format!(
                "classifier.stroke_half_width {} is outside (0, 0.5)",
                clf.stroke_half_width
            ));
        }
        if !(clf.empty_ink_max > 0.0 && clf.empty_ink_max <= 1.0) {
            return invalid(format!(
                "classifier.empty_ink_max {} is outside (0, 1]",
                clf.empty_ink_max
            ));
        }
        if !(clf.ring_inner >= 0.0 && clf.ring_outer <= 0.5) {
            return invalid(format!(
                "classifier ring [{}, {}] must lie within [0, 0.5]",
                clf.ring_inner, clf.ring_outer
            ));
        }
        if clf.ring_inner >= clf.ring_outer {
            return invalid("classifier.ring_inner must be below ring_outer".into());
        }
        Ok(())
    }

    pub fn tracker_params(&self) -> TrackerParams {
        TrackerParams {
            confidence_threshold: self.confidence_threshold,
            debounce_window: self.debounce_window,
            debounce_min_agree: self.debounce_min_agree,
        }
    }

    pub fn classifier_params(&self) -> ClassifierParams {
        ClassifierParams {
            min_confidence: self.confidence_threshold,
            ..self.classifier.clone()
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.frame_interval(), Duration::from_secs(2));
        assert_eq!(cfg.tracker_params(), TrackerParams::default());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tictac.json");
        let cfg = PipelineConfig {
            robot_player: Player::X,
            first_player: Player::O,
            debounce_window: 5,
            debounce_min_agree: 3,
            ..PipelineConfig::default()
        };
        cfg.write_json(&path).unwrap();
        assert_eq!(PipelineConfig::load_json(&path).unwrap(), cfg);
        assert!(matches!(
            PipelineConfig::load_json(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = PipelineConfig::from_json_str(
            r#"{"endpoint": "http://10.0.0.7/move", "confidence_threshold": 0.75}"#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint, "http://10.0.0.7/move");
        assert_eq!(cfg.classifier_params().min_confidence, 0.75);
        assert_eq!(cfg.tracker_params().confidence_threshold, 0.75);
        assert_eq!(cfg.debounce_window, 3);
        assert_eq!(cfg.robot_player, Player::O);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = PipelineConfig::from_json_str(r#"{"frame_rate": 30}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        let err = PipelineConfig::from_json_str(r#"{"locator": {"bogus": 1}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn invalid_values_rejected() {
        for raw in [
            r#"{"frame_interval_ms": 0}"#,
            r#"{"confidence_threshold": 1.5}"#,
            r#"{"debounce_window": 0}"#,
            r#"{"debounce_window": 3, "debounce_min_agree": 4}"#,
            r#"{"endpoint": "esp32.local/move"}"#,
            r#"{"locator": {"px_per_cell": 2}}"#,
            r#"{"locator": {"min_line_contrast": 300.0}}"#,
            r#"{"locator": {"min_line_contrast": -1.0}}"#,
            r#"{"locator": {"center_tie_px": -2.0}}"#,
            r#"{"classifier": {"empty_ink_max": 0.0}}"#,
            r#"{"classifier": {"empty_ink_max": 1.5}}"#,
            r#"{"classifier": {"stroke_half_width": 0.0}}"#,
            r#"{"classifier": {"stroke_half_width": 0.6}}"#,
            r#"{"classifier": {"ring_inner": -0.1}}"#,
            r#"{"classifier": {"ring_outer": 0.8}}"#,
            r#"{"classifier": {"ring_inner": 0.3, "ring_outer": 0.25}}"#,
        ] {
            let err = PipelineConfig::from_json_str(raw).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn out_of_range_calibration_rejected() {
        let mut cells = vec![r#"{"servo1":90,"servo2":90,"servo3":90}"#; 9];
        cells[3] = r#"{"servo1":90,"servo2":190,"servo3":90}"#;
        let raw = format!(r#"{{"calibration": [{}]}}"#, cells.join(","));
        let err = PipelineConfig::from_json_str(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
