//! Data-driven game balance
//!
//! Every cadence, step and size the sim uses. Defaults come from
//! [`crate::consts`]; a JSON document can override any subset of fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Why a tuning document was rejected
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tuning field `{field}` {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Balance numbers for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Countdown ===
    pub countdown_seconds: u8,
    pub countdown_period_ms: u32,

    // === Player ===
    pub player_step: f32,
    pub player_period_ms: u32,
    /// Movement stops once this close to a wall
    pub player_edge_margin: f32,

    // === Adversary ===
    pub fall_step: f32,
    pub fall_period_ms: u32,
    pub game_over_margin: f32,
    pub reposition_period_ms: u32,
    pub respawn_delay_ms: u32,

    // === Projectiles ===
    pub projectile_width: f32,
    pub projectile_height: f32,
    pub projectile_step: f32,
    pub projectile_period_ms: u32,
    pub projectile_spawn_gap: f32,
    pub projectile_exit_margin: f32,
    /// Live projectile cap (`None` = unlimited)
    pub max_projectiles: Option<usize>,

    // === Presentation ===
    /// Pixels per 60 Hz frame
    pub scroll_speed: f32,
    pub music_target_volume: f32,
    pub fade_duration_ms: u32,
    pub fade_step_ms: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            countdown_seconds: COUNTDOWN_SECONDS,
            countdown_period_ms: COUNTDOWN_PERIOD_MS,

            player_step: PLAYER_STEP,
            player_period_ms: PLAYER_PERIOD_MS,
            player_edge_margin: PLAYER_EDGE_MARGIN,

            fall_step: FALL_STEP,
            fall_period_ms: FALL_PERIOD_MS,
            game_over_margin: GAME_OVER_MARGIN,
            reposition_period_ms: REPOSITION_PERIOD_MS,
            respawn_delay_ms: RESPAWN_DELAY_MS,

            projectile_width: PROJECTILE_WIDTH,
            projectile_height: PROJECTILE_HEIGHT,
            projectile_step: PROJECTILE_STEP,
            projectile_period_ms: PROJECTILE_PERIOD_MS,
            projectile_spawn_gap: PROJECTILE_SPAWN_GAP,
            projectile_exit_margin: PROJECTILE_EXIT_MARGIN,
            max_projectiles: None,

            scroll_speed: SCROLL_SPEED,
            music_target_volume: MUSIC_TARGET_VOLUME,
            fade_duration_ms: FADE_DURATION_MS,
            fade_step_ms: FADE_STEP_MS,
        }
    }
}

impl Tuning {
    /// Parse and validate a (possibly partial) JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Parse `json`, falling back to defaults on any error
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::warn!("Using default tuning: {}", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        let periods = [
            ("countdown_period_ms", self.countdown_period_ms),
            ("player_period_ms", self.player_period_ms),
            ("fall_period_ms", self.fall_period_ms),
            ("reposition_period_ms", self.reposition_period_ms),
            ("projectile_period_ms", self.projectile_period_ms),
            ("fade_step_ms", self.fade_step_ms),
        ];
        for (field, period) in periods {
            if period == 0 {
                return Err(TuningError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }

        let sizes = [
            ("projectile_width", self.projectile_width),
            ("projectile_height", self.projectile_height),
            ("projectile_step", self.projectile_step),
            ("fall_step", self.fall_step),
        ];
        for (field, size) in sizes {
            if size.is_nan() || size <= 0.0 {
                return Err(TuningError::Invalid {
                    field,
                    reason: "must be a positive number",
                });
            }
        }

        if !(0.0..=1.0).contains(&self.music_target_volume) {
            return Err(TuningError::Invalid {
                field: "music_target_volume",
                reason: "must be within 0.0..=1.0",
            });
        }
        if self.scroll_speed < 0.0 {
            return Err(TuningError::Invalid {
                field: "scroll_speed",
                reason: "must not be negative",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let tuning = Tuning::from_json(r#"{ "fall_step": 9.0, "max_projectiles": 4 }"#).unwrap();
        assert_eq!(tuning.fall_step, 9.0);
        assert_eq!(tuning.max_projectiles, Some(4));
        assert_eq!(tuning.reposition_period_ms, REPOSITION_PERIOD_MS);
    }

    #[test]
    fn test_rejects_zero_period() {
        let err = Tuning::from_json(r#"{ "fall_period_ms": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::Invalid {
                field: "fall_period_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_volume() {
        let err = Tuning::from_json(r#"{ "music_target_volume": 1.5 }"#).unwrap_err();
        assert!(err.to_string().contains("music_target_volume"));
    }

    #[test]
    fn test_bad_json_falls_back() {
        assert!(matches!(
            Tuning::from_json("{ nope"),
            Err(TuningError::Parse(_))
        ));
        assert_eq!(Tuning::from_json_or_default("{ nope"), Tuning::default());
    }
}
