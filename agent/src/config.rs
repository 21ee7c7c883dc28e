//! Agent configuration loaded from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
};

use platformer_agent_system_composer::ComposerConfig;
use platformer_agent_system_jump::JumpTuning;
use platformer_agent_system_perception::PerceptionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deepest gap band accepted by [`AgentConfig::validate`].
pub const MAX_GAP_BAND_DEPTH: u32 = 8;

/// Decision pipeline driven by the agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Threat, wall, staircase and gap handling with the drift limiter.
    #[default]
    Full,
    /// Two fixed-duration rules (nearby enemy, wall in front) while always
    /// heading right.
    Classic,
}

/// Complete agent configuration. Missing sections fall back to defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Pipeline to run.
    pub variant: Variant,
    /// Feature extraction tunables.
    pub perception: PerceptionConfig,
    /// Jump initiation tunables.
    pub jump: JumpTuning,
    /// Action composition tunables.
    pub composer: ComposerConfig,
}

/// Errors raised while loading an [`AgentConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read agent config at {}", .path.display())]
    Io {
        /// Location that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The contents were not valid TOML for the configuration schema.
    #[error("failed to parse agent config")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but cannot drive the pipeline.
    #[error("invalid agent config: `{field}` {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What the field must satisfy.
        reason: &'static str,
    },
}

impl AgentConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Rejects tunings the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let perception = &self.perception;
        positive("perception.engagement_half_width", perception.engagement_half_width)?;
        positive("perception.engagement_half_height", perception.engagement_half_height)?;
        if perception.gap_band_depth > MAX_GAP_BAND_DEPTH {
            return Err(invalid("perception.gap_band_depth", "must be at most 8"));
        }

        let jump = &self.jump;
        non_negative("jump.threat_level_band", jump.threat_level_band)?;
        non_negative("jump.threat_close_range", jump.threat_close_range)?;
        non_negative("jump.threat_medium_below", jump.threat_medium_below)?;
        let durations = [
            ("jump.threat_short_duration", jump.threat_short_duration),
            ("jump.threat_medium_duration", jump.threat_medium_duration),
            ("jump.threat_high_duration", jump.threat_high_duration),
            ("jump.wall_short_duration", jump.wall_short_duration),
            ("jump.gap_duration", jump.gap_duration),
            ("jump.classic_threat_duration", jump.classic_threat_duration),
            ("jump.classic_wall_duration", jump.classic_wall_duration),
        ];
        for (field, ticks) in durations {
            if ticks == 0 {
                return Err(invalid(field, "must hold the jump for at least one tick"));
            }
        }

        if self.composer.drift_cap == 0 {
            return Err(invalid("composer.drift_cap", "must be at least one tick"));
        }
        Ok(())
    }
}

const fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive finite number"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a non-negative finite number"))
    }
}
