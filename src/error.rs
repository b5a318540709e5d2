// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems. Raised while loading parameters or building a
/// vehicle, never from inside the per-tick loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no drive wheels configured (front_drive and rear_drive are both false)")]
    NoDriveWheels,

    #[error("engine torque curve is empty")]
    EmptyTorqueCurve,

    #[error("engine torque curve rpm values must strictly increase (entry {index})")]
    UnsortedTorqueCurve { index: usize },

    #[error("gearbox needs a reverse ratio and at least one forward ratio")]
    NoForwardGears,

    #[error("gear speed table covers {found} gears but the gearbox has {expected}")]
    GearTableMismatch { expected: usize, found: usize },

    #[error("`{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("`{field}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported parameter file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

pub(crate) fn ensure_range(
    field: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), ConfigError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}
