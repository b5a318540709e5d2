// ==============================================================================
// upgrade.rs — PARTS / UPGRADE PATCHES
// ------------------------------------------------------------------------------
// An UpgradeSpec is a sparse patch over VehicleParameters. Every field is
// optional; scales multiply, deltas add, replacements overwrite.
//
// apply_upgrade() is pure: it takes the parameters by reference and returns a
// new validated record. Upgrades compose left to right with apply_upgrades().
// ==============================================================================

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::VehicleParameters;
use crate::dynamics::curve::TractionCurve;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeSpec {
    pub name: Option<String>,

    // engine
    pub torque_scale: Option<f32>,
    pub max_rpm_delta: Option<f32>,
    pub fuel_capacity_delta: Option<f32>,

    // body
    pub mass_delta: Option<f32>,
    pub drag_scale: Option<f32>,
    pub downforce_scale: Option<f32>,

    // chassis
    pub brake_scale: Option<f32>,
    pub stiffness_scale: Option<f32>,
    pub anti_roll_scale: Option<f32>,

    // tires
    pub grip_scale: Option<f32>,
    pub wear_rate_scale: Option<f32>,

    // driveline
    pub gear_ratios: Option<Vec<f32>>,
    pub final_drive: Option<f32>,
    pub rear_balance: Option<f32>,
    pub all_wheel_drive: Option<bool>,
}

fn scale_curve(curve: &mut TractionCurve, scale: f32) {
    curve.peak_force *= scale;
}

/// Returns `params` with `spec` applied, validated.
pub fn apply_upgrade(
    params: &VehicleParameters,
    spec: &UpgradeSpec,
) -> Result<VehicleParameters, ConfigError> {
    let mut out = params.clone();

    if let Some(scale) = spec.torque_scale {
        for point in &mut out.engine.torque_curve {
            point.torque *= scale;
        }
    }
    if let Some(delta) = spec.max_rpm_delta {
        out.engine.max_rpm += delta;
        out.drivetrain.shift_up_rpm = out.drivetrain.shift_up_rpm.min(out.engine.max_rpm);
    }
    if let Some(delta) = spec.fuel_capacity_delta {
        out.engine.fuel_capacity = (out.engine.fuel_capacity + delta).max(0.0);
    }

    if let Some(delta) = spec.mass_delta {
        out.mass += delta;
    }
    if let Some(scale) = spec.drag_scale {
        out.aero.drag_coefficient *= scale;
    }
    if let Some(scale) = spec.downforce_scale {
        out.aero.downforce_coefficient *= scale;
    }

    if let Some(scale) = spec.brake_scale {
        out.brakes.max_torque *= scale;
    }
    if let Some(scale) = spec.stiffness_scale {
        out.front_suspension.stiffness *= scale;
        out.rear_suspension.stiffness *= scale;
    }
    if let Some(scale) = spec.anti_roll_scale {
        out.front_suspension.anti_roll *= scale;
        out.rear_suspension.anti_roll *= scale;
    }

    if let Some(scale) = spec.grip_scale {
        scale_curve(&mut out.tires.longitudinal, scale);
        scale_curve(&mut out.tires.lateral, scale);
    }
    if let Some(scale) = spec.wear_rate_scale {
        for wheel in &mut out.wheels {
            wheel.wear_rate *= scale;
        }
    }

    if let Some(ratios) = &spec.gear_ratios {
        out.drivetrain.gear_ratios = ratios.clone();
    }
    if let Some(final_drive) = spec.final_drive {
        out.drivetrain.final_drive = final_drive;
    }
    match spec.all_wheel_drive {
        Some(true) => {
            out.drivetrain.front_drive = true;
            out.drivetrain.rear_drive = true;
        }
        // back to rear drive unless the car was front-drive only
        Some(false) if out.drivetrain.rear_drive => out.drivetrain.front_drive = false,
        _ => {}
    }
    if let Some(balance) = spec.rear_balance {
        out.drivetrain.rear_balance = balance;
    }

    out.validate()?;
    Ok(out)
}

/// Applies each upgrade in order.
pub fn apply_upgrades(
    params: &VehicleParameters,
    specs: &[UpgradeSpec],
) -> Result<VehicleParameters, ConfigError> {
    specs.iter().try_fold(params.clone(), |acc, spec| apply_upgrade(&acc, spec))
}

impl UpgradeSpec {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_upgrade_is_identity() {
        let base = VehicleParameters::sports_coupe();
        assert_eq!(apply_upgrade(&base, &UpgradeSpec::default()).unwrap(), base);
    }

    #[test]
    fn upgrade_does_not_touch_input() {
        let base = VehicleParameters::sports_coupe();
        let snapshot = base.clone();
        let spec = UpgradeSpec { torque_scale: Some(1.2), ..Default::default() };
        let tuned = apply_upgrade(&base, &spec).unwrap();
        assert_eq!(base, snapshot);
        assert_relative_eq!(tuned.engine.torque_at(3000.0), 360.0, epsilon = 1e-3);
    }

    #[test]
    fn upgrades_compose_in_order() {
        let base = VehicleParameters::sports_coupe();
        let specs = [
            UpgradeSpec { mass_delta: Some(-50.0), ..Default::default() },
            UpgradeSpec { brake_scale: Some(1.5), grip_scale: Some(1.1), ..Default::default() },
            UpgradeSpec { mass_delta: Some(-25.0), ..Default::default() },
        ];
        let out = apply_upgrades(&base, &specs).unwrap();
        assert_eq!(out.mass, 1175.0);
        assert_eq!(out.brakes.max_torque, 3750.0);
        assert_relative_eq!(out.tires.lateral.peak_force, 1.1, epsilon = 1e-6);
    }

    #[test]
    fn awd_conversion() {
        let base = VehicleParameters::sports_coupe();
        let spec = UpgradeSpec {
            all_wheel_drive: Some(true),
            rear_balance: Some(0.6),
            ..Default::default()
        };
        let out = apply_upgrade(&base, &spec).unwrap();
        assert!(out.drivetrain.front_drive && out.drivetrain.rear_drive);
        assert_eq!(out.drivetrain.rear_balance, 0.6);
    }

    #[test]
    fn invalid_result_is_rejected() {
        let base = VehicleParameters::sports_coupe();
        let spec = UpgradeSpec { gear_ratios: Some(vec![3.0]), ..Default::default() };
        assert!(matches!(apply_upgrade(&base, &spec), Err(ConfigError::NoForwardGears)));

        let spec = UpgradeSpec { mass_delta: Some(-5000.0), ..Default::default() };
        assert!(matches!(
            apply_upgrade(&base, &spec),
            Err(ConfigError::NonPositive { field: "mass", .. })
        ));
    }

    #[test]
    fn parses_sparse_toml() {
        let spec = UpgradeSpec::from_toml_str("name = \"stage 1\"\ntorque_scale = 1.15\n").unwrap();
        assert_eq!(spec.name.as_deref(), Some("stage 1"));
        assert_eq!(spec.torque_scale, Some(1.15));
        assert_eq!(spec.mass_delta, None);
    }
}
