// ==============================================================================
// telemetry.rs — NAMED SCALAR EXPORT (SIM -> UI / CLIENT)
// ------------------------------------------------------------------------------
// MetricsExport is the read-only window the HUD, effects and debug graphs use.
// Every implementor returns a flat list of (name, value) pairs on demand.
// Per-wheel names are prefixed with the wheel id, e.g. "RL.slip_ratio".
//
// This file only reads simulation state and should not contain physics side
// effects.
// ==============================================================================

use serde::Serialize;

use crate::dynamics::wheel::WheelState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: f32,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self { name: name.into(), value }
    }
}

pub trait MetricsExport {
    fn metrics(&self) -> Vec<Metric>;

    fn metric(&self, name: &str) -> Option<f32> {
        self.metrics().into_iter().find(|m| m.name == name).map(|m| m.value)
    }
}

impl MetricsExport for WheelState {
    fn metrics(&self) -> Vec<Metric> {
        let id = self.id.as_str();
        vec![
            Metric::new(format!("{id}.slip_ratio"), self.slip_ratio),
            Metric::new(format!("{id}.slip_angle"), self.slip_angle.to_degrees()),
            Metric::new(format!("{id}.skid"), self.skid),
            Metric::new(format!("{id}.wear"), self.wear),
            Metric::new(format!("{id}.travel"), self.travel_fraction()),
            Metric::new(format!("{id}.load"), self.load()),
            Metric::new(format!("{id}.angular_speed"), self.angular_speed),
            Metric::new(format!("{id}.grip_x"), self.grip_direction.x),
            Metric::new(format!("{id}.grip_z"), self.grip_direction.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::types::WheelId;

    #[test]
    fn wheel_metrics_are_prefixed() {
        let mut wheel = WheelState::new(WheelId::RR, 0.2);
        wheel.travel = 0.1;
        wheel.wear = 0.25;
        assert_eq!(wheel.metric("RR.travel"), Some(0.5));
        assert_eq!(wheel.metric("RR.wear"), Some(0.25));
        assert_eq!(wheel.metric("FL.wear"), None);
    }
}
