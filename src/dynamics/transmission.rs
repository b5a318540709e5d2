// ==============================================================================
// transmission.rs — AUTOMATIC GEARBOX STATE MACHINE
// ------------------------------------------------------------------------------
// States:
//   Stable { gear }                     engine connected
//   Changing { from, to, remaining }    engine disconnected for shift_duration
//
// From Stable (forward gears only, at least one wheel on the ground):
//   v > upshift[g]  and g+1 exists                      -> Changing(g, g+1)
//   v < downshift[g], g > 1, rpm after shift <= max     -> Changing(g, g-1)
// Changing counts down and commits the target gear when the timer expires.
// Reverse (gear 0) is only left through request_gear().
// ==============================================================================

use log::debug;

use crate::config::GearSpeedTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GearState {
    Stable { gear: usize },
    Changing { from: usize, to: usize, remaining: f32 },
}

impl GearState {
    /// Gear whose ratio is currently engaged (the old one while shifting).
    pub fn gear(&self) -> usize {
        match *self {
            GearState::Stable { gear } => gear,
            GearState::Changing { from, .. } => from,
        }
    }

    pub fn is_changing(&self) -> bool {
        matches!(self, GearState::Changing { .. })
    }

    pub fn target(&self) -> Option<usize> {
        match *self {
            GearState::Stable { .. } => None,
            GearState::Changing { to, .. } => Some(to),
        }
    }
}

/// What the gearbox sees each tick.
#[derive(Debug, Clone, Copy)]
pub struct ShiftInputs {
    pub forward_speed: f32, // m/s, chassis-local +Z
    pub rpm: f32,
    pub any_contact: bool,
    pub dt: f32,
}

#[derive(Debug, Clone)]
pub struct Transmission {
    pub state: GearState,
    ratios: Vec<f32>,
    max_rpm: f32,
    shift_duration: f32,
}

impl Transmission {
    pub fn new(ratios: Vec<f32>, max_rpm: f32, shift_duration: f32) -> Self {
        Self {
            state: GearState::Stable { gear: 1.min(ratios.len().saturating_sub(1)) },
            ratios,
            max_rpm,
            shift_duration,
        }
    }

    pub fn gear(&self) -> usize {
        self.state.gear()
    }

    pub fn ratio(&self) -> f32 {
        self.ratios.get(self.gear()).copied().unwrap_or(0.0)
    }

    pub fn is_reverse(&self) -> bool {
        self.gear() == 0
    }

    /// Manual selection. Cancels any shift in progress.
    pub fn request_gear(&mut self, gear: usize) -> bool {
        if gear >= self.ratios.len() {
            return false;
        }
        self.state = GearState::Stable { gear };
        true
    }

    pub fn update(&mut self, table: &GearSpeedTable, inputs: ShiftInputs) {
        self.state = match self.state {
            GearState::Changing { from, to, remaining } => {
                let remaining = remaining - inputs.dt;
                if remaining > 0.0 {
                    GearState::Changing { from, to, remaining }
                } else {
                    debug!("gear {from} -> {to} engaged");
                    GearState::Stable { gear: to }
                }
            }
            GearState::Stable { gear } => match self.next_gear(gear, table, &inputs) {
                Some(to) => {
                    debug!(
                        "shifting {gear} -> {to} at {:.1} m/s, {:.0} rpm",
                        inputs.forward_speed, inputs.rpm
                    );
                    GearState::Changing { from: gear, to, remaining: self.shift_duration }
                }
                None => GearState::Stable { gear },
            },
        };
    }

    fn next_gear(
        &self,
        gear: usize,
        table: &GearSpeedTable,
        inputs: &ShiftInputs,
    ) -> Option<usize> {
        if !inputs.any_contact || gear == 0 {
            return None;
        }

        let v = inputs.forward_speed;
        if v > table.upshift_speed(gear) && gear + 1 < self.ratios.len() {
            return Some(gear + 1);
        }

        if gear > 1 && v < table.downshift_speed(gear) {
            let rpm_after = inputs.rpm / self.ratios[gear] * self.ratios[gear - 1];
            if rpm_after <= self.max_rpm {
                return Some(gear - 1);
            }
        }
        None
    }
}
