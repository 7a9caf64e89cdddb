//! # Units Module
//!
//! Pure conversion layer between physical SI quantities (km/h, meters, kWh,
//! kW, km) and simulation units (cell, step). Every other component that
//! needs to turn a step count into minutes, or a battery level into a
//! recharge duration, goes through a [`Units`] instance rather than
//! hand-rolling the arithmetic.
use std::fmt;

/// Errors constructing a [`Units`] value from out-of-range physical inputs.
#[derive(Debug)]
pub enum UnitsError {
    NonPositive { field: &'static str, value: f64 },
}

impl fmt::Display for UnitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitsError::NonPositive { field, value } => {
                write!(f, "{} must be positive, got {}", field, value)
            }
        }
    }
}

impl std::error::Error for UnitsError {}

/// Derived conversions between physical units and simulation units.
///
/// All conversions return floating-point; callers that need integer step
/// counts truncate toward zero themselves.
///
/// # Example
/// ```rust
/// use ev_grid_sim::units::Units;
///
/// let units = Units::new(50.0, 4.5, 2.0, 50.0, 22.0, 135.0).unwrap();
/// assert!(units.autonomy_cells() > 0.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Units {
    speed_kmh: f64,
    cell_length_m: f64,
    sim_speed_cells_per_step: f64,
    battery_kwh: f64,
    cs_power_kw: f64,
    autonomy_km: f64,
    // Derived, cached at construction time.
    step_to_s: f64,
    autonomy_cells: f64,
    steps_per_recharge_cell: f64,
}

impl Units {
    /// Builds a `Units` value, validating that every physical input is
    /// strictly positive.
    pub fn new(
        speed_kmh: f64,
        cell_length_m: f64,
        sim_speed_cells_per_step: f64,
        battery_kwh: f64,
        cs_power_kw: f64,
        autonomy_km: f64,
    ) -> Result<Self, UnitsError> {
        for (field, value) in [
            ("speed_kmh", speed_kmh),
            ("cell_length_m", cell_length_m),
            ("sim_speed_cells_per_step", sim_speed_cells_per_step),
            ("battery_kwh", battery_kwh),
            ("cs_power_kw", cs_power_kw),
            ("autonomy_km", autonomy_km),
        ] {
            if value <= 0.0 {
                return Err(UnitsError::NonPositive { field, value });
            }
        }

        // step_to_s = (cell_length_m * sim_speed) / (speed_kmh * 1000/3600)
        let speed_m_per_s = speed_kmh * 1000.0 / 3600.0;
        let step_to_s = (cell_length_m * sim_speed_cells_per_step) / speed_m_per_s;

        // autonomy_cells = (autonomy_km*1000) / cell_length_m
        let autonomy_cells = (autonomy_km * 1000.0) / cell_length_m;

        // steps_per_recharge_cell = ((battery_j / cs_power_w) / step_to_s) / autonomy_cells
        let battery_j = battery_kwh * 3_600_000.0;
        let cs_power_w = cs_power_kw * 1000.0;
        let steps_per_recharge_cell = ((battery_j / cs_power_w) / step_to_s) / autonomy_cells;

        Ok(Units {
            speed_kmh,
            cell_length_m,
            sim_speed_cells_per_step,
            battery_kwh,
            cs_power_kw,
            autonomy_km,
            step_to_s,
            autonomy_cells,
            steps_per_recharge_cell,
        })
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn cell_length_m(&self) -> f64 {
        self.cell_length_m
    }

    /// Seconds of wall-clock time represented by one simulation step.
    pub fn step_to_s(&self) -> f64 {
        self.step_to_s
    }

    /// Number of cells a fully charged EV can traverse.
    pub fn autonomy_cells(&self) -> f64 {
        self.autonomy_cells
    }

    /// Converts a duration in minutes to a (fractional) number of steps.
    pub fn minutes_to_steps(&self, minutes: f64) -> f64 {
        (minutes * 60.0) / self.step_to_s
    }

    /// Converts a step count to a duration in minutes.
    pub fn steps_to_minutes(&self, steps: f64) -> f64 {
        steps * self.step_to_s / 60.0
    }

    /// Converts a simulation velocity (cells/step) to km/h.
    pub fn sim_speed_to_kmh(&self, cells_per_step: f64) -> f64 {
        let meters_per_s = (cells_per_step * self.cell_length_m) / self.step_to_s;
        meters_per_s * 3.6
    }

    /// Number of simulation steps required to recharge `cells` worth of
    /// autonomy, linear in the amount demanded (no nonlinear charging curve).
    pub fn steps_to_recharge(&self, cells: f64) -> f64 {
        cells * self.steps_per_recharge_cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_units() -> Units {
        Units::new(50.0, 4.5, 2.0, 50.0, 22.0, 135.0).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        let err = Units::new(0.0, 4.5, 2.0, 50.0, 22.0, 135.0).unwrap_err();
        match err {
            UnitsError::NonPositive { field, .. } => assert_eq!(field, "speed_kmh"),
        }
    }

    #[test]
    fn test_autonomy_cells_positive() {
        let units = sample_units();
        assert!(units.autonomy_cells() > 0.0);
    }

    #[test]
    fn test_minutes_steps_roundtrip() {
        let units = sample_units();
        let steps = units.minutes_to_steps(30.0);
        let minutes = units.steps_to_minutes(steps);
        assert!((minutes - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_recharge_steps_scale_linearly() {
        let units = sample_units();
        let one = units.steps_to_recharge(1.0);
        let ten = units.steps_to_recharge(10.0);
        assert!((ten - one * 10.0).abs() < 1e-6);
    }
}
