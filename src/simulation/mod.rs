//! # Simulation Module
//!
//! **Top-level orchestration module** – builds the city, places stations,
//! and runs independent repetitions of the stepping engine, collecting a
//! [`crate::metrics::Report`] for each.
//!
//! Grounded on `aplication/simulation.py`'s `Simulation`: `create_city` +
//! `stations_placement` happen once at setup ([`Simulation::new`]);
//! `create_vehicles` + the `run_simulation` tick loop happen once per
//! repetition ([`Simulation::run_repetition`]), each starting from a fresh
//! clone of the setup-time grid and station templates so repetitions never
//! share mutable state, per the concurrency model every repetition is
//! dispatched under.
use crate::city::{CityBuilder, PlacementError};
use crate::config::SimulationConfig;
use crate::engine::Engine;
use crate::grid::road_network::Grid;
use crate::grid::zones::CellType;
use crate::metrics::{Recorder, Report, RunAttributes};
use crate::station::{self, StationPlacement};
use crate::units::{Units, UnitsError};
use std::fmt;

/// Setup-time errors: unit conversion or station/city placement failed
/// before any tick could run.
#[derive(Debug)]
pub enum SimulationError {
    Units(UnitsError),
    Placement(PlacementError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Units(e) => write!(f, "{}", e),
            SimulationError::Placement(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SimulationError {}

impl From<UnitsError> for SimulationError {
    fn from(e: UnitsError) -> Self {
        SimulationError::Units(e)
    }
}

impl From<PlacementError> for SimulationError {
    fn from(e: PlacementError) -> Self {
        SimulationError::Placement(e)
    }
}

/// One frozen configuration, ready to run any number of independent
/// repetitions against the same city and station layout.
///
/// # Example
/// ```rust
/// use ev_grid_sim::config::SimulationConfig;
/// use ev_grid_sim::simulation::Simulation;
///
/// let config = SimulationConfig::builder()
///     .roundabout_side(4)
///     .avenue_length(2)
///     .scale(1)
///     .ev_density(0.0)
///     .tf_density(0.0)
///     .total_time_h(0.01)
///     .build()
///     .unwrap();
///
/// let simulation = Simulation::new(config).unwrap();
/// let report = simulation.run_repetition(1);
/// assert_eq!(report.attributes.total_vehicles, 0);
/// ```
pub struct Simulation {
    config: SimulationConfig,
    units: Units,
    grid_template: Grid,
    stations_template: StationPlacement,
    total_ticks: u32,
    measure_period_ticks: u32,
    total_vehicles: u32,
    total_ev: u32,
}

impl Simulation {
    /// Builds the city, places its stations, and derives the fixed-size
    /// vehicle population once. Every subsequent [`Self::run_repetition`]
    /// call reuses this setup, cloning it into fresh per-repetition state.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let units = Units::new(
            config.speed_kmh,
            config.cell_length_m,
            config.sim_speed,
            config.battery_kwh,
            config.cs_power_kw,
            config.autonomy_km,
        )?;

        let grid_template =
            CityBuilder::new(config.roundabout_side, config.avenue_length, config.scale).build()?;

        let stations_template = station::place_stations(
            &grid_template,
            config.st_layout,
            config.min_plugs_per_station,
            config.min_num_stations,
        )?;

        crate::log_main!(
            crate::verbose::EVENT_CITY_BUILD,
            "built city grid",
            side = grid_template.side()
        );
        crate::log_main!(
            crate::verbose::EVENT_STATION_PLACEMENT,
            "placed stations",
            count = stations_template.stations().len()
        );

        let total_ticks = units.minutes_to_steps(config.total_time_h * 60.0).round().max(0.0) as u32;
        let measure_period_ticks =
            units.minutes_to_steps(config.measure_period_min).round().max(1.0) as u32;

        let drivable_cells =
            grid_template.iter().filter(|c| c.get_cell_type() != CellType::House).count();
        let total_vehicles = (config.tf_density * drivable_cells as f64).round() as u32;
        let total_ev = (config.ev_density * total_vehicles as f64).round() as u32;

        crate::log_main!(
            crate::verbose::EVENT_CITY_BUILD,
            "run summary",
            total_vehicles = total_vehicles,
            total_ev = total_ev,
            total_ticks = total_ticks,
            measure_period_ticks = measure_period_ticks
        );

        Ok(Simulation {
            config,
            units,
            grid_template,
            stations_template,
            total_ticks,
            measure_period_ticks,
            total_vehicles,
            total_ev,
        })
    }

    /// Runs one independent, deterministic repetition and returns its
    /// [`Report`]. Two calls with the same `seed` against the same
    /// `Simulation` reproduce identical time series.
    pub fn run_repetition(&self, seed: u64) -> Report {
        crate::log_main!(crate::verbose::EVENT_REPETITION_RESET, "resetting repetition state", seed = seed);

        let mut grid = self.grid_template.clone();
        let mut stations = self.stations_template.clone();
        let mut engine = Engine::new(&self.config, &self.units, seed);
        let mut vehicles = engine.spawn_population(&grid, self.total_vehicles, self.total_ev);

        let battery_threshold_steps =
            (self.config.battery_threshold * self.units.autonomy_cells()).floor() as i64;

        let mut recorder = Recorder::new(
            &stations,
            self.config.heat_map_snapshots,
            self.total_ticks,
            self.measure_period_ticks,
        );

        for tick in 1..=self.total_ticks {
            engine.next_step(&mut grid, &mut vehicles, &mut stations, &self.units, battery_threshold_steps);
            if tick % self.measure_period_ticks == 0 {
                recorder.record_tick(tick, &grid, &vehicles, &stations, self.measure_period_ticks);
            }
        }

        let attributes = RunAttributes {
            ev_density: self.config.ev_density,
            tf_density: self.config.tf_density,
            st_layout: self.config.st_layout.to_string(),
            total_vehicles: self.total_vehicles,
            total_ev: self.total_ev,
            grid_side: self.grid_template.side(),
            total_time_h: self.config.total_time_h,
            measure_period_min: self.config.measure_period_min,
            seed,
            run_id: uuid::Uuid::new_v4().to_string(),
        };

        crate::log_main!(crate::verbose::EVENT_REPORT_FLUSH, "repetition finished", seed = seed);
        recorder.finalize(&vehicles, attributes)
    }

    /// Total number of vehicles in every repetition's population, derived
    /// once from `tf_density` and the grid's drivable-cell count.
    pub fn total_vehicles(&self) -> u32 {
        self.total_vehicles
    }

    /// Number of those vehicles that are electric, derived from `ev_density`.
    pub fn total_ev(&self) -> u32 {
        self.total_ev
    }

    /// The grid every repetition clones its working copy from.
    pub fn grid_template(&self) -> &Grid {
        &self.grid_template
    }

    /// The station layout every repetition clones its working copy from.
    pub fn stations_template(&self) -> &StationPlacement {
        &self.stations_template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;

    fn tiny_config() -> SimulationConfig {
        SimulationConfig::builder()
            .roundabout_side(4)
            .avenue_length(2)
            .scale(1)
            .min_plugs_per_station(2)
            .min_num_stations(1)
            .st_layout(Layout::Central)
            .total_time_h(0.02)
            .measure_period_min(0.2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_city_has_no_vehicles() {
        let config =
            SimulationConfig::builder().ev_density(0.0).tf_density(0.0).total_time_h(0.02).build().unwrap();
        let simulation = Simulation::new(config).unwrap();
        assert_eq!(simulation.total_vehicles(), 0);
        let report = simulation.run_repetition(1);
        assert!(report.states["TOWARDS_DEST"].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_run_repetition_is_deterministic() {
        let simulation = Simulation::new(tiny_config()).unwrap();
        let a = simulation.run_repetition(99);
        let b = simulation.run_repetition(99);
        assert_eq!(a.states, b.states);
        assert_eq!(a.velocities.speed, b.velocities.speed);
    }

    #[test]
    fn test_report_conserves_total_vehicle_count() {
        let config =
            SimulationConfig::builder().ev_density(0.5).tf_density(0.2).total_time_h(0.02).build().unwrap();
        let simulation = Simulation::new(config).unwrap();
        let report = simulation.run_repetition(7);
        let total = simulation.total_vehicles();
        for tick_idx in 0..report.states["AT_DEST"].len() {
            let sum: u32 = report.states.values().map(|series| series[tick_idx]).sum();
            assert_eq!(sum, total);
        }
    }
}
