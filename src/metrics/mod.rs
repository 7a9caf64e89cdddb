//! # Metrics Module
//!
//! Accumulates per-measurement-tick samples into a [`Report`] over the
//! course of one repetition.
//!
//! Grounded on `src/metrics/metrics.py`'s `SimulationSnapshot`/
//! `SimulationMetric`: `states_evolution` becomes [`Report::states`],
//! `mean_speed_evolution`/`mean_mobility_evolution` become
//! [`Report::velocities`], `occupation_history` becomes
//! [`Report::occupation`], the `heat_map_tsteps` schedule becomes
//! `Recorder::heat_map_ticks`, and `compute_seeking_queueing` becomes
//! [`Report::global`].
use crate::agents::vehicle::{VehicleId, VehicleState};
use crate::agents::vehicles_storage::VehiclesStorage;
use crate::grid::cell::CellId;
use crate::grid::road_network::Grid;
use crate::station::StationPlacement;
use serde::Serialize;
use std::collections::HashMap;

/// The six vehicle-state tags time series are keyed by, in the order the
/// original's `States` enum declares them.
const STATE_TAGS: [VehicleState; 6] = [
    VehicleState::AtDest,
    VehicleState::TowardsDest,
    VehicleState::TowardsStation,
    VehicleState::Queueing,
    VehicleState::Charging,
    VehicleState::NoBattery,
];

/// One equispaced cumulative snapshot of per-cell occupancy, taken at `tick`.
#[derive(Debug, Clone, Serialize)]
pub struct HeatMapSnapshot {
    pub tick: u32,
    /// `1` for an occupied cell, `0` otherwise, indexed by [`CellId`].
    pub occupancy: Vec<u8>,
}

/// Root-level attributes describing how a repetition was configured,
/// mirrored alongside the time series so a [`Report`] is self-describing
/// without its originating [`crate::config::SimulationConfig`].
#[derive(Debug, Clone, Serialize)]
pub struct RunAttributes {
    pub ev_density: f64,
    pub tf_density: f64,
    pub st_layout: String,
    pub total_vehicles: u32,
    pub total_ev: u32,
    pub grid_side: u32,
    pub total_time_h: f64,
    pub measure_period_min: f64,
    pub seed: u64,
    /// Unique per-repetition identifier, for joining a report against
    /// externally persisted artifacts (logs, heat-map renders, ...).
    pub run_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Velocities {
    /// Mean lattice distance per step among vehicles `TOWARDS_DEST` or
    /// `TOWARDS_ST` at the sampling tick, one entry per measurement tick.
    pub speed: Vec<f64>,
    /// Mean lattice distance per step among every vehicle (stationary
    /// vehicles contribute zero), one entry per measurement tick.
    pub mobility: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalMeans {
    pub seeking: f64,
    pub queueing: f64,
}

/// The complete output of one repetition.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub states: HashMap<String, Vec<u32>>,
    pub velocities: Velocities,
    pub heat_map: Vec<HeatMapSnapshot>,
    pub occupation: HashMap<CellId, Vec<u32>>,
    pub global: GlobalMeans,
    pub attributes: RunAttributes,
}

impl Report {
    /// Serializes the report into the `states/`, `velocities/{speed,mobility}`,
    /// `heat_map/{i}`, `occupation/{pos}`, `global/{seeking,queueing}` shape
    /// used for HDF5 persistence elsewhere, expressed here as a JSON tree.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("Report fields are all JSON-representable")
    }
}

/// Accumulates samples across a repetition; [`Recorder::finalize`] turns the
/// accumulated state into a [`Report`].
pub struct Recorder {
    states: HashMap<String, Vec<u32>>,
    occupation: HashMap<CellId, Vec<u32>>,
    speed: Vec<f64>,
    mobility: Vec<f64>,
    heat_map: Vec<HeatMapSnapshot>,
    heat_map_ticks: Vec<u32>,
    previous_positions: HashMap<VehicleId, CellId>,
}

impl Recorder {
    /// `heat_map_snapshots` equispaced cumulative heat-map ticks are computed
    /// up front, following the `heat_map_tsteps` schedule:
    /// `floor(((i+1) * total_ticks) / (snapshots * measure_period_ticks)) *
    /// measure_period_ticks` for `i in 0..snapshots`.
    pub fn new(stations: &StationPlacement, heat_map_snapshots: u32, total_ticks: u32, measure_period_ticks: u32) -> Self {
        let measure_period_ticks = measure_period_ticks.max(1);
        let heat_map_ticks = (0..heat_map_snapshots)
            .map(|i| {
                let raw = ((i as u64 + 1) * total_ticks as u64)
                    / (heat_map_snapshots.max(1) as u64 * measure_period_ticks as u64);
                (raw as u32) * measure_period_ticks
            })
            .collect();

        let states = STATE_TAGS.iter().map(|s| (s.to_string(), Vec::new())).collect();
        let occupation = stations.stations().iter().map(|s| (s.cell(), Vec::new())).collect();

        Recorder {
            states,
            occupation,
            speed: Vec::new(),
            mobility: Vec::new(),
            heat_map: Vec::new(),
            heat_map_ticks,
            previous_positions: HashMap::new(),
        }
    }

    /// Samples state counts, velocities, station occupation, and (if `tick`
    /// is a scheduled snapshot point) the grid-wide heat map.
    pub fn record_tick(
        &mut self,
        tick: u32,
        grid: &Grid,
        vehicles: &VehiclesStorage,
        stations: &StationPlacement,
        measure_period_ticks: u32,
    ) {
        let measure_period_ticks = measure_period_ticks.max(1) as f64;

        let mut counts: HashMap<VehicleState, u32> = HashMap::new();
        let mut moving_distances = Vec::new();
        let mut all_distances = Vec::new();

        for (&id, vehicle) in vehicles.iter() {
            *counts.entry(vehicle.state).or_insert(0) += 1;

            let distance = self
                .previous_positions
                .get(&id)
                .map(|&prev| grid.lattice_distance(prev, vehicle.cell))
                .unwrap_or(0);
            all_distances.push(distance as f64);
            if vehicle.is_in_traffic() {
                moving_distances.push(distance as f64);
            }
            self.previous_positions.insert(id, vehicle.cell);
        }

        for tag in STATE_TAGS {
            let entry = self.states.entry(tag.to_string()).or_default();
            entry.push(*counts.get(&tag).unwrap_or(&0));
        }

        self.speed.push(mean(&moving_distances) / measure_period_ticks);
        self.mobility.push(mean(&all_distances) / measure_period_ticks);

        for station in stations.stations() {
            self.occupation.entry(station.cell()).or_default().push(station.occupation());
        }

        if self.heat_map_ticks.contains(&tick) {
            let occupancy = grid.iter().map(|c| c.is_occupied() as u8).collect();
            self.heat_map.push(HeatMapSnapshot { tick, occupancy });
        }
    }

    /// Consumes the recorder, computing the global seeking/queueing means
    /// from every vehicle's accumulated per-trip histories (mirrors
    /// `compute_seeking_queueing`: zero when no vehicle ever recorded a
    /// trip, otherwise the mean of each vehicle's summed history).
    pub fn finalize(self, vehicles: &VehiclesStorage, attributes: RunAttributes) -> Report {
        let seeking_sums: Vec<f64> =
            vehicles.values().map(|v| v.histories.seeking.iter().sum::<u32>() as f64).collect();
        let queueing_sums: Vec<f64> =
            vehicles.values().map(|v| v.histories.queueing.iter().sum::<u32>() as f64).collect();

        Report {
            states: self.states,
            velocities: Velocities { speed: self.speed, mobility: self.mobility },
            heat_map: self.heat_map,
            occupation: self.occupation,
            global: GlobalMeans { seeking: mean(&seeking_sums), queueing: mean(&queueing_sums) },
            attributes,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::vehicle::Vehicle;
    use crate::utils::test_grids::tiny_grid_with_stations as sample_grid_and_stations;

    #[test]
    fn test_heat_map_ticks_are_equispaced() {
        let (_, stations) = sample_grid_and_stations();
        let recorder = Recorder::new(&stations, 3, 300, 10);
        assert_eq!(recorder.heat_map_ticks, vec![100, 200, 300]);
    }

    #[test]
    fn test_record_tick_tracks_state_counts() {
        let (grid, stations) = sample_grid_and_stations();
        let mut vehicles = VehiclesStorage::new();
        vehicles.insert_vehicle(Vehicle::new(1, 0).build());
        let mut recorder = Recorder::new(&stations, 1, 10, 1);
        recorder.record_tick(0, &grid, &vehicles, &stations, 1);
        assert_eq!(recorder.states["AT_DEST"], vec![1]);
        assert_eq!(recorder.states["CHARGING"], vec![0]);
    }

    #[test]
    fn test_finalize_reports_zero_global_means_with_no_history() {
        let (_, stations) = sample_grid_and_stations();
        let vehicles = VehiclesStorage::new();
        let recorder = Recorder::new(&stations, 1, 10, 1);
        let attributes = RunAttributes {
            ev_density: 0.1,
            tf_density: 0.1,
            st_layout: "central".into(),
            total_vehicles: 0,
            total_ev: 0,
            grid_side: 24,
            total_time_h: 1.0,
            measure_period_min: 1.0,
            seed: 1,
            run_id: "test".into(),
        };
        let report = recorder.finalize(&vehicles, attributes);
        assert_eq!(report.global.seeking, 0.0);
        assert_eq!(report.global.queueing, 0.0);
    }
}
