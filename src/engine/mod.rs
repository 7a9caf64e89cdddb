//! # Stepping Engine
//!
//! The per-tick state machine and collision-avoiding motion primitive that
//! drives every vehicle, station, and cell-occupancy update. Nothing else in
//! the crate decides when a vehicle moves, waits, seeks a charger, or
//! recharges; vehicles carry no autonomous behavior of their own.
//!
//! Grounded on `src/simulator/engine.py`'s `SimulatorEngine`: the state
//! dispatch table, `compute_next_position`'s keep-in-lane/yield branching,
//! and the two-phase `next_step` commit are all carried over; only the
//! Cython A* call and the dict-based city/vehicle bookkeeping are replaced
//! with this crate's `Grid`/`shortest_path` and `VehiclesStorage`.
use crate::agents::vehicle::{EvState, Vehicle, VehicleState};
use crate::agents::vehicles_storage::VehiclesStorage;
use crate::config::SimulationConfig;
use crate::grid::cell::CellId;
use crate::grid::road_network::Grid;
use crate::grid::zones::CellType;
use crate::rand_source::RandSource;
use crate::shortest_path::path::Path;
use crate::shortest_path::router::{repair, shortest_path};
use crate::station::StationPlacement;
use crate::units::Units;

/// Owns the per-repetition random source and the derived normal-distribution
/// parameters for idle duration and battery goal. One `Engine` drives one
/// repetition from start to finish.
pub struct Engine {
    rng: RandSource,
    p_search_alt: f64,

    idle_lower_steps: i64,
    idle_upper_steps: i64,
    idle_mean_steps: f64,
    idle_std_steps: f64,

    battery_lower: i64,
    battery_upper: i64,
    battery_mean: f64,
    battery_std: f64,

    new_occupations: Vec<CellId>,
    new_releases: Vec<CellId>,
}

impl Engine {
    /// Derives the idle and battery normal-distribution parameters from the
    /// frozen configuration and seeds a fresh random source for this
    /// repetition.
    pub fn new(config: &SimulationConfig, units: &Units, seed: u64) -> Self {
        let idle_mean_min = (config.idle_lower_min + config.idle_upper_min) / 2.0;
        let idle_mean_steps = units.minutes_to_steps(idle_mean_min);
        let idle_std_steps = config.idle_std * idle_mean_steps;
        let idle_lower_steps = units.minutes_to_steps(config.idle_lower_min).floor() as i64;
        let idle_upper_steps = units.minutes_to_steps(config.idle_upper_min).ceil() as i64;

        let autonomy = units.autonomy_cells();
        let battery_mean = autonomy / 2.0;
        let battery_std = config.battery_std * autonomy;
        let battery_lower = (config.battery_threshold * autonomy).floor() as i64;
        let battery_upper = autonomy.ceil() as i64;

        Engine {
            rng: RandSource::seeded(seed),
            p_search_alt: config.p_search_alt,
            idle_lower_steps,
            idle_upper_steps,
            idle_mean_steps,
            idle_std_steps,
            battery_lower,
            battery_upper,
            battery_mean,
            battery_std,
            new_occupations: Vec::new(),
            new_releases: Vec::new(),
        }
    }

    /// Normal-distributed idle duration (in steps), clamped to
    /// `[idle_lower_steps, idle_upper_steps]`.
    fn compute_idle(&mut self) -> u32 {
        self.rng
            .normal_clamped_i64(self.idle_mean_steps, self.idle_std_steps, self.idle_lower_steps, self.idle_upper_steps)
            .max(0) as u32
    }

    /// Normal-distributed battery goal (in cells of autonomy), clamped to
    /// `[threshold·autonomy, autonomy]`.
    fn compute_battery_goal(&mut self) -> i64 {
        self.rng.normal_clamped_i64(self.battery_mean, self.battery_std, self.battery_lower, self.battery_upper)
    }

    /// Builds the initial vehicle population for one repetition:
    /// `total_vehicles` distinct drivable cells are drawn without
    /// replacement (a partial Fisher-Yates shuffle) and populated, each
    /// starting `AT_DEST` with a freshly sampled idle wait. The first
    /// `total_ev` are marked electric with a freshly sampled starting
    /// battery level.
    ///
    /// Grounded on `aplication/simulation.py`'s `create_vehicles`: a
    /// one-shot density-based population at repetition start, not a
    /// continuous per-tick trip generator.
    pub fn spawn_population(&mut self, grid: &Grid, total_vehicles: u32, total_ev: u32) -> VehiclesStorage {
        let mut drivable: Vec<CellId> =
            grid.iter().filter(|c| c.get_cell_type() != CellType::House).map(|c| c.get_id()).collect();

        let take = (total_vehicles as usize).min(drivable.len());
        for i in 0..take {
            let remaining = drivable.len() - i;
            let j = i + self.rng.random_index(remaining);
            drivable.swap(i, j);
        }

        let mut vehicles = VehiclesStorage::new();
        for (i, &cell) in drivable.iter().take(take).enumerate() {
            let id = i as u64 + 1;
            let wait_time = self.compute_idle();
            let mut builder = Vehicle::new(id, cell).with_wait_time(wait_time);
            if (i as u32) < total_ev {
                let battery = self.compute_battery_goal();
                builder = builder.as_electric(battery);
            }
            vehicles.insert_vehicle(builder.build());
        }
        vehicles
    }

    fn random_destination(&mut self, grid: &Grid) -> CellId {
        let idx = self.rng.random_index(grid.len());
        grid.iter().nth(idx).expect("grid is non-empty").get_id()
    }

    fn assign_new_cell(&mut self, vehicle: &mut Vehicle, next: CellId) {
        self.new_releases.push(vehicle.cell);
        self.new_occupations.push(next);
        vehicle.cell = next;
    }

    /// Applies every occupancy change recorded since the last commit, then
    /// clears the buffers.
    pub fn commit_occupancy(&mut self, grid: &mut Grid) {
        for &cell_id in &self.new_occupations {
            if let Some(cell) = grid.get_cell_mut(cell_id) {
                cell.set_occupied(true);
            }
        }
        for &cell_id in &self.new_releases {
            if let Some(cell) = grid.get_cell_mut(cell_id) {
                cell.set_occupied(false);
            }
        }
        self.new_occupations.clear();
        self.new_releases.clear();
    }

    /// The collision-avoiding motion primitive. Returns whether the vehicle
    /// now occupies `target`.
    pub fn compute_next_position(
        &mut self,
        grid: &Grid,
        vehicle: &mut Vehicle,
        target: CellId,
        electric: bool,
    ) -> bool {
        if vehicle.recompute_path {
            vehicle.path = repair(grid, &vehicle.path, vehicle.cell, target);
            vehicle.recompute_path = false;
        }

        let Some(next_cell) = vehicle.path.pop() else {
            return vehicle.cell == target;
        };

        let current = grid.get_cell(vehicle.cell).expect("vehicle cell must exist");
        let mut moved = false;

        if current.is_prio_successor(next_cell) {
            if keep_in_lane_possible(grid, next_cell) {
                self.assign_new_cell(vehicle, next_cell);
                moved = true;
            } else if self.rng.unit_interval() < self.p_search_alt {
                let successors = current.successors().to_vec();
                for candidate in successors {
                    if lane_change_possible(grid, candidate) {
                        self.assign_new_cell(vehicle, candidate);
                        vehicle.recompute_path = true;
                        moved = true;
                        break;
                    }
                }
            }
        } else if lane_change_possible(grid, next_cell) {
            self.assign_new_cell(vehicle, next_cell);
            moved = true;
        } else {
            let prio_successors = current.prio_successors();
            if let Some(&first) = prio_successors.first() {
                if self.rng.unit_interval() < self.p_search_alt && keep_in_lane_possible(grid, first) {
                    self.assign_new_cell(vehicle, first);
                    vehicle.recompute_path = true;
                    moved = true;
                }
            }
        }

        if !moved {
            vehicle.path.push(next_cell);
        } else if electric {
            if let Some(ev) = vehicle.ev.as_mut() {
                ev.battery -= 1;
            }
        }

        vehicle.cell == target
    }

    fn at_destination(&mut self, grid: &Grid, vehicle: &mut Vehicle) {
        vehicle.wait_time = vehicle.wait_time.saturating_sub(1);
        if vehicle.wait_time == 0 {
            vehicle.state = VehicleState::TowardsDest;
            vehicle.destination = self.random_destination(grid);
            vehicle.path =
                shortest_path(grid, vehicle.cell, vehicle.destination).unwrap_or_else(|_| Path::empty());
        }
    }

    fn towards_destination(&mut self, grid: &Grid, vehicle: &mut Vehicle, battery_threshold_steps: i64) {
        let electric = vehicle.is_electric();
        if self.compute_next_position(grid, vehicle, vehicle.destination, electric) {
            self.new_releases.push(vehicle.cell);
            vehicle.state = VehicleState::AtDest;
            vehicle.wait_time = self.compute_idle();
            return;
        }

        if let Some(ev) = vehicle.ev.as_ref() {
            if ev.battery <= battery_threshold_steps {
                vehicle.state = VehicleState::TowardsStation;
            } else if ev.battery == 0 {
                vehicle.state = VehicleState::NoBattery;
            }
        }
    }

    fn towards_station(&mut self, grid: &Grid, vehicle: &mut Vehicle, station_cell: CellId) {
        if let Some(ev) = vehicle.ev.as_mut() {
            ev.seeking += 1;
        }

        if self.compute_next_position(grid, vehicle, station_cell, true) {
            self.new_releases.push(vehicle.cell);
            if let Some(ev) = vehicle.ev.as_mut() {
                vehicle.histories.seeking.push(ev.seeking);
                ev.queueing = 0;
            }
            vehicle.state = VehicleState::Queueing;
            return;
        }

        if let Some(ev) = vehicle.ev.as_ref() {
            if ev.battery == 0 {
                vehicle.state = VehicleState::NoBattery;
            }
        }
    }

    fn charging(&mut self, grid: &Grid, vehicle: &mut Vehicle, stations: &mut StationPlacement, units: &Units) {
        vehicle.wait_time = vehicle.wait_time.saturating_sub(1);
        if vehicle.wait_time == 0 {
            vehicle.state = VehicleState::TowardsDest;
            vehicle.path =
                shortest_path(grid, vehicle.cell, vehicle.destination).unwrap_or_else(|_| Path::empty());
            if let Some(ev) = vehicle.ev.as_mut() {
                if let Some(sid) = ev.station.take() {
                    if let Some(station) = stations.station_mut(sid) {
                        station.release_charger();
                    }
                }
            }
            let _ = units;
        }
    }

    fn no_battery(&mut self, vehicle: &mut Vehicle) {
        self.new_releases.push(vehicle.cell);
    }

    /// Advances every vehicle in `stations.queue`, then grants free chargers
    /// to as many queued vehicles as are available, transitioning them to
    /// `CHARGING`.
    pub fn update_at_station(&mut self, units: &Units, stations: &mut StationPlacement, vehicles: &mut VehiclesStorage) {
        let station_ids: Vec<_> = stations.stations().iter().map(|s| s.id()).collect();
        for station_id in station_ids {
            let station = stations.station_mut(station_id).expect("station exists");
            for &waiting_id in station.queue_iter().collect::<Vec<_>>() {
                if let Some(waiting) = vehicles.get_mut(&waiting_id) {
                    if let Some(ev) = waiting.ev.as_mut() {
                        ev.queueing += 1;
                    }
                }
            }

            while station.reserve_charger() {
                let Some(next_id) = station.dequeue_front() else {
                    station.release_charger();
                    break;
                };
                let Some(vehicle) = vehicles.get_mut(&next_id) else { continue };
                if let Some(ev) = vehicle.ev.as_mut() {
                    vehicle.histories.queueing.push(ev.queueing);
                }
                vehicle.state = VehicleState::Charging;
                let goal = self.compute_battery_goal();
                let demand = (goal - vehicle.ev.as_ref().map(|e| e.battery).unwrap_or(0)).max(0);
                vehicle.wait_time = units.steps_to_recharge(demand as f64).round() as u32;
                if let Some(ev) = vehicle.ev.as_mut() {
                    ev.battery = goal;
                    ev.desired_charge = goal;
                }
            }
        }
    }

    /// One full tick: phase A (avenue/roundabout vehicles), commit, phase B
    /// (all remaining vehicles), station processing, final commit.
    pub fn next_step(
        &mut self,
        grid: &mut Grid,
        vehicles: &mut VehiclesStorage,
        stations: &mut StationPlacement,
        units: &Units,
        battery_threshold_steps: i64,
    ) {
        let priority_ids: Vec<_> = vehicles
            .iter()
            .filter(|(_, v)| {
                v.is_in_traffic()
                    && grid
                        .get_cell(v.cell)
                        .map(|c| matches!(c.get_cell_type(), CellType::Avenue | CellType::Roundabout))
                        .unwrap_or(false)
            })
            .map(|(&id, _)| id)
            .collect();

        for id in priority_ids {
            self.step_one(grid, vehicles, stations, units, battery_threshold_steps, id);
        }
        self.commit_occupancy(grid);

        let all_ids: Vec<_> = vehicles.keys().copied().collect();
        for id in all_ids {
            self.step_one(grid, vehicles, stations, units, battery_threshold_steps, id);
        }

        self.update_at_station(units, stations, vehicles);
        self.commit_occupancy(grid);
    }

    /// Drives one tick and hands back everything a visualization collaborator
    /// needs to redraw the frame: the grid and stations (by reference, since
    /// the engine owns neither), a heat-map snapshot when `heat_map_due`, and
    /// each vehicle's `(cell, state, color)`.
    ///
    /// Mirrors `step_for_visualization`, called once per tick by display
    /// collaborators to pull a redraw-ready frame rather than reaching into
    /// engine internals themselves.
    #[allow(clippy::too_many_arguments)]
    pub fn step_for_visualization<'a>(
        &mut self,
        grid: &'a mut Grid,
        vehicles: &mut VehiclesStorage,
        stations: &'a mut StationPlacement,
        units: &Units,
        battery_threshold_steps: i64,
        repetition: u32,
        tick: u32,
        heat_map_due: bool,
    ) -> VisualizationFrame<'a> {
        self.next_step(grid, vehicles, stations, units, battery_threshold_steps);

        let heat_map = heat_map_due.then(|| crate::metrics::HeatMapSnapshot {
            tick,
            occupancy: grid.iter().map(|c| c.is_occupied() as u8).collect(),
        });

        let agents = vehicles.values().map(|v| (v.cell, v.state, AgentColor::of(v))).collect();

        VisualizationFrame { repetition, tick, heat_map, cells: &*grid, stations: stations.stations(), agents }
    }

    fn step_one(
        &mut self,
        grid: &Grid,
        vehicles: &mut VehiclesStorage,
        stations: &mut StationPlacement,
        units: &Units,
        battery_threshold_steps: i64,
        id: crate::agents::vehicle::VehicleId,
    ) {
        let state = match vehicles.get(&id) {
            Some(v) => v.state,
            None => return,
        };

        match state {
            VehicleState::AtDest => {
                if let Some(v) = vehicles.get_mut(&id) {
                    self.at_destination(grid, v);
                }
            }
            VehicleState::TowardsDest => {
                if let Some(v) = vehicles.get_mut(&id) {
                    self.towards_destination(grid, v, battery_threshold_steps);
                }
                let needs_station = matches!(vehicles.get(&id).map(|v| v.state), Some(VehicleState::TowardsStation));
                if needs_station {
                    let cell = vehicles.get(&id).map(|v| v.cell).unwrap();
                    let station_id = stations.service_area_for(cell);
                    if let (Some(v), Some(sid)) = (vehicles.get_mut(&id), station_id) {
                        if let Some(ev) = v.ev.as_mut() {
                            ev.station = Some(sid);
                            ev.seeking = 0;
                        }
                    }
                    if let Some(sid) = station_id {
                        let station_cell = stations.stations().iter().find(|s| s.id() == sid).map(|s| s.cell());
                        if let (Some(v), Some(target)) = (vehicles.get_mut(&id), station_cell) {
                            v.path = shortest_path(grid, v.cell, target).unwrap_or_else(|_| Path::empty());
                        }
                    }
                }
            }
            VehicleState::TowardsStation => {
                let station_cell = vehicles
                    .get(&id)
                    .and_then(|v| v.ev.as_ref())
                    .and_then(|ev| ev.station)
                    .and_then(|sid| stations.stations().iter().find(|s| s.id() == sid))
                    .map(|s| s.cell());
                if let (Some(v), Some(cell)) = (vehicles.get_mut(&id), station_cell) {
                    self.towards_station(grid, v, cell);
                    if v.state == VehicleState::Queueing {
                        let sid = v.ev.as_ref().and_then(|ev| ev.station);
                        if let Some(sid) = sid {
                            if let Some(station) = stations.station_mut(sid) {
                                station.enqueue(id);
                            }
                        }
                    }
                }
            }
            VehicleState::Charging => {
                if let Some(v) = vehicles.get_mut(&id) {
                    self.charging(grid, v, stations, units);
                }
            }
            VehicleState::Queueing | VehicleState::NoBattery => {
                if state == VehicleState::NoBattery {
                    if let Some(v) = vehicles.get_mut(&id) {
                        self.no_battery(v);
                    }
                }
            }
        }
    }
}

/// One redraw-ready tick, handed to a visualization collaborator by
/// [`Engine::step_for_visualization`].
pub struct VisualizationFrame<'a> {
    pub repetition: u32,
    pub tick: u32,
    pub heat_map: Option<crate::metrics::HeatMapSnapshot>,
    pub cells: &'a Grid,
    pub stations: &'a [crate::station::Station],
    pub agents: Vec<(CellId, VehicleState, AgentColor)>,
}

/// Display color-class for one vehicle: combustion vehicles get one color,
/// EVs are color-coded by where they sit in the charging lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentColor {
    Combustion,
    ElectricIdle,
    ElectricDriving,
    ElectricSeeking,
    ElectricQueueing,
    ElectricCharging,
    NoBattery,
}

impl AgentColor {
    fn of(vehicle: &Vehicle) -> Self {
        if vehicle.ev.is_none() {
            return AgentColor::Combustion;
        }
        match vehicle.state {
            VehicleState::AtDest => AgentColor::ElectricIdle,
            VehicleState::TowardsDest => AgentColor::ElectricDriving,
            VehicleState::TowardsStation => AgentColor::ElectricSeeking,
            VehicleState::Queueing => AgentColor::ElectricQueueing,
            VehicleState::Charging => AgentColor::ElectricCharging,
            VehicleState::NoBattery => AgentColor::NoBattery,
        }
    }
}

fn keep_in_lane_possible(grid: &Grid, cell_id: CellId) -> bool {
    grid.get_cell(cell_id).map(|c| !c.is_occupied()).unwrap_or(false)
}

fn lane_change_possible(grid: &Grid, cell_id: CellId) -> bool {
    match grid.get_cell(cell_id) {
        Some(cell) => {
            !cell.is_occupied()
                && !cell.prio_predecessors().iter().any(|&p| {
                    grid.get_cell(p).map(|c| c.is_occupied()).unwrap_or(false)
                })
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_units() -> Units {
        Units::new(50.0, 4.5, 2.0, 50.0, 22.0, 135.0).unwrap()
    }

    fn sample_config() -> SimulationConfig {
        SimulationConfig::builder().build().unwrap()
    }

    #[test]
    fn test_engine_new_derives_bounds() {
        let engine = Engine::new(&sample_config(), &sample_units(), 42);
        assert!(engine.idle_upper_steps >= engine.idle_lower_steps);
        assert!(engine.battery_upper >= engine.battery_lower);
    }

    #[test]
    fn test_compute_next_position_moves_on_empty_road() {
        let grid = crate::utils::test_grids::tiny_grid();
        let mut engine = Engine::new(&sample_config(), &sample_units(), 7);
        let avenue_cell = grid.iter().find(|c| c.get_cell_type() == CellType::Avenue).unwrap();
        let start = avenue_cell.get_id();
        let target = *avenue_cell.successors().first().unwrap();
        let mut vehicle = Vehicle::new(1, start)
            .with_destination(target)
            .with_state(VehicleState::TowardsDest)
            .build();
        vehicle.path = shortest_path(&grid, start, target).unwrap();

        let reached = engine.compute_next_position(&grid, &mut vehicle, target, false);
        assert!(reached);
        assert_eq!(vehicle.cell, target);
    }

    #[test]
    fn test_no_battery_releases_cell() {
        let mut engine = Engine::new(&sample_config(), &sample_units(), 1);
        let mut vehicle = Vehicle::new(1, 5).build();
        engine.no_battery(&mut vehicle);
        assert_eq!(engine.new_releases, vec![5]);
    }

    #[test]
    fn test_spawn_population_respects_counts_and_distinct_cells() {
        let grid = crate::utils::test_grids::tiny_grid();
        let mut engine = Engine::new(&sample_config(), &sample_units(), 3);
        let vehicles = engine.spawn_population(&grid, 10, 4);
        assert_eq!(vehicles.len(), 10);
        assert_eq!(vehicles.values().filter(|v| v.is_electric()).count(), 4);
        let mut cells: Vec<_> = vehicles.values().map(|v| v.cell).collect();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), 10);
    }

    #[test]
    fn test_ev_state_battery_field() {
        let ev = EvState { battery: 10, desired_charge: 10, station: None, seeking: 0, queueing: 0 };
        assert_eq!(ev.battery, 10);
    }

    #[test]
    fn test_battery_never_increases_while_driving() {
        let grid = crate::utils::test_grids::tiny_grid();
        let mut engine = Engine::new(&sample_config(), &sample_units(), 11);
        let avenue_cell = grid.iter().find(|c| c.get_cell_type() == CellType::Avenue).unwrap();
        let start = avenue_cell.get_id();
        let target = *avenue_cell.successors().first().unwrap();
        let mut vehicle = Vehicle::new(1, start)
            .with_destination(target)
            .with_state(VehicleState::TowardsDest)
            .as_electric(100)
            .build();
        vehicle.path = shortest_path(&grid, start, target).unwrap();

        let mut previous_battery = vehicle.ev.as_ref().unwrap().battery;
        for _ in 0..5 {
            engine.compute_next_position(&grid, &mut vehicle, target, true);
            let battery = vehicle.ev.as_ref().unwrap().battery;
            assert!(battery <= previous_battery);
            previous_battery = battery;
        }
    }

    #[test]
    fn test_battery_strictly_increases_when_granted_a_charger() {
        let (_, mut stations) = crate::utils::test_grids::tiny_grid_with_stations();
        let units = sample_units();
        let mut engine = Engine::new(&sample_config(), &units, 11);
        let mut vehicles = VehiclesStorage::new();
        let station_cell = stations.stations()[0].cell();
        let station_id = stations.stations()[0].id();
        let vehicle = Vehicle::new(1, station_cell).with_state(VehicleState::Queueing).as_electric(0).build();
        vehicles.insert_vehicle(vehicle);
        stations.station_mut(station_id).unwrap().enqueue(1);

        engine.update_at_station(&units, &mut stations, &mut vehicles);

        let charged = vehicles.get(&1).unwrap();
        assert_eq!(charged.state, VehicleState::Charging);
        assert!(charged.ev.as_ref().unwrap().battery > 0);
    }

    #[test]
    fn test_queue_discipline_completes_in_arrival_order_at_capacity_two_station() {
        let (grid, mut stations) = crate::utils::test_grids::tiny_grid_with_stations();
        let units = sample_units();
        let mut engine = Engine::new(&sample_config(), &units, 13);
        let station_id = stations.stations()[0].id();
        let station_cell = stations.stations()[0].cell();

        // Shrink the fixture's station down to exactly two free chargers.
        {
            let station = stations.station_mut(station_id).unwrap();
            while station.available() > 2 {
                station.reserve_charger();
            }
        }

        let mut vehicles = VehiclesStorage::new();
        for vid in 1..=5u64 {
            let mut vehicle =
                Vehicle::new(vid, station_cell).with_state(VehicleState::Queueing).as_electric(0).build();
            vehicle.ev.as_mut().unwrap().station = Some(station_id);
            vehicles.insert_vehicle(vehicle);
        }

        stations.station_mut(station_id).unwrap().enqueue(1);
        stations.station_mut(station_id).unwrap().enqueue(2);
        engine.update_at_station(&units, &mut stations, &mut vehicles);
        assert_eq!(vehicles.get(&1).unwrap().state, VehicleState::Charging);
        assert_eq!(vehicles.get(&2).unwrap().state, VehicleState::Charging);
        assert_eq!(stations.stations()[0].available(), 0);

        stations.station_mut(station_id).unwrap().enqueue(3);
        assert_eq!(
            stations.station_mut(station_id).unwrap().queue_len(),
            1,
            "the third arrival finds both chargers already taken"
        );
        stations.station_mut(station_id).unwrap().enqueue(4);
        stations.station_mut(station_id).unwrap().enqueue(5);
        engine.update_at_station(&units, &mut stations, &mut vehicles);
        assert_eq!(vehicles.get(&3).unwrap().state, VehicleState::Queueing);
        assert_eq!(vehicles.get(&4).unwrap().state, VehicleState::Queueing);
        assert_eq!(vehicles.get(&5).unwrap().state, VehicleState::Queueing);

        vehicles.get_mut(&1).unwrap().wait_time = 1;
        let mut vehicle = vehicles.get_mut(&1).unwrap().clone();
        engine.charging(&grid, &mut vehicle, &mut stations, &units);
        vehicles.insert_vehicle(vehicle);
        engine.update_at_station(&units, &mut stations, &mut vehicles);
        assert_eq!(vehicles.get(&1).unwrap().state, VehicleState::TowardsDest);
        assert_eq!(vehicles.get(&3).unwrap().state, VehicleState::Charging);

        vehicles.get_mut(&2).unwrap().wait_time = 1;
        let mut vehicle = vehicles.get_mut(&2).unwrap().clone();
        engine.charging(&grid, &mut vehicle, &mut stations, &units);
        vehicles.insert_vehicle(vehicle);
        engine.update_at_station(&units, &mut stations, &mut vehicles);
        assert_eq!(vehicles.get(&2).unwrap().state, VehicleState::TowardsDest);
        assert_eq!(vehicles.get(&4).unwrap().state, VehicleState::Charging);
        assert_eq!(vehicles.get(&5).unwrap().state, VehicleState::Queueing);

        vehicles.get_mut(&3).unwrap().wait_time = 1;
        let mut vehicle = vehicles.get_mut(&3).unwrap().clone();
        engine.charging(&grid, &mut vehicle, &mut stations, &units);
        vehicles.insert_vehicle(vehicle);
        engine.update_at_station(&units, &mut stations, &mut vehicles);
        assert_eq!(vehicles.get(&5).unwrap().state, VehicleState::Charging);
    }

    #[test]
    fn test_lane_change_probability_hook_controls_diversion_when_blocked() {
        use crate::grid::cell::Cell;

        let mut grid = Grid::new(6);
        grid.add_cell(
            Cell::new(0, 0, 0)
                .with_cell_type(CellType::Avenue)
                .with_successors(vec![1, 2])
                .with_prio_successors(vec![1])
                .build(),
        );
        grid.add_cell(Cell::new(1, 1, 0).with_cell_type(CellType::Avenue).build());
        grid.add_cell(Cell::new(2, 2, 0).with_cell_type(CellType::Avenue).build());
        grid.get_cell_mut(1).unwrap().set_occupied(true);

        let config_never = SimulationConfig::builder().p_search_alt(0.0).build().unwrap();
        let mut engine_never = Engine::new(&config_never, &sample_units(), 1);
        let mut blocked = Vehicle::new(1, 0).with_destination(2).with_state(VehicleState::TowardsDest).build();
        blocked.path = Path::new(vec![1], 1.0);
        engine_never.compute_next_position(&grid, &mut blocked, 2, false);
        assert_eq!(blocked.cell, 0, "blocked priority successor with p_search_alt=0 must never divert");
        assert_eq!(blocked.path.peek(), Some(1));

        let config_always = SimulationConfig::builder().p_search_alt(1.0).build().unwrap();
        let mut engine_always = Engine::new(&config_always, &sample_units(), 1);
        let mut diverted = Vehicle::new(1, 0).with_destination(2).with_state(VehicleState::TowardsDest).build();
        diverted.path = Path::new(vec![1], 1.0);
        engine_always.compute_next_position(&grid, &mut diverted, 2, false);
        assert_eq!(diverted.cell, 2, "a legal alternate candidate must be taken when p_search_alt=1");
    }

    #[test]
    fn test_single_ev_with_ample_battery_never_seeks_a_station() {
        let (mut grid, mut stations) = crate::utils::test_grids::tiny_grid_with_stations();
        let units = sample_units();
        let config = sample_config();
        let mut engine = Engine::new(&config, &units, 21);

        let avenue = grid.iter().find(|c| c.get_cell_type() == CellType::Avenue).unwrap().get_id();
        let destination = *grid.get_cell(avenue).unwrap().successors().first().unwrap();
        let mut vehicle = Vehicle::new(1, avenue)
            .with_destination(destination)
            .with_state(VehicleState::TowardsDest)
            .as_electric(units.autonomy_cells() as i64)
            .build();
        vehicle.path = shortest_path(&grid, avenue, destination).unwrap();

        let mut vehicles = VehiclesStorage::new();
        vehicles.insert_vehicle(vehicle);

        let battery_threshold_steps = (config.battery_threshold * units.autonomy_cells()).floor() as i64;
        for _ in 0..30 {
            engine.next_step(&mut grid, &mut vehicles, &mut stations, &units, battery_threshold_steps);
            assert_ne!(vehicles.get(&1).unwrap().state, VehicleState::TowardsStation);
        }
    }

    #[test]
    fn test_forced_recharge_completes_a_full_cycle() {
        let (mut grid, mut stations) = crate::utils::test_grids::tiny_grid_with_stations();
        let units = Units::new(50.0, 4.5, 2.0, 50.0, 22.0, 5.0).unwrap();
        let config = SimulationConfig::builder().battery_threshold(0.5).build().unwrap();
        let mut engine = Engine::new(&config, &units, 5);

        let start = grid.iter().find(|c| c.get_cell_type() == CellType::Avenue).unwrap().get_id();
        let far = *grid.get_cell(start).unwrap().successors().first().unwrap();
        let battery_threshold_steps = (config.battery_threshold * units.autonomy_cells()).floor() as i64;
        let mut vehicle = Vehicle::new(1, start)
            .with_destination(far)
            .with_state(VehicleState::TowardsDest)
            .as_electric(battery_threshold_steps + 2)
            .build();
        vehicle.path = shortest_path(&grid, start, far).unwrap();
        let mut vehicles = VehiclesStorage::new();
        vehicles.insert_vehicle(vehicle);

        let mut seen_towards_station = false;
        let mut seen_queueing = false;
        let mut seen_charging = false;
        let mut seen_towards_dest_after_charge = false;

        for _ in 0..500 {
            engine.next_step(&mut grid, &mut vehicles, &mut stations, &units, battery_threshold_steps);
            match vehicles.get(&1).unwrap().state {
                VehicleState::TowardsStation => seen_towards_station = true,
                VehicleState::Queueing => seen_queueing = true,
                VehicleState::Charging => seen_charging = true,
                VehicleState::TowardsDest if seen_charging => {
                    seen_towards_dest_after_charge = true;
                    break;
                }
                _ => {}
            }
        }

        assert!(seen_towards_station, "vehicle never sought a station despite low battery");
        assert!(seen_queueing, "vehicle never queued at the station");
        assert!(seen_charging, "vehicle never charged");
        assert!(seen_towards_dest_after_charge, "vehicle never resumed TOWARDS_DEST after charging");

        let after = vehicles.get(&1).unwrap();
        assert_eq!(after.histories.seeking.len(), 1);
        assert_eq!(after.histories.queueing.len(), 1);
    }

    #[test]
    fn test_step_for_visualization_reports_requested_heat_map() {
        let (mut grid, mut stations) = crate::utils::test_grids::tiny_grid_with_stations();
        let units = sample_units();
        let mut engine = Engine::new(&sample_config(), &units, 5);
        let mut vehicles = engine.spawn_population(&grid, 3, 1);

        let frame = engine.step_for_visualization(&mut grid, &mut vehicles, &mut stations, &units, 0, 0, 1, true);
        assert!(frame.heat_map.is_some());
        assert_eq!(frame.agents.len(), 3);
        assert!(!frame.stations.is_empty());

        let no_snapshot =
            engine.step_for_visualization(&mut grid, &mut vehicles, &mut stations, &units, 0, 0, 2, false);
        assert!(no_snapshot.heat_map.is_none());
    }
}
