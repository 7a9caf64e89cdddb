//! # Station Module
//!
//! A charging station's mutable queue/charger state, plus the three layout
//! policies from the placement design that turn a built [`Grid`] into a set
//! of stations and a total `service_area` mapping.
//!
//! Grounded on `src/models/station.py`'s `Station` (`charger_available` /
//! `vehicle_leaving` / FIFO `queue`) and `simtravel/models/cities.py`'s
//! `set_max_chargers_stations` for the perfect-square/divisible-by-4 station
//! count rule.
use crate::agents::vehicle::VehicleId;
use crate::city;
use crate::city::PlacementError;
use crate::config::Layout;
use crate::grid::cell::CellId;
use crate::grid::road_network::Grid;
use crate::grid::zones::CellType;
use std::collections::{HashMap, VecDeque};

pub type StationId = u32;

/// A charging station: a fixed anchor cell, a fixed charger `capacity`, and
/// mutable `available`/`queue` state.
#[derive(Debug, Clone)]
pub struct Station {
    id: StationId,
    cell: CellId,
    capacity: u32,
    available: u32,
    queue: VecDeque<VehicleId>,
}

impl Station {
    pub fn new(id: StationId, cell: CellId, capacity: u32) -> Self {
        Station { id, cell, capacity, available: capacity, queue: VecDeque::new() }
    }

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// `queue_length + (capacity - available)`.
    pub fn occupation(&self) -> u32 {
        self.queue.len() as u32 + (self.capacity - self.available)
    }

    /// Reserves a charger if one is free. Returns whether the reservation
    /// succeeded.
    pub fn reserve_charger(&mut self) -> bool {
        if self.available > 0 {
            self.available -= 1;
            true
        } else {
            false
        }
    }

    /// Frees a previously reserved charger.
    pub fn release_charger(&mut self) {
        debug_assert!(self.available < self.capacity);
        self.available += 1;
    }

    pub fn enqueue(&mut self, vehicle: VehicleId) {
        self.queue.push_back(vehicle);
    }

    /// Pops the head of the FIFO queue, typically paired with a successful
    /// [`reserve_charger`](Self::reserve_charger) call.
    pub fn dequeue_front(&mut self) -> Option<VehicleId> {
        self.queue.pop_front()
    }

    pub fn queue_iter(&self) -> impl Iterator<Item = &VehicleId> {
        self.queue.iter()
    }
}

/// Given the minimum chargers-per-station and minimum station count, grows
/// the station count to the nearest perfect square divisible by 4, and
/// returns `(total_chargers, station_count)`.
///
/// Grounded on `cities.py`'s `set_max_chargers_stations`.
fn grow_to_perfect_square_div4(min_plugs: u32, min_stations: u32) -> (u32, u32) {
    let mut d = min_stations.max(1);
    loop {
        let sqrt = (d as f64).sqrt().round() as u32;
        if d % 4 == 0 && sqrt * sqrt == d {
            break;
        }
        d += 1;
    }
    (min_plugs * d, d)
}

/// The placed stations plus a total mapping from every drivable cell to its
/// responsible station.
#[derive(Debug, Clone)]
pub struct StationPlacement {
    stations: Vec<Station>,
    service_area: HashMap<CellId, StationId>,
}

impl StationPlacement {
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station_mut(&mut self, id: StationId) -> Option<&mut Station> {
        self.stations.iter_mut().find(|s| s.id == id)
    }

    pub fn service_area_for(&self, cell: CellId) -> Option<StationId> {
        self.service_area.get(&cell).copied()
    }
}

/// Places stations over `grid` per `layout`, using `min_plugs_per_station`
/// and `min_num_stations` from the frozen configuration.
///
/// # Errors
/// Returns [`PlacementError::Infeasible`] when the grid has no cell of the
/// type a layout anchors stations to (e.g. no avenue cell at all).
pub fn place_stations(
    grid: &Grid,
    layout: Layout,
    min_plugs_per_station: u32,
    min_num_stations: u32,
) -> Result<StationPlacement, PlacementError> {
    match layout {
        Layout::Central => place_central(grid, min_plugs_per_station, min_num_stations),
        Layout::Four => place_four(grid, min_plugs_per_station, min_num_stations),
        Layout::Distributed => place_distributed(grid, min_plugs_per_station, min_num_stations),
    }
}

fn place_central(
    grid: &Grid,
    min_plugs: u32,
    min_stations: u32,
) -> Result<StationPlacement, PlacementError> {
    let (total_chargers, _) = grow_to_perfect_square_div4(min_plugs, min_stations);
    let side = grid.side();
    let center_cell = grid.id_for_coords(side / 2, side / 2);
    let anchor = city::nearest_cell_of_type(grid, CellType::Avenue, center_cell)
        .ok_or(PlacementError::Infeasible)?;

    let station = Station::new(0, anchor, total_chargers);
    let service_area = grid.iter().map(|c| (c.get_id(), 0)).collect();
    Ok(StationPlacement { stations: vec![station], service_area })
}

fn place_four(
    grid: &Grid,
    min_plugs: u32,
    min_stations: u32,
) -> Result<StationPlacement, PlacementError> {
    let (total_chargers, _) = grow_to_perfect_square_div4(min_plugs, min_stations);
    let per_station = total_chargers / 4;
    let side = grid.side();
    let half = side / 2;

    // Quadrant centers: NW, NE, SW, SE.
    let quadrant_centers = [
        (half / 2, half / 2),
        (half + half / 2, half / 2),
        (half / 2, half + half / 2),
        (half + half / 2, half + half / 2),
    ];

    let mut stations = Vec::with_capacity(4);
    for (i, &(cx, cy)) in quadrant_centers.iter().enumerate() {
        let near = grid.id_for_coords(cx % side, cy % side);
        let anchor = city::nearest_cell_of_type(grid, CellType::Avenue, near)
            .ok_or(PlacementError::Infeasible)?;
        stations.push(Station::new(i as StationId, anchor, per_station));
    }

    let mut service_area = HashMap::with_capacity(grid.len());
    for cell in grid.iter() {
        let (x, y) = cell.coords();
        let quadrant = match (x < half, y < half) {
            (true, true) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (false, false) => 3,
        };
        service_area.insert(cell.get_id(), quadrant);
    }

    Ok(StationPlacement { stations, service_area })
}

fn place_distributed(
    grid: &Grid,
    min_plugs: u32,
    min_stations: u32,
) -> Result<StationPlacement, PlacementError> {
    let (_, station_count) = grow_to_perfect_square_div4(min_plugs, min_stations);
    let per_axis = (station_count as f64).sqrt().round() as u32;
    let side = grid.side();
    let lattice_step = side / per_axis.max(1);

    let mut stations = Vec::with_capacity(station_count as usize);
    for i in 0..per_axis {
        for j in 0..per_axis {
            let near = grid.id_for_coords(
                (i * lattice_step + lattice_step / 2) % side,
                (j * lattice_step + lattice_step / 2) % side,
            );
            let anchor = city::nearest_cell_of_type(grid, CellType::Street, near)
                .ok_or(PlacementError::Infeasible)?;
            let id = (i * per_axis + j) as StationId;
            stations.push(Station::new(id, anchor, min_plugs));
        }
    }

    if stations.is_empty() {
        return Err(PlacementError::Infeasible);
    }

    let mut service_area = HashMap::with_capacity(grid.len());
    for cell in grid.iter() {
        let nearest_station = stations
            .iter()
            .min_by_key(|s| grid.lattice_distance(cell.get_id(), s.cell()))
            .expect("stations is non-empty, checked above")
            .id();
        service_area.insert(cell.get_id(), nearest_station);
    }

    Ok(StationPlacement { stations, service_area })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_to_perfect_square_div4() {
        assert_eq!(grow_to_perfect_square_div4(4, 1), (16, 4));
        assert_eq!(grow_to_perfect_square_div4(4, 4), (16, 4));
        assert_eq!(grow_to_perfect_square_div4(4, 5), (64, 16));
    }

    #[test]
    fn test_reserve_and_release_charger() {
        let mut station = Station::new(0, 0, 2);
        assert!(station.reserve_charger());
        assert!(station.reserve_charger());
        assert!(!station.reserve_charger());
        assert_eq!(station.available(), 0);
        station.release_charger();
        assert_eq!(station.available(), 1);
    }

    #[test]
    fn test_occupation_counts_queue_and_chargers_in_use() {
        let mut station = Station::new(0, 0, 3);
        station.reserve_charger();
        station.enqueue(7);
        station.enqueue(9);
        assert_eq!(station.occupation(), 3);
    }

    #[test]
    fn test_central_placement_covers_whole_grid() {
        let (grid, placement) = crate::utils::test_grids::tiny_grid_with_stations();
        assert_eq!(placement.stations().len(), 1);
        for cell in grid.iter() {
            assert!(placement.service_area_for(cell.get_id()).is_some());
        }
    }

    #[test]
    fn test_four_placement_has_four_stations() {
        let grid = crate::utils::test_grids::tiny_grid();
        let placement = place_stations(&grid, Layout::Four, 4, 1).unwrap();
        assert_eq!(placement.stations().len(), 4);
    }
}
