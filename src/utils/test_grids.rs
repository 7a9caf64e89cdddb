//! Small, deterministic city fixtures shared by this crate's tests, built on
//! top of [`CityBuilder`] since every grid in this crate is generated rather
//! than hand-wired cell by cell.
use crate::city::CityBuilder;
use crate::config::Layout;
use crate::grid::road_network::Grid;
use crate::station::{place_stations, StationPlacement};

/// A minimal but non-degenerate city: one roundabout, short avenue arms.
pub fn tiny_grid() -> Grid {
    CityBuilder::new(4, 2, 1).build().expect("tiny_grid parameters are non-degenerate")
}

/// [`tiny_grid`] with a single central station placed on it.
pub fn tiny_grid_with_stations() -> (Grid, StationPlacement) {
    let grid = tiny_grid();
    let stations =
        place_stations(&grid, Layout::Central, 4, 1).expect("tiny_grid always has an avenue cell");
    (grid, stations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_grid_is_non_empty() {
        let grid = tiny_grid();
        assert!(grid.side() > 0);
        assert!(grid.iter().count() > 0);
    }

    #[test]
    fn test_tiny_grid_with_stations_has_at_least_one_station() {
        let (_, stations) = tiny_grid_with_stations();
        assert!(!stations.stations().is_empty());
    }
}
