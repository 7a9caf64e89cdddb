use crate::grid::cell::CellId;
use crate::grid::road_network::Grid;

/// Lattice (toroidal Manhattan) distance heuristic used by A*.
///
/// Admissible because the cheapest possible edge (an avenue-to-avenue
/// keep-in-lane move) costs `1.0`, the same weight as a unit lattice step,
/// so no path can ever cost less than its lattice distance.
///
/// # Example
/// ```rust
/// use ev_grid_sim::grid::cell::Cell;
/// use ev_grid_sim::grid::road_network::Grid;
/// use ev_grid_sim::grid::zones::CellType;
/// use ev_grid_sim::shortest_path::heuristics::heuristic;
///
/// let mut grid = Grid::new(4);
/// grid.add_cell(Cell::new(0, 0, 0).with_cell_type(CellType::Avenue).build());
/// grid.add_cell(Cell::new(1, 3, 0).with_cell_type(CellType::Avenue).build());
/// assert_eq!(heuristic(&grid, 0, 1), 1.0);
/// ```
pub fn heuristic(grid: &Grid, start: CellId, goal: CellId) -> f64 {
    grid.lattice_distance(start, goal) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell::Cell;
    use crate::grid::zones::CellType;

    #[test]
    fn test_heuristic_matches_lattice_distance() {
        let mut grid = Grid::new(6);
        grid.add_cell(Cell::new(0, 0, 0).with_cell_type(CellType::Avenue).build());
        grid.add_cell(Cell::new(1, 4, 5).with_cell_type(CellType::Avenue).build());
        assert_eq!(heuristic(&grid, 0, 1) as u32, grid.lattice_distance(0, 1));
    }
}
