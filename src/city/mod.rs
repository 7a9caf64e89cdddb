//! # City Builder
//!
//! Builds the toroidal road [`Grid`] by tiling four atomic patterns around a
//! periodically repeating cross of avenues and roundabouts: an N-S avenue
//! arm, an E-W avenue arm, a roundabout at their intersection, and a
//! residential block filling each of the four quadrants between arms.
//!
//! Grounded on `simtravel/models/cities.py`'s `SquareCity`: that
//! implementation stitches together fixed 6x6 pixel tiles (`tile_AV_NS`,
//! `tile_AV_EW`, `tile_NG`, `tile_RB`); this builder keeps the same four
//! roles and composition order but works at single-cell resolution so the
//! builder parameters (`roundabout_side`, `avenue_length`, `scale`) map
//! directly onto cell counts, matching this crate's `N =
//! 2·scale·(roundabout_side + 2·avenue_length)` sizing rule exactly rather
//! than approximately.
use crate::grid::cell::{Cell, CellId};
use crate::grid::road_network::Grid;
use crate::grid::zones::CellType;
use std::fmt;

/// Setup-time errors shared by city construction and station placement.
#[derive(Debug)]
pub enum PlacementError {
    /// `roundabout_side < 2`, `avenue_length < 1`, or `scale < 1` would
    /// produce a grid with no interior ring or no avenue arm to circulate.
    GridTooSmall { roundabout_side: u32, avenue_length: u32, scale: u32 },
    /// No drivable cell exists in a station's target region.
    Infeasible,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::GridTooSmall { roundabout_side, avenue_length, scale } => write!(
                f,
                "roundabout_side={}, avenue_length={}, scale={} would produce a degenerate grid (roundabout_side >= 2, avenue_length >= 1, scale >= 1 required)",
                roundabout_side, avenue_length, scale
            ),
            PlacementError::Infeasible => write!(f, "no drivable cell exists in the requested station region"),
        }
    }
}

impl std::error::Error for PlacementError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    fn step(self, x: u32, y: u32, side: u32) -> (u32, u32) {
        match self {
            Direction::North => (x, (y + side - 1) % side),
            Direction::South => (x, (y + 1) % side),
            Direction::East => ((x + 1) % side, y),
            Direction::West => ((x + side - 1) % side, y),
        }
    }
}

/// A successor edge with its priority flag, in local (pre-id) form.
struct PlannedEdge {
    to: (u32, u32),
    priority: bool,
}

struct CellPlan {
    cell_type: CellType,
    edges: Vec<PlannedEdge>,
}

/// Builds a city [`Grid`] from the three tile-composition parameters.
///
/// # Example
/// ```rust
/// use ev_grid_sim::city::CityBuilder;
///
/// let grid = CityBuilder::new(4, 3, 1).build().unwrap();
/// assert_eq!(grid.side(), 2 * 1 * (4 + 2 * 3));
/// ```
pub struct CityBuilder {
    roundabout_side: u32,
    avenue_length: u32,
    scale: u32,
}

impl CityBuilder {
    /// Parameters are taken as given; degeneracy is reported by [`Self::build`]
    /// rather than silently clamped.
    pub fn new(roundabout_side: u32, avenue_length: u32, scale: u32) -> Self {
        CityBuilder { roundabout_side, avenue_length, scale }
    }

    /// Period of one macro-block (avenue arm, roundabout, avenue arm) along
    /// a single axis.
    fn period(&self) -> u32 {
        self.roundabout_side + 2 * self.avenue_length
    }

    /// Grid side length: `2 * scale * period`.
    fn side(&self) -> u32 {
        2 * self.scale * self.period()
    }

    /// Materializes the full [`Grid`]: classifies every cell, wires up
    /// successors and priority successors, then back-fills
    /// `prio_predecessors` from the priority edges just computed.
    ///
    /// # Errors
    /// Returns [`PlacementError::GridTooSmall`] when `roundabout_side < 2`,
    /// `avenue_length < 1`, or `scale < 1`, since such a grid would have no
    /// interior ring or no avenue arm to circulate on.
    pub fn build(self) -> Result<Grid, PlacementError> {
        if self.roundabout_side < 2 || self.avenue_length < 1 || self.scale < 1 {
            return Err(PlacementError::GridTooSmall {
                roundabout_side: self.roundabout_side,
                avenue_length: self.avenue_length,
                scale: self.scale,
            });
        }

        let side = self.side();
        let mut grid = Grid::new(side);

        for x in 0..side {
            for y in 0..side {
                let id = grid.id_for_coords(x, y);
                let plan = self.plan_cell(x, y, side);
                let successors: Vec<CellId> =
                    plan.edges.iter().map(|e| grid.id_for_coords(e.to.0, e.to.1)).collect();
                let prio_successors: Vec<CellId> = plan
                    .edges
                    .iter()
                    .filter(|e| e.priority)
                    .map(|e| grid.id_for_coords(e.to.0, e.to.1))
                    .collect();
                grid.add_cell(
                    Cell::new(id, x, y)
                        .with_cell_type(plan.cell_type)
                        .with_successors(successors)
                        .with_prio_successors(prio_successors)
                        .build(),
                );
            }
        }

        for source_id in 0..grid.len() as CellId {
            let prio: Vec<CellId> =
                grid.get_cell(source_id).expect("cell must exist").prio_successors().to_vec();
            for target in prio {
                if let Some(target_cell) = grid.get_cell_mut(target) {
                    target_cell.push_prio_predecessor(source_id);
                }
            }
        }

        Ok(grid)
    }

    /// Classifies a single `(x, y)` cell and computes its outgoing edges,
    /// in local (pre-id) coordinates. `side` is the already-computed grid
    /// side length (avoids recomputing `self.side()` per cell).
    fn plan_cell(&self, x: u32, y: u32, side: u32) -> CellPlan {
        let p = self.period();
        let lx = x % p;
        let ly = y % p;
        let center = p / 2;
        let half = self.roundabout_side / 2;
        let r0 = center - half;
        let r1 = r0 + self.roundabout_side;
        let in_ra = |v: u32| v >= r0 && v < r1;

        let ns_col = |v: u32| v == center - 1 || v == center;
        let ew_row = |v: u32| v == center - 1 || v == center;

        if in_ra(lx) && in_ra(ly) {
            return self.plan_roundabout_cell(x, y, side, lx, ly, r0, r1, center);
        }

        if ns_col(lx) || ew_row(ly) {
            return self.plan_avenue_cell(x, y, side, lx, ly, center);
        }

        self.plan_residential_cell(x, y, side, lx, ly, p, center)
    }

    fn plan_avenue_cell(
        &self,
        x: u32,
        y: u32,
        side: u32,
        lx: u32,
        ly: u32,
        center: u32,
    ) -> CellPlan {
        // Columns carry N-S avenue traffic, rows carry E-W traffic; a cell on
        // both (away from the roundabout, where it would already have been
        // classified as Roundabout) gets both as equally-weighted turns.
        let mut dirs = Vec::new();
        if lx == center - 1 {
            dirs.push(Direction::South);
        }
        if lx == center {
            dirs.push(Direction::North);
        }
        if ly == center - 1 {
            dirs.push(Direction::East);
        }
        if ly == center {
            dirs.push(Direction::West);
        }

        let edges = dirs
            .iter()
            .enumerate()
            .map(|(i, &dir)| PlannedEdge { to: dir.step(x, y, side), priority: i == 0 })
            .collect();

        CellPlan { cell_type: CellType::Avenue, edges }
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_roundabout_cell(
        &self,
        x: u32,
        y: u32,
        side: u32,
        lx: u32,
        ly: u32,
        r0: u32,
        r1: u32,
        center: u32,
    ) -> CellPlan {
        let last = r1 - 1;
        let (nlx, nly) = if ly == r0 && lx < last {
            (lx + 1, ly)
        } else if lx == last && ly < last {
            (lx, ly + 1)
        } else if ly == last && lx > r0 {
            (lx - 1, ly)
        } else {
            (lx, ly - 1)
        };
        let dx = nlx as i64 - lx as i64;
        let dy = nly as i64 - ly as i64;
        let next = (
            (x as i64 + dx).rem_euclid(side as i64) as u32,
            (y as i64 + dy).rem_euclid(side as i64) as u32,
        );

        let mut edges = vec![PlannedEdge { to: next, priority: true }];

        // An exit from the circulating lane onto the avenue is itself a
        // lane change: a vehicle must leave the priority (circulating) lane
        // to take it.
        let exit_dir = if lx == center - 1 {
            Some(Direction::South)
        } else if lx == center {
            Some(Direction::North)
        } else if ly == center - 1 {
            Some(Direction::East)
        } else if ly == center {
            Some(Direction::West)
        } else {
            None
        };

        if let Some(dir) = exit_dir {
            let exit_local = dir.step(lx, ly, side);
            if !(exit_local.0 >= r0 && exit_local.0 < r1 && exit_local.1 >= r0 && exit_local.1 < r1)
            {
                edges.push(PlannedEdge { to: dir.step(x, y, side), priority: false });
            }
        }

        CellPlan { cell_type: CellType::Roundabout, edges }
    }

    fn plan_residential_cell(
        &self,
        x: u32,
        y: u32,
        side: u32,
        lx: u32,
        ly: u32,
        p: u32,
        center: u32,
    ) -> CellPlan {
        let (qx0, qx1) = if lx < center - 1 { (0, center - 1) } else { (center + 1, p) };
        let (qy0, qy1) = if ly < center - 1 { (0, center - 1) } else { (center + 1, p) };
        let mid_x = qx0 + (qx1 - qx0) / 2;
        let mid_y = qy0 + (qy1 - qy0) / 2;

        let on_vertical_street = lx == mid_x;
        let on_horizontal_street = ly == mid_y;

        if !on_vertical_street && !on_horizontal_street {
            return CellPlan { cell_type: CellType::House, edges: Vec::new() };
        }

        let mut dirs = Vec::new();
        if on_vertical_street {
            dirs.push(Direction::South);
        }
        if on_horizontal_street {
            dirs.push(Direction::East);
        }

        let edges = dirs
            .iter()
            .enumerate()
            .map(|(i, &dir)| PlannedEdge { to: dir.step(x, y, side), priority: i == 0 })
            .collect();

        CellPlan { cell_type: CellType::Street, edges }
    }
}

/// Nearest cell of `cell_type` to `near`, by lattice distance. Used to place
/// the `central`/`four` layouts' stations on an avenue and the `distributed`
/// layout's stations on a street.
pub fn nearest_cell_of_type(grid: &Grid, cell_type: CellType, near: CellId) -> Option<CellId> {
    grid.iter()
        .filter(|c| c.get_cell_type() == cell_type)
        .map(|c| c.get_id())
        .min_by_key(|&id| grid.lattice_distance(near, id))
}

/// All cells whose coordinates fall inside the closed-open rectangle
/// `[x0, x1) x [y0, y1)`, used by station-placement quadrant queries.
pub fn cells_in_rect(grid: &Grid, x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<CellId> {
    grid.iter()
        .filter(|c| {
            let (x, y) = c.coords();
            x >= x0 && x < x1 && y >= y0 && y < y1
        })
        .map(|c| c.get_id())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_side_matches_formula() {
        let builder = CityBuilder::new(4, 3, 2);
        let grid = builder.build().unwrap();
        assert_eq!(grid.side(), 2 * 2 * (4 + 2 * 3));
    }

    #[test]
    fn test_every_cell_classified() {
        let grid = CityBuilder::new(4, 2, 1).build().unwrap();
        assert_eq!(grid.len(), (grid.side() * grid.side()) as usize);
    }

    #[test]
    fn test_house_cells_have_no_successors() {
        let grid = CityBuilder::new(4, 2, 1).build().unwrap();
        for cell in grid.iter() {
            if cell.get_cell_type() == CellType::House {
                assert!(cell.successors().is_empty());
            } else {
                assert!(!cell.successors().is_empty(), "drivable cell with no successors");
            }
        }
    }

    #[test]
    fn test_roundabout_ring_is_a_cycle() {
        let grid = CityBuilder::new(4, 2, 1).build().unwrap();
        let start = grid
            .iter()
            .find(|c| c.get_cell_type() == CellType::Roundabout)
            .expect("at least one roundabout cell")
            .get_id();

        let mut current = start;
        for _ in 0..64 {
            let cell = grid.get_cell(current).expect("cell exists");
            let next = *cell.prio_successors().first().expect("roundabout cell has a priority successor");
            if next == start {
                return;
            }
            current = next;
        }
        panic!("roundabout ring did not cycle back to start within 64 steps");
    }

    #[test]
    fn test_nearest_avenue_cell_is_an_avenue() {
        let grid = CityBuilder::new(4, 2, 1).build().unwrap();
        let any_cell = grid.iter().next().unwrap().get_id();
        let nearest = nearest_cell_of_type(&grid, CellType::Avenue, any_cell).unwrap();
        assert_eq!(grid.get_cell(nearest).unwrap().get_cell_type(), CellType::Avenue);
    }

    #[test]
    fn test_degenerate_parameters_are_rejected() {
        assert!(CityBuilder::new(1, 2, 1).build().is_err());
        assert!(CityBuilder::new(4, 0, 1).build().is_err());
        assert!(CityBuilder::new(4, 2, 0).build().is_err());
    }
}
