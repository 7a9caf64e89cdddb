use crate::grid::cell::{Cell, CellId};

/// `Grid` is the toroidal square arena of drivable [`Cell`]s that make up the city.
///
/// Cells are addressed by dense [`CellId`] indices rather than owning
/// references, so the (cyclic, by construction) adjacency lists inside each
/// cell never form an ownership cycle. `side` is the grid's edge length in
/// cells; lattice distance wraps around both axes.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Cell>,
    side: u32,
}

impl Grid {
    /// Creates an empty grid of the given toroidal side length.
    ///
    /// # Example
    /// ```rust
    /// use ev_grid_sim::grid::road_network::Grid;
    /// let grid = Grid::new(12);
    /// assert_eq!(grid.side(), 12);
    /// ```
    pub fn new(side: u32) -> Self {
        Grid {
            cells: Vec::new(),
            side,
        }
    }

    /// Side length of the toroidal grid, in cells.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Adds a cell to the grid.
    ///
    /// Cells are expected to be inserted in `CellId` order (`0, 1, 2, ...`)
    /// so that `get_cell` can use direct indexing; this is how the city
    /// builder materializes the arena.
    pub fn add_cell(&mut self, cell: Cell) {
        let id = cell.get_id() as usize;
        if id >= self.cells.len() {
            self.cells.resize_with(id + 1, || Cell::new(0, 0, 0).build());
        }
        self.cells[id] = cell;
    }

    pub fn get_cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id as usize)
    }

    pub fn get_cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id as usize)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over all cells in `CellId` order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Toroidal (wraparound) Manhattan distance between two cells, per the
    /// grid's lattice: `min(|dx|, N-|dx|) + min(|dy|, N-|dy|)`.
    pub fn lattice_distance(&self, a: CellId, b: CellId) -> u32 {
        let (ax, ay) = self.cells[a as usize].coords();
        let (bx, by) = self.cells[b as usize].coords();
        toroidal_delta(ax, bx, self.side) + toroidal_delta(ay, by, self.side)
    }

    /// `CellId` for grid coordinate `(x, y)` under row-major `x * side + y`
    /// addressing used throughout the city builder.
    pub fn id_for_coords(&self, x: u32, y: u32) -> CellId {
        x * self.side + y
    }
}

fn toroidal_delta(a: u32, b: u32, side: u32) -> u32 {
    let d = a.abs_diff(b);
    d.min(side - d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::zones::CellType;

    fn grid_with_line() -> Grid {
        let mut grid = Grid::new(4);
        for i in 0..4u32 {
            grid.add_cell(
                Cell::new(i, i, 0)
                    .with_cell_type(CellType::Avenue)
                    .build(),
            );
        }
        grid
    }

    #[test]
    fn test_lattice_distance_wraps() {
        let grid = grid_with_line();
        // x=0 and x=3 are adjacent on a side-4 torus.
        assert_eq!(grid.lattice_distance(0, 3), 1);
        assert_eq!(grid.lattice_distance(0, 2), 2);
    }

    #[test]
    fn test_add_and_get_cell() {
        let grid = grid_with_line();
        assert_eq!(grid.len(), 4);
        assert!(grid.get_cell(2).is_some());
        assert!(grid.get_cell(99).is_none());
    }
}
