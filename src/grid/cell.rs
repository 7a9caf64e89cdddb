use crate::grid::zones::CellType;

/// Dense index into a [`Grid`](crate::grid::road_network::Grid)'s cell arena.
///
/// Cells reference each other only by `CellId`; there is no owning or
/// lifetime-parametrized reference between cells, which keeps the cell graph
/// (cyclic by construction, since toroidal wraparound makes every avenue a
/// loop) free of ownership cycles.
pub type CellId = u32;

/// A single drivable cell of the city grid.
///
/// Immutable after construction except for the `occupied` flag, which the
/// stepping engine flips as part of its two-phase occupancy commit.
#[derive(Debug, Clone)]
pub struct Cell {
    id: CellId,
    x: u32,
    y: u32,
    cell_type: CellType,
    /// Cells reachable in one step from this one.
    successors: Vec<CellId>,
    /// Subset of `successors` that are "keep-in-lane" moves (straight ahead,
    /// same road segment, same direction). On a roundabout this is the
    /// circulating-lane direction.
    prio_successors: Vec<CellId>,
    /// Cells whose occupants must be absent for a *yielding* vehicle to
    /// legally enter this cell (i.e. cells from which this cell is a
    /// priority successor).
    prio_predecessors: Vec<CellId>,
    occupied: bool,
}

impl Cell {
    /// Starts building a new cell at grid coordinate `(x, y)`.
    ///
    /// # Example
    /// ```rust
    /// use ev_grid_sim::grid::cell::Cell;
    /// use ev_grid_sim::grid::zones::CellType;
    ///
    /// let cell = Cell::new(0, 3, 4)
    ///     .with_cell_type(CellType::Avenue)
    ///     .with_successors(vec![1, 2])
    ///     .build();
    /// assert_eq!(cell.get_id(), 0);
    /// ```
    pub fn new(id: CellId, x: u32, y: u32) -> CellBuilder {
        CellBuilder {
            cell: Cell {
                id,
                x,
                y,
                cell_type: CellType::House,
                successors: Vec::new(),
                prio_successors: Vec::new(),
                prio_predecessors: Vec::new(),
                occupied: false,
            },
        }
    }

    pub fn get_id(&self) -> CellId {
        self.id
    }

    pub fn coords(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn get_cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn successors(&self) -> &[CellId] {
        &self.successors
    }

    pub fn prio_successors(&self) -> &[CellId] {
        &self.prio_successors
    }

    pub fn prio_predecessors(&self) -> &[CellId] {
        &self.prio_predecessors
    }

    /// Whether `candidate` is a priority (keep-in-lane) successor of this cell.
    pub fn is_prio_successor(&self, candidate: CellId) -> bool {
        self.prio_successors.contains(&candidate)
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    pub fn set_occupied(&mut self, occupied: bool) {
        self.occupied = occupied;
    }

    pub(crate) fn push_prio_predecessor(&mut self, id: CellId) {
        self.prio_predecessors.push(id);
    }
}

/// Builder for [`Cell`], following the crate-wide `Thing::new(..).with_x(..).build()` idiom.
pub struct CellBuilder {
    cell: Cell,
}

impl CellBuilder {
    pub fn with_cell_type(mut self, cell_type: CellType) -> Self {
        self.cell.cell_type = cell_type;
        self
    }

    pub fn with_successors(mut self, successors: Vec<CellId>) -> Self {
        self.cell.successors = successors;
        self
    }

    pub fn with_prio_successors(mut self, prio_successors: Vec<CellId>) -> Self {
        self.cell.prio_successors = prio_successors;
        self
    }

    pub fn with_prio_predecessors(mut self, prio_predecessors: Vec<CellId>) -> Self {
        self.cell.prio_predecessors = prio_predecessors;
        self
    }

    pub fn build(self) -> Cell {
        self.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_builder_defaults() {
        let cell = Cell::new(7, 1, 2).build();
        assert_eq!(cell.get_id(), 7);
        assert_eq!(cell.coords(), (1, 2));
        assert_eq!(cell.get_cell_type(), CellType::House);
        assert!(cell.successors().is_empty());
        assert!(!cell.is_occupied());
    }

    #[test]
    fn test_prio_successor_membership() {
        let cell = Cell::new(1, 0, 0)
            .with_cell_type(CellType::Avenue)
            .with_successors(vec![2, 3])
            .with_prio_successors(vec![2])
            .build();
        assert!(cell.is_prio_successor(2));
        assert!(!cell.is_prio_successor(3));
    }
}
