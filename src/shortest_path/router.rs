use crate::grid::cell::CellId;
use crate::grid::road_network::Grid;
use crate::shortest_path::{heuristics::heuristic, path::Path};
use indexmap::IndexMap;
use std::{cmp::Ordering, collections::BinaryHeap, fmt};

/// Errors produced while computing a route over the cell graph.
#[derive(Debug)]
pub enum RoutingError {
    NoPathFound { start_id: CellId, end_id: CellId },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::NoPathFound { start_id, end_id } => write!(
                f,
                "no path found between cell {} and cell {}",
                start_id, end_id
            ),
        }
    }
}

impl std::error::Error for RoutingError {}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    cell: CellId,
    f_cost: f64,
    // Monotonically increasing insertion counter, used to break f-cost ties
    // in favor of earlier-discovered nodes (stable ordering).
    order: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.order == other.order
    }
}
impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // BinaryHeap is a max-heap; reverse the f-cost comparison to get a min-heap,
    // and break ties by preferring the earlier-inserted node.
    fn cmp(&self, other: &Self) -> Ordering {
        match other.f_cost.partial_cmp(&self.f_cost).unwrap_or(Ordering::Equal) {
            Ordering::Equal => other.order.cmp(&self.order),
            ord => ord,
        }
    }
}

/// Edge cost `g(u -> v) = cost_for(v.cell_type) + (0 if v is a priority
/// successor of u else 1)`.
fn edge_cost(grid: &Grid, from: CellId, to: CellId) -> f64 {
    let from_cell = grid.get_cell(from).expect("from cell must exist");
    let to_cell = grid.get_cell(to).expect("to cell must exist");
    let lane_change_penalty = if from_cell.is_prio_successor(to) { 0.0 } else { 1.0 };
    to_cell.get_cell_type().edge_cost() + lane_change_penalty
}

/// A* search over the cell graph from `start` to `goal`.
///
/// Returns a [`Path`] excluding `start`, or [`RoutingError::NoPathFound`] if
/// the open set is exhausted. Callers in the stepping engine treat a failed
/// search as "stay put this tick" rather than propagating the error.
///
/// # Example
/// ```rust
/// use ev_grid_sim::grid::cell::Cell;
/// use ev_grid_sim::grid::road_network::Grid;
/// use ev_grid_sim::grid::zones::CellType;
/// use ev_grid_sim::shortest_path::router::shortest_path;
///
/// let mut grid = Grid::new(4);
/// grid.add_cell(Cell::new(0, 0, 0).with_cell_type(CellType::Avenue).with_successors(vec![1]).with_prio_successors(vec![1]).build());
/// grid.add_cell(Cell::new(1, 1, 0).with_cell_type(CellType::Avenue).build());
///
/// let path = shortest_path(&grid, 0, 1).unwrap();
/// assert_eq!(path.peek(), Some(1));
/// ```
pub fn shortest_path(grid: &Grid, start: CellId, goal: CellId) -> Result<Path, RoutingError> {
    if start == goal {
        return Ok(Path::empty());
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: IndexMap<CellId, CellId> = IndexMap::new();
    let mut g_score: IndexMap<CellId, f64> = IndexMap::new();
    let mut order_counter: u64 = 0;

    g_score.insert(start, 0.0);
    open_set.push(OpenEntry {
        cell: start,
        f_cost: heuristic(grid, start, goal),
        order: order_counter,
    });

    let mut visited = std::collections::HashSet::new();

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return Ok(reconstruct_path(&came_from, start, goal, g_score[&goal]));
        }
        if !visited.insert(current.cell) {
            continue;
        }

        let current_g = g_score[&current.cell];
        let current_cell = grid.get_cell(current.cell).expect("cell must exist");

        for &neighbor in current_cell.successors() {
            let tentative_g = current_g + edge_cost(grid, current.cell, neighbor);
            let best_known = *g_score.get(&neighbor).unwrap_or(&f64::INFINITY);
            if tentative_g < best_known {
                g_score.insert(neighbor, tentative_g);
                came_from.insert(neighbor, current.cell);
                order_counter += 1;
                open_set.push(OpenEntry {
                    cell: neighbor,
                    f_cost: tentative_g + heuristic(grid, neighbor, goal),
                    order: order_counter,
                });
            }
        }
    }

    Err(RoutingError::NoPathFound { start_id: start, end_id: goal })
}

fn reconstruct_path(
    came_from: &IndexMap<CellId, CellId>,
    start: CellId,
    goal: CellId,
    cost: f64,
) -> Path {
    let mut ordered = vec![goal];
    let mut current = goal;
    while current != start {
        current = came_from[&current];
        if current != start {
            ordered.push(current);
        }
    }
    ordered.reverse();
    Path::new(ordered, cost)
}

/// Sums `edge_cost` along an ordered (start-excluded) sequence of cells
/// starting at `from`, used by [`repair`] to re-price a spliced path.
fn path_cost(grid: &Grid, from: CellId, ordered_steps: &[CellId]) -> f64 {
    let mut total = 0.0;
    let mut prev = from;
    for &step in ordered_steps {
        total += edge_cost(grid, prev, step);
        prev = step;
    }
    total
}

/// Incremental path repair for a vehicle that diverted from its planned
/// route (a forced lane change, or a blocked keep-in-lane move that took an
/// alternative).
///
/// If the remaining path has more than one step, only the stretch from the
/// vehicle's current cell back onto its old second-to-top cell is
/// recomputed; the remainder of the old plan (from there to `target`) is
/// kept untouched. If at most one step remained, a full search to `target`
/// is run instead. A failed repair search falls back to a full search to
/// `target`; if that also fails, an empty path is returned (the engine will
/// retry on a later tick).
pub fn repair(grid: &Grid, old_path: &Path, current_cell: CellId, target: CellId) -> Path {
    if old_path.len() <= 1 {
        return shortest_path(grid, current_cell, target).unwrap_or_else(|_| Path::empty());
    }

    let Some(sub_target) = old_path.peek_second() else {
        return shortest_path(grid, current_cell, target).unwrap_or_else(|_| Path::empty());
    };

    let sub_path = match shortest_path(grid, current_cell, sub_target) {
        Ok(p) => p,
        Err(_) => return shortest_path(grid, current_cell, target).unwrap_or_else(|_| Path::empty()),
    };

    // old_path ordered (nearest-first): [top, second_to_top, ...remainder-to-goal]
    let old_ordered = old_path.remaining();
    let remainder = &old_ordered[2..];

    let mut combined_ordered = sub_path.remaining();
    combined_ordered.extend_from_slice(remainder);

    let cost = path_cost(grid, current_cell, &combined_ordered);
    Path::new(combined_ordered, cost)
}
