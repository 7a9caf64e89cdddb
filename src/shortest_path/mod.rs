//! # Shortest Path Module
//!
//! A* pathfinding over the toroidal cell graph, plus incremental path
//! repair for vehicles forced off their planned route.
//!
//! ## Components
//!
//! - [`router::shortest_path`]: A* search with a lattice-distance heuristic
//!   and road-type-weighted edge cost.
//! - [`router::repair`]: re-plans only the stretch between a vehicle's
//!   current cell and the second step of its old plan, keeping the rest of
//!   the route untouched.
//! - [`heuristics::heuristic`]: the admissible lattice-distance heuristic.
//! - [`path::Path`]: the route itself, represented as a pop/push stack.
//!
//! ## Edge cost
//!
//! `g(u -> v) = cost_for(v.cell_type) + (0 if v is a priority successor of u
//! else 1)`. Avenues are cheap (`1`), roundabouts moderate (`2`), streets
//! expensive (`4`); any move that is not a keep-in-lane priority successor
//! carries an additional `+1` lane-change penalty. This is what pushes
//! through-traffic onto avenues and discourages gratuitous lane changes.
//!
//! ## Usage
//!
//! ```rust
//! use ev_grid_sim::grid::cell::Cell;
//! use ev_grid_sim::grid::road_network::Grid;
//! use ev_grid_sim::grid::zones::CellType;
//! use ev_grid_sim::shortest_path::router::shortest_path;
//!
//! let mut grid = Grid::new(4);
//! grid.add_cell(
//!     Cell::new(0, 0, 0)
//!         .with_cell_type(CellType::Avenue)
//!         .with_successors(vec![1])
//!         .with_prio_successors(vec![1])
//!         .build(),
//! );
//! grid.add_cell(Cell::new(1, 1, 0).with_cell_type(CellType::Avenue).build());
//!
//! let path = shortest_path(&grid, 0, 1).unwrap();
//! println!("cost: {}", path.cost());
//! ```
pub mod heuristics;
pub mod path;
pub mod router;
