//! # Grid Module
//!
//! The toroidal cellular grid that the rest of the simulator drives traffic
//! over: an arena of [`cell::Cell`]s addressed by dense [`cell::CellId`]
//! indices, wired together into a directed, cyclic graph by the city
//! builder.
//!
//! ## Key Components
//!
//! - [`cell::Cell`] / [`cell::CellBuilder`]: a single drivable cell: its
//!   coordinate, [`zones::CellType`], successors, priority successors, and
//!   priority predecessors.
//! - [`road_network::Grid`]: the arena owning every cell and exposing
//!   toroidal lattice distance.
//!
//! ## Priority and yielding
//!
//! A cell's `prio_successors` are the "keep in lane" moves: straight ahead
//! on the same road segment, or the circulating direction of a roundabout.
//! Every other successor requires yielding: the entering vehicle must first
//! confirm that every cell in the target's `prio_predecessors` is free, not
//! just the target cell itself. This is what lets a car already travelling
//! straight through an intersection win over one merging into its lane.
//!
//! ## Toroidal wraparound
//!
//! The grid wraps on both axes: an avenue that reaches `(N-1, y)` connects
//! back to `(0, y)`. [`road_network::Grid::lattice_distance`] accounts for
//! this when used as the A* heuristic.
pub mod cell;
pub mod road_network;
pub mod zones;
