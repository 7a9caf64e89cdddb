//! # ev_grid_sim
//!
//! An agent-based, discrete-time cellular-automata simulator of electric and
//! combustion vehicle traffic over a toroidal grid city, with charging
//! stations and a stepping engine that moves every vehicle tick by tick.
//!
//! Start at [`simulation::Simulation`] to build a city, place stations, and
//! run repetitions; [`config::SimulationConfig`] configures the run;
//! [`metrics::Report`] is the output of one repetition.
pub mod agents;
pub mod city;
pub mod config;
pub mod engine;
pub mod grid;
pub mod metrics;
pub mod rand_source;
pub mod shortest_path;
pub mod simulation;
pub mod station;
pub mod units;
pub mod utils;
pub mod verbose;
