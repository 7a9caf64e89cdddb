//! # Agents Module
//!
//! The vehicle agent and its storage. A [`vehicle::Vehicle`] carries no
//! autonomous behavior of its own: the stepping engine drives every state
//! transition and every move, while the agent type only exposes data plus
//! small state-query helpers.
//!
//! ## Key Components
//!
//! - [`vehicle::Vehicle`]: conventional or EV agent, discriminated by an
//!   `Option<EvState>` field rather than a subtype.
//! - [`vehicles_storage::VehiclesStorage`]: insertion-ordered map over the
//!   vehicle population, keyed by [`vehicle::VehicleId`].
pub mod vehicle;
pub mod vehicles_storage;

pub use self::vehicle::{Vehicle, VehicleId};
