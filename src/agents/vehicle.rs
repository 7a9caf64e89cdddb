use crate::grid::cell::CellId;
use crate::shortest_path::path::Path;
use crate::station::StationId;
use std::fmt;

pub type VehicleId = u64;

/// The per-tick state machine described in the stepping engine design.
///
/// Transitions (driven entirely by the engine, never by the vehicle itself):
/// `AT_DEST -> TOWARDS_DEST -> {AT_DEST | TOWARDS_ST | NO_BATTERY}`,
/// `TOWARDS_ST -> {QUEUEING | NO_BATTERY}`, `QUEUEING -> CHARGING`,
/// `CHARGING -> TOWARDS_DEST`. `NoBattery` is terminal for the rest of the
/// repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleState {
    AtDest,
    TowardsDest,
    TowardsStation,
    Queueing,
    Charging,
    NoBattery,
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VehicleState::AtDest => "AT_DEST",
            VehicleState::TowardsDest => "TOWARDS_DEST",
            VehicleState::TowardsStation => "TOWARDS_ST",
            VehicleState::Queueing => "QUEUEING",
            VehicleState::Charging => "CHARGING",
            VehicleState::NoBattery => "NO_BATTERY",
        };
        write!(f, "{}", label)
    }
}

/// Per-trip and per-repetition latency counters, sampled by the Metrics
/// Recorder at each measurement tick.
#[derive(Debug, Clone, Default)]
pub struct LatencyHistories {
    pub idle: Vec<u32>,
    pub seeking: Vec<u32>,
    pub queueing: Vec<u32>,
    pub charging: Vec<u32>,
}

/// EV-only state: battery level, charging target, and the reserved station.
#[derive(Debug, Clone)]
pub struct EvState {
    /// Steps of travel remaining on the current charge.
    pub battery: i64,
    /// Battery level (in steps) the vehicle will charge up to once plugged in.
    pub desired_charge: i64,
    /// Station reserved while `TOWARDS_ST`, `QUEUEING`, or `CHARGING`.
    pub station: Option<StationId>,
    pub seeking: u32,
    pub queueing: u32,
}

/// An agent in the simulation: a conventional vehicle (`ev: None`) or an EV
/// (`ev: Some(..)`).
///
/// Grounded on `src/models/vehicle.py`'s `Vehicle`/`ElectricVehicle` split,
/// re-expressed as a single struct with an `Option<EvState>` field rather
/// than subclassing, since the engine dispatches on vehicle kind via pattern
/// matching rather than virtual calls.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub cell: CellId,
    pub destination: CellId,
    pub path: Path,
    pub state: VehicleState,
    /// Steps remaining at the current destination, or while charging.
    pub wait_time: u32,
    /// Set when the vehicle was forced off its planned route; the engine
    /// repairs the path on its next move rather than replanning from scratch.
    pub recompute_path: bool,
    pub ev: Option<EvState>,
    pub histories: LatencyHistories,
}

impl Vehicle {
    /// Starts building a new vehicle parked at `cell`, initially `AT_DEST`.
    ///
    /// # Example
    /// ```rust
    /// use ev_grid_sim::agents::vehicle::Vehicle;
    ///
    /// let vehicle = Vehicle::new(1, 0).with_wait_time(5).build();
    /// assert_eq!(vehicle.cell, 0);
    /// ```
    pub fn new(id: VehicleId, cell: CellId) -> VehicleBuilder {
        VehicleBuilder {
            vehicle: Vehicle {
                id,
                cell,
                destination: cell,
                path: Path::empty(),
                state: VehicleState::AtDest,
                wait_time: 0,
                recompute_path: false,
                ev: None,
                histories: LatencyHistories::default(),
            },
        }
    }

    pub fn is_electric(&self) -> bool {
        self.ev.is_some()
    }

    /// Whether the vehicle currently holds a cell it could be asked to move
    /// from. `AT_DEST`, `CHARGING`, `QUEUEING`, and `NO_BATTERY` vehicles are
    /// invisible to traffic per the Vehicle invariants.
    pub fn is_in_traffic(&self) -> bool {
        matches!(self.state, VehicleState::TowardsDest | VehicleState::TowardsStation)
    }
}

/// Builder for [`Vehicle`], following the crate-wide construction idiom.
pub struct VehicleBuilder {
    vehicle: Vehicle,
}

impl VehicleBuilder {
    pub fn with_wait_time(mut self, wait_time: u32) -> Self {
        self.vehicle.wait_time = wait_time;
        self
    }

    pub fn with_destination(mut self, destination: CellId) -> Self {
        self.vehicle.destination = destination;
        self
    }

    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.vehicle.state = state;
        self
    }

    pub fn as_electric(mut self, battery: i64) -> Self {
        self.vehicle.ev =
            Some(EvState { battery, desired_charge: battery, station: None, seeking: 0, queueing: 0 });
        self
    }

    pub fn build(self) -> Vehicle {
        self.vehicle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_vehicle_defaults_to_at_dest() {
        let v = Vehicle::new(1, 5).build();
        assert_eq!(v.state, VehicleState::AtDest);
        assert_eq!(v.destination, 5);
        assert!(!v.is_electric());
        assert!(!v.is_in_traffic());
    }

    #[test]
    fn test_electric_vehicle_carries_ev_state() {
        let v = Vehicle::new(2, 0).as_electric(120).build();
        assert!(v.is_electric());
        assert_eq!(v.ev.as_ref().unwrap().battery, 120);
    }

    #[test]
    fn test_towards_dest_is_in_traffic() {
        let v = Vehicle::new(3, 0).with_state(VehicleState::TowardsDest).build();
        assert!(v.is_in_traffic());
    }
}
