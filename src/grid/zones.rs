use std::fmt;

/// `CellType` classifies a drivable cell by its role in the road network.
///
/// `HOUSE` cells are never part of the drivable graph: they exist only so the
/// city builder can record which plots are occupied by residential blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    /// Residential plot. Not drivable, never appears in the cell graph.
    House = 0,
    /// Regular road segment ("last mile"). Penalized to push traffic onto avenues.
    Street,
    /// Fast lane connecting roundabouts.
    Avenue,
    /// Circulating lane of a roundabout. Has priority over entering traffic.
    Roundabout,
}

impl CellType {
    /// Routing edge cost for entering a cell of this type, per spec:
    /// `STREET → 4`, `AVENUE → 1`, `ROUNDABOUT → 2`.
    ///
    /// # Panics
    /// Panics if called on `CellType::House`: house cells never enter the
    /// drivable graph and therefore never appear as a routing destination.
    pub fn edge_cost(self) -> f64 {
        match self {
            CellType::Street => 4.0,
            CellType::Avenue => 1.0,
            CellType::Roundabout => 2.0,
            CellType::House => unreachable!("house cells are never part of the drivable graph"),
        }
    }

    /// Whether a station may be anchored on a cell of this type for the
    /// `distributed` layout (street cells only).
    pub fn is_street(self) -> bool {
        matches!(self, CellType::Street)
    }

    /// Whether a station may be anchored on a cell of this type for the
    /// `central`/`four` layouts (avenue cells only).
    pub fn is_avenue(self) -> bool {
        matches!(self, CellType::Avenue)
    }
}

impl fmt::Display for CellType {
    /// # Examples
    /// ```rust
    /// use ev_grid_sim::grid::zones::CellType;
    ///
    /// assert_eq!(format!("{}", CellType::House), "house");
    /// assert_eq!(format!("{}", CellType::Street), "street");
    /// assert_eq!(format!("{}", CellType::Avenue), "avenue");
    /// assert_eq!(format!("{}", CellType::Roundabout), "roundabout");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CellType::House => write!(f, "house"),
            CellType::Street => write!(f, "street"),
            CellType::Avenue => write!(f, "avenue"),
            CellType::Roundabout => write!(f, "roundabout"),
        }
    }
}
