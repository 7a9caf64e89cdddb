//! # Config Module
//!
//! Frozen simulation configuration. A [`SimulationConfig`] is validated once
//! at setup via [`SimulationConfig::build`] and then shared read-only across
//! every repetition, so it can be handed to independent workers without
//! synchronization.
use std::fmt;

/// Station placement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Central,
    Four,
    Distributed,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Central => write!(f, "central"),
            Layout::Four => write!(f, "four"),
            Layout::Distributed => write!(f, "distributed"),
        }
    }
}

/// Setup-time configuration errors. Fatal: surfaced to the host before any
/// tick runs.
#[derive(Debug)]
pub enum ConfigError {
    DensityOutOfRange { field: &'static str, value: f64 },
    NonPositiveDimension { field: &'static str, value: f64 },
    IdleBoundsInverted { lower: f64, upper: f64 },
    FractionOutOfRange { field: &'static str, value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DensityOutOfRange { field, value } => {
                write!(f, "{} must be in [0, 1], got {}", field, value)
            }
            ConfigError::NonPositiveDimension { field, value } => {
                write!(f, "{} must be positive, got {}", field, value)
            }
            ConfigError::IdleBoundsInverted { lower, upper } => write!(
                f,
                "idle_upper_min ({}) must be greater than idle_lower_min ({})",
                upper, lower
            ),
            ConfigError::FractionOutOfRange { field, value } => {
                write!(f, "{} must be in (0, 1), got {}", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Frozen simulation configuration, built via [`SimulationConfigBuilder`].
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub speed_kmh: f64,
    pub cell_length_m: f64,
    pub sim_speed: f64,
    pub battery_kwh: f64,
    pub cs_power_kw: f64,
    pub autonomy_km: f64,
    pub roundabout_side: u32,
    pub avenue_length: u32,
    pub scale: u32,
    pub min_plugs_per_station: u32,
    pub min_num_stations: u32,
    pub battery_threshold: f64,
    pub battery_std: f64,
    pub idle_upper_min: f64,
    pub idle_lower_min: f64,
    pub idle_std: f64,
    pub ev_density: f64,
    pub tf_density: f64,
    pub st_layout: Layout,
    pub total_time_h: f64,
    pub measure_period_min: f64,
    pub repetitions: u32,
    pub results_path: String,
    /// Probability of attempting a lane change when the priority successor
    /// is blocked (or of diverting to the priority lane when yielding).
    /// Exposed as a tunable per Design Notes' open question; default `0.3`.
    pub p_search_alt: f64,
    /// Number of equispaced cumulative heat-map snapshots per repetition.
    pub heat_map_snapshots: u32,
}

impl SimulationConfig {
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }
}

/// Builder for [`SimulationConfig`], validating on [`build`](Self::build).
pub struct SimulationConfigBuilder {
    cfg: SimulationConfig,
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        SimulationConfigBuilder {
            cfg: SimulationConfig {
                speed_kmh: 50.0,
                cell_length_m: 4.5,
                sim_speed: 2.0,
                battery_kwh: 50.0,
                cs_power_kw: 22.0,
                autonomy_km: 135.0,
                roundabout_side: 4,
                avenue_length: 6,
                scale: 1,
                min_plugs_per_station: 4,
                min_num_stations: 4,
                battery_threshold: 0.25,
                battery_std: 0.1,
                idle_upper_min: 30.0,
                idle_lower_min: 5.0,
                idle_std: 0.2,
                ev_density: 0.1,
                tf_density: 0.1,
                st_layout: Layout::Central,
                total_time_h: 1.0,
                measure_period_min: 1.0,
                repetitions: 1,
                results_path: String::from("./results"),
                p_search_alt: 0.3,
                heat_map_snapshots: 3,
            },
        }
    }
}

macro_rules! with_field {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.cfg.$name = value;
            self
        }
    };
}

impl SimulationConfigBuilder {
    with_field!(speed_kmh, f64);
    with_field!(cell_length_m, f64);
    with_field!(sim_speed, f64);
    with_field!(battery_kwh, f64);
    with_field!(cs_power_kw, f64);
    with_field!(autonomy_km, f64);
    with_field!(roundabout_side, u32);
    with_field!(avenue_length, u32);
    with_field!(scale, u32);
    with_field!(min_plugs_per_station, u32);
    with_field!(min_num_stations, u32);
    with_field!(battery_threshold, f64);
    with_field!(battery_std, f64);
    with_field!(idle_upper_min, f64);
    with_field!(idle_lower_min, f64);
    with_field!(idle_std, f64);
    with_field!(ev_density, f64);
    with_field!(tf_density, f64);
    with_field!(st_layout, Layout);
    with_field!(total_time_h, f64);
    with_field!(measure_period_min, f64);
    with_field!(repetitions, u32);
    with_field!(p_search_alt, f64);
    with_field!(heat_map_snapshots, u32);

    pub fn results_path(mut self, path: impl Into<String>) -> Self {
        self.cfg.results_path = path.into();
        self
    }

    /// Validates every invariant from spec §7's `ConfigInvalid` and returns
    /// the frozen configuration.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let cfg = self.cfg;

        for (field, value) in [("ev_density", cfg.ev_density), ("tf_density", cfg.tf_density)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::DensityOutOfRange { field, value });
            }
        }

        for (field, value) in [
            ("speed_kmh", cfg.speed_kmh),
            ("cell_length_m", cfg.cell_length_m),
            ("sim_speed", cfg.sim_speed),
            ("battery_kwh", cfg.battery_kwh),
            ("cs_power_kw", cfg.cs_power_kw),
            ("autonomy_km", cfg.autonomy_km),
            ("roundabout_side", cfg.roundabout_side as f64),
            ("avenue_length", cfg.avenue_length as f64),
            ("scale", cfg.scale as f64),
            ("min_plugs_per_station", cfg.min_plugs_per_station as f64),
            ("min_num_stations", cfg.min_num_stations as f64),
            ("total_time_h", cfg.total_time_h),
            ("measure_period_min", cfg.measure_period_min),
            ("repetitions", cfg.repetitions as f64),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositiveDimension { field, value });
            }
        }

        if cfg.idle_upper_min <= cfg.idle_lower_min {
            return Err(ConfigError::IdleBoundsInverted {
                lower: cfg.idle_lower_min,
                upper: cfg.idle_upper_min,
            });
        }

        for (field, value) in [
            ("battery_threshold", cfg.battery_threshold),
            ("battery_std", cfg.battery_std),
            ("idle_std", cfg.idle_std),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { field, value });
            }
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        assert!(SimulationConfig::builder().build().is_ok());
    }

    #[test]
    fn test_rejects_density_out_of_range() {
        let err = SimulationConfig::builder().ev_density(1.5).build().unwrap_err();
        assert!(matches!(err, ConfigError::DensityOutOfRange { field: "ev_density", .. }));
    }

    #[test]
    fn test_rejects_inverted_idle_bounds() {
        let err = SimulationConfig::builder()
            .idle_lower_min(30.0)
            .idle_upper_min(5.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::IdleBoundsInverted { .. }));
    }
}
