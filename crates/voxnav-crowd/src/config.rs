//! Avoidance and agent adapter parameters

use glam::Vec2;
use voxnav_common::{Error, Result};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::proximity_grid::DEFAULT_CELL_SIZE;

/// Parameters given to every agent registered with the simulator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct AgentDefaults {
    /// Maximum center-to-center distance to agents taken into account
    pub neighbor_dist: f32,
    pub max_neighbors: usize,
    /// How far ahead (in seconds) velocities are kept safe from other agents
    pub time_horizon: f32,
    /// How far ahead (in seconds) velocities are kept safe from obstacles
    pub time_horizon_obst: f32,
    pub radius: f32,
    pub max_speed: f32,
    pub velocity: Vec2,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            neighbor_dist: 128.0,
            max_neighbors: 32,
            time_horizon: 1.5,
            time_horizon_obst: 0.1,
            radius: 16.0,
            max_speed: 100.0,
            velocity: Vec2::ZERO,
        }
    }
}

impl AgentDefaults {
    pub fn validate(&self) -> Result<()> {
        if !(self.neighbor_dist.is_finite() && self.neighbor_dist >= 0.0) {
            return Err(Error::Configuration(format!(
                "neighbor_dist must be non-negative, got {}",
                self.neighbor_dist
            )));
        }
        if !(self.time_horizon > 0.0 && self.time_horizon_obst > 0.0) {
            return Err(Error::Configuration(format!(
                "time horizons must be positive, got {} and {}",
                self.time_horizon, self.time_horizon_obst
            )));
        }
        if !(self.radius >= 0.0 && self.max_speed >= 0.0) {
            return Err(Error::Configuration(format!(
                "radius and max_speed must be non-negative, got {} and {}",
                self.radius, self.max_speed
            )));
        }
        Ok(())
    }
}

/// Simulator-wide settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct SimulatorConfig {
    /// Seconds advanced per step
    pub time_step: f32,
    /// Number of agent ranges each phase of a step is split into
    pub num_workers: usize,
    /// Cell size of the agent proximity grid
    pub agent_cell_size: f32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            time_step: 0.1,
            num_workers: 1,
            agent_cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(Error::Configuration(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        if !(self.agent_cell_size > 0.0) {
            return Err(Error::Configuration(format!(
                "agent_cell_size must be positive, got {}",
                self.agent_cell_size
            )));
        }
        Ok(())
    }
}

/// Which direction a navigation agent turns to face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum AlignmentMode {
    /// Keep the current rotation
    #[default]
    None,
    CurrentVelocity,
    DesiredVelocity,
    NextWaypoint,
    FinalWaypoint,
    /// The destination passed to `set_destination`
    Target,
}

/// Navigation agent behavior
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct AgentAdapterConfig {
    pub speed: f32,
    pub radius: f32,
    /// Facing error (in degrees) at which forward movement starts; `None` never gates
    pub required_forward_alignment_degrees: Option<f32>,
    pub alignment_mode: AlignmentMode,
    /// Seconds after which the same destination is re-planned
    pub repath_interval: f32,
    /// Distance at which the final waypoint counts as reached
    pub arrival_distance: f32,
    /// Distance within which an intermediate waypoint may be skipped once passed
    pub corner_distance: f32,
    /// Distance at which any waypoint counts as reached
    pub snap_distance: f32,
    /// Mark each new path in the navmesh congestion map
    pub apply_congestion: bool,
    pub congestion_value: f32,
}

impl Default for AgentAdapterConfig {
    fn default() -> Self {
        Self {
            speed: 50.0,
            radius: 8.0,
            required_forward_alignment_degrees: None,
            alignment_mode: AlignmentMode::None,
            repath_interval: 100.0,
            arrival_distance: 16.0,
            corner_distance: 16.0,
            snap_distance: 2.0,
            apply_congestion: false,
            congestion_value: 1000.0,
        }
    }
}

impl AgentAdapterConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.speed >= 0.0 && self.radius >= 0.0) {
            return Err(Error::Configuration(format!(
                "speed and radius must be non-negative, got {} and {}",
                self.speed, self.radius
            )));
        }
        if !(self.repath_interval > 0.0) {
            return Err(Error::Configuration(format!(
                "repath_interval must be positive, got {}",
                self.repath_interval
            )));
        }
        if self.snap_distance > self.corner_distance {
            return Err(Error::Configuration(format!(
                "snap_distance {} exceeds corner_distance {}",
                self.snap_distance, self.corner_distance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AgentDefaults::default().validate().is_ok());
        assert!(SimulatorConfig::default().validate().is_ok());
        assert!(AgentAdapterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let defaults = AgentDefaults {
            time_horizon: 0.0,
            ..Default::default()
        };
        assert!(matches!(defaults.validate(), Err(Error::Configuration(_))));

        let config = SimulatorConfig {
            time_step: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let adapter = AgentAdapterConfig {
            snap_distance: 20.0,
            ..Default::default()
        };
        assert!(adapter.validate().is_err());
    }
}
