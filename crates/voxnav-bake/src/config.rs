//! Configuration for the voxel baking process

use voxnav_common::{Error, Result};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Which parts of the bake area count as walkable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum BakeMode {
    /// Only area covered by walkable volumes is baked
    Volume,
    /// The whole bake area is walkable except for obstacles
    #[default]
    IncludeAll,
}

/// Configuration parameters for [`crate::Voxelizer`]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct VoxelizerConfig {
    /// Subdivision stops once a quadrant's half-width or half-height would fall below this size
    pub min_voxel_size: f32,
    /// Amount every obstacle is inflated by before it is rasterized
    pub obstacle_padding: f32,
    /// Merge adjacent voxels with matching extents after subdivision
    pub simplify: bool,
}

impl Default for VoxelizerConfig {
    fn default() -> Self {
        Self {
            min_voxel_size: 1.0,
            obstacle_padding: 0.0,
            simplify: true,
        }
    }
}

impl VoxelizerConfig {
    /// Creates a new VoxelizerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.min_voxel_size.is_finite() || self.min_voxel_size <= 0.0 {
            return Err(Error::Configuration(format!(
                "min_voxel_size must be positive, got {}",
                self.min_voxel_size
            )));
        }

        if !self.obstacle_padding.is_finite() || self.obstacle_padding < 0.0 {
            return Err(Error::Configuration(format!(
                "obstacle_padding must be non-negative, got {}",
                self.obstacle_padding
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(VoxelizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let config = VoxelizerConfig {
            min_voxel_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config = VoxelizerConfig {
            obstacle_padding: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
