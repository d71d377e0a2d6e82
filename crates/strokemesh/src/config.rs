//! Builder configuration.

use serde::{Deserialize, Serialize};
use strokemesh_math::{Point3, Vec3};

use crate::error::{BuilderError, Result};

/// Settings fixed for the duration of one `build()`.
///
/// Missing fields take their defaults when deserialized, so partial
/// configs are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Scale of the cross-section along the base normal (1.0 = none).
    pub deform_thickness: f64,
    /// Scale of the cross-section across the base normal (1.0 = none).
    pub deform_width: f64,
    /// Displacement per unit of deform-map gray level, in radii.
    pub deform_map_scale: f64,
    /// Inner shell offset as a fraction of the local radius; 0 = solid.
    pub hollow_thickness: f64,
    /// Use the X coordinate when deriving base normals.
    pub base_normal_on_x: bool,
    /// Use the Y coordinate when deriving base normals.
    pub base_normal_on_y: bool,
    /// Use the Z coordinate when deriving base normals.
    pub base_normal_on_z: bool,
    /// Replace every initial base normal by the radius-weighted average.
    pub base_normal_average: bool,
    /// Offset increment applied to a failing branch ring per attempt.
    pub wrap_step_back_factor: f64,
    /// Branch ring vertices closer than this many radii are welded.
    pub wrap_weld_factor: f64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            deform_thickness: 1.0,
            deform_width: 1.0,
            deform_map_scale: 0.5,
            hollow_thickness: 0.0,
            base_normal_on_x: true,
            base_normal_on_y: true,
            base_normal_on_z: true,
            base_normal_average: false,
            wrap_step_back_factor: 0.1,
            wrap_weld_factor: 0.01,
        }
    }
}

impl BuilderConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.wrap_step_back_factor > 0.0 && self.wrap_step_back_factor < 1.0) {
            return Err(BuilderError::InvalidConfig(
                "wrap_step_back_factor must be between 0 and 1".into(),
            ));
        }
        if self.wrap_weld_factor < 0.0 {
            return Err(BuilderError::InvalidConfig(
                "wrap_weld_factor must not be negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.hollow_thickness) {
            return Err(BuilderError::InvalidConfig(
                "hollow_thickness must be in [0, 1)".into(),
            ));
        }
        if !self.deform_thickness.is_finite() || !self.deform_width.is_finite() {
            return Err(BuilderError::InvalidConfig(
                "deform factors must be finite".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn axis_mask(&self) -> AxisMask {
        AxisMask([self.base_normal_on_x, self.base_normal_on_y, self.base_normal_on_z])
    }
}

/// Coordinates that take part in base-normal derivation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AxisMask([bool; 3]);

impl AxisMask {
    pub(crate) fn apply(&self, v: &Vec3) -> Vec3 {
        Vec3::from_fn(|i, _| if self.0[i] { v[i] } else { 0.0 })
    }

    pub(crate) fn apply_point(&self, p: &Point3) -> Point3 {
        Point3::from(self.apply(&p.coords))
    }
}
