use std::time::Duration;

use crate::camera::Lens;
use crate::error::{WaterError, WaterResult};
use crate::geometry::Plane;

/// Window and loop settings used by [`get_fancy`][crate::get_fancy].
///
/// Either fill in the fields you care about and take the rest from `Default`:
///
/// ```
/// use mini_gl_water::WindowConfig;
///
/// let config = WindowConfig {
///     window_size: (800.0, 600.0),
///     resizable: true,
///     .. Default::default()
/// };
/// assert_eq!(config.window_title, "Projected water");
/// ```
///
/// or use the generated builder:
///
/// ```
/// use mini_gl_water::WindowConfigBuilder;
///
/// let config = WindowConfigBuilder::default()
///     .window_title("Harbour")
///     .vsync(false)
///     .build();
/// assert_eq!(config.window_size, (600.0, 600.0));
/// ```
#[derive(Clone, PartialEq, Debug, Builder)]
#[builder(build_fn(skip))]
pub struct WindowConfig {
    #[builder(setter(into))]
    pub window_title: String,
    /// Logical window size.
    pub window_size: (f64, f64),
    pub resizable: bool,
    /// Minimum time between two rendered frames.
    pub frame_interval: Duration,
    pub vsync: bool,
    /// Hide and confine the cursor so mouse motion only steers the camera.
    pub grab_cursor: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            window_title: "Projected water".to_string(),
            window_size: (600.0, 600.0),
            resizable: true,
            frame_interval: Duration::from_millis(20),
            vsync: true,
            grab_cursor: true,
        }
    }
}

impl WindowConfigBuilder {
    /// Builds the config, taking unset fields from [`WindowConfig::default`].
    pub fn build(&self) -> WindowConfig {
        let d = WindowConfig::default();
        WindowConfig {
            window_title: self.window_title.clone().unwrap_or(d.window_title),
            window_size: self.window_size.unwrap_or(d.window_size),
            resizable: self.resizable.unwrap_or(d.resizable),
            frame_interval: self.frame_interval.unwrap_or(d.frame_interval),
            vsync: self.vsync.unwrap_or(d.vsync),
            grab_cursor: self.grab_cursor.unwrap_or(d.grab_cursor),
        }
    }
}

/// Everything that shapes the water surface.
///
/// The defaults describe a flat sea at `y = -10` whose waves may rise to `y = 0` and sink to
/// `y = -20`, viewed through a 70 degree lens.
///
/// ```
/// use mini_gl_water::WaterConfigBuilder;
///
/// let config = WaterConfigBuilder::default()
///     .grid_size(64usize)
///     .base_height(-2.0)
///     .upper_height(0.0)
///     .lower_height(-4.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.grid_size, 64);
///
/// assert!(WaterConfigBuilder::default().grid_size(2usize).build().is_err());
/// ```
#[derive(Clone, PartialEq, Debug, Builder)]
#[builder(build_fn(skip))]
pub struct WaterConfig {
    /// Number of grid points along each side of the sampled grid.
    pub grid_size: usize,
    /// Height of the undisturbed water plane.
    pub base_height: f32,
    /// Highest point a wave can reach.
    pub upper_height: f32,
    /// Lowest point a wave can reach.
    pub lower_height: f32,

    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,

    /// Side length of the height-field lattice.
    pub height_field_resolution: usize,
    /// Number of animation layers in the height field.
    pub height_field_layers: usize,
    /// World distance after which the height field repeats.
    pub height_field_period: f32,
    pub noise_seed: u32,
    pub noise_frequency: f64,

    /// How far the layer oscillator moves per frame.
    pub layer_step: f32,
    pub layer_upper_threshold: f32,
    pub layer_lower_threshold: f32,

    /// Look-ahead distance of the fixed-distance projector aim.
    pub projector_distance: f32,
    /// Minimum height of the projector above the upper bound plane.
    pub projector_clearance: f32,

    /// Scale from world `(x, z)` to texture coordinates.
    pub texture_scale: f32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        WaterConfig {
            grid_size: 128,
            base_height: -10.0,
            upper_height: 0.0,
            lower_height: -20.0,
            fov_y_degrees: 70.0,
            near: 0.01,
            far: 100.0,
            height_field_resolution: 64,
            height_field_layers: 32,
            height_field_period: 20.0,
            noise_seed: 7,
            noise_frequency: 4.0,
            layer_step: 0.005,
            layer_upper_threshold: 0.99,
            layer_lower_threshold: 0.01,
            projector_distance: 10.0,
            projector_clearance: 1.0,
            texture_scale: 0.1,
        }
    }
}

impl WaterConfig {
    pub const MIN_GRID_SIZE: usize = 3;
    pub const MAX_GRID_SIZE: usize = 256;

    /// Checks the invariants the pipeline relies on.
    pub fn validate(&self) -> WaterResult<()> {
        if self.grid_size < Self::MIN_GRID_SIZE || self.grid_size > Self::MAX_GRID_SIZE {
            return Err(WaterError::invalid_config(format!(
                "grid_size must be in {}..={}, got {}",
                Self::MIN_GRID_SIZE,
                Self::MAX_GRID_SIZE,
                self.grid_size
            )));
        }
        if !(self.lower_height < self.base_height && self.base_height < self.upper_height) {
            return Err(WaterError::invalid_config(format!(
                "expected lower_height < base_height < upper_height, got {} / {} / {}",
                self.lower_height, self.base_height, self.upper_height
            )));
        }
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return Err(WaterError::invalid_config("fov_y_degrees must be in (0, 180)"));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(WaterError::invalid_config("expected 0 < near < far"));
        }
        if self.height_field_resolution == 0 || self.height_field_layers == 0 {
            return Err(WaterError::invalid_config("height field must not be empty"));
        }
        if !(self.height_field_period > 0.0) {
            return Err(WaterError::invalid_config("height_field_period must be positive"));
        }
        if !(self.layer_step > 0.0 && self.layer_step <= 1.0) {
            return Err(WaterError::invalid_config("layer_step must be in (0, 1]"));
        }
        if !(0.0 <= self.layer_lower_threshold
            && self.layer_lower_threshold < self.layer_upper_threshold
            && self.layer_upper_threshold <= 1.0)
        {
            return Err(WaterError::invalid_config(
                "expected 0 <= layer_lower_threshold < layer_upper_threshold <= 1",
            ));
        }
        if !(self.projector_distance > 0.0) || self.projector_clearance < 0.0 {
            return Err(WaterError::invalid_config(
                "projector_distance must be positive and projector_clearance non-negative",
            ));
        }
        Ok(())
    }

    pub fn base_plane(&self) -> Plane {
        Plane::horizontal(self.base_height)
    }

    pub fn upper_plane(&self) -> Plane {
        Plane::horizontal(self.upper_height)
    }

    pub fn lower_plane(&self) -> Plane {
        Plane::horizontal(self.lower_height)
    }

    pub fn lens(&self) -> Lens {
        Lens {
            fov_y_degrees: self.fov_y_degrees,
            near: self.near,
            far: self.far,
        }
    }
}

impl WaterConfigBuilder {
    /// Builds and validates the config, taking unset fields from [`WaterConfig::default`].
    pub fn build(&self) -> WaterResult<WaterConfig> {
        let d = WaterConfig::default();
        let config = WaterConfig {
            grid_size: self.grid_size.unwrap_or(d.grid_size),
            base_height: self.base_height.unwrap_or(d.base_height),
            upper_height: self.upper_height.unwrap_or(d.upper_height),
            lower_height: self.lower_height.unwrap_or(d.lower_height),
            fov_y_degrees: self.fov_y_degrees.unwrap_or(d.fov_y_degrees),
            near: self.near.unwrap_or(d.near),
            far: self.far.unwrap_or(d.far),
            height_field_resolution: self
                .height_field_resolution
                .unwrap_or(d.height_field_resolution),
            height_field_layers: self.height_field_layers.unwrap_or(d.height_field_layers),
            height_field_period: self.height_field_period.unwrap_or(d.height_field_period),
            noise_seed: self.noise_seed.unwrap_or(d.noise_seed),
            noise_frequency: self.noise_frequency.unwrap_or(d.noise_frequency),
            layer_step: self.layer_step.unwrap_or(d.layer_step),
            layer_upper_threshold: self.layer_upper_threshold.unwrap_or(d.layer_upper_threshold),
            layer_lower_threshold: self.layer_lower_threshold.unwrap_or(d.layer_lower_threshold),
            projector_distance: self.projector_distance.unwrap_or(d.projector_distance),
            projector_clearance: self.projector_clearance.unwrap_or(d.projector_clearance),
            texture_scale: self.texture_scale.unwrap_or(d.texture_scale),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_water_config_is_valid() {
        assert_eq!(WaterConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_builder_keeps_defaults_for_unset_fields() {
        let config = WaterConfigBuilder::default().grid_size(16usize).build().unwrap();
        assert_eq!(config.grid_size, 16);
        assert_eq!(config.base_height, -10.0);
        assert_eq!(config.fov_y_degrees, 70.0);
    }

    #[test]
    fn test_inverted_slab_is_rejected() {
        let result = WaterConfigBuilder::default()
            .upper_height(-30.0)
            .build();
        assert!(matches!(result, Err(WaterError::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let config = WaterConfig {
            grid_size: WaterConfig::MAX_GRID_SIZE + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_thresholds_are_rejected() {
        let config = WaterConfig {
            layer_lower_threshold: 0.9,
            layer_upper_threshold: 0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_planes_follow_heights() {
        let config = WaterConfig::default();
        assert_eq!(config.base_plane().height(), -10.0);
        assert_eq!(config.upper_plane().height(), 0.0);
        assert_eq!(config.lower_plane().height(), -20.0);
    }

    #[test]
    fn test_window_builder_fills_defaults() {
        let config = WindowConfigBuilder::default().resizable(false).build();
        assert!(!config.resizable);
        assert_eq!(config.frame_interval, Duration::from_millis(20));
    }
}
