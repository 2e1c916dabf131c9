use glam::{Mat4, Vec3};

use crate::camera::{Camera, Lens};
use crate::config::WaterConfig;
use crate::error::WaterResult;
use crate::frustum::clip_frustum_to_slab;
use crate::geometry::Plane;
use crate::grid::{GridSampler, WaterMesh};
use crate::heightfield::{HeightField, LayerOscillator};
use crate::projector::{range_matrix, ProjectorCamera, ProjectorRig};

/// Camera state for one frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameContext {
    pub camera_position: Vec3,
    /// Unit view direction.
    pub camera_forward: Vec3,
    pub view_projection: Mat4,
    /// Viewport width over height.
    pub aspect: f32,
}

impl FrameContext {
    pub fn from_camera(camera: &Camera, lens: &Lens, aspect: f32) -> Self {
        Self {
            camera_position: camera.position,
            camera_forward: camera.forward,
            view_projection: camera.view_projection(aspect, lens),
            aspect,
        }
    }
}

/// The animated water surface. Rebuilds its whole mesh from scratch every frame.
#[derive(Clone, Debug)]
pub struct WaterSurface {
    config: WaterConfig,
    base: Plane,
    upper: Plane,
    lower: Plane,
    field: HeightField,
    oscillator: LayerOscillator,
    rig: ProjectorRig,
    sampler: GridSampler,
    projector: Option<ProjectorCamera>,
}

impl WaterSurface {
    /// Validates `config` and generates the noise height field it describes.
    pub fn new(config: WaterConfig) -> WaterResult<Self> {
        config.validate()?;
        let field = HeightField::from_noise(&config);
        Self::with_height_field(config, field)
    }

    /// Like [`WaterSurface::new`] but with a caller-supplied height field.
    pub fn with_height_field(config: WaterConfig, field: HeightField) -> WaterResult<Self> {
        config.validate()?;
        Ok(Self {
            base: config.base_plane(),
            upper: config.upper_plane(),
            lower: config.lower_plane(),
            oscillator: LayerOscillator::from_config(&config),
            rig: ProjectorRig::from_config(&config),
            sampler: GridSampler::from_config(&config),
            field,
            config,
            projector: None,
        })
    }

    /// Builds this frame's mesh.
    ///
    /// Returns `Ok(None)` when the camera cannot see any part of the slab; the surface should
    /// simply not be drawn. An `Err` means the grid could not be placed and the frame's water
    /// draw should be skipped as well. The height-field animation advances either way.
    pub fn build_frame(&mut self, frame: &FrameContext) -> WaterResult<Option<WaterMesh>> {
        let layer_t = self.oscillator.advance();

        let points = match clip_frustum_to_slab(&frame.view_projection, &self.upper, &self.lower)? {
            Some(points) => points,
            None => {
                log::debug!("camera does not see the water slab, skipping surface");
                return Ok(None);
            }
        };

        let projector = self.rig.place(
            frame.camera_position,
            frame.camera_forward,
            &self.base,
            &self.upper,
            frame.aspect,
        )?;
        self.projector = Some(projector);

        let range = match range_matrix(&points, &self.base, &projector.view_projection) {
            Some(range) => range,
            None => {
                log::debug!("water slab lies behind the projector, skipping surface");
                return Ok(None);
            }
        };

        let remap = projector.inverse_view_projection * range;
        self.sampler
            .sample(&remap, &self.base, &self.field, layer_t)
            .map(Some)
    }

    pub fn config(&self) -> &WaterConfig {
        &self.config
    }

    pub fn base_plane(&self) -> &Plane {
        &self.base
    }

    pub fn upper_plane(&self) -> &Plane {
        &self.upper
    }

    pub fn lower_plane(&self) -> &Plane {
        &self.lower
    }

    pub fn height_field(&self) -> &HeightField {
        &self.field
    }

    pub fn oscillator(&self) -> &LayerOscillator {
        &self.oscillator
    }

    /// Projector used for the most recent frame that got far enough to place one.
    pub fn projector(&self) -> Option<&ProjectorCamera> {
        self.projector.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_surface() -> WaterSurface {
        let config = WaterConfig {
            grid_size: 8,
            height_field_resolution: 8,
            height_field_layers: 4,
            ..Default::default()
        };
        WaterSurface::new(config).unwrap()
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = WaterConfig {
            grid_size: 1,
            ..Default::default()
        };
        assert!(WaterSurface::new(config).is_err());
    }

    #[test]
    fn test_frame_builds_mesh_and_advances_animation() {
        let mut surface = small_surface();
        let frame = FrameContext::from_camera(&Camera::default(), &surface.config().lens(), 1.0);

        let mesh = surface.build_frame(&frame).unwrap().expect("default camera sees the water");
        assert_eq!(mesh.vertex_count(), 64);
        assert_eq!(mesh.indices.len(), 6 * 6 * 6);
        assert!(surface.projector().is_some());
        assert!(surface.oscillator().value > 0.0);
    }

    #[test]
    fn test_sky_view_skips_surface() {
        let mut surface = small_surface();
        let camera = Camera::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 1.0, -0.2));
        let frame = FrameContext::from_camera(&camera, &surface.config().lens(), 1.0);

        assert_eq!(surface.build_frame(&frame), Ok(None));
        assert!(surface.projector().is_none());
        // animation keeps running while the water is out of view
        assert!(surface.oscillator().value > 0.0);
    }
}
