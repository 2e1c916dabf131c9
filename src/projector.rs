//! The projector camera and the range matrix built from it.
//!
//! The projector is an auxiliary camera that always looks down at the water from above the
//! slab. Its clip space gives the surface a 2D parameterization that stays well behaved even
//! when the real camera looks at the horizon or dips below the waves.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::camera::Lens;
use crate::config::WaterConfig;
use crate::error::{WaterError, WaterResult};
use crate::geometry::{project_point_onto_plane, ray_plane_intersection, Plane, EPSILON};

/// Ways of choosing the point on the base plane the projector looks at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProjectorAim {
    /// Where the camera's view ray meets the base plane. Best when looking down.
    Raycast,
    /// A point a fixed distance along the view ray, dropped onto the base plane. Best when
    /// looking at the horizon, where the raycast runs off to infinity or misses.
    FixedDistance,
}

/// View and projection of a placed projector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectorCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub inverse_view_projection: Mat4,
}

impl ProjectorCamera {
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, lens: &Lens, aspect: f32) -> WaterResult<Self> {
        let view = Mat4::look_at_rh(position, target, up);
        let projection = lens.projection(aspect);
        let view_projection = projection * view;
        if !(view_projection.determinant().abs() > f32::EPSILON) {
            return Err(WaterError::SingularMatrix("projector view-projection"));
        }
        Ok(Self {
            position,
            target,
            view,
            projection,
            view_projection,
            inverse_view_projection: view_projection.inverse(),
        })
    }
}

/// Settings for [`ProjectorRig::place`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectorRig {
    /// Look-ahead distance for [`ProjectorAim::FixedDistance`].
    pub distance: f32,
    /// Minimum height of the projector above the upper bound plane.
    pub clearance: f32,
    pub lens: Lens,
}

impl ProjectorRig {
    pub fn from_config(config: &WaterConfig) -> Self {
        Self {
            distance: config.projector_distance,
            clearance: config.projector_clearance,
            lens: config.lens(),
        }
    }

    /// The point on `base` the given strategy picks, if it picks one.
    pub fn aim(&self, aim: ProjectorAim, eye: Vec3, forward: Vec3, base: &Plane) -> Option<Vec3> {
        match aim {
            ProjectorAim::Raycast => ray_plane_intersection(eye, eye + forward, base)
                .filter(|hit| (*hit - eye).dot(forward) > 0.0),
            ProjectorAim::FixedDistance => {
                Some(project_point_onto_plane(eye + forward * self.distance, base))
            }
        }
    }

    /// Positions the projector for a camera at `eye` looking along `forward`.
    ///
    /// The aim point blends the two [`ProjectorAim`] strategies by how steeply the camera looks
    /// at the water: straight down uses the raycast, level uses the fixed distance. The
    /// projector sits at the camera, mirrored above the base plane when the camera is under
    /// water and lifted to at least `clearance` above `upper`.
    pub fn place(
        &self,
        eye: Vec3,
        forward: Vec3,
        base: &Plane,
        upper: &Plane,
        aspect: f32,
    ) -> WaterResult<ProjectorCamera> {
        let forward = forward.normalize();
        let normal = base.normal;

        let fixed = project_point_onto_plane(eye + forward * self.distance, base);
        let target = match self.aim(ProjectorAim::Raycast, eye, forward, base) {
            Some(hit) => fixed.lerp(hit, forward.dot(normal).abs()),
            None => fixed,
        };

        let mut position = eye;
        let below = base.signed_distance(position);
        if below < 0.0 {
            position -= normal * (2.0 * below);
        }
        let above_upper = upper.signed_distance(position);
        if above_upper < self.clearance {
            position += normal * (self.clearance - above_upper);
        }

        let direction = (target - position).normalize();
        let up = if direction.dot(normal).abs() > 0.99 {
            (forward - normal * forward.dot(normal))
                .try_normalize()
                .unwrap_or(Vec3::NEG_Z)
        } else {
            normal
        };

        ProjectorCamera::look_at(position, target, up, &self.lens, aspect)
    }
}

/// Maps the unit square onto the projector-space bounding box of `points`.
///
/// Each point is dropped onto `base` and taken into the projector's normalized device
/// coordinates. The returned matrix scales and offsets x and y so that `(0, 0)` lands on the
/// minimum corner and `(1, 1)` on the maximum; z and w pass through. Points behind the projector
/// are ignored; `None` means none were left.
pub fn range_matrix(points: &[Vec3], base: &Plane, projector_view_projection: &Mat4) -> Option<Mat4> {
    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    let mut seen = false;

    for p in points {
        let on_base = project_point_onto_plane(*p, base);
        let clip = *projector_view_projection * on_base.extend(1.0);
        if clip.w <= EPSILON {
            continue;
        }
        let ndc = clip.truncate().truncate() / clip.w;
        min = min.min(ndc);
        max = max.max(ndc);
        seen = true;
    }

    if !seen {
        return None;
    }
    let size = max - min;
    Some(Mat4::from_cols(
        Vec4::new(size.x, 0.0, 0.0, 0.0),
        Vec4::new(0.0, size.y, 0.0, 0.0),
        Vec4::Z,
        Vec4::new(min.x, min.y, 0.0, 1.0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> ProjectorRig {
        ProjectorRig {
            distance: 10.0,
            clearance: 1.0,
            lens: Lens::default(),
        }
    }

    #[test]
    fn test_range_matrix_maps_unit_square_to_bounds() {
        let base = Plane::horizontal(0.0);
        let points = [
            Vec3::new(-2.0, 3.0, 1.0),
            Vec3::new(4.0, -5.0, -0.5),
            Vec3::new(1.0, 0.0, 0.25),
        ];
        // orthographic top-down projector: ndc x = world x / 4, ndc y = -world z
        let projector = Mat4::orthographic_rh_gl(-4.0, 4.0, -1.0, 1.0, -10.0, 10.0)
            * Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Y, Vec3::NEG_Z);
        let range = range_matrix(&points, &base, &projector).unwrap();

        let low = range * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let high = range * Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert!((low.x + 0.5).abs() < 1e-5 && (low.y + 1.0).abs() < 1e-5, "{:?}", low);
        assert!((high.x - 1.0).abs() < 1e-5 && (high.y - 0.5).abs() < 1e-5, "{:?}", high);
        assert_eq!(range.z_axis, Vec4::Z);
    }

    #[test]
    fn test_range_matrix_without_visible_points() {
        let base = Plane::horizontal(0.0);
        let projector = Lens::default().projection(1.0)
            * Mat4::look_at_rh(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 0.0, -5.0), Vec3::Y);
        // everything is behind the projector
        let points = [Vec3::new(0.0, 0.0, 20.0), Vec3::new(3.0, -2.0, 30.0)];
        assert_eq!(range_matrix(&points, &base, &projector), None);
        assert_eq!(range_matrix(&[], &base, &projector), None);
    }

    #[test]
    fn test_level_camera_aims_fixed_distance_ahead() {
        let base = Plane::horizontal(-10.0);
        let upper = Plane::horizontal(0.0);
        let projector = rig()
            .place(Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z, &base, &upper, 1.0)
            .unwrap();

        assert!(projector.target.distance(Vec3::new(0.0, -10.0, -10.0)) < 1e-4);
        assert!(projector.position.distance(Vec3::new(0.0, 1.6, 0.0)) < 1e-5);
    }

    #[test]
    fn test_downward_camera_aims_at_raycast_hit() {
        let base = Plane::horizontal(-10.0);
        let upper = Plane::horizontal(0.0);
        let forward = Vec3::new(0.0, -1.0, -0.05).normalize();
        let eye = Vec3::new(0.0, 1.6, 0.0);
        let projector = rig().place(eye, forward, &base, &upper, 1.0).unwrap();

        let hit = rig().aim(ProjectorAim::Raycast, eye, forward, &base).unwrap();
        assert!(projector.target.distance(hit) < 0.1, "{:?} vs {:?}", projector.target, hit);
        assert!(projector.inverse_view_projection.is_finite());
    }

    #[test]
    fn test_raycast_ignores_hits_behind_the_camera() {
        let base = Plane::horizontal(-10.0);
        let aim = rig().aim(ProjectorAim::Raycast, Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.5, -1.0), &base);
        assert_eq!(aim, None);
    }

    #[test]
    fn test_projector_stays_above_the_slab() {
        let base = Plane::horizontal(-10.0);
        let upper = Plane::horizontal(0.0);

        let inside = rig()
            .place(Vec3::new(0.0, -5.0, 0.0), Vec3::NEG_Z, &base, &upper, 1.0)
            .unwrap();
        assert!((inside.position.y - 1.0).abs() < 1e-5, "{:?}", inside.position);

        let under_water = rig()
            .place(Vec3::new(2.0, -40.0, 0.0), Vec3::NEG_Z, &base, &upper, 1.0)
            .unwrap();
        // mirrored to y = 20, already clear of the upper bound
        assert!(under_water.position.distance(Vec3::new(2.0, 20.0, 0.0)) < 1e-4);
    }

    #[test]
    fn test_projector_sees_its_target() {
        let base = Plane::horizontal(-10.0);
        let upper = Plane::horizontal(0.0);
        let projector = rig()
            .place(Vec3::new(3.0, 1.6, 2.0), Vec3::new(1.0, -0.3, -1.0), &base, &upper, 1.5)
            .unwrap();

        let clip = projector.view_projection * projector.target.extend(1.0);
        assert!(clip.w > 0.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4, "{:?}", ndc);
    }
}
