//! Plane and ray primitives used by every later stage of the water pipeline.
//!
//! All tolerance checks go through [`EPSILON`], including the "ray is parallel to the plane"
//! test.

use glam::Vec3;

/// Tolerance, in world units, for every containment and parallelism test.
pub const EPSILON: f32 = 0.005;

/// An infinite plane given by a point on it and a unit normal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl Plane {
    /// Creates a plane, normalizing `normal`.
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// A horizontal plane at the given height with an up-facing normal.
    pub fn horizontal(height: f32) -> Self {
        Self {
            point: Vec3::new(0.0, height, 0.0),
            normal: Vec3::Y,
        }
    }

    /// Offset of the plane from the origin, measured along its normal.
    ///
    /// For the horizontal planes used by the water surface this is simply the plane's height.
    pub fn height(&self) -> f32 {
        self.point.dot(self.normal)
    }

    pub fn signed_distance(&self, p: Vec3) -> f32 {
        (p - self.point).dot(self.normal)
    }
}

/// Intersects the infinite line through `a` and `b` with `plane`.
///
/// The hit may lie outside `[a, b]` on either side. Returns `None` when the line runs parallel
/// to the plane.
pub fn ray_plane_intersection(a: Vec3, b: Vec3, plane: &Plane) -> Option<Vec3> {
    let denominator = (a - b).dot(plane.normal);
    if denominator.abs() < EPSILON {
        return None;
    }
    let t = (a - plane.point).dot(plane.normal) / denominator;
    Some(a + (b - a) * t)
}

/// Intersects the segment `a`-`b` with `plane`, rejecting hits that fall off the segment.
pub fn line_plane_intersection(a: Vec3, b: Vec3, plane: &Plane) -> Option<Vec3> {
    ray_plane_intersection(a, b, plane).filter(|&p| point_on_segment(a, b, p))
}

/// Orthogonal projection of `p` onto `plane`.
pub fn project_point_onto_plane(p: Vec3, plane: &Plane) -> Vec3 {
    p - plane.normal * plane.signed_distance(p)
}

/// Whether `p` lies on the segment `a`-`b`: the two partial distances add up to the segment
/// length within [`EPSILON`].
pub fn point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> bool {
    a.distance(p) + p.distance(b) - a.distance(b) <= EPSILON
}

/// Scalar version of [`point_on_segment`]; the bounds may come in either order.
pub fn value_between(lo: f32, hi: f32, v: f32) -> bool {
    (lo - v).abs() + (v - hi).abs() - (lo - hi).abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    #[test]
    fn test_ray_hits_plane_beyond_the_segment() {
        let plane = Plane::horizontal(-10.0);
        let hit = ray_plane_intersection(Vec3::new(1.0, 2.0, 0.0), Vec3::new(1.0, 1.0, 0.0), &plane)
            .expect("vertical ray must hit a horizontal plane");
        assert!(approx_eq(hit, Vec3::new(1.0, -10.0, 0.0)), "hit = {:?}", hit);
    }

    #[test]
    fn test_ray_parallel_to_plane_misses() {
        let plane = Plane::horizontal(0.0);
        let a = Vec3::new(0.0, 1.0, 0.0);
        let b = Vec3::new(5.0, 1.0, -3.0);
        assert_eq!(ray_plane_intersection(a, b, &plane), None);
        assert_eq!(line_plane_intersection(a, b, &plane), None);
    }

    #[test]
    fn test_nearly_parallel_ray_uses_tolerance() {
        let plane = Plane::horizontal(0.0);
        let a = Vec3::new(0.0, 1.0, 0.0);
        let b = Vec3::new(1.0, 1.001, 0.0);
        assert_eq!(ray_plane_intersection(a, b, &plane), None);
    }

    #[test]
    fn test_segment_crossing_plane() {
        let plane = Plane::new(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 2.0, 0.0));
        let hit = line_plane_intersection(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.0), &plane)
            .expect("segment crosses the plane");
        assert!(approx_eq(hit, Vec3::new(1.0, 0.5, 0.0)), "hit = {:?}", hit);
    }

    #[test]
    fn test_segment_stopping_short_of_plane() {
        let plane = Plane::horizontal(-10.0);
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(0.0, -5.0, 0.0);
        assert!(ray_plane_intersection(a, b, &plane).is_some());
        assert_eq!(line_plane_intersection(a, b, &plane), None);
    }

    #[test]
    fn test_projection_onto_tilted_plane() {
        let plane = Plane::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        let p = project_point_onto_plane(Vec3::new(1.0, 1.0, 3.0), &plane);
        assert!(approx_eq(p, Vec3::new(0.0, 0.0, 3.0)), "p = {:?}", p);
        assert!(plane.signed_distance(p).abs() < 1e-5);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let plane = Plane::horizontal(-10.0);
        let once = project_point_onto_plane(Vec3::new(3.0, 7.0, -2.0), &plane);
        let twice = project_point_onto_plane(once, &plane);
        assert!(approx_eq(once, twice));
    }

    #[test]
    fn test_value_between_accepts_either_order() {
        assert!(value_between(0.0, -20.0, -10.0));
        assert!(value_between(-20.0, 0.0, -10.0));
        assert!(value_between(-20.0, 0.0, 0.002));
        assert!(!value_between(-20.0, 0.0, 1.6));
    }

    #[test]
    fn test_plane_height_follows_normal() {
        assert_eq!(Plane::horizontal(-10.0).height(), -10.0);
        let flipped = Plane::new(Vec3::new(0.0, 3.0, 0.0), Vec3::NEG_Y);
        assert_eq!(flipped.height(), -3.0);
    }
}
