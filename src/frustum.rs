//! Clipping of the camera frustum against the water slab.
//!
//! The slab is the region between the lower and upper bound planes. Any point the animated
//! surface can reach lies inside it, so the part of the slab the camera can see bounds the part
//! of the surface worth meshing this frame.

use glam::{Mat4, Vec3, Vec4};

use crate::error::{WaterError, WaterResult};
use crate::geometry::{line_plane_intersection, value_between, Plane};

/// NDC cube corners. Indices 0..4 are the near face, 4..8 the far face, both wound the same way.
const NDC_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// The 12 frustum edges as pairs of indices into [`NDC_CORNERS`].
pub const FRUSTUM_EDGES: [(usize, usize); 12] = [
    // near face
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    // far face
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    // near to far
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// World-space corners of the frustum described by `view_projection`.
pub fn frustum_corners(view_projection: &Mat4) -> WaterResult<[Vec3; 8]> {
    if !view_projection.is_finite() || !(view_projection.determinant().abs() > f32::EPSILON) {
        return Err(WaterError::SingularMatrix("camera view-projection"));
    }
    let inverse = view_projection.inverse();

    let mut corners = [Vec3::ZERO; 8];
    for (corner, ndc) in corners.iter_mut().zip(NDC_CORNERS.iter()) {
        let world = inverse * Vec4::new(ndc[0], ndc[1], ndc[2], 1.0);
        *corner = world.truncate() / world.w;
    }
    Ok(corners)
}

/// Points bounding the visible part of the slab between `lower` and `upper`.
///
/// Collects every crossing of a frustum edge with either bound plane, plus every frustum corner
/// that already sits inside the slab. `Ok(None)` means the camera does not see the slab at all
/// and the surface should not be drawn this frame.
pub fn clip_frustum_to_slab(
    view_projection: &Mat4,
    upper: &Plane,
    lower: &Plane,
) -> WaterResult<Option<Vec<Vec3>>> {
    let corners = frustum_corners(view_projection)?;
    let mut points = Vec::new();

    for &(start, end) in FRUSTUM_EDGES.iter() {
        let (a, b) = (corners[start], corners[end]);
        for plane in [lower, upper].iter() {
            if let Some(hit) = line_plane_intersection(a, b, plane) {
                points.push(hit);
            }
        }
    }

    // Heights are measured along the shared normal, so this also works for tilted slabs.
    let normal = upper.normal;
    for corner in corners.iter() {
        if value_between(lower.height(), upper.height(), corner.dot(normal)) {
            points.push(*corner);
        }
    }

    if points.is_empty() {
        Ok(None)
    } else {
        Ok(Some(points))
    }
}
