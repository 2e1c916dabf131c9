//! Sampling of the projected grid and meshing of the result.

use std::ops::{Index, IndexMut};

use glam::{Mat4, Vec3, Vec4};

use crate::config::WaterConfig;
use crate::error::{WaterError, WaterResult};
use crate::geometry::{ray_plane_intersection, Plane};
use crate::heightfield::HeightField;

/// Owned row-major 2D array.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid2D<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid2D<T> {
    pub fn new(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            rows,
            cols,
            cells: vec![fill; rows * cols],
        }
    }
}

impl<T> Grid2D<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if row < self.rows && col < self.cols {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }

    /// Cells in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.cells.iter_mut()
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "grid index ({}, {}) out of bounds for {}x{} grid",
            row,
            col,
            self.rows,
            self.cols
        );
        row * self.cols + col
    }
}

impl<T> Index<(usize, usize)> for Grid2D<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.cells[self.offset(row, col)]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid2D<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        let offset = self.offset(row, col);
        &mut self.cells[offset]
    }
}

/// Triangle mesh of the water surface, ready for upload.
///
/// Vertex `row * N + col` is grid point `(row, col)`. All attribute arrays have the same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaterMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    /// Counter-clockwise triangles, seen from above.
    pub indices: Vec<u32>,
}

impl WaterMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Unit-square coordinates of the grid corners, in the order [`GridSampler::corners`] returns
/// them.
pub const GRID_CORNERS: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];

/// Turns a remap matrix into a displaced water mesh.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridSampler {
    /// Points along each side of the grid.
    pub size: usize,
    pub lower_height: f32,
    pub upper_height: f32,
    pub texture_scale: f32,
}

impl GridSampler {
    pub fn from_config(config: &WaterConfig) -> Self {
        Self {
            size: config.grid_size,
            lower_height: config.lower_height,
            upper_height: config.upper_height,
            texture_scale: config.texture_scale,
        }
    }

    /// Runs every stage for one frame.
    ///
    /// `remap` takes unit-square coordinates (plus a clip depth) into world space; it is the
    /// projector's inverse view-projection times the range matrix.
    pub fn sample(
        &self,
        remap: &Mat4,
        base: &Plane,
        field: &HeightField,
        layer_t: f32,
    ) -> WaterResult<WaterMesh> {
        if self.size < WaterConfig::MIN_GRID_SIZE {
            return Err(WaterError::invalid_config(format!(
                "grid size must be at least {}, got {}",
                WaterConfig::MIN_GRID_SIZE,
                self.size
            )));
        }
        let corners = Self::corners(remap, base)?;
        let mut grid = self.interpolate(&corners);
        self.displace(&mut grid, field, layer_t);
        let normals = Self::normals(&grid);

        let positions: Vec<[f32; 3]> = grid.iter().map(|p| p.to_array()).collect();
        let tex_coords = grid
            .iter()
            .map(|p| [p.x * self.texture_scale, p.z * self.texture_scale])
            .collect();
        let normals = normals.iter().map(|n| n.to_array()).collect();
        let indices = Self::triangulate(self.size);

        log::trace!(
            "sampled water grid: {} vertices, {} triangles",
            positions.len(),
            indices.len() / 3
        );
        Ok(WaterMesh {
            positions,
            normals,
            tex_coords,
            indices,
        })
    }

    /// World positions of the four grid corners on `base`, in [`GRID_CORNERS`] order.
    ///
    /// Each corner is the intersection of `base` with the projector ray running from the near
    /// to the far clip plane through that corner.
    pub fn corners(remap: &Mat4, base: &Plane) -> WaterResult<[Vec3; 4]> {
        let mut out = [Vec3::ZERO; 4];
        for (corner, &(u, v)) in out.iter_mut().zip(GRID_CORNERS.iter()) {
            let missed = WaterError::CornerMissedPlane { u, v };
            let near = unproject(remap, Vec4::new(u, v, -1.0, 1.0)).ok_or_else(|| missed.clone())?;
            let far = unproject(remap, Vec4::new(u, v, 1.0, 1.0)).ok_or_else(|| missed.clone())?;
            *corner = ray_plane_intersection(near, far, base).ok_or(missed)?;
        }
        Ok(out)
    }

    /// Fills a grid bilinearly from the corners: first the left and right columns, then every
    /// row between them. A grid with a single point takes the first corner.
    pub fn interpolate(&self, corners: &[Vec3; 4]) -> Grid2D<Vec3> {
        let n = self.size;
        let last = n.saturating_sub(1).max(1) as f32;
        let [c00, c10, c01, c11] = *corners;
        let mut grid = Grid2D::new(n, n, Vec3::ZERO);

        for row in 0..n {
            let t = row as f32 / last;
            let left = c00.lerp(c01, t);
            let right = c10.lerp(c11, t);
            grid[(row, n - 1)] = right;
            grid[(row, 0)] = left;
            for col in 1..n - 1 {
                grid[(row, col)] = left.lerp(right, col as f32 / last);
            }
        }
        grid
    }

    /// Sets every point's height from the height field, between the lower and upper bounds.
    pub fn displace(&self, grid: &mut Grid2D<Vec3>, field: &HeightField, layer_t: f32) {
        for p in grid.iter_mut() {
            let h = field.sample(p.x, p.z, layer_t);
            p.y = self.lower_height + (self.upper_height - self.lower_height) * h;
        }
    }

    /// Central-difference normals. Points on the border use an axis-aligned tangent in place of
    /// the missing difference. Normals always face up.
    pub fn normals(grid: &Grid2D<Vec3>) -> Grid2D<Vec3> {
        let (rows, cols) = (grid.rows(), grid.cols());
        let mut normals = Grid2D::new(rows, cols, Vec3::Y);

        for row in 0..rows {
            for col in 0..cols {
                let horizontal = if col > 0 && col + 1 < cols {
                    grid[(row, col + 1)] - grid[(row, col - 1)]
                } else {
                    Vec3::X
                };
                let vertical = if row > 0 && row + 1 < rows {
                    grid[(row + 1, col)] - grid[(row - 1, col)]
                } else {
                    Vec3::NEG_Z
                };
                let n = horizontal.cross(vertical).try_normalize().unwrap_or(Vec3::Y);
                normals[(row, col)] = if n.y < 0.0 { -n } else { n };
            }
        }
        normals
    }

    /// Two triangles for every cell whose top-left point lies in rows and columns `0..n-2`.
    ///
    /// That yields `6 * (n - 2)^2` indices for an `n x n` grid.
    pub fn triangulate(n: usize) -> Vec<u32> {
        let cells = n.saturating_sub(2);
        let mut indices = Vec::with_capacity(cells * cells * 6);
        let stride = n as u32;
        for row in 0..cells as u32 {
            for col in 0..cells as u32 {
                let i0 = row * stride + col;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;
                indices.extend_from_slice(&[i0, i1, i2, i1, i3, i2]);
            }
        }
        indices
    }
}

fn unproject(m: &Mat4, p: Vec4) -> Option<Vec3> {
    let world = *m * p;
    if world.w.abs() <= f32::EPSILON {
        None
    } else {
        Some(world.truncate() / world.w)
    }
}
