//! Planet-surface height field.
//! A closed-form elevation function is baked once into a square grid; every runtime query
//! (collision, placement, rendering) reads the baked grid, never the raw function.
//!
//! **Determinism:** the raw function depends only on world (x, z) and the planet's surface
//! scale, so re-entering the same planet bakes a bit-identical grid.

use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use thiserror::Error;

use crate::planet::PlanetProfile;

/// Height returned for queries outside the baked extent ("no ground here").
pub const NO_GROUND: f32 = -100.0;

/// World-to-noise frequency applied before the surface scale.
const COORD_FREQUENCY: f32 = 0.02;

/// Errors raised while constructing a height field.
#[derive(Debug, Error, PartialEq)]
pub enum TerrainError {
    #[error("height field needs at least one segment per axis")]
    NoSegments,
    #[error("grid size must be finite and positive, got {0}")]
    InvalidGridSize(f32),
    #[error("surface scale must be finite and positive, got {0}")]
    InvalidScale(f32),
}

/// Vertex for the terrain render mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Parameters of one planet-surface bake.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightFieldConfig {
    /// World-space extent of the square grid.
    pub grid_size: f32,
    /// Cells per axis; the grid holds `(segments + 1)^2` samples.
    pub segments: u32,
    /// Per-planet frequency multiplier for the raw function.
    pub scale: f32,
    /// Half-width of the central difference used by [`HeightField::normal_at`].
    pub normal_epsilon: f32,
}

impl Default for HeightFieldConfig {
    fn default() -> Self {
        Self {
            grid_size: 400.0,
            segments: 256,
            scale: 1.0,
            normal_epsilon: 0.5,
        }
    }
}

impl HeightFieldConfig {
    /// Default grid using the surface scale of `planet`.
    pub fn for_planet(planet: &PlanetProfile) -> Self {
        Self {
            scale: planet.surface_scale,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), TerrainError> {
        if self.segments == 0 {
            return Err(TerrainError::NoSegments);
        }
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(TerrainError::InvalidGridSize(self.grid_size));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(TerrainError::InvalidScale(self.scale));
        }
        Ok(())
    }
}

/// Terrain character selected by the base signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainBand {
    /// Deep basins, `base < -0.2`.
    Ocean,
    /// Beaches and plains, `-0.2 <= base < 0.4`.
    Plains,
    /// Ridged highlands, `base >= 0.4`.
    Mountain,
}

impl TerrainBand {
    pub fn classify(base: f32) -> Self {
        if base < -0.2 {
            TerrainBand::Ocean
        } else if base < 0.4 {
            TerrainBand::Plains
        } else {
            TerrainBand::Mountain
        }
    }
}

/// Hermite ramp from 0 at `edge0` to 1 at `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, value: f32) -> f32 {
    let t = ((value - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Low-frequency signal that decides the band; inputs are already scaled coordinates.
#[inline]
pub fn base_signal(px: f32, pz: f32) -> f32 {
    (px * 0.5).sin() * (pz * 0.5).cos() + (px * 0.2 + pz * 0.1).sin() * 0.5
}

/// Elevation for a given base signal at scaled coordinates `(px, pz)`.
pub fn band_height(base: f32, px: f32, pz: f32) -> f32 {
    match TerrainBand::classify(base) {
        TerrainBand::Ocean => base * 4.0,
        TerrainBand::Plains => base * base * 2.0 + (px * 10.0).sin() * 0.1,
        TerrainBand::Mountain => {
            let mask = smoothstep(0.4, 0.6, base);
            let ridge = (px * 4.0 + (pz * 2.0).sin()).sin().abs() * 5.0;
            let detail = (px * 15.0).sin() * 0.5;
            base * 5.0 + (ridge + detail) * mask
        }
    }
}

/// The procedural elevation function. Too slow for per-frame use; bake it.
pub fn raw_height(x: f32, z: f32, scale: f32) -> f32 {
    let px = x * COORD_FREQUENCY * scale;
    let pz = z * COORD_FREQUENCY * scale;
    band_height(base_signal(px, pz), px, pz)
}

/// Baked, immutable elevation grid with O(1) queries.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    config: HeightFieldConfig,
    /// Row-major, `row * (segments + 1) + col`; row follows +Z, col follows +X.
    heights: Vec<f32>,
}

impl HeightField {
    /// Evaluate [`raw_height`] at every grid vertex.
    pub fn bake(config: HeightFieldConfig) -> Result<Self, TerrainError> {
        config.validate()?;
        let started = Instant::now();

        let row = config.segments as usize + 1;
        let half = config.grid_size / 2.0;
        let cell = config.grid_size / config.segments as f32;
        let mut heights = Vec::with_capacity(row * row);

        for r in 0..row {
            let z = r as f32 * cell - half;
            for c in 0..row {
                let x = c as f32 * cell - half;
                heights.push(raw_height(x, z, config.scale));
            }
        }

        let (min, max) = heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        log::info!(
            "Baked height field: {}u, {} segments, scale {:.2}, elevation {:.2}..{:.2} in {:?}",
            config.grid_size,
            config.segments,
            config.scale,
            min,
            max,
            started.elapsed()
        );

        Ok(Self { config, heights })
    }

    pub fn config(&self) -> &HeightFieldConfig {
        &self.config
    }

    /// All baked samples, row-major.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Samples per row (`segments + 1`).
    pub fn row_len(&self) -> usize {
        self.config.segments as usize + 1
    }

    pub fn cell_size(&self) -> f32 {
        self.config.grid_size / self.config.segments as f32
    }

    /// Baked sample at grid vertex `(col, row)`.
    pub fn vertex_height(&self, col: usize, row: usize) -> Option<f32> {
        let n = self.row_len();
        if col >= n || row >= n {
            return None;
        }
        Some(self.heights[row * n + col])
    }

    /// World position of grid vertex `(col, row)` on the XZ plane.
    pub fn vertex_position(&self, col: usize, row: usize) -> (f32, f32) {
        let half = self.config.grid_size / 2.0;
        let cell = self.cell_size();
        (col as f32 * cell - half, row as f32 * cell - half)
    }

    /// Whether `(x, z)` lies inside the baked square (edges included).
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let half = self.config.grid_size / 2.0;
        (-half..=half).contains(&x) && (-half..=half).contains(&z)
    }

    /// Height at world `(x, z)`, interpolated on the same triangles the mesh uses.
    /// Returns [`NO_GROUND`] outside the baked extent.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        if !self.contains(x, z) {
            return NO_GROUND;
        }

        let segments = self.config.segments as usize;
        let half = self.config.grid_size / 2.0;
        let cell = self.cell_size();
        let gx = (x + half) / cell;
        let gz = (z + half) / cell;

        // The far edge belongs to the last cell so it reads that cell's corner exactly.
        let ix = (gx.floor() as usize).min(segments - 1);
        let iz = (gz.floor() as usize).min(segments - 1);
        let u = gx - ix as f32;
        let v = gz - iz as f32;

        let n = segments + 1;
        let h00 = self.heights[iz * n + ix];
        let h10 = self.heights[iz * n + ix + 1];
        let h01 = self.heights[(iz + 1) * n + ix];
        let h11 = self.heights[(iz + 1) * n + ix + 1];

        // Diagonal runs from (ix+1, iz) to (ix, iz+1).
        if u + v < 1.0 {
            h00 + (h10 - h00) * u + (h01 - h00) * v
        } else {
            h11 + (h01 - h11) * (1.0 - u) + (h10 - h11) * (1.0 - v)
        }
    }

    /// Whether the query point has ground under it.
    pub fn has_ground(&self, x: f32, z: f32) -> bool {
        self.contains(x, z)
    }

    /// Unit surface normal from central differences of [`Self::height_at`].
    ///
    /// Near the border, samples that fall off the map reuse the centre height, which
    /// degrades to a one-sided difference. Off the map entirely the result is `+Y`.
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        if !self.contains(x, z) {
            return Vec3::Y;
        }
        let eps = self.config.normal_epsilon;
        let center = self.height_at(x, z);
        let sample = |sx: f32, sz: f32| {
            if self.contains(sx, sz) {
                self.height_at(sx, sz)
            } else {
                center
            }
        };

        let h_left = sample(x - eps, z);
        let h_right = sample(x + eps, z);
        let h_down = sample(x, z + eps);
        let h_up = sample(x, z - eps);

        let tangent_x = Vec3::new(2.0 * eps, h_right - h_left, 0.0);
        let tangent_z = Vec3::new(0.0, h_down - h_up, 2.0 * eps);
        tangent_z.cross(tangent_x).normalize_or(Vec3::Y)
    }

    /// Band of the raw function at `(x, z)`. Evaluates the raw signal, so keep it off hot paths.
    pub fn band_at(&self, x: f32, z: f32) -> TerrainBand {
        let px = x * COORD_FREQUENCY * self.config.scale;
        let pz = z * COORD_FREQUENCY * self.config.scale;
        TerrainBand::classify(base_signal(px, pz))
    }

    /// Triangulated render mesh sharing the bake and the diagonal of [`Self::height_at`].
    pub fn build_mesh(&self) -> TerrainMesh {
        let n = self.row_len();
        let segments = n - 1;
        let mut vertices = Vec::with_capacity(n * n);

        for r in 0..n {
            for c in 0..n {
                let (x, z) = self.vertex_position(c, r);
                vertices.push(TerrainVertex {
                    position: [x, self.heights[r * n + c], z],
                    normal: [0.0, 1.0, 0.0],
                    uv: [c as f32 / segments as f32, r as f32 / segments as f32],
                });
            }
        }

        let mut indices = Vec::with_capacity(segments * segments * 6);
        for r in 0..segments {
            for c in 0..segments {
                let i00 = (r * n + c) as u32;
                let i10 = i00 + 1;
                let i01 = ((r + 1) * n + c) as u32;
                let i11 = i01 + 1;

                // Counter-clockwise seen from +Y.
                indices.extend([i00, i01, i10]);
                indices.extend([i10, i01, i11]);
            }
        }

        calculate_normals(&mut vertices, &indices);
        TerrainMesh { vertices, indices }
    }
}

/// Render-ready triangles for a baked height field.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

fn calculate_normals(vertices: &mut [TerrainVertex], indices: &[u32]) {
    let mut normals = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let va: Vec3 = vertices[a].position.into();
        let vb: Vec3 = vertices[b].position.into();
        let vc: Vec3 = vertices[c].position.into();
        let n = (vb - va).cross(vc - va).normalize_or_zero();
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }

    for (vertex, n) in vertices.iter_mut().zip(normals) {
        vertex.normal = n.normalize_or(Vec3::Y).to_array();
    }
}
