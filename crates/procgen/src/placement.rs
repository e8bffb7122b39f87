//! Scatter vegetation, settlements and grass over a baked height field.
//!
//! Every candidate is judged by height and local slope read from the baked grid.
//! Candidates come from a seeded RNG so a planet surface always populates identically.

use glam::Vec3;
use rand::prelude::*;

use crate::terrain::HeightField;

/// Tree species chosen by elevation and steepness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VegetationKind {
    Palm,
    Oak,
    Pine,
    Dead,
}

impl VegetationKind {
    /// First matching species for a site, or `None` if nothing grows there.
    pub fn classify(height: f32, slope: f32) -> Option<Self> {
        if height > -1.0 && height < 1.5 && slope < 0.5 {
            Some(VegetationKind::Palm)
        } else if (1.5..8.0).contains(&height) && slope < 1.0 {
            Some(VegetationKind::Oak)
        } else if (5.0..16.0).contains(&height) && slope > 0.5 {
            Some(VegetationKind::Pine)
        } else if (10.0..20.0).contains(&height) && slope > 1.2 {
            Some(VegetationKind::Dead)
        } else {
            None
        }
    }

    /// Maximum instances of this species out of a budget of `count`.
    pub fn cap(self, count: usize) -> usize {
        match self {
            VegetationKind::Palm => count / 4,
            VegetationKind::Oak => count / 2,
            VegetationKind::Pine => count / 3,
            VegetationKind::Dead => count / 5,
        }
    }
}

/// A placed object on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placed<K> {
    pub kind: K,
    pub position: Vec3,
    /// Rotation about +Y in radians.
    pub yaw: f32,
}

/// Largest forward-difference rise over `step` in +X or +Z.
pub fn slope_at(field: &HeightField, x: f32, z: f32, step: f32) -> f32 {
    let h = field.height_at(x, z);
    let h_right = field.height_at(x + step, z);
    let h_front = field.height_at(x, z + step);
    (h_right - h).abs().max((h_front - h).abs())
}

/// Whether a settlement may be built at `(x, z)`: dry, low and flat.
pub fn is_buildable(field: &HeightField, x: f32, z: f32) -> bool {
    let h = field.height_at(x, z);
    h > 2.0 && h < 10.0 && slope_at(field, x, z, 2.0) < 0.5
}

/// Settings for one population pass.
#[derive(Debug, Clone, Copy)]
pub struct ScatterConfig {
    pub seed: u64,
    pub vegetation: usize,
    pub settlements: usize,
    pub grass: usize,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            vegetation: 2000,
            settlements: 50,
            grass: 40000,
        }
    }
}

/// Result of populating one surface.
#[derive(Debug, Clone, Default)]
pub struct SurfacePopulation {
    pub vegetation: Vec<Placed<VegetationKind>>,
    pub settlements: Vec<Placed<()>>,
    pub grass: Vec<Vec3>,
}

impl SurfacePopulation {
    pub fn count(&self, kind: VegetationKind) -> usize {
        self.vegetation.iter().filter(|p| p.kind == kind).count()
    }
}

/// Populate a surface. Uses independent RNG streams per layer so changing one budget
/// leaves the other layers untouched.
pub fn populate(field: &HeightField, config: &ScatterConfig) -> SurfacePopulation {
    let population = SurfacePopulation {
        vegetation: scatter_vegetation(field, config.vegetation, config.seed),
        settlements: scatter_settlements(field, config.settlements, config.seed.wrapping_add(1)),
        grass: scatter_grass(field, config.grass, config.seed.wrapping_add(2)),
    };
    log::info!(
        "Populated surface: {} trees, {} settlements, {} grass tufts",
        population.vegetation.len(),
        population.settlements.len(),
        population.grass.len()
    );
    population
}

/// Place up to `count` trees, respecting per-species caps.
pub fn scatter_vegetation(field: &HeightField, count: usize, seed: u64) -> Vec<Placed<VegetationKind>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let extent = 380.0_f32.min(field.config().grid_size);
    let mut placed = Vec::new();
    let mut counts = [0usize; 4];

    for _ in 0..(count * 3 / 2) {
        let x = (rng.gen::<f32>() - 0.5) * extent;
        let z = (rng.gen::<f32>() - 0.5) * extent;
        let yaw = rng.gen::<f32>() * std::f32::consts::TAU;
        let h = field.height_at(x, z);
        let Some(kind) = VegetationKind::classify(h, slope_at(field, x, z, 1.0)) else {
            continue;
        };
        let slot = kind as usize;
        if counts[slot] >= kind.cap(count) {
            continue;
        }
        counts[slot] += 1;
        // Sink the trunk slightly so it never floats on a slope.
        placed.push(Placed {
            kind,
            position: Vec3::new(x, h - 0.2, z),
            yaw,
        });
    }
    placed
}

/// Place up to `count` settlements on buildable land, giving up after `count * 10` tries.
pub fn scatter_settlements(field: &HeightField, count: usize, seed: u64) -> Vec<Placed<()>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let extent = 300.0_f32.min(field.config().grid_size);
    let mut placed = Vec::with_capacity(count);
    let mut attempts = 0;

    while placed.len() < count && attempts < count * 10 {
        attempts += 1;
        let x = (rng.gen::<f32>() - 0.5) * extent;
        let z = (rng.gen::<f32>() - 0.5) * extent;
        let yaw = rng.gen::<f32>() * std::f32::consts::TAU;
        if is_buildable(field, x, z) {
            placed.push(Placed {
                kind: (),
                position: Vec3::new(x, field.height_at(x, z), z),
                yaw,
            });
        }
    }
    log::debug!("settlements: {} placed in {} attempts", placed.len(), attempts);
    placed
}

/// Grass tufts on mid-elevation ground.
pub fn scatter_grass(field: &HeightField, count: usize, seed: u64) -> Vec<Vec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    let extent = field.config().grid_size * 0.95;
    (0..count)
        .filter_map(|_| {
            let x = (rng.gen::<f32>() - 0.5) * extent;
            let z = (rng.gen::<f32>() - 0.5) * extent;
            let h = field.height_at(x, z);
            (h > 1.5 && h < 12.0).then(|| Vec3::new(x, h - 0.1, z))
        })
        .collect()
}
