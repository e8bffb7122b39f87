//! Walkable planet surface: one baked height field per landing, plus the walker that
//! collides against it.

use anyhow::Context;
use glam::{Quat, Vec3};
use procgen::{populate, HeightField, PlanetProfile, ScatterConfig, SurfacePopulation};

use crate::config::SimConfig;

/// Physics sub-steps per frame for the walker.
pub const WALK_SUBSTEPS: u32 = 8;
pub const WALK_SPEED: f32 = 18.0;
pub const GRAVITY: f32 = 50.0;
pub const TERMINAL_FALL_SPEED: f32 = 60.0;
pub const JUMP_SPEED: f32 = 18.0;
/// Camera height above the ground.
pub const EYE_HEIGHT: f32 = 4.0;
/// Radius of the footprint sampled for ground contact.
pub const FOOTPRINT_RADIUS: f32 = 1.5;
/// Slopes whose normal has less vertical component than this are slid along.
pub const MAX_WALKABLE_NORMAL_Y: f32 = 0.5;
/// Drop height when landing somewhere without ground.
const SPAWN_ALTITUDE: f32 = 50.0;

/// A landing on one planet. Dropping it discards the baked terrain.
pub struct SurfaceSession {
    planet: PlanetProfile,
    field: HeightField,
    population: SurfacePopulation,
}

impl SurfaceSession {
    /// Bake the planet's terrain and populate it.
    pub fn enter(planet: PlanetProfile, config: &SimConfig) -> anyhow::Result<Self> {
        log::info!(
            "Landing on {} (surface scale {}, weather {:?})",
            planet.name,
            planet.surface_scale,
            planet.weather
        );
        let field = HeightField::bake(config.terrain.height_field(&planet))
            .with_context(|| format!("baking surface of {}", planet.name))?;
        log::info!("{:?} terrain at the landing site", field.band_at(0.0, 0.0));
        let population = populate(&field, &ScatterConfig::from(&config.surface));
        Ok(Self {
            planet,
            field,
            population,
        })
    }

    pub fn planet(&self) -> &PlanetProfile {
        &self.planet
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn population(&self) -> &SurfacePopulation {
        &self.population
    }

    /// A walker standing at `(x, z)`, or dropping from altitude if there is no ground.
    pub fn spawn_walker(&self, x: f32, z: f32) -> Walker {
        let y = match ground_under(&self.field, x, z) {
            Some(ground) => ground + EYE_HEIGHT,
            None => SPAWN_ALTITUDE,
        };
        Walker::new(Vec3::new(x, y, z))
    }
}

/// Highest ground under the walker's footprint, ignoring samples that fall off the map.
/// `None` means nothing to stand on.
pub fn ground_under(field: &HeightField, x: f32, z: f32) -> Option<f32> {
    let r = FOOTPRINT_RADIUS;
    [(x, z), (x, z + r), (x, z - r), (x - r, z), (x + r, z)]
        .into_iter()
        .filter(|&(sx, sz)| field.has_ground(sx, sz))
        .map(|(sx, sz)| field.height_at(sx, sz))
        .reduce(f32::max)
}

/// Project a horizontal move onto the slope plane when the slope is too steep to climb.
pub fn slide_on_slope(step: Vec3, normal: Vec3) -> Vec3 {
    if normal.y < MAX_WALKABLE_NORMAL_Y {
        step - normal * step.dot(normal)
    } else {
        step
    }
}

/// Movement intent for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkInput {
    /// +1 forward, -1 back.
    pub forward: f32,
    /// +1 right, -1 left.
    pub strafe: f32,
    pub jump: bool,
    /// Camera heading around +Y, radians.
    pub yaw: f32,
}

/// Third-person walker on a baked surface. `position` is the eye point.
#[derive(Debug, Clone)]
pub struct Walker {
    pub position: Vec3,
    pub vertical_velocity: f32,
    pub grounded: bool,
}

impl Walker {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            vertical_velocity: 0.0,
            grounded: false,
        }
    }

    /// Advance one frame in [`WALK_SUBSTEPS`] equal sub-steps.
    pub fn update(&mut self, field: &HeightField, input: &WalkInput, dt: f32) {
        if input.jump && self.grounded {
            self.vertical_velocity = JUMP_SPEED;
            self.grounded = false;
        }

        let heading = Quat::from_rotation_y(input.yaw);
        let wish = heading * Vec3::new(input.strafe, 0.0, -input.forward);
        let wish = Vec3::new(wish.x, 0.0, wish.z).normalize_or_zero();
        let sub_dt = dt / WALK_SUBSTEPS as f32;

        for _ in 0..WALK_SUBSTEPS {
            if wish != Vec3::ZERO {
                let step = wish * WALK_SPEED * sub_dt;
                let normal = field.normal_at(self.position.x, self.position.z);
                self.position += slide_on_slope(step, normal);
            }

            self.vertical_velocity =
                (self.vertical_velocity - GRAVITY * sub_dt).max(-TERMINAL_FALL_SPEED);
            self.position.y += self.vertical_velocity * sub_dt;

            match ground_under(field, self.position.x, self.position.z) {
                Some(ground) if self.position.y < ground + EYE_HEIGHT => {
                    self.position.y = ground + EYE_HEIGHT;
                    self.vertical_velocity = 0.0;
                    self.grounded = true;
                }
                _ => self.grounded = false,
            }
        }
    }
}
