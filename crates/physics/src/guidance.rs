//! Homing-missile guidance step.
//!
//! A pure function of the submitted snapshot: projectiles and target positions go in, the
//! surviving projectiles and any hits come out. Nothing is retained between steps, so the
//! step can run on any thread and be restarted by simply resubmitting the last list.

use engine_core::facing;
use glam::{Quat, Vec3};

/// Tuning constants for guidance. `Default` gives the stock missile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceParams {
    /// Blend factor per second toward the target direction (`steer_rate * delta` per step).
    pub steer_rate: f32,
    /// Speed at launch while guided.
    pub base_speed: f32,
    /// Speed gained per second of lifetime while guided.
    pub acceleration: f32,
    /// Hit when closer than `target.size * hit_radius_factor`.
    pub hit_radius_factor: f32,
    /// Projectiles expire once their lifetime reaches this.
    pub max_lifetime: f32,
}

impl Default for GuidanceParams {
    fn default() -> Self {
        Self {
            steer_rate: 4.0,
            base_speed: 60.0,
            acceleration: 20.0,
            hit_radius_factor: 2.0,
            max_lifetime: 8.0,
        }
    }
}

impl GuidanceParams {
    /// Guided speed after `lifetime` seconds.
    pub fn speed_at(&self, lifetime: f32) -> f32 {
        self.base_speed + lifetime * self.acceleration
    }
}

/// Kinematic state of one missile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileState {
    pub id: u64,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds since launch; never negative.
    pub lifetime: f32,
    /// Name of the target to home on, if any.
    pub target: Option<String>,
}

impl ProjectileState {
    pub fn new(id: u64, position: Vec3, velocity: Vec3, target: Option<String>) -> Self {
        Self {
            id,
            position,
            velocity,
            lifetime: 0.0,
            target,
        }
    }

    /// Render orientation: forward (-Z) along the velocity. Derived, never stored.
    pub fn orientation(&self) -> Quat {
        facing(self.velocity)
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Read-only view of a target for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSnapshot {
    pub name: String,
    pub position: Vec3,
    /// Size scalar; the hit radius is derived from it.
    pub size: f32,
}

impl TargetSnapshot {
    pub fn new(name: impl Into<String>, position: Vec3, size: f32) -> Self {
        Self {
            name: name.into(),
            position,
            size,
        }
    }

    pub fn hit_radius(&self, params: &GuidanceParams) -> f32 {
        self.size * params.hit_radius_factor
    }
}

/// A missile reached its target this step.
#[derive(Debug, Clone, PartialEq)]
pub struct HitEvent {
    pub target: String,
    pub position: Vec3,
    pub projectile_id: u64,
}

/// Output of one guidance step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    /// Projectiles still in flight, in input order.
    pub projectiles: Vec<ProjectileState>,
    pub hits: Vec<HitEvent>,
    /// Projectiles dropped by the lifetime cap this step.
    pub expired: usize,
}

/// Advance every projectile by `delta` seconds.
pub fn step(
    projectiles: Vec<ProjectileState>,
    targets: &[TargetSnapshot],
    delta: f32,
    params: &GuidanceParams,
) -> StepOutcome {
    let mut outcome = StepOutcome {
        projectiles: Vec::with_capacity(projectiles.len()),
        ..Default::default()
    };

    for mut missile in projectiles {
        missile.lifetime += delta;

        if let Some(target) = missile
            .target
            .as_deref()
            .and_then(|name| targets.iter().find(|t| t.name == name))
        {
            steer(&mut missile, target.position, delta, params);

            if missile.position.distance(target.position) < target.hit_radius(params) {
                outcome.hits.push(HitEvent {
                    target: target.name.clone(),
                    position: missile.position,
                    projectile_id: missile.id,
                });
                continue;
            }
        }

        missile.position += missile.velocity * delta;

        if missile.lifetime < params.max_lifetime {
            outcome.projectiles.push(missile);
        } else {
            outcome.expired += 1;
        }
    }

    outcome
}

/// Turn toward `aim` at a bounded rate and apply the lifetime speed curve.
fn steer(missile: &mut ProjectileState, aim: Vec3, delta: f32, params: &GuidanceParams) {
    let desired = (aim - missile.position).normalize_or_zero();
    let current = missile.velocity.normalize_or_zero();
    let blend = (params.steer_rate * delta).clamp(0.0, 1.0);
    // Exactly opposed directions cancel at blend 0.5; fall back to the target direction.
    let direction = current.lerp(desired, blend).normalize_or(desired);
    missile.velocity = direction * params.speed_at(missile.lifetime);
}
