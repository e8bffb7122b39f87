//! blackhole-sim: headless run of the black hole scene's simulation core.
//!
//! Flies a ship through the solar system firing homing missiles at the nearest planet,
//! then lands on Earth, bakes its surface and walks across it.

mod combat;
mod config;
mod solar;
mod surface;

use std::time::Duration;

use anyhow::{Context, Result};
use engine_core::{facing, Time, Transform};
use glam::Vec3;
use procgen::{find_planet, VegetationKind, SOLAR_PLANETS};

use combat::{FireControl, MissileBattery};
use config::SimConfig;
use solar::SolarSystem;
use surface::{ground_under, SurfaceSession, WalkInput};

/// Simulated frame length (60 Hz).
const FRAME: Duration = Duration::from_micros(16_667);
const BATTLE_FRAMES: u32 = 60 * 30;
const WALK_FRAMES: u32 = 60 * 5;

fn run_space_battle(config: &SimConfig) {
    let mut time = Time::new();
    let mut solar = SolarSystem::new(config.black_hole_mass, config.combat.planet_health);
    let mut fire_control = FireControl::new(&config.combat);
    let mut battery = MissileBattery::new(config.guidance_params());
    let mut ship = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
    let mut launched = 0u32;
    let mut hits = 0u32;
    log::info!(
        "Missile guidance {}",
        if battery.homing_enabled() { "online" } else { "offline, missiles will not move" }
    );

    for _ in 0..BATTLE_FRAMES {
        time.advance(FRAME);
        solar.update(time.elapsed_seconds());
        let targets = solar.targets();

        // Keep the nose on the nearest live planet and fire whenever the launcher is ready.
        let nearest = targets.iter().min_by(|a, b| {
            a.position
                .distance_squared(ship.position)
                .total_cmp(&b.position.distance_squared(ship.position))
        });
        if let Some(target) = nearest {
            ship.rotation = facing(target.position - ship.position);
            if let Some(launch) = fire_control.try_launch(time.elapsed_seconds(), &ship, &targets) {
                battery.fire(launch);
                launched += 1;
            }
        }

        for hit in battery.tick(targets, time.delta_seconds()) {
            hits += 1;
            solar.apply_hit(&hit, config.combat.missile_damage);
            if let Some(health) = solar.health_of(&hit.target) {
                log::debug!("{} hit, {:.0}% health left", hit.target, health.percentage() * 100.0);
            }
        }
    }

    for hit in battery.settle(Duration::from_secs(1)) {
        hits += 1;
        solar.apply_hit(&hit, config.combat.missile_damage);
    }
    let in_flight = battery.missiles().len();
    for view in battery.views() {
        log::debug!("missile {} still flying at {:?}", view.id, view.position);
    }
    battery.shutdown();

    log::info!(
        "Battle over after {:.1}s ({} frames): {} launched, {} hits, {} in flight, destroyed {:?}",
        time.elapsed_seconds(),
        time.frame_count(),
        launched,
        hits,
        in_flight,
        solar.destroyed()
    );
    for profile in SOLAR_PLANETS.iter() {
        if let (Some(health), Some(position)) =
            (solar.health_of(profile.name), solar.position_of(profile.name))
        {
            log::info!(
                "  {:<8} {:>5.0}% at ({:.1}, {:.1})",
                profile.name,
                health.percentage() * 100.0,
                position.x,
                position.z
            );
        }
    }
}

fn run_surface_walk(config: &SimConfig) -> Result<()> {
    let earth = find_planet("Earth").context("Earth missing from planet catalog")?;
    let session = SurfaceSession::enter(earth, config)?;

    let mesh = session.field().build_mesh();
    log::info!(
        "{} terrain mesh: {} vertices, {} triangles",
        session.planet().name,
        mesh.vertices.len(),
        mesh.indices.len() / 3
    );

    let population = session.population();
    for kind in [
        VegetationKind::Palm,
        VegetationKind::Oak,
        VegetationKind::Pine,
        VegetationKind::Dead,
    ] {
        log::info!("  {:?}: {}", kind, population.count(kind));
    }

    let mut time = Time::new();
    let mut walker = session.spawn_walker(0.0, 0.0);
    let input = WalkInput {
        forward: 1.0,
        yaw: 0.3,
        ..Default::default()
    };
    for _ in 0..WALK_FRAMES {
        time.advance(FRAME);
        walker.update(session.field(), &input, time.delta_seconds());
    }

    let p = walker.position;
    match ground_under(session.field(), p.x, p.z) {
        Some(ground) => log::info!(
            "Walker at ({:.1}, {:.1}, {:.1}), ground {:.2}, slope normal {:?}",
            p.x,
            p.y,
            p.z,
            ground,
            session.field().normal_at(p.x, p.z)
        ),
        None => log::info!("Walker left the map at ({:.1}, {:.1}) and is falling", p.x, p.z),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SimConfig::load();
    log::info!("Black hole mass {} M☉", config.black_hole_mass);

    run_space_battle(&config);
    run_surface_walk(&config)?;
    Ok(())
}
