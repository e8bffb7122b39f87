//! Planets orbiting the black hole, as ECS entities that missiles can lock onto and destroy.

use engine_core::{Health, Transform};
use glam::Vec3;
use hecs::{Entity, World};
use physics::{HitEvent, TargetSnapshot};
use procgen::{PlanetProfile, SOLAR_PLANETS};

/// A targetable planet.
#[derive(Debug, Clone)]
pub struct CelestialBody {
    pub profile: PlanetProfile,
}

/// The orbiting planets and their damage state.
pub struct SolarSystem {
    world: World,
    black_hole_mass: f32,
}

impl SolarSystem {
    /// Spawn every solar-system planet at full health.
    pub fn new(black_hole_mass: f32, planet_health: f32) -> Self {
        let mut world = World::new();
        for profile in SOLAR_PLANETS.iter().cloned() {
            world.spawn((
                Transform::from_position(profile.position_at(0.0, black_hole_mass)),
                Health::new(planet_health),
                CelestialBody { profile },
            ));
        }
        Self {
            world,
            black_hole_mass,
        }
    }

    /// Move live planets along their orbits. Destroyed planets stay where they died.
    pub fn update(&mut self, elapsed: f32) {
        let mass = self.black_hole_mass;
        for (_, (transform, body, health)) in
            self.world.query_mut::<(&mut Transform, &CelestialBody, &Health)>()
        {
            if !health.is_dead() {
                transform.position = body.profile.position_at(elapsed, mass);
            }
        }
    }

    /// Fresh snapshot of every live planet for the guidance step.
    pub fn targets(&self) -> Vec<TargetSnapshot> {
        self.world
            .query::<(&Transform, &CelestialBody, &Health)>()
            .iter()
            .filter(|(_, (_, _, health))| !health.is_dead())
            .map(|(_, (transform, body, _))| {
                TargetSnapshot::new(body.profile.name, transform.position, body.profile.size)
            })
            .collect()
    }

    fn find(&self, name: &str) -> Option<Entity> {
        self.world
            .query::<&CelestialBody>()
            .iter()
            .find(|(_, body)| body.profile.name == name)
            .map(|(entity, _)| entity)
    }

    /// Apply missile damage. Returns the planet's name if this hit destroyed it.
    /// Hits on unknown or already destroyed planets are ignored.
    pub fn apply_hit(&mut self, hit: &HitEvent, damage: f32) -> Option<&'static str> {
        let entity = self.find(&hit.target)?;
        let killed = {
            let mut health = self.world.get::<&mut Health>(entity).ok()?;
            if health.is_dead() {
                return None;
            }
            health.take_damage(damage)
        };
        let body = self.world.get::<&CelestialBody>(entity).ok()?;
        if killed {
            log::info!("{} destroyed at {:?}", body.profile.name, hit.position);
            Some(body.profile.name)
        } else {
            None
        }
    }

    pub fn health_of(&self, name: &str) -> Option<Health> {
        let entity = self.find(name)?;
        self.world.get::<&Health>(entity).ok().map(|h| *h)
    }

    pub fn position_of(&self, name: &str) -> Option<Vec3> {
        let entity = self.find(name)?;
        self.world.get::<&Transform>(entity).ok().map(|t| t.position)
    }

    /// Names of planets with no health left.
    pub fn destroyed(&self) -> Vec<&'static str> {
        self.world
            .query::<(&CelestialBody, &Health)>()
            .iter()
            .filter(|(_, (_, health))| health.is_dead())
            .map(|(_, (body, _))| body.profile.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(name: &str) -> HitEvent {
        HitEvent {
            target: name.to_string(),
            position: Vec3::ZERO,
            projectile_id: 0,
        }
    }

    #[test]
    fn all_planets_start_as_targets() {
        let system = SolarSystem::new(10.0, 1000.0);
        let targets = system.targets();
        assert_eq!(targets.len(), 8);
        let earth = targets.iter().find(|t| t.name == "Earth").unwrap();
        assert_eq!(earth.size, 0.55);
    }

    #[test]
    fn update_moves_planets_along_orbit() {
        let mut system = SolarSystem::new(4.0, 1000.0);
        let before = system.position_of("Venus").unwrap();
        system.update(5.0);
        let after = system.position_of("Venus").unwrap();
        assert_ne!(before, after);
        assert!((before.length() - after.length()).abs() < 1e-3);
    }

    #[test]
    fn five_hits_destroy_a_planet_once() {
        let mut system = SolarSystem::new(10.0, 1000.0);
        for _ in 0..4 {
            assert_eq!(system.apply_hit(&hit("Mars"), 200.0), None);
        }
        assert_eq!(system.apply_hit(&hit("Mars"), 200.0), Some("Mars"));
        assert_eq!(system.apply_hit(&hit("Mars"), 200.0), None);
        assert_eq!(system.destroyed(), vec!["Mars"]);
        assert!(system.targets().iter().all(|t| t.name != "Mars"));
        assert_eq!(system.health_of("Mars").unwrap().current, 0.0);
    }

    #[test]
    fn destroyed_planet_stops_orbiting() {
        let mut system = SolarSystem::new(10.0, 100.0);
        system.apply_hit(&hit("Earth"), 200.0);
        let wreck = system.position_of("Earth").unwrap();
        system.update(30.0);
        assert_eq!(system.position_of("Earth").unwrap(), wreck);
    }

    #[test]
    fn unknown_target_is_ignored() {
        let mut system = SolarSystem::new(10.0, 1000.0);
        assert_eq!(system.apply_hit(&hit("Pluto"), 200.0), None);
        assert!(system.destroyed().is_empty());
    }
}
