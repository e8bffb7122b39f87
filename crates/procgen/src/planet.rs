//! Planet catalog: the solar-system bodies orbiting the black hole plus a few exoplanets.
//!
//! A profile carries everything the core needs from a planet: its target size (collision
//! radius for missiles) and its surface scale (frequency of the baked terrain).

use glam::Vec3;

/// Weather type shown on a planet's surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weather {
    Rain,
    Snow,
}

/// Where a body sits in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Circular orbit around the black hole, outside its safe zone.
    Orbit { distance_offset: f32, speed: f32 },
    /// Fixed world position (exoplanets on the intergalactic map).
    Fixed(Vec3),
}

/// Static description of a planet.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetProfile {
    pub name: &'static str,
    /// Visual radius; missile hit radius is derived from it.
    pub size: f32,
    /// Frequency multiplier of the surface height field.
    pub surface_scale: f32,
    pub placement: Placement,
    pub weather: Option<Weather>,
}

impl PlanetProfile {
    const fn orbiting(
        name: &'static str,
        size: f32,
        surface_scale: f32,
        distance_offset: f32,
        speed: f32,
        weather: Option<Weather>,
    ) -> Self {
        Self {
            name,
            size,
            surface_scale,
            placement: Placement::Orbit {
                distance_offset,
                speed,
            },
            weather,
        }
    }

    /// World position at time `elapsed` (seconds) for a black hole of `mass` solar masses.
    pub fn position_at(&self, elapsed: f32, mass: f32) -> Vec3 {
        match self.placement {
            Placement::Orbit {
                distance_offset,
                speed,
            } => {
                let radius = safe_zone_radius(mass) + distance_offset;
                let angle = elapsed * speed * 0.1;
                Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
            }
            Placement::Fixed(position) => position,
        }
    }

    pub fn is_orbiting(&self) -> bool {
        matches!(self.placement, Placement::Orbit { .. })
    }
}

/// Radius of the black hole's event horizon (scene units).
pub fn horizon_radius(mass: f32) -> f32 {
    mass.max(0.0).sqrt() * 0.5
}

/// Innermost orbit radius; planets orbit at this plus their distance offset.
pub fn safe_zone_radius(mass: f32) -> f32 {
    horizon_radius(mass) * 10.0 + 10.0
}

/// The eight planets orbiting the black hole.
pub const SOLAR_PLANETS: [PlanetProfile; 8] = [
    PlanetProfile::orbiting("Mercury", 0.3, 1.5, 0.0, 4.1, None),
    PlanetProfile::orbiting("Venus", 0.5, 2.0, 4.0, 3.2, Some(Weather::Rain)),
    PlanetProfile::orbiting("Earth", 0.55, 1.0, 8.0, 2.6, Some(Weather::Rain)),
    PlanetProfile::orbiting("Mars", 0.4, 1.2, 11.0, 2.1, None),
    PlanetProfile::orbiting("Jupiter", 1.8, 2.5, 18.0, 1.1, None),
    PlanetProfile::orbiting("Saturn", 1.5, 2.2, 26.0, 0.8, None),
    PlanetProfile::orbiting("Uranus", 1.0, 1.5, 33.0, 0.5, Some(Weather::Snow)),
    PlanetProfile::orbiting("Neptune", 1.0, 1.5, 39.0, 0.4, Some(Weather::Snow)),
];

/// Exoplanets at fixed positions; landable but not orbiting.
pub fn exoplanets() -> [PlanetProfile; 3] {
    [
        PlanetProfile {
            name: "Proxima B",
            size: 0.6,
            surface_scale: 1.5,
            placement: Placement::Fixed(Vec3::new(120.0, 10.0, -120.0)),
            weather: Some(Weather::Rain),
        },
        PlanetProfile {
            name: "Kepler-186f",
            size: 0.6,
            surface_scale: 1.0,
            placement: Placement::Fixed(Vec3::new(-150.0, -20.0, 100.0)),
            weather: Some(Weather::Snow),
        },
        PlanetProfile {
            name: "TRAPPIST-1e",
            size: 0.5,
            surface_scale: 1.1,
            placement: Placement::Fixed(Vec3::new(80.0, 40.0, 200.0)),
            weather: None,
        },
    ]
}

/// Every known planet, solar system first.
pub fn catalog() -> Vec<PlanetProfile> {
    SOLAR_PLANETS.iter().cloned().chain(exoplanets()).collect()
}

/// Look up a planet by exact name.
pub fn find_planet(name: &str) -> Option<PlanetProfile> {
    catalog().into_iter().find(|p| p.name == name)
}
