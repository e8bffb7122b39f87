//! Simulation configuration (terrain, guidance, combat, surface). Loaded from sim.ron at startup.

use anyhow::Context;
use physics::GuidanceParams;
use procgen::{HeightFieldConfig, PlanetProfile, ScatterConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for the whole simulation. Every section and field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Black hole mass in solar masses; sets the innermost orbit.
    #[serde(default = "default_mass")]
    pub black_hole_mass: f32,
    #[serde(default)]
    pub terrain: TerrainSettings,
    #[serde(default)]
    pub guidance: GuidanceSettings,
    #[serde(default)]
    pub combat: CombatSettings,
    #[serde(default)]
    pub surface: SurfaceSettings,
}

fn default_mass() -> f32 {
    10.0
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            black_hole_mass: default_mass(),
            terrain: TerrainSettings::default(),
            guidance: GuidanceSettings::default(),
            combat: CombatSettings::default(),
            surface: SurfaceSettings::default(),
        }
    }
}

/// Height-field bake settings; the surface scale comes from the planet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub grid_size: f32,
    pub segments: u32,
    pub normal_epsilon: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        let base = HeightFieldConfig::default();
        Self {
            grid_size: base.grid_size,
            segments: base.segments,
            normal_epsilon: base.normal_epsilon,
        }
    }
}

impl TerrainSettings {
    pub fn height_field(&self, planet: &PlanetProfile) -> HeightFieldConfig {
        HeightFieldConfig {
            grid_size: self.grid_size,
            segments: self.segments,
            normal_epsilon: self.normal_epsilon,
            ..HeightFieldConfig::for_planet(planet)
        }
    }
}

/// Missile guidance constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceSettings {
    pub steer_rate: f32,
    pub base_speed: f32,
    pub acceleration: f32,
    pub hit_radius_factor: f32,
    pub max_lifetime: f32,
}

impl Default for GuidanceSettings {
    fn default() -> Self {
        let p = GuidanceParams::default();
        Self {
            steer_rate: p.steer_rate,
            base_speed: p.base_speed,
            acceleration: p.acceleration,
            hit_radius_factor: p.hit_radius_factor,
            max_lifetime: p.max_lifetime,
        }
    }
}

impl From<&GuidanceSettings> for GuidanceParams {
    fn from(s: &GuidanceSettings) -> Self {
        Self {
            steer_rate: s.steer_rate,
            base_speed: s.base_speed,
            acceleration: s.acceleration,
            hit_radius_factor: s.hit_radius_factor,
            max_lifetime: s.max_lifetime,
        }
    }
}

/// Fire control and damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    /// Minimum seconds between launches.
    pub fire_cooldown: f32,
    /// Initial missile speed along the ship's forward axis.
    pub launch_speed: f32,
    /// Half-angle (radians) of the lock-on cone.
    pub lock_cone: f32,
    pub missile_damage: f32,
    pub planet_health: f32,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            fire_cooldown: 0.5,
            launch_speed: 40.0,
            lock_cone: std::f32::consts::FRAC_PI_3,
            missile_damage: 200.0,
            planet_health: 1000.0,
        }
    }
}

/// Population budgets for a planet surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    pub seed: u64,
    pub vegetation: usize,
    pub settlements: usize,
    pub grass: usize,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        let s = ScatterConfig::default();
        Self {
            seed: s.seed,
            vegetation: s.vegetation,
            settlements: s.settlements,
            grass: s.grass,
        }
    }
}

impl From<&SurfaceSettings> for ScatterConfig {
    fn from(s: &SurfaceSettings) -> Self {
        Self {
            seed: s.seed,
            vegetation: s.vegetation,
            settlements: s.settlements,
            grass: s.grass,
        }
    }
}

impl SimConfig {
    /// Load config from `sim.ron`. If the file is invalid, returns default config; if it is
    /// missing, also writes the defaults there as a template.
    pub fn load() -> Self {
        Self::load_or_init(&config_path())
    }

    /// [`Self::load_from`], writing the defaults to `path` when no file exists yet.
    pub fn load_or_init(path: &Path) -> Self {
        if path.exists() {
            return Self::load_from(path);
        }
        let config = Self::default();
        match config.save_to(path) {
            Ok(()) => log::info!("Wrote default config to {:?}", path),
            Err(e) => log::warn!("{:#}", e),
        }
        config
    }

    /// Load from an explicit path with the same fallback policy as [`Self::load`].
    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match Self::parse(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {:#}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Parse RON text.
    pub fn parse(data: &str) -> anyhow::Result<Self> {
        ron::from_str(data).context("parsing simulation config")
    }

    /// Save current config to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("serialising simulation config")?;
        std::fs::write(path, text).with_context(|| format!("writing config to {:?}", path))
    }

    pub fn guidance_params(&self) -> GuidanceParams {
        GuidanceParams::from(&self.guidance)
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("sim.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_constants() {
        let c = SimConfig::default();
        assert_eq!(c.guidance_params(), GuidanceParams::default());
        assert_eq!(c.terrain.segments, 256);
        assert_eq!(c.terrain.grid_size, 400.0);
        assert_eq!(c.combat.fire_cooldown, 0.5);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let c = SimConfig::parse("(guidance: (steer_rate: 2.5), black_hole_mass: 4.0)").unwrap();
        assert_eq!(c.guidance.steer_rate, 2.5);
        assert_eq!(c.guidance.base_speed, 60.0);
        assert_eq!(c.black_hole_mass, 4.0);
        assert_eq!(c.surface, SurfaceSettings::default());
    }

    #[test]
    fn invalid_text_is_an_error_and_missing_file_is_default() {
        assert!(SimConfig::parse("(guidance: oops)").is_err());
        let missing = std::env::temp_dir().join("blackhole-sim-missing-config.ron");
        assert_eq!(SimConfig::load_from(&missing), SimConfig::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let path = std::env::temp_dir().join(format!("blackhole-sim-{}.ron", std::process::id()));
        let mut c = SimConfig::default();
        c.combat.missile_damage = 350.0;
        c.surface.seed = 42;
        c.save_to(&path).unwrap();
        let loaded = SimConfig::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, c);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = std::env::temp_dir().join(format!("blackhole-sim-init-{}.ron", std::process::id()));
        let _ = std::fs::remove_file(&path);
        assert_eq!(SimConfig::load_or_init(&path), SimConfig::default());
        assert!(path.exists());

        // An existing file is read, never overwritten.
        std::fs::write(&path, "(black_hole_mass: 2.0)").unwrap();
        assert_eq!(SimConfig::load_or_init(&path).black_hole_mass, 2.0);
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(text, "(black_hole_mass: 2.0)");
    }

    #[test]
    fn planet_scale_flows_into_height_field() {
        let mars = procgen::find_planet("Mars").unwrap();
        let hf = TerrainSettings::default().height_field(&mars);
        assert_eq!(hf.scale, 1.2);
        assert_eq!(hf.segments, 256);
    }
}
