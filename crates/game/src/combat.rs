//! Ship-side missile combat: target lock, launch cooldown and the missile battery that
//! feeds the guidance worker once per frame.

use std::time::Duration;

use engine_core::Transform;
use glam::{Quat, Vec3};
use physics::{
    GuidanceError, GuidanceParams, GuidanceWorker, HitEvent, MissilesUpdated, ProjectileState,
    TargetSnapshot,
};

use crate::config::CombatSettings;

/// Launch point below the ship's hull, in ship space.
const LAUNCH_OFFSET: Vec3 = Vec3::new(0.0, -0.5, 0.0);

/// Target with the smallest angle off `forward`, if any lies strictly inside `cone`.
pub fn acquire_target(
    origin: Vec3,
    forward: Vec3,
    targets: &[TargetSnapshot],
    cone: f32,
) -> Option<String> {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return None;
    }
    let mut best: Option<(&TargetSnapshot, f32)> = None;
    for target in targets {
        let to_target = (target.position - origin).normalize_or_zero();
        if to_target == Vec3::ZERO {
            continue;
        }
        let angle = forward.angle_between(to_target);
        if angle < best.map_or(cone, |(_, a)| a) {
            best = Some((target, angle));
        }
    }
    best.map(|(t, _)| t.name.clone())
}

/// A missile ready to be handed to the battery.
#[derive(Debug, Clone, PartialEq)]
pub struct Launch {
    pub position: Vec3,
    pub velocity: Vec3,
    pub target: Option<String>,
}

/// Rate-limits launches and picks a lock.
#[derive(Debug, Clone)]
pub struct FireControl {
    cooldown: f32,
    launch_speed: f32,
    lock_cone: f32,
    last_launch: Option<f32>,
}

impl FireControl {
    pub fn new(settings: &CombatSettings) -> Self {
        Self {
            cooldown: settings.fire_cooldown,
            launch_speed: settings.launch_speed,
            lock_cone: settings.lock_cone,
            last_launch: None,
        }
    }

    /// Launch from `ship` at time `now` unless the cooldown is still running.
    pub fn try_launch(&mut self, now: f32, ship: &Transform, targets: &[TargetSnapshot]) -> Option<Launch> {
        if let Some(last) = self.last_launch {
            if now - last <= self.cooldown {
                return None;
            }
        }
        self.last_launch = Some(now);
        Some(Launch {
            position: ship.local_to_world(LAUNCH_OFFSET),
            velocity: ship.rotate_vector(Vec3::new(0.0, 0.0, -self.launch_speed)),
            target: acquire_target(ship.position, ship.forward(), targets, self.lock_cone),
        })
    }
}

/// What the renderer needs per missile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissileView {
    pub id: u64,
    pub position: Vec3,
    pub orientation: Quat,
}

type SpawnWorker = fn(GuidanceParams) -> Result<GuidanceWorker, GuidanceError>;

/// Owns the authoritative missile list and drives the guidance worker.
///
/// At most one request is in flight. Frame deltas accumulate while waiting and go out
/// with the next request. Each reply replaces the list wholesale; missiles launched after
/// the request was sent are appended so they are not lost.
pub struct MissileBattery {
    params: GuidanceParams,
    missiles: Vec<ProjectileState>,
    /// Launched since the last request was sent.
    unsent: Vec<ProjectileState>,
    next_id: u64,
    worker: Option<GuidanceWorker>,
    spawn: SpawnWorker,
    awaiting_reply: bool,
    pending_delta: f32,
    /// Delta carried by the outstanding request; resent if the worker dies.
    sent_delta: f32,
    restarts_left: u32,
}

impl MissileBattery {
    /// Start with a fresh worker. If it cannot be started, homing stays disabled.
    pub fn new(params: GuidanceParams) -> Self {
        Self::with_spawner(params, GuidanceWorker::spawn)
    }

    fn with_spawner(params: GuidanceParams, spawn: SpawnWorker) -> Self {
        let mut battery = Self::without_worker(params);
        battery.spawn = spawn;
        battery.restarts_left = 1;
        battery.worker = match spawn(params) {
            Ok(worker) => Some(worker),
            Err(e) => {
                log::warn!("Homing missiles disabled: {}", e);
                None
            }
        };
        battery
    }

    /// A battery with no worker: missiles can be fired but never move.
    pub fn without_worker(params: GuidanceParams) -> Self {
        Self {
            params,
            missiles: Vec::new(),
            unsent: Vec::new(),
            next_id: 0,
            worker: None,
            spawn: GuidanceWorker::spawn,
            awaiting_reply: false,
            pending_delta: 0.0,
            sent_delta: 0.0,
            restarts_left: 0,
        }
    }

    pub fn homing_enabled(&self) -> bool {
        self.worker.is_some()
    }

    pub fn missiles(&self) -> &[ProjectileState] {
        &self.missiles
    }

    pub fn views(&self) -> Vec<MissileView> {
        self.missiles
            .iter()
            .map(|m| MissileView {
                id: m.id,
                position: m.position,
                orientation: m.orientation(),
            })
            .collect()
    }

    /// Add a missile; returns its id.
    pub fn fire(&mut self, launch: Launch) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        log::debug!("missile {} launched, lock: {:?}", id, launch.target);
        let missile = ProjectileState::new(id, launch.position, launch.velocity, launch.target);
        self.missiles.push(missile.clone());
        self.unsent.push(missile);
        id
    }

    /// Once per frame: apply any finished reply, then send the next snapshot if the
    /// worker is idle. Never blocks. Returns hits to resolve this frame.
    pub fn tick(&mut self, targets: Vec<TargetSnapshot>, delta: f32) -> Vec<HitEvent> {
        let mut hits = Vec::new();
        if self.worker.is_none() {
            return hits;
        }
        self.pending_delta += delta;

        loop {
            let reply = match self.worker.as_mut() {
                Some(worker) => worker.try_recv(),
                None => return hits,
            };
            match reply {
                Ok(Some(update)) => self.apply(update, &mut hits),
                Ok(None) => break,
                Err(e) => {
                    self.handle_failure(e);
                    return hits;
                }
            }
        }

        if !self.awaiting_reply {
            self.submit(targets);
        }
        hits
    }

    /// Block up to `timeout` for the outstanding reply. Used when a session winds down.
    pub fn settle(&mut self, timeout: Duration) -> Vec<HitEvent> {
        let mut hits = Vec::new();
        if !self.awaiting_reply {
            return hits;
        }
        let reply = match self.worker.as_mut() {
            Some(worker) => worker.recv_timeout(timeout),
            None => return hits,
        };
        match reply {
            Ok(Some(update)) => self.apply(update, &mut hits),
            Ok(None) => log::warn!("Guidance reply not received within {:?}", timeout),
            Err(e) => self.handle_failure(e),
        }
        hits
    }

    fn submit(&mut self, targets: Vec<TargetSnapshot>) {
        let delta = std::mem::take(&mut self.pending_delta);
        self.unsent.clear();
        if self.missiles.is_empty() {
            return;
        }
        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        self.sent_delta = delta;
        self.awaiting_reply = true;
        if let Err(e) = worker.submit(self.missiles.clone(), targets, delta) {
            self.handle_failure(e);
        }
    }

    fn apply(&mut self, update: MissilesUpdated, hits: &mut Vec<HitEvent>) {
        self.awaiting_reply = false;
        self.missiles = update.projectiles;
        self.missiles.extend(self.unsent.iter().cloned());
        for hit in &update.hits {
            log::debug!("missile {} hit {}", hit.projectile_id, hit.target);
        }
        hits.extend(update.hits);
    }

    /// The worker died. Restart it once and resend the last known list on the next
    /// tick; after that, leave missiles frozen.
    fn handle_failure(&mut self, error: GuidanceError) {
        self.worker = None;
        if std::mem::take(&mut self.awaiting_reply) {
            // The lost step's time goes out again with the resent list.
            self.pending_delta += std::mem::take(&mut self.sent_delta);
        }
        self.unsent.clear();
        if self.restarts_left == 0 {
            log::warn!("Homing missiles disabled: {}", error);
            return;
        }
        self.restarts_left -= 1;
        log::warn!("Guidance worker failed ({}), restarting", error);
        match (self.spawn)(self.params) {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => log::warn!("Homing missiles disabled: {}", e),
        }
    }

    /// Stop the worker, discarding any in-flight step.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        self.awaiting_reply = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn earth_at(z: f32) -> TargetSnapshot {
        TargetSnapshot::new("Earth", Vec3::new(0.0, 0.0, z), 0.55)
    }

    fn launch_at_earth() -> Launch {
        Launch {
            position: Vec3::ZERO,
            velocity: Vec3::new(0.0, 0.0, -40.0),
            target: Some("Earth".to_string()),
        }
    }

    #[test]
    fn lock_picks_smallest_angle_inside_cone() {
        let targets = vec![
            TargetSnapshot::new("Mars", Vec3::new(10.0, 0.0, -10.0), 0.4),
            TargetSnapshot::new("Venus", Vec3::new(1.0, 0.0, -10.0), 0.5),
            TargetSnapshot::new("Saturn", Vec3::new(0.0, 0.0, 10.0), 1.5),
        ];
        let cone = std::f32::consts::FRAC_PI_3;
        assert_eq!(
            acquire_target(Vec3::ZERO, -Vec3::Z, &targets, cone).as_deref(),
            Some("Venus")
        );
        // Only Saturn is behind; nothing inside the cone.
        assert_eq!(acquire_target(Vec3::ZERO, Vec3::X * -1.0, &targets, cone), None);
        assert_eq!(acquire_target(Vec3::ZERO, Vec3::ZERO, &targets, cone), None);
    }

    #[test]
    fn fire_control_respects_cooldown() {
        let mut fc = FireControl::new(&CombatSettings::default());
        let ship = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
        let targets = vec![earth_at(-50.0)];

        let first = fc.try_launch(1.0, &ship, &targets).unwrap();
        assert_eq!(first.position, Vec3::new(0.0, 4.5, 0.0));
        assert_eq!(first.velocity, Vec3::new(0.0, 0.0, -40.0));
        assert_eq!(first.target.as_deref(), Some("Earth"));

        assert!(fc.try_launch(1.3, &ship, &targets).is_none());
        assert!(fc.try_launch(1.5, &ship, &targets).is_none());
        assert!(fc.try_launch(1.51, &ship, &targets).is_some());
    }

    #[test]
    fn launch_follows_ship_orientation() {
        let mut fc = FireControl::new(&CombatSettings::default());
        let mut ship = Transform::default();
        ship.rotate_y(std::f32::consts::FRAC_PI_2);
        let launch = fc.try_launch(0.0, &ship, &[]).unwrap();
        assert!((launch.velocity - Vec3::new(-40.0, 0.0, 0.0)).length() < 1e-4);
        assert_eq!(launch.target, None);
    }

    #[test]
    fn without_worker_missiles_freeze() {
        let mut battery = MissileBattery::without_worker(GuidanceParams::default());
        assert!(!battery.homing_enabled());
        battery.fire(launch_at_earth());
        let hits = battery.tick(vec![earth_at(-50.0)], 0.1);
        assert!(hits.is_empty());
        assert_eq!(battery.missiles()[0].position, Vec3::ZERO);
        assert_eq!(battery.missiles()[0].lifetime, 0.0);
    }

    #[test]
    fn ids_are_unique() {
        let mut battery = MissileBattery::without_worker(GuidanceParams::default());
        let a = battery.fire(launch_at_earth());
        let b = battery.fire(launch_at_earth());
        assert_ne!(a, b);
        assert_eq!(battery.views().len(), 2);
    }

    #[test]
    fn battery_advances_missiles_through_worker() {
        let mut battery = MissileBattery::new(GuidanceParams::default());
        assert!(battery.homing_enabled());
        battery.fire(launch_at_earth());
        assert!(battery.tick(vec![earth_at(-500.0)], 0.1).is_empty());
        assert!(battery.settle(WAIT).is_empty());

        let m = &battery.missiles()[0];
        assert!((m.lifetime - 0.1).abs() < 1e-6);
        assert!((m.position.z - -6.2).abs() < 1e-3);
    }

    #[test]
    fn launch_during_flight_survives_reply() {
        let mut battery = MissileBattery::new(GuidanceParams::default());
        let first = battery.fire(launch_at_earth());
        battery.tick(vec![earth_at(-500.0)], 0.1);
        let second = battery.fire(launch_at_earth());
        battery.settle(WAIT);

        let ids: Vec<u64> = battery.missiles().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first, second]);
        // The late launch has not been stepped yet.
        assert_eq!(battery.missiles()[1].lifetime, 0.0);
    }

    #[test]
    fn hit_reported_once_through_worker() {
        let mut battery = MissileBattery::new(GuidanceParams::default());
        battery.fire(launch_at_earth());
        let mut hits = Vec::new();
        for _ in 0..400 {
            hits.extend(battery.tick(vec![earth_at(-30.0)], 0.02));
            hits.extend(battery.settle(WAIT));
            if battery.missiles().is_empty() {
                break;
            }
        }
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, "Earth");
        assert!(battery.missiles().is_empty());
        assert!(battery.tick(vec![earth_at(-30.0)], 0.02).is_empty());
    }

    fn dies_on_first_request(params: GuidanceParams) -> Result<GuidanceWorker, GuidanceError> {
        GuidanceWorker::spawn_failing_after(params, 0)
    }

    fn dies_after_twenty_replies(params: GuidanceParams) -> Result<GuidanceWorker, GuidanceError> {
        GuidanceWorker::spawn_failing_after(params, 20)
    }

    #[test]
    fn worker_loss_restarts_once_then_freezes() {
        let mut battery = MissileBattery::with_spawner(GuidanceParams::default(), dies_on_first_request);
        let id = battery.fire(launch_at_earth());
        battery.tick(vec![earth_at(-500.0)], 0.1);
        assert!(battery.awaiting_reply);
        assert!(battery.settle(WAIT).is_empty());

        // First loss: a fresh worker, the same list, and the lost step's time still owed.
        assert!(battery.homing_enabled());
        assert_eq!(battery.restarts_left, 0);
        assert_eq!(battery.missiles().len(), 1);
        assert_eq!(battery.missiles()[0].id, id);
        assert_eq!(battery.missiles()[0].lifetime, 0.0);
        assert!((battery.pending_delta - 0.1).abs() < 1e-6);

        battery.tick(vec![earth_at(-500.0)], 0.1);
        assert!(battery.awaiting_reply);
        assert_eq!(battery.worker.as_ref().map(|w| w.in_flight()), Some(1));
        assert!((battery.sent_delta - 0.2).abs() < 1e-6);

        // Second loss: homing stays off and missiles stop where they are.
        assert!(battery.settle(WAIT).is_empty());
        assert!(!battery.homing_enabled());
        for _ in 0..10 {
            assert!(battery.tick(vec![earth_at(-500.0)], 0.1).is_empty());
        }
        assert_eq!(battery.missiles()[0].position, Vec3::ZERO);
        assert_eq!(battery.missiles()[0].lifetime, 0.0);
    }

    #[test]
    fn restart_neither_loses_nor_repeats_hits() {
        let mut battery =
            MissileBattery::with_spawner(GuidanceParams::default(), dies_after_twenty_replies);
        battery.fire(launch_at_earth());
        let mut hits = Vec::new();
        for _ in 0..400 {
            hits.extend(battery.tick(vec![earth_at(-30.0)], 0.02));
            hits.extend(battery.settle(WAIT));
            if battery.missiles().is_empty() {
                break;
            }
        }
        // The first worker dies before the missile arrives; its replacement lands the hit.
        assert_eq!(battery.restarts_left, 0);
        assert!(battery.homing_enabled());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, "Earth");
        assert!(battery.missiles().is_empty());
    }

    #[test]
    fn shutdown_disables_homing() {
        let mut battery = MissileBattery::new(GuidanceParams::default());
        battery.fire(launch_at_earth());
        battery.tick(vec![earth_at(-50.0)], 0.1);
        battery.shutdown();
        assert!(!battery.homing_enabled());
        assert!(battery.tick(vec![earth_at(-50.0)], 0.1).is_empty());
    }
}
