//! The session orchestrator: owns the live level, sequences every subsystem
//! once per tick, validates commands, and drives the session state machine.

use serde::{Deserialize, Serialize};

use gloam_core::time::clamp_delta_ms;
use gloam_core::{Aabb, Outbox, Simulation, Size, Vec2};

use crate::adversary::{
    Adversary, AdversaryId, Behavior, BehaviorContext, Body, Effects, Noise, Patrol, PhantomState,
    update_adversary,
};
use crate::ambient::{AmbientLight, LeverBank};
use crate::collision::{is_clear, resolve_axis_separated};
use crate::config::EscapeConfig;
use crate::events::{SimEvent, SpawnKind, SpawnRequest};
use crate::interactions;
use crate::level::{LevelError, LevelState, LevelTemplate};
use crate::player::{Loudness, MovementIntent, update_player};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Menu,
    Playing,
    PausedForModal,
    LevelComplete,
    GameOver,
    Victory,
}

impl SessionPhase {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            SessionPhase::LevelComplete | SessionPhase::GameOver | SessionPhase::Victory
        )
    }
}

#[derive(Serialize)]
struct SavedSessionRef<'a> {
    phase: SessionPhase,
    intent: &'a MovementIntent,
    level: &'a LevelState,
    template: Option<&'a LevelTemplate>,
}

#[derive(Deserialize)]
struct SavedSession {
    phase: SessionPhase,
    intent: MovementIntent,
    level: LevelState,
    /// Kept so a restored session can restart its level.
    #[serde(default)]
    template: Option<LevelTemplate>,
}

#[derive(Debug)]
pub struct Session {
    config: EscapeConfig,
    /// `config` with the current level's overrides applied.
    level_config: EscapeConfig,
    phase: SessionPhase,
    template: Option<LevelTemplate>,
    level: LevelState,
    intent: MovementIntent,
    dash_requested: bool,
    outbox: Outbox<SimEvent>,
}

impl Session {
    pub fn new(config: EscapeConfig) -> Self {
        let level = LevelState::empty(&config);
        Self {
            level_config: config.clone(),
            config,
            phase: SessionPhase::Menu,
            template: None,
            level,
            intent: MovementIntent::default(),
            dash_requested: false,
            outbox: Outbox::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &LevelState {
        &self.level
    }

    pub fn config(&self) -> &EscapeConfig {
        &self.config
    }

    /// Validate `template` and start playing it. On error the session keeps
    /// its current phase and level.
    pub fn start_level(&mut self, template: LevelTemplate) -> Result<(), LevelError> {
        let player = &self.config.player;
        template.validate_for_player(Size::new(player.width, player.height))?;
        self.enter_level(template);
        Ok(())
    }

    /// Rebuild the current level from its template.
    pub fn restart_level(&mut self) -> bool {
        match self.template.take() {
            Some(template) => {
                self.enter_level(template);
                true
            },
            None => false,
        }
    }

    /// Move on after a completed level.
    pub fn continue_to(&mut self, next: LevelTemplate) -> Result<bool, LevelError> {
        if self.phase != SessionPhase::LevelComplete {
            return Ok(false);
        }
        self.start_level(next)?;
        Ok(true)
    }

    pub fn return_to_menu(&mut self) {
        self.phase = SessionPhase::Menu;
        self.template = None;
        self.level = LevelState::empty(&self.config);
        self.intent = MovementIntent::default();
        self.dash_requested = false;
        self.sync_level_config();
    }

    pub fn open_modal(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.phase = SessionPhase::PausedForModal;
        true
    }

    pub fn close_modal(&mut self) -> bool {
        if self.phase != SessionPhase::PausedForModal {
            return false;
        }
        self.phase = SessionPhase::Playing;
        true
    }

    fn enter_level(&mut self, template: LevelTemplate) {
        self.level = LevelState::from_template(&template, &self.config);
        refresh_ambient(&mut self.level, true);
        self.intent = MovementIntent::default();
        self.dash_requested = false;
        self.phase = SessionPhase::Playing;
        self.sync_level_config();
        tracing::info!(
            level = %template.name,
            adversaries = template.adversaries.len(),
            "Level started"
        );
        self.outbox.push(SimEvent::LevelStarted {
            name: template.name.clone(),
        });
        self.template = Some(template);
    }

    fn sync_level_config(&mut self) {
        self.level_config = self.config.clone();
        self.level_config.motion.integration = self.level.integration;
    }

    fn playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    // ---- commands ----

    pub fn set_intent(&mut self, intent: MovementIntent) {
        self.intent = intent;
    }

    /// Press dash for the next tick.
    pub fn trigger_dash(&mut self) -> bool {
        if !self.playing() {
            return false;
        }
        self.dash_requested = true;
        true
    }

    pub fn rotate_tile(&mut self, col: usize, row: usize, step: i32) -> bool {
        if !self.playing() || step.abs() != 1 {
            return false;
        }
        let applied = self
            .level
            .flow
            .as_mut()
            .is_some_and(|f| f.rotate_tile((col, row), step));
        if !applied {
            tracing::debug!(col, row, "Tile rotation refused");
        }
        applied
    }

    pub fn rotate_mirror(&mut self, id: u32, step: i32) -> bool {
        if !self.playing() || step.abs() != 1 {
            return false;
        }
        let Some(center) = self
            .level
            .optics
            .mirrors
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.rect.center())
        else {
            return false;
        };
        if !self.in_reach(center) {
            return false;
        }
        self.level.optics.rotate_mirror(id, step as f32)
    }

    pub fn rotate_light(&mut self, id: u32, step: i32) -> bool {
        if !self.playing() || step.abs() != 1 {
            return false;
        }
        let Some(position) = self
            .level
            .optics
            .sources
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.position)
        else {
            return false;
        };
        if !self.in_reach(position) {
            return false;
        }
        self.level.optics.rotate_source(id, step as f32)
    }

    fn in_reach(&self, point: Vec2) -> bool {
        self.level.player.center().distance(point) <= self.config.player.interaction_range
    }

    pub fn toggle_lever(&mut self, id: u32) -> bool {
        if !self.playing() {
            return false;
        }
        let toggled =
            interactions::toggle_lever(&mut self.level, id, &self.config, &mut self.outbox);
        if toggled {
            refresh_ambient(&mut self.level, false);
        }
        toggled
    }

    /// Put one photophobic into berserk (lit) or darkness mode. Lighting
    /// changes drive this too; the adversary never senses light itself.
    pub fn set_photophobic_mode(&mut self, id: AdversaryId, berserk: bool) -> bool {
        if !self.playing() {
            return false;
        }
        set_photophobic_mode(&mut self.level, id, berserk)
    }

    pub fn start_flow(&mut self) -> bool {
        if !self.playing() {
            return false;
        }
        let started = self.level.flow.as_mut().is_some_and(|f| f.start());
        if started {
            tracing::debug!("Flow started");
            self.outbox.push(SimEvent::FlowStarted);
        }
        started
    }

    pub fn reset_flow(&mut self) -> bool {
        self.playing() && self.level.flow.as_mut().is_some_and(|f| f.reset())
    }

    pub fn pick_up(&mut self) -> bool {
        self.playing() && interactions::pick_up(&mut self.level, &self.config, &mut self.outbox)
    }

    pub fn drop_item(&mut self) -> bool {
        self.playing() && interactions::drop_item(&mut self.level, &mut self.outbox)
    }

    pub fn throw_item(&mut self, target: Vec2) -> bool {
        self.playing()
            && interactions::throw_item(&mut self.level, target, &self.config, &mut self.outbox)
    }

    // ---- tick ----

    /// Advance one frame and drain everything queued since the last call.
    pub fn update(&mut self, delta_ms: f32, now_ms: f64) -> Vec<SimEvent> {
        if self.playing() {
            let dt = clamp_delta_ms(
                delta_ms,
                self.config.session.nominal_frame_ms,
                self.config.session.max_frame_multiple,
            );
            if dt > 0.0 {
                self.tick(dt, now_ms);
            }
        }
        self.outbox.drain()
    }

    fn tick(&mut self, dt: f32, now_ms: f64) {
        let Self {
            level_config: config,
            level,
            outbox,
            intent,
            dash_requested,
            ..
        } = self;
        let config: &EscapeConfig = config;
        level.elapsed_ms += f64::from(dt);

        // Player motion, then wall resolution against the pre-move box.
        let mut frame_intent = *intent;
        frame_intent.dash |= std::mem::take(dash_requested);
        let before = level.player.rect;
        let bounds = level.bounds;
        let report = update_player(&mut level.player, &frame_intent, dt, now_ms, config, &bounds);
        if report.dash_started {
            tracing::debug!("Dash started");
            outbox.push(SimEvent::DashStarted);
        }
        let solids = level.solids();
        let resolved = resolve_axis_separated(
            &before,
            level.player.rect.position(),
            level.player.velocity,
            &solids,
        );
        level.player.rect = level.player.rect.with_position(resolved.position);
        level.player.velocity = resolved.velocity;

        for pit in &mut level.pits {
            if let Some(active) = pit.advance(dt) {
                tracing::debug!(pit = pit.id, active, "Pit cycle flipped");
            }
        }
        refresh_ambient(level, false);

        let noise = player_noise(level, config);
        let mut fx = run_adversaries(level, &solids, noise, dt, now_ms, config);
        apply_effects(level, &mut fx, config, outbox);

        interactions::update_projectiles(level, dt, config, outbox);
        interactions::update_items(level, dt, outbox);

        let light_blockers = level.solids();
        outbox.extend(level.optics.update(&light_blockers, &level.bounds));
        if let Some(flow) = level.flow.as_mut()
            && let Some(event) = flow.advance(dt, config.flow.leg_ms)
        {
            tracing::debug!(?event, "Flow finished a run");
            outbox.push(event);
        }

        interactions::collect_keys(level, outbox);
        interactions::update_pressure_plates(level);
        interactions::update_doors(level, outbox);
        interactions::update_teleporters(level, dt, config, outbox);
        interactions::apply_contact_damage(level, config, outbox);

        let next = if !level.player.is_alive() {
            tracing::info!(level = %level.name, "Game over");
            outbox.push(SimEvent::GameOver);
            Some(SessionPhase::GameOver)
        } else if level.boss_defeated && level.final_level {
            tracing::info!(level = %level.name, "Victory: boss defeated");
            outbox.push(SimEvent::Victory);
            Some(SessionPhase::Victory)
        } else if interactions::exit_reached(level) {
            if level.final_level {
                tracing::info!(level = %level.name, "Victory");
                outbox.push(SimEvent::Victory);
                Some(SessionPhase::Victory)
            } else {
                tracing::info!(level = %level.name, elapsed_ms = level.elapsed_ms, "Level complete");
                outbox.push(SimEvent::LevelComplete);
                Some(SessionPhase::LevelComplete)
            }
        } else {
            None
        };
        if let Some(phase) = next {
            self.phase = phase;
        }
    }
}

/// Relight the four regions from the labelled levers. When the lighting
/// changes, or on `force`, every photophobic is switched to the mode of the
/// region it occupies at that moment.
fn refresh_ambient(level: &mut LevelState, force: bool) {
    let ambient = if level.ambient_lighting {
        AmbientLight::from_levers(LeverBank::from_switches(&level.switches))
    } else {
        AmbientLight::fully_lit()
    };
    let changed = force || ambient != level.ambient;
    level.ambient = ambient;
    if !changed {
        return;
    }
    let bounds = level.bounds;
    let modes: Vec<(AdversaryId, bool)> = level
        .adversaries
        .iter()
        .filter(|a| matches!(a.behavior, Behavior::Photophobic(_)))
        .map(|a| (a.id, ambient.is_lit_at(a.body.center(), &bounds)))
        .collect();
    for (id, berserk) in modes {
        set_photophobic_mode(level, id, berserk);
    }
}

fn set_photophobic_mode(level: &mut LevelState, id: AdversaryId, berserk: bool) -> bool {
    let Some(adversary) = level.adversaries.iter_mut().find(|a| a.id == id) else {
        return false;
    };
    let Behavior::Photophobic(state) = &mut adversary.behavior else {
        return false;
    };
    if state.berserk != berserk {
        tracing::debug!(adversary = id, berserk, "Photophobic mode changed");
    }
    state.berserk = berserk;
    true
}

/// This tick's noise. A thrown item landing drowns out the player.
fn player_noise(level: &mut LevelState, config: &EscapeConfig) -> Option<Noise> {
    if let Some(position) = level.pending_noise.take() {
        return Some(Noise {
            position,
            reach: 1.0,
        });
    }
    let reach = match level.player.loudness {
        Loudness::Silent => return None,
        Loudness::Walking => config.adversary.walk_hearing_factor,
        Loudness::Running => 1.0,
    };
    Some(Noise {
        position: level.player.center(),
        reach,
    })
}

fn run_adversaries(
    level: &mut LevelState,
    solids: &[Aabb],
    noise: Option<Noise>,
    dt: f32,
    now_ms: f64,
    config: &EscapeConfig,
) -> Effects {
    let mut fx = Effects::default();
    if level.adversaries.is_empty() {
        return fx;
    }
    let walls = level.wall_solids();
    let phantom_counts: Vec<u32> = level
        .adversaries
        .iter()
        .map(|owner| {
            level
                .adversaries
                .iter()
                .filter(|a| a.phantom_owner() == Some(owner.id))
                .count() as u32
        })
        .collect();
    let base = BehaviorContext {
        now_ms,
        delta_ms: dt,
        player: level.player.rect,
        noise,
        solids,
        walls: &walls,
        boulders: &level.boulders,
        pits: &level.pits,
        flow: level.flow.as_ref(),
        bounds: level.bounds,
        config,
        live_phantoms: 0,
    };
    for (adversary, live_phantoms) in level.adversaries.iter_mut().zip(phantom_counts) {
        let ctx = BehaviorContext {
            live_phantoms,
            ..base
        };
        update_adversary(adversary, &ctx, &mut fx);
    }
    fx
}

fn apply_effects(
    level: &mut LevelState,
    fx: &mut Effects,
    config: &EscapeConfig,
    outbox: &mut Outbox<SimEvent>,
) {
    for event in fx.events.drain(..) {
        if event == SimEvent::BossDefeated {
            level.boss_defeated = true;
        }
        outbox.push(event);
    }

    for id in fx.boulder_hits.drain(..) {
        let Some(boulder) = level.boulders.iter_mut().find(|b| b.id == id) else {
            continue;
        };
        let destroyed = boulder.hit();
        outbox.push(SimEvent::BoulderHit {
            id,
            hits: boulder.hits,
        });
        if destroyed {
            tracing::debug!(boulder = id, "Boulder destroyed");
            outbox.push(SimEvent::BoulderDestroyed { id });
        }
    }

    if let Some(flow) = level.flow.as_mut() {
        for (col, row) in fx.tile_rotations.drain(..) {
            if flow.force_rotate((col, row), 1) {
                outbox.push(SimEvent::TileForcedRotation { col, row });
            }
        }
    }

    for launch in fx.projectiles.drain(..) {
        interactions::spawn_projectile(level, launch.origin, launch.velocity, launch.source, config);
    }

    if !fx.retire.is_empty() {
        level.adversaries.retain(|a| !fx.retire.contains(&a.id));
    }

    for request in fx.spawns.drain() {
        let adversary = spawn_adversary(level, request, config);
        let id = adversary.id;
        tracing::debug!(id, kind = ?request.kind, "Spawned adversary");
        level.adversaries.push(adversary);
        outbox.push(SimEvent::Spawned { id, request });
    }
}

fn spawn_adversary(level: &mut LevelState, request: SpawnRequest, config: &EscapeConfig) -> Adversary {
    let tuning = &config.adversary;
    let id = level.allocate_id();
    let (body, behavior) = match request.kind {
        SpawnKind::Minion => {
            let size = Size::new(tuning.minion_size, tuning.minion_size);
            let rect = free_spot(
                Aabb::centered(request.position, size),
                &level.solids(),
                &level.bounds,
            );
            let body = Body {
                rect,
                speed: tuning.minion_speed,
                chase_speed: 0.0,
                direction: Vec2::ZERO,
                patrol: Patrol::default(),
                sight_range: tuning.minion_sight_range,
                hearing_range: 0.0,
                chasing: false,
            };
            (body, Behavior::Minion)
        },
        SpawnKind::Phantom => {
            let size = level
                .adversaries
                .iter()
                .find(|a| a.id == request.source)
                .map_or(Size::new(tuning.minion_size, tuning.minion_size), |a| {
                    a.body.rect.size()
                });
            let heading = (level.player.center() - request.position).normalize_or_zero();
            let body = Body {
                rect: Aabb::centered(request.position, size),
                speed: tuning.phantom_speed,
                chase_speed: 0.0,
                direction: heading,
                patrol: Patrol::default(),
                sight_range: 0.0,
                hearing_range: 0.0,
                chasing: false,
            };
            let state = PhantomState {
                owner: request.source,
                home: request.position,
                heading,
                max_travel: Vec2::new(level.bounds.width, level.bounds.height).length(),
                traveled: 0.0,
                returning: false,
            };
            (body, Behavior::Phantom(state))
        },
    };
    Adversary { id, body, behavior }
}

/// First clear placement at or around `rect`, searching outward.
fn free_spot(rect: Aabb, solids: &[Aabb], bounds: &Aabb) -> Aabb {
    let rect = rect.clamped_inside(bounds);
    if is_clear(&rect, solids, bounds) {
        return rect;
    }
    let reach = rect.width.max(rect.height);
    let directions = [
        Vec2::new(0.0, -1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(-1.0, 0.0),
    ];
    for ring in 1..=8u8 {
        for dir in directions {
            let candidate = rect.translated(dir * (reach * f32::from(ring)));
            if is_clear(&candidate, solids, bounds) {
                return candidate;
            }
        }
    }
    rect
}

impl Simulation for Session {
    type Event = SimEvent;
    type Snapshot = LevelState;

    fn update(&mut self, delta_ms: f32, now_ms: f64) -> Vec<SimEvent> {
        Session::update(self, delta_ms, now_ms)
    }

    fn snapshot(&self) -> &LevelState {
        &self.level
    }

    fn serialize_state(&self) -> Vec<u8> {
        let saved = SavedSessionRef {
            phase: self.phase,
            intent: &self.intent,
            level: &self.level,
            template: self.template.as_ref(),
        };
        rmp_serde::to_vec_named(&saved).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize session state: {e}");
            Vec::new()
        })
    }

    fn apply_state(&mut self, state: &[u8]) {
        match rmp_serde::from_slice::<SavedSession>(state) {
            Ok(saved) => {
                self.phase = saved.phase;
                self.intent = saved.intent;
                self.level = saved.level;
                self.template = saved.template;
                self.dash_requested = false;
                self.sync_level_config();
            },
            Err(e) => {
                tracing::debug!(error = %e, "Dropped malformed session state");
            },
        }
    }

    fn pause(&mut self) {
        self.open_modal();
    }

    fn resume(&mut self) {
        self.close_modal();
    }

    fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Boulder;
    use gloam_core::test_helpers::{assert_same_state, assert_state_changed, run_frames};

    const ROOM: &str = r#"{
        "name": "room",
        "width": 640,
        "height": 480,
        "spawn": { "x": 100, "y": 228 },
        "walls": [ { "x": 300, "y": 0, "width": 20, "height": 200 } ],
        "exit": { "rect": { "x": 600, "y": 200, "width": 40, "height": 80 } }
    }"#;

    fn playing(json: &str) -> Session {
        let mut session = Session::new(EscapeConfig::default());
        session
            .start_level(LevelTemplate::from_json(json).unwrap())
            .unwrap();
        session
    }

    fn right() -> MovementIntent {
        MovementIntent {
            right: true,
            ..Default::default()
        }
    }

    #[test]
    fn starts_in_menu_and_ignores_commands() {
        let mut session = Session::new(EscapeConfig::default());
        assert_eq!(session.phase(), SessionPhase::Menu);
        assert!(!session.trigger_dash());
        assert!(!session.pick_up());
        assert!(!session.open_modal());
        assert!(session.update(16.0, 0.0).is_empty());
    }

    #[test]
    fn invalid_template_keeps_menu() {
        let mut session = Session::new(EscapeConfig::default());
        let mut template = LevelTemplate::from_json(ROOM).unwrap();
        template.width = -5.0;
        assert!(session.start_level(template).is_err());
        assert_eq!(session.phase(), SessionPhase::Menu);
    }

    #[test]
    fn spawn_is_checked_against_configured_player_size() {
        let mut template = LevelTemplate::from_json(ROOM).unwrap();
        template.spawn = Vec2::new(260.0, 100.0);
        let mut config = EscapeConfig::default();
        config.player.width = 50.0;
        let mut session = Session::new(config);
        assert!(matches!(
            session.start_level(template.clone()),
            Err(LevelError::Invalid { .. })
        ));
        assert_eq!(session.phase(), SessionPhase::Menu);

        let mut session = Session::new(EscapeConfig::default());
        assert!(session.start_level(template).is_ok());
    }

    #[test]
    fn level_start_event_is_drained_once() {
        let mut session = playing(ROOM);
        let events = session.update(16.0, 0.0);
        assert_eq!(
            events.first(),
            Some(&SimEvent::LevelStarted {
                name: "room".into()
            })
        );
        let events = session.update(16.0, 16.0);
        assert!(!events.iter().any(|e| matches!(e, SimEvent::LevelStarted { .. })));
    }

    #[test]
    fn modal_freezes_the_world() {
        let mut session = playing(ROOM);
        session.set_intent(right());
        session.update(16.0, 0.0);
        assert!(session.open_modal());
        let before = session.serialize_state();
        run_frames(&mut session, 10, 16.0);
        assert_eq!(before, session.serialize_state());
        assert!(session.close_modal());
        session.update(16.0, 200.0);
        assert_state_changed(&session, &before);
    }

    #[test]
    fn long_frames_are_clamped() {
        let cfg = EscapeConfig::default();
        let mut session = playing(ROOM);
        session.level.integration = crate::config::IntegrationMode::Direct;
        session.sync_level_config();
        session.set_intent(right());
        let x0 = session.state().player.rect.x;
        session.update(1000.0, 0.0);
        let moved = session.state().player.rect.x - x0;
        let limit = cfg.motion.normal_speed * cfg.session.nominal_frame_ms * 2.0 / 1000.0;
        assert!((moved - limit).abs() < 1e-3, "moved {moved}, limit {limit}");
    }

    #[test]
    fn walking_into_exit_completes_level() {
        let mut session = playing(ROOM);
        session.set_intent(right());
        let (events, _) = run_frames(&mut session, 400, 0.0);
        assert_eq!(session.phase(), SessionPhase::LevelComplete);
        assert!(events.contains(&SimEvent::LevelComplete));
        assert!(session.is_finished());

        let frozen = session.serialize_state();
        session.update(16.0, 99_999.0);
        assert_eq!(frozen, session.serialize_state());

        let next = LevelTemplate::from_json(ROOM).unwrap();
        assert_eq!(session.continue_to(next).ok(), Some(true));
        assert_eq!(session.phase(), SessionPhase::Playing);
    }

    #[test]
    fn final_level_exit_is_victory() {
        let mut template = LevelTemplate::from_json(ROOM).unwrap();
        template.final_level = true;
        let mut session = Session::new(EscapeConfig::default());
        session.start_level(template).unwrap();
        session.set_intent(right());
        run_frames(&mut session, 400, 0.0);
        assert_eq!(session.phase(), SessionPhase::Victory);
    }

    #[test]
    fn contact_damage_until_game_over() {
        let mut session = playing(
            r#"{
                "name": "pen",
                "width": 400,
                "height": 400,
                "spawn": { "x": 190, "y": 190 },
                "adversaries": [{
                    "id": 1,
                    "body": { "rect": { "x": 185, "y": 185, "width": 30, "height": 30 }, "speed": 0 },
                    "behavior": { "type": "patroller" }
                }]
            }"#,
        );
        let (events, _) = run_frames(&mut session, 200, 0.0);
        let hits = events
            .iter()
            .filter(|e| matches!(e, SimEvent::PlayerHit { .. }))
            .count();
        assert_eq!(hits, 3);
        assert!(events.contains(&SimEvent::PlayerDied));
        assert_eq!(session.phase(), SessionPhase::GameOver);
        assert!(session.restart_level());
        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.state().player.health, 3);
    }

    #[test]
    fn player_never_enters_walls() {
        let mut session = playing(ROOM);
        session.set_intent(MovementIntent {
            right: true,
            up: true,
            ..Default::default()
        });
        for i in 0..300 {
            session.update(16.0, f64::from(i) * 16.0);
            let p = session.state().player.rect;
            assert!(!session.state().walls[0].overlaps(&p));
        }
    }

    #[test]
    fn minion_spawn_is_pushed_clear_of_the_boulder() {
        let mut session = playing(ROOM);
        session.level.boulders.push(Boulder {
            id: 1,
            rect: Aabb::new(400.0, 300.0, 60.0, 60.0),
            max_hits: 2,
            hits: 0,
            destroyed: false,
        });
        let request = SpawnRequest {
            kind: SpawnKind::Minion,
            position: Vec2::new(430.0, 330.0),
            source: 99,
        };
        let config = session.config.clone();
        let minion = spawn_adversary(&mut session.level, request, &config);
        assert!(matches!(minion.behavior, Behavior::Minion));
        assert!(!session.level.boulders[0].rect.overlaps(&minion.body.rect));
        assert!(session.level.bounds.contains(&minion.body.rect));
    }

    #[test]
    fn dash_command_fires_once() {
        let mut session = playing(ROOM);
        session.set_intent(right());
        assert!(session.trigger_dash());
        let events = session.update(16.0, 0.0);
        assert!(events.contains(&SimEvent::DashStarted));
        assert!(session.state().player.dash.active);
        let events = session.update(16.0, 16.0);
        assert!(!events.contains(&SimEvent::DashStarted));
    }

    #[test]
    fn serialized_state_replays_identically() {
        let mut a = playing(ROOM);
        a.set_intent(right());
        run_frames(&mut a, 20, 0.0);
        let mut b = Session::new(EscapeConfig::default());
        b.apply_state(&a.serialize_state());
        assert_same_state(&a, &b);
        run_frames(&mut a, 20, 400.0);
        run_frames(&mut b, 20, 400.0);
        assert_same_state(&a, &b);
    }

    #[test]
    fn restored_session_can_restart_its_level() {
        let mut a = playing(ROOM);
        a.set_intent(right());
        run_frames(&mut a, 30, 0.0);
        let mut b = Session::new(EscapeConfig::default());
        b.apply_state(&a.serialize_state());
        assert!(b.restart_level());
        assert_eq!(b.phase(), SessionPhase::Playing);
        assert_eq!(b.state().player.rect.position(), Vec2::new(100.0, 228.0));
        assert_eq!(b.state().name, "room");
    }

    const DARKROOM: &str = r#"{
        "name": "darkroom",
        "width": 640,
        "height": 480,
        "spawn": { "x": 40, "y": 40 },
        "ambient_lighting": true,
        "switches": [
            { "id": 1, "rect": { "x": 50, "y": 50, "width": 16, "height": 16 }, "kind": "lever", "label": "A" }
        ],
        "adversaries": [{
            "id": 4,
            "body": { "rect": { "x": 100, "y": 150, "width": 20, "height": 20 }, "speed": 40 },
            "behavior": { "type": "photophobic" }
        }]
    }"#;

    fn berserk(session: &Session) -> bool {
        session.state().adversaries[0].is_harmful()
    }

    #[test]
    fn photophobic_mode_follows_lighting_changes_only() {
        let mut session = playing(DARKROOM);
        assert!(!berserk(&session), "every lever down leaves the north-west dark");

        // Lever A alone lights the north-west region.
        assert!(session.toggle_lever(1));
        assert!(berserk(&session));

        // An explicit toggle holds until the lighting changes again.
        assert!(session.set_photophobic_mode(4, false));
        run_frames(&mut session, 10, 0.0);
        assert!(!berserk(&session));

        assert!(session.toggle_lever(1));
        assert!(!berserk(&session));
        assert!(session.toggle_lever(1));
        assert!(berserk(&session));

        assert!(!session.set_photophobic_mode(99, true));
    }

    #[test]
    fn photophobics_in_unlit_levels_start_berserk() {
        let mut template = LevelTemplate::from_json(DARKROOM).unwrap();
        template.ambient_lighting = false;
        let mut session = Session::new(EscapeConfig::default());
        session.start_level(template).unwrap();
        assert!(berserk(&session));
    }

    #[test]
    fn garbage_state_is_ignored() {
        let mut session = playing(ROOM);
        let before = session.serialize_state();
        session.apply_state(&[0xc1, 0x00, 0x13]);
        assert_eq!(before, session.serialize_state());
    }
}
