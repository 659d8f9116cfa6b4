//! Multi-phase boss state machine.
//!
//! The boss charges the player and bounces off whatever it hits. Charging
//! into boulders cracks them; the lifetime hit count sets the phase, and
//! the phase decides what the boss does after each boulder bounce.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use gloam_core::geometry::reflect_about;
use gloam_core::{Aabb, Vec2};

use super::patrol::{Step, move_toward};
use super::{AdversaryId, BehaviorContext, Body, Effects, ProjectileLaunch};
use crate::collision::try_move;
use crate::config::BossConfig;
use crate::events::{SimEvent, SpawnKind, SpawnRequest};
use crate::world::Boulder;

/// Phase reached at six lifetime hits: the boss is beaten.
pub const DEFEATED_PHASE: u8 = 4;

/// Longest distance moved in one charge substep, so a fast charge cannot
/// tunnel through a thin wall.
const MAX_SUBSTEP: f32 = 8.0;

/// Phase as a function of lifetime boulder hits.
pub fn phase_for_hits(hits: u32) -> u8 {
    match hits {
        0..=1 => 1,
        2..=3 => 2,
        4..=5 => 3,
        _ => DEFEATED_PHASE,
    }
}

/// Charge speed `t` seconds into a charge.
pub fn charge_speed(chase_speed: f32, t_secs: f32, tuning: &BossConfig) -> f32 {
    let ramp = 1.0 - (-tuning.charge_ramp_rate * t_secs).exp();
    chase_speed
        * (tuning.charge_base_mult + (tuning.charge_max_mult - tuning.charge_base_mult) * ramp)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossMode {
    Tracking,
    Charging,
    Recoiling,
    MovingToCenter,
    CenterPause,
    MovingToWall,
    WaitingForPhantom,
    ChargingHalfway,
    ProjectileBarrage,
    Recovering,
    Defeated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossBrain {
    pub mode: BossMode,
    pub phase: u8,
    /// Lifetime boulder hits.
    pub hits: u32,
    pub destructions: u32,
    /// Boulders whose first crack already released a minion.
    pub first_hit_boulders: SmallVec<[u32; 2]>,
    /// Time spent in the current mode.
    pub mode_ms: f32,
    /// Length of the current pause (recovering or center pause).
    pub pause_ms: f32,
    pub charge_target: Vec2,
    pub charge_direction: Vec2,
    pub charge_distance: f32,
    /// Recoil velocity.
    pub recoil: Vec2,
    pub recoil_remaining: f32,
    /// Boulder bounces head for the arena center afterwards.
    pub recoil_from_boulder: bool,
    /// Where the boss is heading in the move-to modes.
    pub destination: Vec2,
    pub phantoms_spawned: u32,
    pub barrage_rounds_fired: u32,
}

impl BossBrain {
    pub fn new(tuning: &BossConfig) -> Self {
        Self {
            mode: BossMode::Recovering,
            phase: 1,
            hits: 0,
            destructions: 0,
            first_hit_boulders: SmallVec::new(),
            mode_ms: 0.0,
            pause_ms: tuning.initial_pause_ms,
            charge_target: Vec2::ZERO,
            charge_direction: Vec2::ZERO,
            charge_distance: 0.0,
            recoil: Vec2::ZERO,
            recoil_remaining: 0.0,
            recoil_from_boulder: false,
            destination: Vec2::ZERO,
            phantoms_spawned: 0,
            barrage_rounds_fired: 0,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.mode == BossMode::Defeated
    }

    fn enter(&mut self, mode: BossMode) {
        tracing::debug!(from = ?self.mode, to = ?mode, phase = self.phase, "Boss state");
        self.mode = mode;
        self.mode_ms = 0.0;
    }

    fn recover(&mut self, pause_ms: f32) {
        self.pause_ms = pause_ms;
        self.enter(BossMode::Recovering);
    }
}

pub fn update_boss(
    id: AdversaryId,
    body: &mut Body,
    slot: &mut Option<Box<BossBrain>>,
    ctx: &BehaviorContext<'_>,
    fx: &mut Effects,
) {
    let tuning = &ctx.config.boss;
    let brain = slot.get_or_insert_with(|| Box::new(BossBrain::new(tuning)));

    refresh_phase(body, brain, fx);
    if brain.is_defeated() {
        return;
    }
    brain.mode_ms += ctx.delta_ms;

    let chase = body.pursuit_speed();
    match brain.mode {
        BossMode::Tracking => {
            brain.charge_target = ctx.player_center();
            let dir = (brain.charge_target - body.center()).normalize_or_zero();
            brain.charge_direction = if dir.is_zero() {
                Vec2::new(1.0, 0.0)
            } else {
                dir
            };
            brain.charge_distance = 0.0;
            body.chasing = true;
            brain.enter(BossMode::Charging);
        },
        BossMode::Charging => charge(id, body, brain, ctx, fx),
        BossMode::Recoiling => recoil(body, brain, ctx),
        BossMode::MovingToCenter => {
            if glide(body, brain.destination, chase * tuning.center_speed_mult, ctx) {
                brain.pause_ms = if brain.phase == 2 {
                    tuning.center_pause_phase2_ms
                } else {
                    tuning.center_pause_ms
                };
                brain.enter(BossMode::CenterPause);
            }
        },
        BossMode::CenterPause => {
            if brain.mode_ms >= brain.pause_ms {
                branch_after_pause(body, brain, ctx);
            }
        },
        BossMode::MovingToWall => {
            if glide(body, brain.destination, chase * tuning.center_speed_mult, ctx) {
                brain.phantoms_spawned = 0;
                brain.enter(BossMode::WaitingForPhantom);
            }
        },
        BossMode::WaitingForPhantom => wait_for_phantoms(id, body, brain, ctx, fx),
        BossMode::ChargingHalfway => {
            if glide(body, brain.destination, chase * tuning.halfway_speed_mult, ctx) {
                brain.barrage_rounds_fired = 0;
                brain.enter(BossMode::ProjectileBarrage);
            }
        },
        BossMode::ProjectileBarrage => barrage(id, body, brain, ctx, fx),
        BossMode::Recovering => {
            if brain.mode_ms >= brain.pause_ms {
                brain.enter(BossMode::Tracking);
            }
        },
        BossMode::Defeated => {},
    }

    refresh_phase(body, brain, fx);
}

fn refresh_phase(body: &mut Body, brain: &mut BossBrain, fx: &mut Effects) {
    let phase = phase_for_hits(brain.hits);
    if phase != brain.phase {
        tracing::debug!(phase, hits = brain.hits, "Boss phase changed");
        brain.phase = phase;
        fx.events.push(SimEvent::BossPhaseChanged { phase });
    }
    if phase >= DEFEATED_PHASE && !brain.is_defeated() {
        tracing::info!(hits = brain.hits, "Boss defeated");
        brain.enter(BossMode::Defeated);
        body.chasing = false;
        fx.events.push(SimEvent::BossDefeated);
    }
}

struct Contact {
    normal: Vec2,
    boulder: Option<usize>,
}

fn find_contact(next: &Aabb, ctx: &BehaviorContext<'_>) -> Option<Contact> {
    if let Some((i, b)) = ctx
        .boulders
        .iter()
        .enumerate()
        .find(|(_, b)| !b.destroyed && b.rect.overlaps(next))
    {
        return Some(Contact {
            normal: next.contact_normal(&b.rect),
            boulder: Some(i),
        });
    }
    if let Some(wall) = ctx.walls.iter().find(|w| w.overlaps(next)) {
        return Some(Contact {
            normal: next.contact_normal(wall),
            boulder: None,
        });
    }
    let b = &ctx.bounds;
    let normal = if next.x < b.x {
        Vec2::new(1.0, 0.0)
    } else if next.right() > b.right() {
        Vec2::new(-1.0, 0.0)
    } else if next.y < b.y {
        Vec2::new(0.0, 1.0)
    } else if next.bottom() > b.bottom() {
        Vec2::new(0.0, -1.0)
    } else {
        return None;
    };
    Some(Contact {
        normal,
        boulder: None,
    })
}

fn charge(
    id: AdversaryId,
    body: &mut Body,
    brain: &mut BossBrain,
    ctx: &BehaviorContext<'_>,
    fx: &mut Effects,
) {
    let tuning = &ctx.config.boss;
    if brain.mode_ms >= tuning.max_charge_ms {
        body.chasing = false;
        brain.recover(tuning.recover_ms);
        return;
    }

    let chase = body.pursuit_speed();
    let speed = charge_speed(chase, brain.mode_ms / 1000.0, tuning);
    let total = speed * ctx.dt_secs();
    if !total.is_finite() || total <= 0.0 {
        return;
    }
    let steps = (total / MAX_SUBSTEP).ceil().max(1.0);
    let step_len = total / steps;
    let dir = brain.charge_direction;
    body.direction = dir;

    for _ in 0..steps as u32 {
        let next = body.rect.translated(dir * step_len);
        let Some(contact) = find_contact(&next, ctx) else {
            body.rect = next;
            brain.charge_distance += step_len;
            continue;
        };

        let reflected = reflect_about(dir, contact.normal);
        let away = if reflected.dot(contact.normal) > 0.0 {
            reflected.normalize_or_zero()
        } else {
            contact.normal
        };
        brain.recoil = away * (tuning.recoil_speed_mult * chase);
        brain.recoil_remaining = recoil_distance(brain.charge_distance, body.rect.width, tuning);
        brain.recoil_from_boulder = contact.boulder.is_some();
        if let Some(i) = contact.boulder
            && let Some(boulder) = ctx.boulders.get(i)
        {
            register_boulder_hit(id, body, brain, boulder, fx);
        }
        body.chasing = false;
        brain.enter(BossMode::Recoiling);
        return;
    }
}

fn register_boulder_hit(
    id: AdversaryId,
    body: &Body,
    brain: &mut BossBrain,
    boulder: &Boulder,
    fx: &mut Effects,
) {
    fx.boulder_hits.push(boulder.id);
    brain.hits += 1;

    if boulder.hits == 0
        && brain.first_hit_boulders.len() < 2
        && !brain.first_hit_boulders.contains(&boulder.id)
    {
        brain.first_hit_boulders.push(boulder.id);
        fx.spawns.push(SpawnRequest {
            kind: SpawnKind::Minion,
            position: boulder.rect.center(),
            source: id,
        });
    }

    if boulder.hits + 1 >= boulder.max_hits {
        brain.destructions += 1;
        if matches!(brain.destructions, 1 | 3) {
            fx.spawns.push(SpawnRequest {
                kind: SpawnKind::Phantom,
                position: body.center(),
                source: id,
            });
        }
    }
}

/// Bounce-back length after a charge: a fraction of the distance charged,
/// kept within the configured multiples of the boss's width.
pub fn recoil_distance(charge_distance: f32, width: f32, tuning: &BossConfig) -> f32 {
    let a = tuning.recoil_min_widths * width;
    let b = tuning.recoil_max_widths * width;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (tuning.recoil_fraction * charge_distance).max(lo).min(hi)
}

/// Runs until the recoil distance is covered or the way back is blocked, so
/// its duration is the distance over the recoil speed.
fn recoil(body: &mut Body, brain: &mut BossBrain, ctx: &BehaviorContext<'_>) {
    let tuning = &ctx.config.boss;
    let mut delta = brain.recoil * ctx.dt_secs();
    let len = delta.length();
    if len > brain.recoil_remaining && len > 0.0 {
        delta = delta * (brain.recoil_remaining / len);
    }
    let moved = try_move(&mut body.rect, delta, ctx.solids, &ctx.bounds);
    brain.recoil_remaining -= delta.length();

    let done = !moved || brain.recoil.is_zero() || brain.recoil_remaining <= 0.0;
    if !done {
        return;
    }
    if brain.recoil_from_boulder {
        brain.destination = ctx.bounds.center();
        brain.enter(BossMode::MovingToCenter);
    } else {
        brain.recover(tuning.recover_ms);
    }
}

/// Move toward `target`; true once there or once the way is blocked.
fn glide(body: &mut Body, target: Vec2, speed: f32, ctx: &BehaviorContext<'_>) -> bool {
    match move_toward(body, target, speed, ctx) {
        Step::Moved => false,
        Step::Arrived | Step::Blocked | Step::Idle => true,
    }
}

fn branch_after_pause(body: &Body, brain: &mut BossBrain, ctx: &BehaviorContext<'_>) {
    let tuning = &ctx.config.boss;
    let bounds = &ctx.bounds;
    let player = ctx.player_center();
    match brain.phase {
        2 => {
            let half_w = body.rect.width / 2.0;
            let x = if player.x < bounds.center().x {
                bounds.right() - tuning.wall_margin - half_w
            } else {
                bounds.x + tuning.wall_margin + half_w
            };
            brain.destination = Vec2::new(x, bounds.center().y);
            brain.enter(BossMode::MovingToWall);
        },
        3 => {
            brain.destination = body.center().lerp(player, 0.5);
            brain.enter(BossMode::ChargingHalfway);
        },
        _ => brain.enter(BossMode::Tracking),
    }
}

fn wait_for_phantoms(
    id: AdversaryId,
    body: &Body,
    brain: &mut BossBrain,
    ctx: &BehaviorContext<'_>,
    fx: &mut Effects,
) {
    let tuning = &ctx.config.boss;
    let mut spawned_now = false;
    while brain.phantoms_spawned < tuning.phantom_count
        && brain.mode_ms >= tuning.phantom_interval_ms * brain.phantoms_spawned as f32
    {
        fx.spawns.push(SpawnRequest {
            kind: SpawnKind::Phantom,
            position: body.center(),
            source: id,
        });
        brain.phantoms_spawned += 1;
        spawned_now = true;
    }
    if !spawned_now && brain.phantoms_spawned >= tuning.phantom_count && ctx.live_phantoms == 0 {
        brain.recover(tuning.recover_ms);
    }
}

fn barrage(
    id: AdversaryId,
    body: &Body,
    brain: &mut BossBrain,
    ctx: &BehaviorContext<'_>,
    fx: &mut Effects,
) {
    let tuning = &ctx.config.boss;
    let count = tuning.barrage_projectiles.max(1);
    while brain.barrage_rounds_fired < tuning.barrage_rounds
        && brain.mode_ms >= tuning.barrage_interval_ms * brain.barrage_rounds_fired as f32
    {
        let offset = tuning.barrage_rotation_deg * brain.barrage_rounds_fired as f32;
        for k in 0..count {
            let angle = offset + 360.0 * k as f32 / count as f32;
            fx.projectiles.push(ProjectileLaunch {
                origin: body.center(),
                velocity: Vec2::from_degrees(angle) * ctx.config.adversary.projectile_speed,
                source: id,
            });
        }
        fx.events.push(SimEvent::ProjectilesFired { source: id, count });
        brain.barrage_rounds_fired += 1;
    }
    if brain.barrage_rounds_fired >= tuning.barrage_rounds {
        brain.enter(BossMode::Tracking);
    }
}
