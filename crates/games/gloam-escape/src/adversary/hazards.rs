//! Environmental adversaries and boss offspring.

use serde::{Deserialize, Serialize};

use gloam_core::{Aabb, Vec2};

use super::patrol::{Step, chase_toward, move_toward, patrol_step, sees_player};
use super::{AdversaryId, BehaviorContext, Body, Effects, ProjectileLaunch};
use crate::collision::try_move;
use crate::events::SimEvent;

/// Pit-dweller. Emerges and retreats with its pit's shared clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RattlesnakeState {
    pub pit: u32,
    #[serde(default)]
    pub emerged: bool,
}

pub fn update_rattlesnake(body: &mut Body, state: &mut RattlesnakeState, ctx: &BehaviorContext<'_>) {
    let Some(pit) = ctx.pits.iter().find(|p| p.id == state.pit) else {
        return;
    };
    let active = pit.cycle.active;
    if active != state.emerged {
        state.emerged = active;
        body.patrol.restart();
        if !active {
            body.rect = Aabb::centered(pit.rect.center(), body.rect.size());
        }
    }
    if state.emerged {
        let speed = body.speed;
        patrol_step(body, speed, ctx);
    }
}

/// Meddles with the pipe puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlumberState {
    pub interval_ms: f32,
    #[serde(default)]
    pub timer_ms: f32,
}

/// Tiles within this many tile widths are in a plumber's reach.
const PLUMBER_REACH_TILES: f32 = 1.5;

pub fn update_plumber(
    body: &mut Body,
    state: &mut PlumberState,
    ctx: &BehaviorContext<'_>,
    fx: &mut Effects,
) {
    let speed = body.speed;
    patrol_step(body, speed, ctx);

    state.timer_ms += ctx.delta_ms;
    if state.timer_ms < state.interval_ms {
        return;
    }
    state.timer_ms = 0.0;
    if let Some(flow) = ctx.flow
        && let Some(cell) =
            flow.nearest_rotatable(body.center(), flow.tile_size * PLUMBER_REACH_TILES)
    {
        fx.tile_rotations.push(cell);
    }
}

/// Ranged attacker with a limited supply of shots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpitterState {
    pub fire_interval_ms: f32,
    pub max_shots: u32,
    #[serde(default)]
    pub shots_fired: u32,
    #[serde(default)]
    pub since_last_ms: f32,
}

pub fn update_spitter(
    id: AdversaryId,
    body: &mut Body,
    state: &mut SpitterState,
    ctx: &BehaviorContext<'_>,
    fx: &mut Effects,
) {
    let speed = body.speed;
    patrol_step(body, speed, ctx);

    state.since_last_ms += ctx.delta_ms;
    if state.shots_fired >= state.max_shots || state.since_last_ms < state.fire_interval_ms {
        return;
    }
    let in_view = body.sight_range <= 0.0 || sees_player(body, ctx);
    let aim = (ctx.player_center() - body.center()).normalize_or_zero();
    if !in_view || aim.is_zero() {
        return;
    }
    state.since_last_ms = 0.0;
    state.shots_fired += 1;
    fx.projectiles.push(ProjectileLaunch {
        origin: body.center(),
        velocity: aim * ctx.config.adversary.projectile_speed,
        source: id,
    });
    fx.events.push(SimEvent::ProjectilesFired {
        source: id,
        count: 1,
    });
}

/// Chases on sight, idles otherwise.
pub fn update_minion(body: &mut Body, ctx: &BehaviorContext<'_>) {
    body.chasing = sees_player(body, ctx);
    if body.chasing {
        chase_toward(body, ctx.player_center(), ctx);
    }
}

/// Boss clone: flies out along a fixed heading, then drifts home and retires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhantomState {
    pub owner: AdversaryId,
    pub home: Vec2,
    pub heading: Vec2,
    pub max_travel: f32,
    #[serde(default)]
    pub traveled: f32,
    #[serde(default)]
    pub returning: bool,
}

pub fn update_phantom(
    id: AdversaryId,
    body: &mut Body,
    state: &mut PhantomState,
    ctx: &BehaviorContext<'_>,
    fx: &mut Effects,
) {
    let reach = body.speed * ctx.dt_secs();
    if !state.returning {
        let delta = state.heading * reach;
        if !state.heading.is_zero() && try_move(&mut body.rect, delta, ctx.solids, &ctx.bounds) {
            body.direction = state.heading;
            state.traveled += reach;
            if state.traveled >= state.max_travel {
                state.returning = true;
            }
        } else {
            state.returning = true;
        }
        return;
    }

    // Phantoms drift through solids on the way back.
    let unbounded = BehaviorContext {
        solids: &[],
        bounds: Aabb::new(f32::MIN / 4.0, f32::MIN / 4.0, f32::MAX / 2.0, f32::MAX / 2.0),
        ..*ctx
    };
    let speed = body.speed;
    match move_toward(body, state.home, speed, &unbounded) {
        Step::Arrived | Step::Idle => fx.retire.push(id),
        Step::Moved | Step::Blocked => {},
    }
}
