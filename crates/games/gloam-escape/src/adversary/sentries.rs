//! Perceiving adversaries: guards, stalkers, bursters and photophobics.

use serde::{Deserialize, Serialize};

use gloam_core::Vec2;

use super::patrol::{Step, chase_toward, hears_noise, move_toward, patrol_step, sees_player};
use super::{BehaviorContext, Body};
use crate::collision::try_move;

/// Sighted chaser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardState {
    pub lost_sight_cooldown_ms: f32,
    #[serde(default)]
    pub unseen_ms: f32,
    #[serde(default)]
    pub last_seen: Option<Vec2>,
}

pub fn update_guard(body: &mut Body, state: &mut GuardState, ctx: &BehaviorContext<'_>) {
    if sees_player(body, ctx) {
        if !body.chasing {
            tracing::debug!("Guard spotted the player");
        }
        body.chasing = true;
        state.unseen_ms = 0.0;
        state.last_seen = Some(ctx.player_center());
    } else if body.chasing {
        state.unseen_ms += ctx.delta_ms;
        if state.unseen_ms >= state.lost_sight_cooldown_ms {
            body.chasing = false;
            state.unseen_ms = 0.0;
            state.last_seen = None;
        }
    }

    match (body.chasing, state.last_seen) {
        (true, Some(target)) => {
            chase_toward(body, target, ctx);
        },
        _ => {
            let speed = body.speed;
            patrol_step(body, speed, ctx);
        },
    }
}

/// Blind hunter that follows noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalkerState {
    /// How long the stalker keeps hunting after the last noise it heard.
    pub lost_sight_cooldown_ms: f32,
    #[serde(default)]
    pub unheard_ms: f32,
    #[serde(default)]
    pub last_heard: Option<Vec2>,
}

pub fn update_stalker(body: &mut Body, state: &mut StalkerState, ctx: &BehaviorContext<'_>) {
    if let Some(position) = hears_noise(body, ctx) {
        body.chasing = true;
        state.unheard_ms = 0.0;
        state.last_heard = Some(position);
    } else if body.chasing {
        state.unheard_ms += ctx.delta_ms;
        if state.unheard_ms >= state.lost_sight_cooldown_ms {
            body.chasing = false;
            state.unheard_ms = 0.0;
            state.last_heard = None;
        }
    }

    match (body.chasing, state.last_heard) {
        (true, Some(target)) => {
            chase_toward(body, target, ctx);
        },
        _ => {
            let speed = body.speed;
            patrol_step(body, speed, ctx);
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurstPhase {
    #[default]
    Patrolling,
    Dashing,
    Cooldown,
}

/// Lunges at the last place it saw the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BursterState {
    pub dash_speed: f32,
    pub dash_duration_ms: f32,
    pub cooldown_ms: f32,
    #[serde(default)]
    pub phase: BurstPhase,
    #[serde(default)]
    pub timer_ms: f32,
    #[serde(default)]
    pub dash_direction: Vec2,
}

pub fn update_burster(body: &mut Body, state: &mut BursterState, ctx: &BehaviorContext<'_>) {
    match state.phase {
        BurstPhase::Patrolling => {
            if sees_player(body, ctx) {
                let dir = (ctx.player_center() - body.center()).normalize_or_zero();
                if !dir.is_zero() {
                    state.phase = BurstPhase::Dashing;
                    state.timer_ms = 0.0;
                    state.dash_direction = dir;
                    body.direction = dir;
                    body.chasing = true;
                    return;
                }
            }
            let speed = body.speed;
            patrol_step(body, speed, ctx);
        },
        BurstPhase::Dashing => {
            state.timer_ms += ctx.delta_ms;
            let delta = state.dash_direction * (state.dash_speed * ctx.dt_secs());
            let moved = try_move(&mut body.rect, delta, ctx.solids, &ctx.bounds);
            if !moved || state.timer_ms >= state.dash_duration_ms {
                state.phase = BurstPhase::Cooldown;
                state.timer_ms = 0.0;
                body.chasing = false;
            }
        },
        BurstPhase::Cooldown => {
            state.timer_ms += ctx.delta_ms;
            if state.timer_ms >= state.cooldown_ms {
                state.phase = BurstPhase::Patrolling;
                state.timer_ms = 0.0;
            }
            let speed = body.speed;
            patrol_step(body, speed, ctx);
        },
    }
}

/// Slow and harmless in darkness, fast and hostile in light. The mode is
/// switched from outside: `Session::set_photophobic_mode`, or the ambient
/// lighting puzzle whenever its lit regions change. It is never derived from
/// the adversary's own surroundings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotophobicState {
    #[serde(default)]
    pub berserk: bool,
}

pub fn update_photophobic(body: &mut Body, state: &mut PhotophobicState, ctx: &BehaviorContext<'_>) {
    let tuning = &ctx.config.adversary;
    if !state.berserk {
        body.chasing = false;
        let speed = body.speed * tuning.photophobic_dark_speed_mult;
        patrol_step(body, speed, ctx);
        return;
    }

    body.chasing = sees_player(body, ctx);
    if body.chasing {
        let speed = body.pursuit_speed() * tuning.photophobic_berserk_speed_mult;
        if move_toward(body, ctx.player_center(), speed, ctx) != Step::Blocked {
            return;
        }
    }
    let speed = body.speed * tuning.photophobic_berserk_speed_mult;
    patrol_step(body, speed, ctx);
}
