//! Adversary behavior engine.
//!
//! Every adversary is a [`Body`] (shared movement and perception fields)
//! plus a [`Behavior`] variant holding its type-specific state. The session
//! calls [`update_adversary`] once per adversary per tick; cross-entity
//! consequences go into [`Effects`] and are applied by the session after
//! every adversary has moved.

pub mod boss;
pub mod hazards;
pub mod patrol;
pub mod sentries;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use gloam_core::{Aabb, Outbox, Vec2};

use crate::config::EscapeConfig;
use crate::events::{SimEvent, SpawnRequest};
use crate::flow::{Cell, FlowPuzzle};
use crate::world::{Boulder, Pit};

pub use boss::{BossBrain, BossMode, phase_for_hits};
pub use hazards::{PhantomState, PlumberState, RattlesnakeState, SpitterState};
pub use patrol::Patrol;
pub use sentries::{BurstPhase, BursterState, GuardState, PhotophobicState, StalkerState};

pub type AdversaryId = u32;

/// Movement and perception shared by every adversary type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub rect: Aabb,
    /// Nominal (patrol) speed, px/s.
    pub speed: f32,
    /// Speed while pursuing. Zero means "same as `speed`".
    #[serde(default)]
    pub chase_speed: f32,
    /// Unit heading of the last move, for renderers.
    #[serde(default)]
    pub direction: Vec2,
    #[serde(default)]
    pub patrol: Patrol,
    #[serde(default)]
    pub sight_range: f32,
    #[serde(default)]
    pub hearing_range: f32,
    #[serde(default)]
    pub chasing: bool,
}

impl Body {
    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    pub fn pursuit_speed(&self) -> f32 {
        if self.chase_speed > 0.0 {
            self.chase_speed
        } else {
            self.speed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Behavior {
    /// Walks its route and nothing else.
    Patroller,
    Guard(GuardState),
    Stalker(StalkerState),
    Burster(BursterState),
    Photophobic(PhotophobicState),
    Rattlesnake(RattlesnakeState),
    Plumber(PlumberState),
    Spitter(SpitterState),
    /// Small sighted chaser released by the boss.
    Minion,
    Phantom(PhantomState),
    Boss {
        /// Created on the first update.
        #[serde(default)]
        brain: Option<Box<BossBrain>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adversary {
    pub id: AdversaryId,
    pub body: Body,
    pub behavior: Behavior,
}

impl Adversary {
    /// Whether touching this adversary costs the player health right now.
    pub fn is_harmful(&self) -> bool {
        match &self.behavior {
            Behavior::Rattlesnake(s) => s.emerged,
            Behavior::Photophobic(p) => p.berserk,
            Behavior::Boss { brain } => brain.as_ref().is_none_or(|b| !b.is_defeated()),
            _ => true,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.behavior, Behavior::Boss { .. })
    }

    /// Boss id a phantom belongs to.
    pub fn phantom_owner(&self) -> Option<AdversaryId> {
        match &self.behavior {
            Behavior::Phantom(p) => Some(p.owner),
            _ => None,
        }
    }

    pub fn boss_brain(&self) -> Option<&BossBrain> {
        match &self.behavior {
            Behavior::Boss { brain } => brain.as_deref(),
            _ => None,
        }
    }
}

/// A sound the player made this tick. `reach` is the fraction of an
/// adversary's hearing range it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Noise {
    pub position: Vec2,
    pub reach: f32,
}

/// Read-only view of the world handed to every behavior.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext<'a> {
    pub now_ms: f64,
    pub delta_ms: f32,
    pub player: Aabb,
    pub noise: Option<Noise>,
    /// Walls, closed doors and intact boulders.
    pub solids: &'a [Aabb],
    /// Walls and closed doors only.
    pub walls: &'a [Aabb],
    pub boulders: &'a [Boulder],
    pub pits: &'a [Pit],
    pub flow: Option<&'a FlowPuzzle>,
    pub bounds: Aabb,
    pub config: &'a EscapeConfig,
    /// Phantoms alive that belong to the adversary being updated.
    pub live_phantoms: u32,
}

impl BehaviorContext<'_> {
    pub fn dt_secs(&self) -> f32 {
        self.delta_ms / 1000.0
    }

    pub fn player_center(&self) -> Vec2 {
        self.player.center()
    }
}

/// A projectile an adversary wants fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileLaunch {
    pub origin: Vec2,
    pub velocity: Vec2,
    pub source: AdversaryId,
}

/// Cross-entity consequences collected during the behavior pass.
#[derive(Debug, Default)]
pub struct Effects {
    pub spawns: Outbox<SpawnRequest>,
    pub boulder_hits: SmallVec<[u32; 2]>,
    pub projectiles: Vec<ProjectileLaunch>,
    pub tile_rotations: SmallVec<[Cell; 2]>,
    pub retire: SmallVec<[AdversaryId; 4]>,
    pub events: Vec<SimEvent>,
}

/// Run one tick of `adversary`'s behavior.
pub fn update_adversary(adversary: &mut Adversary, ctx: &BehaviorContext<'_>, fx: &mut Effects) {
    let id = adversary.id;
    let body = &mut adversary.body;
    match &mut adversary.behavior {
        Behavior::Patroller => {
            let speed = body.speed;
            patrol::patrol_step(body, speed, ctx);
        },
        Behavior::Guard(state) => sentries::update_guard(body, state, ctx),
        Behavior::Stalker(state) => sentries::update_stalker(body, state, ctx),
        Behavior::Burster(state) => sentries::update_burster(body, state, ctx),
        Behavior::Photophobic(state) => sentries::update_photophobic(body, state, ctx),
        Behavior::Rattlesnake(state) => hazards::update_rattlesnake(body, state, ctx),
        Behavior::Plumber(state) => hazards::update_plumber(body, state, ctx, fx),
        Behavior::Spitter(state) => hazards::update_spitter(id, body, state, ctx, fx),
        Behavior::Minion => hazards::update_minion(body, ctx),
        Behavior::Phantom(state) => hazards::update_phantom(id, body, state, ctx, fx),
        Behavior::Boss { brain } => boss::update_boss(id, body, brain, ctx, fx),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn harmless_states() {
        let mut snake = Adversary {
            id: 1,
            body: body_at(0.0, 0.0),
            behavior: Behavior::Rattlesnake(RattlesnakeState {
                pit: 1,
                emerged: false,
            }),
        };
        assert!(!snake.is_harmful());
        snake.behavior = Behavior::Rattlesnake(RattlesnakeState {
            pit: 1,
            emerged: true,
        });
        assert!(snake.is_harmful());

        let dark = Adversary {
            id: 2,
            body: body_at(0.0, 0.0),
            behavior: Behavior::Photophobic(PhotophobicState { berserk: false }),
        };
        assert!(!dark.is_harmful());
    }

    #[test]
    fn behavior_tag_parses_from_json() {
        let adv: Adversary = serde_json::from_str(
            r#"{
                "id": 3,
                "body": {
                    "rect": { "x": 10, "y": 10, "width": 20, "height": 20 },
                    "speed": 50,
                    "sight_range": 150
                },
                "behavior": { "type": "guard", "lost_sight_cooldown_ms": 2000 }
            }"#,
        )
        .unwrap();
        assert!(matches!(adv.behavior, Behavior::Guard(_)));
        assert_eq!(adv.body.pursuit_speed(), 50.0);

        let boss: Adversary = serde_json::from_str(
            r#"{
                "id": 9,
                "body": { "rect": { "x": 0, "y": 0, "width": 64, "height": 64 }, "speed": 80 },
                "behavior": { "type": "boss" }
            }"#,
        )
        .unwrap();
        assert!(boss.is_boss());
        assert!(boss.boss_brain().is_none());
        assert!(boss.is_harmful());
    }
}
