//! Static and semi-static level geometry: doors, switches, boulders, pits,
//! teleporters, pickups, items, projectiles, and the exit gate.

use serde::{Deserialize, Serialize};

use gloam_core::{Aabb, Countdown, Vec2};

use crate::adversary::AdversaryId;

/// A condition a door or the exit waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Gate {
    SwitchPressed { id: u32 },
    KeyHeld,
    FlowSolved,
    SensorsLit,
    BossDefeated,
}

/// Facts gates are evaluated against, gathered once per tick.
#[derive(Debug, Clone, Default)]
pub struct GateStatus {
    pub pressed_switches: Vec<u32>,
    pub key_held: bool,
    pub flow_solved: bool,
    pub sensors_lit: bool,
    pub boss_defeated: bool,
}

impl Gate {
    pub fn is_satisfied(&self, status: &GateStatus) -> bool {
        match *self {
            Gate::SwitchPressed { id } => status.pressed_switches.contains(&id),
            Gate::KeyHeld => status.key_held,
            Gate::FlowSolved => status.flow_solved,
            Gate::SensorsLit => status.sensors_lit,
            Gate::BossDefeated => status.boss_defeated,
        }
    }
}

pub fn gates_satisfied(gates: &[Gate], status: &GateStatus) -> bool {
    gates.iter().all(|g| g.is_satisfied(status))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: u32,
    pub rect: Aabb,
    #[serde(default)]
    pub open: bool,
    /// Opens on contact while a key is held, consuming it. Stays open.
    #[serde(default)]
    pub requires_key: bool,
    /// Open while every gate holds.
    #[serde(default)]
    pub opens_when: Vec<Gate>,
}

impl Door {
    /// Gated doors follow their conditions every tick.
    pub fn is_gated(&self) -> bool {
        !self.opens_when.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    /// Toggled by command within interaction range.
    Lever,
    /// Held down while the player or a floor item rests on it.
    PressurePlate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub id: u32,
    pub rect: Aabb,
    pub kind: SwitchKind,
    #[serde(default)]
    pub pressed: bool,
    /// Ambient-light input this lever drives (`'A'..='F'`).
    #[serde(default)]
    pub label: Option<char>,
    /// Only operable while the lighting quadrant it sits in is lit.
    #[serde(default)]
    pub requires_light: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boulder {
    pub id: u32,
    pub rect: Aabb,
    pub max_hits: u32,
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub destroyed: bool,
}

impl Boulder {
    /// Register one hit. Returns true if this hit destroyed the boulder.
    pub fn hit(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.hits += 1;
        if self.hits >= self.max_hits {
            self.destroyed = true;
            return true;
        }
        false
    }
}

/// Shared emerge/retreat clock for every pit-dweller assigned to a pit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PitCycle {
    pub elapsed_ms: f32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pit {
    pub id: u32,
    pub rect: Aabb,
    pub dormant_ms: f32,
    pub active_ms: f32,
    #[serde(default)]
    pub cycle: PitCycle,
}

impl Pit {
    /// Advance the shared clock. Returns the new activity on a transition.
    pub fn advance(&mut self, delta_ms: f32) -> Option<bool> {
        self.cycle.elapsed_ms += delta_ms;
        let limit = if self.cycle.active {
            self.active_ms
        } else {
            self.dormant_ms
        };
        if self.cycle.elapsed_ms >= limit {
            self.cycle.elapsed_ms -= limit;
            self.cycle.active = !self.cycle.active;
            return Some(self.cycle.active);
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teleporter {
    pub id: u32,
    pub sender: Aabb,
    pub receiver: Aabb,
    pub activation_ms: f32,
    /// Time the player has stood in the sender.
    #[serde(default)]
    pub charge_ms: f32,
    #[serde(default)]
    pub cooldown: Countdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPickup {
    pub id: u32,
    pub rect: Aabb,
    #[serde(default)]
    pub collected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Floor,
    Carried,
    Thrown {
        target: Vec2,
        velocity: Vec2,
    },
}

/// A throwable prop (rock, crate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub rect: Aabb,
    #[serde(default)]
    pub state: ItemState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitGate {
    pub rect: Aabb,
    #[serde(default)]
    pub requires: Vec<Gate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub rect: Aabb,
    pub velocity: Vec2,
    pub ttl_ms: f32,
    pub source: AdversaryId,
}

impl Projectile {
    /// Step forward. Returns false once the projectile should be removed.
    pub fn advance(&mut self, delta_ms: f32, solids: &[Aabb], bounds: &Aabb) -> bool {
        self.ttl_ms -= delta_ms;
        if self.ttl_ms <= 0.0 {
            return false;
        }
        self.rect = self.rect.translated(self.velocity * (delta_ms / 1000.0));
        if !bounds.overlaps(&self.rect) {
            return false;
        }
        !solids.iter().any(|s| s.overlaps(&self.rect))
    }
}
