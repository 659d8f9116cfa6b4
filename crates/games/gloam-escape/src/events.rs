use serde::{Deserialize, Serialize};

use gloam_core::Vec2;

use crate::adversary::AdversaryId;

/// What a spawn request asks the session to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnKind {
    /// Small sighted chaser released when the boss first cracks a boulder.
    Minion,
    /// Boss clone that flies out at the player and returns.
    Phantom,
}

/// A cross-entity request raised by an adversary during its update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub kind: SpawnKind,
    pub position: Vec2,
    pub source: AdversaryId,
}

/// One-shot notifications drained by the host once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    LevelStarted { name: String },
    Spawned { id: AdversaryId, request: SpawnRequest },
    DashStarted,
    PlayerHit { health: u32 },
    PlayerDied,
    KeyCollected { id: u32 },
    ItemPickedUp { id: u32 },
    ItemDropped { id: u32 },
    ItemThrown { id: u32, target: Vec2 },
    ItemLanded { id: u32, position: Vec2 },
    LeverToggled { id: u32, on: bool },
    DoorOpened { id: u32 },
    DoorClosed { id: u32 },
    Teleported { id: u32 },
    BoulderHit { id: u32, hits: u32 },
    BoulderDestroyed { id: u32 },
    BossPhaseChanged { phase: u8 },
    BossDefeated,
    ProjectilesFired { source: AdversaryId, count: u32 },
    TileForcedRotation { col: usize, row: usize },
    SensorActivated { id: u32 },
    OpticsSolved,
    FlowStarted,
    FlowBlocked { col: usize, row: usize },
    FlowSolved,
    FlowEmptied,
    LevelComplete,
    GameOver,
    Victory,
}
