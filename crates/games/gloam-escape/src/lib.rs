//! Deterministic simulation core for a top-down escape/puzzle game.
//!
//! The host drives a [`Session`] once per frame with an explicit delta and
//! timestamp, reads the [`LevelState`] snapshot to render, and drains the
//! returned [`SimEvent`]s.

pub mod adversary;
pub mod ambient;
pub mod collision;
pub mod config;
pub mod events;
pub mod flow;
pub mod interactions;
pub mod level;
pub mod optics;
pub mod player;
pub mod session;
pub mod world;

pub use config::EscapeConfig;
pub use events::{SimEvent, SpawnKind, SpawnRequest};
pub use level::{LevelError, LevelState, LevelTemplate, load_level_from_file};
pub use player::MovementIntent;
pub use session::{Session, SessionPhase};
