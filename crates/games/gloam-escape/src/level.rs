//! Level templates (authored data) and the live level state built from them.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gloam_core::{Aabb, Size, Vec2};

use crate::adversary::{Adversary, Behavior};
use crate::ambient::AmbientLight;
use crate::config::{EscapeConfig, IntegrationMode, PlayerConfig};
use crate::flow::FlowPuzzle;
use crate::optics::Optics;
use crate::player::Player;
use crate::world::{
    Boulder, Door, ExitGate, Gate, Item, KeyPickup, Pit, Projectile, Switch, Teleporter,
};

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Failed to read level file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed level template: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid level '{level}': {reason}")]
    Invalid { level: String, reason: String },
}

/// Declarative level description. Deep-copied into a [`LevelState`] at
/// level start and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTemplate {
    pub name: String,
    pub width: f32,
    pub height: f32,
    /// Top-left of the player's box.
    pub spawn: Vec2,
    /// Winning here (exit or boss defeat) ends the game in victory.
    #[serde(default)]
    pub final_level: bool,
    /// Overrides the configured integration mode.
    #[serde(default)]
    pub integration: Option<IntegrationMode>,
    /// Levers A..F drive the four lighting regions.
    #[serde(default)]
    pub ambient_lighting: bool,
    #[serde(default)]
    pub walls: Vec<Aabb>,
    #[serde(default)]
    pub doors: Vec<Door>,
    #[serde(default)]
    pub switches: Vec<Switch>,
    #[serde(default)]
    pub boulders: Vec<Boulder>,
    #[serde(default)]
    pub pits: Vec<Pit>,
    #[serde(default)]
    pub teleporters: Vec<Teleporter>,
    #[serde(default)]
    pub keys: Vec<KeyPickup>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub adversaries: Vec<Adversary>,
    #[serde(default)]
    pub optics: Optics,
    #[serde(default)]
    pub flow: Option<FlowPuzzle>,
    #[serde(default)]
    pub exit: Option<ExitGate>,
}

impl LevelTemplate {
    /// Parse and validate a JSON template.
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let template: LevelTemplate = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(0.0, 0.0, self.width, self.height)
    }

    /// [`validate_for_player`](Self::validate_for_player) with the default
    /// player size.
    pub fn validate(&self) -> Result<(), LevelError> {
        let player = PlayerConfig::default();
        self.validate_for_player(Size::new(player.width, player.height))
    }

    /// Reject templates that would leave entities undefined at runtime or
    /// place a body inside solid geometry. `player` is the player's box size.
    pub fn validate_for_player(&self, player: Size) -> Result<(), LevelError> {
        let mut problems: Vec<String> = Vec::new();

        if !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite())
        {
            problems.push(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        if !self.spawn.is_finite() || !self.bounds().contains_point(self.spawn) {
            problems.push(format!("spawn {:?} lies outside the level", self.spawn));
        }

        let mut check_ids = |kind: &str, ids: Vec<u32>| {
            let mut seen = BTreeSet::new();
            for id in ids {
                if !seen.insert(id) {
                    problems.push(format!("duplicate {kind} id {id}"));
                }
            }
        };
        check_ids("adversary", self.adversaries.iter().map(|a| a.id).collect());
        check_ids("door", self.doors.iter().map(|d| d.id).collect());
        check_ids("switch", self.switches.iter().map(|s| s.id).collect());
        check_ids("boulder", self.boulders.iter().map(|b| b.id).collect());
        check_ids("pit", self.pits.iter().map(|p| p.id).collect());
        check_ids("teleporter", self.teleporters.iter().map(|t| t.id).collect());
        check_ids("key", self.keys.iter().map(|k| k.id).collect());
        check_ids("item", self.items.iter().map(|i| i.id).collect());
        check_ids("mirror", self.optics.mirrors.iter().map(|m| m.id).collect());
        check_ids("sensor", self.optics.sensors.iter().map(|s| s.id).collect());
        check_ids("light source", self.optics.sources.iter().map(|s| s.id).collect());

        for rect in self.walls.iter().chain(self.boulders.iter().map(|b| &b.rect)) {
            if !(rect.width > 0.0 && rect.height > 0.0) {
                problems.push(format!("rectangle {rect:?} has no area"));
            }
        }
        for b in &self.boulders {
            if b.max_hits == 0 {
                problems.push(format!("boulder {} has max_hits 0", b.id));
            }
        }
        for p in &self.pits {
            if !(p.dormant_ms > 0.0 && p.active_ms > 0.0) {
                problems.push(format!("pit {} needs positive durations", p.id));
            }
        }

        let switch_ids: BTreeSet<u32> = self.switches.iter().map(|s| s.id).collect();
        let gates = self
            .doors
            .iter()
            .flat_map(|d| d.opens_when.iter())
            .chain(self.exit.iter().flat_map(|e| e.requires.iter()));
        for gate in gates {
            if let Gate::SwitchPressed { id } = gate
                && !switch_ids.contains(id)
            {
                problems.push(format!("gate refers to missing switch {id}"));
            }
        }
        for s in &self.switches {
            if let Some(label) = s.label
                && !('A'..='F').contains(&label)
            {
                problems.push(format!("switch {} has label {label:?}, expected A..F", s.id));
            }
        }

        let pit_ids: BTreeSet<u32> = self.pits.iter().map(|p| p.id).collect();
        let mut bosses = 0;
        for a in &self.adversaries {
            if !(a.body.rect.width > 0.0 && a.body.rect.height > 0.0) {
                problems.push(format!("adversary {} has no area", a.id));
            }
            if !(a.body.speed.is_finite() && a.body.speed >= 0.0) {
                problems.push(format!("adversary {} has invalid speed", a.id));
            }
            match &a.behavior {
                Behavior::Rattlesnake(s) if !pit_ids.contains(&s.pit) => {
                    problems.push(format!("adversary {} refers to missing pit {}", a.id, s.pit));
                },
                Behavior::Boss { .. } => bosses += 1,
                _ => {},
            }
        }
        if bosses > 1 {
            problems.push(format!("{bosses} bosses, at most one allowed"));
        }

        if let Some(flow) = &self.flow {
            problems.extend(flow.shape_errors());
        }

        // Bodies resolve against solids assuming they start clear.
        let solids: Vec<Aabb> = self
            .walls
            .iter()
            .copied()
            .chain(self.boulders.iter().map(|b| b.rect))
            .collect();
        let blocked = |rect: &Aabb| solids.iter().any(|s| s.overlaps(rect));
        if blocked(&Aabb::from_position(self.spawn, player)) {
            problems.push(format!("spawn {:?} overlaps a wall or boulder", self.spawn));
        }
        for a in &self.adversaries {
            if blocked(&a.body.rect) {
                problems.push(format!("adversary {} overlaps a wall or boulder", a.id));
            }
        }
        for tp in &self.teleporters {
            let arrival = Aabb::centered(tp.receiver.center(), player).clamped_inside(&self.bounds());
            if blocked(&arrival) {
                problems.push(format!("teleporter {} lands the player in a wall or boulder", tp.id));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LevelError::Invalid {
                level: self.name.clone(),
                reason: problems.join("; "),
            })
        }
    }
}

/// Load and validate a level template from a JSON file.
pub fn load_level_from_file(path: impl AsRef<Path>) -> Result<LevelTemplate, LevelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    LevelTemplate::from_json(&content)
}

/// Everything live in the current level. This is the render snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    pub name: String,
    pub bounds: Aabb,
    pub final_level: bool,
    pub integration: IntegrationMode,
    pub ambient_lighting: bool,
    pub ambient: AmbientLight,
    pub player: Player,
    pub walls: Vec<Aabb>,
    pub doors: Vec<Door>,
    pub switches: Vec<Switch>,
    pub boulders: Vec<Boulder>,
    pub pits: Vec<Pit>,
    pub teleporters: Vec<Teleporter>,
    pub keys: Vec<KeyPickup>,
    pub items: Vec<Item>,
    pub adversaries: Vec<Adversary>,
    pub projectiles: Vec<Projectile>,
    pub optics: Optics,
    pub flow: Option<FlowPuzzle>,
    pub exit: Option<ExitGate>,
    pub boss_defeated: bool,
    /// Where a thrown item landed last tick; heard this tick.
    pub pending_noise: Option<Vec2>,
    pub elapsed_ms: f64,
    next_id: u32,
}

impl LevelState {
    /// Placeholder shown before any level has started.
    pub fn empty(config: &EscapeConfig) -> Self {
        Self {
            name: String::new(),
            bounds: Aabb::new(0.0, 0.0, 0.0, 0.0),
            final_level: false,
            integration: config.motion.integration,
            ambient_lighting: false,
            ambient: AmbientLight::fully_lit(),
            player: Player::new(Vec2::ZERO, config),
            walls: Vec::new(),
            doors: Vec::new(),
            switches: Vec::new(),
            boulders: Vec::new(),
            pits: Vec::new(),
            teleporters: Vec::new(),
            keys: Vec::new(),
            items: Vec::new(),
            adversaries: Vec::new(),
            projectiles: Vec::new(),
            optics: Optics::default(),
            flow: None,
            exit: None,
            boss_defeated: false,
            pending_noise: None,
            elapsed_ms: 0.0,
            next_id: 1,
        }
    }

    pub fn from_template(template: &LevelTemplate, config: &EscapeConfig) -> Self {
        let next_id = template
            .adversaries
            .iter()
            .map(|a| a.id)
            .max()
            .map_or(1, |m| m.saturating_add(1));
        Self {
            name: template.name.clone(),
            bounds: template.bounds(),
            final_level: template.final_level,
            integration: template.integration.unwrap_or(config.motion.integration),
            ambient_lighting: template.ambient_lighting,
            ambient: AmbientLight::fully_lit(),
            player: Player::new(template.spawn, config),
            walls: template.walls.clone(),
            doors: template.doors.clone(),
            switches: template.switches.clone(),
            boulders: template.boulders.clone(),
            pits: template.pits.clone(),
            teleporters: template.teleporters.clone(),
            keys: template.keys.clone(),
            items: template.items.clone(),
            adversaries: template.adversaries.clone(),
            projectiles: Vec::new(),
            optics: template.optics.clone(),
            flow: template.flow.clone(),
            exit: template.exit.clone(),
            boss_defeated: false,
            pending_noise: None,
            elapsed_ms: 0.0,
            next_id,
        }
    }

    /// Fresh id for a spawned adversary or projectile.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Walls and closed doors.
    pub fn wall_solids(&self) -> Vec<Aabb> {
        self.walls
            .iter()
            .copied()
            .chain(self.doors.iter().filter(|d| !d.open).map(|d| d.rect))
            .collect()
    }

    /// Walls, closed doors and intact boulders.
    pub fn solids(&self) -> Vec<Aabb> {
        let mut solids = self.wall_solids();
        solids.extend(self.boulders.iter().filter(|b| !b.destroyed).map(|b| b.rect));
        solids
    }

    pub fn boss(&self) -> Option<&Adversary> {
        self.adversaries.iter().find(|a| a.is_boss())
    }
}
