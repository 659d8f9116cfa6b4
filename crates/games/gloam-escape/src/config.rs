use serde::{Deserialize, Serialize};

/// How intent turns into velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    /// Velocity jumps straight to the target (menus, hub rooms).
    Direct,
    /// Velocity eases toward the target, giving momentum.
    #[default]
    Accelerated,
}

/// Player locomotion. Speeds are px/s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub normal_speed: f32,
    pub walk_speed: f32,
    pub integration: IntegrationMode,
    /// Fraction of the velocity gap closed per second in accelerated mode.
    pub acceleration: f32,
    /// Below this gap the velocity snaps to the target.
    pub snap_epsilon: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            normal_speed: 180.0,
            walk_speed: 90.0,
            integration: IntegrationMode::Accelerated,
            acceleration: 12.0,
            snap_epsilon: 0.001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub speed: f32,
    pub distance: f32,
    pub cooldown_ms: f64,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            speed: 900.0,
            distance: 180.0,
            cooldown_ms: 1500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    pub max_health: u32,
    /// Invulnerability after taking a hit.
    pub hit_grace_ms: f32,
    /// Reach for levers, items, mirrors and light sources.
    pub interaction_range: f32,
    pub throw_speed: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 24.0,
            height: 24.0,
            max_health: 3,
            hit_grace_ms: 1000.0,
            interaction_range: 48.0,
            throw_speed: 420.0,
        }
    }
}

/// Tunables shared by the non-boss adversary behaviors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdversaryConfig {
    /// Walking noise carries this fraction of an adversary's hearing range.
    pub walk_hearing_factor: f32,
    pub photophobic_dark_speed_mult: f32,
    pub photophobic_berserk_speed_mult: f32,
    pub projectile_speed: f32,
    pub projectile_size: f32,
    pub projectile_ttl_ms: f32,
    pub minion_size: f32,
    pub minion_speed: f32,
    pub minion_sight_range: f32,
    pub phantom_speed: f32,
}

impl Default for AdversaryConfig {
    fn default() -> Self {
        Self {
            walk_hearing_factor: 0.4,
            photophobic_dark_speed_mult: 0.5,
            photophobic_berserk_speed_mult: 1.75,
            projectile_speed: 220.0,
            projectile_size: 8.0,
            projectile_ttl_ms: 4000.0,
            minion_size: 16.0,
            minion_speed: 110.0,
            minion_sight_range: 400.0,
            phantom_speed: 360.0,
        }
    }
}

/// Boss FSM tunables. Multipliers scale the boss's own chase speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub charge_base_mult: f32,
    pub charge_max_mult: f32,
    /// Exponential ramp rate (per second) from base to max charge speed.
    pub charge_ramp_rate: f32,
    /// A charge that hits nothing gives up after this long.
    pub max_charge_ms: f32,
    pub recoil_fraction: f32,
    pub recoil_min_widths: f32,
    pub recoil_max_widths: f32,
    pub recoil_speed_mult: f32,
    pub center_speed_mult: f32,
    pub center_pause_phase2_ms: f32,
    pub center_pause_ms: f32,
    pub initial_pause_ms: f32,
    pub recover_ms: f32,
    pub phantom_count: u32,
    pub phantom_interval_ms: f32,
    pub halfway_speed_mult: f32,
    pub barrage_rounds: u32,
    pub barrage_projectiles: u32,
    pub barrage_interval_ms: f32,
    pub barrage_rotation_deg: f32,
    /// Gap kept between the boss and the arena wall it relocates to.
    pub wall_margin: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            charge_base_mult: 0.3,
            charge_max_mult: 4.0,
            charge_ramp_rate: 3.0,
            max_charge_ms: 6000.0,
            recoil_fraction: 0.25,
            recoil_min_widths: 0.5,
            recoil_max_widths: 2.0,
            recoil_speed_mult: 0.75,
            center_speed_mult: 2.0,
            center_pause_phase2_ms: 500.0,
            center_pause_ms: 1000.0,
            initial_pause_ms: 3000.0,
            recover_ms: 500.0,
            phantom_count: 8,
            phantom_interval_ms: 600.0,
            halfway_speed_mult: 3.0,
            barrage_rounds: 4,
            barrage_projectiles: 15,
            barrage_interval_ms: 500.0,
            barrage_rotation_deg: 3.0,
            wall_margin: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Duration of one leg (entry->center or center->exit).
    pub leg_ms: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { leg_ms: 350.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub nominal_frame_ms: f32,
    pub max_frame_multiple: f32,
    pub teleport_cooldown_ms: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nominal_frame_ms: gloam_core::time::NOMINAL_FRAME_MS,
            max_frame_multiple: gloam_core::time::MAX_FRAME_MULTIPLE,
            teleport_cooldown_ms: 750.0,
        }
    }
}

/// Top-level game configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeConfig {
    pub motion: MotionConfig,
    pub dash: DashConfig,
    pub player: PlayerConfig,
    pub adversary: AdversaryConfig,
    pub boss: BossConfig,
    pub flow: FlowConfig,
    pub session: SessionConfig,
}

impl EscapeConfig {
    /// Load config from `GLOAM_ESCAPE_CONFIG` or `config/escape.toml`.
    /// Falls back to defaults if the file is missing or unparseable.
    pub fn load() -> Self {
        let path = std::env::var("GLOAM_ESCAPE_CONFIG")
            .unwrap_or_else(|_| "config/escape.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<EscapeConfig>(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    EscapeConfig::default()
                },
            },
            Err(_) => EscapeConfig::default(),
        }
    }
}
