//! Player motion controller: intent -> velocity -> position, plus the dash.

use serde::{Deserialize, Serialize};

use gloam_core::{Aabb, Countdown, Size, Vec2};

use crate::config::{EscapeConfig, IntegrationMode, MotionConfig};

/// Per-tick movement intent from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementIntent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub walk: bool,
    pub dash: bool,
}

impl MovementIntent {
    /// Sum of held unit axes with diagonals normalized. Zero when idle or
    /// when opposite keys cancel.
    pub fn direction(&self) -> Vec2 {
        let x = f32::from(u8::from(self.right)) - f32::from(u8::from(self.left));
        let y = f32::from(u8::from(self.down)) - f32::from(u8::from(self.up));
        if x != 0.0 && y != 0.0 {
            Vec2::new(x, y) * std::f32::consts::FRAC_1_SQRT_2
        } else {
            Vec2::new(x, y)
        }
    }

    pub fn is_moving(&self) -> bool {
        !self.direction().is_zero()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashState {
    pub active: bool,
    pub direction: Vec2,
    /// Fraction of the dash distance covered, in [0, 1].
    pub progress: f32,
    pub invulnerable: bool,
    pub last_dash_ms: Option<f64>,
    pub cooldown_ms: f64,
    /// Dash input on the previous tick, for rising-edge detection.
    pub input_held: bool,
}

impl DashState {
    pub fn new(cooldown_ms: f64) -> Self {
        Self {
            cooldown_ms,
            ..Default::default()
        }
    }

    pub fn cooldown_ready(&self, now_ms: f64) -> bool {
        match self.last_dash_ms {
            Some(last) => now_ms - last >= self.cooldown_ms,
            None => true,
        }
    }

    /// Distance covered since the dash started.
    pub fn distance_traveled(&self, dash_distance: f32) -> f32 {
        self.progress * dash_distance
    }
}

/// How loud the player was this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loudness {
    Silent,
    Walking,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub rect: Aabb,
    pub velocity: Vec2,
    pub target_velocity: Vec2,
    pub dash: DashState,
    pub health: u32,
    pub max_health: u32,
    pub hit_grace: Countdown,
    pub carried_item: Option<u32>,
    pub has_key: bool,
    pub loudness: Loudness,
}

impl Player {
    pub fn new(spawn: Vec2, config: &EscapeConfig) -> Self {
        Self {
            rect: Aabb::from_position(
                spawn,
                Size::new(config.player.width, config.player.height),
            ),
            velocity: Vec2::ZERO,
            target_velocity: Vec2::ZERO,
            dash: DashState::new(config.dash.cooldown_ms),
            health: config.player.max_health,
            max_health: config.player.max_health,
            hit_grace: Countdown::expired(),
            carried_item: None,
            has_key: false,
            loudness: Loudness::Silent,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    /// Immune to damage: inside the dash window or the post-hit grace.
    pub fn is_invulnerable(&self) -> bool {
        self.dash.invulnerable || self.hit_grace.is_running()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply one hit unless invulnerable. Returns true if health was lost.
    pub fn take_hit(&mut self, grace_ms: f32) -> bool {
        if self.is_invulnerable() || !self.is_alive() {
            return false;
        }
        self.health -= 1;
        self.hit_grace = Countdown::new(grace_ms);
        true
    }
}

/// What the motion step did, for the session's event stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionReport {
    pub dash_started: bool,
    pub dash_ended: bool,
}

/// Advance the player one tick: dash state, velocity, integrate, clamp.
///
/// Collision against walls is resolved afterwards by the session, using the
/// rect from before this call.
pub fn update_player(
    player: &mut Player,
    intent: &MovementIntent,
    delta_ms: f32,
    now_ms: f64,
    config: &EscapeConfig,
    bounds: &Aabb,
) -> MotionReport {
    let motion = &config.motion;
    let dash = &config.dash;
    let dt = delta_ms / 1000.0;
    let mut report = MotionReport::default();
    let held = intent.direction();

    player.hit_grace.tick(delta_ms);

    let rising_edge = intent.dash && !player.dash.input_held;
    player.dash.input_held = intent.dash;

    if rising_edge && !player.dash.active && player.dash.cooldown_ready(now_ms) && !held.is_zero()
    {
        player.dash.active = true;
        player.dash.direction = held.normalize_or_zero();
        player.dash.progress = 0.0;
        player.dash.invulnerable = true;
        player.dash.last_dash_ms = Some(now_ms);
        report.dash_started = true;
    }

    if player.dash.active {
        // Steering mid-dash is allowed: newly held keys redirect the burst.
        if !held.is_zero() {
            player.dash.direction = held.normalize_or_zero();
        }
        let distance = dash.distance.max(f32::EPSILON);
        player.dash.progress = (player.dash.progress + dash.speed * dt / distance).min(1.0);
        player.dash.invulnerable = player.dash.distance_traveled(distance) < distance;

        if player.dash.progress >= 1.0 {
            player.dash.active = false;
            player.dash.invulnerable = false;
            player.velocity = Vec2::ZERO;
            player.target_velocity = Vec2::ZERO;
            report.dash_ended = true;
        } else {
            player.velocity = player.dash.direction * dash.speed;
            player.target_velocity = player.velocity;
        }
    } else {
        let speed = if intent.walk {
            motion.walk_speed
        } else {
            motion.normal_speed
        };
        player.target_velocity = held * speed;
        player.velocity = integrate_velocity(
            player.velocity,
            player.target_velocity,
            dt,
            motion,
        );
    }

    player.loudness = if player.dash.active || (!held.is_zero() && !intent.walk) {
        Loudness::Running
    } else if !held.is_zero() {
        Loudness::Walking
    } else {
        Loudness::Silent
    };

    let moved = player.rect.translated(player.velocity * dt);
    player.rect = moved.clamped_inside(bounds);
    report
}

fn integrate_velocity(current: Vec2, target: Vec2, dt: f32, motion: &MotionConfig) -> Vec2 {
    match motion.integration {
        IntegrationMode::Direct => target,
        IntegrationMode::Accelerated => {
            let blend = (motion.acceleration * dt).clamp(0.0, 1.0);
            let mut next = current + (target - current) * blend;
            if (target.x - next.x).abs() < motion.snap_epsilon {
                next.x = target.x;
            }
            if (target.y - next.y).abs() < motion.snap_epsilon {
                next.y = target.y;
            }
            next
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Aabb = Aabb::new(0.0, 0.0, 2000.0, 2000.0);

    fn player() -> Player {
        Player::new(Vec2::new(1000.0, 1000.0), &EscapeConfig::default())
    }

    fn step(p: &mut Player, intent: MovementIntent, now: f64, mode: IntegrationMode) -> MotionReport {
        let mut cfg = EscapeConfig::default();
        cfg.motion.integration = mode;
        update_player(p, &intent, 16.0, now, &cfg, &BOUNDS)
    }

    const RIGHT: MovementIntent = MovementIntent {
        up: false,
        down: false,
        left: false,
        right: true,
        walk: false,
        dash: false,
    };

    const RIGHT_DASH: MovementIntent = MovementIntent {
        dash: true,
        ..RIGHT
    };

    #[test]
    fn diagonal_is_normalized() {
        let d = MovementIntent {
            up: true,
            right: true,
            ..Default::default()
        }
        .direction();
        assert!((d.length() - 1.0).abs() < 1e-5);
        assert!(d.x > 0.0 && d.y < 0.0);
    }

    #[test]
    fn opposite_keys_cancel() {
        let d = MovementIntent {
            left: true,
            right: true,
            ..Default::default()
        }
        .direction();
        assert!(d.is_zero());
    }

    #[test]
    fn direct_mode_reaches_target_immediately() {
        let mut p = player();
        step(&mut p, RIGHT, 0.0, IntegrationMode::Direct);
        assert_eq!(p.velocity, Vec2::new(180.0, 0.0));
    }

    #[test]
    fn accelerated_mode_eases_then_snaps() {
        let mut p = player();
        step(&mut p, RIGHT, 0.0, IntegrationMode::Accelerated);
        assert!(p.velocity.x > 0.0 && p.velocity.x < 180.0);
        for i in 1..400 {
            step(&mut p, RIGHT, f64::from(i) * 16.0, IntegrationMode::Accelerated);
        }
        assert_eq!(p.velocity.x, 180.0);
    }

    #[test]
    fn walk_uses_walk_speed() {
        let mut p = player();
        let walk = MovementIntent { walk: true, ..RIGHT };
        step(&mut p, walk, 0.0, IntegrationMode::Direct);
        assert_eq!(p.velocity.x, 90.0);
        assert_eq!(p.loudness, Loudness::Walking);
    }

    #[test]
    fn dash_needs_a_held_direction() {
        let mut p = player();
        let report = step(
            &mut p,
            MovementIntent {
                dash: true,
                ..Default::default()
            },
            0.0,
            IntegrationMode::Direct,
        );
        assert!(!report.dash_started);
        assert!(!p.dash.active);
    }

    #[test]
    fn dash_fires_on_rising_edge_only() {
        let mut p = player();
        assert!(step(&mut p, RIGHT_DASH, 0.0, IntegrationMode::Direct).dash_started);
        // Held through the whole dash and past the cooldown: no re-trigger.
        for i in 1..200 {
            let r = step(&mut p, RIGHT_DASH, f64::from(i) * 16.0, IntegrationMode::Direct);
            assert!(!r.dash_started);
        }
    }

    #[test]
    fn dash_cooldown_rejects_then_allows() {
        let mut p = player();
        assert!(step(&mut p, RIGHT_DASH, 0.0, IntegrationMode::Direct).dash_started);
        let mut now = 16.0;
        while p.dash.active {
            step(&mut p, RIGHT, now, IntegrationMode::Direct);
            now += 16.0;
        }
        step(&mut p, RIGHT, 990.0, IntegrationMode::Direct);
        assert!(!step(&mut p, RIGHT_DASH, 1000.0, IntegrationMode::Direct).dash_started);
        step(&mut p, RIGHT, 1590.0, IntegrationMode::Direct);
        assert!(step(&mut p, RIGHT_DASH, 1600.0, IntegrationMode::Direct).dash_started);
    }

    #[test]
    fn dash_ends_exactly_at_full_progress_with_zero_velocity() {
        let mut p = player();
        step(&mut p, RIGHT_DASH, 0.0, IntegrationMode::Direct);
        assert!(p.dash.invulnerable);
        let mut now = 16.0;
        let mut ended = false;
        for _ in 0..100 {
            let r = step(&mut p, RIGHT, now, IntegrationMode::Direct);
            now += 16.0;
            if r.dash_ended {
                ended = true;
                break;
            }
            assert!(p.dash.progress < 1.0);
            assert!(p.dash.invulnerable);
        }
        assert!(ended);
        assert_eq!(p.dash.progress, 1.0);
        assert!(!p.dash.invulnerable);
        assert_eq!(p.velocity, Vec2::ZERO);
    }

    #[test]
    fn dash_can_be_steered() {
        let mut p = player();
        step(&mut p, RIGHT_DASH, 0.0, IntegrationMode::Direct);
        let down = MovementIntent {
            down: true,
            ..Default::default()
        };
        step(&mut p, down, 16.0, IntegrationMode::Direct);
        assert_eq!(p.dash.direction, Vec2::new(0.0, 1.0));
        assert!(p.velocity.y > 0.0);
        assert_eq!(p.velocity.x, 0.0);
    }

    #[test]
    fn position_clamped_inside_bounds() {
        let mut p = Player::new(Vec2::new(1990.0, 10.0), &EscapeConfig::default());
        for i in 0..20 {
            step(&mut p, RIGHT, f64::from(i) * 16.0, IntegrationMode::Direct);
        }
        assert!(BOUNDS.contains(&p.rect));
        assert_eq!(p.rect.right(), 2000.0);
    }

    #[test]
    fn grace_window_blocks_second_hit() {
        let mut p = player();
        assert!(p.take_hit(1000.0));
        assert!(!p.take_hit(1000.0));
        assert_eq!(p.health, 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn dash_progress_monotonic_and_invulnerability_matches_distance(
                inputs in proptest::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()), 1..120),
            ) {
                let cfg = EscapeConfig::default();
                let mut p = player();
                let mut now = 0.0;
                let mut last_progress = 0.0f32;
                for &(up, right, dash, walk) in &inputs {
                    let intent = MovementIntent { up, right, dash, walk, ..Default::default() };
                    let report = update_player(&mut p, &intent, 16.0, now, &cfg, &BOUNDS);
                    now += 16.0;
                    if report.dash_started {
                        last_progress = 0.0;
                    }
                    prop_assert!(p.dash.progress >= last_progress);
                    last_progress = p.dash.progress;
                    let traveled = p.dash.distance_traveled(cfg.dash.distance);
                    prop_assert_eq!(
                        p.dash.invulnerable,
                        p.dash.active && traveled < cfg.dash.distance
                    );
                }
            }
        }
    }
}
