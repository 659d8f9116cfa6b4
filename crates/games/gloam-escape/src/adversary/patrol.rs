//! Shared movement primitives: ping-pong patrol, pursuit, perception.

use serde::{Deserialize, Serialize};

use gloam_core::Vec2;

use super::{BehaviorContext, Body};
use crate::collision::{line_of_sight, try_move};

/// Ordered route walked A -> B -> C -> B -> A -> ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patrol {
    /// Waypoints are center positions.
    #[serde(default)]
    pub waypoints: Vec<Vec2>,
    #[serde(default)]
    pub index: usize,
    #[serde(default = "forward")]
    pub forward: bool,
}

fn forward() -> bool {
    true
}

impl Default for Patrol {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            index: 0,
            forward: true,
        }
    }
}

impl Patrol {
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        Self {
            waypoints,
            ..Default::default()
        }
    }

    pub fn target(&self) -> Option<Vec2> {
        self.waypoints.get(self.index).copied()
    }

    /// Move to the next waypoint, bouncing at either end.
    pub fn advance(&mut self) {
        let n = self.waypoints.len();
        if n < 2 {
            return;
        }
        if self.forward {
            if self.index + 1 < n {
                self.index += 1;
            } else {
                self.forward = false;
                self.index = n - 2;
            }
        } else if self.index > 0 {
            self.index -= 1;
        } else {
            self.forward = true;
            self.index = 1;
        }
    }

    pub fn restart(&mut self) {
        self.index = 0;
        self.forward = true;
    }
}

/// Outcome of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Arrived,
    Moved,
    Blocked,
    Idle,
}

/// Move the body's center toward `target` at `speed`. Moves that would
/// overlap a solid or leave the bounds are rejected outright. Arrival snaps
/// the center onto the target.
pub fn move_toward(body: &mut Body, target: Vec2, speed: f32, ctx: &BehaviorContext<'_>) -> Step {
    let to = target - body.center();
    let dist = to.length();
    if !dist.is_finite() {
        return Step::Idle;
    }
    let half = body.rect.size().half();
    if dist <= f32::EPSILON {
        body.rect = body.rect.with_position(target - half);
        return Step::Arrived;
    }
    let reach = speed * ctx.dt_secs();
    if reach <= 0.0 || !reach.is_finite() {
        return Step::Idle;
    }

    let arriving = dist <= reach;
    let delta = if arriving { to } else { to * (reach / dist) };
    if !try_move(&mut body.rect, delta, ctx.solids, &ctx.bounds) {
        return Step::Blocked;
    }
    body.direction = to.normalize_or_zero();
    if arriving {
        body.rect = body.rect.with_position(target - half);
        Step::Arrived
    } else {
        Step::Moved
    }
}

/// Walk the patrol route. A blocked step keeps the current waypoint.
pub fn patrol_step(body: &mut Body, speed: f32, ctx: &BehaviorContext<'_>) -> Step {
    let Some(target) = body.patrol.target() else {
        return Step::Idle;
    };
    let step = move_toward(body, target, speed, ctx);
    if step == Step::Arrived {
        body.patrol.advance();
    }
    step
}

pub fn chase_toward(body: &mut Body, target: Vec2, ctx: &BehaviorContext<'_>) -> Step {
    let speed = body.pursuit_speed();
    move_toward(body, target, speed, ctx)
}

/// Player within sight range with an unobstructed line.
pub fn sees_player(body: &Body, ctx: &BehaviorContext<'_>) -> bool {
    if body.sight_range <= 0.0 {
        return false;
    }
    let from = body.center();
    let to = ctx.player_center();
    from.distance(to) <= body.sight_range && line_of_sight(from, to, ctx.solids)
}

/// Position of this tick's player noise, if it carries to the body.
pub fn hears_noise(body: &Body, ctx: &BehaviorContext<'_>) -> Option<Vec2> {
    let noise = ctx.noise?;
    if body.hearing_range <= 0.0 {
        return None;
    }
    (body.center().distance(noise.position) <= body.hearing_range * noise.reach)
        .then_some(noise.position)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::EscapeConfig;
    use gloam_core::Aabb;

    #[test]
    fn three_point_route_bounces() {
        let mut p = Patrol::new(vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)]);
        let mut seen = vec![p.index];
        for _ in 0..6 {
            p.advance();
            seen.push(p.index);
        }
        assert_eq!(seen, vec![0, 1, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn single_waypoint_stays_put() {
        let mut p = Patrol::new(vec![Vec2::new(5.0, 5.0)]);
        p.advance();
        assert_eq!(p.index, 0);
    }

    #[test]
    fn blocked_patrol_keeps_waypoint() {
        let cfg = EscapeConfig::default();
        let wall = [Aabb::new(40.0, 0.0, 10.0, 100.0)];
        let c = ctx(&cfg, Aabb::new(900.0, 900.0, 10.0, 10.0), &wall);
        let mut body = body_at(10.0, 10.0);
        body.patrol = Patrol::new(vec![Vec2::new(200.0, 20.0)]);
        for _ in 0..100 {
            patrol_step(&mut body, 60.0, &c);
        }
        assert_eq!(body.patrol.index, 0);
        assert!(body.rect.right() <= 40.0);
        assert!(!wall[0].overlaps(&body.rect));
    }

    #[test]
    fn sight_needs_range_and_clear_line() {
        let cfg = EscapeConfig::default();
        let mut body = body_at(0.0, 0.0);
        body.sight_range = 150.0;
        let player = Aabb::new(100.0, 0.0, 20.0, 20.0);
        assert!(sees_player(&body, &ctx(&cfg, player, &[])));
        let wall = [Aabb::new(50.0, -50.0, 5.0, 200.0)];
        assert!(!sees_player(&body, &ctx(&cfg, player, &wall)));
        let far = Aabb::new(400.0, 0.0, 20.0, 20.0);
        assert!(!sees_player(&body, &ctx(&cfg, far, &[])));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn two_point_patrol_oscillates_without_drift(
                a in (50.0f32..450.0, 50.0f32..450.0),
                b in (500.0f32..700.0, 50.0f32..450.0),
                speed in 100.0f32..300.0,
            ) {
                let cfg = EscapeConfig::default();
                let c = ctx(&cfg, Aabb::new(950.0, 950.0, 10.0, 10.0), &[]);
                let a = Vec2::new(a.0, a.1);
                let b = Vec2::new(b.0, b.1);
                let mut body = body_at(0.0, 0.0);
                body.rect = body.rect.with_position(a - body.rect.size().half());
                body.patrol = Patrol::new(vec![a, b]);

                let mut arrivals: Vec<(usize, Aabb)> = Vec::new();
                for _ in 0..6000 {
                    let index = body.patrol.index;
                    let step = patrol_step(&mut body, speed, &c);
                    prop_assert_ne!(step, Step::Blocked);
                    if step == Step::Arrived {
                        arrivals.push((index, body.rect));
                    }
                }
                prop_assert!(arrivals.len() >= 8);
                for (i, (index, rect)) in arrivals.iter().enumerate() {
                    prop_assert_eq!(*index, i % 2);
                    prop_assert_eq!(*rect, arrivals[i % 2].1);
                }
            }
        }
    }
}
