//! Collision resolution against static geometry.
//!
//! The player slides: movement resolves X then Y, zeroing velocity on a
//! blocked axis. Adversaries do not: a move that would overlap anything is
//! rejected whole. The boss has its own reflection path in `adversary::boss`.

use gloam_core::{Aabb, Vec2};

/// Result of axis-separated resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub position: Vec2,
    pub velocity: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

/// Resolve a move from `prev` (assumed clear) to `next_position`, X first,
/// then Y. A blocked axis snaps flush against the nearest solid (or stays put
/// if snapping would still overlap) and zeroes that velocity component.
pub fn resolve_axis_separated(
    prev: &Aabb,
    next_position: Vec2,
    velocity: Vec2,
    solids: &[Aabb],
) -> Resolved {
    let mut velocity = velocity;

    let (x, blocked_x) = resolve_axis(prev, next_position.x, true, solids);
    if blocked_x {
        velocity.x = 0.0;
    }
    let after_x = prev.with_position(Vec2::new(x, prev.y));

    let (y, blocked_y) = resolve_axis(&after_x, next_position.y, false, solids);
    if blocked_y {
        velocity.y = 0.0;
    }

    Resolved {
        position: Vec2::new(x, y),
        velocity,
        blocked_x,
        blocked_y,
    }
}

fn resolve_axis(from: &Aabb, target: f32, horizontal: bool, solids: &[Aabb]) -> (f32, bool) {
    let start = if horizontal { from.x } else { from.y };
    if !target.is_finite() {
        return (start, false);
    }
    let candidate = if horizontal {
        from.with_position(Vec2::new(target, from.y))
    } else {
        from.with_position(Vec2::new(from.x, target))
    };

    let moving_forward = target > start;
    let mut snapped: Option<f32> = None;
    for solid in solids.iter().filter(|s| s.overlaps(&candidate)) {
        let flush = match (horizontal, moving_forward) {
            (true, true) => solid.x - from.width,
            (true, false) => solid.right(),
            (false, true) => solid.y - from.height,
            (false, false) => solid.bottom(),
        };
        snapped = Some(match snapped {
            None => flush,
            Some(s) if moving_forward => s.min(flush),
            Some(s) => s.max(flush),
        });
    }

    let Some(flush) = snapped else {
        return (target, false);
    };

    // Never move backwards past the start, and never accept a rounding overlap.
    let flush = if moving_forward {
        flush.max(start)
    } else {
        flush.min(start)
    };
    let settled = if horizontal {
        from.with_position(Vec2::new(flush, from.y))
    } else {
        from.with_position(Vec2::new(from.x, flush))
    };
    if solids.iter().any(|s| s.overlaps(&settled)) {
        (start, true)
    } else {
        (flush, true)
    }
}

/// Whether `rect` may occupy its position: inside `bounds` and clear of solids.
pub fn is_clear(rect: &Aabb, solids: &[Aabb], bounds: &Aabb) -> bool {
    bounds.contains(rect) && !solids.iter().any(|s| s.overlaps(rect))
}

/// Hard-reject move used by adversaries: applies `delta` only if the
/// destination is clear. Returns whether the move happened.
pub fn try_move(rect: &mut Aabb, delta: Vec2, solids: &[Aabb], bounds: &Aabb) -> bool {
    if !delta.is_finite() {
        return false;
    }
    let next = rect.translated(delta);
    if is_clear(&next, solids, bounds) {
        *rect = next;
        true
    } else {
        false
    }
}

/// Whether the straight segment between two points crosses no solid.
pub fn line_of_sight(from: Vec2, to: Vec2, solids: &[Aabb]) -> bool {
    !solids
        .iter()
        .any(|s| gloam_core::geometry::segment_rect(from, to, s).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_axis_snaps_flush_and_zeroes_velocity() {
        let wall = Aabb::new(50.0, 0.0, 10.0, 100.0);
        let player = Aabb::new(20.0, 40.0, 24.0, 24.0);
        let r = resolve_axis_separated(
            &player,
            Vec2::new(35.0, 45.0),
            Vec2::new(300.0, 100.0),
            &[wall],
        );
        assert!(r.blocked_x);
        assert!(!r.blocked_y);
        assert_eq!(r.position, Vec2::new(26.0, 45.0));
        assert_eq!(r.velocity, Vec2::new(0.0, 100.0));
    }

    #[test]
    fn slides_along_wall_on_free_axis() {
        let floor = Aabb::new(0.0, 100.0, 200.0, 10.0);
        let player = Aabb::new(20.0, 70.0, 24.0, 24.0);
        let r = resolve_axis_separated(
            &player,
            Vec2::new(30.0, 90.0),
            Vec2::new(50.0, 50.0),
            &[floor],
        );
        assert_eq!(r.position, Vec2::new(30.0, 76.0));
        assert!(r.blocked_y);
    }

    #[test]
    fn try_move_rejects_instead_of_sliding() {
        let wall = Aabb::new(50.0, 0.0, 10.0, 100.0);
        let bounds = Aabb::new(0.0, 0.0, 500.0, 500.0);
        let mut rect = Aabb::new(20.0, 40.0, 24.0, 24.0);
        assert!(!try_move(&mut rect, Vec2::new(10.0, 10.0), &[wall], &bounds));
        assert_eq!(rect.position(), Vec2::new(20.0, 40.0));
        assert!(try_move(&mut rect, Vec2::new(0.0, 10.0), &[wall], &bounds));
        assert_eq!(rect.position(), Vec2::new(20.0, 50.0));
    }

    #[test]
    fn walls_block_sight() {
        let wall = Aabb::new(50.0, 0.0, 10.0, 100.0);
        assert!(!line_of_sight(Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0), &[wall]));
        assert!(line_of_sight(Vec2::new(0.0, 150.0), Vec2::new(100.0, 150.0), &[wall]));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolved_box_never_overlaps_solids(
                walls in proptest::collection::vec(
                    (0.0f32..400.0, 0.0f32..400.0, 4.0f32..80.0, 4.0f32..80.0),
                    1..8,
                ),
                steps in proptest::collection::vec((-40.0f32..40.0, -40.0f32..40.0), 1..60),
            ) {
                let solids: Vec<Aabb> = walls
                    .iter()
                    .map(|&(x, y, w, h)| Aabb::new(x, y, w, h))
                    .filter(|s| !s.overlaps(&Aabb::new(200.0, 200.0, 24.0, 24.0)))
                    .collect();
                let mut player = Aabb::new(200.0, 200.0, 24.0, 24.0);
                for &(dx, dy) in &steps {
                    let r = resolve_axis_separated(
                        &player,
                        player.position() + Vec2::new(dx, dy),
                        Vec2::new(dx, dy),
                        &solids,
                    );
                    player = player.with_position(r.position);
                    for s in &solids {
                        prop_assert!(!s.overlaps(&player), "player {player:?} overlaps {s:?}");
                    }
                }
            }
        }
    }
}
