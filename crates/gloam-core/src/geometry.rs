//! Geometry/collision kernel: vectors, rectangles, ray casts, reflection.
//!
//! Screen convention: x grows right, y grows down, rectangles are anchored
//! at their top-left corner.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Direction components smaller than this are treated as zero.
pub const DIRECTION_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `degrees` (0 = +x, 90 = +y/down).
    pub fn from_degrees(degrees: f32) -> Self {
        let rad = degrees.to_radians();
        Self::new(rad.cos(), rad.sin())
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for (near) zero-length input.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len.is_finite() && len > DIRECTION_EPSILON {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    pub fn is_zero(self) -> bool {
        self.x.abs() <= DIRECTION_EPSILON && self.y.abs() <= DIRECTION_EPSILON
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Rotate counter-clockwise on screen (clockwise in y-down math) by `degrees`.
    pub fn rotated(self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn half(self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Axis-aligned bounding box anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Aabb {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_position(position: Vec2, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    /// Box of `size` centered on `center`.
    pub fn centered(center: Vec2, size: Size) -> Self {
        Self::from_position(center - size.half(), size)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    pub fn with_position(&self, position: Vec2) -> Self {
        Self::new(position.x, position.y, self.width, self.height)
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// True when `inner` lies entirely within `self` (shared edges allowed).
    pub fn contains(&self, inner: &Aabb) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        aabb_overlap(self, other)
    }

    /// Move this box (keeping its size) so it lies inside `bounds`.
    pub fn clamped_inside(&self, bounds: &Aabb) -> Self {
        let max_x = (bounds.right() - self.width).max(bounds.x);
        let max_y = (bounds.bottom() - self.height).max(bounds.y);
        Self::new(
            self.x.clamp(bounds.x, max_x),
            self.y.clamp(bounds.y, max_y),
            self.width,
            self.height,
        )
    }

    /// Unit normal of the face of `obstacle` that `self` penetrates the least.
    /// Points away from `obstacle`, toward `self`.
    pub fn contact_normal(&self, obstacle: &Aabb) -> Vec2 {
        let push_left = self.right() - obstacle.x;
        let push_right = obstacle.right() - self.x;
        let push_up = self.bottom() - obstacle.y;
        let push_down = obstacle.bottom() - self.y;
        let min_x = push_left.min(push_right);
        let min_y = push_up.min(push_down);
        if min_x < min_y {
            if push_left < push_right {
                Vec2::new(-1.0, 0.0)
            } else {
                Vec2::new(1.0, 0.0)
            }
        } else if push_up < push_down {
            Vec2::new(0.0, -1.0)
        } else {
            Vec2::new(0.0, 1.0)
        }
    }
}

/// Strict rectangle overlap. Boxes that only share an edge do not overlap.
pub fn aabb_overlap(a: &Aabb, b: &Aabb) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Where a ray or segment enters a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Parametric distance along the direction vector.
    pub t: f32,
    pub point: Vec2,
    /// Outward normal of the entered face.
    pub normal: Vec2,
}

/// Slab test shared by [`ray_rect`] and [`segment_rect`]. Returns the
/// entry parameter clamped to `t_min` and the face normal.
fn slab(origin: Vec2, dir: Vec2, rect: &Aabb, t_min: f32, t_max: f32) -> Option<(f32, Vec2)> {
    if !origin.is_finite() || !dir.is_finite() || dir.is_zero() {
        return None;
    }

    let mut near = f32::NEG_INFINITY;
    let mut far = f32::INFINITY;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let (o, d, lo, hi) = if axis == 0 {
            (origin.x, dir.x, rect.x, rect.right())
        } else {
            (origin.y, dir.y, rect.y, rect.bottom())
        };

        if d.abs() <= DIRECTION_EPSILON {
            // Parallel to this slab: the ray is either always inside it or never.
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (lo - o) * inv;
        let mut t2 = (hi - o) * inv;
        let mut face = -1.0;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
            face = 1.0;
        }
        if t1 > near {
            near = t1;
            normal = if axis == 0 {
                Vec2::new(face, 0.0)
            } else {
                Vec2::new(0.0, face)
            };
        }
        far = far.min(t2);
        if near > far {
            return None;
        }
    }

    if far < t_min || near > t_max {
        return None;
    }
    let t = near.max(t_min);
    if !t.is_finite() {
        return None;
    }
    Some((t, normal))
}

/// Nearest point at which the ray `origin + t * dir` (t >= 0) meets `rect`.
/// An origin inside the rectangle reports `t = 0`.
pub fn ray_rect(origin: Vec2, dir: Vec2, rect: &Aabb) -> Option<RayHit> {
    slab(origin, dir, rect, 0.0, f32::INFINITY).map(|(t, normal)| RayHit {
        t,
        point: origin + dir * t,
        normal,
    })
}

/// Like [`ray_rect`] but bounded to the segment `start..end` (t in [0, 1]).
pub fn segment_rect(start: Vec2, end: Vec2, rect: &Aabb) -> Option<RayHit> {
    let dir = end - start;
    slab(start, dir, rect, 0.0, 1.0).map(|(t, normal)| RayHit {
        t,
        point: start + dir * t,
        normal,
    })
}

/// Surface normal of a mirror whose reflecting face runs along
/// `rotation_deg`.
pub fn mirror_normal(rotation_deg: f32) -> Vec2 {
    Vec2::from_degrees(rotation_deg + 90.0)
}

/// Mirror `dir` about the plane with unit normal `normal`.
pub fn reflect_about(dir: Vec2, normal: Vec2) -> Vec2 {
    dir - normal * (2.0 * dir.dot(normal))
}

/// Reflect `dir` off a mirror rotated by `mirror_rotation_deg`.
pub fn reflect(dir: Vec2, mirror_rotation_deg: f32) -> Vec2 {
    reflect_about(dir, mirror_normal(mirror_rotation_deg))
}
