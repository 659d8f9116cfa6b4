//! Ambient lighting: six labelled levers combine into four lit regions.

use serde::{Deserialize, Serialize};

use gloam_core::{Aabb, Vec2};

use crate::world::{Switch, SwitchKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    /// Region of `point` relative to the center of `bounds`. Points on a
    /// dividing line belong to the east/south side.
    pub fn of(point: Vec2, bounds: &Aabb) -> Self {
        let c = bounds.center();
        match (point.x < c.x, point.y < c.y) {
            (true, true) => Quadrant::NorthWest,
            (false, true) => Quadrant::NorthEast,
            (true, false) => Quadrant::SouthWest,
            (false, false) => Quadrant::SouthEast,
        }
    }
}

/// Lever states A..F.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeverBank {
    pub a: bool,
    pub b: bool,
    pub c: bool,
    pub d: bool,
    pub e: bool,
    pub f: bool,
}

impl LeverBank {
    pub fn from_switches(switches: &[Switch]) -> Self {
        let mut bank = Self::default();
        for s in switches.iter().filter(|s| s.kind == SwitchKind::Lever) {
            let slot = match s.label {
                Some('A') => &mut bank.a,
                Some('B') => &mut bank.b,
                Some('C') => &mut bank.c,
                Some('D') => &mut bank.d,
                Some('E') => &mut bank.e,
                Some('F') => &mut bank.f,
                _ => continue,
            };
            *slot = s.pressed;
        }
        bank
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub north_west: bool,
    pub north_east: bool,
    pub south_west: bool,
    pub south_east: bool,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self::fully_lit()
    }
}

impl AmbientLight {
    /// Levels without the lighting puzzle are lit everywhere.
    pub fn fully_lit() -> Self {
        Self {
            north_west: true,
            north_east: true,
            south_west: true,
            south_east: true,
        }
    }

    pub fn from_levers(l: LeverBank) -> Self {
        Self {
            north_west: l.a ^ l.b,
            north_east: l.c && l.d,
            south_west: l.e && !l.f,
            south_east: (l.a && l.f) || (l.b && l.e),
        }
    }

    pub fn is_lit(&self, quadrant: Quadrant) -> bool {
        match quadrant {
            Quadrant::NorthWest => self.north_west,
            Quadrant::NorthEast => self.north_east,
            Quadrant::SouthWest => self.south_west,
            Quadrant::SouthEast => self.south_east,
        }
    }

    pub fn is_lit_at(&self, point: Vec2, bounds: &Aabb) -> bool {
        self.is_lit(Quadrant::of(point, bounds))
    }
}
