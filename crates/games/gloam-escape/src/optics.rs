//! Light beams traced through rotatable mirrors.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use gloam_core::geometry::{ray_rect, reflect, segment_rect};
use gloam_core::{Aabb, Vec2};

use crate::events::SimEvent;

/// Maximum beam segments; a beam therefore has 2..=11 points.
pub const MAX_SEGMENTS: usize = 10;

/// Mirror hits closer than this to the previous bounce are ignored.
const MIN_TRAVEL: f32 = 1e-3;

pub type BeamPoints = SmallVec<[Vec2; MAX_SEGMENTS + 1]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mirror {
    pub id: u32,
    pub rect: Aabb,
    /// Surface angle in degrees; the reflecting normal is this plus 90.
    pub rotation: f32,
    #[serde(default)]
    pub reflecting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub id: u32,
    pub position: Vec2,
    /// Emission direction in degrees, clockwise from +x.
    pub rotation: f32,
    #[serde(default = "default_on")]
    pub on: bool,
}

fn default_on() -> bool {
    true
}

/// Crystal that lights up when a beam reaches it. Absorbs the beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: u32,
    pub rect: Aabb,
    #[serde(default)]
    pub activated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightBeam {
    pub source: u32,
    pub points: BeamPoints,
}

/// Optics layout of a level plus the beams traced on the last tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Optics {
    #[serde(default)]
    pub sources: Vec<LightSource>,
    #[serde(default)]
    pub mirrors: Vec<Mirror>,
    #[serde(default)]
    pub sensors: Vec<Sensor>,
    #[serde(default)]
    pub beams: Vec<LightBeam>,
    #[serde(default)]
    pub solved: bool,
}

impl Optics {
    pub fn all_sensors_lit(&self) -> bool {
        !self.sensors.is_empty() && self.sensors.iter().all(|s| s.activated)
    }

    /// Retrace every beam and refresh hit flags. Returns sensor activations
    /// and the solved edge.
    pub fn update(&mut self, walls: &[Aabb], bounds: &Aabb) -> SmallVec<[SimEvent; 2]> {
        let mut events = SmallVec::new();
        if self.sources.is_empty() {
            return events;
        }

        self.beams = self
            .sources
            .iter()
            .filter(|s| s.on)
            .map(|s| LightBeam {
                source: s.id,
                points: calculate_light_beam(
                    s.position,
                    s.rotation,
                    &self.mirrors,
                    &self.sensors,
                    walls,
                    bounds,
                ),
            })
            .collect();

        let crosses = |rect: &Aabb, beams: &[LightBeam]| {
            beams.iter().any(|b| {
                b.points
                    .windows(2)
                    .any(|w| segment_rect(w[0], w[1], rect).is_some())
            })
        };

        for mirror in &mut self.mirrors {
            mirror.reflecting = crosses(&mirror.rect, &self.beams);
        }
        for sensor in &mut self.sensors {
            let lit = crosses(&sensor.rect, &self.beams);
            if lit && !sensor.activated {
                events.push(SimEvent::SensorActivated { id: sensor.id });
            }
            sensor.activated = lit;
        }

        let solved = self.all_sensors_lit();
        if solved && !self.solved {
            tracing::debug!(sensors = self.sensors.len(), "Optics solved");
            events.push(SimEvent::OpticsSolved);
        }
        self.solved = solved;
        events
    }

    pub fn rotate_mirror(&mut self, id: u32, step_deg: f32) -> bool {
        match self.mirrors.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.rotation = (m.rotation + step_deg).rem_euclid(360.0);
                true
            },
            None => false,
        }
    }

    pub fn rotate_source(&mut self, id: u32, step_deg: f32) -> bool {
        match self.sources.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.rotation = (s.rotation + step_deg).rem_euclid(360.0);
                true
            },
            None => false,
        }
    }
}

enum Stop {
    Mirror(usize),
    Absorb,
}

/// Trace one beam. Walls and sensors stop it, mirrors bounce it, and a beam
/// that hits nothing runs to the edge of `bounds`.
pub fn calculate_light_beam(
    origin: Vec2,
    rotation_deg: f32,
    mirrors: &[Mirror],
    sensors: &[Sensor],
    walls: &[Aabb],
    bounds: &Aabb,
) -> BeamPoints {
    let mut points = BeamPoints::new();
    points.push(origin);
    let mut dir = Vec2::from_degrees(rotation_deg);
    if !origin.is_finite() || !dir.is_finite() || dir.is_zero() {
        points.push(origin);
        return points;
    }

    let mut pos = origin;
    let mut last_mirror: Option<usize> = None;

    for _ in 0..MAX_SEGMENTS {
        let mut nearest: Option<(f32, Vec2, Stop)> = None;
        let mut consider = |t: f32, point: Vec2, stop: Stop| {
            if nearest.as_ref().is_none_or(|(best, _, _)| t < *best) {
                nearest = Some((t, point, stop));
            }
        };

        for (i, m) in mirrors.iter().enumerate() {
            if Some(i) == last_mirror {
                continue;
            }
            if let Some(hit) = ray_rect(pos, dir, &m.rect)
                && hit.t > MIN_TRAVEL
            {
                consider(hit.t, hit.point, Stop::Mirror(i));
            }
        }
        for rect in walls.iter().chain(sensors.iter().map(|s| &s.rect)) {
            if let Some(hit) = ray_rect(pos, dir, rect) {
                consider(hit.t, hit.point, Stop::Absorb);
            }
        }

        match nearest {
            Some((_, point, Stop::Mirror(i))) => {
                points.push(point);
                dir = reflect(dir, mirrors[i].rotation);
                pos = point;
                last_mirror = Some(i);
            },
            Some((_, point, Stop::Absorb)) => {
                points.push(point);
                return points;
            },
            None => {
                points.push(edge_point(pos, dir, bounds));
                return points;
            },
        }
    }
    points
}

/// Where a ray starting inside `bounds` leaves it.
fn edge_point(pos: Vec2, dir: Vec2, bounds: &Aabb) -> Vec2 {
    let axis_t = |p: f32, d: f32, lo: f32, hi: f32| {
        if d > 0.0 {
            (hi - p) / d
        } else if d < 0.0 {
            (lo - p) / d
        } else {
            f32::INFINITY
        }
    };
    let tx = axis_t(pos.x, dir.x, bounds.x, bounds.right());
    let ty = axis_t(pos.y, dir.y, bounds.y, bounds.bottom());
    let t = tx.min(ty).max(0.0);
    if t.is_finite() { pos + dir * t } else { pos }
}
