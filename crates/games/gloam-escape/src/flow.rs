//! Rotating-pipe connectivity puzzle and its fill animation.
//!
//! Flow starts at the center of the start tile, runs out of its single
//! connector, and then crosses each tile in two legs (entry edge to center,
//! center to exit edge). A leg that ends on an edge the neighbor does not
//! accept blocks the flow there.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use gloam_core::Vec2;

use crate::events::SimEvent;

pub type Cell = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    /// Exit preference order when a tile has several open sides.
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    fn index(self) -> usize {
        match self {
            Side::North => 0,
            Side::East => 1,
            Side::South => 2,
            Side::West => 3,
        }
    }

    pub fn opposite(self) -> Side {
        Side::ALL[(self.index() + 2) % 4]
    }

    fn step(self, (col, row): Cell, cols: usize, rows: usize) -> Option<Cell> {
        match self {
            Side::North => row.checked_sub(1).map(|r| (col, r)),
            Side::South => (row + 1 < rows).then_some((col, row + 1)),
            Side::West => col.checked_sub(1).map(|c| (c, row)),
            Side::East => (col + 1 < cols).then_some((col + 1, row)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Empty,
    Straight,
    Corner,
    Tee,
    Cross,
    Start,
    End,
}

impl TileKind {
    /// Open sides at rotation 0, indexed N, E, S, W.
    fn base_connectors(self) -> [bool; 4] {
        match self {
            TileKind::Empty => [false; 4],
            TileKind::Straight => [true, false, true, false],
            TileKind::Corner => [true, true, false, false],
            TileKind::Tee => [true, true, true, false],
            TileKind::Cross => [true; 4],
            TileKind::Start | TileKind::End => [true, false, false, false],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270.
    #[serde(default)]
    pub rotation: u16,
    #[serde(default)]
    pub locked: bool,
}

impl Tile {
    pub fn new(kind: TileKind, rotation: u16) -> Self {
        Self {
            kind,
            rotation: rotation % 360,
            locked: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TileKind::Start | TileKind::End)
    }

    pub fn opens(&self, side: Side) -> bool {
        let turns = usize::from(self.rotation / 90) % 4;
        self.kind.base_connectors()[(side.index() + 4 - turns) % 4]
    }

    /// Rotate by `step` quarter turns (negative is counter-clockwise).
    pub fn rotate(&mut self, step: i32) {
        let quarter = i32::from(self.rotation / 90);
        let next = (quarter + step).rem_euclid(4);
        self.rotation = u16::try_from(next * 90).unwrap_or(0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    #[default]
    Idle,
    EntryToCenter,
    CenterToExit,
    Emptying,
}

/// Animation state of the fill, read by renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub phase: FlowPhase,
    /// Tiles reached so far, start first. The last one is the active tile.
    pub path: Vec<Cell>,
    pub entry: Option<Side>,
    pub exit: Option<Side>,
    /// Progress through the current leg, in [0, 1].
    pub progress: f32,
    /// Tile the flow halted on, if it hit a bad boundary.
    pub blocked: Option<Cell>,
    pub solved: bool,
    /// Legs still filled while emptying.
    pub remaining_legs: f32,
    legs_done: u32,
}

impl FlowState {
    pub fn active_tile(&self) -> Option<Cell> {
        self.path.last().copied()
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            FlowPhase::EntryToCenter | FlowPhase::CenterToExit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPuzzle {
    /// World position of the grid's top-left corner.
    pub origin: Vec2,
    pub tile_size: f32,
    pub cols: usize,
    pub rows: usize,
    /// Row-major.
    pub tiles: Vec<Tile>,
    pub start: Cell,
    pub end: Cell,
    #[serde(default)]
    pub state: FlowState,
}

impl FlowPuzzle {
    pub fn tile(&self, (col, row): Cell) -> Option<&Tile> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.tiles.get(row * self.cols + col)
    }

    fn tile_mut(&mut self, (col, row): Cell) -> Option<&mut Tile> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.tiles.get_mut(row * self.cols + col)
    }

    pub fn tile_center(&self, (col, row): Cell) -> Vec2 {
        self.origin
            + Vec2::new(
                (col as f32 + 0.5) * self.tile_size,
                (row as f32 + 0.5) * self.tile_size,
            )
    }

    pub fn is_solved(&self) -> bool {
        self.state.solved
    }

    /// Player rotation: refused while the flow is moving or emptying, on
    /// the start and end tiles, and on locked tiles.
    pub fn rotate_tile(&mut self, cell: Cell, step: i32) -> bool {
        if self.state.phase != FlowPhase::Idle || step == 0 {
            return false;
        }
        self.force_rotate(cell, step)
    }

    /// Rotation that ignores the flow phase but still respects locks.
    pub fn force_rotate(&mut self, cell: Cell, step: i32) -> bool {
        match self.tile_mut(cell) {
            Some(tile) if !tile.locked && !tile.is_terminal() => {
                tile.rotate(step);
                true
            },
            _ => false,
        }
    }

    /// Nearest rotatable tile whose center lies within `max_distance`.
    pub fn nearest_rotatable(&self, point: Vec2, max_distance: f32) -> Option<Cell> {
        let mut best: Option<(Cell, f32)> = None;
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = (col, row);
                let Some(tile) = self.tile(cell) else {
                    continue;
                };
                if tile.locked || tile.is_terminal() {
                    continue;
                }
                let d = self.tile_center(cell).distance(point);
                if d <= max_distance && best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((cell, d));
                }
            }
        }
        best.map(|(cell, _)| cell)
    }

    /// Begin filling from the start tile. Only from a clean, idle grid.
    pub fn start(&mut self) -> bool {
        if self.state.phase != FlowPhase::Idle || !self.state.path.is_empty() {
            return false;
        }
        let start = self.start;
        let Some(exit) = self
            .tile(start)
            .and_then(|t| Side::ALL.into_iter().find(|s| t.opens(*s)))
        else {
            return false;
        };
        if let Some(tile) = self.tile_mut(start) {
            tile.locked = true;
        }
        self.state = FlowState {
            phase: FlowPhase::CenterToExit,
            path: vec![start],
            exit: Some(exit),
            ..Default::default()
        };
        true
    }

    /// Begin retracting whatever has been filled.
    pub fn reset(&mut self) -> bool {
        if self.state.phase == FlowPhase::Emptying || self.state.path.is_empty() {
            return false;
        }
        let partial = if self.state.is_running() {
            self.state.progress
        } else {
            0.0
        };
        self.state.remaining_legs = self.state.legs_done as f32 + partial;
        self.state.phase = FlowPhase::Emptying;
        self.state.blocked = None;
        self.state.solved = false;
        true
    }

    /// Advance the animation. Returns the terminal event reached this tick.
    pub fn advance(&mut self, delta_ms: f32, leg_ms: f32) -> Option<SimEvent> {
        let step = delta_ms / leg_ms.max(1.0);
        match self.state.phase {
            FlowPhase::Idle => None,
            FlowPhase::Emptying => self.advance_emptying(step),
            FlowPhase::EntryToCenter | FlowPhase::CenterToExit => {
                self.state.progress += step;
                while self.state.progress >= 1.0 {
                    self.state.progress -= 1.0;
                    self.state.legs_done += 1;
                    if let Some(event) = self.finish_leg() {
                        return Some(event);
                    }
                }
                None
            },
        }
    }

    fn finish_leg(&mut self) -> Option<SimEvent> {
        let current = self.state.active_tile()?;
        match self.state.phase {
            FlowPhase::EntryToCenter => {
                if current == self.end {
                    return Some(self.halt_solved());
                }
                let entry = self.state.entry;
                let tile = *self.tile(current)?;
                let open: SmallVec<[Side; 4]> = Side::ALL
                    .into_iter()
                    .filter(|s| Some(*s) != entry && tile.opens(*s))
                    .collect();
                let exit = open
                    .iter()
                    .copied()
                    .find(|s| self.accepts(current, *s))
                    .or_else(|| open.first().copied());
                match exit {
                    Some(exit) => {
                        self.state.exit = Some(exit);
                        self.state.phase = FlowPhase::CenterToExit;
                        None
                    },
                    None => Some(self.halt_blocked(current)),
                }
            },
            FlowPhase::CenterToExit => {
                let exit = self.state.exit?;
                if !self.accepts(current, exit) {
                    return Some(self.halt_blocked(current));
                }
                let next = exit.step(current, self.cols, self.rows)?;
                if let Some(tile) = self.tile_mut(next) {
                    tile.locked = true;
                }
                self.state.path.push(next);
                self.state.entry = Some(exit.opposite());
                self.state.exit = None;
                self.state.phase = FlowPhase::EntryToCenter;
                None
            },
            FlowPhase::Idle | FlowPhase::Emptying => None,
        }
    }

    /// Whether flow leaving `from` through `side` can enter the neighbor.
    fn accepts(&self, from: Cell, side: Side) -> bool {
        let Some(next) = side.step(from, self.cols, self.rows) else {
            return false;
        };
        if self.state.path.contains(&next) {
            return false;
        }
        self.tile(next).is_some_and(|t| t.opens(side.opposite()))
    }

    fn halt_blocked(&mut self, cell: Cell) -> SimEvent {
        self.state.phase = FlowPhase::Idle;
        self.state.progress = 1.0;
        self.state.blocked = Some(cell);
        tracing::debug!(col = cell.0, row = cell.1, "Flow blocked");
        SimEvent::FlowBlocked {
            col: cell.0,
            row: cell.1,
        }
    }

    fn halt_solved(&mut self) -> SimEvent {
        self.state.phase = FlowPhase::Idle;
        self.state.progress = 1.0;
        self.state.solved = true;
        tracing::debug!(tiles = self.state.path.len(), "Flow solved");
        SimEvent::FlowSolved
    }

    fn advance_emptying(&mut self, step: f32) -> Option<SimEvent> {
        self.state.remaining_legs -= step;
        // The start tile owns one leg, every later tile two.
        while self.state.path.len() > 1
            && (1 + 2 * (self.state.path.len() - 2)) as f32 >= self.state.remaining_legs
        {
            self.state.path.pop();
        }
        self.state.progress = self.state.remaining_legs.fract().max(0.0);
        if self.state.remaining_legs > 0.0 {
            return None;
        }
        for tile in &mut self.tiles {
            tile.locked = false;
        }
        self.state = FlowState::default();
        tracing::debug!("Flow emptied");
        Some(SimEvent::FlowEmptied)
    }

    /// Grid-shape problems, if any.
    pub fn shape_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.tiles.len() != self.cols * self.rows {
            errors.push(format!(
                "flow grid is {}x{} but has {} tiles",
                self.cols,
                self.rows,
                self.tiles.len()
            ));
        }
        if self.tile_size <= 0.0 || !self.tile_size.is_finite() {
            errors.push("flow tile_size must be positive".to_string());
        }
        for (name, cell, kind) in [
            ("start", self.start, TileKind::Start),
            ("end", self.end, TileKind::End),
        ] {
            match self.tile(cell) {
                None => errors.push(format!("flow {name} {cell:?} is outside the grid")),
                Some(t) if t.kind != kind => {
                    errors.push(format!("flow {name} {cell:?} is a {:?} tile", t.kind));
                },
                Some(_) => {},
            }
        }
        for (i, tile) in self.tiles.iter().enumerate() {
            if tile.rotation % 90 != 0 || tile.rotation >= 360 {
                errors.push(format!(
                    "flow tile {i} has rotation {}, expected 0, 90, 180 or 270",
                    tile.rotation
                ));
            }
        }
        errors
    }
}
