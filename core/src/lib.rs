#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the reactive platformer agent.
//!
//! This crate defines the snapshot surface that connects the host engine, the
//! episode-owning agent, and the pure systems. The host supplies an
//! [`Observation`] every tick, systems derive features and jump decisions from
//! that immutable snapshot, and the agent answers with an [`ActionVector`]
//! that the host consumes. Nothing in here mutates engine state.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier reported to the host when it asks for the agent's name.
pub const AGENT_NAME: &str = "myAgent";

/// Closed set of controls understood by the host engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Walk toward decreasing x.
    Left,
    /// Walk toward increasing x.
    Right,
    /// Crouch.
    Down,
    /// Run modifier.
    Speed,
    /// Jump button; holding it longer produces a higher jump.
    Jump,
}

impl Action {
    /// Number of controls in the action vector.
    pub const COUNT: usize = 5;

    /// Every action in host index order.
    pub const ALL: [Action; Action::COUNT] = [
        Action::Left,
        Action::Right,
        Action::Down,
        Action::Speed,
        Action::Jump,
    ];

    /// Slot occupied by the action inside the host's boolean vector.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Speed => 3,
            Self::Jump => 4,
        }
    }

    /// Upper-case label used in logs and CLI output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Down => "DOWN",
            Self::Speed => "SPEED",
            Self::Jump => "JUMP",
        }
    }
}

/// Fixed-size boolean vector handed to the host after every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionVector([bool; Action::COUNT]);

impl ActionVector {
    /// Creates a vector with every control released.
    #[must_use]
    pub const fn released() -> Self {
        Self([false; Action::COUNT])
    }

    /// Reports whether the provided control is pressed.
    #[must_use]
    pub const fn is_pressed(&self, action: Action) -> bool {
        self.0[action.index()]
    }

    /// Presses or releases a single control.
    pub fn set(&mut self, action: Action, pressed: bool) {
        self.0[action.index()] = pressed;
    }

    /// Releases every control without reallocating.
    pub fn clear(&mut self) {
        self.0 = [false; Action::COUNT];
    }

    /// Borrow the raw vector in host index order.
    #[must_use]
    pub const fn as_array(&self) -> &[bool; Action::COUNT] {
        &self.0
    }

    /// Iterator over pressed controls in host index order.
    pub fn pressed(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL
            .into_iter()
            .filter(move |action| self.is_pressed(*action))
    }
}

impl fmt::Display for ActionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        for action in self.pressed() {
            if wrote {
                f.write_str("+")?;
            }
            f.write_str(action.label())?;
            wrote = true;
        }
        if !wrote {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// Horizontal direction the controlled character is heading in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Heading toward decreasing x.
    Left,
    /// Heading toward increasing x. Every episode starts facing right.
    #[default]
    Right,
}

impl Facing {
    /// Signed column step taken when probing the tile ahead.
    #[must_use]
    pub const fn step(self) -> i32 {
        match self {
            Self::Left => -1,
            Self::Right => 1,
        }
    }

    /// Facing that points from the character toward a horizontal offset.
    ///
    /// Offsets of exactly zero keep the default rightward heading.
    #[must_use]
    pub fn toward(offset_x: f32) -> Self {
        if offset_x < 0.0 {
            Self::Left
        } else {
            Self::Right
        }
    }
}

/// Reason the current jump was initiated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JumpCause {
    /// No jump in progress.
    #[default]
    None,
    /// A hostile actor entered the engagement rectangle.
    Threat,
    /// A solid column blocks the tile ahead.
    Wall,
    /// The ground ahead falls away.
    Gap,
    /// A diagonal run of solid tiles rises ahead.
    Stairs,
}

impl JumpCause {
    /// Lower-case label used in logs and CLI output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Threat => "threat",
            Self::Wall => "wall",
            Self::Gap => "gap",
            Self::Stairs => "stairs",
        }
    }
}

/// Location of a tile on the visible screen.
///
/// Coordinates are signed because probes routinely step one tile past the
/// character, which may leave the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    column: i32,
    row: i32,
}

impl TilePos {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Zero-based column, growing to the right.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Zero-based row, growing downward from the top of the screen.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Position shifted by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self {
            column: self.column.saturating_add(columns),
            row: self.row.saturating_add(rows),
        }
    }
}

/// Errors raised while assembling a [`TileGrid`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// A column or row did not match the length of the first one.
    #[error("line {index} holds {found} cells but {expected} were expected")]
    Ragged {
        /// Index of the offending line.
        index: usize,
        /// Length of the first line.
        expected: usize,
        /// Length of the offending line.
        found: usize,
    },
    /// The grid dimensions cannot be addressed with signed tile coordinates.
    #[error("grid of {columns}x{rows} tiles exceeds the addressable range")]
    TooLarge {
        /// Requested column count.
        columns: usize,
        /// Requested row count.
        rows: usize,
    },
}

/// Read-only snapshot of the cell codes visible on screen.
///
/// Cells are stored column-major so `cell(x, y)` mirrors the host's
/// `scene[x][y]` layout. A code of `0` is passable; anything else is solid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    cells: Vec<i32>,
}

impl TileGrid {
    /// Creates a grid of the provided size with every cell set to `code`.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, code: i32) -> Self {
        let len = columns as usize * rows as usize;
        Self {
            columns,
            rows,
            cells: vec![code; len],
        }
    }

    /// Builds a grid from `scene[x][y]` columns as supplied by the host.
    pub fn from_columns(columns: Vec<Vec<i32>>) -> Result<Self, GridError> {
        let rows = columns.first().map_or(0, Vec::len);
        check_dimensions(columns.len(), rows)?;

        let mut cells = Vec::with_capacity(columns.len() * rows);
        for (index, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(GridError::Ragged {
                    index,
                    expected: rows,
                    found: column.len(),
                });
            }
            cells.extend_from_slice(column);
        }

        Ok(Self {
            columns: columns.len() as u32,
            rows: rows as u32,
            cells,
        })
    }

    /// Builds a grid from top-to-bottom rows, the layout used by text fixtures.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self, GridError> {
        let columns = rows.first().map_or(0, Vec::len);
        check_dimensions(columns, rows.len())?;

        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns {
                return Err(GridError::Ragged {
                    index,
                    expected: columns,
                    found: row.len(),
                });
            }
        }

        let mut cells = Vec::with_capacity(columns * rows.len());
        for column in 0..columns {
            cells.extend(rows.iter().map(|row| row[column]));
        }

        Ok(Self {
            columns: columns as u32,
            rows: rows.len() as u32,
            cells,
        })
    }

    /// Number of columns on screen.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows on screen.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Returns the code stored at the provided tile, or `None` off screen.
    #[must_use]
    pub fn cell(&self, pos: TilePos) -> Option<i32> {
        self.index(pos).and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the tile holds a non-zero code.
    ///
    /// Tiles outside the grid read as empty.
    #[must_use]
    pub fn is_solid(&self, pos: TilePos) -> bool {
        self.cell(pos).map_or(false, |code| code != 0)
    }

    /// Overwrites a single cell. Returns `false` when the tile is off screen.
    pub fn set(&mut self, pos: TilePos, code: i32) -> bool {
        match self.index(pos).and_then(|index| self.cells.get_mut(index)) {
            Some(cell) => {
                *cell = code;
                true
            }
            None => false,
        }
    }

    /// Copies the grid back into `scene[x][y]` columns.
    #[must_use]
    pub fn to_columns(&self) -> Vec<Vec<i32>> {
        if self.rows == 0 {
            return vec![Vec::new(); self.columns as usize];
        }
        self.cells
            .chunks(self.rows as usize)
            .map(<[i32]>::to_vec)
            .collect()
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        let column = u32::try_from(pos.column()).ok()?;
        let row = u32::try_from(pos.row()).ok()?;
        if column < self.columns && row < self.rows {
            Some(column as usize * self.rows as usize + row as usize)
        } else {
            None
        }
    }
}

fn check_dimensions(columns: usize, rows: usize) -> Result<(), GridError> {
    let limit = i32::MAX as usize;
    if columns > limit || rows > limit || columns.checked_mul(rows).is_none() {
        return Err(GridError::TooLarge { columns, rows });
    }
    Ok(())
}

/// Hostile actor reported by the host as an `(id, x, y)` triple.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostileActor {
    /// Host-assigned type identifier.
    pub id: i32,
    /// Position in world units.
    pub x: f32,
    /// Position in world units, growing downward.
    pub y: f32,
}

impl HostileActor {
    /// Position of the actor as a vector.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Hostile actors tracked by the host in the order it reported them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostileActors {
    actors: Vec<HostileActor>,
}

impl HostileActors {
    /// Wraps already-decoded actors.
    #[must_use]
    pub fn from_actors(actors: Vec<HostileActor>) -> Self {
        Self { actors }
    }

    /// Decodes the host's flat `[id, x, y, id, x, y, ...]` sequence.
    ///
    /// A trailing partial triple is dropped.
    #[must_use]
    pub fn from_flat(values: &[f32]) -> Self {
        let actors = values
            .chunks_exact(3)
            .map(|triple| HostileActor {
                id: triple[0] as i32,
                x: triple[1],
                y: triple[2],
            })
            .collect();
        Self { actors }
    }

    /// Encodes the actors back into the host's flat layout.
    #[must_use]
    pub fn to_flat(&self) -> Vec<f32> {
        self.actors
            .iter()
            .flat_map(|actor| [actor.id as f32, actor.x, actor.y])
            .collect()
    }

    /// Iterator over the actors in host order.
    pub fn iter(&self) -> impl Iterator<Item = &HostileActor> {
        self.actors.iter()
    }

    /// Number of tracked actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Reports whether no actors are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Axis-aligned rectangle in world units used for proximity queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle centred on `center` extending `half_width` and
    /// `half_height` in each direction.
    #[must_use]
    pub fn centered(center: Vec2, half_width: f32, half_height: f32) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            half_width * 2.0,
            half_height * 2.0,
        )
    }

    /// Left edge.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Top edge.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Horizontal extent.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Vertical extent.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Inclusive containment test on all four edges.
    #[must_use]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && py >= self.y && px <= self.x + self.width && py <= self.y + self.height
    }
}

/// Errors that make an observation unusable for a decision.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ObservationError {
    /// The character position contained NaN or an infinity.
    #[error("character position ({x}, {y}) is not finite")]
    NonFinitePosition {
        /// Reported x coordinate.
        x: f32,
        /// Reported y coordinate.
        y: f32,
    },
}

/// Everything the host reveals to the agent for a single tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    /// Controlled character position in world units.
    pub position: Vec2,
    /// Screen tile occupied by the controlled character.
    pub tile: TilePos,
    /// Hostile actors currently tracked by the host.
    pub hostiles: HostileActors,
    /// Visible tile grid.
    pub grid: TileGrid,
    /// Whether the character touches a supporting surface.
    pub grounded: bool,
}

impl Observation {
    /// Checks the invariants the decision pipeline relies on.
    pub fn validate(&self) -> Result<(), ObservationError> {
        if !self.position.is_finite() {
            return Err(ObservationError::NonFinitePosition {
                x: self.position.x,
                y: self.position.y,
            });
        }
        Ok(())
    }
}
