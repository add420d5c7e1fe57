//! Toroidal grid arithmetic for the Snakepit workspace.
//!
//! The playing field is a square torus: both axes wrap, every cell has four
//! neighbours, and distances are measured along the shorter arc of each axis.
//! Everything here is pure arithmetic so the simulation core and any host
//! front-end agree on geometry to the last cell.

use serde::{Deserialize, Serialize};

/// Maps an arbitrary signed coordinate onto `0..size`.
///
/// Handles offsets well outside a single circumference (`-1` and `size` are
/// the common cases, but any `i32` works). A zero `size` has no valid cells,
/// so it degenerates to `0` rather than dividing by zero.
#[must_use]
pub fn wrap(coord: i32, size: u16) -> u16 {
    if size == 0 {
        return 0;
    }
    let size = i32::from(size);
    let wrapped = ((coord % size) + size) % size;
    wrapped as u16
}

/// Shortest signed displacement from `a` to `b` along one wrapped axis.
///
/// The result is the arc with the smaller magnitude; adding it to `a` (mod
/// `size`) lands on `b`. At the exact half-circumference tie the direct
/// difference `b - a` wins over the wrapped complement, which keeps the
/// function antisymmetric: `wrap_delta(a, b, s) == -wrap_delta(b, a, s)`.
#[must_use]
pub fn wrap_delta(a: u16, b: u16, size: u16) -> i32 {
    if size == 0 {
        return 0;
    }
    let size = i32::from(size);
    let raw = i32::from(b) - i32::from(a);
    let alt = if raw > 0 { raw - size } else { raw + size };
    if raw.abs() <= alt.abs() { raw } else { alt }
}

/// Manhattan distance on the torus: per-axis shortest arcs, summed.
#[must_use]
pub fn torus_manhattan(a: Cell, b: Cell, size: u16) -> u32 {
    wrap_delta(a.x, b.x, size).unsigned_abs() + wrap_delta(a.y, b.y, size).unsigned_abs()
}

/// One of the four cardinal headings, in screen orientation (`y` grows
/// downward, so [`Direction::Up`] decrements `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All headings in the fixed clockwise scan order starting at `Up`.
    /// Decision logic iterates this array, so the order is part of the
    /// deterministic contract and must not change.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// The 180-degree reversal of this heading.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// Unit offset `(dx, dy)` for this heading.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

/// A single grid cell. Coordinates are only meaningful together with the
/// world size they were wrapped against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: u16,
    pub y: u16,
}

impl Cell {
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Re-wraps both coordinates against `size`, normalizing cells built from
    /// untrusted input.
    #[must_use]
    pub fn wrapped(self, size: u16) -> Self {
        Self {
            x: wrap(i32::from(self.x), size),
            y: wrap(i32::from(self.y), size),
        }
    }

    /// The neighbouring cell one step along `direction`, wrapping at the
    /// edges.
    #[must_use]
    pub fn step(self, direction: Direction, size: u16) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: wrap(i32::from(self.x) + dx, size),
            y: wrap(i32::from(self.y) + dy, size),
        }
    }
}
