//! Mechanism identifiers and grid primitives

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cell count used when a mechanism declares no grid override (5 reels × 3 rows)
pub const DEFAULT_GRID_CELLS: usize = 15;

/// Mechanism kind: the closed set of built-ins plus an open extension id
///
/// Serialized as its string id (`"holdRespin"`, `"collection"`, ...), so any
/// unknown id round-trips as [`MechanismKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MechanismKind {
    /// Lock symbols, respin the rest, reset on new locks
    HoldRespin,
    /// Progressive reel/cell locking from a trigger symbol
    LockSequence,
    /// Fixed-length spin sequence with per-spin rules
    MultiSpin,
    /// Value accumulation paid at the end or by a collector
    Collection,
    /// Per-step board modifiers
    Modifier,
    /// Symbol upgrade chains
    Transformation,
    /// Game-specific mechanism registered at runtime
    Custom(String),
}

impl MechanismKind {
    /// The six built-in kinds, in registration order
    pub const BUILTINS: [MechanismKind; 6] = [
        MechanismKind::HoldRespin,
        MechanismKind::LockSequence,
        MechanismKind::MultiSpin,
        MechanismKind::Collection,
        MechanismKind::Modifier,
        MechanismKind::Transformation,
    ];

    /// Create a kind from its string id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        match id.as_str() {
            "holdRespin" => Self::HoldRespin,
            "lockSequence" => Self::LockSequence,
            "multiSpin" => Self::MultiSpin,
            "collection" => Self::Collection,
            "modifier" => Self::Modifier,
            "transformation" => Self::Transformation,
            _ => Self::Custom(id),
        }
    }

    /// Get the string id
    pub fn as_str(&self) -> &str {
        match self {
            Self::HoldRespin => "holdRespin",
            Self::LockSequence => "lockSequence",
            Self::MultiSpin => "multiSpin",
            Self::Collection => "collection",
            Self::Modifier => "modifier",
            Self::Transformation => "transformation",
            Self::Custom(id) => id,
        }
    }

    /// Is this one of the six built-in kinds?
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<&str> for MechanismKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MechanismKind {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<MechanismKind> for String {
    fn from(kind: MechanismKind) -> Self {
        match kind {
            MechanismKind::Custom(id) => id,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grid cell, addressed by row and column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Map key in `"row,col"` form
    pub fn key(&self) -> String {
        format!("{},{}", self.row, self.col)
    }

    /// Parse a `"row,col"` key
    pub fn from_key(key: &str) -> Option<Self> {
        let (row, col) = key.split_once(',')?;
        Some(Self {
            row: row.trim().parse().ok()?,
            col: col.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Grid dimensions (rows × columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Total number of cells
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    /// Does the position fall inside the grid?
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Every position, row-major
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Position::new(row, col)))
    }
}

impl Default for GridSize {
    /// Standard 3 rows × 5 reels
    fn default() -> Self {
        Self { rows: 3, cols: 5 }
    }
}
