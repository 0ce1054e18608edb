#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the geotoken engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to. Systems consume event streams, query immutable snapshots, and
//! respond with new command batches or [`VisualCommand`] batches for the map
//! renderer.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod geometry;

pub use geometry::{CellSpan, CellSpanIter, GeoBounds, GridGeometry, LatLng};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Moves the player by whole cells, landing on the centre of the destination cell.
    MovePlayer {
        /// Rows to travel; positive values move north.
        delta_row: i32,
        /// Columns to travel; positive values move east.
        delta_col: i32,
    },
    /// Places the player at an exact geographic position.
    SetPlayerPosition {
        /// Position reported by the caller.
        position: LatLng,
    },
    /// Requests a pickup, drop or merge against the target cell.
    Interact {
        /// Cell the player clicked.
        target: CellIndex,
    },
    /// Discards every modification and returns the player to the anchor.
    NewGame,
    /// Replaces player state and modified cells with a previously captured snapshot.
    Restore {
        /// Snapshot to restore.
        snapshot: WorldSnapshot,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the player position changed.
    PlayerMoved {
        /// Cell occupied before the move.
        from: CellIndex,
        /// Cell occupied after the move.
        to: CellIndex,
        /// Exact position after the move.
        position: LatLng,
    },
    /// The player took the token out of a cell.
    TokenPickedUp {
        /// Cell that was emptied.
        cell: CellIndex,
        /// Value now held by the player.
        value: TokenValue,
    },
    /// The player placed the held token into an empty cell.
    TokenDropped {
        /// Cell that received the token.
        cell: CellIndex,
        /// Value now stored in the cell.
        value: TokenValue,
    },
    /// The held token merged with an equal token in a cell.
    TokensMerged {
        /// Cell that holds the merged token.
        cell: CellIndex,
        /// Resulting doubled value.
        value: TokenValue,
    },
    /// An interaction request left the state unchanged.
    InteractionRejected {
        /// Cell the request targeted.
        cell: CellIndex,
        /// Reason the request was refused.
        reason: InteractionError,
    },
    /// A drop or merge produced a token at or above the winning value. Play continues.
    WinReached {
        /// Value that met the threshold.
        value: TokenValue,
    },
    /// All modifications were discarded and the player returned to the anchor.
    GameReset,
    /// Player state and modified cells were replaced from a snapshot.
    StateRestored,
}

/// Instructions for the map renderer emitted by the viewport system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VisualCommand {
    /// Create the border rectangle for a cell that entered the view.
    SpawnCell {
        /// Cell that became visible.
        cell: CellIndex,
        /// Geographic bounds of the cell.
        bounds: GeoBounds,
    },
    /// Create a token marker for a visible cell.
    ShowToken {
        /// Cell that holds the token.
        cell: CellIndex,
        /// Position of the marker, the cell centre.
        anchor: LatLng,
        /// Value printed on the marker.
        value: TokenValue,
    },
    /// Relabel the existing marker of a visible cell.
    UpdateToken {
        /// Cell whose marker changes.
        cell: CellIndex,
        /// New value printed on the marker.
        value: TokenValue,
    },
    /// Remove the marker of a visible cell that became empty.
    HideToken {
        /// Cell whose marker is removed.
        cell: CellIndex,
    },
    /// Destroy every primitive belonging to a cell that left the view.
    DespawnCell {
        /// Cell that stopped being visible.
        cell: CellIndex,
    },
}

/// Location of a single cell in the infinite grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    row: i32,
    col: i32,
}

impl CellIndex {
    /// Creates a new cell index.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Row index; grows towards north.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Column index; grows towards east.
    #[must_use]
    pub const fn col(&self) -> i32 {
        self.col
    }

    /// Packed identity used as the key of cell-indexed maps.
    #[must_use]
    pub const fn key(&self) -> CellKey {
        CellKey(((self.row as u32 as u64) << 32) | self.col as u32 as u64)
    }

    /// Recovers the cell from its packed identity.
    #[must_use]
    pub const fn from_key(key: CellKey) -> Self {
        Self {
            row: (key.0 >> 32) as u32 as i32,
            col: key.0 as u32 as i32,
        }
    }

    /// Cell reached by travelling the provided number of rows and columns.
    #[must_use]
    pub const fn offset(&self, delta_row: i32, delta_col: i32) -> Self {
        Self {
            row: self.row.saturating_add(delta_row),
            col: self.col.saturating_add(delta_col),
        }
    }

    /// Chebyshev distance, the number of king moves separating two cells.
    #[must_use]
    pub const fn chebyshev_distance(self, other: CellIndex) -> u32 {
        let rows = self.row.abs_diff(other.row);
        let cols = self.col.abs_diff(other.col);
        if rows > cols {
            rows
        } else {
            cols
        }
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for CellIndex {
    type Err = ParseCellIndexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (row, col) = value
            .split_once(',')
            .ok_or_else(|| ParseCellIndexError::MissingSeparator(value.to_owned()))?;
        let row = row
            .trim()
            .parse::<i32>()
            .map_err(|source| ParseCellIndexError::InvalidComponent {
                value: value.to_owned(),
                source,
            })?;
        let col = col
            .trim()
            .parse::<i32>()
            .map_err(|source| ParseCellIndexError::InvalidComponent {
                value: value.to_owned(),
                source,
            })?;
        Ok(Self::new(row, col))
    }
}

/// Errors produced when parsing the textual `row,col` form of a [`CellIndex`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseCellIndexError {
    /// The text did not contain a comma.
    #[error("cell id '{0}' is missing the ',' separator")]
    MissingSeparator(String),
    /// One of the components was not an integer.
    #[error("cell id '{value}' has a non-integer component")]
    InvalidComponent {
        /// Text that failed to parse.
        value: String,
        /// Underlying integer parse failure.
        #[source]
        source: ParseIntError,
    },
}

/// Packed 64-bit identity of a [`CellIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(u64);

/// Value carried by a token. Tokens only ever merge with equal values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenValue(u64);

impl TokenValue {
    /// Creates a token value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Value produced by merging two tokens of this value.
    #[must_use]
    pub const fn doubled(self) -> Self {
        Self(self.0.saturating_mul(2))
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cardinal directions available to discrete movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards increasing row indices.
    North,
    /// Towards increasing column indices.
    East,
    /// Towards decreasing row indices.
    South,
    /// Towards decreasing column indices.
    West,
}

impl Direction {
    /// Row and column delta of a single step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::East => (0, 1),
            Self::South => (-1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Reasons an interaction request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum InteractionError {
    /// The target lies beyond the interaction radius of the player.
    #[error("cell is {distance} cells away; interaction radius is {radius}")]
    OutOfRange {
        /// Chebyshev distance between the player and the target.
        distance: u32,
        /// Maximum distance allowed.
        radius: u32,
    },
    /// The player holds a token that cannot merge with the one in the cell.
    #[error("held token {held} cannot merge with {cell}")]
    Incompatible {
        /// Value held by the player.
        held: TokenValue,
        /// Value stored in the cell.
        cell: TokenValue,
    },
    /// Neither the player nor the cell holds a token.
    #[error("nothing to do: hand and cell are both empty")]
    NothingToDo,
}

/// Deterministic pseudo-random source keyed by strings.
///
/// Implementations must be pure: the same key yields the same value in
/// `[0, 1)` on every call and in every process.
pub trait Luck: fmt::Debug + Send + Sync {
    /// Draws the value associated with `key`.
    fn luck(&self, key: &str) -> f64;
}

/// Tunable parameters of a game session.
///
/// Every field falls back to its default when absent from a configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Namespace mixed into every luck key.
    pub namespace: String,
    /// Side length of a cell in degrees.
    pub cell_size_degrees: f64,
    /// Probability that a never-modified cell starts with a token.
    pub spawn_probability: f64,
    /// Value of tokens present at the start.
    pub starting_value: TokenValue,
    /// Maximum Chebyshev distance between player and target cell.
    pub interaction_radius: u32,
    /// Token value that triggers a win notification.
    pub win_value: TokenValue,
    /// Position of the player in a fresh game.
    pub anchor: LatLng,
    /// Extra cells kept alive around the visible region.
    pub viewport_padding: u32,
    /// Cells shown on each side of the player by headless adapters.
    pub view_radius: u32,
}

impl GameConfig {
    /// Checks that the configuration describes a playable session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let _ = self.geometry()?;
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::InvalidSpawnProbability {
                spawn_probability: self.spawn_probability,
            });
        }
        if self.starting_value.get() == 0 {
            return Err(ConfigError::ZeroStartingValue);
        }
        if !self.anchor.lat.is_finite() || !self.anchor.lng.is_finite() {
            return Err(ConfigError::InvalidAnchor);
        }
        Ok(())
    }

    /// Grid geometry derived from the configured cell size.
    pub fn geometry(&self) -> Result<GridGeometry, ConfigError> {
        GridGeometry::new(self.cell_size_degrees)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            namespace: "cache".to_owned(),
            cell_size_degrees: GridGeometry::DEFAULT_CELL_SIZE_DEGREES,
            spawn_probability: 0.3,
            starting_value: TokenValue::new(1),
            interaction_radius: 3,
            win_value: TokenValue::new(32),
            anchor: LatLng::new(36.989_493_795_784_01, -122.062_771_285_485_04),
            viewport_padding: 1,
            view_radius: 8,
        }
    }
}

/// Reasons a [`GameConfig`] may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The cell size is zero, negative or not finite.
    #[error("cell size must be a positive finite number of degrees (received {cell_size_degrees})")]
    InvalidCellSize {
        /// Rejected cell size.
        cell_size_degrees: f64,
    },
    /// The spawn probability lies outside `[0, 1]`.
    #[error("spawn probability must lie in [0, 1] (received {spawn_probability})")]
    InvalidSpawnProbability {
        /// Rejected probability.
        spawn_probability: f64,
    },
    /// Starting tokens would carry no value.
    #[error("starting value must be positive")]
    ZeroStartingValue,
    /// The anchor position is not finite.
    #[error("anchor position must be finite")]
    InvalidAnchor,
}

/// Player state captured for persistence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Exact player position.
    pub position: LatLng,
    /// Token currently held, if any.
    pub held: Option<TokenValue>,
}

/// Complete mutable state of a session: the player and every modified cell.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSnapshot {
    /// Player state.
    pub player: PlayerSnapshot,
    /// Cells whose value differs from their baseline, sorted by cell.
    pub modified_cells: Vec<(CellIndex, Option<TokenValue>)>,
}
