#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for geotoken.
//!
//! The [`World`] owns the player and the sparse overlay of modified cells.
//! Every mutation flows through [`apply`]; read access goes through [`query`].

mod baseline;
mod overlay;

pub use baseline::{BaselineGenerator, SeededLuck};
pub use overlay::OverlayStore;

use geotoken_core::{
    CellIndex, Command, ConfigError, Event, GameConfig, GridGeometry, LatLng, Luck, TokenValue,
    WorldSnapshot,
};
use geotoken_system_interaction::{resolve, InteractionRules, Transition};
use log::{debug, info, warn};

/// Represents the authoritative state of a single play session.
#[derive(Debug)]
pub struct World {
    config: GameConfig,
    geometry: GridGeometry,
    rules: InteractionRules,
    overlay: OverlayStore,
    player: Player,
}

#[derive(Clone, Copy, Debug)]
struct Player {
    position: LatLng,
    held: Option<TokenValue>,
}

impl Player {
    fn at_anchor(config: &GameConfig) -> Self {
        Self {
            position: config.anchor,
            held: None,
        }
    }
}

impl World {
    /// Creates a fresh world whose baseline is drawn from [`SeededLuck`].
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_luck(config, Box::new(SeededLuck))
    }

    /// Creates a fresh world whose baseline is drawn from the provided luck source.
    pub fn with_luck(config: GameConfig, luck: Box<dyn Luck>) -> Result<Self, ConfigError> {
        config.validate()?;
        let geometry = config.geometry()?;
        let rules = InteractionRules::from_config(&config);
        let overlay = OverlayStore::new(BaselineGenerator::new(&config, luck));
        let player = Player::at_anchor(&config);
        Ok(Self {
            config,
            geometry,
            rules,
            overlay,
            player,
        })
    }

    fn player_cell(&self) -> CellIndex {
        self.geometry.cell_at(self.player.position)
    }

    fn relocate(&mut self, position: LatLng, out_events: &mut Vec<Event>) {
        let from = self.player_cell();
        self.player.position = position;
        let to = self.player_cell();
        debug!("player moved from {from} to {to}");
        out_events.push(Event::PlayerMoved { from, to, position });
    }

    fn interact(&mut self, target: CellIndex, out_events: &mut Vec<Event>) {
        let player = self.player_cell();
        let current = self.overlay.get(target);
        let resolution = match resolve(&self.rules, player, target, self.player.held, current) {
            Ok(resolution) => resolution,
            Err(reason) => {
                debug!("interaction with {target} rejected: {reason}");
                out_events.push(Event::InteractionRejected {
                    cell: target,
                    reason,
                });
                return;
            }
        };

        self.overlay.set(target, resolution.cell);
        self.player.held = resolution.held;

        let event = match resolution.transition {
            Transition::Pickup { value } => Event::TokenPickedUp {
                cell: target,
                value,
            },
            Transition::Drop { value } => Event::TokenDropped {
                cell: target,
                value,
            },
            Transition::Merge { value } => Event::TokensMerged {
                cell: target,
                value,
            },
        };
        debug!("interaction with {target} committed: {event:?}");
        out_events.push(event);

        if let Some(value) = resolution.win {
            info!("win threshold reached with token {value}");
            out_events.push(Event::WinReached { value });
        }
    }

    fn reset(&mut self) {
        self.overlay.clear();
        self.player = Player::at_anchor(&self.config);
    }

    fn restore(&mut self, snapshot: WorldSnapshot) {
        self.overlay.clear();
        for (cell, value) in snapshot.modified_cells {
            self.overlay.set(cell, value);
        }
        self.player = Player {
            position: snapshot.player.position,
            held: snapshot.player.held,
        };
    }
}

/// Applies the provided command to the world, mutating state atomically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer {
            delta_row,
            delta_col,
        } => {
            if delta_row == 0 && delta_col == 0 {
                return;
            }
            let destination = world.player_cell().offset(delta_row, delta_col);
            let position = world.geometry.center_of(destination);
            world.relocate(position, out_events);
        }
        Command::SetPlayerPosition { position } => {
            if !position.lat.is_finite() || !position.lng.is_finite() {
                warn!("ignoring non-finite player position {position:?}");
                return;
            }
            world.relocate(position, out_events);
        }
        Command::Interact { target } => world.interact(target, out_events),
        Command::NewGame => {
            world.reset();
            info!("new game started at {:?}", world.player.position);
            out_events.push(Event::GameReset);
        }
        Command::Restore { snapshot } => {
            world.restore(snapshot);
            info!(
                "restored player at {:?} with {} modified cells",
                world.player.position,
                world.overlay.len()
            );
            out_events.push(Event::StateRestored);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use geotoken_core::{
        CellIndex, GameConfig, GridGeometry, LatLng, PlayerSnapshot, TokenValue, WorldSnapshot,
    };

    use super::World;

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &GameConfig {
        &world.config
    }

    /// Grid geometry used to map positions onto cells.
    #[must_use]
    pub fn geometry(world: &World) -> GridGeometry {
        world.geometry
    }

    /// Exact player position.
    #[must_use]
    pub fn player_position(world: &World) -> LatLng {
        world.player.position
    }

    /// Cell containing the player's current position.
    #[must_use]
    pub fn player_cell(world: &World) -> CellIndex {
        world.player_cell()
    }

    /// Token held by the player, if any.
    #[must_use]
    pub fn held_token(world: &World) -> Option<TokenValue> {
        world.player.held
    }

    /// Current value of a cell, resolving modifications before the baseline.
    #[must_use]
    pub fn cell_value(world: &World, cell: CellIndex) -> Option<TokenValue> {
        world.overlay.get(cell)
    }

    /// Value the cell had before any modification.
    #[must_use]
    pub fn baseline_value(world: &World, cell: CellIndex) -> Option<TokenValue> {
        world.overlay.baseline(cell)
    }

    /// Reports whether the cell diverges from its baseline.
    #[must_use]
    pub fn is_modified(world: &World, cell: CellIndex) -> bool {
        world.overlay.contains(cell)
    }

    /// Number of cells that diverge from their baseline.
    #[must_use]
    pub fn modified_count(world: &World) -> usize {
        world.overlay.len()
    }

    /// Captures the player and every modified cell, sorted by cell.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        let mut modified_cells: Vec<_> = world.overlay.entries().collect();
        modified_cells.sort_by_key(|(cell, _)| *cell);
        WorldSnapshot {
            player: PlayerSnapshot {
                position: world.player.position,
                held: world.player.held,
            },
            modified_cells,
        }
    }
}
