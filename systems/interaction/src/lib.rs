#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pickup, drop and merge rules gated by the interaction radius.
//!
//! [`resolve`] is the transition table consulted by the world when it applies
//! an interaction command. [`Interaction`] is the pure system that turns map
//! clicks into those commands and distils world events into feedback for
//! adapters.

use geotoken_core::{CellIndex, Command, Event, GameConfig, InteractionError, TokenValue};

/// Limits applied to every interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionRules {
    radius: u32,
    win_value: TokenValue,
}

impl InteractionRules {
    /// Creates rules with an explicit radius and winning value.
    #[must_use]
    pub const fn new(radius: u32, win_value: TokenValue) -> Self {
        Self { radius, win_value }
    }

    /// Derives the rules from a session configuration.
    #[must_use]
    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.interaction_radius, config.win_value)
    }

    /// Reports whether the target is close enough to the player to interact.
    #[must_use]
    pub const fn in_reach(&self, player: CellIndex, target: CellIndex) -> bool {
        player.chebyshev_distance(target) <= self.radius
    }
}

impl Default for InteractionRules {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

/// Successful state change selected by [`resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The player took the token out of the cell.
    Pickup {
        /// Value moved into the player's hand.
        value: TokenValue,
    },
    /// The player placed the held token into the empty cell.
    Drop {
        /// Value moved into the cell.
        value: TokenValue,
    },
    /// Two equal tokens combined inside the cell.
    Merge {
        /// Doubled value left in the cell.
        value: TokenValue,
    },
}

/// State the world must commit after a successful interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Transition that was selected.
    pub transition: Transition,
    /// Token the player holds afterwards.
    pub held: Option<TokenValue>,
    /// Value the target cell holds afterwards.
    pub cell: Option<TokenValue>,
    /// Set when a drop or merge reached the winning value.
    pub win: Option<TokenValue>,
}

/// Selects the transition for a click on `target`.
///
/// The distance check runs first, so an out-of-range click is reported as
/// such even when the values would also be incompatible.
pub fn resolve(
    rules: &InteractionRules,
    player: CellIndex,
    target: CellIndex,
    held: Option<TokenValue>,
    cell: Option<TokenValue>,
) -> Result<Resolution, InteractionError> {
    if !rules.in_reach(player, target) {
        return Err(InteractionError::OutOfRange {
            distance: player.chebyshev_distance(target),
            radius: rules.radius,
        });
    }

    let transition = match (held, cell) {
        (None, Some(value)) => Transition::Pickup { value },
        (Some(value), None) => Transition::Drop { value },
        (Some(held), Some(cell)) if held == cell => Transition::Merge {
            value: held.doubled(),
        },
        (Some(held), Some(cell)) => return Err(InteractionError::Incompatible { held, cell }),
        (None, None) => return Err(InteractionError::NothingToDo),
    };

    let (held, cell) = match transition {
        Transition::Pickup { value } => (Some(value), None),
        Transition::Drop { value } | Transition::Merge { value } => (None, Some(value)),
    };

    let win = match transition {
        Transition::Pickup { .. } => None,
        Transition::Drop { .. } | Transition::Merge { .. } => {
            let best = held.max(cell);
            best.filter(|value| *value >= rules.win_value)
        }
    };

    Ok(Resolution {
        transition,
        held,
        cell,
        win,
    })
}

/// Latest outcome worth surfacing to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionFeedback {
    /// A token moved into the player's hand.
    PickedUp {
        /// Cell that was emptied.
        cell: CellIndex,
        /// Value now held.
        value: TokenValue,
    },
    /// The held token was placed into a cell.
    Dropped {
        /// Cell that received the token.
        cell: CellIndex,
        /// Value placed.
        value: TokenValue,
    },
    /// Two tokens merged.
    Merged {
        /// Cell that holds the result.
        cell: CellIndex,
        /// Resulting value.
        value: TokenValue,
    },
    /// The world refused the request.
    Rejected {
        /// Cell the request targeted.
        cell: CellIndex,
        /// Reason reported by the world.
        reason: InteractionError,
    },
}

/// Pure system routing map clicks into interaction commands.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
    feedback: Option<InteractionFeedback>,
    best_win: Option<TokenValue>,
    wins: u32,
}

impl Interaction {
    /// Creates a system with no recorded feedback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes world events and clicked cells, emitting one command per click.
    pub fn handle(&mut self, events: &[Event], clicks: &[CellIndex], out: &mut Vec<Command>) {
        for event in events {
            match *event {
                Event::TokenPickedUp { cell, value } => {
                    self.feedback = Some(InteractionFeedback::PickedUp { cell, value });
                }
                Event::TokenDropped { cell, value } => {
                    self.feedback = Some(InteractionFeedback::Dropped { cell, value });
                }
                Event::TokensMerged { cell, value } => {
                    self.feedback = Some(InteractionFeedback::Merged { cell, value });
                }
                Event::InteractionRejected { cell, reason } => {
                    self.feedback = Some(InteractionFeedback::Rejected { cell, reason });
                }
                Event::WinReached { value } => {
                    self.wins = self.wins.saturating_add(1);
                    self.best_win = self.best_win.max(Some(value));
                }
                Event::GameReset => {
                    self.feedback = None;
                    self.best_win = None;
                    self.wins = 0;
                }
                _ => {}
            }
        }

        out.extend(
            clicks
                .iter()
                .map(|target| Command::Interact { target: *target }),
        );
    }

    /// Most recent interaction outcome, if any.
    #[must_use]
    pub fn feedback(&self) -> Option<InteractionFeedback> {
        self.feedback
    }

    /// Number of win notifications observed since the last reset.
    #[must_use]
    pub fn wins(&self) -> u32 {
        self.wins
    }

    /// Highest value that triggered a win since the last reset.
    #[must_use]
    pub fn best_win(&self) -> Option<TokenValue> {
        self.best_win
    }
}
