#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement sources that translate player intent into world commands.
//!
//! Two interchangeable sources exist: discrete button presses and a live
//! position feed. A [`MovementController`] keeps exactly one of them active and
//! falls back to buttons whenever the feed fails.

use std::collections::VecDeque;

use geotoken_core::{CellIndex, Command, Direction, GridGeometry, LatLng};
use log::{debug, info, warn};
use thiserror::Error;

/// Failures reported by an external position feed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The user or platform refused access to the position.
    #[error("access to the position feed was denied")]
    PermissionDenied,
    /// The feed could not determine a position.
    #[error("position is currently unavailable")]
    Unavailable,
    /// No position arrived within the feed's deadline.
    #[error("timed out waiting for a position")]
    Timeout,
    /// The feed reported an error outside the known categories.
    #[error("position feed failed: {0}")]
    Other(String),
}

/// Errors surfaced by movement sources.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MovementError {
    /// The underlying position feed failed.
    #[error("position feed failed")]
    Feed(#[from] FeedError),
}

/// Common lifecycle of every movement source.
pub trait MovementSource {
    /// Activates the source. Starting an active source is a no-op.
    fn start(&mut self) -> Result<(), MovementError>;

    /// Deactivates the source. Stopping an inactive source is a no-op.
    fn stop(&mut self);

    /// Reports whether the source currently produces commands.
    fn is_active(&self) -> bool;

    /// Drains pending intent into `out` as [`Command::MovePlayer`] requests.
    fn poll(&mut self, out: &mut Vec<Command>) -> Result<(), MovementError>;
}

/// External collaborator delivering geographic samples.
pub trait PositionFeed {
    /// Begins delivering samples.
    fn subscribe(&mut self) -> Result<(), FeedError>;

    /// Stops delivering samples and releases the underlying subscription.
    fn unsubscribe(&mut self);

    /// Next pending sample, or `None` once the feed has nothing new.
    fn next_sample(&mut self) -> Option<Result<LatLng, FeedError>>;
}

/// Movement driven by discrete direction presses.
#[derive(Debug, Default)]
pub struct ButtonMovement {
    active: bool,
    pending: VecDeque<(i32, i32)>,
}

impl ButtonMovement {
    /// Creates an inactive button source with no pending presses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a single step in `direction`.
    pub fn press(&mut self, direction: Direction) {
        let (delta_row, delta_col) = direction.delta();
        self.push_delta(delta_row, delta_col);
    }

    /// Queues an arbitrary cell offset. Ignored while the source is inactive.
    pub fn push_delta(&mut self, delta_row: i32, delta_col: i32) {
        if !self.active {
            debug!("ignoring button movement ({delta_row},{delta_col}) while inactive");
            return;
        }
        self.pending.push_back((delta_row, delta_col));
    }

    /// Number of queued steps.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl MovementSource for ButtonMovement {
    fn start(&mut self) -> Result<(), MovementError> {
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
        self.pending.clear();
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn poll(&mut self, out: &mut Vec<Command>) -> Result<(), MovementError> {
        out.extend(
            self.pending
                .drain(..)
                .filter(|delta| *delta != (0, 0))
                .map(|(delta_row, delta_col)| Command::MovePlayer {
                    delta_row,
                    delta_col,
                }),
        );
        Ok(())
    }
}

/// Movement driven by a live [`PositionFeed`].
///
/// Samples are snapped to cells. The first sample after starting only sets the
/// reference cell; each later sample landing in a different cell emits the
/// offset from the previous one.
#[derive(Debug)]
pub struct FeedMovement<F> {
    feed: F,
    geometry: GridGeometry,
    active: bool,
    reference: Option<CellIndex>,
}

impl<F: PositionFeed> FeedMovement<F> {
    /// Wraps `feed`, snapping its samples with `geometry`.
    #[must_use]
    pub fn new(feed: F, geometry: GridGeometry) -> Self {
        Self {
            feed,
            geometry,
            active: false,
            reference: None,
        }
    }

    /// Cell of the most recent accepted sample.
    #[must_use]
    pub fn reference(&self) -> Option<CellIndex> {
        self.reference
    }

    /// Shared access to the wrapped feed.
    #[must_use]
    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Exclusive access to the wrapped feed.
    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }
}

impl<F: PositionFeed> MovementSource for FeedMovement<F> {
    fn start(&mut self) -> Result<(), MovementError> {
        if self.active {
            return Ok(());
        }
        self.feed.subscribe()?;
        self.active = true;
        self.reference = None;
        Ok(())
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.feed.unsubscribe();
        self.active = false;
        self.reference = None;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn poll(&mut self, out: &mut Vec<Command>) -> Result<(), MovementError> {
        if !self.active {
            return Ok(());
        }
        while let Some(sample) = self.feed.next_sample() {
            let position = sample?;
            if !position.lat.is_finite() || !position.lng.is_finite() {
                warn!("discarding non-finite position sample {position:?}");
                continue;
            }
            let cell = self.geometry.cell_at(position);
            match self.reference {
                None => self.reference = Some(cell),
                Some(previous) if previous != cell => {
                    out.push(Command::MovePlayer {
                        delta_row: cell.row().saturating_sub(previous.row()),
                        delta_col: cell.col().saturating_sub(previous.col()),
                    });
                    self.reference = Some(cell);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Which movement source currently drives the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MovementMode {
    /// Discrete button presses.
    #[default]
    Buttons,
    /// Live position feed.
    Feed,
}

/// Owns both movement sources and keeps exactly one active.
#[derive(Debug)]
pub struct MovementController<F> {
    buttons: ButtonMovement,
    feed: FeedMovement<F>,
    mode: MovementMode,
}

impl<F: PositionFeed> MovementController<F> {
    /// Creates a controller with buttons active.
    #[must_use]
    pub fn new(feed: F, geometry: GridGeometry) -> Self {
        let mut buttons = ButtonMovement::new();
        buttons.active = true;
        Self {
            buttons,
            feed: FeedMovement::new(feed, geometry),
            mode: MovementMode::Buttons,
        }
    }

    /// Currently active mode.
    #[must_use]
    pub fn mode(&self) -> MovementMode {
        self.mode
    }

    /// Stops the active source and starts the one for `mode`.
    ///
    /// When the feed cannot start, buttons become active again and the error
    /// is returned.
    pub fn switch_to(&mut self, mode: MovementMode) -> Result<(), MovementError> {
        self.buttons.stop();
        self.feed.stop();
        match mode {
            MovementMode::Buttons => self.use_buttons(),
            MovementMode::Feed => match self.feed.start() {
                Ok(()) => {
                    info!("movement switched to position feed");
                    self.mode = MovementMode::Feed;
                }
                Err(error) => {
                    warn!("position feed unavailable, staying on buttons: {error}");
                    self.use_buttons();
                    return Err(error);
                }
            },
        }
        Ok(())
    }

    /// Flips between buttons and the feed.
    pub fn toggle(&mut self) -> Result<(), MovementError> {
        match self.mode {
            MovementMode::Buttons => self.switch_to(MovementMode::Feed),
            MovementMode::Feed => self.switch_to(MovementMode::Buttons),
        }
    }

    /// Queues a button step. Ignored unless buttons are active.
    pub fn press(&mut self, direction: Direction) {
        self.buttons.press(direction);
    }

    /// Queues an arbitrary button offset. Ignored unless buttons are active.
    pub fn push_delta(&mut self, delta_row: i32, delta_col: i32) {
        self.buttons.push_delta(delta_row, delta_col);
    }

    /// Exclusive access to the wrapped feed.
    pub fn feed_mut(&mut self) -> &mut F {
        self.feed.feed_mut()
    }

    /// Drains the active source into `out`.
    ///
    /// A failing feed is stopped and buttons take over before the error is
    /// returned. Commands produced before the failure are kept.
    pub fn poll(&mut self, out: &mut Vec<Command>) -> Result<(), MovementError> {
        match self.mode {
            MovementMode::Buttons => self.buttons.poll(out),
            MovementMode::Feed => {
                let result = self.feed.poll(out);
                if let Err(error) = &result {
                    warn!("position feed failed, falling back to buttons: {error}");
                    self.feed.stop();
                    self.use_buttons();
                }
                result
            }
        }
    }

    fn use_buttons(&mut self) {
        self.buttons.active = true;
        self.mode = MovementMode::Buttons;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_buttons_drop_presses() {
        let mut buttons = ButtonMovement::new();
        buttons.press(Direction::North);
        assert_eq!(buttons.pending(), 0);

        buttons.start().expect("buttons always start");
        buttons.press(Direction::North);
        buttons.push_delta(0, 0);
        buttons.press(Direction::West);

        let mut out = Vec::new();
        buttons.poll(&mut out).expect("buttons never fail");
        assert_eq!(
            out,
            vec![
                Command::MovePlayer {
                    delta_row: 1,
                    delta_col: 0
                },
                Command::MovePlayer {
                    delta_row: 0,
                    delta_col: -1
                },
            ]
        );
    }

    #[test]
    fn stopping_buttons_discards_pending_presses() {
        let mut buttons = ButtonMovement::new();
        buttons.start().expect("buttons always start");
        buttons.press(Direction::South);
        buttons.stop();
        buttons.stop();
        assert!(!buttons.is_active());
        assert_eq!(buttons.pending(), 0);
    }
}
