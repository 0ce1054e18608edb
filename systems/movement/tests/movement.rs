use std::collections::VecDeque;

use geotoken_core::{Command, Direction, GridGeometry, LatLng};
use geotoken_system_movement::{
    FeedError, FeedMovement, MovementController, MovementError, MovementMode, MovementSource,
    PositionFeed,
};

/// Feed replaying a fixed list of samples.
#[derive(Debug, Default)]
struct ScriptedFeed {
    refuse: Option<FeedError>,
    subscribed: bool,
    subscriptions: u32,
    samples: VecDeque<Result<LatLng, FeedError>>,
}

impl ScriptedFeed {
    fn refusing(error: FeedError) -> Self {
        Self {
            refuse: Some(error),
            ..Self::default()
        }
    }

    fn push(&mut self, lat: f64, lng: f64) {
        self.samples.push_back(Ok(LatLng::new(lat, lng)));
    }

    fn fail(&mut self, error: FeedError) {
        self.samples.push_back(Err(error));
    }
}

impl PositionFeed for ScriptedFeed {
    fn subscribe(&mut self) -> Result<(), FeedError> {
        if let Some(error) = self.refuse.clone() {
            return Err(error);
        }
        self.subscribed = true;
        self.subscriptions += 1;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn next_sample(&mut self) -> Option<Result<LatLng, FeedError>> {
        if !self.subscribed {
            return None;
        }
        self.samples.pop_front()
    }
}

fn geometry() -> GridGeometry {
    GridGeometry::new(1.0).expect("positive cell size")
}

fn moves(commands: &[Command]) -> Vec<(i32, i32)> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::MovePlayer {
                delta_row,
                delta_col,
            } => Some((*delta_row, *delta_col)),
            _ => None,
        })
        .collect()
}

#[test]
fn first_sample_only_sets_the_reference() {
    let mut source = FeedMovement::new(ScriptedFeed::default(), geometry());
    source.start().expect("feed subscribes");
    source.feed_mut().push(10.2, 20.7);

    let mut out = Vec::new();
    source.poll(&mut out).expect("feed healthy");

    assert!(out.is_empty());
    assert_eq!(
        source.reference(),
        Some(geometry().cell_at(LatLng::new(10.2, 20.7)))
    );
}

#[test]
fn samples_crossing_cells_emit_offsets() {
    let mut source = FeedMovement::new(ScriptedFeed::default(), geometry());
    source.start().expect("feed subscribes");
    let feed = source.feed_mut();
    feed.push(10.2, 20.2);
    feed.push(10.8, 20.9);
    feed.push(11.1, 20.9);
    feed.push(f64::NAN, 20.0);
    feed.push(9.5, 22.5);

    let mut out = Vec::new();
    source.poll(&mut out).expect("feed healthy");

    assert_eq!(moves(&out), vec![(1, 0), (-2, 2)]);
}

#[test]
fn inactive_feed_emits_nothing() {
    let mut source = FeedMovement::new(ScriptedFeed::default(), geometry());
    source.feed_mut().push(1.0, 1.0);
    let mut out = Vec::new();
    source.poll(&mut out).expect("inactive poll never fails");
    assert!(out.is_empty());
    assert!(!source.is_active());
}

#[test]
fn stop_is_idempotent_and_restart_resets_reference() {
    let mut source = FeedMovement::new(ScriptedFeed::default(), geometry());
    source.start().expect("feed subscribes");
    source.feed_mut().push(0.5, 0.5);
    let mut out = Vec::new();
    source.poll(&mut out).expect("feed healthy");
    assert!(source.reference().is_some());

    source.stop();
    source.stop();
    assert!(!source.is_active());
    assert!(source.reference().is_none());

    source.start().expect("feed subscribes again");
    source.start().expect("second start is a no-op");
    assert_eq!(source.feed().subscriptions, 2);
}

#[test]
fn controller_starts_on_buttons() {
    let mut controller = MovementController::new(ScriptedFeed::default(), geometry());
    assert_eq!(controller.mode(), MovementMode::Buttons);

    controller.press(Direction::East);
    controller.push_delta(3, -2);
    let mut out = Vec::new();
    controller.poll(&mut out).expect("buttons never fail");

    assert_eq!(moves(&out), vec![(0, 1), (3, -2)]);
}

#[test]
fn refused_feed_falls_back_to_buttons() {
    let mut controller =
        MovementController::new(ScriptedFeed::refusing(FeedError::PermissionDenied), geometry());

    let result = controller.switch_to(MovementMode::Feed);

    assert_eq!(
        result,
        Err(MovementError::Feed(FeedError::PermissionDenied))
    );
    assert_eq!(controller.mode(), MovementMode::Buttons);
    controller.press(Direction::North);
    let mut out = Vec::new();
    controller.poll(&mut out).expect("buttons never fail");
    assert_eq!(moves(&out), vec![(1, 0)]);
}

#[test]
fn feed_mode_ignores_button_presses() {
    let mut controller = MovementController::new(ScriptedFeed::default(), geometry());
    controller.press(Direction::North);
    controller
        .switch_to(MovementMode::Feed)
        .expect("feed subscribes");
    controller.press(Direction::South);
    controller.feed_mut().push(0.5, 0.5);
    controller.feed_mut().push(0.5, 1.5);

    let mut out = Vec::new();
    controller.poll(&mut out).expect("feed healthy");

    assert_eq!(controller.mode(), MovementMode::Feed);
    assert_eq!(moves(&out), vec![(0, 1)]);
}

#[test]
fn feed_error_while_polling_reverts_to_buttons() {
    let mut controller = MovementController::new(ScriptedFeed::default(), geometry());
    controller
        .switch_to(MovementMode::Feed)
        .expect("feed subscribes");
    controller.feed_mut().push(0.5, 0.5);
    controller.feed_mut().push(1.5, 0.5);
    controller.feed_mut().fail(FeedError::Timeout);

    let mut out = Vec::new();
    let result = controller.poll(&mut out);

    assert_eq!(result, Err(MovementError::Feed(FeedError::Timeout)));
    assert_eq!(moves(&out), vec![(1, 0)]);
    assert_eq!(controller.mode(), MovementMode::Buttons);
    assert!(!controller.feed_mut().subscribed);
}

#[test]
fn toggle_round_trips_between_modes() {
    let mut controller = MovementController::new(ScriptedFeed::default(), geometry());
    controller.toggle().expect("feed subscribes");
    assert_eq!(controller.mode(), MovementMode::Feed);
    controller.toggle().expect("buttons always start");
    assert_eq!(controller.mode(), MovementMode::Buttons);
    assert!(!controller.feed_mut().subscribed);
}
