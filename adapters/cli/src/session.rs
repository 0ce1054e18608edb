//! Composition root wiring the world, systems and adapters into one session.

use anyhow::{Context, Result};
use geotoken_core::{
    CellIndex, Command, Direction, Event, GameConfig, GeoBounds, LatLng, TokenValue,
};
use geotoken_persistence::{save_code, KeyValueStore, LoadError, Persistence};
use geotoken_rendering::{MapSurface, MemorySurface, SceneSync};
use geotoken_system_interaction::{Interaction, InteractionFeedback};
use geotoken_system_movement::{MovementController, MovementError, MovementMode, PositionFeed};
use geotoken_system_viewport::{self as viewport, Viewport};
use geotoken_world::{self as world, query, World};
use log::{info, warn};

use crate::trace::TraceFeed;

/// A running game: authoritative world plus every system and adapter around it.
#[derive(Debug)]
pub struct Session<S, F, M = MemorySurface> {
    world: World,
    viewport: Viewport,
    scene: SceneSync<M>,
    interaction: Interaction,
    movement: MovementController<F>,
    persistence: Persistence<S>,
    view_radius: u32,
}

impl<S: KeyValueStore, F: PositionFeed> Session<S, F> {
    /// Creates a headless session drawing onto a [`MemorySurface`].
    pub fn start(config: GameConfig, store: S, feed: F) -> Result<Self> {
        Self::with_surface(config, store, feed, MemorySurface::new())
    }

    /// Clicks a cell on the map surface.
    pub fn click(&mut self, cell: CellIndex) {
        self.scene.surface_mut().click(cell);
    }
}

impl<S: KeyValueStore, F: PositionFeed, M: MapSurface> Session<S, F, M> {
    /// Creates a session drawing onto `surface`, restoring the last save when
    /// one is readable.
    ///
    /// A missing or corrupt save is logged and the session starts fresh.
    pub fn with_surface(config: GameConfig, store: S, feed: F, surface: M) -> Result<Self> {
        let view_radius = config.view_radius;
        let padding = config.viewport_padding;
        let mut world = World::new(config).context("failed to create world")?;
        let geometry = query::geometry(&world);
        let persistence = Persistence::new(store);

        let mut events = Vec::new();
        match persistence.load() {
            Ok(snapshot) => world::apply(&mut world, Command::Restore { snapshot }, &mut events),
            Err(LoadError::Missing) => info!("no saved session, starting fresh"),
            Err(error) => warn!("ignoring unreadable save: {:#}", anyhow::Error::new(error)),
        }

        let mut session = Self {
            world,
            viewport: Viewport::new(viewport::Config::new(padding)),
            scene: SceneSync::new(surface),
            interaction: Interaction::new(),
            movement: MovementController::new(feed, geometry),
            persistence,
            view_radius,
        };
        session.reconcile()?;
        Ok(session)
    }

    /// Applies `commands` in order and returns every resulting event.
    ///
    /// Successful transitions and moves are saved before anything is drawn, so
    /// a failing surface never leaves a committed change unsaved. The view then
    /// follows the player.
    pub fn execute(&mut self, commands: Vec<Command>) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }

        let mut ignored = Vec::new();
        self.interaction.handle(&events, &[], &mut ignored);

        if events.iter().any(changes_saved_state) {
            self.persistence
                .save(&self.world)
                .context("failed to save session")?;
        }

        let geometry = query::geometry(&self.world);
        let mut visuals = Vec::new();
        self.viewport.handle(
            &events,
            &geometry,
            |cell| query::cell_value(&self.world, cell),
            &mut visuals,
        );
        self.scene
            .apply(&visuals)
            .context("failed to draw the updated cells")?;

        self.reconcile()?;
        Ok(events)
    }

    /// Queues a single button step.
    pub fn press(&mut self, direction: Direction) {
        self.movement.press(direction);
    }

    /// Queues a button offset of several cells.
    pub fn push_delta(&mut self, delta_row: i32, delta_col: i32) {
        self.movement.push_delta(delta_row, delta_col);
    }

    /// Drains movement input and map clicks into the world.
    ///
    /// A failing position feed is reported after the input gathered so far has
    /// been applied; by then movement has already fallen back to the buttons.
    pub fn pump(&mut self) -> Result<Vec<Event>> {
        let mut commands = Vec::new();
        let polled = self.movement.poll(&mut commands);
        let clicks = self.scene.take_clicks();
        self.interaction.handle(&[], &clicks, &mut commands);
        let events = self.execute(commands)?;
        polled.context("position feed failed, switched back to buttons")?;
        Ok(events)
    }

    /// Switches the movement source.
    pub fn switch_movement(&mut self, mode: MovementMode) -> Result<(), MovementError> {
        self.movement.switch_to(mode)
    }

    /// Starts over: every cell returns to its baseline and the save is erased.
    pub fn new_game(&mut self) -> Result<Vec<Event>> {
        let events = self.execute(vec![Command::NewGame])?;
        self.persistence
            .erase()
            .context("failed to erase saved session")?;
        Ok(events)
    }

    /// Single-line code capturing the current session.
    pub fn export_code(&self) -> Result<String> {
        save_code::encode(&query::snapshot(&self.world)).context("failed to encode session")
    }

    /// Replaces the session with the one captured in `code`.
    pub fn import_code(&mut self, code: &str) -> Result<Vec<Event>> {
        let snapshot = save_code::decode(code).context("failed to decode save code")?;
        self.execute(vec![Command::Restore { snapshot }])
    }

    /// Authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Viewport system state.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Map surface mirror of the viewport.
    #[must_use]
    pub fn scene(&self) -> &SceneSync<M> {
        &self.scene
    }

    /// Persistence adapter.
    #[must_use]
    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    /// Active movement source.
    #[must_use]
    pub fn movement_mode(&self) -> MovementMode {
        self.movement.mode()
    }

    /// Latest interaction outcome.
    #[must_use]
    pub fn feedback(&self) -> Option<InteractionFeedback> {
        self.interaction.feedback()
    }

    /// Highest winning token since the game started.
    #[must_use]
    pub fn best_win(&self) -> Option<TokenValue> {
        self.interaction.best_win()
    }

    /// Cells shown on each side of the player.
    #[must_use]
    pub fn view_radius(&self) -> u32 {
        self.view_radius
    }

    fn view_bounds(&self) -> GeoBounds {
        let geometry = query::geometry(&self.world);
        let center = geometry.center_of(query::player_cell(&self.world));
        let half = (f64::from(self.view_radius) + 0.5) * geometry.cell_size_degrees() * 0.99;
        GeoBounds::centered(center, half, half)
    }

    fn reconcile(&mut self) -> Result<()> {
        let bounds = self.view_bounds();
        let geometry = query::geometry(&self.world);
        let mut visuals = Vec::new();
        self.viewport.reconcile(
            bounds,
            &geometry,
            |cell| query::cell_value(&self.world, cell),
            &mut visuals,
        );
        self.scene.apply(&visuals)
    }
}

impl<S: KeyValueStore, M: MapSurface> Session<S, TraceFeed, M> {
    /// Replays `samples` through the position feed, then returns to buttons.
    ///
    /// The first sample only anchors the trace; later samples move the player
    /// by the cells they cross.
    pub fn replay_trace(&mut self, samples: Vec<LatLng>) -> Result<Vec<Event>> {
        self.movement.feed_mut().queue(samples);
        self.switch_movement(MovementMode::Feed)
            .context("failed to start trace replay")?;
        let events = self.pump();
        self.switch_movement(MovementMode::Buttons)?;
        events
    }
}

fn changes_saved_state(event: &Event) -> bool {
    matches!(
        event,
        Event::PlayerMoved { .. }
            | Event::TokenPickedUp { .. }
            | Event::TokenDropped { .. }
            | Event::TokensMerged { .. }
            | Event::StateRestored
    )
}
