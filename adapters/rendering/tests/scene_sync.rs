use geotoken_core::{
    CellIndex, Command, GameConfig, GeoBounds, LatLng, TokenValue, VisualCommand,
};
use geotoken_rendering::{MemorySurface, RenderingError, SceneSync};
use geotoken_system_viewport::{Config, Viewport};
use geotoken_world::{self as world, query, World};

fn bounds(world: &World, cell: CellIndex) -> GeoBounds {
    let geometry = query::geometry(world);
    let size = geometry.cell_size_degrees();
    GeoBounds::centered(geometry.center_of(cell), 2.4 * size, 2.4 * size)
}

fn sync_view(
    viewport: &mut Viewport,
    scene: &mut SceneSync<MemorySurface>,
    world: &World,
    cell: CellIndex,
) {
    let mut out = Vec::new();
    viewport.reconcile(
        bounds(world, cell),
        &query::geometry(world),
        |cell| query::cell_value(world, cell),
        &mut out,
    );
    scene.apply(&out).expect("viewport emits a consistent stream");
}

#[test]
fn surface_mirrors_the_viewport() {
    let world = World::new(GameConfig::default()).expect("default config is valid");
    let origin = query::player_cell(&world);
    let mut viewport = Viewport::new(Config::new(1));
    let mut scene = SceneSync::new(MemorySurface::new());

    sync_view(&mut viewport, &mut scene, &world, origin);

    assert_eq!(scene.border_count(), viewport.visible_count());
    let span = viewport.needed().expect("span after reconcile");
    let filled = span
        .iter()
        .filter(|cell| query::cell_value(&world, *cell).is_some())
        .count();
    assert_eq!(scene.marker_count(), filled);
    for cell in span {
        assert!(scene.surface().has_border(cell));
        assert_eq!(
            scene.surface().marker_label(cell),
            query::cell_value(&world, cell).map(|_| "1")
        );
    }

    sync_view(&mut viewport, &mut scene, &world, origin.offset(40, 40));
    assert_eq!(scene.border_count(), 49);
    assert_eq!(scene.surface().primitives().count(), 49 + scene.marker_count());
}

#[test]
fn merges_update_labels_in_place() {
    let mut world = World::new(GameConfig::default()).expect("default config is valid");
    let origin = query::player_cell(&world);
    let mut viewport = Viewport::new(Config::new(0));
    let mut scene = SceneSync::new(MemorySurface::new());

    let snapshot = geotoken_core::WorldSnapshot {
        player: geotoken_core::PlayerSnapshot {
            position: query::player_position(&world),
            held: Some(TokenValue::new(2)),
        },
        modified_cells: vec![(origin.offset(1, 0), Some(TokenValue::new(2)))],
    };
    let mut events = Vec::new();
    world::apply(&mut world, Command::Restore { snapshot }, &mut events);
    sync_view(&mut viewport, &mut scene, &world, origin);
    assert_eq!(scene.surface().marker_label(origin.offset(1, 0)), Some("2"));

    let primitives_before = scene.surface().primitives().count();
    events.clear();
    world::apply(
        &mut world,
        Command::Interact {
            target: origin.offset(1, 0),
        },
        &mut events,
    );
    let mut out = Vec::new();
    viewport.handle(
        &events,
        &query::geometry(&world),
        |cell| query::cell_value(&world, cell),
        &mut out,
    );
    scene.apply(&out).expect("consistent stream");

    assert_eq!(scene.surface().marker_label(origin.offset(1, 0)), Some("4"));
    assert_eq!(scene.surface().primitives().count(), primitives_before);
}

#[test]
fn clicks_outside_spawned_cells_are_dropped() {
    let world = World::new(GameConfig::default()).expect("default config is valid");
    let origin = query::player_cell(&world);
    let mut viewport = Viewport::new(Config::new(0));
    let mut scene = SceneSync::new(MemorySurface::new());
    sync_view(&mut viewport, &mut scene, &world, origin);

    scene.surface_mut().click(origin.offset(1, 1));
    scene.surface_mut().click(origin.offset(50, 0));
    scene.surface_mut().click(origin);

    assert_eq!(scene.take_clicks(), vec![origin.offset(1, 1), origin]);
    assert!(scene.take_clicks().is_empty());
}

#[test]
fn inconsistent_streams_are_rejected() {
    let cell = CellIndex::new(3, 4);
    let mut scene = SceneSync::new(MemorySurface::new());

    let error = scene
        .apply(&[VisualCommand::UpdateToken {
            cell,
            value: TokenValue::new(2),
        }])
        .expect_err("cell was never spawned");
    assert_eq!(
        error.downcast_ref::<RenderingError>(),
        Some(&RenderingError::NotSpawned { cell })
    );

    let spawn = VisualCommand::SpawnCell {
        cell,
        bounds: GeoBounds::new(0.0, 0.0, 1.0, 1.0),
    };
    scene.apply(&[spawn]).expect("first spawn succeeds");
    let error = scene.apply(&[spawn]).expect_err("second spawn fails");
    assert_eq!(
        error.downcast_ref::<RenderingError>(),
        Some(&RenderingError::AlreadySpawned { cell })
    );

    let error = scene
        .apply(&[VisualCommand::HideToken { cell }])
        .expect_err("no marker to hide");
    assert_eq!(
        error.downcast_ref::<RenderingError>(),
        Some(&RenderingError::MarkerMissing { cell })
    );

    scene
        .apply(&[
            VisualCommand::ShowToken {
                cell,
                anchor: LatLng::new(0.5, 0.5),
                value: TokenValue::new(1),
            },
            VisualCommand::DespawnCell { cell },
        ])
        .expect("show then despawn succeeds");
    assert_eq!(scene.surface().primitives().count(), 0);
}
