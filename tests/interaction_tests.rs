/// Pixel-accurate picking through real viewports: category masks,
/// visibility rules and the exact sprite footprint.
use glam::{IVec2, IVec3};
use iso_engine::rendering::{BoundBox, PaintSession};
use iso_engine::world::{TileElement, TileElementKind};
use iso_engine::*;

struct Fixture {
    world: World,
    sprites: SpriteStore,
    tree: ImageId,
    guest: ImageId,
}

fn single_tile_fixture() -> Fixture {
    let (sprites, images) = SpriteStore::procedural();
    let mut world = World::new(8);
    world.push_element(IVec2::new(2, 2), TileElement::surface(0, images.grass));
    Fixture {
        world,
        sprites,
        tree: images.tree,
        guest: images.guest,
    }
}

/// Viewport centred on the middle of tile (2, 2)
fn centred_viewport(world: &World, zoom: i8) -> Viewport {
    let mut registry = ViewportRegistry::new();
    let id = registry
        .create(
            ViewportDesc {
                window: WindowId(1),
                main: true,
                pos: IVec2::ZERO,
                size: IVec2::new(200, 200),
                zoom: ZoomLevel::new(zoom),
                rotation: 0,
                focus: Focus::Coordinate(IVec3::new(80, 80, 0)),
            },
            world,
            &RenderSettings::default(),
        )
        .expect("slot");
    registry.remove(id).expect("live")
}

#[test]
fn centre_pixel_of_a_lone_sprite_picks_it() {
    let f = single_tile_fixture();
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);
    let vp = centred_viewport(&f.world, 0);

    // The surface sprite is anchored on the tile centre, view (0, 80)
    let centre = vp.view_to_screen(IVec2::new(0, 80));
    let hit = pick_at(&ctx, &vp, centre, InteractionMask::all()).expect("terrain under the centre pixel");
    assert_eq!(hit.item, InteractionItem::Terrain);
    assert_eq!(hit.map_pos, IVec2::new(64, 64));
    assert_eq!(
        hit.source,
        WorldRef::TileElement {
            tile: IVec2::new(2, 2),
            index: 0
        }
    );

    // The sprite spans view x -32..32 and y 64..96
    for outside in [IVec2::new(-33, 80), IVec2::new(32, 80), IVec2::new(0, 63), IVec2::new(0, 96)] {
        let screen = vp.view_to_screen(outside);
        assert_eq!(pick_at(&ctx, &vp, screen, InteractionMask::all()), None, "view {outside:?}");
    }
}

#[test]
fn transparent_corner_of_the_bounding_box_picks_nothing() {
    let f = single_tile_fixture();
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);
    let vp = centred_viewport(&f.world, 0);

    // Top-left corner of the diamond's bounding box is transparent
    let corner = vp.view_to_screen(IVec2::new(-32, 64));
    assert_eq!(pick_at(&ctx, &vp, corner, InteractionMask::all()), None);
}

#[test]
fn mask_filters_categories() {
    let f = single_tile_fixture();
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);
    let vp = centred_viewport(&f.world, 0);
    let centre = vp.view_to_screen(IVec2::new(0, 80));

    assert!(pick_at(&ctx, &vp, centre, InteractionMask::TERRAIN).is_some());
    assert_eq!(pick_at(&ctx, &vp, centre, InteractionMask::RIDE | InteractionMask::SCENERY), None);
    assert_eq!(pick_at(&ctx, &vp, centre, InteractionMask::empty()), None);
}

#[test]
fn front_object_wins_over_terrain() {
    let mut f = single_tile_fixture();
    f.world.push_element(
        IVec2::new(2, 2),
        TileElement::new(TileElementKind::SmallScenery { vegetation: true }, 0, 40, f.tree),
    );
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);
    let vp = centred_viewport(&f.world, 0);

    // Just above the tree's anchor, inside the trunk
    let screen = vp.view_to_screen(IVec2::new(0, 75));
    let hit = pick_at(&ctx, &vp, screen, InteractionMask::all()).expect("tree");
    assert_eq!(hit.item, InteractionItem::Scenery);
    assert_eq!(
        hit.source,
        WorldRef::TileElement {
            tile: IVec2::new(2, 2),
            index: 1
        }
    );

    // Terrain is still reachable when scenery is masked out
    let ground = pick_at(&ctx, &vp, screen, InteractionMask::TERRAIN).expect("terrain below");
    assert_eq!(ground.item, InteractionItem::Terrain);
}

#[test]
fn see_through_objects_do_not_block_picks() {
    let mut f = single_tile_fixture();
    f.world.push_element(
        IVec2::new(2, 2),
        TileElement::new(TileElementKind::SmallScenery { vegetation: true }, 0, 40, f.tree),
    );
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);
    let mut vp = centred_viewport(&f.world, 0);
    vp.flags |= ViewFlags::HIDE_VEGETATION;

    let screen = vp.view_to_screen(IVec2::new(0, 75));
    let hit = pick_at(&ctx, &vp, screen, InteractionMask::all()).expect("terrain through the tree");
    assert_eq!(hit.item, InteractionItem::Terrain);

    vp.flags = ViewFlags::HIDE_VEGETATION | ViewFlags::INVISIBLE_VEGETATION;
    let hit = pick_at(&ctx, &vp, screen, InteractionMask::all()).expect("terrain under the missing tree");
    assert_eq!(hit.item, InteractionItem::Terrain);
}

#[test]
fn entities_are_picked_by_id() {
    let mut f = single_tile_fixture();
    let id = f.world.spawn_entity(
        EntityKind::Guest(world::GuestState::Walking),
        Some(IVec3::new(80, 80, 0)),
        f.guest,
    );
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);
    let vp = centred_viewport(&f.world, 0);

    let screen = vp.view_to_screen(IVec2::new(0, 72));
    let hit = pick_at(&ctx, &vp, screen, InteractionMask::all()).expect("guest");
    assert_eq!(hit.source, WorldRef::Entity(id));

    let mut hidden = centred_viewport(&f.world, 0);
    hidden.flags |= ViewFlags::HIDE_GUESTS;
    let hit = pick_at(&ctx, &hidden, screen, InteractionMask::all()).expect("terrain");
    assert_eq!(hit.item, InteractionItem::Terrain);
}

#[test]
fn picks_agree_across_zoom_levels() {
    let f = single_tile_fixture();
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);
    for zoom in -1..=2 {
        let vp = centred_viewport(&f.world, zoom);
        let centre = vp.view_to_screen(IVec2::new(0, 80));
        let hit = pick_at(&ctx, &vp, centre, InteractionMask::TERRAIN).expect("terrain at every zoom");
        assert_eq!(hit.map_pos, IVec2::new(64, 64));
    }
}

#[test]
fn screen_to_tile_reports_the_ground_tile() {
    let (sprites, images) = SpriteStore::procedural();
    let mut world = World::new(8);
    for y in 0..8 {
        for x in 0..8 {
            world.push_element(IVec2::new(x, y), TileElement::surface(0, images.grass));
        }
    }
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&world, &sprites, &settings);
    let vp = centred_viewport(&world, 0);

    let point = IVec2::new(70, 90);
    let screen = vp.view_to_screen(world_to_screen(0, point.extend(0)));
    let hit = screen_to_tile(&ctx, &vp, screen).expect("ground under the cursor");
    assert_eq!(hit.tile, IVec2::new(64, 64));
    assert_eq!(hit.position, point);
}

#[test]
fn pick_through_the_topmost_window() {
    let f = single_tile_fixture();
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&f.world, &f.sprites, &settings);

    let mut windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();
    let desc = |window, pos: IVec2, focus| ViewportDesc {
        window,
        main: window == WindowId(1),
        pos,
        size: IVec2::new(200, 200),
        zoom: ZoomLevel::new(0),
        rotation: 0,
        focus: Focus::Coordinate(focus),
    };
    windows.open(WindowId(1), ScreenRect::new(0, 0, 200, 200), true);
    let main = registry
        .create(desc(WindowId(1), IVec2::ZERO, IVec3::new(80, 80, 0)), &f.world, &settings)
        .expect("slot");
    windows.open(WindowId(2), ScreenRect::new(100, 100, 300, 300), false);
    let side = registry
        .create(desc(WindowId(2), IVec2::new(100, 100), IVec3::new(1000, 1000, 0)), &f.world, &settings)
        .expect("slot");

    let (id, _) = pick_at_screen(&ctx, &registry, &windows, IVec2::new(90, 90), InteractionMask::TERRAIN)
        .expect("main viewport shows the tile left of the side window");
    assert_eq!(id, main);

    // Inside the side window nothing is drawn, and the main view underneath is not consulted
    let covered = IVec2::new(150, 150);
    assert_eq!(registry.find_at_screen_point(&windows, covered), Some(side));
    assert_eq!(pick_at_screen(&ctx, &registry, &windows, covered, InteractionMask::all()), None);
}

#[test]
fn session_pick_uses_the_last_drawn_struct() {
    let (sprites, images) = SpriteStore::procedural();
    let world = World::new(4);
    let settings = RenderSettings::default();
    let ctx = PaintContext::new(&world, &sprites, &settings);
    let vp = centred_viewport(&world, 0);

    let mut session = PaintSession::new(ScreenRect::new(-64, 0, 64, 128), vp.params());
    let floor = BoundBox::new(IVec3::new(64, 64, 0), IVec3::new(32, 32, 1));
    let raised = BoundBox::new(IVec3::new(64, 64, 8), IVec3::new(32, 32, 1));
    let low = session.add_parent(ctx.sprites, images.grass, IVec3::new(80, 80, 0), floor);
    let high = session.add_parent(ctx.sprites, images.grass, IVec3::new(80, 80, 8), raised);
    assert!(low.is_some() && high.is_some());
    session.arrange();

    let order = session.draw_order();
    assert_eq!(order.last().copied(), high);
    let hit = session.pick(ctx.sprites, IVec2::new(0, 72), InteractionMask::all());
    assert!(hit.is_some());
}
