/// Viewport registry and invalidation through the public API
use glam::{IVec2, IVec3};
use iso_engine::viewport::MAX_VIEWPORT_COUNT;
use iso_engine::*;

fn desc(window: u32, pos: IVec2, size: IVec2, focus: IVec3) -> ViewportDesc {
    ViewportDesc {
        window: WindowId(window),
        main: window == 1,
        pos,
        size,
        zoom: ZoomLevel::new(0),
        rotation: 0,
        focus: Focus::Coordinate(focus),
    }
}

fn drain(registry: &mut ViewportRegistry) {
    for (_, vp) in registry.iter_mut() {
        vp.take_dirty();
    }
}

#[test]
fn cuboid_dirties_only_viewports_that_show_it() {
    let world = World::new(64);
    let settings = RenderSettings::default();
    let mut windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();

    windows.open(WindowId(1), ScreenRect::new(0, 0, 200, 200), true);
    let near = registry
        .create(desc(1, IVec2::ZERO, IVec2::new(200, 200), IVec3::new(48, 48, 0)), &world, &settings)
        .expect("slot");
    windows.open(WindowId(2), ScreenRect::new(300, 0, 500, 200), false);
    let far = registry
        .create(
            desc(2, IVec2::new(300, 0), IVec2::new(200, 200), IVec3::new(1800, 200, 0)),
            &world,
            &settings,
        )
        .expect("slot");
    drain(&mut registry);

    let touched = registry.invalidate_world_cuboid(&windows, IVec2::new(32, 32), 0, 16, None);
    assert_eq!(touched, 1);

    let near_vp = registry.get(near).expect("live");
    assert_eq!(near_vp.dirty().rects().len(), 1);
    let rect = near_vp.dirty().rects()[0];
    assert!(near_vp.screen_rect().contains_rect(&rect));
    // Tile centre (48, 48, 0) projects to view (0, 48), which is screen (100, 100)
    assert!(rect.contains(IVec2::new(100, 100)));
    assert!(registry.get(far).expect("live").dirty().is_empty());
}

#[test]
fn covered_viewports_skip_invalidation() {
    let world = World::new(16);
    let settings = RenderSettings::default();
    let mut windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();

    windows.open(WindowId(2), ScreenRect::new(10, 10, 110, 110), false);
    let hidden = registry
        .create(desc(2, IVec2::new(10, 10), IVec2::new(100, 100), IVec3::new(48, 48, 0)), &world, &settings)
        .expect("slot");
    // A bigger window on top hides it completely
    windows.open(WindowId(3), ScreenRect::new(0, 0, 200, 200), false);
    drain(&mut registry);

    assert_eq!(registry.invalidate_tile(&windows, IVec2::new(1, 1), 0, 16), 0);
    assert!(registry.get(hidden).expect("live").dirty().is_empty());

    // The cached verdict holds until visibility is reset
    windows.close(WindowId(3));
    assert_eq!(registry.invalidate_tile(&windows, IVec2::new(1, 1), 0, 16), 0);
    registry.reset_visibility();
    assert_eq!(registry.invalidate_tile(&windows, IVec2::new(1, 1), 0, 16), 1);
    assert!(!registry.get(hidden).expect("live").dirty().is_empty());
}

#[test]
fn zoom_limit_restricts_invalidation() {
    let world = World::new(16);
    let settings = RenderSettings::default();
    let windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();

    let mut zoomed = desc(1, IVec2::ZERO, IVec2::new(200, 200), IVec3::new(48, 48, 0));
    zoomed.zoom = ZoomLevel::new(2);
    let zoomed = registry.create(zoomed, &world, &settings).expect("slot");
    let close = registry
        .create(desc(1, IVec2::ZERO, IVec2::new(200, 200), IVec3::new(48, 48, 0)), &world, &settings)
        .expect("slot");
    drain(&mut registry);

    let touched = registry.invalidate_world_cuboid(&windows, IVec2::new(32, 32), 0, 16, Some(ZoomLevel::new(1)));
    assert_eq!(touched, 1);
    assert!(registry.get(zoomed).expect("live").dirty().is_empty());
    assert!(!registry.get(close).expect("live").dirty().is_empty());
}

#[test]
fn screen_rect_invalidation_is_clipped() {
    let world = World::new(16);
    let settings = RenderSettings::default();
    let windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();
    let id = registry
        .create(desc(1, IVec2::new(50, 50), IVec2::new(100, 100), IVec3::ZERO), &world, &settings)
        .expect("slot");
    drain(&mut registry);

    assert!(registry.invalidate_screen_rect(&windows, id, ScreenRect::new(0, 0, 60, 70)));
    assert_eq!(
        registry.get(id).expect("live").dirty().rects(),
        &[ScreenRect::new(50, 50, 60, 70)]
    );
    assert!(!registry.invalidate_screen_rect(&windows, id, ScreenRect::new(0, 0, 40, 40)));
}

#[test]
fn registry_is_bounded_and_ids_do_not_alias() {
    let world = World::new(8);
    let settings = RenderSettings::default();
    let mut registry = ViewportRegistry::new();
    let make = |registry: &mut ViewportRegistry| {
        registry.create(desc(1, IVec2::ZERO, IVec2::new(10, 10), IVec3::ZERO), &world, &settings)
    };

    let ids: Vec<ViewportId> = (0..MAX_VIEWPORT_COUNT).map(|_| make(&mut registry).expect("free slot")).collect();
    assert_eq!(registry.len(), MAX_VIEWPORT_COUNT);
    assert!(make(&mut registry).is_none());
    assert_eq!(registry.len(), MAX_VIEWPORT_COUNT);

    let removed = ids[3];
    assert!(registry.remove(removed).is_some());
    assert!(registry.remove(removed).is_none());
    let reused = make(&mut registry).expect("slot was freed");
    assert_ne!(reused, removed);
    assert!(registry.get(removed).is_none());
    assert!(registry.get(reused).is_some());
}

#[test]
fn zero_sized_viewports_stay_registered_but_never_render() {
    let world = World::new(8);
    let settings = RenderSettings::default();
    let mut registry = ViewportRegistry::new();
    let id = registry
        .create(desc(1, IVec2::ZERO, IVec2::ZERO, IVec3::ZERO), &world, &settings)
        .expect("slot");
    let vp = registry.get(id).expect("live");
    assert!(!vp.is_renderable(IVec2::new(640, 480)));
    assert!(vp.dirty().is_empty());
    assert_eq!(registry.invalidate_tile(&WindowLayers::new(), IVec2::ZERO, 0, 16), 0);
}

#[test]
fn gridline_setting_applies_to_new_viewports() {
    let world = World::new(8);
    let settings = RenderSettings {
        always_show_gridlines: true,
        ..RenderSettings::default()
    };
    let mut registry = ViewportRegistry::new();
    let id = registry
        .create(desc(1, IVec2::ZERO, IVec2::new(64, 64), IVec3::ZERO), &world, &settings)
        .expect("slot");
    assert!(registry.get(id).expect("live").flags.contains(ViewFlags::GRIDLINES));
}

#[test]
fn closing_a_window_removes_its_viewports() {
    let world = World::new(8);
    let settings = RenderSettings::default();
    let mut windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();
    windows.open(WindowId(1), ScreenRect::new(0, 0, 200, 200), true);
    let main = registry
        .create(desc(1, IVec2::ZERO, IVec2::new(200, 200), IVec3::ZERO), &world, &settings)
        .expect("slot");
    windows.open(WindowId(2), ScreenRect::new(10, 10, 60, 60), false);
    let first = registry
        .create(desc(2, IVec2::new(10, 10), IVec2::new(50, 20), IVec3::ZERO), &world, &settings)
        .expect("slot");
    let second = registry
        .create(desc(2, IVec2::new(10, 30), IVec2::new(50, 30), IVec3::ZERO), &world, &settings)
        .expect("slot");

    windows.close(WindowId(2));
    registry.remove_window(WindowId(2));
    assert_eq!(registry.len(), 1);
    assert!(registry.get(first).is_none() && registry.get(second).is_none());
    assert_eq!(registry.find_at_screen_point(&windows, IVec2::new(20, 20)), Some(main));

    // Closing again is harmless
    registry.remove_window(WindowId(2));
    assert_eq!(registry.len(), 1);
}

#[test]
fn covered_viewports_ignore_their_own_redraw_requests() {
    let world = World::new(16);
    let settings = RenderSettings::default();
    let mut windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();

    windows.open(WindowId(2), ScreenRect::new(10, 10, 110, 110), false);
    let hidden = registry
        .create(desc(2, IVec2::new(10, 10), IVec2::new(100, 100), IVec3::new(48, 48, 0)), &world, &settings)
        .expect("slot");
    windows.open(WindowId(3), ScreenRect::new(0, 0, 200, 200), false);
    drain(&mut registry);
    // Resolves the cached verdict to covered
    assert_eq!(registry.invalidate_tile(&windows, IVec2::new(1, 1), 0, 16), 0);

    let vp = registry.get_mut(hidden).expect("live");
    vp.invalidate();
    let moved = vp.move_view(vp.view_pos + IVec2::new(64, 32));
    assert!(moved);
    assert!(vp.dirty().is_empty());

    // Uncovering redraws the whole viewport once
    windows.close(WindowId(3));
    registry.reset_visibility();
    let vp = registry.get(hidden).expect("live");
    assert_eq!(vp.dirty().rects(), &[vp.screen_rect()]);
}
