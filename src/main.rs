/// Interactive park viewer
/// Opens a window with a main viewport and a follow camera, and drives
/// invalidation, column rendering and picking from input.
use glam::{IVec2, IVec3};
use iso_engine::projection::{tile_floor, TILE_SIZE};
use iso_engine::*;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use std::error::Error;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

const SETTINGS_FILE: &str = "iso_viewer.toml";
const MAIN_WINDOW: WindowId = WindowId(1);
const FOLLOW_WINDOW: WindowId = WindowId(2);
const FOLLOW_SIZE: IVec2 = IVec2::new(320, 240);
/// Screen pixels scrolled per frame while an arrow key is held
const SCROLL_SPEED: i32 = 12;

fn follow_window_rect(display: IVec2) -> ScreenRect {
    let pos = IVec2::new(display.x - FOLLOW_SIZE.x - 8, 8);
    ScreenRect::from_pos_size(pos, FOLLOW_SIZE)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== Isometric Engine - Park Viewer ===");
    println!("Controls:");
    println!("  Arrows - Scroll");
    println!("  Q/E - Rotate view");
    println!("  +/- - Zoom");
    println!("  G - Gridlines, H - Land heights, V - Hide entities");
    println!("  M - Toggle multithreaded drawing");
    println!("  F - Smart-follow the staff member, Esc - Stop following / exit");
    println!("  C - Close the follow window");
    println!("  Click - Pick the object under the cursor");
    println!();

    let settings_path = Path::new(SETTINGS_FILE);
    let mut settings = RenderSettings::load_from_file(settings_path);

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Isometric Engine")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let context = softbuffer::Context::new(window.clone())?;
    let mut surface = softbuffer::Surface::new(&context, window.clone())?;

    let window_size = window.inner_size();
    let mut framebuffer = Framebuffer::new(window_size.width as usize, window_size.height as usize);
    let display = framebuffer.size();

    // --- WORLD ---
    let gen_start = Instant::now();
    let (sprites, images) = SpriteStore::procedural();
    let world_config = WorldConfig::default();
    let mut world = World::generate(&world_config, &images);
    println!(
        "World generation: {:.2}ms ({} elements, {} entities)",
        gen_start.elapsed().as_secs_f64() * 1e3,
        world.element_count(),
        world.entity_count()
    );

    let staff = world
        .entities()
        .find(|e| matches!(e.kind, EntityKind::Staff { .. }))
        .map(|e| e.id);
    let car = world
        .entities()
        .find(|e| matches!(e.kind, EntityKind::Vehicle { .. }))
        .map(|e| e.id);

    // --- VIEWPORTS ---
    let mut windows = WindowLayers::new();
    let mut registry = ViewportRegistry::new();
    windows.open(MAIN_WINDOW, ScreenRect::from_pos_size(IVec2::ZERO, display), true);

    let centre = IVec2::splat(world.size() * TILE_SIZE / 2);
    let main_view = registry
        .create(
            ViewportDesc {
                window: MAIN_WINDOW,
                main: true,
                pos: IVec2::ZERO,
                size: display,
                zoom: ZoomLevel::new(0),
                rotation: 0,
                focus: Focus::Coordinate(centre.extend(world.surface_height(centre))),
            },
            &world,
            &settings,
        )
        .ok_or("no viewport slot for the main view")?;

    let mut follow_view = staff.and_then(|id| {
        let rect = follow_window_rect(display);
        windows.open(FOLLOW_WINDOW, rect, false);
        registry.create(
            ViewportDesc {
                window: FOLLOW_WINDOW,
                main: false,
                pos: IVec2::new(rect.left, rect.top),
                size: FOLLOW_SIZE,
                zoom: ZoomLevel::new(-1),
                rotation: 0,
                focus: Focus::Entity(id),
            },
            &world,
            &settings,
        )
    });

    let mut renderer = Renderer::new(BackendCapabilities::default());
    let mut scroll = ScrollController::new();
    let mut cursor = IVec2::ZERO;

    // Timing
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();
    let mut car_step = 0i32;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    if let Err(e) = settings.save_to_file(Path::new(SETTINGS_FILE)) {
                        log::warn!("{}", e);
                    }
                    elwt.exit();
                }

                WindowEvent::Resized(new_size) => {
                    framebuffer.resize(new_size.width as usize, new_size.height as usize);
                    let display = framebuffer.size();
                    windows.set_rect(MAIN_WINDOW, ScreenRect::from_pos_size(IVec2::ZERO, display));
                    if let Some(vp) = registry.get_mut(main_view) {
                        vp.set_screen_rect(IVec2::ZERO, display);
                    }
                    if let Some(id) = follow_view {
                        let rect = follow_window_rect(display);
                        windows.set_rect(FOLLOW_WINDOW, rect);
                        windows.bring_to_front(FOLLOW_WINDOW);
                        if let Some(vp) = registry.get_mut(id) {
                            vp.set_screen_rect(IVec2::new(rect.left, rect.top), FOLLOW_SIZE);
                        }
                    }
                    registry.reset_visibility();
                }

                WindowEvent::KeyboardInput { event, .. } => {
                    let pressed = event.state == ElementState::Pressed;
                    let PhysicalKey::Code(keycode) = event.physical_key else {
                        return;
                    };
                    match keycode {
                        KeyCode::ArrowUp => scroll.up_pressed = pressed,
                        KeyCode::ArrowDown => scroll.down_pressed = pressed,
                        KeyCode::ArrowLeft => scroll.left_pressed = pressed,
                        KeyCode::ArrowRight => scroll.right_pressed = pressed,
                        KeyCode::KeyQ | KeyCode::KeyE if pressed && !event.repeat => {
                            let direction = if keycode == KeyCode::KeyQ { -1 } else { 1 };
                            let ctx = PaintContext::new(&world, &sprites, &settings);
                            if let Some(vp) = registry.get_mut(main_view) {
                                rotate_camera(&ctx, vp, direction);
                                println!("Rotation: {}", vp.rotation);
                            }
                        }
                        KeyCode::Equal | KeyCode::NumpadAdd | KeyCode::Minus | KeyCode::NumpadSubtract
                            if pressed =>
                        {
                            let delta = if matches!(keycode, KeyCode::Minus | KeyCode::NumpadSubtract) {
                                1
                            } else {
                                -1
                            };
                            if let Some(vp) = registry.get_mut(main_view) {
                                vp.set_zoom(ZoomLevel::new(vp.zoom.level() + delta));
                                println!("Zoom level: {}", vp.zoom.level());
                            }
                        }
                        KeyCode::KeyG if pressed => toggle_flag(&mut registry, main_view, ViewFlags::GRIDLINES, "Gridlines"),
                        KeyCode::KeyH if pressed => {
                            toggle_flag(&mut registry, main_view, ViewFlags::LAND_HEIGHTS, "Land heights")
                        }
                        KeyCode::KeyV if pressed => {
                            toggle_flag(&mut registry, main_view, ViewFlags::HIDE_ENTITIES, "Hide entities")
                        }
                        KeyCode::KeyM if pressed => {
                            settings.multithreading = !settings.multithreading;
                            println!(
                                "Multithreaded drawing: {}",
                                if settings.multithreading { "ON" } else { "OFF" }
                            );
                        }
                        KeyCode::KeyF if pressed => {
                            if let Some(vp) = registry.get_mut(main_view) {
                                vp.set_smart_follow(staff);
                                println!("Following staff member {:?}", staff);
                            }
                        }
                        KeyCode::KeyC if pressed => {
                            if follow_view.take().is_some() {
                                windows.close(FOLLOW_WINDOW);
                                registry.remove_window(FOLLOW_WINDOW);
                                registry.reset_visibility();
                                if let Some(vp) = registry.get_mut(main_view) {
                                    vp.invalidate();
                                }
                                println!("Follow window closed");
                            }
                        }
                        KeyCode::Escape if pressed => {
                            let following = registry
                                .get(main_view)
                                .is_some_and(|vp| vp.camera.follow.is_some() || vp.camera.smart_follow.is_some());
                            if following {
                                if let Some(vp) = registry.get_mut(main_view) {
                                    vp.stop_following();
                                }
                                println!("Camera released");
                            } else {
                                elwt.exit();
                            }
                        }
                        _ => {}
                    }
                }

                WindowEvent::CursorMoved { position, .. } => {
                    cursor = IVec2::new(position.x as i32, position.y as i32);
                }

                WindowEvent::MouseInput { state, button, .. } => {
                    if button == MouseButton::Left && state == ElementState::Pressed {
                        let ctx = PaintContext::new(&world, &sprites, &settings);
                        match pick_at_screen(&ctx, &registry, &windows, cursor, InteractionMask::all()) {
                            Some((id, hit)) => {
                                println!("Picked {:?} ({:?}) at {:?} in {:?}", hit.item, hit.source, hit.map_pos, id)
                            }
                            None => println!("Nothing under the cursor"),
                        }
                        if let Some(vp) = registry.get(main_view) {
                            if let Some(tile) = screen_to_tile(&ctx, vp, cursor) {
                                log::info!("Ground tile {:?}, quadrant {}", tile.tile, tile.quadrant);
                            }
                        }
                    }
                }

                WindowEvent::RedrawRequested => {
                    // --- PHASE 1: SIMULATE ---
                    if let Some((car, old)) = car.and_then(|id| Some((id, world.entity(id)?.location?))) {
                        car_step = (car_step + 1) % (TILE_SIZE * 8);
                        let new = IVec3::new(8 * TILE_SIZE + car_step, old.y, old.z);
                        world.move_entity(car, Some(new));
                        for loc in [old, new] {
                            let tile = tile_floor(loc.truncate());
                            registry.invalidate_world_cuboid(&windows, tile, loc.z, loc.z + 32, None);
                        }
                    }

                    // --- PHASE 2: CAMERAS ---
                    for (_, vp) in registry.iter_mut() {
                        if vp.window == MAIN_WINDOW {
                            scroll.update_camera(vp, SCROLL_SPEED);
                        }
                        vp.update_position(&world);
                    }

                    // The follow window sits on top of the main view in the framebuffer
                    let main_dirty = registry.get(main_view).is_some_and(|vp| !vp.dirty().is_empty());
                    if let Some(vp) = follow_view.and_then(|id| registry.get_mut(id)) {
                        if main_dirty {
                            vp.invalidate();
                        }
                    }

                    // --- PHASE 3: RENDER ---
                    let ctx = PaintContext::new(&world, &sprites, &settings);
                    let columns = renderer.render_dirty(&ctx, &mut registry, &mut framebuffer);

                    // --- PHASE 4: PRESENT ---
                    let (Some(width), Some(height)) = (
                        NonZeroU32::new(framebuffer.width as u32),
                        NonZeroU32::new(framebuffer.height as u32),
                    ) else {
                        return;
                    };
                    if let Err(e) = surface.resize(width, height) {
                        log::error!("Failed to resize surface: {}", e);
                        return;
                    }
                    match surface.buffer_mut() {
                        Ok(mut buffer) => {
                            buffer.copy_from_slice(framebuffer.color_buffer_slice());
                            if let Err(e) = buffer.present() {
                                log::error!("Failed to present frame: {}", e);
                            }
                        }
                        Err(e) => log::error!("Failed to map surface buffer: {}", e),
                    }

                    // FPS counter with additional stats
                    frame_count += 1;
                    if columns > 0 {
                        renderer.stats().log_summary();
                    }
                    if fps_timer.elapsed().as_secs() >= 1 {
                        println!(
                            "FPS: {} | Workers: {} | Last columns: {}",
                            frame_count,
                            renderer.pool().threads(),
                            columns
                        );
                        FUNCTION_COUNTERS.snapshot().log_report();
                        FUNCTION_COUNTERS.reset();
                        frame_count = 0;
                        fps_timer = Instant::now();
                    }
                }
                _ => {}
            },

            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}

fn toggle_flag(registry: &mut ViewportRegistry, id: ViewportId, flag: ViewFlags, name: &str) {
    let Some(vp) = registry.get_mut(id) else {
        return;
    };
    vp.flags.toggle(flag);
    vp.invalidate();
    println!("{}: {}", name, if vp.flags.contains(flag) { "ON" } else { "OFF" });
}
