/// Viewport camera: following entities, scripted scrolls and rotation
/// The camera never owns what it follows; targets are entity ids looked up
/// every frame, so a removed entity simply ends the follow.
use crate::interaction::{pick_at, InteractionMask};
use crate::projection::{adjust_for_map_height, resolve_ground_xy, TILE_SIZE};
use crate::rendering::PaintContext;
use crate::viewport::{ViewFlags, Viewport};
use crate::world::{EntityId, EntityKind, GuestState, World};
use glam::{IVec2, IVec3};

/// Entities this far below the surface put side viewports into underground mode
const UNDERGROUND_DEPTH: i32 = 16;

/// What a viewport is centred on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Coordinate(IVec3),
    Entity(EntityId),
}

impl Focus {
    /// World point of the focus; the origin when the entity is gone
    pub fn resolve(&self, world: &World) -> IVec3 {
        match *self {
            Focus::Coordinate(loc) => loc,
            Focus::Entity(id) => match world.entity(id).and_then(|e| e.location) {
                Some(loc) => loc,
                None => {
                    log::debug!("Focus entity {:?} has no location", id);
                    IVec3::ZERO
                }
            },
        }
    }
}

/// Per-viewport camera state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Camera {
    /// View position the camera is heading for
    pub saved_view: IVec2,
    /// Entity followed exactly
    pub follow: Option<EntityId>,
    /// Entity whose focus is re-derived from its state every frame
    pub smart_follow: Option<EntityId>,
    /// A scripted scroll eases toward `saved_view`
    pub scrolling_to_location: bool,
}

/// Focus for a smart-followed entity, `None` when following should stop.
pub fn smart_focus(world: &World, id: EntityId) -> Option<Focus> {
    let Some(entity) = world.entity(id) else {
        log::debug!("Smart follow target {:?} no longer exists", id);
        return None;
    };
    match entity.kind {
        EntityKind::Guest(GuestState::PickedUp) | EntityKind::Staff { picked_up: true } => None,
        EntityKind::MoneyEffect { .. } => None,
        EntityKind::Guest(GuestState::OnRide { vehicle, ride_view }) => {
            if let Some(car) = vehicle.filter(|v| world.entity(*v).is_some()) {
                return Some(Focus::Entity(car));
            }
            match (entity.location, ride_view) {
                (None, Some(tile)) => {
                    let centre = tile * TILE_SIZE + IVec2::splat(TILE_SIZE / 2);
                    let z = world.surface_height(centre) + 32;
                    Some(Focus::Coordinate(centre.extend(z)))
                }
                _ => Some(Focus::Entity(id)),
            }
        }
        _ => Some(Focus::Entity(id)),
    }
}

impl Viewport {
    pub fn set_follow(&mut self, id: Option<EntityId>) {
        self.camera.follow = id;
    }

    pub fn set_smart_follow(&mut self, id: Option<EntityId>) {
        self.camera.smart_follow = id;
        self.camera.follow = id;
    }

    pub fn stop_following(&mut self) {
        self.camera.follow = None;
        self.camera.smart_follow = None;
    }

    /// Ease the view toward `loc` over the next frames
    pub fn scroll_to_location(&mut self, loc: IVec3) {
        self.camera.saved_view = self.centre_on(loc);
        self.camera.scrolling_to_location = true;
    }

    fn set_underground(&mut self, underground: bool) {
        if self.flags.contains(ViewFlags::UNDERGROUND_INSIDE) != underground {
            self.flags.set(ViewFlags::UNDERGROUND_INSIDE, underground);
            self.invalidate();
        }
    }

    /// Per-frame camera step: follow, clamp to the map, scroll.
    pub fn update_position(&mut self, world: &World) {
        if let Some(id) = self.camera.smart_follow {
            match smart_focus(world, id) {
                None => {
                    self.stop_following();
                    return;
                }
                Some(Focus::Entity(target)) => self.camera.follow = Some(target),
                Some(Focus::Coordinate(loc)) => {
                    self.camera.follow = None;
                    let view = self.centre_on(loc);
                    self.camera.saved_view = view;
                    self.move_view(view);
                    return;
                }
            }
        }

        if let Some(id) = self.camera.follow {
            let Some(loc) = world.entity(id).and_then(|e| e.location) else {
                log::debug!("Follow target {:?} is gone, releasing camera", id);
                self.stop_following();
                return;
            };
            if !self.main {
                let surface = world.surface_height(loc.truncate());
                self.set_underground(loc.z < surface - UNDERGROUND_DEPTH);
            }
            let view = self.centre_on(loc);
            self.camera.saved_view = view;
            self.move_view(view);
            return;
        }

        if !self.main {
            self.set_underground(false);
        }

        // Keep the centre of the view over the playable area
        let centre_view = self.camera.saved_view + self.view_size() / 2;
        let (min, max) = world.playable_bounds();
        let (min, max) = (IVec2::splat(min), IVec2::splat(max));
        // Off-map guesses take the height of the nearest playable point
        let centre = adjust_for_map_height(centre_view, self.rotation, |p| world.surface_height(p.clamp(min, max))).truncate();
        let clamped = centre.clamp(min, max);
        if clamped != centre {
            let z = world.surface_height(clamped);
            self.camera.saved_view = self.centre_on(clamped.extend(z));
        }

        let mut target = self.camera.saved_view;
        if self.camera.scrolling_to_location {
            let remaining = self.camera.saved_view - self.view_pos;
            let step = IVec2::new(
                remaining.x.signum() * ((remaining.x.abs() + 7) / 8),
                remaining.y.signum() * ((remaining.y.abs() + 7) / 8),
            );
            if step == IVec2::ZERO {
                self.camera.scrolling_to_location = false;
            }
            target = self.view_pos + step;
            // A step smaller than the zoom alignment would never land
            let mask = self.zoom.mask();
            if IVec2::new(target.x & mask, target.y & mask) == self.view_pos {
                target = self.camera.saved_view;
            }
        }
        self.move_view(target);
    }
}

/// Rotate a viewport a quarter turn, keeping the ground at its centre in place.
///
/// `direction` is +1 or -1.
pub fn rotate_camera(ctx: &PaintContext, viewport: &mut Viewport, direction: i8) {
    let world = ctx.world;
    let height_at = |p: IVec2| world.surface_height(p);
    let centre_screen = viewport.pos + viewport.size / 2;
    let rotation = viewport.rotation;

    let anchor = match pick_at(ctx, viewport, centre_screen, InteractionMask::TERRAIN) {
        Some(hit) => {
            let ground = resolve_ground_xy(hit.view_pos, rotation, hit.map_pos, height_at);
            ground.extend(world.surface_height(ground))
        }
        None => adjust_for_map_height(viewport.view_centre(), rotation, height_at),
    };

    viewport.rotation = (rotation as i8 + direction).rem_euclid(4) as u8;
    let view = viewport.centre_on(anchor);
    viewport.camera.saved_view = view;
    viewport.move_view(view);
    viewport.invalidate();
}

/// Held scroll keys of the viewer
#[derive(Clone, Copy, Debug, Default)]
pub struct ScrollController {
    pub up_pressed: bool,
    pub down_pressed: bool,
    pub left_pressed: bool,
    pub right_pressed: bool,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the camera target by `speed` screen pixels along the held keys.
    pub fn update_camera(&self, viewport: &mut Viewport, speed: i32) {
        let mut dir = IVec2::ZERO;
        if self.up_pressed {
            dir.y -= 1;
        }
        if self.down_pressed {
            dir.y += 1;
        }
        if self.left_pressed {
            dir.x -= 1;
        }
        if self.right_pressed {
            dir.x += 1;
        }
        if dir == IVec2::ZERO {
            return;
        }
        let step = viewport.zoom.apply_to(speed);
        viewport.camera.saved_view += dir * step;
        viewport.camera.scrolling_to_location = false;
    }
}
