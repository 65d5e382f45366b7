/// Pixel-accurate picking of world objects under the cursor
///
/// A pick runs a paint session over the single view pixel under the cursor,
/// arranges it like any column, then scans the draw order for the topmost
/// struct that is visible, accepted by the mask and opaque at that pixel.
use crate::{count_call, perf_scope};
use crate::perf::FUNCTION_COUNTERS;
use crate::projection::{resolve_ground_xy, TileHit};
use crate::rendering::draw::{sprite_top_left, text_extent};
use crate::rendering::{PaintContext, PaintSession, WorldRef};
use crate::sprite::{ImageId, SpriteStore};
use crate::viewport::{ScreenRect, ViewFlags, Viewport, ViewportId, ViewportRegistry, WindowLayers};
use bitflags::bitflags;
use glam::IVec2;

/// Category tag carried by every paint struct
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InteractionItem {
    #[default]
    None,
    Terrain,
    Entity,
    Ride,
    Scenery,
    Footpath,
    Wall,
    LargeScenery,
    Banner,
    Label,
}

bitflags! {
    /// Categories a pick may return
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct InteractionMask: u16 {
        const TERRAIN       = 1 << 0;
        const ENTITY        = 1 << 1;
        const RIDE          = 1 << 2;
        const SCENERY       = 1 << 3;
        const FOOTPATH      = 1 << 4;
        const WALL          = 1 << 5;
        const LARGE_SCENERY = 1 << 6;
        const BANNER        = 1 << 7;
        const LABEL         = 1 << 8;
    }
}

impl InteractionItem {
    /// Mask bit for this item; `None` matches no mask
    pub fn mask(self) -> InteractionMask {
        match self {
            InteractionItem::None => InteractionMask::empty(),
            InteractionItem::Terrain => InteractionMask::TERRAIN,
            InteractionItem::Entity => InteractionMask::ENTITY,
            InteractionItem::Ride => InteractionMask::RIDE,
            InteractionItem::Scenery => InteractionMask::SCENERY,
            InteractionItem::Footpath => InteractionMask::FOOTPATH,
            InteractionItem::Wall => InteractionMask::WALL,
            InteractionItem::LargeScenery => InteractionMask::LARGE_SCENERY,
            InteractionItem::Banner => InteractionMask::BANNER,
            InteractionItem::Label => InteractionMask::LABEL,
        }
    }
}

/// Grouping used by the hide/invisible view flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaintCategory {
    Terrain,
    Ride,
    Vehicle,
    Guest,
    Staff,
    Path,
    Scenery,
    Vegetation,
    Wall,
    Supports,
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VisibilityKind {
    #[default]
    Visible,
    /// Drawn see-through and never picked
    Partial,
    /// Not emitted at all
    Hidden,
}

fn hide_pair(flags: ViewFlags, hide: ViewFlags, invisible: ViewFlags) -> VisibilityKind {
    if !flags.contains(hide) {
        VisibilityKind::Visible
    } else if flags.contains(invisible) {
        VisibilityKind::Hidden
    } else {
        VisibilityKind::Partial
    }
}

/// How a struct of `category` shows under `flags`
pub fn classify(category: PaintCategory, flags: ViewFlags) -> VisibilityKind {
    use PaintCategory as C;
    use VisibilityKind as V;
    match category {
        C::Terrain => {
            if flags.contains(ViewFlags::HIDE_BASE) {
                V::Hidden
            } else if flags.contains(ViewFlags::UNDERGROUND_INSIDE) {
                V::Partial
            } else {
                V::Visible
            }
        }
        C::Vehicle => hide_pair(flags, ViewFlags::HIDE_VEHICLES, ViewFlags::INVISIBLE_VEHICLES),
        C::Guest if flags.contains(ViewFlags::HIDE_GUESTS) => V::Hidden,
        C::Staff if flags.contains(ViewFlags::HIDE_STAFF) => V::Hidden,
        C::Guest | C::Staff | C::Other => V::Visible,
        C::Ride => hide_pair(flags, ViewFlags::HIDE_RIDES, ViewFlags::INVISIBLE_RIDES),
        C::Path => hide_pair(flags, ViewFlags::HIDE_PATHS, ViewFlags::INVISIBLE_PATHS),
        C::Scenery => hide_pair(flags, ViewFlags::HIDE_SCENERY, ViewFlags::INVISIBLE_SCENERY),
        C::Vegetation => hide_pair(flags, ViewFlags::HIDE_VEGETATION, ViewFlags::INVISIBLE_VEGETATION),
        C::Supports => hide_pair(flags, ViewFlags::HIDE_SUPPORTS, ViewFlags::INVISIBLE_SUPPORTS),
        C::Wall => match hide_pair(flags, ViewFlags::HIDE_SCENERY, ViewFlags::INVISIBLE_SCENERY) {
            V::Visible if flags.contains(ViewFlags::UNDERGROUND_INSIDE) => V::Partial,
            other => other,
        },
    }
}

/// What a pick found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickResult {
    pub item: InteractionItem,
    /// World origin of the tile the struct was painted for
    pub map_pos: IVec2,
    pub source: WorldRef,
    /// View coordinate that was tested
    pub view_pos: IVec2,
}

impl PaintSession {
    /// Topmost struct or label at view coordinate `view` that the mask accepts.
    ///
    /// Every struct in draw order is tested, so a later match replaces an
    /// earlier one. Attached sprites hit on behalf of their parent. Structs
    /// drawn see-through are skipped and do not shield what lies behind them.
    pub fn pick(&self, sprites: &SpriteStore, view: IVec2, mask: InteractionMask) -> Option<PickResult> {
        let zoom = self.params.zoom;
        let hits = |image: ImageId, anchor: IVec2, item: InteractionItem| {
            sprites.get(image).is_some_and(|sprite| {
                let top_left = sprite_top_left(anchor, sprite, item, zoom);
                sprites.is_pixel_present(image, view.x - top_left.x, view.y - top_left.y)
            })
        };

        let mut found = None;
        for index in self.draw_order() {
            let Some(ps) = self.get(index) else {
                continue;
            };
            if ps.visibility != VisibilityKind::Visible || !mask.intersects(ps.item.mask()) {
                continue;
            }
            let hit = hits(ps.image, ps.screen, ps.item)
                || self
                    .attachments(index)
                    .any(|a| hits(a.image, ps.screen + a.offset, ps.item));
            if hit {
                found = Some(PickResult {
                    item: ps.item,
                    map_pos: ps.map_pos,
                    source: ps.source,
                    view_pos: view,
                });
            }
        }

        if mask.contains(InteractionMask::LABEL) {
            for label in self.labels() {
                let (w, h) = text_extent(&label.text);
                let rect = ScreenRect::new(
                    label.view_pos.x,
                    label.view_pos.y,
                    label.view_pos.x + zoom.apply_to(w),
                    label.view_pos.y + zoom.apply_to(h),
                );
                if rect.contains(view) {
                    found = Some(PickResult {
                        item: InteractionItem::Label,
                        map_pos: label.map_pos,
                        source: label.source,
                        view_pos: view,
                    });
                }
            }
        }
        found
    }
}

/// Topmost eligible object under a screen pixel of one viewport.
pub fn pick_at(
    ctx: &PaintContext,
    viewport: &Viewport,
    screen: IVec2,
    mask: InteractionMask,
) -> Option<PickResult> {
    count_call!(FUNCTION_COUNTERS.picks);
    perf_scope!("pick");
    let view = viewport.screen_to_view(screen)?;
    let mask_bits = viewport.zoom.mask();
    let view = IVec2::new(view.x & mask_bits, view.y & mask_bits);

    let mut session = PaintSession::new(
        ScreenRect::new(view.x, view.y, view.x + 1, view.y + 1),
        viewport.params(),
    );
    session.generate(ctx);
    session.arrange();
    session.pick(ctx.sprites, view, mask)
}

/// Pick through whichever viewport is on top at `screen`
pub fn pick_at_screen(
    ctx: &PaintContext,
    registry: &ViewportRegistry,
    windows: &WindowLayers,
    screen: IVec2,
    mask: InteractionMask,
) -> Option<(ViewportId, PickResult)> {
    let id = registry.find_at_screen_point(windows, screen)?;
    let viewport = registry.get(id)?;
    pick_at(ctx, viewport, screen, mask).map(|hit| (id, hit))
}

/// Ground tile under a screen pixel, with quadrant and side classification.
///
/// `None` when the pixel is outside the viewport or no terrain is drawn there.
pub fn screen_to_tile(ctx: &PaintContext, viewport: &Viewport, screen: IVec2) -> Option<TileHit> {
    let hit = pick_at(ctx, viewport, screen, InteractionMask::TERRAIN)?;
    let world = ctx.world;
    let pos = resolve_ground_xy(hit.view_pos, viewport.rotation, hit.map_pos, |p| {
        world.surface_height(p)
    });
    let (min, max) = world.playable_bounds();
    if pos.x < min || pos.y < min || pos.x > max || pos.y > max {
        log::trace!("Ground point {:?} is outside the playable area", pos);
        return None;
    }
    Some(TileHit::from_world(pos))
}
