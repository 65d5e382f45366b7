/// Paint sessions: per-region arenas of drawable sprite instances
///
/// A session covers one rectangle of view space. Generation sweeps the tiles
/// that can reach that rectangle in the rotation's back-to-front order and
/// appends a paint struct per visible sprite. Structs live in a flat arena;
/// quadrant chains, child chains and attachment lists are all indices into it,
/// so a session owns everything it produced and can be dropped in one go.
use super::PaintContext;
use crate::count_call;
use crate::interaction::{classify, InteractionItem, PaintCategory, VisibilityKind};
use crate::perf::FUNCTION_COUNTERS;
use crate::projection::{rotate_xy, world_to_screen, TILE_MASK, TILE_SIZE};
use crate::sprite::{ImageId, PaletteIndex, SpriteStore};
use crate::viewport::{ScreenRect, ViewFlags, ViewParams};
use crate::world::{EntityId, EntityKind, TileElement, TileElementKind};
use bitflags::bitflags;
use glam::{IVec2, IVec3};

/// Most structs, attachments and labels one session may hold
pub const PAINT_ARENA_CAPACITY: usize = 4000;
/// Number of depth buckets structs are sorted into
pub const QUADRANT_COUNT: usize = 512;
/// Extra rows swept below a region so tall elements further down still reach it
const SWEEP_OVERSCAN: i32 = 2128;

/// Index into a session's struct arena; 0 is the chain root
pub type PaintIndex = u32;
pub(crate) const ROOT: PaintIndex = 0;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct QuadrantFlags: u8 {
        const BIGGER    = 1 << 0;
        const NEXT      = 1 << 1;
        const IDENTICAL = 1 << 2;
    }
}

/// World-space box used for occlusion tests; `x_end`/`y_end` are inclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundBox {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub x_end: i32,
    pub y_end: i32,
    pub z_end: i32,
}

impl BoundBox {
    pub fn new(origin: IVec3, size: IVec3) -> Self {
        let size = size.max(IVec3::ONE);
        Self {
            x: origin.x,
            y: origin.y,
            z: origin.z,
            x_end: origin.x + size.x - 1,
            y_end: origin.y + size.y - 1,
            z_end: origin.z + size.z,
        }
    }
}

/// Weak back-reference from a struct to what it depicts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WorldRef {
    #[default]
    None,
    /// Element `index` in the stack of the tile at tile coordinates `tile`
    TileElement { tile: IVec2, index: usize },
    Entity(EntityId),
}

#[derive(Clone, Debug)]
pub struct PaintStruct {
    pub image: ImageId,
    /// View-space position of the sprite anchor
    pub screen: IVec2,
    pub bounds: BoundBox,
    /// World origin of the tile being painted
    pub map_pos: IVec2,
    pub item: InteractionItem,
    pub source: WorldRef,
    pub visibility: VisibilityKind,
    pub quadrant_index: u16,
    pub(crate) quadrant_flags: QuadrantFlags,
    pub(crate) next_quadrant: Option<PaintIndex>,
    /// Next struct layered on this one
    pub(crate) children: Option<PaintIndex>,
    /// Head of the attachment list
    pub(crate) attached: Option<u32>,
}

impl PaintStruct {
    fn root() -> Self {
        Self {
            image: ImageId::default(),
            screen: IVec2::ZERO,
            bounds: BoundBox::default(),
            map_pos: IVec2::ZERO,
            item: InteractionItem::None,
            source: WorldRef::None,
            visibility: VisibilityKind::Visible,
            quadrant_index: 0,
            quadrant_flags: QuadrantFlags::empty(),
            next_quadrant: None,
            children: None,
            attached: None,
        }
    }
}

/// Satellite sprite drawn at a fixed offset from its parent
#[derive(Clone, Copy, Debug)]
pub struct AttachedPaint {
    pub image: ImageId,
    pub offset: IVec2,
    pub(crate) next: Option<u32>,
}

/// Text drawn on top of everything in the region
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaintLabel {
    pub text: String,
    /// View-space top-left of the text
    pub view_pos: IVec2,
    pub colour: u8,
    pub map_pos: IVec2,
    pub source: WorldRef,
}

/// Interaction info stamped onto every struct of the element being painted
#[derive(Clone, Copy, Debug)]
struct ElementContext {
    map_pos: IVec2,
    item: InteractionItem,
    source: WorldRef,
    visibility: VisibilityKind,
}

impl Default for ElementContext {
    fn default() -> Self {
        Self {
            map_pos: IVec2::ZERO,
            item: InteractionItem::None,
            source: WorldRef::None,
            visibility: VisibilityKind::Visible,
        }
    }
}

pub struct PaintSession {
    /// View-space rectangle this session produces structs for
    pub dpi: ScreenRect,
    pub params: ViewParams,
    pub(crate) structs: Vec<PaintStruct>,
    pub(crate) attached: Vec<AttachedPaint>,
    pub(crate) labels: Vec<PaintLabel>,
    pub(super) quadrants: Vec<Option<PaintIndex>>,
    pub(super) quadrant_back: usize,
    pub(super) quadrant_front: usize,
    last_parent: Option<PaintIndex>,
    current: ElementContext,
    dropped: usize,
}

impl PaintSession {
    pub fn new(dpi: ScreenRect, params: ViewParams) -> Self {
        Self {
            dpi,
            params,
            structs: vec![PaintStruct::root()],
            attached: Vec::new(),
            labels: Vec::new(),
            quadrants: vec![None; QUADRANT_COUNT],
            quadrant_back: usize::MAX,
            quadrant_front: 0,
            last_parent: None,
            current: ElementContext::default(),
            dropped: 0,
        }
    }

    /// Structs, attachments and labels held, excluding the root
    #[inline]
    pub fn len(&self) -> usize {
        self.structs.len() - 1 + self.attached.len() + self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Primitives refused because the arena was full
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[inline]
    pub fn get(&self, index: PaintIndex) -> Option<&PaintStruct> {
        if index == ROOT {
            return None;
        }
        self.structs.get(index as usize)
    }

    pub fn labels(&self) -> &[PaintLabel] {
        &self.labels
    }

    /// Attachments of a struct, in draw order
    pub fn attachments(&self, index: PaintIndex) -> impl Iterator<Item = &AttachedPaint> + '_ {
        let mut cursor = self.structs.get(index as usize).and_then(|ps| ps.attached);
        std::iter::from_fn(move || {
            let current = &self.attached[cursor? as usize];
            cursor = current.next;
            Some(current)
        })
    }

    #[inline]
    fn is_full(&mut self) -> bool {
        if self.len() >= PAINT_ARENA_CAPACITY {
            self.dropped += 1;
            count_call!(FUNCTION_COUNTERS.paint_structs_dropped);
            true
        } else {
            false
        }
    }

    /// Start painting a new element; later structs carry this interaction info
    fn begin_element(&mut self, map_pos: IVec2, item: InteractionItem, source: WorldRef, visibility: VisibilityKind) {
        self.current = ElementContext {
            map_pos,
            item,
            source,
            visibility,
        };
        self.last_parent = None;
    }

    /// Build a struct if its sprite reaches the session rectangle
    fn make_struct(&mut self, sprites: &SpriteStore, image: ImageId, anchor: IVec3, bounds: BoundBox) -> Option<PaintStruct> {
        let Some(sprite) = sprites.get(image) else {
            log::trace!("Skipping paint struct with unknown image {:?}", image);
            return None;
        };
        let screen = world_to_screen(self.params.rotation, anchor);
        let left = screen.x + sprite.x_offset;
        let top = screen.y + sprite.y_offset;
        let dpi = self.dpi;
        if left + sprite.width <= dpi.left
            || top + sprite.height <= dpi.top
            || left >= dpi.right
            || top >= dpi.bottom
        {
            count_call!(FUNCTION_COUNTERS.paint_structs_culled);
            return None;
        }
        count_call!(FUNCTION_COUNTERS.paint_structs_emitted);
        Some(PaintStruct {
            image,
            screen,
            bounds,
            map_pos: self.current.map_pos,
            item: self.current.item,
            source: self.current.source,
            visibility: self.current.visibility,
            quadrant_index: 0,
            quadrant_flags: QuadrantFlags::empty(),
            next_quadrant: None,
            children: None,
            attached: None,
        })
    }

    /// Add a struct that takes part in depth sorting.
    pub fn add_parent(&mut self, sprites: &SpriteStore, image: ImageId, anchor: IVec3, bounds: BoundBox) -> Option<PaintIndex> {
        self.last_parent = None;
        if self.is_full() {
            return None;
        }
        let mut ps = self.make_struct(sprites, image, anchor, bounds)?;

        let rotation = self.params.rotation & 3;
        let hash_offset = [0, 0x2000, 0x4000, 0x2000][rotation as usize];
        let attach = rotate_xy(IVec2::new(bounds.x, bounds.y), rotation);
        let hash = attach.x + hash_offset + attach.y;
        let quadrant = (hash / 32).clamp(0, QUADRANT_COUNT as i32 - 1) as usize;

        let index = self.structs.len() as PaintIndex;
        ps.quadrant_index = quadrant as u16;
        ps.next_quadrant = self.quadrants[quadrant];
        self.quadrants[quadrant] = Some(index);
        self.quadrant_back = self.quadrant_back.min(quadrant);
        self.quadrant_front = self.quadrant_front.max(quadrant);

        self.structs.push(ps);
        self.last_parent = Some(index);
        Some(index)
    }

    /// Layer a struct on the last parent, drawn right after it.
    ///
    /// Without a parent the struct becomes a parent itself.
    pub fn add_child(&mut self, sprites: &SpriteStore, image: ImageId, anchor: IVec3, bounds: BoundBox) -> Option<PaintIndex> {
        let Some(parent) = self.last_parent else {
            return self.add_parent(sprites, image, anchor, bounds);
        };
        if self.is_full() {
            return None;
        }
        let ps = self.make_struct(sprites, image, anchor, bounds)?;
        let index = self.structs.len() as PaintIndex;
        self.structs.push(ps);
        self.structs[parent as usize].children = Some(index);
        self.last_parent = Some(index);
        Some(index)
    }

    /// Attach a sprite to the last parent at a view-space offset.
    pub fn attach_to_previous(&mut self, image: ImageId, offset: IVec2) -> bool {
        let Some(parent) = self.last_parent else {
            return false;
        };
        if self.is_full() {
            return false;
        }
        let index = self.attached.len() as u32;
        let parent = &mut self.structs[parent as usize];
        self.attached.push(AttachedPaint {
            image,
            offset,
            next: parent.attached,
        });
        parent.attached = Some(index);
        true
    }

    /// Queue a text label at a world point, if its box reaches the region
    pub fn add_label(&mut self, text: String, at: IVec3, colour: u8) -> bool {
        let view = world_to_screen(self.params.rotation, at);
        let (w, h) = super::draw::text_extent(&text);
        let zoom = self.params.zoom;
        let rect = ScreenRect::new(view.x, view.y, view.x + zoom.apply_to(w), view.y + zoom.apply_to(h));
        if !rect.intersects(&self.dpi) || self.is_full() {
            return false;
        }
        self.labels.push(PaintLabel {
            text,
            view_pos: view,
            colour,
            map_pos: self.current.map_pos,
            source: self.current.source,
        });
        true
    }

    // --- GENERATION ---

    /// Sweep every tile and entity that can reach the session rectangle.
    pub fn generate(&mut self, ctx: &PaintContext) {
        count_call!(FUNCTION_COUNTERS.sessions_generated);
        let dpi = self.dpi;
        let map_tile = IVec2::new(dpi.left & TILE_MASK, (dpi.top - 16) & TILE_MASK);
        let half_x = map_tile.x >> 1;
        let rows = (dpi.height() + SWEEP_OVERSCAN) >> 5;
        let my = map_tile.y;
        let t = TILE_SIZE;

        match self.params.rotation & 3 {
            0 => {
                let mut x = (my - half_x) & TILE_MASK;
                let mut y = (my + half_x) & TILE_MASK;
                for _ in 0..rows {
                    self.paint_tile(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x - t, y + t));
                    self.paint_tile(ctx, IVec2::new(x, y + t));
                    self.paint_entities(ctx, IVec2::new(x, y + t));
                    x += t;
                    self.paint_entities(ctx, IVec2::new(x, y));
                    y += t;
                }
            }
            1 => {
                let mut x = (-my - half_x) & TILE_MASK;
                let mut y = (my - half_x - 16) & TILE_MASK;
                for _ in 0..rows {
                    self.paint_tile(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x - t, y - t));
                    self.paint_tile(ctx, IVec2::new(x - t, y));
                    self.paint_entities(ctx, IVec2::new(x - t, y));
                    y += t;
                    self.paint_entities(ctx, IVec2::new(x, y));
                    x -= t;
                }
            }
            2 => {
                let mut x = (-my + half_x) & TILE_MASK;
                let mut y = (-my - half_x) & TILE_MASK;
                for _ in 0..rows {
                    self.paint_tile(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x + t, y - t));
                    self.paint_tile(ctx, IVec2::new(x, y - t));
                    self.paint_entities(ctx, IVec2::new(x, y - t));
                    x -= t;
                    self.paint_entities(ctx, IVec2::new(x, y));
                    y -= t;
                }
            }
            _ => {
                let mut x = (my + half_x) & TILE_MASK;
                let mut y = (-my + half_x - 16) & TILE_MASK;
                for _ in 0..rows {
                    self.paint_tile(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x, y));
                    self.paint_entities(ctx, IVec2::new(x + t, y + t));
                    self.paint_tile(ctx, IVec2::new(x + t, y));
                    self.paint_entities(ctx, IVec2::new(x + t, y));
                    y -= t;
                    self.paint_entities(ctx, IVec2::new(x, y));
                    x += t;
                }
            }
        }
        self.last_parent = None;
    }

    fn paint_tile(&mut self, ctx: &PaintContext, pos: IVec2) {
        let Some(elements) = ctx.world.tile_elements(pos) else {
            log::trace!("No tile elements at {:?}", pos);
            return;
        };
        let clip = self.params.flags.contains(ViewFlags::CLIP_VIEW);
        for (index, element) in elements.iter().enumerate() {
            if clip && element.base_z > self.params.clip_height {
                continue;
            }
            let source = WorldRef::TileElement {
                tile: pos / TILE_SIZE,
                index,
            };
            self.paint_element(ctx, pos, source, element);
        }
    }

    /// Begin an element under a category; `false` when the flags hide it completely
    fn begin_category(&mut self, pos: IVec2, item: InteractionItem, source: WorldRef, category: PaintCategory) -> bool {
        let visibility = classify(category, self.params.flags);
        self.begin_element(pos, item, source, visibility);
        visibility != VisibilityKind::Hidden
    }

    fn paint_element(&mut self, ctx: &PaintContext, pos: IVec2, source: WorldRef, element: &TileElement) {
        let sprites = ctx.sprites;
        let flags = self.params.flags;
        let anchor = element.anchor(pos);
        let (origin, size) = element.bounds(pos);
        let bounds = BoundBox::new(origin, size);

        match element.kind {
            TileElementKind::Surface { edge, water_z } => {
                if !self.begin_category(pos, InteractionItem::Terrain, source, PaintCategory::Terrain) {
                    return;
                }
                self.add_parent(sprites, element.image, anchor, bounds);
                if let Some(edge) = edge.filter(|_| !flags.contains(ViewFlags::HIDE_VERTICAL)) {
                    self.attach_to_previous(edge, IVec2::ZERO);
                }
                if flags.contains(ViewFlags::GRIDLINES) {
                    if let Some(gridline) = sprites.overlays.gridline {
                        self.attach_to_previous(gridline, IVec2::ZERO);
                    }
                }
                if flags.contains(ViewFlags::LAND_HEIGHTS) {
                    let units = ctx.settings.height_labels;
                    let colour = match units.marker_offset() / 256 {
                        0 => PaletteIndex::WHITE,
                        1 => PaletteIndex::YELLOW,
                        _ => PaletteIndex::CYAN,
                    };
                    self.add_label(units.format(element.base_z), anchor, colour);
                }
                if let (Some(water_z), Some(water)) = (water_z, sprites.overlays.water) {
                    if water_z > element.base_z {
                        let water_anchor = anchor.truncate().extend(water_z);
                        let water_bounds = BoundBox::new(pos.extend(water_z), IVec3::new(32, 32, 1));
                        self.add_child(sprites, water, water_anchor, water_bounds);
                    }
                }
            }
            TileElementKind::Path => {
                if self.begin_category(pos, InteractionItem::Footpath, source, PaintCategory::Path) {
                    self.add_parent(sprites, element.image, anchor, bounds);
                }
            }
            TileElementKind::Track {
                supports,
                station_lights,
                ..
            } => {
                if self.begin_category(pos, InteractionItem::Ride, source, PaintCategory::Ride) {
                    self.add_parent(sprites, element.image, anchor, bounds);
                    if let Some(lights) = station_lights {
                        self.attach_to_previous(lights, IVec2::new(0, -4));
                    }
                }
                let ground = ctx.world.surface_height(pos);
                if let Some(supports) = supports.filter(|_| element.base_z > ground) {
                    if self.begin_category(pos, InteractionItem::Ride, source, PaintCategory::Supports) {
                        let support_bounds = BoundBox::new(
                            IVec3::new(pos.x + 4, pos.y + 4, ground),
                            IVec3::new(24, 24, element.base_z - ground),
                        );
                        self.add_parent(sprites, supports, anchor, support_bounds);
                    }
                }
            }
            TileElementKind::SmallScenery { vegetation } => {
                let category = if vegetation {
                    PaintCategory::Vegetation
                } else {
                    PaintCategory::Scenery
                };
                if self.begin_category(pos, InteractionItem::Scenery, source, category) {
                    self.add_parent(sprites, element.image, anchor, bounds);
                }
            }
            TileElementKind::Entrance { .. } => {
                if self.begin_category(pos, InteractionItem::Ride, source, PaintCategory::Ride) {
                    self.add_parent(sprites, element.image, anchor, bounds);
                }
            }
            TileElementKind::Wall => {
                if self.begin_category(pos, InteractionItem::Wall, source, PaintCategory::Wall) {
                    self.add_parent(sprites, element.image, anchor, bounds);
                }
            }
            TileElementKind::LargeScenery { .. } => {
                if self.begin_category(pos, InteractionItem::LargeScenery, source, PaintCategory::Scenery) {
                    self.add_parent(sprites, element.image, anchor, bounds);
                }
            }
            TileElementKind::Banner { .. } => {
                if self.begin_category(pos, InteractionItem::Banner, source, PaintCategory::Scenery) {
                    self.add_parent(sprites, element.image, anchor, bounds);
                }
            }
        }
    }

    fn paint_entities(&mut self, ctx: &PaintContext, pos: IVec2) {
        if ctx.design_preview || self.params.flags.contains(ViewFlags::HIDE_ENTITIES) {
            return;
        }
        if !ctx.world.in_bounds(pos) {
            return;
        }
        let clip = self.params.flags.contains(ViewFlags::CLIP_VIEW);
        let sprites = ctx.sprites;

        for entity in ctx.world.entities_near(pos) {
            let Some(location) = entity.location else {
                continue;
            };
            if clip && location.z > self.params.clip_height {
                continue;
            }
            let source = WorldRef::Entity(entity.id);
            let category = match entity.kind {
                EntityKind::MoneyEffect { amount } => {
                    self.begin_element(pos, InteractionItem::Label, source, VisibilityKind::Visible);
                    let text = if amount < 0 {
                        format!("-${}", -amount)
                    } else {
                        format!("${amount}")
                    };
                    self.add_label(text, location, PaletteIndex::YELLOW);
                    continue;
                }
                EntityKind::Guest(_) => PaintCategory::Guest,
                EntityKind::Staff { .. } => PaintCategory::Staff,
                EntityKind::Vehicle { .. } => PaintCategory::Vehicle,
                EntityKind::Litter | EntityKind::Misc => PaintCategory::Other,
            };
            if !self.begin_category(pos, InteractionItem::Entity, source, category) {
                continue;
            }
            let Some((origin, size)) = entity.bounds() else {
                continue;
            };
            let bounds = BoundBox::new(origin, size);
            self.add_parent(sprites, entity.image, location, bounds);
            if let EntityKind::Vehicle { riders: Some(riders) } = entity.kind {
                self.add_child(sprites, riders, location + IVec3::new(0, 0, 4), bounds);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderSettings;
    use crate::sprite::Sprite;
    use crate::viewport::ZoomLevel;
    use crate::world::World;

    fn params(rotation: u8) -> ViewParams {
        ViewParams {
            zoom: ZoomLevel::default(),
            rotation,
            flags: ViewFlags::empty(),
            clip_height: i32::MAX,
        }
    }

    fn square_store() -> (SpriteStore, ImageId) {
        let mut store = SpriteStore::new(crate::sprite::procedural::demo_palette());
        let image = store.add(Sprite::bitmap(4, 4, -2, -2, vec![1; 16]));
        (store, image)
    }

    #[test]
    fn test_quadrant_hash_and_prepend() {
        let (store, image) = square_store();
        let mut session = PaintSession::new(ScreenRect::new(-100, -100, 100, 100), params(0));
        let a = session
            .add_parent(&store, image, IVec3::ZERO, BoundBox::new(IVec3::new(32, 32, 0), IVec3::ONE))
            .expect("on screen");
        let b = session
            .add_parent(&store, image, IVec3::ZERO, BoundBox::new(IVec3::new(40, 30, 0), IVec3::ONE))
            .expect("on screen");
        // Both hash to 64 / 32 = 2; the later struct heads the bucket
        assert_eq!(session.structs[a as usize].quadrant_index, 2);
        assert_eq!(session.quadrants[2], Some(b));
        assert_eq!(session.structs[b as usize].next_quadrant, Some(a));
    }

    #[test]
    fn test_offscreen_and_missing_sprites_are_skipped() {
        let (store, image) = square_store();
        let mut session = PaintSession::new(ScreenRect::new(0, 0, 32, 32), params(0));
        let far = IVec3::new(0, 500, 0);
        assert!(session.add_parent(&store, image, far, BoundBox::default()).is_none());
        assert!(session
            .add_parent(&store, ImageId::new(99), IVec3::ZERO, BoundBox::default())
            .is_none());
        assert!(session.is_empty());
        // No parent, nothing to attach to
        assert!(!session.attach_to_previous(image, IVec2::ZERO));
    }

    #[test]
    fn test_child_without_parent_becomes_parent() {
        let (store, image) = square_store();
        let mut session = PaintSession::new(ScreenRect::new(-50, -50, 50, 50), params(0));
        let first = session.add_child(&store, image, IVec3::ZERO, BoundBox::default());
        assert!(first.is_some());
        let child = session.add_child(&store, image, IVec3::ZERO, BoundBox::default());
        assert_eq!(session.structs[first.unwrap() as usize].children, child);
        assert!(session.attach_to_previous(image, IVec2::new(1, 1)));
        assert_eq!(session.attachments(child.unwrap()).count(), 1);
    }

    #[test]
    fn test_arena_capacity_drops_extra() {
        let (store, image) = square_store();
        let mut session = PaintSession::new(ScreenRect::new(-50, -50, 50, 50), params(0));
        for _ in 0..PAINT_ARENA_CAPACITY + 25 {
            session.add_parent(&store, image, IVec3::ZERO, BoundBox::default());
        }
        assert_eq!(session.len(), PAINT_ARENA_CAPACITY);
        assert_eq!(session.dropped(), 25);
    }

    #[test]
    fn test_generation_emits_surface_for_covering_column() {
        let (store, images) = SpriteStore::procedural();
        let mut world = World::new(8);
        world.push_element(IVec2::new(2, 2), TileElement::surface(0, images.grass));
        let settings = RenderSettings::default();
        let ctx = PaintContext::new(&world, &store, &settings);
        // Tile (2, 2) centre (80, 80) projects to (0, 80)
        let mut session = PaintSession::new(ScreenRect::new(0, 64, 32, 96), params(0));
        session.generate(&ctx);
        let terrain: Vec<_> = session.structs[1..]
            .iter()
            .filter(|ps| ps.item == InteractionItem::Terrain)
            .collect();
        assert_eq!(terrain.len(), 1);
        assert_eq!(terrain[0].source, WorldRef::TileElement { tile: IVec2::new(2, 2), index: 0 });
        assert_eq!(terrain[0].map_pos, IVec2::new(64, 64));
    }

    #[test]
    fn test_hidden_categories_emit_nothing() {
        let (store, images) = SpriteStore::procedural();
        let mut world = World::new(8);
        world.push_element(IVec2::new(2, 2), TileElement::surface(0, images.grass));
        let settings = RenderSettings::default();
        let ctx = PaintContext::new(&world, &store, &settings);
        let mut p = params(0);
        p.flags = ViewFlags::HIDE_BASE;
        let mut session = PaintSession::new(ScreenRect::new(0, 64, 32, 96), p);
        session.generate(&ctx);
        assert!(session.is_empty());
    }
}
