/// Rasterization of arranged paint sessions
///
/// Each column owns a small colour buffer:
/// it is filled independently of every other column and copied into the
/// framebuffer once at the end. Sprites are sampled per screen pixel through
/// the zoom so magnified and shrunk views stay pixel exact.
use super::framebuffer::Framebuffer;
use super::paint::PaintSession;
use super::PaintContext;
use crate::count_add;
use crate::count_call;
use crate::interaction::{InteractionItem, VisibilityKind};
use crate::perf::FUNCTION_COUNTERS;
use crate::sprite::{ImageId, PaletteIndex, Sprite};
use crate::viewport::{ScreenRect, ViewFlags, Viewport, ZoomLevel};
use glam::IVec2;

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;

/// Rows of a 3x5 glyph, bit 2 is the leftmost pixel
fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '$' => [0b011, 0b110, 0b010, 0b011, 0b110],
        'f' => [0b011, 0b010, 0b111, 0b010, 0b010],
        't' => [0b010, 0b111, 0b010, 0b010, 0b011],
        'm' => [0b000, 0b000, 0b111, 0b111, 0b101],
        _ => return None,
    };
    Some(rows)
}

/// Size of a label in screen pixels
pub fn text_extent(text: &str) -> (i32, i32) {
    let chars = text.chars().count() as i32;
    if chars == 0 {
        (0, 0)
    } else {
        (chars * GLYPH_ADVANCE - 1, GLYPH_HEIGHT)
    }
}

/// How a viewport maps screen pixels to view coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewMapping {
    /// View coordinate at `screen_origin`
    pub view_origin: IVec2,
    pub screen_origin: IVec2,
    pub zoom: ZoomLevel,
}

impl ViewMapping {
    pub fn of(viewport: &Viewport) -> Self {
        Self {
            view_origin: viewport.view_pos,
            screen_origin: viewport.pos,
            zoom: viewport.zoom,
        }
    }

    #[inline]
    fn view_x(&self, screen_x: i32) -> i32 {
        self.view_origin.x + self.zoom.apply_to(screen_x - self.screen_origin.x)
    }

    #[inline]
    fn view_y(&self, screen_y: i32) -> i32 {
        self.view_origin.y + self.zoom.apply_to(screen_y - self.screen_origin.y)
    }

    /// Screen pixel showing a view coordinate
    #[inline]
    fn screen(&self, view: IVec2) -> IVec2 {
        let rel = view - self.view_origin;
        self.screen_origin + IVec2::new(self.zoom.apply_inverse(rel.x), self.zoom.apply_inverse(rel.y))
    }
}

/// View-space top-left pixel of a sprite drawn at `anchor`.
///
/// Entities are snapped to the zoom step so they do not shimmer while moving.
#[inline]
pub fn sprite_top_left(anchor: IVec2, sprite: &Sprite, item: InteractionItem, zoom: ZoomLevel) -> IVec2 {
    let anchor = if item == InteractionItem::Entity && zoom.level() > 0 {
        IVec2::new(anchor.x & zoom.mask(), anchor.y & zoom.mask())
    } else {
        anchor
    };
    anchor + IVec2::new(sprite.x_offset, sprite.y_offset)
}

/// 50% mix used for see-through structs
#[inline(always)]
fn blend_half(dst: u32, src: u32) -> u32 {
    (((dst & 0x00FE_FEFE) >> 1) + ((src & 0x00FE_FEFE) >> 1)) | 0xFF00_0000
}

/// Scale the RGB channels by `num / den`
#[inline(always)]
fn darken(color: u32, num: u32, den: u32) -> u32 {
    let r = ((color >> 16) & 0xFF) * num / den;
    let g = ((color >> 8) & 0xFF) * num / den;
    let b = (color & 0xFF) * num / den;
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

/// Colour buffer of one column, in absolute screen coordinates
pub struct ColumnTarget {
    pub x0: i32,
    pub y0: i32,
    pub width: usize,
    pub height: usize,
    pub color: Box<[u32]>,
}

impl ColumnTarget {
    pub fn new(rect: ScreenRect) -> Self {
        let width = rect.width() as usize;
        let height = rect.height() as usize;
        Self {
            x0: rect.left,
            y0: rect.top,
            width,
            height,
            color: vec![0xFF00_0000; width * height].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn rect(&self) -> ScreenRect {
        ScreenRect::new(
            self.x0,
            self.y0,
            self.x0 + self.width as i32,
            self.y0 + self.height as i32,
        )
    }

    #[inline]
    pub fn clear(&mut self, color: u32) {
        self.color.fill(color);
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        (y - self.y0) as usize * self.width + (x - self.x0) as usize
    }

    /// Copy the column into the framebuffer, clipping to its size.
    pub fn flush_to_framebuffer(&self, framebuffer: &mut Framebuffer) {
        let Some(clip) = self.rect().intersect(&framebuffer.rect()) else {
            return;
        };
        let span = clip.width() as usize;
        for y in clip.top..clip.bottom {
            let src = self.index(clip.left, y);
            let dst = y as usize * framebuffer.width + clip.left as usize;
            framebuffer.color_buffer[dst..dst + span].copy_from_slice(&self.color[src..src + span]);
        }
    }

    /// Draw one sprite with its top-left at view position `top_left`.
    fn blit(
        &mut self,
        ctx: &PaintContext,
        image: ImageId,
        top_left: IVec2,
        see_through: bool,
        mapping: &ViewMapping,
    ) -> usize {
        let sprites = ctx.sprites;
        let Some(sprite) = sprites.get(image) else {
            return 0;
        };
        let remap = sprites.remap(image);
        let zoom = mapping.zoom;
        let (sx0, sx1) = zoom.screen_span(top_left.x - mapping.view_origin.x, sprite.width);
        let (sy0, sy1) = zoom.screen_span(top_left.y - mapping.view_origin.y, sprite.height);
        let bounds = self.rect();
        let x_start = (mapping.screen_origin.x + sx0).max(bounds.left);
        let x_end = (mapping.screen_origin.x + sx1).min(bounds.right);
        let y_start = (mapping.screen_origin.y + sy0).max(bounds.top);
        let y_end = (mapping.screen_origin.y + sy1).min(bounds.bottom);

        let mut written = 0;
        for ty in y_start..y_end {
            let ly = mapping.view_y(ty) - top_left.y;
            let row = self.index(x_start, ty);
            for (i, tx) in (x_start..x_end).enumerate() {
                let lx = mapping.view_x(tx) - top_left.x;
                let Some(src) = sprites.color_at(sprite, remap, lx, ly) else {
                    continue;
                };
                let dst = &mut self.color[row + i];
                *dst = if see_through { blend_half(*dst, src) } else { src };
                written += 1;
            }
        }
        written
    }

    fn draw_text(&mut self, text: &str, at: IVec2, color: u32) {
        let bounds = self.rect();
        for (n, c) in text.chars().enumerate() {
            let Some(rows) = glyph(c) else {
                continue;
            };
            let gx = at.x + n as i32 * GLYPH_ADVANCE;
            for (dy, bits) in rows.iter().enumerate() {
                for dx in 0..GLYPH_WIDTH {
                    if bits & (0b100 >> dx) == 0 {
                        continue;
                    }
                    let p = IVec2::new(gx + dx, at.y + dy as i32);
                    if bounds.contains(p) {
                        let index = self.index(p.x, p.y);
                        self.color[index] = color;
                    }
                }
            }
        }
    }
}

/// Weather gloom multiplier for a session, `None` when no gloom applies
fn gloom_factor(session: &PaintSession, ctx: &PaintContext) -> Option<(u32, u32)> {
    let flags = session.params.flags;
    let enabled = ctx.settings.render_weather_gloom
        && !ctx.design_preview
        && !flags.intersects(ViewFlags::HIDE_ENTITIES | ViewFlags::HIGHLIGHT_PATH_ISSUES);
    match ctx.world.weather_gloom {
        0 => None,
        _ if !enabled => None,
        1 => Some((3, 4)),
        _ => Some((1, 2)),
    }
}

/// Rasterize an arranged session into its column.
pub fn draw_session(target: &mut ColumnTarget, session: &PaintSession, ctx: &PaintContext, mapping: &ViewMapping) {
    count_call!(FUNCTION_COUNTERS.columns_drawn);
    let palette = &ctx.sprites.palette;
    let flags = session.params.flags;
    let zoom = mapping.zoom;

    // --- PHASE 1: PRE-CLEAR ---
    if flags.intersects(ViewFlags::PRE_CLEAR) {
        let fill = if flags.contains(ViewFlags::HIDE_ENTITIES) {
            PaletteIndex::BLACK
        } else {
            PaletteIndex::CLEAR_FILL
        };
        target.clear(palette.argb(fill));
        count_call!(FUNCTION_COUNTERS.column_clears);
    }

    // --- PHASE 2: STRUCTS ---
    let mut written = 0;
    for index in session.draw_order() {
        let Some(ps) = session.get(index) else {
            continue;
        };
        let see_through = ps.visibility == VisibilityKind::Partial;
        if let Some(sprite) = ctx.sprites.get(ps.image) {
            let top_left = sprite_top_left(ps.screen, sprite, ps.item, zoom);
            written += target.blit(ctx, ps.image, top_left, see_through, mapping);
        }
        for attached in session.attachments(index) {
            let Some(sprite) = ctx.sprites.get(attached.image) else {
                continue;
            };
            let top_left = sprite_top_left(ps.screen + attached.offset, sprite, ps.item, zoom);
            written += target.blit(ctx, attached.image, top_left, see_through, mapping);
        }
    }
    count_add!(FUNCTION_COUNTERS.pixels_written, written);

    // --- PHASE 3: GLOOM ---
    if let Some((num, den)) = gloom_factor(session, ctx) {
        for pixel in target.color.iter_mut() {
            *pixel = darken(*pixel, num, den);
        }
    }

    // --- PHASE 4: LABELS ---
    for label in session.labels() {
        let at = mapping.screen(label.view_pos);
        target.draw_text(&label.text, at, palette.argb(label.colour));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_extent() {
        assert_eq!(text_extent(""), (0, 0));
        assert_eq!(text_extent("7"), (3, 5));
        assert_eq!(text_extent("-$25"), (15, 5));
    }

    #[test]
    fn test_blend_and_darken() {
        assert_eq!(blend_half(0xFF00_0000, 0xFFFF_FFFF), 0xFF7F_7F7F);
        assert_eq!(darken(0xFF80_4020, 3, 4), 0xFF60_3018);
        assert_eq!(darken(0xFF80_4020, 1, 2), 0xFF40_2010);
    }

    #[test]
    fn test_entities_snap_only_when_shrunk() {
        let sprite = Sprite::bitmap(2, 2, -1, -1, vec![1; 4]);
        let anchor = IVec2::new(13, 7);
        let z2 = ZoomLevel::new(2);
        assert_eq!(sprite_top_left(anchor, &sprite, InteractionItem::Entity, z2), IVec2::new(11, 3));
        assert_eq!(sprite_top_left(anchor, &sprite, InteractionItem::Terrain, z2), IVec2::new(12, 6));
        assert_eq!(
            sprite_top_left(anchor, &sprite, InteractionItem::Entity, ZoomLevel::new(-1)),
            IVec2::new(12, 6)
        );
    }

    #[test]
    fn test_flush_copies_rows() {
        let mut target = ColumnTarget::new(ScreenRect::new(2, 1, 4, 3));
        target.clear(9);
        let mut fb = Framebuffer::new(5, 5);
        target.flush_to_framebuffer(&mut fb);
        assert_eq!(fb.pixel(2, 1), Some(9));
        assert_eq!(fb.pixel(3, 2), Some(9));
        assert_eq!(fb.pixel(4, 2), Some(0));
        assert_eq!(fb.pixel(2, 3), Some(0));
    }

    #[test]
    fn test_text_is_clipped_to_column() {
        let mut target = ColumnTarget::new(ScreenRect::new(0, 0, 2, 5));
        target.draw_text("0", IVec2::new(0, 0), 5);
        // Left and middle columns of the glyph land, the right one is outside
        assert_eq!(target.color[0], 5);
        assert_eq!(target.color[1], 5);
        assert_eq!(target.color[2 * 2 + 1], 0xFF00_0000);
    }
}
