/// Viewports: on-screen cameras onto the world
///
/// A viewport maps a screen rectangle onto view space through a pan offset,
/// a zoom level and a camera rotation. The registry owns all viewports;
/// windows only keep [`ViewportId`] handles for lookup.
pub mod invalidation;
pub mod registry;
pub mod windows;

pub use invalidation::DirtyRegion;
pub use registry::{ViewportDesc, ViewportId, ViewportRegistry, MAX_VIEWPORT_COUNT};
pub use windows::{WindowId, WindowLayers};

use crate::camera::Camera;
use crate::projection::world_to_screen;
use bitflags::bitflags;
use glam::{IVec2, IVec3};

/// Signed zoom exponent. 0 is 1:1, positive shrinks, negative magnifies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoomLevel(i8);

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel(-2);
    pub const MAX: ZoomLevel = ZoomLevel(3);

    pub const fn new(level: i8) -> Self {
        let level = if level < Self::MIN.0 {
            Self::MIN.0
        } else if level > Self::MAX.0 {
            Self::MAX.0
        } else {
            level
        };
        ZoomLevel(level)
    }

    #[inline]
    pub const fn level(self) -> i8 {
        self.0
    }

    /// Screen length -> view length (floor for magnified levels)
    #[inline(always)]
    pub const fn apply_to(self, v: i32) -> i32 {
        if self.0 >= 0 {
            v << self.0
        } else {
            v >> -self.0
        }
    }

    /// Screen length -> view length, rounding up for magnified levels
    #[inline(always)]
    pub const fn apply_to_ceil(self, v: i32) -> i32 {
        if self.0 >= 0 {
            v << self.0
        } else {
            (v + (1 << -self.0) - 1) >> -self.0
        }
    }

    /// View length -> screen length (floor for shrunk levels)
    #[inline(always)]
    pub const fn apply_inverse(self, v: i32) -> i32 {
        if self.0 >= 0 {
            v >> self.0
        } else {
            v << -self.0
        }
    }

    /// Clears the low bits so view coordinates land on whole screen pixels
    #[inline(always)]
    pub const fn mask(self) -> i32 {
        if self.0 > 0 {
            !((1 << self.0) - 1)
        } else {
            !0
        }
    }

    /// Screen pixel span `[t0, t1)` whose view coordinates fall in `[v0, v0 + len)`,
    /// with `v0` relative to the screen origin's view coordinate.
    #[inline]
    pub const fn screen_span(self, v0: i32, len: i32) -> (i32, i32) {
        if self.0 >= 0 {
            let s = self.0;
            let round_up = (1 << s) - 1;
            ((v0 + round_up) >> s, (v0 + len + round_up) >> s)
        } else {
            let s = -self.0;
            (v0 << s, (v0 + len) << s)
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ViewFlags: u32 {
        const GRIDLINES            = 1 << 0;
        const UNDERGROUND_INSIDE   = 1 << 1;
        const HIDE_BASE            = 1 << 2;
        const HIDE_VERTICAL        = 1 << 3;
        const CLIP_VIEW            = 1 << 4;
        /// All entities are left out of generation
        const HIDE_ENTITIES        = 1 << 5;
        const LAND_HEIGHTS         = 1 << 6;
        const HIGHLIGHT_PATH_ISSUES = 1 << 7;
        const RENDERING_INHIBITED  = 1 << 8;
        const HIDE_RIDES           = 1 << 9;
        const INVISIBLE_RIDES      = 1 << 10;
        const HIDE_VEHICLES        = 1 << 11;
        const INVISIBLE_VEHICLES   = 1 << 12;
        const HIDE_SCENERY         = 1 << 13;
        const INVISIBLE_SCENERY    = 1 << 14;
        const HIDE_VEGETATION      = 1 << 15;
        const INVISIBLE_VEGETATION = 1 << 16;
        const HIDE_PATHS           = 1 << 17;
        const INVISIBLE_PATHS      = 1 << 18;
        const HIDE_SUPPORTS        = 1 << 19;
        const INVISIBLE_SUPPORTS   = 1 << 20;
        const HIDE_GUESTS          = 1 << 21;
        const HIDE_STAFF           = 1 << 22;
        /// Any of these makes a column start from a flat fill
        const PRE_CLEAR = Self::HIDE_VERTICAL.bits()
            | Self::HIDE_BASE.bits()
            | Self::UNDERGROUND_INSIDE.bits()
            | Self::CLIP_VIEW.bits();
    }
}

/// Cached result of the owning window's occlusion check
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Unknown,
    Visible,
    Covered,
}

/// Axis-aligned rectangle, `right`/`bottom` exclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_pos_size(pos: IVec2, size: IVec2) -> Self {
        Self::new(pos.x, pos.y, pos.x + size.x, pos.y + size.y)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    #[inline]
    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    #[inline]
    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    pub fn contains_rect(&self, other: &ScreenRect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let r = ScreenRect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!r.is_empty()).then_some(r)
    }

    pub fn union(&self, other: &ScreenRect) -> ScreenRect {
        ScreenRect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }
}

/// Parameters a paint session needs from its viewport; cheap to copy into workers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewParams {
    pub zoom: ZoomLevel,
    pub rotation: u8,
    pub flags: ViewFlags,
    /// Elements above this z are skipped under `CLIP_VIEW`
    pub clip_height: i32,
}

#[derive(Debug)]
pub struct Viewport {
    pub window: WindowId,
    /// Owned by the main window; never considered covered
    pub main: bool,
    /// Screen position and size in pixels
    pub pos: IVec2,
    pub size: IVec2,
    /// View-space coordinate shown at the top-left pixel
    pub view_pos: IVec2,
    pub zoom: ZoomLevel,
    pub rotation: u8,
    pub flags: ViewFlags,
    pub clip_height: i32,
    pub camera: Camera,
    pub(crate) visibility: Visibility,
    pub(crate) dirty: DirtyRegion,
}

impl Viewport {
    pub(crate) fn new(desc: &ViewportDesc) -> Self {
        Self {
            window: desc.window,
            main: desc.main,
            pos: desc.pos,
            size: desc.size.max(IVec2::ZERO),
            view_pos: IVec2::ZERO,
            zoom: desc.zoom,
            rotation: desc.rotation & 3,
            flags: ViewFlags::empty(),
            clip_height: i32::MAX,
            camera: Camera::default(),
            visibility: Visibility::Unknown,
            dirty: DirtyRegion::default(),
        }
    }

    #[inline]
    pub fn params(&self) -> ViewParams {
        ViewParams {
            zoom: self.zoom,
            rotation: self.rotation,
            flags: self.flags,
            clip_height: self.clip_height,
        }
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Size of the visible area in view units
    #[inline]
    pub fn view_size(&self) -> IVec2 {
        IVec2::new(self.zoom.apply_to(self.size.x), self.zoom.apply_to(self.size.y))
    }

    #[inline]
    pub fn screen_rect(&self) -> ScreenRect {
        ScreenRect::from_pos_size(self.pos, self.size)
    }

    #[inline]
    pub fn view_rect(&self) -> ScreenRect {
        ScreenRect::from_pos_size(self.view_pos, self.view_size())
    }

    /// Screen rectangle clipped to a display of `display` pixels; never negative
    pub fn clamped_screen_rect(&self, display: IVec2) -> ScreenRect {
        let r = self.screen_rect();
        let left = r.left.clamp(0, display.x.max(0));
        let top = r.top.clamp(0, display.y.max(0));
        ScreenRect::new(
            left,
            top,
            r.right.clamp(left, display.x.max(left)),
            r.bottom.clamp(top, display.y.max(top)),
        )
    }

    /// Zero-area viewports stay registered but draw nothing
    pub fn is_renderable(&self, display: IVec2) -> bool {
        !self.clamped_screen_rect(display).is_empty()
            && !self.flags.contains(ViewFlags::RENDERING_INHIBITED)
    }

    /// View coordinate under a screen pixel, `None` outside the viewport
    pub fn screen_to_view(&self, screen: IVec2) -> Option<IVec2> {
        if !self.screen_rect().contains(screen) {
            return None;
        }
        let rel = screen - self.pos;
        Some(self.view_pos + IVec2::new(self.zoom.apply_to(rel.x), self.zoom.apply_to(rel.y)))
    }

    /// Screen pixel showing a view coordinate (may be outside the viewport)
    pub fn view_to_screen(&self, view: IVec2) -> IVec2 {
        let rel = view - self.view_pos;
        self.pos + IVec2::new(self.zoom.apply_inverse(rel.x), self.zoom.apply_inverse(rel.y))
    }

    /// View coordinate at the centre of the viewport
    #[inline]
    pub fn view_centre(&self) -> IVec2 {
        self.view_pos + self.view_size() / 2
    }

    /// Top-left view position that centres `loc` in this viewport
    pub fn centre_on(&self, loc: IVec3) -> IVec2 {
        self.align(world_to_screen(self.rotation, loc) - self.view_size() / 2)
    }

    #[inline]
    fn align(&self, view: IVec2) -> IVec2 {
        IVec2::new(view.x & self.zoom.mask(), view.y & self.zoom.mask())
    }

    /// Pan so `view` is shown at the top-left; redraws the viewport when it moved.
    pub fn move_view(&mut self, view: IVec2) -> bool {
        let view = self.align(view);
        if view == self.view_pos {
            return false;
        }
        self.view_pos = view;
        self.invalidate();
        true
    }

    /// Change zoom keeping the view centre fixed
    pub fn set_zoom(&mut self, zoom: ZoomLevel) {
        let zoom = ZoomLevel::new(zoom.level());
        if zoom == self.zoom {
            return;
        }
        let centre = self.view_centre();
        let saved_centre = self.camera.saved_view + self.view_size() / 2;
        self.zoom = zoom;
        self.camera.saved_view = self.align(saved_centre - self.view_size() / 2);
        let target = self.align(centre - self.view_size() / 2);
        self.view_pos = target;
        self.invalidate();
    }

    /// Move or resize on screen; the view origin stays put
    pub fn set_screen_rect(&mut self, pos: IVec2, size: IVec2) {
        self.pos = pos;
        self.size = size.max(IVec2::ZERO);
        self.visibility = Visibility::Unknown;
        self.invalidate();
    }

    /// Mark the whole viewport for redraw; covered viewports are skipped
    pub fn invalidate(&mut self) {
        if self.visibility == Visibility::Covered {
            return;
        }
        let rect = self.screen_rect();
        if !rect.is_empty() {
            self.dirty.push(rect);
        }
    }

    pub fn dirty(&self) -> &DirtyRegion {
        &self.dirty
    }

    /// Hand the accumulated dirty rectangles to the renderer
    pub fn take_dirty(&mut self) -> Vec<ScreenRect> {
        self.dirty.take()
    }
}
