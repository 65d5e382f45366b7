/// Dirty-rectangle tracking for viewports
///
/// World mutations arrive as cuboids in world space. Each live viewport
/// projects the cuboid with its own rotation, clips it to what it shows and
/// records the result in screen pixels. Viewports whose window is covered by
/// another window skip the work entirely until their visibility is reset.
use super::{ScreenRect, Viewport, ViewportId, ViewportRegistry, Visibility, WindowLayers, ZoomLevel};
use crate::count_call;
use crate::perf::FUNCTION_COUNTERS;
use crate::projection::world_to_screen;
use glam::{IVec2, IVec3};

/// Screen-space margin added around a projected tile for sprite overhang
pub const INVALIDATION_MARGIN: i32 = 32;

/// Accumulated dirty rectangles of one viewport, in screen pixels
#[derive(Debug, Default, Clone)]
pub struct DirtyRegion {
    rects: Vec<ScreenRect>,
}

impl DirtyRegion {
    /// Add a rectangle, dropping it when an existing one already covers it
    /// and absorbing existing ones it covers.
    pub fn push(&mut self, rect: ScreenRect) {
        if rect.is_empty() || self.rects.iter().any(|r| r.contains_rect(&rect)) {
            return;
        }
        self.rects.retain(|r| !rect.contains_rect(r));
        self.rects.push(rect);
    }

    pub fn rects(&self) -> &[ScreenRect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn pixel_count(&self) -> i64 {
        self.rects.iter().map(ScreenRect::area).sum()
    }

    pub fn bounds(&self) -> Option<ScreenRect> {
        self.rects.iter().copied().reduce(|a, b| a.union(&b))
    }

    /// Drain the rectangles, merging overlapping ones so no pixel is drawn twice
    pub fn take(&mut self) -> Vec<ScreenRect> {
        let mut rects = std::mem::take(&mut self.rects);
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..rects.len() {
                for j in i + 1..rects.len() {
                    if rects[i].intersects(&rects[j]) {
                        let other = rects.swap_remove(j);
                        rects[i] = rects[i].union(&other);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
        rects
    }
}

/// Screen-aligned view rectangle covering a world cuboid on one tile
pub fn cuboid_view_rect(rotation: u8, x: i32, y: i32, z0: i32, z1: i32) -> ScreenRect {
    let centre = world_to_screen(rotation, IVec3::new(x + 16, y + 16, 0));
    ScreenRect::new(
        centre.x - INVALIDATION_MARGIN,
        centre.y - INVALIDATION_MARGIN - z1,
        centre.x + INVALIDATION_MARGIN,
        centre.y + INVALIDATION_MARGIN - z0,
    )
}

/// Resolve the cached visibility, asking the window stack when unknown
fn resolve_visibility(viewport: &mut Viewport, windows: &WindowLayers) -> Visibility {
    if viewport.visibility == Visibility::Unknown {
        viewport.visibility = if viewport.main || windows.is_visible(viewport.window) {
            Visibility::Visible
        } else {
            Visibility::Covered
        };
    }
    viewport.visibility
}

/// Clip a view-space rectangle to the viewport and record it in screen pixels
fn invalidate_view_rect(viewport: &mut Viewport, windows: &WindowLayers, view: ScreenRect) -> bool {
    if resolve_visibility(viewport, windows) == Visibility::Covered {
        count_call!(FUNCTION_COUNTERS.invalidations_culled);
        return false;
    }
    let Some(clipped) = view.intersect(&viewport.view_rect()) else {
        count_call!(FUNCTION_COUNTERS.invalidations_culled);
        return false;
    };

    let zoom = viewport.zoom;
    let rel = IVec2::new(clipped.left, clipped.top) - viewport.view_pos;
    let rel_end = IVec2::new(clipped.right, clipped.bottom) - viewport.view_pos;
    let (left, right) = zoom.screen_span(rel.x, rel_end.x - rel.x);
    let (top, bottom) = zoom.screen_span(rel.y, rel_end.y - rel.y);
    // A shrunk view can collapse a sliver to zero pixels; keep at least the covering pixel
    let rect = ScreenRect::new(
        viewport.pos.x + left.min(zoom.apply_inverse(rel.x)),
        viewport.pos.y + top.min(zoom.apply_inverse(rel.y)),
        viewport.pos.x + right,
        viewport.pos.y + bottom,
    );
    let Some(rect) = rect.intersect(&viewport.screen_rect()) else {
        count_call!(FUNCTION_COUNTERS.invalidations_culled);
        return false;
    };
    viewport.dirty.push(rect);
    count_call!(FUNCTION_COUNTERS.invalidations);
    true
}

impl ViewportRegistry {
    /// Mark the screen area of a world cuboid dirty in every viewport.
    ///
    /// `max_zoom` limits the affected viewports to those zoomed in at least
    /// that far; `None` affects all. Returns the number of viewports touched.
    pub fn invalidate_world_cuboid(
        &mut self,
        windows: &WindowLayers,
        pos: IVec2,
        z0: i32,
        z1: i32,
        max_zoom: Option<ZoomLevel>,
    ) -> usize {
        let mut touched = 0;
        for (_, viewport) in self.iter_mut() {
            if viewport.size.x <= 0 || viewport.size.y <= 0 {
                continue;
            }
            if max_zoom.is_some_and(|max| viewport.zoom > max) {
                continue;
            }
            let view = cuboid_view_rect(viewport.rotation, pos.x, pos.y, z0, z1);
            if invalidate_view_rect(viewport, windows, view) {
                touched += 1;
            }
        }
        touched
    }

    /// Invalidate a whole tile column from its base up to `z1`
    pub fn invalidate_tile(&mut self, windows: &WindowLayers, tile: IVec2, z0: i32, z1: i32) -> usize {
        self.invalidate_world_cuboid(windows, tile * crate::projection::TILE_SIZE, z0, z1, None)
    }

    /// Mark a rectangle given in screen pixels dirty in one viewport.
    pub fn invalidate_screen_rect(&mut self, windows: &WindowLayers, id: ViewportId, rect: ScreenRect) -> bool {
        let Some(viewport) = self.get_mut(id) else {
            return false;
        };
        if resolve_visibility(viewport, windows) == Visibility::Covered {
            count_call!(FUNCTION_COUNTERS.invalidations_culled);
            return false;
        }
        match rect.intersect(&viewport.screen_rect()) {
            Some(clipped) => {
                viewport.dirty.push(clipped);
                count_call!(FUNCTION_COUNTERS.invalidations);
                true
            }
            None => {
                count_call!(FUNCTION_COUNTERS.invalidations_culled);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_region_absorbs_contained() {
        let mut region = DirtyRegion::default();
        region.push(ScreenRect::new(10, 10, 20, 20));
        region.push(ScreenRect::new(12, 12, 14, 14));
        assert_eq!(region.rects().len(), 1);
        region.push(ScreenRect::new(0, 0, 40, 40));
        assert_eq!(region.rects(), &[ScreenRect::new(0, 0, 40, 40)]);
        region.push(ScreenRect::new(5, 5, 5, 9));
        assert_eq!(region.rects().len(), 1);
    }

    #[test]
    fn test_take_merges_overlaps() {
        let mut region = DirtyRegion::default();
        region.push(ScreenRect::new(0, 0, 10, 10));
        region.push(ScreenRect::new(5, 5, 15, 15));
        region.push(ScreenRect::new(100, 100, 110, 110));
        let mut rects = region.take();
        rects.sort_by_key(|r| r.left);
        assert_eq!(rects, vec![ScreenRect::new(0, 0, 15, 15), ScreenRect::new(100, 100, 110, 110)]);
        assert!(region.is_empty());
    }

    #[test]
    fn test_cuboid_rect_rotation_zero() {
        // Tile (32, 32): centre (48, 48) projects to (0, 48)
        let r = cuboid_view_rect(0, 32, 32, 0, 16);
        assert_eq!(r, ScreenRect::new(-32, 0, 32, 80));
    }
}
