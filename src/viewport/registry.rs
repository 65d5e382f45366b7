/// Viewport registry: bounded, slot-stable storage for every live viewport
use super::{ViewFlags, Viewport, WindowId, WindowLayers, ZoomLevel};
use crate::camera::Focus;
use crate::config::RenderSettings;
use crate::world::World;
use glam::IVec2;

/// Hard limit on simultaneously live viewports
pub const MAX_VIEWPORT_COUNT: usize = 16;

/// Generational handle; stays valid until that viewport is removed and
/// never aliases a later viewport placed in the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewportId {
    slot: u16,
    generation: u32,
}

/// Creation request from the window layer
#[derive(Clone, Copy, Debug)]
pub struct ViewportDesc {
    pub window: WindowId,
    pub main: bool,
    pub pos: IVec2,
    pub size: IVec2,
    pub zoom: ZoomLevel,
    pub rotation: u8,
    pub focus: Focus,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    viewport: Option<Viewport>,
}

/// Fixed array of slots allocated up front; creation never moves live viewports.
#[derive(Debug)]
pub struct ViewportRegistry {
    slots: Vec<Slot>,
    live: usize,
}

impl Default for ViewportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportRegistry {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_VIEWPORT_COUNT);
        slots.resize_with(MAX_VIEWPORT_COUNT, Slot::default);
        Self { slots, live: 0 }
    }

    /// Create a viewport centred on `desc.focus`.
    ///
    /// Returns `None` without side effects when every slot is taken.
    pub fn create(&mut self, desc: ViewportDesc, world: &World, settings: &RenderSettings) -> Option<ViewportId> {
        let Some(slot) = self.slots.iter().position(|s| s.viewport.is_none()) else {
            log::error!("No more viewport slots left to allocate");
            return None;
        };

        let mut viewport = Viewport::new(&desc);
        if settings.always_show_gridlines {
            viewport.flags |= ViewFlags::GRIDLINES;
        }

        let centre = desc.focus.resolve(world);
        let view = viewport.centre_on(centre);
        viewport.view_pos = view;
        viewport.camera.saved_view = view;
        if let Focus::Entity(id) = desc.focus {
            viewport.camera.follow = Some(id);
        }
        viewport.invalidate();

        let entry = &mut self.slots[slot];
        entry.viewport = Some(viewport);
        self.live += 1;
        log::debug!("Viewport created in slot {} for window {:?}", slot, desc.window);
        Some(ViewportId {
            slot: slot as u16,
            generation: entry.generation,
        })
    }

    /// Remove a viewport; unknown or already removed ids are ignored.
    pub fn remove(&mut self, id: ViewportId) -> Option<Viewport> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let viewport = slot.viewport.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        Some(viewport)
    }

    /// Remove every viewport owned by `window`
    pub fn remove_window(&mut self, window: WindowId) {
        let ids: Vec<ViewportId> = self
            .iter()
            .filter(|(_, vp)| vp.window == window)
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            self.remove(id);
        }
    }

    pub fn get(&self, id: ViewportId) -> Option<&Viewport> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.viewport.as_ref()
    }

    pub fn get_mut(&mut self, id: ViewportId) -> Option<&mut Viewport> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.viewport.as_mut()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live viewports in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ViewportId, &Viewport)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.viewport.as_ref().map(|vp| {
                (
                    ViewportId {
                        slot: i as u16,
                        generation: s.generation,
                    },
                    vp,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ViewportId, &mut Viewport)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.viewport.as_mut().map(|vp| {
                (
                    ViewportId {
                        slot: i as u16,
                        generation,
                    },
                    vp,
                )
            })
        })
    }

    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(ViewportId, &mut Viewport),
    {
        for (id, vp) in self.iter_mut() {
            f(id, vp);
        }
    }

    /// Viewport under a screen point, honouring window stacking.
    ///
    /// Walks the windows under the point from the top and stops at the first
    /// one; its viewport is returned only if it also contains the point.
    pub fn find_at_screen_point(&self, windows: &WindowLayers, p: IVec2) -> Option<ViewportId> {
        if windows.is_empty() {
            return self
                .iter()
                .filter(|(_, vp)| vp.screen_rect().contains(p))
                .map(|(id, _)| id)
                .last();
        }
        let window = windows.window_at(p)?;
        self.iter()
            .find(|(_, vp)| vp.window == window && vp.screen_rect().contains(p))
            .map(|(id, _)| id)
    }

    /// Forget all cached visibility; call after windows move or restack.
    ///
    /// Viewports that were covered missed their redraws and are dirtied in full.
    pub fn reset_visibility(&mut self) {
        for (_, vp) in self.iter_mut() {
            let was_covered = vp.visibility == super::Visibility::Covered;
            vp.visibility = super::Visibility::Unknown;
            if was_covered {
                vp.invalidate();
            }
        }
    }
}
