/// Window stacking order as seen by the viewport core
/// Only rectangles and z-order matter here; window contents belong to the UI layer.
use super::ScreenRect;
use glam::IVec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u32);

#[derive(Clone, Copy, Debug)]
struct WindowEntry {
    id: WindowId,
    rect: ScreenRect,
    main: bool,
}

/// Opaque windows from bottom (index 0) to top
#[derive(Debug, Default)]
pub struct WindowLayers {
    windows: Vec<WindowEntry>,
}

impl WindowLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window on top of the stack; reopening an id replaces it.
    pub fn open(&mut self, id: WindowId, rect: ScreenRect, main: bool) {
        self.close(id);
        self.windows.push(WindowEntry { id, rect, main });
    }

    pub fn close(&mut self, id: WindowId) {
        self.windows.retain(|w| w.id != id);
    }

    pub fn set_rect(&mut self, id: WindowId, rect: ScreenRect) {
        if let Some(w) = self.windows.iter_mut().find(|w| w.id == id) {
            w.rect = rect;
        }
    }

    pub fn bring_to_front(&mut self, id: WindowId) {
        if let Some(at) = self.windows.iter().position(|w| w.id == id) {
            let entry = self.windows.remove(at);
            self.windows.push(entry);
        }
    }

    pub fn rect(&self, id: WindowId) -> Option<ScreenRect> {
        self.windows.iter().find(|w| w.id == id).map(|w| w.rect)
    }

    /// Topmost window under a screen point
    pub fn window_at(&self, p: IVec2) -> Option<WindowId> {
        self.windows.iter().rev().find(|w| w.rect.contains(p)).map(|w| w.id)
    }

    /// A window is covered when one window above it fully contains it.
    /// The main window is always visible; unknown windows count as visible.
    pub fn is_visible(&self, id: WindowId) -> bool {
        let Some(at) = self.windows.iter().position(|w| w.id == id) else {
            return true;
        };
        let entry = self.windows[at];
        if entry.main {
            return true;
        }
        !self.windows[at + 1..]
            .iter()
            .any(|above| above.rect.contains_rect(&entry.rect))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_requires_full_containment() {
        let mut layers = WindowLayers::new();
        layers.open(WindowId(0), ScreenRect::new(0, 0, 640, 480), true);
        layers.open(WindowId(1), ScreenRect::new(10, 10, 110, 110), false);
        layers.open(WindowId(2), ScreenRect::new(50, 50, 150, 150), false);
        assert!(layers.is_visible(WindowId(1)));

        layers.open(WindowId(3), ScreenRect::new(0, 0, 200, 200), false);
        assert!(!layers.is_visible(WindowId(1)));
        assert!(layers.is_visible(WindowId(0)));

        layers.bring_to_front(WindowId(1));
        assert!(layers.is_visible(WindowId(1)));
        assert_eq!(layers.window_at(IVec2::new(20, 20)), Some(WindowId(1)));
        assert_eq!(layers.window_at(IVec2::new(300, 300)), Some(WindowId(0)));
    }
}
