/// Software painter for isometric viewports
/// Generation and arrangement build per-column paint sessions, the draw pass
/// rasterizes them into column buffers and the scheduler fans both out.
pub mod arrange;
pub mod columns;
pub mod draw;
pub mod framebuffer;
pub mod paint;

pub use arrange::in_front_of;
pub use columns::{plan_columns, BackendCapabilities, Column, Renderer, WorkerPool, COLUMN_WIDTH};
pub use draw::{draw_session, ColumnTarget, ViewMapping};
pub use framebuffer::Framebuffer;
pub use paint::{
    AttachedPaint, BoundBox, PaintIndex, PaintLabel, PaintSession, PaintStruct, WorldRef,
    PAINT_ARENA_CAPACITY, QUADRANT_COUNT,
};

use crate::config::RenderSettings;
use crate::sprite::SpriteStore;
use crate::world::World;

/// Read-only inputs shared by every paint session of a frame
#[derive(Clone, Copy)]
pub struct PaintContext<'a> {
    pub world: &'a World,
    pub sprites: &'a SpriteStore,
    pub settings: &'a RenderSettings,
    /// Scenery design preview: entities and weather are left out
    pub design_preview: bool,
}

impl<'a> PaintContext<'a> {
    pub fn new(world: &'a World, sprites: &'a SpriteStore, settings: &'a RenderSettings) -> Self {
        Self {
            world,
            sprites,
            settings,
            design_preview: false,
        }
    }

    pub fn with_design_preview(mut self, design_preview: bool) -> Self {
        self.design_preview = design_preview;
        self
    }
}
