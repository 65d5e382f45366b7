pub mod camera;
pub mod config;
pub mod interaction;
pub mod perf;
pub mod projection;
pub mod rendering;
/// Isometric Engine - viewport core of a tile-based isometric world renderer
/// Paint sessions, column scheduling, invalidation, picking and camera control
pub mod sprite;
pub mod viewport;
pub mod world;

pub use camera::{rotate_camera, smart_focus, Camera, Focus, ScrollController};
pub use config::{ConfigError, HeightLabelUnits, RenderSettings};
pub use interaction::{
    pick_at, pick_at_screen, screen_to_tile, InteractionItem, InteractionMask, PickResult, VisibilityKind,
};
pub use perf::{CounterSnapshot, FunctionCounters, PerfStats, PerfTimer, FUNCTION_COUNTERS};
pub use projection::{screen_to_world, world_to_screen, TileHit, TILE_SIZE};
pub use rendering::{BackendCapabilities, Framebuffer, PaintContext, PaintSession, Renderer, WorldRef};
pub use sprite::{ImageId, SpriteStore};
pub use viewport::{
    ScreenRect, ViewFlags, Viewport, ViewportDesc, ViewportId, ViewportRegistry, WindowId, WindowLayers, ZoomLevel,
};
pub use world::{EntityId, EntityKind, World, WorldConfig};
