/// Column scheduler
///
/// A dirty region is cut into vertical strips aligned to 32 view pixels.
/// Every strip gets its own paint session, so strips share nothing and can be
/// generated, arranged and rasterized on any thread. Results are always
/// collected in strip order and flushed sequentially, which keeps the output
/// identical whatever the worker count.
use super::draw::{draw_session, ColumnTarget, ViewMapping};
use super::framebuffer::Framebuffer;
use super::paint::PaintSession;
use super::PaintContext;
use crate::config::RenderSettings;
use crate::perf::{PerfStats, SLOW_FRAME};
use crate::viewport::{ScreenRect, Viewport, ViewportRegistry};
use glam::IVec2;
use rayon::prelude::*;
use std::time::Instant;

/// Column width in view pixels; one tile step of the isometric grid
pub const COLUMN_WIDTH: i32 = 32;

/// One strip of a render: the screen pixels it covers and the view-space
/// rectangle its paint session sweeps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub screen: ScreenRect,
    pub view: ScreenRect,
}

/// Split `region` of a viewport into columns.
///
/// The region is clipped to the viewport and to a display of `display`
/// pixels. The columns' screen spans partition what is left exactly.
pub fn plan_columns(viewport: &Viewport, region: ScreenRect, display: IVec2) -> Vec<Column> {
    let display_rect = ScreenRect::from_pos_size(IVec2::ZERO, display);
    let Some(r) = region
        .intersect(&viewport.screen_rect())
        .and_then(|r| r.intersect(&display_rect))
    else {
        return Vec::new();
    };

    let zoom = viewport.zoom;
    let pos = viewport.pos;
    let view_pos = viewport.view_pos;
    let view_left = view_pos.x + zoom.apply_to(r.left - pos.x);
    let view_right = view_pos.x + zoom.apply_to_ceil(r.right - pos.x);
    let view_top = view_pos.y + zoom.apply_to(r.top - pos.y);
    let view_bottom = view_pos.y + zoom.apply_to_ceil(r.bottom - pos.y);

    let mut columns = Vec::new();
    let mut x = view_left & !(COLUMN_WIDTH - 1);
    while x < view_right {
        let (t0, t1) = zoom.screen_span(x - view_pos.x, COLUMN_WIDTH);
        let left = r.left.max(pos.x + t0);
        let right = r.right.min(pos.x + t1);
        if left < right {
            columns.push(Column {
                screen: ScreenRect::new(left, r.top, right, r.bottom),
                view: ScreenRect::new(
                    view_pos.x + zoom.apply_to(left - pos.x),
                    view_top,
                    view_pos.x + zoom.apply_to_ceil(right - pos.x),
                    view_bottom,
                ),
            });
        }
        x += COLUMN_WIDTH;
    }
    columns
}

/// What the display back-end allows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Columns may be drawn from worker threads
    pub parallel_drawing: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            parallel_drawing: true,
        }
    }
}

/// Lazily created rayon pool; without one every batch runs on the caller.
pub struct WorkerPool {
    pool: Option<rayon::ThreadPool>,
    requested: Option<usize>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            pool: None,
            requested: None,
        }
    }

    /// Create or tear down the pool to match the settings.
    pub fn sync(&mut self, enabled: bool, threads: Option<usize>) {
        if !enabled {
            if self.pool.take().is_some() {
                log::info!("Paint worker pool shut down");
            }
            return;
        }
        if self.pool.is_some() && self.requested == threads {
            return;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|i| format!("paint-worker-{i}"))
            .build()
        {
            Ok(pool) => {
                log::info!("Paint worker pool started with {} threads", pool.current_num_threads());
                self.pool = Some(pool);
                self.requested = threads;
            }
            Err(e) => {
                log::warn!("Failed to start paint worker pool, drawing on the calling thread: {}", e);
                self.pool = None;
            }
        }
    }

    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(1, |p| p.current_num_threads())
    }

    /// Map every item, returning results in input order.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
            None => items.iter().map(f).collect(),
        }
    }

    /// Run `f` over paired items, mutating the first of each pair.
    pub fn zip_mut<A, B, F>(&self, a: &mut [A], b: &[B], f: F)
    where
        A: Send,
        B: Sync,
        F: Fn(&mut A, &B) + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| {
                a.par_iter_mut().zip(b.par_iter()).for_each(|(a, b)| f(a, b));
            }),
            None => a.iter_mut().zip(b.iter()).for_each(|(a, b)| f(a, b)),
        }
    }
}

/// Drives column rendering for every viewport
pub struct Renderer {
    pool: WorkerPool,
    pub caps: BackendCapabilities,
    stats: PerfStats,
}

impl Renderer {
    pub fn new(caps: BackendCapabilities) -> Self {
        Self {
            pool: WorkerPool::new(),
            caps,
            stats: PerfStats::new(),
        }
    }

    /// Match the worker pool to the settings and back-end capabilities
    pub fn sync_settings(&mut self, settings: &RenderSettings) {
        let parallel = settings.multithreading && self.caps.parallel_drawing;
        self.pool.sync(parallel, settings.worker_threads);
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Timings of the last `render` call
    pub fn stats(&self) -> &PerfStats {
        &self.stats
    }

    /// Generated and arranged sessions for every column of `region`, in column order
    pub fn paint_sessions(
        &mut self,
        ctx: &PaintContext,
        viewport: &Viewport,
        region: ScreenRect,
        display: IVec2,
    ) -> Vec<PaintSession> {
        self.sync_settings(ctx.settings);
        let columns = plan_columns(viewport, region, display);
        self.generate(ctx, viewport, &columns)
    }

    fn generate(&self, ctx: &PaintContext, viewport: &Viewport, columns: &[Column]) -> Vec<PaintSession> {
        let params = viewport.params();
        self.pool.map(columns, |column| {
            let mut session = PaintSession::new(column.view, params);
            session.generate(ctx);
            session.arrange();
            session
        })
    }

    /// Redraw `region` of a viewport into the framebuffer. Returns the number
    /// of columns drawn.
    pub fn render(&mut self, ctx: &PaintContext, viewport: &Viewport, region: ScreenRect, framebuffer: &mut Framebuffer) -> usize {
        self.sync_settings(ctx.settings);
        let frame_start = Instant::now();
        let columns = plan_columns(viewport, region, framebuffer.size());
        if columns.is_empty() {
            return 0;
        }

        // --- PHASE 1: GENERATE AND ARRANGE ---
        let sessions = self.generate(ctx, viewport, &columns);
        let generated = Instant::now();

        // --- PHASE 2: RASTERIZE ---
        let mapping = ViewMapping::of(viewport);
        let mut targets: Vec<ColumnTarget> = columns.iter().map(|c| ColumnTarget::new(c.screen)).collect();
        self.pool.zip_mut(&mut targets, &sessions, |target, session| {
            draw_session(target, session, ctx, &mapping);
        });
        let rasterized = Instant::now();

        // --- PHASE 3: FLUSH ---
        for target in &targets {
            target.flush_to_framebuffer(framebuffer);
        }
        let flushed = Instant::now();

        let total = flushed - frame_start;
        self.stats = PerfStats {
            generation_us: (generated - frame_start).as_secs_f64() * 1e6,
            rasterization_us: (rasterized - generated).as_secs_f64() * 1e6,
            flush_us: (flushed - rasterized).as_secs_f64() * 1e6,
            total_us: total.as_secs_f64() * 1e6,
            columns: columns.len(),
            paint_structs: sessions.iter().map(PaintSession::len).sum(),
        };
        if total > SLOW_FRAME {
            log::debug!(
                "Slow viewport render: {:.2}ms for {} columns on {} threads",
                total.as_secs_f64() * 1e3,
                columns.len(),
                self.pool.threads()
            );
        }
        columns.len()
    }

    /// Redraw every viewport's accumulated dirty rectangles.
    ///
    /// Viewports that cannot draw right now keep their dirty state for a later frame.
    pub fn render_dirty(&mut self, ctx: &PaintContext, registry: &mut ViewportRegistry, framebuffer: &mut Framebuffer) -> usize {
        let display = framebuffer.size();
        let mut frame = PerfStats::new();
        let mut drawn = 0;
        for (_, viewport) in registry.iter_mut() {
            if !viewport.is_renderable(display) {
                continue;
            }
            let rects = viewport.take_dirty();
            for rect in rects {
                drawn += self.render(ctx, viewport, rect, framebuffer);
                frame.accumulate(&self.stats);
            }
        }
        self.stats = frame;
        drawn
    }
}
