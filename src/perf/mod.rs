/// Performance measurement utilities
/// Frame stages are timed and reported through the log at debug level
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

/// Viewport renders slower than this are reported in the debug log
pub const SLOW_FRAME: Duration = Duration::from_millis(16);

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::debug!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Per-frame stage timings accumulated by the renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct PerfStats {
    pub generation_us: f64,
    pub rasterization_us: f64,
    pub flush_us: f64,
    pub total_us: f64,
    pub columns: usize,
    pub paint_structs: usize,
}

impl PerfStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, other: &PerfStats) {
        self.generation_us += other.generation_us;
        self.rasterization_us += other.rasterization_us;
        self.flush_us += other.flush_us;
        self.total_us += other.total_us;
        self.columns += other.columns;
        self.paint_structs += other.paint_structs;
    }

    pub fn log_summary(&self) {
        let pct = |v: f64| if self.total_us > 0.0 { v / self.total_us * 100.0 } else { 0.0 };
        log::debug!("========== FRAME SUMMARY ==========");
        log::debug!(
            "Generate+arrange: {:8.2}μs ({:5.1}%)",
            self.generation_us,
            pct(self.generation_us)
        );
        log::debug!(
            "Rasterization:    {:8.2}μs ({:5.1}%)",
            self.rasterization_us,
            pct(self.rasterization_us)
        );
        log::debug!("Flush:            {:8.2}μs ({:5.1}%)", self.flush_us, pct(self.flush_us));
        log::debug!(
            "Total:            {:8.2}μs, {} columns, {} paint structs",
            self.total_us,
            self.columns,
            self.paint_structs
        );
    }
}

/// Time the rest of the enclosing scope
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
