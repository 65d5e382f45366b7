/// Instrumentation for the paint pipeline
/// Call counters are compiled in only with the `profiling` feature; the
/// hardware counters wrap perf_event for benchmark runs on Linux.
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters shared by every worker
pub struct FunctionCounters {
    // Generation
    pub sessions_generated: AtomicU64,
    pub paint_structs_emitted: AtomicU64,
    pub paint_structs_culled: AtomicU64,
    pub paint_structs_dropped: AtomicU64,

    // Arrangement
    pub arrange_swaps: AtomicU64,

    // Drawing
    pub columns_drawn: AtomicU64,
    pub pixels_written: AtomicU64,
    pub column_clears: AtomicU64,

    // Interaction and invalidation
    pub picks: AtomicU64,
    pub invalidations: AtomicU64,
    pub invalidations_culled: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            sessions_generated: AtomicU64::new(0),
            paint_structs_emitted: AtomicU64::new(0),
            paint_structs_culled: AtomicU64::new(0),
            paint_structs_dropped: AtomicU64::new(0),
            arrange_swaps: AtomicU64::new(0),
            columns_drawn: AtomicU64::new(0),
            pixels_written: AtomicU64::new(0),
            column_clears: AtomicU64::new(0),
            picks: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            invalidations_culled: AtomicU64::new(0),
        }
    }

    fn all(&self) -> [&AtomicU64; 11] {
        [
            &self.sessions_generated,
            &self.paint_structs_emitted,
            &self.paint_structs_culled,
            &self.paint_structs_dropped,
            &self.arrange_swaps,
            &self.columns_drawn,
            &self.pixels_written,
            &self.column_clears,
            &self.picks,
            &self.invalidations,
            &self.invalidations_culled,
        ]
    }

    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CounterSnapshot {
            sessions_generated: load(&self.sessions_generated),
            paint_structs_emitted: load(&self.paint_structs_emitted),
            paint_structs_culled: load(&self.paint_structs_culled),
            paint_structs_dropped: load(&self.paint_structs_dropped),
            arrange_swaps: load(&self.arrange_swaps),
            columns_drawn: load(&self.columns_drawn),
            pixels_written: load(&self.pixels_written),
            column_clears: load(&self.column_clears),
            picks: load(&self.picks),
            invalidations: load(&self.invalidations),
            invalidations_culled: load(&self.invalidations_culled),
        }
    }
}

impl Default for FunctionCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub sessions_generated: u64,
    pub paint_structs_emitted: u64,
    pub paint_structs_culled: u64,
    pub paint_structs_dropped: u64,
    pub arrange_swaps: u64,
    pub columns_drawn: u64,
    pub pixels_written: u64,
    pub column_clears: u64,
    pub picks: u64,
    pub invalidations: u64,
    pub invalidations_culled: u64,
}

impl CounterSnapshot {
    pub fn log_report(&self) {
        log::info!("=== Paint counters ===");
        log::info!(
            "generation: {} sessions, {} structs emitted, {} culled, {} dropped",
            self.sessions_generated,
            self.paint_structs_emitted,
            self.paint_structs_culled,
            self.paint_structs_dropped
        );
        if self.sessions_generated > 0 {
            log::info!(
                "  {:.1} structs per session, {:.1} swaps per session",
                self.paint_structs_emitted as f64 / self.sessions_generated as f64,
                self.arrange_swaps as f64 / self.sessions_generated as f64
            );
        }
        log::info!(
            "drawing: {} columns, {} pixels, {} clears",
            self.columns_drawn,
            self.pixels_written,
            self.column_clears
        );
        log::info!(
            "interaction: {} picks, {} invalidations ({} culled)",
            self.picks,
            self.invalidations,
            self.invalidations_culled
        );
    }
}

pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Increment a counter (no-op without the `profiling` feature)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Add to a counter (no-op without the `profiling` feature)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value as u64, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Hardware performance counters for benchmark runs
#[cfg(feature = "profiling")]
pub mod hardware {
    use perf_event::events::Hardware;
    use perf_event::{Builder, Counter};

    const EVENTS: [Hardware; 4] = [
        Hardware::CPU_CYCLES,
        Hardware::INSTRUCTIONS,
        Hardware::CACHE_REFERENCES,
        Hardware::CACHE_MISSES,
    ];

    /// Counters that failed to open (no permission, no PMU) read as zero
    pub struct PerfCounters {
        counters: Vec<Option<Counter>>,
    }

    impl PerfCounters {
        pub fn new() -> Self {
            Self {
                counters: EVENTS.iter().map(|&e| Builder::new().kind(e).build().ok()).collect(),
            }
        }

        pub fn enable_all(&mut self) {
            for c in self.counters.iter_mut().flatten() {
                let _ = c.enable();
            }
        }

        pub fn disable_all(&mut self) {
            for c in self.counters.iter_mut().flatten() {
                let _ = c.disable();
            }
        }

        pub fn reset_all(&mut self) {
            for c in self.counters.iter_mut().flatten() {
                let _ = c.reset();
            }
        }

        pub fn read_all(&mut self) -> PerfSnapshot {
            let mut values = [0u64; 4];
            for (value, c) in values.iter_mut().zip(self.counters.iter_mut()) {
                *value = c.as_mut().and_then(|c| c.read().ok()).unwrap_or(0);
            }
            PerfSnapshot {
                cpu_cycles: values[0],
                instructions: values[1],
                cache_references: values[2],
                cache_misses: values[3],
            }
        }
    }

    impl Default for PerfCounters {
        fn default() -> Self {
            Self::new()
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub struct PerfSnapshot {
        pub cpu_cycles: u64,
        pub instructions: u64,
        pub cache_references: u64,
        pub cache_misses: u64,
    }

    impl PerfSnapshot {
        pub fn log_report(&self) {
            log::info!("=== Hardware counters ===");
            log::info!("cycles {} instructions {}", self.cpu_cycles, self.instructions);
            if self.cpu_cycles > 0 {
                log::info!("IPC {:.3}", self.instructions as f64 / self.cpu_cycles as f64);
            }
            if self.cache_references > 0 {
                let miss_rate = self.cache_misses as f64 / self.cache_references as f64 * 100.0;
                log::info!(
                    "cache refs {} misses {} ({:.2}%)",
                    self.cache_references,
                    self.cache_misses,
                    miss_rate
                );
            }
        }
    }
}
