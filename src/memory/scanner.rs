//! Incremental value scanner
//!
//! A scan session runs in two phases. [`MemoryScanner::first_scan`] walks the
//! address space and records every slot matching a predicate;
//! [`MemoryScanner::next_scan`] re-reads the recorded addresses and keeps the
//! ones that still match. Both run on a background thread that fans work out
//! to a rayon pool, and both hand back a [`ScanTask`] the caller can poll,
//! join or await.
//!
//! The result set and the scanning flag live behind a single mutex. Results
//! are merged once, after every worker has finished, so readers never observe
//! a partially built set.

use super::compare::ScanTarget;
use super::regions::{collect_ranges, MemoryRegion};
use crate::config::ScannerConfig;
use crate::core::types::{
    Address, MemoryError, MemoryResult, ScanComparison, ScanValue, ScannedAddress, ValueType,
};
use crate::process::ProcessMemory;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lowest address scanned unless the caller narrows the range
pub const DEFAULT_SCAN_START: Address = Address::new(0x10000);

/// Highest user-mode address scanned by default
pub const DEFAULT_SCAN_END: Address = Address::new(0x7FFF_FFFF_FFFF);

/// Parameters of a first or next scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub value_type: ValueType,
    pub comparison: ScanComparison,
    pub start_address: Address,
    pub end_address: Address,
    /// Target value, or the lower bound for `ValueBetween`
    pub lower: Option<String>,
    /// Upper bound for `ValueBetween`
    pub upper: Option<String>,
}

impl ScanOptions {
    pub fn new(value_type: ValueType, comparison: ScanComparison) -> Self {
        ScanOptions {
            value_type,
            comparison,
            start_address: DEFAULT_SCAN_START,
            end_address: DEFAULT_SCAN_END,
            lower: None,
            upper: None,
        }
    }

    /// Restricts the scan to `[start, end)`
    pub fn range(mut self, start: Address, end: Address) -> Self {
        self.start_address = start;
        self.end_address = end;
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.lower = Some(value.into());
        self
    }

    pub fn between(mut self, lower: impl Into<String>, upper: impl Into<String>) -> Self {
        self.lower = Some(lower.into());
        self.upper = Some(upper.into());
        self
    }

    fn target(&self) -> MemoryResult<ScanTarget> {
        ScanTarget::parse(
            self.value_type,
            self.comparison,
            self.lower.as_deref(),
            self.upper.as_deref(),
        )
    }
}

#[derive(Debug, Default)]
struct ScanState {
    results: Vec<ScannedAddress>,
    scanning: bool,
    value_type: Option<ValueType>,
}

/// Clears the scanning flag if a worker panics before publishing.
struct ScanGuard {
    state: Arc<Mutex<ScanState>>,
    value_type: ValueType,
    armed: bool,
}

impl ScanGuard {
    fn new(state: &Arc<Mutex<ScanState>>, value_type: ValueType) -> Self {
        ScanGuard {
            state: Arc::clone(state),
            value_type,
            armed: true,
        }
    }

    /// Publishes the merged results and returns to idle in one step.
    ///
    /// The guard is disarmed under the same lock, so a scan accepted right
    /// after this returns keeps its flag.
    fn finish(mut self, results: Vec<ScannedAddress>) -> usize {
        let count = results.len();
        let mut state = self.state.lock();
        state.results = results;
        state.value_type = Some(self.value_type);
        state.scanning = false;
        self.armed = false;
        count
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().scanning = false;
        }
    }
}

/// Handle to a running scan
#[derive(Debug)]
pub struct ScanTask {
    handle: JoinHandle<usize>,
}

impl ScanTask {
    /// True once the background work has merged its results
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the scan completes and returns the result count
    pub fn join(self) -> MemoryResult<usize> {
        self.handle
            .join()
            .map_err(|_| MemoryError::ScanAborted("scan worker panicked".to_string()))
    }

    /// Waits for the scan without blocking the async runtime
    pub async fn wait(self) -> MemoryResult<usize> {
        tokio::task::spawn_blocking(move || self.join())
            .await
            .map_err(|e| MemoryError::ScanAborted(e.to_string()))?
    }
}

/// Value scanner session over one process
pub struct MemoryScanner<P: ProcessMemory + ?Sized + 'static> {
    process: Arc<P>,
    state: Arc<Mutex<ScanState>>,
    pool: Arc<rayon::ThreadPool>,
    min_chunks: usize,
}

impl<P: ProcessMemory + ?Sized + 'static> MemoryScanner<P> {
    /// Creates a scanner with the default configuration
    pub fn new(process: Arc<P>) -> MemoryResult<Self> {
        Self::with_config(process, &ScannerConfig::default())
    }

    pub fn with_config(process: Arc<P>, config: &ScannerConfig) -> MemoryResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_threads.max(1))
            .thread_name(|index| format!("scan-worker-{}", index))
            .build()?;

        Ok(MemoryScanner {
            process,
            state: Arc::new(Mutex::new(ScanState::default())),
            pool: Arc::new(pool),
            min_chunks: config.min_chunks.max(1),
        })
    }

    pub fn process(&self) -> &Arc<P> {
        &self.process
    }

    /// Starts a scan over the whole range.
    ///
    /// The previous results stay visible until the new set is published.
    /// Input is validated before anything else happens. Relative comparisons
    /// have nothing to compare against yet and are rejected.
    pub fn first_scan(&self, options: ScanOptions) -> MemoryResult<ScanTask> {
        let target = options.target()?;
        if options.comparison.requires_previous() {
            return Err(MemoryError::InvalidValue(format!(
                "{} is only valid for a next scan",
                options.comparison
            )));
        }

        {
            let mut state = self.state.lock();
            if state.scanning {
                warn!("first scan rejected: a scan is already in progress");
                return Err(MemoryError::ScanInProgress);
            }
            state.scanning = true;
        }

        let guard = ScanGuard::new(&self.state, options.value_type);
        let process = Arc::clone(&self.process);
        let pool = Arc::clone(&self.pool);
        let (start, end) = (options.start_address, options.end_address);

        self.spawn("first-scan", move || {
            let started = Instant::now();
            let ranges = collect_ranges(&*process, start, end, MemoryRegion::is_scannable);

            let per_region: Vec<Vec<ScannedAddress>> = pool.install(|| {
                ranges
                    .par_iter()
                    .map(|&(base, size)| scan_region(&*process, &target, base, size))
                    .collect()
            });
            let results: Vec<ScannedAddress> = per_region.into_iter().flatten().collect();

            info!(
                regions = ranges.len(),
                results = results.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "first scan complete"
            );
            guard.finish(results)
        })
    }

    /// Re-evaluates the previous results against current memory.
    ///
    /// Entries whose address lies outside `[start, end)`, unreadable entries
    /// and entries that fail the predicate are dropped. Only the address is
    /// range checked; a value may run past `end`. Survivors record the fresh
    /// value as their previous value.
    pub fn next_scan(&self, options: ScanOptions) -> MemoryResult<ScanTask> {
        let target = options.target()?;

        let previous = {
            let mut state = self.state.lock();
            if state.scanning {
                warn!("next scan rejected: a scan is already in progress");
                return Err(MemoryError::ScanInProgress);
            }
            if state.results.is_empty() {
                warn!("next scan ignored: no previous scan results");
                return Err(MemoryError::NoPreviousResults);
            }
            if state.value_type != Some(options.value_type) {
                return Err(MemoryError::InvalidValueType(format!(
                    "results hold {} values, next scan asked for {}",
                    state.value_type.map(|t| t.name()).unwrap_or("no"),
                    options.value_type
                )));
            }
            state.scanning = true;
            state.results.clone()
        };

        let guard = ScanGuard::new(&self.state, options.value_type);
        let process = Arc::clone(&self.process);
        let pool = Arc::clone(&self.pool);
        let chunks = num_cpus::get().max(self.min_chunks);
        let (start, end) = (options.start_address, options.end_address);

        self.spawn("next-scan", move || {
            let started = Instant::now();
            let before = previous.len();
            let chunk_size = before.div_ceil(chunks).max(1);

            let per_chunk: Vec<Vec<ScannedAddress>> = pool.install(|| {
                previous
                    .par_chunks(chunk_size)
                    .map(|chunk| {
                        chunk
                            .iter()
                            .filter_map(|entry| rescan_entry(&*process, &target, entry, start, end))
                            .collect()
                    })
                    .collect()
            });
            let results: Vec<ScannedAddress> = per_chunk.into_iter().flatten().collect();

            info!(
                before,
                after = results.len(),
                chunks,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "next scan complete"
            );
            guard.finish(results)
        })
    }

    /// Discards the current results.
    pub fn new_scan(&self) -> MemoryResult<()> {
        let mut state = self.state.lock();
        if state.scanning {
            return Err(MemoryError::ScanInProgress);
        }
        state.results.clear();
        state.value_type = None;
        Ok(())
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().scanning
    }

    /// Snapshot of the current result set
    pub fn results(&self) -> Vec<ScannedAddress> {
        self.state.lock().results.clone()
    }

    /// Runs `f` over the results while holding the session lock
    pub fn with_results<R>(&self, f: impl FnOnce(&[ScannedAddress]) -> R) -> R {
        f(&self.state.lock().results)
    }

    pub fn result_count(&self) -> usize {
        self.state.lock().results.len()
    }

    /// Type of the values in the current result set
    pub fn value_type(&self) -> Option<ValueType> {
        self.state.lock().value_type
    }

    fn spawn<F>(&self, name: &str, work: F) -> MemoryResult<ScanTask>
    where
        F: FnOnce() -> usize + Send + 'static,
    {
        // The guard inside `work` is dropped with the closure if the spawn
        // fails, which resets the flag.
        let handle = thread::Builder::new().name(name.to_string()).spawn(work)?;
        debug!(thread = name, "scan started");
        Ok(ScanTask { handle })
    }
}

fn scan_region<P: ProcessMemory + ?Sized>(
    process: &P,
    target: &ScanTarget,
    base: Address,
    size: usize,
) -> Vec<ScannedAddress> {
    let width = target.value_type.size();
    let mut buffer = vec![0u8; size];
    if let Err(e) = process.read_memory(base, &mut buffer) {
        debug!(%base, size, error = %e, "skipping unreadable region");
        return Vec::new();
    }

    buffer
        .chunks_exact(width)
        .enumerate()
        .filter_map(|(index, slot)| {
            target
                .matches_first(slot)
                .map(|value| ScannedAddress::new(base.add(index * width), value))
        })
        .collect()
}

fn rescan_entry<P: ProcessMemory + ?Sized>(
    process: &P,
    target: &ScanTarget,
    entry: &ScannedAddress,
    start: Address,
    end: Address,
) -> Option<ScannedAddress> {
    let width = target.value_type.size();
    if entry.address < start || entry.address >= end {
        return None;
    }

    let mut bytes = [0u8; 8];
    let slot = &mut bytes[..width];
    process.read_memory(entry.address, slot).ok()?;
    let current = ScanValue::from_bytes(slot, target.value_type)?;

    target
        .matches_next(&current, &entry.previous_value)
        .then(|| ScannedAddress {
            address: entry.address,
            first_value: entry.first_value,
            previous_value: current,
        })
}
