use super::pool_source::PoolSource;
use crate::logic::graph::GraphStore;
use crate::logic::types::PoolRecord;
use crate::utils::{DexConfig, StoreError};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use strum_macros::Display;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum SyncState {
    Idle = 0,
    Fetching = 1,
    Applying = 2,
}

impl From<u8> for SyncState {
    fn from(value: u8) -> Self {
        match value {
            1 => SyncState::Fetching,
            2 => SyncState::Applying,
            _ => SyncState::Idle,
        }
    }
}

/// Flags shared between a router's synchronizer and its query path.
///
/// `synchronizing` is raised while pools are being applied and `initializing` until the first
/// sync after start finishes; path-cache writes are refused while either is set.
#[derive(Debug, Default)]
pub struct SyncFlags {
    in_flight: AtomicBool,
    synchronizing: AtomicBool,
    initializing: AtomicBool,
    state: AtomicU8,
}

impl SyncFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_synchronizing(&self) -> bool {
        self.synchronizing.load(Ordering::Acquire)
    }

    pub fn set_synchronizing(&self, value: bool) {
        self.synchronizing.store(value, Ordering::Release);
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::Acquire)
    }

    pub fn set_initializing(&self, value: bool) {
        self.initializing.store(value, Ordering::Release);
    }

    pub fn path_cache_writable(&self) -> bool {
        !self.is_synchronizing() && !self.is_initializing()
    }

    pub fn state(&self) -> SyncState {
        SyncState::from(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SyncState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Claims the single in-flight sync slot.
    fn try_begin_cycle(&self) -> bool {
        self.in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    pub fn is_cycle_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the cycle slot and resets the state even when a cycle bails out early.
struct CycleGuard<'a> {
    flags: &'a SyncFlags,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flags.set_state(SyncState::Idle);
        self.flags.in_flight.store(false, Ordering::Release);
    }
}

struct ApplyGuard<'a> {
    flags: &'a SyncFlags,
}

impl<'a> ApplyGuard<'a> {
    fn raise(flags: &'a SyncFlags) -> Self {
        flags.set_synchronizing(true);
        Self { flags }
    }
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        self.flags.set_synchronizing(false);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub skipped_ticks: u64,
    pub fetches: u64,
    pub chunks_applied: u64,
    pub pools_applied: u64,
    pub pools_skipped: u64,
    pub checkpoint: u64,
    pub last_error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub chunks: usize,
    pub pools_applied: usize,
    pub pools_skipped: usize,
    /// Highest block among the applied pools
    pub highest_block: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another cycle was already running
    Skipped,
    Failed(String),
    Completed { fetches: usize, pools_applied: usize },
}

/// Splits pools into chunks of roughly `chunk_size`, sorted by block, never splitting the pools
/// of one block across chunks. A block with more pools than `chunk_size` forms its own chunk.
pub fn chunk_by_block(mut pools: Vec<PoolRecord>, chunk_size: usize) -> Vec<Vec<PoolRecord>> {
    pools.sort_by_key(|pool| pool.block_number);

    let mut chunks: Vec<Vec<PoolRecord>> = Vec::new();
    let mut current: Vec<PoolRecord> = Vec::new();
    for group in pools.chunk_by(|a, b| a.block_number == b.block_number) {
        if !current.is_empty() && current.len() + group.len() > chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
        current.extend_from_slice(group);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Periodically pulls new pools for one DEX and folds them into its graph.
///
/// Cycle: `Idle -> Fetching -> Applying -> Idle`. A fetch starts right after the stored
/// checkpoint; the checkpoint advances after every applied chunk, so an interrupted cycle
/// resumes where it stopped. A source reporting `has_more` is fetched again in the same cycle.
pub struct Synchronizer {
    dex: Arc<DexConfig>,
    store: Arc<GraphStore>,
    source: Arc<dyn PoolSource>,
    flags: Arc<SyncFlags>,
    chunk_size: usize,
    interval: Duration,
    stats: RwLock<SyncStats>,
}

impl Synchronizer {
    pub fn new(
        dex: Arc<DexConfig>,
        store: Arc<GraphStore>,
        source: Arc<dyn PoolSource>,
        flags: Arc<SyncFlags>,
        chunk_size: usize,
        interval: Duration,
    ) -> Self {
        Self { dex, store, source, flags, chunk_size: chunk_size.max(1), interval, stats: RwLock::new(SyncStats::default()) }
    }

    pub fn flags(&self) -> &Arc<SyncFlags> {
        &self.flags
    }

    pub fn state(&self) -> SyncState {
        self.flags.state()
    }

    pub async fn stats(&self) -> SyncStats {
        self.stats.read().await.clone()
    }

    /// Runs one sync cycle, including continuation fetches. A no-op while another cycle runs.
    pub async fn tick(&self) -> SyncOutcome {
        if !self.flags.try_begin_cycle() {
            debug!(dex = %self.dex.name, "Sync already in flight, skipping tick");
            self.stats.write().await.skipped_ticks += 1;
            return SyncOutcome::Skipped;
        }
        let _cycle = CycleGuard { flags: &self.flags };

        let started = Instant::now();
        let outcome = self.run_cycle().await;

        let mut stats = self.stats.write().await;
        stats.cycles += 1;
        match &outcome {
            SyncOutcome::Failed(reason) => {
                stats.failed_cycles += 1;
                stats.last_error = Some(reason.clone());
            }
            SyncOutcome::Completed { fetches, pools_applied } => {
                info!(dex = %self.dex.name, fetches, pools_applied, elapsed = ?started.elapsed(), "Sync cycle completed");
            }
            SyncOutcome::Skipped => {}
        }
        outcome
    }

    async fn run_cycle(&self) -> SyncOutcome {
        let mut fetches = 0;
        let mut pools_applied = 0;
        let mut previous_start: Option<u64> = None;

        loop {
            self.flags.set_state(SyncState::Fetching);
            let checkpoint = match self.store.get_checkpoint().await {
                Ok(checkpoint) => checkpoint,
                Err(e) => {
                    warn!(dex = %self.dex.name, error = %e, "Failed to read sync checkpoint");
                    return SyncOutcome::Failed(e.to_string());
                }
            };
            let start_block = if checkpoint == 0 { 0 } else { checkpoint + 1 };
            if previous_start == Some(start_block) {
                warn!(dex = %self.dex.name, start_block, "Checkpoint did not advance, stopping continuation");
                break;
            }
            previous_start = Some(start_block);

            let batch = match self.source.fetch(start_block).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(dex = %self.dex.name, start_block, error = %e, "Failed to fetch pools, retrying next tick");
                    return SyncOutcome::Failed(e.to_string());
                }
            };
            fetches += 1;
            self.stats.write().await.fetches += 1;
            debug!(
                dex = %self.dex.name,
                start_block,
                pools = batch.pools.len(),
                latest_block = batch.latest_block_number,
                has_more = batch.has_more,
                "Fetched pools"
            );

            let has_more = batch.has_more;
            let fetched = batch.pools.len();

            self.flags.set_state(SyncState::Applying);
            match self.apply_pools(batch.pools).await {
                Ok(report) => pools_applied += report.pools_applied,
                Err(e) => {
                    error!(dex = %self.dex.name, error = %e, "Failed to apply pools");
                    return SyncOutcome::Failed(e.to_string());
                }
            }

            if !has_more {
                break;
            }
            if fetched == 0 {
                warn!(dex = %self.dex.name, "Source reported more pools but returned none, stopping continuation");
                break;
            }
        }

        SyncOutcome::Completed { fetches, pools_applied }
    }

    /// Applies pools chunk by chunk, advancing the checkpoint after each chunk.
    ///
    /// Malformed pools are logged and skipped. A failed store write aborts before the chunk's
    /// checkpoint is persisted, so the next cycle re-applies the whole chunk.
    pub async fn apply_pools(&self, pools: Vec<PoolRecord>) -> Result<ApplyReport, StoreError> {
        let _gate = ApplyGuard::raise(&self.flags);
        let mut report = ApplyReport::default();

        for chunk in chunk_by_block(pools, self.chunk_size) {
            let mut applied = 0;
            let mut skipped = 0;
            for pool in &chunk {
                if let Err(e) = pool.validate(self.dex.chain_id) {
                    warn!(dex = %self.dex.name, error = %e, "Skipping malformed pool");
                    skipped += 1;
                    continue;
                }
                if let Err(e) = self.store.add_pool(pool).await {
                    warn!(dex = %self.dex.name, pair = %pool.pair_address, error = %e, "Failed to apply pool, chunk will be retried");
                    return Err(e);
                }
                applied += 1;
            }

            let Some(chunk_block) = chunk.iter().map(|pool| pool.block_number).max() else {
                continue;
            };
            match self.store.set_checkpoint(chunk_block).await {
                Ok(()) => {}
                Err(StoreError::CheckpointRegression { current, attempted }) => {
                    warn!(dex = %self.dex.name, current, attempted, "Source returned pools behind the checkpoint");
                }
                Err(e) => return Err(e),
            }
            info!(dex = %self.dex.name, block = chunk_block, applied, skipped, "Applied pool chunk");

            report.chunks += 1;
            report.pools_applied += applied;
            report.pools_skipped += skipped;
            report.highest_block = report.highest_block.max(Some(chunk_block));

            let mut stats = self.stats.write().await;
            stats.chunks_applied += 1;
            stats.pools_applied += applied as u64;
            stats.pools_skipped += skipped as u64;
            stats.checkpoint = stats.checkpoint.max(chunk_block);
        }

        Ok(report)
    }

    /// Starts the periodic loop: one eager cycle, then one per interval.
    ///
    /// The router counts as initializing until the eager cycle finishes.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        self.flags.set_initializing(true);
        tokio::spawn(async move {
            info!(dex = %self.dex.name, chain_id = self.dex.chain_id, interval = ?self.interval, "Starting graph synchronization");
            let outcome = self.tick().await;
            self.flags.set_initializing(false);
            debug!(dex = %self.dex.name, ?outcome, "Initial synchronization finished");

            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }
}
