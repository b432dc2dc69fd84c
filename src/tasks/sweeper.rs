//! Expiration Sweeper
//!
//! Background thread that periodically removes entries whose TTL or idle
//! survival time has run out.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::engine::Shared;

/// Thread name used when the caller does not supply one.
pub const DEFAULT_SWEEPER_NAME: &str = "mru-cache-sweeper";

// == Sweep Control ==
/// Run flag and settings shared by an engine and its sweeper thread.
///
/// Every stop bumps `generation`, so a thread that was asked to stop never
/// resumes even if the sweeper is re-enabled before it wakes up.
#[derive(Debug, Default)]
pub(crate) struct SweepControl {
    running: AtomicBool,
    generation: AtomicU64,
    interval_ms: AtomicU64,
    survive_time_ms: AtomicU64,
}

impl SweepControl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn survive_time_ms(&self) -> u64 {
        self.survive_time_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn set_survive_time(&self, survive_time: Duration) {
        self.survive_time_ms
            .store(duration_ms(survive_time), Ordering::Relaxed);
    }

    /// Engine-wide idle survival, None until configured.
    fn default_survive(&self) -> Option<Duration> {
        match self.survive_time_ms() {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// True while the thread started for `generation` should keep going.
    fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation.load(Ordering::Acquire) == generation
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// == Enable ==
/// Starts the sweeper thread for `shared`.
///
/// Returns false without side effects when either duration is zero or a
/// sweeper is already running.
pub(crate) fn enable<K, V, X>(
    shared: &Arc<Shared<K, V, X>>,
    interval: Duration,
    survive_time: Duration,
    thread_name: Option<&str>,
) -> bool
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    X: Send + Sync + 'static,
{
    if interval.is_zero() || survive_time.is_zero() {
        warn!(
            "Ignoring sweep configuration: interval={:?}, survive_time={:?} (both must be > 0)",
            interval, survive_time
        );
        return false;
    }

    let control = &shared.sweep;
    if control
        .running
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        debug!("Sweeper already running, ignoring enable request");
        return false;
    }

    control
        .interval_ms
        .store(duration_ms(interval), Ordering::Relaxed);
    control.set_survive_time(survive_time);
    let generation = control.generation.load(Ordering::Acquire);

    let weak = Arc::downgrade(shared);
    let name = thread_name.unwrap_or(DEFAULT_SWEEPER_NAME).to_string();
    let spawned = thread::Builder::new()
        .name(name.clone())
        .spawn(move || run(weak, generation, interval));

    match spawned {
        Ok(_) => {
            info!(
                "Started sweeper '{}' with interval of {} ms, survive time of {} ms",
                name,
                duration_ms(interval),
                duration_ms(survive_time)
            );
            true
        }
        Err(err) => {
            control.running.store(false, Ordering::Release);
            warn!("Failed to spawn sweeper thread '{}': {}", name, err);
            false
        }
    }
}

// == Disable ==
/// Asks the sweeper to stop; it exits at its next wake-up.
pub(crate) fn disable<K, V, X>(shared: &Shared<K, V, X>) {
    let control = &shared.sweep;
    if control.is_running() {
        control.generation.fetch_add(1, Ordering::AcqRel);
        control.running.store(false, Ordering::Release);
        info!("Sweeper stop requested");
    }
}

// == Sweep Loop ==
fn run<K, V, X>(shared: Weak<Shared<K, V, X>>, generation: u64, interval: Duration)
where
    K: Hash + Eq + Clone,
{
    loop {
        // Sleep for the configured interval
        thread::sleep(interval);

        let Some(shared) = shared.upgrade() else {
            debug!("Cache engine dropped, sweeper exiting");
            break;
        };
        if !shared.sweep.is_current(generation) {
            break;
        }

        let default_survive = shared.sweep.default_survive();
        let pass = panic::catch_unwind(AssertUnwindSafe(|| {
            shared.sweep_pass(Instant::now(), default_survive)
        }));

        // Log sweep statistics
        match pass {
            Ok(removed) if removed > 0 => {
                info!("Sweep: removed {} expired entries", removed)
            }
            Ok(_) => debug!("Sweep: no expired entries found"),
            Err(_) => warn!("Sweep pass panicked, retrying at the next interval"),
        }
    }

    info!("Sweeper stopped");
}
