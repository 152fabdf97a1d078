//! Job scheduler: registry scan, overlap prevention, and dispatch
//!
//! [`JobScheduler`] holds the registered jobs and exposes a single scan
//! entry point, [`JobScheduler::run_at`]: evaluate every job against a
//! timestamp and fire the due ones on detached tasks. The scheduler never
//! sleeps or polls on its own; a driver in `tempo-infra` calls `run_at`
//! on a cadence.
//!
//! Run state is tracked per dedup key. An overlap-prevented key is claimed
//! with a compare-and-swap before dispatch, so a slow execution causes the
//! next due tick to be skipped rather than stacked.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tempo_common::time::{Clock, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

use crate::scheduler::error::{RegistryError, RegistryResult};
use crate::scheduler::job::{JobContext, JobDescriptor, JobFn};
use crate::scheduler::trigger::TriggerPolicy;

/// Run state shared between the registry slot and in-flight dispatches.
#[derive(Debug)]
struct SlotState {
    /// Most recent dispatch time. Set when the job is handed to the
    /// executor, not when the body finishes.
    last_run: Mutex<Option<DateTime<Utc>>>,
    registered_at: DateTime<Utc>,
}

/// A registry entry. The id is stable for the slot's lifetime and lets
/// completion handlers remove one-shot jobs without racing on keys.
struct JobSlot {
    id: u64,
    descriptor: JobDescriptor,
    state: Arc<SlotState>,
}

struct SchedulerShared {
    clock: Arc<dyn Clock>,
    /// Registration order is scan order.
    slots: RwLock<Vec<JobSlot>>,
    next_slot_id: AtomicU64,
    next_run_id: AtomicU64,
    /// Per-key claim flags for overlap-prevented jobs.
    running: DashMap<String, Arc<AtomicBool>>,
    /// Cancellation tokens of currently executing runs, keyed by run id.
    active: DashMap<u64, CancellationToken>,
    in_flight: AtomicUsize,
}

/// In-process job scheduler.
///
/// Cheap to clone; clones share the same registry and run state. See the
/// module docs for the dispatch protocol.
#[derive(Clone)]
pub struct JobScheduler {
    shared: Arc<SchedulerShared>,
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl JobScheduler {
    /// Create a scheduler backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a scheduler with an injected clock (used by tests to control
    /// the registration timestamps that anchor interval triggers).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                clock,
                slots: RwLock::new(Vec::new()),
                next_slot_id: AtomicU64::new(0),
                next_run_id: AtomicU64::new(0),
                running: DashMap::new(),
                active: DashMap::new(),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Register a job.
    ///
    /// Keys must be unique among overlap-prevented jobs: the per-key claim
    /// flag is meaningless if two prevented jobs share it. Jobs that allow
    /// overlap may reuse a key freely.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] when an overlap-prevented job
    /// is already registered under the same key and either job prevents
    /// overlap.
    #[instrument(skip(self, descriptor), fields(key = %descriptor.key))]
    pub fn register_job(&self, descriptor: JobDescriptor) -> RegistryResult<()> {
        let mut slots = self.shared.slots.write();

        let conflict = slots.iter().any(|slot| {
            slot.descriptor.key == descriptor.key
                && (slot.descriptor.overlap_prevented || descriptor.overlap_prevented)
        });
        if conflict {
            return Err(RegistryError::DuplicateKey(descriptor.key));
        }

        let id = self.shared.next_slot_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(SlotState {
            last_run: Mutex::new(None),
            registered_at: self.shared.clock.now_utc(),
        });
        debug!(slot_id = id, trigger = ?descriptor.trigger, "Registered job");
        slots.push(JobSlot { id, descriptor, state });
        Ok(())
    }

    /// Convenience: register an overlap-controlled cron job from expression
    /// text and an async closure.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Schedule`] when the expression is malformed,
    /// or [`RegistryError::DuplicateKey`] as for [`Self::register_job`].
    pub fn register_cron<F, Fut>(
        &self,
        key: impl Into<String>,
        expression: &str,
        overlap_prevented: bool,
        work: F,
    ) -> RegistryResult<()>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = tempo_domain::Result<()>> + Send + 'static,
    {
        let trigger = TriggerPolicy::cron(expression)?;
        self.register_job(JobDescriptor::new(
            key,
            trigger,
            overlap_prevented,
            Arc::new(JobFn::new(work)),
        ))
    }

    /// Remove every job registered under `key`.
    ///
    /// In-flight executions of the key run to completion; only future
    /// dispatches stop. Returns the number of jobs removed.
    #[instrument(skip(self))]
    pub fn unregister_job(&self, key: &str) -> usize {
        let removed = {
            let mut slots = self.shared.slots.write();
            let before = slots.len();
            slots.retain(|slot| slot.descriptor.key != key);
            before - slots.len()
        };
        // Drop the key's claim flag with its last slot. A flag still claimed
        // by an in-flight run is left alone; the run's completion handler
        // purges it once the key is unused.
        self.shared.running.remove_if(key, |_, flag| !flag.load(Ordering::Acquire));
        if removed > 0 {
            debug!(removed, "Unregistered job");
        }
        removed
    }

    /// Evaluate every registered job against `now` and dispatch the due,
    /// eligible ones. Returns the number of dispatches started.
    ///
    /// Jobs are scanned in registration order. Dispatch is fire-and-continue:
    /// each body runs on its own task and this call returns without waiting
    /// for any of them.
    pub fn run_at(&self, now: DateTime<Utc>) -> usize {
        let slots = self.shared.slots.read();
        let mut dispatched = 0;

        for slot in slots.iter() {
            let claim = if slot.descriptor.overlap_prevented {
                let flag = self
                    .shared
                    .running
                    .entry(slot.descriptor.key.clone())
                    .or_insert_with(|| Arc::new(AtomicBool::new(false)))
                    .clone();
                Some(flag)
            } else {
                None
            };

            // Trigger evaluation and the last-run update happen under the
            // slot mutex so concurrent scans cannot double-fire a one-shot.
            {
                let mut last_run = slot.state.last_run.lock();
                if !slot.descriptor.trigger.is_due(now, *last_run, slot.state.registered_at) {
                    continue;
                }
                if let Some(flag) = &claim {
                    if flag
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        trace!(key = %slot.descriptor.key, "Skipping dispatch, previous run still in flight");
                        continue;
                    }
                }
                *last_run = Some(now);
            }

            self.dispatch(slot, claim);
            dispatched += 1;
        }

        dispatched
    }

    /// Request cooperative cancellation of every currently executing run.
    ///
    /// Bodies that never inspect their [`JobContext`] are unaffected and run
    /// to completion. Future dispatches get fresh tokens.
    #[instrument(skip(self))]
    pub fn cancel_all_cancellable_tasks(&self) {
        let mut cancelled = 0;
        for entry in self.shared.active.iter() {
            entry.value().cancel();
            cancelled += 1;
        }
        if cancelled > 0 {
            debug!(cancelled, "Requested cancellation of in-flight runs");
        }
    }

    /// True while at least one dispatched body has not finished.
    pub fn is_running(&self) -> bool {
        self.in_flight() > 0
    }

    /// Number of dispatched bodies currently executing.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.shared.slots.read().len()
    }

    /// Spawn the job body on a detached task and arrange cleanup: release
    /// the key claim, drop the cancellation token, and remove one-shot
    /// slots once the body has finished (however it finished).
    fn dispatch(&self, slot: &JobSlot, claim: Option<Arc<AtomicBool>>) {
        let shared = Arc::clone(&self.shared);
        let run_id = shared.next_run_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        shared.active.insert(run_id, token.clone());
        shared.in_flight.fetch_add(1, Ordering::AcqRel);

        let key = slot.descriptor.key.clone();
        let slot_id = slot.id;
        let remove_after = matches!(slot.descriptor.trigger, TriggerPolicy::Once);
        let work = Arc::clone(&slot.descriptor.work);

        tokio::spawn(async move {
            trace!(%key, run_id, "Dispatching job");
            // Run the body on its own task so a panic is contained and
            // reported instead of unwinding through the scheduler.
            let outcome = tokio::spawn(async move { work.run(JobContext::new(token)).await }).await;

            match outcome {
                Ok(Ok(())) => trace!(%key, run_id, "Job completed"),
                Ok(Err(err)) => warn!(%key, run_id, error = %err, "Job failed"),
                Err(join_err) if join_err.is_panic() => {
                    error!(%key, run_id, "Job panicked");
                }
                Err(join_err) => warn!(%key, run_id, error = %join_err, "Job task aborted"),
            }

            if remove_after {
                shared.slots.write().retain(|s| s.id != slot_id);
            }
            shared.active.remove(&run_id);
            if let Some(flag) = claim {
                flag.store(false, Ordering::Release);
                // Claim flags live only as long as some slot still carries
                // the key; purge unclaimed leftovers so evicted one-shot
                // keys do not accumulate.
                let key_in_use =
                    shared.slots.read().iter().any(|slot| slot.descriptor.key == key);
                if !key_in_use {
                    shared.running.remove_if(&key, |_, flag| !flag.load(Ordering::Acquire));
                }
            }
            shared.in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("job_count", &self.job_count())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
