//! Job descriptors and the execution port
//!
//! A [`JobDescriptor`] names a unit of work (dedup key, trigger policy,
//! overlap flag) and carries the [`JobRun`] implementation to invoke.
//! Job bodies receive a [`JobContext`] with a cooperative cancellation
//! token; bodies that ignore it simply run to completion.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tempo_domain::Result;
use tokio_util::sync::CancellationToken;

use crate::scheduler::trigger::TriggerPolicy;

/// Per-dispatch execution context handed to a job body.
#[derive(Debug, Clone)]
pub struct JobContext {
    cancellation: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// Token the body may select on to observe shutdown requests.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// True once cooperative cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Trait representing an invokable job body.
#[async_trait]
pub trait JobRun: Send + Sync {
    /// Execute the job.
    async fn run(&self, ctx: JobContext) -> Result<()>;
}

/// Closure adapter so hosts and tests can register plain async closures
/// without hand-writing a [`JobRun`] impl.
///
/// # Example
///
/// ```
/// use tempo_core::JobFn;
///
/// let job = JobFn::new(|_ctx| async { Ok(()) });
/// ```
pub struct JobFn<F>(F);

impl<F, Fut> JobFn<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    /// Wrap an async closure as a job body.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> JobRun for JobFn<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn run(&self, ctx: JobContext) -> Result<()> {
        (self.0)(ctx).await
    }
}

/// A registered job: identity, firing rule, overlap flag, and body.
///
/// Owned exclusively by the job registry once registered; run state
/// (`last_run`, `is_running`) is tracked by the scheduler, not here.
#[derive(Clone)]
pub struct JobDescriptor {
    /// Dedup key: the identity under which overlap prevention is enforced.
    pub key: String,
    /// Firing strategy.
    pub trigger: TriggerPolicy,
    /// When true, a new dispatch is skipped while the key is running.
    pub overlap_prevented: bool,
    /// The work to execute.
    pub work: Arc<dyn JobRun>,
}

impl JobDescriptor {
    /// Create a descriptor.
    pub fn new(
        key: impl Into<String>,
        trigger: TriggerPolicy,
        overlap_prevented: bool,
        work: Arc<dyn JobRun>,
    ) -> Self {
        Self { key: key.into(), trigger, overlap_prevented, work }
    }
}

impl std::fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("key", &self.key)
            .field("trigger", &self.trigger)
            .field("overlap_prevented", &self.overlap_prevented)
            .finish_non_exhaustive()
    }
}
