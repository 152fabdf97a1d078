//! End-to-end tests for the polling drivers over the scheduler core.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempo_common::time::MockClock;
use tempo_core::{
    JobDescriptor, JobFn, JobScheduler, TaskExecutor, TaskProgress, TaskRetentionRunner,
    TaskService, TriggerPolicy,
};
use tempo_infra::scheduling::{
    ScanDriver, ScanDriverConfig, TaskRunnerDriver, TaskRunnerDriverConfig,
};

fn fast_scan() -> ScanDriverConfig {
    ScanDriverConfig { scan_period: Duration::from_millis(10), drain_timeout: Duration::from_secs(2) }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

struct Echo;

#[async_trait]
impl TaskExecutor for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        progress: TaskProgress,
    ) -> tempo_domain::Result<serde_json::Value> {
        progress.set_progress(1, 1);
        Ok(input)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn one_shot_job_runs_once_under_the_driver() {
    let scheduler = JobScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let hits = Arc::clone(&counter);
    scheduler
        .register_job(JobDescriptor::new(
            "one-shot",
            TriggerPolicy::Once,
            true,
            Arc::new(JobFn::new(move |_ctx| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })),
        ))
        .unwrap();

    let mut driver = ScanDriver::new(scheduler.clone(), fast_scan());
    driver.start().await.unwrap();

    wait_until(|| scheduler.job_count() == 0).await;
    // Give the loop a few more scans to prove the job never fires again.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    driver.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn repeating_interval_job_keeps_firing() {
    let scheduler = JobScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let hits = Arc::clone(&counter);
    scheduler
        .register_job(JobDescriptor::new(
            "heartbeat",
            TriggerPolicy::every(Duration::from_millis(20)),
            true,
            Arc::new(JobFn::new(move |_ctx| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })),
        ))
        .unwrap();

    let mut driver = ScanDriver::new(scheduler.clone(), fast_scan());
    driver.start().await.unwrap();

    wait_until(|| counter.load(Ordering::SeqCst) >= 3).await;
    driver.stop().await.unwrap();

    // Stopped loop dispatches nothing further.
    let after_stop = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_stop);
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_drains_cancellable_job_bodies() {
    let scheduler = JobScheduler::new();
    let observed_cancel = Arc::new(AtomicBool::new(false));

    let seen = Arc::clone(&observed_cancel);
    scheduler
        .register_job(JobDescriptor::new(
            "long-runner",
            TriggerPolicy::Once,
            true,
            Arc::new(JobFn::new(move |ctx| {
                let seen = Arc::clone(&seen);
                async move {
                    ctx.cancellation_token().cancelled().await;
                    seen.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })),
        ))
        .unwrap();

    let mut driver = ScanDriver::new(scheduler.clone(), fast_scan());
    driver.start().await.unwrap();
    wait_until(|| scheduler.in_flight() == 1).await;

    // Stop must cancel the body and wait for it to wind down.
    driver.stop().await.unwrap();
    assert!(observed_cancel.load(Ordering::SeqCst));
    assert!(!scheduler.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn scheduled_task_completes_under_the_driver() {
    let scheduler = JobScheduler::new();
    let service = TaskService::new(scheduler.clone());
    service.register_executor(Arc::new(Echo));

    let mut driver = ScanDriver::new(scheduler.clone(), fast_scan());
    driver.start().await.unwrap();

    let id = service.schedule_task("echo", "echo the payload", json!({"answer": 42})).unwrap();

    wait_until(|| service.get_task(id).is_some_and(|ctx| ctx.is_finished())).await;
    let ctx = service.get_task(id).unwrap();
    assert!(!ctx.is_failed());
    assert_eq!(ctx.result, Some(json!({"answer": 42})));
    assert_eq!(ctx.progress_current, Some(1));

    // The backing one-shot job is gone once the task finished.
    wait_until(|| scheduler.job_count() == 0).await;

    driver.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn retention_runner_evicts_old_records_under_the_driver() {
    let clock = MockClock::new();
    let scheduler = JobScheduler::new();
    let service = TaskService::with_clock(scheduler.clone(), Arc::new(clock.clone()));
    service.register_executor(Arc::new(Echo));

    let mut scan = ScanDriver::new(scheduler.clone(), fast_scan());
    scan.start().await.unwrap();

    let id = service.schedule_task("echo", "", json!(null)).unwrap();
    wait_until(|| service.get_task(id).is_some_and(|ctx| ctx.is_finished())).await;
    scan.stop().await.unwrap();

    let runner = Arc::new(TaskRetentionRunner::with_retention(
        service.clone(),
        Duration::from_secs(60),
    ));
    let mut driver = TaskRunnerDriver::new(
        runner,
        TaskRunnerDriverConfig { period: Duration::from_millis(10) },
    );
    driver.start().await.unwrap();

    // Within the window nothing is dropped.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.task_count(), 1);

    clock.advance(Duration::from_secs(120));
    wait_until(|| service.task_count() == 0).await;

    driver.stop().await.unwrap();
}
