//! Integration tests for job scheduling and manual runs.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use chrono::Duration;

use dashhub_core::traits::cache::CacheProvider;
use dashhub_entity::job::{ExecutionStatus, JobState, JobStatus};
use dashhub_worker::{JobDefinition, JobExecutionError, ManualRunOutcome};

use crate::helpers::{self, TestEnv, count, counting_job, failing_job};

#[tokio::test]
async fn test_jobs_stay_idle_until_started() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(vec![counting_job("icon-refresh", "* * * * *", &counter)], vec![])
        .await;

    env.advance(Duration::minutes(5)).await;

    assert_eq!(count(&counter), 0);
    assert!(!runtime.group().is_active("icon-refresh").await);
}

#[tokio::test]
async fn test_start_then_stop_leaves_job_inactive() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(vec![counting_job("icon-refresh", "* * * * *", &counter)], vec![])
        .await;
    let group = runtime.group();

    group.start("icon-refresh").await.unwrap();
    env.advance(Duration::minutes(2)).await;
    assert_eq!(count(&counter), 2);

    group.stop("icon-refresh").await.unwrap();
    env.advance(Duration::minutes(10)).await;

    assert_eq!(count(&counter), 2);
    assert!(!group.is_active("icon-refresh").await);
    assert!(!env.ticks.is_armed("icon-refresh"));
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(vec![counting_job("ping", "*/5 * * * *", &counter)], vec![])
        .await;
    let group = runtime.group();

    group.start("ping").await.unwrap();
    group.start("ping").await.unwrap();
    env.advance(Duration::minutes(5)).await;
    assert_eq!(count(&counter), 1);

    group.stop("ping").await.unwrap();
    group.stop("ping").await.unwrap();
    env.advance(Duration::minutes(5)).await;
    assert_eq!(count(&counter), 1);
}

#[tokio::test]
async fn test_start_all_arms_every_job() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(vec![counting_job("ping", "* * * * *", &counter)], vec![])
        .await;

    runtime.start_all().await.unwrap();

    assert!(runtime.jobs().await.iter().all(|job| job.active));
    assert_eq!(
        env.ticks.armed_jobs(),
        vec!["ping", "queue-cleanup", "queue-worker", "scheduler-heartbeat"]
    );

    runtime.shutdown().await.unwrap();
    assert!(runtime.jobs().await.iter().all(|job| !job.active));
}

#[tokio::test]
async fn test_non_triggerable_job_is_not_run_manually() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(
            vec![counting_job("billing-sync", "0 0 * * *", &counter).triggerable(false)],
            vec![],
        )
        .await;

    assert_eq!(
        runtime.run_manually("billing-sync").await,
        ManualRunOutcome::Rejected
    );
    assert_eq!(count(&counter), 0);
    assert_eq!(
        helpers::status(&runtime, "billing-sync").await,
        JobStatus::never_run("billing-sync")
    );
}

#[tokio::test]
async fn test_unknown_job_manual_run_is_noop() {
    let env = TestEnv::new();
    let runtime = env.runtime(vec![], vec![]).await;

    assert_eq!(
        runtime.run_manually("does-not-exist").await,
        ManualRunOutcome::UnknownJob
    );
}

#[tokio::test]
async fn test_manual_run_ignores_schedule_and_active_flag() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(vec![counting_job("analytics", "0 0 1 1 *", &counter)], vec![])
        .await;

    assert_eq!(
        runtime.run_manually("analytics").await,
        ManualRunOutcome::Completed
    );

    assert_eq!(count(&counter), 1);
    assert!(!runtime.group().is_active("analytics").await);
    let status = helpers::status(&runtime, "analytics").await;
    assert_eq!(status.last_execution_status, ExecutionStatus::Success);
    assert_eq!(status.last_execution_timestamp, Some(helpers::start_time()));
}

#[tokio::test]
async fn test_failing_job_reports_error_and_keeps_ticking() {
    let env = TestEnv::new();
    let failures = Arc::new(AtomicUsize::new(0));
    let healthy = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(
            vec![
                failing_job("media-poll", "* * * * *", &failures),
                counting_job("docker-poll", "* * * * *", &healthy),
            ],
            vec![],
        )
        .await;
    runtime.start_all().await.unwrap();

    env.advance(Duration::minutes(1)).await;
    let status = helpers::status(&runtime, "media-poll").await;
    assert_eq!(status.status, JobState::Idle);
    assert_eq!(status.last_execution_status, ExecutionStatus::Error);
    assert_eq!(
        status.last_execution_timestamp,
        Some(helpers::start_time() + Duration::minutes(1))
    );

    env.advance(Duration::minutes(1)).await;
    assert_eq!(count(&failures), 2);
    assert_eq!(count(&healthy), 2);
    assert_eq!(
        helpers::status(&runtime, "docker-poll").await.last_execution_status,
        ExecutionStatus::Success
    );
}

#[tokio::test]
async fn test_status_is_running_during_invocation() {
    let env = TestEnv::new();
    let observed = Arc::new(std::sync::Mutex::new(None));

    let cache = env.cache.clone();
    let seen = Arc::clone(&observed);
    let job = JobDefinition::from_fn("weather", "* * * * *", move || {
        let cache = cache.clone();
        let seen = Arc::clone(&seen);
        async move {
            let raw = cache
                .get("jobs:status:weather")
                .await?
                .ok_or_else(|| JobExecutionError::failed("status missing"))?;
            let status: JobStatus =
                serde_json::from_str(&raw).map_err(JobExecutionError::failed)?;
            *seen.lock().unwrap() = Some(status);
            Ok(())
        }
    });
    let runtime = env.runtime(vec![job], vec![]).await;

    runtime.run_manually("weather").await;
    runtime.run_manually("weather").await;

    let during = observed.lock().unwrap().clone().unwrap();
    assert_eq!(during.status, JobState::Running);
    assert_eq!(during.last_execution_status, ExecutionStatus::Success);
}

#[tokio::test]
async fn test_heartbeat_runs_on_start_then_on_schedule() {
    let env = TestEnv::new();
    let beats = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(
            vec![counting_job("heartbeat", "*/5 * * * *", &beats).run_on_start(true)],
            vec![],
        )
        .await;

    assert_eq!(count(&beats), 1);
    let status = helpers::status(&runtime, "heartbeat").await;
    assert_eq!(status.last_execution_status, ExecutionStatus::Success);
    assert_eq!(status.last_execution_timestamp, Some(helpers::start_time()));
    assert!(!runtime.group().is_active("heartbeat").await);

    runtime.start_all().await.unwrap();
    env.advance(Duration::minutes(4)).await;
    assert_eq!(count(&beats), 1);

    env.advance(Duration::minutes(1)).await;
    assert_eq!(count(&beats), 2);
}

#[tokio::test]
async fn test_builtin_heartbeat_records_liveness() {
    let env = TestEnv::new();
    let runtime = env.runtime(vec![], vec![]).await;

    assert_eq!(
        env.cache.get("jobs:heartbeat").await.unwrap(),
        Some(helpers::start_time().to_rfc3339())
    );

    runtime.start_all().await.unwrap();
    env.advance(Duration::seconds(30)).await;

    assert_eq!(
        env.cache.get("jobs:heartbeat").await.unwrap(),
        Some((helpers::start_time() + Duration::seconds(30)).to_rfc3339())
    );
}
