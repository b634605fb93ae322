//! Integration tests for remote triggers and status events.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration as StdDuration;

use futures::StreamExt;
use tokio::sync::watch;

use dashhub_core::traits::pubsub::PubSubProvider;
use dashhub_entity::job::{ExecutionStatus, JobState, JobStatus};
use dashhub_worker::TriggerRejection;

use crate::helpers::{self, TestEnv, count, counting_job};

#[tokio::test]
async fn test_trigger_runs_job_through_listener() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(vec![counting_job("icon-refresh", "0 0 * * *", &counter)], vec![])
        .await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = runtime.listen_for_triggers(shutdown_rx).await.unwrap();

    runtime.trigger_job("icon-refresh").await.unwrap();

    tokio::time::timeout(StdDuration::from_secs(5), async {
        while count(&counter) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("triggered job should run");

    shutdown_tx.send(true).unwrap();
    listener.await.unwrap();
    assert_eq!(count(&counter), 1);
}

#[tokio::test]
async fn test_trigger_rejections() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(
            vec![counting_job("billing-sync", "0 0 * * *", &counter).triggerable(false)],
            vec![],
        )
        .await;
    let mut published = env.pubsub.subscribe("jobs:trigger").await.unwrap();

    assert_eq!(
        runtime.trigger_job("billing-sync").await,
        Err(TriggerRejection::NotTriggerable("billing-sync".to_string()))
    );
    assert_eq!(
        runtime.trigger_job("nope").await,
        Err(TriggerRejection::UnknownJob("nope".to_string()))
    );

    // The rejected requests were never published, so the first message
    // on the channel is the accepted one.
    runtime.trigger_job("queue-worker").await.unwrap();
    assert_eq!(published.next().await, Some("queue-worker".to_string()));
}

#[tokio::test]
async fn test_listener_ignores_unknown_and_locked_jobs() {
    let env = TestEnv::new();
    let locked = Arc::new(AtomicUsize::new(0));
    let open = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(
            vec![
                counting_job("billing-sync", "0 0 * * *", &locked).triggerable(false),
                counting_job("weather", "0 0 * * *", &open),
            ],
            vec![],
        )
        .await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = runtime.listen_for_triggers(shutdown_rx).await.unwrap();

    env.pubsub.publish("jobs:trigger", "ghost").await.unwrap();
    env.pubsub.publish("jobs:trigger", "billing-sync").await.unwrap();
    env.pubsub.publish("jobs:trigger", "weather").await.unwrap();

    tokio::time::timeout(StdDuration::from_secs(5), async {
        while count(&open) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("open job should run");

    shutdown_tx.send(true).unwrap();
    listener.await.unwrap();
    assert_eq!(count(&locked), 0);
}

#[tokio::test]
async fn test_status_events_published_for_each_run() {
    let env = TestEnv::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let runtime = env
        .runtime(vec![counting_job("weather", "0 0 * * *", &counter)], vec![])
        .await;
    let mut events = env.pubsub.subscribe("jobs:status").await.unwrap();

    runtime.run_manually("weather").await;

    let running: JobStatus = serde_json::from_str(&events.next().await.unwrap()).unwrap();
    assert_eq!(running.name, "weather");
    assert_eq!(running.status, JobState::Running);
    assert_eq!(running.last_execution_status, ExecutionStatus::Unknown);

    let finished: JobStatus = serde_json::from_str(&events.next().await.unwrap()).unwrap();
    assert_eq!(finished.status, JobState::Idle);
    assert_eq!(finished.last_execution_status, ExecutionStatus::Success);
    assert_eq!(
        finished.last_execution_timestamp,
        Some(helpers::start_time())
    );
}
