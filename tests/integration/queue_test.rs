//! Integration tests for deferred queue processing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use dashhub_database::QueueStore;
use dashhub_entity::job::ExecutionStatus;
use dashhub_entity::queue::QueueEntry;
use dashhub_worker::{EnqueueOptions, JobExecutionError, ManualRunOutcome, Queue, QueueDefinition};

use crate::helpers::{self, TestEnv};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct WelcomeEmail {
    #[validate(length(min = 1))]
    user_id: String,
    #[validate(email)]
    email: String,
}

fn welcome(user_id: &str) -> WelcomeEmail {
    WelcomeEmail {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
    }
}

/// The `welcome-email` queue, recording every delivered payload.
fn welcome_queue(sent: &Arc<Mutex<Vec<WelcomeEmail>>>) -> (Queue<WelcomeEmail>, QueueDefinition) {
    let sent = Arc::clone(sent);
    Queue::define("welcome-email", move |payload: WelcomeEmail| {
        let sent = Arc::clone(&sent);
        async move {
            sent.lock().unwrap().push(payload);
            Ok(())
        }
    })
}

#[tokio::test]
async fn test_welcome_email_delivered_once() {
    let env = TestEnv::new();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (queue, definition) = welcome_queue(&sent);
    let runtime = env.runtime(vec![], vec![definition]).await;
    runtime.start_all().await.unwrap();

    let entry = runtime
        .queue_client()
        .enqueue(&queue, welcome("u-42"), EnqueueOptions::default())
        .await
        .unwrap();
    assert!(sent.lock().unwrap().is_empty());

    env.advance(Duration::minutes(1)).await;
    assert_eq!(*sent.lock().unwrap(), vec![welcome("u-42")]);

    let stored = env.store.find_by_id(entry.id).await.unwrap().unwrap();
    assert!(stored.done);
    assert_eq!(
        stored.completed_at,
        Some(helpers::start_time() + Duration::minutes(1))
    );

    env.advance(Duration::minutes(3)).await;
    assert_eq!(sent.lock().unwrap().len(), 1);
    assert_eq!(
        helpers::status(&runtime, "queue-worker").await.last_execution_status,
        ExecutionStatus::Success
    );
}

#[tokio::test]
async fn test_future_entry_waits_for_first_tick_after_its_date() {
    let env = TestEnv::new();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (queue, definition) = welcome_queue(&sent);
    let runtime = env.runtime(vec![], vec![definition]).await;
    runtime.start_all().await.unwrap();

    runtime
        .queue_client()
        .enqueue_at(&queue, welcome("u-7"), helpers::start_time() + Duration::seconds(90))
        .await
        .unwrap();

    env.advance(Duration::minutes(1)).await;
    assert!(sent.lock().unwrap().is_empty());

    env.advance(Duration::minutes(1)).await;
    assert_eq!(*sent.lock().unwrap(), vec![welcome("u-7")]);
}

#[tokio::test]
async fn test_entries_processed_in_execution_order() {
    let env = TestEnv::new();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (queue, definition) = welcome_queue(&sent);
    let runtime = env.runtime(vec![], vec![definition]).await;
    let client = runtime.queue_client();

    client
        .enqueue_at(&queue, welcome("second"), helpers::start_time() + Duration::seconds(20))
        .await
        .unwrap();
    client
        .enqueue_at(&queue, welcome("first"), helpers::start_time() + Duration::seconds(10))
        .await
        .unwrap();

    env.clock.advance(Duration::minutes(1));
    let report = runtime.queue_worker().process_due_entries().await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(*sent.lock().unwrap(), vec![welcome("first"), welcome("second")]);
}

#[tokio::test]
async fn test_failed_callback_retried_on_next_tick() {
    let env = TestEnv::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&attempts);
    let (queue, definition) = Queue::define("welcome-email-retry", move |_payload: WelcomeEmail| {
        let seen = Arc::clone(&seen);
        async move {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(JobExecutionError::failed("smtp connection refused"));
            }
            Ok(())
        }
    });
    let runtime = env.runtime(vec![], vec![definition]).await;
    runtime.start_all().await.unwrap();

    let entry = runtime
        .queue_client()
        .enqueue(&queue, welcome("u-1"), EnqueueOptions::default())
        .await
        .unwrap();

    env.advance(Duration::minutes(1)).await;
    assert_eq!(
        helpers::status(&runtime, "queue-worker").await.last_execution_status,
        ExecutionStatus::Error
    );
    assert!(!env.store.find_by_id(entry.id).await.unwrap().unwrap().done);

    env.advance(Duration::minutes(1)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(env.store.find_by_id(entry.id).await.unwrap().unwrap().done);
    assert_eq!(
        helpers::status(&runtime, "queue-worker").await.last_execution_status,
        ExecutionStatus::Success
    );
}

#[tokio::test]
async fn test_orphaned_entry_left_untouched() {
    let env = TestEnv::new();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (queue, definition) = welcome_queue(&sent);
    let runtime = env.runtime(vec![], vec![definition]).await;
    runtime.start_all().await.unwrap();

    let orphan = QueueEntry::new(
        "legacy-digest",
        serde_json::json!({"userId": "u-9"}),
        helpers::start_time(),
        helpers::start_time(),
    );
    env.store.insert(&orphan).await.unwrap();
    let welcome_entry = runtime
        .queue_client()
        .enqueue(&queue, welcome("u-10"), EnqueueOptions::default())
        .await
        .unwrap();

    env.advance(Duration::minutes(1)).await;

    assert_eq!(*sent.lock().unwrap(), vec![welcome("u-10")]);
    assert!(env.store.find_by_id(welcome_entry.id).await.unwrap().unwrap().done);

    env.advance(Duration::minutes(1)).await;

    assert_eq!(sent.lock().unwrap().len(), 1);
    let stored = env.store.find_by_id(orphan.id).await.unwrap().unwrap();
    assert!(!stored.done);
    assert!(stored.failed_reason.is_none());
    assert_eq!(
        helpers::status(&runtime, "queue-worker").await.last_execution_status,
        ExecutionStatus::Success
    );
}

#[tokio::test]
async fn test_undecodable_payload_marked_failed() {
    let env = TestEnv::new();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (_queue, definition) = welcome_queue(&sent);
    let runtime = env.runtime(vec![], vec![definition]).await;
    runtime.start_all().await.unwrap();

    let broken = QueueEntry::new(
        "welcome-email",
        serde_json::json!({"userId": "u-3", "email": "not-an-email"}),
        helpers::start_time(),
        helpers::start_time(),
    );
    env.store.insert(&broken).await.unwrap();

    env.advance(Duration::minutes(1)).await;

    let stored = env.store.find_by_id(broken.id).await.unwrap().unwrap();
    assert!(!stored.done);
    assert!(stored.failed_reason.is_some());
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cleanup_job_purges_old_completed_entries() {
    let env = TestEnv::new();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (queue, definition) = welcome_queue(&sent);
    let runtime = env.runtime(vec![], vec![definition]).await;

    let entry = runtime
        .queue_client()
        .enqueue(&queue, welcome("u-5"), EnqueueOptions::default())
        .await
        .unwrap();
    runtime.queue_worker().process_due_entries().await.unwrap();

    env.clock.advance(Duration::days(8));
    assert_eq!(
        runtime.run_manually("queue-cleanup").await,
        ManualRunOutcome::Completed
    );

    assert!(env.store.find_by_id(entry.id).await.unwrap().is_none());
}
