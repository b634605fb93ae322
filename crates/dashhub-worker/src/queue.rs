//! Typed queues: definitions, the registry, and the producer client.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing;
use validator::Validate;

use dashhub_core::error::AppError;
use dashhub_core::result::AppResult;
use dashhub_core::types::clock::Clock;
use dashhub_database::QueueStore;
use dashhub_entity::queue::QueueEntry;

use crate::error::{JobExecutionError, SchedulerError};

/// Why a queue entry could not be handled.
#[derive(Debug, thiserror::Error)]
pub enum QueueDispatchError {
    /// The stored payload does not match the queue's payload type
    #[error("Payload could not be decoded: {0}")]
    Decode(String),

    /// The decoded payload failed validation
    #[error("Payload failed validation: {0}")]
    Invalid(String),

    /// The queue callback failed
    #[error(transparent)]
    Callback(#[from] JobExecutionError),
}

impl QueueDispatchError {
    /// Whether retrying the same entry can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Invalid(_))
    }
}

/// Type-erased handler for one queue.
#[async_trait]
pub trait QueueHandler: Send + Sync + 'static {
    /// Decode, validate, and process one stored payload.
    async fn handle(&self, payload: serde_json::Value) -> Result<(), QueueDispatchError>;
}

struct TypedHandler<P, F> {
    callback: F,
    _payload: PhantomData<fn(P)>,
}

#[async_trait]
impl<P, F, Fut> QueueHandler for TypedHandler<P, F>
where
    P: DeserializeOwned + Validate + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobExecutionError>> + Send + 'static,
{
    async fn handle(&self, payload: serde_json::Value) -> Result<(), QueueDispatchError> {
        let payload: P = serde_json::from_value(payload)
            .map_err(|e| QueueDispatchError::Decode(e.to_string()))?;
        payload
            .validate()
            .map_err(|e| QueueDispatchError::Invalid(e.to_string()))?;

        (self.callback)(payload).await?;
        Ok(())
    }
}

/// Producer handle for a queue whose payloads are `P`.
pub struct Queue<P> {
    name: Arc<str>,
    _payload: PhantomData<fn(P)>,
}

impl<P> Clone for Queue<P> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _payload: PhantomData,
        }
    }
}

impl<P> std::fmt::Debug for Queue<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("name", &self.name).finish()
    }
}

impl<P> Queue<P>
where
    P: Serialize + DeserializeOwned + Validate + Send + 'static,
{
    /// Define a queue.
    ///
    /// Returns the typed producer handle and the definition to register
    /// with a [`QueueRegistry`].
    pub fn define<F, Fut>(name: impl Into<String>, callback: F) -> (Self, QueueDefinition)
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobExecutionError>> + Send + 'static,
    {
        let name = name.into();
        let handler = TypedHandler {
            callback,
            _payload: PhantomData,
        };

        let queue = Self {
            name: Arc::from(name.as_str()),
            _payload: PhantomData,
        };
        let definition = QueueDefinition {
            name,
            handler: Arc::new(handler),
        };
        (queue, definition)
    }
}

impl<P> Queue<P> {
    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A queue name paired with its type-erased handler.
#[derive(Clone)]
pub struct QueueDefinition {
    name: String,
    handler: Arc<dyn QueueHandler>,
}

impl std::fmt::Debug for QueueDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl QueueDefinition {
    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registered queues, keyed by name.
pub struct QueueRegistry {
    handlers: HashMap<String, Arc<dyn QueueHandler>>,
}

impl std::fmt::Debug for QueueRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueRegistry")
            .field("queues", &self.names())
            .finish()
    }
}

impl QueueRegistry {
    /// Build the registry and the client producers use to enqueue.
    pub fn build(
        definitions: Vec<QueueDefinition>,
        store: Arc<dyn QueueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Arc<Self>, QueueClient), SchedulerError> {
        let mut handlers = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            if handlers.contains_key(&definition.name) {
                return Err(SchedulerError::DuplicateQueue(definition.name));
            }
            handlers.insert(definition.name, definition.handler);
        }

        let registry = Arc::new(Self { handlers });
        tracing::info!(queues = ?registry.names(), "Queue registry built");

        let client = QueueClient {
            registry: Arc::clone(&registry),
            store,
            clock,
        };
        Ok((registry, client))
    }

    /// Handler for a queue, if registered.
    pub fn handler(&self, name: &str) -> Option<Arc<dyn QueueHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Whether a queue is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered queue names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Options for a single enqueue.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Earliest processing time. Defaults to now.
    pub execution_date: Option<DateTime<Utc>>,
}

impl EnqueueOptions {
    /// Process no earlier than `execution_date`.
    pub fn at(execution_date: DateTime<Utc>) -> Self {
        Self {
            execution_date: Some(execution_date),
        }
    }
}

/// Enqueues payloads onto registered queues.
#[derive(Debug, Clone)]
pub struct QueueClient {
    registry: Arc<QueueRegistry>,
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
}

impl QueueClient {
    /// Enqueue a payload.
    ///
    /// Returns once the entry is durably stored. The payload is validated
    /// here and again when the entry is processed.
    pub async fn enqueue<P>(
        &self,
        queue: &Queue<P>,
        payload: P,
        options: EnqueueOptions,
    ) -> AppResult<QueueEntry>
    where
        P: Serialize + Validate,
    {
        if !self.registry.contains(queue.name()) {
            return Err(AppError::validation(format!(
                "Queue '{}' is not registered",
                queue.name()
            )));
        }

        payload.validate().map_err(|e| {
            AppError::validation(format!("Invalid payload for queue '{}': {e}", queue.name()))
        })?;

        let now = self.clock.now();
        let entry = QueueEntry::new(
            queue.name(),
            serde_json::to_value(&payload)?,
            options.execution_date.unwrap_or(now),
            now,
        );
        self.store.insert(&entry).await?;

        tracing::debug!(
            queue = %entry.queue_name,
            entry_id = %entry.id,
            execution_date = %entry.execution_date,
            "Queue entry enqueued"
        );
        Ok(entry)
    }

    /// Enqueue a payload for processing at or after `execution_date`.
    pub async fn enqueue_at<P>(
        &self,
        queue: &Queue<P>,
        payload: P,
        execution_date: DateTime<Utc>,
    ) -> AppResult<QueueEntry>
    where
        P: Serialize + Validate,
    {
        self.enqueue(queue, payload, EnqueueOptions::at(execution_date))
            .await
    }
}
