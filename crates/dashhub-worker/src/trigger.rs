//! Remote trigger channel for on-demand job runs.
//!
//! Any process sharing the pub/sub transport can publish a job name on the
//! trigger channel; the scheduler process runs that job as a manual run.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing;

use dashhub_core::result::AppResult;
use dashhub_core::traits::pubsub::PubSubProvider;

use crate::error::TriggerRejection;
use crate::group::JobGroup;

/// Publishes and receives manual trigger requests.
#[derive(Debug, Clone)]
pub struct TriggerChannel {
    pubsub: Arc<dyn PubSubProvider>,
    channel: String,
    group: Arc<JobGroup>,
}

impl TriggerChannel {
    /// Create a trigger channel for `group` on the named pub/sub channel.
    pub fn new(pubsub: Arc<dyn PubSubProvider>, channel: impl Into<String>, group: Arc<JobGroup>) -> Self {
        Self {
            pubsub,
            channel: channel.into(),
            group,
        }
    }

    /// Channel name.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Request a run of `job_name`.
    ///
    /// Unknown and non-triggerable jobs are rejected before anything is
    /// published.
    pub async fn publish(&self, job_name: &str) -> Result<(), TriggerRejection> {
        self.group.check_triggerable(job_name)?;

        self.pubsub
            .publish(&self.channel, job_name)
            .await
            .map_err(|e| TriggerRejection::Transport(e.to_string()))?;

        tracing::info!(job = %job_name, channel = %self.channel, "Trigger published");
        Ok(())
    }

    /// Subscribe to the channel and run every requested job until shutdown.
    ///
    /// The subscription is established before this returns. Each request
    /// is handled on its own task so a long job does not delay others.
    pub async fn listen(&self, mut shutdown: watch::Receiver<bool>) -> AppResult<JoinHandle<()>> {
        let mut requests = self.pubsub.subscribe(&self.channel).await?;
        let group = Arc::clone(&self.group);
        let channel = self.channel.clone();

        tracing::info!(channel = %channel, "Listening for job triggers");

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::info!(channel = %channel, "Trigger listener shutting down");
                            break;
                        }
                    }
                    request = requests.next() => {
                        let Some(job_name) = request else {
                            tracing::warn!(channel = %channel, "Trigger subscription closed");
                            break;
                        };
                        let job_name = job_name.trim().to_string();
                        tracing::debug!(job = %job_name, "Trigger received");

                        let group = Arc::clone(&group);
                        tokio::spawn(async move {
                            group.run_manually(&job_name).await;
                        });
                    }
                }
            }
        }))
    }
}
