//! Idle-resource reaper for conversations

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::engine::AgentEngine;
use crate::logging::Logger;
use crate::types::CancellationToken;

/// Default sweep period
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(3600);

struct ReaperTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic sweep bounding conversation age and history size
///
/// Conversations idle past the configured max age are deleted (their
/// backend session closed best-effort); oversized histories are trimmed to
/// all system messages plus the trailing window. One conversation's failure
/// never aborts the sweep for the rest.
pub struct ConversationReaper {
    engine: Arc<AgentEngine>,
    logger: Arc<dyn Logger>,
    task: Mutex<Option<ReaperTask>>,
}

impl ConversationReaper {
    /// Create a reaper over an engine
    pub fn new(engine: Arc<AgentEngine>, logger: Arc<dyn Logger>) -> Self {
        Self {
            engine,
            logger,
            task: Mutex::new(None),
        }
    }

    /// Run one sweep; returns how many conversations were deleted
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let max_age = self.engine.config().max_conversation_age;
        let cap = self.engine.config().max_messages;

        let mut deleted = 0;
        for id in self.engine.store().ids() {
            let Some(handle) = self.engine.store().get(&id) else {
                continue;
            };

            let (expired, over_cap) = {
                let conversation = handle.read();
                (
                    now - conversation.updated_at > max_age,
                    conversation.message_count() > cap,
                )
            };

            if expired {
                if self.engine.delete_conversation(&id).await {
                    deleted += 1;
                }
                continue;
            }

            if over_cap && handle.write().trim_to_cap() {
                self.logger.debug(&format!(
                    "[ConversationReaper] Trimmed conversation {} to its message cap",
                    id
                ));
            }
        }

        if deleted > 0 {
            self.logger.info(&format!(
                "[ConversationReaper] Cleaned up {} old conversations",
                deleted
            ));
        }
        deleted
    }

    /// Start the periodic sweep task; a second call is a no-op
    pub fn start(self: Arc<Self>, interval: Duration) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let reaper = Arc::clone(&self);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                reaper.sweep().await;
            }
        });

        *task = Some(ReaperTask { cancel, handle });
        self.logger.info("[ConversationReaper] Started");
    }

    /// Stop the sweep task and wait for it to finish
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.cancel.cancel();
            let _ = task.handle.await;
            self.logger.info("[ConversationReaper] Stopped");
        }
    }
}
