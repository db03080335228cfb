//! Outbound texts: the election status surface, the feed, and
//! self-destructing notices.
//!
//! The status surface is one editable message shared by every reconciler
//! action. Edits to it are serialized per surface; everything else is
//! fire-and-forget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use coop_messages::MessagingPlatform;
use coop_types::{ChannelId, MessageRef, Timestamp};
use tokio::task::JoinHandle;

use crate::cycle_state::CycleStateRepo;
use crate::NodeError;

pub struct StatusBoard {
    platform: Arc<dyn MessagingPlatform>,
    repo: Arc<CycleStateRepo>,
    feed_channel: ChannelId,
    transient_ttl: Duration,
    surface_locks: Mutex<HashMap<MessageRef, Arc<tokio::sync::Mutex<()>>>>,
}

impl StatusBoard {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        repo: Arc<CycleStateRepo>,
        feed_channel: ChannelId,
        transient_ttl: Duration,
    ) -> Self {
        Self {
            platform,
            repo,
            feed_channel,
            transient_ttl,
            surface_locks: Mutex::new(HashMap::new()),
        }
    }

    fn status_surface(&self) -> Result<MessageRef, NodeError> {
        self.repo
            .status_surface()?
            .ok_or_else(|| NodeError::Config("election_message_link is not set".into()))
    }

    fn lock_for(&self, surface: MessageRef) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.surface_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(surface).or_default())
    }

    /// Replace the status surface text. Concurrent callers are applied one
    /// at a time, in lock order.
    pub async fn publish_status(&self, text: &str) -> Result<(), NodeError> {
        let surface = self.status_surface()?;
        let lock = self.lock_for(surface);
        let _guard = lock.lock().await;
        self.platform
            .edit_message(surface, text)
            .await
            .map_err(|e| NodeError::from_surface(surface, e))?;
        tracing::debug!(surface = %surface, "status surface updated");
        Ok(())
    }

    /// When the status surface was last edited (or posted).
    pub async fn status_last_touched(&self) -> Result<Timestamp, NodeError> {
        let surface = self.status_surface()?;
        let snapshot = self
            .platform
            .fetch_message(surface)
            .await
            .map_err(|e| NodeError::from_surface(surface, e))?;
        Ok(snapshot.last_touched())
    }

    /// Post to the feed channel. Failures are logged and swallowed.
    pub async fn post_feed(&self, text: &str) -> Option<MessageRef> {
        match self.platform.post_message(self.feed_channel, text).await {
            Ok(posted) => Some(posted),
            Err(e) => {
                tracing::warn!(error = %e, "feed post failed");
                None
            }
        }
    }

    /// Post a notice that deletes itself after the configured delay.
    ///
    /// Returns the deletion task so callers (tests mostly) can await it.
    pub async fn post_transient(&self, channel: ChannelId, text: &str) -> Option<JoinHandle<()>> {
        let posted = match self.platform.post_message(channel, text).await {
            Ok(posted) => posted,
            Err(e) => {
                tracing::warn!(error = %e, channel = %channel, "transient notice failed");
                return None;
            }
        };
        let platform = Arc::clone(&self.platform);
        let ttl = self.transient_ttl;
        Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = platform.delete_message(posted).await {
                tracing::debug!(error = %e, message = %posted, "transient notice already gone");
            }
        }))
    }
}
