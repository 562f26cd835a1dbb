//! Outbound message delivery.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ChannelId, SubjectId};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from sending a message.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The channel rejected the message or does not exist.
    #[error("channel {0} unreachable")]
    ChannelUnreachable(ChannelId),

    /// The buyer's direct channel rejected the message (closed DMs,
    /// blocked bot).
    #[error("subject {0} unreachable")]
    SubjectUnreachable(SubjectId),
}

/// Sends workflow messages to channels and buyers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts a message to a community channel.
    async fn notify_channel(&self, channel_id: ChannelId, message: &str) -> Result<(), NotifyError>;

    /// Delivers a message to a buyer's direct channel.
    async fn notify_buyer(&self, subject_id: SubjectId, message: &str) -> Result<(), NotifyError>;
}

/// In-memory notifier for tests: records every message and can be told
/// to fail specific channels or all buyer deliveries.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<RwLock<RecorderState>>,
}

#[derive(Debug, Default)]
struct RecorderState {
    channel_messages: Vec<(ChannelId, String)>,
    buyer_messages: Vec<(SubjectId, String)>,
    fail_channels: HashSet<ChannelId>,
    fail_buyers: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes deliveries to the given channel fail.
    pub async fn fail_channel(&self, channel_id: ChannelId) {
        self.state.write().await.fail_channels.insert(channel_id);
    }

    /// Makes all buyer deliveries fail.
    pub async fn set_fail_buyers(&self, fail: bool) {
        self.state.write().await.fail_buyers = fail;
    }

    /// Returns every channel message sent so far.
    pub async fn channel_messages(&self) -> Vec<(ChannelId, String)> {
        self.state.read().await.channel_messages.clone()
    }

    /// Returns every buyer message sent so far.
    pub async fn buyer_messages(&self) -> Vec<(SubjectId, String)> {
        self.state.read().await.buyer_messages.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_channel(&self, channel_id: ChannelId, message: &str) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;
        if state.fail_channels.contains(&channel_id) {
            return Err(NotifyError::ChannelUnreachable(channel_id));
        }
        state.channel_messages.push((channel_id, message.to_string()));
        Ok(())
    }

    async fn notify_buyer(&self, subject_id: SubjectId, message: &str) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;
        if state.fail_buyers {
            return Err(NotifyError::SubjectUnreachable(subject_id));
        }
        state.buyer_messages.push((subject_id, message.to_string()));
        Ok(())
    }
}
