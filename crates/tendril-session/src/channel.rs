//! Cross-context channels, one fan-out topic per document.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::message::Envelope;

/// Topic name for a document path.
///
/// ```
/// use tendril_session::channel_name;
///
/// assert_eq!(channel_name("/notes/rust/"), "tendril:notes/rust");
/// ```
#[must_use]
pub fn channel_name(path: &str) -> String {
    format!("tendril:{}", path.trim_matches('/'))
}

/// Registry of per-document topics.
///
/// Every subscriber has its own unbounded queue, so a slow context never
/// loses messages. Cloning the hub is cheap; clones share topics. Sessions
/// opened on the same document path through one hub see each other's
/// messages, sessions on different paths never do.
#[derive(Debug, Clone, Default)]
pub struct ChannelHub {
    state: Arc<Mutex<HubState>>,
}

#[derive(Debug, Default)]
struct HubState {
    topics: HashMap<String, Vec<mpsc::UnboundedSender<Envelope>>>,
    shut_down: bool,
}

impl ChannelHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, creating it on first use.
    pub(crate) fn subscribe(
        &self,
        channel: &str,
    ) -> Result<mpsc::UnboundedReceiver<Envelope>, SessionError> {
        let mut state = self.lock();
        if state.shut_down {
            return Err(SessionError::UnsupportedEnvironment(
                "channel hub is shut down".to_owned(),
            ));
        }

        let subscribers = state.topics.entry(channel.to_owned()).or_insert_with(|| {
            tracing::debug!(channel, "Creating document channel");
            Vec::new()
        });
        let (sender, receiver) = mpsc::unbounded_channel();
        subscribers.push(sender);
        Ok(receiver)
    }

    /// Deliver to every live subscriber of a topic, in publish order.
    /// Fails once the topic is gone.
    pub(crate) fn publish(&self, channel: &str, envelope: Envelope) -> Result<(), SessionError> {
        let mut state = self.lock();
        let subscribers = state.topics.get_mut(channel).ok_or(SessionError::Closed)?;
        subscribers.retain(|sender| sender.send(envelope.clone()).is_ok());
        if subscribers.is_empty() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    /// Drop subscribers that stopped listening, and the topic once none remain.
    pub(crate) fn release(&self, channel: &str) {
        let mut state = self.lock();
        let Some(subscribers) = state.topics.get_mut(channel) else {
            return;
        };
        subscribers.retain(|sender| !sender.is_closed());
        if subscribers.is_empty() {
            state.topics.remove(channel);
            tracing::debug!(channel, "Removed document channel");
        }
    }

    /// Number of live topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.lock().topics.len()
    }

    /// Close every topic and refuse new subscriptions.
    ///
    /// Open sessions see their channel close and stop.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.shut_down = true;
        state.topics.clear();
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
