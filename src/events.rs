//! Lifecycle events
//!
//! The manager communicates results exclusively through events; nothing in the
//! create/purge paths returns an outcome to its caller. `EventBus` is a small
//! subscriber list over tokio mpsc channels: delivery is best-effort and never
//! blocks the manager, a subscriber that falls behind loses events with a
//! warning.

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tracing::warn;

/// Buffered events per subscriber
const CHANNEL_CAPACITY: usize = 32;

/// Lifecycle event emitted by the backup manager
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BackupEvent {
    /// A backup creation was submitted to the provider
    BackupStart {
        /// Backup label
        name: String,
    },
    /// The provider finished creating a backup
    BackupSuccessful {
        /// Backup label
        name: String,
        /// Identifier assigned by the provider
        slug: String,
    },
    /// The provider failed to create a backup
    BackupFailed {
        /// Backup label
        name: String,
        /// Error text
        error: String,
    },
    /// Expired backups were removed
    BackupsPurged {
        /// Identifiers of the removed backups
        slugs: Vec<String>,
    },
}

/// Fan-out bus for backup lifecycle events
pub struct EventBus {
    subscribers: RwLock<Vec<mpsc::Sender<BackupEvent>>>,
}

impl EventBus {
    /// Creates an empty bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Registers a new subscriber and returns its receiving end
    pub async fn subscribe(&self) -> mpsc::Receiver<BackupEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscribers.write().await.push(tx);
        rx
    }

    /// Publishes an event to every live subscriber
    ///
    /// Closed subscribers are dropped from the list; full ones lose the event.
    pub async fn publish(&self, event: BackupEvent) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(?event, "Event subscriber buffer full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Returns the number of live subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
