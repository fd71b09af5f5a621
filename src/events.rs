//! In-process lifecycle notifications.
//!
//! Every subscriber sees every event, in publish order. Publishing with no
//! subscribers is not an error.

use crate::api::SiteId;
use crate::tab::Tab;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel; slow subscribers past this lag.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// First successful login or session restore.
    AuthReady,
    /// The tab controller made a tab visible.
    TabActivated(Tab),
    /// The site selector changed.
    SiteSelected(Option<SiteId>),
}

impl LifecycleEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::AuthReady => "auth:ready",
            LifecycleEvent::TabActivated(_) => "tab:activated",
            LifecycleEvent::SiteSelected(_) => "site:selected",
        }
    }
}

/// Fan-out publisher for [`LifecycleEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Returns the number of subscribers that will see the event.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        tracing::debug!("Publishing {} ({:?})", event.name(), event);
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the bus.
pub struct EventSubscription {
    pub id: SubscriptionId,
    receiver: broadcast::Receiver<LifecycleEvent>,
}

impl EventSubscription {
    fn new(receiver: broadcast::Receiver<LifecycleEvent>) -> Self {
        Self {
            id: SubscriptionId::new(),
            receiver,
        }
    }

    /// Receive the next event, waiting if necessary
    pub async fn recv(&mut self) -> Result<LifecycleEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Receive an already-published event without waiting.
    pub fn try_recv(&mut self) -> Result<LifecycleEvent, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// A unique identifier for a subscription
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub uuid::Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
