//! Notification hub for slice-ready events.
//!
//! Loads complete on several paths: a direct request, the background
//! prefetcher, or the progressive first sweep. Consumers subscribe per
//! side and receive one event per completed slice over their own
//! unbounded channel, so a consumer that is slow to drain its channel
//! never stalls the publisher or other consumers.
//!
//! Every event carries its own copy of the slice snapshot, cloned at
//! emission time. Events published before a subscription existed are
//! not replayed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::RwLock;

use crate::engine::Side;
use crate::slice::SliceSnapshot;

/// Which path produced a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceOrigin {
    /// Synchronous answer to a consumer request
    DirectLoad,
    /// Speculative load around the cursor
    Prefetch,
    /// Batch of the progressive first sweep
    ProgressiveLoad,
}

impl std::fmt::Display for SliceOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceOrigin::DirectLoad => write!(f, "direct-load"),
            SliceOrigin::Prefetch => write!(f, "prefetch"),
            SliceOrigin::ProgressiveLoad => write!(f, "progressive-load"),
        }
    }
}

/// One slice-ready announcement.
#[derive(Debug, Clone)]
pub struct SliceEvent {
    pub side: Side,
    pub origin: SliceOrigin,
    pub snapshot: SliceSnapshot,
}

/// Identity of one subscription, unique for the lifetime of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Receiving end of one subscription.
///
/// Dropping the subscription is equivalent to unsubscribing; the hub
/// prunes the dead sender on its next publish to this side.
pub struct SliceSubscription {
    id: SubscriberId,
    side: Side,
    rx: mpsc::UnboundedReceiver<SliceEvent>,
}

impl SliceSubscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Wait for the next event. Returns `None` once the hub is gone and
    /// the channel is drained.
    pub async fn recv(&mut self) -> Option<SliceEvent> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<SliceEvent> {
        self.rx.try_recv().ok()
    }
}

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<SliceEvent>,
}

/// Per-side registry of slice-event subscribers.
///
/// Thread-safe; the engine and its workers share one hub via `Arc`.
pub struct NotificationHub {
    subscribers: RwLock<HashMap<Side, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a subscriber for one side.
    pub async fn subscribe(&self, side: Side) -> SliceSubscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.write().await;
        subscribers
            .entry(side)
            .or_default()
            .push(Subscriber { id, tx });

        SliceSubscription { id, side, rx }
    }

    /// Remove a subscriber explicitly. Returns whether it was registered.
    pub async fn unsubscribe(&self, side: Side, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        match subscribers.get_mut(&side) {
            Some(list) => {
                let before = list.len();
                list.retain(|s| s.id != id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Deliver one event to every live subscriber of `side`, in
    /// registration order. Each subscriber receives its own clone of the
    /// snapshot. Subscribers whose receiver is gone are pruned.
    ///
    /// Returns the number of subscribers the event reached.
    pub async fn publish(
        &self,
        side: Side,
        origin: SliceOrigin,
        snapshot: &SliceSnapshot,
    ) -> usize {
        let mut subscribers = self.subscribers.write().await;
        let Some(list) = subscribers.get_mut(&side) else {
            return 0;
        };

        let mut delivered = 0;
        list.retain(|subscriber| {
            let event = SliceEvent {
                side,
                origin,
                snapshot: snapshot.clone(),
            };
            match subscriber.tx.send(event) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    /// Number of live subscribers currently registered for `side`.
    pub async fn subscriber_count(&self, side: Side) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers.get(&side).map_or(0, |list| list.len())
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
