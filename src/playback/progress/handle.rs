use super::PlaybackProgress;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, info};

type SubscriptionId = u64;

struct Subscription {
    tx: tokio_mpsc::UnboundedSender<PlaybackProgress>,
}

type Subscriptions = Arc<Mutex<HashMap<SubscriptionId, Subscription>>>;

/// Handle for subscribing to playback progress updates
#[derive(Clone)]
pub struct PlaybackProgressHandle {
    subscriptions: Subscriptions,
    next_id: Arc<AtomicU64>,
}

impl PlaybackProgressHandle {
    /// Create a new progress handle and spawn background task to process progress updates
    pub fn new(
        mut progress_rx: tokio_mpsc::UnboundedReceiver<PlaybackProgress>,
        runtime_handle: tokio::runtime::Handle,
    ) -> Self {
        let subscriptions: Subscriptions = Arc::new(Mutex::new(HashMap::new()));
        let subscriptions_clone = subscriptions.clone();

        runtime_handle.spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                dispatch(&subscriptions_clone, progress);
            }
            info!("Playback progress channel closed, exiting");
        });

        Self {
            subscriptions,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to all playback progress updates.
    /// Subscription is automatically removed when the receiver is dropped.
    pub fn subscribe_all(&self) -> tokio_mpsc::UnboundedReceiver<PlaybackProgress> {
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        lock(&self.subscriptions).insert(id, Subscription { tx });
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscriptions).len()
    }
}

fn dispatch(subscriptions: &Subscriptions, progress: PlaybackProgress) {
    let mut subs = lock(subscriptions);

    // A failed send means the receiver was dropped
    subs.retain(|id, subscription| {
        let alive = subscription.tx.send(progress.clone()).is_ok();
        if !alive {
            debug!("Removing dropped progress subscription {}", id);
        }
        alive
    });
}

// Subscribers hold no invariants across a panic, so a poisoned map is still usable
fn lock(subscriptions: &Subscriptions) -> MutexGuard<'_, HashMap<SubscriptionId, Subscription>> {
    subscriptions
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
