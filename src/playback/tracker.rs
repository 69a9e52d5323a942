use crate::playback::engine::PlaybackEngine;
use crate::playback::listener::PlaybackInfoListener;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// The pending tick of one load's progress polling.
///
/// At most one is alive at a time; replacing or cancelling it drops the
/// pending tick synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingSubscription {
    pub id: u64,
    pub next_tick: Instant,
}

/// Result of one tracker tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Whether the tick was due and ran
    pub ran: bool,
    /// Whether another tick was scheduled
    pub rescheduled: bool,
    /// Whether end-of-track was reported on this tick
    pub completed: bool,
}

/// Polls the engine while playing, reporting buffered and playback position,
/// and reports end-of-track once per load.
pub struct ProgressTracker {
    interval: Duration,
    subscription: Option<TrackingSubscription>,
    next_subscription_id: u64,
    // One-shot completion guard, armed by every load
    track_updated: bool,
}

impl ProgressTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            subscription: None,
            next_subscription_id: 1,
            track_updated: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Cancel the current subscription (if any) and start a fresh one whose
    /// first tick is one interval after `now`. Re-arms the completion report.
    pub fn restart(&mut self, now: Instant) -> TrackingSubscription {
        self.cancel();
        self.track_updated = true;

        let subscription = TrackingSubscription {
            id: self.next_subscription_id,
            next_tick: now + self.interval,
        };
        self.next_subscription_id += 1;
        self.subscription = Some(subscription);

        debug!("Started progress tracking subscription {}", subscription.id);
        subscription
    }

    /// Schedule a tick if the subscription ended while playback was inactive.
    /// Unlike [`restart`](Self::restart), leaves the completion report as it is.
    pub fn resume(&mut self, now: Instant) {
        if self.subscription.is_some() {
            return;
        }

        let subscription = TrackingSubscription {
            id: self.next_subscription_id,
            next_tick: now + self.interval,
        };
        self.next_subscription_id += 1;
        self.subscription = Some(subscription);
        debug!("Resumed progress tracking as subscription {}", subscription.id);
    }

    /// Drop the pending tick. Safe to call when nothing is scheduled.
    pub fn cancel(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!("Cancelled progress tracking subscription {}", subscription.id);
        }
    }

    pub fn subscription(&self) -> Option<TrackingSubscription> {
        self.subscription
    }

    /// When the next tick is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.subscription.map(|s| s.next_tick)
    }

    pub fn completion_pending(&self) -> bool {
        self.track_updated
    }

    /// Run the pending tick if it is due at `now`.
    ///
    /// While the engine reports play-when-ready, emits buffered and seek progress and
    /// schedules the next tick; otherwise the subscription ends. End-of-track is checked
    /// on every tick regardless and reported at most once per load.
    pub fn tick(
        &mut self,
        now: Instant,
        engine: Option<&dyn PlaybackEngine>,
        listener: &mut dyn PlaybackInfoListener,
    ) -> TickOutcome {
        let subscription = match self.subscription {
            Some(subscription) if subscription.next_tick <= now => subscription,
            _ => return TickOutcome::default(),
        };
        self.subscription = None;

        let mut outcome = TickOutcome {
            ran: true,
            ..TickOutcome::default()
        };

        let Some(engine) = engine else {
            trace!("Tracking subscription {} ended: no engine", subscription.id);
            return outcome;
        };

        let content_position = engine.content_position();
        let duration = engine.duration();

        if engine.play_when_ready() {
            listener.on_buffered_to(engine.buffered_position());
            listener.on_seek_to(content_position, duration);

            self.subscription = Some(TrackingSubscription {
                id: subscription.id,
                next_tick: now + self.interval,
            });
            outcome.rescheduled = true;
        } else {
            trace!(
                "Tracking subscription {} ended: playback inactive",
                subscription.id
            );
        }

        let reached_end = matches!(duration, Some(d) if !d.is_zero() && content_position >= d);
        if reached_end && self.track_updated {
            self.track_updated = false;
            debug!("Playback complete at {:?}", content_position);
            listener.on_playback_complete();
            outcome.completed = true;
        }

        outcome
    }
}
