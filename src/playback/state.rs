use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::time::{Duration, Instant};

/// Current playback state, as published to the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    None,
    Stopped,
    Playing,
    Paused,
    Buffering,
}

/// Bitmask of transport actions the session layer may offer.
///
/// Bit values follow the media-session convention so the mask can be handed
/// to a platform session unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlaybackActions(u64);

impl PlaybackActions {
    pub const STOP: Self = Self(1 << 0);
    pub const PAUSE: Self = Self(1 << 1);
    pub const PLAY: Self = Self(1 << 2);
    pub const SKIP_TO_PREVIOUS: Self = Self(1 << 4);
    pub const SKIP_TO_NEXT: Self = Self(1 << 5);
    pub const SEEK_TO: Self = Self(1 << 8);
    pub const PLAY_PAUSE: Self = Self(1 << 9);
    pub const PLAY_FROM_MEDIA_ID: Self = Self(1 << 10);
    pub const PLAY_FROM_SEARCH: Self = Self(1 << 11);

    /// Actions offered in every state
    pub const BASELINE: Self = Self(
        Self::PLAY_FROM_MEDIA_ID.0
            | Self::PLAY_FROM_SEARCH.0
            | Self::SKIP_TO_NEXT.0
            | Self::SKIP_TO_PREVIOUS.0,
    );

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PlaybackActions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PlaybackActions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for PlaybackActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(PlaybackActions, &str); 9] = [
            (PlaybackActions::STOP, "STOP"),
            (PlaybackActions::PAUSE, "PAUSE"),
            (PlaybackActions::PLAY, "PLAY"),
            (PlaybackActions::SKIP_TO_PREVIOUS, "SKIP_TO_PREVIOUS"),
            (PlaybackActions::SKIP_TO_NEXT, "SKIP_TO_NEXT"),
            (PlaybackActions::SEEK_TO, "SEEK_TO"),
            (PlaybackActions::PLAY_PAUSE, "PLAY_PAUSE"),
            (PlaybackActions::PLAY_FROM_MEDIA_ID, "PLAY_FROM_MEDIA_ID"),
            (PlaybackActions::PLAY_FROM_SEARCH, "PLAY_FROM_SEARCH"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(action, _)| self.contains(*action))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "PlaybackActions({})", names.join(" | "))
    }
}

/// Actions available in `state`.
///
/// Pure function of the state; never cached, always recomputed before publishing.
pub fn available_actions(state: PlaybackState) -> PlaybackActions {
    let extra = match state {
        PlaybackState::Stopped => PlaybackActions::PLAY | PlaybackActions::PAUSE,
        PlaybackState::Playing => {
            PlaybackActions::STOP | PlaybackActions::PAUSE | PlaybackActions::SEEK_TO
        }
        PlaybackState::Paused => PlaybackActions::PLAY | PlaybackActions::STOP,
        PlaybackState::None | PlaybackState::Buffering => {
            PlaybackActions::PLAY
                | PlaybackActions::PLAY_PAUSE
                | PlaybackActions::STOP
                | PlaybackActions::PAUSE
        }
    };

    PlaybackActions::BASELINE | extra
}

/// Immutable record of the published playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub position: Duration,
    pub playback_speed: f32,
    /// Monotonic time at which `position` was sampled
    pub updated_at: Instant,
    pub actions: PlaybackActions,
}

impl PlaybackSnapshot {
    pub fn new(state: PlaybackState, position: Duration) -> Self {
        Self {
            state,
            position,
            playback_speed: 1.0,
            updated_at: Instant::now(),
            actions: available_actions(state),
        }
    }

    /// Position extrapolated to `now`, assuming playback continued at `playback_speed`
    pub fn position_at(&self, now: Instant) -> Duration {
        if self.state != PlaybackState::Playing {
            return self.position;
        }
        let elapsed = now.saturating_duration_since(self.updated_at);
        self.position + elapsed.mul_f32(self.playback_speed)
    }
}
