pub mod adapter;
pub mod engine;
pub mod listener;
pub mod media;
pub mod progress;
pub mod service;
pub mod session;
pub mod state;
pub mod tracker;

pub use adapter::{PlaybackError, PlaybackStatus, PlayerAdapter};
pub use engine::{
    EngineError, EngineEvent, EngineEventSender, EngineFactory, EngineId, EngineOptions,
    EngineState, PlaybackEngine,
};
pub use listener::PlaybackInfoListener;
pub use media::{MediaItem, RepeatMode, ShuffleMode};
pub use progress::{PlaybackProgress, PlaybackProgressHandle};
pub use service::{PlaybackCommand, PlaybackHandle, PlaybackService};
pub use state::{available_actions, PlaybackActions, PlaybackSnapshot, PlaybackState};
