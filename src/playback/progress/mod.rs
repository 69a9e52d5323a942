pub mod handle;

use crate::playback::engine::EngineError;
use crate::playback::state::PlaybackSnapshot;
pub use handle::PlaybackProgressHandle;
use std::time::Duration;

/// Progress updates during playback
#[derive(Debug, Clone)]
pub enum PlaybackProgress {
    StateChanged {
        snapshot: PlaybackSnapshot,
    },
    BufferedTo {
        position: Duration,
    },
    SeekTo {
        position: Duration,
        duration: Option<Duration>,
    },
    PlaybackComplete,
    NowPlaying {
        media_id: String,
    },
    Error {
        error: EngineError,
    },
}
