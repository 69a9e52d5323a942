use crate::playback::engine::EngineError;
use crate::playback::progress::PlaybackProgress;
use crate::playback::state::PlaybackSnapshot;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;

/// Observer of playback state and progress
pub trait PlaybackInfoListener {
    fn on_playback_state_change(&mut self, snapshot: PlaybackSnapshot);
    fn on_buffered_to(&mut self, position: Duration);
    fn on_seek_to(&mut self, position: Duration, duration: Option<Duration>);
    fn on_playback_complete(&mut self);
    /// Identifier of the item now loaded, sent alongside every state publication
    fn update_ui(&mut self, media_id: &str);
    fn on_error(&mut self, _error: &EngineError) {}
}

/// Forwards every callback as a [`PlaybackProgress`] event
impl PlaybackInfoListener for tokio_mpsc::UnboundedSender<PlaybackProgress> {
    fn on_playback_state_change(&mut self, snapshot: PlaybackSnapshot) {
        let _ = self.send(PlaybackProgress::StateChanged { snapshot });
    }

    fn on_buffered_to(&mut self, position: Duration) {
        let _ = self.send(PlaybackProgress::BufferedTo { position });
    }

    fn on_seek_to(&mut self, position: Duration, duration: Option<Duration>) {
        let _ = self.send(PlaybackProgress::SeekTo { position, duration });
    }

    fn on_playback_complete(&mut self) {
        let _ = self.send(PlaybackProgress::PlaybackComplete);
    }

    fn update_ui(&mut self, media_id: &str) {
        let _ = self.send(PlaybackProgress::NowPlaying {
            media_id: media_id.to_string(),
        });
    }

    fn on_error(&mut self, error: &EngineError) {
        let _ = self.send(PlaybackProgress::Error {
            error: error.clone(),
        });
    }
}
