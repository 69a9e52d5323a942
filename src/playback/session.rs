use crate::playback::listener::PlaybackInfoListener;
use crate::playback::media::MediaItem;
use crate::playback::state::{PlaybackSnapshot, PlaybackState};
use std::time::Duration;
use tracing::trace;

/// Publish the current state to the listener.
///
/// Sole path from internal state to observers: builds a snapshot tagged with the
/// actions for `state`, then announces the loaded item (if any).
pub fn publish(
    listener: &mut dyn PlaybackInfoListener,
    state: PlaybackState,
    position: Duration,
    current_media: Option<&MediaItem>,
) {
    let snapshot = PlaybackSnapshot::new(state, position);
    trace!(
        "Publishing {:?} at {:?} with {:?}",
        snapshot.state,
        snapshot.position,
        snapshot.actions
    );
    listener.on_playback_state_change(snapshot);

    if let Some(media) = current_media {
        listener.update_ui(&media.id);
    }
}
