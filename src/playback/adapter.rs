//! Playback state machine and media load coordination.
//!
//! [`PlayerAdapter`] is the single owned aggregate for a playback session: the
//! current state, the loaded item, the completion/repeat/shuffle flags, the engine
//! instance and the progress tracker. Every handler takes `&mut self`; the owner
//! (see [`crate::playback::service`]) delivers commands, engine events and tracker
//! ticks to it serially.

use crate::playback::engine::{
    EngineError, EngineEvent, EngineEventSender, EngineFactory, EngineId, EngineOptions,
    EngineState, PlaybackEngine,
};
use crate::playback::listener::PlaybackInfoListener;
use crate::playback::media::{MediaItem, RepeatMode, ShuffleMode};
use crate::playback::session;
use crate::playback::state::PlaybackState;
use crate::playback::tracker::{ProgressTracker, TickOutcome};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Fatal: the session is unusable until another item is requested
    #[error("Failed to play media uri: {uri}")]
    Load {
        uri: String,
        #[source]
        source: EngineError,
    },
    #[error("Playback service is not running")]
    ServiceUnavailable,
}

struct ActiveEngine {
    id: EngineId,
    engine: Box<dyn PlaybackEngine>,
}

/// Snapshot of adapter fields exposed to callers
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub current_media: Option<MediaItem>,
    pub repeat_mode: RepeatMode,
    pub shuffle_mode: ShuffleMode,
}

pub struct PlayerAdapter {
    factory: Box<dyn EngineFactory>,
    engine_options: EngineOptions,
    engine_events_tx: tokio_mpsc::UnboundedSender<(EngineId, EngineEvent)>,
    next_engine_id: u64,
    engine: Option<ActiveEngine>,
    listener: Box<dyn PlaybackInfoListener>,
    tracker: ProgressTracker,
    state: PlaybackState,
    current_media: Option<MediaItem>,
    played_to_completion: bool,
    repeat_mode: RepeatMode,
    shuffle_mode: ShuffleMode,
    buffering_started: Option<Instant>,
}

impl PlayerAdapter {
    pub fn new(
        factory: Box<dyn EngineFactory>,
        engine_options: EngineOptions,
        engine_events_tx: tokio_mpsc::UnboundedSender<(EngineId, EngineEvent)>,
        listener: Box<dyn PlaybackInfoListener>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            factory,
            engine_options,
            engine_events_tx,
            next_engine_id: 1,
            engine: None,
            listener,
            tracker: ProgressTracker::new(progress_interval),
            state: PlaybackState::None,
            current_media: None,
            played_to_completion: false,
            repeat_mode: RepeatMode::None,
            shuffle_mode: ShuffleMode::None,
            buffering_started: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_media(&self) -> Option<&MediaItem> {
        self.current_media.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|active| active.engine.play_when_ready())
    }

    pub fn played_to_completion(&self) -> bool {
        self.played_to_completion
    }

    pub fn engine_id(&self) -> Option<EngineId> {
        self.engine.as_ref().map(|active| active.id)
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn shuffle_mode(&self) -> ShuffleMode {
        self.shuffle_mode
    }

    pub fn is_shuffle_enabled(&self) -> bool {
        self.shuffle_mode.is_enabled()
    }

    /// When the tracker next needs to run
    pub fn tracking_deadline(&self) -> Option<Instant> {
        self.tracker.deadline()
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            is_playing: self.is_playing(),
            current_media: self.current_media.clone(),
            repeat_mode: self.repeat_mode,
            shuffle_mode: self.shuffle_mode,
        }
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        debug!("Repeat mode: {:?}", mode);
        self.repeat_mode = mode;
    }

    pub fn set_shuffle(&mut self, mode: ShuffleMode) {
        debug!("Shuffle mode: {:?}", mode);
        self.shuffle_mode = mode;
    }

    pub fn play(&mut self) {
        if let Some(active) = self.engine.as_mut() {
            if !active.engine.play_when_ready() {
                active.engine.set_play_when_ready(true);
                self.set_state(PlaybackState::Playing);
                // Progress polling ends while paused
                self.tracker.resume(Instant::now());
            }
        }
    }

    pub fn pause(&mut self) {
        if let Some(active) = self.engine.as_mut() {
            if active.engine.play_when_ready() {
                active.engine.set_play_when_ready(false);
                self.set_state(PlaybackState::Paused);
            }
        }
    }

    /// Always publishes STOPPED, even without an engine, so the session layer can
    /// tear down its presentation.
    pub fn stop(&mut self) {
        self.set_state(PlaybackState::Stopped);
        self.release();
    }

    /// Seek and republish the unchanged state so observers see the new position
    pub fn seek_to(&mut self, position: Duration) {
        if let Some(active) = self.engine.as_mut() {
            active.engine.seek_to(position);
            self.set_state(self.state);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        if let Some(active) = self.engine.as_mut() {
            active.engine.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    /// Request playback of `item`, restarting progress tracking.
    ///
    /// The engine is reused when the same item is requested again, unless it was
    /// played to completion or repeat-one is enabled.
    pub fn play_from_media(&mut self, item: MediaItem) -> Result<(), PlaybackError> {
        self.tracker.restart(Instant::now());
        self.load(item)
    }

    fn load(&mut self, item: MediaItem) -> Result<(), PlaybackError> {
        let mut media_changed = self
            .current_media
            .as_ref()
            .map_or(true, |current| current.id != item.id);

        if self.played_to_completion {
            // The engine was released after completion; same id still needs a reload
            media_changed = true;
            self.played_to_completion = false;
        }

        if !media_changed {
            if self.repeat_mode.repeats_current() {
                debug!("Repeat-one: restarting {}", item.id);
                self.release();
            } else {
                debug!("Resuming already loaded media {}", item.id);
                if !self.is_playing() {
                    self.play();
                }
                return Ok(());
            }
        } else {
            self.release();
        }

        info!("Loading media {} from {}", item.id, item.uri);
        let uri = item.uri.clone();
        self.current_media = Some(item);

        if let Err(source) = self.prepare(&uri) {
            error!("Failed to play media uri {}: {}", uri, source);
            self.listener.on_error(&source);
            self.stop();
            return Err(PlaybackError::Load { uri, source });
        }

        self.play();
        Ok(())
    }

    fn prepare(&mut self, uri: &str) -> Result<(), EngineError> {
        let active = self.initialize_engine()?;
        active.engine.prepare(uri)
    }

    fn initialize_engine(&mut self) -> Result<&mut ActiveEngine, EngineError> {
        if self.engine.is_none() {
            let id = EngineId(self.next_engine_id);
            self.next_engine_id += 1;

            let events = EngineEventSender::new(id, self.engine_events_tx.clone());
            let engine = self.factory.create(&self.engine_options, events)?;
            debug!("Created {}", id);
            self.engine = Some(ActiveEngine { id, engine });
        }

        self.engine
            .as_mut()
            .ok_or_else(|| EngineError::Runtime("engine unavailable".to_string()))
    }

    fn release(&mut self) {
        if let Some(mut active) = self.engine.take() {
            active.engine.release();
            debug!("Released {}", active.id);
        }
    }

    /// Apply an engine callback. Events from an engine other than the current one
    /// are ignored.
    pub fn handle_engine_event(&mut self, engine_id: EngineId, event: EngineEvent) {
        if self.engine_id() != Some(engine_id) {
            warn!("Ignoring {:?} from stale {}", event, engine_id);
            return;
        }

        match event {
            EngineEvent::StateChanged(EngineState::Ended) => {
                self.set_state(PlaybackState::Paused);
            }
            EngineEvent::StateChanged(EngineState::Buffering) => {
                self.set_state(PlaybackState::Buffering);
                self.buffering_started = Some(Instant::now());
            }
            EngineEvent::StateChanged(EngineState::Idle) => {
                self.set_state(PlaybackState::None);
            }
            EngineEvent::StateChanged(EngineState::Ready) => {
                if let Some(started) = self.buffering_started.take() {
                    debug!("Buffering took {:?}", started.elapsed());
                }
                let state = if self.is_playing() {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Paused
                };
                self.set_state(state);
            }
            EngineEvent::Error(engine_error) => {
                warn!("Engine error from {}: {}", engine_id, engine_error);
                self.listener.on_error(&engine_error);
                self.stop();
            }
        }
    }

    /// Run the progress tracker if its tick is due
    pub fn on_tracking_tick(&mut self, now: Instant) -> TickOutcome {
        let engine = self.engine.as_ref().map(|active| active.engine.as_ref());
        let outcome = self.tracker.tick(now, engine, self.listener.as_mut());

        if outcome.completed {
            // Natural end: same id must reload on the next request
            self.stop();
        }
        outcome
    }

    /// Stop tracking and release the engine without publishing
    pub fn shutdown(&mut self) {
        self.tracker.cancel();
        self.release();
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!("Playback state {:?} -> {:?}", self.state, state);
        }
        self.state = state;

        if state == PlaybackState::Stopped {
            self.played_to_completion = true;
        }

        let position = self
            .engine
            .as_ref()
            .map_or(Duration::ZERO, |active| active.engine.current_position());

        session::publish(
            self.listener.as_mut(),
            self.state,
            position,
            self.current_media.as_ref(),
        );
    }
}
