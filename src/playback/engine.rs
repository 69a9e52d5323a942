//! Engine facade: the narrow capability this crate needs from a decode/render engine.
//!
//! The engine itself (decoding, network fetching, output) lives outside this crate.
//! Implementations report state asynchronously through an [`EngineEventSender`];
//! every event is tagged with the [`EngineId`] of the instance that produced it so
//! events from a released engine can be discarded.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc as tokio_mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid source: {0}")]
    InvalidSource(String),
    #[error("Unsupported source: {0}")]
    Unsupported(String),
    #[error("Engine error: {0}")]
    Runtime(String),
}

/// Engine-internal playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Events delivered by an engine instance
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged(EngineState),
    Error(EngineError),
}

/// Identity of one engine instance; a fresh id is minted for every `create`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(pub(crate) u64);

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

/// Sender handed to an engine instance for its callbacks
#[derive(Clone)]
pub struct EngineEventSender {
    engine_id: EngineId,
    tx: tokio_mpsc::UnboundedSender<(EngineId, EngineEvent)>,
}

impl EngineEventSender {
    pub(crate) fn new(
        engine_id: EngineId,
        tx: tokio_mpsc::UnboundedSender<(EngineId, EngineEvent)>,
    ) -> Self {
        Self { engine_id, tx }
    }

    pub fn engine_id(&self) -> EngineId {
        self.engine_id
    }

    pub fn state_changed(&self, state: EngineState) {
        self.send(EngineEvent::StateChanged(state));
    }

    pub fn error(&self, error: EngineError) {
        self.send(EngineEvent::Error(error));
    }

    /// Delivery is best-effort: once the owning service has shut down there is
    /// nobody left to observe the event.
    pub fn send(&self, event: EngineEvent) {
        let _ = self.tx.send((self.engine_id, event));
    }
}

/// Options passed to the factory for every new engine instance
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub user_agent: String,
}

/// Operations required from one engine instance.
///
/// Instances are owned by a single playback thread and are not required to be `Send`.
pub trait PlaybackEngine {
    /// Request preparation of `source`. Returns an error when the source cannot be
    /// turned into a playable stream; readiness is reported later via events.
    fn prepare(&mut self, source: &str) -> Result<(), EngineError>;
    fn set_play_when_ready(&mut self, play_when_ready: bool);
    fn play_when_ready(&self) -> bool;
    fn seek_to(&mut self, position: Duration);
    fn set_volume(&mut self, volume: f32);
    fn current_position(&self) -> Duration;
    fn content_position(&self) -> Duration;
    fn buffered_position(&self) -> Duration;
    /// `None` while the duration is not yet known
    fn duration(&self) -> Option<Duration>;
    /// Must be idempotent
    fn release(&mut self);
}

/// Creates engine instances on the playback thread
pub trait EngineFactory: Send + 'static {
    fn create(
        &mut self,
        options: &EngineOptions,
        events: EngineEventSender,
    ) -> Result<Box<dyn PlaybackEngine>, EngineError>;
}
