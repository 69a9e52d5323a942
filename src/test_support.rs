// Test support utilities for both unit and integration tests

use crate::playback::engine::{
    EngineError, EngineEventSender, EngineFactory, EngineId, EngineOptions, EngineState,
    PlaybackEngine,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Observable state of one mock engine instance
#[derive(Debug, Clone, Default)]
pub struct MockEngineState {
    pub prepared: Option<String>,
    pub play_when_ready: bool,
    pub position: Duration,
    pub buffered: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub release_count: usize,
}

/// Test-side control over a mock engine created by [`MockEngineFactory`]
#[derive(Clone)]
pub struct MockEngineHandle {
    state: Arc<Mutex<MockEngineState>>,
    events: EngineEventSender,
    user_agent: String,
}

impl MockEngineHandle {
    pub fn id(&self) -> EngineId {
        self.events.engine_id()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn state(&self) -> MockEngineState {
        lock(&self.state).clone()
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).release_count > 0
    }

    /// Move the playhead, as if playback had progressed
    pub fn set_position(&self, position: Duration) {
        let mut state = lock(&self.state);
        state.position = position;
        state.buffered = state.buffered.max(position);
    }

    pub fn set_buffered(&self, buffered: Duration) {
        lock(&self.state).buffered = buffered;
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        lock(&self.state).duration = duration;
    }

    pub fn emit_state(&self, state: EngineState) {
        self.events.state_changed(state);
    }

    pub fn emit_error(&self, error: EngineError) {
        self.events.error(error);
    }
}

#[derive(Default)]
struct FactoryInner {
    engines: Vec<MockEngineHandle>,
    failing_uris: HashSet<String>,
    default_duration: Option<Duration>,
    announce_ready: bool,
}

/// In-memory engine factory
///
/// Records every engine it creates so tests can drive positions and callbacks.
/// Clones share the same records.
#[derive(Clone, Default)]
pub struct MockEngineFactory {
    inner: Arc<Mutex<FactoryInner>>,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration reported by engines once prepared
    pub fn with_duration(self, duration: Duration) -> Self {
        lock(&self.inner).default_duration = Some(duration);
        self
    }

    /// Emit BUFFERING then READY after every successful prepare
    pub fn announcing_ready(self) -> Self {
        lock(&self.inner).announce_ready = true;
        self
    }

    /// Make `prepare` fail for `uri`
    pub fn fail_uri(&self, uri: impl Into<String>) {
        lock(&self.inner).failing_uris.insert(uri.into());
    }

    pub fn engines(&self) -> Vec<MockEngineHandle> {
        lock(&self.inner).engines.clone()
    }

    pub fn created_count(&self) -> usize {
        lock(&self.inner).engines.len()
    }

    pub fn latest(&self) -> Option<MockEngineHandle> {
        lock(&self.inner).engines.last().cloned()
    }

    /// URIs passed to a successful `prepare`, in order
    pub fn prepared_uris(&self) -> Vec<String> {
        self.engines()
            .iter()
            .filter_map(|engine| engine.state().prepared)
            .collect()
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(
        &mut self,
        options: &EngineOptions,
        events: EngineEventSender,
    ) -> Result<Box<dyn PlaybackEngine>, EngineError> {
        let mut inner = lock(&self.inner);
        let state = Arc::new(Mutex::new(MockEngineState {
            volume: 1.0,
            ..Default::default()
        }));

        let handle = MockEngineHandle {
            state: state.clone(),
            events: events.clone(),
            user_agent: options.user_agent.clone(),
        };
        inner.engines.push(handle);

        Ok(Box::new(MockEngine {
            state,
            events,
            failing_uris: inner.failing_uris.clone(),
            default_duration: inner.default_duration,
            announce_ready: inner.announce_ready,
        }))
    }
}

/// Engine that plays nothing; position only moves when a test moves it
pub struct MockEngine {
    state: Arc<Mutex<MockEngineState>>,
    events: EngineEventSender,
    failing_uris: HashSet<String>,
    default_duration: Option<Duration>,
    announce_ready: bool,
}

impl PlaybackEngine for MockEngine {
    fn prepare(&mut self, source: &str) -> Result<(), EngineError> {
        if self.failing_uris.contains(source) {
            return Err(EngineError::InvalidSource(source.to_string()));
        }

        {
            let mut state = lock(&self.state);
            state.prepared = Some(source.to_string());
            state.position = Duration::ZERO;
            state.buffered = Duration::ZERO;
            state.duration = self.default_duration;
        }

        if self.announce_ready {
            self.events.state_changed(EngineState::Buffering);
            self.events.state_changed(EngineState::Ready);
        }
        Ok(())
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        lock(&self.state).play_when_ready = play_when_ready;
    }

    fn play_when_ready(&self) -> bool {
        lock(&self.state).play_when_ready
    }

    fn seek_to(&mut self, position: Duration) {
        lock(&self.state).position = position;
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.state).volume = volume;
    }

    fn current_position(&self) -> Duration {
        lock(&self.state).position
    }

    fn content_position(&self) -> Duration {
        lock(&self.state).position
    }

    fn buffered_position(&self) -> Duration {
        lock(&self.state).buffered
    }

    fn duration(&self) -> Option<Duration> {
        lock(&self.state).duration
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        state.release_count += 1;
        state.play_when_ready = false;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
