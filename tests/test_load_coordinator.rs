#![cfg(feature = "test-utils")]

mod support;

use pexo::playback::{
    EngineError, EngineEvent, EngineId, EngineOptions, EngineState, MediaItem, PlaybackError,
    PlaybackProgress, PlaybackState, PlayerAdapter, RepeatMode,
};
use pexo::test_support::MockEngineFactory;
use std::time::Duration;
use support::tracing_init;
use tokio::sync::mpsc as tokio_mpsc;

const INTERVAL: Duration = Duration::from_millis(100);

/// Drives a `PlayerAdapter` synchronously, pumping engine callbacks by hand
struct Coordinator {
    adapter: PlayerAdapter,
    factory: MockEngineFactory,
    engine_rx: tokio_mpsc::UnboundedReceiver<(EngineId, EngineEvent)>,
    progress_rx: tokio_mpsc::UnboundedReceiver<PlaybackProgress>,
}

impl Coordinator {
    fn new(factory: MockEngineFactory) -> Self {
        tracing_init();
        let (engine_tx, engine_rx) = tokio_mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = tokio_mpsc::unbounded_channel::<PlaybackProgress>();
        let adapter = PlayerAdapter::new(
            Box::new(factory.clone()),
            EngineOptions {
                user_agent: "pexo-tests".to_string(),
            },
            engine_tx,
            Box::new(progress_tx),
            INTERVAL,
        );
        Self {
            adapter,
            factory,
            engine_rx,
            progress_rx,
        }
    }

    /// Deliver queued engine callbacks in order
    fn pump(&mut self) {
        while let Ok((engine_id, event)) = self.engine_rx.try_recv() {
            self.adapter.handle_engine_event(engine_id, event);
        }
    }

    fn drain(&mut self) -> Vec<PlaybackProgress> {
        let mut events = Vec::new();
        while let Ok(event) = self.progress_rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn published_states(&mut self) -> Vec<PlaybackState> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackProgress::StateChanged { snapshot } => Some(snapshot.state),
                _ => None,
            })
            .collect()
    }

    /// Run the pending tracker tick, if any
    fn tick(&mut self) -> bool {
        match self.adapter.tracking_deadline() {
            Some(deadline) => self.adapter.on_tracking_tick(deadline).ran,
            None => false,
        }
    }
}

fn track(id: &str) -> MediaItem {
    MediaItem::new(id, format!("file:///music/{}.flac", id))
}

fn count_complete(events: &[PlaybackProgress]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, PlaybackProgress::PlaybackComplete))
        .count()
}

#[test]
fn test_load_reaches_playing_after_ready() {
    let mut c = Coordinator::new(MockEngineFactory::new().announcing_ready());

    c.adapter.play_from_media(track("a")).unwrap();
    c.pump();

    assert_eq!(c.adapter.state(), PlaybackState::Playing);
    assert!(c.adapter.is_playing());
    assert_eq!(c.factory.prepared_uris(), vec!["file:///music/a.flac"]);
    assert_eq!(c.factory.latest().unwrap().user_agent(), "pexo-tests");

    let states = c.published_states();
    assert_eq!(states.first(), Some(&PlaybackState::Playing));
    assert!(states.contains(&PlaybackState::Buffering));
    assert_eq!(states.last(), Some(&PlaybackState::Playing));
}

#[test]
fn test_duplicate_request_keeps_engine() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    let first = c.adapter.engine_id();

    c.adapter.play_from_media(track("a")).unwrap();

    assert_eq!(c.adapter.engine_id(), first);
    assert_eq!(c.factory.created_count(), 1);
    assert_eq!(c.factory.prepared_uris().len(), 1);
    assert!(c.adapter.is_playing());
}

#[test]
fn test_duplicate_request_resumes_paused_engine() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    c.adapter.pause();
    assert_eq!(c.adapter.state(), PlaybackState::Paused);

    c.adapter.play_from_media(track("a")).unwrap();

    assert_eq!(c.factory.created_count(), 1);
    assert_eq!(c.adapter.state(), PlaybackState::Playing);
}

#[test]
fn test_new_item_replaces_engine() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    let first = c.factory.latest().unwrap();

    c.adapter.play_from_media(track("b")).unwrap();

    assert!(first.is_released());
    assert_eq!(c.factory.created_count(), 2);
    assert_ne!(c.adapter.engine_id(), Some(first.id()));
    assert_eq!(c.adapter.current_media().unwrap().id, "b");
}

#[test]
fn test_repeat_one_reloads_same_item() {
    let mut c = Coordinator::new(MockEngineFactory::new());
    c.adapter.set_repeat(RepeatMode::One);

    c.adapter.play_from_media(track("a")).unwrap();
    c.adapter.play_from_media(track("a")).unwrap();

    assert_eq!(c.factory.created_count(), 2);
    assert!(c.factory.engines()[0].is_released());
    assert_eq!(
        c.factory.prepared_uris(),
        vec!["file:///music/a.flac", "file:///music/a.flac"]
    );
}

#[test]
fn test_repeat_all_keeps_engine() {
    let mut c = Coordinator::new(MockEngineFactory::new());
    c.adapter.set_repeat(RepeatMode::All);

    c.adapter.play_from_media(track("a")).unwrap();
    c.adapter.play_from_media(track("a")).unwrap();

    assert_eq!(c.factory.created_count(), 1);
}

#[test]
fn test_stop_publishes_stopped_and_marks_completion() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    let engine = c.factory.latest().unwrap();
    c.drain();

    c.adapter.stop();

    assert_eq!(c.adapter.state(), PlaybackState::Stopped);
    assert!(c.adapter.played_to_completion());
    assert!(engine.is_released());
    assert_eq!(c.adapter.engine_id(), None);
    assert_eq!(c.published_states(), vec![PlaybackState::Stopped]);
}

#[test]
fn test_stop_without_engine_still_publishes() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.stop();

    assert_eq!(c.adapter.state(), PlaybackState::Stopped);
    assert!(c.adapter.played_to_completion());
    assert_eq!(c.published_states(), vec![PlaybackState::Stopped]);
}

#[test]
fn test_replay_after_stop_reloads() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    c.adapter.stop();
    c.adapter.play_from_media(track("a")).unwrap();

    assert_eq!(c.factory.created_count(), 2);
    assert!(!c.adapter.played_to_completion());
    assert_eq!(c.adapter.state(), PlaybackState::Playing);
}

#[test]
fn test_pause_and_play_before_load_are_noops() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.pause();
    c.adapter.play();
    c.adapter.seek_to(Duration::from_secs(3));

    assert_eq!(c.adapter.state(), PlaybackState::None);
    assert!(c.drain().is_empty());
    assert_eq!(c.factory.created_count(), 0);
}

#[test]
fn test_seek_keeps_state_and_publishes_position() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    c.adapter.pause();
    c.drain();

    c.adapter.seek_to(Duration::from_millis(4200));

    assert_eq!(c.adapter.state(), PlaybackState::Paused);
    let snapshot = c
        .drain()
        .into_iter()
        .find_map(|event| match event {
            PlaybackProgress::StateChanged { snapshot } => Some(snapshot),
            _ => None,
        })
        .unwrap();
    assert_eq!(snapshot.state, PlaybackState::Paused);
    assert_eq!(snapshot.position, Duration::from_millis(4200));
}

#[test]
fn test_volume_is_clamped() {
    let mut c = Coordinator::new(MockEngineFactory::new());
    c.adapter.play_from_media(track("a")).unwrap();
    let engine = c.factory.latest().unwrap();

    c.adapter.set_volume(1.7);
    assert_eq!(engine.state().volume, 1.0);

    c.adapter.set_volume(-0.5);
    assert_eq!(engine.state().volume, 0.0);
}

#[test]
fn test_completion_reported_once_then_reloads() {
    let mut c = Coordinator::new(MockEngineFactory::new().with_duration(Duration::from_millis(1000)));

    c.adapter.play_from_media(track("a")).unwrap();
    let engine = c.factory.latest().unwrap();

    engine.set_position(Duration::from_millis(400));
    assert!(c.tick());
    assert_eq!(count_complete(&c.drain()), 0);

    engine.set_position(Duration::from_millis(1000));
    assert!(c.tick());
    let events = c.drain();
    assert_eq!(count_complete(&events), 1);
    assert!(events.iter().any(|event| matches!(
        event,
        PlaybackProgress::StateChanged { snapshot } if snapshot.state == PlaybackState::Stopped
    )));
    assert!(c.adapter.played_to_completion());
    assert!(engine.is_released());

    // With the engine released the next tick ends the subscription
    assert!(c.tick());
    assert_eq!(c.adapter.tracking_deadline(), None);
    assert!(c.drain().is_empty());

    c.adapter.play_from_media(track("a")).unwrap();
    assert_eq!(c.factory.created_count(), 2);
    assert_eq!(c.adapter.state(), PlaybackState::Playing);
}

#[test]
fn test_ticks_report_progress_only_while_playing() {
    let mut c = Coordinator::new(MockEngineFactory::new().with_duration(Duration::from_secs(10)));

    c.adapter.play_from_media(track("a")).unwrap();
    let engine = c.factory.latest().unwrap();
    engine.set_position(Duration::from_millis(300));
    c.drain();

    assert!(c.tick());
    let events = c.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        PlaybackProgress::SeekTo { position, duration: Some(_) }
            if *position == Duration::from_millis(300)
    )));
    assert!(events
        .iter()
        .any(|event| matches!(event, PlaybackProgress::BufferedTo { .. })));

    c.adapter.pause();
    c.drain();
    // The tick scheduled before the pause ends the subscription silently
    assert!(c.tick());
    assert!(c.drain().is_empty());
    assert_eq!(c.adapter.tracking_deadline(), None);

    c.adapter.play();
    assert!(c.adapter.tracking_deadline().is_some());
}

#[test]
fn test_load_failure_releases_and_reports() {
    let factory = MockEngineFactory::new();
    factory.fail_uri("file:///music/broken.flac");
    let mut c = Coordinator::new(factory);

    let result = c.adapter.play_from_media(track("broken"));

    match result {
        Err(PlaybackError::Load { uri, source }) => {
            assert_eq!(uri, "file:///music/broken.flac");
            assert!(matches!(source, EngineError::InvalidSource(_)));
        }
        other => panic!("Unexpected result: {:?}", other),
    }
    assert_eq!(c.adapter.state(), PlaybackState::Stopped);
    assert_eq!(c.adapter.engine_id(), None);
    assert!(c.factory.latest().unwrap().is_released());

    let events = c.drain();
    assert!(events
        .iter()
        .any(|event| matches!(event, PlaybackProgress::Error { .. })));
}

#[test]
fn test_engine_error_stops_playback() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    let engine = c.factory.latest().unwrap();
    engine.emit_error(EngineError::Runtime("decoder fault".to_string()));
    c.pump();

    assert_eq!(c.adapter.state(), PlaybackState::Stopped);
    assert!(engine.is_released());
}

#[test]
fn test_stale_engine_events_ignored() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    let old = c.factory.latest().unwrap();
    c.adapter.play_from_media(track("b")).unwrap();
    c.drain();

    old.emit_state(EngineState::Ended);
    old.emit_error(EngineError::Runtime("late".to_string()));
    c.pump();

    assert_eq!(c.adapter.state(), PlaybackState::Playing);
    assert!(c.drain().is_empty());
}

#[test]
fn test_engine_ended_maps_to_paused() {
    let mut c = Coordinator::new(MockEngineFactory::new());

    c.adapter.play_from_media(track("a")).unwrap();
    c.factory.latest().unwrap().emit_state(EngineState::Ended);
    c.pump();

    assert_eq!(c.adapter.state(), PlaybackState::Paused);
}
