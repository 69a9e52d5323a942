use crate::config::PlaybackConfig;
use crate::playback::adapter::{PlaybackError, PlaybackStatus, PlayerAdapter};
use crate::playback::engine::{EngineEvent, EngineFactory, EngineId, EngineOptions};
use crate::playback::media::{MediaItem, RepeatMode, ShuffleMode};
use crate::playback::progress::{PlaybackProgress, PlaybackProgressHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Playback commands sent to the service
#[derive(Debug)]
pub enum PlaybackCommand {
    PlayFromMedia {
        item: MediaItem,
        reply: Option<oneshot::Sender<Result<(), PlaybackError>>>,
    },
    Play,
    Pause,
    Stop,
    Seek(Duration),
    SetVolume(f32),
    SetRepeat(RepeatMode),
    SetShuffle(ShuffleMode),
    GetStatus(oneshot::Sender<PlaybackStatus>),
    Shutdown,
}

/// Handle to the playback service for sending commands
#[derive(Clone)]
pub struct PlaybackHandle {
    command_tx: tokio_mpsc::UnboundedSender<PlaybackCommand>,
    progress_handle: PlaybackProgressHandle,
}

impl PlaybackHandle {
    /// Request playback of `item` and wait for the load decision.
    ///
    /// A `PlaybackError::Load` is fatal for the current item; nothing is retried.
    pub async fn play_from_media(&self, item: MediaItem) -> Result<(), PlaybackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PlaybackCommand::PlayFromMedia {
            item,
            reply: Some(reply_tx),
        })?;
        reply_rx
            .await
            .map_err(|_| PlaybackError::ServiceUnavailable)?
    }

    pub fn play(&self) {
        let _ = self.command_tx.send(PlaybackCommand::Play);
    }

    pub fn pause(&self) {
        let _ = self.command_tx.send(PlaybackCommand::Pause);
    }

    pub fn stop(&self) {
        let _ = self.command_tx.send(PlaybackCommand::Stop);
    }

    pub fn seek(&self, position: Duration) {
        let _ = self.command_tx.send(PlaybackCommand::Seek(position));
    }

    pub fn set_volume(&self, volume: f32) {
        let _ = self.command_tx.send(PlaybackCommand::SetVolume(volume));
    }

    pub fn set_repeat(&self, mode: RepeatMode) {
        let _ = self.command_tx.send(PlaybackCommand::SetRepeat(mode));
    }

    pub fn set_shuffle(&self, mode: ShuffleMode) {
        let _ = self.command_tx.send(PlaybackCommand::SetShuffle(mode));
    }

    pub async fn status(&self) -> Result<PlaybackStatus, PlaybackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PlaybackCommand::GetStatus(reply_tx))?;
        reply_rx.await.map_err(|_| PlaybackError::ServiceUnavailable)
    }

    pub async fn is_playing(&self) -> Result<bool, PlaybackError> {
        Ok(self.status().await?.is_playing)
    }

    pub async fn current_media(&self) -> Result<Option<MediaItem>, PlaybackError> {
        Ok(self.status().await?.current_media)
    }

    pub fn shutdown(&self) {
        let _ = self.command_tx.send(PlaybackCommand::Shutdown);
    }

    pub fn subscribe_progress(&self) -> tokio_mpsc::UnboundedReceiver<PlaybackProgress> {
        self.progress_handle.subscribe_all()
    }

    fn send(&self, command: PlaybackCommand) -> Result<(), PlaybackError> {
        self.command_tx
            .send(command)
            .map_err(|_| PlaybackError::ServiceUnavailable)
    }
}

/// Playback service: sole owner of the [`PlayerAdapter`].
///
/// Commands, engine callbacks and progress ticks are all handled on one loop, so
/// the adapter never needs locking.
pub struct PlaybackService {
    adapter: PlayerAdapter,
    command_rx: tokio_mpsc::UnboundedReceiver<PlaybackCommand>,
    engine_rx: tokio_mpsc::UnboundedReceiver<(EngineId, EngineEvent)>,
}

impl PlaybackService {
    pub fn start<F: EngineFactory>(
        config: PlaybackConfig,
        engine_factory: F,
        runtime_handle: tokio::runtime::Handle,
    ) -> PlaybackHandle {
        let (command_tx, command_rx) = tokio_mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = tokio_mpsc::unbounded_channel();

        let progress_handle = PlaybackProgressHandle::new(progress_rx, runtime_handle);

        let handle = PlaybackHandle {
            command_tx,
            progress_handle,
        };

        // Engines may hold thread-bound resources, so the service gets its own
        // thread with a current-thread runtime and engines never leave it.
        let spawned = std::thread::Builder::new()
            .name("pexo-playback".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create playback runtime: {}", e);
                        return;
                    }
                };

                rt.block_on(async move {
                    let (engine_tx, engine_rx) = tokio_mpsc::unbounded_channel();
                    let adapter = PlayerAdapter::new(
                        Box::new(engine_factory),
                        EngineOptions {
                            user_agent: config.user_agent.clone(),
                        },
                        engine_tx,
                        Box::new(progress_tx),
                        config.progress_interval,
                    );

                    let mut service = PlaybackService {
                        adapter,
                        command_rx,
                        engine_rx,
                    };

                    service.run().await;
                });
            });

        if let Err(e) = spawned {
            error!("Failed to spawn playback thread: {}", e);
        }

        handle
    }

    async fn run(&mut self) {
        info!("PlaybackService started");

        loop {
            let deadline = self.adapter.tracking_deadline();

            // Engine callbacks already queued are applied before the next command
            tokio::select! {
                biased;
                Some((engine_id, event)) = self.engine_rx.recv() => {
                    debug!("Engine event from {}: {:?}", engine_id, event);
                    self.adapter.handle_engine_event(engine_id, event);
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = sleep_until(deadline), if deadline.is_some() => {
                    self.adapter.on_tracking_tick(Instant::now());
                }
            }
        }

        self.adapter.shutdown();
        info!("PlaybackService stopped");
    }

    fn handle_command(&mut self, command: PlaybackCommand) -> bool {
        match command {
            PlaybackCommand::PlayFromMedia { item, reply } => {
                let result = self.adapter.play_from_media(item);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            PlaybackCommand::Play => self.adapter.play(),
            PlaybackCommand::Pause => self.adapter.pause(),
            PlaybackCommand::Stop => self.adapter.stop(),
            PlaybackCommand::Seek(position) => self.adapter.seek_to(position),
            PlaybackCommand::SetVolume(volume) => self.adapter.set_volume(volume),
            PlaybackCommand::SetRepeat(mode) => self.adapter.set_repeat(mode),
            PlaybackCommand::SetShuffle(mode) => self.adapter.set_shuffle(mode),
            PlaybackCommand::GetStatus(reply) => {
                let _ = reply.send(self.adapter.status());
            }
            PlaybackCommand::Shutdown => return false,
        }
        true
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
    }
}
