//! Player runtime: tick loop, checkpoint timer and command channel
//!
//! One task owns the [`WorkoutPlayer`]. It waits on three sources:
//! - user commands from any number of [`PlayerHandle`]s
//! - the frame interval, which calls `tick()`
//! - the checkpoint interval, which queues a checkpoint on the session
//!   writer task (the loop never waits for storage)
//!
//! Both intervals exist only while the player is RUNNING. They are dropped
//! the moment the status leaves RUNNING and recreated on the next entry, so
//! a paused, finished or aborted player is never ticked. Commands are
//! handled to completion before the next select, so a tick never
//! interleaves with finish/abort cleanup.

use super::{PlayerProgress, TickOutcome, WorkoutPlayer};
use crate::error::{Error, Result};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use wtp_common::config::PlayerConfig;
use wtp_common::PlayerStatus;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// User action forwarded to the player task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    ChooseWarmup { skip: bool },
    ContinueRehydrated,
    DiscardRehydrated,
    Start,
    Pause,
    Resume,
    SkipStep,
    Finish,
    Abort,
    VisibilityChanged { visible: bool },
    SetSoundEnabled { enabled: bool },
    /// Only read progress
    Query,
}

struct Envelope {
    command: PlayerCommand,
    reply: oneshot::Sender<Result<PlayerProgress>>,
}

/// Cloneable sender side of a running player
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<Envelope>,
}

impl PlayerHandle {
    /// Send a command and wait for the player's progress afterwards
    pub async fn send(&self, command: PlayerCommand) -> Result<PlayerProgress> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { command, reply })
            .await
            .map_err(|_| Error::RuntimeStopped)?;
        response.await.map_err(|_| Error::RuntimeStopped)?
    }

    pub async fn progress(&self) -> Result<PlayerProgress> {
        self.send(PlayerCommand::Query).await
    }
}

pub struct PlayerRuntime {
    player: WorkoutPlayer,
    commands: mpsc::Receiver<Envelope>,
    frame_period: Duration,
    checkpoint_period: Duration,
}

impl PlayerRuntime {
    pub fn new(player: WorkoutPlayer, config: &PlayerConfig) -> (Self, PlayerHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let runtime = Self {
            player,
            commands,
            frame_period: config.frame_interval(),
            checkpoint_period: config.persist_interval(),
        };
        (runtime, PlayerHandle { tx })
    }

    /// Run on a new task; the join handle yields the player back when it
    /// reaches a terminal status or every handle is dropped.
    pub fn spawn(player: WorkoutPlayer, config: &PlayerConfig) -> (PlayerHandle, JoinHandle<WorkoutPlayer>) {
        let (runtime, handle) = Self::new(player, config);
        (handle, tokio::spawn(runtime.run()))
    }

    pub async fn run(mut self) -> WorkoutPlayer {
        let mut frame: Option<Interval> = None;
        let mut checkpoint: Option<Interval> = None;

        loop {
            let running = self.player.status() == PlayerStatus::Running;
            if running && frame.is_none() {
                frame = Some(self.frame_interval());
                checkpoint = Some(self.checkpoint_interval());
                debug!("Tick loop armed");
            } else if !running && frame.is_some() {
                frame = None;
                checkpoint = None;
                debug!("Tick loop torn down");
            }

            if self.player.status().is_terminal() {
                break;
            }

            tokio::select! {
                envelope = self.commands.recv() => match envelope {
                    Some(Envelope { command, reply }) => {
                        let result = self.handle(command).await;
                        let _ = reply.send(result);
                    }
                    None => {
                        info!(
                            "All player handles dropped; leaving session {} as {}",
                            self.player.context().session_id,
                            self.player.status()
                        );
                        break;
                    }
                },
                _ = next_tick(&mut frame) => {
                    if self.player.tick().await == TickOutcome::Finished {
                        debug!("Session completed by tick loop");
                    }
                }
                _ = next_tick(&mut checkpoint) => {
                    self.player.persist_checkpoint();
                }
            }
        }

        self.player.flush_persistence().await;
        self.player
    }

    async fn handle(&mut self, command: PlayerCommand) -> Result<PlayerProgress> {
        debug!("Player command: {:?}", command);
        let player = &mut self.player;
        let result = match command {
            PlayerCommand::ChooseWarmup { skip } => player.choose_warmup(skip),
            PlayerCommand::ContinueRehydrated => player.continue_rehydrated().await,
            PlayerCommand::DiscardRehydrated => player.discard_rehydrated().await,
            PlayerCommand::Start => player.start().await,
            PlayerCommand::Pause => player.pause().await,
            PlayerCommand::Resume => player.resume().await,
            PlayerCommand::SkipStep => player.skip_step().await.map(|_| ()),
            PlayerCommand::Finish => player.finish().await.map(|_| ()),
            PlayerCommand::Abort => player.abort().await,
            PlayerCommand::VisibilityChanged { visible } => {
                player.on_visibility_change(visible).await;
                Ok(())
            }
            PlayerCommand::SetSoundEnabled { enabled } => {
                player.set_sound_enabled(enabled).await;
                Ok(())
            }
            PlayerCommand::Query => Ok(()),
        };

        if let Err(e) = &result {
            warn!("Player command {:?} rejected: {}", command, e);
        }
        result.map(|()| player.progress())
    }

    fn frame_interval(&self) -> Interval {
        let mut frame = interval(self.frame_period);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
        frame
    }

    fn checkpoint_interval(&self) -> Interval {
        let mut checkpoint = interval_at(Instant::now() + self.checkpoint_period, self.checkpoint_period);
        checkpoint.set_missed_tick_behavior(MissedTickBehavior::Delay);
        checkpoint
    }
}

/// Next tick of an optional interval; pending forever when absent
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
