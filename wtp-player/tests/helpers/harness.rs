//! Player fixtures on a manual clock and in-memory storage

use super::recording::{RecordingBackend, RecordingCueOutput};
use std::sync::Arc;
use std::time::Duration;
use wtp_common::config::SequencerPolicy;
use wtp_common::events::{EventBus, PlayerEvent};
use wtp_common::time::{Clock, ManualClock};
use wtp_common::workout::{Block, BlockType, PlayerStatus};
use wtp_player::audio::AudioService;
use wtp_player::backend::SessionBackend;
use wtp_player::player::{SessionContext, TickOutcome};
use wtp_player::store::session::session_key;
use wtp_player::store::{DurableStorage, MemoryStorage, PersistedSession, Preferences, SessionStore};
use wtp_player::{PlayerDeps, WorkoutPlayer};

pub const T0: i64 = 1_700_000_000_000;
pub const SESSION_ID: &str = "session-1";
pub const FRAME_MS: i64 = 50;
pub const STALENESS: Duration = Duration::from_secs(4 * 3600);

/// Squat 3x10, 60 s rest: countdown 3 + (20 + 60) * 2 + 20 = 183 s
pub fn squat_routine() -> Vec<Block> {
    vec![Block::reps("b1", BlockType::Standard, "Squat", 3, 10, 60)]
}

/// One warmup block followed by two working blocks
pub fn warmup_routine() -> Vec<Block> {
    vec![
        Block::timed("w1", BlockType::Warmup, "Jumping Jacks", 1, 30, 0),
        Block::reps("b1", BlockType::Standard, "Squat", 2, 10, 30),
        Block::timed("b2", BlockType::Finisher, "Plank", 1, 45, 0),
    ]
}

pub fn context(session_id: &str) -> SessionContext {
    SessionContext {
        source: "custom".to_string(),
        routine_title: "Leg Day".to_string(),
        user_routine_id: Some("routine-9".to_string()),
        ..SessionContext::new(session_id, "user-1")
    }
}

/// Shared collaborators; build any number of players against them
pub struct Harness {
    pub clock: ManualClock,
    pub storage: Arc<dyn DurableStorage>,
    pub backend: Arc<RecordingBackend>,
    pub output: Arc<RecordingCueOutput>,
    pub audio: Arc<AudioService>,
    pub events: EventBus,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(MemoryStorage::new()), Arc::new(RecordingBackend::new()))
    }

    pub fn with_parts(storage: Arc<dyn DurableStorage>, backend: Arc<RecordingBackend>) -> Self {
        let output = Arc::new(RecordingCueOutput::new());
        Self {
            clock: ManualClock::new(T0),
            storage,
            backend,
            audio: Arc::new(AudioService::new(output.clone())),
            output,
            events: EventBus::new(8192),
        }
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(Arc::clone(&self.storage), self.clock_arc(), STALENESS)
    }

    pub fn preferences(&self) -> Preferences {
        Preferences::new(Arc::clone(&self.storage))
    }

    pub fn clock_arc(&self) -> Arc<dyn Clock> {
        Arc::new(self.clock.clone())
    }

    pub fn deps(&self) -> PlayerDeps {
        self.deps_with_clock(self.clock_arc())
    }

    /// Same collaborators on a different clock
    pub fn deps_with_clock(&self, clock: Arc<dyn Clock>) -> PlayerDeps {
        let backend: Arc<dyn SessionBackend> = self.backend.clone();
        PlayerDeps {
            store: SessionStore::new(Arc::clone(&self.storage), Arc::clone(&clock), STALENESS),
            clock,
            preferences: self.preferences(),
            backend,
            audio: Arc::clone(&self.audio),
            events: self.events.clone(),
        }
    }

    pub fn player(&self, blocks: Vec<Block>) -> WorkoutPlayer {
        self.player_for(SESSION_ID, blocks)
    }

    pub fn player_for(&self, session_id: &str, blocks: Vec<Block>) -> WorkoutPlayer {
        WorkoutPlayer::new(context(session_id), blocks, SequencerPolicy::default(), self.deps())
    }

    /// Player timed by tokio's clock, for runtime tests on a paused runtime
    pub fn tokio_player(&self, blocks: Vec<Block>) -> WorkoutPlayer {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::new(T0));
        WorkoutPlayer::new(context(SESSION_ID), blocks, SequencerPolicy::default(), self.deps_with_clock(clock))
    }

    /// Raw persisted record for the default session, if any
    pub async fn stored_record(&self) -> Option<PersistedSession> {
        let raw = self.storage.get(&session_key(SESSION_ID)).await.unwrap()?;
        Some(serde_json::from_str(&raw).unwrap())
    }

    /// Advance the clock frame by frame for `duration_ms`, ticking each frame
    pub async fn run_for(&self, player: &mut WorkoutPlayer, duration_ms: i64) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        let mut elapsed = 0;
        while elapsed < duration_ms {
            let step = FRAME_MS.min(duration_ms - elapsed);
            self.clock.advance_ms(step);
            elapsed += step;
            outcomes.push(player.tick().await);
        }
        outcomes
    }

    /// Tick until the player leaves RUNNING (bounded)
    pub async fn run_to_completion(&self, player: &mut WorkoutPlayer) {
        for _ in 0..100_000 {
            if player.status() != PlayerStatus::Running {
                return;
            }
            self.clock.advance_ms(FRAME_MS);
            player.tick().await;
        }
        panic!("player never left RUNNING");
    }
}

/// Let spawned tasks (status reporter) run
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Drain every event currently buffered
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Clock backed by tokio's (pausable) time source
#[derive(Debug)]
pub struct TokioClock {
    base_ms: i64,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base_ms: i64) -> Self {
        Self {
            base_ms,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.base_ms + self.origin.elapsed().as_millis() as i64
    }
}
