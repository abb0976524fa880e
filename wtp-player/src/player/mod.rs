//! Workout player state machine
//!
//! Orchestrates one workout attempt: the step sequence, the timing engine,
//! cue dispatch, durable checkpoints and the remote session backend.
//!
//! **Lifecycle:** READY → RUNNING ⇄ PAUSED → FINISHED | ABORTED
//!
//! READY can be gated by a rehydration prompt (a persisted session for the
//! same routine exists) or a warmup prompt (the routine has warmup blocks).
//! Both gates are passed once and never revisited.
//!
//! **Ownership:** the player owns the steps and the timing state for its
//! whole life. The persisted record is a derived checkpoint written on every
//! transition and periodically while running; it is only read at mount.
//! Writes are queued on a per-session writer task. Finish and abort wait for
//! that queue, and for pending status updates, before calling the backend.
//!
//! The player is a plain struct driven by async method calls. The tick loop
//! and the checkpoint timer live in [`runtime::PlayerRuntime`].

pub mod context;
pub mod runtime;

pub use context::SessionContext;
pub use runtime::{PlayerCommand, PlayerHandle, PlayerRuntime};

use crate::audio::AudioService;
use crate::backend::{FinalizeRequest, SessionBackend, StatusUpdate};
use crate::cues::{finish_key, tick_key, transition_key, Cue, CueDispatcher};
use crate::error::{Error, Result};
use crate::sequencer::{build_steps, has_warmup, steps_signature};
use crate::store::{PersistedSession, Preferences, SessionStore, SessionWriter};
use crate::timing::{TickReading, TimingEngine};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wtp_common::config::SequencerPolicy;
use wtp_common::events::{EventBus, PlayerEvent};
use wtp_common::time::{epoch_ms_to_datetime, Clock};
use wtp_common::workout::{Block, PlayerStatus, SessionStatus, Step};

/// Collaborators shared by every player in the process
#[derive(Clone)]
pub struct PlayerDeps {
    pub clock: Arc<dyn Clock>,
    pub store: SessionStore,
    pub preferences: Preferences,
    pub backend: Arc<dyn SessionBackend>,
    pub audio: Arc<AudioService>,
    pub events: EventBus,
}

/// Entry gate in front of READY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryGate {
    /// Skip the warmup blocks or keep them
    WarmupPrompt,
    /// Continue or discard a persisted session
    RehydratePrompt,
}

/// Result of [`WorkoutPlayer::mount`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    RehydrationOffered {
        step_index: usize,
        total_elapsed_sec: u64,
        saved_status: SessionStatus,
    },
    WarmupChoiceRequired,
    Ready,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing evaluated
    Idle,
    Running,
    Advanced { step_index: usize },
    Finished,
}

/// Result of a visibility change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOutcome {
    /// Same visibility reported again
    Unchanged,
    Hidden,
    /// Hidden while running; the player paused itself
    AutoPaused,
    /// Visible again after an auto-pause; the user picks resume or finish
    ResumeChoiceRequired,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishSummary {
    pub total_elapsed_sec: u64,
    pub label: String,
}

/// Read-only view for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProgress {
    pub session_id: String,
    pub status: PlayerStatus,
    pub gate: Option<EntryGate>,
    pub step_index: usize,
    pub step_count: usize,
    pub current_step: Option<Step>,
    pub next_step: Option<Step>,
    pub step_remaining_sec: u64,
    pub total_elapsed_sec: u64,
    pub planned_total_sec: u64,
    /// Current step remainder plus every later step
    pub remaining_total_sec: u64,
    /// Share of the planned time already played, 0.0..=1.0
    pub completed_fraction: f64,
    pub awaiting_resume_confirmation: bool,
    pub paused_by_background: bool,
}

pub struct WorkoutPlayer {
    context: SessionContext,
    blocks: Vec<Block>,
    policy: SequencerPolicy,

    clock: Arc<dyn Clock>,
    store: SessionStore,
    preferences: Preferences,
    backend: Arc<dyn SessionBackend>,
    audio: Arc<AudioService>,
    events: EventBus,

    skip_warmup: Option<bool>,
    steps: Vec<Step>,
    signature: String,
    gate: Option<EntryGate>,
    pending: Option<PersistedSession>,

    status: PlayerStatus,
    current_index: usize,
    timing: TimingEngine,
    cues: CueDispatcher,
    last_progress: Option<(usize, u64, u64)>,

    visible: bool,
    paused_by_background: bool,
    awaiting_resume_confirmation: bool,

    writer: Option<SessionWriter>,
    status_reporter: Option<StatusReporter>,
}

impl WorkoutPlayer {
    pub fn new(context: SessionContext, blocks: Vec<Block>, policy: SequencerPolicy, deps: PlayerDeps) -> Self {
        let timing = TimingEngine::new(Arc::clone(&deps.clock));
        Self {
            context,
            blocks,
            policy,
            clock: deps.clock,
            store: deps.store,
            preferences: deps.preferences,
            backend: deps.backend,
            audio: deps.audio,
            events: deps.events,
            skip_warmup: None,
            steps: Vec::new(),
            signature: String::new(),
            gate: None,
            pending: None,
            status: PlayerStatus::Ready,
            current_index: 0,
            timing,
            cues: CueDispatcher::new(),
            last_progress: None,
            visible: true,
            paused_by_background: false,
            awaiting_resume_confirmation: false,
            writer: None,
            status_reporter: None,
        }
    }

    // ========================================================================
    // Entry gates
    // ========================================================================

    /// Load preferences and decide which entry gate, if any, applies.
    ///
    /// A persisted record is offered only if it is fresh and was produced
    /// from the same routine content and warmup choice; anything else is
    /// deleted and the player starts fresh.
    pub async fn mount(&mut self) -> Result<MountOutcome> {
        self.require(&[PlayerStatus::Ready], "mount")?;
        self.audio.set_sound_enabled(self.preferences.sound_enabled().await);
        self.audio
            .set_vibration_enabled(self.preferences.vibration_enabled().await);

        let session_id = self.context.session_id.clone();
        if let Some(record) = self.store.load(&session_id).await {
            match self.rehydration_mismatch(&record) {
                None => return Ok(self.offer_rehydration(record)),
                Some(reason) => {
                    info!("Discarding persisted session {}: {}", session_id, reason);
                    self.store.clear(&session_id).await;
                }
            }
        }

        if has_warmup(&self.blocks) {
            self.gate = Some(EntryGate::WarmupPrompt);
            Ok(MountOutcome::WarmupChoiceRequired)
        } else {
            self.select_steps(false);
            Ok(MountOutcome::Ready)
        }
    }

    fn rehydration_mismatch(&self, record: &PersistedSession) -> Option<String> {
        let expected = steps_signature(&self.blocks, record.skip_warmup);
        if record.steps_signature != expected {
            return Some("routine changed since it was saved".to_string());
        }
        let step_count = build_steps(&self.blocks, record.skip_warmup, &self.policy).len();
        if record.current_step_index >= step_count {
            return Some(format!(
                "step {} out of range ({} steps)",
                record.current_step_index, step_count
            ));
        }
        None
    }

    fn offer_rehydration(&mut self, record: PersistedSession) -> MountOutcome {
        let total_elapsed_sec = self.restored_engine(&record).tick().total_elapsed_sec();
        let outcome = MountOutcome::RehydrationOffered {
            step_index: record.current_step_index,
            total_elapsed_sec,
            saved_status: record.status,
        };
        info!(
            "Offering rehydration of session {} at step {} ({} s elapsed)",
            self.context.session_id, record.current_step_index, total_elapsed_sec
        );
        self.events.emit_lossy(PlayerEvent::RehydrationOffered {
            session_id: self.context.session_id.clone(),
            step_index: record.current_step_index,
            total_elapsed_sec,
        });
        self.gate = Some(EntryGate::RehydratePrompt);
        self.pending = Some(record);
        outcome
    }

    /// Timing engine for a persisted record, frozen at its last write
    fn restored_engine(&self, record: &PersistedSession) -> TimingEngine {
        let clock = Arc::clone(&self.clock);
        match record.status {
            SessionStatus::Paused => TimingEngine::restore(clock, record.timing, false),
            SessionStatus::Running => TimingEngine::restore_paused_at(clock, record.timing, record.updated_at),
        }
    }

    /// Restore the offered session. The player lands in PAUSED and waits for
    /// an explicit resume.
    pub async fn continue_rehydrated(&mut self) -> Result<()> {
        let record = match (self.gate, self.pending.take()) {
            (Some(EntryGate::RehydratePrompt), Some(record)) => record,
            _ => return Err(Error::NoRehydration("continue")),
        };

        self.gate = None;
        self.select_steps(record.skip_warmup);
        self.current_index = record.current_step_index;
        self.timing = self.restored_engine(&record);
        self.cues.reset_guard();
        self.last_progress = None;
        self.awaiting_resume_confirmation = true;
        self.set_status(PlayerStatus::Paused);

        if let Some(step) = self.steps.get(self.current_index).cloned() {
            self.emit_step_started(&step);
        }
        self.persist();

        info!(
            "Rehydrated session {} at step {}/{}",
            self.context.session_id,
            self.current_index + 1,
            self.steps.len()
        );
        Ok(())
    }

    /// Drop the offered session and abort it remotely
    pub async fn discard_rehydrated(&mut self) -> Result<()> {
        if self.gate != Some(EntryGate::RehydratePrompt) {
            return Err(Error::NoRehydration("discard"));
        }
        self.pending = None;
        self.abort().await
    }

    /// Answer the warmup prompt. Before start the answer may be changed; the
    /// steps are rebuilt only when it does.
    pub fn choose_warmup(&mut self, skip_warmup: bool) -> Result<()> {
        self.require(&[PlayerStatus::Ready], "choose warmup")?;
        if self.gate == Some(EntryGate::RehydratePrompt) {
            return Err(Error::RehydrationPending);
        }
        if self.skip_warmup != Some(skip_warmup) {
            self.select_steps(skip_warmup);
        }
        self.gate = None;
        Ok(())
    }

    fn select_steps(&mut self, skip_warmup: bool) {
        self.skip_warmup = Some(skip_warmup);
        self.steps = build_steps(&self.blocks, skip_warmup, &self.policy);
        self.signature = steps_signature(&self.blocks, skip_warmup);
        debug!(
            "Built {} steps for session {} (skip_warmup={})",
            self.steps.len(),
            self.context.session_id,
            skip_warmup
        );
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn start(&mut self) -> Result<()> {
        self.require(&[PlayerStatus::Ready], "start")?;
        match self.gate {
            Some(EntryGate::WarmupPrompt) => return Err(Error::WarmupChoiceRequired),
            Some(EntryGate::RehydratePrompt) => return Err(Error::RehydrationPending),
            None => {}
        }
        if self.skip_warmup.is_none() {
            if has_warmup(&self.blocks) {
                return Err(Error::WarmupChoiceRequired);
            }
            self.select_steps(false);
        }
        let first = self
            .steps
            .first()
            .cloned()
            .ok_or_else(|| Error::CannotStart("routine has no playable exercises".to_string()))?;

        if !self.audio.unlock() {
            debug!("Starting session {} without audio", self.context.session_id);
        }
        self.cues.reset_guard();
        self.current_index = 0;
        self.last_progress = None;
        self.timing.start(first.duration_sec);
        self.set_status(PlayerStatus::Running);

        self.emit_step_started(&first);
        self.play_cue(transition_key(first.kind, 0), Cue::for_step_kind(first.kind));
        self.persist();
        self.report_status(StatusUpdate::new(PlayerStatus::Running));

        info!(
            "Started session {} ({} steps, {} s planned)",
            self.context.session_id,
            self.steps.len(),
            crate::sequencer::total_duration_sec(&self.steps)
        );
        Ok(())
    }

    /// Evaluate the clock once. Never fails; does nothing unless RUNNING.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.status != PlayerStatus::Running {
            return TickOutcome::Idle;
        }

        let reading = self.timing.tick();
        self.emit_progress(&reading);

        if reading.is_step_exhausted() {
            return self.advance().await;
        }

        if let Some(cue) = Cue::for_remaining(reading.step_remaining_sec) {
            self.play_cue(tick_key(self.current_index, reading.step_remaining_sec), cue);
        }
        TickOutcome::Running
    }

    async fn advance(&mut self) -> TickOutcome {
        let next = self.current_index + 1;
        let Some(step) = self.steps.get(next).cloned() else {
            return match self.finish().await {
                Ok(_) => TickOutcome::Finished,
                Err(e) => {
                    warn!("Failed to finish session {}: {}", self.context.session_id, e);
                    TickOutcome::Idle
                }
            };
        };

        self.current_index = next;
        self.timing.advance_step(step.duration_sec);
        self.last_progress = None;
        self.emit_step_started(&step);
        self.play_cue(transition_key(step.kind, next), Cue::for_step_kind(step.kind));
        self.persist();
        TickOutcome::Advanced { step_index: next }
    }

    /// Jump to the next step as if the current one ran out
    pub async fn skip_step(&mut self) -> Result<TickOutcome> {
        self.require(&[PlayerStatus::Running, PlayerStatus::Paused], "skip step")?;
        Ok(self.advance().await)
    }

    /// No-op when already paused
    pub async fn pause(&mut self) -> Result<()> {
        if self.status == PlayerStatus::Paused {
            return Ok(());
        }
        self.require(&[PlayerStatus::Running], "pause")?;

        self.timing.pause();
        self.set_status(PlayerStatus::Paused);
        self.persist();

        let elapsed = self.timing.tick().total_elapsed_sec();
        self.report_status(StatusUpdate::new(PlayerStatus::Paused).with_elapsed(elapsed));
        Ok(())
    }

    /// No-op when already running
    pub async fn resume(&mut self) -> Result<()> {
        if self.status == PlayerStatus::Running {
            return Ok(());
        }
        self.require(&[PlayerStatus::Paused], "resume")?;

        self.audio.unlock();
        self.paused_by_background = false;
        self.awaiting_resume_confirmation = false;
        self.timing.resume();
        self.last_progress = None;
        self.set_status(PlayerStatus::Running);
        self.persist();
        self.report_status(StatusUpdate::new(PlayerStatus::Running));
        Ok(())
    }

    /// Complete the workout and hand it to the backend.
    ///
    /// Local cleanup (status, persisted record) happens before the backend
    /// call; a backend failure is logged and does not change the outcome.
    pub async fn finish(&mut self) -> Result<FinishSummary> {
        self.require(&[PlayerStatus::Running, PlayerStatus::Paused], "finish")?;

        self.timing.pause();
        self.set_status(PlayerStatus::Finished);
        self.clear_record().await;

        let total_elapsed_sec = self.timing.tick().total_elapsed_sec();
        let label = self.context.label();
        self.play_cue(finish_key(), Cue::Finish);

        let now = self.clock.now_ms();
        self.events.emit_lossy(PlayerEvent::SessionFinished {
            session_id: self.context.session_id.clone(),
            total_elapsed_sec,
            label: label.clone(),
            timestamp: epoch_ms_to_datetime(now),
        });
        info!(
            "Finished session {} \"{}\" in {} s",
            self.context.session_id, label, total_elapsed_sec
        );

        let request = FinalizeRequest {
            session_id: self.context.session_id.clone(),
            user_id: self.context.user_id.clone(),
            total_elapsed_sec,
            source: self.context.source.clone(),
            label: label.clone(),
            finished_at: epoch_ms_to_datetime(now),
            program_key: self.context.program_key.clone(),
            day_key: self.context.day_key.clone(),
            system_routine_id: self.context.system_routine_id.clone(),
            user_routine_id: self.context.user_routine_id.clone(),
        };
        self.stop_status_reporter().await;
        if let Err(e) = self.backend.finalize_session(&request).await {
            warn!("Finalize of session {} failed: {}", self.context.session_id, e);
        }

        Ok(FinishSummary {
            total_elapsed_sec,
            label,
        })
    }

    /// Abandon the workout from any non-terminal status
    pub async fn abort(&mut self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::InvalidTransition {
                action: "abort",
                status: self.status,
            });
        }

        self.timing.pause();
        self.gate = None;
        self.pending = None;
        self.set_status(PlayerStatus::Aborted);
        self.clear_record().await;

        self.events.emit_lossy(PlayerEvent::SessionAborted {
            session_id: self.context.session_id.clone(),
            timestamp: epoch_ms_to_datetime(self.clock.now_ms()),
        });
        info!("Aborted session {}", self.context.session_id);

        self.stop_status_reporter().await;

        if let Err(e) = self.backend.abort_session(&self.context.session_id).await {
            warn!("Abort of session {} failed: {}", self.context.session_id, e);
        }
        Ok(())
    }

    /// Edge-triggered foreground/background handling
    pub async fn on_visibility_change(&mut self, visible: bool) -> VisibilityOutcome {
        if visible == self.visible {
            return VisibilityOutcome::Unchanged;
        }
        self.visible = visible;

        if !visible {
            self.audio.suspend();
            if self.status != PlayerStatus::Running {
                return VisibilityOutcome::Hidden;
            }
            if let Err(e) = self.pause().await {
                warn!("Background pause failed: {}", e);
                return VisibilityOutcome::Hidden;
            }
            self.paused_by_background = true;
            debug!("Session {} paused by backgrounding", self.context.session_id);
            return VisibilityOutcome::AutoPaused;
        }

        self.audio.resume();
        if self.paused_by_background && self.status == PlayerStatus::Paused {
            self.events.emit_lossy(PlayerEvent::ResumeChoiceRequired {
                session_id: self.context.session_id.clone(),
            });
            return VisibilityOutcome::ResumeChoiceRequired;
        }
        VisibilityOutcome::Visible
    }

    /// Persist and remember the sound preference
    pub async fn set_sound_enabled(&mut self, enabled: bool) {
        self.audio.set_sound_enabled(enabled);
        self.preferences.set_sound_enabled(enabled).await;
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Periodic checkpoint; only queues a write while RUNNING
    pub fn persist_checkpoint(&mut self) -> bool {
        if self.status != PlayerStatus::Running {
            return false;
        }
        self.persist()
    }

    /// Wait until every queued write has reached storage
    pub async fn flush_persistence(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    /// Queue a checkpoint on the writer task; never waits for storage
    fn persist(&mut self) -> bool {
        let status = match self.status {
            PlayerStatus::Running => SessionStatus::Running,
            PlayerStatus::Paused => SessionStatus::Paused,
            _ => return false,
        };
        let Some(skip_warmup) = self.skip_warmup else {
            return false;
        };

        let record = self.store.stamp(&PersistedSession {
            session_id: self.context.session_id.clone(),
            status,
            current_step_index: self.current_index,
            skip_warmup,
            steps_signature: self.signature.clone(),
            timing: self.timing.snapshot(),
            updated_at: 0,
        });

        let store = &self.store;
        let events = &self.events;
        let session_id = &self.context.session_id;
        self.writer
            .get_or_insert_with(|| SessionWriter::spawn(store.clone(), session_id.clone(), events.clone()))
            .save(record)
    }

    /// Delete the record after every pending write, then stop the writer
    async fn clear_record(&mut self) {
        match self.writer.take() {
            Some(writer) => {
                writer.clear();
                writer.close().await;
            }
            None => self.store.clear(&self.context.session_id).await,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn gate(&self) -> Option<EntryGate> {
        self.gate
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_index)
    }

    pub fn skip_warmup(&self) -> Option<bool> {
        self.skip_warmup
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn paused_by_background(&self) -> bool {
        self.paused_by_background
    }

    pub fn awaiting_resume_confirmation(&self) -> bool {
        self.awaiting_resume_confirmation
    }

    pub fn progress(&self) -> PlayerProgress {
        let planned_total_sec = crate::sequencer::total_duration_sec(&self.steps);
        let (step_remaining_sec, total_elapsed_sec) = match self.status {
            PlayerStatus::Ready => (
                self.steps.first().map_or(0, |s| u64::from(s.duration_sec)),
                0,
            ),
            PlayerStatus::Finished | PlayerStatus::Aborted => {
                (0, self.timing.tick().total_elapsed_sec())
            }
            PlayerStatus::Running | PlayerStatus::Paused => {
                let reading = self.timing.tick();
                (reading.step_remaining_sec, reading.total_elapsed_sec())
            }
        };
        let later_sec: u64 = if self.status.is_terminal() {
            0
        } else {
            self.steps
                .iter()
                .skip(self.current_index + 1)
                .map(|s| u64::from(s.duration_sec))
                .sum()
        };

        let remaining_total_sec = step_remaining_sec + later_sec;
        let completed_fraction = match self.status {
            PlayerStatus::Finished => 1.0,
            _ if planned_total_sec == 0 => 0.0,
            PlayerStatus::Aborted => (total_elapsed_sec as f64 / planned_total_sec as f64).min(1.0),
            _ => planned_total_sec.saturating_sub(remaining_total_sec) as f64 / planned_total_sec as f64,
        };

        PlayerProgress {
            session_id: self.context.session_id.clone(),
            status: self.status,
            gate: self.gate,
            step_index: self.current_index,
            step_count: self.steps.len(),
            current_step: self.steps.get(self.current_index).cloned(),
            next_step: self.steps.get(self.current_index + 1).cloned(),
            step_remaining_sec,
            total_elapsed_sec,
            planned_total_sec,
            remaining_total_sec,
            completed_fraction,
            awaiting_resume_confirmation: self.awaiting_resume_confirmation,
            paused_by_background: self.paused_by_background,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require(&self, allowed: &[PlayerStatus], action: &'static str) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action,
                status: self.status,
            })
        }
    }

    fn set_status(&mut self, new_status: PlayerStatus) {
        let old_status = self.status;
        if old_status == new_status {
            return;
        }
        self.status = new_status;
        debug!(
            "Session {}: {} -> {}",
            self.context.session_id, old_status, new_status
        );
        self.events.emit_lossy(PlayerEvent::StatusChanged {
            session_id: self.context.session_id.clone(),
            old_status,
            new_status,
            timestamp: epoch_ms_to_datetime(self.clock.now_ms()),
        });
    }

    fn emit_step_started(&self, step: &Step) {
        self.events.emit_lossy(PlayerEvent::StepStarted {
            session_id: self.context.session_id.clone(),
            step_index: step.index,
            kind: step.kind,
            exercise_name: step.exercise_name.clone(),
            duration_sec: step.duration_sec,
            timestamp: epoch_ms_to_datetime(self.clock.now_ms()),
        });
    }

    /// TimerProgress only when a displayed value changes
    fn emit_progress(&mut self, reading: &TickReading) {
        let shown = (
            self.current_index,
            reading.step_remaining_sec,
            reading.total_elapsed_sec(),
        );
        if self.last_progress == Some(shown) {
            return;
        }
        self.last_progress = Some(shown);
        self.events.emit_lossy(PlayerEvent::TimerProgress {
            session_id: self.context.session_id.clone(),
            step_index: shown.0,
            step_remaining_sec: shown.1,
            total_elapsed_sec: shown.2,
        });
    }

    fn play_cue(&mut self, key: String, cue: Cue) {
        let audio = &self.audio;
        let mut audible = false;
        let fired = self.cues.beep_once(&key, || audible = audio.play(cue));
        if fired {
            self.events.emit_lossy(PlayerEvent::CuePlayed {
                session_id: self.context.session_id.clone(),
                cue: cue.to_string(),
                key,
                audible,
            });
        }
    }

    /// Queue a best-effort status update; updates reach the backend in order
    fn report_status(&mut self, update: StatusUpdate) {
        let backend = &self.backend;
        let session_id = &self.context.session_id;
        let reporter = self
            .status_reporter
            .get_or_insert_with(|| StatusReporter::spawn(Arc::clone(backend), session_id.clone()));
        if reporter.tx.send(update).is_err() {
            warn!("Status reporter for session {} is gone", session_id);
        }
    }

    /// Deliver every queued status update, then stop the reporter.
    /// Finalize and abort go out only after this, so they are always the
    /// last call the backend sees for the session.
    async fn stop_status_reporter(&mut self) {
        let Some(StatusReporter { tx, task }) = self.status_reporter.take() else {
            return;
        };
        drop(tx);
        if let Err(e) = task.await {
            warn!("Status reporter for session {} failed: {}", self.context.session_id, e);
        }
    }
}

/// Ordered delivery of status updates on a background task
struct StatusReporter {
    tx: mpsc::UnboundedSender<StatusUpdate>,
    task: JoinHandle<()>,
}

impl StatusReporter {
    fn spawn(backend: Arc<dyn SessionBackend>, session_id: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StatusUpdate>();
        let task = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                if let Err(e) = backend.update_session_status(&session_id, &update).await {
                    warn!(
                        "Status update {} for session {} failed: {}",
                        update.status, session_id, e
                    );
                }
            }
        });
        Self { tx, task }
    }
}
