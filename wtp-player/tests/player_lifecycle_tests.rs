//! Player lifecycle integration tests
//!
//! Tests verify that:
//! - A full session ends FINISHED with one finalize call and the exact elapsed time
//! - Paused time never counts toward elapsed time
//! - Every cue moment fires exactly once
//! - Entry gates, invalid transitions and empty routines are rejected
//! - Backend and storage failures never break the live session

mod helpers;

use helpers::*;
use std::time::Duration;
use wtp_common::events::PlayerEvent;
use wtp_common::time::Clock;
use wtp_common::workout::{Block, BlockType, PlayerStatus, SessionStatus, StepKind};
use wtp_player::backend::StatusUpdate;
use wtp_player::cues::Cue;
use wtp_player::player::{EntryGate, MountOutcome, TickOutcome};
use wtp_player::store::session::session_key;
use wtp_player::store::DurableStorage;
use wtp_player::Error;

#[tokio::test]
async fn test_full_session_finalizes_once_with_exact_elapsed() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());

    assert_eq!(player.mount().await.unwrap(), MountOutcome::Ready);
    assert_eq!(player.steps().len(), 6);
    player.start().await.unwrap();
    h.run_to_completion(&mut player).await;

    assert_eq!(player.status(), PlayerStatus::Finished);
    let finals = h.backend.finalizations();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].session_id, SESSION_ID);
    assert_eq!(finals[0].user_id, "user-1");
    assert_eq!(finals[0].total_elapsed_sec, 183);
    assert_eq!(finals[0].label, "Custom · Leg Day");
    assert_eq!(finals[0].source, "custom");
    assert_eq!(finals[0].user_routine_id.as_deref(), Some("routine-9"));

    assert!(h.storage.get(&session_key(SESSION_ID)).await.unwrap().is_none());

    // Terminal: no more ticks, no second finalize
    assert_eq!(player.tick().await, TickOutcome::Idle);
    assert!(matches!(
        player.finish().await,
        Err(Error::InvalidTransition { .. })
    ));
    assert_eq!(h.backend.finalizations().len(), 1);
}

#[tokio::test]
async fn test_steps_start_in_order() {
    let h = Harness::new();
    let mut rx = h.events.subscribe();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_to_completion(&mut player).await;

    let started: Vec<(usize, StepKind)> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            PlayerEvent::StepStarted {
                step_index, kind, ..
            } => Some((step_index, kind)),
            _ => None,
        })
        .collect();

    assert_eq!(
        started,
        vec![
            (0, StepKind::Countdown),
            (1, StepKind::Work),
            (2, StepKind::Rest),
            (3, StepKind::Work),
            (4, StepKind::Rest),
            (5, StepKind::Work),
        ]
    );
}

#[tokio::test]
async fn test_each_cue_moment_fires_once() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_to_completion(&mut player).await;

    let out = &h.output;
    // 3, 2, 1 on each of the six steps
    assert_eq!(out.count(|c| matches!(c, Cue::CountdownTick { .. })), 18);
    assert_eq!(out.count(|c| *c == Cue::CountdownStart), 1);
    assert_eq!(out.count(|c| *c == Cue::WorkStart), 3);
    assert_eq!(out.count(|c| *c == Cue::RestStart), 2);
    assert_eq!(out.count(|c| *c == Cue::Finish), 1);
    assert_eq!(out.played().len(), 25);
    assert_eq!(out.played().last(), Some(&Cue::Finish));
}

#[tokio::test]
async fn test_paused_time_is_excluded() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();

    h.run_for(&mut player, 10_000).await;
    player.pause().await.unwrap();

    h.clock.advance(Duration::from_secs(600));
    assert_eq!(player.tick().await, TickOutcome::Idle);
    let progress = player.progress();
    assert_eq!(progress.total_elapsed_sec, 10);
    assert_eq!(progress.step_index, 1);
    assert_eq!(progress.step_remaining_sec, 13);

    player.resume().await.unwrap();
    h.run_to_completion(&mut player).await;

    assert_eq!(h.backend.finalizations()[0].total_elapsed_sec, 183);
}

#[tokio::test]
async fn test_status_updates_reach_backend_in_order() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_for(&mut player, 10_000).await;
    player.pause().await.unwrap();
    player.resume().await.unwrap();
    settle().await;

    assert_eq!(
        h.backend.status_updates(),
        vec![
            StatusUpdate::new(PlayerStatus::Running),
            StatusUpdate::new(PlayerStatus::Paused).with_elapsed(10),
            StatusUpdate::new(PlayerStatus::Running),
        ]
    );
}

#[tokio::test]
async fn test_finalize_is_the_last_backend_call() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_for(&mut player, 10_000).await;
    player.pause().await.unwrap();
    player.finish().await.unwrap();
    settle().await;

    let calls = h.backend.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[..2],
        [
            BackendCall::Status {
                session_id: SESSION_ID.to_string(),
                update: StatusUpdate::new(PlayerStatus::Running),
            },
            BackendCall::Status {
                session_id: SESSION_ID.to_string(),
                update: StatusUpdate::new(PlayerStatus::Paused).with_elapsed(10),
            },
        ]
    );
    assert!(matches!(calls[2], BackendCall::Finalize(_)));
}

#[tokio::test]
async fn test_abort_is_the_last_backend_call() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    player.abort().await.unwrap();
    settle().await;

    assert_eq!(
        h.backend.calls(),
        vec![
            BackendCall::Status {
                session_id: SESSION_ID.to_string(),
                update: StatusUpdate::new(PlayerStatus::Running),
            },
            BackendCall::Abort(SESSION_ID.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_ticks_do_not_wait_for_storage() {
    let storage = std::sync::Arc::new(GatedStorage::new());
    let h = Harness::with_parts(storage.clone(), std::sync::Arc::new(RecordingBackend::new()));
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    settle().await;

    // The first write is stuck in storage; the session keeps moving
    h.run_for(&mut player, 5_000).await;
    assert!(player.persist_checkpoint());
    assert_eq!(player.current_index(), 1);
    assert!(h.stored_record().await.is_none());

    storage.open();
    player.flush_persistence().await;
    let record = h.stored_record().await.unwrap();
    assert_eq!(record.current_step_index, 1);
    assert_eq!(record.updated_at, h.clock.now_ms());
}

#[tokio::test]
async fn test_checkpoints_follow_transitions() {
    let h = Harness::new();
    let store = h.store();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    player.flush_persistence().await;

    let record = store.load(SESSION_ID).await.unwrap();
    assert_eq!(record.status, SessionStatus::Running);
    assert_eq!(record.current_step_index, 0);
    assert!(!record.skip_warmup);

    h.run_for(&mut player, 3_000).await;
    player.flush_persistence().await;
    assert_eq!(store.load(SESSION_ID).await.unwrap().current_step_index, 1);

    h.run_for(&mut player, 2_000).await;
    assert!(player.persist_checkpoint());
    player.flush_persistence().await;
    let record = store.load(SESSION_ID).await.unwrap();
    assert_eq!(record.updated_at, h.clock.now_ms());

    player.pause().await.unwrap();
    player.flush_persistence().await;
    assert_eq!(store.load(SESSION_ID).await.unwrap().status, SessionStatus::Paused);
    assert!(!player.persist_checkpoint());
}

#[tokio::test]
async fn test_warmup_choice_gates_start() {
    let h = Harness::new();
    let mut player = h.player(warmup_routine());

    assert_eq!(
        player.mount().await.unwrap(),
        MountOutcome::WarmupChoiceRequired
    );
    assert_eq!(player.gate(), Some(EntryGate::WarmupPrompt));
    assert!(matches!(
        player.start().await,
        Err(Error::WarmupChoiceRequired)
    ));

    player.choose_warmup(true).unwrap();
    assert!(player
        .steps()
        .iter()
        .all(|s| s.source_block_type != BlockType::Warmup));

    // Changing the answer before start rebuilds the steps
    player.choose_warmup(false).unwrap();
    assert_eq!(player.steps()[0].exercise_name, "Jumping Jacks");

    player.start().await.unwrap();
    assert!(matches!(
        player.choose_warmup(true),
        Err(Error::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_routine_without_steps_cannot_start() {
    let h = Harness::new();

    let mut empty = h.player(vec![]);
    assert_eq!(empty.mount().await.unwrap(), MountOutcome::Ready);
    assert!(matches!(empty.start().await, Err(Error::CannotStart(_))));
    assert_eq!(empty.status(), PlayerStatus::Ready);

    let mut warmup_only = h.player_for(
        "session-2",
        vec![Block::timed("w1", BlockType::Warmup, "Jog", 1, 60, 0)],
    );
    warmup_only.mount().await.unwrap();
    warmup_only.choose_warmup(true).unwrap();
    assert!(matches!(
        warmup_only.start().await,
        Err(Error::CannotStart(_))
    ));
}

#[tokio::test]
async fn test_invalid_transitions_from_ready() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();

    assert!(matches!(player.pause().await, Err(Error::InvalidTransition { .. })));
    assert!(matches!(player.resume().await, Err(Error::InvalidTransition { .. })));
    assert!(matches!(player.skip_step().await, Err(Error::InvalidTransition { .. })));
    assert!(matches!(player.finish().await, Err(Error::InvalidTransition { .. })));
    assert_eq!(player.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn test_pause_and_resume_are_idempotent() {
    let h = Harness::new();
    let mut rx = h.events.subscribe();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();

    player.pause().await.unwrap();
    player.pause().await.unwrap();
    player.resume().await.unwrap();
    player.resume().await.unwrap();

    let transitions = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, PlayerEvent::StatusChanged { .. }))
        .count();
    assert_eq!(transitions, 3);
}

#[tokio::test]
async fn test_skip_while_paused_keeps_full_step() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_for(&mut player, 1_000).await;
    player.pause().await.unwrap();

    assert_eq!(
        player.skip_step().await.unwrap(),
        TickOutcome::Advanced { step_index: 1 }
    );
    assert_eq!(player.status(), PlayerStatus::Paused);

    h.clock.advance(Duration::from_secs(5));
    let progress = player.progress();
    assert_eq!(progress.step_index, 1);
    assert_eq!(progress.step_remaining_sec, 20);
    assert_eq!(progress.total_elapsed_sec, 1);

    player.resume().await.unwrap();
    h.run_for(&mut player, 1_000).await;
    assert_eq!(player.progress().step_remaining_sec, 19);
}

#[tokio::test]
async fn test_skipping_last_step_finishes() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();

    for expected in 1..6 {
        assert_eq!(
            player.skip_step().await.unwrap(),
            TickOutcome::Advanced {
                step_index: expected
            }
        );
    }
    assert_eq!(player.skip_step().await.unwrap(), TickOutcome::Finished);
    assert_eq!(player.status(), PlayerStatus::Finished);
    assert_eq!(h.backend.finalizations().len(), 1);
}

#[tokio::test]
async fn test_finish_from_paused() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_for(&mut player, 30_000).await;
    player.pause().await.unwrap();
    h.clock.advance(Duration::from_secs(120));

    let summary = player.finish().await.unwrap();
    assert_eq!(summary.total_elapsed_sec, 30);
    assert_eq!(summary.label, "Custom · Leg Day");
    assert_eq!(player.status(), PlayerStatus::Finished);
    assert_eq!(h.output.count(|c| *c == Cue::Finish), 1);
    assert!(h.storage.get(&session_key(SESSION_ID)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_abort_skips_finalize() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_for(&mut player, 5_000).await;

    player.abort().await.unwrap();
    assert_eq!(player.status(), PlayerStatus::Aborted);
    assert_eq!(h.backend.aborts(), vec![SESSION_ID.to_string()]);
    assert!(h.backend.finalizations().is_empty());
    assert!(h.storage.get(&session_key(SESSION_ID)).await.unwrap().is_none());

    assert_eq!(player.tick().await, TickOutcome::Idle);
    assert!(matches!(player.abort().await, Err(Error::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_backend_failures_do_not_change_outcome() {
    let h = Harness::with_parts(
        std::sync::Arc::new(wtp_player::store::MemoryStorage::new()),
        std::sync::Arc::new(RecordingBackend::failing()),
    );
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_to_completion(&mut player).await;
    settle().await;

    assert_eq!(player.status(), PlayerStatus::Finished);
    assert_eq!(h.backend.finalizations().len(), 1);
    assert!(h.storage.get(&session_key(SESSION_ID)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_storage_failure_is_reported_not_fatal() {
    let h = Harness::with_parts(
        std::sync::Arc::new(FailingStorage),
        std::sync::Arc::new(RecordingBackend::new()),
    );
    let mut rx = h.events.subscribe();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_for(&mut player, 5_000).await;
    player.flush_persistence().await;

    assert_eq!(player.status(), PlayerStatus::Running);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, PlayerEvent::PersistenceFailed { .. })));
}

#[tokio::test]
async fn test_sound_preference_silences_cues() {
    let h = Harness::new();
    h.preferences().set_sound_enabled(false).await;
    let mut rx = h.events.subscribe();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();
    player.start().await.unwrap();
    h.run_to_completion(&mut player).await;

    assert!(h.output.played().is_empty());
    assert_eq!(h.output.vibrations(), 0);

    // The dispatcher still runs; cues are reported as inaudible
    let cues: Vec<bool> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            PlayerEvent::CuePlayed { audible, .. } => Some(audible),
            _ => None,
        })
        .collect();
    assert_eq!(cues.len(), 25);
    assert!(cues.iter().all(|audible| !audible));
}

#[tokio::test]
async fn test_progress_view() {
    let h = Harness::new();
    let mut player = h.player(squat_routine());
    player.mount().await.unwrap();

    let ready = player.progress();
    assert_eq!(ready.status, PlayerStatus::Ready);
    assert_eq!(ready.planned_total_sec, 183);
    assert_eq!(ready.remaining_total_sec, 183);
    assert_eq!(ready.step_remaining_sec, 3);
    assert_eq!(ready.completed_fraction, 0.0);

    player.start().await.unwrap();
    h.run_for(&mut player, 10_000).await;
    let running = player.progress();
    assert_eq!(running.step_index, 1);
    assert_eq!(running.total_elapsed_sec, 10);
    assert_eq!(running.remaining_total_sec, 173);
    assert_eq!(running.next_step.as_ref().map(|s| s.kind), Some(StepKind::Rest));
    assert!((running.completed_fraction - 10.0 / 183.0).abs() < 1e-9);

    player.finish().await.unwrap();
    assert_eq!(player.progress().completed_fraction, 1.0);
}
