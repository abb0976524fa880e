//! Workout Player (wtp-player) - Main entry point
//!
//! Plays a routine file in the terminal: steps and timers are printed as
//! they change, cues ring the terminal bell, and single-letter commands
//! drive the player. Progress is checkpointed to SQLite so an interrupted
//! session can be resumed by passing the same `--session-id`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wtp_common::config::{resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV};
use wtp_common::events::{EventBus, PlayerEvent};
use wtp_common::human_time::format_clock;
use wtp_common::time::SystemClock;
use wtp_common::workout::StepKind;
use wtp_common::uuid_utils::new_session_id;
use wtp_player::audio::{AudioService, CueOutput, TerminalBellOutput, TracingCueOutput};
use wtp_player::backend::{HttpSessionBackend, LoggingBackend, SessionBackend};
use wtp_player::db::{init_database, load_player_config, load_sequencer_policy, SqliteStorage};
use wtp_player::player::{MountOutcome, PlayerCommand, PlayerHandle, PlayerRuntime};
use wtp_player::routine::RoutineFile;
use wtp_player::store::{Preferences, SessionStore, Tip};
use wtp_player::{PlayerDeps, WorkoutPlayer};

/// Command-line arguments for wtp-player
#[derive(Parser, Debug)]
#[command(name = "wtp-player")]
#[command(about = "Guided workout timer with audio cues and resumable sessions")]
#[command(version)]
struct Args {
    /// Routine file (JSON, or TOML with a .toml extension)
    routine: PathBuf,

    /// Configuration file (defaults to the platform config location)
    #[arg(short, long, env = "WTP_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder for the database and local state
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Session identifier; reuse one to resume an interrupted session
    #[arg(long)]
    session_id: Option<String>,

    /// User identifier reported on finalize
    #[arg(long, env = "WTP_USER_ID")]
    user_id: Option<String>,

    /// Session backend base URL (offline logging backend when absent)
    #[arg(long, env = "WTP_BACKEND_URL")]
    backend_url: Option<String>,

    /// Skip warmup blocks without asking
    #[arg(long, conflicts_with = "keep_warmup")]
    skip_warmup: bool,

    /// Keep warmup blocks without asking
    #[arg(long)]
    keep_warmup: bool,

    /// Log cues instead of ringing the terminal bell
    #[arg(long)]
    silent_bell: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config)?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, Some(&config));
    let database_path = config.database_path(&root_folder);
    info!("Root folder: {}", root_folder.display());

    let routine = RoutineFile::load(&args.routine)
        .with_context(|| format!("Failed to load routine {}", args.routine.display()))?;

    let db = init_database(&database_path)
        .await
        .context("Failed to initialize database")?;
    let policy = load_sequencer_policy(&db, config.policy).await?;
    let player_config = load_player_config(&db, config.player.clone()).await?;

    let clock = Arc::new(SystemClock::new());
    let storage = Arc::new(SqliteStorage::new(db));
    let store = SessionStore::new(storage.clone(), clock.clone(), player_config.staleness_window());
    let preferences = Preferences::new(storage);

    let output: Arc<dyn CueOutput> = if args.silent_bell {
        Arc::new(TracingCueOutput::new())
    } else {
        Arc::new(TerminalBellOutput::new())
    };
    let audio = AudioService::install_global(output);
    audio.set_haptics_available(player_config.vibration_enabled);

    let backend_url = args.backend_url.clone().or_else(|| config.backend_url.clone());
    let backend: Arc<dyn SessionBackend> = match backend_url {
        Some(url) => Arc::new(HttpSessionBackend::new(&url)?),
        None => Arc::new(LoggingBackend::new()),
    };

    let session_id = args.session_id.clone().unwrap_or_else(new_session_id);
    let user_id = args
        .user_id
        .clone()
        .or_else(|| config.user_id.clone())
        .unwrap_or_else(|| "local".to_string());
    let events = EventBus::new(player_config.event_capacity);

    let mut player = WorkoutPlayer::new(
        routine.session_context(&session_id, &user_id),
        routine.blocks.clone(),
        policy,
        PlayerDeps {
            clock,
            store,
            preferences: preferences.clone(),
            backend,
            audio,
            events: events.clone(),
        },
    );

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    println!("{} (session {})", routine.title, session_id);

    let rehydrated = match player.mount().await? {
        MountOutcome::RehydrationOffered {
            step_index,
            total_elapsed_sec,
            ..
        } => {
            let prompt = format!(
                "Saved session found at step {} ({} elapsed). Continue? [y/n]",
                step_index + 1,
                format_clock(total_elapsed_sec)
            );
            if ask_yes_no(&mut stdin, &prompt).await? {
                player.continue_rehydrated().await?;
                true
            } else {
                player.discard_rehydrated().await?;
                println!("Saved session discarded.");
                return Ok(());
            }
        }
        MountOutcome::WarmupChoiceRequired => {
            let skip = if args.skip_warmup {
                true
            } else if args.keep_warmup {
                false
            } else {
                show_tip_once(
                    &preferences,
                    Tip::SkipWarmup,
                    "pass --skip-warmup or --keep-warmup to skip this question.",
                )
                .await;
                ask_yes_no(&mut stdin, "Skip the warmup? [y/n]").await?
            };
            player.choose_warmup(skip)?;
            false
        }
        MountOutcome::Ready => false,
    };

    let printer = tokio::spawn(print_events(events.subscribe(), preferences.clone()));
    let (handle, mut runtime) = PlayerRuntime::spawn(player, &player_config);

    print_help();
    show_tip_once(&preferences, Tip::SoundToggle, "press m to mute cues for this and later workouts.").await;
    if rehydrated {
        println!("Session restored and paused. Press r to resume.");
    } else {
        handle.send(PlayerCommand::Start).await?;
    }

    let mut sound_enabled = preferences.sound_enabled().await;
    let player = loop {
        tokio::select! {
            finished = &mut runtime => break finished.context("Player task failed")?,
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    // stdin closed: leave the checkpoint for a later resume
                    drop(handle);
                    break runtime.await.context("Player task failed")?;
                };
                if let Some(command) = parse_command(line.trim(), &mut sound_enabled) {
                    send_command(&handle, command).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = handle.send(PlayerCommand::Pause).await {
                    warn!("Pause on interrupt failed: {}", e);
                }
                drop(handle);
                println!("\nInterrupted. Resume with --session-id {}", session_id);
                break runtime.await.context("Player task failed")?;
            }
        }
    };

    printer.abort();
    info!("Player exited with status {}", player.status());
    Ok(())
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let default_filter = format!(
        "wtp_player={0},wtp_common={0}",
        config.logging.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

async fn ask_yes_no<R>(lines: &mut tokio::io::Lines<R>, prompt: &str) -> Result<bool>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        println!("{}", prompt);
        let Some(answer) = lines.next_line().await? else {
            bail!("stdin closed");
        };
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

fn parse_command(input: &str, sound_enabled: &mut bool) -> Option<PlayerCommand> {
    let command = match input {
        "p" => PlayerCommand::Pause,
        "r" => PlayerCommand::Resume,
        "s" => PlayerCommand::SkipStep,
        "f" => PlayerCommand::Finish,
        "q" => PlayerCommand::Abort,
        "h" => PlayerCommand::VisibilityChanged { visible: false },
        "v" => PlayerCommand::VisibilityChanged { visible: true },
        "m" => {
            *sound_enabled = !*sound_enabled;
            println!("Sound {}", if *sound_enabled { "on" } else { "off" });
            PlayerCommand::SetSoundEnabled {
                enabled: *sound_enabled,
            }
        }
        "" => PlayerCommand::Query,
        _ => {
            print_help();
            return None;
        }
    };
    Some(command)
}

async fn send_command(handle: &PlayerHandle, command: PlayerCommand) {
    match handle.send(command).await {
        Ok(progress) => {
            if let Some(step) = &progress.current_step {
                println!(
                    "[{}] {} {} · {} left · {} elapsed",
                    progress.status,
                    step.kind,
                    step.exercise_name,
                    format_clock(progress.step_remaining_sec),
                    format_clock(progress.total_elapsed_sec)
                );
            }
        }
        Err(e) => println!("{}", e),
    }
}

fn print_help() {
    println!("Commands: p pause · r resume · s skip · f finish · q quit (abort)");
    println!("          h/v simulate hide/show · m toggle sound · Enter show status");
}

/// Print a hint the first time it applies, never again
async fn show_tip_once(preferences: &Preferences, tip: Tip, text: &str) {
    if !preferences.tip_seen(tip).await {
        println!("Tip: {}", text);
        preferences.mark_tip_seen(tip).await;
    }
}

async fn print_events(mut events: broadcast::Receiver<PlayerEvent>, preferences: Preferences) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged by {} events", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            PlayerEvent::StepStarted {
                step_index,
                kind,
                exercise_name,
                duration_sec,
                ..
            } => {
                println!(
                    "\n#{} {} {} ({})",
                    step_index + 1,
                    kind,
                    exercise_name,
                    format_clock(u64::from(duration_sec))
                );
                if kind == StepKind::Rest {
                    show_tip_once(&preferences, Tip::SkipStep, "press s to cut a rest short.").await;
                }
            }
            PlayerEvent::TimerProgress {
                step_remaining_sec,
                total_elapsed_sec,
                ..
            } => print!(
                "\r  {} left · {} total   ",
                format_clock(step_remaining_sec),
                format_clock(total_elapsed_sec)
            ),
            PlayerEvent::StatusChanged { new_status, .. } => println!("\n== {}", new_status),
            PlayerEvent::ResumeChoiceRequired { .. } => {
                println!("\nWelcome back. Press r to resume or f to finish.");
                show_tip_once(
                    &preferences,
                    Tip::BackgroundPause,
                    "hiding the player pauses the workout; time away is not counted.",
                )
                .await;
            }
            PlayerEvent::SessionFinished {
                total_elapsed_sec,
                label,
                ..
            } => println!(
                "\nWorkout complete: {} in {}",
                label,
                format_clock(total_elapsed_sec)
            ),
            PlayerEvent::PersistenceFailed { reason, .. } => {
                println!("\nWarning: progress not saved ({})", reason)
            }
            _ => {}
        }
        let _ = std::io::stdout().flush();
    }
}
