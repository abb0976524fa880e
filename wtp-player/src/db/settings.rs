//! Settings database access
//!
//! Read/write runtime settings from the `settings` table (key-value store).
//! Database values override the TOML bootstrap; missing values are written
//! back from the bootstrap so the table always reflects what is in effect.

use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;
use wtp_common::config::{PlayerConfig, SequencerPolicy};
use wtp_common::{Error, Result};

/// Generic setting getter
///
/// Returns None if key doesn't exist in database.
/// Parses value from string using FromStr trait.
pub async fn get_setting<T: FromStr>(db: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &SqlitePool, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}

/// Read `key`, initializing it with `fallback` when absent
async fn get_or_init<T>(db: &SqlitePool, key: &str, fallback: T) -> Result<T>
where
    T: FromStr + ToString + Copy,
{
    match get_setting::<T>(db, key).await? {
        Some(value) => Ok(value),
        None => {
            set_setting(db, key, fallback).await?;
            info!("Initialized setting '{}' with value: {}", key, fallback.to_string());
            Ok(fallback)
        }
    }
}

/// Apply database overrides on top of the bootstrap step policy
pub async fn load_sequencer_policy(db: &SqlitePool, base: SequencerPolicy) -> Result<SequencerPolicy> {
    Ok(SequencerPolicy {
        countdown_sec: get_or_init(db, "countdown_sec", base.countdown_sec).await?,
        seconds_per_rep: get_or_init(db, "seconds_per_rep", base.seconds_per_rep).await?,
        fallback_work_sec: get_or_init(db, "fallback_work_sec", base.fallback_work_sec).await?,
        default_rest_sec: get_or_init(db, "default_rest_sec", base.default_rest_sec).await?,
    })
}

/// Apply database overrides on top of the bootstrap player configuration
pub async fn load_player_config(db: &SqlitePool, base: PlayerConfig) -> Result<PlayerConfig> {
    Ok(PlayerConfig {
        staleness_hours: get_or_init(db, "staleness_hours", base.staleness_hours).await?,
        persist_interval_ms: get_or_init(db, "persist_interval_ms", base.persist_interval_ms).await?,
        frame_interval_ms: get_or_init(db, "frame_interval_ms", base.frame_interval_ms).await?,
        vibration_enabled: base.vibration_enabled,
        event_capacity: base.event_capacity,
    })
}
