//! User preference flags
//!
//! Plain persisted booleans, independent of any one session: the sound
//! toggle, the vibration toggle and one-time "seen this tip" dismissals.
//! Values are stored as `"true"` / `"false"`; anything else reads as the
//! default and is cleared.

use crate::store::storage::DurableStorage;
use std::sync::Arc;
use tracing::warn;

const SOUND_ENABLED_KEY: &str = "wtp:pref:sound_enabled";
const VIBRATION_ENABLED_KEY: &str = "wtp:pref:vibration_enabled";
const TIP_KEY_PREFIX: &str = "wtp:tip:";

/// One-time hints shown by the player UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tip {
    /// Explains the skip-warmup question
    SkipWarmup,
    /// Explains skipping the current step
    SkipStep,
    /// Explains the auto-pause when the app is backgrounded
    BackgroundPause,
    /// Points at the sound toggle
    SoundToggle,
}

impl Tip {
    pub fn as_str(self) -> &'static str {
        match self {
            Tip::SkipWarmup => "skip_warmup",
            Tip::SkipStep => "skip_step",
            Tip::BackgroundPause => "background_pause",
            Tip::SoundToggle => "sound_toggle",
        }
    }

    fn key(self) -> String {
        format!("{}{}", TIP_KEY_PREFIX, self.as_str())
    }
}

/// Persisted user preferences
#[derive(Clone)]
pub struct Preferences {
    storage: Arc<dyn DurableStorage>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Sound cues enabled (default: true)
    pub async fn sound_enabled(&self) -> bool {
        self.get_flag(SOUND_ENABLED_KEY, true).await
    }

    pub async fn set_sound_enabled(&self, enabled: bool) {
        self.set_flag(SOUND_ENABLED_KEY, enabled).await;
    }

    pub async fn clear_sound_enabled(&self) {
        self.clear_flag(SOUND_ENABLED_KEY).await;
    }

    /// Haptic cues enabled (default: true)
    pub async fn vibration_enabled(&self) -> bool {
        self.get_flag(VIBRATION_ENABLED_KEY, true).await
    }

    pub async fn set_vibration_enabled(&self, enabled: bool) {
        self.set_flag(VIBRATION_ENABLED_KEY, enabled).await;
    }

    pub async fn clear_vibration_enabled(&self) {
        self.clear_flag(VIBRATION_ENABLED_KEY).await;
    }

    /// Whether a tip was already dismissed (default: false)
    pub async fn tip_seen(&self, tip: Tip) -> bool {
        self.get_flag(&tip.key(), false).await
    }

    pub async fn mark_tip_seen(&self, tip: Tip) {
        self.set_flag(&tip.key(), true).await;
    }

    pub async fn clear_tip(&self, tip: Tip) {
        self.clear_flag(&tip.key()).await;
    }

    async fn get_flag(&self, key: &str, default: bool) -> bool {
        match self.storage.get(key).await {
            Ok(Some(value)) => match value.parse::<bool>() {
                Ok(flag) => flag,
                Err(_) => {
                    warn!("Ignoring unparseable preference '{}' value: {}", key, value);
                    self.clear_flag(key).await;
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to read preference '{}': {}", key, e);
                default
            }
        }
    }

    async fn set_flag(&self, key: &str, value: bool) {
        if let Err(e) = self.storage.set(key, &value.to_string()).await {
            warn!("Failed to write preference '{}': {}", key, e);
        }
    }

    async fn clear_flag(&self, key: &str) {
        if let Err(e) = self.storage.remove(key).await {
            warn!("Failed to clear preference '{}': {}", key, e);
        }
    }
}
