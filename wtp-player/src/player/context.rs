//! Session metadata and history label

use serde::{Deserialize, Serialize};

/// Source value marking a user-authored routine
pub const SOURCE_CUSTOM: &str = "custom";

/// Label used when a routine has no title at all
const UNTITLED: &str = "Workout";

/// Identity and provenance of one workout attempt, supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub user_id: String,
    /// Where the routine came from (`program`, `custom`, `system`, ...)
    pub source: String,
    pub routine_title: String,
    #[serde(default)]
    pub program_key: Option<String>,
    #[serde(default)]
    pub day_key: Option<String>,
    #[serde(default)]
    pub system_routine_id: Option<String>,
    #[serde(default)]
    pub user_routine_id: Option<String>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Label shown in session history
    ///
    /// - `"<ProgramKey> · <Day Key>"` for program days
    /// - `"Custom · <title>"` for custom routines
    /// - the routine title otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use wtp_player::player::SessionContext;
    ///
    /// let mut ctx = SessionContext::new("s1", "u1");
    /// ctx.program_key = Some("PPL".to_string());
    /// ctx.day_key = Some("push_day".to_string());
    /// assert_eq!(ctx.label(), "PPL · Push Day");
    /// ```
    pub fn label(&self) -> String {
        let title = match self.routine_title.trim() {
            "" => UNTITLED,
            title => title,
        };

        if let Some(program) = non_blank(&self.program_key) {
            return match non_blank(&self.day_key) {
                Some(day) => format!("{} · {}", program, title_case(day)),
                None => program.to_string(),
            };
        }

        if self.source.eq_ignore_ascii_case(SOURCE_CUSTOM) {
            return format!("Custom · {}", title);
        }

        title.to_string()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `upper_body-a` → `Upper Body A`
fn title_case(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
