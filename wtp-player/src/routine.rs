//! Routine files
//!
//! A routine file carries the blocks of one workout plus the metadata used
//! for the history label. JSON and TOML are accepted, chosen by extension.
//!
//! ```toml
//! title = "Leg Day"
//! source = "custom"
//!
//! [[blocks]]
//! id = "b1"
//! block_type = "STANDARD"
//! exercise_name = "Squat"
//! sets = 3
//! reps = 10
//! rest_sec = 60
//! ```

use crate::player::SessionContext;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wtp_common::workout::Block;
use wtp_common::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineFile {
    pub title: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub program_key: Option<String>,
    #[serde(default)]
    pub day_key: Option<String>,
    #[serde(default)]
    pub system_routine_id: Option<String>,
    #[serde(default)]
    pub user_routine_id: Option<String>,
    pub blocks: Vec<Block>,
}

fn default_source() -> String {
    "system".to_string()
}

impl RoutineFile {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::InvalidInput(format!("routine TOML: {}", e)))
    }

    /// Read a routine from disk (`.toml` as TOML, anything else as JSON)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Session context for one attempt at this routine
    pub fn session_context(&self, session_id: &str, user_id: &str) -> SessionContext {
        SessionContext {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            source: self.source.clone(),
            routine_title: self.title.clone(),
            program_key: self.program_key.clone(),
            day_key: self.day_key.clone(),
            system_routine_id: self.system_routine_id.clone(),
            user_routine_id: self.user_routine_id.clone(),
        }
    }
}
