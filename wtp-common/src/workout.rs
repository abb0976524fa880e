//! Workout model consumed by the player
//!
//! Blocks arrive from the routine collaborators; steps are derived from them
//! by the sequencer and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Block category as assigned by the routine collaborators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Warmup,
    Standard,
    Finisher,
    Cardio,
    Regen,
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockType::Warmup => write!(f, "WARMUP"),
            BlockType::Standard => write!(f, "STANDARD"),
            BlockType::Finisher => write!(f, "FINISHER"),
            BlockType::Cardio => write!(f, "CARDIO"),
            BlockType::Regen => write!(f, "REGEN"),
        }
    }
}

/// One exercise prescription within a routine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Stable block identifier (feeds the steps signature)
    pub id: String,
    pub block_type: BlockType,
    #[serde(default)]
    pub exercise_id: Option<String>,
    #[serde(default)]
    pub exercise_name: Option<String>,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    /// Fixed work duration in seconds; wins over reps when present
    #[serde(default)]
    pub work_duration_sec: Option<u32>,
    /// Rest after each set in seconds
    #[serde(default)]
    pub rest_sec: Option<u32>,
}

impl Block {
    /// Rep-based block (`sets` x `reps`, `rest_sec` between sets)
    pub fn reps(id: &str, block_type: BlockType, name: &str, sets: u32, reps: u32, rest_sec: u32) -> Self {
        Self {
            id: id.to_string(),
            block_type,
            exercise_id: Some(format!("ex-{}", id)),
            exercise_name: Some(name.to_string()),
            sets: Some(sets),
            reps: Some(reps),
            work_duration_sec: None,
            rest_sec: Some(rest_sec),
        }
    }

    /// Time-based block (`sets` x `work_sec`, `rest_sec` between sets)
    pub fn timed(id: &str, block_type: BlockType, name: &str, sets: u32, work_sec: u32, rest_sec: u32) -> Self {
        Self {
            id: id.to_string(),
            block_type,
            exercise_id: Some(format!("ex-{}", id)),
            exercise_name: Some(name.to_string()),
            sets: Some(sets),
            reps: None,
            work_duration_sec: Some(work_sec),
            rest_sec: Some(rest_sec),
        }
    }

    pub fn is_warmup(&self) -> bool {
        self.block_type == BlockType::Warmup
    }
}

/// Step phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    Countdown,
    Work,
    Rest,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Countdown => write!(f, "COUNTDOWN"),
            StepKind::Work => write!(f, "WORK"),
            StepKind::Rest => write!(f, "REST"),
        }
    }
}

/// One atomic timed phase of a workout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    /// Ordinal position in the flattened sequence
    pub index: usize,
    pub kind: StepKind,
    pub source_block_type: BlockType,
    pub exercise_id: Option<String>,
    pub exercise_name: String,
    /// Always positive
    pub duration_sec: u32,
    pub set_number: Option<u32>,
    pub total_sets: Option<u32>,
    pub reps: Option<u32>,
    pub is_last_set_of_exercise: Option<bool>,
}

/// Session-level player state, disjoint from [`StepKind`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Ready,
    Running,
    Paused,
    Finished,
    Aborted,
}

impl PlayerStatus {
    /// FINISHED and ABORTED accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, PlayerStatus::Finished | PlayerStatus::Aborted)
    }
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerStatus::Ready => write!(f, "READY"),
            PlayerStatus::Running => write!(f, "RUNNING"),
            PlayerStatus::Paused => write!(f, "PAUSED"),
            PlayerStatus::Finished => write!(f, "FINISHED"),
            PlayerStatus::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Status stored in a persisted session record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Running,
    Paused,
}

impl From<SessionStatus> for PlayerStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Running => PlayerStatus::Running,
            SessionStatus::Paused => PlayerStatus::Paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_deserializes_with_missing_optionals() {
        let json = r#"{"id":"b1","block_type":"STANDARD"}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.block_type, BlockType::Standard);
        assert_eq!(block.sets, None);
        assert_eq!(block.rest_sec, None);
        assert!(!block.is_warmup());
    }

    #[test]
    fn test_block_type_wire_names() {
        assert_eq!(serde_json::to_string(&BlockType::Regen).unwrap(), "\"REGEN\"");
        assert_eq!(BlockType::Warmup.to_string(), "WARMUP");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PlayerStatus::Finished.is_terminal());
        assert!(PlayerStatus::Aborted.is_terminal());
        assert!(!PlayerStatus::Paused.is_terminal());
        assert_eq!(PlayerStatus::from(SessionStatus::Paused), PlayerStatus::Paused);
    }
}
