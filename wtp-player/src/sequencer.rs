//! Step sequencer
//!
//! Flattens an ordered list of exercise blocks into one linear sequence of
//! timed steps (COUNTDOWN / WORK / REST). Progress through a workout is then a
//! single index into that sequence, which is all the timing engine and the
//! persistence store need to track.
//!
//! **Rules:**
//! - WARMUP blocks are dropped when the user skips the warmup
//! - Work duration: fixed duration, else `reps * seconds_per_rep`, else fallback
//! - One COUNTDOWN before the first set of the first block
//! - Between sets of a block: REST when the block rest is positive
//! - Between blocks: REST (finished block's rest) then COUNTDOWN for the next
//!   block, only when that rest is positive
//! - `sets` absent or zero means one set; `rest` absent means the policy default
//! - Zero-length steps are never emitted

use sha2::{Digest, Sha256};
use wtp_common::config::SequencerPolicy;
use wtp_common::workout::{Block, Step, StepKind};

/// Build the flattened step sequence for a routine.
///
/// Pure and deterministic: identical inputs always produce identical output.
/// An empty result means there is nothing to play.
///
/// # Examples
///
/// ```
/// use wtp_common::config::SequencerPolicy;
/// use wtp_common::workout::{Block, BlockType, StepKind};
/// use wtp_player::sequencer::build_steps;
///
/// let blocks = vec![Block::reps("b1", BlockType::Standard, "Squat", 3, 10, 60)];
/// let steps = build_steps(&blocks, false, &SequencerPolicy::default());
///
/// assert_eq!(steps.len(), 6);
/// assert_eq!(steps[0].kind, StepKind::Countdown);
/// assert_eq!(steps[1].duration_sec, 20);
/// ```
pub fn build_steps(blocks: &[Block], skip_warmup: bool, policy: &SequencerPolicy) -> Vec<Step> {
    let active: Vec<&Block> = blocks
        .iter()
        .filter(|b| !(skip_warmup && b.is_warmup()))
        .collect();

    if active.is_empty() {
        return Vec::new();
    }

    let mut steps = Vec::new();
    let last_block = active.len() - 1;

    for (block_idx, block) in active.iter().enumerate() {
        let sets = sets_of(block);
        let rest = rest_of(block, policy);
        let work = work_duration_sec(block, policy);

        if block_idx == 0 {
            push_countdown(&mut steps, block, policy);
        }

        for set in 1..=sets {
            steps.push(Step {
                index: 0,
                kind: StepKind::Work,
                source_block_type: block.block_type,
                exercise_id: block.exercise_id.clone(),
                exercise_name: exercise_name_of(block),
                duration_sec: work,
                set_number: Some(set),
                total_sets: Some(sets),
                reps: block.reps.filter(|r| *r > 0),
                is_last_set_of_exercise: Some(set == sets),
            });

            if set < sets && rest > 0 {
                push_rest(&mut steps, block, rest);
            }
        }

        if block_idx < last_block && rest > 0 {
            push_rest(&mut steps, block, rest);
            push_countdown(&mut steps, active[block_idx + 1], policy);
        }
    }

    for (index, step) in steps.iter_mut().enumerate() {
        step.index = index;
    }

    steps
}

/// Work seconds for one set of `block`
pub fn work_duration_sec(block: &Block, policy: &SequencerPolicy) -> u32 {
    if let Some(fixed) = block.work_duration_sec.filter(|d| *d > 0) {
        return fixed;
    }
    match block.reps {
        Some(reps) if reps > 0 && policy.seconds_per_rep > 0 => {
            reps.saturating_mul(policy.seconds_per_rep)
        }
        _ => policy.fallback_work_sec.max(1),
    }
}

/// Content hash of the block-id sequence plus the warmup choice.
///
/// Used to detect that the routine changed between persisting a session and
/// rehydrating it.
pub fn steps_signature(blocks: &[Block], skip_warmup: bool) -> String {
    let mut hasher = Sha256::new();
    for block in blocks {
        hasher.update(block.id.as_bytes());
        hasher.update([0x1f_u8]);
    }
    hasher.update(if skip_warmup { b"skip" } else { b"keep" });
    format!("{:x}", hasher.finalize())
}

/// Nominal length of a sequence in seconds
pub fn total_duration_sec(steps: &[Step]) -> u64 {
    steps.iter().map(|s| u64::from(s.duration_sec)).sum()
}

/// Whether the routine offers a warmup the user may skip
pub fn has_warmup(blocks: &[Block]) -> bool {
    blocks.iter().any(Block::is_warmup)
}

fn sets_of(block: &Block) -> u32 {
    block.sets.filter(|s| *s > 0).unwrap_or(1)
}

fn rest_of(block: &Block, policy: &SequencerPolicy) -> u32 {
    block.rest_sec.unwrap_or(policy.default_rest_sec)
}

fn exercise_name_of(block: &Block) -> String {
    block
        .exercise_name
        .clone()
        .unwrap_or_else(|| block.block_type.to_string())
}

fn push_countdown(steps: &mut Vec<Step>, upcoming: &Block, policy: &SequencerPolicy) {
    if policy.countdown_sec == 0 {
        return;
    }
    steps.push(Step {
        index: 0,
        kind: StepKind::Countdown,
        source_block_type: upcoming.block_type,
        exercise_id: upcoming.exercise_id.clone(),
        exercise_name: exercise_name_of(upcoming),
        duration_sec: policy.countdown_sec,
        set_number: None,
        total_sets: None,
        reps: None,
        is_last_set_of_exercise: None,
    });
}

fn push_rest(steps: &mut Vec<Step>, block: &Block, rest: u32) {
    steps.push(Step {
        index: 0,
        kind: StepKind::Rest,
        source_block_type: block.block_type,
        exercise_id: block.exercise_id.clone(),
        exercise_name: exercise_name_of(block),
        duration_sec: rest,
        set_number: None,
        total_sets: None,
        reps: None,
        is_last_set_of_exercise: None,
    });
}
