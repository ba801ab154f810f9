//! Default reset, completion, multiplier and win rules
//!
//! These are the engine's built-in answers for the optional extension points.
//! Mechanisms that override a hook can still call the matching function here
//! and combine it with their own condition.

use crate::config::{CompletionKind, MechanismConfig, ProgressionKind, ResetKind};
use crate::state::PersistentState;
use crate::step::StepData;

/// Fill threshold used when `boardFilled` declares none
pub const DEFAULT_FILL_THRESHOLD: f64 = 1.0;

/// Does the configured reset condition hold for this step?
///
/// `custom` never holds by default; the mechanism must decide.
pub fn reset_applies(config: &MechanismConfig, step: &StepData) -> bool {
    let reset = &config.reset_condition;
    match reset.kind {
        ResetKind::SymbolLand => match reset.symbol.as_deref() {
            Some(symbol) => step.landings_of(symbol).next().is_some(),
            None => !step.special_symbols.is_empty(),
        },
        ResetKind::WinOccurs => step.has_win(),
        ResetKind::Never | ResetKind::Custom => false,
    }
}

/// Iteration counter after a step
///
/// A reset restores `reset_to`, otherwise the counter drops by one and stops
/// at zero. The result never exceeds `maxIterations`.
pub fn next_iterations(config: &MechanismConfig, current: u32, reset_to: Option<u32>) -> u32 {
    let next = match reset_to {
        Some(target) => target,
        None => current.saturating_sub(1),
    };
    next.min(config.max_iterations)
}

/// Default completion table, keyed by `completionCondition.kind`
pub fn completion_reached(
    config: &MechanismConfig,
    state: &PersistentState,
    step: &StepData,
) -> bool {
    let condition = &config.completion_condition;
    let exhausted = state.iterations_remaining() == 0;

    match condition.kind {
        CompletionKind::IterationsExhausted => exhausted,
        CompletionKind::BoardFilled => {
            let threshold = condition.fill_threshold.unwrap_or(DEFAULT_FILL_THRESHOLD);
            state.locked_count() as f64 >= config.grid_size().cells() as f64 * threshold
        }
        CompletionKind::FixedCount => {
            let count = condition.count.unwrap_or(config.max_iterations);
            state.current_step() as u64 + 1 >= count as u64
        }
        // Same as exhaustion here; lock-aware mechanisms add their own check
        CompletionKind::NoNewLocks => exhausted,
        CompletionKind::CollectionComplete => {
            state.collected_value >= condition.target_value.unwrap_or(f64::INFINITY)
        }
        CompletionKind::NoModifiers => step.modifiers.is_empty() && exhausted,
        CompletionKind::Custom => exhausted,
    }
}

/// Apply the configured multiplier progression
pub fn progress_multiplier(config: &MechanismConfig, state: &mut PersistentState, step: &StepData) {
    let Some(progression) = &config.multiplier_progression else {
        return;
    };
    let increment = match progression.kind {
        ProgressionKind::PerStep => progression.increment,
        ProgressionKind::PerWin if step.has_win() => progression.increment,
        ProgressionKind::PerWin => 0.0,
        ProgressionKind::PerLock => progression.increment * step.special_symbols.len() as f64,
        ProgressionKind::Fixed => 0.0,
    };
    state.multiplier = (state.multiplier + increment).min(progression.max);
}

/// Keep the multiplier under the progression ceiling, if one is configured
pub fn clamp_multiplier(config: &MechanismConfig, state: &mut PersistentState) {
    if let Some(progression) = &config.multiplier_progression {
        state.multiplier = state.multiplier.min(progression.max);
    }
}

/// Default step win: the step's total times the current multiplier
pub fn multiplied_step_win(state: &PersistentState, step: &StepData) -> f64 {
    step.total_step_win * state.multiplier
}
