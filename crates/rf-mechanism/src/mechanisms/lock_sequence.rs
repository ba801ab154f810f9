//! Lock-sequence mechanism
//!
//! A designated trigger symbol progressively locks the board, either whole
//! reels (columns) or single cells. The active area shrinks step by step.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::{
    CompletionKind, LockMode, LockSequenceParams, MechanismConfig, MechanismParams, ResetKind,
};
use crate::engine::{BoxedMechanism, Mechanism};
use crate::error::EngineResult;
use crate::rules;
use crate::state::{CustomState, LockedValue, PersistentState};
use crate::step::StepData;
use crate::types::Position;

use super::{missing_params, state_mismatch};

/// Lock-sequence bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSequenceState {
    /// Trigger symbols seen this step
    pub triggers_this_step: u32,
    /// Cells newly locked this step
    pub new_locks_this_step: u32,
    /// Columns locked in reel mode
    pub locked_reels: BTreeSet<usize>,
    /// Locks that hold only for the current step (`persistLocked = false`)
    pub transient_locks: Vec<Position>,
}

/// Lock-sequence mechanism
#[derive(Debug, Clone, Default)]
pub struct LockSequenceMechanism {
    params: Option<LockSequenceParams>,
}

impl LockSequenceMechanism {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger cells from landings and from the matrix, deduplicated
    fn trigger_positions(params: &LockSequenceParams, step: &StepData) -> BTreeSet<Position> {
        step.landings_of(&params.trigger_symbol)
            .map(|l| l.position)
            .chain(step.positions_of(&params.trigger_symbol))
            .collect()
    }

    /// Value the step attaches to a cell, if any
    fn value_at(step: &StepData, pos: Position) -> f64 {
        step.special_symbols
            .iter()
            .find(|l| l.position == pos)
            .map(|l| l.value)
            .or_else(|| {
                step.position_values
                    .iter()
                    .find(|v| v.position == pos)
                    .map(|v| v.value)
            })
            .unwrap_or(0.0)
    }

    fn book(state: &PersistentState) -> Option<&LockSequenceState> {
        state.custom.lock_sequence()
    }
}

impl Mechanism for LockSequenceMechanism {
    fn name(&self) -> &str {
        "Lock Sequence"
    }

    fn description(&self) -> &str {
        "Trigger symbols lock reels or cells until nothing new locks"
    }

    fn on_initialize(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<()> {
        let MechanismParams::LockSequence(params) = &config.params else {
            return Err(missing_params(config));
        };
        self.params = Some(params.clone());
        state.custom = CustomState::LockSequence(LockSequenceState::default());
        Ok(())
    }

    fn consume_step_data(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()> {
        let params = self.params.as_ref().ok_or_else(|| missing_params(config))?;
        let grid = config.grid_size();
        let triggers = Self::trigger_positions(params, step);

        let mut targets: BTreeSet<Position> = BTreeSet::new();
        let mut reels: BTreeSet<usize> = BTreeSet::new();
        for trigger in &triggers {
            if !grid.contains(*trigger) {
                continue;
            }
            match params.lock_mode {
                LockMode::Reel => {
                    reels.insert(trigger.col);
                    targets.extend((0..grid.rows).map(|row| Position::new(row, trigger.col)));
                }
                LockMode::Position => {
                    targets.insert(*trigger);
                }
            }
        }

        let mut new_locks = 0;
        let mut transient = Vec::new();
        for pos in targets {
            let symbol = step.symbol_at(pos).map(str::to_string);
            let locked = LockedValue::new(pos, Self::value_at(step, pos), symbol);
            if params.persist_locked {
                if state.lock(locked) {
                    new_locks += 1;
                }
            } else if !state.is_locked(pos) {
                transient.push(pos);
            }
        }

        let book = state
            .custom
            .lock_sequence_mut()
            .ok_or_else(|| state_mismatch(config, "lockSequence"))?;
        book.triggers_this_step = triggers.len() as u32;
        book.new_locks_this_step = new_locks;
        book.locked_reels.extend(reels);
        book.transient_locks = transient;
        Ok(())
    }

    fn update_persistent_state(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        _step: &StepData,
    ) -> EngineResult<()> {
        let transient = Self::book(state)
            .map(|b| b.transient_locks.clone())
            .ok_or_else(|| state_mismatch(config, "lockSequence"))?;

        let active: Vec<_> = config
            .grid_size()
            .positions()
            .filter(|p| !state.is_locked(*p) && !transient.contains(p))
            .collect();
        state.active_positions = active;
        state.collected_value = state.locked_value_sum();
        Ok(())
    }

    fn should_reset_iterations(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        let reset = &config.reset_condition;
        let tracks_trigger = match (&self.params, reset.symbol.as_deref()) {
            (Some(params), Some(symbol)) => symbol == params.trigger_symbol,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches!(reset.kind, ResetKind::SymbolLand) && tracks_trigger {
            return Self::book(state).is_some_and(|b| b.triggers_this_step > 0);
        }
        rules::reset_applies(config, step)
    }

    fn check_completion(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        if config.completion_condition.kind == CompletionKind::NoNewLocks {
            let quiet = Self::book(state).is_none_or(|b| b.triggers_this_step == 0);
            return quiet && state.iterations_remaining() == 0;
        }
        rules::completion_reached(config, state, step)
    }

    fn on_complete(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<f64> {
        log::debug!(
            "{}: finished with {} locked cells",
            config.id,
            state.locked_count()
        );
        Ok(0.0)
    }

    fn clone_box(&self) -> BoxedMechanism {
        Box::new(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MechanismEngine;

    fn engine(mode: LockMode, persist: bool) -> MechanismEngine {
        let params = LockSequenceParams {
            trigger_symbol: "T".into(),
            lock_mode: mode,
            persist_locked: persist,
        };
        let config = MechanismConfig::lock_sequence(params, 2).with_grid(3, 3);
        let mut engine = MechanismEngine::new(config, Box::new(LockSequenceMechanism::new()));
        engine.initialize(None, None).unwrap();
        engine
    }

    fn board(trigger_at: Option<(usize, usize)>) -> Vec<Vec<&'static str>> {
        let mut rows = vec![vec!["A", "B", "C"], vec!["D", "E", "F"], vec!["G", "H", "I"]];
        if let Some((r, c)) = trigger_at {
            rows[r][c] = "T";
        }
        rows
    }

    #[test]
    fn test_reel_mode_locks_column_from_matrix() {
        let mut engine = engine(LockMode::Reel, true);
        let step = StepData::new(0).with_matrix(board(Some((1, 2))));
        engine.process_step(&step).unwrap();

        let state = engine.state();
        assert_eq!(state.locked_count(), 3);
        assert_eq!(state.locked_positions()["0,2"].symbol.as_deref(), Some("C"));
        assert_eq!(state.locked_positions()["1,2"].symbol.as_deref(), Some("T"));
        assert_eq!(state.active_positions.len(), 6);
        assert_eq!(state.iterations_remaining(), 2);
        let book = state.custom.lock_sequence().unwrap();
        assert!(book.locked_reels.contains(&2));
    }

    #[test]
    fn test_position_mode_locks_single_cell() {
        let mut engine = engine(LockMode::Position, true);
        let step = StepData::new(0).with_matrix(board(Some((0, 0))));
        engine.process_step(&step).unwrap();

        assert_eq!(engine.state().locked_count(), 1);
        assert!(engine.state().is_locked(Position::new(0, 0)));
    }

    #[test]
    fn test_no_new_locks_requires_quiet_step() {
        let mut engine = engine(LockMode::Position, true);

        engine.process_step(&StepData::new(0).with_matrix(board(None))).unwrap();
        assert_eq!(engine.state().iterations_remaining(), 1);

        // trigger resets the counter, sequence continues
        engine.process_step(&StepData::new(1).with_matrix(board(Some((2, 2))))).unwrap();
        assert!(engine.is_active());

        engine.process_step(&StepData::new(2).with_matrix(board(None))).unwrap();
        let last = engine.process_step(&StepData::new(3).with_matrix(board(None))).unwrap();
        assert!(last.is_complete);
    }

    #[test]
    fn test_transient_locks_do_not_persist() {
        let mut engine = engine(LockMode::Reel, false);
        engine.process_step(&StepData::new(0).with_matrix(board(Some((0, 1))))).unwrap();

        assert_eq!(engine.state().locked_count(), 0);
        assert_eq!(engine.state().active_positions.len(), 6);

        engine.process_step(&StepData::new(1).with_matrix(board(None))).unwrap();
        assert_eq!(engine.state().active_positions.len(), 9);
    }
}
