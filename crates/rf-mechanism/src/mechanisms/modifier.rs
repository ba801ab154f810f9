//! Modifier mechanism
//!
//! Board modifiers arrive with the step data. Multiplier bumps go straight
//! into the running multiplier; every other kind is handed to the renderer
//! through the active-modifier list, which only covers the current step.

use serde::{Deserialize, Serialize};

use crate::config::{CompletionKind, MechanismConfig, MechanismParams, ModifierParams};
use crate::engine::{BoxedMechanism, Mechanism};
use crate::error::EngineResult;
use crate::rules;
use crate::state::{CustomState, PersistentState};
use crate::step::{Modifier, ModifierKind, StepData};

use super::{missing_params, state_mismatch};

/// A modifier as applied at a given step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierRecord {
    pub step_index: u32,
    pub modifier: Modifier,
}

/// Modifier bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierState {
    /// Every applied modifier, in order
    pub history: Vec<ModifierRecord>,
    /// Non-multiplier modifiers of the current step
    pub active_modifiers: Vec<Modifier>,
    pub applied_this_step: u32,
    /// Sum of all `addMultiplier` values applied so far
    pub multiplier_added: f64,
}

/// Modifier mechanism
#[derive(Debug, Clone, Default)]
pub struct ModifierMechanism {
    params: Option<ModifierParams>,
}

impl ModifierMechanism {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many of the step's modifiers apply (0 = unlimited)
    fn limit(&self, available: usize) -> usize {
        match self.params.as_ref().map(|p| p.max_modifiers_per_step) {
            Some(0) | None => available,
            Some(max) => available.min(max as usize),
        }
    }
}

impl Mechanism for ModifierMechanism {
    fn name(&self) -> &str {
        "Modifier"
    }

    fn description(&self) -> &str {
        "Apply board modifiers delivered with each step"
    }

    fn on_initialize(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<()> {
        let MechanismParams::Modifier(params) = &config.params else {
            return Err(missing_params(config));
        };
        self.params = Some(params.clone());
        state.custom = CustomState::Modifier(ModifierState::default());
        Ok(())
    }

    fn consume_step_data(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()> {
        let limit = self.limit(step.modifiers.len());
        if limit < step.modifiers.len() {
            log::warn!(
                "{}: step {} carried {} modifiers, applying first {}",
                config.id,
                step.step_index,
                step.modifiers.len(),
                limit
            );
        }
        let applied = &step.modifiers[..limit];

        let bump: f64 = applied
            .iter()
            .filter(|m| m.kind == ModifierKind::AddMultiplier)
            .map(|m| m.value)
            .sum();
        state.multiplier += bump;

        let book = state
            .custom
            .modifier_mut()
            .ok_or_else(|| state_mismatch(config, "modifier"))?;
        book.multiplier_added += bump;
        book.applied_this_step = applied.len() as u32;
        book.active_modifiers = applied
            .iter()
            .filter(|m| m.kind != ModifierKind::AddMultiplier)
            .cloned()
            .collect();
        book.history.extend(applied.iter().map(|m| ModifierRecord {
            step_index: step.step_index,
            modifier: m.clone(),
        }));
        Ok(())
    }

    fn update_persistent_state(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        _step: &StepData,
    ) -> EngineResult<()> {
        let active = state
            .custom
            .modifier()
            .map(|book| book.active_modifiers.len())
            .ok_or_else(|| state_mismatch(config, "modifier"))?;
        if active > 0 {
            log::trace!("{}: {} board modifiers active", config.id, active);
        }
        Ok(())
    }

    fn check_completion(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        if config.completion_condition.kind == CompletionKind::NoModifiers {
            let quiet = state
                .custom
                .modifier()
                .is_none_or(|book| book.applied_this_step == 0);
            return quiet && state.iterations_remaining() == 0;
        }
        rules::completion_reached(config, state, step)
    }

    fn on_complete(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<f64> {
        let book = state
            .custom
            .modifier_mut()
            .ok_or_else(|| state_mismatch(config, "modifier"))?;
        book.active_modifiers.clear();
        log::debug!("{}: {} modifiers applied", config.id, book.history.len());
        Ok(0.0)
    }

    fn clone_box(&self) -> BoxedMechanism {
        Box::new(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResetCondition;
    use crate::engine::MechanismEngine;

    fn engine(max_per_step: u32, iterations: u32) -> MechanismEngine {
        let params = ModifierParams {
            modifier_pool: Vec::new(),
            max_modifiers_per_step: max_per_step,
        };
        let config = MechanismConfig::modifier(params, iterations);
        let mut engine = MechanismEngine::new(config, Box::new(ModifierMechanism::new()));
        engine.initialize(None, None).unwrap();
        engine
    }

    #[test]
    fn test_add_multiplier_bypasses_progression() {
        let mut engine = engine(0, 3);
        let step = StepData::new(0)
            .with_total_win(10.0)
            .with_modifier(Modifier::new(ModifierKind::AddMultiplier, 2.0));

        let result = engine.process_step(&step).unwrap();
        // bump lands before the win is evaluated
        assert!((result.step_win - 30.0).abs() < 0.001);
        assert!((engine.state().multiplier - 3.0).abs() < 0.001);
        assert!(engine.state().custom.modifier().unwrap().active_modifiers.is_empty());
    }

    #[test]
    fn test_board_modifiers_only_active_for_their_step() {
        let mut engine = engine(0, 3);
        let step = StepData::new(0)
            .with_modifier(Modifier::new(ModifierKind::ExpandGrid, 1.0))
            .with_modifier(Modifier::new(ModifierKind::SymbolSwap, 0.0));
        engine.process_step(&step).unwrap();
        assert_eq!(engine.state().custom.modifier().unwrap().active_modifiers.len(), 2);

        engine.process_step(&StepData::new(1)).unwrap();
        let book = engine.state().custom.modifier().unwrap();
        assert!(book.active_modifiers.is_empty());
        assert_eq!(book.history.len(), 2);
    }

    #[test]
    fn test_per_step_limit() {
        let mut engine = engine(1, 3);
        let step = StepData::new(0)
            .with_modifier(Modifier::new(ModifierKind::AddMultiplier, 1.0))
            .with_modifier(Modifier::new(ModifierKind::AddMultiplier, 1.0));
        engine.process_step(&step).unwrap();

        assert!((engine.state().multiplier - 2.0).abs() < 0.001);
        assert_eq!(engine.state().custom.modifier().unwrap().history.len(), 1);
    }

    #[test]
    fn test_no_modifiers_completion() {
        let mut engine = engine(0, 1);
        let busy = StepData::new(0).with_modifier(Modifier::new(ModifierKind::AddSymbol, 0.0));
        let result = engine.process_step(&busy).unwrap();
        assert!(!result.is_complete);
        assert_eq!(engine.state().iterations_remaining(), 0);

        let result = engine.process_step(&StepData::new(1)).unwrap();
        assert!(result.is_complete);
    }

    #[test]
    fn test_win_reset_keeps_sequence_alive() {
        let params = ModifierParams {
            modifier_pool: Vec::new(),
            max_modifiers_per_step: 0,
        };
        let config = MechanismConfig::modifier(params, 1).with_reset(ResetCondition::on_win(1));
        let mut engine = MechanismEngine::new(config, Box::new(ModifierMechanism::new()));
        engine.initialize(None, None).unwrap();

        let result = engine.process_step(&StepData::new(0).with_total_win(5.0)).unwrap();
        assert!(!result.is_complete);
        assert_eq!(engine.state().iterations_remaining(), 1);
    }
}
