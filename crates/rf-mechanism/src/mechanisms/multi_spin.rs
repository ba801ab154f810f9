//! Multi-spin mechanism
//!
//! A fixed-length run of spins where each index may carry its own rule:
//! symbols that persist into later spins, an absolute multiplier, or a reel
//! set for the renderer.

use serde::{Deserialize, Serialize};

use crate::config::{MechanismConfig, MechanismParams, MultiSpinParams, PerSpinRule};
use crate::engine::{BoxedMechanism, Mechanism};
use crate::error::EngineResult;
use crate::rules;
use crate::state::{CustomState, PersistentState};
use crate::step::StepData;
use crate::types::Position;

use super::{missing_params, state_mismatch};

/// A symbol kept on the board across spins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSymbol {
    pub position: Position,
    pub symbol: String,
    /// Spin index the symbol was first seen on
    pub since_spin: u32,
}

/// Multi-spin bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSpinState {
    /// Index of the next spin
    pub spin_index: u32,
    pub persisted_symbols: Vec<PersistedSymbol>,
    /// Reel set requested by the current spin's rule
    pub active_reel_config: Option<String>,
}

impl MultiSpinState {
    pub fn is_persisted(&self, pos: Position) -> bool {
        self.persisted_symbols.iter().any(|p| p.position == pos)
    }
}

/// Multi-spin mechanism
#[derive(Debug, Clone, Default)]
pub struct MultiSpinMechanism {
    params: Option<MultiSpinParams>,
}

impl MultiSpinMechanism {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule_for(&self, spin_index: u32) -> Option<&PerSpinRule> {
        self.params
            .as_ref()
            .and_then(|p| p.per_spin_rules.get(spin_index as usize))
    }
}

impl Mechanism for MultiSpinMechanism {
    fn name(&self) -> &str {
        "Multi Spin"
    }

    fn description(&self) -> &str {
        "Fixed-length spin sequence with per-spin overrides"
    }

    fn on_initialize(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<()> {
        let MechanismParams::MultiSpin(params) = &config.params else {
            return Err(missing_params(config));
        };
        if params.per_spin_rules.len() > params.spin_count as usize {
            log::warn!(
                "{}: {} per-spin rules for {} spins, extra rules ignored",
                config.id,
                params.per_spin_rules.len(),
                params.spin_count
            );
        }
        self.params = Some(params.clone());
        state.custom = CustomState::MultiSpin(MultiSpinState::default());
        Ok(())
    }

    fn consume_step_data(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()> {
        let spin_index = state
            .custom
            .multi_spin()
            .map(|book| book.spin_index)
            .ok_or_else(|| state_mismatch(config, "multiSpin"))?;
        let rule = self.rule_for(spin_index).cloned().unwrap_or_default();

        match rule.multiplier_override {
            Some(multiplier) => state.multiplier = multiplier,
            None => {
                if let Some(hint) = step.multiplier {
                    state.multiplier = hint;
                }
            }
        }

        let book = state
            .custom
            .multi_spin_mut()
            .ok_or_else(|| state_mismatch(config, "multiSpin"))?;
        for symbol in &rule.persistent_symbols {
            for position in step.positions_of(symbol) {
                if book.is_persisted(position) {
                    continue;
                }
                book.persisted_symbols.push(PersistedSymbol {
                    position,
                    symbol: symbol.clone(),
                    since_spin: spin_index,
                });
            }
        }
        if rule.reel_config_override.is_some() {
            book.active_reel_config = rule.reel_config_override;
        }
        Ok(())
    }

    fn update_persistent_state(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        _step: &StepData,
    ) -> EngineResult<()> {
        let book = state
            .custom
            .multi_spin_mut()
            .ok_or_else(|| state_mismatch(config, "multiSpin"))?;
        book.spin_index += 1;
        Ok(())
    }

    fn check_completion(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        let spun_out = match (&self.params, state.custom.multi_spin()) {
            (Some(params), Some(book)) => book.spin_index >= params.spin_count,
            _ => false,
        };
        spun_out || rules::completion_reached(config, state, step)
    }

    fn on_complete(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<f64> {
        let persisted = state
            .custom
            .multi_spin()
            .map_or(0, |book| book.persisted_symbols.len());
        log::debug!("{}: {} symbols persisted", config.id, persisted);
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

    fn engine(rules: Vec<PerSpinRule>, spin_count: u32) -> MechanismEngine {
        let params = MultiSpinParams {
            spin_count,
            per_spin_rules: rules,
        };
        let config = MechanismConfig::multi_spin(params).with_grid(2, 3);
        let mut engine = MechanismEngine::new(config, Box::new(MultiSpinMechanism::new()));
        engine.initialize(None, None).unwrap();
        engine
    }

    #[test]
    fn test_multiplier_override_is_absolute() {
        let rules = vec![
            PerSpinRule {
                multiplier_override: Some(2.0),
                ..Default::default()
            },
            PerSpinRule {
                multiplier_override: Some(5.0),
                ..Default::default()
            },
        ];
        let mut engine = engine(rules, 2);

        let first = engine.process_step(&StepData::new(0).with_total_win(10.0)).unwrap();
        assert!((first.step_win - 20.0).abs() < 0.001);
        assert!(!first.is_complete);

        let second = engine.process_step(&StepData::new(1).with_total_win(10.0)).unwrap();
        assert!((second.step_win - 50.0).abs() < 0.001);
        assert!((second.cumulative_win - 70.0).abs() < 0.001);
        assert!(second.is_complete);
    }

    #[test]
    fn test_persistent_symbols_deduplicated() {
        let rule = PerSpinRule {
            persistent_symbols: vec!["W".into()],
            ..Default::default()
        };
        let mut engine = engine(vec![rule.clone(), rule], 3);

        let board = vec![vec!["W", "A", "B"], vec!["C", "W", "D"]];
        engine.process_step(&StepData::new(0).with_matrix(board.clone())).unwrap();
        engine.process_step(&StepData::new(1).with_matrix(board)).unwrap();

        let book = engine.state().custom.multi_spin().unwrap();
        assert_eq!(book.persisted_symbols.len(), 2);
        assert!(book.persisted_symbols.iter().all(|p| p.since_spin == 0));
        assert_eq!(book.spin_index, 2);
    }

    #[test]
    fn test_reel_config_override_recorded() {
        let rules = vec![
            PerSpinRule::default(),
            PerSpinRule {
                reel_config_override: Some("superReels".into()),
                ..Default::default()
            },
        ];
        let mut engine = engine(rules, 3);

        engine.process_step(&StepData::new(0)).unwrap();
        assert_eq!(engine.state().custom.multi_spin().unwrap().active_reel_config, None);
        engine.process_step(&StepData::new(1)).unwrap();
        assert_eq!(
            engine.state().custom.multi_spin().unwrap().active_reel_config.as_deref(),
            Some("superReels")
        );
    }

    #[test]
    fn test_multiplier_hint_without_rule() {
        let mut engine = engine(Vec::new(), 2);
        let mut step = StepData::new(0).with_total_win(4.0);
        step.multiplier = Some(3.0);

        let result = engine.process_step(&step).unwrap();
        assert!((result.step_win - 12.0).abs() < 0.001);
    }
}
