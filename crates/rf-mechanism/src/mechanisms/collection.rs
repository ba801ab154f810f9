//! Collection mechanism
//!
//! Values tagged with the collect symbol accumulate across iterations. The
//! pot pays out on completion if the collector landed or the config consumes
//! it automatically; otherwise it is forfeited.

use serde::{Deserialize, Serialize};

use crate::config::{CollectionParams, MechanismConfig, MechanismParams};
use crate::engine::{BoxedMechanism, Mechanism};
use crate::error::EngineResult;
use crate::rules;
use crate::state::{CustomState, PersistentState};
use crate::step::StepData;

use super::{missing_params, state_mismatch};

/// Collection bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionState {
    /// The collector symbol has landed at least once
    pub collector_landed: bool,
    pub collected_this_step: f64,
    /// Value collected per step
    pub history: Vec<f64>,
    /// Whether completion paid the pot out
    pub paid_out: bool,
}

/// Collection mechanism
#[derive(Debug, Clone, Default)]
pub struct CollectionMechanism {
    params: Option<CollectionParams>,
}

impl CollectionMechanism {
    pub fn new() -> Self {
        Self::default()
    }

    fn params(&self, config: &MechanismConfig) -> EngineResult<&CollectionParams> {
        self.params.as_ref().ok_or_else(|| missing_params(config))
    }

    fn step_value(params: &CollectionParams, step: &StepData) -> f64 {
        let landed: f64 = step
            .landings_of(&params.collect_symbol)
            .map(|l| l.value)
            .sum();
        let tagged: f64 = step
            .position_values
            .iter()
            .filter(|v| v.symbol.as_deref() == Some(params.collect_symbol.as_str()))
            .map(|v| v.value)
            .sum();
        landed + tagged
    }

    fn collector_in(params: &CollectionParams, step: &StepData) -> bool {
        let Some(collector) = params.collector_symbol.as_deref() else {
            return false;
        };
        step.landings_of(collector).next().is_some() || step.positions_of(collector).next().is_some()
    }
}

impl Mechanism for CollectionMechanism {
    fn name(&self) -> &str {
        "Collection"
    }

    fn description(&self) -> &str {
        "Accumulate symbol values until the collector lands"
    }

    fn on_initialize(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<()> {
        let MechanismParams::Collection(params) = &config.params else {
            return Err(missing_params(config));
        };
        self.params = Some(params.clone());
        state.custom = CustomState::Collection(CollectionState::default());
        Ok(())
    }

    fn consume_step_data(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()> {
        let params = self.params(config)?;
        let value = Self::step_value(params, step);
        let collector = Self::collector_in(params, step);

        state.collected_value += value;

        let book = state
            .custom
            .collection_mut()
            .ok_or_else(|| state_mismatch(config, "collection"))?;
        book.collected_this_step = value;
        if collector && !book.collector_landed {
            log::debug!("{}: collector landed at step {}", config.id, step.step_index);
            book.collector_landed = true;
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
            .collection_mut()
            .ok_or_else(|| state_mismatch(config, "collection"))?;
        book.history.push(book.collected_this_step);
        Ok(())
    }

    fn evaluate_step_win(&self, _: &MechanismConfig, _: &PersistentState, _: &StepData) -> f64 {
        0.0
    }

    fn check_completion(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        let collector = state
            .custom
            .collection()
            .is_some_and(|book| book.collector_landed);
        let threshold = self
            .params
            .as_ref()
            .and_then(|p| p.consume_threshold)
            .is_some_and(|t| state.collected_value >= t);
        collector || threshold || rules::completion_reached(config, state, step)
    }

    fn on_complete(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<f64> {
        let auto_consume = self.params(config)?.auto_consume_on_end;
        let collected = state.collected_value;
        let multiplier = state.multiplier;

        let book = state
            .custom
            .collection_mut()
            .ok_or_else(|| state_mismatch(config, "collection"))?;
        if !(auto_consume || book.collector_landed) {
            log::info!("{}: collector never landed, {} forfeited", config.id, collected);
            return Ok(0.0);
        }
        book.paid_out = true;
        Ok(collected * multiplier)
    }

    fn clone_box(&self) -> BoxedMechanism {
        Box::new(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MechanismEngine;
    use crate::types::Position;

    fn engine(params: CollectionParams, iterations: u32) -> MechanismEngine {
        let config = MechanismConfig::collection(params, iterations);
        let mut engine = MechanismEngine::new(config, Box::new(CollectionMechanism::new()));
        engine.initialize(None, None).unwrap();
        engine
    }

    fn params(collector: Option<&str>, auto: bool) -> CollectionParams {
        CollectionParams {
            collect_symbol: "C".into(),
            collector_symbol: collector.map(str::to_string),
            auto_consume_on_end: auto,
            consume_threshold: None,
        }
    }

    #[test]
    fn test_sums_landings_and_tagged_values() {
        let mut engine = engine(params(None, true), 3);
        let step = StepData::new(0)
            .with_landing(Position::new(0, 0), "C", 5.0)
            .with_landing(Position::new(0, 1), "X", 100.0)
            .with_position_value(Position::new(1, 1), 7.0, "C");

        let result = engine.process_step(&step).unwrap();
        assert!((result.step_win - 0.0).abs() < 0.001);
        assert!((engine.state().collected_value - 12.0).abs() < 0.001);
    }

    #[test]
    fn test_auto_consume_pays_on_exhaustion() {
        let mut engine = engine(params(None, true), 2);
        engine
            .process_step(&StepData::new(0).with_landing(Position::new(0, 0), "C", 20.0))
            .unwrap();
        let last = engine
            .process_step(&StepData::new(1).with_landing(Position::new(0, 1), "C", 20.0))
            .unwrap();

        assert!(last.is_complete);
        assert!((last.cumulative_win - 40.0).abs() < 0.001);
    }

    #[test]
    fn test_collector_completes_immediately() {
        let mut engine = engine(params(Some("K"), false), 5);
        engine
            .process_step(&StepData::new(0).with_landing(Position::new(0, 0), "C", 8.0))
            .unwrap();
        let result = engine
            .process_step(&StepData::new(1).with_matrix(vec![vec!["A", "K", "B"]]))
            .unwrap();

        assert!(result.is_complete);
        assert!((result.cumulative_win - 8.0).abs() < 0.001);
        let book = engine.state().custom.collection().unwrap();
        assert!(book.paid_out);
        assert_eq!(book.history, vec![8.0, 0.0]);
    }

    #[test]
    fn test_threshold_completes() {
        let mut p = params(Some("K"), false);
        p.consume_threshold = Some(10.0);
        let mut engine = engine(p, 5);

        let result = engine
            .process_step(&StepData::new(0).with_landing(Position::new(0, 0), "C", 12.0))
            .unwrap();
        assert!(result.is_complete);
        // neither collector nor auto-consume: the pot is forfeited
        assert!((result.cumulative_win - 0.0).abs() < 0.001);
    }
}
