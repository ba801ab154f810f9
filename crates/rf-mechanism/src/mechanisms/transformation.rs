//! Transformation mechanism
//!
//! Records symbol upgrades. Explicit transformations come from the step;
//! step-based upgrade paths are also matched against the whole board, whether
//! or not the step declared them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{MechanismConfig, MechanismParams, TransformationParams, UpgradeCondition};
use crate::engine::{BoxedMechanism, Mechanism};
use crate::error::EngineResult;
use crate::state::{CustomState, PersistentState};
use crate::step::StepData;
use crate::types::Position;

use super::{missing_params, state_mismatch};

/// One recorded transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRecord {
    pub step_index: u32,
    pub position: Position,
    pub from: String,
    pub to: String,
    /// Found on the board through a step-based path, not declared by the step
    #[serde(default)]
    pub synthesized: bool,
}

/// Transformation bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationState {
    pub history: Vec<TransformRecord>,
    /// Position key to upgraded symbol, kept for the whole activation
    pub permanent: BTreeMap<String, String>,
    pub transforms_this_step: u32,
}

impl TransformationState {
    /// Symbol a position was permanently upgraded to
    pub fn permanent_symbol(&self, pos: Position) -> Option<&str> {
        self.permanent.get(&pos.key()).map(String::as_str)
    }
}

/// Transformation mechanism
#[derive(Debug, Clone, Default)]
pub struct TransformationMechanism {
    params: Option<TransformationParams>,
}

impl TransformationMechanism {
    pub fn new() -> Self {
        Self::default()
    }

    fn params(&self, config: &MechanismConfig) -> EngineResult<&TransformationParams> {
        self.params.as_ref().ok_or_else(|| missing_params(config))
    }

    /// Explicit transformations followed by board matches of step-based paths
    fn records(params: &TransformationParams, step: &StepData) -> Vec<TransformRecord> {
        let explicit = step.transformations.iter().map(|t| TransformRecord {
            step_index: step.step_index,
            position: t.position,
            from: t.from.clone(),
            to: t.to.clone(),
            synthesized: false,
        });

        let scanned = params
            .upgrade_paths
            .iter()
            .filter(|path| path.condition == UpgradeCondition::StepBased)
            .flat_map(move |path| {
                step.positions_of(&path.from).map(move |position| TransformRecord {
                    step_index: step.step_index,
                    position,
                    from: path.from.clone(),
                    to: path.to.clone(),
                    synthesized: true,
                })
            });

        explicit.chain(scanned).collect()
    }
}

impl Mechanism for TransformationMechanism {
    fn name(&self) -> &str {
        "Transformation"
    }

    fn description(&self) -> &str {
        "Symbol upgrade chains"
    }

    fn on_initialize(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<()> {
        let MechanismParams::Transformation(params) = &config.params else {
            return Err(missing_params(config));
        };
        self.params = Some(params.clone());
        state.custom = CustomState::Transformation(TransformationState::default());
        Ok(())
    }

    fn consume_step_data(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()> {
        let params = self.params(config)?;
        let permanent = params.permanent_transforms;
        let records = Self::records(params, step);

        let book = state
            .custom
            .transformation_mut()
            .ok_or_else(|| state_mismatch(config, "transformation"))?;
        book.transforms_this_step = records.len() as u32;
        if permanent {
            for record in &records {
                book.permanent.insert(record.position.key(), record.to.clone());
            }
        }
        book.history.extend(records);
        Ok(())
    }

    fn update_persistent_state(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        _step: &StepData,
    ) -> EngineResult<()> {
        let count = state
            .custom
            .transformation()
            .map(|book| book.transforms_this_step)
            .ok_or_else(|| state_mismatch(config, "transformation"))?;
        if count > 0 {
            log::trace!("{}: {} transformations this step", config.id, count);
        }
        Ok(())
    }

    fn on_complete(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<f64> {
        if let Some(book) = state.custom.transformation() {
            log::debug!(
                "{}: {} transformations, {} permanent",
                config.id,
                book.history.len(),
                book.permanent.len()
            );
        }
        Ok(0.0)
    }

    fn clone_box(&self) -> BoxedMechanism {
        Box::new(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpgradePath;
    use crate::engine::MechanismEngine;

    fn engine(paths: Vec<UpgradePath>, permanent: bool) -> MechanismEngine {
        let params = TransformationParams {
            upgrade_paths: paths,
            permanent_transforms: permanent,
        };
        let config = MechanismConfig::transformation(params, 3);
        let mut engine = MechanismEngine::new(config, Box::new(TransformationMechanism::new()));
        engine.initialize(None, None).unwrap();
        engine
    }

    fn path(from: &str, to: &str, condition: UpgradeCondition) -> UpgradePath {
        UpgradePath {
            from: from.into(),
            to: to.into(),
            condition,
        }
    }

    #[test]
    fn test_explicit_transformations_recorded() {
        let mut engine = engine(vec![path("L", "M", UpgradeCondition::Explicit)], false);
        let step = StepData::new(0)
            .with_matrix(vec![vec!["L", "L"]])
            .with_transformation(Position::new(0, 1), "L", "M");
        engine.process_step(&step).unwrap();

        let book = engine.state().custom.transformation().unwrap();
        // explicit paths never scan the board
        assert_eq!(book.history.len(), 1);
        assert!(!book.history[0].synthesized);
        assert!(book.permanent.is_empty());
    }

    #[test]
    fn test_step_based_paths_scan_matrix() {
        let mut engine = engine(vec![path("L", "M", UpgradeCondition::StepBased)], false);
        let step = StepData::new(0).with_matrix(vec![vec!["L", "A"], vec!["B", "L"]]);
        engine.process_step(&step).unwrap();

        let book = engine.state().custom.transformation().unwrap();
        assert_eq!(book.transforms_this_step, 2);
        assert!(book.history.iter().all(|r| r.synthesized && r.to == "M"));
        assert_eq!(book.history[1].position, Position::new(1, 1));
    }

    #[test]
    fn test_permanent_transforms_remembered() {
        let mut engine = engine(Vec::new(), true);
        engine
            .process_step(&StepData::new(0).with_transformation(Position::new(1, 2), "L", "M"))
            .unwrap();
        engine
            .process_step(&StepData::new(1).with_transformation(Position::new(1, 2), "M", "H"))
            .unwrap();

        let book = engine.state().custom.transformation().unwrap();
        assert_eq!(book.permanent_symbol(Position::new(1, 2)), Some("H"));
        assert_eq!(book.history.len(), 2);
        assert_eq!(book.transforms_this_step, 1);
    }

    #[test]
    fn test_wins_pay_with_multiplier() {
        let mut engine = engine(Vec::new(), false);
        let result = engine.process_step(&StepData::new(0).with_total_win(6.0)).unwrap();
        assert!((result.step_win - 6.0).abs() < 0.001);
    }
}
