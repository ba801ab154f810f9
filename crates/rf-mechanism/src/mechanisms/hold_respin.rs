//! Hold-respin mechanism
//!
//! Hold symbols lock in place, the rest of the board respins. The activation
//! starts with `initialRespins` and every hold landing on a new cell restores
//! that count. Nothing pays until the end: the total is the sum of locked
//! values times the multiplier, times the grand jackpot multiplier when the
//! whole board filled.

use serde::{Deserialize, Serialize};

use crate::config::{HoldRespinParams, MechanismConfig, MechanismParams, ResetKind};
use crate::engine::{BoxedMechanism, Mechanism};
use crate::error::EngineResult;
use crate::rules;
use crate::state::{CustomState, LockedValue, PersistentState};
use crate::step::{LandingEffect, StepData};

use super::{missing_params, state_mismatch};

/// Hold-respin bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRespinState {
    /// Every grid cell is locked
    pub board_filled: bool,
    /// Hold landings that locked a new cell this step
    pub new_locks_this_step: u32,
    /// The grand jackpot multiplier was applied on completion
    pub jackpot_awarded: bool,
}

/// Hold-respin mechanism
#[derive(Debug, Clone, Default)]
pub struct HoldRespinMechanism {
    params: Option<HoldRespinParams>,
}

impl HoldRespinMechanism {
    pub fn new() -> Self {
        Self::default()
    }

    fn params(&self, config: &MechanismConfig) -> EngineResult<&HoldRespinParams> {
        self.params.as_ref().ok_or_else(|| missing_params(config))
    }

    fn is_hold(params: &HoldRespinParams, symbol: &str, effect: Option<LandingEffect>) -> bool {
        symbol == params.hold_symbol || effect == Some(LandingEffect::Lock)
    }

    /// New hold locks drive the counter unless the config names another trigger
    fn locks_drive_reset(params: &HoldRespinParams, config: &MechanismConfig) -> bool {
        let reset = &config.reset_condition;
        match reset.kind {
            ResetKind::Never => true,
            ResetKind::SymbolLand => reset
                .symbol
                .as_deref()
                .is_none_or(|symbol| symbol == params.hold_symbol),
            ResetKind::WinOccurs | ResetKind::Custom => false,
        }
    }

    fn new_locks(state: &PersistentState) -> bool {
        state
            .custom
            .hold_respin()
            .is_some_and(|book| book.new_locks_this_step > 0)
    }
}

impl Mechanism for HoldRespinMechanism {
    fn name(&self) -> &str {
        "Hold and Respin"
    }

    fn description(&self) -> &str {
        "Lock symbols and respin to fill the grid"
    }

    fn on_initialize(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<()> {
        let MechanismParams::HoldRespin(params) = &config.params else {
            return Err(missing_params(config));
        };
        self.params = Some(params.clone());
        state.set_iterations(params.initial_respins.min(config.max_iterations));
        state.custom = CustomState::HoldRespin(HoldRespinState::default());
        Ok(())
    }

    fn consume_step_data(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()> {
        let params = self.params(config)?;
        let grid = config.grid_size();
        let mut new_locks = 0;

        for landing in &step.special_symbols {
            if !Self::is_hold(params, &landing.symbol, landing.effect) {
                continue;
            }
            if !grid.contains(landing.position) {
                log::warn!("{}: hold landing outside grid at {}", config.id, landing.position);
                continue;
            }
            let locked = LockedValue::new(landing.position, landing.value, Some(landing.symbol.clone()));
            if state.lock(locked) {
                new_locks += 1;
            }
        }

        for entry in &step.locked_positions {
            if grid.contains(entry.position) {
                state.lock(LockedValue::new(entry.position, entry.value, entry.symbol.clone()));
            }
        }

        let book = state
            .custom
            .hold_respin_mut()
            .ok_or_else(|| state_mismatch(config, "holdRespin"))?;
        book.new_locks_this_step = new_locks;
        Ok(())
    }

    fn update_persistent_state(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        _step: &StepData,
    ) -> EngineResult<()> {
        let grid = config.grid_size();
        state.collected_value = state.locked_value_sum();
        let filled = state.locked_count() >= grid.cells();

        let unlocked: Vec<_> = grid.positions().filter(|p| !state.is_locked(*p)).collect();
        state.active_positions = unlocked;

        let book = state
            .custom
            .hold_respin_mut()
            .ok_or_else(|| state_mismatch(config, "holdRespin"))?;
        if filled && !book.board_filled {
            log::debug!("{}: board filled", config.id);
        }
        book.board_filled = filled;
        Ok(())
    }

    fn evaluate_step_win(&self, _: &MechanismConfig, _: &PersistentState, _: &StepData) -> f64 {
        0.0
    }

    fn should_reset_iterations(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        let Some(params) = &self.params else {
            return false;
        };
        if Self::locks_drive_reset(params, config) {
            Self::new_locks(state)
        } else {
            Self::new_locks(state) || rules::reset_applies(config, step)
        }
    }

    fn reset_target(&self, config: &MechanismConfig, state: &PersistentState) -> u32 {
        match &self.params {
            Some(params) if Self::new_locks(state) => params.initial_respins,
            _ => config.reset_condition.reset_to,
        }
    }

    fn check_completion(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        let filled = state.custom.hold_respin().is_some_and(|book| book.board_filled);
        filled
            || state.iterations_remaining() == 0
            || rules::completion_reached(config, state, step)
    }

    fn on_complete(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<f64> {
        let jackpot = self.params(config)?.grand_jackpot_multiplier;
        let mut payout = state.collected_value * state.multiplier;

        let book = state
            .custom
            .hold_respin_mut()
            .ok_or_else(|| state_mismatch(config, "holdRespin"))?;
        if book.board_filled {
            payout *= jackpot;
            book.jackpot_awarded = true;
            log::info!("{}: grand jackpot x{}", config.id, jackpot);
        }
        Ok(payout)
    }

    fn clone_box(&self) -> BoxedMechanism {
        Box::new(Self::new())
    }
}
