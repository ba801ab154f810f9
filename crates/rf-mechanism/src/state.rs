//! Persistent state carried across the steps of one activation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MechanismConfig;
use crate::mechanisms::{
    CollectionState, HoldRespinState, LockSequenceState, ModifierState, MultiSpinState,
    TransformationState,
};
use crate::types::Position;

/// A locked grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedValue {
    pub position: Position,
    pub value: f64,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub multiplier: Option<f64>,
}

impl LockedValue {
    pub fn new(position: Position, value: f64, symbol: Option<String>) -> Self {
        Self {
            position,
            value,
            symbol,
            multiplier: None,
        }
    }

    /// Value with the cell's own multiplier applied
    pub fn effective_value(&self) -> f64 {
        self.value * self.multiplier.unwrap_or(1.0)
    }
}

/// Mechanic-owned bookkeeping, one variant per mechanic
///
/// The engine never reads this; each mechanism installs its own variant in
/// `on_initialize` and reaches it through the typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomState {
    #[default]
    Empty,
    HoldRespin(HoldRespinState),
    LockSequence(LockSequenceState),
    MultiSpin(MultiSpinState),
    Collection(CollectionState),
    Modifier(ModifierState),
    Transformation(TransformationState),
    /// Untyped fields for runtime-registered mechanisms
    Extension(serde_json::Map<String, serde_json::Value>),
}

macro_rules! custom_accessors {
    ($($variant:ident => $ty:ty, $get:ident, $get_mut:ident;)*) => {
        impl CustomState {
            $(
                pub fn $get(&self) -> Option<&$ty> {
                    match self {
                        Self::$variant(s) => Some(s),
                        _ => None,
                    }
                }

                pub fn $get_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Self::$variant(s) => Some(s),
                        _ => None,
                    }
                }
            )*
        }
    };
}

custom_accessors! {
    HoldRespin => HoldRespinState, hold_respin, hold_respin_mut;
    LockSequence => LockSequenceState, lock_sequence, lock_sequence_mut;
    MultiSpin => MultiSpinState, multi_spin, multi_spin_mut;
    Collection => CollectionState, collection, collection_mut;
    Modifier => ModifierState, modifier, modifier_mut;
    Transformation => TransformationState, transformation, transformation_mut;
    Extension => serde_json::Map<String, serde_json::Value>, extension, extension_mut;
}

/// Mutable record for one activation
///
/// Counters, the accumulated win and the locked-position map are only
/// writable from inside the crate: the engine owns them, mechanisms add locks
/// through [`PersistentState::lock`], which never replaces or removes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentState {
    is_active: bool,
    current_step: u32,
    total_steps: u32,
    iterations_remaining: u32,
    total_win: f64,
    locked_positions: BTreeMap<String, LockedValue>,

    /// Aggregated value (sum of locks, collected symbols, ...)
    pub collected_value: f64,
    /// Current win multiplier
    pub multiplier: f64,
    /// Positions not yet locked
    pub active_positions: Vec<Position>,
    /// Mechanic-specific bookkeeping
    pub custom: CustomState,
}

impl PersistentState {
    /// Fresh, active state for a resolved config
    pub fn new(config: &MechanismConfig) -> Self {
        Self {
            is_active: true,
            current_step: 0,
            total_steps: 0,
            iterations_remaining: config.initial_iterations.min(config.max_iterations),
            total_win: 0.0,
            locked_positions: BTreeMap::new(),
            collected_value: 0.0,
            multiplier: config.base_multiplier,
            active_positions: config.grid_size().positions().collect(),
            custom: CustomState::Empty,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn iterations_remaining(&self) -> u32 {
        self.iterations_remaining
    }

    pub fn total_win(&self) -> f64 {
        self.total_win
    }

    /// Locked positions keyed by `"row,col"`
    pub fn locked_positions(&self) -> &BTreeMap<String, LockedValue> {
        &self.locked_positions
    }

    pub fn locked_count(&self) -> usize {
        self.locked_positions.len()
    }

    pub fn is_locked(&self, pos: Position) -> bool {
        self.locked_positions.contains_key(&pos.key())
    }

    /// Lock a position; returns `false` if it was already locked
    pub fn lock(&mut self, locked: LockedValue) -> bool {
        let key = locked.position.key();
        if self.locked_positions.contains_key(&key) {
            return false;
        }
        self.locked_positions.insert(key, locked);
        true
    }

    /// Sum of every lock's effective value
    pub fn locked_value_sum(&self) -> f64 {
        self.locked_positions
            .values()
            .map(LockedValue::effective_value)
            .sum()
    }

    pub(crate) fn begin_step(&mut self, step_index: u32) {
        self.current_step = step_index;
        self.total_steps += 1;
    }

    pub(crate) fn add_win(&mut self, win: f64) {
        if win > 0.0 {
            self.total_win += win;
        }
    }

    pub(crate) fn set_iterations(&mut self, iterations: u32) {
        self.iterations_remaining = iterations;
    }

    pub(crate) fn deactivate(&mut self) {
        self.is_active = false;
    }
}

impl Default for PersistentState {
    /// Uninitialized, inactive state
    fn default() -> Self {
        Self {
            is_active: false,
            current_step: 0,
            total_steps: 0,
            iterations_remaining: 0,
            total_win: 0.0,
            locked_positions: BTreeMap::new(),
            collected_value: 0.0,
            multiplier: 1.0,
            active_positions: Vec::new(),
            custom: CustomState::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MechanismConfig;

    #[test]
    fn test_new_state_from_config() {
        let config = MechanismConfig::new("custom")
            .with_initial_iterations(4)
            .with_base_multiplier(2.0)
            .with_grid(2, 2);
        let state = PersistentState::new(&config);

        assert!(state.is_active());
        assert_eq!(state.iterations_remaining(), 4);
        assert!((state.multiplier - 2.0).abs() < 0.001);
        assert_eq!(state.active_positions.len(), 4);
        assert_eq!(state.custom, CustomState::Empty);
    }

    #[test]
    fn test_lock_is_unique_by_position() {
        let mut state = PersistentState::default();
        let pos = Position::new(1, 2);

        assert!(state.lock(LockedValue::new(pos, 5.0, Some("H".into()))));
        assert!(!state.lock(LockedValue::new(pos, 50.0, Some("H".into()))));

        assert_eq!(state.locked_count(), 1);
        assert!(state.is_locked(pos));
        assert!((state.locked_positions()["1,2"].value - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_locked_value_sum_uses_cell_multiplier() {
        let mut state = PersistentState::default();
        state.lock(LockedValue::new(Position::new(0, 0), 5.0, None));
        state.lock(LockedValue {
            multiplier: Some(3.0),
            ..LockedValue::new(Position::new(0, 1), 2.0, None)
        });

        assert!((state.locked_value_sum() - 11.0).abs() < 0.001);
    }

    #[test]
    fn test_add_win_ignores_negative() {
        let mut state = PersistentState::default();
        state.add_win(10.0);
        state.add_win(-4.0);
        assert!((state.total_win() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_custom_accessors() {
        let mut custom = CustomState::HoldRespin(HoldRespinState::default());
        assert!(custom.hold_respin().is_some());
        assert!(custom.collection().is_none());

        if let Some(hold) = custom.hold_respin_mut() {
            hold.board_filled = true;
        }
        assert!(custom.hold_respin().map(|h| h.board_filled).unwrap_or(false));
    }
}
