//! Mechanism configuration
//!
//! A [`MechanismConfig`] declares identity, iteration bounds, the reset and
//! completion rules, the multiplier rule and named partial overrides. The
//! mechanic-specific part is a discriminated [`MechanismParams`] on the same
//! structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::step::ModifierKind;
use crate::types::{GridSize, MechanismKind};

// ═══════════════════════════════════════════════════════════════════════════════
// RULES
// ═══════════════════════════════════════════════════════════════════════════════

/// When the "iterations remaining" counter is restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResetKind {
    /// A special symbol landed (optionally a specific one)
    SymbolLand,
    /// The step produced any win
    WinOccurs,
    /// Never reset
    Never,
    /// Mechanic decides
    Custom,
}

/// Reset rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetCondition {
    pub kind: ResetKind,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub reset_to: u32,
}

impl ResetCondition {
    pub fn never() -> Self {
        Self {
            kind: ResetKind::Never,
            symbol: None,
            reset_to: 0,
        }
    }

    pub fn on_symbol(symbol: impl Into<String>, reset_to: u32) -> Self {
        Self {
            kind: ResetKind::SymbolLand,
            symbol: Some(symbol.into()),
            reset_to,
        }
    }

    pub fn on_win(reset_to: u32) -> Self {
        Self {
            kind: ResetKind::WinOccurs,
            symbol: None,
            reset_to,
        }
    }
}

impl Default for ResetCondition {
    fn default() -> Self {
        Self::never()
    }
}

/// When the active sequence ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionKind {
    IterationsExhausted,
    BoardFilled,
    NoNewLocks,
    FixedCount,
    CollectionComplete,
    NoModifiers,
    Custom,
}

/// Completion rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionCondition {
    pub kind: CompletionKind,
    /// Fraction of the grid that counts as filled (default 1.0)
    #[serde(default)]
    pub fill_threshold: Option<f64>,
    /// Collected value that completes a collection (default: never)
    #[serde(default)]
    pub target_value: Option<f64>,
    /// Step count for `fixedCount` (default: `maxIterations`)
    #[serde(default)]
    pub count: Option<u32>,
}

impl CompletionCondition {
    pub fn new(kind: CompletionKind) -> Self {
        Self {
            kind,
            fill_threshold: None,
            target_value: None,
            count: None,
        }
    }

    pub fn fixed_count(count: u32) -> Self {
        Self {
            count: Some(count),
            ..Self::new(CompletionKind::FixedCount)
        }
    }

    pub fn board_filled(fill_threshold: f64) -> Self {
        Self {
            fill_threshold: Some(fill_threshold),
            ..Self::new(CompletionKind::BoardFilled)
        }
    }

    pub fn collection_target(target_value: f64) -> Self {
        Self {
            target_value: Some(target_value),
            ..Self::new(CompletionKind::CollectionComplete)
        }
    }
}

impl Default for CompletionCondition {
    fn default() -> Self {
        Self::new(CompletionKind::IterationsExhausted)
    }
}

/// How the multiplier evolves step over step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressionKind {
    PerStep,
    PerWin,
    PerLock,
    Fixed,
}

/// Multiplier progression rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierProgression {
    pub kind: ProgressionKind,
    pub increment: f64,
    pub max: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MECHANIC PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// A value with a relative weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: u32,
}

/// Hold-respin parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRespinParams {
    pub hold_symbol: String,
    #[serde(default = "default_respins")]
    pub initial_respins: u32,
    #[serde(default = "one")]
    pub grand_jackpot_multiplier: f64,
    /// Value table the round source draws hold-symbol values from
    #[serde(default)]
    pub symbol_values: Vec<WeightedValue>,
}

impl HoldRespinParams {
    pub fn new(hold_symbol: impl Into<String>) -> Self {
        Self {
            hold_symbol: hold_symbol.into(),
            initial_respins: default_respins(),
            grand_jackpot_multiplier: 1.0,
            symbol_values: Vec::new(),
        }
    }

    /// Weighted mean of the value table (0 when empty)
    pub fn expected_symbol_value(&self) -> f64 {
        let total: u64 = self.symbol_values.iter().map(|v| v.weight as u64).sum();
        if total == 0 {
            return 0.0;
        }
        self.symbol_values
            .iter()
            .map(|v| v.value * v.weight as f64)
            .sum::<f64>()
            / total as f64
    }
}

/// What a lock-sequence trigger locks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockMode {
    /// The whole column under the trigger
    Reel,
    /// Only the trigger's cell
    #[default]
    Position,
}

/// Lock-sequence parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSequenceParams {
    pub trigger_symbol: String,
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default = "yes")]
    pub persist_locked: bool,
}

/// Per-spin override inside a multi-spin sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerSpinRule {
    /// Symbols whose positions persist into later spins
    #[serde(default)]
    pub persistent_symbols: Vec<String>,
    /// Absolute multiplier for this spin
    #[serde(default)]
    pub multiplier_override: Option<f64>,
    /// Reel set the renderer should switch to
    #[serde(default)]
    pub reel_config_override: Option<String>,
}

/// Multi-spin parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSpinParams {
    pub spin_count: u32,
    #[serde(default)]
    pub per_spin_rules: Vec<PerSpinRule>,
}

/// Collection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionParams {
    pub collect_symbol: String,
    #[serde(default)]
    pub collector_symbol: Option<String>,
    #[serde(default)]
    pub auto_consume_on_end: bool,
    #[serde(default)]
    pub consume_threshold: Option<f64>,
}

/// A modifier kind with a relative weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedModifier {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ModifierKind,
    pub weight: u32,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Modifier parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierParams {
    /// Pool the round source draws modifiers from
    #[serde(default)]
    pub modifier_pool: Vec<WeightedModifier>,
    /// Modifiers applied per step (0 = unlimited)
    #[serde(default)]
    pub max_modifiers_per_step: u32,
}

/// When an upgrade path fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeCondition {
    /// Only when the step declares the transformation
    #[default]
    Explicit,
    /// Every step, wherever `from` appears on the board
    StepBased,
}

/// One symbol upgrade path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePath {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub condition: UpgradeCondition,
}

/// Transformation parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationParams {
    #[serde(default)]
    pub upgrade_paths: Vec<UpgradePath>,
    #[serde(default)]
    pub permanent_transforms: bool,
}

/// Mechanic-specific parameters, discriminated by mechanic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MechanismParams {
    #[default]
    None,
    HoldRespin(HoldRespinParams),
    LockSequence(LockSequenceParams),
    MultiSpin(MultiSpinParams),
    Collection(CollectionParams),
    Modifier(ModifierParams),
    Transformation(TransformationParams),
}

impl MechanismParams {
    /// The mechanism kind these parameters belong to
    pub fn kind(&self) -> Option<MechanismKind> {
        match self {
            Self::None => None,
            Self::HoldRespin(_) => Some(MechanismKind::HoldRespin),
            Self::LockSequence(_) => Some(MechanismKind::LockSequence),
            Self::MultiSpin(_) => Some(MechanismKind::MultiSpin),
            Self::Collection(_) => Some(MechanismKind::Collection),
            Self::Modifier(_) => Some(MechanismKind::Modifier),
            Self::Transformation(_) => Some(MechanismKind::Transformation),
        }
    }
}

fn default_respins() -> u32 {
    3
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn default_max_iterations() -> u32 {
    100
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable-per-activation mechanism configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanismConfig {
    pub id: MechanismKind,

    /// Hard ceiling on steps and on the iteration counter
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_respins")]
    pub initial_iterations: u32,

    #[serde(default)]
    pub reset_condition: ResetCondition,

    #[serde(default)]
    pub completion_condition: CompletionCondition,

    /// Grid active only while this mechanism runs
    #[serde(default)]
    pub grid_override: Option<GridSize>,

    #[serde(default = "one")]
    pub base_multiplier: f64,

    #[serde(default)]
    pub multiplier_progression: Option<MultiplierProgression>,

    #[serde(default)]
    pub speed_variants: BTreeMap<String, ConfigOverride>,

    #[serde(default)]
    pub mode_overrides: BTreeMap<String, ConfigOverride>,

    #[serde(default)]
    pub params: MechanismParams,
}

impl MechanismConfig {
    /// Bare config for a mechanism kind with engine defaults
    pub fn new(id: impl Into<MechanismKind>) -> Self {
        Self {
            id: id.into(),
            max_iterations: default_max_iterations(),
            initial_iterations: default_respins(),
            reset_condition: ResetCondition::never(),
            completion_condition: CompletionCondition::default(),
            grid_override: None,
            base_multiplier: 1.0,
            multiplier_progression: None,
            speed_variants: BTreeMap::new(),
            mode_overrides: BTreeMap::new(),
            params: MechanismParams::None,
        }
    }

    // ─── Presets ───────────────────────────────────────────────────────────────

    /// Hold-respin: reset to `initial_respins` on every hold landing
    pub fn hold_respin(params: HoldRespinParams) -> Self {
        let respins = params.initial_respins;
        Self {
            initial_iterations: respins,
            reset_condition: ResetCondition::on_symbol(params.hold_symbol.clone(), respins),
            params: MechanismParams::HoldRespin(params),
            ..Self::new(MechanismKind::HoldRespin)
        }
    }

    /// Lock-sequence: reset on trigger landings, end when nothing new locks
    pub fn lock_sequence(params: LockSequenceParams, initial_iterations: u32) -> Self {
        Self {
            initial_iterations,
            reset_condition: ResetCondition::on_symbol(
                params.trigger_symbol.clone(),
                initial_iterations,
            ),
            completion_condition: CompletionCondition::new(CompletionKind::NoNewLocks),
            params: MechanismParams::LockSequence(params),
            ..Self::new(MechanismKind::LockSequence)
        }
    }

    /// Multi-spin: exactly `spin_count` steps
    pub fn multi_spin(params: MultiSpinParams) -> Self {
        let count = params.spin_count;
        Self {
            initial_iterations: count,
            completion_condition: CompletionCondition::fixed_count(count),
            params: MechanismParams::MultiSpin(params),
            ..Self::new(MechanismKind::MultiSpin)
        }
    }

    /// Collection over a fixed number of iterations
    pub fn collection(params: CollectionParams, initial_iterations: u32) -> Self {
        Self {
            initial_iterations,
            params: MechanismParams::Collection(params),
            ..Self::new(MechanismKind::Collection)
        }
    }

    /// Modifier: run until a step brings no modifiers and iterations are gone
    pub fn modifier(params: ModifierParams, initial_iterations: u32) -> Self {
        Self {
            initial_iterations,
            completion_condition: CompletionCondition::new(CompletionKind::NoModifiers),
            params: MechanismParams::Modifier(params),
            ..Self::new(MechanismKind::Modifier)
        }
    }

    /// Transformation over a fixed number of iterations
    pub fn transformation(params: TransformationParams, initial_iterations: u32) -> Self {
        Self {
            initial_iterations,
            params: MechanismParams::Transformation(params),
            ..Self::new(MechanismKind::Transformation)
        }
    }

    // ─── Builders ──────────────────────────────────────────────────────────────

    pub fn with_grid(mut self, rows: usize, cols: usize) -> Self {
        self.grid_override = Some(GridSize::new(rows, cols));
        self
    }

    pub fn with_progression(mut self, kind: ProgressionKind, increment: f64, max: f64) -> Self {
        self.multiplier_progression = Some(MultiplierProgression {
            kind,
            increment,
            max,
        });
        self
    }

    pub fn with_reset(mut self, reset: ResetCondition) -> Self {
        self.reset_condition = reset;
        self
    }

    pub fn with_completion(mut self, completion: CompletionCondition) -> Self {
        self.completion_condition = completion;
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_initial_iterations(mut self, initial: u32) -> Self {
        self.initial_iterations = initial;
        self
    }

    pub fn with_base_multiplier(mut self, multiplier: f64) -> Self {
        self.base_multiplier = multiplier;
        self
    }

    pub fn with_mode_override(mut self, mode: impl Into<String>, ov: ConfigOverride) -> Self {
        self.mode_overrides.insert(mode.into(), ov);
        self
    }

    pub fn with_speed_variant(mut self, speed: impl Into<String>, ov: ConfigOverride) -> Self {
        self.speed_variants.insert(speed.into(), ov);
        self
    }

    // ─── Queries ───────────────────────────────────────────────────────────────

    /// Grid in effect: the override, or the default 3×5
    pub fn grid_size(&self) -> GridSize {
        self.grid_override.unwrap_or_default()
    }

    /// Base config with the named mode override and speed variant merged on
    ///
    /// Mode is applied first, so a speed variant wins on fields both touch.
    /// Unknown names are ignored.
    pub fn resolve(&self, mode: Option<&str>, speed: Option<&str>) -> MechanismConfig {
        let mut resolved = self.clone();
        if let Some(ov) = mode.and_then(|m| self.mode_overrides.get(m)) {
            log::trace!("{}: applying mode override {:?}", self.id, mode);
            ov.apply_to(&mut resolved);
        }
        if let Some(ov) = speed.and_then(|s| self.speed_variants.get(s)) {
            log::trace!("{}: applying speed variant {:?}", self.id, speed);
            ov.apply_to(&mut resolved);
        }
        resolved
    }

    // ─── Loading ───────────────────────────────────────────────────────────────

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yml::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Check bounds and parameter consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(format!(
                "{}: maxIterations must be at least 1",
                self.id
            )));
        }
        if self.initial_iterations > self.max_iterations {
            return Err(ConfigError::InvalidValue(format!(
                "{}: initialIterations {} > maxIterations {}",
                self.id, self.initial_iterations, self.max_iterations
            )));
        }
        if let Some(threshold) = self.completion_condition.fill_threshold {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(ConfigError::InvalidValue(format!(
                    "{}: fillThreshold {threshold} outside (0, 1]",
                    self.id
                )));
            }
        }
        if let Some(grid) = self.grid_override {
            if grid.cells() == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{}: grid override {}x{} has no cells",
                    self.id, grid.rows, grid.cols
                )));
            }
        }
        if let Some(progression) = &self.multiplier_progression {
            if progression.max < self.base_multiplier {
                return Err(ConfigError::InvalidValue(format!(
                    "{}: multiplier max {} below base {}",
                    self.id, progression.max, self.base_multiplier
                )));
            }
        }

        match (&self.id, self.params.kind()) {
            (MechanismKind::Custom(_), _) => {}
            (id, None) => return Err(ConfigError::MissingParams(id.to_string())),
            (id, Some(kind)) if *id != kind => {
                return Err(ConfigError::InvalidValue(format!(
                    "{id}: parameters belong to {kind}"
                )));
            }
            _ => {}
        }

        if let MechanismParams::MultiSpin(params) = &self.params {
            if params.spin_count == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{}: spinCount must be at least 1",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OVERRIDES
// ═══════════════════════════════════════════════════════════════════════════════

/// Partial config merged field by field over a base config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_condition: Option<ResetCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_condition: Option<CompletionCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_override: Option<GridSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier_progression: Option<MultiplierProgression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<MechanismParams>,
}

impl ConfigOverride {
    /// Shallow merge: every field set here replaces the target's field
    pub fn apply_to(&self, config: &mut MechanismConfig) {
        if let Some(v) = self.max_iterations {
            config.max_iterations = v;
        }
        if let Some(v) = self.initial_iterations {
            config.initial_iterations = v;
        }
        if let Some(v) = &self.reset_condition {
            config.reset_condition = v.clone();
        }
        if let Some(v) = &self.completion_condition {
            config.completion_condition = v.clone();
        }
        if let Some(v) = self.grid_override {
            config.grid_override = Some(v);
        }
        if let Some(v) = self.base_multiplier {
            config.base_multiplier = v;
        }
        if let Some(v) = &self.multiplier_progression {
            config.multiplier_progression = Some(v.clone());
        }
        if let Some(v) = &self.params {
            config.params = v.clone();
        }
    }

    /// Is this override empty?
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold() -> MechanismConfig {
        MechanismConfig::hold_respin(HoldRespinParams::new("H")).with_grid(3, 5)
    }

    #[test]
    fn test_hold_respin_preset() {
        let config = hold();
        assert_eq!(config.id, MechanismKind::HoldRespin);
        assert_eq!(config.initial_iterations, 3);
        assert_eq!(config.reset_condition.kind, ResetKind::SymbolLand);
        assert_eq!(config.reset_condition.symbol.as_deref(), Some("H"));
        assert_eq!(config.reset_condition.reset_to, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_mode_then_speed() {
        let config = hold()
            .with_mode_override(
                "bonusBuy",
                ConfigOverride {
                    initial_iterations: Some(5),
                    base_multiplier: Some(2.0),
                    ..Default::default()
                },
            )
            .with_speed_variant(
                "turbo",
                ConfigOverride {
                    base_multiplier: Some(3.0),
                    ..Default::default()
                },
            );

        let resolved = config.resolve(Some("bonusBuy"), Some("turbo"));
        assert_eq!(resolved.initial_iterations, 5);
        assert!((resolved.base_multiplier - 3.0).abs() < 0.001);

        let plain = config.resolve(Some("unknown"), None);
        assert_eq!(plain.initial_iterations, 3);
        assert!((plain.base_multiplier - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let config = hold().with_initial_iterations(200);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let config = hold().with_completion(CompletionCondition::board_filled(1.5));
        assert!(config.validate().is_err());

        let config = hold().with_progression(ProgressionKind::PerStep, 1.0, 0.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_params_match_id() {
        let mut config = hold();
        config.params = MechanismParams::None;
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingParams("holdRespin".to_string()))
        );

        config.params = MechanismParams::Collection(CollectionParams {
            collect_symbol: "C".into(),
            collector_symbol: None,
            auto_consume_on_end: true,
            consume_threshold: None,
        });
        assert!(config.validate().is_err());

        let custom = MechanismConfig::new("myLoop");
        assert!(custom.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "id": "holdRespin",
            "initialIterations": 3,
            "resetCondition": {"kind": "symbolLand", "symbol": "H", "resetTo": 3},
            "completionCondition": {"kind": "boardFilled", "fillThreshold": 1.0},
            "gridOverride": {"rows": 3, "cols": 5},
            "multiplierProgression": {"kind": "perLock", "increment": 1, "max": 10},
            "params": {"holdRespin": {"holdSymbol": "H", "grandJackpotMultiplier": 10,
                "symbolValues": [{"value": 1, "weight": 3}, {"value": 5, "weight": 1}]}}
        }"#;
        let config = MechanismConfig::from_json(json).unwrap();

        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.grid_size().cells(), 15);
        match &config.params {
            MechanismParams::HoldRespin(p) => {
                assert_eq!(p.initial_respins, 3);
                assert!((p.grand_jackpot_multiplier - 10.0).abs() < 0.001);
                assert!((p.expected_symbol_value() - 2.0).abs() < 0.001);
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
id: multiSpin
initialIterations: 2
completionCondition:
  kind: fixedCount
  count: 2
params:
  multiSpin:
    spinCount: 2
    perSpinRules:
      - multiplierOverride: 2
      - multiplierOverride: 5
        persistentSymbols: [W]
"#;
        let config = MechanismConfig::from_yaml(yaml).unwrap();
        match &config.params {
            MechanismParams::MultiSpin(p) => {
                assert_eq!(p.per_spin_rules.len(), 2);
                assert_eq!(p.per_spin_rules[1].persistent_symbols, vec!["W".to_string()]);
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            MechanismConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            MechanismConfig::from_yaml("id: [unclosed"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_override_is_empty() {
        assert!(ConfigOverride::default().is_empty());
        let ov = ConfigOverride {
            max_iterations: Some(4),
            ..Default::default()
        };
        assert!(!ov.is_empty());
    }
}
