//! Mechanism engine — the lifecycle driver shared by every mechanic
//!
//! The engine runs the same transition for every step and calls into a
//! [`Mechanism`] for the mechanic-specific parts.
//!
//! ```text
//! initialize ─► Active ─► process_step ─┬─► Active (continue / extend)
//!                                        └─► Complete ─► MechanismResult
//!          cancel ─► Cancelled
//! ```
//!
//! Per step, in fixed order:
//!
//! 1. record the step index
//! 2. `consume_step_data`
//! 3. `update_persistent_state`
//! 4. `evaluate_step_win`
//! 5. add the step win to the total
//! 6. reset or decrement the iteration counter
//! 7. update the multiplier
//! 8. check completion, finalizing if reached

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::MechanismConfig;
use crate::error::{EngineResult, MechanismError};
use crate::events::{MechanismEvent, NullSink, SharedSink};
use crate::rules;
use crate::state::PersistentState;
use crate::step::{StepData, WinInfo};
use crate::types::{GridSize, MechanismKind};

// ═══════════════════════════════════════════════════════════════════════════════
// EXTENSION POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Mechanic-specific behavior plugged into a [`MechanismEngine`]
///
/// Required hooks receive the resolved config and the activation's state. A
/// hook error is never caught: it aborts the transition and reaches the caller
/// of `process_step` / `complete`.
///
/// Optional hooks default to the functions in [`crate::rules`].
pub trait Mechanism: Send + Sync {
    /// Human-readable name
    fn name(&self) -> &str;

    /// Short description for tooling
    fn description(&self) -> &str {
        ""
    }

    // ─── Required ──────────────────────────────────────────────────────────────

    /// Prepare a fresh activation (install custom state, read params)
    fn on_initialize(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<()>;

    /// Interpret the step's landings, locks, modifiers or transformations
    fn consume_step_data(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()>;

    /// Derive aggregate fields from what `consume_step_data` changed
    fn update_persistent_state(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) -> EngineResult<()>;

    /// Finalize; returns a deferred payout added to the total win
    fn on_complete(
        &mut self,
        config: &MechanismConfig,
        state: &mut PersistentState,
    ) -> EngineResult<f64>;

    /// Fresh instance with no shared mutable state
    fn clone_box(&self) -> BoxedMechanism;

    // ─── Optional ──────────────────────────────────────────────────────────────

    fn should_reset_iterations(
        &self,
        config: &MechanismConfig,
        _state: &PersistentState,
        step: &StepData,
    ) -> bool {
        rules::reset_applies(config, step)
    }

    /// Counter value restored when `should_reset_iterations` holds
    fn reset_target(&self, config: &MechanismConfig, _state: &PersistentState) -> u32 {
        config.reset_condition.reset_to
    }

    fn check_completion(
        &self,
        config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> bool {
        rules::completion_reached(config, state, step)
    }

    /// Signal an iteration granted outside the normal counter
    fn should_extend(
        &self,
        _config: &MechanismConfig,
        _state: &PersistentState,
        _step: &StepData,
    ) -> bool {
        false
    }

    fn update_multiplier(
        &self,
        config: &MechanismConfig,
        state: &mut PersistentState,
        step: &StepData,
    ) {
        rules::progress_multiplier(config, state, step);
    }

    fn evaluate_step_win(
        &self,
        _config: &MechanismConfig,
        state: &PersistentState,
        step: &StepData,
    ) -> f64 {
        rules::multiplied_step_win(state, step)
    }
}

/// Boxed mechanism for dynamic dispatch
pub type BoxedMechanism = Box<dyn Mechanism + 'static>;

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// What the caller should do after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NextAction {
    Continue,
    Complete,
    /// An extra iteration was granted outside the counter
    Extend,
}

/// Outcome of one `process_step`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanismStepResult {
    pub step_index: u32,
    pub wins: Vec<WinInfo>,
    pub step_win: f64,
    pub cumulative_win: f64,
    pub state_snapshot: PersistentState,
    pub is_complete: bool,
    pub next_action: NextAction,
}

/// Aggregate outcome of a completed activation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanismResult {
    pub mechanism_id: String,
    pub total_win: f64,
    pub total_steps: u32,
    pub step_results: Vec<MechanismStepResult>,
    pub final_state: PersistentState,
}

/// Engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnginePhase {
    #[default]
    Uninitialized,
    Active,
    Complete,
    Cancelled,
}

/// Mechanism information for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanismInfo {
    pub id: MechanismKind,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub current_step: u32,
    pub iterations_remaining: u32,
}

/// Serializable engine state for session persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanismSnapshot {
    pub mechanism_id: MechanismKind,
    pub base_config: MechanismConfig,
    pub config: MechanismConfig,
    pub phase: EnginePhase,
    pub state: PersistentState,
    pub step_results: Vec<MechanismStepResult>,
    #[serde(default)]
    pub result: Option<MechanismResult>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Drives one mechanism through its activation
pub struct MechanismEngine {
    base_config: MechanismConfig,
    config: MechanismConfig,
    mechanism: BoxedMechanism,
    state: PersistentState,
    phase: EnginePhase,
    step_results: Vec<MechanismStepResult>,
    result: Option<MechanismResult>,
    sink: SharedSink,
    mode: Option<String>,
    speed: Option<String>,
}

impl MechanismEngine {
    /// Create an uninitialized engine
    pub fn new(config: MechanismConfig, mechanism: BoxedMechanism) -> Self {
        Self {
            config: config.clone(),
            base_config: config,
            mechanism,
            state: PersistentState::default(),
            phase: EnginePhase::Uninitialized,
            step_results: Vec::new(),
            result: None,
            sink: Arc::new(NullSink),
            mode: None,
            speed: None,
        }
    }

    /// Builder: publish lifecycle events to `sink`
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Rebuild an engine from a snapshot
    ///
    /// The mechanism is initialized against the snapshot's resolved config so
    /// it can read its parameters, then the stored state is reinstated.
    pub fn from_snapshot(
        snapshot: MechanismSnapshot,
        mut mechanism: BoxedMechanism,
        sink: SharedSink,
    ) -> EngineResult<Self> {
        let mut scratch = PersistentState::new(&snapshot.config);
        mechanism.on_initialize(&snapshot.config, &mut scratch)?;

        Ok(Self {
            base_config: snapshot.base_config,
            config: snapshot.config,
            mechanism,
            state: snapshot.state,
            phase: snapshot.phase,
            step_results: snapshot.step_results,
            result: snapshot.result,
            sink,
            mode: snapshot.mode,
            speed: snapshot.speed,
        })
    }

    // ─── Lifecycle ─────────────────────────────────────────────────────────────

    /// Start a clean activation
    ///
    /// Resolves the config for `mode` / `speed`, discards any previous state
    /// and calls the mechanism's `on_initialize`.
    pub fn initialize(&mut self, mode: Option<&str>, speed: Option<&str>) -> EngineResult<()> {
        self.config = self.base_config.resolve(mode, speed);
        self.state = PersistentState::new(&self.config);
        self.step_results.clear();
        self.result = None;
        self.mode = mode.map(str::to_string);
        self.speed = speed.map(str::to_string);

        self.mechanism.on_initialize(&self.config, &mut self.state)?;
        self.phase = EnginePhase::Active;

        log::info!(
            "{}: initialized ({} iterations, {}x)",
            self.config.id,
            self.state.iterations_remaining(),
            self.state.multiplier
        );
        self.emit(MechanismEvent::Start {
            mechanism_id: self.id_string(),
            iterations: self.state.iterations_remaining(),
            multiplier: self.state.multiplier,
            mode: self.mode.clone(),
            speed: self.speed.clone(),
        });
        Ok(())
    }

    /// Run one step transition
    pub fn process_step(&mut self, step: &StepData) -> EngineResult<MechanismStepResult> {
        if self.phase != EnginePhase::Active || !self.state.is_active() {
            return Err(MechanismError::Inactive {
                mechanism_id: self.id_string(),
            });
        }

        self.emit(MechanismEvent::StepStart {
            mechanism_id: self.id_string(),
            step_index: step.step_index,
            iterations_remaining: self.state.iterations_remaining(),
        });

        self.state.begin_step(step.step_index);
        self.mechanism
            .consume_step_data(&self.config, &mut self.state, step)?;
        self.mechanism
            .update_persistent_state(&self.config, &mut self.state, step)?;

        let step_win = self
            .mechanism
            .evaluate_step_win(&self.config, &self.state, step)
            .max(0.0);
        self.state.add_win(step_win);

        let reset = self
            .mechanism
            .should_reset_iterations(&self.config, &self.state, step);
        let reset_to = reset.then(|| self.mechanism.reset_target(&self.config, &self.state));
        let iterations =
            rules::next_iterations(&self.config, self.state.iterations_remaining(), reset_to);
        self.state.set_iterations(iterations);

        self.mechanism
            .update_multiplier(&self.config, &mut self.state, step);
        rules::clamp_multiplier(&self.config, &mut self.state);

        let extend = self
            .mechanism
            .should_extend(&self.config, &self.state, step);
        let ceiling = self.state.total_steps() >= self.config.max_iterations;
        let done = ceiling
            || self
                .mechanism
                .check_completion(&self.config, &self.state, step);

        log::debug!(
            "{}: step {} win={} total={} iterations={} reset={} done={}",
            self.config.id,
            step.step_index,
            step_win,
            self.state.total_win(),
            iterations,
            reset,
            done
        );
        if ceiling {
            log::debug!(
                "{}: step ceiling {} reached",
                self.config.id,
                self.config.max_iterations
            );
        }

        if done {
            self.finalize()?;
        }

        let next_action = if done {
            NextAction::Complete
        } else if extend {
            NextAction::Extend
        } else {
            NextAction::Continue
        };
        let step_result = MechanismStepResult {
            step_index: step.step_index,
            wins: step.wins.clone(),
            step_win,
            cumulative_win: self.state.total_win(),
            state_snapshot: self.state.clone(),
            is_complete: done,
            next_action,
        };
        self.step_results.push(step_result.clone());

        self.emit(MechanismEvent::StepComplete {
            mechanism_id: self.id_string(),
            step_index: step.step_index,
            step_win,
            cumulative_win: self.state.total_win(),
            iterations_remaining: self.state.iterations_remaining(),
            multiplier: self.state.multiplier,
            is_complete: done,
        });

        if done {
            self.publish_result();
        }
        Ok(step_result)
    }

    /// End the activation and return its result
    ///
    /// Only the first call finalizes; later calls return the same result. An
    /// activation that never started or was cancelled has no result.
    pub fn complete(&mut self) -> EngineResult<MechanismResult> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }
        if self.phase != EnginePhase::Active {
            return Err(MechanismError::Inactive {
                mechanism_id: self.id_string(),
            });
        }
        self.finalize()?;
        Ok(self.publish_result())
    }

    /// Abort without finalizing
    pub fn cancel(&mut self) {
        if self.phase != EnginePhase::Active {
            return;
        }
        self.state.deactivate();
        self.phase = EnginePhase::Cancelled;

        log::info!(
            "{}: cancelled at step {}",
            self.config.id,
            self.state.current_step()
        );
        self.emit(MechanismEvent::Cancel {
            mechanism_id: self.id_string(),
            current_step: self.state.current_step(),
            total_win: self.state.total_win(),
        });
    }

    /// Fresh, uninitialized engine with the same base config and sink
    pub fn clone_fresh(&self) -> Self {
        Self::new(self.base_config.clone(), self.mechanism.clone_box())
            .with_sink(Arc::clone(&self.sink))
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    pub fn mechanism_id(&self) -> &MechanismKind {
        &self.config.id
    }

    /// Resolved config of the current activation
    pub fn config(&self) -> &MechanismConfig {
        &self.config
    }

    pub fn base_config(&self) -> &MechanismConfig {
        &self.base_config
    }

    pub fn state(&self) -> &PersistentState {
        &self.state
    }

    /// Owned copy of the state
    pub fn get_state(&self) -> PersistentState {
        self.state.clone()
    }

    /// Owned copy of the resolved config
    pub fn get_config(&self) -> MechanismConfig {
        self.config.clone()
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == EnginePhase::Active && self.state.is_active()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == EnginePhase::Complete
    }

    pub fn step_results(&self) -> &[MechanismStepResult] {
        &self.step_results
    }

    pub fn last_result(&self) -> Option<&MechanismResult> {
        self.result.as_ref()
    }

    pub fn grid_size(&self) -> GridSize {
        self.config.grid_size()
    }

    pub fn info(&self) -> MechanismInfo {
        MechanismInfo {
            id: self.config.id.clone(),
            name: self.mechanism.name().to_string(),
            description: self.mechanism.description().to_string(),
            is_active: self.is_active(),
            current_step: self.state.current_step(),
            iterations_remaining: self.state.iterations_remaining(),
        }
    }

    /// Capture everything needed to resume this activation
    pub fn snapshot(&self) -> MechanismSnapshot {
        MechanismSnapshot {
            mechanism_id: self.config.id.clone(),
            base_config: self.base_config.clone(),
            config: self.config.clone(),
            phase: self.phase,
            state: self.state.clone(),
            step_results: self.step_results.clone(),
            result: self.result.clone(),
            mode: self.mode.clone(),
            speed: self.speed.clone(),
        }
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    /// Collect the deferred payout, then deactivate
    ///
    /// A failing `on_complete` leaves the engine active so `complete()` can
    /// be retried.
    fn finalize(&mut self) -> EngineResult<()> {
        let payout = self.mechanism.on_complete(&self.config, &mut self.state)?;
        self.state.add_win(payout);
        self.state.deactivate();
        self.phase = EnginePhase::Complete;
        Ok(())
    }

    /// Assemble, cache and announce the final result
    fn publish_result(&mut self) -> MechanismResult {
        let result = MechanismResult {
            mechanism_id: self.id_string(),
            total_win: self.state.total_win(),
            total_steps: self.state.total_steps(),
            step_results: self.step_results.clone(),
            final_state: self.state.clone(),
        };
        self.result = Some(result.clone());

        log::info!(
            "{}: complete after {} steps, total win {}",
            self.config.id,
            result.total_steps,
            result.total_win
        );
        self.emit(MechanismEvent::Complete {
            mechanism_id: self.id_string(),
            total_win: result.total_win,
            total_steps: result.total_steps,
        });
        result
    }

    fn id_string(&self) -> String {
        self.config.id.to_string()
    }

    fn emit(&self, event: MechanismEvent) {
        self.sink.publish(&event);
    }
}

impl std::fmt::Debug for MechanismEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MechanismEngine")
            .field("id", &self.config.id)
            .field("mechanism", &self.mechanism.name())
            .field("phase", &self.phase)
            .field("state", &self.state)
            .finish()
    }
}
