//! # rf-mechanism — Spin Mechanism Engine
//!
//! Drives the iterative bonus loops of a slot round (hold-and-respin, lock
//! sequences, multi-spin runs, collections, modifiers, transformations) from
//! step data supplied by the round source.
//!
//! ## Features
//!
//! - **Shared Lifecycle**: one engine runs the same step transition for every mechanic
//! - **Pluggable Mechanics**: six built-ins plus runtime-registered custom ones
//! - **Declarative Config**: reset/completion rules, multiplier progression, mode and speed overrides
//! - **Deferred Payout**: mechanics may pay on completion instead of per step
//! - **Snapshots**: serialize an activation and resume it later
//! - **Lifecycle Events**: start / step / complete / cancel published to a sink
//!
//! ## Architecture
//!
//! ```text
//! MechanismRegistry
//!     │
//!     ├── factories (MechanismKind → BoxedMechanism)
//!     └── active engines (instance key → MechanismEngine)
//!           │
//!           ├── MechanismConfig (base + resolved)
//!           ├── PersistentState (counters, locks, custom state)
//!           └── Mechanism (consume / update / complete hooks)
//!                 │
//!                 v
//!     StepData → MechanismStepResult → MechanismResult
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rf_mechanism::*;
//!
//! let mut registry = MechanismRegistry::new();
//! let config = MechanismConfig::hold_respin(HoldRespinParams::new("H")).with_grid(3, 5);
//!
//! let engine = registry.activate(&config, None).unwrap();
//! engine.initialize(None, None)?;
//! let step = engine.process_step(&StepData::new(0).with_landing(Position::new(0, 0), "H", 5.0))?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod mechanisms;
pub mod registry;
pub mod rules;
pub mod state;
pub mod step;
pub mod types;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use mechanisms::*;
pub use registry::*;
pub use state::*;
pub use step::*;
pub use types::*;
