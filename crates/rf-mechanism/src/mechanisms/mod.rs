//! Built-in mechanisms
//!
//! Each mechanism supplies only the mechanic-specific hooks; the shared
//! lifecycle lives in [`crate::engine::MechanismEngine`].
//!
//! ```text
//! MechanismRegistry
//!     │
//!     ├── HoldRespinMechanism
//!     ├── LockSequenceMechanism
//!     ├── MultiSpinMechanism
//!     ├── CollectionMechanism
//!     ├── ModifierMechanism
//!     └── TransformationMechanism
//! ```

mod collection;
mod hold_respin;
mod lock_sequence;
mod modifier;
mod multi_spin;
mod transformation;

pub use collection::*;
pub use hold_respin::*;
pub use lock_sequence::*;
pub use modifier::*;
pub use multi_spin::*;
pub use transformation::*;

use crate::config::MechanismConfig;
use crate::error::{ConfigError, MechanismError};

/// Error for a config whose params do not belong to the mechanism
pub(crate) fn missing_params(config: &MechanismConfig) -> MechanismError {
    MechanismError::Config(ConfigError::MissingParams(config.id.to_string()))
}

/// Error for custom state of the wrong mechanic
pub(crate) fn state_mismatch(config: &MechanismConfig, expected: &'static str) -> MechanismError {
    MechanismError::StateMismatch {
        mechanism_id: config.id.to_string(),
        expected,
    }
}
