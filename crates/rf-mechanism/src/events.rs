//! Lifecycle events and notification sinks
//!
//! The engine announces its lifecycle through an [`EventSink`]. The channel is
//! one-way: nothing is ever read back, and a sink must not block the caller.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Lifecycle notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MechanismEvent {
    /// Activation initialized
    Start {
        mechanism_id: String,
        iterations: u32,
        multiplier: f64,
        mode: Option<String>,
        speed: Option<String>,
    },
    /// A step is about to be consumed
    #[serde(rename = "step:start")]
    StepStart {
        mechanism_id: String,
        step_index: u32,
        iterations_remaining: u32,
    },
    /// A step transition finished
    #[serde(rename = "step:complete")]
    StepComplete {
        mechanism_id: String,
        step_index: u32,
        step_win: f64,
        cumulative_win: f64,
        iterations_remaining: u32,
        multiplier: f64,
        is_complete: bool,
    },
    /// Activation completed normally
    Complete {
        mechanism_id: String,
        total_win: f64,
        total_steps: u32,
    },
    /// Activation aborted
    Cancel {
        mechanism_id: String,
        current_step: u32,
        total_win: f64,
    },
}

impl MechanismEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::StepStart { .. } => "step:start",
            Self::StepComplete { .. } => "step:complete",
            Self::Complete { .. } => "complete",
            Self::Cancel { .. } => "cancel",
        }
    }

    pub fn mechanism_id(&self) -> &str {
        match self {
            Self::Start { mechanism_id, .. }
            | Self::StepStart { mechanism_id, .. }
            | Self::StepComplete { mechanism_id, .. }
            | Self::Complete { mechanism_id, .. }
            | Self::Cancel { mechanism_id, .. } => mechanism_id,
        }
    }
}

/// One-way publish target for lifecycle events
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &MechanismEvent);
}

/// Shared sink handle
pub type SharedSink = Arc<dyn EventSink>;

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &MechanismEvent) {}
}

/// Writes every event to the `log` facade at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: &MechanismEvent) {
        log::debug!("[{}] {} {:?}", event.mechanism_id(), event.name(), event);
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MechanismEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<MechanismEvent> {
        self.events.lock().clone()
    }

    /// Wire names, in publish order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(MechanismEvent::name).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &MechanismEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Forwards events over a bounded channel
///
/// Full or disconnected channels drop the event with a warning.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<MechanismEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn bounded(capacity: usize) -> (Self, Receiver<MechanismEvent>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &MechanismEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                log::warn!("event channel full, dropping {} for {}", ev.name(), ev.mechanism_id());
            }
            Err(TrySendError::Disconnected(ev)) => {
                log::warn!("event channel closed, dropping {} for {}", ev.name(), ev.mechanism_id());
            }
        }
    }
}
