//! Mechanism Registry — factories and active instances
//!
//! Maps a mechanism id to the factory that builds its behavior and tracks the
//! engines currently running, keyed by an instance key (the mechanism id
//! unless the caller picks another).

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::MechanismConfig;
use crate::engine::{BoxedMechanism, MechanismEngine, MechanismSnapshot};
use crate::error::{EngineResult, MechanismError};
use crate::events::{NullSink, SharedSink};
use crate::mechanisms::{
    CollectionMechanism, HoldRespinMechanism, LockSequenceMechanism, ModifierMechanism,
    MultiSpinMechanism, TransformationMechanism,
};
use crate::types::MechanismKind;

/// Builds a fresh behavior for a config
pub type MechanismFactory = Box<dyn Fn(&MechanismConfig) -> BoxedMechanism + Send + Sync>;

/// Registry of mechanism factories and active engines
///
/// ## Usage
///
/// ```rust,ignore
/// let mut registry = MechanismRegistry::new();
///
/// let engine = registry.activate(&config, None).unwrap();
/// engine.initialize(None, None)?;
/// engine.process_step(&step)?;
///
/// registry.deactivate("holdRespin");
/// ```
pub struct MechanismRegistry {
    factories: HashMap<MechanismKind, MechanismFactory>,
    active: HashMap<String, MechanismEngine>,
    /// Sink handed to every engine this registry creates
    sink: SharedSink,
}

impl MechanismRegistry {
    /// Create a registry with the six built-in mechanisms
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// Create a registry without any factories
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
            active: HashMap::new(),
            sink: Arc::new(NullSink),
        }
    }

    /// Builder: engines created from now on publish to `sink`
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    fn register_builtins(&mut self) {
        self.register(MechanismKind::HoldRespin, |_| Box::new(HoldRespinMechanism::new()));
        self.register(MechanismKind::LockSequence, |_| {
            Box::new(LockSequenceMechanism::new())
        });
        self.register(MechanismKind::MultiSpin, |_| Box::new(MultiSpinMechanism::new()));
        self.register(MechanismKind::Collection, |_| Box::new(CollectionMechanism::new()));
        self.register(MechanismKind::Modifier, |_| Box::new(ModifierMechanism::new()));
        self.register(MechanismKind::Transformation, |_| {
            Box::new(TransformationMechanism::new())
        });
    }

    // ─── Factories ─────────────────────────────────────────────────────────────

    /// Register a factory; an existing one for the same id is replaced
    pub fn register<F>(&mut self, id: impl Into<MechanismKind>, factory: F)
    where
        F: Fn(&MechanismConfig) -> BoxedMechanism + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.contains_key(&id) {
            log::debug!("registry: replacing factory for '{}'", id);
        }
        self.factories.insert(id, Box::new(factory));
    }

    /// Remove a factory
    pub fn unregister(&mut self, id: &MechanismKind) -> bool {
        self.factories.remove(id).is_some()
    }

    /// Check if a factory is registered
    pub fn has(&self, id: &MechanismKind) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn registered_ids(&self) -> Vec<MechanismKind> {
        let mut ids: Vec<_> = self.factories.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Build an uninitialized engine for `config`
    ///
    /// Returns `None` (with a warning) when no factory is registered.
    pub fn create(&self, config: &MechanismConfig) -> Option<MechanismEngine> {
        let Some(factory) = self.factories.get(&config.id) else {
            log::warn!("registry: no mechanism registered for '{}'", config.id);
            return None;
        };
        let engine = MechanismEngine::new(config.clone(), factory(config))
            .with_sink(Arc::clone(&self.sink));
        Some(engine)
    }

    // ─── Active instances ──────────────────────────────────────────────────────

    /// Create an engine and track it under `key` (default: the config id)
    ///
    /// A previous engine under the same key is dropped from tracking without
    /// being cancelled.
    pub fn activate(
        &mut self,
        config: &MechanismConfig,
        key: Option<&str>,
    ) -> Option<&mut MechanismEngine> {
        let engine = self.create(config)?;
        let key = key.map_or_else(|| config.id.to_string(), str::to_string);
        if self.active.contains_key(&key) {
            log::debug!("registry: '{}' replaced without cancel", key);
        }
        self.active.insert(key.clone(), engine);
        self.active.get_mut(&key)
    }

    /// Cancel the engine under `key` and stop tracking it
    pub fn deactivate(&mut self, key: &str) -> Option<MechanismEngine> {
        let mut engine = self.active.remove(key)?;
        engine.cancel();
        Some(engine)
    }

    /// Cancel and drop every tracked engine
    pub fn deactivate_all(&mut self) {
        for (_, mut engine) in self.active.drain() {
            engine.cancel();
        }
    }

    pub fn get(&self, key: &str) -> Option<&MechanismEngine> {
        self.active.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MechanismEngine> {
        self.active.get_mut(key)
    }

    /// Keys of tracked engines, sorted
    pub fn active_keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.active.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Drop all tracked engines and restore the built-in factories
    ///
    /// Custom registrations are discarded.
    pub fn reset(&mut self) {
        self.active.clear();
        self.factories.clear();
        self.register_builtins();
    }

    // ─── Persistence ───────────────────────────────────────────────────────────

    /// Rebuild an engine from a snapshot using the registered factory
    pub fn restore(&self, snapshot: MechanismSnapshot) -> EngineResult<MechanismEngine> {
        let factory = self
            .factories
            .get(&snapshot.mechanism_id)
            .ok_or_else(|| MechanismError::UnknownMechanism(snapshot.mechanism_id.to_string()))?;
        let mechanism = factory(&snapshot.config);
        MechanismEngine::from_snapshot(snapshot, mechanism, Arc::clone(&self.sink))
    }
}

impl Default for MechanismRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MechanismRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MechanismRegistry")
            .field("factories", &self.registered_ids())
            .field("active", &self.active_keys())
            .finish()
    }
}
