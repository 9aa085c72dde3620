use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::error::RetrievalError;
use crate::world::World;

pub use executor::{Execute, SystemExecutor};

pub mod executor;

/// A named, enableable unit of per-tick logic.
pub struct System {
    name: String,
    enabled: AtomicBool,
    executor: SystemExecutor,
}

/// A shared handle to a registered system.
pub type SystemHandle = Arc<System>;

impl System {
    pub fn new<E>(name: impl Into<String>, body: E) -> Self
    where
        E: Execute + 'static,
    {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
            executor: SystemExecutor::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn enable(&self) {
        self.set_enabled(true);
    }

    pub fn disable(&self) {
        self.set_enabled(false);
    }

    pub fn is_running(&self) -> bool {
        self.executor.is_running()
    }

    /// Runs the body once, regardless of the enabled flag. Fails if the
    /// body is already running further up the stack.
    pub fn run(&self, world: &mut World) -> Result<(), RetrievalError> {
        self.executor.execute(&self.name, world)
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("executor", &self.executor)
            .finish()
    }
}

/// The ordered list of systems. Registration order is execution order.
#[derive(Debug, Default)]
pub struct SystemRegistry {
    systems: Vec<SystemHandle>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            systems: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, system: System) -> SystemHandle {
        let handle = Arc::new(system);
        self.systems.push(Arc::clone(&handle));
        handle
    }

    /// The first system registered under `name`.
    pub fn find(&self, name: &str) -> Option<SystemHandle> {
        self.systems
            .iter()
            .find(|system| system.name() == name)
            .cloned()
    }

    pub fn get(&self, index: usize) -> Option<&SystemHandle> {
        self.systems.get(index)
    }

    pub fn as_slice(&self) -> &[SystemHandle] {
        &self.systems
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}
