use std::fmt;

use parking_lot::Mutex;

use crate::error::RetrievalError;
use crate::world::World;

/// Anything that can run as a system body.
///
/// Implemented for every `FnMut(&mut World) + Send` closure, so most
/// systems are plain closures that captured the stores they work on.
pub trait Execute: Send {
    fn execute(&mut self, world: &mut World);
}

impl<F> Execute for F
where
    F: FnMut(&mut World) + Send,
{
    fn execute(&mut self, world: &mut World) {
        self(world)
    }
}

/// Owns a boxed system body. The lock doubles as the "currently running"
/// flag.
pub struct SystemExecutor {
    body: Mutex<Box<dyn Execute>>,
}

impl SystemExecutor {
    pub fn new<E>(body: E) -> Self
    where
        E: Execute + 'static,
    {
        Self {
            body: Mutex::new(Box::new(body)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.body.is_locked()
    }

    pub fn execute(&self, name: &str, world: &mut World) -> Result<(), RetrievalError> {
        let mut body = self
            .body
            .try_lock()
            .ok_or_else(|| RetrievalError::SystemRunning {
                system: name.to_owned(),
            })?;

        body.execute(world);
        Ok(())
    }
}

impl fmt::Debug for SystemExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemExecutor")
            .field("running", &self.is_running())
            .finish()
    }
}
