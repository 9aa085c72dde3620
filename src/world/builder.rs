use std::fmt;

use crate::component::Component;
use crate::system::Execute;
use crate::world::World;

type Setup = Box<dyn FnOnce(&mut World)>;

/// Declares components and systems up front, then builds the [`World`].
pub struct WorldBuilder {
    capacity: Option<usize>,
    setup: Vec<Setup>,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            capacity: None,
            setup: Vec::new(),
        }
    }

    /// Capacity hint for the component registry, the system list and the
    /// name index.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_component<T: Component>(mut self) -> Self {
        self.setup.push(Box::new(|world: &mut World| {
            world.require_component::<T>();
        }));
        self
    }

    pub fn with_displayed_component<T>(mut self) -> Self
    where
        T: Component + fmt::Display,
    {
        self.setup.push(Box::new(|world: &mut World| {
            world.require_displayed_component::<T>();
        }));
        self
    }

    pub fn with_system<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut World) + Send + 'static,
    {
        self.with_executor(name, body)
    }

    pub fn with_executor<E>(mut self, name: impl Into<String>, body: E) -> Self
    where
        E: Execute + 'static,
    {
        let name = name.into();
        self.setup.push(Box::new(move |world: &mut World| {
            world.add_system(name, body);
        }));
        self
    }

    /// Runs the declarations in the order they were made.
    pub fn build(self) -> World {
        let mut world = match self.capacity {
            Some(capacity) => World::with_capacity(capacity),
            None => World::new(),
        };

        for setup in self.setup {
            setup(&mut world);
        }

        world
    }
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorldBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldBuilder")
            .field("capacity", &self.capacity)
            .field("declarations", &self.setup.len())
            .finish()
    }
}
