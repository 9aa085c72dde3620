use std::{collections::HashMap, fmt};

use log::*;

use crate::{
    component::{Component, Name},
    entity::{Entity, EntityId},
    storage::{ComponentRegistry, ComponentStorage, ErasedStorage, Store},
    system::{Execute, System, SystemHandle, SystemRegistry},
};

pub use builder::WorldBuilder;
pub use diagnosis::Diagnosis;

mod builder;
mod diagnosis;

/// Owns every component storage, every system and the entity counter.
#[derive(Debug)]
pub struct World {
    components: ComponentRegistry,
    systems: SystemRegistry,
    names: HashMap<String, Entity>,
    entity_names: HashMap<Entity, String>,
    pending_kills: Vec<Entity>,
    next_id: EntityId,
    ticks: u64,
}

impl World {
    pub fn new() -> Self {
        Self {
            components: ComponentRegistry::new(),
            systems: SystemRegistry::new(),
            names: HashMap::new(),
            entity_names: HashMap::new(),
            pending_kills: Vec::new(),
            next_id: 1,
            ticks: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            components: ComponentRegistry::with_capacity(capacity),
            systems: SystemRegistry::with_capacity(capacity),
            names: HashMap::with_capacity(capacity),
            entity_names: HashMap::with_capacity(capacity),
            pending_kills: Vec::new(),
            next_id: 1,
            ticks: 0,
        }
    }

    pub fn builder() -> WorldBuilder {
        WorldBuilder::new()
    }

    /// Hands out the next id. Ids start at 1 and are never reused.
    pub fn new_entity(&mut self) -> Entity {
        let entity = Entity::new(self.next_id);
        self.next_id += 1;
        entity
    }

    /// Every id handed out so far, killed ones included.
    pub fn all_entities(&self) -> impl Iterator<Item = Entity> {
        (1..self.next_id).map(Entity::new)
    }

    /// The ids from [`all_entities`](Self::all_entities) which hold at
    /// least one component.
    ///
    /// # Panics
    ///
    /// Panics if any storage is mutably borrowed.
    pub fn live_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.all_entities()
            .filter(move |&entity| self.components.any_has(entity))
    }

    /// Removes the entity from every registered storage. The id is not
    /// reissued.
    ///
    /// Storages which are borrowed at the time of the call (typically the
    /// one the calling system is iterating) are swept as soon as they are
    /// free: after the current system returns, or on [`flush_kills`].
    ///
    /// [`flush_kills`]: Self::flush_kills
    pub fn kill(&mut self, entity: Entity) {
        if entity.is_none() {
            return;
        }

        if let Some(name) = self.entity_names.remove(&entity) {
            self.names.remove(&name);
        }

        if !self.components.remove_components(entity) && !self.pending_kills.contains(&entity) {
            debug!("Entity {} is still in use, deferring the rest of its removal", entity);
            self.pending_kills.push(entity);
        }
    }

    /// Retries the sweeps deferred by [`kill`](Self::kill). Returns the
    /// number of entities which still wait on a busy storage.
    pub fn flush_kills(&mut self) -> usize {
        let components = &self.components;
        self.pending_kills
            .retain(|&entity| !components.remove_components(entity));

        self.pending_kills.len()
    }

    pub fn pending_kills(&self) -> &[Entity] {
        &self.pending_kills
    }

    /// The storage for `T`, created empty on first request. Every call
    /// returns a handle to the same storage.
    pub fn require_component<T: Component>(&mut self) -> Store<T> {
        self.components.get_or_register()
    }

    /// Like [`require_component`](Self::require_component), building the
    /// storage with `f` if it does not exist yet.
    pub fn require_component_with<T: Component, F>(&mut self, f: F) -> Store<T>
    where
        F: FnOnce() -> ComponentStorage<T>,
    {
        self.components.get_or_register_with(f)
    }

    /// Like [`require_component`](Self::require_component), and makes sure
    /// the storage renders its values with `Display` in diagnostics.
    pub fn require_displayed_component<T>(&mut self) -> Store<T>
    where
        T: Component + fmt::Display,
    {
        let store = self.require_component_with(ComponentStorage::<T>::displayed);

        match store.try_write() {
            Ok(mut storage) if !storage.is_renderable() => storage.render_with_display(),
            Ok(_) => {}
            Err(err) => warn!("Could not install a renderer: {}", err),
        }

        store
    }

    /// The storage for `T` if one was registered. Never creates one.
    pub fn component<T: Component>(&self) -> Option<Store<T>> {
        self.components.get()
    }

    pub fn all_components(&self) -> impl Iterator<Item = &'_ dyn ErasedStorage> {
        self.components.iter().map(|store| &**store)
    }

    /// Describes every component the entity holds, in registration order.
    pub fn diagnose(&self, entity: Entity) -> Diagnosis {
        let entries = self
            .components
            .iter()
            .filter_map(|store| {
                store
                    .describe_entry(entity)
                    .map(|text| (store.component_name(), text))
            })
            .collect();

        Diagnosis::new(entity, entries)
    }

    /// Appends an enabled system running `body` every tick.
    pub fn make_system<F>(&mut self, name: impl Into<String>, body: F) -> SystemHandle
    where
        F: FnMut(&mut World) + Send + 'static,
    {
        self.add_system(name, body)
    }

    /// Like [`make_system`](Self::make_system) for any [`Execute`]
    /// implementor.
    pub fn add_system<E>(&mut self, name: impl Into<String>, body: E) -> SystemHandle
    where
        E: Execute + 'static,
    {
        let system = System::new(name, body);
        debug!("Registered system `{}`", system.name());
        self.systems.push(system)
    }

    /// The first system registered under `name`.
    pub fn find_system(&self, name: &str) -> Option<SystemHandle> {
        self.systems.find(name)
    }

    pub fn all_systems(&self) -> &[SystemHandle] {
        self.systems.as_slice()
    }

    /// Runs one tick: every enabled system, in registration order.
    ///
    /// Systems registered during the tick run at its end. A system that is
    /// already running (because its own body called `update`) is skipped.
    pub fn update(&mut self) {
        trace!("Tick {} started", self.ticks + 1);

        let mut index = 0;
        while let Some(system) = self.systems.get(index).cloned() {
            index += 1;

            if !system.is_enabled() {
                continue;
            }

            if let Err(err) = system.run(self) {
                warn!("Skipped a system: {}", err);
            }

            if !self.pending_kills.is_empty() {
                self.flush_kills();
            }
        }

        self.ticks += 1;
    }

    /// The number of completed calls to [`update`](Self::update).
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The entity named `name`, creating it with a [`Name`] component if
    /// there is none.
    pub fn require_entity(&mut self, name: &str) -> Entity {
        let found = self.find_entity(name);
        if found.is_some() {
            return found;
        }

        // The entry may be stale if its Name was changed behind our back.
        if let Some(stale) = self.names.remove(name) {
            self.entity_names.remove(&stale);
        }

        let entity = self.new_entity();
        self.require_displayed_component::<Name>()
            .set(entity, Name::new(name));

        self.names.insert(name.to_owned(), entity);
        self.entity_names.insert(entity, name.to_owned());

        debug!("Created entity {} named `{}`", entity, name);
        entity
    }

    /// The entity named `name`, or [`Entity::NONE`]. Never allocates.
    pub fn find_entity(&self, name: &str) -> Entity {
        match self.names.get(name) {
            Some(&entity) if self.name_matches(entity, name) => entity,
            _ => Entity::NONE,
        }
    }

    /// The indexed name of an entity created by
    /// [`require_entity`](Self::require_entity).
    pub fn entity_name(&self, entity: Entity) -> Option<&str> {
        self.entity_names
            .get(&entity)
            .map(String::as_str)
            .filter(|name| self.name_matches(entity, name))
    }

    // An index entry is only trusted while the entity still carries the
    // same Name. A busy Name storage can't be checked, so it is trusted.
    fn name_matches(&self, entity: Entity, name: &str) -> bool {
        let store = match self.components.get::<Name>() {
            Some(store) => store,
            None => return false,
        };

        let names = match store.try_read() {
            Ok(names) => names,
            Err(_) => return true,
        };

        names
            .get(entity)
            .map_or(false, |stored| stored.as_str() == name)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
