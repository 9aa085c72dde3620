use std::{
    any::{self, TypeId},
    collections::{hash_map::Entry, HashMap},
    fmt,
    sync::Arc,
};

use log::*;

use crate::{
    component::Component,
    entity::Entity,
    storage::{ComponentStorage, ErasedStorage, Store},
};

/// The type-keyed directory of every component storage in a world.
pub struct ComponentRegistry {
    index: HashMap<TypeId, usize>,
    // Registration order, which is also the order of diagnostics.
    stores: Vec<Arc<dyn ErasedStorage>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            stores: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            stores: Vec::with_capacity(capacity),
        }
    }

    /// Registers a component type using the default constructor. Returns
    /// `false` if the storage was already registered.
    pub fn register<T: Component>(&mut self) -> bool {
        self.register_with::<T, _>(ComponentStorage::new)
    }

    /// Registers a component type with the storage produced by `f`, which
    /// is only called if the type was not registered yet. Returns `false`
    /// if the storage was already registered.
    pub fn register_with<T: Component, F>(&mut self, f: F) -> bool
    where
        F: FnOnce() -> ComponentStorage<T>,
    {
        match self.index.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                let store = Store::new(f());
                v.insert(self.stores.len());
                self.stores.push(store.erased());

                trace!("Registered component storage for {}", any::type_name::<T>());
                true
            }
        }
    }

    pub fn contains<T: Component>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// The storage for `T`, or `None` if it was never registered.
    pub fn get<T: Component>(&self) -> Option<Store<T>> {
        self.index
            .get(&TypeId::of::<T>())
            .map(|&slot| Store::from_erased(Arc::clone(&self.stores[slot])))
    }

    pub fn get_or_register<T: Component>(&mut self) -> Store<T> {
        self.get_or_register_with(ComponentStorage::new)
    }

    pub fn get_or_register_with<T: Component, F>(&mut self, f: F) -> Store<T>
    where
        F: FnOnce() -> ComponentStorage<T>,
    {
        self.register_with::<T, _>(f);

        match self.get() {
            Some(store) => store,
            None => unreachable!("storage could not be retrieved after it was registered"),
        }
    }

    /// Removes the entity from every storage that is not currently
    /// borrowed. Returns `true` if every storage could be swept.
    pub fn remove_components(&self, entity: Entity) -> bool {
        let mut swept = true;

        for store in &self.stores {
            if store.try_remove(entity).is_err() {
                swept = false;
            }
        }

        swept
    }

    /// Whether any storage holds a value for the entity.
    pub fn any_has(&self, entity: Entity) -> bool {
        self.stores.iter().any(|store| store.has(entity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'_ Arc<dyn ErasedStorage>> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stores.iter().map(|store| store.component_name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn registration_is_idempotent() {
        let mut registry = ComponentRegistry::new();

        assert!(registry.register::<A>());
        assert!(!registry.register::<A>());
        assert!(registry.register::<B>());
        assert_eq!(registry.len(), 2);

        let first = registry.get_or_register::<A>();
        let second = registry.get_or_register::<A>();
        assert!(first.ptr_eq(&second));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn register_with_only_builds_once() {
        let mut registry = ComponentRegistry::new();
        registry.register_with::<A, _>(|| ComponentStorage::with_capacity(8));

        let mut called = false;
        registry.register_with::<A, _>(|| {
            called = true;
            ComponentStorage::new()
        });

        assert!(!called);
    }

    #[test]
    fn get_does_not_register() {
        let registry = ComponentRegistry::new();
        assert!(registry.get::<A>().is_none());
        assert!(!registry.contains::<A>());
    }

    #[test]
    fn sweep_skips_busy_storages() {
        let mut registry = ComponentRegistry::new();
        let a = registry.get_or_register::<A>();
        let b = registry.get_or_register::<B>();
        let e = Entity::new(1);

        a.set(e, A);
        b.set(e, B);

        {
            let _busy = a.read();
            assert!(!registry.remove_components(e));
        }
        assert!(a.has(e));
        assert!(!b.has(e));

        assert!(registry.remove_components(e));
        assert!(!registry.any_has(e));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = ComponentRegistry::new();
        registry.register::<B>();
        registry.register::<A>();

        let names: Vec<_> = registry.iter().map(|s| s.component_name()).collect();
        assert_eq!(names, vec![any::type_name::<B>(), any::type_name::<A>()]);
    }
}
