use std::fmt;
use std::ops::{Deref, DerefMut};
use std::{
    any::{self, Any},
    collections::{hash_map, HashMap},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    cell::{AtomicRef, AtomicRefCell, AtomicRefMut},
    component::Component,
    entity::Entity,
    error::RetrievalError,
};

/// Returned by `describe` for a value whose store has no renderer.
pub const UNSUPPORTED_MARKER: &str = "<unrenderable>";
/// Returned by `describe` when the entity has no value in the store.
pub const ABSENT_MARKER: &str = "<absent>";
/// Returned by the erased `describe` when the store is mutably borrowed.
pub const BUSY_MARKER: &str = "<in use>";

type RenderFn<T> = fn(&T) -> String;

fn render_display<T: fmt::Display>(value: &T) -> String {
    value.to_string()
}

/// The values of a single component type, keyed by entity.
///
/// Iteration order is hash order and may change between reads.
pub struct ComponentStorage<T: Component> {
    name: &'static str,
    values: HashMap<Entity, T>,
    render: Option<RenderFn<T>>,
}

impl<T: Component> ComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            name: any::type_name::<T>(),
            values: HashMap::new(),
            render: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            name: any::type_name::<T>(),
            values: HashMap::with_capacity(capacity),
            render: None,
        }
    }

    /// A storage which renders its values through their `Display` impl.
    pub fn displayed() -> Self
    where
        T: fmt::Display,
    {
        Self::rendered_with(render_display::<T>)
    }

    pub fn rendered_with(render: RenderFn<T>) -> Self {
        Self {
            render: Some(render),
            ..Self::new()
        }
    }

    pub fn render_with_display(&mut self)
    where
        T: fmt::Display,
    {
        self.render = Some(render_display::<T>);
    }

    pub fn is_renderable(&self) -> bool {
        self.render.is_some()
    }

    /// The type name of the component, used for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inserts or overwrites the value for `entity`, returning the old one.
    pub fn set(&mut self, entity: Entity, value: T) -> Option<T> {
        self.values.insert(entity, value)
    }

    pub fn has(&self, entity: Entity) -> bool {
        self.values.contains_key(&entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.values.get(&entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.values.get_mut(&entity)
    }

    /// Calls `f` with the value for `entity` if there is one. `None` means
    /// the entity has no value and `f` was not called.
    pub fn with<R, F>(&mut self, entity: Entity, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.values.get_mut(&entity).map(f)
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.values.remove(&entity)
    }

    pub fn describe(&self, entity: Entity) -> String {
        match self.values.get(&entity) {
            Some(value) => match self.render {
                Some(render) => render(value),
                None => UNSUPPORTED_MARKER.to_owned(),
            },
            None => ABSENT_MARKER.to_owned(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &'_ T)> {
        self.values.iter().map(|(entity, value)| (*entity, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &'_ mut T)> {
        self.values.iter_mut().map(|(entity, value)| (*entity, value))
    }

    /// Visits every value on the rayon thread pool.
    pub fn par_for_each<F>(&mut self, f: F)
    where
        F: Fn(Entity, &mut T) + Send + Sync,
    {
        self.values
            .par_iter_mut()
            .for_each(|(entity, value)| f(*entity, value));
    }
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> fmt::Debug for ComponentStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStorage")
            .field("name", &self.name)
            .field("len", &self.values.len())
            .field("renderable", &self.render.is_some())
            .finish()
    }
}

impl<'a, T: Component> IntoIterator for &'a ComponentStorage<T> {
    type Item = (&'a Entity, &'a T);
    type IntoIter = hash_map::Iter<'a, Entity, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<'a, T: Component> IntoIterator for &'a mut ComponentStorage<T> {
    type Item = (&'a Entity, &'a mut T);
    type IntoIter = hash_map::IterMut<'a, Entity, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter_mut()
    }
}

/// The type-erased view of a storage: everything that can be done to a
/// store without knowing its component type.
pub trait ErasedStorage: Send + Sync + 'static {
    fn component_name(&self) -> &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has(&self, entity: Entity) -> bool;

    /// Removes the entity's value, refusing if the storage is currently
    /// borrowed. `Ok(true)` if a value was removed.
    fn try_remove(&self, entity: Entity) -> Result<bool, RetrievalError>;

    /// `None` if the entity has no value here.
    fn describe_entry(&self, entity: Entity) -> Option<String>;

    fn describe(&self, entity: Entity) -> String {
        self.describe_entry(entity)
            .unwrap_or_else(|| ABSENT_MARKER.to_owned())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Component> ErasedStorage for AtomicRefCell<ComponentStorage<T>> {
    fn component_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }

    fn has(&self, entity: Entity) -> bool {
        self.borrow().has(entity)
    }

    fn try_remove(&self, entity: Entity) -> Result<bool, RetrievalError> {
        let mut storage = self
            .try_borrow_mut()
            .ok_or(RetrievalError::ComponentInUse {
                component: any::type_name::<T>(),
            })?;

        Ok(storage.remove(entity).is_some())
    }

    fn describe_entry(&self, entity: Entity) -> Option<String> {
        match self.try_borrow() {
            Some(storage) if storage.has(entity) => Some(storage.describe(entity)),
            Some(_) => None,
            None => Some(BUSY_MARKER.to_owned()),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A shared handle to the storage of one component type.
///
/// Every clone refers to the same storage, which lives for as long as the
/// world or any handle does.
pub struct Store<T: Component> {
    cell: Arc<AtomicRefCell<ComponentStorage<T>>>,
}

impl<T: Component> Store<T> {
    pub fn new(storage: ComponentStorage<T>) -> Self {
        Self {
            cell: Arc::new(AtomicRefCell::new(storage)),
        }
    }

    /// Recovers the typed handle from the erased one. Callers guarantee
    /// that `erased` was registered under `TypeId::of::<T>()`.
    pub(crate) fn from_erased(erased: Arc<dyn ErasedStorage>) -> Self {
        match erased.into_any().downcast::<AtomicRefCell<ComponentStorage<T>>>() {
            Ok(cell) => Self { cell },
            Err(_) => panic!(
                "component registry entry for {} holds a storage of another type",
                any::type_name::<T>(),
            ),
        }
    }

    pub(crate) fn erased(&self) -> Arc<dyn ErasedStorage> {
        Arc::clone(&self.cell) as Arc<dyn ErasedStorage>
    }

    /// Whether both handles refer to the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn name(&self) -> &'static str {
        any::type_name::<T>()
    }

    pub fn read(&self) -> Read<'_, T> {
        Read::new(self.cell.borrow())
    }

    pub fn write(&self) -> Write<'_, T> {
        Write::new(self.cell.borrow_mut())
    }

    pub fn try_read(&self) -> Result<Read<'_, T>, RetrievalError> {
        self.cell
            .try_borrow()
            .map(Read::new)
            .ok_or(RetrievalError::ComponentLockedExclusive {
                component: self.name(),
            })
    }

    pub fn try_write(&self) -> Result<Write<'_, T>, RetrievalError> {
        self.cell
            .try_borrow_mut()
            .map(Write::new)
            .ok_or(RetrievalError::ComponentInUse {
                component: self.name(),
            })
    }

    pub fn set(&self, entity: Entity, value: T) -> Option<T> {
        self.write().set(entity, value)
    }

    pub fn has(&self, entity: Entity) -> bool {
        self.read().has(entity)
    }

    pub fn with<R, F>(&self, entity: Entity, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.write().with(entity, f)
    }

    pub fn try_with<R, F>(&self, entity: Entity, f: F) -> Result<Option<R>, RetrievalError>
    where
        F: FnOnce(&mut T) -> R,
    {
        Ok(self.try_write()?.with(entity, f))
    }

    pub fn remove(&self, entity: Entity) -> Option<T> {
        self.write().remove(entity)
    }

    pub fn describe(&self, entity: Entity) -> String {
        self.read().describe(entity)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<T: Component> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Component> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name())
            .field("cell", &self.cell)
            .finish()
    }
}

pub struct Read<'a, T: Component> {
    storage: AtomicRef<'a, ComponentStorage<T>>,
}

impl<'a, T: Component> Read<'a, T> {
    pub fn new(storage: AtomicRef<'a, ComponentStorage<T>>) -> Self {
        Self { storage }
    }
}

impl<T: Component> Deref for Read<'_, T> {
    type Target = ComponentStorage<T>;

    fn deref(&self) -> &ComponentStorage<T> {
        &self.storage
    }
}

impl<T: Component> fmt::Debug for Read<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Read").field(&**self).finish()
    }
}

pub struct Write<'a, T: Component> {
    storage: AtomicRefMut<'a, ComponentStorage<T>>,
}

impl<'a, T: Component> Write<'a, T> {
    pub fn new(storage: AtomicRefMut<'a, ComponentStorage<T>>) -> Self {
        Self { storage }
    }
}

impl<T: Component> Deref for Write<'_, T> {
    type Target = ComponentStorage<T>;

    fn deref(&self) -> &ComponentStorage<T> {
        &self.storage
    }
}

impl<T: Component> DerefMut for Write<'_, T> {
    fn deref_mut(&mut self) -> &mut ComponentStorage<T> {
        &mut self.storage
    }
}

impl<T: Component> fmt::Debug for Write<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Write").field(&**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    impl fmt::Display for Health {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "hp {}", self.0)
        }
    }

    struct Opaque;

    #[test]
    fn set_has_with_remove() {
        let store = Store::new(ComponentStorage::<Health>::new());
        let e = Entity::new(3);

        assert!(!store.has(e));
        assert_eq!(store.set(e, Health(10)), None);
        assert!(store.has(e));
        assert_eq!(store.with(e, |h| h.0), Some(10));

        assert_eq!(store.set(e, Health(20)), Some(Health(10)));
        store.with(e, |h| h.0 += 1);
        assert_eq!(store.read().get(e), Some(&Health(21)));

        assert_eq!(store.remove(e), Some(Health(21)));
        assert!(!store.has(e));
        assert_eq!(store.with(e, |h| h.0), None);
        assert_eq!(store.remove(e), None);
    }

    #[test]
    fn with_does_not_call_for_absent_entities() {
        let mut storage = ComponentStorage::<Health>::new();
        let mut called = false;

        assert!(storage.with(Entity::new(1), |_| called = true).is_none());
        assert!(!called);
    }

    #[test]
    fn never_issued_ids_are_accepted() {
        let mut storage = ComponentStorage::<Health>::new();
        storage.set(Entity::new(9_000), Health(1));
        assert!(storage.has(Entity::new(9_000)));
    }

    #[test]
    fn describe_markers() {
        let e = Entity::new(1);

        let mut shown = ComponentStorage::<Health>::displayed();
        assert_eq!(shown.describe(e), ABSENT_MARKER);
        shown.set(e, Health(5));
        assert_eq!(shown.describe(e), "hp 5");

        let mut opaque = ComponentStorage::<Opaque>::new();
        opaque.set(e, Opaque);
        assert!(!opaque.is_renderable());
        assert_eq!(opaque.describe(e), UNSUPPORTED_MARKER);

        let mut custom = ComponentStorage::<Opaque>::rendered_with(|_| "opaque".to_owned());
        custom.set(e, Opaque);
        assert_eq!(custom.describe(e), "opaque");
    }

    #[test]
    fn clones_share_one_storage() {
        let a = Store::new(ComponentStorage::<Health>::new());
        let b = a.clone();

        a.set(Entity::new(1), Health(1));
        assert!(b.has(Entity::new(1)));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn erased_round_trip() {
        let store = Store::new(ComponentStorage::<Health>::displayed());
        store.set(Entity::new(2), Health(7));

        let erased = store.erased();
        assert!(erased.has(Entity::new(2)));
        assert_eq!(erased.describe(Entity::new(2)), "hp 7");
        assert_eq!(erased.describe(Entity::new(3)), ABSENT_MARKER);
        assert_eq!(erased.describe_entry(Entity::new(3)), None);

        let typed = Store::<Health>::from_erased(erased);
        assert!(typed.ptr_eq(&store));
    }

    #[test]
    fn busy_storage_refuses_erased_removal() {
        let store = Store::new(ComponentStorage::<Health>::new());
        store.set(Entity::new(1), Health(1));
        let erased = store.erased();

        let guard = store.write();
        assert_eq!(
            erased.try_remove(Entity::new(1)),
            Err(RetrievalError::ComponentInUse {
                component: any::type_name::<Health>(),
            })
        );
        assert_eq!(erased.describe(Entity::new(1)), BUSY_MARKER);
        assert_eq!(
            store.try_read().err(),
            Some(RetrievalError::ComponentLockedExclusive {
                component: any::type_name::<Health>(),
            })
        );
        drop(guard);

        assert_eq!(erased.try_remove(Entity::new(1)), Ok(true));
        assert!(store.is_empty());
    }

    #[test]
    fn fallible_access_reports_the_conflicting_borrow() {
        let store = Store::new(ComponentStorage::<Health>::new());
        let e = Entity::new(1);
        store.set(e, Health(1));
        let in_use = RetrievalError::ComponentInUse {
            component: any::type_name::<Health>(),
        };

        {
            let _reading = store.read();
            let mut called = false;

            assert_eq!(store.try_write().err(), Some(in_use.clone()));
            assert_eq!(store.try_with(e, |_| called = true), Err(in_use.clone()));
            assert!(!called);
            assert!(store.try_read().is_ok());
        }

        {
            let _writing = store.write();
            assert_eq!(
                store.try_read().err(),
                Some(RetrievalError::ComponentLockedExclusive {
                    component: any::type_name::<Health>(),
                })
            );
            assert_eq!(store.try_with(e, |h| h.0), Err(in_use));
        }

        assert_eq!(store.try_with(e, |h| h.0 += 1), Ok(Some(())));
        assert_eq!(store.try_with(Entity::new(2), |h| h.0), Ok(None));
        assert_eq!(store.with(e, |h| h.0), Some(2));
    }

    #[test]
    fn par_for_each_visits_everything() {
        let mut storage = ComponentStorage::<Health>::with_capacity(64);
        for id in 1..=64 {
            storage.set(Entity::new(id), Health(id as u32));
        }

        storage.par_for_each(|entity, health| health.0 += entity.id() as u32);

        assert!(storage
            .iter()
            .all(|(entity, health)| health.0 == 2 * entity.id() as u32));
    }
}
