#![deny(missing_debug_implementations)]

pub use component::{Component, Name};
pub use entity::{Entity, EntityId, NO_ENTITY};
pub use error::RetrievalError;
pub use storage::{ComponentStorage, ErasedStorage, ReadComponent, Store, WriteComponent};
pub use system::{Execute, System, SystemHandle};
pub use world::{Diagnosis, World, WorldBuilder};

pub mod cell;
pub mod component;
pub mod entity;
pub mod error;
pub mod storage;
pub mod system;
pub mod world;
