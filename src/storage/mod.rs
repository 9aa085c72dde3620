pub use component::{
    ComponentStorage, ErasedStorage, Read as ReadComponent, Store, Write as WriteComponent,
    ABSENT_MARKER, BUSY_MARKER, UNSUPPORTED_MARKER,
};
pub use registry::ComponentRegistry;

mod component;
mod registry;
