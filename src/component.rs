use std::fmt;

pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// The reserved component behind [`World::require_entity`](crate::World::require_entity).
///
/// The world keeps its own copy of every name in its index, so replacing
/// or removing a `Name` through its store directly only detaches the
/// entity from that index, it never leaves a dangling key behind.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Name {
    name: String,
}

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.name)
    }
}
