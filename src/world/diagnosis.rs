use std::fmt;

use crate::entity::Entity;

/// Everything the world knows about one entity, for humans.
///
/// The text of each entry is freeform and carries no stability guarantee.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnosis {
    entity: Entity,
    entries: Vec<(&'static str, String)>,
}

impl Diagnosis {
    pub(crate) fn new(entity: Entity, entries: Vec<(&'static str, String)>) -> Self {
        Self { entity, entries }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// `(component name, rendered value)` pairs in registration order.
    pub fn entries(&self) -> &[(&'static str, String)] {
        &self.entries
    }

    pub fn get(&self, component: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == component)
            .map(|(_, text)| text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== DIAGNOSE {} =====", self.entity)?;
        for (name, text) in &self.entries {
            writeln!(f, "{:20} || {}", name, text)?;
        }
        Ok(())
    }
}
