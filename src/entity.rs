use std::fmt;

pub type EntityId = u64;

/// The sentinel id. It is never handed out by a [`World`](crate::World).
pub const NO_ENTITY: Entity = Entity::NONE;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Entity {
    id: EntityId,
}

impl Entity {
    pub const NONE: Entity = Entity { id: 0 };

    pub const fn new(id: EntityId) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> EntityId {
        self.id
    }

    pub const fn is_none(&self) -> bool {
        self.id == 0
    }

    pub const fn is_some(&self) -> bool {
        !self.is_none()
    }
}

impl From<EntityId> for Entity {
    fn from(id: EntityId) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_entity_is_the_sentinel() {
        assert_eq!(Entity::default(), NO_ENTITY);
        assert!(Entity::default().is_none());
        assert!(Entity::new(1).is_some());
    }

    #[test]
    fn display_pads_to_three_digits() {
        assert_eq!(Entity::new(7).to_string(), "007");
        assert_eq!(Entity::new(1234).to_string(), "1234");
    }
}
