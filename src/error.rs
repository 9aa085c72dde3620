use thiserror::Error;

/// Returned by the fallible accessors when a store or system is already
/// borrowed in a conflicting way.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Error)]
pub enum RetrievalError {
    #[error("storage for component {component} is currently borrowed mutably")]
    ComponentLockedExclusive { component: &'static str },
    #[error("storage for component {component} is currently in use")]
    ComponentInUse { component: &'static str },
    #[error("system `{system}` is already running")]
    SystemRunning { system: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_culprit() {
        let err = RetrievalError::ComponentInUse {
            component: "Position",
        };
        assert_eq!(
            err.to_string(),
            "storage for component Position is currently in use"
        );

        let err = RetrievalError::SystemRunning {
            system: "velocity".to_owned(),
        };
        assert_eq!(err.to_string(), "system `velocity` is already running");
    }
}
