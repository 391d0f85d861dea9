use thiserror::Error;

/// Failure conditions of the structural operations. Store primitives fail
/// silently (Option/bool); these surface from the policy layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("no section or field with id '{0}'")]
    NotFound(String),

    #[error("section '{0}' is locked and cannot be changed")]
    Locked(String),

    #[error("moving '{0}' would nest it inside its own subtree")]
    Cycle(String),

    #[error("{0}")]
    Validation(String),
}

pub type TreeResult<T> = Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_node() {
        let err = TreeError::Locked("allergies".into());
        assert_eq!(
            err.to_string(),
            "section 'allergies' is locked and cannot be changed"
        );
        let err = TreeError::Cycle("social-history".into());
        assert!(err.to_string().contains("social-history"));
    }
}
