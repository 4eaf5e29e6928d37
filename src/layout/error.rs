//! Error types for the layout kernel

use thiserror::Error;

use super::solver::SolverError;

/// Errors that can occur while declaring or resolving a layout
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A strong constraint contradicts the constraints already installed
    #[error("unsatisfiable constraint at '{site}': {constraint}")]
    Unsatisfiable { site: String, constraint: String },

    /// Constraint solver error
    #[error("constraint solver error: {0}")]
    SolverError(#[from] SolverError),

    /// A composite builder was given input it cannot work with
    #[error("invalid input to {builder}: {reason}")]
    InvalidBuilderInput { builder: String, reason: String },

    /// Variables and dimensions can only be requested inside a pass
    #[error("'{name}' requested outside of an evaluation pass")]
    OutsidePass { name: String },

    /// The same site declared twice within one pass
    #[error("site '{site}' declared more than once in the same pass")]
    DuplicateSite { site: String },

    /// A constraint refers to a variable that is no longer requested
    #[error("constraint at '{site}' refers to '{variable}' which is no longer live")]
    StaleVariable { site: String, variable: String },
}

impl LayoutError {
    /// Create an unsatisfiable constraint error
    pub fn unsatisfiable(site: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            site: site.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an invalid builder input error
    pub fn invalid_input(builder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBuilderInput {
            builder: builder.into(),
            reason: reason.into(),
        }
    }

    pub fn outside_pass(name: impl Into<String>) -> Self {
        Self::OutsidePass { name: name.into() }
    }

    pub fn duplicate_site(site: impl Into<String>) -> Self {
        Self::DuplicateSite { site: site.into() }
    }

    pub fn stale_variable(site: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::StaleVariable {
            site: site.into(),
            variable: variable.into(),
        }
    }

    /// Site of the offending declaration, if the error has one
    pub fn site(&self) -> Option<&str> {
        match self {
            Self::Unsatisfiable { site, .. }
            | Self::DuplicateSite { site }
            | Self::StaleVariable { site, .. } => Some(site),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsatisfiable_display() {
        let err = LayoutError::unsatisfiable("root#2", "x = 10");
        assert_eq!(err.to_string(), "unsatisfiable constraint at 'root#2': x = 10");
        assert_eq!(err.site(), Some("root#2"));
    }

    #[test]
    fn test_invalid_input_display() {
        let err = LayoutError::invalid_input("average", "no inputs");
        assert!(err.to_string().contains("average"));
        assert!(err.site().is_none());
    }

    #[test]
    fn test_stale_variable_display() {
        let err = LayoutError::stale_variable("root#0", "box-left");
        assert!(err.to_string().contains("box-left"));
    }
}
