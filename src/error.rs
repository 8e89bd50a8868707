//! Planner error types

use thiserror::Error;

pub type PlanResult<T> = Result<T, PlanError>;

/// Process exit status for failures caused by the request or catalogue
pub const EXIT_CLIENT_ERROR: u8 = 2;

/// Process exit status for failures of the catalogue store itself
pub const EXIT_SERVER_ERROR: u8 = 1;

/// Why a planning run failed. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum PlanError {
    /// No eligible recipe+machine pairing for a demanded resource
    #[error("could not find recipe for '{resource}'")]
    NoRecipe { resource: String },

    /// The catalogue itself could not be read
    #[error("catalog lookup failed: {0}")]
    LookupFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("cyclic recipe chain for '{resource}': {}", .chain.join(" -> "))]
    CyclicRecipe { resource: String, chain: Vec<String> },

    #[error("production chain for '{resource}' is deeper than {limit} levels")]
    DepthExceeded { resource: String, limit: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PlanError {
    pub fn lookup<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::LookupFailure(Box::new(err))
    }

    /// True when the failure comes from the caller's input or catalogue
    /// rather than from the service itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::LookupFailure(_))
    }

    /// Exit status the command line reports for this failure
    pub fn exit_code(&self) -> u8 {
        if self.is_client_error() {
            EXIT_CLIENT_ERROR
        } else {
            EXIT_SERVER_ERROR
        }
    }
}

impl From<rusqlite::Error> for PlanError {
    fn from(err: rusqlite::Error) -> Self {
        Self::lookup(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_mapping() {
        let no_recipe = PlanError::NoRecipe {
            resource: "screw".to_string(),
        };
        assert!(no_recipe.is_client_error());
        assert!(PlanError::InvalidRequest("rate".to_string()).is_client_error());

        let lookup: PlanError = rusqlite::Error::InvalidQuery.into();
        assert!(!lookup.is_client_error());
    }

    #[test]
    fn test_exit_codes_split_client_and_server() {
        let cycle = PlanError::CyclicRecipe {
            resource: "a".to_string(),
            chain: vec!["a".to_string()],
        };
        let depth = PlanError::DepthExceeded {
            resource: "a".to_string(),
            limit: 3,
        };
        let no_recipe = PlanError::NoRecipe {
            resource: "fuel".to_string(),
        };
        assert_eq!(no_recipe.exit_code(), EXIT_CLIENT_ERROR);
        assert_eq!(cycle.exit_code(), EXIT_CLIENT_ERROR);
        assert_eq!(depth.exit_code(), EXIT_CLIENT_ERROR);

        let lookup = PlanError::lookup(std::io::Error::other("connection refused"));
        assert_eq!(lookup.exit_code(), EXIT_SERVER_ERROR);
        assert_ne!(EXIT_CLIENT_ERROR, EXIT_SERVER_ERROR);
    }

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = PlanError::CyclicRecipe {
            resource: "a".to_string(),
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "cyclic recipe chain for 'a': a -> b -> a");
    }
}
