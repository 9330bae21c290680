//! Error types for dependency injection

use crate::Key;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while registering, building or resolving
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Raw key has a shape the container does not accept
    #[error("Invalid key {key}: {reason}")]
    InvalidKey { key: Key, reason: &'static str },

    /// Explicit argument names a parameter the factory does not declare
    #[error("No parameter `{name}` in factory for {key}")]
    UnknownArgument { key: Key, name: String },

    /// Graph validation failed at build time
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Key is not registered.
    ///
    /// A container that passed `build()` only reports this for keys that were
    /// never registered at all.
    #[error("Service not found: {key}")]
    NotFound { key: Key },

    /// Attempted to override a key without any registration
    #[error("Can not override {key}: it has no registration")]
    NothingToOverride { key: Key },

    /// A factory re-entered the resolution of a key it is still building
    #[error("Circular dependency detected while resolving: {key}")]
    CircularDependency { key: Key },

    /// Resolved instance is not of the requested type
    #[error("Service {key} is not a {expected}")]
    TypeMismatch { key: Key, expected: &'static str },

    /// Factory read an argument as the wrong type
    #[error("Argument `{name}` is not a {expected}")]
    ArgumentMismatch { name: String, expected: &'static str },

    /// Factory asked for an argument it was not handed
    #[error("Missing argument `{name}` (expected {expected})")]
    MissingArgument { name: String, expected: &'static str },

    /// Factory failed to create service
    #[error("Failed to create service {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: impl Into<Key>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a CircularDependency error for a key
    #[inline]
    pub fn circular(key: impl Into<Key>) -> Self {
        Self::CircularDependency { key: key.into() }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch<T: ?Sized + 'static>(key: Key) -> Self {
        Self::TypeMismatch {
            key,
            expected: std::any::type_name::<T>(),
        }
    }

    /// The validation report, if this is a build-time graph error
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(report) => Some(report),
            _ => None,
        }
    }
}

/// One structural problem found while validating the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// A required parameter points at a key nobody registered
    MissingDependency {
        key: Key,
        required_by: Key,
        param: String,
    },
    /// Keys that (transitively) require themselves; the path ends on its first key
    Cycle { path: Vec<Key> },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::MissingDependency {
                key,
                required_by,
                param,
            } => write!(
                f,
                "No dependency of type {key} needed by {required_by} (parameter `{param}`)"
            ),
            Problem::Cycle { path } => {
                f.write_str("Cycle dependencies: ")?;
                for (i, key) in path.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" -> ")?;
                    }
                    write!(f, "{key}")?;
                }
                Ok(())
            }
        }
    }
}

/// Every problem found by one validation run, in registration order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render_problems(.problems))]
pub struct ValidationError {
    problems: Vec<Problem>,
}

impl ValidationError {
    pub(crate) fn new(problems: Vec<Problem>) -> Self {
        Self { problems }
    }

    /// All problems, in the order they were discovered
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Missing dependencies as `(missing key, registration that required it)`
    pub fn missing(&self) -> impl Iterator<Item = (&Key, &Key)> + '_ {
        self.problems.iter().filter_map(|p| match p {
            Problem::MissingDependency {
                key, required_by, ..
            } => Some((key, required_by)),
            Problem::Cycle { .. } => None,
        })
    }

    /// Discovered cycles
    pub fn cycles(&self) -> impl Iterator<Item = &[Key]> + '_ {
        self.problems.iter().filter_map(|p| match p {
            Problem::Cycle { path } => Some(path.as_slice()),
            Problem::MissingDependency { .. } => None,
        })
    }
}

fn render_problems(problems: &[Problem]) -> String {
    let mut out = format!("Container validation failed with {} problem(s)", problems.len());
    for problem in problems {
        out.push_str("\n  - ");
        out.push_str(&problem.to_string());
    }
    out
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
