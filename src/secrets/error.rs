//! # Errors
//!
//! Error taxonomy for secret reconciliation and the two aggregation
//! strategies used by the lifecycle operations.

use thiserror::Error;

/// Boxed error from a store backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = SecretsError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SecretsError {
    /// The secret does not exist. Drives create-vs-update and is ignored on delete.
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// The entropy source or a hashing primitive failed
    #[error("failed to generate credential material: {0}")]
    Generation(String),

    /// Passwords must stay ASCII for the `$2y$` marker rewrite to be valid
    #[error("password contains non-ASCII characters")]
    NonAsciiPassword,

    /// Certificate generation or parsing failed
    #[error("certificate error: {0}")]
    Certificate(String),

    /// A required upstream secret, or a key within it, is absent
    #[error("{}", missing_source_message(.namespace, .name, .key.as_deref()))]
    MissingSource {
        namespace: String,
        name: String,
        key: Option<String>,
    },

    /// Any other read or write failure against the store
    #[error("failed to {operation} secret {namespace}/{name}: {source}")]
    Store {
        operation: &'static str,
        namespace: String,
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to set owner reference on secret {name}: {reason}")]
    OwnerReference { name: String, reason: String },

    /// Context naming the step that failed
    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<SecretsError>,
    },

    /// Every failure collected by a collect-all operation
    #[error("{}", aggregate_message(.0))]
    Aggregate(Vec<SecretsError>),
}

impl SecretsError {
    #[must_use]
    pub fn not_found(namespace: &str, name: &str) -> Self {
        Self::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn store(
        operation: &'static str,
        namespace: &str,
        name: &str,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Store {
            operation,
            namespace: namespace.to_string(),
            name: name.to_string(),
            source: source.into(),
        }
    }

    /// Wrap with the name of the step that failed
    #[must_use]
    pub fn in_step(self, step: &'static str) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_missing_source(&self) -> bool {
        match self {
            Self::MissingSource { .. } => true,
            Self::Step { source, .. } => source.is_missing_source(),
            _ => false,
        }
    }
}

fn missing_source_message(namespace: &str, name: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => format!("could not find key {key:?} in secret {namespace}/{name}"),
        None => format!("could not get secret {namespace}/{name}: not found"),
    }
}

fn aggregate_message(errors: &[SecretsError]) -> String {
    match errors {
        [single] => single.to_string(),
        errors => {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{joined}]")
        }
    }
}

/// Treat `NotFound` as success
pub fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// How a multi-step operation reacts to a failing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Stop at the first error and return it
    FailFast,
    /// Run every step and return all errors together
    CollectAll,
}

/// Applies an [`ErrorStrategy`] across the steps of one operation
///
/// ```
/// use provisioning_secrets::secrets::{ErrorCollector, ErrorStrategy, SecretsError};
///
/// let mut errors = ErrorCollector::new(ErrorStrategy::CollectAll);
/// errors.record(Err(SecretsError::Generation("a".into()))).unwrap();
/// errors.record(Ok(())).unwrap();
/// assert!(errors.finish().is_err());
/// ```
#[derive(Debug)]
pub struct ErrorCollector {
    strategy: ErrorStrategy,
    errors: Vec<SecretsError>,
}

impl ErrorCollector {
    #[must_use]
    pub fn new(strategy: ErrorStrategy) -> Self {
        Self {
            strategy,
            errors: Vec::new(),
        }
    }

    /// Record the outcome of a step.
    ///
    /// Under `FailFast` an error is handed straight back so the caller can
    /// `?` out of the operation. Under `CollectAll` it is stored and `Ok` is
    /// returned so the next step still runs.
    pub fn record(&mut self, result: Result<()>) -> Result<()> {
        match (self.strategy, result) {
            (_, Ok(())) => Ok(()),
            (ErrorStrategy::FailFast, Err(e)) => Err(e),
            (ErrorStrategy::CollectAll, Err(e)) => {
                self.errors.push(e);
                Ok(())
            }
        }
    }

    /// `Ok` when nothing was collected, otherwise an `Aggregate` of every failure
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SecretsError::Aggregate(self.errors))
        }
    }
}
