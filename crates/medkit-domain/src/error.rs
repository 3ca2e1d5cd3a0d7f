// ── Domain error types ──
//
// Every mutator, lookup and backend call resolves to `DomainError`.
// Backend failures are carried through untouched in `Backend`; the
// core never inspects or retries them.

use thiserror::Error;

use crate::join::Abandoned;

/// Boxed error reported by a backend delegate.
pub type BackendSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for the domain crate.
#[derive(Debug, Error)]
pub enum DomainError {
    // ── Backend capability ───────────────────────────────────────────
    #[error("Operation not supported: {operation}")]
    NotSupported { operation: String },

    // ── Local validation ─────────────────────────────────────────────
    #[error("Duplicate {resource}: {identifier}")]
    Duplicate {
        resource: String,
        identifier: String,
    },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Malformed {entity_type} representation: {message}")]
    MalformedRepresentation {
        entity_type: String,
        message: String,
    },

    // ── Backend passthrough ──────────────────────────────────────────
    #[error("Backend error: {0}")]
    Backend(#[source] BackendSource),

    // ── Join bookkeeping ─────────────────────────────────────────────
    #[error("Operation abandoned before reporting an outcome")]
    Abandoned,
}

impl DomainError {
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    pub fn duplicate(resource: impl Into<String>, identifier: impl ToString) -> Self {
        Self::Duplicate {
            resource: resource.into(),
            identifier: identifier.to_string(),
        }
    }

    pub fn not_found(entity_type: impl Into<String>, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }

    pub fn malformed(entity_type: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedRepresentation {
            entity_type: entity_type.into(),
            message: message.to_string(),
        }
    }

    /// Wrap an arbitrary backend failure for verbatim propagation.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<Abandoned> for DomainError {
    fn from(_: Abandoned) -> Self {
        Self::Abandoned
    }
}
