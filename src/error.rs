//! Error types for the object cache.
//!
//! ## Key Components
//!
//! - [`PinError`]: Returned by [`ObjectCache::pin`](crate::cache::ObjectCache::pin)
//!   when the caller's factory fails. Wraps the factory's own error type so the
//!   original failure reaches the caller unchanged.
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. a zero byte budget).
//! - [`InvariantError`]: Returned by
//!   [`ObjectCache::check_invariants`](crate::cache::ObjectCache::check_invariants)
//!   when registry bookkeeping is inconsistent.
//!
//! Contract violations by a client (unpinning past zero, `discard_all` while
//! entries are pinned) are not represented here. They panic.
//!
//! ## Example Usage
//!
//! ```
//! use pincache::builder::ObjectCacheBuilder;
//!
//! let bad = ObjectCacheBuilder::new(0).try_build::<String, u64>();
//! assert!(bad.is_err());
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// PinError
// ---------------------------------------------------------------------------

/// Failure of a single `pin` attempt.
///
/// The registry is always left consistent when this is returned: no entry is
/// added for a failed construction and no weight is charged.
#[derive(Error, Debug)]
pub enum PinError<E> {
    /// The factory failed while building a new value.
    #[error("cached object construction failed")]
    Construction(#[source] E),

    /// The factory failed while judging whether a cached value is stale.
    ///
    /// The entry is treated as fresh and stays cached; the pin is abandoned.
    #[error("staleness check on cached object failed")]
    StalenessCheck(#[source] E),
}

impl<E> PinError<E> {
    /// Returns the factory's error, discarding which phase produced it.
    pub fn into_inner(self) -> E {
        match self {
            PinError::Construction(err) | PinError::StalenessCheck(err) => err,
        }
    }

    /// Borrows the factory's error.
    pub fn inner(&self) -> &E {
        match self {
            PinError::Construction(err) | PinError::StalenessCheck(err) => err,
        }
    }

    pub fn is_construction(&self) -> bool {
        matches!(self, PinError::Construction(_))
    }

    pub fn is_staleness_check(&self) -> bool {
        matches!(self, PinError::StalenessCheck(_))
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct InvariantError {
    message: String,
}

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`ObjectCacheBuilder::try_build`](crate::builder::ObjectCacheBuilder::try_build).
///
/// # Example
///
/// ```
/// use pincache::builder::ObjectCacheBuilder;
///
/// let err = ObjectCacheBuilder::new(0).try_build::<u64, u64>().unwrap_err();
/// assert!(err.to_string().contains("bytes_max"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Error, Debug, PartialEq)]
    #[error("flat tire")]
    struct FlatTire;

    // -- PinError ---------------------------------------------------------

    #[test]
    fn pin_error_exposes_source() {
        let err: PinError<FlatTire> = PinError::Construction(FlatTire);
        assert_eq!(err.to_string(), "cached object construction failed");
        let source = err.source().expect("construction error has a source");
        assert_eq!(source.to_string(), "flat tire");
    }

    #[test]
    fn pin_error_phase_predicates() {
        let built: PinError<FlatTire> = PinError::Construction(FlatTire);
        let checked: PinError<FlatTire> = PinError::StalenessCheck(FlatTire);
        assert!(built.is_construction());
        assert!(!built.is_staleness_check());
        assert!(checked.is_staleness_check());
        assert_eq!(checked.inner(), &FlatTire);
        assert_eq!(checked.into_inner(), FlatTire);
    }

    #[test]
    fn pin_error_with_non_error_payload_still_usable() {
        let err: PinError<&'static str> = PinError::Construction("no cars left");
        assert_eq!(err.into_inner(), "no cars left");
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("weight mismatch");
        assert_eq!(err.to_string(), "weight mismatch");
        assert_eq!(err.message(), "weight mismatch");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        assert_eq!(a.clone(), a);
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("bytes_max must be > 0");
        assert_eq!(err.to_string(), "bytes_max must be > 0");
        assert_eq!(err.message(), "bytes_max must be > 0");
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
        assert_error::<InvariantError>();
        assert_error::<PinError<FlatTire>>();
    }
}
