//! Remote lookup abstraction for dialcheck.
//!
//! This crate defines the capability boundary between the batch resolution
//! engine and whatever contact-import service backs it. The engine only ever
//! needs two remote operations: register a batch of phone numbers (learning
//! which ones belong to accounts) and unregister the transient contacts that
//! registration created.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when constructing an [`Identifier`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The token had no digits at all.
    #[error("identifier is empty")]
    Empty,

    /// The token contained something other than ASCII digits.
    #[error("identifier contains non-digit character {0:?}")]
    NonDigit(char),
}

/// A canonical phone number, rendered as `+<digits>`.
///
/// Only digit-level validity is enforced here; the accepted length range is a
/// run-level configuration applied by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Builds an identifier from a digit string with an optional leading `+`.
    ///
    /// # Errors
    /// Returns an error if the remaining characters are empty or not all ASCII digits.
    pub fn new(raw: &str) -> Result<Self, IdentifierError> {
        let digits = raw.strip_prefix('+').unwrap_or(raw);
        if digits.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_digit()) {
            return Err(IdentifierError::NonDigit(bad));
        }
        Ok(Self(format!("+{digits}")))
    }

    /// The canonical `+<digits>` rendering.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digits without the leading marker.
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }

    /// Number of digits.
    pub fn len(&self) -> usize {
        self.0.len() - 1
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Correlates a batch submission with its rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchToken {
    /// Identifies the plan the batch was cut from.
    pub plan_id: Uuid,
    /// Zero-based position of the batch within its plan.
    pub index: usize,
}

impl BatchToken {
    /// Creates a token for batch `index` of plan `plan_id`.
    #[must_use]
    pub const fn new(plan_id: Uuid, index: usize) -> Self {
        Self { plan_id, index }
    }
}

impl fmt::Display for BatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.plan_id, self.index)
    }
}

/// Opaque reference to transient remote state created by a registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteHandle(String);

impl RemoteHandle {
    /// Wraps a remote-side id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw remote-side id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a successful registration revealed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Submitted identifiers that belong to registered accounts.
    pub found: Vec<Identifier>,
    /// Transient associations that must be released with `unregister`.
    pub handles: Vec<RemoteHandle>,
}

impl Registration {
    /// Creates a registration outcome.
    #[must_use]
    pub fn new(found: Vec<Identifier>, handles: Vec<RemoteHandle>) -> Self {
        Self { found, handles }
    }
}

/// A rate-limit rejection carrying the wait the remote side demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleSignal {
    /// Minimum time to wait before retrying.
    pub wait: Duration,
}

impl ThrottleSignal {
    /// Creates a throttle signal with the given wait.
    #[must_use]
    pub const fn new(wait: Duration) -> Self {
        Self { wait }
    }

    /// Creates a throttle signal from a wait in whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self { wait: Duration::from_secs(secs) }
    }
}

/// Errors a [`ContactResolver`] can return.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolverError {
    /// The remote side rate-limited the request; retry after the wait.
    #[error("throttled: retry after {}s", .0.wait.as_secs())]
    Throttled(ThrottleSignal),

    /// Unrecoverable failure for this request.
    #[error("remote error: {0}")]
    Fatal(String),
}

impl ResolverError {
    /// Returns the throttle signal if this error is a rate-limit rejection.
    pub fn throttle(&self) -> Option<ThrottleSignal> {
        match self {
            Self::Throttled(signal) => Some(*signal),
            Self::Fatal(_) => None,
        }
    }
}

/// Capability interface to the remote contact-lookup service.
///
/// Implementations hold an already-authenticated session. They must not apply
/// their own pacing or retries; that policy belongs to the caller.
#[async_trait]
pub trait ContactResolver: Send + Sync {
    /// Registers every identifier in the batch as a transient contact and
    /// reports which of them belong to accounts.
    ///
    /// # Errors
    /// Returns [`ResolverError::Throttled`] on rate limiting and
    /// [`ResolverError::Fatal`] on any other failure. On error no transient
    /// state is left behind.
    async fn register(
        &self,
        token: BatchToken,
        identifiers: &[Identifier],
    ) -> Result<Registration, ResolverError>;

    /// Releases the transient contacts created by an earlier `register`.
    ///
    /// Not idempotent: do not call twice for the same handles after success.
    ///
    /// # Errors
    /// Returns a [`ResolverError`] if the rollback could not be performed.
    async fn unregister(
        &self,
        token: BatchToken,
        handles: Vec<RemoteHandle>,
    ) -> Result<(), ResolverError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_accepts_plus_prefix() {
        let id = Identifier::new("+584162314157").unwrap();
        assert_eq!(id.as_str(), "+584162314157");
        assert_eq!(id.digits(), "584162314157");
        assert_eq!(id.len(), 12);
    }

    #[test]
    fn test_identifier_adds_marker() {
        let id = Identifier::new("584162314157").unwrap();
        assert_eq!(id.to_string(), "+584162314157");
    }

    #[test]
    fn test_identifier_rejects_garbage() {
        assert_eq!(Identifier::new("+"), Err(IdentifierError::Empty));
        assert_eq!(Identifier::new(""), Err(IdentifierError::Empty));
        assert_eq!(Identifier::new("12a4"), Err(IdentifierError::NonDigit('a')));
        assert_eq!(Identifier::new("++12"), Err(IdentifierError::NonDigit('+')));
    }

    #[test]
    fn test_identifier_serde_as_string() {
        let id = Identifier::new("15551234567").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"+15551234567\"");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<Identifier>("\"12x\"").is_err());
    }

    #[test]
    fn test_batch_token_display() {
        let plan = Uuid::nil();
        let token = BatchToken::new(plan, 3);
        assert_eq!(token.to_string(), format!("{plan}#3"));
    }

    #[test]
    fn test_resolver_error_throttle() {
        let err = ResolverError::Throttled(ThrottleSignal::from_secs(7));
        assert_eq!(err.throttle().unwrap().wait, Duration::from_secs(7));
        assert!(err.to_string().contains("7s"));
        assert!(ResolverError::Fatal("boom".to_string()).throttle().is_none());
    }

    struct EchoResolver;

    #[async_trait]
    impl ContactResolver for EchoResolver {
        async fn register(
            &self,
            _token: BatchToken,
            identifiers: &[Identifier],
        ) -> Result<Registration, ResolverError> {
            let handles = identifiers.iter().map(|id| RemoteHandle::new(id.digits())).collect();
            Ok(Registration::new(identifiers.to_vec(), handles))
        }

        async fn unregister(
            &self,
            _token: BatchToken,
            _handles: Vec<RemoteHandle>,
        ) -> Result<(), ResolverError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_resolver_is_object_safe() {
        let resolver: Box<dyn ContactResolver> = Box::new(EchoResolver);
        let ids = vec![Identifier::new("15551234567").unwrap()];
        let token = BatchToken::new(Uuid::new_v4(), 0);
        let registration = resolver.register(token, &ids).await.unwrap();
        assert_eq!(registration.found, ids);
        assert_eq!(registration.handles[0].as_str(), "15551234567");
        resolver.unregister(token, registration.handles).await.unwrap();
        assert_eq!(resolver.name(), "echo");
    }
}
