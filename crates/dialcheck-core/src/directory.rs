//! Offline resolver backed by an in-memory directory of registered numbers.
//!
//! Useful for dry runs and for exercising the executor without a remote
//! service. Every registration hands out handles that stay outstanding until
//! they are unregistered, so callers can check that nothing leaked.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dialcheck_abstraction::{
    BatchToken, ContactResolver, Identifier, Registration, RemoteHandle, ResolverError,
    ThrottleSignal,
};
use tracing::debug;

/// A call observed by a [`DirectoryResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    /// `register` for a batch of `len` identifiers.
    Register { token: BatchToken, len: usize },
    /// `unregister` of `handles` handles.
    Unregister { token: BatchToken, handles: usize },
}

#[derive(Debug, Default)]
struct Script {
    register_throttles: u32,
    unregister_throttles: u32,
    throttle_wait: Duration,
    failing_registers: HashSet<usize>,
    failing_unregisters: HashSet<usize>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    script: Script,
    outstanding: HashMap<BatchToken, Vec<RemoteHandle>>,
    calls: Vec<DirectoryCall>,
    next_handle: u64,
}

/// In-memory [`ContactResolver`].
#[derive(Debug, Default)]
pub struct DirectoryResolver {
    registered: BTreeSet<Identifier>,
    state: Mutex<DirectoryState>,
}

impl DirectoryResolver {
    /// Creates a directory in which exactly `registered` are found.
    pub fn new<I>(registered: I) -> Self
    where
        I: IntoIterator<Item = Identifier>,
    {
        Self { registered: registered.into_iter().collect(), state: Mutex::default() }
    }

    /// Throttles the first `count` registrations with `wait`.
    #[must_use]
    pub fn with_register_throttles(self, count: u32, wait: Duration) -> Self {
        {
            let mut state = self.lock();
            state.script.register_throttles = count;
            state.script.throttle_wait = wait;
        }
        self
    }

    /// Throttles the first `count` rollbacks with `wait`.
    #[must_use]
    pub fn with_unregister_throttles(self, count: u32, wait: Duration) -> Self {
        {
            let mut state = self.lock();
            state.script.unregister_throttles = count;
            state.script.throttle_wait = wait;
        }
        self
    }

    /// Fails registration of the batch at `index` fatally.
    #[must_use]
    pub fn failing_register(self, index: usize) -> Self {
        self.lock().script.failing_registers.insert(index);
        self
    }

    /// Fails the rollback of the batch at `index` fatally. Its handles stay
    /// outstanding.
    #[must_use]
    pub fn failing_unregister(self, index: usize) -> Self {
        self.lock().script.failing_unregisters.insert(index);
        self
    }

    /// Numbers this directory reports as found.
    pub fn registered(&self) -> &BTreeSet<Identifier> {
        &self.registered
    }

    /// Handles handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding.values().map(Vec::len).sum()
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.lock().calls.clone()
    }

    /// Number of `register` calls received.
    pub fn register_calls(&self) -> usize {
        self.lock().calls.iter().filter(|c| matches!(c, DirectoryCall::Register { .. })).count()
    }

    /// Number of `unregister` calls received.
    pub fn unregister_calls(&self) -> usize {
        self.lock().calls.iter().filter(|c| matches!(c, DirectoryCall::Unregister { .. })).count()
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ContactResolver for DirectoryResolver {
    async fn register(
        &self,
        token: BatchToken,
        identifiers: &[Identifier],
    ) -> Result<Registration, ResolverError> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::Register { token, len: identifiers.len() });

        if state.script.register_throttles > 0 {
            state.script.register_throttles -= 1;
            debug!(batch_token = %token, "Directory throttling registration");
            return Err(ResolverError::Throttled(ThrottleSignal::new(state.script.throttle_wait)));
        }
        if state.script.failing_registers.contains(&token.index) {
            return Err(ResolverError::Fatal(format!("registration rejected for batch {}", token.index)));
        }
        if state.outstanding.contains_key(&token) {
            return Err(ResolverError::Fatal(format!("batch {token} is already registered")));
        }

        let mut handles = Vec::with_capacity(identifiers.len());
        for _ in identifiers {
            state.next_handle += 1;
            handles.push(RemoteHandle::new(format!("contact-{}", state.next_handle)));
        }
        state.outstanding.insert(token, handles.clone());

        let found: Vec<Identifier> =
            identifiers.iter().filter(|id| self.registered.contains(*id)).cloned().collect();
        debug!(
            batch_token = %token,
            batch_len = identifiers.len(),
            found = found.len(),
            "Directory registered batch"
        );
        Ok(Registration::new(found, handles))
    }

    async fn unregister(
        &self,
        token: BatchToken,
        handles: Vec<RemoteHandle>,
    ) -> Result<(), ResolverError> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::Unregister { token, handles: handles.len() });

        if state.script.unregister_throttles > 0 {
            state.script.unregister_throttles -= 1;
            debug!(batch_token = %token, "Directory throttling rollback");
            return Err(ResolverError::Throttled(ThrottleSignal::new(state.script.throttle_wait)));
        }
        if state.script.failing_unregisters.contains(&token.index) {
            return Err(ResolverError::Fatal(format!("rollback rejected for batch {}", token.index)));
        }

        let held = state.outstanding.get(&token).is_some_and(|held| *held == handles);
        if !held {
            return Err(ResolverError::Fatal(format!("unknown handles for batch {token}")));
        }
        state.outstanding.remove(&token);
        debug!(batch_token = %token, handles = handles.len(), "Directory released batch");
        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn id(value: &str) -> Identifier {
        Identifier::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_register_reports_registered_numbers() {
        let directory = DirectoryResolver::new([id("15551234567")]);
        let token = BatchToken::new(Uuid::new_v4(), 0);

        let registration =
            directory.register(token, &[id("15551234567"), id("15557654321")]).await.unwrap();

        assert_eq!(registration.found, vec![id("15551234567")]);
        assert_eq!(registration.handles.len(), 2);
        assert_eq!(directory.outstanding(), 2);

        directory.unregister(token, registration.handles).await.unwrap();
        assert_eq!(directory.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_unregister_is_not_idempotent() {
        let directory = DirectoryResolver::default();
        let token = BatchToken::new(Uuid::new_v4(), 0);
        let registration = directory.register(token, &[id("15551234567")]).await.unwrap();

        directory.unregister(token, registration.handles.clone()).await.unwrap();
        let second = directory.unregister(token, registration.handles).await;
        assert!(matches!(second, Err(ResolverError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_scripted_throttles_then_success() {
        let directory =
            DirectoryResolver::default().with_register_throttles(2, Duration::from_secs(3));
        let token = BatchToken::new(Uuid::new_v4(), 0);

        for _ in 0..2 {
            let err = directory.register(token, &[id("15551234567")]).await.unwrap_err();
            assert_eq!(err.throttle(), Some(ThrottleSignal::from_secs(3)));
        }
        assert!(directory.register(token, &[id("15551234567")]).await.is_ok());
        assert_eq!(directory.register_calls(), 3);
    }

    #[tokio::test]
    async fn test_failing_unregister_leaves_handles_outstanding() {
        let directory = DirectoryResolver::default().failing_unregister(0);
        let token = BatchToken::new(Uuid::new_v4(), 0);
        let registration = directory.register(token, &[id("15551234567")]).await.unwrap();

        assert!(directory.unregister(token, registration.handles).await.is_err());
        assert_eq!(directory.outstanding(), 1);
        assert_eq!(directory.unregister_calls(), 1);
    }
}
