//! Shared test utilities for dialcheck-core integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use dialcheck_core::{
    BatchToken, ContactResolver, Identifier, IdentifierSet, Registration, RemoteHandle,
    ResolverError, ThrottleSignal,
};
use tokio::time::Instant;

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `count` distinct valid identifiers, `+1555000NNNN`.
pub fn identifiers(count: usize) -> IdentifierSet {
    (0..count).map(|i| Identifier::new(&format!("1555000{:04}", i)).unwrap()).collect()
}

/// Parses a list of numbers that are known to be valid.
pub fn ids(values: &[&str]) -> IdentifierSet {
    values.iter().map(|v| Identifier::new(v).unwrap()).collect()
}

/// One call observed by [`ScriptedResolver`], stamped with virtual time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Register { index: usize, at: Instant },
    Unregister { index: usize, handles: usize, at: Instant },
}

impl Event {
    pub fn at(&self) -> Instant {
        match self {
            Self::Register { at, .. } | Self::Unregister { at, .. } => *at,
        }
    }
}

/// Resolver that replays queued outcomes and otherwise reports every odd
/// identifier (by position in the batch) as found.
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    registers: Mutex<VecDeque<Result<(), ResolverError>>>,
    unregisters: Mutex<VecDeque<Result<(), ResolverError>>>,
    events: Mutex<Vec<Event>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes for successive `register` calls.
    pub fn with_registers(self, outcomes: Vec<Result<(), ResolverError>>) -> Self {
        self.registers.lock().unwrap().extend(outcomes);
        self
    }

    /// Queues outcomes for successive `unregister` calls.
    pub fn with_unregisters(self, outcomes: Vec<Result<(), ResolverError>>) -> Self {
        self.unregisters.lock().unwrap().extend(outcomes);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn register_count(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, Event::Register { .. })).count()
    }

    pub fn unregister_count(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, Event::Unregister { .. })).count()
    }
}

pub fn throttled(secs: u64) -> Result<(), ResolverError> {
    Err(ResolverError::Throttled(ThrottleSignal::from_secs(secs)))
}

pub fn fatal(message: &str) -> Result<(), ResolverError> {
    Err(ResolverError::Fatal(message.to_string()))
}

#[async_trait]
impl ContactResolver for ScriptedResolver {
    async fn register(
        &self,
        token: BatchToken,
        identifiers: &[Identifier],
    ) -> Result<Registration, ResolverError> {
        self.events.lock().unwrap().push(Event::Register { index: token.index, at: Instant::now() });
        if let Some(Err(e)) = self.registers.lock().unwrap().pop_front() {
            return Err(e);
        }
        let found = identifiers.iter().skip(1).step_by(2).cloned().collect();
        let handles = identifiers.iter().map(|id| RemoteHandle::new(id.digits())).collect();
        Ok(Registration::new(found, handles))
    }

    async fn unregister(
        &self,
        token: BatchToken,
        handles: Vec<RemoteHandle>,
    ) -> Result<(), ResolverError> {
        self.events.lock().unwrap().push(Event::Unregister {
            index: token.index,
            handles: handles.len(),
            at: Instant::now(),
        });
        match self.unregisters.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
