//! Resolver sessions.
//!
//! A session owns one resolver connection and lets at most one run use it at
//! a time. Cloning a session shares the connection and its gate.

use std::sync::Arc;

use dialcheck_abstraction::ContactResolver;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::batch::{normalize_all, BatchExecutor, BatchPlan, ProgressCallback, RawInput, RunResult};
use crate::config::ResolutionConfig;
use crate::error::{DialcheckError, Result};

/// Everything one run needs besides the resolver.
#[derive(Clone)]
pub struct RunRequest {
    inputs: Vec<RawInput>,
    resolution: ResolutionConfig,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRequest")
            .field("inputs", &self.inputs.len())
            .field("resolution", &self.resolution)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl RunRequest {
    /// Creates a request over `inputs` with the given settings.
    pub fn new(inputs: Vec<RawInput>, resolution: ResolutionConfig) -> Self {
        Self { inputs, resolution, cancel: CancellationToken::new(), progress: None }
    }

    /// Uses `token` to cancel the run between batches.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Reports progress after every batch.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Settings for this run.
    pub fn resolution(&self) -> &ResolutionConfig {
        &self.resolution
    }
}

/// One authenticated resolver shared by sequential runs.
#[derive(Clone)]
pub struct ResolverSession {
    name: String,
    resolver: Arc<dyn ContactResolver>,
    gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for ResolverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverSession")
            .field("name", &self.name)
            .field("resolver", &self.resolver.name())
            .finish_non_exhaustive()
    }
}

impl ResolverSession {
    /// Wraps `resolver` in a new session.
    pub fn new(name: impl Into<String>, resolver: Arc<dyn ContactResolver>) -> Self {
        Self { name: name.into(), resolver, gate: Arc::new(Mutex::new(())) }
    }

    /// Session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a run currently holds the session.
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Runs `request`, waiting for any run already using this session.
    pub async fn run(&self, request: RunRequest) -> Result<RunResult> {
        let (plan, executor) = self.prepare(&request)?;
        debug!(session = %self.name, "Waiting for resolver session");
        let _guard = self.gate.lock().await;
        Ok(self.execute(&plan, &executor).await)
    }

    /// Runs `request`, failing with [`DialcheckError::SessionBusy`] if the
    /// session is in use.
    pub async fn try_run(&self, request: RunRequest) -> Result<RunResult> {
        let _guard =
            self.gate.try_lock().map_err(|_| DialcheckError::SessionBusy(self.name.clone()))?;
        let (plan, executor) = self.prepare(&request)?;
        Ok(self.execute(&plan, &executor).await)
    }

    /// Validates and normalizes before anything touches the resolver.
    fn prepare(&self, request: &RunRequest) -> Result<(BatchPlan, BatchExecutor)> {
        request.resolution.validate()?;

        let identifiers = normalize_all(&request.inputs, &request.resolution.normalizer());
        if identifiers.is_empty() {
            return Err(DialcheckError::NoValidIdentifiers);
        }

        let plan = BatchPlan::new(&identifiers, request.resolution.batch_size)?;
        let mut executor = BatchExecutor::new(Arc::clone(&self.resolver), request.resolution.pacing())
            .with_cancellation(request.cancel.clone());
        if let Some(callback) = &request.progress {
            executor = executor.with_progress(Arc::clone(callback));
        }
        Ok((plan, executor))
    }

    async fn execute(&self, plan: &BatchPlan, executor: &BatchExecutor) -> RunResult {
        info!(session = %self.name, plan_id = %plan.plan_id(), "Resolver session acquired");
        executor.execute(plan).await
    }
}
