//! Batch planning.
//!
//! Cuts a normalized identifier set into bounded, ordered batches. The plan is
//! pure data: iterating it twice yields the same batches with the same tokens.

use std::iter::Enumerate;
use std::slice::Chunks;

use dialcheck_abstraction::{BatchToken, Identifier};
use uuid::Uuid;

use crate::batch::error::BatchError;
use crate::batch::normalizer::IdentifierSet;

/// A bounded group of identifiers submitted to the resolver together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    token: BatchToken,
    identifiers: Vec<Identifier>,
}

impl Batch {
    /// Correlation token for this batch.
    pub const fn token(&self) -> BatchToken {
        self.token
    }

    /// Position of this batch within its plan.
    pub const fn index(&self) -> usize {
        self.token.index
    }

    /// Identifiers in submission order.
    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    /// Number of identifiers in the batch.
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Batches produced by a plan are never empty.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Consumes the batch, returning its identifiers.
    pub fn into_identifiers(self) -> Vec<Identifier> {
        self.identifiers
    }
}

/// A deterministic partition of an identifier set into batches.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    plan_id: Uuid,
    batch_size: usize,
    identifiers: Vec<Identifier>,
}

impl BatchPlan {
    /// Plans `identifiers` into batches of at most `batch_size`.
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidConfig`] if `batch_size` is zero.
    pub fn new(identifiers: &IdentifierSet, batch_size: usize) -> Result<Self, BatchError> {
        Self::with_plan_id(Uuid::new_v4(), identifiers, batch_size)
    }

    /// Like [`BatchPlan::new`] with a caller-chosen plan id.
    pub fn with_plan_id(
        plan_id: Uuid,
        identifiers: &IdentifierSet,
        batch_size: usize,
    ) -> Result<Self, BatchError> {
        if batch_size == 0 {
            return Err(BatchError::InvalidConfig("batch size must be at least 1".to_string()));
        }
        Ok(Self { plan_id, batch_size, identifiers: identifiers.iter().cloned().collect() })
    }

    /// Id shared by every token of this plan.
    pub const fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    /// Maximum identifiers per batch.
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total identifiers covered by the plan.
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Whether the plan covers nothing.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Number of batches the plan yields.
    pub fn batch_count(&self) -> usize {
        self.identifiers.len().div_ceil(self.batch_size)
    }

    /// All planned identifiers in traversal order.
    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    /// Lazily yields the batches in order.
    pub fn batches(&self) -> Batches<'_> {
        Batches { plan_id: self.plan_id, chunks: self.identifiers.chunks(self.batch_size).enumerate() }
    }
}

/// Iterator over a plan's batches.
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    plan_id: Uuid,
    chunks: Enumerate<Chunks<'a, Identifier>>,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, chunk) = self.chunks.next()?;
        Some(Batch { token: BatchToken::new(self.plan_id, index), identifiers: chunk.to_vec() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Batches<'_> {}
