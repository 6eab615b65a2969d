//! Identifier normalization.
//!
//! Turns raw user input into a deduplicated set of canonical phone numbers.
//! Anything that does not look like a phone number is dropped silently; the
//! caller decides how to report an empty result.

use std::collections::BTreeSet;

use dialcheck_abstraction::Identifier;
use serde::{Deserialize, Serialize};

use crate::batch::error::BatchError;

/// Normalized, deduplicated identifiers for one run.
pub type IdentifierSet = BTreeSet<Identifier>;

/// Token delimiters inside a single line of free text.
const INLINE_DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Quote characters tolerated around a token.
const QUOTES: [char; 2] = ['"', '\''];

/// Inclusive range of accepted digit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthRange {
    /// Fewest digits accepted.
    pub min: usize,
    /// Most digits accepted.
    pub max: usize,
}

impl Default for LengthRange {
    fn default() -> Self {
        Self { min: 11, max: 15 }
    }
}

impl LengthRange {
    /// Creates a validated range.
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidConfig`] if `min` is zero or exceeds `max`.
    pub fn new(min: usize, max: usize) -> Result<Self, BatchError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Checks that the bounds are usable.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.min == 0 {
            return Err(BatchError::InvalidConfig(
                "identifier length minimum must be at least 1".to_string(),
            ));
        }
        if self.min > self.max {
            return Err(BatchError::InvalidConfig(format!(
                "identifier length range is empty ({}..={})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Whether `len` digits fall inside the range.
    pub fn contains(&self, len: usize) -> bool {
        (self.min..=self.max).contains(&len)
    }
}

/// Parses raw candidates into canonical identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    range: LengthRange,
}

impl Normalizer {
    /// Creates a normalizer accepting the given digit range.
    #[must_use]
    pub const fn new(range: LengthRange) -> Self {
        Self { range }
    }

    /// The accepted digit range.
    pub const fn range(&self) -> LengthRange {
        self.range
    }

    /// Normalizes a single candidate token.
    ///
    /// Surrounding quotes are dropped, whitespace anywhere in the token is
    /// removed and one leading `+` is allowed. Returns `None` for anything
    /// that is not all digits or whose length falls outside the configured
    /// range.
    pub fn normalize_token(&self, token: &str) -> Option<Identifier> {
        let unquoted = token.trim().trim_matches(QUOTES);
        let compact: String = unquoted.chars().filter(|c| !c.is_whitespace()).collect();
        let digits = compact.strip_prefix('+').unwrap_or(&compact);
        if !digits.bytes().all(|b| b.is_ascii_digit()) || !self.range.contains(digits.len()) {
            return None;
        }
        Identifier::new(digits).ok()
    }

    /// Normalizes free text: one candidate per line, with commas, semicolons
    /// and tabs also separating candidates.
    pub fn normalize_text(&self, text: &str) -> IdentifierSet {
        self.normalize_tokens(text.lines().flat_map(|line| line.split(INLINE_DELIMITERS)))
    }

    /// Normalizes tabular rows; every cell is a candidate.
    pub fn normalize_rows<I, R, S>(&self, rows: I) -> IdentifierSet
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rows.into_iter()
            .flat_map(|row| {
                row.into_iter().filter_map(|cell| self.normalize_token(cell.as_ref()))
            })
            .collect()
    }

    /// Normalizes an arbitrary stream of tokens.
    pub fn normalize_tokens<I, S>(&self, tokens: I) -> IdentifierSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens.into_iter().filter_map(|t| self.normalize_token(t.as_ref())).collect()
    }
}
