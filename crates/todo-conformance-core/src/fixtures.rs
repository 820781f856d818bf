// crates/todo-conformance-core/src/fixtures.rs
// ============================================================================
// Module: Test Data Fixtures
// Description: Seeded generator for todo payloads and missing-resource ids.
// Purpose: Produce reproducible random data for scenarios.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Scenarios need alphabetic strings of exact lengths, full-length drafts, and
//! ids that are unlikely to exist. A [`TodoFactory`] is seeded once per
//! session so a run can be replayed with the same data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::RangeInclusive;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::resource::TodoDraft;
use crate::resource::TodoLimits;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters used for alphabetic strings.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Range drawn from for ids that should not exist.
pub const MISSING_ID_RANGE: RangeInclusive<u64> = 100 ..= 200;

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Seeded generator for scenario data.
#[derive(Debug, Clone)]
pub struct TodoFactory {
    /// Random source.
    rng: StdRng,
}

impl TodoFactory {
    /// Creates a factory seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a factory with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns a random string of `len` ASCII letters.
    pub fn alpha(&mut self, len: usize) -> String {
        (0 .. len)
            .map(|_| char::from(ALPHABET[self.rng.gen_range(0 .. ALPHABET.len())]))
            .collect()
    }

    /// Returns a random string of `len` lowercase ASCII letters.
    pub fn lower_alpha(&mut self, len: usize) -> String {
        self.alpha(len).to_ascii_lowercase()
    }

    /// Returns a draft whose title and description are at their maximum lengths.
    pub fn draft(&mut self, limits: &TodoLimits) -> TodoDraft {
        TodoDraft {
            title: self.alpha(limits.max_title_chars),
            description: self.alpha(limits.max_description_chars),
            done_status: true,
        }
    }

    /// Returns a candidate id from [`MISSING_ID_RANGE`].
    pub fn candidate_missing_id(&mut self) -> u64 {
        self.rng.gen_range(MISSING_ID_RANGE)
    }
}
