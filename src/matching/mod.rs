// src/matching/mod.rs
pub mod classifier;
pub mod collection;
pub mod identifier;
pub mod institution;
pub mod lookup;
pub mod resolver;

use crate::models::{AlternativeMatch, EntityMatched, Match};
use classifier::CandidatePools;

pub use identifier::parse_uuid;
pub use lookup::LookupService;

/// The chosen match of one entity kind plus every candidate that lost.
#[derive(Debug, Clone)]
pub struct MatchOutcome<T> {
    pub best: Match<T>,
    pub alternatives: Vec<AlternativeMatch<T>>,
}

impl<T: EntityMatched> MatchOutcome<T> {
    pub fn new(best: Match<T>, pools: &CandidatePools<T>) -> Self {
        let chosen = best.entity_matched().map(|entity| entity.key());
        let alternatives = pools.alternatives(chosen);
        Self { best, alternatives }
    }
}
