// src/matching/classifier.rs

use log::{debug, trace};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use crate::models::{
    AlternativeMatch, CandidateDto, Country, EntityMatched, MatchReason, MatchType,
};

/// Pool a candidate row is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchPool {
    Exact,
    Explicit,
    Fuzzy,
}

impl MatchPool {
    pub fn match_type(&self) -> MatchType {
        match self {
            MatchPool::Exact => MatchType::Exact,
            MatchPool::Explicit => MatchType::ExplicitMapping,
            MatchPool::Fuzzy => MatchType::Fuzzy,
        }
    }
}

/// Assigns a candidate to exactly one pool.
///
/// Exact needs the code to align (or no code to have been asked for) and the
/// identifier or key to align. Explicit mappings come next, anything else is
/// fuzzy.
pub fn classify(dto: &CandidateDto, code_param: Option<&str>) -> MatchPool {
    let no_code_requested = code_param.is_none_or(|c| c.trim().is_empty());
    if (dto.code_match || dto.alternative_code_match || no_code_requested)
        && (dto.identifier_match || dto.key_match)
    {
        MatchPool::Exact
    } else if dto.explicit_mapping {
        MatchPool::Explicit
    } else {
        MatchPool::Fuzzy
    }
}

/// Reasons implied by the candidate's match flags. Flags are independent, so
/// several reasons can apply at once.
pub fn match_reasons(dto: &CandidateDto) -> BTreeSet<MatchReason> {
    let mut reasons = BTreeSet::new();
    if dto.key_match {
        reasons.insert(MatchReason::KeyMatch);
    }
    if dto.code_match {
        reasons.insert(MatchReason::CodeMatch);
    }
    if dto.identifier_match {
        reasons.insert(MatchReason::IdentifierMatch);
    }
    if dto.alternative_code_match {
        reasons.insert(MatchReason::AlternativeCodeMatch);
    }
    if dto.name_match_with_code || dto.name_match_with_identifier {
        reasons.insert(MatchReason::NameMatch);
    }
    reasons
}

/// Collapses rows that describe the same entity, OR-ing their match flags.
/// Keeps the order in which keys were first seen.
pub fn merge_rows(rows: Vec<CandidateDto>) -> Vec<CandidateDto> {
    let mut merged: Vec<CandidateDto> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        match positions.get(&row.key) {
            Some(&idx) => {
                trace!("Merging repeated candidate row for {}", row.key);
                merged[idx].merge_flags(&row);
            }
            None => {
                positions.insert(row.key, merged.len());
                merged.push(row);
            }
        }
    }
    merged
}

/// A classified candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry<T> {
    pub match_type: MatchType,
    pub reasons: BTreeSet<MatchReason>,
    pub entity: T,
}

impl<T: EntityMatched> PoolEntry<T> {
    pub fn key(&self) -> Uuid {
        self.entity.key()
    }

    pub fn to_alternative(&self) -> AlternativeMatch<T> {
        AlternativeMatch {
            match_type: self.match_type,
            reasons: self.reasons.clone(),
            entity_matched: self.entity.clone(),
        }
    }
}

/// Exact, explicit-mapping and fuzzy candidates of one entity kind.
///
/// Each pool behaves as a set keyed by entity key, in insertion order.
#[derive(Debug, Clone)]
pub struct CandidatePools<T> {
    pub exact: Vec<PoolEntry<T>>,
    pub explicit: Vec<PoolEntry<T>>,
    pub fuzzy: Vec<PoolEntry<T>>,
    seen: HashSet<(MatchPool, Uuid)>,
}

impl<T> Default for CandidatePools<T> {
    fn default() -> Self {
        Self {
            exact: Vec::new(),
            explicit: Vec::new(),
            fuzzy: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<T: EntityMatched> CandidatePools<T> {
    /// Classifies every row and projects it with `to_entity`.
    ///
    /// `country` adds `COUNTRY_MATCH` to exact and fuzzy candidates located
    /// in that country. Explicit mappings carry no reasons.
    pub fn build<F>(
        rows: &[CandidateDto],
        code_param: Option<&str>,
        country: Option<&Country>,
        to_entity: F,
    ) -> Self
    where
        F: Fn(&CandidateDto) -> T,
    {
        let mut pools = Self::default();
        for dto in rows {
            let pool = classify(dto, code_param);
            let reasons = match pool {
                MatchPool::Explicit => BTreeSet::new(),
                MatchPool::Exact | MatchPool::Fuzzy => {
                    let mut reasons = match_reasons(dto);
                    if dto.matches_country(country) {
                        reasons.insert(MatchReason::CountryMatch);
                    }
                    reasons
                }
            };
            pools.insert(
                pool,
                PoolEntry {
                    match_type: pool.match_type(),
                    reasons,
                    entity: to_entity(dto),
                },
            );
        }
        debug!(
            "Classified {} candidates: {} exact, {} explicit, {} fuzzy",
            rows.len(),
            pools.exact.len(),
            pools.explicit.len(),
            pools.fuzzy.len()
        );
        pools
    }

    /// Adds an entry unless the pool already holds the same entity.
    pub fn insert(&mut self, pool: MatchPool, entry: PoolEntry<T>) -> bool {
        if !self.seen.insert((pool, entry.key())) {
            return false;
        }
        match pool {
            MatchPool::Exact => self.exact.push(entry),
            MatchPool::Explicit => self.explicit.push(entry),
            MatchPool::Fuzzy => self.fuzzy.push(entry),
        }
        true
    }

    /// Every entry except the chosen entity, exact first, then explicit, then fuzzy.
    pub fn alternatives(&self, chosen: Option<Uuid>) -> Vec<AlternativeMatch<T>> {
        self.exact
            .iter()
            .chain(self.explicit.iter())
            .chain(self.fuzzy.iter())
            .filter(|entry| Some(entry.key()) != chosen)
            .map(PoolEntry::to_alternative)
            .collect()
    }
}
