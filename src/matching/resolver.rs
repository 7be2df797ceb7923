// src/matching/resolver.rs

use log::debug;

use crate::matching::classifier::{CandidatePools, PoolEntry};
use crate::models::{EntityMatched, Match, MatchReason, MatchStatus};

/// Keep-predicate applied to a pool before disambiguation.
pub type MatchFilter<'a, T> = &'a dyn Fn(&PoolEntry<T>) -> bool;

type Disambiguator<T> = fn(&PoolEntry<T>) -> bool;

/// Picks the accepted (or doubtful) match out of the candidate pools.
///
/// Exact candidates dominate explicit mappings, which dominate fuzzy ones; a
/// lower pool is only consulted when every higher one is empty. Exact and
/// explicit picks are `ACCEPTED`, fuzzy picks are only ever `DOUBTFUL`.
/// `filter_status` is returned when a filter leaves nothing to choose from.
pub fn choose_accepted<T: EntityMatched>(
    pools: &CandidatePools<T>,
    exact_filter: Option<MatchFilter<'_, T>>,
    fuzzy_filter: Option<MatchFilter<'_, T>>,
    filter_status: MatchStatus,
) -> Match<T> {
    if !pools.exact.is_empty() {
        let filtered = filter_pool(&pools.exact, exact_filter);
        if filtered.is_empty() {
            debug!("Exact candidates all filtered out");
            return Match::none_with_status(filter_status);
        }

        let disambiguators: [Disambiguator<T>; 2] = [is_country_match, is_active_match];
        return match find_unique_match(&filtered, &disambiguators) {
            Some(entry) => Match::accepted(
                entry.match_type,
                entry.reasons.clone(),
                entry.entity.clone(),
            ),
            None => {
                debug!("{} exact candidates, none unique", filtered.len());
                Match::none_with_status(MatchStatus::Ambiguous)
            }
        };
    }

    if !pools.explicit.is_empty() {
        if let [entry] = pools.explicit.as_slice() {
            return Match::accepted(entry.match_type, entry.reasons.clone(), entry.entity.clone());
        }
        debug!("{} explicit mappings found", pools.explicit.len());
        return Match::none_with_status(MatchStatus::AmbiguousExplicitMappings);
    }

    if !pools.fuzzy.is_empty() {
        let filtered = filter_pool(&pools.fuzzy, fuzzy_filter);
        if filtered.is_empty() {
            debug!("Fuzzy candidates all filtered out");
            return Match::none_with_status(filter_status);
        }

        let disambiguators: [Disambiguator<T>; 5] = [
            is_identifier_match,
            is_multiple_fields_match,
            is_country_match,
            is_active_match,
            is_code_match,
        ];
        return match find_unique_match(&filtered, &disambiguators) {
            Some(entry) => Match::doubtful(
                entry.match_type,
                entry.reasons.clone(),
                entry.entity.clone(),
            ),
            None => {
                debug!("{} fuzzy candidates, none unique", filtered.len());
                Match::none_with_status(MatchStatus::Ambiguous)
            }
        };
    }

    Match::none()
}

fn filter_pool<'p, T>(
    pool: &'p [PoolEntry<T>],
    filter: Option<MatchFilter<'_, T>>,
) -> Vec<&'p PoolEntry<T>> {
    match filter {
        Some(keep) => pool.iter().filter(|entry| keep(*entry)).collect(),
        None => pool.iter().collect(),
    }
}

/// A lone candidate wins outright. Otherwise each disambiguator is tried in
/// order and the first one that isolates exactly one candidate wins.
fn find_unique_match<'p, T>(
    entries: &[&'p PoolEntry<T>],
    disambiguators: &[Disambiguator<T>],
) -> Option<&'p PoolEntry<T>> {
    if let [entry] = entries {
        return Some(*entry);
    }

    for disambiguator in disambiguators {
        let mut found = entries.iter().filter(|entry| disambiguator(**entry));
        if let (Some(entry), None) = (found.next(), found.next()) {
            return Some(*entry);
        }
    }
    None
}

fn is_identifier_match<T>(entry: &PoolEntry<T>) -> bool {
    entry.reasons.contains(&MatchReason::IdentifierMatch)
        || entry.reasons.contains(&MatchReason::KeyMatch)
}

// code or id plus one of the weaker fields
fn is_multiple_fields_match<T>(entry: &PoolEntry<T>) -> bool {
    let reasons = &entry.reasons;
    (reasons.contains(&MatchReason::CodeMatch)
        || reasons.contains(&MatchReason::IdentifierMatch)
        || reasons.contains(&MatchReason::KeyMatch))
        && (reasons.contains(&MatchReason::NameMatch)
            || reasons.contains(&MatchReason::AlternativeCodeMatch))
}

fn is_country_match<T>(entry: &PoolEntry<T>) -> bool {
    entry.reasons.contains(&MatchReason::CountryMatch)
}

fn is_active_match<T: EntityMatched>(entry: &PoolEntry<T>) -> bool {
    entry.entity.is_active()
}

fn is_code_match<T>(entry: &PoolEntry<T>) -> bool {
    entry.reasons.contains(&MatchReason::CodeMatch)
}
