// src/matching/collection.rs

use log::debug;
use uuid::Uuid;

use crate::config::MatcherConfig;
use crate::matching::MatchOutcome;
use crate::matching::classifier::{CandidatePools, PoolEntry};
use crate::matching::resolver::choose_accepted;
use crate::models::{CandidateDto, CollectionMatched, EntityKind, LookupParams, MatchStatus};

pub struct CollectionMatcher<'a> {
    config: &'a MatcherConfig,
}

impl<'a> CollectionMatcher<'a> {
    pub fn new(config: &'a MatcherConfig) -> Self {
        Self { config }
    }

    pub fn to_entity_matched(&self, dto: &CandidateDto) -> CollectionMatched {
        CollectionMatched {
            key: dto.key,
            self_link: EntityKind::Collection.self_link(&self.config.api_base_url, dto.key),
            name: dto.name.clone(),
            code: dto.code.clone(),
            active: dto.active,
            institution_key: dto.institution_key,
            institution_code: dto.institution_code.clone(),
            institution_name: dto.institution_name.clone(),
        }
    }

    /// Chooses the collection among the (merged) candidate rows.
    ///
    /// `institution_key` is the institution already matched for the same
    /// record; fuzzy candidates owned by another institution are dropped.
    pub fn match_collection(
        &self,
        rows: &[CandidateDto],
        params: &LookupParams,
        institution_key: Option<Uuid>,
    ) -> MatchOutcome<CollectionMatched> {
        let pools = CandidatePools::build(
            rows,
            params.collection_code.as_deref(),
            params.country.as_ref(),
            |dto| self.to_entity_matched(dto),
        );

        let institution_filter = |entry: &PoolEntry<CollectionMatched>| {
            belongs_to(&entry.entity, institution_key)
        };

        let best = choose_accepted(
            &pools,
            None,
            Some(&institution_filter),
            MatchStatus::Ambiguous,
        );
        debug!(
            "Collection match for code={:?} id={:?} (institution {:?}): {:?}",
            params.collection_code,
            params.collection_id,
            institution_key,
            best.status()
        );
        MatchOutcome::new(best, &pools)
    }
}

// collections without a recorded owner are compatible with any institution
fn belongs_to(collection: &CollectionMatched, institution_key: Option<Uuid>) -> bool {
    match (institution_key, collection.institution_key) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, institution_key: Option<Uuid>) -> CandidateDto {
        CandidateDto {
            key: Uuid::new_v4(),
            code: Some(code.to_string()),
            active: true,
            institution_key,
            code_match: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_fuzzy_collections_of_other_institutions_are_dropped() {
        let config = MatcherConfig::default();
        let matcher = CollectionMatcher::new(&config);
        let institution = Uuid::new_v4();
        let own = row("C1", Some(institution));
        let foreign = row("C1", Some(Uuid::new_v4()));
        let params = LookupParams {
            collection_code: Some("C1".to_string()),
            ..Default::default()
        };

        let outcome = matcher.match_collection(&[own.clone(), foreign.clone()], &params, Some(institution));
        assert_eq!(outcome.best.status(), MatchStatus::Doubtful);
        assert_eq!(outcome.best.entity_matched().map(|c| c.key), Some(own.key));
        // the dropped candidate is still reported
        assert_eq!(outcome.alternatives.len(), 1);
        assert_eq!(outcome.alternatives[0].entity_matched.key, foreign.key);

        let outcome = matcher.match_collection(&[own, foreign], &params, None);
        assert_eq!(outcome.best.status(), MatchStatus::Ambiguous);
        assert_eq!(outcome.alternatives.len(), 2);
    }

    #[test]
    fn test_no_matching_owner_gives_ambiguous() {
        let config = MatcherConfig::default();
        let matcher = CollectionMatcher::new(&config);
        let foreign = row("C1", Some(Uuid::new_v4()));
        let params = LookupParams {
            collection_code: Some("C1".to_string()),
            ..Default::default()
        };
        let outcome = matcher.match_collection(&[foreign], &params, Some(Uuid::new_v4()));
        assert_eq!(outcome.best.status(), MatchStatus::Ambiguous);
        assert!(outcome.best.entity_matched().is_none());
    }

    #[test]
    fn test_projection_carries_institution() {
        let config = MatcherConfig::default();
        let matcher = CollectionMatcher::new(&config);
        let mut dto = row("C1", Some(Uuid::new_v4()));
        dto.institution_code = Some("I1".to_string());
        let matched = matcher.to_entity_matched(&dto);
        assert_eq!(matched.institution_key, dto.institution_key);
        assert_eq!(matched.institution_code.as_deref(), Some("I1"));
        assert!(matched.self_link.ends_with(&format!("grscicoll/collection/{}", dto.key)));
    }
}
