// src/matching/institution.rs

use log::debug;
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::MatcherConfig;
use crate::matching::MatchOutcome;
use crate::matching::classifier::{CandidatePools, PoolEntry};
use crate::matching::resolver::choose_accepted;
use crate::models::{CandidateDto, EntityKind, InstitutionMatched, LookupParams, MatchStatus};

pub struct InstitutionMatcher<'a> {
    config: &'a MatcherConfig,
}

impl<'a> InstitutionMatcher<'a> {
    pub fn new(config: &'a MatcherConfig) -> Self {
        Self { config }
    }

    pub fn to_entity_matched(&self, dto: &CandidateDto) -> InstitutionMatched {
        InstitutionMatched {
            key: dto.key,
            self_link: EntityKind::Institution.self_link(&self.config.api_base_url, dto.key),
            name: dto.name.clone(),
            code: dto.code.clone(),
            active: dto.active,
        }
    }

    /// Chooses the institution among the (merged) candidate rows.
    ///
    /// When the record names an owner institution different from the
    /// institution code, fuzzy candidates must carry the owner code to stay in
    /// the running.
    pub fn match_institution(
        &self,
        rows: &[CandidateDto],
        params: &LookupParams,
    ) -> MatchOutcome<InstitutionMatched> {
        let pools = CandidatePools::build(
            rows,
            params.institution_code.as_deref(),
            params.country.as_ref(),
            |dto| self.to_entity_matched(dto),
        );

        let owner_keys = owner_filter_keys(rows, params);
        let owner_filter = |entry: &PoolEntry<InstitutionMatched>| {
            owner_keys
                .as_ref()
                .is_none_or(|keys| keys.contains(&entry.key()))
        };

        let best = choose_accepted(&pools, None, Some(&owner_filter), MatchStatus::Ambiguous);
        debug!(
            "Institution match for code={:?} id={:?}: {:?}",
            params.institution_code,
            params.institution_id,
            best.status()
        );
        MatchOutcome::new(best, &pools)
    }
}

/// Keys of the candidates compatible with the owner institution code, or
/// `None` when the owner code puts no constraint on the match.
fn owner_filter_keys(rows: &[CandidateDto], params: &LookupParams) -> Option<HashSet<Uuid>> {
    let owner = params
        .owner_institution_code
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())?;
    let same_as_code = params
        .institution_code
        .as_deref()
        .is_some_and(|code| code.trim().eq_ignore_ascii_case(owner));
    if same_as_code {
        return None;
    }
    Some(
        rows.iter()
            .filter(|dto| dto.has_code(owner))
            .map(|dto| dto.key)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchReason, MatchType};

    fn config() -> MatcherConfig {
        MatcherConfig::new("http://localhost/v1/").unwrap()
    }

    fn row(code: &str) -> CandidateDto {
        CandidateDto {
            key: Uuid::new_v4(),
            code: Some(code.to_string()),
            active: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_projection_has_self_link() {
        let config = config();
        let matcher = InstitutionMatcher::new(&config);
        let dto = row("I1");
        let matched = matcher.to_entity_matched(&dto);
        assert_eq!(
            matched.self_link,
            format!("http://localhost/v1/grscicoll/institution/{}", dto.key)
        );
        assert_eq!(matched.code.as_deref(), Some("I1"));
    }

    #[test]
    fn test_country_breaks_exact_tie() {
        let config = config();
        let matcher = InstitutionMatcher::new(&config);
        let mut a = row("I1");
        a.code_match = true;
        a.identifier_match = true;
        let mut b = a.clone();
        b.key = Uuid::new_v4();
        b.address_country = Some("DK".parse().unwrap());

        let params = LookupParams {
            institution_code: Some("I1".to_string()),
            institution_id: Some("id".to_string()),
            country: Some("DK".parse().unwrap()),
            ..Default::default()
        };
        let outcome = matcher.match_institution(&[a.clone(), b.clone()], &params);
        assert_eq!(outcome.best.status(), MatchStatus::Accepted);
        assert_eq!(outcome.best.entity_matched().map(|e| e.key), Some(b.key));
        assert!(outcome.best.reasons().contains(&MatchReason::CountryMatch));
        assert_eq!(outcome.alternatives.len(), 1);
        assert_eq!(outcome.alternatives[0].entity_matched.key, a.key);
        assert_eq!(outcome.alternatives[0].match_type, MatchType::Exact);
    }

    #[test]
    fn test_owner_code_filters_fuzzy_candidates() {
        let config = config();
        let matcher = InstitutionMatcher::new(&config);
        let mut owner = row("OWN");
        owner.name_match_with_code = true;
        let mut other = row("XX");
        other.name_match_with_code = true;

        let params = LookupParams {
            institution_code: Some("I1".to_string()),
            owner_institution_code: Some("own".to_string()),
            ..Default::default()
        };
        let outcome = matcher.match_institution(&[owner.clone(), other.clone()], &params);
        assert_eq!(outcome.best.status(), MatchStatus::Doubtful);
        assert_eq!(outcome.best.entity_matched().map(|e| e.key), Some(owner.key));

        // nobody carries the owner code
        let outcome = matcher.match_institution(&[other], &params);
        assert_eq!(outcome.best.status(), MatchStatus::Ambiguous);
        assert!(outcome.best.entity_matched().is_none());
    }

    #[test]
    fn test_owner_code_equal_to_code_is_ignored() {
        let rows = vec![row("I1")];
        let params = LookupParams {
            institution_code: Some("I1".to_string()),
            owner_institution_code: Some(" i1 ".to_string()),
            ..Default::default()
        };
        assert!(owner_filter_keys(&rows, &params).is_none());

        let params = LookupParams {
            institution_code: Some("I1".to_string()),
            ..Default::default()
        };
        assert!(owner_filter_keys(&rows, &params).is_none());
    }
}
