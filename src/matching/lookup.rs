// src/matching/lookup.rs

use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;
use uuid::Uuid;

use crate::config::MatcherConfig;
use crate::matching::classifier::merge_rows;
use crate::matching::collection::CollectionMatcher;
use crate::matching::identifier::parse_uuid;
use crate::matching::institution::InstitutionMatcher;
use crate::models::{
    AlternativeMatches, CandidateDto, EntityKind, LookupParams, LookupResult, MatchStatus,
};
use crate::store::{CandidateQuery, LookupStore};

/// Matches occurrence-level institution/collection fields against the registry.
pub struct LookupService<S> {
    store: S,
    config: MatcherConfig,
}

impl<S: LookupStore> LookupService<S> {
    pub fn new(store: S, config: MatcherConfig) -> Self {
        Self { store, config }
    }

    /// Runs the institution match, then the collection match constrained by
    /// the institution that was found.
    ///
    /// Alternatives are reported when `verbose` is set, and for any entity
    /// kind whose match was not `ACCEPTED`.
    pub async fn lookup(&self, params: &LookupParams) -> Result<LookupResult> {
        let start_time = Instant::now();

        let institution_rows = self
            .fetch_candidates(
                EntityKind::Institution,
                params.institution_code.as_deref(),
                params.institution_id.as_deref(),
                params.dataset_key,
            )
            .await?;
        let institution = InstitutionMatcher::new(&self.config)
            .match_institution(&institution_rows, params);

        let collection_rows = self
            .fetch_candidates(
                EntityKind::Collection,
                params.collection_code.as_deref(),
                params.collection_id.as_deref(),
                params.dataset_key,
            )
            .await?;
        let institution_key = institution.best.entity_matched().map(|i| i.key);
        let collection = CollectionMatcher::new(&self.config).match_collection(
            &collection_rows,
            params,
            institution_key,
        );

        let mut alternative_matches = AlternativeMatches::default();
        if params.verbose || institution.best.status() != MatchStatus::Accepted {
            alternative_matches.institution_matches = institution.alternatives;
        }
        if params.verbose || collection.best.status() != MatchStatus::Accepted {
            alternative_matches.collection_matches = collection.alternatives;
        }

        info!(
            "Lookup done in {:.2?}: institution {:?}, collection {:?}",
            start_time.elapsed(),
            institution.best.status(),
            collection.best.status()
        );

        Ok(LookupResult {
            institution_match: institution.best,
            collection_match: collection.best,
            alternative_matches,
        })
    }

    /// Candidate rows for one entity kind, merged per entity. Nothing is
    /// fetched when neither a code nor an identifier was given.
    async fn fetch_candidates(
        &self,
        kind: EntityKind,
        code: Option<&str>,
        identifier: Option<&str>,
        dataset_key: Option<Uuid>,
    ) -> Result<Vec<CandidateDto>> {
        let code = clean_string(code);
        let identifier = clean_string(identifier);
        if code.is_none() && identifier.is_none() {
            debug!("No code or identifier for {}, skipping candidate fetch", kind);
            return Ok(Vec::new());
        }

        let query = CandidateQuery {
            key: identifier.as_deref().and_then(parse_uuid),
            code,
            identifier,
            dataset_key,
        };
        let rows = self
            .store
            .lookup(kind, &query)
            .await
            .with_context(|| format!("Failed to fetch {} candidates", kind))?;
        Ok(merge_rows(rows))
    }
}

fn clean_string(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
