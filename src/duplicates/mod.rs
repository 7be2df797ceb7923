// src/duplicates/mod.rs
pub mod grouper;

use anyhow::{Context, Result};
use log::{info, warn};
use std::time::Instant;

use crate::models::{DuplicateDto, DuplicatesResult, DuplicatesSearchParams, EntityKind};
use crate::store::DuplicatesStore;

pub use grouper::{group_duplicates, key_coverage};

/// Finds possible duplicate institutions and collections.
pub struct DuplicatesService<S> {
    store: S,
}

impl<S: DuplicatesStore> DuplicatesService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn find_possible_duplicate_institutions(
        &self,
        params: &DuplicatesSearchParams,
    ) -> Result<DuplicatesResult> {
        self.find_possible_duplicates(EntityKind::Institution, params).await
    }

    pub async fn find_possible_duplicate_collections(
        &self,
        params: &DuplicatesSearchParams,
    ) -> Result<DuplicatesResult> {
        self.find_possible_duplicates(EntityKind::Collection, params).await
    }

    /// Validates the criteria, runs the store scan and groups the pairs.
    pub async fn find_possible_duplicates(
        &self,
        kind: EntityKind,
        params: &DuplicatesSearchParams,
    ) -> Result<DuplicatesResult> {
        params.validate()?;
        let start_time = Instant::now();

        let pairs = match kind {
            EntityKind::Institution => self.store.institution_duplicates(params).await,
            EntityKind::Collection => self.store.collection_duplicates(params).await,
        }
        .with_context(|| format!("Failed to scan {} duplicates", kind))?;

        let result = group_duplicates(&pairs);
        warn_on_split_clusters(kind, &pairs, &result);

        info!(
            "Found {} {} duplicate groups from {} pairs in {:.2?}",
            result.duplicates.len(),
            kind,
            pairs.len(),
            start_time.elapsed()
        );
        Ok(result)
    }
}

fn warn_on_split_clusters(kind: EntityKind, pairs: &[DuplicateDto], result: &DuplicatesResult) {
    let coverage = key_coverage(pairs);
    let split = coverage.split_components(&result.duplicates);
    if split.is_empty() {
        return;
    }
    warn!(
        "{} connected {} clusters are spread over several groups ({} keys only seen as second key)",
        split.len(),
        kind,
        coverage.second_only_keys.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use chrono::Utc;
    use uuid::Uuid;

    struct CannedPairs(Vec<DuplicateDto>);

    impl DuplicatesStore for CannedPairs {
        async fn institution_duplicates(&self, _: &DuplicatesSearchParams) -> Result<Vec<DuplicateDto>> {
            Ok(self.0.clone())
        }

        async fn collection_duplicates(&self, _: &DuplicatesSearchParams) -> Result<Vec<DuplicateDto>> {
            anyhow::bail!("collections table unavailable")
        }
    }

    fn pair() -> DuplicateDto {
        DuplicateDto {
            key1: Uuid::new_v4(),
            code1: Some("C1".to_string()),
            name1: None,
            physical_city1: None,
            physical_country1: None,
            mailing_city1: None,
            mailing_country1: None,
            institution_key1: None,
            key2: Uuid::new_v4(),
            code2: Some("C1".to_string()),
            name2: None,
            physical_city2: None,
            physical_country2: None,
            mailing_city2: None,
            mailing_country2: None,
            institution_key2: None,
            generated_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_scan_without_criteria_is_rejected() {
        let service = DuplicatesService::new(CannedPairs(vec![pair()]));
        let err = service
            .find_possible_duplicate_institutions(&DuplicatesSearchParams::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::InvalidSearchParams(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_groups_pairs() {
        let dto = pair();
        let service = DuplicatesService::new(CannedPairs(vec![dto.clone()]));
        let params = DuplicatesSearchParams {
            same_code: true,
            ..Default::default()
        };
        let result = service.find_possible_duplicate_institutions(&params).await.unwrap();
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(result.duplicates[0].len(), 2);
        assert_eq!(result.generation_date, Some(dto.generated_date));
    }

    #[tokio::test]
    async fn test_store_failure_carries_context() {
        let service = DuplicatesService::new(CannedPairs(vec![]));
        let params = DuplicatesSearchParams {
            same_name: true,
            ..Default::default()
        };
        let err = service
            .find_possible_duplicate_collections(&params)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to scan collection duplicates"));
    }
}
