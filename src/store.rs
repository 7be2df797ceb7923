// src/store.rs
//
// Collaborators the matchers and the duplicates service read from, and an
// in-memory registry implementing both over a JSON snapshot.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use uuid::Uuid;

use crate::error::RegistryError;
use crate::models::{CandidateDto, Country, DuplicateDto, DuplicatesSearchParams, EntityKind};
use crate::registry::{ExistenceChecks, RegistryEntity, ResourceKind};

/// Arguments of a candidate lookup. `code` and `identifier` are trimmed and
/// non-empty when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
    pub code: Option<String>,
    pub identifier: Option<String>,
    pub key: Option<Uuid>,
    pub dataset_key: Option<Uuid>,
}

/// Fetches lookup candidates with their match flags computed.
pub trait LookupStore {
    fn lookup(
        &self,
        kind: EntityKind,
        query: &CandidateQuery,
    ) -> impl Future<Output = Result<Vec<CandidateDto>>> + Send;
}

/// Fetches pairwise duplicate signals for one scan.
pub trait DuplicatesStore {
    fn institution_duplicates(
        &self,
        params: &DuplicatesSearchParams,
    ) -> impl Future<Output = Result<Vec<DuplicateDto>>> + Send;

    fn collection_duplicates(
        &self,
        params: &DuplicatesSearchParams,
    ) -> impl Future<Output = Result<Vec<DuplicateDto>>> + Send;
}

/// Curator-entered link from occurrence data of a dataset to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceMapping {
    pub dataset_key: Uuid,
    pub entity_kind: EntityKind,
    pub entity_key: Uuid,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

impl OccurrenceMapping {
    fn applies_to(&self, query: &CandidateQuery) -> bool {
        if query.dataset_key != Some(self.dataset_key) {
            return false;
        }
        if self.code.is_none() && self.identifier.is_none() {
            return false;
        }
        let code_ok = match &self.code {
            Some(code) => eq_opt(query.code.as_deref(), Some(code)),
            None => true,
        };
        let identifier_ok = match &self.identifier {
            Some(identifier) => eq_opt(query.identifier.as_deref(), Some(identifier)),
            None => true,
        };
        code_ok && identifier_ok
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySnapshot {
    pub generated_date: Option<DateTime<Utc>>,
    pub institutions: Vec<RegistryEntity>,
    pub collections: Vec<RegistryEntity>,
    pub occurrence_mappings: Vec<OccurrenceMapping>,
}

/// Registry held in memory. Match flags use case-insensitive equality; names
/// are compared after collapsing whitespace.
#[derive(Debug, Clone)]
pub struct InMemoryRegistry {
    institutions: Vec<RegistryEntity>,
    collections: Vec<RegistryEntity>,
    occurrence_mappings: Vec<OccurrenceMapping>,
    generated_date: DateTime<Utc>,
}

impl InMemoryRegistry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            generated_date: snapshot.generated_date.unwrap_or_else(Utc::now),
            institutions: snapshot.institutions,
            collections: snapshot.collections,
            occurrence_mappings: snapshot.occurrence_mappings,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: RegistrySnapshot = serde_json::from_str(json)
            .map_err(|e| RegistryError::Snapshot(e.to_string()))
            .context("Failed to parse registry snapshot")?;
        Ok(Self::new(snapshot))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry snapshot {}", path.display()))?;
        let registry = Self::from_json(&json)?;
        info!(
            "Loaded registry snapshot {}: {} institutions, {} collections, {} occurrence mappings",
            path.display(),
            registry.institutions.len(),
            registry.collections.len(),
            registry.occurrence_mappings.len()
        );
        Ok(registry)
    }

    pub fn generated_date(&self) -> DateTime<Utc> {
        self.generated_date
    }

    fn entities(&self, kind: EntityKind) -> &[RegistryEntity] {
        match kind {
            EntityKind::Institution => &self.institutions,
            EntityKind::Collection => &self.collections,
        }
    }

    pub fn get(&self, kind: EntityKind, key: Uuid) -> Option<&RegistryEntity> {
        self.entities(kind).iter().find(|e| e.key == key)
    }

    /// Existence checks for institutions and collections backed by a copy of
    /// this registry's keys.
    pub fn existence_checks(&self) -> ExistenceChecks {
        let institutions: Vec<Uuid> = self.institutions.iter().map(|e| e.key).collect();
        let collections: Vec<Uuid> = self.collections.iter().map(|e| e.key).collect();
        ExistenceChecks::new()
            .with_check(ResourceKind::Institution, move |key| institutions.contains(&key))
            .with_check(ResourceKind::Collection, move |key| collections.contains(&key))
    }

    fn candidate(&self, kind: EntityKind, entity: &RegistryEntity, query: &CandidateQuery) -> Option<CandidateDto> {
        let code = query.code.as_deref();
        let identifier = query.identifier.as_deref();

        let key_match = query.key == Some(entity.key);
        let code_match = code.is_some() && eq_opt(entity.code.as_deref(), code);
        let alternative_code_match = code.is_some()
            && entity
                .alternative_codes
                .iter()
                .any(|alt| eq_opt(Some(alt), code));
        let identifier_match = identifier.is_some()
            && entity
                .identifiers
                .iter()
                .any(|id| eq_opt(Some(id), identifier));
        let name_match_with_code =
            code.is_some() && names_match(entity.name.as_deref(), code);
        let name_match_with_identifier =
            identifier.is_some() && names_match(entity.name.as_deref(), identifier);
        let explicit_mapping = self.occurrence_mappings.iter().any(|m| {
            m.entity_kind == kind && m.entity_key == entity.key && m.applies_to(query)
        });

        if !(key_match
            || code_match
            || alternative_code_match
            || identifier_match
            || name_match_with_code
            || name_match_with_identifier
            || explicit_mapping)
        {
            return None;
        }

        let institution = entity
            .institution_key
            .and_then(|key| self.get(EntityKind::Institution, key));

        Some(CandidateDto {
            key: entity.key,
            code: entity.code.clone(),
            name: entity.name.clone(),
            identifiers: entity.identifiers.clone(),
            alternative_codes: entity.alternative_codes.clone(),
            address_country: entity.address_country().cloned(),
            mailing_address_country: entity.mailing_country().cloned(),
            active: entity.active,
            institution_key: entity.institution_key,
            institution_code: institution.and_then(|i| i.code.clone()),
            institution_name: institution.and_then(|i| i.name.clone()),
            key_match,
            code_match,
            identifier_match,
            alternative_code_match,
            name_match_with_code,
            name_match_with_identifier,
            explicit_mapping,
        })
    }

    /// Pairs `(key1, key2)` with `key1 < key2` whose entities align on every
    /// selected criterion.
    fn duplicates(&self, kind: EntityKind, params: &DuplicatesSearchParams) -> Vec<DuplicateDto> {
        let mut scoped: Vec<&RegistryEntity> = self
            .entities(kind)
            .iter()
            .filter(|e| in_scope(kind, e, params))
            .collect();
        scoped.sort_by_key(|e| e.key);

        let mut pairs = Vec::new();
        for (i, first) in scoped.iter().enumerate() {
            for second in &scoped[i + 1..] {
                if is_duplicate(kind, first, second, params) {
                    pairs.push(self.duplicate_dto(first, second));
                }
            }
        }
        debug!(
            "{} duplicate pairs among {} {}s in scope",
            pairs.len(),
            scoped.len(),
            kind
        );
        pairs
    }

    fn duplicate_dto(&self, first: &RegistryEntity, second: &RegistryEntity) -> DuplicateDto {
        DuplicateDto {
            key1: first.key,
            code1: first.code.clone(),
            name1: first.name.clone(),
            physical_city1: first.address_city().map(str::to_string),
            physical_country1: first.address_country().cloned(),
            mailing_city1: first.mailing_city().map(str::to_string),
            mailing_country1: first.mailing_country().cloned(),
            institution_key1: first.institution_key,
            key2: second.key,
            code2: second.code.clone(),
            name2: second.name.clone(),
            physical_city2: second.address_city().map(str::to_string),
            physical_country2: second.address_country().cloned(),
            mailing_city2: second.mailing_city().map(str::to_string),
            mailing_country2: second.mailing_country().cloned(),
            institution_key2: second.institution_key,
            generated_date: self.generated_date,
        }
    }
}

impl LookupStore for InMemoryRegistry {
    async fn lookup(&self, kind: EntityKind, query: &CandidateQuery) -> Result<Vec<CandidateDto>> {
        let candidates: Vec<CandidateDto> = self
            .entities(kind)
            .iter()
            .filter_map(|entity| self.candidate(kind, entity, query))
            .collect();
        debug!("{} {} candidates for {:?}", candidates.len(), kind, query);
        Ok(candidates)
    }
}

impl DuplicatesStore for InMemoryRegistry {
    async fn institution_duplicates(&self, params: &DuplicatesSearchParams) -> Result<Vec<DuplicateDto>> {
        Ok(self.duplicates(EntityKind::Institution, params))
    }

    async fn collection_duplicates(&self, params: &DuplicatesSearchParams) -> Result<Vec<DuplicateDto>> {
        Ok(self.duplicates(EntityKind::Collection, params))
    }
}

fn eq_opt(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let (a, b) = (a.trim(), b.trim());
            !a.is_empty() && a.eq_ignore_ascii_case(b)
        }
        _ => false,
    }
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn names_match(name: Option<&str>, value: Option<&str>) -> bool {
    match (name, value) {
        (Some(name), Some(value)) => {
            let name = normalize_whitespace(name);
            !name.is_empty() && name == normalize_whitespace(value)
        }
        _ => false,
    }
}

// letters and digits only, lower case
fn fuzzy_name(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn countries(entity: &RegistryEntity) -> Vec<&Country> {
    entity
        .address_country()
        .into_iter()
        .chain(entity.mailing_country())
        .collect()
}

// the key that in/not-in institution lists refer to
fn institution_scope_key(kind: EntityKind, entity: &RegistryEntity) -> Option<Uuid> {
    match kind {
        EntityKind::Institution => Some(entity.key),
        EntityKind::Collection => entity.institution_key,
    }
}

fn in_scope(kind: EntityKind, entity: &RegistryEntity, params: &DuplicatesSearchParams) -> bool {
    if params.exclude_keys.contains(&entity.key) {
        return false;
    }
    let entity_countries = countries(entity);
    if !params.in_countries.is_empty()
        && !entity_countries.iter().any(|c| params.in_countries.contains(*c))
    {
        return false;
    }
    if entity_countries
        .iter()
        .any(|c| params.not_in_countries.contains(*c))
    {
        return false;
    }
    let scope_key = institution_scope_key(kind, entity);
    if !params.in_institutions.is_empty()
        && !scope_key.is_some_and(|k| params.in_institutions.contains(&k))
    {
        return false;
    }
    if scope_key.is_some_and(|k| params.not_in_institutions.contains(&k)) {
        return false;
    }
    true
}

fn is_duplicate(
    kind: EntityKind,
    first: &RegistryEntity,
    second: &RegistryEntity,
    params: &DuplicatesSearchParams,
) -> bool {
    if params.same_code && !eq_opt(first.code.as_deref(), second.code.as_deref()) {
        return false;
    }
    if params.same_name && !names_match(first.name.as_deref(), second.name.as_deref()) {
        return false;
    }
    if params.same_fuzzy_name {
        let fuzzy_first = first.name.as_deref().map(fuzzy_name).unwrap_or_default();
        let fuzzy_second = second.name.as_deref().map(fuzzy_name).unwrap_or_default();
        if fuzzy_first.is_empty() || fuzzy_first != fuzzy_second {
            return false;
        }
    }
    if params.same_country {
        let shared = countries(first)
            .iter()
            .any(|c| countries(second).contains(c));
        if !shared {
            return false;
        }
    }
    if params.same_city {
        let same_physical = eq_opt(first.address_city(), second.address_city());
        let same_mailing = eq_opt(first.mailing_city(), second.mailing_city());
        if !(same_physical || same_mailing) {
            return false;
        }
    }
    if params.same_institution_key
        && kind == EntityKind::Collection
        && (first.institution_key.is_none() || first.institution_key != second.institution_key)
    {
        return false;
    }
    true
}
