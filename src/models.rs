// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::RegistryError;

//------------------------------------------------------------------------------
// SHARED TYPES
//------------------------------------------------------------------------------

/// ISO 3166-1 alpha-2 country code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Country(String);

impl Country {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Country {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Country(code.to_ascii_uppercase()))
        } else {
            Err(RegistryError::InvalidCountry(s.to_string()))
        }
    }
}

impl TryFrom<String> for Country {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        country.0
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two kinds of GRSciColl entities that can be looked up and deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Institution,
    Collection,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institution",
            EntityKind::Collection => "collection",
        }
    }

    /// Self link of an entity of this kind under the given API base URL.
    pub fn self_link(&self, api_base_url: &str, key: Uuid) -> String {
        format!("{}grscicoll/{}/{}", api_base_url, self.as_str(), key)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------------------------------------------------------------------------
// LOOKUP
//------------------------------------------------------------------------------

/// One candidate row returned by the lookup store.
///
/// The `*_match` flags and `explicit_mapping` are computed by the store and
/// taken as given by the matchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateDto {
    pub key: Uuid,
    pub code: Option<String>,
    pub name: Option<String>,
    pub identifiers: Vec<String>,
    pub alternative_codes: Vec<String>,
    pub address_country: Option<Country>,
    pub mailing_address_country: Option<Country>,
    pub active: bool,

    /// Owning institution, collections only.
    pub institution_key: Option<Uuid>,
    pub institution_code: Option<String>,
    pub institution_name: Option<String>,

    pub key_match: bool,
    pub code_match: bool,
    pub identifier_match: bool,
    pub alternative_code_match: bool,
    pub name_match_with_code: bool,
    pub name_match_with_identifier: bool,
    pub explicit_mapping: bool,
}

impl CandidateDto {
    /// ORs the match flags of another row for the same entity into this one.
    pub fn merge_flags(&mut self, other: &CandidateDto) {
        self.key_match |= other.key_match;
        self.code_match |= other.code_match;
        self.identifier_match |= other.identifier_match;
        self.alternative_code_match |= other.alternative_code_match;
        self.name_match_with_code |= other.name_match_with_code;
        self.name_match_with_identifier |= other.name_match_with_identifier;
        self.explicit_mapping |= other.explicit_mapping;
    }

    pub fn matches_country(&self, country: Option<&Country>) -> bool {
        match country {
            Some(c) => {
                self.address_country.as_ref() == Some(c)
                    || self.mailing_address_country.as_ref() == Some(c)
            }
            None => false,
        }
    }

    /// True if the code or one of the alternative codes equals `code`,
    /// ignoring case.
    pub fn has_code(&self, code: &str) -> bool {
        self.code
            .iter()
            .chain(self.alternative_codes.iter())
            .any(|c| c.trim().eq_ignore_ascii_case(code.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchReason {
    KeyMatch,
    CodeMatch,
    IdentifierMatch,
    AlternativeCodeMatch,
    NameMatch,
    CountryMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    None,
    Ambiguous,
    AmbiguousExplicitMappings,
    Doubtful,
    Accepted,
}

impl MatchStatus {
    /// Statuses that carry a matched entity.
    pub fn has_entity(&self) -> bool {
        matches!(self, MatchStatus::Accepted | MatchStatus::Doubtful)
    }
}

/// Pool a match was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    ExplicitMapping,
    Fuzzy,
    None,
}

/// Public projection of a matched entity.
pub trait EntityMatched: Clone {
    fn key(&self) -> Uuid;
    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionMatched {
    pub key: Uuid,
    pub self_link: String,
    pub name: Option<String>,
    pub code: Option<String>,
    pub active: bool,
}

impl EntityMatched for InstitutionMatched {
    fn key(&self) -> Uuid {
        self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMatched {
    pub key: Uuid,
    pub self_link: String,
    pub name: Option<String>,
    pub code: Option<String>,
    pub active: bool,
    pub institution_key: Option<Uuid>,
    pub institution_code: Option<String>,
    pub institution_name: Option<String>,
}

impl EntityMatched for CollectionMatched {
    fn key(&self) -> Uuid {
        self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Outcome of matching one entity kind.
///
/// `entity_matched` is present exactly when the status is `ACCEPTED` or
/// `DOUBTFUL`; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match<T> {
    match_type: MatchType,
    status: MatchStatus,
    reasons: BTreeSet<MatchReason>,
    entity_matched: Option<T>,
}

impl<T> Match<T> {
    pub fn none() -> Self {
        Self::none_with_status(MatchStatus::None)
    }

    /// A match without entity. `status` must not be `ACCEPTED`/`DOUBTFUL`;
    /// those fall back to `NONE`.
    pub fn none_with_status(status: MatchStatus) -> Self {
        let status = if status.has_entity() {
            MatchStatus::None
        } else {
            status
        };
        Self {
            match_type: MatchType::None,
            status,
            reasons: BTreeSet::new(),
            entity_matched: None,
        }
    }

    pub fn accepted(match_type: MatchType, reasons: BTreeSet<MatchReason>, entity: T) -> Self {
        Self {
            match_type,
            status: MatchStatus::Accepted,
            reasons,
            entity_matched: Some(entity),
        }
    }

    pub fn doubtful(match_type: MatchType, reasons: BTreeSet<MatchReason>, entity: T) -> Self {
        Self {
            match_type,
            status: MatchStatus::Doubtful,
            reasons,
            entity_matched: Some(entity),
        }
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn reasons(&self) -> &BTreeSet<MatchReason> {
        &self.reasons
    }

    pub fn entity_matched(&self) -> Option<&T> {
        self.entity_matched.as_ref()
    }
}

impl<T> Default for Match<T> {
    fn default() -> Self {
        Self::none()
    }
}

/// A candidate that was not chosen, reported for transparency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeMatch<T> {
    pub match_type: MatchType,
    pub reasons: BTreeSet<MatchReason>,
    pub entity_matched: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupParams {
    pub dataset_key: Option<Uuid>,
    pub institution_code: Option<String>,
    pub institution_id: Option<String>,
    pub owner_institution_code: Option<String>,
    pub collection_code: Option<String>,
    pub collection_id: Option<String>,
    pub country: Option<Country>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeMatches {
    pub institution_matches: Vec<AlternativeMatch<InstitutionMatched>>,
    pub collection_matches: Vec<AlternativeMatch<CollectionMatched>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub institution_match: Match<InstitutionMatched>,
    pub collection_match: Match<CollectionMatched>,
    pub alternative_matches: AlternativeMatches,
}

//------------------------------------------------------------------------------
// DUPLICATES
//------------------------------------------------------------------------------

/// A pairwise duplicate signal produced by the duplicates store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateDto {
    pub key1: Uuid,
    pub code1: Option<String>,
    pub name1: Option<String>,
    pub physical_city1: Option<String>,
    pub physical_country1: Option<Country>,
    pub mailing_city1: Option<String>,
    pub mailing_country1: Option<Country>,
    pub institution_key1: Option<Uuid>,

    pub key2: Uuid,
    pub code2: Option<String>,
    pub name2: Option<String>,
    pub physical_city2: Option<String>,
    pub physical_country2: Option<Country>,
    pub mailing_city2: Option<String>,
    pub mailing_country2: Option<Country>,
    pub institution_key2: Option<Uuid>,

    /// Shared by every row of one scan.
    pub generated_date: DateTime<Utc>,
}

impl DuplicateDto {
    pub fn first(&self) -> Duplicate {
        Duplicate {
            key: self.key1,
            code: self.code1.clone(),
            name: self.name1.clone(),
            physical_city: self.physical_city1.clone(),
            physical_country: self.physical_country1.clone(),
            mailing_city: self.mailing_city1.clone(),
            mailing_country: self.mailing_country1.clone(),
            institution_key: self.institution_key1,
        }
    }

    pub fn second(&self) -> Duplicate {
        Duplicate {
            key: self.key2,
            code: self.code2.clone(),
            name: self.name2.clone(),
            physical_city: self.physical_city2.clone(),
            physical_country: self.physical_country2.clone(),
            mailing_city: self.mailing_city2.clone(),
            mailing_country: self.mailing_country2.clone(),
            institution_key: self.institution_key2,
        }
    }
}

/// One member of a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duplicate {
    pub key: Uuid,
    pub code: Option<String>,
    pub name: Option<String>,
    pub physical_city: Option<String>,
    pub physical_country: Option<Country>,
    pub mailing_city: Option<String>,
    pub mailing_country: Option<Country>,
    pub institution_key: Option<Uuid>,
}

pub type DuplicateGroup = BTreeSet<Duplicate>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatesResult {
    pub duplicates: Vec<DuplicateGroup>,
    pub generation_date: Option<DateTime<Utc>>,
}

/// Which attributes must align for two entities to be reported as duplicates,
/// plus scoping lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplicatesSearchParams {
    pub same_code: bool,
    pub same_name: bool,
    pub same_fuzzy_name: bool,
    pub same_country: bool,
    pub same_city: bool,
    pub same_institution_key: bool,
    pub in_countries: Vec<Country>,
    pub not_in_countries: Vec<Country>,
    pub in_institutions: Vec<Uuid>,
    pub not_in_institutions: Vec<Uuid>,
    pub exclude_keys: Vec<Uuid>,
}

impl DuplicatesSearchParams {
    pub fn has_criteria(&self) -> bool {
        self.same_code
            || self.same_name
            || self.same_fuzzy_name
            || self.same_country
            || self.same_city
            || self.same_institution_key
    }

    /// Rejects scans that would compare entities on nothing.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !self.has_criteria() {
            return Err(RegistryError::InvalidSearchParams(
                "At least one param to check the same field is required".to_string(),
            ));
        }
        Ok(())
    }
}
