// src/registry/mod.rs

pub mod existence;
pub mod master_source;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Country;

pub use existence::{ExistenceChecks, ResourceKind};
pub use master_source::{LockableField, lock_fields};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<Country>,
}

/// Where the authoritative copy of an entity lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MasterSourceType {
    #[default]
    Grscicoll,
    Ih,
    Dataset,
    Organization,
}

/// An institution or collection as stored in the registry.
///
/// Collection-only fields (`institution_key`, `number_specimens`,
/// `taxonomic_coverage`) stay empty on institutions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryEntity {
    pub key: Uuid,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub alternative_codes: Vec<String>,
    pub identifiers: Vec<String>,
    pub active: bool,
    pub address: Option<Address>,
    pub mailing_address: Option<Address>,
    pub email: Vec<String>,
    pub phone: Vec<String>,
    pub homepage: Option<String>,
    pub institution_key: Option<Uuid>,
    pub number_specimens: Option<i64>,
    pub taxonomic_coverage: Option<String>,
    pub master_source: MasterSourceType,
}

impl RegistryEntity {
    pub fn address_country(&self) -> Option<&Country> {
        self.address.as_ref().and_then(|a| a.country.as_ref())
    }

    pub fn mailing_country(&self) -> Option<&Country> {
        self.mailing_address.as_ref().and_then(|a| a.country.as_ref())
    }

    pub fn address_city(&self) -> Option<&str> {
        self.address.as_ref().and_then(|a| a.city.as_deref())
    }

    pub fn mailing_city(&self) -> Option<&str> {
        self.mailing_address.as_ref().and_then(|a| a.city.as_deref())
    }
}
