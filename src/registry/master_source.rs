// src/registry/master_source.rs
//
// Entities synchronised from an external master source (Index Herbariorum,
// a dataset, a publishing organization) keep some fields under that source's
// control. Updates coming through the registry must not overwrite them.

use log::debug;
use serde::Serialize;

use crate::models::EntityKind;
use crate::registry::{MasterSourceType, RegistryEntity};

/// A field of [`RegistryEntity`] that a master source can lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockableField {
    Code,
    Name,
    Description,
    AlternativeCodes,
    Active,
    Address,
    MailingAddress,
    Email,
    Phone,
    Homepage,
    NumberSpecimens,
    TaxonomicCoverage,
}

impl LockableField {
    /// Overwrites this field of `target` with the value held by `source`.
    pub fn copy(self, source: &RegistryEntity, target: &mut RegistryEntity) {
        match self {
            LockableField::Code => target.code.clone_from(&source.code),
            LockableField::Name => target.name.clone_from(&source.name),
            LockableField::Description => target.description.clone_from(&source.description),
            LockableField::AlternativeCodes => {
                target.alternative_codes.clone_from(&source.alternative_codes)
            }
            LockableField::Active => target.active = source.active,
            LockableField::Address => target.address.clone_from(&source.address),
            LockableField::MailingAddress => {
                target.mailing_address.clone_from(&source.mailing_address)
            }
            LockableField::Email => target.email.clone_from(&source.email),
            LockableField::Phone => target.phone.clone_from(&source.phone),
            LockableField::Homepage => target.homepage.clone_from(&source.homepage),
            LockableField::NumberSpecimens => target.number_specimens = source.number_specimens,
            LockableField::TaxonomicCoverage => {
                target.taxonomic_coverage.clone_from(&source.taxonomic_coverage)
            }
        }
    }
}

const INSTITUTION_IH_FIELDS: &[LockableField] = &[
    LockableField::Code,
    LockableField::Name,
    LockableField::Active,
    LockableField::Address,
    LockableField::MailingAddress,
    LockableField::Email,
    LockableField::Phone,
    LockableField::Homepage,
];

const INSTITUTION_ORGANIZATION_FIELDS: &[LockableField] = &[
    LockableField::Name,
    LockableField::Description,
    LockableField::Address,
    LockableField::Email,
    LockableField::Phone,
    LockableField::Homepage,
];

const COLLECTION_IH_FIELDS: &[LockableField] = &[
    LockableField::Code,
    LockableField::Name,
    LockableField::Active,
    LockableField::Address,
    LockableField::MailingAddress,
    LockableField::Email,
    LockableField::Phone,
    LockableField::Homepage,
    LockableField::NumberSpecimens,
    LockableField::TaxonomicCoverage,
];

const COLLECTION_DATASET_FIELDS: &[LockableField] = &[
    LockableField::Name,
    LockableField::Description,
    LockableField::Homepage,
    LockableField::TaxonomicCoverage,
];

impl EntityKind {
    /// Fields locked by `source` for entities of this kind, in application order.
    pub fn lockable_fields(&self, source: MasterSourceType) -> &'static [LockableField] {
        match (self, source) {
            (EntityKind::Institution, MasterSourceType::Ih) => INSTITUTION_IH_FIELDS,
            (EntityKind::Institution, MasterSourceType::Organization) => {
                INSTITUTION_ORGANIZATION_FIELDS
            }
            (EntityKind::Collection, MasterSourceType::Ih) => COLLECTION_IH_FIELDS,
            (EntityKind::Collection, MasterSourceType::Dataset) => COLLECTION_DATASET_FIELDS,
            _ => &[],
        }
    }

    pub fn is_lockable(&self, source: MasterSourceType) -> bool {
        !self.lockable_fields(source).is_empty()
    }
}

/// Restores the fields of `new` that the master source of `old` controls.
pub fn lock_fields(kind: EntityKind, old: &RegistryEntity, mut new: RegistryEntity) -> RegistryEntity {
    let fields = kind.lockable_fields(old.master_source);
    for field in fields {
        field.copy(old, &mut new);
    }
    if !fields.is_empty() {
        debug!(
            "Locked {} fields of {} {} ({:?})",
            fields.len(),
            kind,
            old.key,
            old.master_source
        );
    }
    new
}
