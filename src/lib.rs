// src/lib.rs
pub mod config;
pub mod duplicates;
pub mod error;
pub mod matching;
pub mod models;
pub mod registry;
pub mod store;

// Re-export common types for easier access
pub use models::{
    CandidateDto, Country, Duplicate, DuplicateDto, DuplicatesResult, DuplicatesSearchParams,
    EntityKind, LookupParams, LookupResult, Match, MatchReason, MatchStatus, MatchType,
};

// Re-export important functionality
pub use config::MatcherConfig;
pub use duplicates::DuplicatesService;
pub use error::RegistryError;
pub use matching::LookupService;
pub use store::InMemoryRegistry;
