// src/registry/existence.rs

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{RegistryError, RegistryResult};

// GET .../<kind>/<key>/<sub-resource>
static ENTITY_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^.*/(organization|dataset|installation|node|network|institution|collection)/([a-f0-9-]+)/.+$",
    )
    .unwrap_or_else(|e| panic!("invalid entity path pattern: {}", e))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Organization,
    Dataset,
    Installation,
    Node,
    Network,
    Institution,
    Collection,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Organization => "organization",
            ResourceKind::Dataset => "dataset",
            ResourceKind::Installation => "installation",
            ResourceKind::Node => "node",
            ResourceKind::Network => "network",
            ResourceKind::Institution => "institution",
            ResourceKind::Collection => "collection",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "organization" => Some(ResourceKind::Organization),
            "dataset" => Some(ResourceKind::Dataset),
            "installation" => Some(ResourceKind::Installation),
            "node" => Some(ResourceKind::Node),
            "network" => Some(ResourceKind::Network),
            "institution" => Some(ResourceKind::Institution),
            "collection" => Some(ResourceKind::Collection),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type ExistsFn = Box<dyn Fn(Uuid) -> bool + Send + Sync>;

/// Strategy table answering "does this entity exist?" per resource kind.
///
/// Assembled once at start-up and handed to whatever needs it. Kinds without
/// a registered check are treated as unknown and let through.
#[derive(Default)]
pub struct ExistenceChecks {
    checks: HashMap<ResourceKind, ExistsFn>,
}

impl ExistenceChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check<F>(mut self, kind: ResourceKind, check: F) -> Self
    where
        F: Fn(Uuid) -> bool + Send + Sync + 'static,
    {
        self.checks.insert(kind, Box::new(check));
        self
    }

    /// `None` when no check is registered for `kind`.
    pub fn exists(&self, kind: ResourceKind, key: Uuid) -> Option<bool> {
        self.checks.get(&kind).map(|check| check(key))
    }

    /// Rejects `GET` requests on sub-resources of entities that don't exist.
    ///
    /// Paths whose key segment is not a UUID are let through.
    pub fn guard_request(&self, method: &str, path: &str) -> RegistryResult<()> {
        if !method.eq_ignore_ascii_case("GET") {
            return Ok(());
        }
        let Some(captures) = ENTITY_PATH_PATTERN.captures(path) else {
            return Ok(());
        };
        let Some(kind) = ResourceKind::from_path_segment(&captures[1]) else {
            return Ok(());
        };
        let key = match Uuid::parse_str(&captures[2]) {
            Ok(key) => key,
            Err(e) => {
                info!("Not an entity key in {}, skipping request: {}", path, e);
                return Ok(());
            }
        };

        match self.exists(kind, key) {
            Some(false) => {
                debug!("Rejecting request to missing {} {}", kind, key);
                Err(RegistryError::NotFound {
                    kind: kind.to_string(),
                    key,
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for ExistenceChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExistenceChecks")
            .field("kinds", &self.checks.keys().collect::<Vec<_>>())
            .finish()
    }
}
