use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use super::Condition;
use crate::error::{HaconfError, Result};

/// Per-frontend ACL registry.
///
/// Conditions are keyed by canonical name and kept in registration order, so
/// each name gets exactly one definition line no matter how many backends use it.
#[derive(Debug, Default)]
pub struct AclRegistry {
    entries: IndexMap<String, Arc<Condition>>,
}

impl AclRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared instance for `condition`, registering it on first use.
    ///
    /// Fails if the name is already taken by a different condition. Names
    /// encode the host losslessly but not the mode, so this only happens when
    /// one registry is fed conditions for both proxy modes.
    pub fn intern(&mut self, condition: Condition) -> Result<Arc<Condition>> {
        let name = condition.name();
        if let Some(existing) = self.entries.get(&name) {
            if **existing != condition {
                return Err(HaconfError::AclNameCollision {
                    name,
                    existing: existing.to_string(),
                    requested: condition.to_string(),
                });
            }
            return Ok(Arc::clone(existing));
        }

        let shared = Arc::new(condition);
        self.entries.insert(name, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Condition>> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Conditions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Condition>> {
        self.entries.values()
    }

    /// Definition lines in registration order
    pub fn definitions<'a>(&'a self, cidr_dir: &'a Path) -> impl Iterator<Item = String> + 'a {
        self.entries.values().map(move |c| c.definition(cidr_dir))
    }
}
