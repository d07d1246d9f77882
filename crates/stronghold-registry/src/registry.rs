//! The pipeline registry: check identifier → definition.

use std::collections::HashMap;

use serde::Deserialize;

use stronghold_core::error::EngineError;

use crate::definition::CheckDefinition;
use crate::hooks::CheckHooks;

const BUILTIN: &str = include_str!("../checks/builtin.yaml");

#[derive(Debug, Deserialize)]
struct ChecksFile {
    checks: Vec<CheckDefinition>,
}

/// Static mapping from check identifier to its definition. Loaded once;
/// immutable for the process lifetime after hook registration.
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    checks: HashMap<String, CheckDefinition>,
}

impl PipelineRegistry {
    /// Parses a registry from YAML check definitions.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` on malformed YAML or duplicate
    /// check identifiers.
    pub fn from_yaml(yaml: &str) -> Result<Self, EngineError> {
        let file: ChecksFile = serde_yaml::from_str(yaml)
            .map_err(|e| EngineError::Validation(format!("invalid check definitions: {e}")))?;

        let mut registry = Self::default();
        for definition in file.checks {
            registry.insert(definition)?;
        }
        Ok(registry)
    }

    /// Loads the builtin definition set shipped with the engine.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the embedded YAML is invalid.
    pub fn builtin() -> Result<Self, EngineError> {
        Self::from_yaml(BUILTIN)
    }

    /// Adds a definition.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` when the identifier is already
    /// registered.
    pub fn insert(&mut self, definition: CheckDefinition) -> Result<(), EngineError> {
        if self.checks.contains_key(&definition.id) {
            return Err(EngineError::Validation(format!(
                "duplicate check definition: {}",
                definition.id
            )));
        }
        self.checks.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Attaches interaction hooks to a loaded definition.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CheckNotFound` for an unknown identifier.
    pub fn register_hooks(&mut self, check_id: &str, hooks: CheckHooks) -> Result<(), EngineError> {
        let definition = self
            .checks
            .get_mut(check_id)
            .ok_or_else(|| EngineError::CheckNotFound(check_id.to_owned()))?;
        definition.hooks = hooks;
        Ok(())
    }

    /// Looks up a definition.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CheckNotFound` for an unknown identifier.
    pub fn get(&self, check_id: &str) -> Result<&CheckDefinition, EngineError> {
        self.checks
            .get(check_id)
            .ok_or_else(|| EngineError::CheckNotFound(check_id.to_owned()))
    }

    /// Iterates all definitions in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &CheckDefinition> {
        self.checks.values()
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
