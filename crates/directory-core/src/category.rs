//! Product categories.

use crate::validation;
use crate::{CategoryId, ValidationError};
use serde::{Deserialize, Serialize};

/// A product category, e.g. `Guitars`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
}

/// Fields for creating or renaming a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    /// Display name.
    pub name: String,
}

impl CategoryDraft {
    /// Creates a draft.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Checks the name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::name(&mut errors, "name", &self.name);
        errors.into_result()
    }
}
