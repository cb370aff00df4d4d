//! Package definitions
//!
//! A package is a named, ordered bundle of fortune types generated together.
//! Declared order is the order of batch results.

use crate::error::ValidationError;
use crate::types::FortuneType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Traditional bundle id
pub const TRADITIONAL_PACKAGE: &str = "TRADITIONAL_PACKAGE";
/// Daily bundle id
pub const DAILY_PACKAGE: &str = "DAILY_PACKAGE";
/// Career bundle id
pub const CAREER_PACKAGE: &str = "CAREER_PACKAGE";

/// Named ordered list of fortune types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDefinition {
    /// Package id
    pub id: String,
    /// Display title
    pub title: String,
    /// Fortune types in declared order
    pub fortune_types: Vec<FortuneType>,
}

impl PackageDefinition {
    /// Create new package definition
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        fortune_types: Vec<FortuneType>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            fortune_types,
        }
    }

    /// Check the package is non-empty and lists each type once
    ///
    /// # Errors
    /// `InvalidAttribute` naming the problem
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.fortune_types.is_empty() {
            return Err(ValidationError::InvalidAttribute {
                attribute: "package".to_string(),
                reason: format!("package {} has no fortune types", self.id),
            });
        }
        for (i, t) in self.fortune_types.iter().enumerate() {
            if self.fortune_types[..i].contains(t) {
                return Err(ValidationError::InvalidAttribute {
                    attribute: "package".to_string(),
                    reason: format!("package {} lists {t} twice", self.id),
                });
            }
        }
        Ok(())
    }
}

/// Registry of packages by id
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: IndexMap<String, PackageDefinition>,
}

impl PackageRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in packages
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            PackageDefinition::new(
                TRADITIONAL_PACKAGE,
                "전통 운세 패키지",
                vec![
                    FortuneType::Saju,
                    FortuneType::Tojeong,
                    FortuneType::Salpuli,
                    FortuneType::PastLife,
                ],
            ),
            PackageDefinition::new(
                DAILY_PACKAGE,
                "데일리 패키지",
                vec![
                    FortuneType::Daily,
                    FortuneType::BloodType,
                    FortuneType::DreamInterpretation,
                ],
            ),
            PackageDefinition::new(
                CAREER_PACKAGE,
                "커리어 패키지",
                vec![FortuneType::Career, FortuneType::Saju, FortuneType::Daily],
            ),
        ];
        for package in defaults {
            // Built-ins are non-empty and duplicate-free.
            debug_assert!(package.check().is_ok(), "invalid built-in {}", package.id);
            registry.packages.insert(package.id.clone(), package);
        }
        registry
    }

    /// Register a package, replacing any with the same id
    ///
    /// # Errors
    /// `InvalidAttribute` if the package is empty or lists a type twice
    pub fn register(&mut self, package: PackageDefinition) -> Result<(), ValidationError> {
        package.check()?;
        self.packages.insert(package.id.clone(), package);
        Ok(())
    }

    /// Resolve package id
    ///
    /// # Errors
    /// `UnknownPackage` if not registered
    pub fn resolve(&self, id: &str) -> Result<&PackageDefinition, ValidationError> {
        self.packages
            .get(id)
            .ok_or_else(|| ValidationError::UnknownPackage(id.to_string()))
    }

    /// Registered packages in registration order
    pub fn iter(&self) -> impl Iterator<Item = &PackageDefinition> {
        self.packages.values()
    }
}
