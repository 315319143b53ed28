//! Matrix configuration documents.
//!
//! The logical model is always "categories + five rule lists + alias map +
//! stacks", whether it is read from one merged `skills-matrix.yaml` or from a
//! categories file plus a rules file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SmxError};

use super::alias::is_valid_skill_id;
use super::types::{CategoryDefinition, RelationshipDefinitions, StackDefinition};

/// Matrix shipped inside the binary, used when no matrix path is configured.
pub const DEFAULT_MATRIX_YAML: &str = include_str!("../../data/skills-matrix.yaml");

/// The merged matrix document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixConfig {
    pub version: String,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryDefinition>,
    #[serde(default)]
    pub relationships: RelationshipDefinitions,
    /// Display name -> canonical skill id.
    #[serde(default)]
    pub skill_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub suggested_stacks: Vec<StackDefinition>,
}

/// Categories half of the split layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesDocument {
    pub version: String,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryDefinition>,
}

/// Rules half of the split layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesDocument {
    pub version: String,
    #[serde(default)]
    pub relationships: RelationshipDefinitions,
    #[serde(default)]
    pub skill_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub suggested_stacks: Vec<StackDefinition>,
}

impl MatrixConfig {
    /// Parse and validate a merged matrix document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(content)
            .map_err(|err| SmxError::InvalidMatrix(format!("parse matrix: {err}")))?;
        config.fill_category_ids();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            SmxError::InvalidMatrix(format!("read matrix {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&content).map_err(|err| match err {
            SmxError::InvalidMatrix(msg) => {
                SmxError::InvalidMatrix(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Combine the split categories and rules documents.
    pub fn from_parts(categories: &str, rules: &str) -> Result<Self> {
        let categories: CategoriesDocument = serde_yaml::from_str(categories)
            .map_err(|err| SmxError::InvalidMatrix(format!("parse categories: {err}")))?;
        let rules: RulesDocument = serde_yaml::from_str(rules)
            .map_err(|err| SmxError::InvalidMatrix(format!("parse rules: {err}")))?;
        if categories.version != rules.version {
            debug!(
                categories = %categories.version,
                rules = %rules.version,
                "categories and rules documents disagree on version"
            );
        }
        let mut config = Self {
            version: categories.version,
            categories: categories.categories,
            relationships: rules.relationships,
            skill_aliases: rules.skill_aliases,
            suggested_stacks: rules.suggested_stacks,
        };
        config.fill_category_ids();
        config.validate()?;
        Ok(config)
    }

    /// The matrix embedded in the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_MATRIX_YAML)
    }

    /// Layer project-level overrides on top of this config.
    ///
    /// Categories and stacks are replaced by id, aliases by display name, and
    /// rule lists are appended.
    pub fn apply_overrides(&mut self, overrides: Self) -> Result<()> {
        self.categories.extend(overrides.categories);
        self.relationships.extend(overrides.relationships);
        self.skill_aliases.extend(overrides.skill_aliases);
        for stack in overrides.suggested_stacks {
            match self.suggested_stacks.iter_mut().find(|s| s.id == stack.id) {
                Some(existing) => *existing = stack,
                None => self.suggested_stacks.push(stack),
            }
        }
        self.fill_category_ids();
        self.validate()
    }

    fn fill_category_ids(&mut self) {
        for (key, category) in &mut self.categories {
            if category.id.is_empty() {
                category.id.clone_from(key);
            }
            if category.display_name.is_empty() {
                category.display_name.clone_from(key);
            }
        }
    }

    /// Structural checks that make the whole document unusable when violated.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(SmxError::InvalidMatrix(
                "matrix version must be non-empty".to_string(),
            ));
        }
        for (key, category) in &self.categories {
            if !is_valid_skill_id(key) {
                return Err(SmxError::InvalidMatrix(format!(
                    "category id '{key}' must be kebab-case"
                )));
            }
            if category.id != *key {
                return Err(SmxError::InvalidMatrix(format!(
                    "category '{key}' declares mismatched id '{}'",
                    category.id
                )));
            }
        }

        let rels = &self.relationships;
        for (idx, rule) in rels.conflicts.iter().enumerate() {
            require_members("conflicts", idx, &rule.skills, 2)?;
        }
        for (idx, rule) in rels.discourages.iter().enumerate() {
            require_members("discourages", idx, &rule.skills, 2)?;
        }
        for (idx, rule) in rels.alternatives.iter().enumerate() {
            require_members("alternatives", idx, &rule.skills, 2)?;
        }
        for (idx, rule) in rels.recommends.iter().enumerate() {
            require_members("recommends", idx, std::slice::from_ref(&rule.when), 1)?;
            require_members("recommends", idx, &rule.suggest, 1)?;
        }
        for (idx, rule) in rels.requires.iter().enumerate() {
            require_members("requires", idx, std::slice::from_ref(&rule.skill), 1)?;
            require_members("requires", idx, &rule.needs, 1)?;
        }
        for stack in &self.suggested_stacks {
            if stack.id.trim().is_empty() {
                return Err(SmxError::InvalidMatrix(
                    "suggested stack id must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn require_members(list: &str, idx: usize, members: &[String], min: usize) -> Result<()> {
    let count = members.iter().filter(|m| !m.trim().is_empty()).count();
    if count < min {
        return Err(SmxError::InvalidMatrix(format!(
            "{list}[{idx}] needs at least {min} skill reference(s), found {count}"
        )));
    }
    Ok(())
}

/// Where a matrix config comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixSource {
    Builtin,
    File(PathBuf),
    Split { categories: PathBuf, rules: PathBuf },
}

impl MatrixSource {
    pub fn load(&self) -> Result<MatrixConfig> {
        match self {
            Self::Builtin => MatrixConfig::builtin(),
            Self::File(path) => MatrixConfig::from_path(path),
            Self::Split { categories, rules } => {
                let categories_raw = std::fs::read_to_string(categories).map_err(|err| {
                    SmxError::InvalidMatrix(format!("read {}: {err}", categories.display()))
                })?;
                let rules_raw = std::fs::read_to_string(rules).map_err(|err| {
                    SmxError::InvalidMatrix(format!("read {}: {err}", rules.display()))
                })?;
                MatrixConfig::from_parts(&categories_raw, &rules_raw)
            }
        }
    }
}

/// Lazily loaded matrix defaults.
///
/// Owned by the application context and handed to whoever needs it; `clear`
/// forces the next `load` to hit the source again.
#[derive(Debug, Default)]
pub struct MatrixConfigCache {
    loaded: Mutex<Option<Arc<MatrixConfig>>>,
}

impl MatrixConfigCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached config, loading it from `source` on first use.
    pub fn load(&self, source: &MatrixSource) -> Result<Arc<MatrixConfig>> {
        let mut guard = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = guard.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(source.load()?);
        debug!(?source, categories = config.categories.len(), "loaded matrix config");
        *guard = Some(Arc::clone(&config));
        Ok(config)
    }

    /// The cached config, if one has been loaded.
    #[must_use]
    pub fn get(&self) -> Option<Arc<MatrixConfig>> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
