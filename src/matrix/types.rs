//! Data model shared by the merger, resolver, multi-source loader and health checker.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical skill identifier, `prefix-subcategory-name` (e.g. `web-framework-react`).
pub type SkillId = String;

const fn default_true() -> bool {
    true
}

/// A selectable grouping (subcategory) skills belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDefinition {
    /// Filled from the map key when omitted in the document.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Coarse grouping used by domain-scoped views (web, api, cli, mobile, shared).
    #[serde(default)]
    pub domain: Option<String>,
    /// Exclusive categories allow a single selection (radio), otherwise checkbox.
    #[serde(default = "default_true")]
    pub exclusive: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i32,
}

impl CategoryDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, domain: Option<&str>, exclusive: bool) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            description: String::new(),
            domain: domain.map(str::to_string),
            exclusive,
            required: false,
            order: 0,
        }
    }
}

/// Hard exclusion between every pair of members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRule {
    pub skills: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

/// Soft exclusion: allowed, but flagged when combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscourageRule {
    pub skills: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

/// When `when` is selected, `suggest` members are recommended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRule {
    pub when: String,
    pub suggest: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

/// `skill` depends on `needs` (all of them, or any one when `needs_any`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequireRule {
    pub skill: String,
    pub needs: Vec<String>,
    #[serde(default)]
    pub needs_any: bool,
    #[serde(default)]
    pub reason: String,
}

/// Interchangeable peers serving the same purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeGroup {
    #[serde(default)]
    pub purpose: String,
    pub skills: Vec<String>,
}

/// The five rule lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDefinitions {
    #[serde(default)]
    pub conflicts: Vec<ConflictRule>,
    #[serde(default)]
    pub discourages: Vec<DiscourageRule>,
    #[serde(default)]
    pub recommends: Vec<RecommendRule>,
    #[serde(default)]
    pub requires: Vec<RequireRule>,
    #[serde(default)]
    pub alternatives: Vec<AlternativeGroup>,
}

impl RelationshipDefinitions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
            && self.discourages.is_empty()
            && self.recommends.is_empty()
            && self.requires.is_empty()
            && self.alternatives.is_empty()
    }

    pub fn extend(&mut self, other: Self) {
        self.conflicts.extend(other.conflicts);
        self.discourages.extend(other.discourages);
        self.recommends.extend(other.recommends);
        self.requires.extend(other.requires);
        self.alternatives.extend(other.alternatives);
    }
}

/// Pre-built bundle of skills as written in the matrix document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Raw per-skill facts produced by the metadata scanner.
///
/// Relationship fields may hold display names or directory paths; they are
/// only canonicalized during merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSkillMetadata {
    pub id: SkillId,
    /// Path of the skill directory relative to its skills root.
    pub directory_path: String,
    pub display_name: Option<String>,
    pub cli_name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: String,
    /// Found in the project's local skills directory.
    pub local: bool,
    pub local_path: Option<String>,
    pub requires: Vec<String>,
    pub compatible_with: Vec<String>,
    pub conflicts_with: Vec<String>,
    pub requires_setup: Vec<String>,
    pub provides_setup_for: Vec<String>,
}

impl ExtractedSkillMetadata {
    #[must_use]
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            directory_path: id.clone(),
            cli_name: id.clone(),
            id,
            category: category.into(),
            ..Self::default()
        }
    }
}

/// Outcome of canonicalizing a raw skill reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum SkillRef {
    /// Points at a skill present in the matrix.
    Resolved(SkillId),
    /// Could not be mapped to a known skill; kept verbatim.
    Unresolved(String),
}

impl SkillRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Resolved(id) | Self::Unresolved(id) => id,
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl std::fmt::Display for SkillRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A single-target relationship with the reason it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRelation {
    pub skill: SkillRef,
    pub reason: String,
}

/// One requirement entry. Entries on a skill are ANDed; `needs_any` makes the
/// members of this entry OR'd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRequirement {
    pub skill_ids: Vec<SkillRef>,
    pub needs_any: bool,
    pub reason: String,
}

impl SkillRequirement {
    #[must_use]
    pub fn names(&self, id: &str) -> bool {
        self.skill_ids.iter().any(|r| r.id() == id)
    }

    /// Whether `is_selected` satisfies this entry.
    pub fn is_satisfied_by(&self, is_selected: impl Fn(&str) -> bool) -> bool {
        if self.needs_any {
            self.skill_ids.iter().any(|r| is_selected(r.id()))
        } else {
            self.skill_ids.iter().all(|r| is_selected(r.id()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Public,
    Private,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    Local,
    Plugin,
}

/// One catalog's record of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSource {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub url: Option<String>,
    pub version: Option<String>,
    pub installed: bool,
    pub install_mode: Option<InstallMode>,
    pub primary: bool,
}

impl SkillSource {
    #[must_use]
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
            url: None,
            version: None,
            installed: false,
            install_mode: None,
            primary: false,
        }
    }
}

/// A skill after merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSkill {
    pub id: SkillId,
    pub display_name: Option<String>,
    pub cli_name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: String,
    pub directory_path: String,
    pub local: bool,
    pub local_path: Option<String>,
    pub conflicts_with: Vec<SkillRelation>,
    pub recommends: Vec<SkillRelation>,
    pub discourages: Vec<SkillRelation>,
    pub alternatives: Vec<SkillRelation>,
    pub requires: Vec<SkillRequirement>,
    pub requires_setup: Vec<SkillRef>,
    pub provides_setup_for: Vec<SkillRef>,
    pub available_sources: Vec<SkillSource>,
    /// Always a copy of one element of `available_sources`.
    pub active_source: Option<SkillSource>,
}

impl ResolvedSkill {
    /// Label shown to users: display name when known, else the id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    #[must_use]
    pub fn conflict_with(&self, id: &str) -> Option<&SkillRelation> {
        find_relation(&self.conflicts_with, id)
    }

    #[must_use]
    pub fn discouragement_of(&self, id: &str) -> Option<&SkillRelation> {
        find_relation(&self.discourages, id)
    }

    #[must_use]
    pub fn recommendation_of(&self, id: &str) -> Option<&SkillRelation> {
        find_relation(&self.recommends, id)
    }

    /// Whether any requirement entry of this skill names `id`.
    #[must_use]
    pub fn requires_skill(&self, id: &str) -> bool {
        self.requires.iter().any(|req| req.names(id))
    }
}

fn find_relation<'a>(list: &'a [SkillRelation], id: &str) -> Option<&'a SkillRelation> {
    list.iter().find(|rel| rel.skill.id() == id)
}

/// Pre-built bundle after merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub id: String,
    pub name: String,
    pub description: String,
    pub skills: Vec<SkillRef>,
}

/// Root aggregate produced by the merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedSkillsMatrix {
    pub version: String,
    pub categories: BTreeMap<String, CategoryDefinition>,
    pub skills: BTreeMap<SkillId, ResolvedSkill>,
    pub suggested_stacks: Vec<Stack>,
    pub display_name_to_id: BTreeMap<String, SkillId>,
    pub id_to_display_name: BTreeMap<SkillId, String>,
    pub generated_at: DateTime<Utc>,
}

impl MergedSkillsMatrix {
    #[must_use]
    pub fn skill(&self, id: &str) -> Option<&ResolvedSkill> {
        self.skills.get(id)
    }

    /// Skills in `category`, ordered by id.
    pub fn skills_in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ResolvedSkill> + 'a {
        self.skills.values().filter(move |s| s.category == category)
    }
}
