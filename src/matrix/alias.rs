//! Alias and identity resolution.
//!
//! Maps short display names and on-disk directory paths to canonical skill
//! identifiers. Resolution never fails: a reference that cannot be mapped to a
//! known skill comes back as [`SkillRef::Unresolved`] so the health checker can
//! report it later.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::types::{ExtractedSkillMetadata, SkillId, SkillRef};

static SKILL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid skill id regex"));

/// Whether `id` is a well-formed kebab-case identifier.
#[must_use]
pub fn is_valid_skill_id(id: &str) -> bool {
    SKILL_ID_RE.is_match(id)
}

/// Both directions of the display-name alias map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMaps {
    pub display_name_to_id: BTreeMap<String, SkillId>,
    pub id_to_display_name: BTreeMap<SkillId, String>,
}

impl AliasMaps {
    /// Build both maps from the forward `display name -> id` map.
    ///
    /// Blank display names and malformed ids are dropped with a warning. When
    /// several display names map to one id, the reverse map keeps the first.
    #[must_use]
    pub fn build(aliases: &BTreeMap<String, String>) -> Self {
        let mut maps = Self::default();
        for (display_name, id) in aliases {
            let display_name = display_name.trim();
            let id = id.trim();
            if display_name.is_empty() {
                warn!(id, "dropping alias with blank display name");
                continue;
            }
            if !is_valid_skill_id(id) {
                warn!(display_name, id, "dropping alias with malformed skill id");
                continue;
            }
            maps.display_name_to_id
                .insert(display_name.to_string(), id.to_string());
            if let Some(existing) = maps.id_to_display_name.get(id) {
                warn!(
                    id,
                    kept = %existing,
                    ignored = display_name,
                    "multiple display names for one skill"
                );
                continue;
            }
            maps.id_to_display_name
                .insert(id.to_string(), display_name.to_string());
        }
        maps
    }
}

/// Canonicalizes raw references against display names, directory paths and
/// the set of known skill ids.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    display_names: HashMap<String, SkillId>,
    directories: HashMap<String, SkillId>,
    known_ids: HashSet<SkillId>,
}

impl AliasResolver {
    #[must_use]
    pub fn new(
        display_name_to_id: &BTreeMap<String, SkillId>,
        skills: &[ExtractedSkillMetadata],
    ) -> Self {
        let mut directories = HashMap::new();
        let mut ambiguous_tails = HashSet::new();
        let mut tails: HashMap<String, SkillId> = HashMap::new();

        for skill in skills {
            let path = normalize_path(&skill.directory_path);
            if path.is_empty() || path == skill.id {
                continue;
            }
            directories.insert(path.clone(), skill.id.clone());
            if let Some(tail) = last_segment(&path) {
                if tail != skill.id && tails.insert(tail.to_string(), skill.id.clone()).is_some() {
                    ambiguous_tails.insert(tail.to_string());
                }
            }
        }
        for tail in ambiguous_tails {
            debug!(directory = %tail, "directory name shared by several skills; not used as alias");
            tails.remove(&tail);
        }
        for (tail, id) in tails {
            directories.entry(tail).or_insert(id);
        }

        Self {
            display_names: display_name_to_id.clone().into_iter().collect(),
            directories,
            known_ids: skills.iter().map(|s| s.id.clone()).collect(),
        }
    }

    /// Map `raw` through display names, then directory paths; otherwise return it unchanged.
    #[must_use]
    pub fn canonicalize(&self, raw: &str) -> SkillId {
        let raw = raw.trim();
        if let Some(id) = self.display_names.get(raw) {
            return id.clone();
        }
        if let Some(id) = self.directories.get(&normalize_path(raw)) {
            return id.clone();
        }
        raw.to_string()
    }

    /// Resolve `raw` to a [`SkillRef`]. `context` names where the reference came from.
    #[must_use]
    pub fn resolve(&self, raw: &str, context: &str) -> SkillRef {
        let id = self.canonicalize(raw);
        if self.known_ids.contains(&id) {
            SkillRef::Resolved(id)
        } else {
            debug!(reference = raw, context, "unresolved skill reference");
            SkillRef::Unresolved(id)
        }
    }

    /// Resolve a list of raw references, dropping duplicates but keeping order.
    #[must_use]
    pub fn resolve_all(&self, raws: &[String], context: &str) -> Vec<SkillRef> {
        let mut seen = HashSet::new();
        raws.iter()
            .map(|raw| self.resolve(raw, context))
            .filter(|r| seen.insert(r.id().to_string()))
            .collect()
    }

    #[must_use]
    pub fn is_known(&self, id: &str) -> bool {
        self.known_ids.contains(id)
    }
}

fn normalize_path(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .trim_start_matches("./")
        .trim_matches('/')
        .to_string()
}

fn last_segment(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|s| !s.is_empty())
}
