//! Skill metadata scanner.
//!
//! A skill directory holds a `SKILL.md` (YAML frontmatter with the skill
//! `name`) and a `metadata.yaml` describing its category and relationships.

use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::types::ExtractedSkillMetadata;
use crate::error::{Result, SmxError};

pub const METADATA_FILE: &str = "metadata.yaml";
pub const SKILL_FILE: &str = "SKILL.md";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawMetadata {
    id: Option<String>,
    category: Option<String>,
    cli_name: Option<String>,
    display_name: Option<String>,
    cli_description: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    author: Option<String>,
    requires: Vec<String>,
    compatible_with: Vec<String>,
    conflicts_with: Vec<String>,
    requires_setup: Vec<String>,
    provides_setup_for: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SkillFrontmatter {
    name: Option<String>,
    description: Option<String>,
}

/// Body of a `---` delimited YAML frontmatter block, if the document starts with one.
#[must_use]
pub fn frontmatter(content: &str) -> Option<&str> {
    let rest = content.trim_start_matches('\u{feff}');
    let rest = rest
        .strip_prefix("---\n")
        .or_else(|| rest.strip_prefix("---\r\n"))?;
    if rest.starts_with("---") {
        return Some("");
    }
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

/// Deserialize the frontmatter of `content`. `Ok(None)` when there is none.
pub fn parse_frontmatter<T: DeserializeOwned>(content: &str) -> Result<Option<T>> {
    match frontmatter(content) {
        Some(body) if body.trim().is_empty() => Ok(None),
        Some(body) => Ok(Some(serde_yaml::from_str(body)?)),
        None => Ok(None),
    }
}

fn skill_name(dir: &Path) -> Option<(String, Option<String>)> {
    let path = dir.join(SKILL_FILE);
    let content = std::fs::read_to_string(&path).ok()?;
    match parse_frontmatter::<SkillFrontmatter>(&content) {
        Ok(Some(fm)) => fm
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .map(|n| (n, fm.description)),
        Ok(None) => None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "unreadable SKILL.md frontmatter");
            None
        }
    }
}

fn relative_dir(root: &Path, dir: &Path) -> String {
    dir.strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Walk `root` for skill metadata files.
///
/// Skills with unparseable metadata or without an id or category are skipped
/// with a warning. A skill without a `cliName` fails the whole scan.
pub fn extract_skills(root: &Path, local: bool) -> Result<Vec<ExtractedSkillMetadata>> {
    if !root.exists() {
        debug!(root = %root.display(), "skills root does not exist");
        return Ok(Vec::new());
    }

    let mut extracted = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() || entry.file_name() != METADATA_FILE {
            continue;
        }
        let path = entry.path();
        let Some(dir) = path.parent() else { continue };

        let raw: RawMetadata = match std::fs::read_to_string(path)
            .map_err(SmxError::from)
            .and_then(|content| Ok(serde_yaml::from_str(&content)?))
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping skill with malformed metadata");
                continue;
            }
        };

        let from_skill_md = skill_name(dir);
        let id = from_skill_md
            .as_ref()
            .map(|(name, _)| name.clone())
            .or_else(|| non_blank(raw.id.clone()));
        let Some(id) = id else {
            warn!(path = %path.display(), "skipping skill without an id");
            continue;
        };
        let Some(category) = non_blank(raw.category) else {
            warn!(path = %path.display(), id = %id, "skipping skill without a category");
            continue;
        };
        let cli_name = non_blank(raw.cli_name).ok_or_else(|| SmxError::MissingField {
            skill: id.clone(),
            field: "cliName",
        })?;

        let description = non_blank(raw.cli_description)
            .or_else(|| non_blank(raw.description))
            .or_else(|| from_skill_md.and_then(|(_, d)| non_blank(d)))
            .unwrap_or_default();

        extracted.push(ExtractedSkillMetadata {
            id,
            directory_path: relative_dir(root, dir),
            display_name: non_blank(raw.display_name),
            cli_name,
            description,
            category,
            tags: raw.tags,
            author: raw.author.unwrap_or_default(),
            local,
            local_path: local.then(|| dir.display().to_string()),
            requires: raw.requires,
            compatible_with: raw.compatible_with,
            conflicts_with: raw.conflicts_with,
            requires_setup: raw.requires_setup,
            provides_setup_for: raw.provides_setup_for,
        });
    }

    debug!(root = %root.display(), count = extracted.len(), local, "extracted skill metadata");
    Ok(extracted)
}
