//! Skill listing for a fetched catalog directory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SmxError};
use crate::matrix::SkillId;
use crate::matrix::extract::{SKILL_FILE, parse_frontmatter};

/// One skill offered by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: SkillId,
    /// Skill directory relative to the catalog root, `/`-separated.
    pub path: String,
}

impl CatalogEntry {
    /// Last segment of the directory path.
    #[must_use]
    pub fn dir_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFrontmatter {
    name: Option<String>,
}

/// Every `SKILL.md` under `root` whose frontmatter carries a `name`.
pub fn extract_catalog(root: &Path) -> Result<Vec<CatalogEntry>> {
    if !root.is_dir() {
        return Err(SmxError::Fetch {
            url: root.display().to_string(),
            message: "catalog directory does not exist".to_string(),
        });
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() || entry.file_name() != SKILL_FILE {
            continue;
        }
        let path = entry.path();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable catalog skill");
                continue;
            }
        };
        let name = match parse_frontmatter::<CatalogFrontmatter>(&content) {
            Ok(fm) => fm.and_then(|fm| fm.name).map(|n| n.trim().to_string()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed catalog frontmatter");
                continue;
            }
        };
        let Some(id) = name.filter(|n| !n.is_empty()) else {
            debug!(path = %path.display(), "catalog skill without a name");
            continue;
        };

        let dir = path.parent().unwrap_or(root);
        let relative = dir
            .strip_prefix(root)
            .unwrap_or(dir)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(CatalogEntry { id, path: relative });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::SkillsFixture;

    #[test]
    fn lists_named_skills() {
        let fixture = SkillsFixture::new();
        fixture.create_catalog_skill("skills/web/framework/react", "web-framework-react");
        fixture.create_catalog_skill("skills/api/hono (@acme)", "api-framework-hono");
        fixture.create_file("skills/unnamed/SKILL.md", "# no frontmatter\n");
        fixture.create_file(".git/SKILL.md", "---\nname: ignored\n---\n");

        let entries = extract_catalog(fixture.path()).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["api-framework-hono", "web-framework-react"]);
        assert_eq!(entries[0].path, "skills/api/hono (@acme)");
        assert_eq!(entries[0].dir_name(), "hono (@acme)");
    }

    #[test]
    fn missing_root_is_an_error() {
        let fixture = SkillsFixture::new();
        assert!(extract_catalog(&fixture.path().join("gone")).is_err());
    }
}
