use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmxError};
use crate::matrix::MatrixSource;
use crate::sources::multi::DEFAULT_PUBLIC_CATALOG_URL;
use crate::sources::{ExtraSource, PrimarySource, SourceConfig};

pub const PROJECT_CONFIG: &str = ".smx/config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matrix: MatrixSettings,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Layer defaults, global config, project config and environment.
    ///
    /// An explicit path (argument or `SMX_CONFIG`) replaces both the global
    /// and the project file.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env_string("SMX_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                SmxError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_root.join(PROJECT_CONFIG))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match dirs::config_dir() {
            Some(dir) => Self::load_patch(&dir.join("smx/config.toml")),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SmxError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SmxError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.matrix {
            self.matrix.merge(patch);
        }
        if let Some(patch) = patch.sources {
            self.sources.merge(patch);
        }
        if let Some(patch) = patch.plugins {
            self.plugins.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("SMX_MATRIX_PATH") {
            self.matrix.path = Some(PathBuf::from(value));
        }
        if let Some(values) = env_list("SMX_SKILLS_DIRS") {
            self.matrix.skills_dirs = merge_unique(values, &self.matrix.skills_dirs);
        }

        if let Some(value) = env_string("SMX_PRIMARY_SOURCE") {
            self.sources.primary_name = value;
        }
        if let Some(value) = env_bool("SMX_PRIMARY_PRIVATE") {
            self.sources.primary_private = value;
        }
        if let Some(value) = env_bool("SMX_FORCE_REFRESH") {
            self.sources.force_refresh = value;
        }
        if let Some(value) = env_u64("SMX_FETCH_TIMEOUT_SECS")? {
            self.sources.fetch_timeout_secs = value;
        }

        if let Some(value) = env_string("SMX_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(value));
        }
        if let Some(value) = env_string("SMX_PLUGIN_REGISTRY") {
            self.plugins.registry = Some(PathBuf::from(value));
        }

        Ok(())
    }

    /// Where the matrix document comes from. Relative paths resolve against
    /// `project_root`.
    #[must_use]
    pub fn matrix_source(&self, project_root: &Path) -> MatrixSource {
        if let Some(path) = &self.matrix.path {
            return MatrixSource::File(project_root.join(path));
        }
        match (&self.matrix.categories, &self.matrix.rules) {
            (Some(categories), Some(rules)) => MatrixSource::Split {
                categories: project_root.join(categories),
                rules: project_root.join(rules),
            },
            _ => MatrixSource::Builtin,
        }
    }

    #[must_use]
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            primary: PrimarySource {
                name: self.sources.primary_name.clone(),
                url: self.sources.primary_url.clone(),
                private: self.sources.primary_private,
            },
            // An empty url turns the public fallback off.
            public_fallback_url: self
                .sources
                .public_fallback_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
            extra: self.sources.extra.clone(),
            fetch_timeout: Duration::from_secs(self.sources.fetch_timeout_secs.max(1)),
            force_refresh: self.sources.force_refresh,
        }
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("smx")
        })
    }

    /// Plugin registry location, `None` when no home directory is known.
    #[must_use]
    pub fn plugin_registry(&self) -> Option<PathBuf> {
        self.plugins.registry.clone().or_else(|| {
            dirs::home_dir().map(|home| home.join(".claude/plugins/installed_plugins.json"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixSettings {
    /// Single-file matrix document.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Split layout: categories document.
    #[serde(default)]
    pub categories: Option<PathBuf>,
    /// Split layout: rules document.
    #[serde(default)]
    pub rules: Option<PathBuf>,
    /// Project overrides layered on top of the loaded matrix.
    #[serde(default)]
    pub overrides: Option<PathBuf>,
    /// Catalog skill roots.
    #[serde(default)]
    pub skills_dirs: Vec<String>,
    /// Project-local skills, tagged as local.
    #[serde(default)]
    pub local_skills_dir: String,
}

impl Default for MatrixSettings {
    fn default() -> Self {
        Self {
            path: None,
            categories: None,
            rules: None,
            overrides: Some(PathBuf::from(".smx/skills-matrix.yaml")),
            skills_dirs: Vec::new(),
            local_skills_dir: ".claude/skills".to_string(),
        }
    }
}

impl MatrixSettings {
    fn merge(&mut self, patch: MatrixPatch) {
        if let Some(value) = patch.path {
            self.path = Some(value);
        }
        if let Some(value) = patch.categories {
            self.categories = Some(value);
        }
        if let Some(value) = patch.rules {
            self.rules = Some(value);
        }
        if let Some(value) = patch.overrides {
            self.overrides = Some(value);
        }
        if let Some(values) = patch.skills_dirs {
            self.skills_dirs = merge_unique(values, &self.skills_dirs);
        }
        if let Some(value) = patch.local_skills_dir {
            self.local_skills_dir = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub primary_name: String,
    #[serde(default)]
    pub primary_url: Option<String>,
    #[serde(default)]
    pub primary_private: bool,
    #[serde(default)]
    pub public_fallback_url: Option<String>,
    #[serde(default)]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub extra: Vec<ExtraSource>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            primary_name: "public".to_string(),
            primary_url: None,
            primary_private: false,
            public_fallback_url: Some(DEFAULT_PUBLIC_CATALOG_URL.to_string()),
            fetch_timeout_secs: 30,
            force_refresh: false,
            extra: Vec::new(),
        }
    }
}

impl SourcesConfig {
    fn merge(&mut self, patch: SourcesPatch) {
        if let Some(value) = patch.primary_name {
            self.primary_name = value;
        }
        if let Some(value) = patch.primary_url {
            self.primary_url = Some(value);
        }
        if let Some(value) = patch.primary_private {
            self.primary_private = value;
        }
        if let Some(value) = patch.public_fallback_url {
            self.public_fallback_url = Some(value);
        }
        if let Some(value) = patch.fetch_timeout_secs {
            self.fetch_timeout_secs = value;
        }
        if let Some(value) = patch.force_refresh {
            self.force_refresh = value;
        }
        if let Some(extra) = patch.extra {
            for source in extra {
                match self.extra.iter_mut().find(|s| s.name == source.name) {
                    Some(existing) => *existing = source,
                    None => self.extra.push(source),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default)]
    pub registry: Option<PathBuf>,
}

impl PluginsConfig {
    fn merge(&mut self, patch: PluginsPatch) {
        if let Some(value) = patch.registry {
            self.registry = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.dir {
            self.dir = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub matrix: Option<MatrixPatch>,
    pub sources: Option<SourcesPatch>,
    pub plugins: Option<PluginsPatch>,
    pub cache: Option<CachePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MatrixPatch {
    pub path: Option<PathBuf>,
    pub categories: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub overrides: Option<PathBuf>,
    pub skills_dirs: Option<Vec<String>>,
    pub local_skills_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SourcesPatch {
    pub primary_name: Option<String>,
    pub primary_url: Option<String>,
    pub primary_private: Option<bool>,
    pub public_fallback_url: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub force_refresh: Option<bool>,
    pub extra: Option<Vec<ExtraSource>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PluginsPatch {
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub dir: Option<PathBuf>,
}

fn merge_unique(values: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.into_iter().chain(existing.iter().cloned()) {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u64>().map(Some).map_err(|err| {
            SmxError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::SkillsFixture;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.sources.primary_name, "public");
        assert_eq!(config.sources.fetch_timeout_secs, 30);
        assert_eq!(config.matrix.local_skills_dir, ".claude/skills");
        assert_eq!(
            config.matrix_source(Path::new("/project")),
            MatrixSource::Builtin
        );
    }

    #[test]
    fn explicit_file_is_merged_over_defaults() {
        let fixture = SkillsFixture::new();
        let path = fixture.create_file(
            "smx.toml",
            r#"
[matrix]
path = "config/skills-matrix.yaml"
skills_dirs = ["skills"]

[sources]
primary_name = "acme"
primary_private = true
public_fallback_url = "github:acme/public-skills"
fetch_timeout_secs = 5

[[sources.extra]]
name = "team"
url = "github:acme/team-skills"
"#,
        );

        let config = Config::load(Some(&path), fixture.path()).unwrap();
        assert_eq!(config.matrix.skills_dirs, vec!["skills".to_string()]);
        assert_eq!(
            config.matrix_source(Path::new("/p")),
            MatrixSource::File(PathBuf::from("/p/config/skills-matrix.yaml"))
        );

        let sources = config.source_config();
        assert_eq!(sources.primary.name, "acme");
        assert!(sources.primary.private);
        assert_eq!(sources.fetch_timeout, Duration::from_secs(5));
        assert_eq!(sources.extra, vec![ExtraSource::new("team", "github:acme/team-skills")]);
    }

    #[test]
    fn public_fallback_defaults_on_and_can_be_disabled() {
        let mut config = Config::default();
        config.merge_patch(toml::from_str("[sources]\nprimary_private = true\n").unwrap());
        let sources = config.source_config();
        assert!(sources.primary.private);
        assert_eq!(
            sources.public_fallback_url.as_deref(),
            Some(DEFAULT_PUBLIC_CATALOG_URL)
        );

        config.merge_patch(toml::from_str("[sources]\npublic_fallback_url = \"\"\n").unwrap());
        assert_eq!(config.source_config().public_fallback_url, None);
    }

    #[test]
    fn split_matrix_layout() {
        let mut config = Config::default();
        config.merge_patch(
            toml::from_str("[matrix]\ncategories = \"c.yaml\"\nrules = \"r.yaml\"\n").unwrap(),
        );
        assert_eq!(
            config.matrix_source(Path::new("/p")),
            MatrixSource::Split {
                categories: PathBuf::from("/p/c.yaml"),
                rules: PathBuf::from("/p/r.yaml"),
            }
        );
    }

    #[test]
    fn extra_sources_replace_by_name() {
        let mut config = Config::default();
        config.merge_patch(
            toml::from_str("[[sources.extra]]\nname = \"team\"\nurl = \"a\"\n").unwrap(),
        );
        config.merge_patch(
            toml::from_str(
                "[[sources.extra]]\nname = \"team\"\nurl = \"b\"\n[[sources.extra]]\nname = \"other\"\nurl = \"c\"\n",
            )
            .unwrap(),
        );
        let urls: Vec<&str> = config.sources.extra.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "c"]);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let fixture = SkillsFixture::new();
        let err = Config::load(Some(&fixture.path().join("nope.toml")), fixture.path()).unwrap_err();
        assert!(matches!(err, SmxError::MissingConfig(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let fixture = SkillsFixture::new();
        let path = fixture.create_file("bad.toml", "[matrix\npath = 1");
        let err = Config::load(Some(&path), fixture.path()).unwrap_err();
        assert!(matches!(err, SmxError::Config(_)));
    }
}
