//! Multi-source provenance tagging.
//!
//! [`MultiSourceLoader::tag`] takes the merged matrix by value, runs the six
//! tagging phases in order and hands the matrix back. Each phase is a plain
//! `matrix -> matrix` step; later phases read the `installed` flags and source
//! names written by earlier ones, so the order is fixed.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::catalog::{CatalogEntry, extract_catalog};
use super::fetch::{FetchOptions, SourceFetcher};
use super::plugins::PluginRegistry;
use crate::error::{Result, SmxError};
use crate::matrix::{InstallMode, MergedSkillsMatrix, SkillId, SkillSource, SourceType};

pub const LOCAL_SOURCE_NAME: &str = "local";
pub const PUBLIC_SOURCE_NAME: &str = "public";
pub const PLUGIN_SOURCE_NAME: &str = "plugin";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Public catalog consulted for private primaries unless configured otherwise.
pub const DEFAULT_PUBLIC_CATALOG_URL: &str = "github:anthropics/skills";

/// The marketplace every skill is assumed to come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimarySource {
    pub name: String,
    pub url: Option<String>,
    pub private: bool,
}

impl Default for PrimarySource {
    fn default() -> Self {
        Self {
            name: PUBLIC_SOURCE_NAME.to_string(),
            url: None,
            private: false,
        }
    }
}

impl PrimarySource {
    const fn source_type(&self) -> SourceType {
        if self.private {
            SourceType::Private
        } else {
            SourceType::Public
        }
    }
}

/// An additional remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub private: bool,
}

impl ExtraSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            private: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub primary: PrimarySource,
    /// Public catalog consulted when the primary marketplace is private.
    pub public_fallback_url: Option<String>,
    pub extra: Vec<ExtraSource>,
    pub fetch_timeout: Duration,
    pub force_refresh: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            primary: PrimarySource::default(),
            public_fallback_url: Some(DEFAULT_PUBLIC_CATALOG_URL.to_string()),
            extra: Vec::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            force_refresh: false,
        }
    }
}

/// Facts about the project being configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectContext {
    pub plugins: PluginRegistry,
}

/// A catalog entry from an extra source matching a searched alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSearchResult {
    pub source_name: String,
    pub source_url: String,
    pub skill_id: SkillId,
    pub path: String,
}

pub struct MultiSourceLoader<F> {
    fetcher: F,
}

impl<F: SourceFetcher> MultiSourceLoader<F> {
    pub const fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Tag every skill with the catalogs that offer it and pick its active
    /// source. Source failures are logged and skipped; this never fails.
    pub async fn tag(
        &self,
        matrix: MergedSkillsMatrix,
        config: &SourceConfig,
        project: &ProjectContext,
    ) -> MergedSkillsMatrix {
        let matrix = tag_primary(matrix, &config.primary);
        let matrix = tag_local(matrix);
        let matrix = tag_plugins(matrix, &config.primary, &project.plugins);
        let matrix = self.tag_public_fallback(matrix, config).await;
        let matrix = self.tag_extra_sources(matrix, config).await;
        let matrix = select_active_sources(matrix);

        let installed = matrix
            .skills
            .values()
            .filter(|s| s.active_source.as_ref().is_some_and(|a| a.installed))
            .count();
        info!(
            skills = matrix.skills.len(),
            installed,
            extra_sources = config.extra.len(),
            "tagged skill sources"
        );
        matrix
    }

    async fn fetch_catalog(&self, url: &str, config: &SourceConfig) -> Result<Vec<CatalogEntry>> {
        let options = FetchOptions {
            force_refresh: config.force_refresh,
        };
        let fetched = timeout(config.fetch_timeout, self.fetcher.fetch(url, options))
            .await
            .map_err(|_| SmxError::FetchTimeout {
                url: url.to_string(),
                secs: config.fetch_timeout.as_secs(),
            })??;
        debug!(url, path = %fetched.path.display(), from_cache = fetched.from_cache, "fetched catalog");
        extract_catalog(&fetched.path)
    }

    async fn tag_public_fallback(
        &self,
        mut matrix: MergedSkillsMatrix,
        config: &SourceConfig,
    ) -> MergedSkillsMatrix {
        if !config.primary.private {
            return matrix;
        }
        let Some(url) = config.public_fallback_url.as_deref() else {
            debug!("private primary source without a public fallback");
            return matrix;
        };
        let catalog = match self.fetch_catalog(url, config).await {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(url, error = %err, "public catalog unavailable, skipping");
                return matrix;
            }
        };

        let mut source = SkillSource::new(PUBLIC_SOURCE_NAME, SourceType::Public);
        source.url = Some(url.to_string());
        let tagged = append_overlap(&mut matrix, &catalog, &source);
        debug!(tagged, "tagged public fallback source");
        matrix
    }

    async fn tag_extra_sources(
        &self,
        mut matrix: MergedSkillsMatrix,
        config: &SourceConfig,
    ) -> MergedSkillsMatrix {
        let mut fetched = Vec::with_capacity(config.extra.len());
        for extra in &config.extra {
            if extra.name == config.primary.name || extra.name == PUBLIC_SOURCE_NAME {
                warn!(
                    source = %extra.name,
                    url = %extra.url,
                    "extra source shares a built-in source name"
                );
            }
            match self.fetch_catalog(&extra.url, config).await {
                Ok(catalog) => fetched.push((extra, catalog)),
                Err(err) => {
                    warn!(source = %extra.name, url = %extra.url, error = %err, "extra source unavailable, skipping");
                }
            }
        }

        for (extra, catalog) in fetched {
            let source_type = if extra.private {
                SourceType::Private
            } else {
                SourceType::Public
            };
            let mut source = SkillSource::new(extra.name.clone(), source_type);
            source.url = Some(extra.url.clone());
            let tagged = append_overlap(&mut matrix, &catalog, &source);
            debug!(source = %extra.name, tagged, "tagged extra source");
        }
        matrix
    }

    /// Catalog entries from the extra sources whose directory name equals
    /// `alias`, ignoring case. Unavailable sources are logged and skipped.
    pub async fn search_extra_sources(
        &self,
        alias: &str,
        config: &SourceConfig,
    ) -> Vec<SourceSearchResult> {
        let alias = alias.trim().to_lowercase();
        let mut results = Vec::new();
        for extra in &config.extra {
            let catalog = match self.fetch_catalog(&extra.url, config).await {
                Ok(catalog) => catalog,
                Err(err) => {
                    warn!(source = %extra.name, url = %extra.url, error = %err, "extra source unavailable, skipping");
                    continue;
                }
            };
            results.extend(
                catalog
                    .into_iter()
                    .filter(|entry| entry.dir_name().to_lowercase() == alias)
                    .map(|entry| SourceSearchResult {
                        source_name: extra.name.clone(),
                        source_url: extra.url.clone(),
                        skill_id: entry.id,
                        path: entry.path,
                    }),
            );
        }
        results
    }
}

/// Append `source` to every matrix skill that `catalog` also offers, unless
/// the skill already lists a source with the same name and url. Returns how
/// many skills were tagged.
fn append_overlap(
    matrix: &mut MergedSkillsMatrix,
    catalog: &[CatalogEntry],
    source: &SkillSource,
) -> usize {
    let offered: HashSet<&str> = catalog.iter().map(|e| e.id.as_str()).collect();
    let mut tagged = 0;
    for skill in matrix.skills.values_mut() {
        if !offered.contains(skill.id.as_str())
            || skill
                .available_sources
                .iter()
                .any(|s| s.name == source.name && s.url == source.url)
        {
            continue;
        }
        skill.available_sources.push(source.clone());
        tagged += 1;
    }
    tagged
}

fn tag_primary(mut matrix: MergedSkillsMatrix, primary: &PrimarySource) -> MergedSkillsMatrix {
    let mut source = SkillSource::new(primary.name.clone(), primary.source_type());
    source.url.clone_from(&primary.url);
    source.primary = true;
    for skill in matrix.skills.values_mut() {
        skill.available_sources.push(source.clone());
    }
    matrix
}

fn tag_local(mut matrix: MergedSkillsMatrix) -> MergedSkillsMatrix {
    for skill in matrix.skills.values_mut().filter(|s| s.local) {
        let mut source = SkillSource::new(LOCAL_SOURCE_NAME, SourceType::Local);
        source.url.clone_from(&skill.local_path);
        source.installed = true;
        source.install_mode = Some(InstallMode::Local);
        skill.available_sources.push(source);
    }
    matrix
}

fn tag_plugins(
    mut matrix: MergedSkillsMatrix,
    primary: &PrimarySource,
    plugins: &PluginRegistry,
) -> MergedSkillsMatrix {
    for plugin in plugins.installed() {
        let Some(skill) = matrix.skills.get_mut(&plugin.skill_id) else {
            debug!(skill = %plugin.skill_id, "installed plugin is not in the matrix");
            continue;
        };
        if let Some(existing) = skill
            .available_sources
            .iter_mut()
            .find(|s| s.name == primary.name)
        {
            existing.installed = true;
            existing.install_mode = Some(InstallMode::Plugin);
            if plugin.version.is_some() {
                existing.version.clone_from(&plugin.version);
            }
        } else {
            let name = plugin.marketplace.as_deref().unwrap_or(PLUGIN_SOURCE_NAME);
            let mut source = SkillSource::new(name, primary.source_type());
            source.version.clone_from(&plugin.version);
            source.installed = true;
            source.install_mode = Some(InstallMode::Plugin);
            skill.available_sources.push(source);
        }
    }
    matrix
}

/// First installed source wins, otherwise the first source listed.
fn select_active_sources(mut matrix: MergedSkillsMatrix) -> MergedSkillsMatrix {
    for skill in matrix.skills.values_mut() {
        skill.active_source = skill
            .available_sources
            .iter()
            .find(|s| s.installed)
            .or_else(|| skill.available_sources.first())
            .cloned();
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{ExtractedSkillMetadata, MatrixConfig, merge};
    use crate::sources::FetchedSource;
    use crate::sources::plugins::InstalledPlugin;
    use crate::test_utils::fixtures::SkillsFixture;
    use crate::test_utils::logging::capture_logs;
    use std::collections::HashMap;
    use tracing::Level;
    use std::path::PathBuf;

    /// Serves fixture directories by URL; unknown URLs fail, `slow` URLs hang.
    struct FakeFetcher {
        catalogs: HashMap<String, PathBuf>,
        slow: HashSet<String>,
    }

    impl SourceFetcher for FakeFetcher {
        async fn fetch(&self, url: &str, _options: FetchOptions) -> Result<FetchedSource> {
            if self.slow.contains(url) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.catalogs
                .get(url)
                .map(|path| FetchedSource {
                    path: path.clone(),
                    from_cache: true,
                })
                .ok_or_else(|| SmxError::Fetch {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                })
        }
    }

    const MATRIX: &str = "version: '1'\ncategories:\n  web-framework: { domain: web }\n";

    fn matrix() -> MergedSkillsMatrix {
        let mut vue = ExtractedSkillMetadata::new("web-framework-vue", "web-framework");
        vue.local = true;
        vue.local_path = Some("/project/.claude/skills/vue".to_string());
        merge(
            &MatrixConfig::from_yaml_str(MATRIX).unwrap(),
            vec![
                ExtractedSkillMetadata::new("web-framework-react", "web-framework"),
                vue,
                ExtractedSkillMetadata::new("web-framework-solid", "web-framework"),
            ],
        )
        .unwrap()
    }

    fn names(matrix: &MergedSkillsMatrix, id: &str) -> Vec<String> {
        matrix.skills[id]
            .available_sources
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    fn loader(fixture: &SkillsFixture, slow: &[&str]) -> MultiSourceLoader<FakeFetcher> {
        MultiSourceLoader::new(FakeFetcher {
            catalogs: HashMap::from([("github:acme/skills".to_string(), fixture.path().to_path_buf())]),
            slow: slow.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn primary_and_local_phases() {
        let fixture = SkillsFixture::new();
        let tagged = loader(&fixture, &[])
            .tag(matrix(), &SourceConfig::default(), &ProjectContext::default())
            .await;

        let react = &tagged.skills["web-framework-react"];
        assert_eq!(react.available_sources.len(), 1);
        assert!(react.available_sources[0].primary);
        assert!(!react.available_sources[0].installed);
        assert_eq!(react.active_source.as_ref().unwrap().name, "public");

        let vue = &tagged.skills["web-framework-vue"];
        assert_eq!(names(&tagged, "web-framework-vue"), vec!["public", "local"]);
        let active = vue.active_source.as_ref().unwrap();
        assert_eq!(active.source_type, SourceType::Local);
        assert_eq!(active.install_mode, Some(InstallMode::Local));
    }

    #[tokio::test]
    async fn plugin_flips_primary_or_appends() {
        let fixture = SkillsFixture::new();
        let project = ProjectContext {
            plugins: [
                InstalledPlugin::new("web-framework-react").with_version("2.0.0"),
                InstalledPlugin::new("web-framework-ghost"),
            ]
            .into_iter()
            .collect(),
        };
        let tagged = loader(&fixture, &[])
            .tag(matrix(), &SourceConfig::default(), &project)
            .await;
        let react = &tagged.skills["web-framework-react"];
        assert_eq!(react.available_sources.len(), 1);
        let active = react.active_source.as_ref().unwrap();
        assert!(active.installed);
        assert_eq!(active.install_mode, Some(InstallMode::Plugin));
        assert_eq!(active.version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn plugin_without_primary_source_is_appended() {
        let mut matrix = matrix();
        matrix
            .skills
            .get_mut("web-framework-react")
            .unwrap()
            .available_sources
            .push(SkillSource::new("acme", SourceType::Public));
        let plugins: PluginRegistry = [InstalledPlugin::new("web-framework-react").with_marketplace("acme-plugins")]
            .into_iter()
            .collect();
        let matrix = tag_plugins(matrix, &PrimarySource::default(), &plugins);
        let matrix = select_active_sources(matrix);
        let react = &matrix.skills["web-framework-react"];
        assert_eq!(names(&matrix, "web-framework-react"), vec!["acme", "acme-plugins"]);
        assert_eq!(react.active_source.as_ref().unwrap().name, "acme-plugins");
    }

    #[tokio::test]
    async fn public_fallback_only_for_private_primary() {
        let fixture = SkillsFixture::new();
        fixture.create_catalog_skill("react", "web-framework-react");
        let mut config = SourceConfig {
            public_fallback_url: Some("github:acme/skills".to_string()),
            ..SourceConfig::default()
        };

        let tagged = loader(&fixture, &[])
            .tag(matrix(), &config, &ProjectContext::default())
            .await;
        assert_eq!(names(&tagged, "web-framework-react"), vec!["public"]);

        config.primary = PrimarySource {
            name: "acme-private".to_string(),
            url: None,
            private: true,
        };
        let tagged = loader(&fixture, &[])
            .tag(matrix(), &config, &ProjectContext::default())
            .await;
        assert_eq!(
            names(&tagged, "web-framework-react"),
            vec!["acme-private", "public"]
        );
        assert_eq!(names(&tagged, "web-framework-solid"), vec!["acme-private"]);
        let react = &tagged.skills["web-framework-react"];
        assert_eq!(react.active_source.as_ref().unwrap().name, "acme-private");
    }

    #[tokio::test]
    async fn private_primary_uses_default_public_catalog() {
        let fixture = SkillsFixture::new();
        fixture.create_catalog_skill("react", "web-framework-react");
        let loader = MultiSourceLoader::new(FakeFetcher {
            catalogs: HashMap::from([(
                DEFAULT_PUBLIC_CATALOG_URL.to_string(),
                fixture.path().to_path_buf(),
            )]),
            slow: HashSet::new(),
        });
        let config = SourceConfig {
            primary: PrimarySource {
                name: "acme-private".to_string(),
                url: None,
                private: true,
            },
            ..SourceConfig::default()
        };

        let tagged = loader.tag(matrix(), &config, &ProjectContext::default()).await;
        assert_eq!(
            names(&tagged, "web-framework-react"),
            vec!["acme-private", "public"]
        );
        let public = &tagged.skills["web-framework-react"].available_sources[1];
        assert_eq!(public.url.as_deref(), Some(DEFAULT_PUBLIC_CATALOG_URL));
        assert!(!public.installed);
    }

    #[test]
    fn extra_source_named_like_primary_is_still_applied() {
        let fixture = SkillsFixture::new();
        fixture.create_catalog_skill("react", "web-framework-react");
        let config = SourceConfig {
            extra: vec![ExtraSource::new("public", "github:acme/skills")],
            ..SourceConfig::default()
        };
        let (tagged, logs) = capture_logs(Level::WARN, || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(loader(&fixture, &[]).tag(matrix(), &config, &ProjectContext::default()))
        });

        let react = &tagged.skills["web-framework-react"];
        assert_eq!(names(&tagged, "web-framework-react"), vec!["public", "public"]);
        assert_eq!(
            react.available_sources[1].url.as_deref(),
            Some("github:acme/skills")
        );
        assert!(react.available_sources[0].primary);
        assert!(logs.iter().any(|e| e.message.contains("built-in source name")));
    }

    #[tokio::test]
    async fn extra_source_timeout_is_skipped() {
        let fixture = SkillsFixture::new();
        fixture.create_catalog_skill("solid", "web-framework-solid");
        let config = SourceConfig {
            extra: vec![
                ExtraSource::new("slow", "github:slow/skills"),
                ExtraSource::new("acme", "github:acme/skills"),
            ],
            fetch_timeout: Duration::from_millis(50),
            ..SourceConfig::default()
        };
        let tagged = loader(&fixture, &["github:slow/skills"])
            .tag(matrix(), &config, &ProjectContext::default())
            .await;
        assert_eq!(names(&tagged, "web-framework-solid"), vec!["public", "acme"]);
        assert_eq!(names(&tagged, "web-framework-react"), vec!["public"]);
    }

    #[tokio::test]
    async fn search_matches_directory_name_case_insensitively() {
        let fixture = SkillsFixture::new();
        fixture.create_catalog_skill("web/Zustand", "web-client-state-zustand");
        fixture.create_catalog_skill("web/zustand-devtools", "web-client-state-zustand-devtools");
        let config = SourceConfig {
            extra: vec![
                ExtraSource::new("down", "github:down/skills"),
                ExtraSource::new("acme", "github:acme/skills"),
            ],
            ..SourceConfig::default()
        };
        let results = loader(&fixture, &[])
            .search_extra_sources("zustand", &config)
            .await;
        assert_eq!(
            results,
            vec![SourceSearchResult {
                source_name: "acme".to_string(),
                source_url: "github:acme/skills".to_string(),
                skill_id: "web-client-state-zustand".to_string(),
                path: "web/Zustand".to_string(),
            }]
        );
    }
}
