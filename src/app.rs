use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::matrix::{
    ExtractedSkillMetadata, MatrixConfig, MatrixConfigCache, MatrixSource, MergedSkillsMatrix,
    extract_skills, merge,
};
use crate::sources::{GitSourceFetcher, MultiSourceLoader, PluginRegistry, ProjectContext};

/// Dependency root for one CLI invocation.
pub struct AppContext {
    pub project_root: PathBuf,
    pub config: Config,
    pub matrix_cache: MatrixConfigCache,
    pub robot: bool,
    pub verbosity: u8,
    matrix_path: Option<PathBuf>,
    extra_skill_dirs: Vec<PathBuf>,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let project_root = Self::find_project_root()?;
        let config = Config::load(cli.config.as_deref(), &project_root)?;

        Ok(Self {
            matrix_path: cli.matrix.clone(),
            extra_skill_dirs: cli.skills_dir.clone(),
            robot: cli.robot,
            verbosity: cli.verbose,
            ..Self::new(project_root, config)
        })
    }

    #[must_use]
    pub fn new(project_root: PathBuf, config: Config) -> Self {
        Self {
            project_root,
            config,
            matrix_cache: MatrixConfigCache::new(),
            robot: false,
            verbosity: 0,
            matrix_path: None,
            extra_skill_dirs: Vec::new(),
        }
    }

    fn find_project_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("SMX_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let cwd = std::env::current_dir()?;
        Ok(find_upwards(&cwd, ".smx").unwrap_or(cwd))
    }

    #[must_use]
    pub fn matrix_source(&self) -> MatrixSource {
        self.matrix_path.as_ref().map_or_else(
            || self.config.matrix_source(&self.project_root),
            |path| MatrixSource::File(self.project_root.join(path)),
        )
    }

    /// Matrix config from the cache, with project overrides layered on top.
    pub fn matrix_config(&self) -> Result<Arc<MatrixConfig>> {
        let base = self.matrix_cache.load(&self.matrix_source())?;
        let Some(overrides) = self
            .config
            .matrix
            .overrides
            .as_ref()
            .map(|path| self.project_root.join(path))
            .filter(|path| path.is_file())
        else {
            return Ok(base);
        };
        debug!(path = %overrides.display(), "applying matrix overrides");
        let mut config = (*base).clone();
        config.apply_overrides(MatrixConfig::from_path(&overrides)?)?;
        Ok(Arc::new(config))
    }

    /// Catalog roots followed by the project-local skills directory.
    #[must_use]
    pub fn skill_roots(&self) -> Vec<(PathBuf, bool)> {
        let mut roots: Vec<(PathBuf, bool)> = self
            .extra_skill_dirs
            .iter()
            .map(|dir| self.project_root.join(dir))
            .chain(
                self.config
                    .matrix
                    .skills_dirs
                    .iter()
                    .map(|dir| self.project_root.join(expand_home(dir))),
            )
            .map(|dir| (dir, false))
            .collect();
        roots.push((
            self.project_root.join(&self.config.matrix.local_skills_dir),
            true,
        ));
        roots
    }

    pub fn extract_skills(&self) -> Result<Vec<ExtractedSkillMetadata>> {
        let mut skills = Vec::new();
        for (root, local) in self.skill_roots() {
            skills.extend(extract_skills(&root, local)?);
        }
        Ok(skills)
    }

    /// Load, extract and merge.
    pub fn load_matrix(&self) -> Result<MergedSkillsMatrix> {
        let config = self.matrix_config()?;
        merge(&config, self.extract_skills()?)
    }

    #[must_use]
    pub fn project_context(&self) -> ProjectContext {
        ProjectContext {
            plugins: self
                .config
                .plugin_registry()
                .map(|path| PluginRegistry::load(&path))
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn source_loader(&self) -> MultiSourceLoader<GitSourceFetcher> {
        let timeout = self.config.source_config().fetch_timeout;
        MultiSourceLoader::new(
            GitSourceFetcher::new(self.config.cache_dir()).with_timeout(timeout),
        )
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(name).is_dir())
        .map(Path::to_path_buf)
}
