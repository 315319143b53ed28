//! Fetch/cache collaborator for remote skill catalogs.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use git2::build::RepoBuilder;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Result, SmxError};

/// Per-fetch knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Ignore any cached copy and fetch again.
    pub force_refresh: bool,
}

/// Where a fetched catalog landed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    pub path: PathBuf,
    pub from_cache: bool,
}

/// Anything that can materialize a catalog URL as a local directory.
pub trait SourceFetcher {
    fn fetch(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> impl Future<Output = Result<FetchedSource>> + Send;
}

/// Expand `github:owner/repo` and `gh:owner/repo` to a clone URL.
#[must_use]
pub fn expand_shorthand(url: &str) -> String {
    let url = url.trim();
    url.strip_prefix("github:")
        .or_else(|| url.strip_prefix("gh:"))
        .map_or_else(
            || url.to_string(),
            |repo| {
                let repo = repo.trim_matches('/').trim_end_matches(".git");
                format!("https://github.com/{repo}.git")
            },
        )
}

fn local_directory(url: &str) -> Option<PathBuf> {
    let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
    path.is_dir().then(|| path.to_path_buf())
}

/// Fetches catalogs with git, caching clones under `<cache_dir>/sources`.
#[derive(Debug, Clone)]
pub struct GitSourceFetcher {
    cache_dir: PathBuf,
}

impl GitSourceFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Cache location for `url`, keyed by a short hash of the clone URL.
    #[must_use]
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(expand_shorthand(url).as_bytes()));
        self.cache_dir.join("sources").join(&digest[..16])
    }

    /// Bound libgit2 connect and read waits so an abandoned clone ends on its
    /// own. The setting is process-wide; the first call wins.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        configure_git_timeouts(timeout);
        self
    }
}

static GIT_TIMEOUTS: Once = Once::new();

#[allow(unsafe_code)]
fn configure_git_timeouts(timeout: Duration) {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    GIT_TIMEOUTS.call_once(|| {
        // SAFETY: set once at fetcher construction, before this process starts any clone.
        let result = unsafe {
            git2::opts::set_server_connect_timeout_in_milliseconds(millis)
                .and_then(|()| git2::opts::set_server_timeout_in_milliseconds(millis))
        };
        if let Err(err) = result {
            warn!(error = %err, "cannot bound git transport timeouts");
        }
    });
}

impl SourceFetcher for GitSourceFetcher {
    async fn fetch(&self, url: &str, options: FetchOptions) -> Result<FetchedSource> {
        if let Some(path) = local_directory(url) {
            debug!(path = %path.display(), "using local catalog in place");
            return Ok(FetchedSource {
                path,
                from_cache: false,
            });
        }

        let remote = expand_shorthand(url);
        let target = self.cache_path(url);
        if !options.force_refresh && is_complete_clone(&target) {
            debug!(url = %remote, path = %target.display(), "using cached catalog");
            return Ok(FetchedSource {
                path: target,
                from_cache: true,
            });
        }

        info!(url = %remote, "fetching catalog");
        let clone_url = remote.clone();
        let clone_target = target.clone();
        tokio::task::spawn_blocking(move || shallow_clone(&clone_url, &clone_target))
            .await
            .map_err(|err| SmxError::Fetch {
                url: remote.clone(),
                message: err.to_string(),
            })??;

        Ok(FetchedSource {
            path: target,
            from_cache: false,
        })
    }
}

/// A cache entry counts only if it opens as a repository with a committed HEAD.
fn is_complete_clone(path: &Path) -> bool {
    git2::Repository::open(path)
        .is_ok_and(|repo| repo.head().and_then(|head| head.peel_to_commit()).is_ok())
}

/// Clone into a scratch directory beside `target`; the previous clone is only
/// replaced once the new one is complete.
fn shallow_clone(url: &str, target: &Path) -> Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let scratch = tempfile::Builder::new()
        .prefix(".clone-")
        .tempdir_in(parent)?;

    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.depth(1);
    RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(url, scratch.path())
        .map_err(|err| SmxError::Fetch {
            url: url.to_string(),
            message: err.message().to_string(),
        })?;

    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::rename(scratch.keep(), target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shorthand_expansion() {
        assert_eq!(
            expand_shorthand("github:acme/skills"),
            "https://github.com/acme/skills.git"
        );
        assert_eq!(
            expand_shorthand("gh:acme/skills.git"),
            "https://github.com/acme/skills.git"
        );
        assert_eq!(
            expand_shorthand("https://example.com/x.git"),
            "https://example.com/x.git"
        );
    }

    #[test]
    fn cache_path_is_stable_and_short() {
        let fetcher = GitSourceFetcher::new("/cache");
        let a = fetcher.cache_path("github:acme/skills");
        let b = fetcher.cache_path("https://github.com/acme/skills.git");
        assert_eq!(a, b);
        assert_eq!(a.parent().unwrap(), Path::new("/cache/sources"));
        assert_eq!(a.file_name().unwrap().len(), 16);
        assert_ne!(a, fetcher.cache_path("github:acme/other"));
    }

    #[tokio::test]
    async fn local_directories_are_used_in_place() {
        let temp = TempDir::new().unwrap();
        let fetcher = GitSourceFetcher::new(temp.path().join("cache"));
        let url = temp.path().display().to_string();
        let fetched = fetcher.fetch(&url, FetchOptions::default()).await.unwrap();
        assert_eq!(fetched.path, temp.path());
        assert!(!fetched.from_cache);
    }

    fn committed_repo(path: &Path) {
        let repo = git2::Repository::init(path).unwrap();
        let sig = git2::Signature::now("smx", "smx@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "catalog", &tree, &[])
            .unwrap();
    }

    const UNREACHABLE: &str = "/nonexistent/smx-catalog.git";

    #[tokio::test]
    async fn complete_clone_is_reused() {
        let temp = TempDir::new().unwrap();
        let fetcher = GitSourceFetcher::new(temp.path());
        let cached = fetcher.cache_path(UNREACHABLE);
        committed_repo(&cached);

        let fetched = fetcher.fetch(UNREACHABLE, FetchOptions::default()).await.unwrap();
        assert!(fetched.from_cache);
        assert_eq!(fetched.path, cached);
    }

    #[tokio::test]
    async fn interrupted_clone_is_not_a_cache_hit() {
        let temp = TempDir::new().unwrap();
        let fetcher = GitSourceFetcher::new(temp.path());
        let cached = fetcher.cache_path(UNREACHABLE);
        std::fs::create_dir_all(cached.join(".git")).unwrap();
        assert!(!is_complete_clone(&cached));

        let err = fetcher
            .fetch(UNREACHABLE, FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SmxError::Fetch { .. }), "{err}");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_clone() {
        let temp = TempDir::new().unwrap();
        let fetcher = GitSourceFetcher::new(temp.path());
        let cached = fetcher.cache_path(UNREACHABLE);
        committed_repo(&cached);

        let forced = FetchOptions {
            force_refresh: true,
        };
        assert!(fetcher.fetch(UNREACHABLE, forced).await.is_err());
        assert!(is_complete_clone(&cached));
        let leftovers: Vec<_> = std::fs::read_dir(cached.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".clone-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
