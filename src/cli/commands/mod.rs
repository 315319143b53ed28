//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod dependents;
pub mod doctor;
pub mod matrix;
pub mod options;
pub mod search;
pub mod sources;
pub mod validate;

use crate::app::AppContext;
use crate::error::Result;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Validate(args) => validate::run(ctx, args),
        Commands::Options(args) => options::run(ctx, args),
        Commands::Dependents(args) => dependents::run(ctx, args),
        Commands::Doctor(args) => doctor::run(ctx, args),
        Commands::Sources(args) => sources::run(ctx, args),
        Commands::Search(args) => search::run(ctx, args),
        Commands::Matrix(args) => matrix::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a full skill selection
    Validate(validate::ValidateArgs),

    /// List the options of a subcategory given a selection
    Options(options::OptionsArgs),

    /// Show selected skills that depend on a skill
    Dependents(dependents::DependentsArgs),

    /// Check the merged matrix for ghost references
    Doctor(doctor::DoctorArgs),

    /// Tag skills with the catalogs that offer them
    Sources(sources::SourcesArgs),

    /// Search extra sources for a skill alias
    Search(search::SearchArgs),

    /// Print the merged matrix
    Matrix(matrix::MatrixArgs),
}

/// Single-threaded runtime for the async source commands. Blocking work left
/// behind by a timed-out fetch is abandoned, not awaited.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use crate::matrix::{ExtractedSkillMetadata, MatrixConfig, merge};
    use crate::sources::{
        ExtraSource, GitSourceFetcher, MultiSourceLoader, ProjectContext, SourceConfig,
    };

    #[test]
    fn stalled_remote_returns_after_fetch_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            // Accept and never answer.
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });

        let cache = TempDir::new().unwrap();
        let matrix = merge(
            &MatrixConfig::from_yaml_str("version: '1'\ncategories:\n  web-framework: { domain: web }\n")
                .unwrap(),
            vec![ExtractedSkillMetadata::new("web-framework-react", "web-framework")],
        )
        .unwrap();
        let config = SourceConfig {
            extra: vec![ExtraSource::new(
                "stalled",
                format!("http://127.0.0.1:{port}/skills.git"),
            )],
            fetch_timeout: Duration::from_secs(1),
            ..SourceConfig::default()
        };
        let loader = MultiSourceLoader::new(
            GitSourceFetcher::new(cache.path()).with_timeout(Duration::from_secs(1)),
        );

        let started = Instant::now();
        let tagged = block_on(loader.tag(matrix, &config, &ProjectContext::default())).unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
        assert_eq!(
            tagged.skills["web-framework-react"].available_sources.len(),
            1
        );
    }
}
