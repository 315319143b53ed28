//! Skill provenance across catalogs: fetching, catalog listing, plugin
//! registry and the multi-source tagging pass.

pub mod catalog;
pub mod fetch;
pub mod multi;
pub mod plugins;

pub use catalog::{CatalogEntry, extract_catalog};
pub use fetch::{FetchOptions, FetchedSource, GitSourceFetcher, SourceFetcher, expand_shorthand};
pub use multi::{
    ExtraSource, MultiSourceLoader, PrimarySource, ProjectContext, SourceConfig,
    SourceSearchResult,
};
pub use plugins::{InstalledPlugin, PluginRegistry};
