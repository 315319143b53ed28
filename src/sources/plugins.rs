//! Host plugin registry: which skills are installed as plugins.
//!
//! The registry is a JSON document keyed by `<skill-id>@<marketplace>`:
//!
//! ```json
//! { "plugins": { "web-framework-react@acme": [{ "installPath": "...", "version": "1.2.0" }] } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::matrix::SkillId;

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    plugins: BTreeMap<String, Vec<InstallRecord>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InstallRecord {
    install_path: Option<String>,
    version: Option<String>,
}

/// A skill installed through the host's plugin mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledPlugin {
    pub skill_id: SkillId,
    pub marketplace: Option<String>,
    pub install_path: Option<String>,
    pub version: Option<String>,
}

impl InstalledPlugin {
    pub fn new(skill_id: impl Into<SkillId>) -> Self {
        Self {
            skill_id: skill_id.into(),
            marketplace: None,
            install_path: None,
            version: None,
        }
    }

    #[must_use]
    pub fn with_marketplace(mut self, marketplace: impl Into<String>) -> Self {
        self.marketplace = Some(marketplace.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRegistry {
    plugins: BTreeMap<SkillId, InstalledPlugin>,
}

impl PluginRegistry {
    /// Parse a registry document. When a key has several install records the
    /// last one is current.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(content)?;
        let plugins = file
            .plugins
            .into_iter()
            .filter_map(|(key, records)| {
                let (skill_id, marketplace) = match key.rsplit_once('@') {
                    Some((id, market)) => (id.to_string(), Some(market.to_string())),
                    None => (key, None),
                };
                if skill_id.is_empty() {
                    return None;
                }
                let current = records.into_iter().next_back().unwrap_or_default();
                Some((
                    skill_id.clone(),
                    InstalledPlugin {
                        skill_id,
                        marketplace,
                        install_path: current.install_path,
                        version: current.version,
                    },
                ))
            })
            .collect();
        Ok(Self { plugins })
    }

    /// Load the registry at `path`. A missing file is an empty registry; an
    /// unreadable one is logged and treated as empty.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no plugin registry");
                return Self::default();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read plugin registry");
                return Self::default();
            }
        };
        Self::from_json(&content).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "malformed plugin registry");
            Self::default()
        })
    }

    #[must_use]
    pub fn get(&self, skill_id: &str) -> Option<&InstalledPlugin> {
        self.plugins.get(skill_id)
    }

    pub fn installed(&self) -> impl Iterator<Item = &InstalledPlugin> {
        self.plugins.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl FromIterator<InstalledPlugin> for PluginRegistry {
    fn from_iter<I: IntoIterator<Item = InstalledPlugin>>(iter: I) -> Self {
        Self {
            plugins: iter
                .into_iter()
                .map(|plugin| (plugin.skill_id.clone(), plugin))
                .collect(),
        }
    }
}
