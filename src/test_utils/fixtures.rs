use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory laid out like a skills repository.
pub struct SkillsFixture {
    pub temp_dir: TempDir,
}

impl Default for SkillsFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillsFixture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file with content, creating parent directories.
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Create a catalog entry: `<dir>/SKILL.md` with `name` in its frontmatter.
    pub fn create_catalog_skill(&self, dir: &str, name: &str) -> PathBuf {
        self.create_file(
            &format!("{dir}/SKILL.md"),
            &format!("---\nname: {name}\ndescription: {name} skill\n---\n\n# {name}\n"),
        )
    }

    /// Create a full skill: catalog entry plus `metadata.yaml`.
    pub fn create_skill(&self, dir: &str, name: &str, metadata: &str) -> PathBuf {
        self.create_catalog_skill(dir, name);
        self.create_file(&format!("{dir}/metadata.yaml"), metadata)
    }
}
