//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const WEB_MATRIX: &str = r"
version: '1'
categories:
  web-framework: { displayName: Framework, domain: web, exclusive: true, order: 1 }
  web-client-state: { displayName: Client state, domain: web, exclusive: true, order: 2 }
  web-styling: { displayName: Styling, domain: web, exclusive: false, order: 3 }
relationships:
  conflicts:
    - skills: [react, vue]
      reason: pick one framework
  recommends:
    - when: react
      suggest: [zustand]
      reason: lightweight store
  requires:
    - skill: zustand
      needs: [react]
      reason: React bindings
    - skill: pinia
      needs: [vue]
      reason: Vue store
    - skill: tailwind-forms
      needs: [tailwind]
      reason: plugin of tailwind
skillAliases:
  react: web-framework-react
  vue: web-framework-vue
  zustand: web-client-state-zustand
  pinia: web-client-state-pinia
  tailwind: web-styling-tailwind
  tailwind-forms: web-styling-tailwind-forms
suggestedStacks:
  - id: react-starter
    name: React starter
    skills: [react, zustand, tailwind]
";

/// Temp project with a matrix file and a skills tree.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        project.write("matrix.yaml", WEB_MATRIX);
        for (dir, id, category, cli) in [
            ("react", "web-framework-react", "web-framework", "react"),
            ("vue", "web-framework-vue", "web-framework", "vue"),
            ("zustand", "web-client-state-zustand", "web-client-state", "zustand"),
            ("pinia", "web-client-state-pinia", "web-client-state", "pinia"),
            ("tailwind", "web-styling-tailwind", "web-styling", "tailwind"),
            ("tailwind-forms", "web-styling-tailwind-forms", "web-styling", "tailwind-forms"),
        ] {
            project.skill(&format!("skills/{dir}"), id, category, cli);
        }
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn skill(&self, dir: &str, id: &str, category: &str, cli_name: &str) {
        self.write(
            &format!("{dir}/SKILL.md"),
            &format!("---\nname: {id}\ndescription: {cli_name} skill\n---\n\n# {cli_name}\n"),
        );
        self.write(
            &format!("{dir}/metadata.yaml"),
            &format!("category: {category}\ncliName: {cli_name}\n"),
        );
    }
}
