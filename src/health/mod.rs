//! Read-only audit of a merged matrix for dangling references.
//!
//! [`check`] returns every finding and logs each one as it goes; the returned
//! list is authoritative. A clean matrix produces no findings and no output.

mod issue;

pub use issue::{HealthFinding, MatrixHealthIssue, RelationKind, Severity};

use serde::Serialize;
use tracing::{error, warn};

use crate::matrix::{MergedSkillsMatrix, ResolvedSkill, SkillRef};

/// Audit `matrix`. Findings come out categories first (by id), then skills
/// (by id, in relation order), then stacks.
#[must_use]
pub fn check(matrix: &MergedSkillsMatrix) -> Vec<MatrixHealthIssue> {
    let mut issues = Vec::new();

    for category in matrix.categories.values() {
        if category.domain.as_deref().is_none_or(|d| d.trim().is_empty()) {
            issues.push(MatrixHealthIssue::warning(HealthFinding::CategoryMissingDomain {
                category: category.id.clone(),
            }));
        }
    }

    for skill in matrix.skills.values() {
        if !matrix.categories.contains_key(&skill.category) {
            issues.push(MatrixHealthIssue::warning(HealthFinding::UnknownCategory {
                skill: skill.id.clone(),
                category: skill.category.clone(),
            }));
        }
        check_references(matrix, skill, &mut issues);
    }

    for stack in &matrix.suggested_stacks {
        for target in stack.skills.iter().filter(|r| is_ghost(matrix, r)) {
            issues.push(MatrixHealthIssue::warning(HealthFinding::StackGhostReference {
                stack: stack.id.clone(),
                target: target.id().to_string(),
            }));
        }
    }

    for issue in &issues {
        if issue.is_error() {
            error!(details = %issue.details, "matrix health issue");
        } else {
            warn!(details = %issue.details, "matrix health issue");
        }
    }
    issues
}

fn is_ghost(matrix: &MergedSkillsMatrix, reference: &SkillRef) -> bool {
    !reference.is_resolved() || !matrix.skills.contains_key(reference.id())
}

fn check_references(
    matrix: &MergedSkillsMatrix,
    skill: &ResolvedSkill,
    issues: &mut Vec<MatrixHealthIssue>,
) {
    let relations = [
        (RelationKind::ConflictsWith, &skill.conflicts_with),
        (RelationKind::Recommends, &skill.recommends),
        (RelationKind::Alternatives, &skill.alternatives),
        (RelationKind::Discourages, &skill.discourages),
    ];
    let requires = skill
        .requires
        .iter()
        .flat_map(|req| &req.skill_ids)
        .map(|r| (RelationKind::Requires, r));
    let related = relations
        .into_iter()
        .flat_map(|(kind, list)| list.iter().map(move |rel| (kind, &rel.skill)));
    let setup = skill
        .requires_setup
        .iter()
        .map(|r| (RelationKind::RequiresSetup, r))
        .chain(
            skill
                .provides_setup_for
                .iter()
                .map(|r| (RelationKind::ProvidesSetupFor, r)),
        );

    for (relation, target) in related.chain(requires).chain(setup) {
        if is_ghost(matrix, target) {
            issues.push(MatrixHealthIssue::new(
                relation.ghost_severity(),
                HealthFinding::GhostReference {
                    skill: skill.id.clone(),
                    relation,
                    target: target.id().to_string(),
                },
            ));
        }
    }
}

/// Counts for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub errors: usize,
    pub warnings: usize,
}

impl HealthReport {
    #[must_use]
    pub fn summarize(issues: &[MatrixHealthIssue]) -> Self {
        issues
            .iter()
            .fold(Self::default(), |mut report, issue| {
                match issue.severity {
                    Severity::Error => report.errors += 1,
                    Severity::Warning => report.warnings += 1,
                }
                report
            })
    }

    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.errors == 0
    }

    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}
