//! Finding types produced by the matrix health checker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matrix::SkillId;

/// Severity level for findings
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or soft defect; the matrix still resolves correctly
    Warning,
    /// Correctness defect; some selection can never be satisfied
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Relationship field a ghost reference was found on.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    ConflictsWith,
    Recommends,
    Requires,
    Alternatives,
    Discourages,
    RequiresSetup,
    ProvidesSetupFor,
}

impl RelationKind {
    /// Dangling hard dependencies are errors; everything else is soft.
    #[must_use]
    pub const fn ghost_severity(self) -> Severity {
        match self {
            Self::Requires => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConflictsWith => "conflictsWith",
            Self::Recommends => "recommends",
            Self::Requires => "requires",
            Self::Alternatives => "alternatives",
            Self::Discourages => "discourages",
            Self::RequiresSetup => "requiresSetup",
            Self::ProvidesSetupFor => "providesSetupFor",
        };
        f.write_str(name)
    }
}

/// What was found.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HealthFinding {
    #[serde(rename_all = "camelCase")]
    CategoryMissingDomain { category: String },
    #[serde(rename_all = "camelCase")]
    UnknownCategory { skill: SkillId, category: String },
    #[serde(rename_all = "camelCase")]
    GhostReference {
        skill: SkillId,
        relation: RelationKind,
        target: String,
    },
    #[serde(rename_all = "camelCase")]
    StackGhostReference { stack: String, target: String },
}

impl fmt::Display for HealthFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CategoryMissingDomain { category } => write!(
                f,
                "category '{category}' has no domain and will not appear in domain views"
            ),
            Self::UnknownCategory { skill, category } => {
                write!(f, "skill '{skill}' references unknown category '{category}'")
            }
            Self::GhostReference {
                skill,
                relation,
                target,
            } => write!(f, "skill '{skill}' {relation} unknown skill '{target}'"),
            Self::StackGhostReference { stack, target } => {
                write!(f, "stack '{stack}' includes unknown skill '{target}'")
            }
        }
    }
}

/// One audit finding.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatrixHealthIssue {
    pub severity: Severity,
    pub finding: HealthFinding,
    pub details: String,
}

impl MatrixHealthIssue {
    pub fn new(severity: Severity, finding: HealthFinding) -> Self {
        let details = finding.to_string();
        Self {
            severity,
            finding,
            details,
        }
    }

    pub fn warning(finding: HealthFinding) -> Self {
        Self::new(Severity::Warning, finding)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for MatrixHealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.details)
    }
}
