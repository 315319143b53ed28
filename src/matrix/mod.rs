//! The skills matrix: configuration, merge and selection logic.

pub mod alias;
pub mod extract;
pub mod loader;
pub mod merge;
pub mod resolver;
pub mod types;

pub use alias::{AliasMaps, AliasResolver, is_valid_skill_id};
pub use extract::extract_skills;
pub use loader::{MatrixConfig, MatrixConfigCache, MatrixSource};
pub use merge::merge;
pub use resolver::{
    ResolverOptions, SelectionValidation, SkillOption, ValidationError, ValidationErrorKind,
    ValidationWarning, ValidationWarningKind, categories_for_domain, disable_reason, domains,
    get_available_skills, get_cascade_dependents, get_dependent_skills, is_category_all_disabled,
    is_disabled, is_discouraged, is_recommended, recommend_reason, discourage_reason,
    resolve_alias, validate_selection,
};
pub use types::{
    CategoryDefinition, ExtractedSkillMetadata, InstallMode, MergedSkillsMatrix, ResolvedSkill,
    SkillId, SkillRef, SkillRelation, SkillRequirement, SkillSource, SourceType, Stack,
};
