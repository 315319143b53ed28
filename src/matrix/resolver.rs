//! Selection logic over a merged matrix.
//!
//! Everything here is a pure function of the matrix and a candidate
//! selection. Conflicts are enforced by disabling options, never by search.

use std::collections::{BTreeMap, HashSet, VecDeque};

use itertools::Itertools;
use serde::Serialize;

use super::types::{CategoryDefinition, MergedSkillsMatrix, ResolvedSkill, SkillId, SkillRef};

/// Knobs for option computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Bypass conflict and requirement disabling. Discouragements and
    /// recommendations are still annotated.
    pub expert_mode: bool,
}

impl ResolverOptions {
    #[must_use]
    pub const fn expert() -> Self {
        Self { expert_mode: true }
    }
}

/// One selectable entry in a subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillOption {
    pub id: SkillId,
    pub label: String,
    pub description: String,
    pub selected: bool,
    pub disabled: bool,
    pub disabled_reason: Option<String>,
    pub discouraged: bool,
    pub discouraged_reason: Option<String>,
    pub recommended: bool,
    pub recommended_reason: Option<String>,
    pub alternatives: Vec<SkillId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorKind {
    Conflict,
    MissingRequirement,
    CategoryExclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationWarningKind {
    MissingRecommendation,
    UnusedSetup,
    MissingSetup,
    UnknownSkill,
}

/// Blocking problem with a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ValidationErrorKind,
    pub message: String,
    pub skills: Vec<SkillId>,
}

/// Non-blocking note about a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    #[serde(rename = "type")]
    pub kind: ValidationWarningKind,
    pub message: String,
    pub skills: Vec<SkillId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionValidation {
    /// True iff `errors` is empty; warnings never affect it.
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// Canonicalized selection: order preserved, duplicates dropped.
struct Selection {
    ordered: Vec<SkillId>,
    members: HashSet<SkillId>,
}

impl Selection {
    fn new<S: AsRef<str>>(matrix: &MergedSkillsMatrix, raw: &[S]) -> Self {
        let mut members = HashSet::new();
        let ordered = raw
            .iter()
            .map(|id| resolve_alias(matrix, id.as_ref()))
            .filter(|id| members.insert(id.clone()))
            .collect();
        Self { ordered, members }
    }

    fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    fn skills<'a>(
        &'a self,
        matrix: &'a MergedSkillsMatrix,
    ) -> impl Iterator<Item = &'a ResolvedSkill> + 'a {
        self.ordered.iter().filter_map(|id| matrix.skill(id))
    }
}

/// Map a display name to its canonical id. Canonical ids map to themselves.
#[must_use]
pub fn resolve_alias(matrix: &MergedSkillsMatrix, id: &str) -> SkillId {
    let mut current = id.trim().to_string();
    let mut seen = HashSet::new();
    while !matrix.skills.contains_key(&current) && seen.insert(current.clone()) {
        match matrix.display_name_to_id.get(&current) {
            Some(next) => current.clone_from(next),
            None => break,
        }
    }
    current
}

fn label(matrix: &MergedSkillsMatrix, id: &str) -> String {
    matrix
        .skill(id)
        .map_or_else(|| id.to_string(), |s| s.label().to_string())
}

fn reason_or<'a>(reason: &'a str, fallback: &'a str) -> &'a str {
    if reason.trim().is_empty() { fallback } else { reason }
}

fn conflict_reason(a: &ResolvedSkill, b: &ResolvedSkill) -> Option<String> {
    a.conflict_with(&b.id)
        .or_else(|| b.conflict_with(&a.id))
        .map(|rel| reason_or(&rel.reason, "Conflicting skills").to_string())
}

fn describe_requirement(matrix: &MergedSkillsMatrix, refs: &[&SkillRef], needs_any: bool) -> String {
    let joiner = if needs_any { " or " } else { " and " };
    refs.iter().map(|r| label(matrix, r.id())).join(joiner)
}

fn disable_reason_in(
    matrix: &MergedSkillsMatrix,
    skill: &ResolvedSkill,
    selection: &Selection,
    options: ResolverOptions,
) -> Option<String> {
    if options.expert_mode || selection.contains(&skill.id) {
        return None;
    }
    for other in selection.skills(matrix) {
        if let Some(reason) = conflict_reason(skill, other) {
            return Some(format!("{reason} (conflicts with {})", other.label()));
        }
    }
    for req in &skill.requires {
        if !req.is_satisfied_by(|id| selection.contains(id)) {
            let needed: Vec<&SkillRef> = req.skill_ids.iter().collect();
            return Some(format!(
                "{} (requires {})",
                reason_or(&req.reason, "Missing requirement"),
                describe_requirement(matrix, &needed, req.needs_any)
            ));
        }
    }
    None
}

fn discourage_reason_in(
    matrix: &MergedSkillsMatrix,
    skill: &ResolvedSkill,
    selection: &Selection,
) -> Option<String> {
    selection
        .skills(matrix)
        .filter(|other| other.id != skill.id)
        .find_map(|other| {
            other
                .discouragement_of(&skill.id)
                .or_else(|| skill.discouragement_of(&other.id))
                .map(|rel| {
                    format!(
                        "{} (with {})",
                        reason_or(&rel.reason, "Discouraged combination"),
                        other.label()
                    )
                })
        })
}

fn recommend_reason_in(
    matrix: &MergedSkillsMatrix,
    skill: &ResolvedSkill,
    selection: &Selection,
) -> Option<String> {
    selection
        .skills(matrix)
        .filter(|other| other.id != skill.id)
        .find_map(|other| {
            other.recommendation_of(&skill.id).map(|rel| {
                format!(
                    "{} (recommended by {})",
                    reason_or(&rel.reason, "Recommended"),
                    other.label()
                )
            })
        })
}

fn option_for(
    matrix: &MergedSkillsMatrix,
    skill: &ResolvedSkill,
    selection: &Selection,
    options: ResolverOptions,
) -> SkillOption {
    let disabled_reason = disable_reason_in(matrix, skill, selection, options);
    let discouraged_reason = discourage_reason_in(matrix, skill, selection);
    let recommended_reason = recommend_reason_in(matrix, skill, selection);
    SkillOption {
        id: skill.id.clone(),
        label: skill.label().to_string(),
        description: skill.description.clone(),
        selected: selection.contains(&skill.id),
        disabled: disabled_reason.is_some(),
        disabled_reason,
        discouraged: discouraged_reason.is_some(),
        discouraged_reason,
        recommended: recommended_reason.is_some(),
        recommended_reason,
        alternatives: skill
            .alternatives
            .iter()
            .map(|rel| rel.skill.id().to_string())
            .collect(),
    }
}

/// Options for every skill in `subcategory`, ordered by id.
#[must_use]
pub fn get_available_skills<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    subcategory: &str,
    selection: &[S],
    options: ResolverOptions,
) -> Vec<SkillOption> {
    let selection = Selection::new(matrix, selection);
    matrix
        .skills_in_category(subcategory)
        .map(|skill| option_for(matrix, skill, &selection, options))
        .collect()
}

/// True only when the subcategory has skills and every one of them is disabled.
#[must_use]
pub fn is_category_all_disabled<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    subcategory: &str,
    selection: &[S],
    options: ResolverOptions,
) -> bool {
    let available = get_available_skills(matrix, subcategory, selection, options);
    !available.is_empty() && available.iter().all(|opt| opt.disabled)
}

#[must_use]
pub fn disable_reason<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
    options: ResolverOptions,
) -> Option<String> {
    let skill = matrix.skill(&resolve_alias(matrix, skill_id))?;
    disable_reason_in(matrix, skill, &Selection::new(matrix, selection), options)
}

#[must_use]
pub fn is_disabled<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
    options: ResolverOptions,
) -> bool {
    disable_reason(matrix, skill_id, selection, options).is_some()
}

#[must_use]
pub fn discourage_reason<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
) -> Option<String> {
    let skill = matrix.skill(&resolve_alias(matrix, skill_id))?;
    discourage_reason_in(matrix, skill, &Selection::new(matrix, selection))
}

#[must_use]
pub fn is_discouraged<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
) -> bool {
    discourage_reason(matrix, skill_id, selection).is_some()
}

#[must_use]
pub fn recommend_reason<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
) -> Option<String> {
    let skill = matrix.skill(&resolve_alias(matrix, skill_id))?;
    recommend_reason_in(matrix, skill, &Selection::new(matrix, selection))
}

#[must_use]
pub fn is_recommended<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
) -> bool {
    recommend_reason(matrix, skill_id, selection).is_some()
}

/// Validate a whole selection. Rule violations are reported, never returned as `Err`.
#[must_use]
pub fn validate_selection<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    selection: &[S],
) -> SelectionValidation {
    let selection = Selection::new(matrix, selection);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for id in &selection.ordered {
        if matrix.skill(id).is_none() {
            warnings.push(ValidationWarning {
                kind: ValidationWarningKind::UnknownSkill,
                message: format!("Unknown skill '{id}'"),
                skills: vec![id.clone()],
            });
        }
    }

    let selected: Vec<&ResolvedSkill> = selection.skills(matrix).collect();

    let mut conflicting_pairs: HashSet<(&str, &str)> = HashSet::new();
    for (idx, a) in selected.iter().enumerate() {
        for b in &selected[idx + 1..] {
            if let Some(reason) = conflict_reason(a, b) {
                conflicting_pairs.insert((a.id.as_str(), b.id.as_str()));
                conflicting_pairs.insert((b.id.as_str(), a.id.as_str()));
                errors.push(ValidationError {
                    kind: ValidationErrorKind::Conflict,
                    message: format!("{} conflicts with {}: {reason}", a.label(), b.label()),
                    skills: vec![a.id.clone(), b.id.clone()],
                });
            }
        }
    }

    for skill in &selected {
        for req in &skill.requires {
            if req.is_satisfied_by(|id| selection.contains(id)) {
                continue;
            }
            let missing: Vec<&SkillRef> = req
                .skill_ids
                .iter()
                .filter(|r| !selection.contains(r.id()))
                .collect();
            let mut skills = vec![skill.id.clone()];
            skills.extend(missing.iter().map(|r| r.id().to_string()));
            errors.push(ValidationError {
                kind: ValidationErrorKind::MissingRequirement,
                message: format!(
                    "{} requires {}: {}",
                    skill.label(),
                    describe_requirement(matrix, &missing, req.needs_any),
                    reason_or(&req.reason, "missing requirement")
                ),
                skills,
            });
        }
    }

    let mut by_category: BTreeMap<&str, Vec<&ResolvedSkill>> = BTreeMap::new();
    for skill in &selected {
        by_category
            .entry(skill.category.as_str())
            .or_default()
            .push(*skill);
    }
    for (category, members) in by_category {
        let exclusive = matrix.categories.get(category).is_some_and(|c| c.exclusive);
        if !exclusive || members.len() < 2 {
            continue;
        }
        // Pairs already reported as conflicts are not reported twice.
        let unreported = members.iter().tuple_combinations().any(|(a, b)| {
            !conflicting_pairs.contains(&(a.id.as_str(), b.id.as_str()))
        });
        if unreported {
            errors.push(ValidationError {
                kind: ValidationErrorKind::CategoryExclusive,
                message: format!(
                    "Category '{category}' allows one skill, selected: {}",
                    members.iter().map(|s| s.label()).join(", ")
                ),
                skills: members.iter().map(|s| s.id.clone()).collect(),
            });
        }
    }

    for skill in &selected {
        let recommended: Vec<&SkillRef> = skill
            .recommends
            .iter()
            .map(|rel| &rel.skill)
            .filter(|r| r.is_resolved())
            .collect();
        if !recommended.is_empty() && !recommended.iter().any(|r| selection.contains(r.id())) {
            warnings.push(ValidationWarning {
                kind: ValidationWarningKind::MissingRecommendation,
                message: format!(
                    "{} works best with {}",
                    skill.label(),
                    describe_requirement(matrix, &recommended, true)
                ),
                skills: std::iter::once(skill.id.clone())
                    .chain(recommended.iter().map(|r| r.id().to_string()))
                    .collect(),
            });
        }

        let provides: Vec<&SkillRef> = skill
            .provides_setup_for
            .iter()
            .filter(|r| r.is_resolved())
            .collect();
        if !provides.is_empty() && !provides.iter().any(|r| selection.contains(r.id())) {
            warnings.push(ValidationWarning {
                kind: ValidationWarningKind::UnusedSetup,
                message: format!(
                    "Setup skill {} is selected but none of the skills it sets up are",
                    skill.label()
                ),
                skills: vec![skill.id.clone()],
            });
        }

        for setup in skill.requires_setup.iter().filter(|r| r.is_resolved()) {
            if !selection.contains(setup.id()) {
                warnings.push(ValidationWarning {
                    kind: ValidationWarningKind::MissingSetup,
                    message: format!(
                        "{} expects setup skill {}",
                        skill.label(),
                        label(matrix, setup.id())
                    ),
                    skills: vec![skill.id.clone(), setup.id().to_string()],
                });
            }
        }
    }

    SelectionValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn dependents_in(matrix: &MergedSkillsMatrix, target: &str, selection: &Selection) -> Vec<SkillId> {
    selection
        .skills(matrix)
        .filter(|skill| skill.id != target && skill.requires_skill(target))
        .map(|skill| skill.id.clone())
        .collect()
}

/// Selected skills that directly require `skill_id`.
#[must_use]
pub fn get_dependent_skills<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
) -> Vec<SkillId> {
    let target = resolve_alias(matrix, skill_id);
    dependents_in(matrix, &target, &Selection::new(matrix, selection))
}

/// Everything that transitively breaks if `skill_id` is deselected, in
/// breadth-first discovery order. The skill itself is not included.
#[must_use]
pub fn get_cascade_dependents<S: AsRef<str>>(
    matrix: &MergedSkillsMatrix,
    skill_id: &str,
    selection: &[S],
) -> Vec<SkillId> {
    let selection = Selection::new(matrix, selection);
    let start = resolve_alias(matrix, skill_id);
    let mut visited: HashSet<SkillId> = HashSet::from([start.clone()]);
    let mut worklist: VecDeque<SkillId> = VecDeque::from([start]);
    let mut cascade = Vec::new();

    while let Some(current) = worklist.pop_front() {
        for dependent in dependents_in(matrix, &current, &selection) {
            if visited.insert(dependent.clone()) {
                cascade.push(dependent.clone());
                worklist.push_back(dependent);
            }
        }
    }
    cascade
}

/// Categories of `domain`, ordered by display priority then id.
#[must_use]
pub fn categories_for_domain<'a>(
    matrix: &'a MergedSkillsMatrix,
    domain: &str,
) -> Vec<&'a CategoryDefinition> {
    matrix
        .categories
        .values()
        .filter(|c| c.domain.as_deref() == Some(domain))
        .sorted_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)))
        .collect()
}

/// Distinct domains used by categories.
#[must_use]
pub fn domains(matrix: &MergedSkillsMatrix) -> Vec<String> {
    matrix
        .categories
        .values()
        .filter_map(|c| c.domain.clone())
        .sorted()
        .dedup()
        .collect()
}
