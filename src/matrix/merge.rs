//! Matrix loader/merger.
//!
//! Turns a [`MatrixConfig`] and the scanned per-skill metadata into one
//! [`MergedSkillsMatrix`]. Every skill scans the rule lists independently for
//! rules that mention it, so conflicts, discouragements and alternatives come
//! out mutual without a second pass over the rules.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Result, SmxError};

use super::alias::{AliasMaps, AliasResolver, is_valid_skill_id};
use super::loader::MatrixConfig;
use super::types::{
    ExtractedSkillMetadata, MergedSkillsMatrix, RelationshipDefinitions, ResolvedSkill, SkillId,
    SkillRef, SkillRelation, SkillRequirement, Stack,
};

const METADATA_REQUIRES_REASON: &str = "Declared in skill metadata";
const METADATA_CONFLICT_REASON: &str = "Declared conflict in skill metadata";
const METADATA_COMPATIBLE_REASON: &str = "Declared compatible in skill metadata";

/// Merge categories, rules and aliases with the extracted skills.
///
/// Fails only when the config itself is malformed or a skill lacks its CLI
/// name. Other bad skill records are skipped with a warning.
pub fn merge(
    config: &MatrixConfig,
    extracted: Vec<ExtractedSkillMetadata>,
) -> Result<MergedSkillsMatrix> {
    config.validate()?;

    let aliases = AliasMaps::build(&config.skill_aliases);
    let skills = accept_skills(extracted)?;
    let resolver = AliasResolver::new(&aliases.display_name_to_id, &skills);
    let rules = ResolvedRules::new(&config.relationships, &resolver);

    let mut resolved: BTreeMap<SkillId, ResolvedSkill> = skills
        .iter()
        .map(|meta| {
            let skill = resolve_skill(meta, &rules, &resolver, &aliases);
            (skill.id.clone(), skill)
        })
        .collect();
    mirror_declared_conflicts(&mut resolved);

    let suggested_stacks = config
        .suggested_stacks
        .iter()
        .map(|stack| Stack {
            id: stack.id.clone(),
            name: stack.name.clone(),
            description: stack.description.clone(),
            skills: resolver.resolve_all(&stack.skills, &format!("stack {}", stack.id)),
        })
        .collect();

    info!(
        skills = resolved.len(),
        categories = config.categories.len(),
        "merged skills matrix"
    );

    Ok(MergedSkillsMatrix {
        version: config.version.clone(),
        categories: config.categories.clone(),
        skills: resolved,
        suggested_stacks,
        display_name_to_id: aliases.display_name_to_id,
        id_to_display_name: aliases.id_to_display_name,
        generated_at: Utc::now(),
    })
}

/// Drop malformed records, reject records without a CLI name, and settle
/// duplicate ids (a local copy replaces a catalog copy, otherwise first wins).
fn accept_skills(extracted: Vec<ExtractedSkillMetadata>) -> Result<Vec<ExtractedSkillMetadata>> {
    let mut accepted: Vec<ExtractedSkillMetadata> = Vec::with_capacity(extracted.len());
    for meta in extracted {
        if !is_valid_skill_id(&meta.id) {
            warn!(id = %meta.id, path = %meta.directory_path, "skipping skill with malformed id");
            continue;
        }
        if meta.category.trim().is_empty() {
            warn!(id = %meta.id, "skipping skill without a category");
            continue;
        }
        if meta.cli_name.trim().is_empty() {
            return Err(SmxError::MissingField {
                skill: meta.id,
                field: "cliName",
            });
        }
        match accepted.iter_mut().find(|existing| existing.id == meta.id) {
            Some(existing) if meta.local && !existing.local => {
                debug!(id = %meta.id, "local skill overrides catalog copy");
                *existing = meta;
            }
            Some(_) => warn!(id = %meta.id, path = %meta.directory_path, "duplicate skill id ignored"),
            None => accepted.push(meta),
        }
    }
    Ok(accepted)
}

struct ResolvedMemberRule {
    members: Vec<SkillRef>,
    reason: String,
}

struct ResolvedRecommendRule {
    when: SkillRef,
    suggest: Vec<SkillRef>,
    reason: String,
}

struct ResolvedRequireRule {
    skill: SkillRef,
    needs: Vec<SkillRef>,
    needs_any: bool,
    reason: String,
}

/// Rule lists with every member canonicalized once.
struct ResolvedRules {
    conflicts: Vec<ResolvedMemberRule>,
    discourages: Vec<ResolvedMemberRule>,
    alternatives: Vec<ResolvedMemberRule>,
    recommends: Vec<ResolvedRecommendRule>,
    requires: Vec<ResolvedRequireRule>,
}

impl ResolvedRules {
    fn new(defs: &RelationshipDefinitions, resolver: &AliasResolver) -> Self {
        let member_rule = |skills: &[String], reason: &str, context: &str| ResolvedMemberRule {
            members: resolver.resolve_all(skills, context),
            reason: reason.to_string(),
        };
        Self {
            conflicts: defs
                .conflicts
                .iter()
                .map(|r| member_rule(&r.skills, &r.reason, "conflicts rule"))
                .collect(),
            discourages: defs
                .discourages
                .iter()
                .map(|r| member_rule(&r.skills, &r.reason, "discourages rule"))
                .collect(),
            alternatives: defs
                .alternatives
                .iter()
                .map(|r| member_rule(&r.skills, &r.purpose, "alternatives rule"))
                .collect(),
            recommends: defs
                .recommends
                .iter()
                .map(|r| ResolvedRecommendRule {
                    when: resolver.resolve(&r.when, "recommends rule"),
                    suggest: resolver.resolve_all(&r.suggest, "recommends rule"),
                    reason: r.reason.clone(),
                })
                .collect(),
            requires: defs
                .requires
                .iter()
                .map(|r| ResolvedRequireRule {
                    skill: resolver.resolve(&r.skill, "requires rule"),
                    needs: resolver.resolve_all(&r.needs, "requires rule"),
                    needs_any: r.needs_any,
                    reason: r.reason.clone(),
                })
                .collect(),
        }
    }
}

fn resolve_skill(
    meta: &ExtractedSkillMetadata,
    rules: &ResolvedRules,
    resolver: &AliasResolver,
    aliases: &AliasMaps,
) -> ResolvedSkill {
    let id = meta.id.as_str();
    let context = format!("skill {id}");

    let mut conflicts_with = Vec::new();
    let mut discourages = Vec::new();
    let mut alternatives = Vec::new();
    let mut recommends = Vec::new();
    let mut requires = Vec::new();

    project_member_rules(id, &rules.conflicts, &mut conflicts_with);
    project_member_rules(id, &rules.discourages, &mut discourages);
    project_member_rules(id, &rules.alternatives, &mut alternatives);

    for rule in rules.recommends.iter().filter(|r| r.when.id() == id) {
        for target in &rule.suggest {
            push_relation(id, &mut recommends, target.clone(), &rule.reason);
        }
    }
    for rule in rules.requires.iter().filter(|r| r.skill.id() == id) {
        push_requirement(id, &mut requires, rule.needs.clone(), rule.needs_any, &rule.reason);
    }

    push_requirement(
        id,
        &mut requires,
        resolver.resolve_all(&meta.requires, &context),
        false,
        METADATA_REQUIRES_REASON,
    );
    for target in resolver.resolve_all(&meta.compatible_with, &context) {
        push_relation(id, &mut recommends, target, METADATA_COMPATIBLE_REASON);
    }
    for target in resolver.resolve_all(&meta.conflicts_with, &context) {
        push_relation(id, &mut conflicts_with, target, METADATA_CONFLICT_REASON);
    }

    let without_self = |refs: Vec<SkillRef>| -> Vec<SkillRef> {
        refs.into_iter().filter(|r| r.id() != id).collect()
    };

    ResolvedSkill {
        id: meta.id.clone(),
        display_name: meta
            .display_name
            .clone()
            .or_else(|| aliases.id_to_display_name.get(id).cloned()),
        cli_name: meta.cli_name.clone(),
        description: meta.description.clone(),
        category: meta.category.clone(),
        tags: meta.tags.clone(),
        author: meta.author.clone(),
        directory_path: meta.directory_path.clone(),
        local: meta.local,
        local_path: meta.local_path.clone(),
        conflicts_with,
        recommends,
        discourages,
        alternatives,
        requires,
        requires_setup: without_self(resolver.resolve_all(&meta.requires_setup, &context)),
        provides_setup_for: without_self(resolver.resolve_all(&meta.provides_setup_for, &context)),
        available_sources: Vec::new(),
        active_source: None,
    }
}

/// Every other member of a rule that mentions `id` becomes a relation of `id`.
fn project_member_rules(id: &str, rules: &[ResolvedMemberRule], out: &mut Vec<SkillRelation>) {
    for rule in rules.iter().filter(|r| r.members.iter().any(|m| m.id() == id)) {
        for member in &rule.members {
            push_relation(id, out, member.clone(), &rule.reason);
        }
    }
}

fn push_relation(owner: &str, list: &mut Vec<SkillRelation>, target: SkillRef, reason: &str) {
    if target.id() == owner || list.iter().any(|rel| rel.skill.id() == target.id()) {
        return;
    }
    list.push(SkillRelation {
        skill: target,
        reason: reason.to_string(),
    });
}

fn push_requirement(
    owner: &str,
    list: &mut Vec<SkillRequirement>,
    needs: Vec<SkillRef>,
    needs_any: bool,
    reason: &str,
) {
    let skill_ids: Vec<SkillRef> = needs.into_iter().filter(|r| r.id() != owner).collect();
    if skill_ids.is_empty() {
        return;
    }
    list.push(SkillRequirement {
        skill_ids,
        needs_any,
        reason: reason.to_string(),
    });
}

/// Conflicts declared in a skill's own metadata are one-sided; copy them onto
/// the target so conflicts stay mutual.
fn mirror_declared_conflicts(skills: &mut BTreeMap<SkillId, ResolvedSkill>) {
    let mut mirrored: Vec<(SkillId, SkillId, String)> = Vec::new();
    for skill in skills.values() {
        for rel in &skill.conflicts_with {
            if let SkillRef::Resolved(target) = &rel.skill {
                let missing_back_edge = skills
                    .get(target)
                    .is_some_and(|other| other.conflict_with(&skill.id).is_none());
                if missing_back_edge {
                    mirrored.push((target.clone(), skill.id.clone(), rel.reason.clone()));
                }
            }
        }
    }
    for (owner, target, reason) in mirrored {
        if let Some(skill) = skills.get_mut(&owner) {
            push_relation(&owner, &mut skill.conflicts_with, SkillRef::Resolved(target), &reason);
        }
    }
}
