//! smx sources - Catalog provenance per skill

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::cli::commands::block_on;
use crate::error::Result;
use crate::matrix::{SkillId, SkillSource};

#[derive(Args, Debug)]
pub struct SourcesArgs {
    /// Only show this skill (id or display name)
    pub skill: Option<String>,

    /// Re-clone remote catalogs instead of reusing the cache
    #[arg(long)]
    pub force_refresh: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillSources<'a> {
    skill: &'a SkillId,
    active_source: Option<&'a SkillSource>,
    available_sources: &'a [SkillSource],
}

pub fn run(ctx: &AppContext, args: &SourcesArgs) -> Result<()> {
    let matrix = ctx.load_matrix()?;
    let mut config = ctx.config.source_config();
    config.force_refresh |= args.force_refresh;
    let project = ctx.project_context();
    let loader = ctx.source_loader();

    let matrix = block_on(loader.tag(matrix, &config, &project))?;
    let only = args
        .skill
        .as_deref()
        .map(|raw| crate::matrix::resolve_alias(&matrix, raw));
    let rows: Vec<SkillSources<'_>> = matrix
        .skills
        .values()
        .filter(|skill| only.as_ref().is_none_or(|id| &skill.id == id))
        .map(|skill| SkillSources {
            skill: &skill.id,
            active_source: skill.active_source.as_ref(),
            available_sources: &skill.available_sources,
        })
        .collect();

    if ctx.robot {
        return emit_json(&robot_ok(&rows));
    }

    let mut layout = HumanLayout::new();
    layout.title("Skill sources");
    for row in &rows {
        let active = row.active_source.map_or("-", |s| s.name.as_str());
        let available = row
            .available_sources
            .iter()
            .map(|s| {
                if s.installed {
                    format!("{}*", s.name)
                } else {
                    s.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        layout.kv(row.skill, &format!("{active} [{available}]"));
    }
    emit_human(layout);
    Ok(())
}
