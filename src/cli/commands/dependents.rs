//! smx dependents - Selected skills that would break if a skill were removed

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::{Result, SmxError};
use crate::matrix::{SkillId, get_cascade_dependents, get_dependent_skills, resolve_alias};

#[derive(Args, Debug)]
pub struct DependentsArgs {
    /// Skill to deselect (id or display name)
    pub skill: String,

    /// Current selection, comma separated
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Follow dependents transitively
    #[arg(long)]
    pub cascade: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DependentsReport {
    skill: SkillId,
    cascade: bool,
    dependents: Vec<SkillId>,
}

pub fn run(ctx: &AppContext, args: &DependentsArgs) -> Result<()> {
    let matrix = ctx.load_matrix()?;
    let skill = resolve_alias(&matrix, &args.skill);
    if matrix.skill(&skill).is_none() {
        return Err(SmxError::SkillNotFound(args.skill.clone()));
    }
    let dependents = if args.cascade {
        get_cascade_dependents(&matrix, &skill, &args.select)
    } else {
        get_dependent_skills(&matrix, &skill, &args.select)
    };
    let report = DependentsReport {
        skill,
        cascade: args.cascade,
        dependents,
    };

    if ctx.robot {
        return emit_json(&robot_ok(&report));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Dependents of {}", report.skill));
    if report.dependents.is_empty() {
        layout.bullet("none");
    }
    for id in &report.dependents {
        let label = matrix.skill(id).map_or(id.as_str(), |s| s.label());
        layout.bullet(label);
    }
    emit_human(layout);
    Ok(())
}
