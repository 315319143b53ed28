//! smx options - Selectable skills of a subcategory

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, marker, robot_ok};
use crate::error::{Result, SmxError};
use crate::matrix::{ResolverOptions, SkillOption, get_available_skills, is_category_all_disabled};

#[derive(Args, Debug)]
pub struct OptionsArgs {
    /// Subcategory id
    pub subcategory: String,

    /// Current selection, comma separated
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Ignore conflicts and unmet requirements
    #[arg(long)]
    pub expert: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsReport<'a> {
    subcategory: &'a str,
    all_disabled: bool,
    options: Vec<SkillOption>,
}

pub fn run(ctx: &AppContext, args: &OptionsArgs) -> Result<()> {
    let matrix = ctx.load_matrix()?;
    if !matrix.categories.contains_key(&args.subcategory) {
        return Err(SmxError::UnknownCategory(args.subcategory.clone()));
    }
    let resolver = ResolverOptions {
        expert_mode: args.expert,
    };
    let report = OptionsReport {
        subcategory: &args.subcategory,
        all_disabled: is_category_all_disabled(&matrix, &args.subcategory, &args.select, resolver),
        options: get_available_skills(&matrix, &args.subcategory, &args.select, resolver),
    };

    if ctx.robot {
        return emit_json(&robot_ok(&report));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Options: {}", args.subcategory));
    if report.options.is_empty() {
        layout.bullet("no skills in this subcategory");
    }
    for option in &report.options {
        let mut line = format!("{} {}", marker(option.selected, option.disabled), option.label);
        for note in [
            option.disabled_reason.as_deref(),
            option.discouraged_reason.as_deref(),
            option.recommended_reason.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            line.push_str(&format!(" ({note})"));
        }
        layout.bullet(&line);
    }
    if report.all_disabled {
        layout.blank().bullet("every option is disabled by the current selection");
    }
    emit_human(layout);
    Ok(())
}
