//! smx matrix - Dump the merged matrix

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::matrix::{categories_for_domain, domains};

#[derive(Args, Debug)]
pub struct MatrixArgs {
    /// Only list the categories of this domain
    #[arg(long)]
    pub domain: Option<String>,
}

pub fn run(ctx: &AppContext, args: &MatrixArgs) -> Result<()> {
    let matrix = ctx.load_matrix()?;

    if let Some(domain) = &args.domain {
        let categories = categories_for_domain(&matrix, domain);
        if ctx.robot {
            return emit_json(&robot_ok(&categories));
        }
        let mut layout = HumanLayout::new();
        layout.title(&format!("Domain: {domain}"));
        for category in categories {
            let count = matrix.skills_in_category(&category.id).count();
            layout.kv(&category.id, &format!("{count} skill(s)"));
        }
        emit_human(layout);
        return Ok(());
    }

    if ctx.robot {
        return emit_json(&robot_ok(&matrix));
    }

    let mut layout = HumanLayout::new();
    layout.title("Skills matrix");
    layout.kv("Version", &matrix.version);
    layout.kv("Generated", &matrix.generated_at.to_rfc3339());
    layout.kv("Skills", &matrix.skills.len().to_string());
    layout.kv("Stacks", &matrix.suggested_stacks.len().to_string());
    for domain in domains(&matrix) {
        layout.blank().section(&domain);
        for category in categories_for_domain(&matrix, &domain) {
            let skills: Vec<&str> = matrix
                .skills_in_category(&category.id)
                .map(|s| s.label())
                .collect();
            layout.kv(&category.id, &skills.join(", "));
        }
    }
    emit_human(layout);
    Ok(())
}
