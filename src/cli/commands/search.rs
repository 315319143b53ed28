//! smx search - Find a skill alias in the extra sources

use clap::Args;

use crate::app::AppContext;
use crate::cli::commands::block_on;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Skill directory name to look for
    pub alias: String,

    /// Re-clone remote catalogs instead of reusing the cache
    #[arg(long)]
    pub force_refresh: bool,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let mut config = ctx.config.source_config();
    config.force_refresh |= args.force_refresh;
    let loader = ctx.source_loader();
    let results = block_on(loader.search_extra_sources(&args.alias, &config))?;

    if ctx.robot {
        return emit_json(&robot_ok(&results));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Matches for '{}'", args.alias));
    if config.extra.is_empty() {
        layout.bullet("no extra sources configured");
    } else if results.is_empty() {
        layout.bullet("no matches");
    }
    for hit in &results {
        layout.bullet(&format!("{} ({}) {}", hit.skill_id, hit.source_name, hit.path));
    }
    emit_human(layout);
    Ok(())
}
