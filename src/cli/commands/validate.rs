//! smx validate - Check a complete selection against the matrix rules

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::{Result, SmxError};
use crate::matrix::validate_selection;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Selected skills (ids or display names)
    #[arg(required = true)]
    pub skills: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &ValidateArgs) -> Result<()> {
    let matrix = ctx.load_matrix()?;
    let result = validate_selection(&matrix, &args.skills);

    if ctx.robot {
        emit_json(&robot_ok(&result))?;
    } else {
        let mut layout = HumanLayout::new();
        layout.title("Selection");
        layout.kv("Skills", &args.skills.join(", "));
        layout.kv("Valid", if result.valid { "yes" } else { "no" });

        if !result.errors.is_empty() {
            layout.blank().section("Errors");
            for error in &result.errors {
                layout.bullet(&error.message);
            }
        }
        if !result.warnings.is_empty() {
            layout.blank().section("Warnings");
            for warning in &result.warnings {
                layout.bullet(&warning.message);
            }
        }
        emit_human(layout);
    }

    if result.valid {
        Ok(())
    } else {
        Err(SmxError::ValidationFailed(format!(
            "{} selection error(s)",
            result.errors.len()
        )))
    }
}
