//! smx doctor - Ghost references and unmapped categories

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::{Result, SmxError};
use crate::health::{HealthReport, MatrixHealthIssue, check};

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Exit non-zero on warnings too
    #[arg(long)]
    pub strict: bool,
}

#[derive(Serialize)]
struct DoctorReport<'a> {
    summary: HealthReport,
    issues: &'a [MatrixHealthIssue],
}

pub fn run(ctx: &AppContext, args: &DoctorArgs) -> Result<()> {
    let matrix = ctx.load_matrix()?;
    let issues = check(&matrix);
    let summary = HealthReport::summarize(&issues);

    if ctx.robot {
        emit_json(&robot_ok(DoctorReport {
            summary,
            issues: &issues,
        }))?;
    } else {
        let mut layout = HumanLayout::new();
        layout.title("Matrix health");
        layout.kv("Skills", &matrix.skills.len().to_string());
        layout.kv("Categories", &matrix.categories.len().to_string());
        layout.kv("Errors", &summary.errors.to_string());
        layout.kv("Warnings", &summary.warnings.to_string());
        if !issues.is_empty() {
            layout.blank().section("Issues");
            for issue in &issues {
                layout.bullet(&issue.to_string());
            }
        }
        emit_human(layout);
    }

    let failed = if args.strict {
        !summary.is_clean()
    } else {
        !summary.is_healthy()
    };
    if failed {
        return Err(SmxError::ValidationFailed(format!(
            "{} error(s), {} warning(s)",
            summary.errors, summary.warnings
        )));
    }
    Ok(())
}
