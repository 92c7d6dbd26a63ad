use anyhow::anyhow;
use clap::Args;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::grading;
use crate::types::AcademicSystem;

#[derive(Args)]
pub struct GradeArgs {
    #[arg(help = "Marks obtained")]
    pub marks: f64,

    #[arg(long, default_value_t = 100.0, help = "Maximum marks")]
    pub max: f64,

    #[arg(long, default_value = "EIGHT_FOUR_FOUR", help = "Academic system (EIGHT_FOUR_FOUR or CBC)")]
    pub system: String,
}

pub fn handle(args: GradeArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let system = AcademicSystem::parse(&args.system).ok_or_else(|| anyhow!("unknown academic system '{}'", args.system))?;
    let percentage = grading::percentage(Some(args.marks), Some(args.max))
        .ok_or_else(|| anyhow!("--max must be greater than zero"))?;
    let result = grading::grade(percentage, system)?;

    match output_format {
        OutputFormat::Json => {
            let body = json!({
                "academicSystem": system,
                "percentage": percentage,
                "grade": result.grade,
                "gradePoints": result.points
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            println!(
                "{:.2}% -> {} ({} points, {})",
                percentage,
                result.grade.label(),
                result.points,
                system
            );
        }
    }
    Ok(())
}
