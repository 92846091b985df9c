use std::env;
use std::path::PathBuf;

use sitcorpus_plan::{PlanError, ValidationReport, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("missing config path")?;

    let validated = match load_config(&config_path) {
        Ok(validated) => validated,
        Err(PlanError::Invalid(report)) => {
            eprintln!("config validation failed");
            print_report(&report);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    if validated.warnings.is_empty() {
        println!(
            "config validated successfully ({} categories)",
            validated.config.sits.len()
        );
    } else {
        eprintln!("config validated with warnings:");
        print_report(&ValidationReport {
            errors: Vec::new(),
            warnings: validated.warnings,
        });
    }

    Ok(())
}

fn print_report(report: &ValidationReport) {
    for line in report.summary().lines() {
        eprintln!("{line}");
    }
}
