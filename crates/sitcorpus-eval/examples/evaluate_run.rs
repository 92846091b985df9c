use std::env;
use std::path::PathBuf;

use sitcorpus_eval::{ValidateOptions, ValidationEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut options = ValidateOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => {
                options.out_dir = args.next().map(PathBuf::from).ok_or("missing --out value")?
            }
            "--strict" => options.strict = true,
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let result = ValidationEngine::new(options).run()?;

    println!("metrics_path={}", result.metrics_path.display());
    println!("report_path={}", result.report_path.display());
    println!("issues={}", result.metrics.issues_total);
    Ok(())
}
