use std::env;
use std::path::PathBuf;

use sitcorpus_generate::{GenerateOptions, Postprocessor, RenderEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut out_dir: Option<PathBuf> = None;
    let mut postprocess = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out_dir = args.next().map(PathBuf::from),
            "--postprocess" => postprocess = true,
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let mut options = GenerateOptions::default();
    if let Some(out_dir) = out_dir {
        options.out_dir = out_dir;
    }

    let result = RenderEngine::new(options.clone()).run_from_disk()?;
    println!(
        "rendered={} words={}",
        result.report.docs_rendered, result.report.words_written
    );

    if postprocess {
        let result = Postprocessor::new(options).run_from_disk()?;
        println!(
            "postprocessed={} skipped={}",
            result.report.rows_processed, result.report.rows_skipped
        );
    }
    Ok(())
}
