mod errors;
mod logging;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use sitcorpus_core::CorpusPaths;
use sitcorpus_eval::{ValidateOptions, ValidationEngine, ValidationResult};
use sitcorpus_generate::{GenerateOptions, Postprocessor, RenderEngine};
use sitcorpus_plan::{Manifest, build_manifest, config_json_schema, load_config, resolve_seed};
use tracing::{info, warn};
use uuid::Uuid;

use errors::CliResult;
use logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "sitcorpus", version, about = "Labeled SIT corpus synthesizer")]
struct Cli {
    /// Corpus output directory.
    #[arg(long, global = true, default_value = "output")]
    out: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the config and plan the corpus (`meta.json`, `mapping_meta.csv`).
    Plan(PlanArgs),
    /// Render every planned document to `files/`.
    Generate,
    /// Derive e-mail representations and attachments from rendered text.
    Postprocess,
    /// Check every label against the rendered artifacts.
    Validate(ValidateArgs),
    /// Plan, generate, post-process and validate in one go.
    Run(RunArgs),
    /// Print the config JSON Schema.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Config file (JSON, or TOML with a `.toml` extension).
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Seed override; wins over `random_seed` in the config.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Take the catalog and target from this config instead of `meta.json`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Exit with an error when any issue is found.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    plan: PlanArgs,
    #[arg(long, default_value_t = false)]
    strict: bool,
    #[arg(long, default_value_t = false)]
    skip_postprocess: bool,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> CliResult<()> {
    let Cli { out, command } = cli;
    if let Command::Schema(args) = command {
        return run_schema(args);
    }

    let paths = CorpusPaths::new(&out);
    paths.ensure_dirs()?;
    init_logging(Some(&paths.run_log_path()))?;

    let run_id = Uuid::new_v4().to_string();
    let timer = Instant::now();
    info!(event = "run_started", run_id = %run_id, command = command_name(&command), out = %out.display());

    match command {
        Command::Plan(args) => {
            run_plan(&paths, &args)?;
        }
        Command::Generate => {
            run_generate(&out)?;
        }
        Command::Postprocess => {
            run_postprocess(&out)?;
        }
        Command::Validate(args) => {
            run_validate(&out, args.config.as_deref(), args.strict)?;
        }
        Command::Run(args) => {
            run_plan(&paths, &args.plan)?;
            run_generate(&out)?;
            if !args.skip_postprocess {
                run_postprocess(&out)?;
            }
            run_validate(&out, None, args.strict)?;
        }
        Command::Schema(_) => {}
    }

    info!(
        event = "run_finished",
        run_id = %run_id,
        status = "success",
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Plan(_) => "plan",
        Command::Generate => "generate",
        Command::Postprocess => "postprocess",
        Command::Validate(_) => "validate",
        Command::Run(_) => "run",
        Command::Schema(_) => "schema",
    }
}

fn run_plan(paths: &CorpusPaths, args: &PlanArgs) -> CliResult<Manifest> {
    let validated = load_config(&args.config)?;
    for warning in &validated.warnings {
        warn!(code = %warning.code, path = %warning.path, "{}", warning.message);
    }

    let seed = args.seed.unwrap_or_else(|| resolve_seed(&validated.config));
    let manifest = build_manifest(&validated.config, seed)?;
    manifest.save(&paths.manifest_path())?;
    manifest.to_ledger().save(&paths.ledger_path())?;

    for shortfall in &manifest.shortfalls {
        warn!(
            sit_id = %shortfall.sit_id,
            count = shortfall.count,
            target = shortfall.target,
            "category below target"
        );
    }
    println!(
        "planned {} documents (seed {}, converged {})",
        manifest.docs.len(),
        manifest.seed,
        manifest.converged
    );
    Ok(manifest)
}

fn run_generate(out: &Path) -> CliResult<()> {
    let options = GenerateOptions {
        out_dir: out.to_path_buf(),
        ..GenerateOptions::default()
    };
    let result = RenderEngine::new(options).run_from_disk()?;
    println!(
        "rendered {} documents ({} words, {} fallback values)",
        result.report.docs_rendered,
        result.report.words_written,
        result.report.fallback_count + result.report.failed_over_count
    );
    Ok(())
}

fn run_postprocess(out: &Path) -> CliResult<()> {
    let options = GenerateOptions {
        out_dir: out.to_path_buf(),
        ..GenerateOptions::default()
    };
    let result = Postprocessor::new(options).run_from_disk()?;
    println!(
        "post-processed {} rows ({} skipped, {} attachments)",
        result.report.rows_processed, result.report.rows_skipped, result.report.attachments_written
    );
    Ok(())
}

fn run_validate(out: &Path, config: Option<&Path>, strict: bool) -> CliResult<()> {
    let engine = ValidationEngine::new(ValidateOptions {
        out_dir: out.to_path_buf(),
        strict,
        ..ValidateOptions::default()
    });
    let result = match config {
        Some(path) => {
            let validated = load_config(path)?;
            engine.run_with_catalog(&validated.config.sits, validated.config.per_sit_count)?
        }
        None => engine.run()?,
    };
    print_validation_summary(&result);
    Ok(())
}

fn print_validation_summary(result: &ValidationResult) {
    for line in result.report.lines().take(50) {
        println!("{line}");
    }
    println!();
    println!("Full report saved to {}", result.report_path.display());
}

fn run_schema(args: SchemaArgs) -> CliResult<()> {
    let schema = config_json_schema();
    let json = serde_json::to_string_pretty(&schema)?;
    match args.output {
        Some(path) => sitcorpus_core::write_bytes_atomic(&path, json.as_bytes())?,
        None => println!("{json}"),
    }
    Ok(())
}
