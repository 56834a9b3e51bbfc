//! `evalspread evaluate`: dispersion of top-move evaluations per position.

use std::path::Path;

use evalspread_core::{FileEvaluation, Pipeline, ReportError, UciLauncher, evaluate_path};

use super::{EngineArgs, install_stop_flag, resolve_config};

/// Run the evaluate command and return what was written.
pub fn run(input: &str, output: &str, args: &EngineArgs) -> Vec<FileEvaluation> {
    let config = resolve_config(args);
    let launcher = UciLauncher::new(config.engine);
    let pipeline = Pipeline::new(&launcher, config.search)
        .with_workers(config.workers)
        .with_stop_flag(install_stop_flag());
    let engine = launcher.config();

    println!("Evaluating {input}");
    println!("  Engine:     {}", engine.path);
    println!(
        "  Search:     top {} moves, depth {}",
        config.search.candidates, config.search.depth
    );
    println!(
        "  Engine opts: threads={} hash={}MB",
        engine.threads, engine.hash_mb
    );
    println!("  Workers:    {}", config.workers);
    println!("  Output:     {output}");

    let done = match evaluate_path(&pipeline, &engine.path, Path::new(input), Path::new(output))
    {
        Ok(done) => done,
        Err(e @ ReportError::Pipeline(_)) => {
            eprintln!("Error: {e}");
            eprintln!("Check --engine (or engine.path in the config) points to a UCI engine.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!();
    if done.is_empty() {
        println!("No input files evaluated.");
    }
    for file in &done {
        println!(
            "  {:<40} {:>5} records {:>4} skipped {:>4} bad lines{}",
            file.input.display(),
            file.records,
            file.skipped,
            file.rejected_lines,
            if file.cancelled { "  (cancelled)" } else { "" }
        );
        println!("    -> {}", file.results_path.display());
    }
    done
}
