//! `evalspread detect`: critical points in dispersion results files.

use std::path::Path;

use evalspread_core::{FileDetection, detect_path};

pub fn run(input: &str, output: &str) {
    match detect_path(Path::new(input), Path::new(output)) {
        Ok(done) => print_detections(&done),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn print_detections(done: &[FileDetection]) {
    if done.is_empty() {
        println!("No results files analysed.");
        return;
    }
    for file in done {
        println!("{}", file.input.display());
        for (metric, count) in &file.counts {
            println!("  {:<10} {count} critical points", metric.label());
        }
        println!("  -> {}", file.output_dir.display());
    }
}
