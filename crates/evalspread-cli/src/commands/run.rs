//! `evalspread run`: evaluate, then detect over the produced results.

use std::path::Path;

use evalspread_core::detect_file;
use log::error;

use super::EngineArgs;
use super::detect::print_detections;

pub fn run(input: &str, output: &str, args: &EngineArgs) {
    let evaluated = super::evaluate::run(input, output, args);

    println!();
    let mut detections = Vec::with_capacity(evaluated.len());
    for file in &evaluated {
        match detect_file(&file.results_path, Path::new(output)) {
            Ok(d) => detections.push(d),
            Err(e) => error!("{}: {e}", file.results_path.display()),
        }
    }
    print_detections(&detections);
}
