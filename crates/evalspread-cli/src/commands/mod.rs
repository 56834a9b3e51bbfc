pub mod detect;
pub mod evaluate;
pub mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Args;
use evalspread_core::{EvalspreadConfig, load_config_from_path};

/// Engine and search flags shared by `evaluate` and `run`. Flags override the
/// config file, which overrides built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// JSON config file (engine, search, workers)
    #[arg(long)]
    pub config: Option<String>,

    /// Engine executable path or name on PATH (default: stockfish)
    #[arg(long)]
    pub engine: Option<String>,

    /// Candidate moves sampled per position (default: 5)
    #[arg(long)]
    pub candidates: Option<usize>,

    /// Fixed search depth in plies (default: 20)
    #[arg(long)]
    pub depth: Option<u32>,

    /// Engine Threads option (default: 6)
    #[arg(long)]
    pub threads: Option<u32>,

    /// Engine Hash option in MB (default: 4096)
    #[arg(long)]
    pub hash: Option<u32>,

    /// Positions analysed concurrently, one engine process each (default: 1)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seconds to wait for engine output before giving up on a position; 0 waits forever (default: 300)
    #[arg(long)]
    pub timeout_sec: Option<u64>,
}

/// Build the effective configuration, exiting on an unreadable config file.
pub fn resolve_config(args: &EngineArgs) -> EvalspreadConfig {
    let base = match args.config.as_deref() {
        Some(path) => match load_config_from_path(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: cannot load config '{path}': {e}");
                std::process::exit(1);
            }
        },
        None => EvalspreadConfig::default(),
    };
    apply_overrides(base, args)
}

fn apply_overrides(mut config: EvalspreadConfig, args: &EngineArgs) -> EvalspreadConfig {
    if let Some(engine) = &args.engine {
        config.engine.path = engine.clone();
    }
    if let Some(k) = args.candidates {
        config.search.candidates = k;
    }
    if let Some(d) = args.depth {
        config.search.depth = d;
    }
    if let Some(t) = args.threads {
        config.engine.threads = t;
    }
    if let Some(h) = args.hash {
        config.engine.hash_mb = h;
    }
    if let Some(w) = args.workers {
        config.workers = w;
    }
    if let Some(s) = args.timeout_sec {
        config.engine.query_timeout_secs = s;
    }
    config.normalized()
}

/// Stop flag raised by Ctrl+C. Positions in flight finish; no new ones start.
pub fn install_stop_flag() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    }) {
        log::warn!("cannot install Ctrl+C handler: {e}");
    }
    stop
}
