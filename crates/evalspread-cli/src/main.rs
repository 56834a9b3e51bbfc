//! CLI for evalspread: how much do the engine's best moves disagree?

mod commands;

use clap::{Parser, Subcommand};

use commands::EngineArgs;

#[derive(Parser)]
#[command(name = "evalspread")]
#[command(about = "evalspread: engine evaluation dispersion and critical-point reports")]
#[command(version = evalspread_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate FEN files: sample the engine's top moves per position and
    /// write range, SD, MAD and IQR of their evaluations.
    /// INPUT is a FEN file or a folder of *.txt FEN files.
    Evaluate {
        input: String,

        /// Folder receiving <stem>_results.txt and <stem>_summary.json
        #[arg(long, default_value = "results")]
        output: String,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Find critical points in dispersion results files.
    /// INPUT is a results file or a folder of *.txt results files.
    Detect {
        input: String,

        /// Folder receiving one analysis_results_<stem> folder per input file
        #[arg(long, default_value = "analysis")]
        output: String,
    },

    /// Evaluate, then detect critical points in the produced results.
    Run {
        input: String,

        /// Folder receiving results files and analysis folders
        #[arg(long, default_value = "results")]
        output: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            input,
            output,
            engine,
        } => {
            commands::evaluate::run(&input, &output, &engine);
        }
        Commands::Detect { input, output } => commands::detect::run(&input, &output),
        Commands::Run {
            input,
            output,
            engine,
        } => commands::run::run(&input, &output, &engine),
    }
}
