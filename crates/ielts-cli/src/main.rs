//! ielts CLI: timed practice sessions from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ielts", version, about = "Timed IELTS practice sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a timed practice session against a question set
    Practice {
        /// Path to a .toml question set
        #[arg(long)]
        questions: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory results are written to (default: `results_dir` from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Milliseconds per countdown second (lower it to rehearse quickly)
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },

    /// Validate question set TOML files
    Validate {
        /// Path to question set file or directory
        #[arg(long)]
        questions: PathBuf,
    },

    /// Show the band calibration table
    Bands {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and a sample question set
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ielts=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Practice {
            questions,
            config,
            output,
            tick_ms,
        } => commands::practice::execute(questions, config, output, tick_ms).await,
        Commands::Validate { questions } => commands::validate::execute(questions),
        Commands::Bands { config } => commands::bands::execute(config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
