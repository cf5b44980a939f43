use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyloop", version, about = "Study tasks with delayed rewards and spaced review")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task lifecycle
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Subject management and levels
    Subject {
        #[command(subcommand)]
        action: commands::subject::SubjectAction,
    },
    /// Show the coin balance
    Wallet,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_logging() {
    // STUDYLOOP_LOG=debug shows skipped transitions.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STUDYLOOP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Subject { action } => commands::subject::run(action),
        Commands::Wallet => commands::wallet::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "studyloop", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
