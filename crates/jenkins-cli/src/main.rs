mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{build::BuildArgs, notify::NotifyArgs};
use jenkins_core::BuildError;

#[derive(Parser)]
#[command(
    name = "jenkins-build",
    about = "Trigger a Jenkins build, follow it to the end, and report the result",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress at INFO level (RUST_LOG still applies)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a job and optionally wait for it, streaming its console log
    Build(BuildArgs),

    /// Send an execution event to the Jenkins Rundeck webhook
    Notify(NotifyArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => cmd::build::run(args, cli.json),
        Commands::Notify(args) => cmd::notify::run(args, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let code = e
            .downcast_ref::<BuildError>()
            .map(|e| e.reason().exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
}
