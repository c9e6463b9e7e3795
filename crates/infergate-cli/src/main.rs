use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "infergate",
    about = "infergate: profile-based request scheduling for inference pods",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a scheduler config and report its handler and profiles.
    Validate {
        /// Path to the scheduler TOML file
        #[arg(short, long)]
        config: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Schedule one request against a set of pods.
    ///
    /// The input file is JSON of the form
    /// `{ "request": { .. }, "pods": [ .. ] }`. Run with
    /// RUST_LOG=infergate=debug to also print the metrics exposition.
    Schedule {
        /// Path to the scheduler TOML file
        #[arg(short, long)]
        config: String,
        /// Path to the request and pods JSON file
        #[arg(short, long)]
        input: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Abandon scheduling after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Write a single-profile scheduler config scaffold.
    Init {
        /// Metric the generated scorer prefers low values of
        #[arg(short, long, default_value = "kv_cache_usage")]
        metric: String,
        /// Output path
        #[arg(short, long, default_value = "scheduler.toml")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("infergate=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config, format } => commands::validate::validate(&config, &format),
        Commands::Schedule {
            config,
            input,
            format,
            timeout_ms,
        } => commands::schedule::schedule(&config, &input, &format, timeout_ms).await,
        Commands::Init { metric, output } => commands::validate::init(&metric, &output),
    }
}
