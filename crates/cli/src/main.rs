//! `loraflowctl`: an operator CLI over the `loraflowd` HTTP/WebSocket API
//! (spec §6). Every subcommand is a thin wrapper around one route; all
//! validation and state live in the server process, not here.

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use client::ControlPlaneClient;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "loraflowctl", about = "Operator CLI for the LoRA generation control plane")]
struct Cli {
    /// Base URL of the `loraflowd` instance to talk to.
    #[arg(long, env = "LORAFLOW_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage generation jobs.
    Job(commands::job::JobArgs),
    /// Query the recommendation endpoint.
    Recommend(commands::recommend::RecommendArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = ControlPlaneClient::new(cli.server);

    match cli.command {
        Command::Job(args) => commands::job::run(&client, args, cli.format).await,
        Command::Recommend(args) => commands::recommend::run(&client, args, cli.format).await,
    }
}
