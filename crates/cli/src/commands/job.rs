//! `loraflowctl job ...` — operator commands over the generation API (spec §6).

use crate::client::{AdapterSelectorArgs, ControlPlaneClient, GenerateArgs, GenerateParamsArgs};
use crate::output::{emit, status_label, OutputFormat};
use clap::{Args, Subcommand};
use futures_util::StreamExt;
use loraflow_core::Job;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// Submit a new generation request.
    Submit {
        /// Text placed before the composed LoRA tokens.
        #[arg(long)]
        prefix: Option<String>,
        /// Text placed after the adapters' trigger words.
        #[arg(long)]
        suffix: Option<String>,
        #[arg(long)]
        negative_prompt: Option<String>,
        #[arg(long, default_value = "euler")]
        sampler: String,
        #[arg(long, default_value_t = 20)]
        steps: u32,
        #[arg(long, default_value_t = 7.0)]
        cfg_scale: f64,
        #[arg(long, default_value_t = 512)]
        width: u32,
        #[arg(long, default_value_t = 512)]
        height: u32,
        #[arg(long)]
        seed: Option<i64>,
        #[arg(long, default_value_t = 1)]
        batch_size: u32,
        /// `immediate` or `queued` (spec §4.G).
        #[arg(long, default_value = "queued")]
        mode: String,
        /// Explicit adapter selection as `adapter_id[:weight]`; repeatable.
        /// Omit entirely to use every currently active adapter.
        #[arg(long = "adapter")]
        adapters: Vec<String>,
    },
    /// Fetch one job by id.
    Get { id: String },
    /// List jobs, optionally filtered by status.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Request cancellation of an in-flight job.
    Cancel { id: String },
    /// Stream status events for one job (or every job) over the WebSocket
    /// feed until a terminal event arrives.
    Watch {
        /// Omit to watch every job.
        id: Option<String>,
    },
}

pub async fn run(client: &ControlPlaneClient, args: JobArgs, format: OutputFormat) -> anyhow::Result<()> {
    match args.command {
        JobCommand::Submit {
            prefix,
            suffix,
            negative_prompt,
            sampler,
            steps,
            cfg_scale,
            width,
            height,
            seed,
            batch_size,
            mode,
            adapters,
        } => {
            let adapters = if adapters.is_empty() {
                None
            } else {
                Some(adapters.iter().map(|raw| parse_adapter_selector(raw)).collect())
            };
            let request = GenerateArgs {
                prefix,
                suffix,
                negative_prompt,
                params: GenerateParamsArgs { sampler, steps, cfg_scale, width, height, seed, batch_size },
                mode,
                adapters,
            };
            let job = client.create_job(&request).await?;
            print_job(&job, format)?;
        }
        JobCommand::Get { id } => {
            let job = client.get_job(&id).await?;
            print_job(&job, format)?;
        }
        JobCommand::List { status, limit } => {
            let jobs = client.list_jobs(status.as_deref(), limit).await?;
            emit(format, &jobs, |jobs| {
                for job in jobs {
                    println!(
                        "{:<24} {:<11} {:>5.1}%  {}",
                        job.id.as_str(),
                        status_label(&job.status.to_string()),
                        job.progress * 100.0,
                        truncate(&job.prompt, 60),
                    );
                }
            })?;
        }
        JobCommand::Cancel { id } => {
            let job = client.cancel_job(&id).await?;
            print_job(&job, format)?;
        }
        JobCommand::Watch { id } => watch(client, id.as_deref()).await?,
    }
    Ok(())
}

fn print_job(job: &Job, format: OutputFormat) -> anyhow::Result<()> {
    emit(format, job, |job| {
        println!("id:            {}", job.id);
        println!("status:        {}", status_label(&job.status.to_string()));
        println!("progress:      {:.1}%", job.progress * 100.0);
        println!("prompt:        {}", job.prompt);
        if let Some(result) = &job.result {
            println!("result:        {}", serde_json::to_string(result).unwrap_or_default());
        }
    })
}

/// Tail `/ws/progress` and print every event as it arrives. Exits cleanly
/// once the hub sends a terminal event for a job-scoped watch, or the
/// connection closes for an all-jobs watch.
async fn watch(client: &ControlPlaneClient, job_id: Option<&str>) -> anyhow::Result<()> {
    let url = client.ws_url(job_id);
    let (stream, _) = connect_async(&url).await?;
    let (_, mut read) = stream.split();

    while let Some(message) = read.next().await {
        let message = message?;
        let Message::Text(text) = message else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else { continue };
        println!("{text}");

        let is_terminal = value.get("type").and_then(|t| t.as_str()) == Some("status")
            && matches!(
                value.get("status").and_then(|s| s.as_str()),
                Some("completed") | Some("failed") | Some("canceled")
            );
        if job_id.is_some() && is_terminal {
            break;
        }
        if value.get("type").and_then(|t| t.as_str()) == Some("close") {
            break;
        }
    }
    Ok(())
}

fn parse_adapter_selector(raw: &str) -> AdapterSelectorArgs {
    match raw.split_once(':') {
        Some((id, weight)) => AdapterSelectorArgs {
            adapter_id: id.to_string(),
            weight_override: weight.parse().ok(),
        },
        None => AdapterSelectorArgs { adapter_id: raw.to_string(), weight_override: None },
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{truncated}…")
}
