//! `loraflowctl recommend ...` — operator access to the recommendation
//! endpoint (spec §6, §4.H).

use crate::client::ControlPlaneClient;
use crate::output::OutputFormat;
use clap::Args;

#[derive(Args)]
pub struct RecommendArgs {
    /// `similar` (needs `--target`) or `for-prompt` (needs `--prompt`).
    #[arg(long)]
    pub kind: String,
    #[arg(long)]
    pub target: Option<String>,
    #[arg(long)]
    pub prompt: Option<String>,
    #[arg(long, default_value_t = 10)]
    pub k: u32,
}

pub async fn run(client: &ControlPlaneClient, args: RecommendArgs, format: OutputFormat) -> anyhow::Result<()> {
    let kind = match args.kind.as_str() {
        "similar" => "similar",
        "for-prompt" | "for_prompt" => "for_prompt",
        other => anyhow::bail!("unknown recommendation kind {other:?}, expected similar|for-prompt"),
    };
    let value = client
        .recommendations(kind, args.target.as_deref(), args.prompt.as_deref(), args.k)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Text => {
            let items = value.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            for item in items {
                let name = item.get("name").and_then(|v| v.as_str()).unwrap_or("?");
                let score = item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);
                println!("{name:<30} score={score:.3}");
            }
        }
    }
    Ok(())
}
