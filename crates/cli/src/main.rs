//! ContentForge CLI - Command-line client for the ContentForge daemon

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "contentforge")]
#[command(about = "ContentForge CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "CONTENTFORGE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a content job from a URL or markdown
    Create(CreateArgs),

    /// Show one job
    Get { job_id: String },

    /// List recent jobs
    List {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Request cancellation of a job
    Cancel { job_id: String },

    /// Run a failed or partial job once more
    Retry { job_id: String },

    /// List generated files of a job
    Artifacts { job_id: String },

    /// Print the local path of a generated file
    ArtifactPath {
        job_id: String,
        /// Relative path, e.g. visuals/thumbnail.png
        path: String,
    },

    /// Prompt templates and variables
    #[command(subcommand)]
    Prompt(PromptCommands),
}

#[derive(Args)]
struct CreateArgs {
    /// Web page or YouTube URL
    #[arg(long, conflicts_with_all = ["markdown", "markdown_file"])]
    url: Option<String>,

    /// Inline markdown source
    #[arg(long, conflicts_with = "markdown_file")]
    markdown: Option<String>,

    /// Markdown source read from a file
    #[arg(long)]
    markdown_file: Option<PathBuf>,

    /// Output targets (repeatable); defaults to every target except shorts-videos
    #[arg(short, long = "target")]
    targets: Vec<String>,

    #[arg(long)]
    tone: Option<String>,

    #[arg(long)]
    language: Option<String>,

    /// Skip external providers and render placeholders
    #[arg(long)]
    mock: bool,
}

#[derive(Subcommand)]
enum PromptCommands {
    /// List templates and variables
    List,

    /// Replace a template's content from a file
    Set { key: String, file: PathBuf },

    /// Create or replace a variable definition
    SetVar {
        key: String,
        name: String,
        /// INPUT_REQUIRED, INPUT_WITH_DEFAULT or AI_GENERATED
        #[arg(long, default_value = "INPUT_WITH_DEFAULT")]
        kind: String,
        #[arg(long, default_value = "")]
        default_value: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Only used by AI_GENERATED variables
        #[arg(long, default_value = "")]
        instruction: String,
        #[arg(long, default_value = "100")]
        sort_order: i64,
    },

    /// Delete a variable definition
    DeleteVar { key: String, name: String },
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Tabled)]
struct JobRow {
    id: String,
    status: String,
    stage: String,
    progress: String,
    targets: String,
}

impl JobRow {
    fn from_value(job: &Value) -> Self {
        let text = |key: &str| job[key].as_str().unwrap_or("-").to_string();
        let targets = job["targets"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        Self {
            id: text("id"),
            status: text("status"),
            stage: text("current_stage"),
            progress: format!("{}%", job["progress"].as_u64().unwrap_or(0)),
            targets,
        }
    }
}

#[derive(Tabled)]
struct ArtifactRow {
    path: String,
    #[tabled(rename = "type")]
    kind: String,
    size: u64,
}

#[derive(Tabled)]
struct TemplateRow {
    key: String,
    label: String,
    chars: usize,
}

#[derive(Tabled)]
struct VariableRow {
    key: String,
    name: String,
    kind: String,
    default_value: String,
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0",
        method,
        params,
        id: 1,
    };

    let response: JsonRpcResponse = reqwest::Client::new()
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn create_params(args: CreateArgs) -> Result<Value> {
    let markdown = match (&args.markdown, &args.markdown_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        (None, None) => None,
    };
    if markdown.is_none() && args.url.is_none() {
        anyhow::bail!("one of --url, --markdown or --markdown-file is required");
    }

    Ok(json!({
        "source_markdown": markdown,
        "source_url": args.url,
        "targets": (!args.targets.is_empty()).then_some(args.targets),
        "tone": args.tone,
        "language": args.language,
        "mock_mode": args.mock,
    }))
}

fn print_job(job: &Value) {
    println!("{}", Table::new(vec![JobRow::from_value(job)]));
    if let Some(message) = job["error_message"].as_str() {
        println!();
        println!("{}", "Errors:".yellow().bold());
        println!("{}", message);
    }
}

async fn run_prompt_command(url: &str, command: PromptCommands) -> Result<()> {
    match command {
        PromptCommands::List => {
            let result = call_rpc(url, "prompt.list.v1", json!({})).await?;
            let templates: Vec<TemplateRow> = result["templates"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|t| TemplateRow {
                    key: t["key"].as_str().unwrap_or("-").to_string(),
                    label: t["label"].as_str().unwrap_or("-").to_string(),
                    chars: t["content"].as_str().map_or(0, |c| c.chars().count()),
                })
                .collect();
            println!("{}", Table::new(templates));

            let mut variables: Vec<VariableRow> = result["variables"]
                .as_object()
                .into_iter()
                .flat_map(|map| map.values())
                .filter_map(Value::as_array)
                .flatten()
                .map(|v| VariableRow {
                    key: v["prompt_key"].as_str().unwrap_or("-").to_string(),
                    name: v["name"].as_str().unwrap_or("-").to_string(),
                    kind: v["kind"]["type"].as_str().unwrap_or("-").to_string(),
                    default_value: v["default_value"].as_str().unwrap_or("").to_string(),
                })
                .collect();
            variables.sort_by(|a, b| (&a.key, &a.name).cmp(&(&b.key, &b.name)));
            println!("{}", Table::new(variables));
        }

        PromptCommands::Set { key, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            call_rpc(
                url,
                "prompt.update.v1",
                json!({ "key": key, "content": content }),
            )
            .await?;
            println!("{}", format!("✓ Template {} updated", key).green().bold());
        }

        PromptCommands::SetVar {
            key,
            name,
            kind,
            default_value,
            description,
            instruction,
            sort_order,
        } => {
            let kind = match kind.to_ascii_uppercase().as_str() {
                "AI_GENERATED" => json!({ "type": "AI_GENERATED", "instruction": instruction }),
                "INPUT_REQUIRED" | "REQUIRED" => json!({ "type": "REQUIRED" }),
                _ => json!({ "type": "DEFAULT_VALUE" }),
            };
            let variable = json!({
                "prompt_key": key,
                "name": name,
                "kind": kind,
                "default_value": default_value,
                "description": description,
                "sort_order": sort_order,
            });
            call_rpc(url, "prompt.variable.upsert.v1", json!({ "variable": variable })).await?;
            println!("{}", format!("✓ Variable {}.{} saved", key, name).green().bold());
        }

        PromptCommands::DeleteVar { key, name } => {
            let result = call_rpc(
                url,
                "prompt.variable.delete.v1",
                json!({ "prompt_key": key, "name": name }),
            )
            .await?;
            if result["deleted"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ Variable {}.{} deleted", key, name).green().bold());
            } else {
                println!("{}", format!("No variable {}.{}", key, name).yellow());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::Create(args) => {
            let job = call_rpc(url, "job.create.v1", create_params(args)?).await?;
            println!("{}", "✓ Job created".green().bold());
            println!();
            print_job(&job);
        }

        Commands::Get { job_id } => {
            let job = call_rpc(url, "job.get.v1", json!({ "job_id": job_id })).await?;
            print_job(&job);
        }

        Commands::List { limit } => {
            let result = call_rpc(url, "job.list.v1", json!({ "limit": limit })).await?;
            let rows: Vec<JobRow> = result["jobs"]
                .as_array()
                .into_iter()
                .flatten()
                .map(JobRow::from_value)
                .collect();
            if rows.is_empty() {
                println!("{}", "No jobs yet".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::Cancel { job_id } => {
            let result = call_rpc(url, "job.cancel.v1", json!({ "job_id": job_id })).await?;
            let status = result["status"].as_str().unwrap_or("-");
            println!("{}", format!("✓ Job {} → {}", job_id, status).green().bold());
        }

        Commands::Retry { job_id } => {
            let job = call_rpc(url, "job.retry.v1", json!({ "job_id": job_id })).await?;
            println!("{}", format!("✓ Job {} queued for retry", job_id).green().bold());
            print_job(&job);
        }

        Commands::Artifacts { job_id } => {
            let result = call_rpc(url, "job.artifacts.v1", json!({ "job_id": job_id })).await?;
            let rows: Vec<ArtifactRow> = result["artifacts"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|a| ArtifactRow {
                    path: a["path"].as_str().unwrap_or("-").to_string(),
                    kind: a["type"].as_str().unwrap_or("-").to_string(),
                    size: a["size"].as_u64().unwrap_or(0),
                })
                .collect();
            if rows.is_empty() {
                println!("{}", "No artifacts yet".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::ArtifactPath { job_id, path } => {
            let result = call_rpc(
                url,
                "job.artifact_path.v1",
                json!({ "job_id": job_id, "path": path }),
            )
            .await?;
            println!("{}", result["path"].as_str().unwrap_or("-"));
        }

        Commands::Prompt(command) => run_prompt_command(url, command).await?,
    }

    Ok(())
}
