use anyhow::Context;
use clap::{Parser, Subcommand};
use sage_agents::{AssistantConfig, CancelHandle, KnowledgeAssistant};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Ask questions about your own documents.
#[derive(Parser, Debug)]
#[command(name = "sage", author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a query through the pipeline
    Query {
        /// The question to answer
        text: String,
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
        /// Print only the final answer instead of every stage
        #[arg(long)]
        answer_only: bool,
    },
    /// Show index status
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Add a file or every supported file under a directory to the index
    Ingest {
        path: PathBuf,
        /// Document type recorded with every chunk
        #[arg(long)]
        doc_type: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct IngestFileOutput<'a> {
    path: &'a str,
    chunks: usize,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AssistantConfig::load(args.config.as_deref())?;
    let assistant = KnowledgeAssistant::from_config(&config).await?;

    match args.command {
        Commands::Query {
            text,
            format,
            answer_only,
        } => {
            let handle = CancelHandle::new();
            let signal = handle.signal();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Cancelling after the current stage...");
                    handle.cancel();
                }
            });

            let answer = assistant.run_query_with_cancel(&text, signal).await?;
            match (format, answer_only) {
                (OutputFormat::Json, _) => print_json(&answer)?,
                (OutputFormat::Text, true) => println!("{}", answer.final_answer),
                (OutputFormat::Text, false) => println!("{}", answer.response),
            }
        }
        Commands::Status { format } => {
            let status = assistant.status().await?;
            match format {
                OutputFormat::Json => print_json(&status)?,
                OutputFormat::Text => {
                    println!("Status: {}", status.status);
                    println!("Collection: {}", status.collection_name);
                    println!("Documents: {}", status.document_count);
                    println!("Index: {}", config.index.path.display());
                }
            }
        }
        Commands::Ingest {
            path,
            doc_type,
            format,
        } => {
            let doc_type = doc_type.as_deref();
            if path.is_dir() {
                let stats = assistant
                    .ingest_directory(&path, doc_type)
                    .await
                    .with_context(|| format!("Failed to ingest {}", path.display()))?;
                match format {
                    OutputFormat::Json => print_json(&stats)?,
                    OutputFormat::Text => println!(
                        "Processed {} files: {} succeeded, {} failed ({} chunks)",
                        stats.total, stats.succeeded, stats.failed, stats.chunks
                    ),
                }
            } else {
                let chunks = assistant.ingest_file(&path, doc_type).await?;
                match format {
                    OutputFormat::Json => print_json(&IngestFileOutput {
                        path: &path.to_string_lossy(),
                        chunks,
                    })?,
                    OutputFormat::Text => {
                        println!("Ingested {} ({} chunks)", path.display(), chunks)
                    }
                }
            }
        }
    }

    Ok(())
}
