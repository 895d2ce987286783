use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use avatar_chat::config::Config;
use avatar_chat::diagnostic::{self, DiagnosticService};
use avatar_chat::llm::StreamingChatClient;

#[derive(Parser)]
#[command(name = "avatar-chat", version, about = "Digital-human chat demo console")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = "avatar-chat.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive streaming chat against the configured model.
    Chat,
    /// Run the connection self-check and print recommendations.
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Chat => run_chat(config).await,
        Command::Doctor => run_doctor(config).await,
    }
}

async fn run_chat(config: Config) -> anyhow::Result<()> {
    if config.llm.model.is_empty() {
        anyhow::bail!("no LLM model configured; set llm.model in the config file");
    }

    let mut client = StreamingChatClient::new(config.llm);
    println!("model endpoint: {}", client.base_url());
    println!("type a message, /history, /clear, or /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                client.clear_history();
                println!("history cleared");
                continue;
            }
            "/history" => {
                for message in client.history() {
                    println!("{:?}: {}", message.role, message.content);
                }
                continue;
            }
            _ => {}
        }

        let result = client
            .send_stream(line, |text, is_final| {
                if is_final {
                    println!();
                } else {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
            })
            .await;

        if let Err(e) = result {
            eprintln!("error: {e}");
        }
    }

    Ok(())
}

async fn run_doctor(config: Config) -> anyhow::Result<()> {
    let service = DiagnosticService::new();
    // No renderer SDK can be present in a terminal session.
    let results = service.diagnose(&config, false).await;

    for finding in &results {
        println!(
            "[{:>5}] {}: {}",
            finding.status.to_string(),
            finding.category,
            finding.message
        );
        if let Some(details) = &finding.details {
            println!("        {details}");
        }
    }

    println!();
    for line in diagnostic::recommendations(&results) {
        println!("{line}");
    }

    Ok(())
}
