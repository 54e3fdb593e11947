use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use max_broadcast::commands::{self, BroadcastForm};
use max_broadcast::config::{self, Config};
use max_broadcast::messenger::{MaxClient, ProgressTracker};
use max_broadcast::recipients;

#[derive(Parser, Debug)]
#[command(name = "max-broadcast", version, about = "Send one message to many MAX users")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a message to every id in a list
    Send(SendArgs),
    /// Inspect or reset the stored settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Bot access token (prompted for when missing)
    #[arg(short, long, env = "MAX_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Comma separated user ids
    #[arg(long, conflicts_with = "ids_file")]
    ids: Option<String>,

    /// .txt (one id per line) or .csv (first column) file with user ids
    #[arg(long)]
    ids_file: Option<PathBuf>,

    /// Message text (prompted for when missing)
    #[arg(short, long, conflicts_with = "message_file")]
    message: Option<String>,

    /// Read the message text from a file
    #[arg(long)]
    message_file: Option<PathBuf>,

    /// File to upload and attach to every message; repeatable
    #[arg(short = 'a', long = "attach")]
    attachments: Vec<String>,

    /// Override the API base URL for this run
    #[arg(long)]
    api_base: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the current settings
    Show,
    /// Print where the settings file lives
    Path,
    /// Restore default settings, keeping a backup
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {}", e);
        Config::default()
    });

    env_logger::Builder::new()
        .filter_level(config.log_filter())
        .parse_default_env()
        .init();

    log::info!("Starting MAX Broadcast v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Send(args) => send(args, config).await,
        Command::Config(command) => run_config_command(command, &config),
    }
}

async fn send(args: SendArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(api_base) = args.api_base {
        config.api_base = api_base;
        config::validate_config(&config)?;
    }

    let token = match args.token {
        Some(token) => token,
        None => prompt("Access Token: ")?,
    };

    let recipients_text = if let Some(path) = &args.ids_file {
        let loaded = commands::load_recipients(path)?;
        println!("{}", loaded.summary);
        recipients::join_inline(&loaded.ids)
    } else if let Some(ids) = args.ids {
        ids
    } else {
        prompt("User IDs (comma separated): ")?
    };

    let message = if let Some(path) = &args.message_file {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read message from {}", path.display()))?
    } else if let Some(message) = args.message {
        message
    } else {
        prompt("Message text: ")?
    };

    let client = Arc::new(MaxClient::from_config(&config)?);

    let form = BroadcastForm {
        token,
        recipients_text,
        message,
        attachments: Vec::new(),
    };

    let prepared = commands::prepare_broadcast(&client, form, &args.attachments, &config).await?;
    if let Some(report) = &prepared.upload_report {
        println!("{}", commands::format_upload_report(report));
        for failure in &report.failed {
            eprintln!("  {}: {}", failure.path, failure.error);
        }
    }

    let mut handle = commands::start_broadcast(client, prepared.request)?;
    let tracker = ProgressTracker::new();

    while let Some(progress) = handle.next_progress().await {
        let eta = tracker
            .estimate_remaining(&progress)
            .map(|d| format!(", ETA {}s", d.as_secs()))
            .unwrap_or_default();
        print!(
            "\r{} of {} (delivered {}, failed {}{})",
            progress.index, progress.total, progress.delivered, progress.failed, eta
        );
        io::stdout().flush()?;
    }
    println!();

    let summary = handle.wait().await?;
    println!("{}", commands::format_summary(&summary));
    for (recipient, reason) in summary.failures() {
        eprintln!("  {}: {}", recipient, reason);
    }
    println!("Done ✅");

    Ok(())
}

fn run_config_command(command: ConfigCommand, config: &Config) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommand::Path => {
            println!("{}", config::get_config_path()?.display());
        }
        ConfigCommand::Reset => {
            config::reset_config()?;
            println!("Configuration reset to defaults");
        }
    }
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}
