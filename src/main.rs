use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tg_folder_uploader::{config, logging, topics, uploader};

#[derive(Parser, Debug)]
#[command(name = "tg-folder-uploader", version, about = "Upload folders of photos to Telegram forum topics")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// File that receives error-level log entries
    #[arg(long, default_value = "bot.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload every folder under `folder_path` (default)
    Upload,
    /// Read the bot's updates and save forum topic ids to the config file
    DiscoverTopics,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_file)
        .with_context(|| format!("Failed to open log file {}", cli.log_file.display()))?;

    let config = config::load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let client = uploader::TelegramClient::from_config(&config)
        .context("Failed to create Telegram client")?;

    match cli.command.unwrap_or(Command::Upload) {
        Command::Upload => {
            log::info!("Starting Telegram folder upload");
            uploader::run(&config, &client).await.with_context(|| {
                format!("Failed to read folder {}", config.folder_path.display())
            })?;
        }
        Command::DiscoverTopics => {
            let found = topics::discover_topics(&client, &cli.config)
                .await
                .context("Topic discovery failed")?;
            log::info!("Discovered {} topics", found.len());
        }
    }

    Ok(())
}
