mod batch;
mod catalog;
mod config;
mod cover_art;
mod file_rename;
mod lastfm;
mod normalize;
mod prompt;
mod tag_policy;
mod tags;
mod wizard;

use anyhow::Result;
use batch::{BatchDriver, FileQueue};
use clap::Parser;
use config::Config;
use lastfm::LastFmClient;
use prompt::TerminalPrompter;
use std::time::Duration;
use tag_policy::TagPolicy;
use tags::FileTagStore;

/// Tag a directory of music files one track at a time using Last.fm
#[derive(Debug, Parser)]
#[command(name = "track-tagger", version, about)]
struct Cli {
    /// Directory holding the audio files
    directory: String,

    /// Comma-separated tags to pre-select when offered
    #[arg(long, value_name = "TAGS")]
    allow: Option<String>,

    /// Comma-separated tags that are never written
    #[arg(long, value_name = "TAGS")]
    deny: Option<String>,

    /// Last.fm API key
    #[arg(long, env = "LASTFM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout for Last.fm calls
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Remember the key, tag lists and timeout for later runs
    #[arg(long)]
    save_config: bool,
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(allow) = &cli.allow {
        config.allowed_tags = normalize::parse_tag_list(allow);
    }
    if let Some(deny) = &cli.deny {
        config.denied_tags = normalize::parse_tag_list(deny);
    }
    if let Some(api_key) = &cli.api_key {
        config.api_key = api_key.trim().to_string();
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = config::load_config()?;
    apply_overrides(&mut config, &cli);

    let directory = config::validate_directory(&cli.directory)?;
    config.validate()?;

    if cli.save_config {
        let path = config::save_config(&config)?;
        log::info!("saved settings to {}", path.display());
    }

    let policy = TagPolicy::new(&config.allowed_tags, &config.denied_tags);
    log::info!(
        "{} tags pre-selected, {} denied",
        policy.auto_accept().len(),
        policy.auto_deny().len()
    );

    let queue = FileQueue::new(catalog::list_files(&directory)?);
    if queue.is_empty() {
        println!("No supported audio files in {}", directory.display());
        return Ok(());
    }

    let client = LastFmClient::new(
        &config.api_key,
        &config.api_base_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let prompter = TerminalPrompter::new()?;

    let mut driver = BatchDriver::new(client, FileTagStore, prompter);
    let summary = driver.run(queue, policy).await?;

    if !summary.learned_tags.is_empty() {
        log::info!("tags learned this run: {}", summary.learned_tags.join(", "));
    }
    Ok(())
}
