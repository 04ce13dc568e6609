//! rigcheck CLI - compatibility analysis against the local user's profile
//!
//! The platform's HTTP gateway is the usual caller of this subsystem; the
//! CLI drives the same operations for a single locally-configured user.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use rigcheck::analyzer::CompatibilityAnalyzer;
use rigcheck::cache::AnalysisCache;
use rigcheck::client::{
    CatalogClient, OpenAiVerdictClient, UpstreamTokenManager,
    ai::{DEFAULT_AI_URL, DEFAULT_MODEL},
    catalog::{DEFAULT_METADATA_URL, DEFAULT_STOREFRONT_URL},
    token::DEFAULT_AUTH_URL,
};
use rigcheck::config::Config;
use rigcheck::error::{ConfigError, Error, Result};
use rigcheck::profile::StaticProfileStore;

#[derive(Parser)]
#[command(name = "rigcheck", version, about = "Hardware compatibility analysis for games")]
struct Cli {
    /// User identifier the analysis is keyed under
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// Path to the config file (default: ~/.rigcheck/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze compatibility for a game (may spend an AI call)
    Analyze {
        /// Catalog game identifier
        game_id: String,
    },
    /// Show cached-analysis status for a game without spending an AI call
    Status {
        /// Catalog game identifier
        game_id: String,
    },
    /// Manage the configured hardware profile
    #[command(subcommand)]
    Profile(ProfileCommands),
    /// Manage the analysis cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update the hardware profile and invalidate cached verdicts
    Set {
        #[arg(long)]
        cpu: Option<String>,
        #[arg(long)]
        gpu: Option<String>,
        #[arg(long)]
        ram: Option<String>,
        #[arg(long)]
        os: Option<String>,
    },
    /// Show the configured hardware profile
    Show,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache statistics
    Stats,
    /// Remove expired entries
    Purge,
    /// Remove all entries
    Clear,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        // Full diagnostics go to the log; the terminal gets the
        // client-safe message
        log::error!("{}", err);
        eprintln!("Error ({}): {}", err.code(), err.client_message());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { ref game_id } => analyze(&cli, game_id).await,
        Commands::Status { ref game_id } => status(&cli, game_id).await,
        Commands::Profile(ref cmd) => profile(&cli, cmd).await,
        Commands::Cache(ref cmd) => cache(&cli, cmd),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path.clone()),
        None => Config::load(),
    }
}

fn open_cache(config: &Config) -> Result<AnalysisCache> {
    let cache = match &config.cache_dir {
        Some(dir) => AnalysisCache::open_at(dir)?,
        None => AnalysisCache::open()?,
    };
    Ok(cache)
}

async fn build_analyzer(
    cli: &Cli,
    config: &Config,
) -> Result<CompatibilityAnalyzer<StaticProfileStore, CatalogClient, OpenAiVerdictClient>> {
    let (client_id, client_secret) = config.catalog_credentials()?;
    let ai_api_key = config.ai_api_key()?;

    let http = reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| rigcheck::error::UpstreamError::Network(e.to_string()))?;

    let tokens = Arc::new(UpstreamTokenManager::new(
        http.clone(),
        config
            .catalog
            .auth_url
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
        client_id.clone(),
        client_secret,
    ));

    let catalog = Arc::new(CatalogClient::new(
        http.clone(),
        config
            .catalog
            .metadata_url
            .clone()
            .unwrap_or_else(|| DEFAULT_METADATA_URL.to_string()),
        config
            .catalog
            .storefront_url
            .clone()
            .unwrap_or_else(|| DEFAULT_STOREFRONT_URL.to_string()),
        client_id,
        tokens,
    ));

    let ai = Arc::new(OpenAiVerdictClient::new(
        http,
        config
            .ai
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_AI_URL.to_string()),
        ai_api_key,
        config
            .ai
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
    ));

    let profiles = Arc::new(StaticProfileStore::new());
    profiles.set_profile(&cli.user, config.profile.clone()).await;

    Ok(CompatibilityAnalyzer::new(
        profiles,
        catalog,
        ai,
        open_cache(config)?,
    ))
}

async fn analyze(cli: &Cli, game_id: &str) -> Result<()> {
    let config = load_config(cli)?;
    let analyzer = build_analyzer(cli, &config).await?;

    let analysis = analyzer.evaluate(&cli.user, game_id).await?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

async fn status(cli: &Cli, game_id: &str) -> Result<()> {
    let config = load_config(cli)?;
    let analyzer = build_analyzer(cli, &config).await?;

    let status = analyzer.status(&cli.user, game_id).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn profile(cli: &Cli, cmd: &ProfileCommands) -> Result<()> {
    match cmd {
        ProfileCommands::Show => {
            let config = load_config(cli)?;
            println!("{}", serde_json::to_string_pretty(&config.profile)?);
            Ok(())
        }
        ProfileCommands::Set { cpu, gpu, ram, os } => {
            // Start from an empty config on first run
            let mut config = match load_config(cli) {
                Ok(config) => config,
                Err(Error::Config(ConfigError::NotFound)) => Config::default(),
                Err(e) => return Err(e),
            };

            if let Some(cpu) = cpu {
                config.profile.cpu = Some(cpu.clone());
            }
            if let Some(gpu) = gpu {
                config.profile.gpu = Some(gpu.clone());
            }
            if let Some(ram) = ram {
                config.profile.ram = Some(ram.clone());
            }
            if let Some(os) = os {
                config.profile.os = Some(os.clone());
            }

            match &cli.config {
                Some(path) => config.save_to(path.clone())?,
                None => config.save()?,
            }

            // Profile updates are the cache's sole bulk invalidation
            // trigger; a failure here is a warning, not a hard error
            match open_cache(&config).and_then(|c| {
                c.invalidate_for_user(&cli.user).map_err(Error::from)
            }) {
                Ok(removed) => {
                    println!("Profile updated; {} cached analyses invalidated", removed)
                }
                Err(e) => log::warn!("Profile updated but cache invalidation failed: {}", e),
            }
            Ok(())
        }
    }
}

fn cache(cli: &Cli, cmd: &CacheCommands) -> Result<()> {
    let config = load_config(cli)?;
    let cache = open_cache(&config)?;

    match cmd {
        CacheCommands::Stats => {
            let stats = cache.stats().map_err(Error::from)?;
            println!(
                "{} entries ({} valid, {} expired) across {} users",
                stats.total_entries, stats.valid_entries, stats.expired_entries, stats.users
            );
        }
        CacheCommands::Purge => {
            let purged = cache.purge_expired().map_err(Error::from)?;
            println!("Purged {} expired entries", purged);
        }
        CacheCommands::Clear => {
            let removed = cache.clear_all().map_err(Error::from)?;
            println!("Removed {} entries", removed);
        }
    }
    Ok(())
}
