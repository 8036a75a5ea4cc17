use sherlock::cli::{Cli, Commands, ConfigAction};
use sherlock::config::Config;
use sherlock::error::{Result, SherlockError};
use std::path::Path;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    let path = match cli.config.clone() {
        Some(path) => path,
        None => Config::default_path()?,
    };

    // Initialize logging before loading config so load warnings are visible
    init_logging(cli.verbose, &path);

    match cli.command {
        Commands::Config { action } => {
            cmd_config(&path, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, config_path: &Path) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("sherlock=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Best effort: the config file may not exist yet
            let directive = std::fs::read_to_string(config_path)
                .ok()
                .and_then(|content| toml::from_str::<Config>(&content).ok())
                .map(|config| config.logging.filter)
                .unwrap_or_else(|| "sherlock=info".to_string());
            EnvFilter::new(directive)
        })
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_config(path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Show { json } => {
            let config = load_config(path)?;

            if json {
                let out = serde_json::to_string_pretty(&config).map_err(|e| SherlockError::Json {
                    source: e,
                    context: "Failed to serialize config".to_string(),
                })?;
                println!("{}", out);
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        ConfigAction::Validate => {
            let config = Config::load(path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Split threshold: {}", config.detection.split_threshold);
            println!("  Common threshold: {}", config.scoring.common_threshold);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'sherlock config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides()?;
        return Ok(config);
    }

    Config::load(path)
}
