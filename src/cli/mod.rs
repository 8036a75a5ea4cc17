//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sherlock",
    version,
    author = "neur0map",
    about = "Source code similarity detection engine",
    long_about = "Sherlock runs similarity detectors over a corpus of submitted source files in \
                  parallel and scores the matches it finds, filtering out matches so common across \
                  the corpus that they carry no signal."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/sherlock/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Load and validate the configuration file
    Validate,

    /// Print the configuration file path in use
    Path,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["sherlock", "-v", "config", "show", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show { json: true }
            }
        ));
    }

    #[test]
    fn test_parse_global_config_path() {
        let cli =
            Cli::try_parse_from(["sherlock", "config", "init", "--force", "-c", "/tmp/s.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }
}
