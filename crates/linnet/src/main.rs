// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linnet - a queued, rate-limited chat assistant.
//!
//! This is the binary entry point.

mod console;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use linnet_config::LinnetConfig;

/// Linnet - a queued, rate-limited chat assistant.
#[derive(Parser, Debug)]
#[command(name = "linnet", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process chat events from stdin and write replies to stdout.
    Serve,
    /// Print the validated effective configuration.
    Config,
}

fn load_config(path: Option<&std::path::Path>) -> LinnetConfig {
    let loaded = match path {
        Some(path) => linnet_config::load_and_validate_path(path),
        None => linnet_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            linnet_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("linnet: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("linnet: cannot render configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("linnet: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["linnet", "serve", "--config", "/tmp/linnet.toml"]);
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/linnet.toml")));
    }

    #[test]
    fn default_config_renders_as_toml() {
        let config = linnet_config::load_and_validate_str("").expect("defaults are valid");
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[queue]"));
        assert!(rendered.contains("max_size = 10"));
    }
}
