use anyhow::Result;
use clap::{Parser, Subcommand};
use dev_setup_config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "dev-setup")]
#[command(about = "A tool for spinning up local microservices")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone, start, health-check and hook every service
    Init {
        /// Only these services plus their dependencies (empty means all)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Clone repositories but start no containers
        #[arg(long)]
        skip_docker: bool,

        /// Re-clone repositories that already exist
        #[arg(long)]
        clean: bool,

        /// Seconds to wait for each service to become healthy
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,

        /// Seconds between health probes
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },

    /// Validate configuration file and print the startup order
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    smol::block_on(async {
        match cli.command {
            Commands::Init {
                only,
                skip_docker,
                clean,
                timeout,
                interval,
            } => {
                let args = commands::init::InitArgs {
                    only,
                    skip_docker,
                    clean,
                    timeout: Duration::from_secs(timeout),
                    interval: Duration::from_secs(interval),
                };
                commands::init::run(&cli.config, args).await
            }
            Commands::Validate => commands::validate::run(&cli.config).await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_defaults() {
        let cli = Cli::try_parse_from(["dev-setup", "init"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("dev-setup.yaml"));
        assert!(!cli.verbose);
        match cli.command {
            Commands::Init {
                only,
                skip_docker,
                clean,
                timeout,
                interval,
            } => {
                assert!(only.is_empty());
                assert!(!skip_docker);
                assert!(!clean);
                assert_eq!(timeout, 60);
                assert_eq!(interval, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_init_flags() {
        let cli = Cli::try_parse_from([
            "dev-setup",
            "--config",
            "stack.yaml",
            "init",
            "--only",
            "api,web",
            "--only",
            "db",
            "--skip-docker",
            "--clean",
            "--timeout",
            "120",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("stack.yaml"));
        assert!(cli.verbose);
        match cli.command {
            Commands::Init {
                only,
                skip_docker,
                clean,
                timeout,
                ..
            } => {
                assert_eq!(only, vec!["api", "web", "db"]);
                assert!(skip_docker);
                assert!(clean);
                assert_eq!(timeout, 120);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cli::try_parse_from(["dev-setup", "init", "--interval", "0"]).is_err());
    }

    #[test]
    fn test_validate_takes_global_config() {
        let cli = Cli::try_parse_from(["dev-setup", "validate", "-c", "other.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate));
        assert_eq!(cli.config, PathBuf::from("other.yaml"));
    }
}
