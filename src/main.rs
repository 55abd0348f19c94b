//! mquery: indexed remote query engine for large collections of methylomes.
//!
//! Usage: mquery <COMMAND> [OPTIONS]

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mquery::commands::{run_check, run_config, run_server};
use mquery::config::ClientConfig;
use mquery::format::OutputFormat;

#[derive(Parser)]
#[command(name = "mquery")]
#[command(author = "Manish Kumar Bobbili")]
#[command(version)]
#[command(about = "mquery: indexed remote query engine for large collections of methylomes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a client configuration TOML file, creating its parent directory
    Config {
        /// Path to write the config file to
        #[arg(short = 'c', long = "config", value_name = "PATH")]
        config_path: PathBuf,

        /// Server hostname
        #[arg(short = 's', long, default_value = "127.0.0.1")]
        hostname: String,

        /// Server port
        #[arg(short = 'p', long, default_value_t = 6062)]
        port: u16,

        /// CpG index directory
        #[arg(short = 'x', long = "index-dir")]
        index_dir: PathBuf,

        /// Methylome directory
        #[arg(short = 'd', long = "methylome-dir")]
        methylome_dir: PathBuf,

        /// Log level
        #[arg(short = 'v', long = "log-level", default_value = "info")]
        log_level: String,

        /// Default output format: counts, bedgraph, dataframe, dataframe_scores
        #[arg(short = 'o', long = "format", default_value = "counts")]
        output_format: OutputFormat,
    },

    /// Validate a set of methylome names against a local CpG index;
    /// exits 0 if all names resolve and hashes match, nonzero otherwise
    Check {
        /// CpG index directory
        #[arg(short = 'x', long = "index-dir")]
        index_dir: PathBuf,

        /// Methylome directory
        #[arg(short = 'd', long = "methylome-dir")]
        methylome_dir: PathBuf,

        /// Methylome names to validate
        #[arg(short = 'm', long = "methylome", required = true, num_args = 1..)]
        names: Vec<String>,
    },

    /// Bind a hostname/port and serve remote methylome queries; fails fast
    /// on a missing index or methylome directory
    Server {
        /// Client config TOML to read defaults from (overridden by other flags)
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,

        /// Hostname to bind
        #[arg(short = 's', long)]
        hostname: Option<String>,

        /// Port to bind
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// CpG index directory
        #[arg(short = 'x', long = "index-dir")]
        index_dir: Option<PathBuf>,

        /// Methylome directory
        #[arg(short = 'd', long = "methylome-dir")]
        methylome_dir: Option<PathBuf>,

        /// Log level
        #[arg(short = 'v', long = "log-level")]
        log_level: Option<String>,

        /// Maximum number of resident methylomes
        #[arg(long, default_value_t = 128)]
        capacity: usize,

        /// Per-request read timeout, in seconds
        #[arg(long = "read-timeout", default_value_t = 30)]
        read_timeout_secs: u64,

        /// Per-request write timeout, in seconds
        #[arg(long = "write-timeout", default_value_t = 30)]
        write_timeout_secs: u64,
    },
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config {
            config_path,
            hostname,
            port,
            index_dir,
            methylome_dir,
            log_level,
            output_format,
        } => {
            init_logging(&log_level);
            if let Err(e) = run_config(
                &config_path,
                hostname,
                port,
                index_dir,
                methylome_dir,
                log_level,
                output_format,
            ) {
                tracing::error!(error = %e, "config command failed");
                process::exit(1);
            }
        }

        Commands::Check {
            index_dir,
            methylome_dir,
            names,
        } => {
            init_logging("info");
            if let Err(e) = run_check(&index_dir, &methylome_dir, &names) {
                tracing::error!(error = %e, "check command failed");
                process::exit(1);
            }
        }

        Commands::Server {
            config,
            hostname,
            port,
            index_dir,
            methylome_dir,
            log_level,
            capacity,
            read_timeout_secs,
            write_timeout_secs,
        } => {
            let loaded_config = config.as_deref().map(|p| ClientConfig::read(p)).transpose();
            let loaded_config = match loaded_config {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("failed to read config: {e}");
                    process::exit(1);
                }
            };

            let effective_log_level = log_level
                .or_else(|| loaded_config.as_ref().map(|c| c.log_level.clone()))
                .unwrap_or_else(|| "info".to_string());
            init_logging(&effective_log_level);
            mquery::runtime_config::set_verbose_request_log(matches!(
                effective_log_level.as_str(),
                "debug" | "trace"
            ));

            let effective_hostname = hostname
                .or_else(|| loaded_config.as_ref().map(|c| c.hostname.clone()))
                .unwrap_or_else(|| "127.0.0.1".to_string());
            let effective_port = port
                .or_else(|| loaded_config.as_ref().map(|c| c.port))
                .unwrap_or(6062);
            let effective_index_dir = index_dir
                .or_else(|| loaded_config.as_ref().map(|c| c.index_dir.clone()));
            let effective_methylome_dir = methylome_dir
                .or_else(|| loaded_config.as_ref().map(|c| c.methylome_dir.clone()));

            let (Some(effective_index_dir), Some(effective_methylome_dir)) =
                (effective_index_dir, effective_methylome_dir)
            else {
                tracing::error!(
                    "server requires an index directory and a methylome directory, from -x/-d or a -c config file"
                );
                process::exit(1);
            };

            if let Err(e) = run_server(
                effective_hostname,
                effective_port,
                &effective_index_dir,
                &effective_methylome_dir,
                capacity,
                Duration::from_secs(read_timeout_secs),
                Duration::from_secs(write_timeout_secs),
            ) {
                tracing::error!(error = %e, "server exited with an error");
                process::exit(1);
            }
        }
    }
}
