//! Command line and resolved configuration for the huffpack binary.
//!
//! Every setting has a default, and the resolved values can be printed so a
//! run can be repeated exactly.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Whole-file Huffman compression with SHA-256 verification.
#[derive(Debug, Parser)]
#[command(name = "huffpack", version)]
pub struct Cli {
    /// Log output format. Logs go to stderr; RUST_LOG overrides the filter.
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Print the resolved configuration before running.
    #[arg(long, global = true)]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encode a file (default destination: SRC.huff).
    Encode {
        source: PathBuf,
        destination: Option<PathBuf>,
    },

    /// Decode a file and verify it against its recorded digest
    /// (default destination: SRC without .huff).
    Decode {
        source: PathBuf,
        destination: Option<PathBuf>,
    },

    /// Check a file against a hex SHA-256 digest.
    Verify {
        file: PathBuf,
        #[arg(value_name = "SHA256_HEX")]
        digest: String,
    },

    /// Show the digest and code table of an encoded file.
    Inspect { encoded: PathBuf },

    /// Encode or decode many files on a worker pool. Directories are walked
    /// recursively; .huff files are decoded, everything else is encoded.
    Batch {
        /// Worker threads (default: available parallelism)
        #[arg(long, env = "HUFFPACK_WORKERS")]
        workers: Option<NonZeroUsize>,

        /// Replace destinations that already exist instead of skipping them.
        #[arg(long)]
        overwrite: bool,

        /// Don't print the metrics summary.
        #[arg(long)]
        no_metrics: bool,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Write seeded sample data with mixed compressibility.
    Sample {
        #[arg(long)]
        out: PathBuf,

        /// Size in bytes
        #[arg(long, default_value_t = 1024 * 1024)]
        size: usize,

        /// Random seed (default: time-based)
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Settings resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Worker threads for batches
    pub workers: usize,

    /// Whether batches replace existing destinations
    pub overwrite: bool,

    pub log_format: LogFormat,

    /// Whether to print the batch metrics summary
    pub print_metrics: bool,

    /// Seed for sample generation
    pub seed: u64,
}

impl Config {
    /// Resolve defaults for everything the command line left open.
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Config {
            workers: default_workers(),
            overwrite: false,
            log_format: cli.log_format,
            print_metrics: true,
            seed: time_seed(),
        };

        match &cli.command {
            Command::Batch {
                workers,
                overwrite,
                no_metrics,
                ..
            } => {
                if let Some(workers) = workers {
                    config.workers = workers.get();
                }
                config.overwrite = *overwrite;
                config.print_metrics = !no_metrics;
            }
            Command::Sample {
                seed: Some(seed), ..
            } => config.seed = *seed,
            _ => {}
        }

        config
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Workers: {}", self.workers);
        println!("Overwrite: {}", self.overwrite);
        println!("Log format: {:?}", self.log_format);
        println!("Print metrics: {}", self.print_metrics);
        println!("Seed: {}", self.seed);
        println!();
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

fn time_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |t| t.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("huffpack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_encode_args() {
        let cli = parse(&["encode", "a.txt"]);
        assert!(matches!(
            cli.command,
            Command::Encode { ref source, destination: None } if source == &PathBuf::from("a.txt")
        ));
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_batch_config() {
        let cli = parse(&["--log-format", "json", "batch", "--workers", "3", "--overwrite", "dir"]);
        let config = Config::from_cli(&cli);

        assert_eq!(config.workers, 3);
        assert!(config.overwrite);
        assert!(config.print_metrics);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_cli(&parse(&["inspect", "x.huff"]));
        assert!(config.workers >= 1);
        assert!(!config.overwrite);
    }

    #[test]
    fn test_sample_seed() {
        let config = Config::from_cli(&parse(&["sample", "--out", "s.bin", "--seed", "42"]));
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_batch_requires_paths() {
        assert!(Cli::try_parse_from(["huffpack", "batch"]).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(Cli::try_parse_from(["huffpack", "batch", "--workers", "0", "dir"]).is_err());
    }
}
