//! huffpack: compress, restore and check files with Huffman coding.

mod config;
mod detail;
mod input_gen;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use huffpack_core::batch::{self, BatchEvent, BatchRunner, ItemOutcome, Operation};
use huffpack_core::metrics::Metrics;
use huffpack_core::{Error, Result};
use tracing::{error, info, warn};

use crate::config::{Cli, Command, Config, LogFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::setup_logging(logging::DEFAULT_DIRECTIVES, cli.log_format == LogFormat::Pretty);

    let config = Config::from_cli(&cli);
    if cli.print_config {
        config.print();
    }

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> Result<ExitCode> {
    match command {
        Command::Encode {
            source,
            destination,
        } => {
            let destination = destination.unwrap_or_else(|| batch::encoded_path(&source));
            let summary = huffpack_core::encode_file(&source, &destination)?;
            info!(
                input_bytes = summary.input_bytes,
                output_bytes = summary.output_bytes,
                "encoded"
            );
            println!(
                "{} -> {}: {} -> {} bytes ({}%)",
                source.display(),
                destination.display(),
                summary.input_bytes,
                summary.output_bytes,
                summary.ratio_percent()
            );
            println!("SHA256: {}", hex::encode(summary.digest));
            Ok(ExitCode::SUCCESS)
        }

        Command::Decode {
            source,
            destination,
        } => {
            let destination = match destination {
                Some(destination) => destination,
                None => batch::decoded_path(&source).ok_or_else(|| {
                    Error::Config(format!(
                        "{} has no .{} extension; give a destination",
                        source.display(),
                        batch::ENCODED_EXTENSION
                    ))
                })?,
            };
            let digest = huffpack_core::decode_file(&source, &destination)?;
            let verified = huffpack_core::verify_file(&destination, &digest)?;
            println!("{} -> {}", source.display(), destination.display());
            report_verification(&destination, verified)
        }

        Command::Verify { file, digest } => {
            let digest = hex::decode(digest.trim())
                .map_err(|e| Error::Config(format!("invalid hex digest: {e}")))?;
            let verified = huffpack_core::verify_file(&file, &digest)?;
            report_verification(&file, verified)
        }

        Command::Inspect { encoded } => {
            let detail = huffpack_core::inspect_file(&encoded)?;
            print!("{}", detail::render(&encoded, &detail));
            Ok(ExitCode::SUCCESS)
        }

        Command::Batch { paths, .. } => run_batch(&paths, config),

        Command::Sample { out, size, .. } => {
            input_gen::write_sample_file(&out, config.seed, size)?;
            info!(path = %out.display(), size, seed = config.seed, "wrote sample data");
            println!("Wrote {} bytes to {} (seed {})", size, out.display(), config.seed);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report_verification(path: &Path, verified: bool) -> Result<ExitCode> {
    if verified {
        println!("{}: OK", path.display());
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(path = %path.display(), "digest mismatch");
        println!("{}: MISMATCH", path.display());
        Ok(ExitCode::FAILURE)
    }
}

fn run_batch(paths: &[PathBuf], config: &Config) -> Result<ExitCode> {
    let items = batch::plan(paths, config.overwrite)?;
    if items.is_empty() {
        println!("Nothing to do");
        return Ok(ExitCode::SUCCESS);
    }

    let runner = BatchRunner::new(config.workers)?;
    let token = runner.cancellation_token();
    if let Err(e) = ctrlc::set_handler(move || {
        info!(signal = "Ctrl+C", "received termination signal, cancelling remaining items");
        token.cancel();
    }) {
        warn!(error = %e, "could not install Ctrl+C handler");
    }

    let mut metrics = Metrics::new();

    for event in runner.submit(items) {
        print_event(&event);
        metrics.record(&event);
    }
    metrics.complete();

    if config.print_metrics {
        metrics.print_summary();
    }
    metrics.print_result();

    Ok(if metrics.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_event(event: &BatchEvent) {
    let item = event.item();
    let verb = match item.operation {
        Operation::Encode => "encode",
        Operation::Decode => "decode",
    };

    match event {
        BatchEvent::Started { .. } => {}
        BatchEvent::Finished { outcome, .. } => match outcome {
            ItemOutcome::Encoded {
                input_bytes,
                output_bytes,
                ratio_percent,
            } => println!(
                "[{}] Encoded {} -> {} ({} -> {} bytes, {}%)",
                event.index(),
                item.source.display(),
                item.destination.display(),
                input_bytes,
                output_bytes,
                ratio_percent
            ),
            ItemOutcome::Decoded { verified, .. } => println!(
                "[{}] Decoded {} -> {} ({})",
                event.index(),
                item.source.display(),
                item.destination.display(),
                if *verified { "verified" } else { "DIGEST MISMATCH" }
            ),
        },
        BatchEvent::Failed { error, .. } => println!(
            "[{}] Failed to {} {}: {}",
            event.index(),
            verb,
            item.source.display(),
            error
        ),
        BatchEvent::Cancelled { .. } => {
            println!("[{}] Cancelled {}", event.index(), item.source.display())
        }
    }
}
