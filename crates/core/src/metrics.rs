//! Metrics collection and reporting for a batch run.
//!
//! Tracks:
//! - File counts by result (encoded, decoded, failed, cancelled)
//! - Digest mismatches after decode
//! - Bytes in/out, with encode traffic also kept separately for the
//!   compression ratio
//! - Timing
//!
//! # Thread Safety
//!
//! `Metrics` is NOT thread-safe. Workers report through the batch event
//! channel and a single consumer calls [`Metrics::record`].

use std::time::{Duration, Instant};

use crate::batch::{BatchEvent, ItemOutcome};

/// Aggregate metrics for a batch.
#[derive(Debug, Clone)]
pub struct Metrics {
    // === Timing ===
    /// When the batch started
    pub start_time: Instant,

    /// When the batch ended (set on completion)
    pub end_time: Option<Instant>,

    // === Files ===
    pub files_encoded: u64,
    pub files_decoded: u64,
    pub files_failed: u64,
    pub files_cancelled: u64,

    /// Decoded files whose digest did not match the header
    pub verify_failures: u64,

    // === Bytes ===
    /// Bytes read by completed items
    pub input_bytes: u64,

    /// Bytes written by completed items
    pub output_bytes: u64,

    /// Original bytes of encoded files
    pub encoded_input_bytes: u64,

    /// Encoded bytes produced from them
    pub encoded_output_bytes: u64,
}

impl Metrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            files_encoded: 0,
            files_decoded: 0,
            files_failed: 0,
            files_cancelled: 0,
            verify_failures: 0,
            input_bytes: 0,
            output_bytes: 0,
            encoded_input_bytes: 0,
            encoded_output_bytes: 0,
        }
    }

    /// Fold one batch event into the totals. `Started` events are ignored.
    pub fn record(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { .. } => {}
            BatchEvent::Finished { outcome, .. } => match *outcome {
                ItemOutcome::Encoded {
                    input_bytes,
                    output_bytes,
                    ..
                } => {
                    self.files_encoded += 1;
                    self.input_bytes += input_bytes;
                    self.output_bytes += output_bytes;
                    self.encoded_input_bytes += input_bytes;
                    self.encoded_output_bytes += output_bytes;
                }
                ItemOutcome::Decoded {
                    input_bytes,
                    output_bytes,
                    verified,
                } => {
                    self.files_decoded += 1;
                    self.input_bytes += input_bytes;
                    self.output_bytes += output_bytes;
                    if !verified {
                        self.verify_failures += 1;
                    }
                }
            },
            BatchEvent::Failed { .. } => self.files_failed += 1,
            BatchEvent::Cancelled { .. } => self.files_cancelled += 1,
        }
    }

    /// Mark the batch as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Compute compression ratio (encoded / original) over encoded files.
    ///
    /// Returns 0.0 if nothing was encoded.
    pub fn compression_ratio(&self) -> f64 {
        if self.encoded_input_bytes == 0 {
            0.0
        } else {
            self.encoded_output_bytes as f64 / self.encoded_input_bytes as f64
        }
    }

    /// Compute throughput in input bytes/second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.input_bytes as f64 / duration_secs
        }
    }

    /// Files that completed, failed or were cancelled.
    pub fn files_total(&self) -> u64 {
        self.files_encoded + self.files_decoded + self.files_failed + self.files_cancelled
    }

    /// Whether every file completed and every decode verified.
    pub fn is_success(&self) -> bool {
        self.files_failed == 0 && self.files_cancelled == 0 && self.verify_failures == 0
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Batch Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!();

        println!("=== Files ===");
        println!("Encoded:   {}", self.files_encoded);
        println!("Decoded:   {}", self.files_decoded);
        println!("Failed:    {}", self.files_failed);
        println!("Cancelled: {}", self.files_cancelled);
        println!("Digest mismatches: {}", self.verify_failures);
        println!();

        println!("=== Bytes ===");
        println!("Input:  {} bytes ({:.2} MiB)", self.input_bytes, self.input_bytes as f64 / 1024.0 / 1024.0);
        println!("Output: {} bytes ({:.2} MiB)", self.output_bytes, self.output_bytes as f64 / 1024.0 / 1024.0);
        if self.files_encoded > 0 {
            println!("Compression ratio: {:.1}%", self.compression_ratio() * 100.0);
        }
        println!("Throughput: {:.2} MB/s", self.throughput_bps() / 1_000_000.0);
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.is_success() {
            println!("✓ Batch completed successfully");
            println!("  {} files in {} ms", self.files_total(), self.duration().as_millis());
        } else if self.verify_failures > 0 {
            println!("✗ Batch failed: {} decoded files did not verify", self.verify_failures);
        } else if self.files_failed > 0 {
            println!("✗ Batch failed: {} files failed", self.files_failed);
        } else {
            println!("✗ Batch cancelled: {} files not processed", self.files_cancelled);
        }
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             files_encoded={}\n\
             files_decoded={}\n\
             files_failed={}\n\
             files_cancelled={}\n\
             verify_failures={}\n\
             input_bytes={}\n\
             output_bytes={}\n\
             compression_ratio={:.4}\n",
            self.duration().as_millis(),
            self.files_encoded,
            self.files_decoded,
            self.files_failed,
            self.files_cancelled,
            self.verify_failures,
            self.input_bytes,
            self.output_bytes,
            self.compression_ratio(),
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
