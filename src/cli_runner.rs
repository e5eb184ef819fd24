//! Command dispatch for the `vzip` binary.

use crate::cli::{self, Commands};
use crate::compress::ZlibCodec;
use crate::{extract, workers, ArchiverError};

use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Public entry for running CLI logic.
///
/// Returns `FAILURE` without an error when a keep-going run wrote an incomplete archive.
pub fn run_cli_app() -> Result<ExitCode, ArchiverError> {
    let args = cli::run();
    init_logging(args.verbose);
    let codec = ZlibCodec::default();

    match &args.command {
        Some(Commands::List { archive, json }) => {
            let entries = extract::list_records(archive, &codec)?;
            if *json {
                for entry in &entries {
                    println!("{}", serde_json::to_string(entry)?);
                }
            } else {
                println!("Archive '{}' ({} records):", archive.display(), entries.len());
                for e in &entries {
                    println!("- #{:<6} {:>10} -> {:>10} bytes", e.index, e.compressed_len, e.decompressed_len);
                }
            }
        }
        Some(Commands::Extract { archive, output, extension }) => {
            let written = extract::extract_records(archive, output, extension, &codec)?;
            println!("Extracted {} frames to '{}'", written.len(), output.display());
        }
        None => {
            let options = args
                .create
                .to_options()
                .ok_or_else(|| ArchiverError::InvalidConfig("missing input directory".into()))?;

            let start = Instant::now();
            let report = workers::run_parallel_compression(&options, &codec)?;

            for failure in &report.failures {
                eprintln!("Failed: {failure}");
            }
            println!("{}", report.summary_line());
            if report.verified {
                println!("Verified {} records", report.records_written);
            }
            println!("Time: {:.2} seconds", start.elapsed().as_secs_f64());

            if !report.is_complete() {
                eprintln!(
                    "Archive '{}' is missing {} of {} frames",
                    report.archive.display(),
                    report.failures.len(),
                    report.frames_found
                );
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "vzip=debug" } else { "vzip=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
