use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::common::{DEFAULT_ARCHIVE_NAME, DEFAULT_FRAME_EXTENSION, DEFAULT_MAX_FILES, DEFAULT_MAX_FRAME_BYTES};
use crate::compress::{CompressOptions, FailurePolicy};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub create: CreateArgs,

    /// Print a debug line per frame (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Compress every frame in a directory into one archive.
#[derive(ClapArgs, Clone, Debug)]
pub struct CreateArgs {
    /// Directory containing the input frames.
    #[arg(required = true)]
    pub input_dir: Option<PathBuf>,

    /// The path for the output archive file.
    #[arg(short, long, default_value = DEFAULT_ARCHIVE_NAME)]
    pub output: PathBuf,

    /// Number of worker threads. [0 = auto-detect based on CPU cores]
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Frame file extension to pick up, without the dot.
    #[arg(long, default_value = DEFAULT_FRAME_EXTENSION)]
    pub extension: String,

    /// `[ADVANCED]` Maximum number of frames per run.
    #[arg(long, default_value_t = DEFAULT_MAX_FILES)]
    pub max_files: usize,

    /// `[ADVANCED]` Largest frame size in bytes accepted by the single-pass codec.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: u64,

    /// Write the archive even if some frames fail, leaving the failed frames out.
    #[arg(long)]
    pub keep_going: bool,

    /// Re-read the archive after writing and check every record against its frame.
    #[arg(long)]
    pub verify: bool,
}

impl CreateArgs {
    /// Builds run options. `None` when no input directory was given.
    pub fn to_options(&self) -> Option<CompressOptions> {
        let input_dir = self.input_dir.clone()?;
        Some(CompressOptions {
            input_dir,
            output: self.output.clone(),
            threads: self.threads,
            extension: self.extension.clone(),
            max_files: self.max_files,
            max_frame_bytes: self.max_frame_bytes,
            policy: if self.keep_going { FailurePolicy::KeepGoing } else { FailurePolicy::FailFast },
            verify: self.verify,
        })
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List the records of an archive without extracting them.
    #[command(alias = "l")]
    List {
        /// The archive file to list.
        #[arg(required = true)]
        archive: PathBuf,

        /// Print one JSON object per record.
        #[arg(long)]
        json: bool,
    },

    /// Decompress every record of an archive into numbered frame files.
    #[command(alias = "x")]
    Extract {
        /// The archive file to extract.
        #[arg(required = true)]
        archive: PathBuf,

        /// The directory where frames will be written.
        #[arg(short, long)]
        output: PathBuf,

        /// Extension given to the extracted frames.
        #[arg(long, default_value = DEFAULT_FRAME_EXTENSION)]
        extension: String,
    },
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Args {
    Args::parse()
}
