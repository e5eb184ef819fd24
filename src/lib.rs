//! # vzip Core Library
//!
//! This crate compresses a directory of same-format image frames into a single `.vzip`
//! archive using a fixed pool of worker threads. The archive is byte-for-byte identical
//! to what a single-threaded run produces.
//!
//! It is designed to be used by the `vzip` command-line application, but its public API
//! can also be used to create, list, extract and verify archives programmatically.
//!
//! ## Key Modules
//!
//! - [`compress`]: Frame discovery, the [`compress::Codec`] adapter and per-frame compression.
//! - [`workers`]: Job table, work distributor and worker pool.
//! - [`archive`]: The record format, its writer and its sequential reader.
//! - [`extract`]: Listing, extraction and verification of existing archives.
//! - [`report`]: Run summary and compression rate.
//!
//! ## Examples
//!
//! ```no_run
//! use vzip::compress::{CompressOptions, ZlibCodec};
//!
//! let options = CompressOptions::new("frames", "video.vzip");
//! let report = vzip::workers::run_parallel_compression(&options, &ZlibCodec::default()).unwrap();
//! println!("{}", report.summary_line());
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod compress;
pub mod error;
pub use error::ArchiverError;
pub mod extract;
pub mod report;
pub mod workers;
