//! Run configuration from environment variables

use std::env;
use std::path::PathBuf;

/// Records read per chunk when streaming a sales file.
pub const DEFAULT_CHUNK_SIZE: usize = 500_000;

/// Customer id tracked as its own segment in the MX report.
pub const DEFAULT_SEGMENT_CUSTOMER: i64 = 231013;

/// Configuration for one validation run
///
/// Loaded from environment variables with sensible defaults; CLI flags
/// override individual fields afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Folder holding the `Part1`..`Part4` sub-folders
    pub input_dir: PathBuf,

    /// Folder the workbooks are written to
    pub output_dir: PathBuf,

    /// Records per chunk
    pub chunk_size: usize,

    /// Customer id of the MX segment
    pub segment_customer: i64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("Input"),
            output_dir: PathBuf::from("Output"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            segment_customer: DEFAULT_SEGMENT_CUSTOMER,
        }
    }
}

impl RunConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SALES_INPUT_DIR` (default: Input)
    /// - `SALES_OUTPUT_DIR` (default: Output)
    /// - `SALES_CHUNK_SIZE` (default: 500000)
    /// - `SALES_SEGMENT_CUSTOMER` (default: 231013)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            input_dir: lookup("SALES_INPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.input_dir),

            output_dir: lookup("SALES_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),

            chunk_size: lookup("SALES_CHUNK_SIZE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.chunk_size),

            segment_customer: lookup("SALES_SEGMENT_CUSTOMER")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.segment_customer),
        }
    }

    /// Chunk size actually used by the reader; never zero.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}
