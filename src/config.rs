//! Configuration for Slice Streamer.
//!
//! This module provides:
//! - Engine tuning (`EngineConfig`) with validated builder overrides
//! - Command-line arguments via clap, with a subcommand per tool
//! - Environment variable overrides with the `SLICE_` prefix
//!
//! # Example
//!
//! ```ignore
//! use slice_streamer::config::{Cli, Command};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::Inspect(config) => println!("inspecting {}", config.file.display()),
//!     Command::Bench(config) => println!("sweeping {} steps", config.steps),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `SLICE_CACHE_CAPACITY` - Slices kept per loaded volume (default: 20)
//! - `SLICE_PREFETCH_RADIUS` - Neighbors fetched per side of the cursor (default: 2)
//! - `SLICE_BENCH_AXIS` - Axis for the bench sweep (default: depth)
//! - `SLICE_BENCH_STEPS` - Cursor steps simulated by bench (default: 100)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::slice::{Axis, DEFAULT_SLICE_CACHE_CAPACITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default number of neighbors prefetched on each side of the cursor.
pub const DEFAULT_PREFETCH_RADIUS: usize = 2;

/// Default number of cursor steps simulated by the bench command.
pub const DEFAULT_BENCH_STEPS: usize = 100;

/// Depth above which the progressive sweep uses its largest batch.
const LARGE_VOLUME_DEPTH: usize = 1000;

/// Depth above which the progressive sweep uses its medium batch.
const MEDIUM_VOLUME_DEPTH: usize = 500;

const LARGE_BATCH: usize = 300;
const MEDIUM_BATCH: usize = 200;
const SMALL_BATCH: usize = 100;

/// Batch size for the progressive first sweep, tiered by volume depth.
///
/// Deeper volumes get larger batches so the sweep finishes in a bounded
/// number of rounds, while shallow ones avoid holding large decoded
/// runs in memory at once.
pub fn progressive_chunk_size(depth: usize) -> usize {
    if depth > LARGE_VOLUME_DEPTH {
        LARGE_BATCH
    } else if depth > MEDIUM_VOLUME_DEPTH {
        MEDIUM_BATCH
    } else {
        SMALL_BATCH
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Tuning knobs for a [`VolumeEngine`](crate::engine::VolumeEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum slices kept per loaded volume.
    pub cache_capacity: usize,

    /// Neighbors fetched on each side of the cursor position.
    pub prefetch_radius: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_prefetch_radius(mut self, prefetch_radius: usize) -> Self {
        self.prefetch_radius = prefetch_radius;
        self
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }
        if self.prefetch_radius == 0 {
            return Err("prefetch_radius must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_SLICE_CACHE_CAPACITY,
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
        }
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Slice Streamer - a slice cache and prefetch engine for volumetric data.
///
/// Works against single-file volume containers holding chunked,
/// optionally gzip-compressed 3D datasets.
#[derive(Parser, Debug)]
#[command(name = "slice-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect a volume container: datasets, shapes, chunk layout.
    Inspect(InspectConfig),

    /// Simulate a navigation sweep and report cache behavior.
    Bench(BenchConfig),
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectConfig {
    /// Path to the volume container file.
    pub file: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Arguments for the `bench` subcommand.
#[derive(Args, Debug)]
pub struct BenchConfig {
    /// Path to the volume container file.
    pub file: PathBuf,

    /// Axis to sweep along: depth, height, or width.
    #[arg(long, default_value = "depth", env = "SLICE_BENCH_AXIS")]
    pub axis: String,

    /// Number of cursor steps to simulate.
    #[arg(long, default_value_t = DEFAULT_BENCH_STEPS, env = "SLICE_BENCH_STEPS")]
    pub steps: usize,

    /// Delay between cursor steps in milliseconds.
    ///
    /// Gives the prefetcher the head start it would get from a human
    /// scrolling through slices.
    #[arg(long, default_value_t = 5)]
    pub step_delay_ms: u64,

    /// Maximum slices kept in the cache.
    #[arg(long, default_value_t = DEFAULT_SLICE_CACHE_CAPACITY, env = "SLICE_CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// Neighbors fetched on each side of the cursor.
    #[arg(long, default_value_t = DEFAULT_PREFETCH_RADIUS, env = "SLICE_PREFETCH_RADIUS")]
    pub prefetch_radius: usize,

    /// Emit the report as JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl BenchConfig {
    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.engine_config().validate()?;

        if self.steps == 0 {
            return Err("steps must be greater than 0".to_string());
        }

        self.parse_axis()?;

        Ok(())
    }

    /// Engine tuning derived from these arguments.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_cache_capacity(self.cache_capacity)
            .with_prefetch_radius(self.prefetch_radius)
    }

    /// Parse the `--axis` argument.
    pub fn parse_axis(&self) -> Result<Axis, String> {
        match self.axis.as_str() {
            "depth" => Ok(Axis::Depth),
            "height" => Ok(Axis::Height),
            "width" => Ok(Axis::Width),
            other => Err(format!(
                "unknown axis '{other}' (expected depth, height, or width)"
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
