//! Slice Streamer - slice cache and prefetch engine for volumetric data.
//!
//! This binary hosts the maintenance tools: container inspection and a
//! cache behavior bench.

use clap::Parser;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slice_streamer::{
    config::{BenchConfig, Cli, Command, InspectConfig},
    resolve_dataset,
    store::{ChunkReader, Container, FileChunkReader},
    Axis, Side, VolumeEngine, DEFAULT_DATASET_NAME, FORMAT_VERSION,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect(config) => run_inspect(config).await,
        Command::Bench(config) => run_bench(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "slice_streamer=debug"
    } else {
        "slice_streamer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Slice Streamer Container Inspection");
    println!("═══════════════════════════════════");
    println!();

    let reader = match FileChunkReader::open(&config.file).await {
        Ok(reader) => {
            println!(
                "✓ File: {} ({} bytes)",
                config.file.display(),
                reader.size()
            );
            reader
        }
        Err(e) => {
            println!("✗ File: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let container = match Container::parse(&reader).await {
        Ok(container) => {
            println!("✓ Format: VOLC v{}", FORMAT_VERSION);
            container
        }
        Err(e) => {
            println!("✗ Format: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "✓ Header: {} dataset(s), data region starts at byte {}",
        container.datasets().len(),
        container.data_start()
    );
    println!();

    println!("Datasets:");
    println!("─────────");
    for dataset in container.datasets() {
        let shape = dataset
            .shape
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join("x");
        println!("  {} ({}, {})", dataset.name, shape, dataset.dtype);
        println!(
            "    chunks: {} of depth {}, compression: {}",
            dataset.chunk_count(),
            dataset.chunk_depth,
            dataset.compression
        );

        let stored: u64 = dataset.chunks.iter().map(|c| c.stored_len).sum();
        let raw: u64 = dataset.chunks.iter().map(|c| c.raw_len).sum();
        if raw > 0 {
            println!(
                "    stored: {} bytes ({:.1}% of raw)",
                stored,
                stored as f64 / raw as f64 * 100.0
            );
        }
    }
    println!();

    match resolve_dataset(container.header(), DEFAULT_DATASET_NAME) {
        Some(dataset) => {
            println!("✓ Serving dataset: {}", dataset.name);
            for (dim, extent) in dataset.shape.iter().enumerate() {
                if let Some(axis) = Axis::from_index(dim) {
                    println!("    {}: {} slice(s)", axis, extent);
                }
            }
        }
        None => {
            println!("✗ Serving dataset: no 3-dimensional dataset found");
            return ExitCode::FAILURE;
        }
    }

    println!();
    println!("═══════════════════════════════════");
    println!("✓ Container is valid");

    ExitCode::SUCCESS
}

// =============================================================================
// Bench Command
// =============================================================================

async fn run_bench(config: BenchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let axis = match config.parse_axis() {
        Ok(axis) => axis,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let engine = VolumeEngine::with_config(config.engine_config());

    let handle = match engine.load_side(Side::Full, &config.file).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to load volume: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let [depth, height, width] = handle.shape();
    let extent = handle.extent(axis);
    info!(
        "Loaded dataset '{}' ({}x{}x{} {}), sweeping {} step(s) along {}",
        handle.dataset(),
        depth,
        height,
        width,
        handle.element(),
        config.steps,
        axis
    );

    let step_delay = Duration::from_millis(config.step_delay_ms);
    let started = Instant::now();

    // Scrub back and forth from the middle of the axis, bouncing at the
    // edges, the way a user hunting for a feature would
    let mut index = extent / 2;
    let mut forward = true;
    for _ in 0..config.steps {
        if let Err(e) = engine.request_slice(Side::Full, axis, index).await {
            error!("Slice request failed at {}[{}]: {}", axis, index, e);
            return ExitCode::FAILURE;
        }
        if let Err(e) = engine.notify_cursor_moved(Side::Full, axis, index).await {
            error!("Cursor notification failed: {}", e);
            return ExitCode::FAILURE;
        }

        if !step_delay.is_zero() {
            tokio::time::sleep(step_delay).await;
        }

        if forward && index + 1 < extent {
            index += 1;
        } else if forward {
            forward = false;
            index = index.saturating_sub(1);
        } else if index > 0 {
            index -= 1;
        } else {
            forward = true;
            index = 1.min(extent - 1);
        }
    }

    let elapsed = started.elapsed();

    // Let in-flight prefetches land before sampling the counters
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = match engine.cache_stats(Side::Full).await {
        Ok(stats) => stats,
        Err(e) => {
            error!("Failed to read cache stats: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        let json = serde_json::json!({
            "file": config.file,
            "dataset": handle.dataset(),
            "shape": handle.shape(),
            "axis": axis.to_string(),
            "steps": config.steps,
            "elapsed_ms": elapsed.as_millis() as u64,
            "hits": stats.hits,
            "misses": stats.misses,
            "hit_rate": stats.hit_rate(),
            "cached_slices": stats.size,
            "cache_capacity": stats.capacity,
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap());
    } else {
        println!();
        println!("Bench Results");
        println!("─────────────");
        println!("  Steps:        {}", config.steps);
        println!("  Elapsed:      {:.2?}", elapsed);
        println!("  Per step:     {:.2?}", elapsed / config.steps as u32);
        println!("  Cache hits:   {}", stats.hits);
        println!("  Cache misses: {}", stats.misses);
        println!("  Hit rate:     {:.1}%", stats.hit_rate() * 100.0);
        println!("  Cached:       {}/{} slices", stats.size, stats.capacity);
    }

    ExitCode::SUCCESS
}
