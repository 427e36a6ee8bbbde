//! Headless entry point for the grove pipeline.
//!
//! This binary initializes logging and delegates the full envelope →
//! growth → post-processing → fuzzy-cloud run to [`pipeline`].

mod pipeline;

use grove_core::error::GroveError;

/// Runs the whole pipeline once and prints summary statistics.
///
/// Logging is controlled through `RUST_LOG` (e.g. `RUST_LOG=debug` to see
/// per-round growth counters and per-branch particle counts).
///
/// ### Returns
/// - `Ok(())` on a complete run.
/// - `Err` if sampling or growth exhausted its configured budget.
fn main() -> Result<(), GroveError> {
    env_logger::init();

    let summary = pipeline::run(pipeline::PipelineParams::default())?;
    println!("{summary}");
    Ok(())
}
