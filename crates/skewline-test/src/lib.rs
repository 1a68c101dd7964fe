//! Skewline Test Harness - Topology simulation and resolution validation
//!
//! This crate provides:
//! - Multi-node topologies with independent, offset and jittery clocks
//! - Anonymous nodes and decoy names for identity resolution
//! - Tracing setup for tests

pub mod simulator;

pub use simulator::*;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; later calls are no-ops.
/// The filter comes from `RUST_LOG`, defaulting to `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer().with_target(false))
        .try_init();
}
