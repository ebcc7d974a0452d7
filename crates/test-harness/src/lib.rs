//! Test harness for the B-rep measurement kernel.
//!
//! Builds product data programmatically, so scenarios read as geometry
//! rather than JSON, and checks results with diagnostics.
//!
//! # Key Components
//!
//! - [`ProductBuilder`]: Fluent construction of `ProductData`
//! - [`fixtures`]: Boxes, cylinders, a triangulated sphere, manholes, segments
//! - [`assertions`]: Assertion helpers with expected/actual diagnostics
//! - [`init_tracing`]: `RUST_LOG`-driven log output for test runs

pub mod assertions;
pub mod builder;
pub mod fixtures;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub use assertions::HarnessError;
pub use builder::ProductBuilder;

/// Install a test-friendly subscriber once per process. The filter comes
/// from `RUST_LOG` and defaults to warnings.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
