//! Getman API test runner.
//!
//! Builds requests from declarative templates and generated fixtures, sends
//! them in a fixed order while passing state (tokens, created ids) from one
//! case to the next, and checks each response against declarative
//! assertions. The shipped suite targets a hotel-booking REST service.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod report;
pub mod sequencer;
pub mod state;
pub mod storage;
pub mod suite;
pub mod testing;

pub use config::HarnessConfig;
pub use error::{ErrorKind, HarnessError, Result};
pub use report::{Outcome, RunReport};
pub use sequencer::{Sequencer, TestCase};
pub use state::SharedState;

/// Initializes the tracing subscriber. Call once at startup.
///
/// `RUST_LOG` wins when set; otherwise `level` applies to this crate.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("getman_check={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
