//! # Suites
//!
//! Ready-made case lists for concrete services.

pub mod booking;

use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::fixtures::FixtureGenerator;
use crate::sequencer::Sequencer;
use crate::testing::{DirSchemaLoader, ResponseValidator, SchemaLoader};

pub use booking::booking_suite;

/// Generate fixtures, register the booking cases and return a sequencer
/// ready to run. Every configuration problem surfaces here, before any
/// request is sent.
pub fn booking_sequencer(config: &HarnessConfig) -> Result<Sequencer> {
    config.validate()?;

    let loader: Arc<dyn SchemaLoader> = match &config.schema_dir {
        Some(dir) => Arc::new(DirSchemaLoader::new(dir)),
        None => Arc::new(booking::schemas()),
    };
    let mut generator = FixtureGenerator::new(config.seed);
    let cases = booking_suite(config, &mut generator)?;

    Sequencer::new(config, ResponseValidator::new(loader))?.with_cases(cases)
}
