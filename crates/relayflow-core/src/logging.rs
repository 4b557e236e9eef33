/*!
 * Logging functionality for relayflow.
 *
 * This module provides tracing setup and utilities for consistent
 * logging across the relayflow crates.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Initialize the logging system with default configuration
pub fn init() -> Result<()> {
    init_with_filter("info")
}

/// Initialize the logging system with a specific filter
///
/// # Arguments
///
/// * `filter` - The log filter string (e.g., "info", "debug", "relayflow=trace")
pub fn init_with_filter(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|e| Error::runtime(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// A type alias for a tracing span
pub type Span = tracing::Span;

/// Create a new span for a device handler
///
/// # Arguments
///
/// * `thing_type` - The thing-type id of the handled device
/// * `id` - An optional ID for the handler instance
pub fn handler_span(thing_type: &str, id: Option<&str>) -> Span {
    match id {
        Some(id) => tracing::info_span!("handler", thing_type = %thing_type, id = %id),
        None => tracing::info_span!("handler", thing_type = %thing_type),
    }
}

/// Create a new span for a bus operation
///
/// # Arguments
///
/// * `operation` - The name of the bus operation
/// * `channel` - The channel the operation targets
pub fn bus_span(operation: &str, channel: &str) -> Span {
    tracing::info_span!("bus", operation = %operation, channel = %channel)
}
