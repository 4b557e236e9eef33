/*!
 * relayflow engine
 *
 * This crate provides the device handler for remote-switch devices:
 * the availability lifecycle relative to the parent bus bridge, the
 * command/refresh dispatcher, and the deferred-task scheduler the
 * dispatcher hands follow-up refreshes to.
 */

#![warn(missing_docs)]

// Re-export core types
pub use relayflow_core::prelude;

// Re-export types from relayflow_core for convenience
pub use relayflow_core::types::{Id, Value};

pub mod handler;
pub mod platform;
pub mod scheduler;

// Re-export main types for convenience
pub use handler::{DeviceSupplier, SwitchDeviceHandler};
pub use platform::{
    Availability, Bridge, BridgeHandler, BridgeProvider, BridgeStatus, StateSink, StatusSink,
    ThingChannels,
};
pub use scheduler::{Scheduler, TokioScheduler};

/// relayflow engine crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the engine
pub fn init() -> Result<(), relayflow_core::error::Error> {
    tracing::info!("relayflow engine {} initialized", VERSION);
    Ok(())
}
