/*!
 * relayflow devices
 *
 * This crate provides the device capability contract, the channel-type
 * catalog and channel set builder, the concrete remote-switch device
 * implementations, and the firmware-version provider.
 */

#![warn(missing_docs)]

// Re-export core types
pub use relayflow_core::prelude;

pub mod catalog;
pub mod channel;
pub mod device;
pub mod devices;
pub mod firmware;

// Re-export the capability contract and channel model for convenience
pub use catalog::{AutoUpdatePolicy, ChannelDefinition, ItemType, ThingType};
pub use channel::{build_channel_set, ChannelSpec};
pub use device::{
    Command, DeviceError, RemoteSwitchBus, SetterRefresh, SharedBus, SwitchDevice,
};
pub use firmware::{FirmwareInfo, FirmwareProvider};

/// relayflow devices crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the device system
pub fn init() -> Result<(), relayflow_core::error::Error> {
    tracing::info!("relayflow devices {} initialized", VERSION);
    Ok(())
}
