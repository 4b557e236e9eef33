/*!
 * Device capability contract and core device abstractions.
 *
 * This module defines the capability interface every remote-switch
 * device variant implements, the error taxonomy for bus-level
 * failures, and the narrow bus interface devices encode commands onto.
 */
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use relayflow_core::types::{ChannelConfig, DeviceConfig, Id, Value};

/// Error type for device and bus operations
///
/// Timeouts are a distinguished failure class: they additionally feed a
/// bridge-level health signal, so every call site must classify before
/// acting.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The device did not answer within the bus call timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Communication with the device failed
    #[error("Communication error: {0}")]
    Communication(String),

    /// The device or handler configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The value is not valid for the channel
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    /// Create a new timeout error
    pub fn timeout<S: AsRef<str>>(msg: S) -> Self {
        DeviceError::Timeout(msg.as_ref().to_string())
    }

    /// Create a new communication error
    pub fn communication<S: AsRef<str>>(msg: S) -> Self {
        DeviceError::Communication(msg.as_ref().to_string())
    }

    /// Create a new configuration error
    pub fn configuration<S: AsRef<str>>(msg: S) -> Self {
        DeviceError::Configuration(msg.as_ref().to_string())
    }

    /// Create a new invalid value error
    pub fn invalid_value<S: AsRef<str>>(msg: S) -> Self {
        DeviceError::InvalidValue(msg.as_ref().to_string())
    }

    /// Check if this failure is the timeout class
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeviceError::Timeout(_))
    }
}

/// A command addressed to one channel of a device
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Re-read the channel's value from the device
    Refresh,
    /// Write a new value to the channel
    Write(Value),
}

impl Command {
    /// Check if this is a refresh request
    pub fn is_refresh(&self) -> bool {
        matches!(self, Command::Refresh)
    }
}

/// A follow-up refresh instruction produced by a command handling call
///
/// "After issuing this command, re-read this channel's value after this
/// delay": the hardware needs time to settle or acknowledge. Consumed
/// immediately by the dispatcher, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SetterRefresh {
    /// The channel to re-read
    pub channel: Id,
    /// How long to wait before re-reading
    pub delay: Duration,
}

impl SetterRefresh {
    /// Create a new follow-up refresh instruction
    pub fn new<I: Into<Id>>(channel: I, delay: Duration) -> Self {
        Self {
            channel: channel.into(),
            delay,
        }
    }
}

/// Callback pushing a refreshed channel state up to the platform
pub type StateCallback<'a> = &'a (dyn Fn(&Id, Value) + Send + Sync);

/// Callback pushing a channel event up to the platform
pub type TriggerCallback<'a> = &'a (dyn Fn(&Id, &str) + Send + Sync);

/// The capability interface of one remote-switch device variant
///
/// Implementations encode device-specific addressing and value mapping;
/// the handler in `relayflow-engine` drives them without knowing which
/// variant it holds. All operations fail with [`DeviceError`], and the
/// caller is responsible for classifying timeouts vs. other failures.
#[async_trait]
pub trait SwitchDevice: Send + Sync + Debug {
    /// The channel ids applicable given the current configuration
    ///
    /// Every returned id must exist in the channel-definition list of
    /// the device's thing type; an unknown id is a fatal configuration
    /// error on the caller's side.
    async fn enabled_channels(&self, config: &DeviceConfig) -> Result<Vec<Id>>;

    /// Handle an actuation command for one channel
    ///
    /// Returns the (possibly empty) follow-up refreshes the caller
    /// should schedule.
    async fn handle_command(
        &self,
        config: &DeviceConfig,
        channel_config: &ChannelConfig,
        channel: &Id,
        command: &Command,
    ) -> Result<Vec<SetterRefresh>>;

    /// Re-read one channel's value, pushing results through the callbacks
    async fn refresh_value(
        &self,
        channel: &Id,
        config: &DeviceConfig,
        channel_config: &ChannelConfig,
        on_state: StateCallback<'_>,
        on_trigger: TriggerCallback<'_>,
    ) -> Result<()>;
}

/// The narrow bus interface remote-switch devices encode onto
///
/// Implemented by the bus bridge handler against the actual transport
/// driver; that driver is out of scope here. Group A sockets are
/// addressed by house/receiver code, group B by address/unit (and can
/// be dimmed), group C by system/device code.
#[async_trait]
pub trait RemoteSwitchBus: Send + Sync + Debug {
    /// Switch a group A socket
    async fn switch_group_a(&self, house_code: u8, receiver_code: u8, on: bool) -> Result<()>;

    /// Switch a group B socket
    async fn switch_group_b(&self, address: u32, unit: u8, on: bool) -> Result<()>;

    /// Dim a group B socket; `value` is the raw dim level 0..=15
    async fn dim_group_b(&self, address: u32, unit: u8, value: u8) -> Result<()>;

    /// Switch a group C socket
    async fn switch_group_c(&self, system_code: char, device_code: u8, on: bool) -> Result<()>;

    /// Whether the radio is still busy transmitting the previous command
    async fn switching_busy(&self) -> Result<bool>;
}

/// A shared handle to a remote-switch bus
pub type SharedBus = Arc<dyn RemoteSwitchBus>;
