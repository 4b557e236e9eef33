/*!
 * Platform collaborator contracts.
 *
 * The handler consumes the home-automation platform through these
 * narrow interfaces: the parent bridge, the thing's channel store, and
 * the status/state sinks. The platform provides the implementations;
 * the engine never mutates the bridge itself.
 */
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use relayflow_devices::channel::ChannelSpec;
use relayflow_devices::device::SharedBus;
use relayflow_core::types::{Id, Value};

/// Status of the parent bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeStatus {
    /// The bridge is connected to the bus
    Online,
    /// The bridge lost or never had its bus connection
    Offline,
    /// The bridge is still starting up
    Initializing,
}

/// Availability of a device handler
///
/// Exactly one value at a time, owned by the handler, and the single
/// source of truth for whether commands are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    /// The handler has not been initialized yet
    Uninitialized,
    /// The device is reachable
    Online,
    /// Unusable configuration; only external reconfiguration clears this
    OfflineConfigError,
    /// The parent bridge is offline
    OfflineBridgeOffline,
    /// The parent bridge went away while (re)binding the device
    OfflineBridgeUninitialized,
    /// A bus call failed; recovers on the next bridge status change
    OfflineCommError,
}

impl Availability {
    /// Check whether the handler currently believes the device is reachable
    pub fn is_online(&self) -> bool {
        matches!(self, Availability::Online)
    }
}

/// Handler of the parent bridge
///
/// Owns the actual bus connection shared by all device handlers
/// attached to the bridge. `handle_timeout` is the bridge-level health
/// signal fed on every bus timeout.
pub trait BridgeHandler: Send + Sync {
    /// Record a bus timeout against the bridge's shared health counter
    fn handle_timeout(&self);

    /// The remote-switch bus the bridge exposes to its devices
    fn bus(&self) -> SharedBus;
}

/// The parent bridge of a device handler
pub trait Bridge: Send + Sync {
    /// Current status of the bridge
    fn status(&self) -> BridgeStatus;

    /// The bridge's handler, if it has been initialized
    fn handler(&self) -> Option<Arc<dyn BridgeHandler>>;
}

/// On-demand lookup of the parent bridge
///
/// The platform may swap the bridge object at any time, so the handler
/// asks for it on every use and never caches it across calls.
pub trait BridgeProvider: Send + Sync {
    /// The currently attached bridge, if any
    fn bridge(&self) -> Option<Arc<dyn Bridge>>;
}

/// The channel store of the handled thing
pub trait ThingChannels: Send + Sync {
    /// Atomically replace the installed channel set
    ///
    /// All-or-nothing: observers see either the old or the new complete
    /// set, never a partial one.
    fn replace_channels(&self, channels: Vec<ChannelSpec>);

    /// Look up one installed channel by id
    fn channel(&self, id: &Id) -> Option<ChannelSpec>;

    /// All installed channels, in declaration order
    fn channels(&self) -> Vec<ChannelSpec>;
}

/// Sink for handler availability updates
pub trait StatusSink: Send + Sync {
    /// Record a new availability, with an optional detail message
    fn update_status(&self, availability: Availability, message: Option<&str>);
}

/// Sink for channel states and events pushed up to the platform
pub trait StateSink: Send + Sync {
    /// Push a new channel state
    fn push_state(&self, channel: &Id, value: Value);

    /// Push a channel event
    fn push_event(&self, channel: &Id, event: &str);
}
