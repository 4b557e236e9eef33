/*!
 * Device handler: lifecycle state machine and command dispatch.
 *
 * One handler instance binds a logical device to its capability
 * implementation, tracks availability relative to the parent bridge,
 * keeps the installed channel set in sync with the device's enabled
 * channels, and routes platform commands to the device, scheduling any
 * follow-up refreshes the device asks for.
 */
use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, warn};

use relayflow_core::types::{ChannelConfig, DeviceConfig, Id, Value};

use relayflow_devices::catalog::ThingType;
use relayflow_devices::channel::build_channel_set;
use relayflow_devices::device::{Command, DeviceError, SetterRefresh, SwitchDevice};

use crate::platform::{
    Availability, BridgeHandler, BridgeProvider, BridgeStatus, StateSink, StatusSink,
    ThingChannels,
};
use crate::scheduler::Scheduler;

/// Creates the device capability handle from the bridge's handler
///
/// Called on every (re)initialization: the bridge object may have been
/// swapped by the platform, so the handle is rebuilt rather than kept.
pub type DeviceSupplier =
    Arc<dyn Fn(Arc<dyn BridgeHandler>) -> Arc<dyn SwitchDevice> + Send + Sync>;

/// Handler for one remote-switch device
pub struct SwitchDeviceHandler {
    thing_type: ThingType,
    config: DeviceConfig,
    device_supplier: DeviceSupplier,
    bridge_provider: Arc<dyn BridgeProvider>,
    channels: Arc<dyn ThingChannels>,
    status: Arc<dyn StatusSink>,
    sink: Arc<dyn StateSink>,
    scheduler: Arc<dyn Scheduler>,
    device: RwLock<Option<Arc<dyn SwitchDevice>>>,
    availability: RwLock<Availability>,
    self_handle: Weak<SwitchDeviceHandler>,
}

impl SwitchDeviceHandler {
    /// Create a new handler; it starts uninitialized
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        thing_type: ThingType,
        config: DeviceConfig,
        device_supplier: DeviceSupplier,
        bridge_provider: Arc<dyn BridgeProvider>,
        channels: Arc<dyn ThingChannels>,
        status: Arc<dyn StatusSink>,
        sink: Arc<dyn StateSink>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_handle| Self {
            thing_type,
            config,
            device_supplier,
            bridge_provider,
            channels,
            status,
            sink,
            scheduler,
            device: RwLock::new(None),
            availability: RwLock::new(Availability::Uninitialized),
            self_handle: self_handle.clone(),
        })
    }

    /// The handler's current availability
    pub fn availability(&self) -> Availability {
        *self.availability.read().unwrap()
    }

    fn update_status(&self, availability: Availability, message: Option<&str>) {
        *self.availability.write().unwrap() = availability;
        self.status.update_status(availability, message);
    }

    fn device(&self) -> Option<Arc<dyn SwitchDevice>> {
        self.device.read().unwrap().clone()
    }

    /// Initialize the handler
    ///
    /// Binds the device handle from the bridge, installs the channel
    /// set, and brings the device online when the bridge already is.
    pub async fn initialize(&self) {
        let bridge = match self.bridge_provider.bridge() {
            Some(bridge) => bridge,
            None => {
                self.update_status(Availability::OfflineConfigError, Some("Bridge not found"));
                return;
            }
        };
        let bridge_handler = match bridge.handler() {
            Some(handler) => handler,
            None => {
                self.update_status(Availability::OfflineBridgeUninitialized, None);
                return;
            }
        };

        *self.device.write().unwrap() = Some((self.device_supplier)(bridge_handler));

        if !self.configure_channels().await {
            return;
        }

        if bridge.status() == BridgeStatus::Online {
            self.initialize_device().await;
        } else {
            self.update_status(Availability::OfflineBridgeOffline, None);
        }
    }

    /// (Re)bind the device handle and bring the handler online
    ///
    /// Runs the refresh-on-initialize sweep afterwards, which may
    /// itself flip availability back to a communication error.
    async fn initialize_device(&self) {
        let bridge_handler = match self.bridge_provider.bridge().and_then(|b| b.handler()) {
            Some(handler) => handler,
            None => {
                self.update_status(Availability::OfflineBridgeUninitialized, None);
                return;
            }
        };

        *self.device.write().unwrap() = Some((self.device_supplier)(bridge_handler));
        self.update_status(Availability::Online, None);

        // Sweep in declaration order; no early abort when a channel
        // flips availability offline mid-sweep.
        for spec in self.channels.channels() {
            if spec.is_reserved() {
                continue;
            }
            self.handle_command(&spec.id, Command::Refresh).await;
        }
    }

    /// React to a status change of the parent bridge
    pub async fn bridge_status_changed(&self, status: BridgeStatus) {
        // No transition is defined out of a null-bridge configuration
        // error; only external reconfiguration clears it.
        if self.availability() == Availability::OfflineConfigError {
            return;
        }

        match status {
            BridgeStatus::Online => self.initialize_device().await,
            BridgeStatus::Offline => {
                self.update_status(Availability::OfflineBridgeOffline, None);
            }
            _ => {}
        }
    }

    /// Handle a platform command addressed to one channel
    ///
    /// Dropped silently while the bridge is missing or offline: the
    /// device is known unreachable and flooding the bus helps nobody.
    pub async fn handle_command(&self, channel: &Id, command: Command) {
        let bridge = match self.bridge_provider.bridge() {
            Some(bridge) => bridge,
            None => return,
        };
        if bridge.status() == BridgeStatus::Offline {
            return;
        }

        let channel_config = self
            .channels
            .channel(channel)
            .map(|spec| spec.config)
            .unwrap_or_default();

        match command {
            Command::Refresh => self.refresh_value(channel, &channel_config).await,
            Command::Write(_) => {
                let device = match self.device() {
                    Some(device) => device,
                    None => return,
                };

                match device
                    .handle_command(&self.config, &channel_config, channel, &command)
                    .await
                {
                    Ok(refreshes) => self.schedule_refreshes(refreshes),
                    Err(err) => self.classify_failure(
                        &err,
                        &format!("send command to channel {}", channel),
                    ),
                }
            }
        }
    }

    /// Schedule follow-up refreshes, fire-and-forget
    ///
    /// Tasks are never tracked: a later reinitialization does not cancel
    /// refreshes already scheduled, they run against the then-current
    /// device handle.
    fn schedule_refreshes(&self, refreshes: Vec<SetterRefresh>) {
        let handler = match self.self_handle.upgrade() {
            Some(handler) => handler,
            None => return,
        };

        for refresh in refreshes {
            let handler = Arc::clone(&handler);
            let SetterRefresh { channel, delay } = refresh;
            self.scheduler.schedule_after(
                delay,
                Box::pin(async move {
                    handler.handle_command(&channel, Command::Refresh).await;
                }),
            );
        }
    }

    async fn refresh_value(&self, channel: &Id, channel_config: &ChannelConfig) {
        let device = match self.device() {
            Some(device) => device,
            None => return,
        };

        // Receiving any value is itself evidence of a healthy link, so
        // the push callbacks force the handler online.
        let on_state = |id: &Id, value: Value| {
            self.sink.push_state(id, value);
            self.update_status(Availability::Online, None);
        };
        let on_trigger = |id: &Id, event: &str| {
            self.sink.push_event(id, event);
            self.update_status(Availability::Online, None);
        };

        match device
            .refresh_value(channel, &self.config, channel_config, &on_state, &on_trigger)
            .await
        {
            Ok(()) => self.update_status(Availability::Online, None),
            Err(err) => {
                self.classify_failure(&err, &format!("refresh value for {}", channel));
            }
        }
    }

    /// Install the channel set computed from the device's enabled channels
    ///
    /// Returns `false` when initialization must stop (fatal
    /// configuration error). On any failure the previously installed
    /// set stays untouched.
    async fn configure_channels(&self) -> bool {
        let device = match self.device() {
            Some(device) => device,
            None => return false,
        };

        let existing = self.channels.channels();
        match build_channel_set(device.as_ref(), &self.config, &self.thing_type, &existing).await
        {
            Ok(set) => {
                self.channels.replace_channels(set);
                true
            }
            Err(err) => {
                self.classify_failure(
                    &err,
                    &format!("get enabled channels for {}", self.thing_type.id),
                );
                !matches!(err, DeviceError::Configuration(_))
            }
        }
    }

    /// Convert a device failure into an availability transition
    ///
    /// Timeouts additionally feed the bridge-level health signal and are
    /// logged quietly; they are expected on a lossy bus.
    fn classify_failure(&self, err: &DeviceError, context: &str) {
        if let DeviceError::Configuration(message) = err {
            warn!("Failed to {}: {}", context, message);
            self.update_status(Availability::OfflineConfigError, Some(message.as_str()));
            return;
        }

        if err.is_timeout() {
            debug!("Failed to {}: {}", context, err);
            if let Some(handler) = self.bridge_provider.bridge().and_then(|b| b.handler()) {
                handler.handle_timeout();
            }
        } else {
            warn!("Failed to {}: {}", context, err);
        }
        self.update_status(Availability::OfflineCommError, None);
    }
}
