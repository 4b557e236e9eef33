/*!
 * Remote socket device implementations.
 *
 * Three addressing families of remote-controlled mains sockets, all
 * reached through the bridge's radio. Group A sockets use house and
 * receiver codes, group B sockets use a numeric address plus unit (and
 * may support dimming), group C sockets use a system and device code.
 *
 * The radio link is one-way, so each device caches the last commanded
 * value and serves refreshes from that cache after confirming the bus
 * link is alive.
 */
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use relayflow_core::types::{ChannelConfig, DeviceConfig, Id, Value};

use crate::device::{
    Command, DeviceError, Result, SetterRefresh, SharedBus, StateCallback, SwitchDevice,
    TriggerCallback,
};

/// Delay before re-reading a switched channel, in milliseconds
const DEFAULT_SWITCH_SETTLE_MS: u64 = 250;

/// Delay before re-reading a dimmed channel, in milliseconds
const DEFAULT_DIM_SETTLE_MS: u64 = 500;

fn config_integer(config: &DeviceConfig, key: &str) -> Result<i64> {
    config
        .get(key)
        .and_then(Value::as_integer)
        .ok_or_else(|| DeviceError::configuration(format!("Missing or invalid option '{}'", key)))
}

fn config_in_range(config: &DeviceConfig, key: &str, max: i64) -> Result<i64> {
    let value = config_integer(config, key)?;
    if value < 0 || value > max {
        return Err(DeviceError::configuration(format!(
            "Option '{}' out of range: {} (expected 0..={})",
            key, value, max
        )));
    }
    Ok(value)
}

fn settle_delay(channel_config: &ChannelConfig, default_ms: u64) -> Duration {
    let ms = channel_config
        .get("settle_ms")
        .and_then(Value::as_integer)
        .filter(|ms| *ms >= 0)
        .map(|ms| ms as u64)
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn command_on_off(command: &Command) -> Result<bool> {
    match command {
        Command::Write(value) => value
            .as_bool()
            .ok_or_else(|| DeviceError::invalid_value(format!("Expected a switch state, got {:?}", value))),
        Command::Refresh => Err(DeviceError::invalid_value(
            "A refresh request is not an actuation command",
        )),
    }
}

fn unknown_channel(channel: &Id) -> DeviceError {
    DeviceError::configuration(format!("Unknown channel {}", channel))
}

/// Remote socket addressed by house and receiver code (group A)
#[derive(Debug)]
pub struct RemoteSocketA {
    bus: SharedBus,
    power: RwLock<bool>,
}

impl RemoteSocketA {
    /// Create a new group A socket bound to the given bus
    pub fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            power: RwLock::new(false),
        }
    }
}

#[async_trait]
impl SwitchDevice for RemoteSocketA {
    async fn enabled_channels(&self, config: &DeviceConfig) -> Result<Vec<Id>> {
        config_in_range(config, "house_code", 31)?;
        config_in_range(config, "receiver_code", 31)?;
        Ok(vec![Id::from("power")])
    }

    async fn handle_command(
        &self,
        config: &DeviceConfig,
        channel_config: &ChannelConfig,
        channel: &Id,
        command: &Command,
    ) -> Result<Vec<SetterRefresh>> {
        if channel.as_str() != "power" {
            return Err(unknown_channel(channel));
        }

        let house = config_in_range(config, "house_code", 31)? as u8;
        let receiver = config_in_range(config, "receiver_code", 31)? as u8;
        let on = command_on_off(command)?;

        self.bus.switch_group_a(house, receiver, on).await?;
        *self.power.write().unwrap() = on;

        Ok(vec![SetterRefresh::new(
            "power",
            settle_delay(channel_config, DEFAULT_SWITCH_SETTLE_MS),
        )])
    }

    async fn refresh_value(
        &self,
        channel: &Id,
        _config: &DeviceConfig,
        _channel_config: &ChannelConfig,
        on_state: StateCallback<'_>,
        _on_trigger: TriggerCallback<'_>,
    ) -> Result<()> {
        if channel.as_str() != "power" {
            return Err(unknown_channel(channel));
        }

        // The link is one-way: the roundtrip proves the bridge answers,
        // the value itself comes from the cache.
        self.bus.switching_busy().await?;
        on_state(channel, Value::Bool(*self.power.read().unwrap()));
        Ok(())
    }
}

/// Remote socket addressed by address and unit (group B)
///
/// Dimmable sockets additionally expose the `dim_value` channel.
#[derive(Debug)]
pub struct RemoteSocketB {
    bus: SharedBus,
    power: RwLock<bool>,
    dim_level: RwLock<i64>,
}

impl RemoteSocketB {
    /// Create a new group B socket bound to the given bus
    pub fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            power: RwLock::new(false),
            dim_level: RwLock::new(0),
        }
    }

    fn dimmable(config: &DeviceConfig) -> bool {
        config
            .get("dimmable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[async_trait]
impl SwitchDevice for RemoteSocketB {
    async fn enabled_channels(&self, config: &DeviceConfig) -> Result<Vec<Id>> {
        config_in_range(config, "address", (1 << 26) - 1)?;
        config_in_range(config, "unit", 15)?;

        let mut channels = vec![Id::from("power")];
        if Self::dimmable(config) {
            channels.push(Id::from("dim_value"));
        }
        Ok(channels)
    }

    async fn handle_command(
        &self,
        config: &DeviceConfig,
        channel_config: &ChannelConfig,
        channel: &Id,
        command: &Command,
    ) -> Result<Vec<SetterRefresh>> {
        let address = config_in_range(config, "address", (1 << 26) - 1)? as u32;
        let unit = config_in_range(config, "unit", 15)? as u8;

        match channel.as_str() {
            "power" => {
                let on = command_on_off(command)?;
                self.bus.switch_group_b(address, unit, on).await?;
                *self.power.write().unwrap() = on;
                Ok(vec![SetterRefresh::new(
                    "power",
                    settle_delay(channel_config, DEFAULT_SWITCH_SETTLE_MS),
                )])
            }
            "dim_value" => {
                let level = match command {
                    Command::Write(value) => value.as_integer().ok_or_else(|| {
                        DeviceError::invalid_value(format!("Expected a dim level, got {:?}", value))
                    })?,
                    Command::Refresh => {
                        return Err(DeviceError::invalid_value(
                            "A refresh request is not an actuation command",
                        ))
                    }
                };
                if !(0..=15).contains(&level) {
                    return Err(DeviceError::invalid_value(format!(
                        "Dim level out of range: {} (expected 0..=15)",
                        level
                    )));
                }

                self.bus.dim_group_b(address, unit, level as u8).await?;
                *self.dim_level.write().unwrap() = level;
                *self.power.write().unwrap() = level > 0;
                Ok(vec![SetterRefresh::new(
                    "dim_value",
                    settle_delay(channel_config, DEFAULT_DIM_SETTLE_MS),
                )])
            }
            _ => Err(unknown_channel(channel)),
        }
    }

    async fn refresh_value(
        &self,
        channel: &Id,
        _config: &DeviceConfig,
        _channel_config: &ChannelConfig,
        on_state: StateCallback<'_>,
        _on_trigger: TriggerCallback<'_>,
    ) -> Result<()> {
        self.bus.switching_busy().await?;
        match channel.as_str() {
            "power" => on_state(channel, Value::Bool(*self.power.read().unwrap())),
            "dim_value" => on_state(channel, Value::Integer(*self.dim_level.read().unwrap())),
            _ => return Err(unknown_channel(channel)),
        }
        Ok(())
    }
}

/// Remote socket addressed by system and device code (group C)
#[derive(Debug)]
pub struct RemoteSocketC {
    bus: SharedBus,
    power: RwLock<bool>,
}

impl RemoteSocketC {
    /// Create a new group C socket bound to the given bus
    pub fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            power: RwLock::new(false),
        }
    }

    fn system_code(config: &DeviceConfig) -> Result<char> {
        let code = config
            .get("system_code")
            .and_then(Value::as_str)
            .and_then(|s| s.chars().next())
            .ok_or_else(|| DeviceError::configuration("Missing or invalid option 'system_code'"))?;
        if !('A'..='P').contains(&code) {
            return Err(DeviceError::configuration(format!(
                "Option 'system_code' out of range: {} (expected A..=P)",
                code
            )));
        }
        Ok(code)
    }
}

#[async_trait]
impl SwitchDevice for RemoteSocketC {
    async fn enabled_channels(&self, config: &DeviceConfig) -> Result<Vec<Id>> {
        Self::system_code(config)?;
        config_in_range(config, "device_code", 16)?;
        Ok(vec![Id::from("power")])
    }

    async fn handle_command(
        &self,
        config: &DeviceConfig,
        channel_config: &ChannelConfig,
        channel: &Id,
        command: &Command,
    ) -> Result<Vec<SetterRefresh>> {
        if channel.as_str() != "power" {
            return Err(unknown_channel(channel));
        }

        let system = Self::system_code(config)?;
        let device = config_in_range(config, "device_code", 16)? as u8;
        let on = command_on_off(command)?;

        self.bus.switch_group_c(system, device, on).await?;
        *self.power.write().unwrap() = on;

        Ok(vec![SetterRefresh::new(
            "power",
            settle_delay(channel_config, DEFAULT_SWITCH_SETTLE_MS),
        )])
    }

    async fn refresh_value(
        &self,
        channel: &Id,
        _config: &DeviceConfig,
        _channel_config: &ChannelConfig,
        on_state: StateCallback<'_>,
        _on_trigger: TriggerCallback<'_>,
    ) -> Result<()> {
        if channel.as_str() != "power" {
            return Err(unknown_channel(channel));
        }
        self.bus.switching_busy().await?;
        on_state(channel, Value::Bool(*self.power.read().unwrap()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct MockBus {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl crate::device::RemoteSwitchBus for MockBus {
        async fn switch_group_a(&self, house_code: u8, receiver_code: u8, on: bool) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("a:{}:{}:{}", house_code, receiver_code, on));
            Ok(())
        }

        async fn switch_group_b(&self, address: u32, unit: u8, on: bool) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("b:{}:{}:{}", address, unit, on));
            Ok(())
        }

        async fn dim_group_b(&self, address: u32, unit: u8, value: u8) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("dim:{}:{}:{}", address, unit, value));
            Ok(())
        }

        async fn switch_group_c(&self, system_code: char, device_code: u8, on: bool) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("c:{}:{}:{}", system_code, device_code, on));
            Ok(())
        }

        async fn switching_busy(&self) -> Result<bool> {
            Ok(false)
        }
    }

    fn socket_a_config() -> DeviceConfig {
        let mut config = DeviceConfig::new();
        config.insert("house_code".to_string(), Value::Integer(17));
        config.insert("receiver_code".to_string(), Value::Integer(3));
        config
    }

    fn socket_b_config(dimmable: bool) -> DeviceConfig {
        let mut config = DeviceConfig::new();
        config.insert("address".to_string(), Value::Integer(123456));
        config.insert("unit".to_string(), Value::Integer(2));
        config.insert("dimmable".to_string(), Value::Bool(dimmable));
        config
    }

    #[tokio::test]
    async fn test_socket_a_enabled_channels() {
        let device = RemoteSocketA::new(Arc::new(MockBus::default()));

        let channels = device.enabled_channels(&socket_a_config()).await.unwrap();
        assert_eq!(channels, vec![Id::from("power")]);

        let err = device
            .enabled_channels(&DeviceConfig::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_socket_a_switch_command() {
        let bus = Arc::new(MockBus::default());
        let device = RemoteSocketA::new(bus.clone());

        let refreshes = device
            .handle_command(
                &socket_a_config(),
                &ChannelConfig::new(),
                &Id::from("power"),
                &Command::Write(Value::Bool(true)),
            )
            .await
            .unwrap();

        assert_eq!(*bus.calls.lock().unwrap(), vec!["a:17:3:true"]);
        assert_eq!(
            refreshes,
            vec![SetterRefresh::new("power", Duration::from_millis(250))]
        );
    }

    #[tokio::test]
    async fn test_socket_b_dimmable_channels() {
        let device = RemoteSocketB::new(Arc::new(MockBus::default()));

        let channels = device
            .enabled_channels(&socket_b_config(false))
            .await
            .unwrap();
        assert_eq!(channels, vec![Id::from("power")]);

        let channels = device
            .enabled_channels(&socket_b_config(true))
            .await
            .unwrap();
        assert_eq!(channels, vec![Id::from("power"), Id::from("dim_value")]);
    }

    #[tokio::test]
    async fn test_socket_b_dim_command() {
        let bus = Arc::new(MockBus::default());
        let device = RemoteSocketB::new(bus.clone());

        let refreshes = device
            .handle_command(
                &socket_b_config(true),
                &ChannelConfig::new(),
                &Id::from("dim_value"),
                &Command::Write(Value::Integer(9)),
            )
            .await
            .unwrap();

        assert_eq!(*bus.calls.lock().unwrap(), vec!["dim:123456:2:9"]);
        assert_eq!(
            refreshes,
            vec![SetterRefresh::new("dim_value", Duration::from_millis(500))]
        );

        let err = device
            .handle_command(
                &socket_b_config(true),
                &ChannelConfig::new(),
                &Id::from("dim_value"),
                &Command::Write(Value::Integer(16)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidValue(_)));
    }

    #[tokio::test]
    async fn test_settle_delay_from_channel_config() {
        let bus = Arc::new(MockBus::default());
        let device = RemoteSocketA::new(bus);

        let mut channel_config = ChannelConfig::new();
        channel_config.insert("settle_ms".to_string(), Value::Integer(1000));

        let refreshes = device
            .handle_command(
                &socket_a_config(),
                &channel_config,
                &Id::from("power"),
                &Command::Write(Value::Bool(false)),
            )
            .await
            .unwrap();
        assert_eq!(refreshes[0].delay, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_refresh_serves_cached_value() {
        let bus = Arc::new(MockBus::default());
        let device = RemoteSocketB::new(bus);

        device
            .handle_command(
                &socket_b_config(true),
                &ChannelConfig::new(),
                &Id::from("dim_value"),
                &Command::Write(Value::Integer(7)),
            )
            .await
            .unwrap();

        let pushed = Mutex::new(Vec::new());
        let on_state = |id: &Id, value: Value| {
            pushed.lock().unwrap().push((id.clone(), value));
        };
        let on_trigger = |_: &Id, _: &str| {};

        device
            .refresh_value(
                &Id::from("dim_value"),
                &socket_b_config(true),
                &ChannelConfig::new(),
                &on_state,
                &on_trigger,
            )
            .await
            .unwrap();

        assert_eq!(
            *pushed.lock().unwrap(),
            vec![(Id::from("dim_value"), Value::Integer(7))]
        );
    }

    #[tokio::test]
    async fn test_socket_c_system_code_validation() {
        let device = RemoteSocketC::new(Arc::new(MockBus::default()));

        let mut config = DeviceConfig::new();
        config.insert("system_code".to_string(), Value::String("Q".to_string()));
        config.insert("device_code".to_string(), Value::Integer(4));

        let err = device.enabled_channels(&config).await.unwrap_err();
        assert!(matches!(err, DeviceError::Configuration(_)));

        config.insert("system_code".to_string(), Value::String("B".to_string()));
        let channels = device.enabled_channels(&config).await.unwrap();
        assert_eq!(channels, vec![Id::from("power")]);
    }
}
