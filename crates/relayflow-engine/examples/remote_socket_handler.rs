use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use relayflow_core::types::{DeviceConfig, Id, Value};
use relayflow_devices::catalog;
use relayflow_devices::channel::ChannelSpec;
use relayflow_devices::device::{Command, RemoteSwitchBus, Result as BusResult, SharedBus};
use relayflow_devices::devices::RemoteSocketB;

use relayflow_engine::handler::{DeviceSupplier, SwitchDeviceHandler};
use relayflow_engine::platform::{
    Availability, Bridge, BridgeHandler, BridgeProvider, BridgeStatus, StateSink, StatusSink,
    ThingChannels,
};
use relayflow_engine::scheduler::TokioScheduler;

/// A bus that just prints what it would transmit.
#[derive(Debug)]
struct PrintingBus;

#[async_trait]
impl RemoteSwitchBus for PrintingBus {
    async fn switch_group_a(&self, house: u8, receiver: u8, on: bool) -> BusResult<()> {
        println!("bus: switch A {}/{} -> {}", house, receiver, on);
        Ok(())
    }

    async fn switch_group_b(&self, address: u32, unit: u8, on: bool) -> BusResult<()> {
        println!("bus: switch B {}/{} -> {}", address, unit, on);
        Ok(())
    }

    async fn dim_group_b(&self, address: u32, unit: u8, value: u8) -> BusResult<()> {
        println!("bus: dim B {}/{} -> {}", address, unit, value);
        Ok(())
    }

    async fn switch_group_c(&self, system: char, device: u8, on: bool) -> BusResult<()> {
        println!("bus: switch C {}/{} -> {}", system, device, on);
        Ok(())
    }

    async fn switching_busy(&self) -> BusResult<bool> {
        Ok(false)
    }
}

struct ExampleBridgeHandler;

impl BridgeHandler for ExampleBridgeHandler {
    fn handle_timeout(&self) {
        println!("bridge: timeout recorded");
    }

    fn bus(&self) -> SharedBus {
        Arc::new(PrintingBus)
    }
}

struct ExampleBridge;

impl Bridge for ExampleBridge {
    fn status(&self) -> BridgeStatus {
        BridgeStatus::Online
    }

    fn handler(&self) -> Option<Arc<dyn BridgeHandler>> {
        Some(Arc::new(ExampleBridgeHandler))
    }
}

struct ExampleBridgeProvider;

impl BridgeProvider for ExampleBridgeProvider {
    fn bridge(&self) -> Option<Arc<dyn Bridge>> {
        Some(Arc::new(ExampleBridge))
    }
}

#[derive(Default)]
struct InMemoryChannels(Mutex<Vec<ChannelSpec>>);

impl ThingChannels for InMemoryChannels {
    fn replace_channels(&self, channels: Vec<ChannelSpec>) {
        println!(
            "platform: installed channels {:?}",
            channels.iter().map(|c| c.id.to_string()).collect::<Vec<_>>()
        );
        *self.0.lock().unwrap() = channels;
    }

    fn channel(&self, id: &Id) -> Option<ChannelSpec> {
        self.0.lock().unwrap().iter().find(|c| &c.id == id).cloned()
    }

    fn channels(&self) -> Vec<ChannelSpec> {
        self.0.lock().unwrap().clone()
    }
}

struct PrintingStatus;

impl StatusSink for PrintingStatus {
    fn update_status(&self, availability: Availability, message: Option<&str>) {
        match message {
            Some(message) => println!("platform: status {:?} ({})", availability, message),
            None => println!("platform: status {:?}", availability),
        }
    }
}

struct PrintingSink;

impl StateSink for PrintingSink {
    fn push_state(&self, channel: &Id, value: Value) {
        println!("platform: state {} = {:?}", channel, value);
    }

    fn push_event(&self, channel: &Id, event: &str) {
        println!("platform: event {} -> {}", channel, event);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Configure a dimmable group B socket
    let mut config = DeviceConfig::new();
    config.insert("address".to_string(), Value::Integer(123456));
    config.insert("unit".to_string(), Value::Integer(2));
    config.insert("dimmable".to_string(), Value::Bool(true));

    let thing_type = catalog::thing_type(&Id::from("remote-socket-b"))
        .expect("catalog entry")
        .clone();

    let supplier: DeviceSupplier = Arc::new(|bridge_handler| {
        Arc::new(RemoteSocketB::new(bridge_handler.bus())) as Arc<dyn relayflow_devices::SwitchDevice>
    });

    let handler = SwitchDeviceHandler::new(
        thing_type,
        config,
        supplier,
        Arc::new(ExampleBridgeProvider),
        Arc::new(InMemoryChannels::default()),
        Arc::new(PrintingStatus),
        Arc::new(PrintingSink),
        Arc::new(TokioScheduler),
    );

    println!("Initializing the handler...");
    handler.initialize().await;

    println!("Dimming the socket to level 9...");
    handler
        .handle_command(&Id::from("dim_value"), Command::Write(Value::Integer(9)))
        .await;

    // Give the scheduled follow-up refresh time to fire
    tokio::time::sleep(Duration::from_millis(700)).await;

    Ok(())
}
