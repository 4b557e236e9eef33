/*!
 * Channel-type catalog for relayflow.
 *
 * The catalog maps each thing type to its ordered channel definitions.
 * The channel set a concrete device instance exposes is always a subset
 * of these definitions, selected by the device's enabled-channel list.
 */
use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use relayflow_core::types::Id;

/// The platform item type a channel binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    /// On/off state
    Switch,
    /// Dimmable level
    Dimmer,
    /// Numeric value
    Number,
    /// Free-form text
    Text,
}

impl ItemType {
    /// Convert to the platform's item-type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Switch => "Switch",
            ItemType::Dimmer => "Dimmer",
            ItemType::Number => "Number",
            ItemType::Text => "String",
        }
    }
}

/// Auto-update policy for a channel
///
/// Controls whether the platform may predict a new channel state from a
/// command before the device confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoUpdatePolicy {
    /// Never predict; wait for a confirmed state
    Veto,
    /// The platform's default prediction behavior
    Default,
    /// Predict the new state from the command
    Recommend,
}

/// One channel definition within a thing type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDefinition {
    /// The channel id
    pub id: Id,
    /// The channel-type id
    pub channel_type: Id,
    /// The item type the channel binds to
    pub item_type: ItemType,
    /// Optional human-readable label
    pub label: Option<String>,
    /// Optional description
    pub description: Option<String>,
    /// Static properties of the channel
    pub properties: HashMap<String, String>,
    /// Auto-update policy
    pub auto_update: AutoUpdatePolicy,
}

impl ChannelDefinition {
    /// Create a new channel definition
    pub fn new<I, C>(id: I, channel_type: C, item_type: ItemType) -> Self
    where
        I: Into<Id>,
        C: Into<Id>,
    {
        Self {
            id: id.into(),
            channel_type: channel_type.into(),
            item_type,
            label: None,
            description: None,
            properties: HashMap::new(),
            auto_update: AutoUpdatePolicy::Default,
        }
    }

    /// Set the label
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a static property
    pub fn with_property<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the auto-update policy
    pub fn with_auto_update(mut self, policy: AutoUpdatePolicy) -> Self {
        self.auto_update = policy;
        self
    }
}

/// A thing type and its ordered channel definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingType {
    /// The thing-type id
    pub id: Id,
    /// Human-readable label
    pub label: String,
    /// Channel definitions in declaration order
    pub channel_definitions: Vec<ChannelDefinition>,
}

impl ThingType {
    /// Create a new thing type
    pub fn new<I: Into<Id>, S: Into<String>>(
        id: I,
        label: S,
        channel_definitions: Vec<ChannelDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            channel_definitions,
        }
    }

    /// Look up a channel definition by channel id
    pub fn channel_definition(&self, id: &Id) -> Option<&ChannelDefinition> {
        self.channel_definitions.iter().find(|d| &d.id == id)
    }
}

/// Look up a thing type in the static catalog
pub fn thing_type(id: &Id) -> Option<&'static ThingType> {
    catalog().get(id)
}

/// All thing-type ids the catalog knows
pub fn thing_type_ids() -> Vec<&'static Id> {
    catalog().keys().collect()
}

fn catalog() -> &'static HashMap<Id, ThingType> {
    static CATALOG: OnceLock<HashMap<Id, ThingType>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut map = HashMap::new();
        for tt in [remote_socket_a(), remote_socket_b(), remote_socket_c()] {
            map.insert(tt.id.clone(), tt);
        }
        map
    })
}

fn power_channel() -> ChannelDefinition {
    ChannelDefinition::new("power", "relayflow:power", ItemType::Switch)
        .with_label("Power")
        .with_description("Switches the paired socket on or off")
}

fn remote_socket_a() -> ThingType {
    ThingType::new(
        "remote-socket-a",
        "Remote Socket (Group A)",
        vec![power_channel()
            .with_property("addressing", "house/receiver code")],
    )
}

fn remote_socket_b() -> ThingType {
    ThingType::new(
        "remote-socket-b",
        "Remote Socket (Group B)",
        vec![
            power_channel().with_property("addressing", "address/unit"),
            ChannelDefinition::new("dim_value", "relayflow:dim-level", ItemType::Dimmer)
                .with_label("Dim Level")
                .with_description("Dim level of the paired socket")
                .with_property("range", "0..=15")
                .with_auto_update(AutoUpdatePolicy::Veto),
        ],
    )
}

fn remote_socket_c() -> ThingType {
    // Group C sockets only switch; no description needed beyond the label.
    ThingType::new(
        "remote-socket-c",
        "Remote Socket (Group C)",
        vec![ChannelDefinition::new("power", "relayflow:power", ItemType::Switch)
            .with_label("Power")
            .with_property("addressing", "system/device code")],
    )
}
