/*!
 * Channel set construction.
 *
 * This module turns a device's enabled-channel list into the concrete,
 * ordered channel set installed on the platform thing, preserving any
 * per-channel configuration a previous channel set carried.
 */
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use relayflow_core::types::{ChannelConfig, DeviceConfig, Id};

use crate::catalog::{AutoUpdatePolicy, ChannelDefinition, ItemType, ThingType};
use crate::device::{DeviceError, Result, SwitchDevice};

/// One addressable channel as installed on a platform thing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// The channel id
    pub id: Id,
    /// The item type the channel binds to
    pub item_type: ItemType,
    /// The channel-type id
    pub channel_type: Id,
    /// Optional human-readable label
    pub label: Option<String>,
    /// Optional description
    pub description: Option<String>,
    /// Static properties of the channel
    pub properties: HashMap<String, String>,
    /// Auto-update policy
    pub auto_update: AutoUpdatePolicy,
    /// Per-channel configuration supplied by the platform
    pub config: ChannelConfig,
}

impl ChannelSpec {
    /// Build a spec from a catalog definition
    ///
    /// Absent optional fields stay absent; they are never filled with
    /// empty strings.
    pub fn from_definition(def: &ChannelDefinition) -> Self {
        Self {
            id: def.id.clone(),
            item_type: def.item_type,
            channel_type: def.channel_type.clone(),
            label: def.label.clone(),
            description: def.description.clone(),
            properties: def.properties.clone(),
            auto_update: def.auto_update,
            config: ChannelConfig::new(),
        }
    }

    /// Replace the per-channel configuration
    pub fn with_config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether the channel is platform-reserved (not refreshed on initialize)
    pub fn is_reserved(&self) -> bool {
        self.channel_type.as_str().starts_with("system:")
    }
}

/// Compute the channel set for a device instance
///
/// Queries the device for its enabled channels and resolves each id
/// against the thing type's channel definitions, in enabled-list order.
/// An id without a definition is a fatal configuration error. When
/// `existing` already contains a channel with the same id, its stored
/// configuration is carried over unchanged, so rebuilding never resets
/// user-set per-channel options.
///
/// The function is pure with respect to the platform: installing the
/// returned set (atomically, all-or-nothing) is the caller's job, and
/// on error the previously installed set must stay untouched.
pub async fn build_channel_set(
    device: &dyn SwitchDevice,
    config: &DeviceConfig,
    thing_type: &ThingType,
    existing: &[ChannelSpec],
) -> Result<Vec<ChannelSpec>> {
    let enabled = device.enabled_channels(config).await?;

    let mut channels = Vec::with_capacity(enabled.len());
    for id in enabled {
        let def = thing_type.channel_definition(&id).ok_or_else(|| {
            DeviceError::configuration(format!(
                "Channel {} is not defined for thing type {}",
                id, thing_type.id
            ))
        })?;

        let mut spec = ChannelSpec::from_definition(def);
        if let Some(previous) = existing.iter().find(|c| c.id == spec.id) {
            spec.config = previous.config.clone();
        }
        channels.push(spec);
    }

    Ok(channels)
}
