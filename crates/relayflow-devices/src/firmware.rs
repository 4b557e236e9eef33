/*!
 * Firmware-version provider.
 *
 * Periodically fetches a plain-text manifest of the latest published
 * firmware versions and caches them keyed by thing name. Only version
 * metadata is handled here; firmware binaries are downloaded by the
 * platform through the derived URL.
 */
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use relayflow_core::config::FirmwareConfig;
use relayflow_core::types::Id;

use crate::device::{DeviceError, Result};

/// The latest published firmware for one thing type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareInfo {
    /// Version string as published in the manifest
    pub version: String,
    /// Download URL for the firmware image
    pub download_url: String,
}

/// Parse a latest-versions manifest
///
/// Recognized lines have the form `<kind>s:<device_name>:<version>`
/// with kind `brick`, `bricklet` or `extension`; everything else is
/// skipped. The thing name is the kind concatenated with the device
/// name stripped of underscores.
pub fn parse_manifest(text: &str, download_base_url: &str) -> HashMap<String, FirmwareInfo> {
    let mut versions = HashMap::new();

    for line in text.lines() {
        let mut parts = line.trim().split(':');
        let kind = match parts.next() {
            Some("bricks") => "brick",
            Some("bricklets") => "bricklet",
            Some("extensions") => "extension",
            _ => continue,
        };

        let (name, version) = match (parts.next(), parts.next()) {
            (Some(name), Some(version)) if !name.is_empty() && !version.is_empty() => {
                (name, version)
            }
            _ => {
                debug!("Skipping malformed manifest line: {}", line);
                continue;
            }
        };

        let thing_name = format!("{}{}", kind, name.replace('_', ""));
        let download_url = format!(
            "{}/{}s/{}/{}_{}_firmware_{}.bin",
            download_base_url,
            kind,
            name,
            kind,
            name,
            version.replace('.', "_")
        );

        versions.insert(
            thing_name,
            FirmwareInfo {
                version: version.to_string(),
                download_url,
            },
        );
    }

    versions
}

/// Cache of the latest published firmware versions
#[derive(Debug)]
pub struct FirmwareProvider {
    config: FirmwareConfig,
    http: reqwest::Client,
    latest: RwLock<HashMap<String, FirmwareInfo>>,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl FirmwareProvider {
    /// Create a new provider; the cache starts empty
    pub fn new(config: FirmwareConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            latest: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
        }
    }

    /// The latest published firmware for a thing type, if known
    pub fn latest_for(&self, thing_type: &Id) -> Option<FirmwareInfo> {
        self.latest.read().unwrap().get(thing_type.as_str()).cloned()
    }

    /// When the cache was last refreshed successfully
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.read().unwrap()
    }

    /// Fetch and apply the manifest once; returns the entry count
    pub async fn refresh_once(&self) -> Result<usize> {
        let response = self
            .http
            .get(&self.config.manifest_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(classify_http_error)?;

        let text = response.text().await.map_err(classify_http_error)?;
        let versions = parse_manifest(&text, &self.config.download_base_url);
        let count = versions.len();

        *self.latest.write().unwrap() = versions;
        *self.last_refresh.write().unwrap() = Some(Utc::now());
        debug!("Cached {} latest firmware versions", count);

        Ok(count)
    }

    /// Spawn the background refresh loop
    ///
    /// Re-fetches after the configured refresh interval on success and
    /// after the retry interval on failure. The task runs until the
    /// handle is dropped into an abort or the process exits.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let delay = match provider.refresh_once().await {
                    Ok(_) => Duration::from_secs(provider.config.refresh_interval_secs),
                    Err(e) => {
                        info!("Failed to download latest versions: {}", e);
                        Duration::from_secs(provider.config.retry_interval_secs)
                    }
                };
                time::sleep(delay).await;
            }
        })
    }
}

fn classify_http_error(err: reqwest::Error) -> DeviceError {
    if err.is_timeout() {
        DeviceError::timeout(err.to_string())
    } else {
        DeviceError::communication(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://downloads.example.org/firmwares";

    #[test]
    fn test_parse_manifest_lines() {
        let text = "\
# latest published versions
bricks:hat:2.0.5
bricklets:remote_switch_v2:2.1.9
extensions:wifi:2.3.1
tools:brickv:2.4.0
";
        let versions = parse_manifest(text, BASE);
        assert_eq!(versions.len(), 3);

        let info = versions.get("brickletremoteswitchv2").unwrap();
        assert_eq!(info.version, "2.1.9");
        assert_eq!(
            info.download_url,
            "https://downloads.example.org/firmwares/bricklets/remote_switch_v2/bricklet_remote_switch_v2_firmware_2_1_9.bin"
        );

        assert!(versions.contains_key("brickhat"));
        assert!(versions.contains_key("extensionwifi"));
        // The tools line is not a recognized kind
        assert!(!versions.keys().any(|k| k.contains("brickv")));
    }

    #[test]
    fn test_parse_manifest_skips_malformed_lines() {
        let versions = parse_manifest("bricklets:\nbricklets:io4\n\n:::\n", BASE);
        assert!(versions.is_empty());
    }

    #[test]
    fn test_latest_for_unknown_thing_type() {
        let provider = FirmwareProvider::new(FirmwareConfig::default());
        assert_eq!(provider.latest_for(&Id::from("brickletio4")), None);
        assert!(provider.last_refresh().is_none());
    }

    #[test]
    fn test_newer_manifest_replaces_cache() {
        let provider = FirmwareProvider::new(FirmwareConfig::default());
        *provider.latest.write().unwrap() = parse_manifest("bricklets:io4:2.0.0\n", BASE);
        *provider.latest.write().unwrap() = parse_manifest("bricklets:io4:2.0.1\n", BASE);

        let info = provider.latest_for(&Id::from("brickletio4")).unwrap();
        assert_eq!(info.version, "2.0.1");
    }
}
