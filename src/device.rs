//! The [`Device`] model.

use crate::{address::Address, value::PropertyMap};

/// Last known state of a remote Bluetooth device.
///
/// Devices are built from the `org.bluez.Device1` property set via [`Device::parse`]. BlueZ
/// frequently reports only part of that set (eg. a `PropertiesChanged` signal that only carries
/// `RSSI`), so every property except the address is optional and unknown values read as their
/// zero value.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    identifier: String,
    bus_path: String,
    name: Option<String>,
    alias: Option<String>,
    blocked: Option<bool>,
    connected: Option<bool>,
    paired: Option<bool>,
    trusted: Option<bool>,
    rssi: Option<i16>,
    icon: Option<String>,
    uuids: Option<Vec<String>>,
}

impl Device {
    /// Parses a [`Device`] from the `org.bluez.Device1` properties of the object at `path`.
    ///
    /// Returns [`None`] if the properties lack a valid `Address`. Unknown properties, and
    /// properties of an unexpected type, are ignored.
    pub fn parse(path: &str, props: &PropertyMap) -> Option<Self> {
        let address = props.str("Address")?.parse::<Address>().ok()?;
        let mut device = Self::new(address.to_string(), path);
        device.apply(props);
        Some(device)
    }

    /// Creates a device record that knows nothing but its identifier and path.
    fn new(identifier: String, path: &str) -> Self {
        Self {
            identifier,
            bus_path: path.to_string(),
            name: None,
            alias: None,
            blocked: None,
            connected: None,
            paired: None,
            trusted: None,
            rssi: None,
            icon: None,
            uuids: None,
        }
    }

    /// Updates this record with a (possibly partial) set of `org.bluez.Device1` properties.
    ///
    /// Properties missing from `props` keep their previous value. The address never changes.
    pub fn apply(&mut self, props: &PropertyMap) {
        if let Some(name) = props.str("Name") {
            self.name = Some(name.to_string());
        }
        if let Some(alias) = props.str("Alias") {
            self.alias = Some(alias.to_string());
        }
        if let Some(blocked) = props.bool("Blocked") {
            self.blocked = Some(blocked);
        }
        if let Some(connected) = props.bool("Connected") {
            self.connected = Some(connected);
        }
        if let Some(paired) = props.bool("Paired") {
            self.paired = Some(paired);
        }
        if let Some(trusted) = props.bool("Trusted") {
            self.trusted = Some(trusted);
        }
        if let Some(rssi) = props.int("RSSI").and_then(|v| i16::try_from(v).ok()) {
            self.rssi = Some(rssi);
        }
        if let Some(icon) = props.str("Icon") {
            self.icon = Some(icon.to_string());
        }
        if let Some(uuids) = props.get("UUIDs").and_then(|v| v.as_array()) {
            self.uuids = Some(
                uuids
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            );
        }
    }

    /// Merges a newer record for the same device into this one.
    ///
    /// Fields known to `other` overwrite ours; fields it doesn't know are kept.
    pub fn merge(&mut self, other: Device) {
        debug_assert_eq!(self.identifier, other.identifier);

        fn take<T>(into: &mut Option<T>, from: Option<T>) {
            if from.is_some() {
                *into = from;
            }
        }

        self.bus_path = other.bus_path;
        take(&mut self.name, other.name);
        take(&mut self.alias, other.alias);
        take(&mut self.blocked, other.blocked);
        take(&mut self.connected, other.connected);
        take(&mut self.paired, other.paired);
        take(&mut self.trusted, other.trusted);
        take(&mut self.rssi, other.rssi);
        take(&mut self.icon, other.icon);
        take(&mut self.uuids, other.uuids);
    }

    /// Returns the canonical identifier of this device: its address in uppercase,
    /// colon-separated form (eg. `AA:BB:CC:DD:EE:FF`).
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the hardware [`Address`] of the device.
    pub fn address(&self) -> Option<Address> {
        self.identifier.parse().ok()
    }

    /// Returns the D-Bus object path of the device.
    pub fn bus_path(&self) -> &str {
        &self.bus_path
    }

    /// Returns a human-readable name for the device.
    ///
    /// This is the remote name if known, falling back to the alias and then to the identifier, so
    /// it is never empty.
    pub fn display_name(&self) -> &str {
        [self.name.as_deref(), self.alias.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or(self.identifier.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.unwrap_or(false)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.unwrap_or(false)
    }

    /// Returns whether the device is paired, or [`None`] if that was never reported.
    pub fn paired(&self) -> Option<bool> {
        self.paired
    }

    pub fn is_paired(&self) -> bool {
        self.paired.unwrap_or(false)
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted.unwrap_or(false)
    }

    /// Returns the Received Signal Strength Indicator (RSSI), if the device reported one.
    ///
    /// BlueZ only publishes RSSI while discovery is running.
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    /// Returns the icon name hint, such as `audio-headset` or `phone`.
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Returns the service UUIDs the device advertises.
    pub fn service_uuids(&self) -> &[String] {
        self.uuids.as_deref().unwrap_or(&[])
    }
}
