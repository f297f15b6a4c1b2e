//! The shared [`Registry`] of known devices.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    address::{extract_identifier, UNKNOWN_DEVICE},
    bus::{Gateway, DEVICE_INTERFACE},
    device::Device,
    value::PropertyMap,
    Result,
};

/// Maps device identifiers to the last known [`Device`] state.
///
/// [`Registry`] is a cheaply cloneable handle; all clones share the same map. The [`Listener`]
/// writes to it from its own task while callers read from theirs, so every access goes through a
/// lock, and readers only ever get copies.
///
/// Devices are never removed: BlueZ' `InterfacesRemoved` signal is not tracked, so a device that
/// disappears from the bus keeps its last known state.
///
/// [`Listener`]: crate::listener::Listener
#[derive(Clone, Default)]
pub struct Registry {
    devices: Arc<Mutex<HashMap<String, Device>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Device>> {
        // A panicking handler can't leave a half-written `Device` behind, so a poisoned map is
        // still consistent.
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the device with the given identifier, if known.
    pub fn get(&self, identifier: &str) -> Option<Device> {
        self.lock().get(identifier).cloned()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.lock().contains_key(identifier)
    }

    /// Returns a copy of every known device, ordered by identifier.
    pub fn snapshot(&self) -> Vec<Device> {
        let mut devices = self.lock().values().cloned().collect::<Vec<_>>();
        devices.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        devices
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Inserts `device`, merging it into any existing record for the same identifier.
    ///
    /// Fields that `device` doesn't know keep their previous value. Returns the merged record.
    pub fn upsert(&self, device: Device) -> Device {
        let mut devices = self.lock();
        match devices.get_mut(device.identifier()) {
            Some(known) => {
                known.merge(device);
                known.clone()
            }
            None => {
                devices.insert(device.identifier().to_string(), device.clone());
                device
            }
        }
    }

    /// Applies a partial `org.bluez.Device1` property update for the device at `path`.
    ///
    /// Known devices are looked up by the address encoded in `path`. An unknown device is only
    /// registered if `changed` carries a valid `Address` of its own, so an update like `{RSSI}`
    /// for a device that was never announced leaves the registry untouched. Returns the updated
    /// record, or [`None`] if nothing was recorded.
    pub fn apply_changes(&self, path: &str, changed: &PropertyMap) -> Option<Device> {
        let identifier = extract_identifier(path);
        if identifier == UNKNOWN_DEVICE {
            return None;
        }

        let mut devices = self.lock();
        if let Some(device) = devices.get_mut(&identifier) {
            device.apply(changed);
            return Some(device.clone());
        }

        let device = Device::parse(path, changed)?;
        Some(match devices.get_mut(device.identifier()) {
            Some(known) => {
                known.merge(device);
                known.clone()
            }
            None => {
                devices.insert(device.identifier().to_string(), device.clone());
                device
            }
        })
    }

    /// Repopulates the registry from every device object BlueZ currently exports.
    ///
    /// Signals only report changes that happen after subscribing, so this is how the registry
    /// learns about devices that were already known (paired, connected, ...) at startup. Objects
    /// without a valid address are skipped. Returns the number of devices registered.
    pub async fn refresh_all<G: Gateway>(&self, gateway: &G) -> Result<usize> {
        self.refresh_with(gateway, |_| {}).await
    }

    /// Like [`Registry::refresh_all`], but also reports every registered device to `discovered`,
    /// in bus enumeration order, with the merged registry record.
    pub async fn refresh_with<G: Gateway>(
        &self,
        gateway: &G,
        mut discovered: impl FnMut(&Device),
    ) -> Result<usize> {
        let objects = gateway
            .managed_objects()
            .await
            .map_err(|e| e.context("failed to enumerate devices"))?;

        let mut count = 0;
        for object in &objects {
            let Some(props) = object.interface(DEVICE_INTERFACE) else {
                continue;
            };

            match Device::parse(&object.path, props) {
                Some(device) => {
                    log::debug!("found device {} at {}", device.identifier(), object.path);
                    let device = self.upsert(device);
                    discovered(&device);
                    count += 1;
                }
                None => log::debug!("skipping device without address at {}", object.path),
            }
        }

        Ok(count)
    }
}
