//! Picking the connected device that is currently playing media.

use std::sync::{Mutex, PoisonError};

use crate::{
    bus::{player_path, Gateway, DEVICE_INTERFACE, MEDIA_PLAYER_INTERFACE},
    device::Device,
    Error, Result,
};

/// `org.bluez.MediaPlayer1.Status` value of a player that is producing audio.
pub const PLAYING: &str = "playing";

/// Tracks which connected device is the *active* one, ie. the target for playback commands.
///
/// BlueZ has no notion of a current device, so [`Resolver::resolve`] asks every connected
/// device's media player for its status and picks one that is playing.
#[derive(Debug, Default)]
pub struct Resolver {
    active: Mutex<Option<Device>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the device selected by the last successful [`Resolver::resolve`].
    pub fn current(&self) -> Option<Device> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Determines the active device and remembers it.
    ///
    /// Candidates are all devices with `Connected = true`, visited in the order the bus
    /// enumerates them. Devices whose `player0` media player can't be queried are skipped. The
    /// first candidate whose player reports [`PLAYING`] is selected.
    ///
    /// If several devices are playing at once the choice among them depends on enumeration order
    /// and may differ between calls.
    ///
    /// # Errors
    ///
    /// Fails if the bus can't be enumerated, or with a "no active device" error (see
    /// [`Error::is_no_active_device`]) if nothing is playing. The previous selection is kept in
    /// both cases.
    pub async fn resolve<G: Gateway>(&self, gateway: &G) -> Result<Device> {
        let objects = gateway
            .managed_objects()
            .await
            .map_err(|e| e.context("failed to enumerate devices"))?;

        let candidates = objects.iter().filter_map(|object| {
            let props = object.interface(DEVICE_INTERFACE)?;
            Device::parse(&object.path, props).filter(Device::is_connected)
        });

        for device in candidates {
            let path = player_path(device.bus_path());
            let player = match gateway.properties(&path, MEDIA_PLAYER_INTERFACE).await {
                Ok(player) => player,
                Err(e) => {
                    log::debug!("skipping {}, no media player: {}", device.identifier(), e);
                    continue;
                }
            };

            let status = player.str("Status").unwrap_or_default();
            log::debug!("{} player status: {:?}", device.identifier(), status);
            if status == PLAYING {
                log::debug!("active device is now {}", device.identifier());
                *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(device.clone());
                return Ok(device);
            }
        }

        Err(Error::no_active_device())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing::FakeBus, value::PropertyMap};

    const A: &str = "/org/bluez/hci0/dev_AA_AA_AA_AA_AA_AA";
    const B: &str = "/org/bluez/hci0/dev_BB_BB_BB_BB_BB_BB";
    const C: &str = "/org/bluez/hci0/dev_CC_CC_CC_CC_CC_CC";

    fn connected(address: &str) -> PropertyMap {
        PropertyMap::new()
            .with("Address", address)
            .with("Connected", true)
    }

    fn three_devices(order: [&str; 3]) -> FakeBus {
        let mut bus = FakeBus::new();
        for path in order {
            let address = crate::address::extract_identifier(path);
            let status = if path == B { "playing" } else { "paused" };
            bus = bus.with_device(path, connected(&address)).with_player(path, status);
        }
        bus
    }

    #[test]
    fn selects_the_playing_device() {
        for order in [[A, B, C], [C, B, A], [B, A, C], [A, C, B]] {
            let resolver = Resolver::new();
            let device = pollster::block_on(resolver.resolve(&three_devices(order))).unwrap();
            assert_eq!(device.identifier(), "BB:BB:BB:BB:BB:BB");
            assert_eq!(resolver.current(), Some(device));
        }
    }

    #[test]
    fn nothing_playing_keeps_previous() {
        let resolver = Resolver::new();
        pollster::block_on(resolver.resolve(&three_devices([A, B, C]))).unwrap();

        let bus = FakeBus::new()
            .with_device(A, connected("AA:AA:AA:AA:AA:AA"))
            .with_player(A, "stopped");
        let err = pollster::block_on(resolver.resolve(&bus)).unwrap_err();
        assert!(err.is_no_active_device());
        assert_eq!(
            resolver.current().unwrap().identifier(),
            "BB:BB:BB:BB:BB:BB"
        );
    }

    #[test]
    fn skips_devices_without_player() {
        let bus = FakeBus::new()
            .with_device(A, connected("AA:AA:AA:AA:AA:AA"))
            .with_device(B, connected("BB:BB:BB:BB:BB:BB"))
            .with_player(B, "playing");
        let device = pollster::block_on(Resolver::new().resolve(&bus)).unwrap();
        assert_eq!(device.identifier(), "BB:BB:BB:BB:BB:BB");
    }

    #[test]
    fn enumeration_failure_has_context() {
        let bus = FakeBus::new().failing_enumeration("org.freedesktop.DBus.Error.ServiceUnknown");
        let err = pollster::block_on(Resolver::new().resolve(&bus)).unwrap_err();
        assert!(!err.is_no_active_device());
        assert_eq!(
            err.to_string(),
            "failed to enumerate devices: org.freedesktop.DBus.Error.ServiceUnknown"
        );
    }

    #[test]
    fn ignores_disconnected_devices() {
        let bus = FakeBus::new()
            .with_device(
                A,
                PropertyMap::new()
                    .with("Address", "AA:AA:AA:AA:AA:AA")
                    .with("Connected", false),
            )
            .with_player(A, "playing");
        let resolver = Resolver::new();
        let err = pollster::block_on(resolver.resolve(&bus)).unwrap_err();
        assert!(err.is_no_active_device());
        assert_eq!(resolver.current(), None);
    }
}
