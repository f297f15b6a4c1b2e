//! Turning BlueZ signals into [`Device`] discoveries and property change [`Event`]s.

use futures_util::{stream::select, StreamExt};

use crate::{
    bus::{
        Gateway, Signal, SignalRule, SignalStream, DEVICE_INTERFACE, INTERFACES_ADDED,
        PROPERTIES_CHANGED,
    },
    device::Device,
    event::Event,
    registry::Registry,
    value::PropertyValue,
    Config, Result,
};

/// Receives the notifications decoded by a [`Listener`].
///
/// Both methods do nothing by default, so implementors only need to override what they care
/// about. They are called on the task driving [`Listener::run`]; a slow handler delays every
/// notification after it.
pub trait Handler {
    /// Called when an object implementing `org.bluez.Device1` appears.
    ///
    /// `device` is the registry's record after merging in the new information.
    fn on_device_discovered(&mut self, device: &Device) {
        let _ = device;
    }

    /// Called once for every property in every `PropertiesChanged` signal.
    fn on_property_changed(&mut self, event: &Event) {
        let _ = event;
    }
}

impl<H: Handler + ?Sized> Handler for &mut H {
    fn on_device_discovered(&mut self, device: &Device) {
        (**self).on_device_discovered(device)
    }

    fn on_property_changed(&mut self, event: &Event) {
        (**self).on_property_changed(event)
    }
}

/// Subscription to BlueZ' `InterfacesAdded` and `PropertiesChanged` signals.
///
/// A [`Listener`] is created in the subscribed state by [`Listener::subscribe`] and consumed by
/// [`Listener::run`], which streams notifications into a [`Handler`] until the bus connection
/// goes away. There is no other way to stop it; drop the future returned by [`Listener::run`] to
/// abandon it early.
///
/// The [`Listener`] is `'static` and independent of the [`Gateway`] it was created from, so it can
/// be moved to a background task.
pub struct Listener {
    stream: SignalStream,
    registry: Registry,
    level: log::Level,
}

impl Listener {
    /// Subscribes to device and property notifications.
    ///
    /// Discovered devices and device property changes are written to `registry`.
    ///
    /// # Errors
    ///
    /// Fails if either subscription can't be registered with the bus. This is not retried.
    pub async fn subscribe<G: Gateway>(
        gateway: &G,
        registry: Registry,
        config: &Config,
    ) -> Result<Self> {
        let added = gateway
            .subscribe(SignalRule::INTERFACES_ADDED)
            .await
            .map_err(|e| e.context(format!("failed to subscribe to {}", INTERFACES_ADDED)))?;
        let changed = gateway
            .subscribe(SignalRule::PROPERTIES_CHANGED)
            .await
            .map_err(|e| e.context(format!("failed to subscribe to {}", PROPERTIES_CHANGED)))?;

        log::debug!("listening for {} and {}", INTERFACES_ADDED, PROPERTIES_CHANGED);

        Ok(Self {
            stream: select(added, changed).boxed(),
            registry,
            level: config.traffic_level(),
        })
    }

    /// Returns the [`Registry`] this listener updates.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Processes notifications until the underlying signal streams end.
    ///
    /// Handler calls happen in the order signals are received, one at a time.
    pub async fn run<H: Handler>(mut self, mut handler: H) {
        while let Some(signal) = self.stream.next().await {
            self.dispatch(&signal, &mut handler);
        }

        log::debug!("signal stream closed, listener stopped");
    }

    /// Handles a single signal.
    pub fn dispatch<H: Handler>(&self, signal: &Signal, handler: &mut H) {
        log::log!(
            self.level,
            "received {} on {}: {:?}",
            signal.member,
            signal.path,
            signal.body
        );

        match signal.member.as_str() {
            INTERFACES_ADDED => self.interfaces_added(signal, handler),
            PROPERTIES_CHANGED => self.properties_changed(signal, handler),
            _ => {}
        }
    }

    fn interfaces_added<H: Handler>(&self, signal: &Signal, handler: &mut H) {
        let path = signal.body.first().and_then(PropertyValue::as_str);
        let intfs = signal.body.get(1).and_then(PropertyValue::as_map);
        let (Some(path), Some(intfs)) = (path, intfs) else {
            log::debug!("dropping malformed {} signal", INTERFACES_ADDED);
            return;
        };

        for (name, props) in intfs.iter() {
            if name != DEVICE_INTERFACE {
                continue;
            }
            let Some(props) = props.as_map() else { continue };

            match Device::parse(path, props) {
                Some(device) => {
                    let device = self.registry.upsert(device);
                    handler.on_device_discovered(&device);
                }
                None => log::debug!("ignoring device without address at {}", path),
            }
        }
    }

    fn properties_changed<H: Handler>(&self, signal: &Signal, handler: &mut H) {
        // interface, changed properties, invalidated properties
        if signal.body.len() < 3 {
            log::debug!(
                "dropping {} signal on {} with {} arguments",
                PROPERTIES_CHANGED,
                signal.path,
                signal.body.len()
            );
            return;
        }
        let Some(changed) = signal.body[1].as_map() else {
            log::debug!("dropping malformed {} signal on {}", PROPERTIES_CHANGED, signal.path);
            return;
        };

        if signal.body[0].as_str() == Some(DEVICE_INTERFACE) {
            self.registry.apply_changes(&signal.path, changed);
        }

        for (name, value) in changed.iter() {
            let event = Event::parse(name, &signal.path, value.clone());
            handler.on_property_changed(&event);
        }
    }
}
