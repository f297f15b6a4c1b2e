//! In-memory [`Gateway`] used by the unit tests.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use futures_util::{stream, StreamExt};

use crate::{
    bus::{
        player_path, Gateway, ManagedObject, Signal, SignalRule, SignalStream, DEVICE_INTERFACE,
        INTERFACES_ADDED, MEDIA_PLAYER_INTERFACE, PROPERTIES_CHANGED,
    },
    value::{PropertyMap, PropertyValue},
    Error, Result,
};

#[derive(Default)]
pub(crate) struct FakeBus {
    objects: Mutex<Vec<ManagedObject>>,
    failures: HashMap<String, String>,
    enumeration_failure: Option<String>,
    signals: Mutex<HashMap<&'static str, Vec<Signal>>>,
    fail_subscribe: bool,
    connect_on_call: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Exports an object implementing `org.bluez.Device1` with the given properties.
    pub(crate) fn with_device(self, path: &str, props: PropertyMap) -> Self {
        self.with_interface(path, DEVICE_INTERFACE, props)
    }

    /// Exports a `player0` media player below the device at `device_path`.
    pub(crate) fn with_player(self, device_path: &str, status: &str) -> Self {
        let props = PropertyMap::new()
            .with("Status", status)
            .with("Name", "Music");
        self.with_interface(&player_path(device_path), MEDIA_PLAYER_INTERFACE, props)
    }

    pub(crate) fn with_interface(self, path: &str, interface: &str, props: PropertyMap) -> Self {
        {
            let mut objects = self.objects.lock().unwrap();
            match objects.iter_mut().find(|o| o.path == path) {
                Some(object) => {
                    object.interfaces.insert(interface.to_string(), props);
                }
                None => objects.push(ManagedObject {
                    path: path.to_string(),
                    interfaces: HashMap::from([(interface.to_string(), props)]),
                }),
            }
        }
        self
    }

    /// Makes every call of method `member` fail with `message`.
    pub(crate) fn fail_call(mut self, member: &str, message: &str) -> Self {
        self.failures.insert(member.to_string(), message.to_string());
        self
    }

    /// Makes `managed_objects` fail with `message`.
    pub(crate) fn failing_enumeration(mut self, message: &str) -> Self {
        self.enumeration_failure = Some(message.to_string());
        self
    }

    pub(crate) fn with_signals(self, rule: SignalRule, signals: Vec<Signal>) -> Self {
        self.signals.lock().unwrap().insert(rule.member, signals);
        self
    }

    pub(crate) fn failing_subscriptions(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    /// Makes `Device1.Connect` flip the device's `Connected` property to `true`.
    pub(crate) fn connect_on_call(mut self) -> Self {
        self.connect_on_call = true;
        self
    }

    /// Changes a single property of an exported object.
    pub(crate) fn set_property(
        &self,
        path: &str,
        interface: &str,
        name: &str,
        value: PropertyValue,
    ) {
        let mut objects = self.objects.lock().unwrap();
        if let Some(props) = objects
            .iter_mut()
            .find(|o| o.path == path)
            .and_then(|o| o.interfaces.get_mut(interface))
        {
            props.insert(name, value);
        }
    }

    /// Returns the method calls made so far, formatted as `<path> <interface>.<member>`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Gateway for FakeBus {
    async fn managed_objects(&self) -> Result<Vec<ManagedObject>> {
        if let Some(message) = &self.enumeration_failure {
            return Err(Error::from(message.as_str()));
        }

        Ok(self
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn properties(&self, path: &str, interface: &str) -> Result<PropertyMap> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects
            .iter()
            .find(|o| o.path == path)
            .and_then(|o| o.interface(interface))
            .cloned()
            .ok_or_else(|| {
                Error::from(format!(
                    "org.freedesktop.DBus.Error.UnknownObject: no {} at {}",
                    interface, path
                ))
            })
    }

    async fn call(&self, path: &str, interface: &str, member: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{} {}.{}", path, interface, member));

        if let Some(message) = self.failures.get(member) {
            return Err(Error::from(message.as_str()));
        }

        if self.connect_on_call && interface == DEVICE_INTERFACE && member == "Connect" {
            let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(props) = objects
                .iter_mut()
                .find(|o| o.path == path)
                .and_then(|o| o.interfaces.get_mut(DEVICE_INTERFACE))
            {
                props.insert("Connected", true);
            }
        }

        Ok(())
    }

    async fn subscribe(&self, rule: SignalRule) -> Result<SignalStream> {
        if self.fail_subscribe {
            return Err(Error::from("org.freedesktop.DBus.Error.AccessDenied"));
        }

        let signals = self
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(rule.member)
            .unwrap_or_default();
        Ok(stream::iter(signals).boxed())
    }
}

pub(crate) fn properties_changed(path: &str, interface: &str, changed: PropertyMap) -> Signal {
    Signal {
        path: path.to_string(),
        member: PROPERTIES_CHANGED.to_string(),
        body: vec![
            interface.into(),
            changed.into(),
            PropertyValue::Array(Vec::new()),
        ],
    }
}

pub(crate) fn interfaces_added(path: &str, interface: &str, props: PropertyMap) -> Signal {
    Signal {
        path: "/".to_string(),
        member: INTERFACES_ADDED.to_string(),
        body: vec![
            path.into(),
            PropertyMap::new().with(interface, props).into(),
        ],
    }
}
