//! The [`Gateway`] abstraction over the BlueZ D-Bus service, and its zbus implementation.
//!
//! Everything above this module only ever talks to BlueZ through the four operations of
//! [`Gateway`]. Paths and interface names are fixed by BlueZ and have to match bit for bit.

use core::fmt;
use std::{collections::HashMap, future::ready};

use futures_util::{stream::BoxStream, StreamExt};
use zbus::{
    fdo::PropertiesProxy, names::InterfaceName, zvariant::OwnedObjectPath, MatchRule, Message,
    MessageStream, MessageType,
};

use crate::{
    address::Address,
    value::{PropertyMap, PropertyValue, WireProperties},
    Error, Result, Session,
};

pub const BLUEZ_SERVICE: &str = "org.bluez";
pub const ADAPTER_INTERFACE: &str = "org.bluez.Adapter1";
pub const DEVICE_INTERFACE: &str = "org.bluez.Device1";
pub const MEDIA_PLAYER_INTERFACE: &str = "org.bluez.MediaPlayer1";
pub const OBJECT_MANAGER_INTERFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

pub const INTERFACES_ADDED: &str = "InterfacesAdded";
pub const PROPERTIES_CHANGED: &str = "PropertiesChanged";

const PATH_PREFIX: &str = "/org/bluez/";
const PLAYER_SEGMENT: &str = "player0";

/// Returns the object path of the adapter named `adapter` (eg. `/org/bluez/hci0`).
pub fn adapter_path(adapter: &str) -> String {
    format!("{}{}", PATH_PREFIX, adapter)
}

/// Returns the object path BlueZ uses for the device with the given [`Address`] on the adapter at
/// `adapter_path`.
pub fn device_path(adapter_path: &str, address: &Address) -> String {
    format!("{}/dev_{}", adapter_path, address.to_path_segment())
}

/// Returns the object path of the media player exported for the device at `device_path`.
pub fn player_path(device_path: &str) -> String {
    format!("{}/{}", device_path, PLAYER_SEGMENT)
}

/// One object exported by BlueZ, with the properties of every interface it implements.
#[derive(Debug, Clone, Default)]
pub struct ManagedObject {
    pub path: String,
    pub interfaces: HashMap<String, PropertyMap>,
}

impl ManagedObject {
    pub fn interface(&self, name: &str) -> Option<&PropertyMap> {
        self.interfaces.get(name)
    }
}

/// A signal received from the bus.
///
/// `body` holds the decoded signal arguments in order. For `PropertiesChanged` that is the
/// interface name, the changed properties and the invalidated property names; for
/// `InterfacesAdded` it is the object path and a map from interface name to properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub path: String,
    pub member: String,
    pub body: Vec<PropertyValue>,
}

/// Selects a class of signals to subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRule {
    pub interface: &'static str,
    pub member: &'static str,
}

impl SignalRule {
    /// Objects (devices, media players, ...) appearing on the bus.
    pub const INTERFACES_ADDED: Self = Self {
        interface: OBJECT_MANAGER_INTERFACE,
        member: INTERFACES_ADDED,
    };

    /// Property changes on existing objects.
    pub const PROPERTIES_CHANGED: Self = Self {
        interface: PROPERTIES_INTERFACE,
        member: PROPERTIES_CHANGED,
    };
}

/// Renders the rule in D-Bus match rule syntax.
impl fmt::Display for SignalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type='signal',interface='{}',member='{}'",
            self.interface, self.member
        )
    }
}

pub type SignalStream = BoxStream<'static, Signal>;

/// Transport used to talk to BlueZ.
///
/// [`Session`] implements this on top of a D-Bus system bus connection.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    /// Returns every object BlueZ currently exports, in the order the bus reports them.
    async fn managed_objects(&self) -> Result<Vec<ManagedObject>>;

    /// Fetches all properties of `interface` on the object at `path`.
    async fn properties(&self, path: &str, interface: &str) -> Result<PropertyMap>;

    /// Invokes the argument-less method `member` of `interface` on the object at `path`.
    async fn call(&self, path: &str, interface: &str, member: &str) -> Result<()>;

    /// Subscribes to the signals selected by `rule`.
    ///
    /// The returned stream ends when the underlying connection goes away.
    async fn subscribe(&self, rule: SignalRule) -> Result<SignalStream>;
}

impl Gateway for Session {
    async fn managed_objects(&self) -> Result<Vec<ManagedObject>> {
        let manager = self.object_manager().await?;
        let objects = manager.get_managed_objects().await.map_err(Error::from)?;
        Ok(objects
            .into_iter()
            .map(|(path, intfs)| ManagedObject {
                path: path.as_str().to_string(),
                interfaces: intfs
                    .iter()
                    .map(|(name, props)| (name.as_str().to_string(), PropertyMap::from(props)))
                    .collect(),
            })
            .collect())
    }

    async fn properties(&self, path: &str, interface: &str) -> Result<PropertyMap> {
        let proxy = PropertiesProxy::builder(&self.conn)
            .destination(BLUEZ_SERVICE)
            .map_err(Error::from)?
            .path(path)
            .map_err(Error::from)?
            .build()
            .await
            .map_err(Error::from)?;
        let interface = InterfaceName::try_from(interface).map_err(Error::from)?;
        let props = proxy.get_all(interface).await.map_err(Error::from)?;
        Ok(PropertyMap::from(&props))
    }

    async fn call(&self, path: &str, interface: &str, member: &str) -> Result<()> {
        self.conn
            .call_method(Some(BLUEZ_SERVICE), path, Some(interface), member, &())
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn subscribe(&self, rule: SignalRule) -> Result<SignalStream> {
        log::debug!("adding match rule {}", rule);

        let match_rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface(rule.interface)
            .map_err(Error::from)?
            .member(rule.member)
            .map_err(Error::from)?
            .build();
        let stream = MessageStream::for_match_rule(match_rule, &self.conn, None)
            .await
            .map_err(Error::from)?;

        Ok(stream
            .filter_map(|message| ready(message.ok().and_then(|msg| decode_signal(&msg))))
            .boxed())
    }
}

/// Decodes the arguments of the signals the crate subscribes to.
///
/// Signals that don't originate from BlueZ objects are dropped. Signals whose body doesn't have
/// the expected shape are passed on with an empty body, leaving it to the listener to discard
/// them.
fn decode_signal(msg: &Message) -> Option<Signal> {
    let path = msg.path()?;
    let member = msg.member()?;

    let body = match member.as_str() {
        INTERFACES_ADDED => {
            match msg.body::<(OwnedObjectPath, HashMap<String, WireProperties>)>() {
                Ok((object, intfs)) => {
                    if !object.as_str().starts_with(PATH_PREFIX) {
                        return None;
                    }

                    let mut intfs = intfs.iter().collect::<Vec<_>>();
                    intfs.sort_by(|a, b| a.0.cmp(b.0));
                    let intfs = intfs
                        .into_iter()
                        .map(|(name, props)| (name.clone(), PropertyValue::Map(props.into())))
                        .collect::<PropertyMap>();
                    vec![
                        PropertyValue::Str(object.as_str().to_string()),
                        PropertyValue::Map(intfs),
                    ]
                }
                Err(e) => {
                    log::debug!("undecodable {} signal on {}: {}", INTERFACES_ADDED, path, e);
                    Vec::new()
                }
            }
        }
        PROPERTIES_CHANGED => {
            if !path.as_str().starts_with(PATH_PREFIX) {
                return None;
            }

            match msg.body::<(String, WireProperties, Vec<String>)>() {
                Ok((interface, changed, invalidated)) => vec![
                    PropertyValue::Str(interface),
                    PropertyValue::Map((&changed).into()),
                    PropertyValue::Array(invalidated.into_iter().map(PropertyValue::Str).collect()),
                ],
                Err(e) => {
                    log::debug!("undecodable {} signal on {}: {}", PROPERTIES_CHANGED, path, e);
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    };

    Some(Signal {
        path: path.as_str().to_string(),
        member: member.as_str().to_string(),
        body,
    })
}
