//! BlueZ device tracking, media-player events and playback control.
//!
//! The crate turns the loosely typed objects BlueZ exports over D-Bus into a typed [`Device`] and
//! [`Event`] model, keeps a live [`Registry`] of known devices, figures out which connected device
//! is currently playing audio, and sends playback commands to it.
//!
//! [`Manager`] bundles everything behind one handle; the individual pieces can also be used on
//! their own with any [`Gateway`] implementation.
//!
//! [`Device`]: device::Device
//! [`Event`]: event::Event
//! [`Registry`]: registry::Registry
//! [`Gateway`]: bus::Gateway

pub mod address;
pub mod bus;
mod config;
pub mod control;
pub mod device;
mod error;
pub mod event;
pub mod listener;
mod manager;
pub mod registry;
pub mod resolver;
pub mod value;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use manager::Manager;

use zbus::{fdo::ObjectManagerProxy, Connection};

/// A cloneable handle to a D-Bus system bus connection.
///
/// This is the production [`Gateway`][bus::Gateway].
#[derive(Clone)]
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Creates a new D-Bus connection.
    pub async fn new() -> Result<Self> {
        Ok(Self {
            conn: Connection::system()
                .await
                .map_err(|e| Error::from(e).context("failed to connect to the system bus"))?,
        })
    }

    /// Connects to the BlueZ D-Bus object manager.
    async fn object_manager(&self) -> Result<ObjectManagerProxy<'static>> {
        Ok(ObjectManagerProxy::builder(&self.conn)
            .destination(bus::BLUEZ_SERVICE)
            .map_err(Error::from)?
            .path("/")
            .map_err(Error::from)?
            .build()
            .await
            .map_err(Error::from)?)
    }
}
