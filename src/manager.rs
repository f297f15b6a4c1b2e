use std::time::Instant;

use async_io::Timer;

use crate::{
    address::Address,
    bus::{device_path, Gateway, ADAPTER_INTERFACE, DEVICE_INTERFACE},
    control::Controller,
    device::Device,
    listener::{Handler, Listener},
    registry::Registry,
    resolver::Resolver,
    Config, Error, Result, Session,
};

/// Entry point bundling device tracking, active device resolution and media control around a
/// single [`Gateway`].
///
/// ```no_run
/// # async fn run() -> bluetune::Result<()> {
/// use bluetune::{Config, Manager};
///
/// let manager = Manager::system(Config::default()).await?;
/// manager.refresh().await?;
/// let device = manager.resolve_active().await?;
/// manager.control_media("Pause", device.identifier()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Manager<G = Session> {
    gateway: G,
    config: Config,
    registry: Registry,
    resolver: Resolver,
    controller: Controller,
}

impl Manager<Session> {
    /// Connects to the D-Bus system bus.
    ///
    /// Failing to connect is fatal; there is nothing useful to do without the bus.
    pub async fn system(config: Config) -> Result<Self> {
        Ok(Self::new(Session::new().await?, config))
    }
}

impl<G: Gateway> Manager<G> {
    pub fn new(gateway: G, config: Config) -> Self {
        Self {
            controller: Controller::new(&config),
            gateway,
            config,
            registry: Registry::new(),
            resolver: Resolver::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the shared [`Registry`] of known devices.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns a copy of every known device.
    pub fn devices(&self) -> Vec<Device> {
        self.registry.snapshot()
    }

    pub fn device(&self, identifier: &str) -> Option<Device> {
        self.registry.get(identifier)
    }

    /// Loads all devices BlueZ currently knows about into the registry.
    ///
    /// Call this once at startup; afterwards a running [`Listener`] keeps the registry current.
    pub async fn refresh(&self) -> Result<usize> {
        self.registry.refresh_all(&self.gateway).await
    }

    /// Like [`Manager::refresh`], but also announces every device found to
    /// [`Handler::on_device_discovered`], the same way a running [`Listener`] announces devices
    /// that show up later.
    pub async fn refresh_with<H: Handler>(&self, mut handler: H) -> Result<usize> {
        self.registry
            .refresh_with(&self.gateway, |device| handler.on_device_discovered(device))
            .await
    }

    /// Subscribes to bus notifications. The returned [`Listener`] feeds this manager's registry.
    pub async fn listener(&self) -> Result<Listener> {
        Listener::subscribe(&self.gateway, self.registry.clone(), &self.config).await
    }

    /// See [`Resolver::resolve`].
    pub async fn resolve_active(&self) -> Result<Device> {
        self.resolver.resolve(&self.gateway).await
    }

    /// Returns the device picked by the last successful [`Manager::resolve_active`].
    pub fn active_device(&self) -> Option<Device> {
        self.resolver.current()
    }

    /// See [`Controller::control_media`].
    pub async fn control_media(&self, action: &str, identifier: &str) -> Result<()> {
        self.controller
            .control_media(&self.gateway, action, identifier)
            .await
    }

    /// Sends `action` to the active device.
    ///
    /// The active device is resolved first. If nothing is playing right now, the previously
    /// active device is used instead, so that eg. `Play` still reaches a paused device.
    pub async fn control_active(&self, action: &str) -> Result<Device> {
        let device = match self.resolver.resolve(&self.gateway).await {
            Ok(device) => device,
            Err(e) if e.is_no_active_device() => self.resolver.current().ok_or(e)?,
            Err(e) => return Err(e),
        };

        self.control_media(action, device.identifier()).await?;
        Ok(device)
    }

    /// Starts device discovery on the configured adapter.
    pub async fn start_discovery(&self) -> Result<()> {
        self.gateway
            .call(&self.config.adapter_path(), ADAPTER_INTERFACE, "StartDiscovery")
            .await
            .map_err(|e| e.context("failed to start discovery"))
    }

    /// Stops device discovery on the configured adapter.
    pub async fn stop_discovery(&self) -> Result<()> {
        self.gateway
            .call(&self.config.adapter_path(), ADAPTER_INTERFACE, "StopDiscovery")
            .await
            .map_err(|e| e.context("failed to stop discovery"))
    }

    /// Connects to a paired device and waits until BlueZ reports it as connected.
    ///
    /// Does nothing if the device is already connected. The connection state is polled every
    /// [`Config::poll_interval`] for at most [`Config::timeout`].
    ///
    /// # Errors
    ///
    /// Devices known to be unpaired are refused, since pairing is not handled here. A
    /// [`Error::is_timeout`] error is returned if the device doesn't connect in time.
    pub async fn connect_device(&self, identifier: &str) -> Result<()> {
        let address = identifier.parse::<Address>().map_err(Error::from)?;
        let path = device_path(&self.config.adapter_path(), &address);

        let device = self.fetch_device(&path).await?;
        if device.is_connected() {
            return Ok(());
        }
        if device.paired() == Some(false) {
            return Err(Error::from(format!("device {} is not paired", address)));
        }

        log::debug!("connecting to {}", address);
        self.gateway
            .call(&path, DEVICE_INTERFACE, "Connect")
            .await
            .map_err(|e| e.context("failed to establish connection"))?;

        let deadline = Instant::now() + self.config.timeout();
        loop {
            if self.fetch_device(&path).await?.is_connected() {
                log::debug!("connected to {}", address);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(format!("connecting to {}", address)));
            }
            Timer::after(self.config.poll_interval()).await;
        }
    }

    /// Connects every paired but disconnected device in the registry.
    ///
    /// Returns the outcome for each device that was attempted.
    pub async fn connect_paired(&self) -> Vec<(Device, Result<()>)> {
        let mut outcomes = Vec::new();
        for device in self.registry.snapshot() {
            if !device.is_paired() || device.is_connected() {
                continue;
            }

            let result = self.connect_device(device.identifier()).await;
            if let Err(e) = &result {
                log::warn!("failed to connect to {}: {}", device.identifier(), e);
            }
            outcomes.push((device, result));
        }
        outcomes
    }

    /// Reads the current `Device1` properties and records them in the registry.
    async fn fetch_device(&self, path: &str) -> Result<Device> {
        let props = self
            .gateway
            .properties(path, DEVICE_INTERFACE)
            .await
            .map_err(|e| e.context("failed to read device properties"))?;
        let device = Device::parse(path, &props)
            .ok_or_else(|| Error::from(format!("no valid device at {}", path)))?;
        Ok(self.registry.upsert(device))
    }
}
