use std::time::Duration;

use crate::bus;

/// Settings shared by the [`Manager`][crate::Manager] and the components it creates.
///
/// ```
/// # use bluetune::Config;
/// # use std::time::Duration;
/// let config = Config::default()
///     .adapter("hci1")
///     .debug(true)
///     .connect_timeout(Duration::from_secs(5));
/// assert_eq!(config.adapter_path(), "/org/bluez/hci1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    adapter: String,
    debug: bool,
    connect_timeout: Duration,
    connect_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapter: "hci0".to_string(),
            debug: false,
            connect_timeout: Duration::from_secs(10),
            connect_poll_interval: Duration::from_millis(500),
        }
    }
}

impl Config {
    /// Selects the adapter by its device name (default: `hci0`).
    pub fn adapter(mut self, name: impl Into<String>) -> Self {
        self.adapter = name.into();
        self
    }

    /// Logs every received signal and outgoing call at `debug` instead of `trace` level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Upper bound on how long [`Manager::connect_device`] waits for a connection to come up.
    ///
    /// [`Manager::connect_device`]: crate::Manager::connect_device
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// How often the connection state is checked while connecting.
    pub fn connect_poll_interval(mut self, interval: Duration) -> Self {
        self.connect_poll_interval = interval;
        self
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter
    }

    /// Returns the object path of the configured adapter (eg. `/org/bluez/hci0`).
    pub fn adapter_path(&self) -> String {
        bus::adapter_path(&self.adapter)
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.connect_poll_interval
    }

    /// Level at which raw bus traffic is logged.
    pub(crate) fn traffic_level(&self) -> log::Level {
        if self.debug {
            log::Level::Debug
        } else {
            log::Level::Trace
        }
    }
}
