//! Playback control through `org.bluez.MediaPlayer1`.

use core::fmt;
use std::str::FromStr;

use crate::{
    address::Address,
    bus::{device_path, player_path, Gateway, MEDIA_PLAYER_INTERFACE},
    Config, Error, Result,
};

/// A playback command supported by `org.bluez.MediaPlayer1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaAction {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    FastForward,
    Rewind,
}

impl MediaAction {
    pub const ALL: [Self; 7] = [
        Self::Play,
        Self::Pause,
        Self::Stop,
        Self::Next,
        Self::Previous,
        Self::FastForward,
        Self::Rewind,
    ];

    /// Returns the D-Bus method name implementing this action.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Play => "Play",
            Self::Pause => "Pause",
            Self::Stop => "Stop",
            Self::Next => "Next",
            Self::Previous => "Previous",
            Self::FastForward => "FastForward",
            Self::Rewind => "Rewind",
        }
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Parses an action from its method name, ignoring ASCII case (`Play`, `play`, `fastforward`).
impl FromStr for MediaAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.method_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::unsupported_action(s))
    }
}

/// Sends playback commands to the media player of a device.
#[derive(Debug, Clone)]
pub struct Controller {
    adapter_path: String,
    level: log::Level,
}

impl Controller {
    pub fn new(config: &Config) -> Self {
        Self {
            adapter_path: config.adapter_path(),
            level: config.traffic_level(),
        }
    }

    /// Returns the object path of the media player of the device with the given address.
    pub fn player_path(&self, address: &Address) -> String {
        player_path(&device_path(&self.adapter_path, address))
    }

    /// Invokes `action` (eg. `"Play"`) on the media player of the device identified by
    /// `identifier`.
    ///
    /// The action is checked against [`MediaAction`] before anything is sent. `identifier` may
    /// use either `:` or `_` as separator.
    ///
    /// # Errors
    ///
    /// Unsupported actions and malformed identifiers are rejected without a bus call. Failures
    /// reported by BlueZ are returned as `failed to <action>: <cause>`. Nothing is retried.
    pub async fn control_media<G: Gateway>(
        &self,
        gateway: &G,
        action: &str,
        identifier: &str,
    ) -> Result<()> {
        let action = action.parse::<MediaAction>()?;
        let address = identifier.parse::<Address>().map_err(Error::from)?;
        self.dispatch(gateway, action, &address).await
    }

    /// Typed variant of [`Controller::control_media`].
    pub async fn dispatch<G: Gateway>(
        &self,
        gateway: &G,
        action: MediaAction,
        address: &Address,
    ) -> Result<()> {
        let path = self.player_path(address);
        log::log!(self.level, "calling {} on {}", action, path);

        gateway
            .call(&path, MEDIA_PLAYER_INTERFACE, action.method_name())
            .await
            .map_err(|e| {
                e.context(format!(
                    "failed to {}",
                    action.method_name().to_ascii_lowercase()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBus;

    #[test]
    fn parse_actions() {
        assert_eq!("Play".parse::<MediaAction>().unwrap(), MediaAction::Play);
        assert_eq!("pause".parse::<MediaAction>().unwrap(), MediaAction::Pause);
        assert_eq!(
            "fastforward".parse::<MediaAction>().unwrap(),
            MediaAction::FastForward
        );
        assert!("Eject"
            .parse::<MediaAction>()
            .unwrap_err()
            .is_unsupported_action());
    }

    #[test]
    fn play() {
        let bus = FakeBus::new();
        let controller = Controller::new(&Config::default());
        pollster::block_on(controller.control_media(&bus, "Play", "AA:BB:CC:DD:EE:FF")).unwrap();
        assert_eq!(
            bus.calls(),
            ["/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/player0 org.bluez.MediaPlayer1.Play"]
        );
    }

    #[test]
    fn accepts_path_style_identifier() {
        let bus = FakeBus::new();
        let controller = Controller::new(&Config::default().adapter("hci1"));
        pollster::block_on(controller.control_media(&bus, "Next", "aa_bb_cc_dd_ee_ff")).unwrap();
        assert_eq!(
            bus.calls(),
            ["/org/bluez/hci1/dev_AA_BB_CC_DD_EE_FF/player0 org.bluez.MediaPlayer1.Next"]
        );
    }

    #[test]
    fn wraps_transport_errors() {
        let bus = FakeBus::new().fail_call("Play", "org.bluez.Error.Failed: not connected");
        let controller = Controller::new(&Config::default());
        let err = pollster::block_on(controller.control_media(&bus, "Play", "AA:BB:CC:DD:EE:FF"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to play: org.bluez.Error.Failed: not connected"
        );
        assert_eq!(bus.calls().len(), 1);
    }

    #[test]
    fn rejects_before_dispatch() {
        let bus = FakeBus::new();
        let controller = Controller::new(&Config::default());

        let err = pollster::block_on(controller.control_media(&bus, "Eject", "AA:BB:CC:DD:EE:FF"))
            .unwrap_err();
        assert!(err.is_unsupported_action());

        pollster::block_on(controller.control_media(&bus, "Play", "AA:BB:CC")).unwrap_err();

        assert!(bus.calls().is_empty());
    }
}
