//! Property change [`Event`]s.

use core::fmt;

use serde::Serialize;

use crate::{
    address::extract_identifier,
    value::{PropertyValue, ValueKind},
    Error, Result,
};

/// A single property change reported by BlueZ.
///
/// One `PropertiesChanged` signal touching several properties produces one [`Event`] per
/// property.
///
/// Serializes with camel-cased field names (`device`, `category`, `value`, `valueType`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Identifier of the device the change belongs to, or
    /// [`UNKNOWN_DEVICE`][crate::address::UNKNOWN_DEVICE] if the source object path doesn't encode
    /// an address.
    pub device: String,
    /// Name of the property that changed, eg. `Status`, `Volume`, `Track` or `Connected`.
    pub category: String,
    pub value: PropertyValue,
    pub value_type: ValueKind,
}

impl Event {
    /// Builds an [`Event`] for a change of `property` on the object at `source_path`.
    ///
    /// Never fails; an unrecognizable `source_path` just degrades the device identifier.
    pub fn parse(property: &str, source_path: &str, value: PropertyValue) -> Self {
        Self {
            device: extract_identifier(source_path),
            category: property.to_string(),
            value_type: value.kind(),
            value,
        }
    }

    /// Renders the event as a single-line JSON object.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {} ({})",
            self.device, self.category, self.value, self.value_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{address::UNKNOWN_DEVICE, value::PropertyMap};

    #[test]
    fn player_status() {
        let event = Event::parse(
            "Status",
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/player0",
            "paused".into(),
        );
        assert_eq!(event.device, "AA:BB:CC:DD:EE:FF");
        assert_eq!(event.category, "Status");
        assert_eq!(event.value.as_str(), Some("paused"));
        assert_eq!(event.value_type, ValueKind::Str);
        assert_eq!(event.to_string(), "AA:BB:CC:DD:EE:FF: Status = paused (string)");
    }

    #[test]
    fn track_metadata() {
        let track = PropertyMap::new()
            .with("Title", "Song")
            .with("Artist", "Band");
        let event = Event::parse(
            "Track",
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/player0",
            track.into(),
        );
        assert_eq!(event.value_type, ValueKind::Map);
        assert_eq!(
            event.value.as_map().and_then(|m| m.str("Artist")),
            Some("Band")
        );
    }

    #[test]
    fn json() {
        let status = Event::parse(
            "Status",
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/player0",
            "playing".into(),
        );
        assert_eq!(
            status.to_json().unwrap(),
            r#"{"device":"AA:BB:CC:DD:EE:FF","category":"Status","value":"playing","valueType":"string"}"#
        );

        let track = PropertyMap::new()
            .with("Title", "Song")
            .with("Artist", "Band")
            .with("Duration", 215000u32);
        let track = Event::parse(
            "Track",
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/player0",
            track.into(),
        );
        assert_eq!(
            track.to_json().unwrap(),
            r#"{"device":"AA:BB:CC:DD:EE:FF","category":"Track","value":{"Title":"Song","Artist":"Band","Duration":215000},"valueType":"map"}"#
        );

        let unsupported = Event::parse(
            "Volume",
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/fd0",
            PropertyValue::Unsupported("d".to_string()),
        );
        assert_eq!(
            unsupported.to_json().unwrap(),
            r#"{"device":"AA:BB:CC:DD:EE:FF","category":"Volume","value":null,"valueType":"unsupported"}"#
        );
    }

    #[test]
    fn unknown_source() {
        let event = Event::parse("Powered", "/org/bluez/hci0", true.into());
        assert_eq!(event.device, UNKNOWN_DEVICE);
        assert_eq!(event.value_type, ValueKind::Bool);
    }
}
