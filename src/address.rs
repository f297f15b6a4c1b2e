//! Bluetooth device addresses.
//!
//! BlueZ reports addresses as colon-separated hex (`AA:BB:CC:DD:EE:FF`) but encodes them with
//! underscores inside object paths (`/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF`). [`Address`] accepts
//! both spellings and always displays the colon form.

use core::fmt;
use std::{fmt::Write, num::ParseIntError, str::FromStr, sync::OnceLock};

use regex::Regex;

/// Identifier reported when an object path does not encode a device address.
pub const UNKNOWN_DEVICE: &str = "Unknown";

/// A 6-Byte Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 6]);

impl Address {
    /// Returns the address in the form used by BlueZ object paths (`AA_BB_CC_DD_EE_FF`).
    pub fn to_path_segment(&self) -> String {
        self.to_string().replace(':', "_")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_char(':')?;
            }

            write!(f, "{:02X}", byte)?;
        }

        Ok(())
    }
}

/// Parses a Bluetooth [`Address`] from a hex string separated by either `:` or `_`.
///
/// Example: `aa:ff:00:33:22:11`, `AA_FF_00_33_22_11`
impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 6];
        for (i, s) in s.splitn(6, [':', '_']).enumerate() {
            if s.len() != 2 {
                return Err(ParseAddressError::other());
            }
            bytes[i] = u8::from_str_radix(s, 16).map_err(ParseAddressError::parse_int)?;
            if i == bytes.len() - 1 {
                return Ok(Address(bytes));
            }
        }

        Err(ParseAddressError::other())
    }
}

/// Extracts the device identifier encoded somewhere in `path`.
///
/// The first run of six two-digit hex octets separated by `:` or `_` wins. The result is
/// normalized to the canonical uppercase, colon-separated form. Paths that don't contain an
/// address yield [`UNKNOWN_DEVICE`].
pub fn extract_identifier(path: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"[0-9A-Fa-f]{2}(?:[:_][0-9A-Fa-f]{2}){5}").expect("address pattern is valid")
    });

    match pattern.find(path) {
        Some(m) => m.as_str().replace('_', ":").to_ascii_uppercase(),
        None => UNKNOWN_DEVICE.to_string(),
    }
}

/// The error type returned by the [`FromStr`] implementation of [`Address`].
#[derive(Debug)]
pub struct ParseAddressError(ParseAddressErrorKind);

impl fmt::Display for ParseAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ParseAddressErrorKind::ParseInt(e) => e.fmt(f),
            ParseAddressErrorKind::Other => f.write_str("invalid device address"),
        }
    }
}

impl std::error::Error for ParseAddressError {}

#[derive(Debug)]
enum ParseAddressErrorKind {
    ParseInt(ParseIntError),
    Other,
}

impl ParseAddressError {
    fn parse_int(e: ParseIntError) -> Self {
        Self(ParseAddressErrorKind::ParseInt(e))
    }

    fn other() -> Self {
        Self(ParseAddressErrorKind::Other)
    }
}
