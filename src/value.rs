//! Dynamically typed property values.
//!
//! BlueZ publishes object state as D-Bus variants. This module narrows them down to the handful of
//! shapes the Bluetooth stack actually produces, so that the rest of the crate can match on a
//! closed [`PropertyValue`] instead of carrying raw `zvariant` values around.

use core::fmt;
use std::collections::HashMap;

use serde::{
    de::{MapAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serialize, Serializer,
};
use zbus::zvariant::{OwnedValue, Signature, Type, Value};

/// A decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    /// Any D-Bus integer type, widened.
    Int(i64),
    /// Strings, object paths and signatures.
    Str(String),
    Array(Vec<PropertyValue>),
    /// A nested `a{sv}` dictionary, such as the `Track` metadata of a media player.
    Map(PropertyMap),
    /// A payload outside of the supported set. Carries the D-Bus signature of the original value.
    Unsupported(String),
}

impl PropertyValue {
    /// Returns the [`ValueKind`] describing this value's runtime type.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Str(_) => ValueKind::Str,
            Self::Array(_) => ValueKind::Array,
            Self::Map(_) => ValueKind::Map,
            Self::Unsupported(_) => ValueKind::Unsupported,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for PropertyValue {
            fn from(value: $t) -> Self {
                Self::Int(value.into())
            }
        }
    )*};
}

from_int!(u8, i16, u16, i32, u32, i64);

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(value: PropertyMap) -> Self {
        Self::Map(value)
    }
}

impl From<&Value<'_>> for PropertyValue {
    fn from(value: &Value<'_>) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::U8(v) => Self::Int((*v).into()),
            Value::I16(v) => Self::Int((*v).into()),
            Value::U16(v) => Self::Int((*v).into()),
            Value::I32(v) => Self::Int((*v).into()),
            Value::U32(v) => Self::Int((*v).into()),
            Value::I64(v) => Self::Int(*v),
            Value::U64(v) => match i64::try_from(*v) {
                Ok(v) => Self::Int(v),
                Err(_) => Self::Unsupported("t".to_string()),
            },
            Value::Str(s) => Self::Str(s.as_str().to_string()),
            Value::ObjectPath(p) => Self::Str(p.as_str().to_string()),
            Value::Signature(s) => Self::Str(s.as_str().to_string()),
            Value::Value(inner) => Self::from(&**inner),
            Value::Array(array) => Self::Array(array.get().iter().map(Self::from).collect()),
            Value::Dict(dict) => match HashMap::<String, OwnedValue>::try_from(dict.clone()) {
                Ok(entries) => {
                    // The dictionary's wire order is lost at this point; sort so that nested maps
                    // at least compare and print deterministically.
                    let mut entries = entries.into_iter().collect::<Vec<_>>();
                    entries.sort_by(|a, b| a.0.cmp(&b.0));
                    Self::Map(
                        entries
                            .iter()
                            .map(|(k, v)| (k.clone(), Self::from(&**v)))
                            .collect(),
                    )
                }
                Err(_) => Self::Unsupported(value.value_signature().as_str().to_string()),
            },
            other => Self::Unsupported(other.value_signature().as_str().to_string()),
        }
    }
}

impl From<&OwnedValue> for PropertyValue {
    fn from(value: &OwnedValue) -> Self {
        Self::from(&**value)
    }
}

/// Serializes as the plain payload (`true`, `42`, `"playing"`, a list or an object).
/// [`PropertyValue::Unsupported`] becomes `null`.
impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Self::Map(map) => map.serialize(serializer),
            Self::Unsupported(_) => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => b.fmt(f),
            Self::Int(i) => i.fmt(f),
            Self::Str(s) => f.write_str(s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
            Self::Map(map) => map.fmt(f),
            Self::Unsupported(sig) => write!(f, "<{}>", sig),
        }
    }
}

/// Describes the runtime type of a [`PropertyValue`].
///
/// Serializes to the same names as its [`Display`][fmt::Display] output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    #[serde(rename = "string")]
    Str,
    Array,
    Map,
    Unsupported,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Unsupported => "unsupported",
        })
    }
}

/// A property-name to [`PropertyValue`] mapping that remembers insertion order.
///
/// Property sets are small, so lookups are linear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts or replaces a property. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style variant of [`PropertyMap::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_str)
    }

    pub(crate) fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropertyValue::as_bool)
    }

    pub(crate) fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropertyValue::as_int)
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyValue);
    type IntoIter = std::vec::IntoIter<(String, PropertyValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<&HashMap<String, OwnedValue>> for PropertyMap {
    fn from(props: &HashMap<String, OwnedValue>) -> Self {
        let mut entries = props.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(k, v)| (k.clone(), PropertyValue::from(v)))
            .collect()
    }
}

/// Serializes as a map, in insertion order.
impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        f.write_str("}")
    }
}

/// An `a{sv}` dictionary decoded straight off the wire, keeping the sender's entry order.
///
/// `HashMap` would scramble the order in which a `PropertiesChanged` signal lists its properties,
/// and handlers are promised one callback per property in arrival order.
#[derive(Debug, Default)]
pub(crate) struct WireProperties(Vec<(String, OwnedValue)>);

impl Type for WireProperties {
    fn signature() -> Signature<'static> {
        Signature::from_static_str_unchecked("a{sv}")
    }
}

impl<'de> Deserialize<'de> for WireProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = WireProperties;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dictionary of string keys to variants")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, value)) = map.next_entry::<String, OwnedValue>()? {
                    entries.push((name, value));
                }
                Ok(WireProperties(entries))
            }
        }

        deserializer.deserialize_map(EntryVisitor)
    }
}

impl From<&WireProperties> for PropertyMap {
    fn from(props: &WireProperties) -> Self {
        props
            .0
            .iter()
            .map(|(k, v)| (k.clone(), PropertyValue::from(v)))
            .collect()
    }
}
