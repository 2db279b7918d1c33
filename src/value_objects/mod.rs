//! Editor value objects
//!
//! Value objects are immutable types shared by the semantic and visual layers.
//! They are compared by value rather than identity and encapsulate validation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Text keyed by language code ("en", "cs", ...)
///
/// Backed by a `BTreeMap` so iteration (and therefore label fallback) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageString(BTreeMap<String, String>);

impl LanguageString {
    /// Create an empty language string
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a language string holding a single translation
    pub fn with(language: impl Into<String>, text: impl Into<String>) -> Self {
        let mut value = Self::new();
        value.insert(language, text);
        value
    }

    /// Set the text for a language
    pub fn insert(&mut self, language: impl Into<String>, text: impl Into<String>) {
        self.0.insert(language.into(), text.into());
    }

    /// Get the text for a language
    pub fn get(&self, language: &str) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    /// Text in the preferred language, falling back to the first available one
    pub fn preferred(&self, language: &str) -> Option<&str> {
        self.get(language)
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<L: Into<String>, T: Into<String>> FromIterator<(L, T)> for LanguageString {
    fn from_iter<I: IntoIterator<Item = (L, T)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(language, text)| (language.into(), text.into()))
                .collect(),
        )
    }
}

/// Cardinality of a relationship end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    /// `None` means unbounded
    pub max: Option<u32>,
}

impl Cardinality {
    /// Create a new cardinality, rejecting `min > max`
    pub fn new(min: u32, max: Option<u32>) -> Result<Self, String> {
        if let Some(max) = max {
            if min > max {
                return Err(format!("Cardinality minimum {min} exceeds maximum {max}"));
            }
        }
        Ok(Self { min, max })
    }

    pub const ONE: Cardinality = Cardinality {
        min: 1,
        max: Some(1),
    };
    pub const OPTIONAL: Cardinality = Cardinality {
        min: 0,
        max: Some(1),
    };
    pub const MANY: Cardinality = Cardinality { min: 0, max: None };
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

/// Position of a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    /// Anchored nodes are left alone by automatic layout
    #[serde(default)]
    pub anchored: bool,
}

impl Position {
    /// Create a new, non-anchored position
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            anchored: false,
        }
    }

    /// Whether two positions point at the same canvas location
    pub fn same_location(&self, other: &Position) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Intermediate point an edge is routed through
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Represents a color value, serialized as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Create a new color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` string
    pub fn from_hex(value: &str) -> Result<Self, String> {
        let digits = value
            .strip_prefix('#')
            .ok_or_else(|| format!("Color must start with '#': {value}"))?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(format!("Color must have six hex digits: {value}"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| format!("Invalid hex digits in color: {value}"))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Format as `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}
