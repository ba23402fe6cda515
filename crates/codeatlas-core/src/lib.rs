use serde::{Deserialize, Serialize};
use std::fmt;

pub use glam::Vec2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub src: NodeKey,
    pub tar: NodeKey,
}

impl EdgeKey {
    pub fn new(src: impl Into<NodeKey>, tar: impl Into<NodeKey>) -> Self {
        Self {
            src: src.into(),
            tar: tar.into(),
        }
    }

    pub fn touches(&self, key: &NodeKey) -> bool {
        &self.src == key || &self.tar == key
    }

    pub fn shares_endpoint(&self, other: &EdgeKey) -> bool {
        self.touches(&other.src) || self.touches(&other.tar)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.tar)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "data")]
pub enum Selectable {
    Node(NodeKey),
    Edge(EdgeKey),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Variable,
    #[default]
    Other,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Variable => "variable",
            Self::Other => "other",
        }
    }

    // Functions and methods both take part in call ordering.
    pub fn is_function(self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub key: NodeKey,
    pub name: String,
    #[serde(default)]
    pub kind: SymbolKind,
    #[serde(default)]
    pub line_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Reference {
    pub kind: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SchemeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl SchemeColor {
    // `hue` in degrees, saturation and value in 0..=1.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = value * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = value - c;
        let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: to_u8(r),
            g: to_u8(g),
            b: to_u8(b),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum SurfaceEvent {
    NodeAdded(NodeKey),
    NodeRemoved(NodeKey),
    EdgeAdded(EdgeKey),
    EdgeRemoved(EdgeKey),
    LayoutDirty,
    SchemesInvalidated,
    SymbolDetail { title: String, comment: String },
    AdvancePositions,
}
