//! Scene description model.
//!
//! A scene is an ordered list of [`Node`]s. Each node is a tagged variant
//! (`"type": "RECTANGLE"`, `"TEXT"`, ...) carrying a `name` and a
//! type-specific payload. The JSON shape mirrors what the design tool plugin
//! sends and receives; it is not ours to redesign.
//! Order is stacking order: later nodes sit above earlier ones.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGB(A) color with components in [0.0, 1.0]. Ranges are not validated.
///
/// `b` defaults to zero so two-component colors (`{r, g}`) still decode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    #[serde(default)]
    pub b: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<f32>,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: None }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a: Some(a) }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The leading `#` is optional. Alpha is only set when given.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let short = |i: usize| hex_val(bytes[i]).map(|v| (v * 17) as f32 / 255.0);
        let long = |i: usize| {
            let hi = hex_val(bytes[i])?;
            let lo = hex_val(bytes[i + 1])?;
            Some((hi * 16 + lo) as f32 / 255.0)
        };

        match bytes.len() {
            3 => Some(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgb(long(0)?, long(2)?, long(4)?)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when a non-opaque alpha is present.
    pub fn to_hex(&self) -> String {
        let r = (self.r.clamp(0.0, 1.0) * 255.0).round() as u8;
        let g = (self.g.clamp(0.0, 1.0) * 255.0).round() as u8;
        let b = (self.b.clamp(0.0, 1.0) * 255.0).round() as u8;
        match self.a.map(|a| (a.clamp(0.0, 1.0) * 255.0).round() as u8) {
            None | Some(255) => format!("#{r:02X}{g:02X}{b:02X}"),
            Some(a) => format!("#{r:02X}{g:02X}{b:02X}{a:02X}"),
        }
    }
}

// ─── Geometry / Typography ───────────────────────────────────────────────

/// Canvas position in host units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Font descriptor as the host names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl Default for FontName {
    fn default() -> Self {
        Self::new("Inter", "Regular")
    }
}

impl std::fmt::Display for FontName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

// ─── Node payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectangleSpec {
    pub position: Position,
    pub color: Color,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
    /// Vertical offset of the drop shadow; zero or absent means no shadow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_shadow: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EllipseSpec {
    pub position: Position,
    pub color: Color,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpec {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<FontName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSpec {
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// The `type` tags a scene node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Rectangle,
    Ellipse,
    Text,
    Group,
    Frame,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Rectangle,
        NodeType::Ellipse,
        NodeType::Text,
        NodeType::Group,
        NodeType::Frame,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Rectangle => "RECTANGLE",
            NodeType::Ellipse => "ELLIPSE",
            NodeType::Text => "TEXT",
            NodeType::Group => "GROUP",
            NodeType::Frame => "FRAME",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Group | NodeType::Frame)
    }
}

/// One visual node of a scene description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Node {
    Rectangle { name: String, node: RectangleSpec },
    Ellipse { name: String, node: EllipseSpec },
    Text { name: String, text: TextSpec },
    Group { name: String, node: GroupSpec },
    Frame { name: String, node: FrameSpec },
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Rectangle { name, .. }
            | Node::Ellipse { name, .. }
            | Node::Text { name, .. }
            | Node::Group { name, .. }
            | Node::Frame { name, .. } => name,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Rectangle { .. } => NodeType::Rectangle,
            Node::Ellipse { .. } => NodeType::Ellipse,
            Node::Text { .. } => NodeType::Text,
            Node::Group { .. } => NodeType::Group,
            Node::Frame { .. } => NodeType::Frame,
        }
    }

    /// Child nodes in stacking order (empty for leaves).
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Group { node, .. } => &node.children,
            Node::Frame { node, .. } => &node.children,
            _ => &[],
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Node::Rectangle { node, .. } => Some(node.position),
            Node::Ellipse { node, .. } => Some(node.position),
            Node::Text { text, .. } => text.position,
            Node::Group { node, .. } => node.position,
            Node::Frame { node, .. } => node.position,
        }
    }

    /// Depth-first pre-order visit of this node and its descendants.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}

/// An ordered sequence of top-level nodes.
pub type Scene = Vec<Node>;

/// Total number of nodes in a scene, descendants included.
pub fn node_count(scene: &[Node]) -> usize {
    let mut count = 0;
    for node in scene {
        node.walk(&mut |_| count += 1);
    }
    count
}

// ─── Parsing ─────────────────────────────────────────────────────────────

/// Parse scene JSON: either an array of nodes or a single node object.
///
/// Tags are checked before the typed decode so an unknown `type` is reported
/// by name and path instead of as a generic shape error.
pub fn parse_scene(input: &str) -> Result<Scene, ParseError> {
    let value: Value = serde_json::from_str(input)?;
    scene_from_value(value)
}

/// Same as [`parse_scene`], for an already-decoded JSON value.
pub fn scene_from_value(value: Value) -> Result<Scene, ParseError> {
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => return Err(ParseError::NotAScene(json_kind(&other))),
    };

    for (i, item) in items.iter().enumerate() {
        check_tags(item, &format!("[{i}]"))?;
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|source| ParseError::Shape {
                path: format!("[{i}]"),
                source,
            })
        })
        .collect()
}

fn check_tags(value: &Value, path: &str) -> Result<(), ParseError> {
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingType {
            path: path.to_string(),
        })?;
    let node_type = NodeType::from_tag(tag).ok_or_else(|| ParseError::UnknownNodeType {
        path: path.to_string(),
        tag: tag.to_string(),
    })?;

    if node_type.is_container()
        && let Some(children) = value
            .get("node")
            .and_then(|n| n.get("children"))
            .and_then(Value::as_array)
    {
        for (i, child) in children.iter().enumerate() {
            check_tags(child, &format!("{path}.node.children[{i}]"))?;
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
