//! Host-native object model and the `Host` trait.
//!
//! The design tool owns the real objects; this module describes the slice of
//! them the builder writes and the serializer reads. Objects are addressed by
//! [`HostId`] and edited through [`HostMutation`]s so every property write
//! goes through one place where the host can enforce its contracts (e.g. a
//! text object's font must be loaded before its characters change).

use crate::error::HostError;
use crate::id::HostId;
use crate::model::FontName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Host object types. Only some of them map onto scene nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostKind {
    Page,
    Frame,
    Group,
    Rectangle,
    Ellipse,
    Text,
    Vector,
    Line,
    Star,
    Polygon,
    Component,
    Instance,
}

/// Plain RGB as stored inside host paints (alpha lives on the paint).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// RGBA used by effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f32,
    pub color: Rgba,
}

/// A fill paint slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostPaint {
    Solid { color: Rgb, opacity: f32 },
    GradientLinear { stops: Vec<GradientStop>, opacity: f32 },
    Image { image_hash: String, opacity: f32 },
}

impl HostPaint {
    pub const fn solid(color: Rgb) -> Self {
        HostPaint::Solid {
            color,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    Normal,
    Multiply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    DropShadow {
        color: Rgba,
        offset_x: f32,
        offset_y: f32,
        radius: f32,
        spread: f32,
        visible: bool,
        blend_mode: BlendMode,
        show_shadow_behind_node: bool,
    },
    LayerBlur {
        radius: f32,
        visible: bool,
    },
}

/// Text-specific state of a host text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub characters: String,
    pub font_name: FontName,
    pub font_size: f32,
}

/// Snapshot of one host object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostObject {
    pub id: HostId,
    pub name: String,
    pub kind: HostKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fills: SmallVec<[HostPaint; 1]>,
    pub stroke_weight: f32,
    pub corner_radius: f32,
    pub effects: SmallVec<[Effect; 1]>,
    pub text: Option<TextContent>,
    /// Children in stacking order (bottom first).
    pub children: Vec<HostId>,
}

impl HostObject {
    pub fn new(id: HostId, kind: HostKind) -> Self {
        Self {
            id,
            name: String::new(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            fills: SmallVec::new(),
            stroke_weight: 0.0,
            corner_radius: 0.0,
            effects: SmallVec::new(),
            text: None,
            children: Vec::new(),
        }
    }
}

/// A single property write on a host object.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMutation {
    SetName(String),
    SetPosition { x: f32, y: f32 },
    Resize { width: f32, height: f32 },
    SetFills(SmallVec<[HostPaint; 1]>),
    SetStrokeWeight(f32),
    SetCornerRadius(f32),
    SetEffects(SmallVec<[Effect; 1]>),
    /// Requires the object's current font to be loaded.
    SetCharacters(String),
    /// Requires the new font to be loaded.
    SetFontName(FontName),
    /// Requires the object's current font to be loaded.
    SetFontSize(f32),
}

/// The design tool runtime, as seen by the builder, serializer and bridge.
///
/// Everything except font loading is synchronous, matching the host API.
#[async_trait]
pub trait Host: Send + Sync {
    /// Create a detached object of `kind`, initialised from the host's template.
    fn create(&self, kind: HostKind) -> Result<HostId, HostError>;

    fn apply(&self, id: HostId, mutation: HostMutation) -> Result<(), HostError>;

    /// Wrap `children` in a new group appended to `parent`.
    fn group(&self, children: &[HostId], parent: HostId) -> Result<HostId, HostError>;

    /// Append `child` as the top-most child of `parent`, detaching it first.
    fn append_child(&self, parent: HostId, child: HostId) -> Result<(), HostError>;

    /// Remove an object and all its descendants.
    fn remove(&self, id: HostId) -> Result<(), HostError>;

    fn snapshot(&self, id: HostId) -> Result<HostObject, HostError>;

    /// Resolve a font so font-dependent properties may be set.
    async fn load_font(&self, font: &FontName) -> Result<(), HostError>;

    fn current_page(&self) -> HostId;

    fn selection(&self) -> Vec<HostId>;

    fn scroll_into_view(&self, ids: &[HostId]);

    /// Show a short message to the operator.
    fn notify(&self, message: &str);
}
