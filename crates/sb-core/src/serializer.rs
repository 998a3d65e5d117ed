//! Scene serializer: host objects → scene description.
//!
//! The mapping is lossy. Only the first fill's color survives, and of a drop
//! shadow only its vertical offset is kept, so serializing a built scene is
//! not guaranteed to give back the input.

use crate::error::SerializeError;
use crate::host::{Effect, Host, HostKind, HostObject, HostPaint, TextContent};
use crate::id::HostId;
use crate::model::{
    Color, EllipseSpec, FrameSpec, GroupSpec, Node, Position, RectangleSpec, Scene, TextSpec,
};

/// Serialize the host's current selection, in selection order.
pub fn serialize_selection<H: Host + ?Sized>(host: &H) -> Result<Scene, SerializeError> {
    serialize_nodes(host, &host.selection())
}

pub fn serialize_nodes<H: Host + ?Sized>(
    host: &H,
    ids: &[HostId],
) -> Result<Scene, SerializeError> {
    ids.iter().map(|id| serialize_node(host, *id)).collect()
}

/// Serialize one host object and, for containers, its children in order.
pub fn serialize_node<H: Host + ?Sized>(host: &H, id: HostId) -> Result<Node, SerializeError> {
    let obj = host.snapshot(id)?;
    log::trace!("SERIALIZE {:?} {id} `{}`", obj.kind, obj.name);

    let node = match obj.kind {
        HostKind::Rectangle => {
            let (color, opacity) = first_fill(&obj);
            Node::Rectangle {
                node: RectangleSpec {
                    position: position_of(&obj),
                    color: color.unwrap_or(Color::BLACK),
                    width: obj.width,
                    height: obj.height,
                    opacity: opacity.filter(|o| *o != 1.0),
                    stroke_weight: non_zero(obj.stroke_weight),
                    corner_radius: non_zero(obj.corner_radius),
                    drop_shadow: shadow_offset_y(&obj),
                },
                name: obj.name,
            }
        }
        HostKind::Ellipse => {
            let (color, opacity) = first_fill(&obj);
            Node::Ellipse {
                node: EllipseSpec {
                    position: position_of(&obj),
                    color: color.unwrap_or(Color::BLACK),
                    width: obj.width,
                    height: obj.height,
                    opacity: opacity.filter(|o| *o != 1.0),
                },
                name: obj.name,
            }
        }
        HostKind::Text => {
            // Text keeps alpha on the color itself.
            let (color, opacity) = first_fill(&obj);
            let color = color.unwrap_or(Color::BLACK);
            let text = obj.text.clone().unwrap_or_else(|| TextContent {
                characters: String::new(),
                font_name: Default::default(),
                font_size: 0.0,
            });
            Node::Text {
                text: TextSpec {
                    content: text.characters,
                    font_size: Some(text.font_size),
                    color: Some(Color::rgba(
                        color.r,
                        color.g,
                        color.b,
                        opacity.unwrap_or(1.0),
                    )),
                    font_name: Some(text.font_name),
                    position: Some(position_of(&obj)),
                },
                name: obj.name,
            }
        }
        HostKind::Group => Node::Group {
            node: GroupSpec {
                children: serialize_nodes(host, &obj.children)?,
                position: Some(position_of(&obj)),
            },
            name: obj.name,
        },
        HostKind::Frame => Node::Frame {
            node: FrameSpec {
                children: serialize_nodes(host, &obj.children)?,
                position: Some(position_of(&obj)),
                width: Some(obj.width),
                height: Some(obj.height),
            },
            name: obj.name,
        },
        kind => return Err(SerializeError::UnsupportedHostType { id, kind }),
    };
    Ok(node)
}

fn position_of(obj: &HostObject) -> Position {
    Position::new(obj.x, obj.y)
}

/// Color (without alpha) and opacity of the first fill, if it is solid.
fn first_fill(obj: &HostObject) -> (Option<Color>, Option<f32>) {
    match obj.fills.first() {
        Some(HostPaint::Solid { color, opacity }) => {
            (Some(Color::rgb(color.r, color.g, color.b)), Some(*opacity))
        }
        _ => (None, None),
    }
}

fn shadow_offset_y(obj: &HostObject) -> Option<f32> {
    obj.effects.iter().find_map(|effect| match effect {
        Effect::DropShadow { offset_y, .. } => Some(*offset_y),
        _ => None,
    })
}

fn non_zero(value: f32) -> Option<f32> {
    (value != 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::MemoryHost;
    use crate::host::{HostMutation, Rgb};
    use smallvec::smallvec;

    #[test]
    fn missing_fill_defaults_to_black() {
        let host = MemoryHost::new();
        let id = host.create(HostKind::Ellipse).unwrap();
        host.apply(id, HostMutation::SetFills(smallvec![])).unwrap();

        let Node::Ellipse { node, .. } = serialize_node(&host, id).unwrap() else {
            panic!("expected an ellipse");
        };
        assert_eq!(node.color, Color::BLACK);
        assert_eq!(node.opacity, None);
    }

    #[test]
    fn gradient_fill_is_not_a_color() {
        let host = MemoryHost::new();
        let id = host.create(HostKind::Rectangle).unwrap();
        host.apply(
            id,
            HostMutation::SetFills(smallvec![HostPaint::GradientLinear {
                stops: vec![],
                opacity: 0.5,
            }]),
        )
        .unwrap();

        let Node::Rectangle { node, .. } = serialize_node(&host, id).unwrap() else {
            panic!("expected a rectangle");
        };
        assert_eq!(node.color, Color::BLACK);
        assert_eq!(node.opacity, None);
    }

    #[test]
    fn translucent_shape_keeps_opacity_separately() {
        let host = MemoryHost::new();
        let id = host.create(HostKind::Rectangle).unwrap();
        host.apply(
            id,
            HostMutation::SetFills(smallvec![HostPaint::Solid {
                color: Rgb::new(0.0, 1.0, 0.0),
                opacity: 0.5,
            }]),
        )
        .unwrap();

        let Node::Rectangle { node, .. } = serialize_node(&host, id).unwrap() else {
            panic!("expected a rectangle");
        };
        assert_eq!(node.color, Color::rgb(0.0, 1.0, 0.0));
        assert_eq!(node.opacity, Some(0.5));
    }

    #[test]
    fn unsupported_kind_fails_the_enclosing_group() {
        let host = MemoryHost::new();
        let page = host.current_page();
        let star = host.create(HostKind::Star).unwrap();
        let rect = host.create(HostKind::Rectangle).unwrap();
        let group = host.group(&[rect, star], page).unwrap();

        let err = serialize_node(&host, group).unwrap_err();
        assert!(matches!(
            err,
            SerializeError::UnsupportedHostType {
                kind: HostKind::Star,
                ..
            }
        ));
    }
}
