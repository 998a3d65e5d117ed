//! Compact scene form used when talking to language models.
//!
//! Same node tree as [`crate::model`], but colors are hex strings and
//! positions are `[x, y]` pairs, which models produce more reliably than
//! nested objects. Text nodes have no DSL form.

use crate::model::{
    Color, EllipseSpec, FrameSpec, GroupSpec, Node, Position, RectangleSpec, Scene,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum DslError {
    #[error("invalid DSL JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node `{name}`: `{value}` is not a hex color")]
    InvalidColor { name: String, value: String },

    #[error("node `{name}` has no position")]
    MissingPosition { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DslNodeType {
    Rectangle,
    Ellipse,
    Group,
    Frame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DslNodeInner {
    pub color: String,
    pub width: f32,
    pub height: f32,
    /// Required on shapes; groups and frames may leave it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(f32, f32)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DslNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_shadow: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DslNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: DslNodeType,
    pub node: DslNodeInner,
}

/// Parse DSL JSON (array of nodes or a single node).
pub fn parse(input: &str) -> Result<Vec<DslNode>, DslError> {
    nodes_from_value(serde_json::from_str(input)?)
}

/// Same as [`parse`], for an already-decoded JSON value.
pub fn nodes_from_value(value: serde_json::Value) -> Result<Vec<DslNode>, DslError> {
    let nodes = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(nodes)
}

pub fn to_scene(nodes: &[DslNode]) -> Result<Scene, DslError> {
    nodes.iter().map(to_node).collect()
}

fn to_node(dsl: &DslNode) -> Result<Node, DslError> {
    let inner = &dsl.node;
    let name = dsl.name.clone();
    let position = inner.position.map(|(x, y)| Position::new(x, y));
    let children = || to_scene(inner.children.as_deref().unwrap_or_default());

    let node = match dsl.node_type {
        DslNodeType::Rectangle => Node::Rectangle {
            node: RectangleSpec {
                position: shape_position(dsl)?,
                color: parse_color(dsl)?,
                width: inner.width,
                height: inner.height,
                opacity: inner.opacity,
                stroke_weight: inner.stroke_weight,
                corner_radius: inner.corner_radius,
                drop_shadow: inner.drop_shadow,
            },
            name,
        },
        DslNodeType::Ellipse => Node::Ellipse {
            node: EllipseSpec {
                position: shape_position(dsl)?,
                color: parse_color(dsl)?,
                width: inner.width,
                height: inner.height,
                opacity: inner.opacity,
            },
            name,
        },
        DslNodeType::Group => Node::Group {
            node: GroupSpec {
                children: children()?,
                position,
            },
            name,
        },
        DslNodeType::Frame => Node::Frame {
            node: FrameSpec {
                children: children()?,
                position,
                width: Some(inner.width),
                height: Some(inner.height),
            },
            name,
        },
    };
    Ok(node)
}

fn shape_position(dsl: &DslNode) -> Result<Position, DslError> {
    dsl.node
        .position
        .map(|(x, y)| Position::new(x, y))
        .ok_or_else(|| DslError::MissingPosition {
            name: dsl.name.clone(),
        })
}

fn parse_color(dsl: &DslNode) -> Result<Color, DslError> {
    Color::from_hex(&dsl.node.color).ok_or_else(|| DslError::InvalidColor {
        name: dsl.name.clone(),
        value: dsl.node.color.clone(),
    })
}

/// Convert a scene to DSL form. Text nodes are dropped.
pub fn from_scene(scene: &[Node]) -> Vec<DslNode> {
    scene.iter().filter_map(from_node).collect()
}

fn from_node(node: &Node) -> Option<DslNode> {
    let (node_type, inner) = match node {
        Node::Rectangle { node, .. } => (
            DslNodeType::Rectangle,
            DslNodeInner {
                corner_radius: node.corner_radius,
                stroke_weight: node.stroke_weight,
                drop_shadow: node.drop_shadow,
                ..shape_inner(node.color, node.position, node.width, node.height, node.opacity)
            },
        ),
        Node::Ellipse { node, .. } => (
            DslNodeType::Ellipse,
            shape_inner(node.color, node.position, node.width, node.height, node.opacity),
        ),
        Node::Text { .. } => return None,
        Node::Group { node, .. } => (
            DslNodeType::Group,
            container_inner(&node.children, node.position, None, None),
        ),
        Node::Frame { node, .. } => (
            DslNodeType::Frame,
            container_inner(&node.children, node.position, node.width, node.height),
        ),
    };
    Some(DslNode {
        name: node.name().to_string(),
        node_type,
        node: inner,
    })
}

fn shape_inner(
    color: Color,
    position: Position,
    width: f32,
    height: f32,
    opacity: Option<f32>,
) -> DslNodeInner {
    DslNodeInner {
        color: color.to_hex(),
        width,
        height,
        position: Some((position.x, position.y)),
        opacity,
        corner_radius: None,
        stroke_weight: None,
        children: None,
        drop_shadow: None,
    }
}

fn container_inner(
    children: &[Node],
    position: Option<Position>,
    width: Option<f32>,
    height: Option<f32>,
) -> DslNodeInner {
    DslNodeInner {
        position: position.map(|p| (p.x, p.y)),
        children: Some(from_scene(children)),
        ..shape_inner(
            Color::BLACK,
            Position::ORIGIN,
            width.unwrap_or(0.0),
            height.unwrap_or(0.0),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r##"[
        {"name": "bg", "type": "RECTANGLE", "node": {
            "color": "#FF8800", "width": 200, "height": 100, "position": [10, 20],
            "cornerRadius": 8
        }},
        {"name": "row", "type": "GROUP", "node": {
            "color": "#000000", "width": 0, "height": 0, "position": [0, 0],
            "children": [
                {"name": "dot", "type": "ELLIPSE", "node": {
                    "color": "#00F", "width": 8, "height": 8, "position": [1, 2]
                }}
            ]
        }}
    ]"##;

    #[test]
    fn dsl_to_scene_expands_colors_and_positions() {
        let scene = to_scene(&parse(SAMPLE).unwrap()).unwrap();
        assert_eq!(scene.len(), 2);

        let Node::Rectangle { node, .. } = &scene[0] else {
            panic!("expected rectangle");
        };
        assert_eq!(node.color.to_hex(), "#FF8800");
        assert_eq!(node.position, Position::new(10.0, 20.0));
        assert_eq!(node.corner_radius, Some(8.0));

        assert_eq!(scene[1].node_type(), NodeType::Group);
        assert_eq!(scene[1].children()[0].name(), "dot");
    }

    #[test]
    fn bad_hex_names_the_node() {
        let nodes = parse(
            r#"{"name": "oops", "type": "ELLIPSE", "node": {
                "color": "blue", "width": 1, "height": 1, "position": [0, 0]
            }}"#,
        )
        .unwrap();
        match to_scene(&nodes).unwrap_err() {
            DslError::InvalidColor { name, value } => {
                assert_eq!(name, "oops");
                assert_eq!(value, "blue");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn text_nodes_have_no_dsl_form() {
        let scene = crate::model::parse_scene(
            r#"[{"name": "t", "type": "TEXT", "text": {"content": "x"}}]"#,
        )
        .unwrap();
        assert!(from_scene(&scene).is_empty());
    }

    #[test]
    fn unplaced_group_stays_unplaced() {
        let scene = crate::model::parse_scene(
            r#"[{"name": "row", "type": "GROUP", "node": {"children": [
                {"name": "dot", "type": "ELLIPSE", "node": {
                    "position": {"x": 40, "y": 50}, "color": {"r": 0, "g": 0, "b": 1},
                    "width": 8, "height": 8
                }}
            ]}}]"#,
        )
        .unwrap();

        let dsl = from_scene(&scene);
        assert_eq!(dsl[0].node.position, None);
        assert_eq!(to_scene(&dsl).unwrap(), scene);
    }

    #[test]
    fn shapes_need_a_position() {
        let nodes = parse(
            r##"{"name": "dot", "type": "ELLIPSE", "node": {
                "color": "#000", "width": 1, "height": 1
            }}"##,
        )
        .unwrap();
        assert!(matches!(
            to_scene(&nodes),
            Err(DslError::MissingPosition { name }) if name == "dot"
        ));
    }
}
