//! Integration tests: scene → host objects → scene.

use pretty_assertions::assert_eq;
use sb_core::error::{BuildError, HostError, ParseError};
use sb_core::host::{Host, HostKind};
use sb_core::model::*;
use sb_core::{BuildOptions, MemoryHost, build_scene, serialize_node, serialize_selection};

// ─── Helpers ─────────────────────────────────────────────────────────────

async fn build_on_page(host: &MemoryHost, input: &str) -> Result<(), BuildError> {
    let scene = parse_scene(input).expect("fixture should parse");
    build_scene(host, &scene, host.current_page(), BuildOptions::default())
        .await
        .map(|_| ())
}

fn page_children(host: &MemoryHost) -> Vec<sb_core::HostId> {
    host.children_of(host.current_page()).unwrap()
}

// ─── Building ────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_node_is_appended_at_origin() {
    let host = MemoryHost::new();
    build_on_page(&host, include_str!("fixtures/single_card.json"))
        .await
        .unwrap();

    let top = page_children(&host);
    assert_eq!(top.len(), 1);
    let card = host.snapshot(top[0]).unwrap();
    assert_eq!(card.kind, HostKind::Rectangle);
    assert_eq!((card.x, card.y), (0.0, 0.0));
    assert_eq!(host.object_count(), 1);
}

#[tokio::test]
async fn single_node_keeps_position_when_reset_is_off() {
    let host = MemoryHost::new();
    let scene = parse_scene(include_str!("fixtures/single_card.json")).unwrap();
    let options = BuildOptions {
        reset_single_to_origin: false,
    };
    build_scene(&host, &scene, host.current_page(), options)
        .await
        .unwrap();

    let card = host.snapshot(page_children(&host)[0]).unwrap();
    assert_eq!((card.x, card.y), (120.0, 80.0));
}

#[tokio::test]
async fn siblings_are_grouped_in_input_order() {
    let host = MemoryHost::new();
    build_on_page(&host, include_str!("fixtures/landing.json"))
        .await
        .unwrap();

    let top = page_children(&host);
    assert_eq!(top.len(), 1);
    let wrapper = host.snapshot(top[0]).unwrap();
    assert_eq!(wrapper.kind, HostKind::Group);
    assert_eq!((wrapper.x, wrapper.y), (0.0, 0.0));

    let names: Vec<String> = wrapper
        .children
        .iter()
        .map(|id| host.snapshot(*id).unwrap().name)
        .collect();
    assert_eq!(names, vec!["background", "header", "panel"]);

    // background, logo, title, header, cta, panel, wrapper
    assert_eq!(host.object_count(), 7);
}

#[tokio::test]
async fn every_node_yields_one_object() {
    let host = MemoryHost::new();
    let scene = parse_scene(
        r#"[
            {"name": "a", "type": "ELLIPSE", "node": {"position": {"x": 0, "y": 0}, "color": {"r": 1, "g": 0, "b": 0}, "width": 4, "height": 4}},
            {"name": "b", "type": "ELLIPSE", "node": {"position": {"x": 8, "y": 0}, "color": {"r": 0, "g": 1, "b": 0}, "width": 4, "height": 4}},
            {"name": "c", "type": "ELLIPSE", "node": {"position": {"x": 16, "y": 0}, "color": {"r": 0, "g": 0, "b": 1}, "width": 4, "height": 4}}
        ]"#,
    )
    .unwrap();
    build_scene(&host, &scene, host.current_page(), BuildOptions::default())
        .await
        .unwrap();

    // Three ellipses plus the wrapping group.
    assert_eq!(host.object_count(), 3 + 1);
}

#[tokio::test]
async fn text_is_written_after_its_font_loads() {
    let host = MemoryHost::new();
    build_on_page(&host, include_str!("fixtures/landing.json"))
        .await
        .unwrap();

    assert!(host.is_font_loaded(&FontName::default()));
    let header = host.children_of(page_children(&host)[0]).unwrap()[1];
    let text = host.snapshot(host.children_of(header).unwrap()[1]).unwrap();
    assert_eq!(text.kind, HostKind::Text);
    let content = text.text.unwrap();
    assert_eq!(content.characters, "Welcome");
    assert_eq!(content.font_size, 32.0);
}

// ─── Failures leave nothing behind ───────────────────────────────────────

#[test]
fn unknown_tag_is_rejected_before_any_host_call() {
    let host = MemoryHost::new();
    let err = parse_scene(
        r#"[{"name": "ok", "type": "ELLIPSE", "node": {"position": {"x": 0, "y": 0}, "color": {"r": 0, "g": 0, "b": 0}, "width": 1, "height": 1}},
            {"name": "bad", "type": "STAR", "node": {}}]"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnknownNodeType { ref tag, .. } if tag == "STAR"));
    assert_eq!(host.object_count(), 0);
}

#[tokio::test]
async fn missing_font_rolls_back_the_whole_build() {
    let host = MemoryHost::new();
    let input = include_str!("fixtures/landing.json").replace(
        r#""fontSize": 32,"#,
        r#""fontSize": 32, "fontName": {"family": "Roboto", "style": "Bold"},"#,
    );
    let err = build_on_page(&host, &input).await.unwrap_err();

    assert!(matches!(
        err,
        BuildError::Host(HostError::FontUnavailable(ref font)) if font == "Roboto Bold"
    ));
    assert_eq!(host.object_count(), 0);
    assert!(page_children(&host).is_empty());
}

#[tokio::test]
async fn nested_empty_group_rolls_back_siblings() {
    let host = MemoryHost::new();
    let err = build_on_page(
        &host,
        r#"[
            {"name": "keep", "type": "RECTANGLE", "node": {"position": {"x": 0, "y": 0}, "color": {"r": 0, "g": 0, "b": 0}, "width": 1, "height": 1}},
            {"name": "outer", "type": "GROUP", "node": {"children": [
                {"name": "inner", "type": "GROUP", "node": {"children": []}}
            ]}}
        ]"#,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BuildError::EmptyGroup { ref name } if name == "inner"));
    assert_eq!(host.object_count(), 0);
}

// ─── Serializing what was built ──────────────────────────────────────────

#[tokio::test]
async fn rectangle_round_trip_keeps_geometry_and_shadow_offset() {
    let host = MemoryHost::new();
    build_on_page(&host, include_str!("fixtures/single_card.json"))
        .await
        .unwrap();

    let id = page_children(&host)[0];
    let node = serialize_node(&host, id).unwrap();
    assert_eq!(
        node,
        Node::Rectangle {
            name: "card".into(),
            node: RectangleSpec {
                position: Position::ORIGIN,
                color: Color::rgb(0.2, 0.4, 0.8),
                width: 320.0,
                height: 180.0,
                opacity: None,
                stroke_weight: None,
                corner_radius: Some(12.0),
                drop_shadow: Some(6.0),
            },
        }
    );
}

#[tokio::test]
async fn selection_serializes_frames_with_children() {
    let host = MemoryHost::new();
    build_on_page(&host, include_str!("fixtures/landing.json"))
        .await
        .unwrap();

    let wrapper_children = host.children_of(page_children(&host)[0]).unwrap();
    host.set_selection(vec![wrapper_children[2]]);

    let scene = serialize_selection(&host).unwrap();
    assert_eq!(scene.len(), 1);
    let Node::Frame { name, node } = &scene[0] else {
        panic!("expected a frame, got {:?}", scene[0].node_type());
    };
    assert_eq!(name, "panel");
    assert_eq!((node.width, node.height), (Some(720.0), Some(400.0)));

    let Node::Rectangle { node: cta, .. } = &node.children[0] else {
        panic!("expected the call-to-action rectangle");
    };
    assert_eq!(cta.position, Position::new(20.0, 300.0));
    assert_eq!(cta.stroke_weight, Some(2.0));
    assert_eq!(cta.corner_radius, None);
    assert_eq!(cta.drop_shadow, None);
}

#[tokio::test]
async fn text_color_keeps_alpha_when_serialized() {
    let host = MemoryHost::new();
    build_on_page(&host, include_str!("fixtures/landing.json"))
        .await
        .unwrap();

    let wrapper_children = host.children_of(page_children(&host)[0]).unwrap();
    let header = serialize_node(&host, wrapper_children[1]).unwrap();
    let Node::Text { text, .. } = &header.children()[1] else {
        panic!("expected the title text");
    };
    assert_eq!(text.content, "Welcome");
    assert_eq!(text.color, Some(Color::rgba(0.0, 0.0, 0.0, 0.8)));
}
