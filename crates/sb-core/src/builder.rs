//! Scene builder: scene description → host objects.
//!
//! Siblings are built as one structured join. Results come back in input
//! order, so stacking order never depends on completion order, and the first
//! failure drops the remaining sibling futures. Every object a build creates
//! is recorded; if the build fails they are all removed again, so a failed
//! build leaves nothing behind.

use crate::error::{BuildError, HostError};
use crate::host::{BlendMode, Effect, Host, HostKind, HostMutation, HostPaint, Rgb, Rgba};
use crate::id::HostId;
use crate::model::{Color, EllipseSpec, FrameSpec, GroupSpec, Node, Position, RectangleSpec, TextSpec};
use futures_util::future::{BoxFuture, FutureExt, try_join_all};
use smallvec::{SmallVec, smallvec};
use std::sync::{Mutex, PoisonError};

/// Blur radius of the drop shadow attached to rectangles.
pub const SHADOW_RADIUS: f32 = 4.0;

/// Color of the drop shadow attached to rectangles.
pub const SHADOW_COLOR: Rgba = Rgba {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.25,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Move a lone top-level node to the container's origin.
    pub reset_single_to_origin: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            reset_single_to_origin: true,
        }
    }
}

/// Records the objects one build creates.
struct Session<'h, H: Host + ?Sized> {
    host: &'h H,
    created: Mutex<Vec<HostId>>,
}

impl<'h, H: Host + ?Sized> Session<'h, H> {
    fn new(host: &'h H) -> Self {
        Self {
            host,
            created: Mutex::new(Vec::new()),
        }
    }

    fn track(&self, id: HostId) -> HostId {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
        id
    }

    fn create(&self, kind: HostKind) -> Result<HostId, HostError> {
        self.host.create(kind).map(|id| self.track(id))
    }

    fn group(&self, children: &[HostId], parent: HostId) -> Result<HostId, HostError> {
        self.host.group(children, parent).map(|id| self.track(id))
    }

    fn created_count(&self) -> usize {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Remove everything this session created, newest first.
    fn rollback(self) {
        let created = self
            .created
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        for id in created.into_iter().rev() {
            match self.host.remove(id) {
                // Already gone with an ancestor.
                Ok(()) | Err(HostError::NotFound(_)) => {}
                Err(err) => log::warn!("rollback could not remove {id}: {err}"),
            }
        }
    }
}

/// Build `scene` into `container` and return the container.
///
/// One top-level node is appended directly (moved to the origin unless
/// `options` say otherwise); several are wrapped in a group placed at the
/// container's origin. An empty scene is an error. On error nothing created
/// by this call survives.
pub async fn build_scene<H: Host + ?Sized>(
    host: &H,
    scene: &[Node],
    container: HostId,
    options: BuildOptions,
) -> Result<HostId, BuildError> {
    let session = Session::new(host);
    match place_scene(&session, scene, container, options).await {
        Ok(()) => {
            log::debug!(
                "built {} top-level node(s), {} host object(s) into {container}",
                scene.len(),
                session.created_count()
            );
            Ok(container)
        }
        Err(err) => {
            log::debug!("build failed ({err}), rolling back");
            session.rollback();
            Err(err)
        }
    }
}

/// Build a single node as a detached host object.
pub async fn build_node<H: Host + ?Sized>(host: &H, node: &Node) -> Result<HostId, BuildError> {
    let session = Session::new(host);
    match build_tree(&session, node).await {
        Ok(id) => Ok(id),
        Err(err) => {
            session.rollback();
            Err(err)
        }
    }
}

async fn place_scene<H: Host + ?Sized>(
    session: &Session<'_, H>,
    scene: &[Node],
    container: HostId,
    options: BuildOptions,
) -> Result<(), BuildError> {
    if scene.is_empty() {
        return Err(BuildError::EmptyScene);
    }
    let host = session.host;
    let built = build_all(session, scene).await?;

    if let [single] = built.as_slice() {
        host.append_child(container, *single)?;
        if options.reset_single_to_origin {
            set_position(host, *single, Position::ORIGIN)?;
        }
    } else {
        let group = session.group(&built, container)?;
        set_position(host, group, Position::ORIGIN)?;
    }
    Ok(())
}

async fn build_all<H: Host + ?Sized>(
    session: &Session<'_, H>,
    nodes: &[Node],
) -> Result<Vec<HostId>, BuildError> {
    try_join_all(nodes.iter().map(|node| build_tree(session, node))).await
}

fn build_tree<'a, H: Host + ?Sized>(
    session: &'a Session<'a, H>,
    node: &'a Node,
) -> BoxFuture<'a, Result<HostId, BuildError>> {
    async move {
        log::trace!("BUILD {} `{}`", node.node_type().as_str(), node.name());
        match node {
            Node::Rectangle { name, node } => build_rectangle(session, name, node),
            Node::Ellipse { name, node } => build_ellipse(session, name, node),
            Node::Text { name, text } => build_text(session, name, text).await,
            Node::Group { name, node } => build_group(session, name, node).await,
            Node::Frame { name, node } => build_frame(session, name, node).await,
        }
    }
    .boxed()
}

fn build_rectangle<H: Host + ?Sized>(
    session: &Session<'_, H>,
    name: &str,
    spec: &RectangleSpec,
) -> Result<HostId, BuildError> {
    let host = session.host;
    let id = session.create(HostKind::Rectangle)?;
    host.apply(id, HostMutation::SetName(name.to_string()))?;
    set_position(host, id, spec.position)?;
    host.apply(
        id,
        HostMutation::Resize {
            width: spec.width,
            height: spec.height,
        },
    )?;
    fill_with(host, id, spec.color, spec.opacity)?;
    host.apply(
        id,
        HostMutation::SetStrokeWeight(spec.stroke_weight.unwrap_or(0.0)),
    )?;
    host.apply(
        id,
        HostMutation::SetCornerRadius(spec.corner_radius.unwrap_or(0.0)),
    )?;
    if let Some(offset_y) = spec.drop_shadow
        && offset_y != 0.0
    {
        host.apply(id, HostMutation::SetEffects(smallvec![drop_shadow(offset_y)]))?;
    }
    Ok(id)
}

fn build_ellipse<H: Host + ?Sized>(
    session: &Session<'_, H>,
    name: &str,
    spec: &EllipseSpec,
) -> Result<HostId, BuildError> {
    let host = session.host;
    let id = session.create(HostKind::Ellipse)?;
    host.apply(id, HostMutation::SetName(name.to_string()))?;
    set_position(host, id, spec.position)?;
    host.apply(
        id,
        HostMutation::Resize {
            width: spec.width,
            height: spec.height,
        },
    )?;
    fill_with(host, id, spec.color, spec.opacity)?;
    Ok(id)
}

async fn build_text<H: Host + ?Sized>(
    session: &Session<'_, H>,
    name: &str,
    spec: &TextSpec,
) -> Result<HostId, BuildError> {
    let host = session.host;
    let id = session.create(HostKind::Text)?;
    host.apply(id, HostMutation::SetName(name.to_string()))?;

    // Font-dependent writes (characters included) need the font resolved first.
    let font = match &spec.font_name {
        Some(font) => font.clone(),
        None => host
            .snapshot(id)?
            .text
            .map(|t| t.font_name)
            .unwrap_or_default(),
    };
    host.load_font(&font).await?;
    if spec.font_name.is_some() {
        host.apply(id, HostMutation::SetFontName(font))?;
    }

    host.apply(id, HostMutation::SetCharacters(spec.content.clone()))?;
    if let Some(size) = spec.font_size {
        host.apply(id, HostMutation::SetFontSize(size))?;
    }
    if let Some(color) = spec.color {
        fill_with(host, id, color, None)?;
    }
    if let Some(position) = spec.position {
        set_position(host, id, position)?;
    }
    Ok(id)
}

async fn build_group<H: Host + ?Sized>(
    session: &Session<'_, H>,
    name: &str,
    spec: &GroupSpec,
) -> Result<HostId, BuildError> {
    let host = session.host;
    let children = build_all(session, &spec.children).await?;
    if children.is_empty() {
        return Err(BuildError::EmptyGroup {
            name: name.to_string(),
        });
    }
    // Parked on the page until the enclosing container adopts it.
    let id = session.group(&children, host.current_page())?;
    host.apply(id, HostMutation::SetName(name.to_string()))?;
    if let Some(position) = spec.position {
        set_position(host, id, position)?;
    }
    Ok(id)
}

async fn build_frame<H: Host + ?Sized>(
    session: &Session<'_, H>,
    name: &str,
    spec: &FrameSpec,
) -> Result<HostId, BuildError> {
    let host = session.host;
    let children = build_all(session, &spec.children).await?;
    let id = session.create(HostKind::Frame)?;
    host.apply(id, HostMutation::SetName(name.to_string()))?;
    if spec.width.is_some() || spec.height.is_some() {
        let current = host.snapshot(id)?;
        host.apply(
            id,
            HostMutation::Resize {
                width: spec.width.unwrap_or(current.width),
                height: spec.height.unwrap_or(current.height),
            },
        )?;
    }
    if let Some(position) = spec.position {
        set_position(host, id, position)?;
    }
    for child in children {
        host.append_child(id, child)?;
    }
    Ok(id)
}

fn set_position<H: Host + ?Sized>(host: &H, id: HostId, p: Position) -> Result<(), HostError> {
    host.apply(id, HostMutation::SetPosition { x: p.x, y: p.y })
}

/// Replace the fills with a single solid paint of `color`.
///
/// Only the first template slot is carried over (for its opacity); any
/// further paints on the template are discarded.
fn fill_with<H: Host + ?Sized>(
    host: &H,
    id: HostId,
    color: Color,
    opacity: Option<f32>,
) -> Result<(), HostError> {
    let template_opacity = match host.snapshot(id)?.fills.first() {
        Some(HostPaint::Solid { opacity, .. })
        | Some(HostPaint::GradientLinear { opacity, .. })
        | Some(HostPaint::Image { opacity, .. }) => *opacity,
        None => 1.0,
    };
    let fills: SmallVec<[HostPaint; 1]> = smallvec![HostPaint::Solid {
        color: Rgb::new(color.r, color.g, color.b),
        opacity: opacity.or(color.a).unwrap_or(template_opacity),
    }];
    host.apply(id, HostMutation::SetFills(fills))
}

fn drop_shadow(offset_y: f32) -> Effect {
    Effect::DropShadow {
        color: SHADOW_COLOR,
        offset_x: 0.0,
        offset_y,
        radius: SHADOW_RADIUS,
        spread: 0.0,
        visible: true,
        blend_mode: BlendMode::Normal,
        show_shadow_behind_node: false,
    }
}
