//! In-memory host: a page tree of [`HostObject`]s.
//!
//! Used to run the builder and serializer without the design tool, and as
//! the reference for the host contracts the builder depends on:
//!
//! - new objects start detached and get the host's template fills;
//! - text edits require the relevant font to be loaded first;
//! - group coordinates live in the parent's space, and moving a group
//!   translates everything inside it.

use crate::error::HostError;
use crate::host::{Host, HostKind, HostMutation, HostObject, HostPaint, Rgb, TextContent};
use crate::id::HostId;
use crate::model::FontName;
use async_trait::async_trait;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::smallvec;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

const PAGE_NUMBER: u32 = 0;
const DEFAULT_SIZE: f32 = 100.0;
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Mutable state behind the host's lock.
#[derive(Debug)]
struct CanvasDoc {
    /// Edges go parent → child. Child order is kept in `HostObject::children`.
    graph: StableDiGraph<HostObject, ()>,
    page: NodeIndex,
    id_index: HashMap<HostId, NodeIndex>,
    available_fonts: HashSet<FontName>,
    loaded_fonts: HashSet<FontName>,
    selection: Vec<HostId>,
    viewport_focus: Vec<HostId>,
    notifications: Vec<String>,
}

impl CanvasDoc {
    fn new(available_fonts: HashSet<FontName>) -> Self {
        let mut graph = StableDiGraph::new();
        let page_id = HostId::next(PAGE_NUMBER);
        let mut page_obj = HostObject::new(page_id, HostKind::Page);
        page_obj.name = "Page 1".into();
        let page = graph.add_node(page_obj);

        let mut id_index = HashMap::new();
        id_index.insert(page_id, page);

        Self {
            graph,
            page,
            id_index,
            available_fonts,
            loaded_fonts: HashSet::new(),
            selection: Vec::new(),
            viewport_focus: Vec::new(),
            notifications: Vec::new(),
        }
    }

    fn index_of(&self, id: HostId) -> Result<NodeIndex, HostError> {
        self.id_index.get(&id).copied().ok_or(HostError::NotFound(id))
    }

    fn object(&self, id: HostId) -> Result<&HostObject, HostError> {
        Ok(&self.graph[self.index_of(id)?])
    }

    fn object_mut(&mut self, id: HostId) -> Result<&mut HostObject, HostError> {
        let idx = self.index_of(id)?;
        Ok(&mut self.graph[idx])
    }

    fn add(&mut self, obj: HostObject) -> HostId {
        let id = obj.id;
        let idx = self.graph.add_node(obj);
        self.id_index.insert(id, idx);
        id
    }

    fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    fn is_ancestor_of(&self, ancestor: NodeIndex, mut descendant: NodeIndex) -> bool {
        while let Some(parent) = self.parent(descendant) {
            if parent == ancestor {
                return true;
            }
            descendant = parent;
        }
        false
    }

    fn detach(&mut self, idx: NodeIndex) {
        let Some(parent) = self.parent(idx) else {
            return;
        };
        if let Some(edge) = self.graph.find_edge(parent, idx) {
            self.graph.remove_edge(edge);
        }
        let id = self.graph[idx].id;
        self.graph[parent].children.retain(|c| *c != id);
        self.refit_group(parent);
    }

    fn attach(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.graph.add_edge(parent, child, ());
        let id = self.graph[child].id;
        self.graph[parent].children.push(id);
        self.refit_group(parent);
    }

    /// Groups have no geometry of their own: their bounds always enclose
    /// their children.
    fn refit_group(&mut self, idx: NodeIndex) {
        if self.graph[idx].kind != HostKind::Group {
            return;
        }
        let children = self.graph[idx].children.clone();
        let mut min = (f32::INFINITY, f32::INFINITY);
        let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for child in children {
            if let Some(&cidx) = self.id_index.get(&child) {
                let c = &self.graph[cidx];
                min = (min.0.min(c.x), min.1.min(c.y));
                max = (max.0.max(c.x + c.width), max.1.max(c.y + c.height));
            }
        }
        if min.0.is_finite() {
            let group = &mut self.graph[idx];
            group.x = min.0;
            group.y = min.1;
            group.width = max.0 - min.0;
            group.height = max.1 - min.1;
        }
        if let Some(parent) = self.parent(idx) {
            self.refit_group(parent);
        }
    }

    /// Shift every descendant of `idx` by (dx, dy).
    fn translate_descendants(&mut self, idx: NodeIndex, dx: f32, dy: f32) {
        let children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        for child in children {
            let obj = &mut self.graph[child];
            obj.x += dx;
            obj.y += dy;
            if obj.kind == HostKind::Group {
                self.translate_descendants(child, dx, dy);
            }
        }
    }

    fn remove_subtree(&mut self, idx: NodeIndex) {
        let children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        for child in children {
            self.remove_subtree(child);
        }
        if let Some(removed) = self.graph.remove_node(idx) {
            self.id_index.remove(&removed.id);
            self.selection.retain(|s| *s != removed.id);
        }
    }

    fn require_font(&self, id: HostId, font: &FontName) -> Result<(), HostError> {
        if self.loaded_fonts.contains(font) {
            Ok(())
        } else {
            Err(HostError::FontNotLoaded {
                id,
                font: font.to_string(),
            })
        }
    }

    fn text_font(&self, id: HostId) -> Result<FontName, HostError> {
        self.object(id)?
            .text
            .as_ref()
            .map(|t| t.font_name.clone())
            .ok_or_else(|| HostError::InvalidOperation(format!("{id} is not a text object")))
    }

    fn apply(&mut self, id: HostId, mutation: HostMutation) -> Result<(), HostError> {
        match mutation {
            HostMutation::SetName(name) => self.object_mut(id)?.name = name,
            HostMutation::SetPosition { x, y } => {
                let idx = self.index_of(id)?;
                let obj = &mut self.graph[idx];
                let (dx, dy) = (x - obj.x, y - obj.y);
                obj.x = x;
                obj.y = y;
                if obj.kind == HostKind::Group {
                    self.translate_descendants(idx, dx, dy);
                }
                if let Some(parent) = self.parent(idx) {
                    self.refit_group(parent);
                }
            }
            HostMutation::Resize { width, height } => {
                let idx = self.index_of(id)?;
                let obj = &mut self.graph[idx];
                if obj.kind == HostKind::Group {
                    return Err(HostError::InvalidOperation(
                        "groups are sized by their children".into(),
                    ));
                }
                obj.width = width;
                obj.height = height;
                if let Some(parent) = self.parent(idx) {
                    self.refit_group(parent);
                }
            }
            HostMutation::SetFills(fills) => self.object_mut(id)?.fills = fills,
            HostMutation::SetStrokeWeight(w) => self.object_mut(id)?.stroke_weight = w,
            HostMutation::SetCornerRadius(r) => self.object_mut(id)?.corner_radius = r,
            HostMutation::SetEffects(effects) => self.object_mut(id)?.effects = effects,
            HostMutation::SetCharacters(characters) => {
                let font = self.text_font(id)?;
                self.require_font(id, &font)?;
                if let Some(text) = self.object_mut(id)?.text.as_mut() {
                    text.characters = characters;
                }
            }
            HostMutation::SetFontName(font) => {
                self.text_font(id)?;
                self.require_font(id, &font)?;
                if let Some(text) = self.object_mut(id)?.text.as_mut() {
                    text.font_name = font;
                }
            }
            HostMutation::SetFontSize(size) => {
                let font = self.text_font(id)?;
                self.require_font(id, &font)?;
                if let Some(text) = self.object_mut(id)?.text.as_mut() {
                    text.font_size = size;
                }
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory implementation of [`Host`].
#[derive(Debug)]
pub struct MemoryHost {
    doc: Mutex<CanvasDoc>,
}

impl MemoryHost {
    /// A host with only the default font (`Inter Regular`) available.
    pub fn new() -> Self {
        Self::with_fonts([FontName::default()])
    }

    pub fn with_fonts(fonts: impl IntoIterator<Item = FontName>) -> Self {
        Self {
            doc: Mutex::new(CanvasDoc::new(fonts.into_iter().collect())),
        }
    }

    fn doc(&self) -> MutexGuard<'_, CanvasDoc> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live objects, the page excluded.
    pub fn object_count(&self) -> usize {
        self.doc().graph.node_count() - 1
    }

    pub fn contains(&self, id: HostId) -> bool {
        self.doc().id_index.contains_key(&id)
    }

    pub fn children_of(&self, id: HostId) -> Result<Vec<HostId>, HostError> {
        Ok(self.doc().object(id)?.children.clone())
    }

    pub fn parent_of(&self, id: HostId) -> Result<Option<HostId>, HostError> {
        let doc = self.doc();
        let idx = doc.index_of(id)?;
        Ok(doc.parent(idx).map(|p| doc.graph[p].id))
    }

    pub fn set_selection(&self, ids: Vec<HostId>) {
        self.doc().selection = ids;
    }

    pub fn is_font_loaded(&self, font: &FontName) -> bool {
        self.doc().loaded_fonts.contains(font)
    }

    /// Messages shown to the operator, oldest first.
    pub fn notifications(&self) -> Vec<String> {
        self.doc().notifications.clone()
    }

    /// Objects most recently brought into view.
    pub fn viewport_focus(&self) -> Vec<HostId> {
        self.doc().viewport_focus.clone()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Template object for `kind`, mimicking the host's creation defaults.
fn template(kind: HostKind) -> Result<HostObject, HostError> {
    let mut obj = HostObject::new(HostId::next(PAGE_NUMBER), kind);
    obj.name = format!("{kind:?}");
    match kind {
        HostKind::Page | HostKind::Group => {
            return Err(HostError::InvalidOperation(format!(
                "{kind:?} objects cannot be created directly"
            )));
        }
        HostKind::Rectangle | HostKind::Ellipse | HostKind::Frame => {
            obj.width = DEFAULT_SIZE;
            obj.height = DEFAULT_SIZE;
            obj.fills = smallvec![HostPaint::solid(Rgb::WHITE)];
        }
        HostKind::Text => {
            obj.fills = smallvec![HostPaint::solid(Rgb::BLACK)];
            obj.text = Some(TextContent {
                characters: String::new(),
                font_name: FontName::default(),
                font_size: DEFAULT_FONT_SIZE,
            });
        }
        _ => {}
    }
    Ok(obj)
}

#[async_trait]
impl Host for MemoryHost {
    fn create(&self, kind: HostKind) -> Result<HostId, HostError> {
        let obj = template(kind)?;
        Ok(self.doc().add(obj))
    }

    fn apply(&self, id: HostId, mutation: HostMutation) -> Result<(), HostError> {
        self.doc().apply(id, mutation)
    }

    fn group(&self, children: &[HostId], parent: HostId) -> Result<HostId, HostError> {
        if children.is_empty() {
            return Err(HostError::EmptyGroup);
        }
        let mut doc = self.doc();
        let parent_idx = doc.index_of(parent)?;
        let child_idxs = children
            .iter()
            .map(|c| doc.index_of(*c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut group = HostObject::new(HostId::next(PAGE_NUMBER), HostKind::Group);
        group.name = "Group".into();
        let group_id = doc.add(group);
        let group_idx = doc.index_of(group_id)?;

        doc.attach(parent_idx, group_idx);
        for cidx in child_idxs {
            doc.detach(cidx);
            doc.attach(group_idx, cidx);
        }
        Ok(group_id)
    }

    fn append_child(&self, parent: HostId, child: HostId) -> Result<(), HostError> {
        let mut doc = self.doc();
        let parent_idx = doc.index_of(parent)?;
        let child_idx = doc.index_of(child)?;
        if parent_idx == child_idx || doc.is_ancestor_of(child_idx, parent_idx) {
            return Err(HostError::InvalidOperation(format!(
                "cannot append {child} inside itself"
            )));
        }
        doc.detach(child_idx);
        doc.attach(parent_idx, child_idx);
        Ok(())
    }

    fn remove(&self, id: HostId) -> Result<(), HostError> {
        let mut doc = self.doc();
        let idx = doc.index_of(id)?;
        if idx == doc.page {
            return Err(HostError::InvalidOperation("the page cannot be removed".into()));
        }
        doc.detach(idx);
        doc.remove_subtree(idx);
        Ok(())
    }

    fn snapshot(&self, id: HostId) -> Result<HostObject, HostError> {
        self.doc().object(id).cloned()
    }

    async fn load_font(&self, font: &FontName) -> Result<(), HostError> {
        let mut doc = self.doc();
        if !doc.available_fonts.contains(font) {
            return Err(HostError::FontUnavailable(font.to_string()));
        }
        doc.loaded_fonts.insert(font.clone());
        Ok(())
    }

    fn current_page(&self) -> HostId {
        let doc = self.doc();
        doc.graph[doc.page].id
    }

    fn selection(&self) -> Vec<HostId> {
        self.doc().selection.clone()
    }

    fn scroll_into_view(&self, ids: &[HostId]) {
        self.doc().viewport_focus = ids.to_vec();
    }

    fn notify(&self, message: &str) {
        log::info!("notify: {message}");
        self.doc().notifications.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_objects_start_detached_with_template_fill() {
        let host = MemoryHost::new();
        let id = host.create(HostKind::Rectangle).unwrap();
        assert_eq!(host.parent_of(id).unwrap(), None);

        let obj = host.snapshot(id).unwrap();
        assert_eq!(obj.fills.len(), 1);
        assert_eq!(obj.fills[0], HostPaint::solid(Rgb::WHITE));
        assert_eq!((obj.width, obj.height), (DEFAULT_SIZE, DEFAULT_SIZE));
    }

    #[test]
    fn groups_cannot_be_created_directly() {
        let host = MemoryHost::new();
        assert!(matches!(
            host.create(HostKind::Group),
            Err(HostError::InvalidOperation(_))
        ));
    }

    #[test]
    fn text_edits_require_loaded_font() {
        let host = MemoryHost::new();
        let id = host.create(HostKind::Text).unwrap();
        let err = host
            .apply(id, HostMutation::SetCharacters("hi".into()))
            .unwrap_err();
        assert!(matches!(err, HostError::FontNotLoaded { .. }));
    }

    #[test]
    fn group_bounds_enclose_children_and_move_them() {
        let host = MemoryHost::new();
        let page = host.current_page();
        let a = host.create(HostKind::Rectangle).unwrap();
        let b = host.create(HostKind::Rectangle).unwrap();
        host.apply(a, HostMutation::SetPosition { x: 10.0, y: 20.0 })
            .unwrap();
        host.apply(b, HostMutation::SetPosition { x: 50.0, y: 60.0 })
            .unwrap();

        let g = host.group(&[a, b], page).unwrap();
        let group = host.snapshot(g).unwrap();
        assert_eq!((group.x, group.y), (10.0, 20.0));
        assert_eq!((group.width, group.height), (140.0, 140.0));
        assert_eq!(group.children, vec![a, b]);

        host.apply(g, HostMutation::SetPosition { x: 0.0, y: 0.0 })
            .unwrap();
        let moved = host.snapshot(b).unwrap();
        assert_eq!((moved.x, moved.y), (40.0, 40.0));
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let host = MemoryHost::new();
        let page = host.current_page();
        let a = host.create(HostKind::Ellipse).unwrap();
        let g = host.group(&[a], page).unwrap();
        assert_eq!(host.object_count(), 2);

        host.remove(g).unwrap();
        assert_eq!(host.object_count(), 0);
        assert!(!host.contains(a));
        assert!(host.children_of(page).unwrap().is_empty());
    }

    #[test]
    fn append_rejects_cycles() {
        let host = MemoryHost::new();
        let frame = host.create(HostKind::Frame).unwrap();
        let inner = host.create(HostKind::Frame).unwrap();
        host.append_child(frame, inner).unwrap();
        assert!(host.append_child(inner, frame).is_err());
        assert!(host.append_child(frame, frame).is_err());
    }
}
