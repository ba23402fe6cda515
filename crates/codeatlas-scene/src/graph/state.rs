use codeatlas_core::{
    EdgeKey, Entity, NodeKey, SchemeColor, Selectable, SurfaceEvent, SymbolKind, Vec2,
};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::SceneConfig;
use crate::graph::lru::WorkingSet;
use crate::graph::model::{EdgeOrigin, EdgeState, GraphModel, NodeState};
use crate::graph::scheme::SchemeBook;
use crate::source::ReferenceSource;

// Per-identity data that outlives the node or edge it describes.
#[derive(Default)]
pub struct ItemData {
    pub node_comments: HashMap<NodeKey, String>,
    pub edge_comments: HashMap<EdgeKey, String>,
    pub custom_edges: HashSet<EdgeKey>,
}

pub struct FocusState {
    pub select_stamp: u64,
    // Cleared while eviction runs so deletions do not count as focus events.
    pub events_enabled: bool,
    pub candidate_edges: Vec<EdgeKey>,
    pub source_candidate: bool,
    pub auto_focus_toggle: bool,
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            select_stamp: 0,
            events_enabled: true,
            candidate_edges: Vec::new(),
            source_candidate: true,
            auto_focus_toggle: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub key: NodeKey,
    pub name: String,
    pub kind: SymbolKind,
    pub pos: Vec2,
    pub target: Vec2,
    pub selected: bool,
    pub select_counter: u32,
    pub select_stamp: u64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeView {
    pub key: EdgeKey,
    pub selected: bool,
    pub candidate: bool,
    pub custom: bool,
    pub call_order: Option<u32>,
    pub comment: Option<String>,
    pub scheme_colors: Vec<SchemeColor>,
}

#[derive(Default)]
pub struct SceneState {
    pub model: GraphModel,
    pub lru: WorkingSet,
    pub focus: FocusState,
    pub schemes: SchemeBook,
    pub data: ItemData,
    pub cfg: SceneConfig,
    layout_dirty: bool,
    outbox: Vec<SurfaceEvent>,
}

impl SceneState {
    pub fn new(cfg: SceneConfig) -> Self {
        Self {
            lru: WorkingSet::new(cfg.lru_max_length),
            cfg,
            ..Self::default()
        }
    }

    pub(crate) fn emit(&mut self, ev: SurfaceEvent) {
        self.outbox.push(ev);
    }

    pub fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn mark_layout_dirty(&mut self) {
        if !self.layout_dirty {
            self.layout_dirty = true;
            self.emit(SurfaceEvent::LayoutDirty);
        }
    }

    pub fn is_layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    pub fn take_layout_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.layout_dirty, false)
    }

    // ----- Graph store -----

    // Creates the node at the selection centroid. Rejected when present or denied.
    pub fn add_node(&mut self, key: &NodeKey, source: &dyn ReferenceSource) -> bool {
        if self.model.contains_node(key) || self.model.is_denied(key) {
            return false;
        }
        let entity = source.entity(key);
        self.add_node_with(key, entity)
    }

    pub(crate) fn add_node_with(&mut self, key: &NodeKey, entity: Option<Entity>) -> bool {
        if self.model.contains_node(key) || self.model.is_denied(key) {
            return false;
        }
        let (name, kind) = match entity {
            Some(ent) => (ent.name, ent.kind),
            None => (key.0.clone(), SymbolKind::Other),
        };
        let pos = self.selected_center().unwrap_or(Vec2::ZERO);
        if !self
            .model
            .insert_node(key.clone(), NodeState::new(name, kind, pos))
        {
            return false;
        }
        self.emit(SurfaceEvent::NodeAdded(key.clone()));
        self.mark_layout_dirty();
        true
    }

    pub fn add_edge(&mut self, key: EdgeKey, origin: EdgeOrigin) -> bool {
        let custom = origin.is_custom();
        if !self.model.insert_edge(key.clone(), EdgeState::new(origin)) {
            return false;
        }
        if custom {
            self.data.custom_edges.insert(key.clone());
        }
        self.emit(SurfaceEvent::EdgeAdded(key));
        self.mark_layout_dirty();
        true
    }

    pub fn delete_node(&mut self, key: &NodeKey) -> bool {
        // Edges go before the node; the model enforces the order.
        let Some(removed_edges) = self.model.remove_node(key) else {
            return false;
        };
        for edge in removed_edges {
            self.emit(SurfaceEvent::EdgeRemoved(edge));
        }
        self.emit(SurfaceEvent::NodeRemoved(key.clone()));
        self.lru.forget([key]);
        self.mark_layout_dirty();
        true
    }

    pub fn delete_edge(&mut self, key: &EdgeKey) -> bool {
        if self.model.remove_edge(key).is_none() {
            return false;
        }
        self.emit(SurfaceEvent::EdgeRemoved(key.clone()));
        self.mark_layout_dirty();
        true
    }

    // Removes every node and edge. Schemes, comments and the denylist stay.
    pub fn clear(&mut self) {
        let keys: Vec<NodeKey> = self.model.nodes.keys().cloned().collect();
        for key in &keys {
            self.delete_node(key);
        }
        self.lru.clear();
        self.focus.candidate_edges.clear();
    }

    // ----- Working set -----

    pub fn touch<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a NodeKey>,
    {
        let present: Vec<&NodeKey> = keys
            .into_iter()
            .filter(|k| self.model.contains_node(k))
            .collect();
        self.lru.touch(present);
    }

    pub fn evict(&mut self) {
        self.focus.events_enabled = false;
        let mut evicted = 0usize;
        while let Some(key) = self.lru.pop_overflow() {
            if self.delete_node(&key) {
                evicted += 1;
            }
        }
        self.focus.events_enabled = true;
        if evicted > 0 {
            tracing::debug!(evicted, cap = self.lru.cap(), "evicted least recently used nodes");
        }
    }

    pub fn add_node_touched(&mut self, key: &NodeKey, source: &dyn ReferenceSource) -> bool {
        let added = self.add_node(key, source);
        self.touch([key]);
        self.evict();
        added
    }

    pub fn set_lru_cap(&mut self, cap: usize) {
        self.cfg.lru_max_length = cap;
        self.lru.set_cap(cap);
        self.evict();
    }

    // ----- Deletion of the selection -----

    pub fn delete_selected(&mut self, add_to_denylist: bool) {
        let nodes = self.selected_nodes();
        let mut last_pos: Option<Vec2> = None;
        for key in &nodes {
            if let Some(node) = self.model.nodes.get(key) {
                last_pos = Some(node.pos);
                if add_to_denylist {
                    self.model.denylist.insert(key.clone(), node.name.clone());
                }
            }
        }
        if let Some(edge) = self.selected_edges().first() {
            if let Some(src) = self.model.nodes.get(&edge.src) {
                last_pos = Some(src.pos);
            }
        }

        // A deleted function hands focus to the next call of its caller.
        let successor = match nodes.as_slice() {
            [only] if self.model.nodes.get(only).is_some_and(NodeState::is_function) => self
                .model
                .edges
                .iter()
                .find(|(k, e)| &k.tar == only && e.call_order.is_some())
                .and_then(|(k, e)| {
                    let next = e.call_order? + 1;
                    self.model.edge_by_call_order(&k.src, next).cloned()
                }),
            _ => None,
        };

        for key in &nodes {
            self.delete_node(key);
        }
        self.lru.forget(&nodes);
        self.evict();

        for key in self.selected_edges() {
            self.delete_edge(&key);
        }

        tracing::debug!(nodes = nodes.len(), deny = add_to_denylist, "deleted selection");

        let reselected = match successor.filter(|k| self.model.edges.contains_key(k)) {
            Some(edge) => {
                self.select_exact(&Selectable::Edge(edge));
                true
            }
            None => match last_pos {
                Some(pos) => self.select_nearest(pos),
                None => false,
            },
        };
        if reselected {
            self.notify_selection_changed();
        }
    }

    // ----- Denylist -----

    pub fn add_selected_to_denylist(&mut self) -> usize {
        let picked: Vec<(NodeKey, String)> = self
            .model
            .nodes
            .iter()
            .filter(|(_, n)| n.selected)
            .map(|(k, n)| (k.clone(), n.name.clone()))
            .collect();
        let count = picked.len();
        self.model.denylist.extend(picked);
        count
    }

    pub fn denylist(&self) -> &BTreeMap<NodeKey, String> {
        &self.model.denylist
    }

    pub fn remove_from_denylist(&mut self, key: &NodeKey) -> bool {
        self.model.denylist.remove(key).is_some()
    }

    // ----- Comments -----

    pub fn comment(&self, key: &NodeKey) -> &str {
        self.data
            .node_comments
            .get(key)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn update_selected_comment(&mut self, comment: &str) -> bool {
        let items = self.selected_items();
        let [item] = items.as_slice() else {
            return false;
        };
        match item {
            Selectable::Node(key) => {
                self.data
                    .node_comments
                    .insert(key.clone(), comment.to_string());
            }
            Selectable::Edge(key) => {
                if !self.model.contains_node(&key.src) || !self.model.contains_node(&key.tar) {
                    return false;
                }
                self.data
                    .edge_comments
                    .insert(key.clone(), comment.to_string());
            }
        }
        self.mark_layout_dirty();
        true
    }

    pub fn describe(&self, item: &Selectable) -> Option<(String, String)> {
        match item {
            Selectable::Node(key) => {
                let node = self.model.nodes.get(key)?;
                Some((node.name.clone(), self.comment(key).to_string()))
            }
            Selectable::Edge(key) => {
                let src = self.model.nodes.get(&key.src)?;
                let tar = self.model.nodes.get(&key.tar)?;
                let comment = self.data.edge_comments.get(key).cloned().unwrap_or_default();
                Some((format!("{} -> {}", src.name, tar.name), comment))
            }
        }
    }

    // ----- Positions -----

    pub fn set_targets(&mut self, targets: &HashMap<NodeKey, Vec2>) {
        for (key, target) in targets {
            if let Some(node) = self.model.nodes.get_mut(key) {
                node.target = *target;
            }
        }
    }

    pub fn advance_positions(&mut self) {
        let ratio = self.cfg.move_ratio;
        for node in self.model.nodes.values_mut() {
            node.move_to_target(ratio);
        }
    }

    pub fn is_auto_focus(&self) -> bool {
        self.cfg.auto_focus && self.focus.auto_focus_toggle
    }

    // ----- Views -----

    pub fn node_view(&self, key: &NodeKey) -> Option<NodeView> {
        let n = self.model.nodes.get(key)?;
        Some(NodeView {
            key: key.clone(),
            name: n.name.clone(),
            kind: n.kind,
            pos: n.pos,
            target: n.target,
            selected: n.selected,
            select_counter: n.select_counter,
            select_stamp: n.select_stamp,
            comment: self.data.node_comments.get(key).cloned(),
        })
    }

    pub fn edge_view(&self, key: &EdgeKey) -> Option<EdgeView> {
        let e = self.model.edges.get(key)?;
        Some(EdgeView {
            key: key.clone(),
            selected: e.selected,
            candidate: e.candidate,
            custom: e.origin.is_custom() || self.data.custom_edges.contains(key),
            call_order: e.call_order,
            comment: self.data.edge_comments.get(key).cloned(),
            scheme_colors: e.scheme_colors.to_vec(),
        })
    }

    pub fn node_views(&self) -> Vec<NodeView> {
        self.model
            .nodes
            .keys()
            .filter_map(|k| self.node_view(k))
            .collect()
    }

    pub fn edge_views(&self) -> Vec<EdgeView> {
        self.model
            .edges
            .keys()
            .filter_map(|k| self.edge_view(k))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::MemorySource;
    use codeatlas_core::Reference;

    pub(crate) fn call(line: u32) -> Reference {
        Reference {
            kind: "call".to_string(),
            file: "main.c".to_string(),
            line,
            column: 0,
        }
    }

    pub(crate) fn functions(names: &[&str]) -> MemorySource {
        let mut src = MemorySource::default();
        for n in names {
            src.insert_entity(Entity {
                key: NodeKey::from(*n),
                name: n.to_string(),
                kind: SymbolKind::Function,
                line_count: 10,
            });
        }
        src
    }

    pub(crate) fn place(st: &mut SceneState, key: &str, x: f32, y: f32) {
        let node = st
            .model
            .nodes
            .get_mut(&NodeKey::from(key))
            .expect("node present");
        node.pos = Vec2::new(x, y);
        node.target = node.pos;
    }

    #[test]
    fn add_node_rejects_duplicates_and_denied_keys() {
        let src = functions(&["a", "b"]);
        let mut st = SceneState::default();
        assert!(st.add_node(&"a".into(), &src));
        assert!(!st.add_node(&"a".into(), &src));

        st.model.denylist.insert("b".into(), "b".to_string());
        assert!(!st.add_node(&"b".into(), &src));
        assert!(!st.model.contains_node(&"b".into()));

        st.remove_from_denylist(&"b".into());
        assert!(st.add_node(&"b".into(), &src));
    }

    #[test]
    fn unknown_entity_uses_key_as_name() {
        let src = MemorySource::default();
        let mut st = SceneState::default();
        assert!(st.add_node(&"ns::thing".into(), &src));
        let view = st.node_view(&"ns::thing".into()).expect("view");
        assert_eq!(view.name, "ns::thing");
        assert_eq!(view.kind, SymbolKind::Other);
    }

    #[test]
    fn new_nodes_spawn_at_selection_centroid() {
        let src = functions(&["a", "b", "c"]);
        let mut st = SceneState::default();
        st.add_node(&"a".into(), &src);
        st.add_node(&"b".into(), &src);
        place(&mut st, "a", 2.0, 0.0);
        place(&mut st, "b", 4.0, 6.0);
        st.model.nodes.get_mut(&NodeKey::from("a")).expect("a").selected = true;
        st.model.nodes.get_mut(&NodeKey::from("b")).expect("b").selected = true;

        st.add_node(&"c".into(), &src);
        let c = st.node_view(&"c".into()).expect("c");
        assert_eq!(c.pos, Vec2::new(3.0, 3.0));
        assert_eq!(c.target, c.pos);
    }

    #[test]
    fn mutations_emit_surface_events_and_dirty_layout_once() {
        let src = functions(&["a", "b"]);
        let mut st = SceneState::default();
        st.add_node(&"a".into(), &src);
        st.add_node(&"b".into(), &src);
        st.add_edge(EdgeKey::new("a", "b"), EdgeOrigin::Custom);
        st.delete_node(&"a".into());

        let events = st.drain_events();
        assert_eq!(
            events,
            vec![
                SurfaceEvent::NodeAdded("a".into()),
                SurfaceEvent::LayoutDirty,
                SurfaceEvent::NodeAdded("b".into()),
                SurfaceEvent::EdgeAdded(EdgeKey::new("a", "b")),
                SurfaceEvent::EdgeRemoved(EdgeKey::new("a", "b")),
                SurfaceEvent::NodeRemoved("a".into()),
            ]
        );
        assert!(st.take_layout_dirty());
        assert!(!st.take_layout_dirty());
        assert!(st.data.custom_edges.contains(&EdgeKey::new("a", "b")));
    }

    #[test]
    fn lru_evicts_the_oldest_touched_node() {
        let src = functions(&["A", "B", "C"]);
        let mut st = SceneState::new(SceneConfig {
            lru_max_length: 2,
            ..SceneConfig::default()
        });
        for k in ["A", "B", "C"] {
            st.add_node(&k.into(), &src);
        }
        let keys: Vec<NodeKey> = ["A", "B", "C"].into_iter().map(NodeKey::from).collect();
        st.touch(&keys);
        let order: Vec<&str> = st.lru.iter().map(NodeKey::as_str).collect();
        assert_eq!(order, vec!["C", "B", "A"]);

        st.evict();
        assert!(!st.model.contains_node(&"A".into()));
        let order: Vec<&str> = st.lru.iter().map(NodeKey::as_str).collect();
        assert_eq!(order, vec!["C", "B"]);
        assert!(st.focus.events_enabled);
    }

    #[test]
    fn public_add_keeps_working_set_bounded() {
        let names: Vec<String> = (0..8).map(|i| format!("f{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let src = functions(&refs);
        let mut st = SceneState::new(SceneConfig {
            lru_max_length: 3,
            ..SceneConfig::default()
        });
        for n in &refs {
            st.add_node_touched(&NodeKey::from(*n), &src);
            assert!(st.lru.len() <= 3);
        }
        assert_eq!(st.model.nodes.len(), 3);
        assert!(st.model.contains_node(&"f7".into()));
        assert!(!st.model.contains_node(&"f0".into()));
    }

    #[test]
    fn delete_selected_can_forbid_and_reanchors_selection() {
        let src = functions(&["a", "b", "c"]);
        let mut st = SceneState::default();
        for k in ["a", "b", "c"] {
            st.add_node(&k.into(), &src);
        }
        place(&mut st, "a", 0.0, 0.0);
        place(&mut st, "b", 10.0, 0.0);
        place(&mut st, "c", 1.0, 1.0);
        st.select_exact(&Selectable::Node("a".into()));

        st.delete_selected(true);
        assert!(!st.model.contains_node(&"a".into()));
        assert!(st.denylist().contains_key(&NodeKey::from("a")));
        assert_eq!(st.selected_items(), vec![Selectable::Node("c".into())]);
        assert!(!st.add_node(&"a".into(), &src));
    }

    #[test]
    fn deleting_a_callee_selects_the_next_call() {
        let src = functions(&["main", "first", "second"]);
        let mut st = SceneState::default();
        for k in ["main", "first", "second"] {
            st.add_node(&k.into(), &src);
        }
        st.add_edge(EdgeKey::new("main", "first"), EdgeOrigin::Reference(call(1)));
        st.add_edge(EdgeKey::new("main", "second"), EdgeOrigin::Reference(call(2)));
        st.select_exact(&Selectable::Node("first".into()));

        st.delete_selected(false);
        assert_eq!(
            st.selected_items(),
            vec![Selectable::Edge(EdgeKey::new("main", "second"))]
        );
        assert!(st.denylist().is_empty());
    }

    #[test]
    fn comments_survive_eviction() {
        let src = functions(&["a"]);
        let mut st = SceneState::default();
        st.add_node(&"a".into(), &src);
        st.select_exact(&Selectable::Node("a".into()));
        assert!(st.update_selected_comment("entry point"));
        st.delete_node(&"a".into());
        st.add_node(&"a".into(), &src);
        assert_eq!(st.comment(&"a".into()), "entry point");
        assert_eq!(
            st.node_view(&"a".into()).and_then(|v| v.comment).as_deref(),
            Some("entry point")
        );
    }

    #[test]
    fn positions_ease_toward_targets() {
        let src = functions(&["a"]);
        let mut st = SceneState::new(SceneConfig {
            move_ratio: 0.5,
            ..SceneConfig::default()
        });
        st.add_node(&"a".into(), &src);
        let targets = HashMap::from([(NodeKey::from("a"), Vec2::new(8.0, 0.0))]);
        st.set_targets(&targets);
        st.advance_positions();
        assert_eq!(st.node_view(&"a".into()).expect("a").pos, Vec2::new(4.0, 0.0));
        st.advance_positions();
        assert_eq!(st.node_view(&"a".into()).expect("a").pos, Vec2::new(6.0, 0.0));
    }
}
