use codeatlas_core::{EdgeKey, NodeKey, SchemeColor, Selectable, SurfaceEvent, Vec2};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::SceneConfig;
use crate::graph::{EdgeOrigin, EdgeView, ExpandQuery, NodeView, SceneState};
use crate::source::ReferenceSource;

// Shared handle to the scene. Every operation runs under one lock and
// flushes the notifications it produced before releasing it.
#[derive(Clone)]
pub struct Scene {
    state: Arc<Mutex<SceneState>>,
    source: Arc<dyn ReferenceSource>,
    tx: Sender<SurfaceEvent>,
}

impl Scene {
    pub fn new(cfg: SceneConfig, source: Arc<dyn ReferenceSource>) -> (Self, Receiver<SurfaceEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let scene = Self {
            state: Arc::new(Mutex::new(SceneState::new(cfg))),
            source,
            tx,
        };
        (scene, rx)
    }

    pub fn surface_sender(&self) -> Sender<SurfaceEvent> {
        self.tx.clone()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SceneState, &dyn ReferenceSource) -> R) -> R {
        let mut st = self.state.lock();
        let out = f(&mut *st, self.source.as_ref());
        for ev in st.drain_events() {
            // A closed surface only means nobody is watching.
            let _ = self.tx.send(ev);
        }
        out
    }

    pub fn read<R>(&self, f: impl FnOnce(&SceneState) -> R) -> R {
        f(&*self.state.lock())
    }

    // ----- Graph store -----

    pub fn add_node(&self, key: &NodeKey) -> bool {
        self.with_state(|st, src| st.add_node_touched(key, src))
    }

    pub fn add_edge(&self, src: &NodeKey, tar: &NodeKey) -> bool {
        self.with_state(|st, source| {
            let origin = match source.search_ref_obj(src, tar) {
                Ok(Some(reference)) => EdgeOrigin::Reference(reference),
                Ok(None) => EdgeOrigin::Unspecified,
                Err(err) => {
                    tracing::warn!(%src, %tar, error = %err, "reference lookup failed");
                    EdgeOrigin::Unspecified
                }
            };
            st.add_edge(EdgeKey::new(src.clone(), tar.clone()), origin)
        })
    }

    pub fn add_custom_edge(&self, src: &NodeKey, tar: &NodeKey) -> bool {
        self.with_state(|st, _| st.add_edge(EdgeKey::new(src.clone(), tar.clone()), EdgeOrigin::Custom))
    }

    pub fn delete_node(&self, key: &NodeKey) -> bool {
        self.with_state(|st, _| st.delete_node(key))
    }

    pub fn delete_edge(&self, key: &EdgeKey) -> bool {
        self.with_state(|st, _| st.delete_edge(key))
    }

    pub fn clear(&self) {
        self.with_state(|st, _| st.clear())
    }

    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.read(|st| st.model.contains_node(key))
    }

    pub fn nodes(&self) -> Vec<NodeView> {
        self.read(SceneState::node_views)
    }

    pub fn edges(&self) -> Vec<EdgeView> {
        self.read(SceneState::edge_views)
    }

    pub fn node(&self, key: &NodeKey) -> Option<NodeView> {
        self.read(|st| st.node_view(key))
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<EdgeView> {
        self.read(|st| st.edge_view(key))
    }

    // ----- Working set -----

    pub fn touch(&self, keys: &[NodeKey]) {
        self.with_state(|st, _| {
            st.touch(keys);
            st.evict();
        })
    }

    pub fn working_set(&self) -> Vec<NodeKey> {
        self.read(|st| st.lru.iter().cloned().collect())
    }

    pub fn set_lru_cap(&self, cap: usize) {
        self.with_state(|st, _| st.set_lru_cap(cap))
    }

    // ----- Selection -----

    pub fn select(&self, item: &Selectable) -> bool {
        self.with_state(|st, _| {
            let found = st.contains_item(item);
            st.select_exact(item);
            st.notify_selection_changed();
            found
        })
    }

    pub fn clear_selection(&self) {
        self.with_state(|st, _| {
            st.clear_selection();
            st.notify_selection_changed();
        })
    }

    pub fn select_nearest(&self, point: Vec2) -> bool {
        self.with_state(|st, _| {
            let found = st.select_nearest(point);
            if found {
                st.notify_selection_changed();
            }
            found
        })
    }

    pub fn selected_items(&self) -> Vec<Selectable> {
        self.read(SceneState::selected_items)
    }

    pub fn selected_center(&self) -> Option<Vec2> {
        self.read(SceneState::selected_center)
    }

    pub fn navigate(&self, dir: Vec2) -> Option<Selectable> {
        self.with_state(|st, _| st.navigate(dir))
    }

    pub fn is_auto_focus(&self) -> bool {
        self.read(SceneState::is_auto_focus)
    }

    pub fn toggle_auto_focus(&self) -> bool {
        self.with_state(|st, _| {
            st.focus.auto_focus_toggle = !st.focus.auto_focus_toggle;
            st.is_auto_focus()
        })
    }

    // ----- Deletion and denylist -----

    pub fn delete_selected(&self, add_to_denylist: bool) {
        self.with_state(|st, _| st.delete_selected(add_to_denylist))
    }

    pub fn add_selected_to_denylist(&self) -> usize {
        self.with_state(|st, _| st.add_selected_to_denylist())
    }

    pub fn denylist(&self) -> BTreeMap<NodeKey, String> {
        self.read(|st| st.denylist().clone())
    }

    pub fn remove_from_denylist(&self, key: &NodeKey) -> bool {
        self.with_state(|st, _| st.remove_from_denylist(key))
    }

    // ----- Comments -----

    pub fn update_selected_comment(&self, comment: &str) -> bool {
        self.with_state(|st, _| st.update_selected_comment(comment))
    }

    pub fn comment(&self, key: &NodeKey) -> String {
        self.read(|st| st.comment(key).to_string())
    }

    // ----- Expansion -----

    pub fn expand_references(&self, query: &ExpandQuery) -> Vec<NodeKey> {
        self.with_state(|st, src| st.expand_references(query, src))
    }

    // ----- Schemes -----

    pub fn save_scheme(&self, name: &str) -> bool {
        self.with_state(|st, _| st.save_scheme(name))
    }

    pub fn delete_scheme(&self, name: &str) -> bool {
        self.with_state(|st, _| st.delete_scheme(name))
    }

    pub fn show_scheme(&self, name: &str, select: bool) -> bool {
        self.with_state(|st, src| {
            let shown = st.show_scheme(name, select, src);
            if shown && select {
                st.notify_selection_changed();
            }
            shown
        })
    }

    pub fn show_valid_scheme(&self, index: usize, select: bool) -> bool {
        self.with_state(|st, src| {
            let shown = st.show_valid_scheme(index, select, src);
            if shown && select {
                st.notify_selection_changed();
            }
            shown
        })
    }

    pub fn scheme_names(&self) -> Vec<String> {
        self.read(|st| st.schemes.names())
    }

    pub fn valid_schemes(&self) -> Vec<(String, SchemeColor)> {
        self.read(|st| st.schemes.valid().to_vec())
    }

    // ----- Positions -----

    pub fn set_targets(&self, targets: &HashMap<NodeKey, Vec2>) {
        self.with_state(|st, _| st.set_targets(targets))
    }

    // Called by the presentation owner when the refresh worker ticks.
    pub fn advance_positions(&self) {
        self.with_state(|st, _| st.advance_positions())
    }

    pub fn take_layout_dirty(&self) -> bool {
        self.with_state(|st, _| st.take_layout_dirty())
    }
}
