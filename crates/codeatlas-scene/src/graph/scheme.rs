use codeatlas_core::{EdgeKey, NodeKey, SchemeColor, SurfaceEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::model::EdgeOrigin;
use crate::graph::state::SceneState;
use crate::source::ReferenceSource;
use crate::util::ids::name_to_color;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeEdge {
    // Recreate as a user-drawn edge instead of re-resolving the reference.
    pub custom: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    pub nodes: Vec<NodeKey>,
    pub edges: BTreeMap<EdgeKey, SchemeEdge>,
}

#[derive(Debug, Default)]
pub struct SchemeBook {
    schemes: BTreeMap<String, Scheme>,
    valid: Vec<(String, SchemeColor)>,
}

impl SchemeBook {
    pub fn get(&self, name: &str) -> Option<&Scheme> {
        self.schemes.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.schemes.keys().cloned().collect()
    }

    pub fn valid(&self) -> &[(String, SchemeColor)] {
        &self.valid
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

impl SceneState {
    // Snapshots the selected nodes and the edges between them. An empty
    // selection saves nothing.
    pub fn save_scheme(&mut self, name: &str) -> bool {
        let nodes = self.selected_nodes();
        if nodes.is_empty() {
            return false;
        }
        let selected: BTreeSet<&NodeKey> = nodes.iter().collect();
        let edges = self
            .model
            .edges
            .iter()
            .filter(|(k, _)| selected.contains(&k.src) && selected.contains(&k.tar))
            .map(|(k, e)| {
                let custom = e.origin.is_custom() || self.data.custom_edges.contains(k);
                (k.clone(), SchemeEdge { custom })
            })
            .collect();

        let count = nodes.len();
        self.schemes
            .schemes
            .insert(name.to_string(), Scheme { nodes, edges });
        tracing::info!(scheme = name, nodes = count, "saved scheme");
        self.recompute_valid_schemes();
        true
    }

    pub fn delete_scheme(&mut self, name: &str) -> bool {
        let removed = self.schemes.schemes.remove(name).is_some();
        self.recompute_valid_schemes();
        removed
    }

    // Materializes the named scheme. With `select` its members become the
    // selection; otherwise the prior selection is restored afterwards.
    pub fn show_scheme(&mut self, name: &str, select: bool, source: &dyn ReferenceSource) -> bool {
        let Some(scheme) = self.schemes.get(name).cloned() else {
            return false;
        };
        let prior = (!select).then(|| (self.selected_nodes(), self.selected_edges()));

        for key in &scheme.nodes {
            self.add_node_touched(key, source);
        }

        self.clear_selection();
        if select {
            for key in &scheme.nodes {
                if let Some(node) = self.model.nodes.get_mut(key) {
                    node.selected = true;
                }
            }
        }

        for (key, member) in &scheme.edges {
            if member.custom || self.data.custom_edges.contains(key) {
                self.add_edge(key.clone(), EdgeOrigin::Custom);
            } else {
                match source.search_ref_obj(&key.src, &key.tar) {
                    Ok(Some(reference)) => {
                        self.add_edge(key.clone(), EdgeOrigin::Reference(reference));
                    }
                    Ok(None) => {
                        tracing::debug!(scheme = name, edge = %key, "dropping scheme edge without backing reference");
                    }
                    Err(err) => {
                        tracing::warn!(scheme = name, edge = %key, error = %err, "failed to resolve scheme edge");
                    }
                }
            }
            if select {
                if let Some(edge) = self.model.edges.get_mut(key) {
                    edge.selected = true;
                }
            }
        }

        if let Some((nodes, edges)) = prior {
            for key in &nodes {
                if let Some(node) = self.model.nodes.get_mut(key) {
                    node.selected = true;
                }
            }
            for key in &edges {
                if let Some(edge) = self.model.edges.get_mut(key) {
                    edge.selected = true;
                }
            }
        }
        true
    }

    pub fn show_valid_scheme(
        &mut self,
        index: usize,
        select: bool,
        source: &dyn ReferenceSource,
    ) -> bool {
        let Some((name, _)) = self.schemes.valid.get(index).cloned() else {
            return false;
        };
        self.show_scheme(&name, select, source)
    }

    // Finds the schemes touching the selection, colors them by name and tags
    // each member edge present in the graph with those colors.
    pub fn recompute_valid_schemes(&mut self) {
        let mut nodes: BTreeSet<NodeKey> = self.selected_nodes().into_iter().collect();
        let mut edges: BTreeSet<EdgeKey> = BTreeSet::new();
        for (key, edge) in self.model.edges.iter_mut() {
            edge.scheme_colors.clear();
            let src_selected = self.model.nodes.get(&key.src).is_some_and(|n| n.selected);
            let tar_selected = self.model.nodes.get(&key.tar).is_some_and(|n| n.selected);
            if edge.selected {
                nodes.insert(key.src.clone());
                nodes.insert(key.tar.clone());
            } else if src_selected {
                nodes.insert(key.src.clone());
            } else if tar_selected {
                nodes.insert(key.tar.clone());
            } else {
                continue;
            }
            edges.insert(key.clone());
        }

        let valid: Vec<(String, SchemeColor)> = self
            .schemes
            .schemes
            .iter()
            .filter(|(_, s)| {
                s.nodes.iter().any(|n| nodes.contains(n))
                    || s.edges.keys().any(|e| edges.contains(e))
            })
            .map(|(name, _)| (name.clone(), name_to_color(name)))
            .collect();

        for (name, color) in &valid {
            let Some(scheme) = self.schemes.schemes.get(name) else {
                continue;
            };
            for key in scheme.edges.keys() {
                if let Some(edge) = self.model.edges.get_mut(key) {
                    edge.scheme_colors.push(*color);
                }
            }
        }
        self.schemes.valid = valid;
        self.emit(SurfaceEvent::SchemesInvalidated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::tests::{call, functions};
    use codeatlas_core::Selectable;

    fn with_ab() -> (SceneState, crate::source::MemorySource) {
        let mut src = functions(&["A", "B", "C"]);
        src.insert_reference("A".into(), "B".into(), call(3));
        let mut st = SceneState::default();
        for k in ["A", "B", "C"] {
            st.add_node(&k.into(), &src);
        }
        st.add_edge(EdgeKey::new("A", "B"), EdgeOrigin::Reference(call(3)));
        (st, src)
    }

    fn select_nodes(st: &mut SceneState, keys: &[&str]) {
        st.clear_selection();
        for k in keys {
            st.model.nodes.get_mut(&NodeKey::from(*k)).expect("node").selected = true;
        }
    }

    #[test]
    fn save_requires_a_selection() {
        let (mut st, _) = with_ab();
        assert!(!st.save_scheme("empty"));
        assert!(st.schemes.is_empty());
    }

    #[test]
    fn scheme_round_trip_restores_members() {
        let (mut st, src) = with_ab();
        select_nodes(&mut st, &["A", "B"]);
        assert!(st.save_scheme("core"));
        let saved = st.schemes.get("core").expect("scheme");
        assert_eq!(saved.nodes, vec![NodeKey::from("A"), NodeKey::from("B")]);
        assert_eq!(saved.edges.len(), 1);

        st.clear();
        assert!(st.model.nodes.is_empty());

        assert!(st.show_scheme("core", true, &src));
        let keys: Vec<&str> = st.model.nodes.keys().map(NodeKey::as_str).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(st.model.edges.len(), 1);
        assert_eq!(
            st.selected_items(),
            vec![
                Selectable::Node("A".into()),
                Selectable::Node("B".into()),
                Selectable::Edge(EdgeKey::new("A", "B")),
            ]
        );
    }

    #[test]
    fn show_without_select_keeps_prior_selection() {
        let (mut st, src) = with_ab();
        select_nodes(&mut st, &["A", "B"]);
        st.save_scheme("core");
        st.delete_node(&"B".into());
        select_nodes(&mut st, &["C"]);

        assert!(st.show_scheme("core", false, &src));
        assert!(st.model.contains_node(&"B".into()));
        assert_eq!(st.selected_nodes(), vec![NodeKey::from("C")]);
        assert!(st.selected_edges().is_empty());
    }

    #[test]
    fn unresolvable_edges_are_dropped_and_custom_edges_recreated() {
        let (mut st, mut src) = with_ab();
        st.add_edge(EdgeKey::new("B", "C"), EdgeOrigin::Custom);
        select_nodes(&mut st, &["A", "B", "C"]);
        st.save_scheme("all");
        assert!(st.schemes.get("all").expect("scheme").edges[&EdgeKey::new("B", "C")].custom);

        st.clear();
        src.remove_references(&"A".into(), &"B".into());
        st.show_scheme("all", true, &src);
        assert!(!st.model.edges.contains_key(&EdgeKey::new("A", "B")));
        assert!(st.model.edges.contains_key(&EdgeKey::new("B", "C")));
        assert!(st.edge_view(&EdgeKey::new("B", "C")).expect("edge").custom);
    }

    #[test]
    fn valid_schemes_follow_selection_and_color_edges() {
        let (mut st, _) = with_ab();
        select_nodes(&mut st, &["A", "B"]);
        st.save_scheme("beta");
        st.save_scheme("alpha");
        select_nodes(&mut st, &["C"]);
        st.save_scheme("other");

        select_nodes(&mut st, &["A"]);
        st.recompute_valid_schemes();
        let names: Vec<&str> = st.schemes.valid().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        let colors = &st.model.edges[&EdgeKey::new("A", "B")].scheme_colors;
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0], name_to_color("alpha"));

        st.clear_selection();
        st.recompute_valid_schemes();
        assert!(st.schemes.valid().is_empty());
        assert!(st.model.edges[&EdgeKey::new("A", "B")].scheme_colors.is_empty());
    }

    #[test]
    fn deleting_a_scheme_updates_names() {
        let (mut st, src) = with_ab();
        select_nodes(&mut st, &["A"]);
        st.save_scheme("one");
        st.save_scheme("two");
        assert_eq!(st.schemes.names(), vec!["one".to_string(), "two".to_string()]);
        assert!(st.delete_scheme("one"));
        assert!(!st.delete_scheme("one"));
        assert_eq!(st.schemes.names(), vec!["two".to_string()]);
        assert!(st.show_valid_scheme(0, true, &src));
        assert!(!st.show_valid_scheme(5, true, &src));
    }
}
