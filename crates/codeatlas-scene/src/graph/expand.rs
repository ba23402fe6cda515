use codeatlas_core::{EdgeKey, NodeKey};

use crate::graph::model::EdgeOrigin;
use crate::graph::state::SceneState;
use crate::source::ReferenceSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandQuery {
    pub ref_kind: String,
    pub entity_kind: String,
    // Draw edges from the selected node to the hit instead of the reverse.
    pub inverse: bool,
    pub max_count: Option<usize>,
}

impl SceneState {
    // Pulls the references of every selected node into the graph and returns
    // the keys of the nodes that were added.
    pub fn expand_references(
        &mut self,
        query: &ExpandQuery,
        source: &dyn ReferenceSource,
    ) -> Vec<NodeKey> {
        let center = self.selected_center();
        let max_count = query.max_count.filter(|m| *m > 0);
        let mut added = Vec::new();

        for from in self.selected_nodes() {
            let mut hits = match source.search_ref_entity(&from, &query.ref_kind, &query.entity_kind)
            {
                Ok(hits) => hits,
                Err(err) => {
                    tracing::warn!(node = %from, error = %err, "reference search failed");
                    continue;
                }
            };
            if max_count.is_some() {
                hits.sort_by(|a, b| b.0.line_count.cmp(&a.0.line_count));
            }

            let mut added_here = 0usize;
            for (entity, reference) in hits {
                let key = entity.key.clone();
                if self.add_node_with(&key, Some(entity)) {
                    added.push(key.clone());
                    added_here += 1;
                }
                let edge = if query.inverse {
                    EdgeKey::new(from.clone(), key)
                } else {
                    EdgeKey::new(key, from.clone())
                };
                self.add_edge(edge, EdgeOrigin::Reference(reference));
                if max_count.is_some_and(|m| added_here >= m) {
                    break;
                }
            }
        }

        self.touch(&added);
        self.evict();
        if let Some(point) = center {
            if self.select_nearest(point) {
                self.notify_selection_changed();
            }
        }
        tracing::debug!(
            ref_kind = %query.ref_kind,
            added = added.len(),
            "expanded references"
        );
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::tests::{call, place};
    use crate::source::MemorySource;
    use codeatlas_core::{Entity, Selectable, SymbolKind};

    fn db() -> MemorySource {
        let mut src = MemorySource::default();
        for (name, lines) in [("main", 50), ("small", 3), ("big", 90), ("mid", 20)] {
            src.insert_entity(Entity {
                key: name.into(),
                name: name.to_string(),
                kind: SymbolKind::Function,
                line_count: lines,
            });
        }
        for (i, callee) in ["small", "big", "mid"].into_iter().enumerate() {
            src.insert_reference("main".into(), callee.into(), call(i as u32 + 1));
        }
        src
    }

    fn query(inverse: bool, max_count: Option<usize>) -> ExpandQuery {
        ExpandQuery {
            ref_kind: if inverse { "call" } else { "callby" }.to_string(),
            entity_kind: "function".to_string(),
            inverse,
            max_count,
        }
    }

    fn start_at_main(src: &MemorySource) -> SceneState {
        let mut st = SceneState::default();
        st.add_node(&"main".into(), src);
        place(&mut st, "main", 0.0, 0.0);
        st.select_exact(&Selectable::Node("main".into()));
        st
    }

    #[test]
    fn callees_are_added_with_edges_from_the_caller() {
        let src = db();
        let mut st = start_at_main(&src);
        let added = st.expand_references(&query(true, None), &src);
        assert_eq!(added.len(), 3);
        for callee in ["small", "big", "mid"] {
            assert!(st.model.edges.contains_key(&EdgeKey::new("main", callee)));
        }
        assert_eq!(
            st.model.edges[&EdgeKey::new("main", "small")].call_order,
            Some(1)
        );
        assert_eq!(st.selected_items().len(), 1);
    }

    #[test]
    fn cap_prefers_larger_entities() {
        let src = db();
        let mut st = start_at_main(&src);
        let added = st.expand_references(&query(true, Some(2)), &src);
        assert_eq!(added, vec![NodeKey::from("big"), NodeKey::from("mid")]);
        assert!(!st.model.contains_node(&"small".into()));
    }

    #[test]
    fn callers_point_at_the_selected_node() {
        let src = db();
        let mut st = SceneState::default();
        st.add_node(&"big".into(), &src);
        st.select_exact(&Selectable::Node("big".into()));
        let added = st.expand_references(&query(false, None), &src);
        assert_eq!(added, vec![NodeKey::from("main")]);
        assert!(st.model.edges.contains_key(&EdgeKey::new("main", "big")));
    }

    #[test]
    fn denied_hits_are_skipped() {
        let src = db();
        let mut st = start_at_main(&src);
        st.model.denylist.insert("big".into(), "big".to_string());
        let added = st.expand_references(&query(true, None), &src);
        assert_eq!(added.len(), 2);
        assert!(!st.model.contains_node(&"big".into()));
        assert!(!st.model.edges.contains_key(&EdgeKey::new("main", "big")));
    }

    #[test]
    fn nothing_selected_adds_nothing() {
        let src = db();
        let mut st = SceneState::default();
        st.add_node(&"main".into(), &src);
        assert!(st.expand_references(&query(true, None), &src).is_empty());
        assert_eq!(st.model.nodes.len(), 1);
    }
}
