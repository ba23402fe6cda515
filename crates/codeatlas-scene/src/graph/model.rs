use codeatlas_core::{EdgeKey, NodeKey, Reference, SchemeColor, SymbolKind, Vec2};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::EdgeCurve;

#[derive(Debug, Clone)]
pub struct NodeState {
    pub name: String,
    pub kind: SymbolKind,
    pub pos: Vec2,
    pub target: Vec2,
    pub selected: bool,
    pub select_counter: u32,
    pub select_stamp: u64,
}

impl NodeState {
    pub fn new(name: String, kind: SymbolKind, pos: Vec2) -> Self {
        Self {
            name,
            kind,
            pos,
            target: pos,
            selected: false,
            select_counter: 0,
            select_stamp: 0,
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind.is_function()
    }

    pub fn move_to_target(&mut self, ratio: f32) {
        self.pos = self.pos.lerp(self.target, ratio.clamp(0.0, 1.0));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EdgeOrigin {
    #[default]
    Unspecified,
    Custom,
    Reference(Reference),
}

impl EdgeOrigin {
    pub fn is_custom(&self) -> bool {
        matches!(self, EdgeOrigin::Custom)
    }

    fn reference(&self) -> Option<&Reference> {
        match self {
            EdgeOrigin::Reference(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeState {
    pub origin: EdgeOrigin,
    pub selected: bool,
    pub candidate: bool,
    pub call_order: Option<u32>,
    pub scheme_colors: SmallVec<[SchemeColor; 2]>,
}

impl EdgeState {
    pub fn new(origin: EdgeOrigin) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }
}

// Node/edge existence plus the denylist. Ordered maps keep iteration (and so
// every tie-break that depends on it) stable.
#[derive(Default)]
pub struct GraphModel {
    pub nodes: BTreeMap<NodeKey, NodeState>,
    pub edges: BTreeMap<EdgeKey, EdgeState>,
    // Forbidden keys mapped to the display name they had when forbidden.
    pub denylist: BTreeMap<NodeKey, String>,
}

impl GraphModel {
    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn is_denied(&self, key: &NodeKey) -> bool {
        self.denylist.contains_key(key)
    }

    pub fn insert_node(&mut self, key: NodeKey, node: NodeState) -> bool {
        if self.nodes.contains_key(&key) || self.is_denied(&key) {
            return false;
        }
        self.nodes.insert(key, node);
        true
    }

    // Removes every edge touching `key`, then the node. Returns the removed
    // edge keys, or `None` when the node was absent.
    pub fn remove_node(&mut self, key: &NodeKey) -> Option<Vec<EdgeKey>> {
        if !self.nodes.contains_key(key) {
            return None;
        }
        let touching: Vec<EdgeKey> = self
            .edges
            .keys()
            .filter(|e| e.touches(key))
            .cloned()
            .collect();
        let mut sources: BTreeSet<NodeKey> = BTreeSet::new();
        for edge in &touching {
            self.edges.remove(edge);
            sources.insert(edge.src.clone());
        }
        self.nodes.remove(key);
        for src in sources {
            self.recompute_call_order(&src);
        }
        Some(touching)
    }

    pub fn insert_edge(&mut self, key: EdgeKey, edge: EdgeState) -> bool {
        if self.edges.contains_key(&key) {
            return false;
        }
        if !self.nodes.contains_key(&key.src) || !self.nodes.contains_key(&key.tar) {
            return false;
        }
        let src = key.src.clone();
        self.edges.insert(key, edge);
        self.recompute_call_order(&src);
        true
    }

    pub fn remove_edge(&mut self, key: &EdgeKey) -> Option<EdgeState> {
        let removed = self.edges.remove(key)?;
        self.recompute_call_order(&key.src);
        Some(removed)
    }

    pub fn edges_for_node<'a>(
        &'a self,
        key: &'a NodeKey,
    ) -> impl Iterator<Item = (&'a EdgeKey, &'a EdgeState)> + 'a {
        self.edges.iter().filter(move |(k, _)| k.touches(key))
    }

    pub fn neighbors(&self, key: &NodeKey) -> BTreeSet<NodeKey> {
        self.edges_for_node(key)
            .map(|(e, _)| if &e.src == key { e.tar.clone() } else { e.src.clone() })
            .collect()
    }

    pub fn curve(&self, key: &EdgeKey) -> Option<EdgeCurve> {
        let src = self.nodes.get(&key.src)?;
        let tar = self.nodes.get(&key.tar)?;
        Some(EdgeCurve::new(src.pos, tar.pos))
    }

    pub fn edge_by_call_order(&self, src: &NodeKey, order: u32) -> Option<&EdgeKey> {
        self.edges
            .iter()
            .find(|(k, e)| &k.src == src && e.call_order == Some(order))
            .map(|(k, _)| k)
    }

    // Numbers the function-to-function reference edges leaving `src` by call
    // site position, starting at 1. Other edges from `src` lose any order.
    pub fn recompute_call_order(&mut self, src: &NodeKey) {
        let src_is_function = self
            .nodes
            .get(src)
            .map(NodeState::is_function)
            .unwrap_or(false);

        let mut ordered: Vec<(u32, u32, EdgeKey)> = Vec::new();
        for (key, edge) in self.edges.iter() {
            if &key.src != src {
                continue;
            }
            let tar_is_function = self
                .nodes
                .get(&key.tar)
                .map(NodeState::is_function)
                .unwrap_or(false);
            match edge.origin.reference() {
                Some(r) if src_is_function && tar_is_function => {
                    ordered.push((r.line, r.column, key.clone()));
                }
                _ => {}
            }
        }
        ordered.sort();

        for (key, edge) in self.edges.iter_mut() {
            if &key.src == src {
                edge.call_order = None;
            }
        }
        for (i, (_, _, key)) in ordered.into_iter().enumerate() {
            if let Some(edge) = self.edges.get_mut(&key) {
                edge.call_order = Some(i as u32 + 1);
            }
        }
    }
}
