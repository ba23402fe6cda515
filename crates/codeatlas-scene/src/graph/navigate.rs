use codeatlas_core::{EdgeKey, NodeKey, Selectable, Vec2};

use crate::geometry::EdgeCurve;
use crate::graph::state::SceneState;

// A direction component above this counts as a strong axis.
const STRONG_AXIS: f32 = 0.8;
const EDGE_MIN_COS: f32 = 0.2;
const NODE_MIN_COS: f32 = 0.6;
// Distance along the direction is discounted by this much relative to the
// perpendicular distance.
const ALONG_DIVISOR: f32 = 3.0;
const CURVE_ALONG_DIVISOR: f32 = 2.0;
const UNCONNECTED_EDGE_PENALTY: f32 = 3.0;
const UNCONNECTED_NODE_PENALTY: f32 = 2.0;
const SOURCE_SIDE_ANCHOR: f32 = 0.3;
const TARGET_SIDE_ANCHOR: f32 = 0.7;

fn aligned_score(offset: Vec2, dir: Vec2, divisor: f32) -> f32 {
    let along = offset.dot(dir) / divisor;
    let across = offset.x * dir.y - offset.y * dir.x;
    along * along + across * across
}

fn cosine(offset: Vec2, dir: Vec2) -> Option<f32> {
    let len = offset.length();
    (len > f32::EPSILON).then(|| offset.dot(dir) / len)
}

type Slot = Option<(f32, Selectable)>;

fn offer(slot: &mut Slot, score: f32, item: Selectable) {
    if slot.as_ref().map_or(true, |(best, _)| score < *best) {
        *slot = Some((score, item));
    }
}

#[derive(Default)]
struct Buckets {
    edge_connected: Slot,
    edge: Slot,
    node_connected: Slot,
    node: Slot,
}

impl Buckets {
    fn offer_edge(&mut self, connected: bool, score: f32, key: &EdgeKey) {
        let slot = if connected {
            &mut self.edge_connected
        } else {
            &mut self.edge
        };
        offer(slot, score, Selectable::Edge(key.clone()));
    }

    fn offer_node(&mut self, connected: bool, score: f32, key: &NodeKey) {
        let slot = if connected {
            &mut self.node_connected
        } else {
            &mut self.node
        };
        offer(slot, score, Selectable::Node(key.clone()));
    }

    fn pick(self, dir: Vec2) -> Option<Selectable> {
        let Buckets {
            edge_connected,
            edge,
            node_connected,
            node,
        } = self;

        let first = |order: [&Slot; 4]| order.into_iter().find_map(|s| s.clone()).map(|(_, i)| i);
        if dir.x.abs() > STRONG_AXIS {
            if let Some(item) = first([&edge_connected, &edge, &node_connected, &node]) {
                return Some(item);
            }
        }
        if dir.y.abs() > STRONG_AXIS {
            if let Some(item) = first([&node, &node_connected, &edge_connected, &edge]) {
                return Some(item);
            }
        }

        let weighted = [
            edge.map(|(s, i)| (s * UNCONNECTED_EDGE_PENALTY, i)),
            edge_connected,
            node.map(|(s, i)| (s * UNCONNECTED_NODE_PENALTY, i)),
            node_connected,
        ];
        let mut best: Slot = None;
        for (score, item) in weighted.into_iter().flatten() {
            offer(&mut best, score, item);
        }
        best.map(|(_, i)| i)
    }
}

// Picks the item that focus should move to from the first selected item
// when stepping along `dir`. Reads candidate edges, so callers refresh them
// first.
pub fn find_neighbour(state: &SceneState, dir: Vec2) -> Option<Selectable> {
    match state.selected_items().into_iter().next()? {
        Selectable::Node(key) => from_node(state, &key, dir),
        Selectable::Edge(key) => from_edge(state, &key, dir),
    }
}

fn from_node(state: &SceneState, key: &NodeKey, dir: Vec2) -> Option<Selectable> {
    let model = &state.model;
    let center = model.nodes.get(key)?;

    // A horizontal step from a function enters its call list.
    if center.is_function() && dir.x.abs() > STRONG_AXIS {
        if let Some(out) = model.edges.keys().find(|e| &e.src == key) {
            return Some(Selectable::Edge(out.clone()));
        }
    }

    let origin = center.pos;
    let mut buckets = Buckets::default();
    for edge_key in model.edges.keys() {
        let Some(curve) = model.curve(edge_key) else {
            continue;
        };
        let offset = curve.middle() - origin;
        if !cosine(offset, dir).is_some_and(|c| c >= EDGE_MIN_COS) {
            continue;
        }
        let score = aligned_score(offset, dir, ALONG_DIVISOR);
        buckets.offer_edge(edge_key.touches(key), score, edge_key);
    }

    let neighbors = model.neighbors(key);
    for (node_key, node) in &model.nodes {
        if node_key == key {
            continue;
        }
        let offset = node.pos - origin;
        if !cosine(offset, dir).is_some_and(|c| c >= NODE_MIN_COS) {
            continue;
        }
        let score = aligned_score(offset, dir, ALONG_DIVISOR);
        buckets.offer_node(neighbors.contains(node_key), score, node_key);
    }
    buckets.pick(dir)
}

fn from_edge(state: &SceneState, key: &EdgeKey, dir: Vec2) -> Option<Selectable> {
    let model = &state.model;
    let edge = model.edges.get(key)?;
    let src = model.nodes.get(&key.src)?;
    let tar = model.nodes.get(&key.tar)?;
    let source_side = state.focus.source_candidate;

    // Vertical steps walk the caller's call list in order.
    if source_side && dir.y.abs() > STRONG_AXIS {
        if let Some(order) = edge.call_order {
            if !(src.is_function() && tar.is_function()) {
                return None;
            }
            let step = if dir.y > 0.0 {
                order.checked_add(1)
            } else {
                order.checked_sub(1)
            };
            let wanted = step?;
            return state
                .focus
                .candidate_edges
                .iter()
                .find(|c| {
                    c.src == key.src
                        && model.edges.get(*c).and_then(|e| e.call_order) == Some(wanted)
                })
                .map(|c| Selectable::Edge(c.clone()));
        }
    }

    let curve = EdgeCurve::new(src.pos, tar.pos);
    let anchor = curve.point_at(if source_side {
        SOURCE_SIDE_ANCHOR
    } else {
        TARGET_SIDE_ANCHOR
    });

    if dir.x.abs() > STRONG_AXIS {
        let proj = dir.dot((tar.pos - src.pos).normalize_or_zero());
        if proj > 0.0 {
            return Some(Selectable::Node(key.tar.clone()));
        }
        if proj < 0.0 {
            return Some(Selectable::Node(key.src.clone()));
        }
    }

    let mut best: Slot = None;
    for cand in &state.focus.candidate_edges {
        if cand == key || !cand.shares_endpoint(key) {
            continue;
        }
        let Some(other) = model.curve(cand) else {
            continue;
        };
        let probe = Vec2::new(anchor.x, other.y_at_x(anchor.x));
        let offset = probe - anchor;
        let cos = offset.dot(dir) / (offset.length() + 1e-5);
        if cos < 0.0 {
            continue;
        }
        offer(
            &mut best,
            aligned_score(offset, dir, CURVE_ALONG_DIVISOR),
            Selectable::Edge(cand.clone()),
        );
    }
    if let Some((_, item)) = best {
        return Some(item);
    }

    // No sibling edge in that direction: look for a node from the anchor.
    let mut buckets = Buckets::default();
    for (node_key, node) in &model.nodes {
        let offset = node.pos - anchor;
        if !cosine(offset, dir).is_some_and(|c| c >= NODE_MIN_COS) {
            continue;
        }
        let score = aligned_score(offset, dir, ALONG_DIVISOR);
        buckets.offer_node(key.touches(node_key), score, node_key);
    }
    buckets.pick(dir)
}

impl SceneState {
    // Moves the selection one step along `dir`. Leaves the selection alone
    // when nothing qualifies.
    pub fn navigate(&mut self, dir: Vec2) -> Option<Selectable> {
        self.update_candidate_edges();
        let next = find_neighbour(self, dir)?;
        self.select_exact(&next);
        self.notify_selection_changed();
        tracing::trace!(?next, "navigated");
        Some(next)
    }
}
