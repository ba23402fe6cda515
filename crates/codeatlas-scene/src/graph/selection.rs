use codeatlas_core::{EdgeKey, NodeKey, Selectable, SurfaceEvent, Vec2};

use crate::graph::state::SceneState;

impl SceneState {
    pub fn clear_selection(&mut self) {
        for node in self.model.nodes.values_mut() {
            node.selected = false;
        }
        for edge in self.model.edges.values_mut() {
            edge.selected = false;
        }
    }

    // Clears the selection and selects exactly `item`. Returns true when a
    // node ended up selected, false for an edge or an absent item.
    pub fn select_exact(&mut self, item: &Selectable) -> bool {
        self.clear_selection();
        match item {
            Selectable::Node(key) => match self.model.nodes.get_mut(key) {
                Some(node) => {
                    node.selected = true;
                    true
                }
                None => false,
            },
            Selectable::Edge(key) => {
                if let Some(edge) = self.model.edges.get_mut(key) {
                    edge.selected = true;
                }
                false
            }
        }
    }

    pub fn contains_item(&self, item: &Selectable) -> bool {
        match item {
            Selectable::Node(key) => self.model.nodes.contains_key(key),
            Selectable::Edge(key) => self.model.edges.contains_key(key),
        }
    }

    pub fn selected_nodes(&self) -> Vec<NodeKey> {
        self.model
            .nodes
            .iter()
            .filter(|(_, n)| n.selected)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn selected_edges(&self) -> Vec<EdgeKey> {
        self.model
            .edges
            .iter()
            .filter(|(_, e)| e.selected)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn selected_items(&self) -> Vec<Selectable> {
        self.selected_nodes()
            .into_iter()
            .map(Selectable::Node)
            .chain(self.selected_edges().into_iter().map(Selectable::Edge))
            .collect()
    }

    pub fn selected_center(&self) -> Option<Vec2> {
        let mut sum = Vec2::ZERO;
        let mut count = 0u32;
        for node in self.model.nodes.values().filter(|n| n.selected) {
            sum += node.pos;
            count += 1;
        }
        for key in self
            .model
            .edges
            .iter()
            .filter(|(_, e)| e.selected)
            .map(|(k, _)| k)
        {
            if let Some(curve) = self.model.curve(key) {
                sum += curve.middle();
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f32)
    }

    pub fn nearest_node(&self, point: Vec2) -> Option<NodeKey> {
        let mut best: Option<(f32, &NodeKey)> = None;
        for (key, node) in &self.model.nodes {
            let d = node.pos.distance_squared(point);
            if best.map_or(true, |(b, _)| d < b) {
                best = Some((d, key));
            }
        }
        best.map(|(_, k)| k.clone())
    }

    pub fn select_nearest(&mut self, point: Vec2) -> bool {
        match self.nearest_node(point) {
            Some(key) => self.select_exact(&Selectable::Node(key)),
            None => false,
        }
    }

    // Focus bookkeeping after the selection changed: stamps and counts the
    // selected nodes, refreshes the working set, then trims it. Suppressed
    // while eviction runs.
    pub fn on_selection_changed(&mut self) -> bool {
        if !self.focus.events_enabled {
            return false;
        }
        let items = self.selected_items();
        self.focus.select_stamp += 1;
        let stamp = self.focus.select_stamp;

        let mut focused = Vec::new();
        for item in &items {
            if let Selectable::Node(key) = item {
                if let Some(node) = self.model.nodes.get_mut(key) {
                    node.select_counter += 1;
                    node.select_stamp = stamp;
                    focused.push(key.clone());
                }
            }
        }
        self.lru.touch(&focused);
        self.evict();

        if let [only] = items.as_slice() {
            if let Some((title, comment)) = self.describe(only) {
                self.emit(SurfaceEvent::SymbolDetail { title, comment });
            }
        }
        true
    }

    pub(crate) fn notify_selection_changed(&mut self) {
        self.on_selection_changed();
        self.recompute_valid_schemes();
    }

    // Marks the edges reachable by vertical navigation from the selected
    // edge, siding with the endpoint focused more recently.
    pub fn update_candidate_edges(&mut self) {
        for edge in self.model.edges.values_mut() {
            edge.candidate = false;
        }
        let Some(center) = self
            .model
            .edges
            .iter()
            .filter(|(_, e)| e.selected)
            .map(|(k, _)| k.clone())
            .last()
        else {
            self.focus.candidate_edges.clear();
            return;
        };

        let mut src_side = Vec::new();
        let mut tar_side = Vec::new();
        for key in self.model.edges.keys() {
            if *key == center {
                continue;
            }
            if key.src == center.src {
                src_side.push(key.clone());
            } else if key.tar == center.tar && key.src != center.tar {
                tar_side.push(key.clone());
            }
        }

        let use_source = match (src_side.is_empty(), tar_side.is_empty()) {
            (false, true) => true,
            (true, false) => false,
            _ => {
                let stamp = |k: &NodeKey| self.model.nodes.get(k).map_or(0, |n| n.select_stamp);
                stamp(&center.tar) <= stamp(&center.src)
            }
        };
        let chosen = if use_source { src_side } else { tar_side };
        for key in &chosen {
            if let Some(edge) = self.model.edges.get_mut(key) {
                edge.candidate = true;
            }
        }
        self.focus.source_candidate = use_source;
        self.focus.candidate_edges = chosen;
    }
}
