use anyhow::Context;
use codeatlas_core::{Entity, NodeKey, Reference};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// The code database the scene expands from. Implementations must not block
// indefinitely: they are queried while the scene lock is held.
pub trait ReferenceSource: Send + Sync {
    fn entity(&self, key: &NodeKey) -> Option<Entity>;

    // Entities reachable from `from` through references of `ref_kind`,
    // restricted to `entity_kind`, each paired with the reference itself.
    fn search_ref_entity(
        &self,
        from: &NodeKey,
        ref_kind: &str,
        entity_kind: &str,
    ) -> anyhow::Result<Vec<(Entity, Reference)>>;

    fn search_ref_obj(&self, src: &NodeKey, tar: &NodeKey) -> anyhow::Result<Option<Reference>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefRecord {
    pub src: NodeKey,
    pub tar: NodeKey,
    pub reference: Reference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceDocument {
    pub entities: Vec<Entity>,
    pub references: Vec<RefRecord>,
}

#[derive(Debug, Default)]
pub struct MemorySource {
    entities: HashMap<NodeKey, Entity>,
    references: Vec<RefRecord>,
}

impl MemorySource {
    pub fn new(doc: SourceDocument) -> Self {
        let entities = doc
            .entities
            .into_iter()
            .map(|e| (e.key.clone(), e))
            .collect();
        Self {
            entities,
            references: doc.references,
        }
    }

    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let doc: SourceDocument =
            serde_json::from_str(data).context("failed to parse reference database")?;
        Ok(Self::new(doc))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read reference database {}", path.display()))?;
        Self::from_json(&data)
    }

    pub fn insert_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.key.clone(), entity);
    }

    pub fn insert_reference(&mut self, src: NodeKey, tar: NodeKey, reference: Reference) {
        self.references.push(RefRecord {
            src,
            tar,
            reference,
        });
    }

    pub fn remove_references(&mut self, src: &NodeKey, tar: &NodeKey) {
        self.references
            .retain(|r| !(&r.src == src && &r.tar == tar));
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

fn kind_matches(filter: &str, kind: &str) -> bool {
    filter
        .split(',')
        .map(str::trim)
        .any(|f| f == "*" || f.eq_ignore_ascii_case(kind))
}

impl ReferenceSource for MemorySource {
    fn entity(&self, key: &NodeKey) -> Option<Entity> {
        self.entities.get(key).cloned()
    }

    fn search_ref_entity(
        &self,
        from: &NodeKey,
        ref_kind: &str,
        entity_kind: &str,
    ) -> anyhow::Result<Vec<(Entity, Reference)>> {
        let mut out = Vec::new();
        for wanted in ref_kind.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            // "callby" walks "call" references backwards
            let (kind, inverse) = match wanted.strip_suffix("by") {
                Some(base) if !base.is_empty() => (base, true),
                _ => (wanted, false),
            };
            for rec in &self.references {
                if !kind_matches(kind, &rec.reference.kind) {
                    continue;
                }
                let (near, far) = if inverse {
                    (&rec.tar, &rec.src)
                } else {
                    (&rec.src, &rec.tar)
                };
                if near != from {
                    continue;
                }
                let Some(ent) = self.entities.get(far) else {
                    continue;
                };
                if !kind_matches(entity_kind, ent.kind.as_str()) {
                    continue;
                }
                out.push((ent.clone(), rec.reference.clone()));
            }
        }
        Ok(out)
    }

    fn search_ref_obj(&self, src: &NodeKey, tar: &NodeKey) -> anyhow::Result<Option<Reference>> {
        Ok(self
            .references
            .iter()
            .find(|r| &r.src == src && &r.tar == tar)
            .map(|r| r.reference.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB: &str = r#"{
        "entities": [
            {"key": "main", "name": "main", "kind": "function", "line_count": 40},
            {"key": "parse", "name": "parse", "kind": "function", "line_count": 12},
            {"key": "Config", "name": "Config", "kind": "class"}
        ],
        "references": [
            {"src": "main", "tar": "parse", "reference": {"kind": "call", "line": 3}},
            {"src": "main", "tar": "Config", "reference": {"kind": "use", "line": 2}}
        ]
    }"#;

    #[test]
    fn forward_and_inverse_search() {
        let src = MemorySource::from_json(DB).expect("parse db");
        let callees = src
            .search_ref_entity(&"main".into(), "call", "function")
            .expect("search");
        assert_eq!(callees.len(), 1);
        assert_eq!(callees[0].0.name, "parse");

        let callers = src
            .search_ref_entity(&"parse".into(), "callby", "*")
            .expect("search");
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].0.key, NodeKey::from("main"));
    }

    #[test]
    fn entity_kind_filter_applies() {
        let src = MemorySource::from_json(DB).expect("parse db");
        let hits = src
            .search_ref_entity(&"main".into(), "call,use", "class")
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.key, NodeKey::from("Config"));
    }

    #[test]
    fn ref_obj_lookup_is_directional() {
        let src = MemorySource::from_json(DB).expect("parse db");
        assert!(src
            .search_ref_obj(&"main".into(), &"parse".into())
            .expect("lookup")
            .is_some());
        assert!(src
            .search_ref_obj(&"parse".into(), &"main".into())
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(MemorySource::from_json("{ nope").is_err());
    }
}
