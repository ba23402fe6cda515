pub mod config;
pub mod geometry;
pub mod graph;
pub mod refresh;
pub mod scene;
pub mod source;
pub mod surface;
pub mod util;

pub use config::SceneConfig;
pub use graph::{EdgeOrigin, EdgeView, ExpandQuery, NodeView, SceneState};
pub use scene::Scene;
pub use source::{MemorySource, ReferenceSource, SourceDocument};
