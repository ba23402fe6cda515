pub mod expand;
pub mod lru;
pub mod model;
pub mod navigate;
pub mod scheme;
pub mod selection;
pub mod state;

pub use expand::ExpandQuery;
pub use lru::WorkingSet;
pub use model::{EdgeOrigin, GraphModel};
pub use navigate::find_neighbour;
pub use scheme::{Scheme, SchemeBook, SchemeEdge};
pub use state::{EdgeView, NodeView, SceneState};
