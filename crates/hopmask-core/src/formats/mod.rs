//! Input artifact formats.

mod graph_json;
mod split_index;

pub use graph_json::{EdgeTypeSpec, GraphFile, NodeTypeSpec};
pub use split_index::SplitIndex;
