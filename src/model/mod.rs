pub mod edge;
pub mod motif;
pub mod node;
pub mod score;

pub use edge::*;
pub use motif::*;
pub use node::*;
pub use score::*;
