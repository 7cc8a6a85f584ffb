pub mod error;
pub mod graph;
pub mod graph_stream;
pub mod parameters;
pub mod querier;
pub mod random_walk;
pub mod report;
pub mod rng;
pub mod sampler;
pub mod weight_function;

pub type Node = usize;

pub use error::{Error, Result};
pub use graph::Edge;

pub mod prelude {
    use super::*;

    pub use super::{Edge, Error, Node, Result};
    pub use graph_stream::{GraphReader, GraphWriter};
    pub use querier::{GraphQuerier, WeightedGraphQuerier};
    pub use random_walk::{RandomWalk, StepPolicy, Walk};
    pub use weight_function::WeightFunction;
}
