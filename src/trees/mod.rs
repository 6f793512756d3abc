pub mod builder;
pub mod classifier;
pub mod impurity;
pub mod node;
pub mod params;
pub mod pruning;
pub mod regressor;
mod selector;
