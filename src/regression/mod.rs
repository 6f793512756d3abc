pub mod linear;
pub mod logistic;
