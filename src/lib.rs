//! # Ferrite-ml
//!
//! `ferrite-ml` provides implementations of various classification, regression and clustering
//! algorithms using Rust. It also contains some utility functions for data manipulation and
//! metrics.
//!
//! ## Getting Started
//!
//! To use `ferrite-ml`, add the following to your `Cargo.toml` file:
//!
//! ```toml
//! [dependencies]
//! ferrite-ml = "*"
//! ```
//!
//! ## Example Usage
//!
//! As a quick example, here's how you can use `ferrite-ml` to train a decision tree classifier
//! on an example dataset:
//!
//! ```rust
//!
//! use ferrite_ml::data::dataset::Dataset;
//! use ferrite_ml::trees::classifier::DecisionTreeClassifier;
//! use nalgebra::{DMatrix, DVector};
//!
//! let x = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
//! let y = DVector::from_vec(vec![0, 0, 1, 1]);
//!
//! let dataset = Dataset::new(x, y);
//!
//! let mut model = DecisionTreeClassifier::new();
//!
//! model.fit(&dataset).unwrap();
//!
//! let test_x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 7.0, 8.0]);
//!
//! let predictions = model.predict(&test_x).unwrap();
//! assert_eq!(predictions, DVector::from_vec(vec![0, 1]));
//! ```

/// Clustering algorithms
pub mod cluster;
/// Dataset and data manipulation utilities
pub mod data;
/// Error type shared by all models
pub mod error;
/// Radial basis function kernels
pub mod kernel;
/// Functions for evaluating model performance
pub mod metrics;
/// Cross-validation utilities
pub mod model_selection;
/// Nearest-neighbour search structures
pub mod neighbors;
/// Regression analysis algorithms
pub mod regression;
/// Decision trees
pub mod trees;
