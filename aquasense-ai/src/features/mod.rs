//! Fixed-order feature layout for the water-quality classifier
//!
//! [`catalog`] defines the slot order, model column names and training-time
//! defaults. [`vector`] builds a [`FeatureVector`] from a sparse reading and
//! records which slots were measured and which were defaulted.

pub mod catalog;
pub mod vector;

pub use catalog::{CatalogEntry, FEATURE_CATALOG, FEATURE_COUNT};
pub use vector::{FeatureVector, Provenance};
