//! Utilities shared across the package and template layers.

pub mod xml;
