//! Core types and trait definitions for epistat.
//!
//! This crate is deliberately free of HTTP, database and imaging
//! dependencies. Every other crate depends on it; it depends on nothing but
//! serde.

pub mod chart;
pub mod derive;
pub mod error;
pub mod series;
pub mod snapshot;
pub mod store;
pub mod upstream;

pub use error::{Error, Result};
