//! Per-country chart rendering and the on-disk image store.
//!
//! [`render_png`] is pure and CPU-bound. [`ImageDir`] implements
//! [`epistat_core::chart::ChartStore`] by rendering on the blocking pool and
//! writing `<code>.png` files into one directory.

mod dir;
mod render;

pub mod error;

pub use dir::ImageDir;
pub use error::{Error, Result};
pub use render::{ChartOptions, render_png};
