//! Chord catalog, name resolution and diagram rendering.

pub mod catalog;
pub mod diagram;
pub mod resolve;

pub use catalog::{ChordCatalog, Voicing};
pub use resolve::{parse_chord_name, resolve};
