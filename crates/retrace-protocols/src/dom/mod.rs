//! Element tree snapshots of a target surface.
//!
//! A [`Document`] is an arena of elements in document order. Surfaces
//! produce one per snapshot; locators are generated against and resolved
//! into it, and the resulting [`ElementHandle`] is what surfaces act on.

mod dom_node;
mod dom_tree;
mod markup;

pub use dom_node::{Element, ElementHandle, NodeId};
pub use dom_tree::{Document, Subtree};
pub use markup::MarkupError;

#[cfg(test)]
#[path = "dom_tests.rs"]
mod tests;
