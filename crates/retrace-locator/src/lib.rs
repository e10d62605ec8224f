//! # Retrace Locator
//!
//! Builds locator strings for elements and resolves them back.
//!
//! - [`LocatorGenerator`] walks from an element towards the root and emits
//!   the most specific stable locator it can.
//! - [`LocatorResolver`] tries an ordered list of [`ResolveStrategy`]
//!   implementations; the first hit wins.
//! - [`Selector`] is the small selector dialect both sides share.

mod generator;
mod resolver;
mod selector;

pub use generator::{LocatorGenerator, LocatorOptions};
pub use resolver::{
    ExactMatch, FormName, IdFragment, LastAttributeSegment, LocatorResolver, ResolveStrategy,
    StripPositional,
};
pub use selector::{AttrFilter, Combinator, Compound, Position, Selector, is_css_ident};
