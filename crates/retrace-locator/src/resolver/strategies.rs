//! Built-in resolution strategies, highest priority first.

use std::sync::LazyLock;

use regex::Regex;
use retrace_protocols::{Document, NodeId};

use super::ResolveStrategy;
use crate::selector::Selector;

static NAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="([^"]+)""#).expect("name pattern is valid"));

static ID_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z0-9_-]+)").expect("id pattern is valid"));

/// The locator as written.
pub struct ExactMatch;

impl ResolveStrategy for ExactMatch {
    fn name(&self) -> &str {
        "exact"
    }

    fn try_resolve(&self, doc: &Document, locator: &str) -> Option<NodeId> {
        Selector::parse(locator).ok()?.query_first(doc)
    }
}

/// The locator without `:nth-of-type` / `:nth-child` qualifiers.
pub struct StripPositional;

impl ResolveStrategy for StripPositional {
    fn name(&self) -> &str {
        "strip-positional"
    }

    fn try_resolve(&self, doc: &Document, locator: &str) -> Option<NodeId> {
        let selector = Selector::parse(locator).ok()?;
        if !selector.has_positions() {
            return None;
        }
        selector.without_positions().query_first(doc)
    }
}

/// The right-most segment carrying an attribute filter, alone.
pub struct LastAttributeSegment;

impl ResolveStrategy for LastAttributeSegment {
    fn name(&self) -> &str {
        "last-attribute-segment"
    }

    fn try_resolve(&self, doc: &Document, locator: &str) -> Option<NodeId> {
        Selector::parse(locator)
            .ok()?
            .last_attribute_compound()?
            .query_first(doc)
    }
}

/// A form-like element whose `name` matches the one in the locator.
pub struct FormName;

impl ResolveStrategy for FormName {
    fn name(&self) -> &str {
        "form-name"
    }

    fn try_resolve(&self, doc: &Document, locator: &str) -> Option<NodeId> {
        let name = NAME_ATTR.captures_iter(locator).last()?.get(1)?.as_str();
        doc.iter().find(|n| {
            let el = doc.element(*n);
            let form_like = el.is_form_control() || matches!(el.tag.as_str(), "button" | "form");
            form_like && el.attr("name") == Some(name)
        })
    }
}

/// The element whose `id` appears as `#id` in the locator.
pub struct IdFragment;

impl ResolveStrategy for IdFragment {
    fn name(&self) -> &str {
        "id-fragment"
    }

    fn try_resolve(&self, doc: &Document, locator: &str) -> Option<NodeId> {
        let id = ID_FRAGMENT.captures_iter(locator).last()?.get(1)?.as_str();
        doc.get_element_by_id(id)
    }
}
