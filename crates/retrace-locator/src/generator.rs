//! Locator generation.

use retrace_protocols::{Document, Element, LocatorError, NodeId};

use crate::selector::{Compound, Position, is_css_ident};

/// Knobs for [`LocatorGenerator`].
#[derive(Debug, Clone)]
pub struct LocatorOptions {
    /// Class prefixes treated as framework-private and never used.
    pub private_class_prefixes: Vec<String>,
    /// Classes kept per path segment.
    pub max_classes: usize,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            private_class_prefixes: ["ng-", "css-", "jsx-", "sc-", "svelte-", "ember-", "v-"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_classes: 2,
        }
    }
}

/// Builds the most specific stable locator for an element.
///
/// A stable identifier (`#id`, a unique `data-testid`, or a unique form
/// control `name`) wins outright. Otherwise the locator is a `>` path of
/// `tag.class` segments from the nearest uniquely identified ancestor (or
/// the root) down to the element, with `:nth-of-type` added wherever a
/// segment alone would be ambiguous among its siblings.
#[derive(Debug, Clone, Default)]
pub struct LocatorGenerator {
    options: LocatorOptions,
}

impl LocatorGenerator {
    pub fn new(options: LocatorOptions) -> Self {
        Self { options }
    }

    pub fn generate(&self, doc: &Document, node: NodeId) -> Result<String, LocatorError> {
        if !doc.contains(node) {
            return Err(LocatorError::DetachedNode);
        }
        let node = retarget_svg(doc, node);

        if let Some(stable) = self.stable_identifier(doc, node) {
            return Ok(stable);
        }

        let mut segments = vec![self.segment(doc, node)];
        for ancestor in doc.ancestors(node) {
            if let Some(id) = unique_id(doc, doc.element(ancestor)) {
                segments.push(format!("#{id}"));
                break;
            }
            segments.push(self.segment(doc, ancestor));
        }

        segments.reverse();
        Ok(segments.join(" > "))
    }

    fn stable_identifier(&self, doc: &Document, node: NodeId) -> Option<String> {
        let el = doc.element(node);

        if let Some(id) = unique_id(doc, el) {
            return Some(format!("#{id}"));
        }

        if let Some(test_id) = el.attr("data-testid").filter(|v| usable_value(v)) {
            if doc.count_with_attr("data-testid", test_id) == 1 {
                return Some(format!("[data-testid=\"{test_id}\"]"));
            }
        }

        if el.is_form_control() {
            if let Some(name) = el.attr("name").filter(|v| usable_value(v)) {
                let same_name = doc
                    .iter()
                    .filter(|n| {
                        let other = doc.element(*n);
                        other.tag == el.tag && other.attr("name") == Some(name)
                    })
                    .count();
                if same_name == 1 {
                    return Some(format!("{}[name=\"{}\"]", el.tag, name));
                }
            }
        }

        None
    }

    fn segment(&self, doc: &Document, node: NodeId) -> String {
        let el = doc.element(node);
        let mut compound = Compound::tag(el.tag.clone());
        compound.classes = self
            .usable_classes(el)
            .into_iter()
            .map(str::to_string)
            .collect();

        let matching: Vec<NodeId> = doc
            .siblings(node)
            .iter()
            .copied()
            .filter(|s| compound.matches_signature(doc.element(*s)))
            .collect();

        let structural = matches!(el.tag.as_str(), "html" | "head" | "body");
        let needs_position = if compound.classes.is_empty() {
            !structural || matching.len() > 1
        } else {
            matching.len() > 1
        };

        if needs_position {
            if let Some(idx) = matching.iter().position(|s| *s == node) {
                compound.positions.push(Position::NthOfType(idx + 1));
            }
        }

        compound.to_string()
    }

    /// Classes fit for a locator, in source order, capped at `max_classes`.
    pub fn usable_classes<'a>(&self, el: &'a Element) -> Vec<&'a str> {
        el.classes()
            .filter(|c| is_css_ident(c))
            .filter(|c| !c.starts_with('_'))
            .filter(|c| {
                !self
                    .options
                    .private_class_prefixes
                    .iter()
                    .any(|p| c.starts_with(p.as_str()))
            })
            .take(self.options.max_classes)
            .collect()
    }
}

/// An `id` usable as `#id`: a plain identifier that occurs once.
fn unique_id<'a>(doc: &Document, el: &'a Element) -> Option<&'a str> {
    el.id()
        .filter(|id| is_css_ident(id))
        .filter(|id| doc.count_with_attr("id", id) == 1)
}

fn usable_value(value: &str) -> bool {
    !value.is_empty() && !value.contains('"')
}

/// Elements inside an `svg` are located through the svg's parent.
fn retarget_svg(doc: &Document, node: NodeId) -> NodeId {
    let outermost_svg = std::iter::once(node)
        .chain(doc.ancestors(node))
        .filter(|n| doc.tag(*n) == "svg")
        .last();
    match outermost_svg {
        Some(svg) => doc.parent(svg).unwrap_or(svg),
        None => node,
    }
}

#[cfg(test)]
#[path = "generator_tests.rs"]
mod tests;
