//! Selector dialect shared by the generator and the resolver.
//!
//! Supported: type and `*`, `#id`, `.class`, `[attr]`, `[attr="v"]`,
//! `:nth-of-type(n)`, `:nth-child(n)`, and the `>` / descendant
//! combinators. `:nth-of-type(n)` counts the siblings that match the
//! compound's tag and classes, so `li.item:nth-of-type(2)` is the second
//! `li.item` among its siblings.

mod parser;

use std::fmt;

use retrace_protocols::{Document, Element, LocatorError, NodeId};

/// How a compound relates to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrFilter {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    NthOfType(usize),
    NthChild(usize),
}

/// One compound selector such as `button.primary[type="submit"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrFilter>,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    steps: Vec<(Combinator, Compound)>,
}

/// Whether `s` can be written as a bare CSS identifier.
pub fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    let starts_ok = first.is_ascii_alphabetic()
        || first == '_'
        || !first.is_ascii()
        || (first == '-' && s.chars().nth(1).is_some_and(|c| !c.is_ascii_digit()));
    starts_ok && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii())
}

impl Compound {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.positions.is_empty()
    }

    /// Tag and classes only; the set `:nth-of-type` counts within.
    pub fn matches_signature(&self, el: &Element) -> bool {
        let tag_ok = match &self.tag {
            Some(t) => t == "*" || *t == el.tag,
            None => true,
        };
        tag_ok && self.classes.iter().all(|c| el.has_class(c))
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let el = doc.element(node);
        self.matches_signature(el)
            && self.ids.iter().all(|id| el.id() == Some(id.as_str()))
            && self.attrs.iter().all(|a| match (&a.value, el.attr(&a.name)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(want), Some(have)) => want == have,
            })
            && self
                .positions
                .iter()
                .all(|p| self.position_of(doc, node, *p) == Some(p.index()))
    }

    fn position_of(&self, doc: &Document, node: NodeId, position: Position) -> Option<usize> {
        let siblings = doc.siblings(node);
        let idx = match position {
            Position::NthChild(_) => siblings.iter().position(|s| *s == node),
            Position::NthOfType(_) => siblings
                .iter()
                .filter(|s| self.matches_signature(doc.element(**s)))
                .position(|s| *s == node),
        };
        idx.map(|i| i + 1)
    }

    pub fn without_positions(&self) -> Self {
        Self {
            positions: Vec::new(),
            ..self.clone()
        }
    }
}

impl Position {
    pub fn index(&self) -> usize {
        match self {
            Self::NthOfType(n) | Self::NthChild(n) => *n,
        }
    }
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        parser::parse(input)
    }

    pub fn from_compound(compound: Compound) -> Self {
        Self {
            steps: vec![(Combinator::Descendant, compound)],
        }
    }

    pub fn compounds(&self) -> impl DoubleEndedIterator<Item = &Compound> {
        self.steps.iter().map(|(_, c)| c)
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.steps.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, step: usize) -> bool {
        let (combinator, compound) = &self.steps[step];
        if !compound.matches(doc, node) {
            return false;
        }
        if step == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.matches_at(doc, p, step - 1)),
            Combinator::Descendant => doc
                .ancestors(node)
                .any(|a| self.matches_at(doc, a, step - 1)),
        }
    }

    /// First match in document order.
    pub fn query_first(&self, doc: &Document) -> Option<NodeId> {
        doc.iter().find(|n| self.matches(doc, *n))
    }

    pub fn has_positions(&self) -> bool {
        self.compounds().any(|c| !c.positions.is_empty())
    }

    /// Same selector with every positional qualifier removed.
    pub fn without_positions(&self) -> Self {
        Self {
            steps: self
                .steps
                .iter()
                .map(|(comb, c)| (*comb, c.without_positions()))
                .collect(),
        }
    }

    /// The right-most compound carrying an attribute filter, on its own.
    pub fn last_attribute_compound(&self) -> Option<Self> {
        self.compounds()
            .rev()
            .find(|c| !c.attrs.is_empty())
            .map(|c| Self::from_compound(c.without_positions()))
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        for id in &self.ids {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attrs {
            match &attr.value {
                Some(v) => write!(f, "[{}=\"{}\"]", attr.name, v)?,
                None => write!(f, "[{}]", attr.name)?,
            }
        }
        for position in &self.positions {
            match position {
                Position::NthOfType(n) => write!(f, ":nth-of-type({n})")?,
                Position::NthChild(n) => write!(f, ":nth-child({n})")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (combinator, compound)) in self.steps.iter().enumerate() {
            if i > 0 {
                match combinator {
                    Combinator::Child => f.write_str(" > ")?,
                    Combinator::Descendant => f.write_str(" ")?,
                }
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
