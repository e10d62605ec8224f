//! Minimal markup reader used to build documents from HTML-like text.

use thiserror::Error;

use super::dom_node::NodeId;
use super::dom_tree::Document;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed markup at byte {position}: {message}")]
pub struct MarkupError {
    pub position: usize,
    pub message: String,
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn skip_past(&mut self, marker: &str) -> Result<(), MarkupError> {
        match self.rest().find(marker) {
            Some(idx) => {
                self.pos += idx + marker.len();
                Ok(())
            }
            None => Err(self.error(format!("expected '{marker}'"))),
        }
    }

    fn name(&mut self) -> Result<String, MarkupError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@'))
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.input[start..self.pos].to_ascii_lowercase())
    }

    fn attr_value(&mut self) -> Result<String, MarkupError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                let len = self
                    .rest()
                    .find(q)
                    .ok_or_else(|| self.error("unterminated attribute value"))?;
                self.pos += len + 1;
                Ok(self.input[start..start + len].to_string())
            }
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !c.is_whitespace() && c != '>' && c != '/')
                {
                    self.bump();
                }
                Ok(self.input[start..self.pos].to_string())
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> MarkupError {
        MarkupError {
            position: self.pos,
            message: message.into(),
        }
    }
}

pub(crate) fn parse(input: &str) -> Result<Document, MarkupError> {
    let mut doc = Document::new();
    let mut open: Vec<NodeId> = Vec::new();
    let mut reader = Reader { input, pos: 0 };

    loop {
        match reader.rest().find('<') {
            Some(idx) => reader.pos += idx,
            None => break,
        }

        if reader.eat("<!--") {
            reader.skip_past("-->")?;
            continue;
        }
        if reader.eat("<!") {
            reader.skip_past(">")?;
            continue;
        }
        if reader.eat("</") {
            let name = reader.name()?;
            reader.skip_whitespace();
            if !reader.eat(">") {
                return Err(reader.error("expected '>'"));
            }
            let idx = open
                .iter()
                .rposition(|n| doc.tag(*n) == name)
                .ok_or_else(|| reader.error(format!("unexpected closing tag </{name}>")))?;
            open.truncate(idx);
            continue;
        }

        reader.bump();
        let tag = reader.name()?;
        let mut attributes = Vec::new();
        let self_closing = loop {
            reader.skip_whitespace();
            if reader.eat("/>") {
                break true;
            }
            if reader.eat(">") {
                break false;
            }
            if reader.peek().is_none() {
                return Err(reader.error(format!("unterminated <{tag}>")));
            }
            let name = reader.name()?;
            reader.skip_whitespace();
            let value = if reader.eat("=") {
                reader.skip_whitespace();
                reader.attr_value()?
            } else {
                String::new()
            };
            attributes.push((name, value));
        };

        let id = doc.append(open.last().copied(), &tag, attributes);
        if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            open.push(id);
        }
    }

    Ok(doc)
}
