//! Selector parsing.

use retrace_protocols::LocatorError;

use super::{AttrFilter, Combinator, Compound, Position, Selector};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

pub(super) fn parse(input: &str) -> Result<Selector, LocatorError> {
    let mut parser = Parser {
        input: input.trim(),
        pos: 0,
    };
    if parser.input.is_empty() {
        return Err(parser.error("empty selector"));
    }

    let mut steps = Vec::new();
    let mut combinator = Combinator::Descendant;
    loop {
        let compound = parser.compound()?;
        steps.push((combinator, compound));

        let had_space = parser.skip_whitespace();
        match parser.peek() {
            None => break,
            Some('>') => {
                parser.bump();
                parser.skip_whitespace();
                combinator = Combinator::Child;
            }
            Some(_) if had_space => combinator = Combinator::Descendant,
            Some(c) => return Err(parser.error(format!("unexpected '{c}'"))),
        }
    }

    Ok(Selector { steps })
}

impl<'a> Parser<'a> {
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

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn expect(&mut self, want: char) -> Result<(), LocatorError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.error(format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(format!("expected '{want}'"))),
        }
    }

    fn ident(&mut self) -> Result<String, LocatorError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii())
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn compound(&mut self) -> Result<Compound, LocatorError> {
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.bump();
                compound.tag = Some("*".to_string());
            }
            Some(c) if c.is_ascii_alphabetic() => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.bump();
                    compound.positions.push(self.position()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.error("expected a compound selector"));
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<AttrFilter, LocatorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let value = if self.peek() == Some('=') {
            self.bump();
            self.skip_whitespace();
            Some(self.attribute_value()?)
        } else {
            None
        };

        self.skip_whitespace();
        self.expect(']')?;
        Ok(AttrFilter { name, value })
    }

    fn attribute_value(&mut self) -> Result<String, LocatorError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let len = self
                    .rest()
                    .find(q)
                    .ok_or_else(|| self.error("unterminated attribute value"))?;
                let value = self.rest()[..len].to_string();
                self.pos += len + 1;
                Ok(value)
            }
            _ => self.ident(),
        }
    }

    fn position(&mut self) -> Result<Position, LocatorError> {
        let name = self.ident()?;
        self.expect('(')?;
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let n: usize = self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error("expected a positive index"))?;
        self.skip_whitespace();
        self.expect(')')?;

        if n == 0 {
            return Err(self.error("positions start at 1"));
        }
        match name.as_str() {
            "nth-of-type" => Ok(Position::NthOfType(n)),
            "nth-child" => Ok(Position::NthChild(n)),
            other => Err(self.error(format!("unsupported pseudo-class ':{other}'"))),
        }
    }

    fn error(&self, reason: impl Into<String>) -> LocatorError {
        LocatorError::InvalidSelector {
            selector: self.input.to_string(),
            reason: reason.into(),
        }
    }
}
