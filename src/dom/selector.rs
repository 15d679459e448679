//! CSS selector subset used by the chat extractors.
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute
//! selectors with `=`, `*=`, `^=`, `$=`, `~=` (quoted or bare values),
//! descendant combinators, and comma-separated lists. Anything else
//! (pseudo-classes, `>`, `+`, `~` combinators) is rejected with a
//! [`SelectorError`] rather than silently mis-matched.

use std::str::FromStr;

use super::ElementRef;

/// Errors produced by [`Selector::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("unterminated attribute selector")]
    Unterminated,

    #[error("unsupported selector syntax '{0}'")]
    Unsupported(String),
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

/// Compounds joined by descendant combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    test: Option<(AttrOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

// =============================================================================
// MATCHING
// =============================================================================

impl Selector {
    /// Parse a selector list.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] for empty input or unsupported syntax.
    pub fn parse(css: &str) -> Result<Self, SelectorError> {
        Parser::new(css).selector_list()
    }

    /// Whether `el` matches any selector in the list.
    #[must_use]
    pub fn matches(&self, el: ElementRef<'_>) -> bool {
        self.alternatives.iter().any(|complex| complex.matches(el))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Complex {
    /// Right-most compound must match `el`; each earlier compound must
    /// match some ancestor. Nearest-ancestor matching is sufficient because
    /// only descendant combinators are supported.
    fn matches(&self, el: ElementRef<'_>) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(el) {
            return false;
        }
        let mut current = el.parent();
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = current else {
                    return false;
                };
                current = candidate.parent();
                if compound.matches(candidate) {
                    break;
                }
            }
        }
        true
    }
}

impl Compound {
    fn matches(&self, el: ElementRef<'_>) -> bool {
        if let Some(tag) = &self.tag {
            if el.tag() != tag {
                return false;
            }
        }
        self.classes.iter().all(|class| el.has_class(class)) && self.attrs.iter().all(|attr| attr.matches(el))
    }

    fn is_empty(&self) -> bool {
        !self.universal && self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }
}

impl AttrMatcher {
    fn matches(&self, el: ElementRef<'_>) -> bool {
        let Some(actual) = el.attr(&self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.test else {
            return true;
        };
        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(expected.as_str()),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
            AttrOp::Word => actual.split_whitespace().any(|word| word == expected),
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
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

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected { found, offset: self.pos }
    }

    fn selector_list(&mut self) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.complex()?);
            match self.bump() {
                None => break,
                Some(',') => {}
                Some(other) => return Err(self.unexpected(other)),
            }
        }
        Ok(Selector { alternatives })
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut compounds = Vec::new();
        loop {
            let compound = self.compound()?;
            if compound.is_empty() {
                return match self.peek() {
                    Some(c @ ('>' | '+' | '~')) => Err(SelectorError::Unsupported(format!("{c} combinator"))),
                    Some(c) if c != ',' => Err(self.unexpected(c)),
                    _ => Err(SelectorError::Empty),
                };
            }
            compounds.push(compound);
            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => return Ok(Complex { compounds }),
                Some(c @ ('>' | '+' | '~')) => {
                    return Err(SelectorError::Unsupported(format!("{c} combinator")));
                }
                Some(c) if !had_space => return Err(self.unexpected(c)),
                Some(_) => {}
            }
        }
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.bump();
            compound.universal = true;
        } else if let Some(ident) = self.ident() {
            compound.tag = Some(ident.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('.') => {
                    self.bump();
                    let name = self.ident().ok_or_else(|| self.unexpected_here())?;
                    compound.classes.push(name.to_string());
                }
                Some('#') => {
                    self.bump();
                    let id = self.ident().ok_or_else(|| self.unexpected_here())?;
                    compound.attrs.push(AttrMatcher {
                        name: "id".into(),
                        test: Some((AttrOp::Equals, id.to_string())),
                    });
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => return Err(SelectorError::Unsupported(self.src[self.pos..].to_string())),
                _ => return Ok(compound),
            }
        }
    }

    fn unexpected_here(&self) -> SelectorError {
        match self.peek() {
            Some(c) => self.unexpected(c),
            None => SelectorError::Empty,
        }
    }

    fn attribute(&mut self) -> Result<AttrMatcher, SelectorError> {
        self.skip_whitespace();
        let name = self
            .ident()
            .ok_or_else(|| self.unexpected_here())?
            .to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.bump() {
            Some(']') => return Ok(AttrMatcher { name, test: None }),
            Some('=') => AttrOp::Equals,
            Some(c @ ('*' | '^' | '$' | '~')) => {
                if self.bump() != Some('=') {
                    return Err(SelectorError::Unterminated);
                }
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Word,
                }
            }
            Some(other) => return Err(self.unexpected(other)),
            None => return Err(SelectorError::Unterminated),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(_) => {}
                        None => return Err(SelectorError::Unterminated),
                    }
                }
                self.src[start..self.pos - quote.len_utf8()].to_string()
            }
            _ => self
                .ident()
                .ok_or(SelectorError::Unterminated)?
                .to_string(),
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(SelectorError::Unterminated);
        }
        Ok(AttrMatcher { name, test: Some((op, value)) })
    }

    fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii())
        {
            self.bump();
        }
        (self.pos > start).then(|| &self.src[start..self.pos])
    }
}

#[cfg(test)]
#[path = "selector_test.rs"]
mod tests;
