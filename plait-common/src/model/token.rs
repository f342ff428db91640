use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlaitError, Result};

/// Well-known single-argument container identities recognized by the claim
/// classifier and the registry.
pub mod containers {
    pub const OPTION: &str = "Option";
    pub const LAZY: &str = "Lazy";
    pub const PROMISE: &str = "Promise";
    pub const ALL: &str = "All";
    pub const TOKEN: &str = "Token";
    pub const INTERCEPT: &str = "Intercept";
}

/// Structural identity of a type: a raw identity plus ordered generic
/// arguments. Two tokens are equal iff the raw identities are identical and
/// the arguments are pairwise equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeToken {
    pub raw: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TypeToken>,
}

impl TypeToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(raw: impl Into<String>, args: Vec<TypeToken>) -> Self {
        Self {
            raw: raw.into(),
            args,
        }
    }

    /// True when this token is `name<T>` for exactly one argument.
    pub fn is_container(&self, name: &str) -> bool {
        self.raw == name && self.args.len() == 1
    }

    /// The single generic argument, if there is exactly one.
    pub fn inner(&self) -> Option<&TypeToken> {
        match self.args.as_slice() {
            [inner] => Some(inner),
            _ => None,
        }
    }

    /// Consumes a single-argument container and yields the argument.
    pub fn into_inner(mut self) -> Result<TypeToken> {
        if self.args.len() == 1 {
            Ok(self.args.remove(0))
        } else {
            Err(PlaitError::TokenParse {
                text: self.to_string(),
                reason: format!(
                    "container '{}' takes exactly one type argument, found {}",
                    self.raw,
                    self.args.len()
                ),
            })
        }
    }

    /// Parses the canonical text form `raw<arg, ...>`, recursively.
    pub fn parse(text: &str) -> Result<TypeToken> {
        let mut cursor = Cursor::new(text);
        let token = cursor.parse_token()?;
        cursor.skip_whitespace();
        if !cursor.is_exhausted() {
            return Err(cursor.fail("trailing characters after type"));
        }
        Ok(token)
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

struct Cursor<'a> {
    text: &'a str,
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, rest: text }
    }

    fn fail(&self, reason: &str) -> PlaitError {
        PlaitError::TokenParse {
            text: self.text.to_string(),
            reason: reason.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn is_exhausted(&self) -> bool {
        self.rest.is_empty()
    }

    fn eat(&mut self, ch: char) -> bool {
        if let Some(stripped) = self.rest.strip_prefix(ch) {
            self.rest = stripped;
            true
        } else {
            false
        }
    }

    fn parse_identifier(&mut self) -> Result<&'a str> {
        self.skip_whitespace();
        let end = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | '-')))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.fail("expected a type identifier"));
        }
        let (ident, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(ident)
    }

    fn parse_token(&mut self) -> Result<TypeToken> {
        let raw = self.parse_identifier()?;
        self.skip_whitespace();
        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_token()?);
                self.skip_whitespace();
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.fail("expected ',' or '>' in type argument list"));
            }
        }
        Ok(TypeToken {
            raw: raw.to_string(),
            args,
        })
    }
}
