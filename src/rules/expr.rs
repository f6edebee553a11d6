//! Condition expressions.
//!
//! A rule's trigger condition is a boolean expression over registered
//! condition names. Expressions are parsed once at load time into an
//! explicit tree and evaluated against a name → value snapshot, keeping
//! parsing and evaluation independently testable.
//!
//! The surface syntax matches the original configuration dialect:
//! identifiers, `!`, `&&`, `||` and parentheses, with `||` binding
//! loosest.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// A boolean expression over condition names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionExpr {
    /// A registered condition, by name.
    Var(String),

    /// Logical negation.
    Not(Box<ConditionExpr>),

    /// All sub-expressions must be true.
    And(Vec<ConditionExpr>),

    /// At least one sub-expression must be true.
    Or(Vec<ConditionExpr>),
}

/// Errors from [`ConditionExpr::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The expression string is empty or whitespace.
    #[error("empty expression")]
    Empty,

    /// The expression ended where a name or `(` was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A character outside the expression grammar.
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    /// An opening parenthesis without a matching `)`.
    #[error("missing closing parenthesis")]
    UnbalancedParen,

    /// Input remained after a complete expression.
    #[error("trailing input {0:?}")]
    TrailingInput(String),
}

impl ConditionExpr {
    /// Reference a condition by name.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    /// AND of a flat list of condition names.
    pub fn all_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::And(names.into_iter().map(|n| Self::Var(n.into())).collect())
    }

    /// Negate this expression.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Combine with another expression using AND.
    #[must_use]
    pub fn and(self, other: ConditionExpr) -> Self {
        match self {
            Self::And(mut exprs) => {
                exprs.push(other);
                Self::And(exprs)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another expression using OR.
    #[must_use]
    pub fn or(self, other: ConditionExpr) -> Self {
        match self {
            Self::Or(mut exprs) => {
                exprs.push(other);
                Self::Or(exprs)
            }
            _ => Self::Or(vec![self, other]),
        }
    }

    /// Parse the configuration dialect.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::new(input)?;
        let expr = parser.parse_or()?;
        parser.expect_end()?;
        Ok(expr)
    }

    /// Every condition name the expression references.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Var(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Not(inner) => inner.collect_names(out),
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_names(out);
                }
            }
        }
    }

    /// Evaluate against a snapshot of condition values.
    ///
    /// A name missing from the snapshot is an error, never a silent
    /// false: it signals a registration-ordering bug.
    pub fn eval(&self, snapshot: &FxHashMap<String, bool>) -> Result<bool, Error> {
        match self {
            Self::Var(name) => snapshot
                .get(name)
                .copied()
                .ok_or_else(|| Error::MissingCondition(name.clone())),
            Self::Not(inner) => Ok(!inner.eval(snapshot)?),
            Self::And(exprs) => {
                for expr in exprs {
                    if !expr.eval(snapshot)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(exprs) => {
                for expr in exprs {
                    if expr.eval(snapshot)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Name(String),
    Not,
    AndOp,
    OrOp,
    Open,
    Close,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<ConditionExpr, ParseError> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::OrOp) {
            self.bump();
            expr = expr.or(self.parse_and()?);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<ConditionExpr, ParseError> {
        let mut expr = self.parse_unary()?;
        while self.peek() == Some(&Token::AndOp) {
            self.bump();
            expr = expr.and(self.parse_unary()?);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<ConditionExpr, ParseError> {
        match self.bump() {
            Some(Token::Not) => Ok(self.parse_unary()?.negate()),
            Some(Token::Name(name)) => Ok(ConditionExpr::Var(name)),
            Some(Token::Open) => {
                let expr = self.parse_or()?;
                match self.bump() {
                    Some(Token::Close) => Ok(expr),
                    _ => Err(ParseError::UnbalancedParen),
                }
            }
            Some(Token::Close) => Err(ParseError::UnexpectedChar(')')),
            Some(Token::AndOp) => Err(ParseError::UnexpectedChar('&')),
            Some(Token::OrOp) => Err(ParseError::UnexpectedChar('|')),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => {
                let rest = format!("{:?}", token);
                Err(ParseError::TrailingInput(rest))
            }
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '&' => {
                chars.next();
                if chars.peek() != Some(&'&') {
                    return Err(ParseError::UnexpectedChar('&'));
                }
                chars.next();
                tokens.push(Token::AndOp);
            }
            '|' => {
                chars.next();
                if chars.peek() != Some(&'|') {
                    return Err(ParseError::UnexpectedChar('|'));
                }
                chars.next();
                tokens.push(Token::OrOp);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            c => return Err(ParseError::UnexpectedChar(c)),
        }
    }

    Ok(tokens)
}
