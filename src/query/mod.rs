//! Fault expression language
//!
//! Ruptures are selected with boolean expressions over parent fault names:
//!
//! ```text
//! Alpine: Jacksons to Kaniere & !(Hope: Hanmer | "Wellington: Hutt Valley")
//! ```
//!
//! `&` binds tighter than `|`, and `!` binds tighter than both. Unquoted
//! names run until the next operator and are trimmed, so names containing
//! spaces and colons need no quoting. Quote a name to include operator
//! characters in it.

pub mod sql;

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Maximum nesting of `!` and parentheses accepted by the parser.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of fault name terms in one expression.
pub const MAX_TERMS: usize = 256;

/// Errors raised while parsing a fault expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query is empty")]
    Empty,

    #[error("unexpected '{found}' at position {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("query ends unexpectedly, expected a fault name or '('")]
    UnexpectedEnd,

    #[error("parenthesis opened at position {offset} is never closed")]
    UnclosedParen { offset: usize },

    #[error("quote opened at position {offset} is never closed")]
    UnterminatedQuote { offset: usize },

    #[error("empty fault name at position {offset}")]
    EmptyName { offset: usize },

    #[error("query is nested more than {limit} levels deep")]
    TooDeep { limit: usize },

    #[error("query names more than {limit} faults")]
    TooManyTerms { limit: usize },
}

/// Parsed fault expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Rupture involves the named parent fault
    Fault(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Distinct fault names referenced by the expression, sorted.
    pub fn fault_names(&self) -> Vec<&str> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names.into_iter().collect()
    }

    fn collect_names<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Fault(name) => {
                names.insert(name.as_str());
            }
            Expr::Not(inner) => inner.collect_names(names),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.collect_names(names);
                rhs.collect_names(names);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Fault(name) => write!(f, "\"{}\"", name),
            Expr::Not(inner) => write!(f, "!{}", inner),
            Expr::And(lhs, rhs) => write!(f, "({} & {})", lhs, rhs),
            Expr::Or(lhs, rhs) => write!(f, "({} | {})", lhs, rhs),
        }
    }
}

impl std::str::FromStr for Expr {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Name(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::And => "&".to_string(),
            Token::Or => "|".to_string(),
            Token::Not => "!".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Name(name) => name.clone(),
        }
    }
}

fn is_reserved(c: char) -> bool {
    matches!(c, '&' | '|' | '!' | '(' | ')' | '"')
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            '&' | '|' | '!' | '(' | ')' => {
                chars.next();
                let token = match c {
                    '&' => Token::And,
                    '|' => Token::Or,
                    '!' => Token::Not,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                };
                tokens.push((token, offset));
            }
            '"' => {
                chars.next();
                let start = offset + 1;
                let end = loop {
                    match chars.next() {
                        Some((i, '"')) => break i,
                        Some(_) => continue,
                        None => return Err(QueryError::UnterminatedQuote { offset }),
                    }
                };
                let name = input[start..end].trim();
                if name.is_empty() {
                    return Err(QueryError::EmptyName { offset });
                }
                tokens.push((Token::Name(name.to_string()), offset));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut end = input.len();
                while let Some(&(i, c)) = chars.peek() {
                    if is_reserved(c) {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                let name = input[offset..end].trim_end();
                tokens.push((Token::Name(name.to_string()), offset));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, QueryError> {
        match self.next() {
            Some((Token::Not, _)) => {
                self.descend()?;
                let inner = self.parse_unary()?;
                self.depth -= 1;
                Ok(Expr::Not(Box::new(inner)))
            }
            Some((Token::LParen, offset)) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((token, offset)) => Err(QueryError::UnexpectedToken {
                        found: token.describe(),
                        offset,
                    }),
                    None => Err(QueryError::UnclosedParen { offset }),
                }
            }
            Some((Token::Name(name), _)) => Ok(Expr::Fault(name)),
            Some((token, offset)) => Err(QueryError::UnexpectedToken {
                found: token.describe(),
                offset,
            }),
            None => Err(QueryError::UnexpectedEnd),
        }
    }

    fn descend(&mut self) -> Result<(), QueryError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(QueryError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }
}

/// Parse a fault expression.
pub fn parse(input: &str) -> Result<Expr, QueryError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(QueryError::Empty);
    }
    let terms = tokens
        .iter()
        .filter(|(token, _)| matches!(token, Token::Name(_)))
        .count();
    if terms > MAX_TERMS {
        return Err(QueryError::TooManyTerms { limit: MAX_TERMS });
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;

    match parser.next() {
        None => Ok(expr),
        Some((token, offset)) => Err(QueryError::UnexpectedToken {
            found: token.describe(),
            offset,
        }),
    }
}
