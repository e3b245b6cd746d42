use std::{
    borrow::Borrow,
    collections::HashSet,
    fmt::{self, Display},
    hash::Hash,
    ops::{BitAnd, BitOr},
};

use serde::{Deserialize, Serialize};

use super::Error;

/// An `AccessPolicy` is a monotone formula over attribute names.
///
/// Only `positive` literals are allowed (no negation). Besides conjunctions
/// and disjunctions, `k of (...)` threshold gates are supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessPolicy {
    Attr(String),
    And(Box<AccessPolicy>, Box<AccessPolicy>),
    Or(Box<AccessPolicy>, Box<AccessPolicy>),
    Threshold(usize, Vec<AccessPolicy>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LeftParenthesis,
    RightParenthesis,
    Comma,
    Word(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftParenthesis => write!(f, "("),
            Self::RightParenthesis => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Word(w) => write!(f, "{w}"),
        }
    }
}

fn is_keyword(word: &str, keyword: &str) -> bool {
    word.eq_ignore_ascii_case(keyword)
}

fn is_reserved(word: &str) -> bool {
    ["and", "or", "of"].iter().any(|k| is_keyword(word, k))
}

/// Splits the expression into tokens, keeping the byte position of each one.
fn tokenize(expression: &str) -> Vec<(usize, Token)> {
    let mut tokens = Vec::new();
    let mut word_start = None;
    for (position, c) in expression.char_indices() {
        let token = match c {
            '(' => Some(Token::LeftParenthesis),
            ')' => Some(Token::RightParenthesis),
            ',' => Some(Token::Comma),
            c if c.is_whitespace() => None,
            _ => {
                word_start.get_or_insert(position);
                continue;
            }
        };
        if let Some(start) = word_start.take() {
            tokens.push((start, Token::Word(expression[start..position].to_string())));
        }
        if let Some(token) = token {
            tokens.push((position, token));
        }
    }
    if let Some(start) = word_start {
        tokens.push((start, Token::Word(expression[start..].to_string())));
    }
    tokens
}

/// Recursive descent parser, `and` binding tighter than `or`.
struct Parser {
    tokens: Vec<(usize, Token)>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(_, t)| t)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if is_keyword(w, keyword))
    }

    fn unexpected(&self) -> Error {
        match self.tokens.get(self.index) {
            Some((position, token)) => Error::UnexpectedToken {
                token: token.to_string(),
                position: *position,
            },
            None => Error::UnexpectedEnd("an attribute".to_string()),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), Error> {
        match self.peek() {
            Some(t) if t == expected => {
                self.index += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(Error::UnexpectedEnd(format!("'{expected}'"))),
        }
    }

    fn parse_or(&mut self) -> Result<AccessPolicy, Error> {
        let mut lhs = self.parse_and()?;
        while self.peek_keyword("or") {
            self.index += 1;
            lhs = lhs | self.parse_and()?;
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<AccessPolicy, Error> {
        let mut lhs = self.parse_term()?;
        while self.peek_keyword("and") {
            self.index += 1;
            lhs = lhs & self.parse_term()?;
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<AccessPolicy, Error> {
        match self.peek().cloned() {
            Some(Token::LeftParenthesis) => {
                self.index += 1;
                let policy = self.parse_or()?;
                self.expect(&Token::RightParenthesis)?;
                Ok(policy)
            }
            Some(Token::Word(word)) => {
                let is_gate = matches!(
                    self.tokens.get(self.index + 1),
                    Some((_, Token::Word(w))) if is_keyword(w, "of")
                );
                if let (true, Ok(threshold)) = (is_gate, word.parse::<usize>()) {
                    self.index += 2;
                    self.parse_threshold(threshold)
                } else if is_reserved(&word) {
                    Err(self.unexpected())
                } else {
                    self.index += 1;
                    Ok(AccessPolicy::Attr(word))
                }
            }
            Some(_) => Err(self.unexpected()),
            None => Err(Error::UnexpectedEnd("an attribute".to_string())),
        }
    }

    fn parse_threshold(&mut self, threshold: usize) -> Result<AccessPolicy, Error> {
        self.expect(&Token::LeftParenthesis)?;
        let mut children = vec![self.parse_or()?];
        while self.peek() == Some(&Token::Comma) {
            self.index += 1;
            children.push(self.parse_or()?);
        }
        self.expect(&Token::RightParenthesis)?;
        AccessPolicy::threshold(threshold, children)
    }
}

impl AccessPolicy {
    /// Creates an Access Policy based on a single attribute.
    ///
    /// Access Policies can easily be created using it
    /// ```ignore
    /// let access_policy =
    ///     AccessPolicy::new("att1") & (AccessPolicy::new("att2") | AccessPolicy::new("att3"));
    /// ```
    #[must_use]
    pub fn new(attribute: &str) -> Self {
        Self::Attr(attribute.to_string())
    }

    /// Creates a `threshold of (children)` gate.
    ///
    /// # Errors
    ///
    /// The threshold must be in `1..=children.len()` and the gate must have at
    /// least two children.
    pub fn threshold(threshold: usize, children: Vec<Self>) -> Result<Self, Error> {
        if threshold == 0 || threshold > children.len() || children.len() < 2 {
            return Err(Error::InvalidThreshold {
                threshold,
                children: children.len(),
            });
        }
        Ok(Self::Threshold(threshold, children))
    }

    /// Converts a policy string into an `AccessPolicy`.
    ///
    /// # Arguments
    ///
    /// - `expression`: formula with operators `and`, `or` and `k of (...)`
    ///
    /// # Examples
    ///
    /// ```
    /// use cosmian_traceable_abe::abe_policy::AccessPolicy;
    ///
    /// let access_policy = AccessPolicy::parse("(att1 and att2) or att3").unwrap();
    /// assert_eq!(
    ///     access_policy,
    ///     (AccessPolicy::new("att1") & AccessPolicy::new("att2")) | AccessPolicy::new("att3"),
    /// );
    /// ```
    /// # Errors
    ///
    /// Missing parenthesis, bad operators or invalid threshold gates. The
    /// whole input must be consumed.
    pub fn parse(expression: &str) -> Result<Self, Error> {
        let tokens = tokenize(expression);
        if tokens.is_empty() {
            return Err(Error::EmptyPolicy);
        }
        let mut parser = Parser { tokens, index: 0 };
        let policy = parser.parse_or()?;
        if parser.index != parser.tokens.len() {
            return Err(parser.unexpected());
        }
        Ok(policy)
    }

    /// Returns the sequence of attributes used in the access policy, in
    /// formula order and with repetitions.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        match self {
            Self::Attr(attr) => vec![attr.as_str()],
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                [lhs.attributes(), rhs.attributes()].concat()
            }
            Self::Threshold(_, children) => children.iter().flat_map(Self::attributes).collect(),
        }
    }

    /// Returns true if the policy uses `k of (...)` gates.
    #[must_use]
    pub fn has_threshold_gate(&self) -> bool {
        match self {
            Self::Attr(_) => false,
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.has_threshold_gate() || rhs.has_threshold_gate()
            }
            Self::Threshold(..) => true,
        }
    }

    /// Checks whether the given attribute set satisfies the policy.
    pub fn is_satisfied_by<S: Borrow<str> + Hash + Eq>(&self, attributes: &HashSet<S>) -> bool {
        match self {
            Self::Attr(attr) => attributes.contains(attr.as_str()),
            Self::And(lhs, rhs) => lhs.is_satisfied_by(attributes) && rhs.is_satisfied_by(attributes),
            Self::Or(lhs, rhs) => lhs.is_satisfied_by(attributes) || rhs.is_satisfied_by(attributes),
            Self::Threshold(threshold, children) => {
                children
                    .iter()
                    .filter(|child| child.is_satisfied_by(attributes))
                    .count()
                    >= *threshold
            }
        }
    }

    /// Converts the policy into a postfix token stream where gates are
    /// written `kofn`.
    ///
    /// `a and b` becomes `a b 2of2`, `a or b` becomes `a b 1of2`.
    #[must_use]
    pub fn to_postfix(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        self.write_postfix(&mut tokens);
        tokens
    }

    fn write_postfix(&self, tokens: &mut Vec<String>) {
        match self {
            Self::Attr(attr) => tokens.push(attr.clone()),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.write_postfix(tokens);
                rhs.write_postfix(tokens);
                let threshold = if matches!(self, Self::And(..)) { 2 } else { 1 };
                tokens.push(format!("{threshold}of2"));
            }
            Self::Threshold(threshold, children) => {
                for child in children {
                    child.write_postfix(tokens);
                }
                tokens.push(format!("{threshold}of{}", children.len()));
            }
        }
    }

    /// Flattens chains of the same operator into a threshold gate: `n`-of-`n`
    /// for conjunctions, 1-of-`n` for disjunctions.
    #[must_use]
    pub(crate) fn to_gates(&self) -> Gate<'_> {
        match self {
            Self::Attr(attr) => Gate::Leaf(attr),
            Self::And(..) => {
                let mut children = Vec::new();
                self.collect_chain(true, &mut children);
                Gate::Node(children.len(), children)
            }
            Self::Or(..) => {
                let mut children = Vec::new();
                self.collect_chain(false, &mut children);
                Gate::Node(1, children)
            }
            Self::Threshold(threshold, children) => {
                Gate::Node(*threshold, children.iter().map(Self::to_gates).collect())
            }
        }
    }

    fn collect_chain<'a>(&'a self, conjunction: bool, children: &mut Vec<Gate<'a>>) {
        match (self, conjunction) {
            (Self::And(lhs, rhs), true) | (Self::Or(lhs, rhs), false) => {
                lhs.collect_chain(conjunction, children);
                rhs.collect_chain(conjunction, children);
            }
            _ => children.push(self.to_gates()),
        }
    }
}

/// Threshold-gate view of a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Gate<'a> {
    Leaf(&'a str),
    Node(usize, Vec<Gate<'a>>),
}

impl BitAnd for AccessPolicy {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for AccessPolicy {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(Box::new(self), Box::new(rhs))
    }
}

impl Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attr(attr) => write!(f, "{attr}"),
            Self::And(lhs, rhs) => {
                for (i, child) in [lhs, rhs].into_iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    if matches!(**child, Self::Or(..)) {
                        write!(f, "({child})")?;
                    } else {
                        write!(f, "{child}")?;
                    }
                }
                Ok(())
            }
            Self::Or(lhs, rhs) => write!(f, "{lhs} or {rhs}"),
            Self::Threshold(threshold, children) => {
                write!(f, "{threshold} of (")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}
