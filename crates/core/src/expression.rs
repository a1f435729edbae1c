use std::{fmt, iter::Peekable, str::Chars, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::DynamicsError;

const TWO_CHAR_OPERATORS: [&str; 7] = ["<=", ">=", "==", "!=", "&&", "||", "**"];
const ONE_CHAR_OPERATORS: &str = "+-*/^(),<>!?:";

/// A single lexical element of an [`Expression`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Token {
    /// A name that refers to a member of the dynamics or a reserved symbol.
    Symbol(String),
    /// A name immediately followed by `(`.
    Function(String),
    Number(String),
    Operator(&'static str),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Symbol(text) | Token::Function(text) | Token::Number(text) => text.as_str(),
            Token::Operator(op) => op,
        }
    }
}

/// A mathematical or boolean expression over named symbols.
///
/// Expressions are kept as token sequences. Equality, ordering and hashing
/// are structural: two expressions are equal when their tokens are equal,
/// regardless of whitespace in the text they were parsed from. Nothing is
/// simplified, so `a + b` and `b + a` are different expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Expression {
    tokens: Vec<Token>,
}

impl Expression {
    /// Parses an expression from text.
    ///
    /// # Errors
    ///
    /// Returns [`DynamicsError::InvalidExpression`] if the text is empty,
    /// contains an unknown character, or has unbalanced parentheses.
    pub fn parse(text: &str) -> Result<Self, DynamicsError> {
        let invalid = |reason: &str| DynamicsError::InvalidExpression {
            text: text.to_string(),
            reason: reason.to_string(),
        };

        let tokens = tokenize(text).map_err(|reason| invalid(&reason))?;
        if tokens.is_empty() {
            return Err(invalid("expression is empty"));
        }

        let mut depth = 0_usize;
        for token in &tokens {
            match token {
                Token::Operator("(") => depth += 1,
                Token::Operator(")") => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| invalid("unbalanced `)`"))?;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(invalid("unbalanced `(`"));
        }

        Ok(Self { tokens })
    }

    /// Creates an expression consisting of a single symbol.
    #[must_use]
    pub fn symbol(name: impl Into<String>) -> Self {
        Self {
            tokens: vec![Token::Symbol(name.into())],
        }
    }

    /// Creates an expression consisting of a single number.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self {
            tokens: vec![Token::Number(format!("{value:?}"))],
        }
    }

    /// Joins expressions with `+`, parenthesizing compound terms.
    ///
    /// An empty sum is the number zero.
    #[must_use]
    pub fn sum(terms: impl IntoIterator<Item = Expression>) -> Self {
        let mut tokens = Vec::new();
        for term in terms {
            if !tokens.is_empty() {
                tokens.push(Token::Operator("+"));
            }
            if term.tokens.len() > 1 {
                tokens.push(Token::Operator("("));
                tokens.extend(term.tokens);
                tokens.push(Token::Operator(")"));
            } else {
                tokens.extend(term.tokens);
            }
        }

        if tokens.is_empty() {
            Self::number(0.0)
        } else {
            Self { tokens }
        }
    }

    /// Compares `lhs` and `rhs` with a binary operator such as `>`.
    #[must_use]
    pub fn compare(lhs: Expression, operator: Comparison, rhs: Expression) -> Self {
        let mut tokens = lhs.tokens;
        tokens.push(Token::Operator(operator.as_str()));
        tokens.extend(rhs.tokens);
        Self { tokens }
    }

    /// Returns an iterator over every symbol, in order of appearance.
    ///
    /// Function names are not symbols. Repeated symbols are yielded each time
    /// they appear.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|token| match token {
            Token::Symbol(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Returns `true` if `symbol` appears in this expression.
    #[must_use]
    pub fn references(&self, symbol: &str) -> bool {
        self.symbols().any(|s| s == symbol)
    }

    /// Returns a copy with symbols renamed by `rename`.
    ///
    /// Symbols for which `rename` returns `None` are kept as they are.
    #[must_use]
    pub fn map_symbols(&self, mut rename: impl FnMut(&str) -> Option<String>) -> Self {
        let tokens = self
            .tokens
            .iter()
            .map(|token| match token {
                Token::Symbol(name) => Token::Symbol(rename(name).unwrap_or_else(|| name.clone())),
                other => other.clone(),
            })
            .collect();
        Self { tokens }
    }
}

/// Binary comparison operators usable in triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    fn as_str(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

impl FromStr for Expression {
    type Err = DynamicsError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl TryFrom<String> for Expression {
    type Error = DynamicsError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl From<Expression> for String {
    fn from(expression: Expression) -> Self {
        expression.to_string()
    }
}

impl fmt::Display for Expression {
    /// Writes the expression with binary operators surrounded by spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous: Option<&Token> = None;
        for token in &self.tokens {
            match token {
                Token::Symbol(text) | Token::Function(text) | Token::Number(text) => {
                    write!(f, "{text}")?;
                }
                Token::Operator(op @ ("(" | ")")) => write!(f, "{op}")?,
                Token::Operator(",") => write!(f, ", ")?,
                Token::Operator(op) => {
                    let is_binary = matches!(
                        previous,
                        Some(Token::Symbol(_) | Token::Number(_) | Token::Operator(")"))
                    );
                    if is_binary {
                        write!(f, " {op} ")?;
                    } else {
                        write!(f, "{op}")?;
                    }
                }
            }
            previous = Some(token);
        }
        Ok(())
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_alphabetic() || c == '_' {
            let name = take_while(&mut chars, |c| c.is_ascii_alphanumeric() || c == '_');
            let mut lookahead = chars.clone();
            while lookahead.next_if(|c| c.is_whitespace()).is_some() {}
            if lookahead.peek() == Some(&'(') {
                tokens.push(Token::Function(name));
            } else {
                tokens.push(Token::Symbol(name));
            }
        } else if c.is_ascii_digit() || c == '.' {
            tokens.push(Token::Number(take_number(&mut chars)?));
        } else {
            chars.next();
            let pair: String = [c].into_iter().chain(chars.peek().copied()).collect();
            if let Some(op) = TWO_CHAR_OPERATORS.into_iter().find(|op| *op == pair) {
                chars.next();
                tokens.push(Token::Operator(op));
            } else if let Some(index) = ONE_CHAR_OPERATORS.find(c) {
                tokens.push(Token::Operator(&ONE_CHAR_OPERATORS[index..=index]));
            } else {
                return Err(format!("unexpected character `{c}`"));
            }
        }
    }

    if let Some(pair) = tokens
        .windows(2)
        .find(|pair| ends_operand(&pair[0]) && starts_operand(&pair[1]))
    {
        return Err(format!(
            "missing operator between `{}` and `{}`",
            pair[0].text(),
            pair[1].text()
        ));
    }

    Ok(tokens)
}

fn ends_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Symbol(_) | Token::Number(_) | Token::Operator(")")
    )
}

fn starts_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Symbol(_) | Token::Function(_) | Token::Number(_) | Token::Operator("(")
    )
}

fn take_while(chars: &mut Peekable<Chars<'_>>, accept: impl Fn(char) -> bool) -> String {
    let mut taken = String::new();
    while let Some(c) = chars.next_if(|&c| accept(c)) {
        taken.push(c);
    }
    taken
}

fn take_number(chars: &mut Peekable<Chars<'_>>) -> Result<String, String> {
    let mut number = take_while(chars, |c| c.is_ascii_digit() || c == '.');
    if number.matches('.').count() > 1 || !number.contains(|c: char| c.is_ascii_digit()) {
        return Err(format!("malformed number `{number}`"));
    }

    // Exponent, only when digits follow the `e` (optionally after a sign).
    if matches!(chars.peek(), Some('e' | 'E')) {
        let mut lookahead = chars.clone();
        let e = lookahead.next();
        let sign = lookahead.next_if(|&c| c == '+' || c == '-');
        if lookahead.peek().is_some_and(char::is_ascii_digit) {
            number.extend(e);
            number.extend(sign);
            *chars = lookahead;
            number.push_str(&take_while(chars, |c| c.is_ascii_digit()));
        }
    }

    Ok(number)
}
