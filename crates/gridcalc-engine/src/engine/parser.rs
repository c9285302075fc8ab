//! Formula parser.
//!
//! A recursive descent parser over a small, closed grammar:
//!
//! ```text
//! expr       := additive (cmp_op additive)?
//! additive   := term (('+' | '-') term)*
//! term       := unary (('*' | '/' | '//' | '%') unary)*
//! unary      := ('-' | '+') unary | power
//! power      := primary (('**' | '^') unary)?
//! primary    := number | string | reference | name | name '(' args ')' | '(' expr ')'
//! ```
//!
//! `name` must be a whitelisted function. Bare names are only accepted for
//! the constants `pi` and `e`. Everything else (attribute access, indexing,
//! unknown names, chained comparisons) is rejected.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::cell_ref::CellRef;
use super::columns::ColumnNames;
use super::functions::Function;
use crate::error::{EvalError, EvalResult};

/// Nesting budget shared by parsing and evaluation. Every parenthesis,
/// unary operator, call and followed reference spends one level.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a formula body (the text after the leading `=`). Whitespace is
/// removed before scanning, including inside string literals.
pub fn parse_formula(body: &str, columns: &ColumnNames) -> EvalResult<Expr> {
    parse_formula_at_depth(body, columns, 0)
}

/// [`parse_formula`] starting with `depth` levels of the nesting budget
/// already spent.
pub fn parse_formula_at_depth(
    body: &str,
    columns: &ColumnNames,
    depth: usize,
) -> EvalResult<Expr> {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let tokens = tokenize(&compact)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth,
        columns,
    };
    if parser.peek() == &Token::Eof {
        return Err(EvalError::Syntax("empty formula".into()));
    }
    let expr = parser.parse_expression()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        token => Err(EvalError::Syntax(format!("unexpected {}", token.describe()))),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Name(String),
    Reference { text: String, column: String, digits: String },
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    StarStar,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Comma,
    LeftParen,
    RightParen,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Text(s) => format!("string '{}'", s),
            Token::Name(name) => format!("name '{}'", name),
            Token::Reference { text, .. } => format!("reference {}", text),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::SlashSlash => "'//'".into(),
            Token::Percent => "'%'".into(),
            Token::StarStar => "'**'".into(),
            Token::EqualEqual => "'=='".into(),
            Token::NotEqual => "'!='".into(),
            Token::Less => "'<'".into(),
            Token::LessEqual => "'<='".into(),
            Token::Greater => "'>'".into(),
            Token::GreaterEqual => "'>='".into(),
            Token::Comma => "','".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::Eof => "end of formula".into(),
        }
    }

    fn comparison(&self) -> Option<BinaryOp> {
        match self {
            Token::EqualEqual => Some(BinaryOp::Equal),
            Token::NotEqual => Some(BinaryOp::NotEqual),
            Token::Less => Some(BinaryOp::Less),
            Token::LessEqual => Some(BinaryOp::LessEqual),
            Token::Greater => Some(BinaryOp::Greater),
            Token::GreaterEqual => Some(BinaryOp::GreaterEqual),
            _ => None,
        }
    }
}

fn tokenize(input: &str) -> EvalResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let (token, width) = match c {
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' if next == Some('*') => (Token::StarStar, 2),
            '*' => (Token::Star, 1),
            '^' => (Token::StarStar, 1),
            '/' if next == Some('/') => (Token::SlashSlash, 2),
            '/' => (Token::Slash, 1),
            '%' => (Token::Percent, 1),
            '=' if next == Some('=') => (Token::EqualEqual, 2),
            '!' if next == Some('=') => (Token::NotEqual, 2),
            '<' if next == Some('=') => (Token::LessEqual, 2),
            '<' => (Token::Less, 1),
            '>' if next == Some('=') => (Token::GreaterEqual, 2),
            '>' => (Token::Greater, 1),
            ',' => (Token::Comma, 1),
            '(' => (Token::LeftParen, 1),
            ')' => (Token::RightParen, 1),
            '"' | '\'' => {
                let (text, width) = scan_string(&chars[i..])?;
                (Token::Text(text), width)
            }
            '[' => scan_reference(&chars[i..])?,
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                scan_number(&chars[i..])?
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let width = chars[i..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == '_')
                    .count();
                let name: String = chars[i..i + width].iter().collect();
                (Token::Name(name), width)
            }
            '.' => {
                return Err(EvalError::UnsupportedExpression(
                    "attribute access".into(),
                ));
            }
            '=' => {
                return Err(EvalError::UnsupportedExpression("assignment".into()));
            }
            other => {
                return Err(EvalError::UnsupportedExpression(format!(
                    "character '{}'",
                    other
                )));
            }
        };
        tokens.push(token);
        i += width;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn scan_string(chars: &[char]) -> EvalResult<(String, usize)> {
    let quote = chars[0];
    let mut out = String::new();
    let mut i = 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| EvalError::Syntax("unterminated string".into()))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(EvalError::Syntax("unterminated string".into()))
}

fn scan_number(chars: &[char]) -> EvalResult<(Token, usize)> {
    let mut i = chars.iter().take_while(|c| c.is_ascii_digit()).count();
    if chars.get(i) == Some(&'.') {
        i += 1;
        i += chars[i..].iter().take_while(|c| c.is_ascii_digit()).count();
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+' | '-')) {
            j += 1;
        }
        let exp_digits = chars[j.min(chars.len())..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }
    let text: String = chars[..i].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|_| EvalError::Syntax(format!("invalid number '{}'", text)))?;
    if !value.is_finite() {
        return Err(EvalError::Overflow);
    }
    Ok((Token::Number(value), i))
}

fn scan_reference(chars: &[char]) -> EvalResult<(Token, usize)> {
    let unsupported = || EvalError::UnsupportedExpression("list or index syntax".into());

    let first = chars.get(1).ok_or_else(unsupported)?;
    if !(first.is_ascii_alphabetic() || *first == '_') {
        return Err(unsupported());
    }
    let name_len = chars[1..]
        .iter()
        .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
        .count();
    let close = 1 + name_len;
    if chars.get(close) != Some(&']') {
        return Err(unsupported());
    }
    let digit_len = chars[close + 1..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digit_len == 0 {
        return Err(unsupported());
    }
    let width = close + 1 + digit_len;
    Ok((
        Token::Reference {
            text: chars[..width].iter().collect(),
            column: chars[1..close].iter().collect(),
            digits: chars[close + 1..width].iter().collect(),
        },
        width,
    ))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    columns: &'a ColumnNames,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> EvalResult<()> {
        let token = self.advance();
        if token == expected {
            Ok(())
        } else {
            Err(EvalError::Syntax(format!(
                "expected {}, found {}",
                expected.describe(),
                token.describe()
            )))
        }
    }

    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(EvalError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_expression(&mut self) -> EvalResult<Expr> {
        let left = self.parse_additive()?;
        let Some(op) = self.peek().comparison() else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_additive()?;
        if self.peek().comparison().is_some() {
            return Err(EvalError::UnsupportedExpression(
                "chained comparison".into(),
            ));
        }
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                Token::SlashSlash => BinaryOp::FloorDivide,
                Token::Percent => BinaryOp::Modulo,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Negate,
            Token::Plus => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn parse_power(&mut self) -> EvalResult<Expr> {
        let base = self.parse_primary()?;
        if self.peek() != &Token::StarStar {
            return Ok(base);
        }
        self.advance();
        self.enter()?;
        // Right-associative, and the exponent may carry a sign: 2 ** -1.
        let exponent = self.parse_unary();
        self.leave();
        Ok(Expr::Binary {
            op: BinaryOp::Power,
            left: Box::new(base),
            right: Box::new(exponent?),
        })
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Text(s) => Ok(Expr::Text(s)),
            Token::Reference { text, column, digits } => {
                let cell = self.resolve_reference(&text, &column, &digits)?;
                Ok(Expr::Reference(cell))
            }
            Token::LeftParen => {
                self.enter()?;
                let inner = self.parse_expression();
                self.leave();
                let inner = inner?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::Name(name) => self.parse_name(name),
            Token::Eof => Err(EvalError::Syntax("unexpected end of formula".into())),
            token => Err(EvalError::Syntax(format!("unexpected {}", token.describe()))),
        }
    }

    fn parse_name(&mut self, name: String) -> EvalResult<Expr> {
        let Some(function) = Function::from_name(&name) else {
            return Err(EvalError::UnsupportedExpression(format!("name '{}'", name)));
        };

        if self.peek() != &Token::LeftParen {
            if function.is_constant() {
                return Ok(Expr::Call {
                    function,
                    args: Vec::new(),
                });
            }
            return Err(EvalError::UnsupportedExpression(format!(
                "function '{}' used without a call",
                name
            )));
        }
        self.advance();

        self.enter()?;
        let args = self.parse_arguments();
        self.leave();
        Ok(Expr::Call {
            function,
            args: args?,
        })
    }

    fn parse_arguments(&mut self) -> EvalResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == &Token::RightParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.advance() {
                Token::Comma => continue,
                Token::RightParen => return Ok(args),
                token => {
                    return Err(EvalError::Syntax(format!(
                        "expected ',' or ')', found {}",
                        token.describe()
                    )));
                }
            }
        }
    }

    fn resolve_reference(&self, text: &str, column: &str, digits: &str) -> EvalResult<CellRef> {
        let unresolved = || EvalError::UnresolvedReference(text.to_string());
        let col = self.columns.resolve(column).ok_or_else(unresolved)?;
        let row = digits
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(unresolved)?;
        Ok(CellRef::new(row, col))
    }
}
