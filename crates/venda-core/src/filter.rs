//! # Dynamic Filter & Order Expressions
//!
//! A small, safe interpreter for the textual filter and order expressions
//! accepted by the paged list endpoints.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Filter Expression Pipeline                             │
//! │                                                                     │
//! │  "name contains \"cabo\" and price_cents > 1000"                    │
//! │       │                                                             │
//! │       ▼  tokenize                                                   │
//! │  [Ident(name)] [Ident(contains)] [Str(cabo)] [Ident(and)] ...       │
//! │       │                                                             │
//! │       ▼  recursive descent + allow-list lookup                      │
//! │  And(Contains(name, "cabo"), Compare(price_cents, Gt, 1000))        │
//! │       │                                                             │
//! │       ▼  (venda-db) compile to parameterised SQL                    │
//! │  (name LIKE ? ESCAPE '\') AND (price_cents > ?)                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Safety
//! This is a closed-world interpreter. Field names resolve against a static
//! per-entity [`FieldTable`]; anything not on the table is rejected at parse
//! time. There is no reflection and no code evaluation, and every literal is
//! carried as a value to be bound, never spliced into SQL text.
//!
//! ## Failure Contract
//! Parsing returns `Result` and never panics. Callers running a query are
//! expected to treat a parse failure as "no filter" / "default order"
//! rather than failing the whole request; the paged executor in venda-db
//! does exactly that.
//!
//! ## Grammar
//! ```text
//! filter  := or
//! or      := and ('or' and)*
//! and     := unary ('and' unary)*
//! unary   := 'not' unary | '(' or ')' | cmp
//! cmp     := IDENT ( ('='|'=='|'!='|'<>'|'>'|'>='|'<'|'<=') literal
//!                  | 'contains' STRING )
//! literal := STRING | INTEGER | 'true' | 'false'
//!
//! order   := key (',' key)*
//! key     := IDENT ('asc' | 'desc')?
//! ```
//! Keywords and field names are case-insensitive.

use std::fmt;

use thiserror::Error;

// =============================================================================
// Field Allow-List
// =============================================================================

/// The runtime type of an allow-listed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text (also used for enum-backed columns stored as text).
    Text,
    /// 64-bit integer (includes cent amounts and quantities).
    Integer,
    /// Boolean flag.
    Boolean,
    /// UTC timestamp; literals are RFC 3339 strings.
    Timestamp,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// One allow-listed field: external name, backing column, runtime type.
#[derive(Debug)]
pub struct FieldDef {
    name: &'static str,
    column: &'static str,
    kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        FieldDef { name, column, kind }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Backing column. Only ever interpolated into SQL from this static
    /// definition, never from caller input.
    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// Closed-world field table for one entity type.
///
/// Declared as a `static` next to the entity; every dynamic-by-name field
/// access in the system goes through one of these tables.
#[derive(Debug)]
pub struct FieldTable {
    entity: &'static str,
    fields: &'static [FieldDef],
}

impl FieldTable {
    pub const fn new(entity: &'static str, fields: &'static [FieldDef]) -> Self {
        FieldTable { entity, fields }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Resolves a field name case-insensitively.
    pub fn resolve(&'static self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    fn require(&'static self, name: &str) -> Result<&'static FieldDef, FilterError> {
        self.resolve(name).ok_or_else(|| FilterError::UnknownField {
            entity: self.entity,
            field: name.to_string(),
        })
    }

    // -------------------------------------------------------------------------
    // Programmatic predicate builders
    // -------------------------------------------------------------------------
    // Structural (caller-supplied) predicates go through the same allow-list
    // and type checks as parsed expressions.

    /// Builds `field = value`.
    pub fn eq(&'static self, field: &str, value: impl Into<Literal>) -> Result<Expr, FilterError> {
        self.compare(field, CmpOp::Eq, value.into())
    }

    /// Builds `field != value`.
    pub fn ne(&'static self, field: &str, value: impl Into<Literal>) -> Result<Expr, FilterError> {
        self.compare(field, CmpOp::Ne, value.into())
    }

    /// Builds `field > value`.
    pub fn gt(&'static self, field: &str, value: impl Into<Literal>) -> Result<Expr, FilterError> {
        self.compare(field, CmpOp::Gt, value.into())
    }

    /// Builds `field >= value`.
    pub fn ge(&'static self, field: &str, value: impl Into<Literal>) -> Result<Expr, FilterError> {
        self.compare(field, CmpOp::Ge, value.into())
    }

    /// Builds `field < value`.
    pub fn lt(&'static self, field: &str, value: impl Into<Literal>) -> Result<Expr, FilterError> {
        self.compare(field, CmpOp::Lt, value.into())
    }

    /// Builds `field <= value`.
    pub fn le(&'static self, field: &str, value: impl Into<Literal>) -> Result<Expr, FilterError> {
        self.compare(field, CmpOp::Le, value.into())
    }

    /// Builds a substring containment test on a text field.
    pub fn contains(&'static self, field: &str, needle: impl Into<String>) -> Result<Expr, FilterError> {
        let def = self.require(field)?;
        if def.kind != FieldKind::Text {
            return Err(FilterError::UnsupportedOperation {
                field: def.name,
                operation: "contains",
                kind: def.kind,
            });
        }
        Ok(Expr::Contains {
            field: def,
            needle: needle.into(),
        })
    }

    /// Builds an ascending sort key.
    pub fn asc(&'static self, field: &str) -> Result<SortKey, FilterError> {
        Ok(SortKey {
            field: self.require(field)?,
            descending: false,
        })
    }

    /// Builds a descending sort key.
    pub fn desc(&'static self, field: &str) -> Result<SortKey, FilterError> {
        Ok(SortKey {
            field: self.require(field)?,
            descending: true,
        })
    }

    fn compare(
        &'static self,
        field: &str,
        op: CmpOp,
        value: Literal,
    ) -> Result<Expr, FilterError> {
        let def = self.require(field)?;
        check_comparison(def, op, &value)?;
        Ok(Expr::Compare {
            field: def,
            op,
            value,
        })
    }
}

// =============================================================================
// Expression Tree
// =============================================================================

/// A literal value appearing in an expression.
///
/// Carried as data and bound as a query parameter by the compiler; never
/// rendered into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }
}

/// A validated predicate tree over an entity's allow-listed fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `field <op> literal`
    Compare {
        field: &'static FieldDef,
        op: CmpOp,
        value: Literal,
    },
    /// `field contains "needle"` (text fields only)
    Contains {
        field: &'static FieldDef,
        needle: String,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl PartialEq for FieldDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.column == other.column && self.kind == other.kind
    }
}

/// One key of a multi-key ordering, applied left-to-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortKey {
    pub field: &'static FieldDef,
    pub descending: bool,
}

// =============================================================================
// Errors
// =============================================================================

/// Why an expression was rejected.
///
/// Callers treat any of these as "fall back", so the variants exist for
/// logging and tests, not for control flow.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown field '{field}' on {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("field '{field}' is {kind}, incompatible with {symbol} {literal}")]
    TypeMismatch {
        field: &'static str,
        kind: FieldKind,
        symbol: &'static str,
        literal: &'static str,
    },

    #[error("operation '{operation}' is not supported on {kind} field '{field}'")]
    UnsupportedOperation {
        field: &'static str,
        operation: &'static str,
        kind: FieldKind,
    },

    #[error("syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("expression is empty")]
    Empty,
}

fn check_comparison(field: &'static FieldDef, op: CmpOp, value: &Literal) -> Result<(), FilterError> {
    let literal_name = match value {
        Literal::Str(_) => "a string",
        Literal::Int(_) => "an integer",
        Literal::Bool(_) => "a boolean",
    };
    let compatible = matches!(
        (field.kind, value),
        (FieldKind::Text, Literal::Str(_))
            | (FieldKind::Timestamp, Literal::Str(_))
            | (FieldKind::Integer, Literal::Int(_))
            | (FieldKind::Boolean, Literal::Bool(_))
    );
    if !compatible {
        return Err(FilterError::TypeMismatch {
            field: field.name,
            kind: field.kind,
            symbol: op.symbol(),
            literal: literal_name,
        });
    }
    // Booleans only support equality; ordering a flag is meaningless.
    if field.kind == FieldKind::Boolean && !matches!(op, CmpOp::Eq | CmpOp::Ne) {
        return Err(FilterError::UnsupportedOperation {
            field: field.name,
            operation: op.symbol(),
            kind: field.kind,
        });
    }
    Ok(())
}

// =============================================================================
// Tokenizer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Op(CmpOp),
    LParen,
    RParen,
    Comma,
}

struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Tokenizer {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError::Syntax {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, FilterError> {
        let mut tokens = Vec::new();
        loop {
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            let start = self.pos;
            let Some(b) = self.peek() else { break };
            let token = match b {
                b'(' => {
                    self.pos += 1;
                    Token::LParen
                }
                b')' => {
                    self.pos += 1;
                    Token::RParen
                }
                b',' => {
                    self.pos += 1;
                    Token::Comma
                }
                b'=' => {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                    }
                    Token::Op(CmpOp::Eq)
                }
                b'!' => {
                    self.pos += 1;
                    if self.bump() != Some(b'=') {
                        return Err(self.error("expected '=' after '!'"));
                    }
                    Token::Op(CmpOp::Ne)
                }
                b'<' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'=') => {
                            self.pos += 1;
                            Token::Op(CmpOp::Le)
                        }
                        Some(b'>') => {
                            self.pos += 1;
                            Token::Op(CmpOp::Ne)
                        }
                        _ => Token::Op(CmpOp::Lt),
                    }
                }
                b'>' => {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        Token::Op(CmpOp::Ge)
                    } else {
                        Token::Op(CmpOp::Gt)
                    }
                }
                b'"' => self.string()?,
                b'-' => self.number()?,
                b if b.is_ascii_digit() => self.number()?,
                b if b.is_ascii_alphabetic() || b == b'_' => self.ident(),
                other => {
                    return Err(self.error(format!("unexpected character '{}'", other as char)))
                }
            };
            tokens.push((start, token));
        }
        Ok(tokens)
    }

    fn string(&mut self) -> Result<Token, FilterError> {
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'"') => value.push('"'),
                    Some(b'\\') => value.push('\\'),
                    _ => return Err(self.error("invalid escape sequence")),
                },
                Some(b) => value.push(b as char),
            }
        }
        Ok(Token::Str(value))
    }

    fn number(&mut self) -> Result<Token, FilterError> {
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let digits_start = self.pos;
        let mut value: i64 = 0;
        while let Some(b) = self.peek() {
            if !b.is_ascii_digit() {
                break;
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(b - b'0')))
                .ok_or_else(|| self.error("integer literal out of range"))?;
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(self.error("expected digits"));
        }
        if self.peek() == Some(b'.') {
            return Err(self.error("decimal literals are not supported; amounts are in cents"));
        }
        Ok(Token::Int(if negative { -value } else { value }))
    }

    fn ident(&mut self) -> Token {
        let mut text = String::new();
        while let Some(b) = self.peek() {
            if !(b.is_ascii_alphanumeric() || b == b'_') {
                break;
            }
            text.push(b as char);
            self.pos += 1;
        }
        Token::Ident(text)
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    table: &'static FieldTable,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(usize::MAX)
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError::Syntax {
            position: self.position().min(self.tokens.last().map(|(p, _)| *p).unwrap_or(0)),
            message: message.into(),
        }
    }

    /// Case-insensitive keyword check against the next token.
    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(id)) if id.eq_ignore_ascii_case(word))
    }

    fn expect_keyword(&mut self, word: &str) {
        debug_assert!(self.keyword(word));
        self.pos += 1;
    }

    // filter := or
    fn or_expr(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.and_expr()?;
        while self.keyword("or") {
            self.expect_keyword("or");
            let right = self.and_expr()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.unary()?;
        while self.keyword("and") {
            self.expect_keyword("and");
            let right = self.unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, FilterError> {
        if self.keyword("not") {
            self.expect_keyword("not");
            return Ok(self.unary()?.not());
        }
        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            let inner = self.or_expr()?;
            match self.bump() {
                Some(Token::RParen) => return Ok(inner),
                _ => return Err(self.error("expected ')'")),
            }
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, FilterError> {
        let name = match self.bump() {
            Some(Token::Ident(name)) => name,
            Some(other) => return Err(self.error(format!("expected field name, found {other:?}"))),
            None => return Err(self.error("expected field name")),
        };
        if self.keyword("contains") {
            self.expect_keyword("contains");
            let needle = match self.bump() {
                Some(Token::Str(s)) => s,
                _ => return Err(self.error("'contains' requires a string literal")),
            };
            return self.table.contains(&name, needle);
        }
        let op = match self.bump() {
            Some(Token::Op(op)) => op,
            _ => return Err(self.error(format!("expected comparison operator after '{name}'"))),
        };
        let value = match self.bump() {
            Some(Token::Str(s)) => Literal::Str(s),
            Some(Token::Int(i)) => Literal::Int(i),
            Some(Token::Ident(id)) if id.eq_ignore_ascii_case("true") => Literal::Bool(true),
            Some(Token::Ident(id)) if id.eq_ignore_ascii_case("false") => Literal::Bool(false),
            _ => return Err(self.error("expected literal value")),
        };
        self.table.compare(&name, op, value)
    }

    // order := key (',' key)*
    fn order_keys(&mut self) -> Result<Vec<SortKey>, FilterError> {
        let mut keys = Vec::new();
        loop {
            let name = match self.bump() {
                Some(Token::Ident(name)) => name,
                _ => return Err(self.error("expected field name in order expression")),
            };
            let mut descending = false;
            if self.keyword("asc") {
                self.expect_keyword("asc");
            } else if self.keyword("desc") {
                self.expect_keyword("desc");
                descending = true;
            }
            keys.push(SortKey {
                field: self.table.require(&name)?,
                descending,
            });
            match self.bump() {
                Some(Token::Comma) => continue,
                None => break,
                Some(other) => return Err(self.error(format!("unexpected token {other:?}"))),
            }
        }
        Ok(keys)
    }
}

/// Parses a filter expression against an entity's allow-list.
///
/// ## Example
/// ```rust
/// use venda_core::types::Product;
/// use venda_core::filter::parse_filter;
///
/// let expr = parse_filter("name contains \"cabo\" and price_cents > 1000", Product::fields());
/// assert!(expr.is_ok());
///
/// // Unknown fields are rejected, not silently accepted
/// assert!(parse_filter("password = \"x\"", Product::fields()).is_err());
/// ```
pub fn parse_filter(input: &str, table: &'static FieldTable) -> Result<Expr, FilterError> {
    if input.trim().is_empty() {
        return Err(FilterError::Empty);
    }
    let tokens = Tokenizer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        table,
    };
    let expr = parser.or_expr()?;
    if parser.peek().is_some() {
        return Err(parser.error("trailing input after expression"));
    }
    Ok(expr)
}

/// Parses an order expression (`"name asc, price_cents desc"`).
///
/// Missing direction defaults to ascending. Keys apply left-to-right as a
/// stable multi-key sort.
pub fn parse_order(input: &str, table: &'static FieldTable) -> Result<Vec<SortKey>, FilterError> {
    if input.trim().is_empty() {
        return Err(FilterError::Empty);
    }
    let tokens = Tokenizer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        table,
    };
    parser.order_keys()
}

// =============================================================================
// Unit Tests
// =============================================================================
