use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::error::{DatabaseError, Result};
use crate::types::value::{DataType, Value};

/// Comparison operators accepted by the flat condition form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn parse(text: &str) -> Result<Self> {
        match text {
            "==" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::NotEq),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            ">=" => Ok(CompareOp::Ge),
            "<=" => Ok(CompareOp::Le),
            other => Err(DatabaseError::UnsupportedOperator {
                operator: other.to_string(),
            }),
        }
    }

    fn compare(&self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::NotEq => left != right,
            CompareOp::Gt => matches!(left.partial_cmp(right), Some(Ordering::Greater)),
            CompareOp::Lt => matches!(left.partial_cmp(right), Some(Ordering::Less)),
            CompareOp::Ge => matches!(
                left.partial_cmp(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CompareOp::Le => matches!(
                left.partial_cmp(right),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// How the flat form combines its triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    And,
    Or,
}

impl Combine {
    pub fn parse(text: &str) -> Result<Self> {
        match text.to_ascii_uppercase().as_str() {
            "AND" => Ok(Combine::And),
            "OR" => Ok(Combine::Or),
            other => Err(DatabaseError::UnsupportedOperator {
                operator: other.to_string(),
            }),
        }
    }
}

/// One `(column, operator, value)` triple of the flat form.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatCondition {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

impl FlatCondition {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Build a triple from its textual parts, rejecting unknown
    /// operators.
    pub fn parse(column: &str, operator: &str, value: &str) -> Result<Self> {
        Ok(Self::new(column, CompareOp::parse(operator)?, value))
    }

    /// A triple naming a column the row does not carry is false rather
    /// than an error. The literal is coerced to the column's declared
    /// type before the typed comparison.
    fn matches(
        &self,
        fields: &HashMap<String, Value>,
        types: &HashMap<String, DataType>,
    ) -> Result<bool> {
        let (Some(data_type), Some(row_value)) =
            (types.get(&self.column), fields.get(&self.column))
        else {
            return Ok(false);
        };
        let literal = data_type.parse(&self.value)?;
        Ok(self.op.compare(row_value, &literal))
    }
}

/// A row filter in either of the two accepted surface forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Triples combined by one uniform logical operator.
    Flat {
        conditions: Vec<FlatCondition>,
        combine: Combine,
    },
    /// Textual boolean expression, e.g.
    /// `(age > 30 AND dept == HR) OR age <= 21`.
    Expr(String),
}

impl Filter {
    /// Parse the textual form once so per-row evaluation never re-derives
    /// structure from the token stream.
    pub fn compile(&self) -> Result<CompiledFilter> {
        match self {
            Filter::Flat {
                conditions,
                combine,
            } => Ok(CompiledFilter::Flat {
                conditions: conditions.clone(),
                combine: *combine,
            }),
            Filter::Expr(text) => Ok(CompiledFilter::Tree(ConditionExpr::parse(text)?)),
        }
    }
}

/// A filter compiled once per query and evaluated per row.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledFilter {
    Flat {
        conditions: Vec<FlatCondition>,
        combine: Combine,
    },
    Tree(ConditionExpr),
}

impl CompiledFilter {
    /// Evaluate against one row's field map. `types` supplies declared
    /// column types for the flat form's literal coercion; the nested
    /// form carries its own comparison rules.
    pub fn matches(
        &self,
        fields: &HashMap<String, Value>,
        types: &HashMap<String, DataType>,
    ) -> Result<bool> {
        match self {
            CompiledFilter::Flat {
                conditions,
                combine,
            } => {
                let mut results = Vec::with_capacity(conditions.len());
                for condition in conditions {
                    results.push(condition.matches(fields, types)?);
                }
                Ok(match combine {
                    Combine::And => results.iter().all(|matched| *matched),
                    Combine::Or => results.iter().any(|matched| *matched),
                })
            }
            CompiledFilter::Tree(expr) => expr.evaluate(fields),
        }
    }
}

/// Operators legal in a nested-form leaf. Relational operators compare
/// both sides as integers; equality compares canonical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
}

/// Parsed nested-form expression. `AND` binds tighter than `OR`, so
/// `a AND b OR c` reads as `(a AND b) OR c`; parentheses override.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Leaf {
        field: String,
        op: LeafOp,
        value: String,
    },
    And(Box<ConditionExpr>, Box<ConditionExpr>),
    Or(Box<ConditionExpr>, Box<ConditionExpr>),
}

impl ConditionExpr {
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        Parser::new(tokens).parse()
    }

    /// A leaf naming a field the row does not carry is false, matching
    /// the flat form's missing-column policy.
    pub fn evaluate(&self, fields: &HashMap<String, Value>) -> Result<bool> {
        match self {
            ConditionExpr::And(left, right) => {
                Ok(left.evaluate(fields)? && right.evaluate(fields)?)
            }
            ConditionExpr::Or(left, right) => Ok(left.evaluate(fields)? || right.evaluate(fields)?),
            ConditionExpr::Leaf { field, op, value } => {
                let Some(row_value) = fields.get(field) else {
                    return Ok(false);
                };
                match op {
                    LeafOp::Eq => Ok(row_value.to_string() == *value),
                    LeafOp::Gt => {
                        let (left, right) = int_operands(row_value, value)?;
                        Ok(left > right)
                    }
                    LeafOp::Lt => {
                        let (left, right) = int_operands(row_value, value)?;
                        Ok(left < right)
                    }
                    LeafOp::Ge => {
                        let (left, right) = int_operands(row_value, value)?;
                        Ok(left >= right)
                    }
                    LeafOp::Le => {
                        let (left, right) = int_operands(row_value, value)?;
                        Ok(left <= right)
                    }
                }
            }
        }
    }
}

fn int_operands(row_value: &Value, literal: &str) -> Result<(i64, i64)> {
    let left = row_value.as_int()?;
    let right = literal
        .parse::<i64>()
        .map_err(|_| DatabaseError::TypeConversion {
            value: literal.to_string(),
            target: "int".to_string(),
        })?;
    Ok((left, right))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Op(String),
    Word(String),
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '>' | '<' | '=' | '!' => {
                // longest match first, so `>=` never splits into `>`, `=`
                let two: String = chars[i..].iter().take(2).collect();
                if matches!(two.as_str(), ">=" | "<=" | "==" | "!=") {
                    tokens.push(Token::Op(two));
                    i += 2;
                } else {
                    tokens.push(Token::Op(c.to_string()));
                    i += 1;
                }
            }
            _ => {
                let start = i;
                while i < chars.len() && !" \t()><=!".contains(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    _ => tokens.push(Token::Word(word)),
                }
            }
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser over the token stream.
///
///   expr    := and_expr (OR and_expr)*
///   and_expr := primary (AND primary)*
///   primary := '(' expr ')' | WORD op WORD
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<ConditionExpr> {
        let expr = self.or_expr()?;
        if self.pos != self.tokens.len() {
            return Err(DatabaseError::MalformedCondition {
                details: "unexpected trailing tokens".to_string(),
            });
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<ConditionExpr> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = ConditionExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<ConditionExpr> {
        let mut left = self.primary()?;
        while self.eat(&Token::And) {
            let right = self.primary()?;
            left = ConditionExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<ConditionExpr> {
        if self.eat(&Token::LParen) {
            let expr = self.or_expr()?;
            if !self.eat(&Token::RParen) {
                return Err(DatabaseError::MalformedCondition {
                    details: "missing closing parenthesis".to_string(),
                });
            }
            return Ok(expr);
        }
        self.leaf()
    }

    fn leaf(&mut self) -> Result<ConditionExpr> {
        let field = self.word("expected field name")?;
        let op_text = match self.next_token() {
            Some(Token::Op(op)) => op,
            _ => {
                return Err(DatabaseError::MalformedCondition {
                    details: format!("expected comparison operator after '{field}'"),
                });
            }
        };
        let mut op = match op_text.as_str() {
            ">" => LeafOp::Gt,
            "<" => LeafOp::Lt,
            ">=" => LeafOp::Ge,
            "<=" => LeafOp::Le,
            "==" => LeafOp::Eq,
            other => {
                return Err(DatabaseError::UnsupportedOperator {
                    operator: other.to_string(),
                });
            }
        };
        // legacy surface: a bare `=` before the literal upgrades `>`/`<`
        // to the or-equal variant, e.g. `age > =30` means `age >= 30`
        if matches!(self.peek(), Some(Token::Op(eq)) if eq.as_str() == "=") {
            match op {
                LeafOp::Gt => {
                    op = LeafOp::Ge;
                    self.pos += 1;
                }
                LeafOp::Lt => {
                    op = LeafOp::Le;
                    self.pos += 1;
                }
                _ => {}
            }
        }
        let value = self.word("expected comparison value")?;
        Ok(ConditionExpr::Leaf { field, op, value })
    }

    fn word(&mut self, context: &str) -> Result<String> {
        match self.next_token() {
            Some(Token::Word(word)) => Ok(word),
            _ => Err(DatabaseError::MalformedCondition {
                details: context.to_string(),
            }),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}
