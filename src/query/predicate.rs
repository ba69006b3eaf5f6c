use serde_json::{Map, Value};

use crate::types::key::Key;

/// Comparison operators for predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

/// One side of a comparison: a dotted column path or a typed constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Value(Key),
}

/// A predicate expression tree for filtering decoded rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Comparison {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    And(Vec<Expression>),
    Or(Vec<Expression>),
}

/// Column reference builder, e.g. `column("profile.age").gt(21)`.
/// Dots descend into nested objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column(String);

pub fn column(name: impl Into<String>) -> Column {
    Column(name.into())
}

impl Column {
    pub fn gt(self, value: impl Into<Key>) -> Expression {
        self.compare(CompareOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Key>) -> Expression {
        self.compare(CompareOp::Gte, value)
    }

    pub fn lt(self, value: impl Into<Key>) -> Expression {
        self.compare(CompareOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Key>) -> Expression {
        self.compare(CompareOp::Lte, value)
    }

    pub fn eq(self, value: impl Into<Key>) -> Expression {
        self.compare(CompareOp::Eq, value)
    }

    pub fn neq(self, value: impl Into<Key>) -> Expression {
        self.compare(CompareOp::Neq, value)
    }

    fn compare(self, op: CompareOp, value: impl Into<Key>) -> Expression {
        Expression::Comparison {
            left: Operand::Column(self.0),
            op,
            right: Operand::Value(value.into()),
        }
    }
}

/// Evaluates whether the decoded row matches the expression.
///
/// An empty conjunction is vacuously true; the empty disjunction matches by
/// the same convention. A comparison whose column cannot be resolved, or
/// whose sides resolve to different variants, is false.
pub fn eval(data: &Map<String, Value>, expression: &Expression) -> bool {
    match expression {
        Expression::Comparison { left, op, right } => eval_comparison(data, left, *op, right),
        Expression::And(exprs) => exprs.iter().all(|e| eval(data, e)),
        Expression::Or(exprs) => {
            if exprs.is_empty() {
                return true;
            }
            exprs.iter().any(|e| eval(data, e))
        }
    }
}

fn eval_comparison(data: &Map<String, Value>, left: &Operand, op: CompareOp, right: &Operand) -> bool {
    let Some(left) = resolve(data, left) else {
        return false;
    };
    let Some(right) = resolve(data, right) else {
        return false;
    };
    match left.compare(&right) {
        Ok(ordering) => match op {
            CompareOp::Gt => ordering == std::cmp::Ordering::Greater,
            CompareOp::Gte => ordering != std::cmp::Ordering::Less,
            CompareOp::Lt => ordering == std::cmp::Ordering::Less,
            CompareOp::Lte => ordering != std::cmp::Ordering::Greater,
            CompareOp::Eq => ordering == std::cmp::Ordering::Equal,
            CompareOp::Neq => ordering != std::cmp::Ordering::Equal,
        },
        // operands of different variants never match
        Err(_) => false,
    }
}

fn resolve(data: &Map<String, Value>, operand: &Operand) -> Option<Key> {
    match operand {
        Operand::Value(key) => Some(key.clone()),
        Operand::Column(path) => read_column(data, path),
    }
}

/// Walks a dotted path through nested objects down to a primitive value.
fn read_column(data: &Map<String, Value>, path: &str) -> Option<Key> {
    let mut current = data;
    let mut resolved: Option<&Value> = None;
    for segment in path.split('.') {
        // a primitive was already reached but path segments remain
        if resolved.is_some() {
            return None;
        }
        match current.get(segment)? {
            Value::Object(next) => current = next,
            other => resolved = Some(other),
        }
    }
    json_to_key(resolved?)
}

/// Builder collecting comparisons into one conjunction, e.g.
/// `ExpressionBuilder::new().gt("profile.age", 21).eq("city", "Bandung").build()`.
#[derive(Debug, Clone, Default)]
pub struct ExpressionBuilder {
    exprs: Vec<Expression>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    pub fn eq(mut self, name: &str, value: impl Into<Key>) -> Self {
        self.exprs.push(column(name).eq(value));
        self
    }

    pub fn neq(mut self, name: &str, value: impl Into<Key>) -> Self {
        self.exprs.push(column(name).neq(value));
        self
    }

    pub fn gt(mut self, name: &str, value: impl Into<Key>) -> Self {
        self.exprs.push(column(name).gt(value));
        self
    }

    pub fn gte(mut self, name: &str, value: impl Into<Key>) -> Self {
        self.exprs.push(column(name).gte(value));
        self
    }

    pub fn lt(mut self, name: &str, value: impl Into<Key>) -> Self {
        self.exprs.push(column(name).lt(value));
        self
    }

    pub fn lte(mut self, name: &str, value: impl Into<Key>) -> Self {
        self.exprs.push(column(name).lte(value));
        self
    }

    /// Folds everything collected so far into one side of a disjunction
    /// with the given expression.
    pub fn or(self, other: Expression) -> Self {
        Self {
            exprs: vec![Expression::Or(vec![self.build(), other])],
        }
    }

    /// An empty builder yields the match-everything conjunction.
    pub fn build(self) -> Expression {
        Expression::And(self.exprs)
    }
}

fn json_to_key(value: &Value) -> Option<Key> {
    match value {
        Value::String(s) => Some(Key::String(s.clone())),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                // integers that fit 32 bits compare against Int32 constants
                if v >= i32::MIN as i64 && v <= i32::MAX as i64 {
                    Some(Key::Int32(v as i32))
                } else {
                    Some(Key::Int64(v))
                }
            } else {
                n.as_f64().map(Key::Float64)
            }
        }
        // bool, null, arrays and object leaves stay unresolved
        _ => None,
    }
}
