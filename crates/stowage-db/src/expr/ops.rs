//! SQL condition operators.
//!
//! Compound expression types produced by the [`Predicate`] combinators.
//! Each renders itself recursively into a SQL fragment with `?`
//! placeholders.

use rusqlite::types::Value;

use crate::traits::Predicate;

/// Comparison operators usable between a column and a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CmpOp {
    fn sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Gte => ">=",
            CmpOp::Lte => "<=",
        }
    }
}

/// A binary comparison against a bound value, e.g. `name = ?`.
pub struct Compare<L> {
    left: L,
    op: CmpOp,
    value: Value,
}

impl<L> Compare<L> {
    pub fn new(left: L, op: CmpOp, value: Value) -> Self {
        Self { left, op, value }
    }
}

impl<L: Predicate> Predicate for Compare<L> {
    fn render(&self, params: &mut Vec<Value>) -> String {
        let left = self.left.render(params);
        params.push(self.value.clone());
        format!("{} {} ?", left, self.op.sql())
    }
}

/// A substring pattern match, optionally case-insensitive.
pub struct Like<L> {
    left: L,
    pattern: String,
    case_insensitive: bool,
}

impl<L> Like<L> {
    pub const fn new(left: L, pattern: String, case_insensitive: bool) -> Self {
        Self {
            left,
            pattern,
            case_insensitive,
        }
    }
}

impl<L: Predicate> Predicate for Like<L> {
    fn render(&self, params: &mut Vec<Value>) -> String {
        let left = self.left.render(params);
        params.push(format!("%{}%", self.pattern).into());
        if self.case_insensitive {
            format!("LOWER({}) LIKE LOWER(?)", left)
        } else {
            format!("{} LIKE ?", left)
        }
    }
}

/// An `IN` / `NOT IN` membership test.
pub struct InList<L> {
    left: L,
    values: Vec<Value>,
    negated: bool,
}

impl<L> InList<L> {
    pub fn new(left: L, values: Vec<Value>, negated: bool) -> Self {
        Self {
            left,
            values,
            negated,
        }
    }
}

impl<L: Predicate> Predicate for InList<L> {
    fn render(&self, params: &mut Vec<Value>) -> String {
        let left = self.left.render(params);
        let placeholders = vec!["?"; self.values.len()].join(", ");
        params.extend(self.values.iter().cloned());
        let op = if self.negated { "NOT IN" } else { "IN" };
        format!("{} {} ({})", left, op, placeholders)
    }
}

/// An `IS NULL` / `IS NOT NULL` check.
pub struct IsNull<L> {
    left: L,
    negated: bool,
}

impl<L> IsNull<L> {
    pub fn new(left: L, negated: bool) -> Self {
        Self { left, negated }
    }
}

impl<L: Predicate> Predicate for IsNull<L> {
    fn render(&self, params: &mut Vec<Value>) -> String {
        let left = self.left.render(params);
        let op = if self.negated {
            "IS NOT NULL"
        } else {
            "IS NULL"
        };
        format!("{} {}", left, op)
    }
}

/// How two sub-conditions are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    fn sql(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

/// Two conditions combined with `AND` or `OR`.
pub struct Connective<L, R> {
    left: L,
    right: R,
    op: Logic,
}

impl<L, R> Connective<L, R> {
    pub fn new(left: L, right: R, op: Logic) -> Self {
        Self { left, right, op }
    }
}

impl<L: Predicate, R: Predicate> Predicate for Connective<L, R> {
    fn render(&self, params: &mut Vec<Value>) -> String {
        let left = self.left.render(params);
        let right = self.right.render(params);
        format!("({} {} {})", left, self.op.sql(), right)
    }
}
