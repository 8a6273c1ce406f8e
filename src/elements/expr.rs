//! Expression evaluation
//!
//! Expressions are the value-producing parts of statements. They are pure:
//! evaluation reads the variable store and never suspends.

use serde::{Deserialize, Serialize};

use crate::errors::{RuntimeError, DIVISION_BY_ZERO, INTEGER_OVERFLOW};
use crate::types::{Value, VariableId};
use crate::variables::VariableStore;

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    Lit {
        value: Value,
    },
    Var {
        id: VariableId,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Lit {
            value: value.into(),
        }
    }

    pub fn var(id: impl Into<VariableId>) -> Self {
        Expr::Var { id: id.into() }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Add, lhs, rhs)
    }

    /// Evaluate the expression against the current variable values
    pub fn eval(&self, variables: &VariableStore) -> Result<Value, RuntimeError> {
        match self {
            Expr::Lit { value } => Ok(value.clone()),

            Expr::Var { id } => variables.value(id).cloned(),

            Expr::Unary { op, operand } => op.apply(operand.eval(variables)?),

            // And/Or short-circuit: the right side is not evaluated when the
            // left side decides the result
            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => {
                if !lhs.eval(variables)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(rhs.eval(variables)?.is_truthy()))
            }
            Expr::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => {
                if lhs.eval(variables)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(rhs.eval(variables)?.is_truthy()))
            }

            Expr::Binary { op, lhs, rhs } => {
                let left = lhs.eval(variables)?;
                let right = rhs.eval(variables)?;
                op.apply(left, right)
            }
        }
    }

    /// Visit every variable this expression reads
    pub fn for_each_variable<'a>(&'a self, f: &mut dyn FnMut(&'a VariableId)) {
        match self {
            Expr::Lit { .. } => {}
            Expr::Var { id } => f(id),
            Expr::Unary { operand, .. } => operand.for_each_variable(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_variable(f);
                rhs.for_each_variable(f);
            }
        }
    }

    /// Check whether the expression reads `id`
    pub fn references(&self, id: &VariableId) -> bool {
        let mut found = false;
        self.for_each_variable(&mut |v| found |= v == id);
        found
    }
}

impl UnaryOp {
    fn apply(self, operand: Value) -> Result<Value, RuntimeError> {
        match (self, operand) {
            (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
            (UnaryOp::Neg, Value::Int(n)) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| overflow("negation")),
            (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
            (UnaryOp::Neg, v) => Err(RuntimeError::type_error(format!(
                "Cannot negate a {} value",
                v.kind()
            ))),
        }
    }
}

/* ===================== Binary Operators ===================== */

/// Numeric operands after int/float promotion
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(Numbers::Ints(*l, *r)),
        (Value::Int(l), Value::Float(r)) => Some(Numbers::Floats(*l as f64, *r)),
        (Value::Float(l), Value::Int(r)) => Some(Numbers::Floats(*l, *r as f64)),
        (Value::Float(l), Value::Float(r)) => Some(Numbers::Floats(*l, *r)),
        _ => None,
    }
}

fn overflow(operation: &str) -> RuntimeError {
    RuntimeError::new(INTEGER_OVERFLOW, format!("Integer overflow in {}", operation))
}

fn division_by_zero() -> RuntimeError {
    RuntimeError::new(DIVISION_BY_ZERO, "Division by zero")
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    fn type_error(self, left: &Value, right: &Value) -> RuntimeError {
        RuntimeError::type_error(format!(
            "Operator '{}' cannot be applied to {} and {}",
            self.symbol(),
            left.kind(),
            right.kind()
        ))
    }

    fn apply(self, left: Value, right: Value) -> Result<Value, RuntimeError> {
        match self {
            BinaryOp::Add => {
                if let (Value::Str(l), Value::Str(r)) = (&left, &right) {
                    return Ok(Value::Str(format!("{}{}", l, r)));
                }
                self.arithmetic(&left, &right, i64::checked_add, |l, r| l + r)
            }
            BinaryOp::Sub => self.arithmetic(&left, &right, i64::checked_sub, |l, r| l - r),
            BinaryOp::Mul => self.arithmetic(&left, &right, i64::checked_mul, |l, r| l * r),
            BinaryOp::Div | BinaryOp::Rem => self.division(&left, &right),

            BinaryOp::Eq => Ok(Value::Bool(loosely_equal(&left, &right))),
            BinaryOp::Ne => Ok(Value::Bool(!loosely_equal(&left, &right))),

            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = match (&left, &right) {
                    (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
                    _ => match numbers(&left, &right) {
                        Some(Numbers::Ints(l, r)) => Some(l.cmp(&r)),
                        Some(Numbers::Floats(l, r)) => l.partial_cmp(&r),
                        None => return Err(self.type_error(&left, &right)),
                    },
                };
                // NaN compares false against everything
                let Some(ordering) = ordering else {
                    return Ok(Value::Bool(false));
                };
                let result = match self {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                };
                Ok(Value::Bool(result))
            }

            // Handled with short-circuiting in Expr::eval
            BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
            BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        }
    }

    fn arithmetic(
        self,
        left: &Value,
        right: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, RuntimeError> {
        match numbers(left, right) {
            Some(Numbers::Ints(l, r)) => int_op(l, r)
                .map(Value::Int)
                .ok_or_else(|| overflow(self.symbol())),
            Some(Numbers::Floats(l, r)) => Ok(Value::Float(float_op(l, r))),
            None => Err(self.type_error(left, right)),
        }
    }

    fn division(self, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
        match numbers(left, right) {
            Some(Numbers::Ints(_, 0)) => Err(division_by_zero()),
            Some(Numbers::Ints(l, r)) => {
                let result = if self == BinaryOp::Div {
                    l.checked_div(r)
                } else {
                    l.checked_rem(r)
                };
                result.map(Value::Int).ok_or_else(|| overflow(self.symbol()))
            }
            Some(Numbers::Floats(_, r)) if r == 0.0 => Err(division_by_zero()),
            Some(Numbers::Floats(l, r)) => Ok(Value::Float(if self == BinaryOp::Div {
                l / r
            } else {
                l % r
            })),
            None => Err(self.type_error(left, right)),
        }
    }
}

/// Equality with int/float promotion
fn loosely_equal(left: &Value, right: &Value) -> bool {
    match numbers(left, right) {
        Some(Numbers::Ints(l, r)) => l == r,
        Some(Numbers::Floats(l, r)) => l == r,
        None => left == right,
    }
}
